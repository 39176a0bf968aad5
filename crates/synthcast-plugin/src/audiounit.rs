//! AudioToolbox backend: the system component registry and AudioUnit instances.

use crate::error::{OsStatus, NO_ERR};
use crate::instance::{PluginInstance, RenderStatus};
use crate::registry::{ComponentDescription, ComponentRef, ComponentRegistry};
use std::ffi::{c_char, c_void, CStr};
use std::ptr;
use synthcast_core::{AudioBlock, FourCharCode, StreamFormat};

type AudioComponent = *mut c_void;
type AudioUnit = *mut c_void;
type CFStringRef = *const c_void;

const PROPERTY_STREAM_FORMAT: u32 = 8;
const PROPERTY_MAXIMUM_FRAMES_PER_SLICE: u32 = 14;
const SCOPE_GLOBAL: u32 = 0;
const SCOPE_OUTPUT: u32 = 2;
const TIMESTAMP_SAMPLE_TIME_VALID: u32 = 1;
const FORMAT_FLAG_NON_INTERLEAVED: u32 = 1 << 5;
const CF_STRING_ENCODING_UTF8: u32 = 0x0800_0100;

/// kAudioUnitErr_InvalidParameter, which instruments report from render while
/// they have nothing to produce yet.
pub const ERR_NO_OUTPUT_YET: OsStatus = -10878;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct AudioComponentDescription {
    component_type: u32,
    component_sub_type: u32,
    component_manufacturer: u32,
    component_flags: u32,
    component_flags_mask: u32,
}

impl From<&ComponentDescription> for AudioComponentDescription {
    fn from(desc: &ComponentDescription) -> Self {
        Self {
            component_type: desc.component_type.as_u32(),
            component_sub_type: desc.subtype.as_u32(),
            component_manufacturer: desc.manufacturer.as_u32(),
            component_flags: desc.flags,
            component_flags_mask: desc.flags_mask,
        }
    }
}

impl From<AudioComponentDescription> for ComponentDescription {
    fn from(desc: AudioComponentDescription) -> Self {
        Self {
            component_type: FourCharCode::from_u32(desc.component_type),
            subtype: FourCharCode::from_u32(desc.component_sub_type),
            manufacturer: FourCharCode::from_u32(desc.component_manufacturer),
            flags: desc.component_flags,
            flags_mask: desc.component_flags_mask,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct AudioStreamBasicDescription {
    sample_rate: f64,
    format_id: u32,
    format_flags: u32,
    bytes_per_packet: u32,
    frames_per_packet: u32,
    bytes_per_frame: u32,
    channels_per_frame: u32,
    bits_per_channel: u32,
    reserved: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct SmpteTime {
    subframes: i16,
    subframe_divisor: i16,
    counter: u32,
    kind: u32,
    flags: u32,
    hours: i16,
    minutes: i16,
    seconds: i16,
    frames: i16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct AudioTimeStamp {
    sample_time: f64,
    host_time: u64,
    rate_scalar: f64,
    word_clock_time: u64,
    smpte_time: SmpteTime,
    flags: u32,
    reserved: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct AudioBuffer {
    number_channels: u32,
    data_byte_size: u32,
    data: *mut c_void,
}

/// Variable-length in C: `buffers` continues past its declared single element.
#[repr(C)]
struct AudioBufferList {
    number_buffers: u32,
    buffers: [AudioBuffer; 1],
}

#[link(name = "AudioToolbox", kind = "framework")]
extern "C" {
    fn AudioComponentFindNext(
        component: AudioComponent,
        desc: *const AudioComponentDescription,
    ) -> AudioComponent;
    fn AudioComponentGetDescription(
        component: AudioComponent,
        desc: *mut AudioComponentDescription,
    ) -> OsStatus;
    fn AudioComponentCopyName(component: AudioComponent, name: *mut CFStringRef) -> OsStatus;
    fn AudioComponentInstanceNew(component: AudioComponent, instance: *mut AudioUnit) -> OsStatus;
    fn AudioComponentInstanceDispose(instance: AudioUnit) -> OsStatus;
    fn AudioUnitGetProperty(
        unit: AudioUnit,
        id: u32,
        scope: u32,
        element: u32,
        data: *mut c_void,
        size: *mut u32,
    ) -> OsStatus;
    fn AudioUnitSetProperty(
        unit: AudioUnit,
        id: u32,
        scope: u32,
        element: u32,
        data: *const c_void,
        size: u32,
    ) -> OsStatus;
    fn AudioUnitInitialize(unit: AudioUnit) -> OsStatus;
    fn AudioUnitUninitialize(unit: AudioUnit) -> OsStatus;
    fn AudioUnitRender(
        unit: AudioUnit,
        action_flags: *mut u32,
        timestamp: *const AudioTimeStamp,
        bus: u32,
        frames: u32,
        data: *mut AudioBufferList,
    ) -> OsStatus;
    fn MusicDeviceMIDIEvent(
        unit: AudioUnit,
        status: u32,
        data1: u32,
        data2: u32,
        offset_frames: u32,
    ) -> OsStatus;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFStringGetCString(
        string: CFStringRef,
        buffer: *mut c_char,
        size: isize,
        encoding: u32,
    ) -> u8;
    fn CFRelease(object: *const c_void);
}

fn check(status: OsStatus) -> Result<(), OsStatus> {
    if status == NO_ERR {
        Ok(())
    } else {
        Err(status)
    }
}

/// The system AudioComponent catalogue.
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioUnitRegistry;

impl ComponentRegistry for AudioUnitRegistry {
    fn find_next(
        &self,
        previous: Option<ComponentRef>,
        query: &ComponentDescription,
    ) -> Option<ComponentRef> {
        let desc = AudioComponentDescription::from(query);
        let previous = previous.map_or(ptr::null_mut(), |c| c.raw() as AudioComponent);
        // SAFETY: `previous` is null or a component handle returned by an
        // earlier call; `desc` outlives the call.
        let next = unsafe { AudioComponentFindNext(previous, &desc) };
        (!next.is_null()).then(|| ComponentRef::new(next as usize))
    }

    fn describe(&self, component: ComponentRef) -> Option<ComponentDescription> {
        let mut desc = AudioComponentDescription::default();
        // SAFETY: component handles are never freed by the system while the process runs.
        let status =
            unsafe { AudioComponentGetDescription(component.raw() as AudioComponent, &mut desc) };
        check(status).ok().map(|()| desc.into())
    }

    fn name(&self, component: ComponentRef) -> Option<String> {
        let mut name: CFStringRef = ptr::null();
        // SAFETY: on success `name` is a CFString we own and release below.
        unsafe {
            check(AudioComponentCopyName(
                component.raw() as AudioComponent,
                &mut name,
            ))
            .ok()?;
            if name.is_null() {
                return None;
            }
            let mut buffer = [0 as c_char; 256];
            let ok = CFStringGetCString(
                name,
                buffer.as_mut_ptr(),
                buffer.len() as isize,
                CF_STRING_ENCODING_UTF8,
            );
            CFRelease(name);
            (ok != 0).then(|| CStr::from_ptr(buffer.as_ptr()).to_string_lossy().into_owned())
        }
    }

    fn instantiate(&self, component: ComponentRef) -> Result<Box<dyn PluginInstance>, OsStatus> {
        let mut unit: AudioUnit = ptr::null_mut();
        // SAFETY: `component` came from `find_next`; `unit` is written on success.
        check(unsafe { AudioComponentInstanceNew(component.raw() as AudioComponent, &mut unit) })?;
        if unit.is_null() {
            return Err(-1);
        }
        Ok(Box::new(AudioUnitInstance {
            unit,
            disposed: false,
        }))
    }
}

/// One live AudioUnit instance.
pub struct AudioUnitInstance {
    unit: AudioUnit,
    disposed: bool,
}

// SAFETY: AudioUnit instances may be called from any thread as long as calls
// are not concurrent. The host only reaches the instance through its mutex.
unsafe impl Send for AudioUnitInstance {}

impl PluginInstance for AudioUnitInstance {
    fn output_format(&mut self) -> Result<StreamFormat, OsStatus> {
        let mut asbd = AudioStreamBasicDescription::default();
        let mut size = std::mem::size_of::<AudioStreamBasicDescription>() as u32;
        // SAFETY: `asbd` is a correctly sized out-parameter.
        check(unsafe {
            AudioUnitGetProperty(
                self.unit,
                PROPERTY_STREAM_FORMAT,
                SCOPE_OUTPUT,
                0,
                &mut asbd as *mut AudioStreamBasicDescription as *mut c_void,
                &mut size,
            )
        })?;
        Ok(StreamFormat {
            sample_rate: asbd.sample_rate,
            channels: asbd.channels_per_frame,
            bits_per_sample: asbd.bits_per_channel,
            interleaved: asbd.format_flags & FORMAT_FLAG_NON_INTERLEAVED == 0,
        })
    }

    fn set_maximum_frames_per_slice(&mut self, frames: u32) -> Result<(), OsStatus> {
        // SAFETY: the property value is a u32 read during the call.
        check(unsafe {
            AudioUnitSetProperty(
                self.unit,
                PROPERTY_MAXIMUM_FRAMES_PER_SLICE,
                SCOPE_GLOBAL,
                0,
                &frames as *const u32 as *const c_void,
                std::mem::size_of::<u32>() as u32,
            )
        })
    }

    fn initialize(&mut self) -> Result<(), OsStatus> {
        // SAFETY: `unit` is live until `dispose`.
        check(unsafe { AudioUnitInitialize(self.unit) })
    }

    fn uninitialize(&mut self) {
        // SAFETY: only called after a successful initialize.
        let status = unsafe { AudioUnitUninitialize(self.unit) };
        if status != NO_ERR {
            tracing::debug!("AudioUnitUninitialize returned {status}");
        }
    }

    fn midi_event(&mut self, status: u8, data1: u8, data2: u8, offset_frames: u32) {
        // SAFETY: `unit` is a music device; the call copies its arguments.
        let result = unsafe {
            MusicDeviceMIDIEvent(
                self.unit,
                u32::from(status),
                u32::from(data1),
                u32::from(data2),
                offset_frames,
            )
        };
        if result != NO_ERR {
            tracing::debug!("MusicDeviceMIDIEvent returned {result}");
        }
    }

    fn render(&mut self, sample_time: f64, block: &mut AudioBlock) -> RenderStatus {
        let frames = block.frames();
        let channels = block.channel_count();
        let byte_size = (frames * std::mem::size_of::<f32>()) as u32;
        let targets: Vec<*mut f32> = block.channels_mut().map(|ch| ch.as_mut_ptr()).collect();

        // u64 words keep the list pointer-aligned: an 8-byte header, then 16 bytes per buffer.
        let mut storage = vec![0u64; 1 + 2 * channels.max(1)];
        let list = storage.as_mut_ptr() as *mut AudioBufferList;

        let timestamp = AudioTimeStamp {
            sample_time,
            flags: TIMESTAMP_SAMPLE_TIME_VALID,
            ..AudioTimeStamp::default()
        };
        let mut action_flags = 0u32;

        // SAFETY: `storage` holds a header plus `channels` buffers and outlives
        // the call; every buffer points at a channel of `block` with `byte_size`
        // bytes of room. A plugin that substitutes its own buffer pointers keeps
        // them valid until the next render, so they are copied out right away.
        unsafe {
            ptr::addr_of_mut!((*list).number_buffers).write(channels as u32);
            let buffers = ptr::addr_of_mut!((*list).buffers) as *mut AudioBuffer;
            for (i, target) in targets.iter().enumerate() {
                buffers.add(i).write(AudioBuffer {
                    number_channels: 1,
                    data_byte_size: byte_size,
                    data: *target as *mut c_void,
                });
            }

            let status = AudioUnitRender(
                self.unit,
                &mut action_flags,
                &timestamp,
                0,
                frames as u32,
                list,
            );
            match status {
                NO_ERR => {}
                ERR_NO_OUTPUT_YET => return RenderStatus::NotReady,
                code => return RenderStatus::Failed(code),
            }

            for (i, target) in targets.iter().enumerate() {
                let buffer = buffers.add(i).read();
                let source = buffer.data as *const f32;
                if !source.is_null() && source != *target as *const f32 {
                    let count = (buffer.data_byte_size as usize / std::mem::size_of::<f32>())
                        .min(frames);
                    ptr::copy_nonoverlapping(source, *target, count);
                }
            }
        }
        RenderStatus::Complete
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        // SAFETY: disposed exactly once, guarded by the flag above.
        let status = unsafe { AudioComponentInstanceDispose(self.unit) };
        if status != NO_ERR {
            tracing::debug!("AudioComponentInstanceDispose returned {status}");
        }
    }
}

impl Drop for AudioUnitInstance {
    fn drop(&mut self) {
        self.dispose();
    }
}
