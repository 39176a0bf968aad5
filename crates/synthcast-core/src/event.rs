//! Performance control events and packet unpacking.
//!
//! Packets arrive from the platform as raw byte runs that may hold several
//! messages, running status and interleaved real-time bytes. Only 3-byte
//! channel messages are turned into [`ControlEvent`]s; everything else is
//! stepped over without allocating.

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;
const REALTIME_FIRST: u8 = 0xF8;

/// One status/data1/data2 control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlEvent {
    status: u8,
    data1: u8,
    data2: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    Other,
}

impl ControlEvent {
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
        }
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.status
    }

    #[inline]
    pub fn data1(&self) -> u8 {
        self.data1
    }

    #[inline]
    pub fn data2(&self) -> u8 {
        self.data2
    }

    /// Low nibble of the status byte (0-15).
    #[inline]
    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }

    /// A note-on with velocity 0 is a note-off.
    pub fn kind(&self) -> EventKind {
        let channel = self.channel();
        match self.status & 0xF0 {
            NOTE_ON if self.data2 > 0 => EventKind::NoteOn {
                channel,
                note: self.data1,
                velocity: self.data2,
            },
            NOTE_ON | NOTE_OFF => EventKind::NoteOff {
                channel,
                note: self.data1,
                velocity: self.data2,
            },
            _ => EventKind::Other,
        }
    }
}

/// Total length in bytes (status included) of the message a status byte starts.
///
/// `None` for SysEx, whose length is only known from its terminator.
pub const fn message_len(status: u8) -> Option<usize> {
    match status {
        0x80..=0xBF | 0xE0..=0xEF => Some(3),
        0xC0..=0xDF => Some(2),
        SYSEX_START => None,
        0xF1 | 0xF3 => Some(2),
        0xF2 => Some(3),
        _ => Some(1),
    }
}

/// Iterate the 3-byte messages packed in `bytes`.
pub fn unpack_packet(bytes: &[u8]) -> PacketEvents<'_> {
    PacketEvents {
        bytes,
        pos: 0,
        running: None,
        in_sysex: false,
    }
}

/// Iterator returned by [`unpack_packet`].
#[derive(Debug, Clone)]
pub struct PacketEvents<'a> {
    bytes: &'a [u8],
    pos: usize,
    running: Option<u8>,
    in_sysex: bool,
}

impl Iterator for PacketEvents<'_> {
    type Item = ControlEvent;

    fn next(&mut self) -> Option<ControlEvent> {
        while self.pos < self.bytes.len() {
            let byte = self.bytes[self.pos];

            // Real-time bytes may appear anywhere, even inside other messages.
            if byte >= REALTIME_FIRST {
                self.pos += 1;
                continue;
            }

            if self.in_sysex {
                if byte & 0x80 == 0 || byte == SYSEX_END {
                    self.pos += 1;
                }
                // Any status byte terminates the exclusive.
                if byte & 0x80 != 0 {
                    self.in_sysex = false;
                }
                continue;
            }

            let status = if byte & 0x80 != 0 {
                self.pos += 1;
                match byte {
                    SYSEX_START => {
                        self.in_sysex = true;
                        self.running = None;
                        continue;
                    }
                    0xF1..=0xF7 => self.running = None,
                    _ => self.running = Some(byte),
                }
                byte
            } else {
                match self.running {
                    Some(status) => status,
                    None => {
                        // Stray data byte.
                        self.pos += 1;
                        continue;
                    }
                }
            };

            let Some(len) = message_len(status) else {
                continue;
            };

            let mut data = [0u8; 2];
            let mut filled = 0;
            let mut interrupted = false;
            while filled < len - 1 {
                let Some(&b) = self.bytes.get(self.pos) else {
                    // Truncated message.
                    return None;
                };
                if b >= REALTIME_FIRST {
                    self.pos += 1;
                    continue;
                }
                if b & 0x80 != 0 {
                    // Resume at the interrupting status byte.
                    interrupted = true;
                    break;
                }
                data[filled] = b;
                filled += 1;
                self.pos += 1;
            }

            if !interrupted && len == 3 {
                return Some(ControlEvent::new(status, data[0], data[1]));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpack(bytes: &[u8]) -> Vec<[u8; 3]> {
        unpack_packet(bytes).map(|e| e.to_bytes()).collect()
    }

    #[test]
    fn test_single_note_on() {
        assert_eq!(unpack(&[0x90, 60, 100]), vec![[0x90, 60, 100]]);
    }

    #[test]
    fn test_running_status() {
        assert_eq!(
            unpack(&[0x91, 60, 100, 64, 90, 67, 0]),
            vec![[0x91, 60, 100], [0x91, 64, 90], [0x91, 67, 0]]
        );
    }

    #[test]
    fn test_two_byte_messages_are_skipped() {
        // Program change, channel pressure, then a CC.
        assert_eq!(
            unpack(&[0xC0, 5, 0xD0, 70, 0xB0, 7, 100]),
            vec![[0xB0, 7, 100]]
        );
    }

    #[test]
    fn test_realtime_inside_message() {
        assert_eq!(unpack(&[0x90, 0xF8, 60, 100]), vec![[0x90, 60, 100]]);
        assert_eq!(unpack(&[0xFE, 0x80, 60, 0, 0xFA]), vec![[0x80, 60, 0]]);
    }

    #[test]
    fn test_realtime_between_data_bytes() {
        assert_eq!(unpack(&[0x90, 60, 0xF8, 100]), vec![[0x90, 60, 100]]);
        assert_eq!(
            unpack(&[0x90, 60, 0xF8, 100, 64, 90]),
            vec![[0x90, 60, 100], [0x90, 64, 90]]
        );
        // Running status survives a clock byte between messages too.
        assert_eq!(
            unpack(&[0x80, 60, 0, 0xFE, 64, 0xF8, 0xF8, 0]),
            vec![[0x80, 60, 0], [0x80, 64, 0]]
        );
    }

    #[test]
    fn test_status_byte_interrupts_message() {
        // The note-on is abandoned; the CC that cut it short is kept.
        assert_eq!(unpack(&[0x90, 60, 0xB0, 7, 100]), vec![[0xB0, 7, 100]]);
        assert!(unpack(&[0x90, 60, 0xF8]).is_empty());
    }

    #[test]
    fn test_sysex_is_skipped() {
        assert_eq!(
            unpack(&[0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7, 0x80, 60, 0]),
            vec![[0x80, 60, 0]]
        );
        // Unterminated exclusive cut short by a status byte.
        assert_eq!(unpack(&[0xF0, 0x01, 0x02, 0x90, 60, 1]), vec![[0x90, 60, 1]]);
    }

    #[test]
    fn test_system_common_cancels_running_status() {
        // Song position (3 bytes) is forwarded, then the stray data is ignored.
        assert_eq!(unpack(&[0xF2, 1, 2, 60, 100]), vec![[0xF2, 1, 2]]);
    }

    #[test]
    fn test_truncated_and_stray() {
        assert!(unpack(&[0x90, 60]).is_empty());
        assert!(unpack(&[60, 100]).is_empty());
        assert!(unpack(&[]).is_empty());
    }

    #[test]
    fn test_kind() {
        assert_eq!(
            ControlEvent::new(0x92, 60, 100).kind(),
            EventKind::NoteOn {
                channel: 2,
                note: 60,
                velocity: 100
            }
        );
        assert_eq!(
            ControlEvent::new(0x90, 60, 0).kind(),
            EventKind::NoteOff {
                channel: 0,
                note: 60,
                velocity: 0
            }
        );
        assert_eq!(ControlEvent::new(0xB0, 7, 1).kind(), EventKind::Other);
    }

    #[test]
    fn test_message_len() {
        assert_eq!(message_len(0x90), Some(3));
        assert_eq!(message_len(0xC5), Some(2));
        assert_eq!(message_len(0xF0), None);
        assert_eq!(message_len(0xF6), Some(1));
    }
}
