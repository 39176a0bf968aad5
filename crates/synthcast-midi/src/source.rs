//! Connections to every MIDI input source.

use crate::dispatcher::ControlEventDispatcher;
use crate::error::Result;
use midir::{MidiInput, MidiInputConnection};
use synthcast_core::ControlEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiSource {
    pub index: usize,
    pub name: String,
}

/// Every input source the platform reports at startup.
pub fn list_sources(client_name: &str) -> Result<Vec<MidiSource>> {
    let midi_input = MidiInput::new(client_name)?;
    Ok(midi_input
        .ports()
        .iter()
        .enumerate()
        .map(|(index, port)| MidiSource {
            index,
            name: midi_input
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Source {}", index)),
        })
        .collect())
}

/// Live connections to all input sources, each forwarding to the same dispatcher.
pub struct ControlEventSource {
    dispatcher: ControlEventDispatcher,
    connections: Vec<(MidiSource, MidiInputConnection<()>)>,
}

impl ControlEventSource {
    /// Connect every available source.
    ///
    /// Fails only if the MIDI client cannot be created. A source that cannot be
    /// connected is logged and skipped; zero sources is not an error.
    pub fn connect_all<F>(client_name: &str, deliver: F) -> Result<Self>
    where
        F: Fn(ControlEvent) + Send + Sync + 'static,
    {
        Self::connect_with(client_name, ControlEventDispatcher::new(deliver))
    }

    pub fn connect_with(client_name: &str, dispatcher: ControlEventDispatcher) -> Result<Self> {
        let sources = list_sources(client_name)?;
        tracing::info!("Found {} MIDI sources", sources.len());

        let mut connections = Vec::with_capacity(sources.len());
        for source in sources {
            match Self::connect_source(client_name, &source, dispatcher.clone()) {
                Ok(connection) => {
                    tracing::info!("Connected to MIDI source: {}", source.name);
                    connections.push((source, connection));
                }
                Err(e) => {
                    tracing::warn!("Skipping MIDI source {}: {}", source.name, e);
                }
            }
        }

        Ok(Self {
            dispatcher,
            connections,
        })
    }

    fn connect_source(
        client_name: &str,
        source: &MidiSource,
        dispatcher: ControlEventDispatcher,
    ) -> Result<MidiInputConnection<()>> {
        // midir consumes the client on connect, so each source gets its own.
        let midi_input = MidiInput::new(client_name)?;
        let ports = midi_input.ports();
        let port = ports.get(source.index).ok_or_else(|| {
            crate::error::MidiError::Port(format!("MIDI source {} disappeared", source.name))
        })?;

        let connection = midi_input.connect(
            port,
            &format!("{client_name}-in-{}", source.index),
            move |_timestamp, message, _| {
                dispatcher.dispatch_packet(message);
            },
            (),
        )?;
        Ok(connection)
    }

    pub fn sources(&self) -> impl Iterator<Item = &MidiSource> {
        self.connections.iter().map(|(source, _)| source)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn dispatcher(&self) -> &ControlEventDispatcher {
        &self.dispatcher
    }

    /// Disconnect every source. Idempotent.
    pub fn close(&mut self) {
        for (source, connection) in self.connections.drain(..) {
            connection.close();
            tracing::debug!("Disconnected MIDI source: {}", source.name);
        }
    }
}

impl Drop for ControlEventSource {
    fn drop(&mut self) {
        self.close();
    }
}
