use crate::integration::orchestrator::{SessionCommand, SessionEvent};
use crate::remote::RemoteEvent;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

/// Channels owned by one voice session.
///
/// Remote events and session events are unbounded so neither an audio delta
/// nor a state change is ever dropped. Commands are bounded.
pub struct SessionChannels {
    pub remote_tx: Sender<RemoteEvent>,
    pub remote_rx: Receiver<RemoteEvent>,
    pub event_tx: Sender<SessionEvent>,
    pub event_rx: Receiver<SessionEvent>,
    pub command_tx: Sender<SessionCommand>,
    pub command_rx: Receiver<SessionCommand>,
}

impl SessionChannels {
    pub fn new(command_buffer: usize) -> Self {
        let (remote_tx, remote_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let (command_tx, command_rx) = bounded(command_buffer);

        Self {
            remote_tx,
            remote_rx,
            event_tx,
            event_rx,
            command_tx,
            command_rx,
        }
    }
}

impl Default for SessionChannels {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_commands_are_bounded() {
        let channels = SessionChannels::new(1);
        for _ in 0..500 {
            assert!(channels.event_tx.try_send(SessionEvent::Connected).is_ok());
        }
        assert!(channels.event_tx.capacity().is_none());
        assert!(channels.remote_tx.capacity().is_none());

        assert!(channels.command_tx.try_send(SessionCommand::Connect).is_ok());
        assert!(channels.command_tx.try_send(SessionCommand::Connect).is_err());
    }
}
