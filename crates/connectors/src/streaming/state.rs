use crate::streaming::error::ChannelError;
use std::fmt;

/// Lifecycle of a channel handle: `Unopened -> Open -> Closed`, forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unopened,
    Open,
    Closed,
}

impl ChannelState {
    pub fn can_transition_to(self, next: ChannelState) -> bool {
        use ChannelState::*;
        matches!(
            (self, next),
            (Unopened, Open) | (Open, Closed) | (Unopened, Closed)
        )
    }

    /// Applies `next` if it is a forward transition. Returns whether the
    /// state changed, so repeated closes are no-ops.
    pub fn advance(&mut self, next: ChannelState) -> bool {
        if self.can_transition_to(next) {
            *self = next;
            true
        } else {
            false
        }
    }

    pub fn ensure_open(self, channel: &str) -> Result<(), ChannelError> {
        if self == ChannelState::Open {
            Ok(())
        } else {
            Err(ChannelError::InvalidState {
                channel: channel.to_string(),
                state: self,
            })
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelState::Unopened => "UNOPENED",
            ChannelState::Open => "OPEN",
            ChannelState::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_forward_transitions_apply() {
        let mut state = ChannelState::Unopened;
        assert!(state.advance(ChannelState::Open));
        assert!(state.advance(ChannelState::Closed));
        assert!(!state.advance(ChannelState::Open));
        assert!(!state.advance(ChannelState::Closed));
        assert_eq!(state, ChannelState::Closed);
    }

    #[test]
    fn ensure_open_rejects_other_states() {
        assert!(ChannelState::Open.ensure_open("c").is_ok());
        assert!(matches!(
            ChannelState::Closed.ensure_open("c"),
            Err(ChannelError::InvalidState {
                state: ChannelState::Closed,
                ..
            })
        ));
        assert!(ChannelState::Unopened.ensure_open("c").is_err());
    }
}
