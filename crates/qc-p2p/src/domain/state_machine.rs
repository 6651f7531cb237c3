//! Per-peer connection state machine (spec.md §4.9):
//! `Disconnected -> Connecting -> Connected -> Handshaking -> Active ->
//! Disconnecting -> Disconnected`, plus an absorbing `Banned` state
//! reachable from anywhere.

use shared_types::PeerState;

use super::errors::P2pError;

/// Events that drive the per-peer state machine forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerEvent {
    /// Outbound dial initiated, or an inbound connection accepted.
    Connect,
    /// Transport-level connection established.
    TransportEstablished,
    /// `HELLO` sent or received; handshake now in progress.
    BeginHandshake,
    /// Handshake validated (network id matches, not a self-connection).
    HandshakeAccepted,
    /// Local or remote side is tearing the connection down.
    Disconnect,
    /// Teardown complete.
    Disconnected,
    /// Reputation crossed the ban threshold, or a protocol violation was
    /// severe enough to ban outright.
    Ban,
}

/// Compute the next state for `current` given `event`, or reject the
/// transition if it does not correspond to an edge in the machine. `Ban`
/// is reachable from every non-banned state; every other edge is linear.
pub fn next_state(current: PeerState, event: PeerEvent) -> Result<PeerState, P2pError> {
    use PeerEvent as E;
    use PeerState as S;

    if current == S::Banned {
        return Err(P2pError::InvalidTransition { from: current, event });
    }
    if event == E::Ban {
        return Ok(S::Banned);
    }

    match (current, event) {
        (S::Disconnected, E::Connect) => Ok(S::Connecting),
        (S::Connecting, E::TransportEstablished) => Ok(S::Connected),
        (S::Connected, E::BeginHandshake) => Ok(S::Handshaking),
        (S::Handshaking, E::HandshakeAccepted) => Ok(S::Active),
        (S::Active, E::Disconnect) => Ok(S::Disconnecting),
        (S::Connecting | S::Connected | S::Handshaking, E::Disconnect) => Ok(S::Disconnecting),
        (S::Disconnecting, E::Disconnected) => Ok(S::Disconnected),
        _ => Err(P2pError::InvalidTransition { from: current, event }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::PeerState as S;

    #[test]
    fn happy_path_reaches_active() {
        let mut state = S::Disconnected;
        for event in [PeerEvent::Connect, PeerEvent::TransportEstablished, PeerEvent::BeginHandshake, PeerEvent::HandshakeAccepted] {
            state = next_state(state, event).unwrap();
        }
        assert_eq!(state, S::Active);
    }

    #[test]
    fn active_tears_down_through_disconnecting() {
        let state = next_state(S::Active, PeerEvent::Disconnect).unwrap();
        assert_eq!(state, S::Disconnecting);
        let state = next_state(state, PeerEvent::Disconnected).unwrap();
        assert_eq!(state, S::Disconnected);
    }

    #[test]
    fn ban_is_reachable_from_any_live_state() {
        for state in [S::Disconnected, S::Connecting, S::Connected, S::Handshaking, S::Active, S::Disconnecting] {
            assert_eq!(next_state(state, PeerEvent::Ban).unwrap(), S::Banned);
        }
    }

    #[test]
    fn banned_is_absorbing() {
        assert!(next_state(S::Banned, PeerEvent::Connect).is_err());
    }

    #[test]
    fn skipping_handshake_is_rejected() {
        assert!(next_state(S::Connected, PeerEvent::HandshakeAccepted).is_err());
    }
}
