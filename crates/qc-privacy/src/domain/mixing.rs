//! Mixing coordinator session state machine:
//! `Created -> Registration -> Verification -> Signing -> Completed`,
//! plus an absorbing `Failed` state reachable from anywhere via a
//! timeout or an explicit abort.

use std::time::Duration;

use shared_types::FixedPoint;

use super::errors::PrivacyError;

/// A mixing session's lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixingPhase {
    /// Session exists with a fixed denomination; waiting for its first
    /// participant.
    Created,
    /// Participants are registering input commitments; advances once
    /// `min_participants` have joined.
    Registration,
    /// All registered participants' input commitments are being checked
    /// against the session's denomination before any signing happens.
    Verification,
    /// The coordinator is blind-signing each participant's output token.
    Signing,
    /// Every participant has an unblinded, verified output signature.
    Completed,
    /// The session timed out in some phase, or was aborted; registered
    /// funds remain unspent and participants must resubmit elsewhere.
    Failed,
}

/// Events that drive a mixing session forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixingEvent {
    /// A participant registered an input commitment.
    ParticipantRegistered { total_registered: usize },
    /// Every registered participant's commitment matched the session
    /// denomination.
    AllCommitmentsVerified,
    /// Every registered participant's output token has been unblinded
    /// and verified.
    AllSignaturesIssued,
    /// The current phase's deadline passed without the above event.
    Timeout,
    /// An operator or participant aborted the session outright.
    Abort,
}

/// Compute the next phase for `current` given `event`, or reject the
/// transition. `Timeout` and `Abort` are reachable from every live phase;
/// every other edge is linear and gated on `min_participants`.
pub fn next_phase(current: MixingPhase, event: MixingEvent, min_participants: usize) -> Result<MixingPhase, PrivacyError> {
    use MixingEvent as E;
    use MixingPhase as P;

    if current == P::Completed || current == P::Failed {
        return Err(invalid(current, event));
    }
    if matches!(event, E::Timeout | E::Abort) {
        return Ok(P::Failed);
    }

    match (current, event) {
        (P::Created, E::ParticipantRegistered { .. }) => Ok(P::Registration),
        (P::Registration, E::ParticipantRegistered { total_registered }) => {
            if total_registered >= min_participants {
                Ok(P::Verification)
            } else {
                Ok(P::Registration)
            }
        }
        (P::Verification, E::AllCommitmentsVerified) => Ok(P::Signing),
        (P::Signing, E::AllSignaturesIssued) => Ok(P::Completed),
        _ => Err(invalid(current, event)),
    }
}

fn invalid(current: MixingPhase, event: MixingEvent) -> PrivacyError {
    PrivacyError::Mixing(format!("no transition from {current:?} on {event:?}"))
}

/// Per-phase deadlines; a session stuck past its current phase's
/// deadline is timed out by the caller driving the session forward.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTimeouts {
    pub registration: Duration,
    pub verification: Duration,
    pub signing: Duration,
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        Self {
            registration: Duration::from_secs(300),
            verification: Duration::from_secs(60),
            signing: Duration::from_secs(120),
        }
    }
}

impl PhaseTimeouts {
    #[must_use]
    pub fn for_phase(&self, phase: MixingPhase) -> Option<Duration> {
        match phase {
            MixingPhase::Registration => Some(self.registration),
            MixingPhase::Verification => Some(self.verification),
            MixingPhase::Signing => Some(self.signing),
            MixingPhase::Created | MixingPhase::Completed | MixingPhase::Failed => None,
        }
    }
}

/// A fixed-denomination mixing session's bookkeeping. Pure domain state;
/// the enclosing service owns wall-clock timestamps and persistence.
#[derive(Debug, Clone)]
pub struct MixingSession {
    pub denomination: FixedPoint,
    pub min_participants: usize,
    pub phase: MixingPhase,
}

impl MixingSession {
    #[must_use]
    pub fn new(denomination: FixedPoint, min_participants: usize) -> Self {
        Self { denomination, min_participants, phase: MixingPhase::Created }
    }

    pub fn apply(&mut self, event: MixingEvent) -> Result<MixingPhase, PrivacyError> {
        self.phase = next_phase(self.phase, event, self.min_participants)?;
        Ok(self.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_advances_past_registration_once_minimum_is_met() {
        let mut session = MixingSession::new(FixedPoint::from_base_units(100_000_000), 3);
        assert_eq!(session.apply(MixingEvent::ParticipantRegistered { total_registered: 1 }).unwrap(), MixingPhase::Registration);
        assert_eq!(session.apply(MixingEvent::ParticipantRegistered { total_registered: 2 }).unwrap(), MixingPhase::Registration);
        assert_eq!(session.apply(MixingEvent::ParticipantRegistered { total_registered: 3 }).unwrap(), MixingPhase::Verification);
    }

    #[test]
    fn full_happy_path_reaches_completed() {
        let mut session = MixingSession::new(FixedPoint::from_base_units(1), 2);
        session.apply(MixingEvent::ParticipantRegistered { total_registered: 1 }).unwrap();
        session.apply(MixingEvent::ParticipantRegistered { total_registered: 2 }).unwrap();
        session.apply(MixingEvent::AllCommitmentsVerified).unwrap();
        let phase = session.apply(MixingEvent::AllSignaturesIssued).unwrap();
        assert_eq!(phase, MixingPhase::Completed);
    }

    #[test]
    fn timeout_is_reachable_from_every_live_phase() {
        for phase in [MixingPhase::Created, MixingPhase::Registration, MixingPhase::Verification, MixingPhase::Signing] {
            assert_eq!(next_phase(phase, MixingEvent::Timeout, 2).unwrap(), MixingPhase::Failed);
        }
    }

    #[test]
    fn failed_is_absorbing() {
        assert!(next_phase(MixingPhase::Failed, MixingEvent::ParticipantRegistered { total_registered: 1 }, 2).is_err());
    }

    #[test]
    fn skipping_verification_is_rejected() {
        assert!(next_phase(MixingPhase::Registration, MixingEvent::AllSignaturesIssued, 2).is_err());
    }
}
