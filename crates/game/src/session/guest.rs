//! Guest side of the replicated session: a read-only replica plus an
//! intent pipe back to the Host.
//!
//! The replica is replaced wholesale by each accepted snapshot; nothing
//! here ever mutates game state locally. Snapshots arrive best-effort and
//! possibly out of order, so application is gated on the snapshot version
//! being strictly newer than the last one applied.

use std::net::IpAddr;

use crate::net::{GuestTransport, Message, TransportError};
use crate::roles::Role;

use super::state::{Phase, Profile, Seat, SessionState};

pub struct GuestSession {
    transport: GuestTransport,
    state: Option<SessionState>,
    last_version: u64,
}

impl GuestSession {
    /// Join the room `code` hosted at `host`. Returns once the Host admits
    /// us; the first snapshot follows on a later [`pump`](Self::pump).
    pub fn join(host: IpAddr, code: &str) -> Result<Self, TransportError> {
        let transport = GuestTransport::join(host, code)?;
        Ok(Self {
            transport,
            state: None,
            last_version: 0,
        })
    }

    /// The current replica, if any snapshot has arrived yet.
    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Our network identity, as assigned by the Host at join time.
    pub fn identity(&self) -> u64 {
        u64::from(self.transport.peer_id())
    }

    /// The seat bound to our identity, once the Host has confirmed a claim.
    pub fn my_seat(&self) -> Option<&Seat> {
        let identity = self.identity();
        self.state
            .as_ref()?
            .seats
            .iter()
            .find(|seat| seat.claimed_by == Some(identity))
    }

    pub fn my_role(&self) -> Option<Role> {
        self.my_seat().map(|seat| seat.role)
    }

    // --- Intents (forwarded; the Host decides, the snapshot answers) ---

    pub fn request_seat(&mut self, seat_index: u8, profile: Profile) -> Result<(), TransportError> {
        self.transport.send(&Message::SitRequest {
            seat_index,
            profile,
        })
    }

    pub fn mark_ready(&mut self, seat_index: u8) -> Result<(), TransportError> {
        self.transport.send(&Message::PlayerReady { seat_index })
    }

    pub fn cast_vote(&mut self, voter_seat: u8, target_seat: u8) -> Result<(), TransportError> {
        self.transport.send(&Message::VoteCast {
            voter_seat,
            target_seat,
        })
    }

    pub fn white_hat_guess(&mut self, seat_index: u8, guess: &str) -> Result<(), TransportError> {
        self.transport.send(&Message::WhiteHatGuess {
            seat_index,
            guess: guess.to_string(),
        })
    }

    /// Drain Host traffic into the replica. Returns whether anything the
    /// caller renders from changed.
    pub fn pump(&mut self) -> Result<bool, TransportError> {
        let mut changed = false;
        for message in self.transport.receive()? {
            match message {
                Message::SyncState(snapshot) => {
                    changed |= apply_snapshot(&mut self.state, &mut self.last_version, snapshot);
                }
                Message::PhaseChange {
                    phase,
                    time_remaining,
                } => {
                    changed |= apply_phase_signal(&mut self.state, phase, time_remaining);
                }
                other => {
                    log::warn!("host relayed a guest-only message: {other:?}");
                }
            }
        }
        Ok(changed)
    }

    /// Announce departure and drop the link. Idempotent.
    pub fn leave(&mut self) {
        self.transport.leave();
    }
}

/// Replace the replica if the snapshot is strictly newer. Duplicates and
/// stale reorderings are no-ops, so replaying a snapshot cannot regress
/// the replica.
fn apply_snapshot(
    replica: &mut Option<SessionState>,
    last_version: &mut u64,
    snapshot: SessionState,
) -> bool {
    if snapshot.version <= *last_version {
        log::debug!(
            "discarding snapshot v{} (replica at v{})",
            snapshot.version,
            last_version
        );
        return false;
    }
    *last_version = snapshot.version;
    *replica = Some(snapshot);
    true
}

/// Timer signals are shallow: they only touch `time_remaining`, and only
/// while the replica agrees on the phase. A signal racing a snapshot from
/// a different phase is dropped rather than misapplied.
fn apply_phase_signal(
    replica: &mut Option<SessionState>,
    phase: Phase,
    time_remaining: Option<u16>,
) -> bool {
    let Some(state) = replica.as_mut() else {
        return false;
    };
    if state.phase != phase {
        return false;
    }
    match time_remaining {
        Some(remaining) if state.time_remaining != remaining => {
            state.time_remaining = remaining;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfiguration;

    fn snapshot(version: u64) -> SessionState {
        let config = GameConfiguration {
            topic_label: "Animals".into(),
            civilian_word: "Cat".into(),
            outsider_word: None,
            total_players: 5,
            liar_count: 1,
            white_hat_count: 0,
            created_at: 0,
        };
        let mut state = SessionState::new(config, 24_683);
        state.version = version;
        state
    }

    #[test]
    fn test_snapshot_application_is_idempotent() {
        let mut replica = None;
        let mut last_version = 0;
        assert!(apply_snapshot(&mut replica, &mut last_version, snapshot(3)));
        let before = replica.clone();
        assert!(!apply_snapshot(&mut replica, &mut last_version, snapshot(3)));
        assert_eq!(replica, before);
    }

    #[test]
    fn test_stale_snapshot_discarded() {
        let mut replica = None;
        let mut last_version = 0;
        assert!(apply_snapshot(&mut replica, &mut last_version, snapshot(5)));
        assert!(!apply_snapshot(&mut replica, &mut last_version, snapshot(4)));
        assert_eq!(replica.as_ref().unwrap().version, 5);
        assert!(apply_snapshot(&mut replica, &mut last_version, snapshot(6)));
    }

    #[test]
    fn test_phase_signal_requires_matching_phase() {
        let mut replica = Some(snapshot(1));
        assert!(!apply_phase_signal(
            &mut replica,
            Phase::Describing,
            Some(30)
        ));

        replica.as_mut().unwrap().phase = Phase::Describing;
        replica.as_mut().unwrap().time_remaining = 45;
        assert!(apply_phase_signal(&mut replica, Phase::Describing, Some(30)));
        assert_eq!(replica.as_ref().unwrap().time_remaining, 30);
    }

    #[test]
    fn test_phase_signal_without_replica_is_noop() {
        let mut replica: Option<SessionState> = None;
        assert!(!apply_phase_signal(&mut replica, Phase::Lobby, Some(10)));
    }
}
