//! Host side of the replicated session: the only writer.
//!
//! Every successful mutation, whether a local intent or an inbound guest
//! message, is followed by a broadcast of the full canonical snapshot.
//! Timer ticks during DESCRIBING go out as lightweight phase signals
//! instead; the next real mutation carries the authoritative state anyway.

use std::time::{Duration, Instant};

use crate::code;
use crate::config::GameConfiguration;
use crate::net::{HostTransport, Message, TransportError};

use super::state::{
    HOST_IDENTITY, Phase, Profile, SessionError, SessionState, TickOutcome,
};

pub struct HostSession {
    transport: HostTransport,
    state: SessionState,
    code: String,
    last_tick: Instant,
    carry: Duration,
}

impl HostSession {
    /// Mint the room code for `configuration` and start hosting under it.
    pub fn open(configuration: GameConfiguration) -> Result<Self, TransportError> {
        let room_code = code::encode(&configuration);
        Self::open_with_code(configuration, room_code)
    }

    /// Host under an already-minted code (rejoin after a crash, tests).
    pub fn open_with_code(
        configuration: GameConfiguration,
        room_code: String,
    ) -> Result<Self, TransportError> {
        let transport = HostTransport::open(&room_code)?;
        let state = SessionState::new(configuration, code::seed(&room_code));
        Ok(Self {
            transport,
            state,
            code: room_code,
            last_tick: Instant::now(),
            carry: Duration::ZERO,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn guest_count(&self) -> usize {
        self.transport.peer_count()
    }

    // --- Local (host UI) intents ---

    pub fn claim_seat(&mut self, seat_index: u8, profile: Profile) -> Result<(), SessionError> {
        self.apply(|s| s.claim_seat(seat_index, HOST_IDENTITY, profile))
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.apply(SessionState::start)
    }

    pub fn mark_ready(&mut self, seat_index: u8) -> Result<(), SessionError> {
        self.apply(|s| s.mark_ready(seat_index))
    }

    pub fn advance_turn(&mut self) -> Result<(), SessionError> {
        self.apply(SessionState::advance_turn)
    }

    pub fn cast_vote(&mut self, voter_seat: u8, target_seat: u8) -> Result<(), SessionError> {
        self.apply(|s| s.cast_vote(voter_seat, target_seat))
    }

    pub fn confirm_elimination(&mut self, target_seat: u8) -> Result<(), SessionError> {
        self.apply(|s| s.confirm_elimination(target_seat))
    }

    pub fn skip_elimination(&mut self) -> Result<(), SessionError> {
        self.apply(SessionState::skip_elimination)
    }

    pub fn white_hat_guess(&mut self, seat_index: u8, guess: &str) -> Result<(), SessionError> {
        self.apply(|s| s.white_hat_guess(seat_index, guess))
    }

    pub fn forfeit_guess(&mut self) -> Result<(), SessionError> {
        self.apply(SessionState::forfeit_guess)
    }

    pub fn proceed(&mut self) -> Result<(), SessionError> {
        self.apply(SessionState::proceed)
    }

    pub fn play_again(&mut self) -> Result<(), SessionError> {
        self.apply(SessionState::play_again)
    }

    // --- Event loop ---

    /// One pump of the event loop: drain guest traffic, dispatch intents,
    /// and run the countdown. Call this frequently; nothing blocks.
    pub fn pump(&mut self) -> Result<(), TransportError> {
        for (peer_id, message) in self.transport.receive()? {
            self.dispatch(peer_id, message);
        }
        self.tick();
        Ok(())
    }

    /// Close all connections and release the room. Safe from any phase,
    /// safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.transport.close();
    }

    fn dispatch(&mut self, peer_id: u32, message: Message) {
        let identity = u64::from(peer_id);
        let result = match message {
            Message::SitRequest {
                seat_index,
                profile,
            } => self.state.claim_seat(seat_index, identity, profile),
            Message::PlayerReady { seat_index } => {
                if !self.seat_owned_by(seat_index, identity) {
                    log::debug!("guest {peer_id} signalled ready for a seat it does not hold");
                    return;
                }
                self.state.mark_ready(seat_index)
            }
            Message::VoteCast {
                voter_seat,
                target_seat,
            } => {
                if !self.seat_owned_by(voter_seat, identity) {
                    log::debug!("guest {peer_id} voted from a seat it does not hold");
                    return;
                }
                self.state.cast_vote(voter_seat, target_seat)
            }
            Message::WhiteHatGuess { seat_index, guess } => {
                if !self.seat_owned_by(seat_index, identity) {
                    log::debug!("guest {peer_id} guessed from a seat it does not hold");
                    return;
                }
                self.state.white_hat_guess(seat_index, &guess)
            }
            Message::SyncState(_) | Message::PhaseChange { .. } => {
                log::warn!("guest {peer_id} sent host-only traffic; ignoring");
                return;
            }
        };

        match result {
            Ok(()) => self.broadcast_state(),
            Err(e) => log::debug!("rejected intent from guest {peer_id}: {e}"),
        }
    }

    fn seat_owned_by(&self, seat_index: u8, identity: u64) -> bool {
        self.state
            .seat(seat_index)
            .is_ok_and(|seat| seat.claimed_by == Some(identity))
    }

    /// Run the mutation; on success broadcast the new canonical snapshot.
    /// Rejections surface to the caller and leave the replicas untouched.
    fn apply(
        &mut self,
        mutate: impl FnOnce(&mut SessionState) -> Result<(), SessionError>,
    ) -> Result<(), SessionError> {
        mutate(&mut self.state)?;
        self.broadcast_state();
        Ok(())
    }

    /// Wall-clock accumulator driving the per-second countdown. Owned by
    /// the Host alone; cleared whenever DESCRIBING is not active.
    fn tick(&mut self) {
        let now = Instant::now();
        self.carry += now - self.last_tick;
        self.last_tick = now;

        while self.carry >= Duration::from_secs(1) {
            self.carry -= Duration::from_secs(1);
            match self.state.tick_second() {
                TickOutcome::Idle => {
                    self.carry = Duration::ZERO;
                    break;
                }
                TickOutcome::Countdown => self.broadcast_timer(),
                TickOutcome::TurnAdvanced => self.broadcast_state(),
            }
        }
    }

    fn broadcast_state(&mut self) {
        let message = Message::SyncState(self.state.clone());
        if let Err(e) = self.transport.broadcast(&message) {
            log::warn!("snapshot broadcast failed: {e}");
        }
    }

    fn broadcast_timer(&mut self) {
        let message = Message::PhaseChange {
            phase: Phase::Describing,
            time_remaining: Some(self.state.time_remaining),
        };
        if let Err(e) = self.transport.broadcast(&message) {
            log::warn!("timer broadcast failed: {e}");
        }
    }
}
