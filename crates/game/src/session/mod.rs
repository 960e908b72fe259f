//! Replicated session: the Host's canonical phase machine and the Guest's
//! snapshot-fed replica.

mod guest;
mod host;
mod state;

pub use guest::GuestSession;
pub use host::HostSession;
pub use state::{
    DESCRIBE_SECONDS, Elimination, HOST_IDENTITY, Phase, Profile, Seat, SeatStatus, SessionError,
    SessionState, TickOutcome, Winner, compute_turn_order,
};
