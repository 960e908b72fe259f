pub mod catalogue;
pub mod code;
pub mod config;
pub mod net;
pub mod rng;
pub mod roles;
pub mod session;
pub mod words;

pub use code::DecodeError;
pub use config::{ConfigurationError, GameConfiguration, MAX_PLAYERS, MIN_PLAYERS};
pub use net::{
    GuestTransport, HostTransport, Message, Packet, PacketError, PacketHeader, Payload,
    TransportError, room_port,
};
pub use rng::{SeededRng, entropy_seed, hash_seed, round_seed};
pub use roles::Role;
pub use session::{
    DESCRIBE_SECONDS, Elimination, GuestSession, HostSession, Phase, Profile, Seat, SeatStatus,
    SessionError, SessionState, TickOutcome, Winner,
};
pub use words::{
    ExternalServiceError, ProfileStore, WordSource, WordSuggestion, pick_with_fallback,
};
