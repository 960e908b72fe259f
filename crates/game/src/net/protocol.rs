//! Wire protocol: packet framing and the message envelope.
//!
//! Every datagram is one rkyv-serialized [`Packet`]. The header carries a
//! per-connection sequence so receivers can drop duplicates and stale
//! packets; there is no ack machinery because delivery is best-effort
//! at-most-once and snapshots are total.

use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::session::{Phase, Profile, SessionState};

pub const MAX_PACKET_SIZE: usize = 8192;
pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_MAGIC: u32 = 0x574C_4952; // "WLIR"

const SEQUENCE_WRAP_THRESHOLD: u32 = u32::MAX / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct PacketHeader {
    pub magic: u32,
    pub version: u32,
    /// Per-connection send counter, wrapping.
    pub sequence: u32,
}

impl PacketHeader {
    pub fn new(sequence: u32) -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            sequence,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC && self.version == PROTOCOL_VERSION
    }
}

/// Wrap-safe `s1 > s2` over the sequence space.
#[inline]
pub fn sequence_newer(s1: u32, s2: u32) -> bool {
    ((s1 > s2) && (s1 - s2 <= SEQUENCE_WRAP_THRESHOLD))
        || ((s1 < s2) && (s2 - s1 > SEQUENCE_WRAP_THRESHOLD))
}

/// Game-level intents and replication traffic. One concrete payload shape
/// per variant; handlers dispatch by exhaustive match.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum Message {
    /// Guest -> Host: claim a seat for the sender's identity.
    SitRequest { seat_index: u8, profile: Profile },
    /// Guest -> Host: the seat holder has viewed its role.
    PlayerReady { seat_index: u8 },
    /// Guest -> Host: standing elimination vote.
    VoteCast { voter_seat: u8, target_seat: u8 },
    /// Guest -> Host: white-hat word guess (proactive or last-chance).
    WhiteHatGuess { seat_index: u8, guess: String },
    /// Host -> Guests: full canonical snapshot; replaces the replica.
    SyncState(SessionState),
    /// Host -> Guests: lightweight signal when a full snapshot is
    /// overkill (per-second timer ticks).
    PhaseChange {
        phase: Phase,
        time_remaining: Option<u16>,
    },
}

/// Transport-level traffic wrapping [`Message`].
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum Payload {
    /// Guest -> Host: open a connection to the room.
    JoinRequest,
    /// Host -> Guest: connection admitted under `peer_id`.
    JoinAccept { peer_id: u32 },
    /// Host -> Guest: connection refused.
    JoinDeny { reason: String },
    /// Either direction: the peer is going away.
    Leave,
    /// Keepalive probe and its echo; keeps the timeout sweep honest.
    Ping { timestamp_ms: u64 },
    Pong { timestamp_ms: u64 },
    Game(Message),
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Payload,
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl Packet {
    pub fn new(header: PacketHeader, payload: Payload) -> Self {
        Self { header, payload }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, PacketError> {
        rkyv::from_bytes::<Self, rancor::Error>(data).map_err(PacketError::Deserialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfiguration;

    #[test]
    fn test_sequence_comparison() {
        assert!(sequence_newer(2, 1));
        assert!(!sequence_newer(1, 2));
        assert!(!sequence_newer(5, 5));
        assert!(sequence_newer(0, u32::MAX));
        assert!(!sequence_newer(u32::MAX, 0));
    }

    #[test]
    fn test_header_validation() {
        let header = PacketHeader::new(7);
        assert!(header.is_valid());
        let stale = PacketHeader {
            version: PROTOCOL_VERSION + 1,
            ..header
        };
        assert!(!stale.is_valid());
    }

    #[test]
    fn test_packet_roundtrip() {
        let packet = Packet::new(
            PacketHeader::new(1),
            Payload::Game(Message::VoteCast {
                voter_seat: 2,
                target_seat: 5,
            }),
        );
        let bytes = packet.serialize().unwrap();
        let decoded = Packet::deserialize(&bytes).unwrap();
        assert_eq!(packet.header, decoded.header);
        match decoded.payload {
            Payload::Game(Message::VoteCast {
                voter_seat,
                target_seat,
            }) => {
                assert_eq!((voter_seat, target_seat), (2, 5));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_snapshot_fits_mtu() {
        let config = GameConfiguration {
            topic_label: "Nature & Weather".into(),
            civilian_word: "Thunderstorm".into(),
            outsider_word: Some("Hailstorm".into()),
            total_players: 20,
            liar_count: 3,
            white_hat_count: 1,
            created_at: u64::MAX,
        };
        let mut state = crate::session::SessionState::new(config, u32::MAX);
        for i in 0..20u8 {
            state
                .claim_seat(
                    i,
                    u64::from(i) + 1,
                    Profile {
                        display_name: format!("player-with-a-long-name-{i}"),
                        avatar_token: "🐲".into(),
                    },
                )
                .unwrap();
        }
        let packet = Packet::new(
            PacketHeader::new(0),
            Payload::Game(Message::SyncState(state)),
        );
        let bytes = packet.serialize().unwrap();
        assert!(bytes.len() <= MAX_PACKET_SIZE, "snapshot is {} bytes", bytes.len());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Packet::deserialize(&[0u8; 16]).is_err());
        assert!(Packet::deserialize(b"not a packet").is_err());
    }
}
