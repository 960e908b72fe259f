//! Game configuration record and its validation boundary.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

pub const MIN_PLAYERS: u8 = 3;
pub const MAX_PLAYERS: u8 = 20;

/// Immutable per-room configuration. Created once by the Host; the room code
/// is its serialization.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct GameConfiguration {
    pub topic_label: String,
    pub civilian_word: String,
    /// Alternate secret word for the white hat, when one is in play.
    pub outsider_word: Option<String>,
    pub total_players: u8,
    pub liar_count: u8,
    pub white_hat_count: u8,
    /// Unix millis at room creation. Not packed by the numeric code path.
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("player count {0} outside accepted range {MIN_PLAYERS}..={MAX_PLAYERS}")]
    PlayerCountOutOfRange(u8),
    #[error("need at least one liar")]
    NoLiars,
    #[error("{liars} liars + {white_hats} white hats must stay below {players} players")]
    TooManySpecialRoles {
        liars: u8,
        white_hats: u8,
        players: u8,
    },
    #[error("outsider word must differ from the civilian word")]
    OutsiderWordMatches,
}

impl GameConfiguration {
    /// Gate checked before encoding a code and before the LOBBY -> REVEAL
    /// transition. Violations surface inline; nothing here is fatal.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.total_players) {
            return Err(ConfigurationError::PlayerCountOutOfRange(
                self.total_players,
            ));
        }
        if self.liar_count == 0 {
            return Err(ConfigurationError::NoLiars);
        }
        if self.liar_count as u16 + self.white_hat_count as u16 >= self.total_players as u16 {
            return Err(ConfigurationError::TooManySpecialRoles {
                liars: self.liar_count,
                white_hats: self.white_hat_count,
                players: self.total_players,
            });
        }
        if self
            .outsider_word
            .as_deref()
            .is_some_and(|w| w == self.civilian_word)
        {
            return Err(ConfigurationError::OutsiderWordMatches);
        }
        Ok(())
    }

    pub fn civilian_count(&self) -> u8 {
        self.total_players - self.liar_count - self.white_hat_count
    }
}
