//! Deterministic seeded role assignment.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};

use crate::config::GameConfiguration;
use crate::rng::SeededRng;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum Role {
    /// Knows the true secret word.
    Civilian,
    /// Does not know the word; must blend in while describing it.
    Liar,
    /// Holds a different word; wins outright by guessing the civilian word.
    WhiteHat,
}

impl Role {
    /// Liars and white hats count toward the bad-guys faction.
    pub fn is_bad(self) -> bool {
        matches!(self, Role::Liar | Role::WhiteHat)
    }
}

/// One role per seat index, fully determined by `(config, seed)`.
///
/// This is the linchpin of serverless secret distribution: every device
/// derives the same mapping locally, so roles never have to cross the wire.
/// Callers must validate the configuration first; an oversubscribed role
/// count is a [`crate::config::ConfigurationError`], not this function's
/// concern.
pub fn assign(config: &GameConfiguration, seed: u32) -> Vec<Role> {
    let total = config.total_players as usize;
    let mut roles = Vec::with_capacity(total);
    roles.resize(config.liar_count as usize, Role::Liar);
    roles.resize(roles.len() + config.white_hat_count as usize, Role::WhiteHat);
    roles.resize(total, Role::Civilian);

    SeededRng::new(seed).shuffle_in_place(&mut roles);
    roles
}
