//! Room-code codec: a configuration's reversible short-token form.
//!
//! Two shapes exist. Configurations drawn entirely from the fixed catalogue
//! pack into a 5-digit numeric token by mixed-radix arithmetic; anything
//! else (custom topic, AI-sourced word, outsider word) serializes whole as
//! JSON and rides through url-safe base64. The code doubles as the seed for
//! role assignment, so both forms must decode bit-identically everywhere.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::catalogue::{self, WORDS_PER_TOPIC};
use crate::config::GameConfiguration;
use crate::rng::hash_seed;

/// Numeric-path field ranges. The packed product must fit [`CODE_DIGITS`]
/// decimal digits after the salt shift, so these are deliberately tighter
/// than the global player range.
pub const NUMERIC_MIN_PLAYERS: u8 = 5;
pub const NUMERIC_MAX_PLAYERS: u8 = 12;
pub const NUMERIC_MAX_LIARS: u8 = 3;
pub const NUMERIC_MAX_WHITE_HATS: u8 = 1;

pub const CODE_DIGITS: usize = 5;

const PLAYER_RADIX: u64 = (NUMERIC_MAX_PLAYERS - NUMERIC_MIN_PLAYERS + 1) as u64;
const LIAR_RADIX: u64 = NUMERIC_MAX_LIARS as u64;
const WHITE_HAT_RADIX: u64 = (NUMERIC_MAX_WHITE_HATS + 1) as u64;
const TOPIC_RADIX: u64 = catalogue::TOPICS.len() as u64;
const WORD_RADIX: u64 = WORDS_PER_TOPIC as u64;

const CAPACITY: u64 = PLAYER_RADIX * LIAR_RADIX * WHITE_HAT_RADIX * TOPIC_RADIX * WORD_RADIX;

/// Additive shift applied before rendering so the token never starts with a
/// zero and adjacent configurations don't look sequential. Cosmetic only;
/// no security property.
const SALT: u64 = 24_683;

// The salt window must keep every token at exactly CODE_DIGITS digits.
const _: () = assert!(SALT >= 10_000 && SALT + CAPACITY - 1 <= 99_999);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("code value outside the packed range")]
    OutOfRange,
    #[error("unpacked field fails its range check")]
    FieldRange,
    #[error("topic or word missing from the catalogue")]
    CatalogueMiss,
    #[error("malformed portable code")]
    Portable,
}

/// Encode a configuration as its shareable room code.
///
/// Pure; the numeric form is used whenever every field maps onto the fixed
/// catalogue vocabulary, the portable form otherwise.
pub fn encode(config: &GameConfiguration) -> String {
    match numeric_coordinates(config) {
        Some((topic_index, word_index)) => encode_numeric(config, topic_index, word_index),
        None => encode_portable(config),
    }
}

/// Decode a room code back to its configuration.
///
/// Inputs matching the fixed digit-width pattern try the numeric form first
/// and fall back to the portable transform; everything else goes straight to
/// the portable path. Both failing is an invalid code.
pub fn decode(code: &str) -> Result<GameConfiguration, DecodeError> {
    let code = code.trim();
    if is_numeric_form(code) {
        match decode_numeric(code) {
            Ok(config) => return Ok(config),
            Err(_) => return decode_portable(code),
        }
    }
    decode_portable(code)
}

/// The deterministic seed a room code carries: the numeric token's integer
/// value, or a rolling hash of the portable token. Identical on every
/// device by construction.
pub fn seed(code: &str) -> u32 {
    let code = code.trim();
    if is_numeric_form(code) {
        // Five digits always fit u32.
        code.parse::<u32>().unwrap_or_else(|_| hash_seed(code))
    } else {
        hash_seed(code)
    }
}

pub fn is_numeric_form(code: &str) -> bool {
    code.len() == CODE_DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

/// Catalogue coordinates when the configuration packs numerically.
fn numeric_coordinates(config: &GameConfiguration) -> Option<(u64, u64)> {
    if !(NUMERIC_MIN_PLAYERS..=NUMERIC_MAX_PLAYERS).contains(&config.total_players)
        || !(1..=NUMERIC_MAX_LIARS).contains(&config.liar_count)
        || config.white_hat_count > NUMERIC_MAX_WHITE_HATS
        || config.outsider_word.is_some()
    {
        return None;
    }
    catalogue::lookup(&config.topic_label, &config.civilian_word)
        .map(|(t, w)| (t as u64, w as u64))
}

fn encode_numeric(config: &GameConfiguration, topic_index: u64, word_index: u64) -> String {
    let p = (config.total_players - NUMERIC_MIN_PLAYERS) as u64;
    let lc = (config.liar_count - 1) as u64;
    let wh = config.white_hat_count as u64;

    let offset = p
        + lc * PLAYER_RADIX
        + wh * PLAYER_RADIX * LIAR_RADIX
        + topic_index * PLAYER_RADIX * LIAR_RADIX * WHITE_HAT_RADIX
        + word_index * PLAYER_RADIX * LIAR_RADIX * WHITE_HAT_RADIX * TOPIC_RADIX;

    format!("{:0width$}", offset + SALT, width = CODE_DIGITS)
}

fn decode_numeric(code: &str) -> Result<GameConfiguration, DecodeError> {
    let value: u64 = code.parse().map_err(|_| DecodeError::OutOfRange)?;
    let mut offset = value.checked_sub(SALT).ok_or(DecodeError::OutOfRange)?;
    if offset >= CAPACITY {
        return Err(DecodeError::OutOfRange);
    }

    let p = offset % PLAYER_RADIX;
    offset /= PLAYER_RADIX;
    let lc = offset % LIAR_RADIX;
    offset /= LIAR_RADIX;
    let wh = offset % WHITE_HAT_RADIX;
    offset /= WHITE_HAT_RADIX;
    let topic_index = offset % TOPIC_RADIX;
    offset /= TOPIC_RADIX;
    let word_index = offset;
    if word_index >= WORD_RADIX {
        return Err(DecodeError::FieldRange);
    }

    let topic = catalogue::topic(topic_index as usize).ok_or(DecodeError::CatalogueMiss)?;
    let word = topic
        .words
        .get(word_index as usize)
        .ok_or(DecodeError::CatalogueMiss)?;

    Ok(GameConfiguration {
        topic_label: topic.label.to_string(),
        civilian_word: (*word).to_string(),
        outsider_word: None,
        total_players: NUMERIC_MIN_PLAYERS + p as u8,
        liar_count: 1 + lc as u8,
        white_hat_count: wh as u8,
        created_at: 0,
    })
}

fn encode_portable(config: &GameConfiguration) -> String {
    // Infallible for this struct; serde_json only fails on non-string keys.
    let json = serde_json::to_vec(config).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

fn decode_portable(code: &str) -> Result<GameConfiguration, DecodeError> {
    // Accept padded input from sloppy relays; the canonical form is unpadded.
    let bytes = URL_SAFE_NO_PAD
        .decode(code.trim_end_matches('='))
        .map_err(|_| DecodeError::Portable)?;
    serde_json::from_slice(&bytes).map_err(|_| DecodeError::Portable)
}
