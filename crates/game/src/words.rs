//! Word sourcing and player-profile persistence seams.
//!
//! The library never talks to an AI service or a disk itself; hosts that
//! want generated words or remembered profiles plug implementations in
//! behind these traits. Everything degrades to the built-in catalogue.

use crate::catalogue;
use crate::rng::SeededRng;

/// A topic/word pairing offered to the host when configuring a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSuggestion {
    pub word: String,
    pub category: String,
    /// Decoy word for the outsider variant, when the source provides one.
    pub outsider_word: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExternalServiceError {
    #[error("word service timed out")]
    Timeout,
    #[error("word service quota exhausted")]
    QuotaExhausted,
    #[error("word service credential missing")]
    MissingCredential,
    #[error("word service failure: {0}")]
    Service(String),
}

/// An external word generator (an AI endpoint, a custom word list, ...).
pub trait WordSource {
    fn suggest(&mut self, topic: &str) -> Result<WordSuggestion, ExternalServiceError>;
}

/// Ask `source` for a word on `topic`, falling back to a catalogue draw
/// when the source fails or none is configured. The fallback is silent:
/// players never see the difference, the failure only reaches the log.
pub fn pick_with_fallback(
    source: Option<&mut dyn WordSource>,
    topic: &str,
    rng: &mut SeededRng,
) -> WordSuggestion {
    if let Some(source) = source {
        match source.suggest(topic) {
            Ok(suggestion) => return suggestion,
            Err(e) => log::warn!("word source failed, using catalogue: {e}"),
        }
    }
    catalogue_draw(topic, rng)
}

/// Catalogue draw: the requested topic when it exists, any topic otherwise.
fn catalogue_draw(topic: &str, rng: &mut SeededRng) -> WordSuggestion {
    match catalogue::find_topic(topic).and_then(catalogue::topic) {
        Some(found) => {
            let word = found.words[rng.next_below(found.words.len())];
            WordSuggestion {
                word: word.to_string(),
                category: found.label.to_string(),
                outsider_word: None,
            }
        }
        None => {
            let (found, word) = catalogue::draw(rng);
            WordSuggestion {
                word: word.to_string(),
                category: found.label.to_string(),
                outsider_word: None,
            }
        }
    }
}

/// Device-local persistence for the player's lobby profile.
pub trait ProfileStore {
    fn load(&self) -> Option<crate::session::Profile>;
    fn save(&mut self, profile: &crate::session::Profile);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::TOPICS;

    struct FailingSource;

    impl WordSource for FailingSource {
        fn suggest(&mut self, _topic: &str) -> Result<WordSuggestion, ExternalServiceError> {
            Err(ExternalServiceError::QuotaExhausted)
        }
    }

    struct FixedSource;

    impl WordSource for FixedSource {
        fn suggest(&mut self, topic: &str) -> Result<WordSuggestion, ExternalServiceError> {
            Ok(WordSuggestion {
                word: "Quasar".to_string(),
                category: topic.to_string(),
                outsider_word: Some("Pulsar".to_string()),
            })
        }
    }

    #[test]
    fn test_source_result_used_when_available() {
        let mut source = FixedSource;
        let mut rng = SeededRng::new(1);
        let suggestion = pick_with_fallback(Some(&mut source), "Astronomy", &mut rng);
        assert_eq!(suggestion.word, "Quasar");
        assert_eq!(suggestion.outsider_word.as_deref(), Some("Pulsar"));
    }

    #[test]
    fn test_failure_falls_back_to_catalogue() {
        let mut source = FailingSource;
        let mut rng = SeededRng::new(7);
        let suggestion = pick_with_fallback(Some(&mut source), TOPICS[0].label, &mut rng);
        assert_eq!(suggestion.category, TOPICS[0].label);
        assert!(TOPICS[0].words.contains(&suggestion.word.as_str()));
        assert_eq!(suggestion.outsider_word, None);
    }

    #[test]
    fn test_no_source_draws_from_catalogue() {
        let mut rng = SeededRng::new(3);
        let suggestion = pick_with_fallback(None, "No Such Topic", &mut rng);
        assert!(
            TOPICS
                .iter()
                .any(|t| t.label == suggestion.category
                    && t.words.contains(&suggestion.word.as_str()))
        );
    }
}
