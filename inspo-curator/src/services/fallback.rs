//! Fallback supplier: pre-vetted popular prompts
//!
//! Always mixed into the final result set, not only on pipeline failure.
//! Entries are used verbatim and never moderated.

use inspo_common::config::PopularEntry;

use crate::types::{AcceptedResult, Popularity};

/// Fixed, ordered set of popular prompts
#[derive(Debug, Clone)]
pub struct FallbackSupplier {
    entries: Vec<PopularEntry>,
}

impl FallbackSupplier {
    pub fn new(entries: Vec<PopularEntry>) -> Self {
        Self { entries }
    }

    /// Configured entries, or the built-in set when none are configured
    pub fn from_config(entries: &[PopularEntry]) -> Self {
        if entries.is_empty() {
            Self::builtin()
        } else {
            Self::new(entries.to_vec())
        }
    }

    /// Built-in prompts shipped with the service
    pub fn builtin() -> Self {
        let entry = |text: &str, friends: [&str; 3], others: u64| PopularEntry {
            prompt_text: text.to_string(),
            friend_ids: friends.iter().map(|f| f.to_string()).collect(),
            others,
        };

        Self::new(vec![
            entry(
                "An upbeat synthwave track with a driving beat, ethereal pads, and a retro 80s vibe, perfect for late-night drives.",
                ["10", "25", "30"],
                1352,
            ),
            entry(
                "A melancholic acoustic folk song featuring gentle fingerpicked guitar, a haunting cello melody, and soft, breathy vocals.",
                ["40", "55", "60"],
                876,
            ),
            entry(
                "High-energy trap beat with heavy 808s, crisp hi-hats, and a catchy flute melody, ideal for a workout playlist.",
                ["70", "10", "40"],
                2103,
            ),
        ])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Popular results in configured order
    pub fn supply(&self) -> Vec<AcceptedResult> {
        self.entries
            .iter()
            .map(|entry| {
                let popularity = (!entry.friend_ids.is_empty() || entry.others > 0).then(|| {
                    Popularity {
                        friend_ids: entry.friend_ids.clone(),
                        others: entry.others,
                    }
                });
                AcceptedResult::popular(entry.prompt_text.clone(), popularity)
            })
            .collect()
    }
}

impl Default for FallbackSupplier {
    fn default() -> Self {
        Self::builtin()
    }
}
