//! Length budgets for a summarization request.
//!
//! A [`LengthBudget`] is planned once from the input word count and the caller's optional bounds.
//! Word targets are translated into token budgets at a fixed 1.3 tokens per word, and split across
//! chunks by [`LengthBudget::per_chunk`].

use super::types::ValidationError;

/// Empirical word-to-token ratio used for every conversion.
pub const TOKENS_PER_WORD: f64 = 1.3;
/// Hard ceiling on the derived maximum summary length.
pub const MAX_SUMMARY_WORDS: usize = 1500;
/// Floor on the derived minimum summary length.
pub const MIN_SUMMARY_WORDS: usize = 50;

const USER_MAX_RANGE: (usize, usize) = (50, 1000);
const USER_MIN_RANGE: (usize, usize) = (20, 1000);
const DEFAULT_MAX_RATIO: f64 = 0.5;
const DEFAULT_MIN_RATIO: f64 = 0.25;

const CHUNK_MAX_FLOOR: usize = 150;
const CHUNK_MAX_PAD: usize = 50;
const CHUNK_MIN_FLOOR: usize = 80;
const CHUNK_MIN_SHARE_OF_MAX: f64 = 0.7;

/// Optional caller-supplied summary bounds, in words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BudgetOverrides {
    /// Requested minimum summary length.
    pub min_words: Option<usize>,
    /// Requested maximum summary length.
    pub max_words: Option<usize>,
}

/// Target summary length in words and the equivalent token counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBudget {
    /// Lower word bound.
    pub min_words: usize,
    /// Upper word bound.
    pub max_words: usize,
    /// Lower bound in tokens.
    pub min_tokens: usize,
    /// Upper bound in tokens.
    pub max_tokens: usize,
}

/// Token bounds handed to the model for a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBudget {
    /// Minimum generated tokens.
    pub min_tokens: usize,
    /// Maximum generated tokens.
    pub max_tokens: usize,
}

/// Plan the length budget for a document of `original_word_count` words.
///
/// Inputs shorter than `min_input_words` are rejected rather than summarized. A caller minimum
/// above the effective maximum is lowered to the maximum.
pub fn plan_budget(
    original_word_count: usize,
    overrides: BudgetOverrides,
    min_input_words: usize,
) -> Result<LengthBudget, ValidationError> {
    if original_word_count == 0 || original_word_count < min_input_words {
        return Err(ValidationError::TooShort {
            words: original_word_count,
            minimum: min_input_words.max(1),
        });
    }

    let max_words = match overrides.max_words {
        Some(requested) => requested.clamp(USER_MAX_RANGE.0, USER_MAX_RANGE.1),
        None => MAX_SUMMARY_WORDS.min(scale(original_word_count, DEFAULT_MAX_RATIO)),
    };
    let min_words = match overrides.min_words {
        Some(requested) => requested.clamp(USER_MIN_RANGE.0, USER_MIN_RANGE.1),
        None => MIN_SUMMARY_WORDS.max(scale(original_word_count, DEFAULT_MIN_RATIO)),
    };
    let min_words = min_words.min(max_words);

    Ok(LengthBudget {
        min_words,
        max_words,
        min_tokens: words_to_tokens(min_words),
        max_tokens: words_to_tokens(max_words),
    })
}

impl LengthBudget {
    /// Split the overall budget across `total_chunks` chunks.
    ///
    /// Each chunk gets its proportional share plus a 50 token pad, floored at 150 tokens for the
    /// maximum and 80 for the minimum, with the minimum held to 70% of the maximum.
    pub fn per_chunk(&self, total_chunks: usize) -> ChunkBudget {
        let chunks = total_chunks.max(1) as f64;
        let share_max = (self.max_tokens as f64 / chunks).round() as usize;
        let share_min = (self.min_tokens as f64 / chunks).round() as usize;

        let max_tokens = CHUNK_MAX_FLOOR.max(share_max + CHUNK_MAX_PAD);
        let min_tokens = CHUNK_MIN_FLOOR
            .max(share_min)
            .min(scale(max_tokens, CHUNK_MIN_SHARE_OF_MAX));

        ChunkBudget {
            min_tokens,
            max_tokens,
        }
    }

    /// The overall budget expressed as token bounds, used for the condensation pass.
    pub fn as_chunk_budget(&self) -> ChunkBudget {
        ChunkBudget {
            min_tokens: self.min_tokens,
            max_tokens: self.max_tokens,
        }
    }
}

/// Convert a word count to the approximate token count.
pub fn words_to_tokens(words: usize) -> usize {
    scale(words, TOKENS_PER_WORD)
}

/// Convert a token count back to an approximate word count.
pub fn tokens_to_words(tokens: usize) -> usize {
    (tokens as f64 / TOKENS_PER_WORD).round() as usize
}

/// Count whitespace-separated words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn scale(value: usize, ratio: f64) -> usize {
    (value as f64 * ratio).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn four_hundred_words_without_overrides() {
        let budget = plan_budget(400, BudgetOverrides::default(), 20).expect("budget");
        assert_eq!(budget.min_words, 100);
        assert_eq!(budget.max_words, 200);
        assert_eq!(budget.min_tokens, 130);
        assert_eq!(budget.max_tokens, 260);
    }

    #[test]
    fn long_documents_hit_the_hard_ceiling() {
        let budget = plan_budget(10_000, BudgetOverrides::default(), 20).expect("budget");
        assert_eq!(budget.max_words, 1500);
        assert_eq!(budget.min_words, 1500);

        let budget = plan_budget(5_000, BudgetOverrides::default(), 20).expect("budget");
        assert_eq!(budget.max_words, 1500);
        assert_eq!(budget.min_words, 1250);
    }

    #[test]
    fn short_input_is_rejected() {
        let error = plan_budget(19, BudgetOverrides::default(), 20).unwrap_err();
        assert!(matches!(
            error,
            ValidationError::TooShort {
                words: 19,
                minimum: 20
            }
        ));
        assert!(plan_budget(0, BudgetOverrides::default(), 0).is_err());
    }

    #[test]
    fn user_bounds_are_clamped() {
        let overrides = BudgetOverrides {
            min_words: Some(5),
            max_words: Some(5_000),
        };
        let budget = plan_budget(800, overrides, 20).expect("budget");
        assert_eq!(budget.max_words, 1000);
        assert_eq!(budget.min_words, 20);
    }

    #[test]
    fn inverted_user_bounds_lower_the_minimum() {
        let overrides = BudgetOverrides {
            min_words: Some(900),
            max_words: Some(100),
        };
        let budget = plan_budget(2_000, overrides, 20).expect("budget");
        assert_eq!(budget.min_words, 100);
        assert_eq!(budget.max_words, 100);
        assert_eq!(budget.min_tokens, budget.max_tokens);
    }

    #[test]
    fn single_chunk_budget_pads_share() {
        let budget = plan_budget(400, BudgetOverrides::default(), 20).expect("budget");
        let chunk = budget.per_chunk(1);
        assert_eq!(chunk.max_tokens, 310);
        assert_eq!(chunk.min_tokens, 130);
    }

    #[test]
    fn many_chunks_fall_back_to_floors() {
        let budget = plan_budget(3_000, BudgetOverrides::default(), 20).expect("budget");
        let chunk = budget.per_chunk(40);
        assert_eq!(chunk.max_tokens, 150);
        assert_eq!(chunk.min_tokens, 80);
    }

    #[test]
    fn chunk_minimum_is_held_below_maximum() {
        let budget = LengthBudget {
            min_words: 1000,
            max_words: 1000,
            min_tokens: 1300,
            max_tokens: 1300,
        };
        let chunk = budget.per_chunk(1);
        assert_eq!(chunk.max_tokens, 1350);
        assert_eq!(chunk.min_tokens, 945);
    }

    #[test]
    fn token_word_conversions_round() {
        assert_eq!(words_to_tokens(100), 130);
        assert_eq!(words_to_tokens(3), 4);
        assert_eq!(tokens_to_words(130), 100);
        assert_eq!(count_words("  one two\nthree\t"), 3);
    }

    proptest! {
        #[test]
        fn proptest_default_budget_follows_policy(words in 20usize..200_000usize) {
            let budget = plan_budget(words, BudgetOverrides::default(), 20).expect("budget");
            let expected_max = 1500usize.min((words as f64 * 0.5).round() as usize);
            let expected_min = 50usize.max((words as f64 * 0.25).round() as usize).min(expected_max);
            prop_assert_eq!(budget.max_words, expected_max);
            prop_assert_eq!(budget.min_words, expected_min);
            prop_assert!(budget.min_words <= budget.max_words);
            prop_assert!(budget.max_words <= 1500);
            prop_assert_eq!(budget.max_tokens, (expected_max as f64 * 1.3).round() as usize);
        }

        #[test]
        fn proptest_overrides_keep_bounds_ordered(
            words in 20usize..50_000usize,
            min in proptest::option::of(0usize..5_000usize),
            max in proptest::option::of(0usize..5_000usize),
        ) {
            let overrides = BudgetOverrides { min_words: min, max_words: max };
            let budget = plan_budget(words, overrides, 20).expect("budget");
            prop_assert!(budget.min_words <= budget.max_words);
            prop_assert!(budget.max_words <= 1500);
            prop_assert!(budget.min_tokens <= budget.max_tokens);
        }

        #[test]
        fn proptest_chunk_budget_respects_floors(words in 20usize..50_000usize, chunks in 1usize..200usize) {
            let budget = plan_budget(words, BudgetOverrides::default(), 20).expect("budget");
            let chunk = budget.per_chunk(chunks);
            prop_assert!(chunk.max_tokens >= 150);
            prop_assert!(chunk.min_tokens < chunk.max_tokens);
        }
    }
}
