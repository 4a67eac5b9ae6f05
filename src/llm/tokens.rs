//! Local token estimates for usage reporting.
//!
//! Counts use the cl100k_base encoding. The backend's own usage figures are
//! never consulted. If the tokenizer cannot be built, or panics on some
//! input, counts degrade to zero.

use crate::core::prompt::MESSAGE_SEPARATOR;
use once_cell::sync::Lazy;
use std::panic::{self, AssertUnwindSafe};
use tiktoken_rs::{cl100k_base, CoreBPE};

static TOKENIZER: Lazy<Option<CoreBPE>> = Lazy::new(|| match cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        tracing::warn!("Tokenizer unavailable, token counts will be zero: {}", e);
        None
    }
});

#[derive(Debug, Default, Clone, Copy)]
pub struct TokenCounter;

impl TokenCounter {
    pub const fn new() -> Self {
        Self
    }

    pub fn count(&self, text: &str) -> u64 {
        if text.is_empty() {
            return 0;
        }
        let Some(bpe) = TOKENIZER.as_ref() else {
            return 0;
        };

        guarded(text, |text| bpe.encode_with_special_tokens(text).len())
    }

    /// Tokens of the system text and serialized messages, counted as one
    /// document with the message separator between non-empty parts.
    pub fn estimate_input_tokens(&self, system_text: &str, messages_text: &str) -> u64 {
        let document = [system_text, messages_text]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(MESSAGE_SEPARATOR);
        self.count(&document)
    }

    pub fn estimate_output_tokens(&self, text: &str) -> u64 {
        self.count(text)
    }
}

/// Run `encode`, treating a panic as zero tokens.
fn guarded(text: &str, encode: impl FnOnce(&str) -> usize) -> u64 {
    match panic::catch_unwind(AssertUnwindSafe(|| encode(text))) {
        Ok(count) => count as u64,
        Err(_) => {
            tracing::warn!("Tokenizer failed, reporting zero tokens");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        let counter = TokenCounter::new();
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.estimate_input_tokens("", ""), 0);
    }

    #[test]
    fn test_counts_grow_with_text() {
        let counter = TokenCounter::new();
        let short = counter.count("hello");
        let long = counter.count("hello world, this is a much longer sentence to encode");
        assert!(short > 0);
        assert!(long > short);
    }

    #[test]
    fn test_input_estimate_covers_both_parts() {
        let counter = TokenCounter::new();
        let system_only = counter.estimate_input_tokens("you are helpful", "");
        let messages_only = counter.estimate_input_tokens("", "role:user\nhi");
        let both = counter.estimate_input_tokens("you are helpful", "role:user\nhi");
        assert!(both > system_only);
        assert!(both > messages_only);
    }

    #[test]
    fn test_tokenizer_panic_counts_as_zero() {
        assert_eq!(guarded("boom", |_| panic!("tokenizer exploded")), 0);
        assert_eq!(guarded("fine", |text| text.len()), 4);
    }
}
