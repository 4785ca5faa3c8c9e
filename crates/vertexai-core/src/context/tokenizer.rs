//! Token counting.
//!
//! Counts follow one fixed reference scheme (`cl100k_base`). Structured items
//! carry a flat framing overhead on top of their field counts; this is a
//! deliberate over-estimate, not a billing figure.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::warn;

use crate::types::{ChatTurn, Example};

/// Framing overhead added once per structured item.
pub const MESSAGE_OVERHEAD: usize = 4;

/// Average number of tokens per whitespace-delimited word (fallback only).
const TOKENS_PER_WORD: f64 = 1.3;

static CL100K: Lazy<Option<CoreBPE>> = Lazy::new(|| match tiktoken_rs::cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        warn!(error = %e, "cl100k_base unavailable, falling back to word-count heuristic");
        None
    }
});

/// A countable item.
#[derive(Debug, Clone, Copy)]
pub enum TokenItem<'a> {
    /// A bare string. No overhead.
    Text(&'a str),
    /// A few-shot example (input + output).
    Example(&'a Example),
    /// A chat turn (role label + content).
    Turn(&'a ChatTurn),
    /// An arbitrary string-valued record; every value is counted.
    Record(&'a HashMap<String, String>),
}

/// Pluggable token counter.
///
/// Implementations only supply [`count_text`](Tokenizer::count_text); the
/// item policy in [`count`](Tokenizer::count) is shared.
pub trait Tokenizer: Send + Sync {
    /// Count tokens in a raw string.
    fn count_text(&self, text: &str) -> usize;

    /// Scheme name, for logging.
    fn name(&self) -> &str;

    /// Count tokens in any item: the sum of its string fields, plus
    /// [`MESSAGE_OVERHEAD`] for structured items.
    fn count(&self, item: TokenItem<'_>) -> usize {
        match item {
            TokenItem::Text(text) => self.count_text(text),
            TokenItem::Example(example) => {
                self.count_text(&example.input) + self.count_text(&example.output) + MESSAGE_OVERHEAD
            }
            TokenItem::Turn(turn) => {
                self.count_text(turn.role.as_str()) + self.count_text(&turn.content) + MESSAGE_OVERHEAD
            }
            TokenItem::Record(record) => {
                record.values().map(|v| self.count_text(v)).sum::<usize>() + MESSAGE_OVERHEAD
            }
        }
    }
}

/// `cl100k_base` BPE counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cl100kTokenizer;

impl Cl100kTokenizer {
    /// Returns `None` when the BPE tables could not be built.
    pub fn new() -> Option<Self> {
        CL100K.as_ref().map(|_| Self)
    }
}

impl Tokenizer for Cl100kTokenizer {
    fn count_text(&self, text: &str) -> usize {
        match CL100K.as_ref() {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => heuristic_count(text),
        }
    }

    fn name(&self) -> &str {
        "cl100k_base"
    }
}

/// Word-count heuristic: 1.3 tokens per word, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn count_text(&self, text: &str) -> usize {
        heuristic_count(text)
    }

    fn name(&self) -> &str {
        "word-heuristic"
    }
}

fn heuristic_count(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words as f64 * TOKENS_PER_WORD).ceil() as usize
}

/// The process-wide reference tokenizer, or the heuristic if it is unavailable.
pub fn default_tokenizer() -> Arc<dyn Tokenizer> {
    match Cl100kTokenizer::new() {
        Some(tokenizer) => Arc::new(tokenizer),
        None => Arc::new(HeuristicTokenizer),
    }
}
