//! Conversation budgeting.
//!
//! [`ConversationBudgeter::fit`] decides which parts of a [`PromptStructure`]
//! survive a hard input-token limit. Priority, highest first: context, final
//! prompt, examples (in order), history (newest first). A lower-priority item
//! is never kept at the expense of a higher-priority one, and over-budget
//! input is trimmed rather than rejected.

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use super::tokenizer::{TokenItem, Tokenizer};
use crate::types::{ChatTurn, Example, PromptStructure, TrimmedConversation};

/// Fits prompts into an input-token limit.
#[derive(Clone)]
pub struct ConversationBudgeter {
    tokenizer: Arc<dyn Tokenizer>,
}

impl ConversationBudgeter {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Trim `prompt` to `limit` input tokens.
    ///
    /// Returns the kept conversation and the signed number of tokens left.
    /// A negative value means the context (or the prompt) alone exceeded the
    /// limit; the rejected item is included in that figure. The first example
    /// that does not fit ends the fit, and no history is kept.
    pub fn fit(&self, prompt: &PromptStructure, limit: usize) -> (TrimmedConversation, i64) {
        let tok = self.tokenizer.as_ref();
        let mut remaining = limit as i64;
        let mut trimmed = TrimmedConversation::default();

        if let Some(context) = non_empty(&prompt.context) {
            remaining -= tok.count(TokenItem::Text(context)) as i64;
            if remaining < 0 {
                debug!(limit, remaining, "context alone exceeds input limit");
                return (TrimmedConversation::default(), remaining);
            }
            trimmed.context = Some(context.to_string());
        }

        if let Some(text) = non_empty(&prompt.prompt) {
            remaining -= tok.count(TokenItem::Text(text)) as i64;
            if remaining < 0 {
                debug!(limit, remaining, "prompt exceeds remaining input budget");
                return (trimmed, remaining);
            }
            trimmed.prompt = Some(text.to_string());
        }

        for example in &prompt.examples {
            let cost = tok.count(TokenItem::Example(example)) as i64;
            if cost > remaining {
                debug!(
                    limit,
                    remaining,
                    examples = trimmed.examples.len(),
                    "example overflow, history not considered"
                );
                return (trimmed, remaining);
            }
            remaining -= cost;
            trimmed.examples.push(example.clone());
        }

        let mut kept: VecDeque<(&ChatTurn, i64)> = VecDeque::new();
        for turn in prompt.chat_history.iter().rev() {
            let cost = tok.count(TokenItem::Turn(turn)) as i64;
            if cost > remaining {
                break;
            }
            remaining -= cost;
            kept.push_front((turn, cost));
        }

        if kept.len() % 2 == 1 {
            if let Some((_, cost)) = kept.pop_front() {
                remaining += cost;
            }
        }

        trimmed.chat_history = kept.into_iter().map(|(turn, _)| turn.clone()).collect();

        debug!(
            limit,
            remaining,
            examples = trimmed.examples.len(),
            dropped_examples = prompt.examples.len() - trimmed.examples.len(),
            turns = trimmed.chat_history.len(),
            dropped_turns = prompt.chat_history.len() - trimmed.chat_history.len(),
            "fitted conversation"
        );

        (trimmed, remaining)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn conversation_cost(
    tokenizer: &dyn Tokenizer,
    context: Option<&str>,
    prompt: Option<&str>,
    examples: &[Example],
    history: &[ChatTurn],
) -> usize {
    let mut total = 0;
    for text in [context, prompt].into_iter().flatten() {
        total += tokenizer.count(TokenItem::Text(text));
    }
    for example in examples {
        total += tokenizer.count(TokenItem::Example(example));
    }
    for turn in history {
        total += tokenizer.count(TokenItem::Turn(turn));
    }
    total
}

impl TrimmedConversation {
    /// Token cost of everything this conversation holds.
    pub fn token_cost(&self, tokenizer: &dyn Tokenizer) -> usize {
        conversation_cost(
            tokenizer,
            self.context.as_deref(),
            self.prompt.as_deref(),
            &self.examples,
            &self.chat_history,
        )
    }
}

impl PromptStructure {
    /// Token cost of the untrimmed structure.
    pub fn token_cost(&self, tokenizer: &dyn Tokenizer) -> usize {
        conversation_cost(
            tokenizer,
            self.context.as_deref(),
            self.prompt.as_deref(),
            &self.examples,
            &self.chat_history,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tokenizer::default_tokenizer;

    /// One token per whitespace word, so costs are easy to reason about.
    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn count_text(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }

        fn name(&self) -> &str {
            "words"
        }
    }

    fn words() -> ConversationBudgeter {
        ConversationBudgeter::new(Arc::new(WordTokenizer))
    }

    fn alternating_history(n: usize) -> Vec<ChatTurn> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    ChatTurn::user(format!("u{}", i))
                } else {
                    ChatTurn::assistant(format!("a{}", i))
                }
            })
            .collect()
    }

    fn sample_prompt() -> PromptStructure {
        PromptStructure {
            context: Some("You are a concise assistant".to_string()),
            prompt: Some("What is the capital of France?".to_string()),
            examples: vec![
                Example::new("2+2", "4"),
                Example::new("capital of Spain", "Madrid"),
            ],
            chat_history: alternating_history(7),
        }
    }

    #[test]
    fn test_context_and_prompt_fit() {
        let budgeter = ConversationBudgeter::new(default_tokenizer());
        let tok = budgeter.tokenizer().clone();
        let input = PromptStructure::from_prompt("Hi").with_context("You are helpful");

        let (trimmed, remaining) = budgeter.fit(&input, 10);
        assert_eq!(trimmed.context.as_deref(), Some("You are helpful"));
        assert_eq!(trimmed.prompt.as_deref(), Some("Hi"));
        assert!(trimmed.examples.is_empty());
        assert!(trimmed.chat_history.is_empty());
        let expected = 10 - tok.count_text("You are helpful") as i64 - tok.count_text("Hi") as i64;
        assert_eq!(remaining, expected);
        assert!(remaining > 0);
    }

    #[test]
    fn test_context_overflow_returns_empty() {
        let input = PromptStructure::from_prompt("hi").with_context("one two three four five");
        let (trimmed, remaining) = words().fit(&input, 3);
        assert!(trimmed.is_empty());
        assert_eq!(remaining, -2);
    }

    #[test]
    fn test_prompt_overflow_keeps_context() {
        let mut input = PromptStructure::from_prompt("a b c d e").with_context("sys");
        input.chat_history = alternating_history(2);
        let (trimmed, remaining) = words().fit(&input, 4);
        assert_eq!(trimmed.context.as_deref(), Some("sys"));
        assert!(trimmed.prompt.is_none());
        assert!(trimmed.chat_history.is_empty());
        assert_eq!(remaining, -2);
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let input = PromptStructure {
            context: Some(String::new()),
            prompt: Some(String::new()),
            ..Default::default()
        };
        let (trimmed, remaining) = words().fit(&input, 0);
        assert!(trimmed.is_empty());
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_history_keeps_most_recent_even_count() {
        // Each turn is role (1) + content (1) + overhead (4) = 6 tokens.
        let input = PromptStructure {
            chat_history: alternating_history(5),
            ..Default::default()
        };
        let (trimmed, remaining) = words().fit(&input, 20);

        // floor(20 / 6) = 3 turns fit, rounded down to 2 for parity.
        assert_eq!(trimmed.chat_history, alternating_history(5)[3..].to_vec());
        assert_eq!(remaining, 20 - 12);
    }

    #[test]
    fn test_recency_over_completeness() {
        let budgeter = ConversationBudgeter::new(default_tokenizer());
        let tok = budgeter.tokenizer().clone();
        let history: Vec<ChatTurn> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    ChatTurn::user("question")
                } else {
                    ChatTurn::assistant("question")
                }
            })
            .collect();
        let user_cost = tok.count(TokenItem::Turn(&history[0]));
        let assistant_cost = tok.count(TokenItem::Turn(&history[1]));
        let pair = user_cost + assistant_cost;

        let input = PromptStructure {
            chat_history: history.clone(),
            ..Default::default()
        };
        let (trimmed, _) = budgeter.fit(&input, pair * 3 + 1);
        assert_eq!(trimmed.chat_history, history[4..].to_vec());
    }

    #[test]
    fn test_example_overflow_drops_history() {
        let input = PromptStructure {
            examples: vec![
                Example::new("a", "b"),
                Example::new("w w w w w w", "w w w w w w"),
                Example::new("c", "d"),
            ],
            chat_history: alternating_history(2),
            ..Default::default()
        };
        // example 0 = 6, example 1 = 16, turns = 6 each
        let (trimmed, remaining) = words().fit(&input, 20);
        assert_eq!(trimmed.examples, vec![Example::new("a", "b")]);
        assert!(trimmed.chat_history.is_empty());
        assert_eq!(remaining, 14);

        // With room for every example, history is walked as usual.
        let (trimmed, remaining) = words().fit(&input, 40);
        assert_eq!(trimmed.examples.len(), 3);
        assert_eq!(trimmed.chat_history.len(), 2);
        assert_eq!(remaining, 40 - 28 - 12);
    }

    #[test]
    fn test_zero_limit() {
        let (trimmed, remaining) = words().fit(&sample_prompt(), 0);
        assert!(trimmed.is_empty());
        assert!(remaining < 0);
    }

    #[test]
    fn test_budget_parity_and_idempotence_sweep() {
        let budgeter = ConversationBudgeter::new(default_tokenizer());
        let tok = budgeter.tokenizer().clone();
        let input = sample_prompt();
        let full = input.token_cost(tok.as_ref());

        for limit in 0..=full + 5 {
            let (trimmed, remaining) = budgeter.fit(&input, limit);

            assert_eq!(trimmed.chat_history.len() % 2, 0, "odd history at limit {}", limit);

            if remaining >= 0 {
                let cost = trimmed.token_cost(tok.as_ref());
                assert!(cost <= limit, "cost {} over limit {}", cost, limit);
                assert_eq!(limit as i64 - remaining, cost as i64);
            } else {
                assert!(trimmed.prompt.is_none());
                assert!(trimmed.examples.is_empty());
                assert!(trimmed.chat_history.is_empty());
            }

            let (again, _) = budgeter.fit(&trimmed.clone().into_prompt(), limit);
            assert_eq!(again, trimmed, "not idempotent at limit {}", limit);
        }
    }

    #[test]
    fn test_everything_fits_with_room() {
        let budgeter = words();
        let input = PromptStructure {
            chat_history: alternating_history(6),
            ..sample_prompt()
        };
        let full = input.token_cost(&WordTokenizer);
        let (trimmed, remaining) = budgeter.fit(&input, full + 3);
        assert_eq!(trimmed.clone().into_prompt(), input);
        assert_eq!(remaining, 3);
    }

    #[test]
    fn test_input_is_not_modified() {
        let input = sample_prompt();
        let snapshot = input.clone();
        let _ = words().fit(&input, 15);
        assert_eq!(input, snapshot);
    }
}
