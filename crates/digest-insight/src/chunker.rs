//! Token-budgeted batching of text items.

use std::iter::Fuse;

/// Counts tokens in a piece of text.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Estimate of roughly four characters per token, rounded up.
///
/// Close enough to BPE tokenizers for English news text; errs on the high
/// side for short strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxTokenCounter;

impl TokenCounter for ApproxTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

/// Exact counts from a HuggingFace `tokenizer.json`.
#[cfg(feature = "hf-tokenizer")]
pub struct HfTokenCounter {
    tokenizer: tokenizers::Tokenizer,
}

#[cfg(feature = "hf-tokenizer")]
impl HfTokenCounter {
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::error::InsightError> {
        let tokenizer = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            crate::error::InsightError::InvalidParams(format!(
                "Failed to load tokenizer from {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { tokenizer })
    }
}

#[cfg(feature = "hf-tokenizer")]
impl TokenCounter for HfTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(e) => {
                tracing::warn!(error = %e, "Tokenizer failed, using estimate");
                ApproxTokenCounter.count_tokens(text)
            }
        }
    }
}

/// Lazy iterator over token-bounded chunks. See [`chunk_by_tokens`].
pub struct Chunks<'a, I: Iterator> {
    items: Fuse<I>,
    counter: &'a dyn TokenCounter,
    budget: usize,
    carry: Option<(I::Item, usize)>,
}

/// Group `items` greedily into chunks whose summed token count stays within
/// `budget`.
///
/// Order is preserved and items are never split. An item that exceeds the
/// budget on its own forms a chunk by itself. No chunk is ever empty.
pub fn chunk_by_tokens<'a, I>(
    items: I,
    counter: &'a dyn TokenCounter,
    budget: usize,
) -> Chunks<'a, I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    Chunks {
        items: items.into_iter().fuse(),
        counter,
        budget,
        carry: None,
    }
}

impl<I> Iterator for Chunks<'_, I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = Vec::new();
        let mut used = 0usize;

        if let Some((item, tokens)) = self.carry.take() {
            chunk.push(item);
            used = tokens;
        }

        for item in self.items.by_ref() {
            let tokens = self.counter.count_tokens(item.as_ref());
            if !chunk.is_empty() && used.saturating_add(tokens) > self.budget {
                self.carry = Some((item, tokens));
                break;
            }
            used = used.saturating_add(tokens);
            chunk.push(item);
        }

        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// One token per whitespace-separated word.
    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    #[test]
    fn test_approx_counter() {
        let c = ApproxTokenCounter;
        assert_eq!(c.count_tokens(""), 0);
        assert_eq!(c.count_tokens("abc"), 1);
        assert_eq!(c.count_tokens("abcd"), 1);
        assert_eq!(c.count_tokens("abcde"), 2);
        // Counts characters, not bytes
        assert_eq!(c.count_tokens("éééé"), 1);
    }

    #[test]
    fn test_greedy_grouping() {
        let items = vec!["a b", "c d", "e", "f g h"];
        let chunks: Vec<Vec<&str>> = chunk_by_tokens(items, &WordCounter, 5).collect();
        assert_eq!(chunks, vec![vec!["a b", "c d", "e"], vec!["f g h"]]);
    }

    #[test]
    fn test_oversized_item_forms_own_chunk() {
        let items = vec!["a", "b c d e f g", "h"];
        let chunks: Vec<Vec<&str>> = chunk_by_tokens(items, &WordCounter, 3).collect();
        assert_eq!(chunks, vec![vec!["a"], vec!["b c d e f g"], vec!["h"]]);
    }

    #[test]
    fn test_oversized_first_item_is_not_preceded_by_empty_chunk() {
        let items = vec!["a b c d", "e"];
        let chunks: Vec<Vec<&str>> = chunk_by_tokens(items, &WordCounter, 2).collect();
        assert_eq!(chunks, vec![vec!["a b c d"], vec!["e"]]);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let items: Vec<String> = Vec::new();
        assert_eq!(chunk_by_tokens(items, &WordCounter, 10).count(), 0);
    }

    #[test]
    fn test_is_lazy() {
        let mut seen = 0;
        let items = (0..).map(|i| {
            seen += 1;
            format!("word{}", i)
        });
        let first = chunk_by_tokens(items, &WordCounter, 3).next().unwrap();
        assert_eq!(first.len(), 3);
        // Three items in the chunk plus the one that overflowed it
        assert_eq!(seen, 4);
    }

    #[test]
    fn test_owned_strings() {
        let items: Vec<String> = vec!["x y".into(), "z".into()];
        let chunks: Vec<Vec<String>> = chunk_by_tokens(items, &ApproxTokenCounter, 100).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], vec!["x y".to_string(), "z".to_string()]);
    }

    proptest! {
        #[test]
        fn prop_chunks_reconstruct_input_within_budget(
            items in prop::collection::vec("[a-z ]{0,40}", 0..50),
            budget in 1usize..30,
        ) {
            let counter = WordCounter;
            let chunks: Vec<Vec<String>> =
                chunk_by_tokens(items.clone(), &counter, budget).collect();

            let flattened: Vec<String> = chunks.iter().flatten().cloned().collect();
            prop_assert_eq!(flattened, items);

            for chunk in &chunks {
                prop_assert!(!chunk.is_empty());
                let total: usize = chunk.iter().map(|s| counter.count_tokens(s)).sum();
                prop_assert!(total <= budget || chunk.len() == 1);
            }
        }
    }
}
