//! RAG context injection collaborator (§4.6 step 5).
//!
//! The orchestrator never implements retrieval itself — it is an external
//! collaborator, supplemented from the original's knowledge-base call sites
//! (`services/knowledge/...`) without reimplementing retrieval.

use async_trait::async_trait;

#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Top-`k` context chunks relevant to `query` for `user_id`, most
    /// relevant first.
    async fn top_k(&self, user_id: &str, query: &str, k: usize) -> Vec<String>;
}

/// Used when no knowledge base is configured; `top_k` always returns empty.
pub struct NoopContextProvider;

#[async_trait]
impl ContextProvider for NoopContextProvider {
    async fn top_k(&self, _user_id: &str, _query: &str, _k: usize) -> Vec<String> {
        Vec::new()
    }
}

/// Rewrites `message` to append `chunks`, bounded by `max_context_length`
/// characters of context (§4.6 step 5: "bounded by
/// `max_context_length`").
pub fn inject_context(message: &str, chunks: &[String], max_context_length: usize) -> String {
    if chunks.is_empty() {
        return message.to_string();
    }

    let mut context = String::new();
    for chunk in chunks {
        if context.len() + chunk.len() > max_context_length {
            break;
        }
        if !context.is_empty() {
            context.push_str("\n\n");
        }
        context.push_str(chunk);
    }

    if context.is_empty() {
        return message.to_string();
    }

    format!("Context:\n{context}\n\nQuestion: {message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_provider_returns_nothing() {
        let provider = NoopContextProvider;
        assert!(provider.top_k("u1", "query", 5).await.is_empty());
    }

    #[test]
    fn inject_context_is_identity_with_no_chunks() {
        assert_eq!(inject_context("hello", &[], 100), "hello");
    }

    #[test]
    fn inject_context_truncates_to_budget() {
        let chunks = vec!["a".repeat(50), "b".repeat(50), "c".repeat(50)];
        let rewritten = inject_context("q", &chunks, 80);
        assert!(rewritten.contains(&"a".repeat(50)));
        assert!(!rewritten.contains(&"c".repeat(50)));
    }
}
