//! Shared request shape for `chat`/`chat_with_usage`/`chat_stream` (spec
//! §4.6): "if `messages` is provided it overrides `prompt`/`system_message`;
//! the last `user`-role message is the RAG query source."

use llm_resilience_core::{LogicalModel, OrchestrationError};
use llm_resilience_providers::Message;

#[derive(Clone)]
pub struct ChatArgs {
    pub model: LogicalModel,
    pub prompt: Option<String>,
    pub system_message: Option<String>,
    pub messages: Option<Vec<Message>>,
    pub user_id: Option<String>,
    pub use_knowledge_base: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub(crate) skip_load_balancing: bool,
}

impl ChatArgs {
    pub fn new(model: impl Into<LogicalModel>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: Some(prompt.into()),
            system_message: None,
            messages: None,
            user_id: None,
            use_knowledge_base: false,
            temperature: None,
            max_tokens: None,
            skip_load_balancing: false,
        }
    }

    pub fn with_messages(model: impl Into<LogicalModel>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            prompt: None,
            system_message: None,
            messages: Some(messages),
            user_id: None,
            use_knowledge_base: false,
            temperature: None,
            max_tokens: None,
            skip_load_balancing: false,
        }
    }

    pub fn system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn use_knowledge_base(mut self, use_knowledge_base: bool) -> Self {
        self.use_knowledge_base = use_knowledge_base;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Resolves this request into the message list a provider adapter
    /// consumes, given RAG context chunks already fetched for the last
    /// user-role message (or none, if RAG was skipped).
    pub(crate) fn resolve_messages(&self, rag_chunks: &[String], max_context_length: usize) -> Vec<Message> {
        let mut messages = match &self.messages {
            Some(messages) => messages.clone(),
            None => {
                let mut messages = Vec::new();
                if let Some(system_message) = &self.system_message {
                    messages.push(Message::text("system", system_message.clone()));
                }
                messages.push(Message::text("user", self.prompt.clone().unwrap_or_default()));
                messages
            }
        };

        if !rag_chunks.is_empty() {
            if let Some(last_user) = messages.iter_mut().rev().find(|m| m.role == "user") {
                let rewritten = crate::context::inject_context(&last_user.as_text(), rag_chunks, max_context_length);
                *last_user = Message::text("user", rewritten);
            }
        }

        messages
    }

    /// The text of the last `user`-role message, used as the RAG query.
    pub(crate) fn rag_query(&self) -> Option<String> {
        match &self.messages {
            Some(messages) => messages.iter().rev().find(|m| m.role == "user").map(|m| m.as_text()),
            None => self.prompt.clone(),
        }
    }

    /// Rejects an empty `messages` list or an empty/whitespace-only
    /// `prompt` (spec §8 boundary behavior: "Empty `messages` / empty
    /// `prompt` → Validation error before any provider call").
    pub(crate) fn validate(&self) -> Result<(), OrchestrationError> {
        match &self.messages {
            Some(messages) if messages.is_empty() => {
                Err(OrchestrationError::validation("messages must not be empty"))
            }
            Some(_) => Ok(()),
            None if self.prompt.as_deref().unwrap_or("").trim().is_empty() => {
                Err(OrchestrationError::validation("prompt must not be empty"))
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_override_prompt_and_system_message() {
        let args = ChatArgs::new("qwen", "ignored").with_messages_for_test();
        let resolved = args.resolve_messages(&[], 4000);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].as_text(), "from messages");
    }

    impl ChatArgs {
        fn with_messages_for_test(mut self) -> Self {
            self.messages = Some(vec![Message::text("user", "from messages")]);
            self
        }
    }

    #[test]
    fn prompt_and_system_message_become_two_messages() {
        let args = ChatArgs::new("qwen", "hello").system_message("be nice");
        let resolved = args.resolve_messages(&[], 4000);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].role, "system");
        assert_eq!(resolved[1].as_text(), "hello");
    }

    #[test]
    fn rag_query_is_last_user_message() {
        let args = ChatArgs::new("qwen", "x").with_messages_for_test();
        assert_eq!(args.rag_query().as_deref(), Some("from messages"));
    }

    #[test]
    fn empty_prompt_fails_validation() {
        let args = ChatArgs::new("qwen", "");
        assert_eq!(args.validate().unwrap_err().kind, llm_resilience_core::ErrorKind::Validation);
    }

    #[test]
    fn whitespace_only_prompt_fails_validation() {
        let args = ChatArgs::new("qwen", "   ");
        assert!(args.validate().is_err());
    }

    #[test]
    fn empty_messages_fail_validation() {
        let args = ChatArgs::with_messages("qwen", vec![]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn non_empty_prompt_and_messages_pass_validation() {
        assert!(ChatArgs::new("qwen", "hello").validate().is_ok());
        assert!(ChatArgs::with_messages("qwen", vec![Message::text("user", "hi")]).validate().is_ok());
    }
}
