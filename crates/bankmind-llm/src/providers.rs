//! Model invocation - provider families and their call stubs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::ModelDescriptor;
use crate::types::{LLMError, LLMRequest, Result};

/// Provider family a model belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI API
    OpenAi,
    /// Anthropic Claude API
    Anthropic,
    /// Locally hosted model
    Local,
}

impl ProviderKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "gpt" => Some(Self::OpenAi),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "local" | "llama" => Some(Self::Local),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Trait for model invokers
///
/// One implementation per provider family. The invocation is the only
/// suspension point in the orchestrator.
#[async_trait]
pub trait ModelInvoker: Send + Sync + std::fmt::Debug {
    /// Provider family this invoker serves
    fn kind(&self) -> ProviderKind;

    /// Call the model and return the raw completion text
    async fn invoke(&self, model: &ModelDescriptor, request: &LLMRequest) -> Result<String>;
}

/// OpenAI invoker
///
/// Placeholder that answers with a canned completion; the real chat API call
/// slots in here without touching the orchestrator.
#[derive(Debug)]
pub struct OpenAiInvoker;

#[async_trait]
impl ModelInvoker for OpenAiInvoker {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn invoke(&self, model: &ModelDescriptor, request: &LLMRequest) -> Result<String> {
        Ok(format!(
            "Response from {} for {} task",
            model.id, request.task_type
        ))
    }
}

/// Anthropic invoker, same placeholder shape as the OpenAI one
#[derive(Debug)]
pub struct AnthropicInvoker;

#[async_trait]
impl ModelInvoker for AnthropicInvoker {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn invoke(&self, model: &ModelDescriptor, request: &LLMRequest) -> Result<String> {
        Ok(format!(
            "Response from {} for {} task",
            model.id, request.task_type
        ))
    }
}

/// Invoker for locally hosted models
#[derive(Debug)]
pub struct LocalInvoker;

#[async_trait]
impl ModelInvoker for LocalInvoker {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn invoke(&self, model: &ModelDescriptor, request: &LLMRequest) -> Result<String> {
        Ok(format!(
            "Response from local {} for {} task",
            model.id, request.task_type
        ))
    }
}

/// Registry of invokers by provider family
///
/// Ships with the stub families registered; replace entries per kind to plug
/// in real integrations or test doubles.
#[derive(Clone)]
pub struct InvokerSet {
    invokers: HashMap<ProviderKind, Arc<dyn ModelInvoker>>,
}

impl InvokerSet {
    /// An empty set with no families registered
    pub fn empty() -> Self {
        Self {
            invokers: HashMap::new(),
        }
    }

    /// The built-in stub invokers for every provider family
    pub fn with_stubs() -> Self {
        let mut set = Self::empty();
        set.register(Arc::new(OpenAiInvoker));
        set.register(Arc::new(AnthropicInvoker));
        set.register(Arc::new(LocalInvoker));
        set
    }

    /// Register an invoker, replacing any previous one for its family
    pub fn register(&mut self, invoker: Arc<dyn ModelInvoker>) {
        self.invokers.insert(invoker.kind(), invoker);
    }

    pub fn get(&self, kind: ProviderKind) -> Result<&Arc<dyn ModelInvoker>> {
        self.invokers
            .get(&kind)
            .ok_or_else(|| LLMError::UnsupportedProvider {
                provider: kind.to_string(),
            })
    }
}

impl Default for InvokerSet {
    fn default() -> Self {
        Self::with_stubs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskType;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!(ProviderKind::from_str("openai"), Some(ProviderKind::OpenAi));
        assert_eq!(
            ProviderKind::from_str("claude"),
            Some(ProviderKind::Anthropic)
        );
        assert_eq!(ProviderKind::from_str("local"), Some(ProviderKind::Local));
        assert_eq!(ProviderKind::from_str("unknown"), None);
    }

    #[tokio::test]
    async fn test_stub_invokers_answer() {
        let set = InvokerSet::with_stubs();
        let model = ModelDescriptor::new("llama-3-70b", ProviderKind::Local);
        let request = LLMRequest::new("What changed this month?", TaskType::GeneralQuery);

        let invoker = set.get(ProviderKind::Local).unwrap();
        let content = invoker.invoke(&model, &request).await.unwrap();
        assert_eq!(
            content,
            "Response from local llama-3-70b for general_query task"
        );
    }

    #[test]
    fn test_missing_family_is_an_error() {
        let set = InvokerSet::empty();
        let err = set.get(ProviderKind::OpenAi).unwrap_err();
        assert!(matches!(err, LLMError::UnsupportedProvider { .. }));
    }
}
