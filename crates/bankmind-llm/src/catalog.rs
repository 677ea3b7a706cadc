//! Model catalog - capability-tagged descriptors and selection order

use std::collections::HashMap;

use crate::providers::ProviderKind;
use crate::types::{LLMError, Result, TaskComplexity, TaskType};

/// One callable model entry in the catalog
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    /// Unique id, e.g. "gpt-4o"
    pub id: String,
    /// Provider family that knows how to invoke this model
    pub provider: ProviderKind,
    /// Maximum complexity served per task type; a task type with no entry
    /// cannot be routed to this model
    pub capabilities: HashMap<TaskType, TaskComplexity>,
    /// Cost per output token in USD, informational
    pub cost_per_token: f64,
    /// Largest output the model accepts
    pub max_tokens: u32,
    pub api_key: Option<String>,
    /// Filesystem path for locally hosted models
    pub model_path: Option<String>,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            id: id.into(),
            provider,
            capabilities: HashMap::new(),
            cost_per_token: 0.0,
            max_tokens: 4096,
            api_key: None,
            model_path: None,
        }
    }

    pub fn with_capability(mut self, task_type: TaskType, up_to: TaskComplexity) -> Self {
        self.capabilities.insert(task_type, up_to);
        self
    }

    pub fn with_cost_per_token(mut self, cost_per_token: f64) -> Self {
        self.cost_per_token = cost_per_token;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Whether this model can serve the task at the requested complexity
    pub fn supports(&self, task_type: TaskType, complexity: TaskComplexity) -> bool {
        self.capabilities
            .get(&task_type)
            .is_some_and(|up_to| *up_to >= complexity)
    }
}

/// Source of catalog entries
///
/// Swappable so tests and deployments can supply synthetic models without
/// touching configuration.
pub trait CatalogSource: Send + Sync {
    fn describe(&self) -> Vec<ModelDescriptor>;
}

impl CatalogSource for Vec<ModelDescriptor> {
    fn describe(&self) -> Vec<ModelDescriptor> {
        self.clone()
    }
}

/// The built-in model lineup, with credentials pulled from the environment
pub struct DefaultCatalog;

impl CatalogSource for DefaultCatalog {
    fn describe(&self) -> Vec<ModelDescriptor> {
        vec![
            ModelDescriptor {
                id: "gpt-4o".to_string(),
                provider: ProviderKind::OpenAi,
                capabilities: HashMap::from([
                    (TaskType::BehavioralAnalysis, TaskComplexity::High),
                    (TaskType::FinancialRecommendation, TaskComplexity::High),
                    (TaskType::RiskAssessment, TaskComplexity::High),
                    (TaskType::GeneralQuery, TaskComplexity::High),
                ]),
                cost_per_token: 0.000_01,
                max_tokens: 128_000,
                api_key: std::env::var("OPENAI_API_KEY").ok(),
                model_path: None,
            },
            ModelDescriptor {
                id: "claude-3-sonnet-20240229".to_string(),
                provider: ProviderKind::Anthropic,
                capabilities: HashMap::from([
                    (TaskType::BehavioralAnalysis, TaskComplexity::High),
                    (TaskType::FinancialRecommendation, TaskComplexity::Medium),
                    (TaskType::RiskAssessment, TaskComplexity::High),
                    (TaskType::GeneralQuery, TaskComplexity::High),
                ]),
                cost_per_token: 0.000_015,
                max_tokens: 200_000,
                api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                model_path: None,
            },
            ModelDescriptor {
                id: "llama-3-70b".to_string(),
                provider: ProviderKind::Local,
                capabilities: HashMap::from([
                    (TaskType::BehavioralAnalysis, TaskComplexity::Medium),
                    (TaskType::FinancialRecommendation, TaskComplexity::Low),
                    (TaskType::RiskAssessment, TaskComplexity::Medium),
                    (TaskType::GeneralQuery, TaskComplexity::Medium),
                ]),
                cost_per_token: 0.0,
                max_tokens: 8_000,
                api_key: None,
                model_path: std::env::var("BANKMIND_LOCAL_MODEL_PATH").ok(),
            },
        ]
    }
}

/// Immutable, ordered collection of models
///
/// Built once at orchestrator construction. Catalog order is load-bearing:
/// `select` returns the first qualifying entry and the fallback ring follows
/// the same order, so the lineup doubles as a priority list.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
}

impl ModelCatalog {
    pub fn from_source(source: &dyn CatalogSource) -> Result<Self> {
        let models = source.describe();
        if models.is_empty() {
            return Err(LLMError::ConfigurationError {
                message: "model catalog is empty".to_string(),
            });
        }
        for (i, model) in models.iter().enumerate() {
            if models[..i].iter().any(|other| other.id == model.id) {
                return Err(LLMError::ConfigurationError {
                    message: format!("duplicate model id: {}", model.id),
                });
            }
        }
        Ok(Self { models })
    }

    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Pick the first catalog entry that serves the task at the requested
    /// complexity, or `None` when nothing qualifies
    ///
    /// No scoring across candidates: among equally qualified models the
    /// earlier entry always wins.
    pub fn select(
        &self,
        task_type: TaskType,
        complexity: TaskComplexity,
    ) -> Option<&ModelDescriptor> {
        self.models
            .iter()
            .find(|m| m.supports(task_type, complexity))
    }

    /// Round-robin successor of a failed model, ignoring capability
    ///
    /// Returns `None` when the failed id is not in the catalog.
    pub fn fallback_after(&self, failed_id: &str) -> Option<&ModelDescriptor> {
        let idx = self.models.iter().position(|m| m.id == failed_id)?;
        Some(&self.models[(idx + 1) % self.models.len()])
    }

    /// Like `fallback_after`, but walks the ring until it finds a candidate
    /// that passes the same capability check `select` uses
    ///
    /// Never yields the failed model itself; `None` when no other entry
    /// qualifies.
    pub fn fallback_after_capable(
        &self,
        failed_id: &str,
        task_type: TaskType,
        complexity: TaskComplexity,
    ) -> Option<&ModelDescriptor> {
        let idx = self.models.iter().position(|m| m.id == failed_id)?;
        let len = self.models.len();
        (1..len)
            .map(|step| &self.models[(idx + step) % len])
            .find(|m| m.supports(task_type, complexity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(models: Vec<ModelDescriptor>) -> ModelCatalog {
        ModelCatalog::from_source(&models).unwrap()
    }

    #[test]
    fn test_selection_monotonicity() {
        let catalog = catalog(vec![ModelDescriptor::new("only", ProviderKind::Local)
            .with_capability(TaskType::RiskAssessment, TaskComplexity::High)]);

        for complexity in [
            TaskComplexity::Low,
            TaskComplexity::Medium,
            TaskComplexity::High,
        ] {
            let selected = catalog.select(TaskType::RiskAssessment, complexity);
            assert_eq!(selected.map(|m| m.id.as_str()), Some("only"));
        }
    }

    #[test]
    fn test_first_match_wins() {
        let catalog = catalog(vec![
            ModelDescriptor::new("first", ProviderKind::OpenAi)
                .with_capability(TaskType::GeneralQuery, TaskComplexity::High)
                .with_cost_per_token(0.000_01)
                .with_max_tokens(64_000),
            ModelDescriptor::new("second", ProviderKind::Anthropic)
                .with_capability(TaskType::GeneralQuery, TaskComplexity::High),
        ]);

        for _ in 0..3 {
            let selected = catalog.select(TaskType::GeneralQuery, TaskComplexity::Low);
            assert_eq!(selected.map(|m| m.id.as_str()), Some("first"));
        }
    }

    #[test]
    fn test_insufficient_tier_skipped() {
        let catalog = catalog(vec![
            ModelDescriptor::new("small", ProviderKind::Local)
                .with_capability(TaskType::GeneralQuery, TaskComplexity::Low),
            ModelDescriptor::new("big", ProviderKind::OpenAi)
                .with_capability(TaskType::GeneralQuery, TaskComplexity::High),
        ]);

        let selected = catalog.select(TaskType::GeneralQuery, TaskComplexity::High);
        assert_eq!(selected.map(|m| m.id.as_str()), Some("big"));
    }

    #[test]
    fn test_no_candidate_returns_none() {
        let catalog = catalog(vec![ModelDescriptor::new("general", ProviderKind::Local)
            .with_capability(TaskType::GeneralQuery, TaskComplexity::High)]);

        assert!(catalog
            .select(TaskType::RiskAssessment, TaskComplexity::Low)
            .is_none());
    }

    #[test]
    fn test_fallback_round_robin_wraps() {
        let catalog = catalog(vec![
            ModelDescriptor::new("a", ProviderKind::OpenAi),
            ModelDescriptor::new("b", ProviderKind::Anthropic),
            ModelDescriptor::new("c", ProviderKind::Local),
        ]);

        assert_eq!(catalog.fallback_after("a").map(|m| m.id.as_str()), Some("b"));
        assert_eq!(catalog.fallback_after("c").map(|m| m.id.as_str()), Some("a"));
        assert!(catalog.fallback_after("missing").is_none());
    }

    #[test]
    fn test_single_model_falls_back_to_itself() {
        let catalog = catalog(vec![ModelDescriptor::new("solo", ProviderKind::Local)]);
        assert_eq!(
            catalog.fallback_after("solo").map(|m| m.id.as_str()),
            Some("solo")
        );
    }

    #[test]
    fn test_capability_checked_fallback_skips_unqualified() {
        let catalog = catalog(vec![
            ModelDescriptor::new("a", ProviderKind::OpenAi)
                .with_capability(TaskType::RiskAssessment, TaskComplexity::High),
            ModelDescriptor::new("b", ProviderKind::Anthropic)
                .with_capability(TaskType::GeneralQuery, TaskComplexity::High),
            ModelDescriptor::new("c", ProviderKind::Local)
                .with_capability(TaskType::RiskAssessment, TaskComplexity::High),
        ]);

        // blind successor is "b", but it cannot serve risk assessment
        let next = catalog.fallback_after_capable(
            "a",
            TaskType::RiskAssessment,
            TaskComplexity::High,
        );
        assert_eq!(next.map(|m| m.id.as_str()), Some("c"));

        // nothing in the lineup serves recommendations, so the ring runs dry
        let none = catalog.fallback_after_capable(
            "b",
            TaskType::FinancialRecommendation,
            TaskComplexity::Low,
        );
        assert!(none.is_none());
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let result = ModelCatalog::from_source(&Vec::<ModelDescriptor>::new());
        assert!(matches!(
            result,
            Err(LLMError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = ModelCatalog::from_source(&vec![
            ModelDescriptor::new("twin", ProviderKind::OpenAi),
            ModelDescriptor::new("twin", ProviderKind::Local),
        ]);
        assert!(matches!(
            result,
            Err(LLMError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_default_catalog_lineup() {
        let models = DefaultCatalog.describe();
        let ids: Vec<_> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["gpt-4o", "claude-3-sonnet-20240229", "llama-3-70b"]);

        let catalog = ModelCatalog::from_source(&DefaultCatalog).unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(!catalog.is_empty());
        assert!(catalog.get("llama-3-70b").is_some());

        // the local model tops out at LOW for recommendations, so a HIGH
        // request must route past it
        let selected = catalog
            .select(TaskType::FinancialRecommendation, TaskComplexity::High)
            .unwrap();
        assert_eq!(selected.id, "gpt-4o");
    }
}
