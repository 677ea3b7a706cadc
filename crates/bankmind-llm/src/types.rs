//! Common types for LLM orchestration

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during LLM orchestration
#[derive(Error, Debug)]
pub enum LLMError {
    #[error("no suitable model for {task_type} task at {complexity} complexity")]
    NoSuitableModel {
        task_type: TaskType,
        complexity: TaskComplexity,
    },

    #[error("model {model} failed: {message}")]
    InvocationFailed { model: String, message: String },

    #[error("model {model} timed out after {seconds}s")]
    Timeout { model: String, seconds: u64 },

    #[error("unsupported model provider: {provider}")]
    UnsupportedProvider { provider: String },

    #[error("configuration error: {message}")]
    ConfigurationError { message: String },
}

pub type Result<T> = std::result::Result<T, LLMError>;

/// Kind of analysis a request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    BehavioralAnalysis,
    FinancialRecommendation,
    RiskAssessment,
    GeneralQuery,
}

impl TaskType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "behavioral_analysis" => Some(Self::BehavioralAnalysis),
            "financial_recommendation" => Some(Self::FinancialRecommendation),
            "risk_assessment" => Some(Self::RiskAssessment),
            "general_query" => Some(Self::GeneralQuery),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BehavioralAnalysis => write!(f, "behavioral_analysis"),
            Self::FinancialRecommendation => write!(f, "financial_recommendation"),
            Self::RiskAssessment => write!(f, "risk_assessment"),
            Self::GeneralQuery => write!(f, "general_query"),
        }
    }
}

/// Complexity tier a request demands, or the most a model can serve
///
/// The derived ordering is Low < Medium < High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskComplexity {
    Low,
    Medium,
    High,
}

impl Default for TaskComplexity {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for TaskComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// One unit of work submitted to the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMRequest {
    pub prompt: String,
    pub task_type: TaskType,
    #[serde(default)]
    pub complexity: TaskComplexity,
    /// Free-form context handed through to the model call untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, serde_json::Value>>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

impl LLMRequest {
    pub fn new(prompt: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            prompt: prompt.into(),
            task_type,
            complexity: TaskComplexity::default(),
            context: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn with_complexity(mut self, complexity: TaskComplexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_context(mut self, context: HashMap<String, serde_json::Value>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Result of a successful dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// The generated content
    pub content: String,
    /// Model that actually produced the content; differs from the originally
    /// selected model when a fallback served the request
    pub model_used: String,
    /// Estimated output size in tokens
    pub tokens_used: u32,
    /// Wall-clock time of the serving invocation
    pub processing_time: Duration,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Estimates output size in tokens
///
/// Injected into the orchestrator so the crude default can be swapped for a
/// real tokenizer without touching the dispatch contract.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> u32;
}

/// Whitespace-delimited word count, a deliberately rough approximation
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCount;

impl TokenEstimator for WordCount {
    fn estimate(&self, text: &str) -> u32 {
        text.split_whitespace().count() as u32
    }
}
