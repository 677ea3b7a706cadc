//! LLM Orchestrator - selects models, dispatches requests, falls back on failure

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::catalog::{CatalogSource, DefaultCatalog, ModelCatalog, ModelDescriptor};
use crate::metrics::MetricsStore;
use crate::providers::{InvokerSet, ModelInvoker};
use crate::types::{LLMError, LLMRequest, LLMResponse, Result, TokenEstimator, WordCount};

/// Runtime knobs for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Total invocation attempts per request: the primary plus fallbacks
    pub max_attempts: u32,
    /// Upper bound on a single model invocation; a timeout counts as an
    /// ordinary invocation failure
    pub invoke_timeout: Duration,
    /// Restrict fallback candidates to models that can actually serve the
    /// request, instead of the blind round-robin successor
    pub capability_checked_fallback: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            invoke_timeout: Duration::from_secs(30),
            capability_checked_fallback: false,
        }
    }
}

impl OrchestratorConfig {
    /// Read configuration from the environment
    ///
    /// Recognizes `BANKMIND_LLM_MAX_ATTEMPTS`, `BANKMIND_LLM_TIMEOUT_SECS`,
    /// and `BANKMIND_LLM_CAPABILITY_FALLBACK`. A `.env` file is honored when
    /// present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        Self {
            max_attempts: env_parse("BANKMIND_LLM_MAX_ATTEMPTS", defaults.max_attempts),
            invoke_timeout: Duration::from_secs(env_parse(
                "BANKMIND_LLM_TIMEOUT_SECS",
                defaults.invoke_timeout.as_secs(),
            )),
            capability_checked_fallback: env_flag("BANKMIND_LLM_CAPABILITY_FALLBACK"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Selects a model per request, invokes it, and retries once against a
/// fallback when the call fails
///
/// The catalog is immutable after construction; the metrics store is the only
/// mutable state and is shared out as an `Arc`.
pub struct LLMOrchestrator {
    catalog: ModelCatalog,
    invokers: InvokerSet,
    metrics: Arc<MetricsStore>,
    estimator: Box<dyn TokenEstimator>,
    config: OrchestratorConfig,
}

impl LLMOrchestrator {
    /// Build an orchestrator from a catalog source
    ///
    /// Seeds a zeroed metrics record for every model in the catalog. Fails
    /// when the source yields an empty or inconsistent catalog.
    pub fn new(
        source: &dyn CatalogSource,
        invokers: InvokerSet,
        config: OrchestratorConfig,
    ) -> Result<Self> {
        let catalog = ModelCatalog::from_source(source)?;
        let metrics = Arc::new(MetricsStore::for_models(catalog.ids()));
        Ok(Self {
            catalog,
            invokers,
            metrics,
            estimator: Box::new(WordCount),
            config,
        })
    }

    /// The built-in catalog, stub invokers, and environment configuration
    pub fn from_env() -> Result<Self> {
        let config = OrchestratorConfig::from_env();
        Self::new(&DefaultCatalog, InvokerSet::default(), config)
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Handle on the shared metrics store
    pub fn metrics(&self) -> Arc<MetricsStore> {
        Arc::clone(&self.metrics)
    }

    /// Process a request end to end
    ///
    /// Selects a model for the task, invokes it under the configured timeout,
    /// and records per-model metrics for every attempt. On failure the
    /// round-robin fallback is tried until `max_attempts` is exhausted; the
    /// last invocation error is surfaced to the caller. A selection miss is a
    /// catalog gap and is never retried.
    pub async fn process_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        let request_id = uuid::Uuid::new_v4();

        let mut model = self
            .catalog
            .select(request.task_type, request.complexity)
            .ok_or(LLMError::NoSuitableModel {
                task_type: request.task_type,
                complexity: request.complexity,
            })?;

        tracing::info!(
            "Selected model {} for {} task ({})",
            model.id,
            request.task_type,
            request_id
        );

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let started = Instant::now();

            match self.invoke(model, request).await {
                Ok(content) => {
                    let processing_time = started.elapsed();
                    self.metrics.record_success(&model.id, processing_time);

                    let tokens_used = self.estimator.estimate(&content);
                    let mut metadata = HashMap::new();
                    metadata.insert(
                        "model_id".to_string(),
                        serde_json::Value::String(model.id.clone()),
                    );
                    metadata.insert(
                        "request_id".to_string(),
                        serde_json::Value::String(request_id.to_string()),
                    );

                    return Ok(LLMResponse {
                        content,
                        model_used: model.id.clone(),
                        tokens_used,
                        processing_time,
                        metadata,
                    });
                }
                Err(error) => {
                    self.metrics.record_error(&model.id);
                    tracing::warn!(
                        "Model {} failed on attempt {}: {} ({})",
                        model.id,
                        attempt,
                        error,
                        request_id
                    );

                    if attempt >= self.config.max_attempts {
                        tracing::error!(
                            "Giving up after {} attempts ({})",
                            attempt,
                            request_id
                        );
                        return Err(error);
                    }

                    let fallback = if self.config.capability_checked_fallback {
                        self.catalog.fallback_after_capable(
                            &model.id,
                            request.task_type,
                            request.complexity,
                        )
                    } else {
                        self.catalog.fallback_after(&model.id)
                    };

                    match fallback {
                        Some(next) if next.id != model.id => {
                            tracing::info!(
                                "Trying fallback model {} ({})",
                                next.id,
                                request_id
                            );
                            model = next;
                        }
                        _ => {
                            tracing::error!(
                                "No fallback model available after {} ({})",
                                model.id,
                                request_id
                            );
                            return Err(error);
                        }
                    }
                }
            }
        }
    }

    /// Invoke one model under the configured timeout
    async fn invoke(&self, model: &ModelDescriptor, request: &LLMRequest) -> Result<String> {
        let invoker = self.invokers.get(model.provider)?;
        match tokio::time::timeout(self.config.invoke_timeout, invoker.invoke(model, request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(LLMError::Timeout {
                model: model.id.clone(),
                seconds: self.config.invoke_timeout.as_secs(),
            }),
        }
    }
}

/// Builder for an orchestrator with explicit parts
pub struct OrchestratorBuilder {
    source: Option<Box<dyn CatalogSource>>,
    invokers: InvokerSet,
    estimator: Option<Box<dyn TokenEstimator>>,
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            invokers: InvokerSet::default(),
            estimator: None,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_source(mut self, source: impl CatalogSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_invoker(mut self, invoker: Arc<dyn ModelInvoker>) -> Self {
        self.invokers.register(invoker);
        self
    }

    pub fn with_invokers(mut self, invokers: InvokerSet) -> Self {
        self.invokers = invokers;
        self
    }

    pub fn with_estimator(mut self, estimator: impl TokenEstimator + 'static) -> Self {
        self.estimator = Some(Box::new(estimator));
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<LLMOrchestrator> {
        let mut orchestrator = match self.source {
            Some(source) => LLMOrchestrator::new(source.as_ref(), self.invokers, self.config)?,
            None => LLMOrchestrator::new(&DefaultCatalog, self.invokers, self.config)?,
        };
        if let Some(estimator) = self.estimator {
            orchestrator.estimator = estimator;
        }
        Ok(orchestrator)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
