//! BankMind LLM - Intelligent Model Orchestration
//!
//! This crate decides which backing language model serves a back-office
//! analysis request, tracks per-model performance, and retries once against a
//! fallback model when an invocation fails.
//!
//! ## Model Catalog
//! - `gpt-4o` (OpenAI): all task types up to HIGH complexity
//! - `claude-3-sonnet-20240229` (Anthropic): HIGH except recommendations
//! - `llama-3-70b` (local): MEDIUM ceiling, free to run
//!
//! ## Key Design Principles
//!
//! 1. The catalog is immutable after construction; its order doubles as the
//!    selection priority
//! 2. A selection miss is a catalog gap, surfaced immediately and never
//!    retried
//! 3. Invocation failures get exactly one fallback attempt, bounded by
//!    `max_attempts`
//! 4. Metrics are advisory telemetry behind a lock, shared via `Arc`

pub mod catalog;
pub mod metrics;
pub mod orchestrator;
pub mod providers;
pub mod types;

pub use catalog::*;
pub use metrics::*;
pub use orchestrator::*;
pub use providers::*;
pub use types::*;
