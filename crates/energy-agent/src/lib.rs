//! Energy optimization agent.
//!
//! Drives [`energy_eval`] benchmarks with an evaluator in the loop: each
//! iteration shows the evaluator the original, best and current code with
//! their measurements, takes the next candidate from its reply and
//! evaluates it.

pub mod candidate;
pub mod config;
pub mod evaluator;
pub mod optimizer;
pub mod output;

pub use config::{AgentConfig, LlmConfig};
pub use evaluator::{EvaluatorClient, EvaluatorError, FeedbackRequest, HttpEvaluator};
pub use optimizer::{IterationOutcome, Optimizer};
pub use output::RunArtifacts;
