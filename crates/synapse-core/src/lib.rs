//! Question answering over an indexed code repository.
//!
//! [`pipeline`] runs retrieve → grade & filter → generate for one question;
//! [`profiler`] proposes starter questions; [`config`] loads settings.

pub mod config;
pub mod pipeline;
pub mod profiler;

pub use pipeline::{Orchestrator, Outcome, PipelineConfig, PipelineError};
