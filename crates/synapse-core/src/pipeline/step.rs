use std::future::Future;
use std::sync::Arc;

use super::types::{Fragment, Verdict};
use super::{GenerationFailed, GradingUnavailable, IndexUnavailable};

/// Candidate lookup for a question. Implementations must be safe to share across
/// concurrent runs.
pub trait Retriever: Send + Sync {
    /// Ordered candidates, best-effort similarity order. No results is `Ok(vec![])`.
    ///
    /// # Errors
    ///
    /// Returns `IndexUnavailable` only when the backend cannot be queried at all.
    fn retrieve(
        &self,
        question: &str,
    ) -> impl Future<Output = Result<Vec<Fragment>, IndexUnavailable>> + Send;
}

/// Per-fragment relevance classification.
pub trait Grader: Send + Sync {
    /// # Errors
    ///
    /// Returns `GradingUnavailable` on timeout, transport failure, or an unparsable verdict.
    fn grade(
        &self,
        question: &str,
        fragment: &str,
    ) -> impl Future<Output = Result<Verdict, GradingUnavailable>> + Send;
}

/// Answer synthesis from assembled context.
pub trait Generator: Send + Sync {
    /// Returns the answer verbatim; an "I don't know" reply is a valid answer.
    ///
    /// # Errors
    ///
    /// Returns `GenerationFailed` if the backend errors.
    fn generate(
        &self,
        question: &str,
        context: &str,
    ) -> impl Future<Output = Result<String, GenerationFailed>> + Send;
}

impl<T: Retriever> Retriever for Arc<T> {
    fn retrieve(
        &self,
        question: &str,
    ) -> impl Future<Output = Result<Vec<Fragment>, IndexUnavailable>> + Send {
        (**self).retrieve(question)
    }
}

impl<T: Grader> Grader for Arc<T> {
    fn grade(
        &self,
        question: &str,
        fragment: &str,
    ) -> impl Future<Output = Result<Verdict, GradingUnavailable>> + Send {
        (**self).grade(question, fragment)
    }
}

impl<T: Generator> Generator for Arc<T> {
    fn generate(
        &self,
        question: &str,
        context: &str,
    ) -> impl Future<Output = Result<String, GenerationFailed>> + Send {
        (**self).generate(question, context)
    }
}
