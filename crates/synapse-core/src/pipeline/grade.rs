use std::future::Future;
use std::pin::Pin;

use futures::stream::{self, StreamExt};

use super::GradingUnavailable;
use super::step::Grader;
use super::types::{Fragment, Verdict};

type GradeFuture<'a> = Pin<Box<dyn Future<Output = Result<Verdict, GradingUnavailable>> + Send + 'a>>;

/// Grade every fragment against `question`, up to `concurrency` calls in flight.
///
/// Results come back in retrieval order regardless of completion order. Faults are
/// logged and returned as `Err` for the cascade to downgrade.
pub async fn grade_all<G: Grader>(
    grader: &G,
    question: &str,
    fragments: &[Fragment],
    concurrency: usize,
) -> Vec<Result<Verdict, GradingUnavailable>> {
    // Boxed up front so the returned future stays `Send` when spawned.
    let futs: Vec<GradeFuture<'_>> = fragments
        .iter()
        .enumerate()
        .map(|(i, fragment)| -> GradeFuture<'_> {
            Box::pin(async move {
                let result = grader.grade(question, &fragment.content).await;
                match &result {
                    Ok(verdict) => {
                        tracing::debug!(index = i, locator = %fragment.locator, %verdict, "graded fragment");
                    }
                    Err(e) => {
                        tracing::warn!(index = i, locator = %fragment.locator, "grading fault, treating as partial: {e}");
                    }
                }
                result
            })
        })
        .collect();

    stream::iter(futs).buffered(concurrency.max(1)).collect().await
}
