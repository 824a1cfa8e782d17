use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::cascade::{CascadePolicy, select_evidence};
use super::grade::grade_all;
use super::step::{Generator, Grader, Retriever};
use super::types::{Outcome, RunState, Stage, StageEvent};
use super::PipelineError;

pub type StageEventTx = UnboundedSender<StageEvent>;

/// Fragment separator in the generation context.
pub const CONTEXT_DELIMITER: &str = "\n\n";

pub const DEFAULT_GRADE_CONCURRENCY: usize = 4;

/// Collaborators and policy for building an [`Orchestrator`].
pub struct PipelineConfig<R, G, W> {
    pub retriever: R,
    pub grader: G,
    pub generator: W,
    pub policy: CascadePolicy,
    pub grade_concurrency: usize,
}

impl<R, G, W> PipelineConfig<R, G, W> {
    pub fn new(retriever: R, grader: G, generator: W) -> Self {
        Self {
            retriever,
            grader,
            generator,
            policy: CascadePolicy::default(),
            grade_concurrency: DEFAULT_GRADE_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: CascadePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_grade_concurrency(mut self, n: usize) -> Self {
        self.grade_concurrency = n;
        self
    }
}

/// Outgoing edge of the grade stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Generate,
    End,
}

/// The only conditional edge: stop when there is no evidence.
#[must_use]
pub fn decide_to_generate(state: &RunState) -> Next {
    if state.fragments.is_empty() {
        Next::End
    } else {
        Next::Generate
    }
}

enum Node {
    Start,
    Retrieved,
    Graded,
    Generated(String),
    Empty,
}

/// Reusable, stateless pipeline. Each [`run`](Self::run) owns its own [`RunState`],
/// so one orchestrator can serve concurrent questions.
pub struct Orchestrator<R, G, W> {
    retriever: R,
    grader: G,
    generator: W,
    policy: CascadePolicy,
    grade_concurrency: usize,
}

impl<R: Retriever, G: Grader, W: Generator> Orchestrator<R, G, W> {
    #[must_use]
    pub fn new(config: PipelineConfig<R, G, W>) -> Self {
        Self {
            retriever: config.retriever,
            grader: config.grader,
            generator: config.generator,
            policy: config.policy,
            grade_concurrency: config.grade_concurrency.max(1),
        }
    }

    /// Answer one question.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is unreachable or the generator fails.
    pub async fn run(&self, question: &str) -> Result<Outcome, PipelineError> {
        self.drive(question, None).await
    }

    /// Like [`run`](Self::run), sending one [`StageEvent`] per completed stage.
    /// A dropped receiver does not affect the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is unreachable or the generator fails.
    pub async fn run_with_events(
        &self,
        question: &str,
        events: &StageEventTx,
    ) -> Result<Outcome, PipelineError> {
        self.drive(question, Some(events)).await
    }

    async fn drive(
        &self,
        question: &str,
        events: Option<&StageEventTx>,
    ) -> Result<Outcome, PipelineError> {
        let span = tracing::info_span!("pipeline_run", question_chars = question.chars().count());
        self.traverse(question, events).instrument(span).await
    }

    async fn traverse(
        &self,
        question: &str,
        events: Option<&StageEventTx>,
    ) -> Result<Outcome, PipelineError> {
        let emit = |event: StageEvent| {
            tracing::info!(stage = %event.stage(), "{event}");
            if let Some(tx) = events {
                let _ = tx.send(event);
            }
        };

        let mut state = RunState::new(question);
        let mut node = Node::Start;
        loop {
            node = match node {
                Node::Start => {
                    state.fragments = self.retriever.retrieve(&state.question).await?;
                    emit(StageEvent::Retrieved {
                        fragments: state.fragments.len(),
                    });
                    Node::Retrieved
                }
                Node::Retrieved => {
                    let grades = grade_all(
                        &self.grader,
                        &state.question,
                        &state.fragments,
                        self.grade_concurrency,
                    )
                    .await;
                    let selection = select_evidence(&state.fragments, &grades, &self.policy);
                    let summary = &selection.summary;
                    tracing::debug!(
                        relevant = summary.relevant,
                        partial = summary.partial,
                        irrelevant = summary.irrelevant,
                        faults = summary.faults,
                        tier = summary.tier.as_str(),
                        "evidence selected"
                    );
                    state.fragments = selection.evidence;
                    emit(StageEvent::Graded(selection.summary));
                    Node::Graded
                }
                Node::Graded => match decide_to_generate(&state) {
                    Next::End => Node::Empty,
                    Next::Generate => {
                        let context = state
                            .fragments
                            .iter()
                            .map(|f| f.content.as_str())
                            .collect::<Vec<_>>()
                            .join(CONTEXT_DELIMITER);
                        let answer = self.generator.generate(&state.question, &context).await?;
                        emit(StageEvent::Generated {
                            answer_chars: answer.chars().count(),
                        });
                        state.generation = Some(answer.clone());
                        Node::Generated(answer)
                    }
                },
                Node::Generated(answer) => return Ok(Outcome::Answer(answer)),
                Node::Empty => {
                    tracing::info!(stage = %Stage::Grade, "no evidence, skipping generation");
                    return Ok(Outcome::Empty);
                }
            };
        }
    }
}

impl<R, G, W> Orchestrator<R, G, W>
where
    R: Retriever + 'static,
    G: Grader + 'static,
    W: Generator + 'static,
{
    /// Run on a spawned task. The receiver yields stage events and closes when the
    /// run finishes; the handle resolves to the outcome.
    pub fn stream(
        self: Arc<Self>,
        question: impl Into<String>,
    ) -> (
        UnboundedReceiver<StageEvent>,
        JoinHandle<Result<Outcome, PipelineError>>,
    ) {
        let question = question.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move { self.run_with_events(&question, &tx).await });
        (rx, handle)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::pipeline::types::{EvidenceTier, Fragment, Verdict};
    use crate::pipeline::{GenerationFailed, GradingUnavailable, IndexUnavailable};

    struct FixedRetriever(Option<Vec<Fragment>>);

    impl Retriever for FixedRetriever {
        async fn retrieve(&self, _question: &str) -> Result<Vec<Fragment>, IndexUnavailable> {
            self.0
                .clone()
                .ok_or_else(|| IndexUnavailable::new("connection refused"))
        }
    }

    #[derive(Default)]
    struct ScriptedGrader {
        by_content: HashMap<String, Verdict>,
        calls: AtomicUsize,
    }

    impl Grader for ScriptedGrader {
        async fn grade(&self, _question: &str, fragment: &str) -> Result<Verdict, GradingUnavailable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.by_content
                .get(fragment)
                .copied()
                .ok_or_else(|| GradingUnavailable::new("unscripted"))
        }
    }

    #[derive(Default)]
    struct RecordingGenerator {
        contexts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Generator for RecordingGenerator {
        async fn generate(&self, question: &str, context: &str) -> Result<String, GenerationFailed> {
            self.contexts.lock().unwrap().push(context.to_owned());
            if self.fail {
                return Err(GenerationFailed::new("HTTP 503"));
            }
            Ok(format!("answer to {question}"))
        }
    }

    fn frags(names: &[&str]) -> Vec<Fragment> {
        names.iter().map(|n| Fragment::new(*n, format!("{n}.py"))).collect()
    }

    fn grader(pairs: &[(&str, Verdict)]) -> ScriptedGrader {
        ScriptedGrader {
            by_content: pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    fn pipeline(
        retrieved: Option<Vec<Fragment>>,
        grader: ScriptedGrader,
        generator: RecordingGenerator,
    ) -> Orchestrator<FixedRetriever, ScriptedGrader, RecordingGenerator> {
        Orchestrator::new(PipelineConfig::new(FixedRetriever(retrieved), grader, generator))
    }

    #[test]
    fn decide_to_generate_is_empty_check() {
        let mut state = RunState::new("q");
        assert_eq!(decide_to_generate(&state), Next::End);
        state.fragments = frags(&["a"]);
        assert_eq!(decide_to_generate(&state), Next::Generate);
    }

    #[tokio::test]
    async fn answer_uses_selected_evidence_in_order() {
        let p = pipeline(
            Some(frags(&["a", "b", "c"])),
            grader(&[
                ("a", Verdict::Irrelevant),
                ("b", Verdict::Partial),
                ("c", Verdict::Relevant),
            ]),
            RecordingGenerator::default(),
        );

        let outcome = p.run("what is c?").await.unwrap();

        assert_eq!(outcome, Outcome::Answer("answer to what is c?".into()));
        assert_eq!(*p.generator.contexts.lock().unwrap(), ["c\n\nb"]);
    }

    #[tokio::test]
    async fn empty_retrieval_skips_grading_and_generation() {
        let p = pipeline(Some(vec![]), ScriptedGrader::default(), RecordingGenerator::default());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = p.run_with_events("q", &tx).await.unwrap();
        drop(tx);

        assert_eq!(outcome, Outcome::Empty);
        assert_eq!(p.grader.calls.load(Ordering::SeqCst), 0);
        assert!(p.generator.contexts.lock().unwrap().is_empty());

        let mut stages = Vec::new();
        while let Some(ev) = rx.recv().await {
            stages.push(ev.stage());
        }
        assert_eq!(stages, [Stage::Retrieve, Stage::Grade]);
    }

    #[tokio::test]
    async fn index_failure_aborts_before_grading() {
        let p = pipeline(None, ScriptedGrader::default(), RecordingGenerator::default());
        let err = p.run("q").await.unwrap_err();
        assert_eq!(err.stage(), Stage::Retrieve);
        assert_eq!(p.grader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generation_failure_surfaces_as_error() {
        let p = pipeline(
            Some(frags(&["a"])),
            grader(&[("a", Verdict::Relevant)]),
            RecordingGenerator {
                fail: true,
                ..RecordingGenerator::default()
            },
        );
        let err = p.run("q").await.unwrap_err();
        assert_eq!(err.stage(), Stage::Generate);
        assert!(matches!(err, PipelineError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn stream_emits_one_event_per_stage_then_closes() {
        let p = Arc::new(pipeline(
            Some(frags(&["a", "b"])),
            grader(&[("a", Verdict::Irrelevant), ("b", Verdict::Irrelevant)]),
            RecordingGenerator::default(),
        ));

        let (mut rx, handle) = Arc::clone(&p).stream("q");
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        let outcome = handle.await.unwrap().unwrap();

        assert!(matches!(outcome, Outcome::Answer(_)));
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], StageEvent::Retrieved { fragments: 2 });
        match &events[1] {
            StageEvent::Graded(summary) => {
                assert_eq!(summary.tier, EvidenceTier::Floor);
                assert_eq!(summary.evidence, 2);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[2].stage(), Stage::Generate);
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_fail_run() {
        let p = pipeline(
            Some(frags(&["a"])),
            grader(&[("a", Verdict::Partial)]),
            RecordingGenerator::default(),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        assert!(p.run_with_events("q", &tx).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_runs_do_not_share_state() {
        let p = Arc::new(pipeline(
            Some(frags(&["a", "b"])),
            grader(&[("a", Verdict::Relevant), ("b", Verdict::Partial)]),
            RecordingGenerator::default(),
        ));

        let runs = (0..8).map(|i| {
            let p = Arc::clone(&p);
            tokio::spawn(async move { p.run(&format!("q{i}")).await })
        });
        for (i, run) in runs.collect::<Vec<_>>().into_iter().enumerate() {
            let outcome = run.await.unwrap().unwrap();
            assert_eq!(outcome, Outcome::Answer(format!("answer to q{i}")));
        }
        assert!(
            p.generator
                .contexts
                .lock()
                .unwrap()
                .iter()
                .all(|c| c == "a\n\nb")
        );
    }
}
