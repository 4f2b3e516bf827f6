use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pygloss::{
    ExplainError, ExplainRequest, Explainer, ExplanationResult, ReviewOptions, Sandbox, review,
};

/// Test double that records every call instead of going to a network.
struct StubExplainer {
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl StubExplainer {
    fn new(fail: bool) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
                fail,
            },
            calls,
        )
    }
}

#[async_trait]
impl Explainer for StubExplainer {
    async fn explain(&self, request: ExplainRequest<'_>) -> Result<String, ExplainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExplainError::Provider {
                status: 500,
                body: "stub outage".to_string(),
            });
        }
        Ok(format!("explained {} bytes", request.code.len()))
    }
}

const CODE: &str = "def f(x):\n    return x+1\nfor i in range(3):\n    f(i)\n";

#[tokio::test]
async fn summary_is_always_present() {
    let sandbox = Sandbox::new();
    let result = review(CODE, &ReviewOptions::default(), &sandbox, None).await;
    assert!(result.summary.facts().is_some());
    assert!(result.sandbox.is_none());
    assert!(result.explanation.is_none());
}

#[tokio::test]
async fn sandbox_runs_only_when_asked() {
    let sandbox = Sandbox::new();
    let options = ReviewOptions {
        run_sandbox: true,
        use_llm: false,
    };
    let result = review("print(1 + 1)", &options, &sandbox, None).await;
    let run = result.sandbox.expect("sandbox was requested");
    assert_eq!(run.output(), "2\n");
}

#[tokio::test]
async fn llm_toggle_off_means_zero_calls() {
    let (stub, calls) = StubExplainer::new(false);
    let sandbox = Sandbox::new();
    let options = ReviewOptions {
        run_sandbox: false,
        use_llm: false,
    };
    let result = review(CODE, &options, &sandbox, Some(&stub as &dyn Explainer)).await;
    assert!(result.explanation.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_credential_means_zero_calls() {
    let sandbox = Sandbox::new();
    let options = ReviewOptions {
        run_sandbox: false,
        use_llm: true,
    };
    let result = review(CODE, &options, &sandbox, None).await;
    assert!(result.explanation.is_none());
}

#[tokio::test]
async fn explanation_arrives_when_enabled() {
    let (stub, calls) = StubExplainer::new(false);
    let sandbox = Sandbox::new();
    let options = ReviewOptions {
        run_sandbox: false,
        use_llm: true,
    };
    let result = review(CODE, &options, &sandbox, Some(&stub as &dyn Explainer)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    match result.explanation {
        Some(ExplanationResult::Text { text }) => assert!(text.starts_with("explained")),
        other => panic!("expected explanation text, got {other:?}"),
    }
}

#[tokio::test]
async fn explainer_failure_never_blocks_other_results() {
    let (stub, _calls) = StubExplainer::new(true);
    let sandbox = Sandbox::new();
    let options = ReviewOptions {
        run_sandbox: true,
        use_llm: true,
    };
    let result = review(CODE, &options, &sandbox, Some(&stub as &dyn Explainer)).await;

    assert!(result.summary.facts().is_some());
    assert!(result.sandbox.expect("sandbox requested").succeeded());
    match result.explanation {
        Some(ExplanationResult::Failed { reason }) => {
            assert!(reason.contains("stub outage"), "got: {reason}")
        }
        other => panic!("expected a reported failure, got {other:?}"),
    }
}

#[tokio::test]
async fn review_serializes_for_machine_consumers() {
    let sandbox = Sandbox::new();
    let options = ReviewOptions {
        run_sandbox: true,
        use_llm: false,
    };
    let result = review("import os", &options, &sandbox, None).await;
    let json = serde_json::to_value(&result).expect("review serializes");

    assert_eq!(json["summary"]["status"], "parsed");
    assert_eq!(json["sandbox"]["status"], "refused");
    assert_eq!(json["sandbox"]["reason"]["kind"], "import");
}
