//! Per-submission orchestration: compose the summary, the optional sandbox
//! run, and the optional LLM explanation into one bundle.

use tracing::warn;

use crate::llm::{ExplainRequest, Explainer};
use crate::sandbox::{Sandbox, SandboxResult};
use crate::summary::{StructuralSummary, summarize};

/// The caller's toggles for one submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewOptions {
    /// Execute the submission in the restricted sandbox.
    pub run_sandbox: bool,
    /// Ask the explainer for a narrated explanation.
    pub use_llm: bool,
}

/// The LLM's contribution, opaque free text or a reported failure.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExplanationResult {
    Text { text: String },
    Failed { reason: String },
}

/// Everything produced for one submission.
#[derive(Debug, serde::Serialize)]
pub struct Review {
    pub summary: StructuralSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<ExplanationResult>,
}

/// Process one submission.
///
/// The summary is always produced. The sandbox runs only when asked. The
/// explainer is invoked only when the toggle is on *and* an explainer is
/// present; with the toggle off or no credential, no outbound call is even
/// attempted.
pub async fn review(
    code: &str,
    options: &ReviewOptions,
    sandbox: &Sandbox,
    explainer: Option<&dyn Explainer>,
) -> Review {
    let summary = summarize(code);
    let sandbox_result = options.run_sandbox.then(|| sandbox.run(code));

    let explanation = match (options.use_llm, explainer) {
        (true, Some(explainer)) => {
            let context = summary.facts().map(|_| summary.digest_lines().join("\n"));
            let request = ExplainRequest { code, context };
            match explainer.explain(request).await {
                Ok(text) => Some(ExplanationResult::Text { text }),
                Err(e) => {
                    warn!(error = %e, "explanation failed");
                    Some(ExplanationResult::Failed {
                        reason: e.to_string(),
                    })
                }
            }
        }
        _ => None,
    };

    Review {
        summary,
        sandbox: sandbox_result,
        explanation,
    }
}
