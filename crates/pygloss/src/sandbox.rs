//! The sandbox runner: parse, pre-check, then interpret under a [`Policy`].

use std::time::Duration;

use rustpython_parser::{Mode, parse};
use tracing::debug;

use crate::error::Error;
use crate::eval::Evaluator;
use crate::policy::Policy;
use crate::precheck::check_module;
use crate::text::line_at;

/// Why a submission was not (fully) executed.
///
/// A refusal is an ordinary outcome reported to the user, never an error
/// raised to the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Refusal {
    #[error("line {line}: imports are not allowed in the sandbox")]
    Import { line: usize },

    #[error("line {line}: calling '{name}()' is not allowed in the sandbox")]
    DeniedCall { name: String, line: usize },

    #[error("line {line}: access to '{base}.{attr}' is not allowed in the sandbox")]
    DeniedAttribute {
        base: String,
        attr: String,
        line: usize,
    },

    #[error("line {line}: 'with' blocks are not allowed in the sandbox")]
    WithBlock { line: usize },

    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("execution failed: {message}")]
    Runtime { message: String },

    #[error("execution stopped: step budget of {limit} exhausted")]
    StepLimit { limit: u64 },

    #[error("execution stopped: time limit of {limit:?} exceeded")]
    TimeLimit { limit: Duration },

    #[error("execution stopped: recursion deeper than {limit} frames")]
    RecursionLimit { limit: usize },
}

impl Refusal {
    /// True for the resource-ceiling refusals (`while True: pass` and kin).
    pub fn is_budget_exhausted(&self) -> bool {
        matches!(
            self,
            Refusal::StepLimit { .. } | Refusal::TimeLimit { .. } | Refusal::RecursionLimit { .. }
        )
    }
}

/// Outcome of one sandbox run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SandboxResult {
    /// The submission ran to completion; `output` is everything it printed.
    Completed { output: String },
    /// The submission was refused; `output` holds whatever it printed before
    /// the refusal (empty when nothing executed at all).
    Refused { reason: Refusal, output: String },
}

impl SandboxResult {
    pub fn succeeded(&self) -> bool {
        matches!(self, SandboxResult::Completed { .. })
    }

    pub fn output(&self) -> &str {
        match self {
            SandboxResult::Completed { output } => output,
            SandboxResult::Refused { output, .. } => output,
        }
    }

    pub fn refusal(&self) -> Option<&Refusal> {
        match self {
            SandboxResult::Refused { reason, .. } => Some(reason),
            SandboxResult::Completed { .. } => None,
        }
    }
}

/// Executes submissions under a restricted, allow-listed environment.
///
/// Each [`run`](Sandbox::run) builds a fresh interpreter: nothing persists
/// from one submission to the next.
///
/// # Example
///
/// ```
/// use pygloss::Sandbox;
///
/// let sandbox = Sandbox::new();
/// let result = sandbox.run("print(2 + 2)");
/// assert_eq!(result.output(), "4\n");
///
/// let refused = sandbox.run("import os");
/// assert!(refused.refusal().is_some());
/// ```
pub struct Sandbox {
    policy: Policy,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            policy: Policy::default(),
        }
    }

    pub fn with_policy(policy: Policy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Run a submission start to finish.
    pub fn run(&self, code: &str) -> SandboxResult {
        let parsed = match parse(code, Mode::Module, "<sandbox>") {
            Ok(parsed) => parsed,
            Err(e) => {
                let reason = Refusal::SyntaxError {
                    line: line_at(code, e.offset.to_usize()),
                    message: e.error.to_string(),
                };
                debug!(%reason, "submission did not parse");
                return SandboxResult::Refused {
                    reason,
                    output: String::new(),
                };
            }
        };

        let Some(module) = parsed.as_module() else {
            return SandboxResult::Refused {
                reason: Refusal::SyntaxError {
                    line: 1,
                    message: "expected a module".to_string(),
                },
                output: String::new(),
            };
        };

        if let Err(reason) = check_module(&module.body, &self.policy, code) {
            debug!(%reason, "pre-check refused submission");
            return SandboxResult::Refused {
                reason,
                output: String::new(),
            };
        }

        let mut evaluator = Evaluator::new(&self.policy);
        let run = evaluator.run(&module.body);
        let output = join_printed(evaluator.take_print_output());

        match run {
            Ok(()) => SandboxResult::Completed { output },
            Err(e) => {
                let reason = self.refusal_from(e);
                debug!(%reason, "execution refused");
                SandboxResult::Refused { reason, output }
            }
        }
    }

    fn refusal_from(&self, error: Error) -> Refusal {
        match error {
            Error::Parse { line, message } => Refusal::SyntaxError { line, message },
            Error::StepLimitExceeded(limit) => Refusal::StepLimit { limit },
            Error::TimeLimitExceeded(limit) => Refusal::TimeLimit { limit },
            Error::RecursionLimitExceeded(limit) => Refusal::RecursionLimit { limit },
            other => Refusal::Runtime {
                message: other.to_string(),
            },
        }
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

fn join_printed(lines: Vec<String>) -> String {
    let mut output = String::new();
    for line in lines {
        output.push_str(&line);
        output.push('\n');
    }
    output
}
