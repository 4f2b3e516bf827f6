//! The structural explainer: a parse-derived summary of a submission.
//!
//! Deterministic and side-effect-free. Parse failures are part of the
//! result, never an error: a summary is produced for every input.

use std::collections::BTreeSet;

use rustpython_parser::ast::{Expr, Stmt};
use rustpython_parser::{Mode, parse};

use crate::text::line_at;

/// A function definition observed in the submission.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FunctionInfo {
    pub name: String,
    pub params: Vec<String>,
}

impl FunctionInfo {
    /// `name(a, b)` rendering used in digests.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params.join(", "))
    }
}

/// Structural facts collected from a successfully parsed submission.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct CodeFacts {
    pub functions: Vec<FunctionInfo>,
    pub classes: Vec<String>,
    pub assignments: usize,
    pub for_loops: usize,
    pub while_loops: usize,
    pub conditionals: usize,
    pub returns: usize,
    /// Sorted, deduplicated call targets (function names and method names).
    pub calls: Vec<String>,
    /// Total call expressions, counting repeats.
    pub call_count: usize,
    pub imports: usize,
    /// Deepest loop-in-loop nesting observed.
    pub max_loop_depth: usize,
}

impl CodeFacts {
    pub fn loop_count(&self) -> usize {
        self.for_loops + self.while_loops
    }

    /// Rough asymptotic guess from loop nesting. A hint, not a bound.
    pub fn complexity_hint(&self) -> String {
        match self.max_loop_depth {
            0 => "no loops; O(1) unless calls hide work".to_string(),
            1 => "single loop level; roughly O(n)".to_string(),
            depth => format!("nested loops ({} deep); roughly O(n^{})", depth, depth),
        }
    }
}

/// Result of summarizing a submission. One per submission, immutable.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StructuralSummary {
    /// The submission did not parse; nothing structural could be derived.
    Unparsable { line: usize, message: String },
    /// Facts derived from the syntax tree.
    Parsed(CodeFacts),
}

impl StructuralSummary {
    pub fn facts(&self) -> Option<&CodeFacts> {
        match self {
            StructuralSummary::Parsed(facts) => Some(facts),
            StructuralSummary::Unparsable { .. } => None,
        }
    }

    /// Plain-text bullet lines for display or as LLM prompt context.
    pub fn digest_lines(&self) -> Vec<String> {
        let facts = match self {
            StructuralSummary::Unparsable { line, message } => {
                return vec![format!("Syntax error on line {}: {}", line, message)];
            }
            StructuralSummary::Parsed(facts) => facts,
        };

        let mut lines = Vec::new();
        if !facts.functions.is_empty() {
            let signatures: Vec<String> =
                facts.functions.iter().map(|f| f.signature()).collect();
            lines.push(format!("Functions defined: {}", signatures.join(", ")));
        }
        if !facts.classes.is_empty() {
            lines.push(format!("Classes defined: {}", facts.classes.join(", ")));
        }
        lines.push(format!(
            "Assignments: {}  |  Loops: {} ({} for, {} while)  |  Conditionals: {}  |  Returns: {}",
            facts.assignments,
            facts.loop_count(),
            facts.for_loops,
            facts.while_loops,
            facts.conditionals,
            facts.returns,
        ));
        if !facts.calls.is_empty() {
            lines.push(format!(
                "Calls detected: {} ({} call sites)",
                facts.calls.join(", "),
                facts.call_count
            ));
        }
        if facts.imports > 0 {
            lines.push(format!(
                "Imports present: {} (these will not run in the sandbox)",
                facts.imports
            ));
        }
        lines.push(format!(
            "Complexity (rough heuristic): {}",
            facts.complexity_hint()
        ));
        lines
    }
}

/// Summarize a submission. Never fails; syntax errors come back as
/// [`StructuralSummary::Unparsable`].
///
/// # Example
///
/// ```
/// use pygloss::summarize;
///
/// let summary = summarize("def f(x):\n    return x + 1\n");
/// let facts = summary.facts().unwrap();
/// assert_eq!(facts.functions[0].name, "f");
/// assert_eq!(facts.functions[0].params, vec!["x".to_string()]);
/// ```
pub fn summarize(code: &str) -> StructuralSummary {
    let parsed = match parse(code, Mode::Module, "<summary>") {
        Ok(parsed) => parsed,
        Err(e) => {
            return StructuralSummary::Unparsable {
                line: line_at(code, e.offset.to_usize()),
                message: e.error.to_string(),
            };
        }
    };

    let Some(module) = parsed.as_module() else {
        return StructuralSummary::Unparsable {
            line: 1,
            message: "expected a module".to_string(),
        };
    };

    let mut collector = Collector::default();
    collector.visit_body(&module.body, 0);

    let mut facts = collector.facts;
    facts.calls = collector.calls.into_iter().collect();
    StructuralSummary::Parsed(facts)
}

#[derive(Default)]
struct Collector {
    facts: CodeFacts,
    calls: BTreeSet<String>,
}

impl Collector {
    fn visit_body(&mut self, body: &[Stmt], loop_depth: usize) {
        for stmt in body {
            self.visit_stmt(stmt, loop_depth);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt, loop_depth: usize) {
        match stmt {
            Stmt::FunctionDef(node) => {
                let params: Vec<String> = node
                    .args
                    .posonlyargs
                    .iter()
                    .chain(&node.args.args)
                    .map(|arg| arg.def.arg.to_string())
                    .collect();
                self.facts.functions.push(FunctionInfo {
                    name: node.name.to_string(),
                    params,
                });
                // Loop depth does not carry into a nested body.
                self.visit_body(&node.body, 0);
            }
            Stmt::AsyncFunctionDef(node) => {
                let params: Vec<String> = node
                    .args
                    .posonlyargs
                    .iter()
                    .chain(&node.args.args)
                    .map(|arg| arg.def.arg.to_string())
                    .collect();
                self.facts.functions.push(FunctionInfo {
                    name: node.name.to_string(),
                    params,
                });
                self.visit_body(&node.body, 0);
            }
            Stmt::ClassDef(node) => {
                self.facts.classes.push(node.name.to_string());
                self.visit_body(&node.body, 0);
            }
            Stmt::Assign(node) => {
                self.facts.assignments += 1;
                self.visit_expr(&node.value);
            }
            Stmt::AugAssign(node) => {
                self.facts.assignments += 1;
                self.visit_expr(&node.value);
            }
            Stmt::AnnAssign(node) => {
                self.facts.assignments += 1;
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Stmt::For(node) => {
                self.enter_loop(loop_depth);
                self.facts.for_loops += 1;
                self.visit_expr(&node.iter);
                self.visit_body(&node.body, loop_depth + 1);
                self.visit_body(&node.orelse, loop_depth);
            }
            Stmt::AsyncFor(node) => {
                self.enter_loop(loop_depth);
                self.facts.for_loops += 1;
                self.visit_expr(&node.iter);
                self.visit_body(&node.body, loop_depth + 1);
                self.visit_body(&node.orelse, loop_depth);
            }
            Stmt::While(node) => {
                self.enter_loop(loop_depth);
                self.facts.while_loops += 1;
                self.visit_expr(&node.test);
                self.visit_body(&node.body, loop_depth + 1);
                self.visit_body(&node.orelse, loop_depth);
            }
            Stmt::If(node) => {
                self.facts.conditionals += 1;
                self.visit_expr(&node.test);
                self.visit_body(&node.body, loop_depth);
                self.visit_body(&node.orelse, loop_depth);
            }
            Stmt::Return(node) => {
                self.facts.returns += 1;
                if let Some(value) = &node.value {
                    self.visit_expr(value);
                }
            }
            Stmt::Import(_) | Stmt::ImportFrom(_) => {
                self.facts.imports += 1;
            }
            Stmt::With(node) => {
                for item in &node.items {
                    self.visit_expr(&item.context_expr);
                }
                self.visit_body(&node.body, loop_depth);
            }
            Stmt::Try(node) => {
                self.visit_body(&node.body, loop_depth);
                self.visit_body(&node.orelse, loop_depth);
                self.visit_body(&node.finalbody, loop_depth);
            }
            Stmt::Expr(node) => self.visit_expr(&node.value),
            _ => {}
        }
    }

    fn enter_loop(&mut self, loop_depth: usize) {
        self.facts.max_loop_depth = self.facts.max_loop_depth.max(loop_depth + 1);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Call(node) => {
                self.facts.call_count += 1;
                match node.func.as_ref() {
                    Expr::Name(name) => {
                        self.calls.insert(name.id.to_string());
                    }
                    Expr::Attribute(attr) => {
                        self.calls.insert(attr.attr.to_string());
                    }
                    other => self.visit_expr(other),
                }
                for arg in &node.args {
                    self.visit_expr(arg);
                }
                for keyword in &node.keywords {
                    self.visit_expr(&keyword.value);
                }
            }
            Expr::BinOp(node) => {
                self.visit_expr(&node.left);
                self.visit_expr(&node.right);
            }
            Expr::UnaryOp(node) => self.visit_expr(&node.operand),
            Expr::BoolOp(node) => {
                for value in &node.values {
                    self.visit_expr(value);
                }
            }
            Expr::Compare(node) => {
                self.visit_expr(&node.left);
                for comparator in &node.comparators {
                    self.visit_expr(comparator);
                }
            }
            Expr::IfExp(node) => {
                self.visit_expr(&node.test);
                self.visit_expr(&node.body);
                self.visit_expr(&node.orelse);
            }
            Expr::List(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::Tuple(node) => {
                for elt in &node.elts {
                    self.visit_expr(elt);
                }
            }
            Expr::Dict(node) => {
                for key in node.keys.iter().flatten() {
                    self.visit_expr(key);
                }
                for value in &node.values {
                    self.visit_expr(value);
                }
            }
            Expr::Subscript(node) => {
                self.visit_expr(&node.value);
                self.visit_expr(&node.slice);
            }
            Expr::Attribute(node) => self.visit_expr(&node.value),
            Expr::ListComp(node) => {
                self.visit_expr(&node.elt);
                for generator in &node.generators {
                    self.visit_expr(&generator.iter);
                }
            }
            Expr::JoinedStr(node) => {
                for value in &node.values {
                    self.visit_expr(value);
                }
            }
            Expr::FormattedValue(node) => self.visit_expr(&node.value),
            Expr::NamedExpr(node) => self.visit_expr(&node.value),
            Expr::Starred(node) => self.visit_expr(&node.value),
            Expr::Lambda(node) => self.visit_expr(&node.body),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_mentions_the_complexity_hint() {
        let summary = summarize("for i in range(3):\n    for j in range(3):\n        pass\n");
        let digest = summary.digest_lines().join("\n");
        assert!(digest.contains("O(n^2)"), "digest was: {digest}");
    }

    #[test]
    fn unparsable_digest_carries_the_error() {
        let summary = summarize("def broken(:\n");
        assert!(matches!(summary, StructuralSummary::Unparsable { .. }));
        let digest = summary.digest_lines().join("\n");
        assert!(digest.contains("Syntax error"));
    }
}
