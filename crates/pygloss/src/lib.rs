//! Pygloss - explain Python snippets, with an optional restricted sandbox.
//!
//! Pygloss takes a pasted Python snippet and produces up to three results:
//!
//! - a **structural summary** derived from parsing the snippet (functions,
//!   classes, loops, call targets, a rough complexity hint),
//! - optionally, the **captured output** of running the snippet inside a
//!   restricted interpreter with no imports, no file system, and no network,
//! - optionally, a **narrated explanation** from an LLM, injected behind a
//!   narrow trait so the rest of the tool never depends on a live service.
//!
//! # The sandbox in one paragraph
//!
//! Execution is fenced twice. A static pre-check walks the syntax tree and
//! refuses imports, denied calls (`eval`, `open`, ...), attribute access on
//! denied modules, and `with` blocks. What passes is then interpreted in an
//! environment built *from* an allow-list (`print`, `range`, `len` and a
//! handful of friends), so anything the pre-check missed resolves to a
//! `NameError` rather than a capability. Runs are metered by a step budget
//! and a wall-clock ceiling. This stops accidental misuse, not a determined
//! adversary; treat it as a classroom fence, not a security boundary.
//!
//! # Quick start
//!
//! ```
//! use pygloss::{Sandbox, summarize};
//!
//! let code = "def gcd(a, b):\n    while b != 0:\n        a, b = b, a % b\n    return a\n\nprint(gcd(42, 30))\n";
//!
//! let summary = summarize(code);
//! assert_eq!(summary.facts().unwrap().functions[0].name, "gcd");
//!
//! let result = Sandbox::new().run(code);
//! assert_eq!(result.output(), "6\n");
//! ```
//!
//! # Supported Python subset
//!
//! ## Types
//! - `None`, `bool`, `int`, `float`, `str`, `list`, `tuple`, `dict` (string keys)
//!
//! ## Statements
//! - assignment (including tuple unpacking and subscript targets), `if`/
//!   `elif`/`else`, `for`/`while` with `break`/`continue`/`else`, `def` with
//!   positional parameters and defaults, `return`, `pass`
//!
//! ## Expressions
//! - arithmetic, comparison (chained), boolean short-circuit, conditional
//!   expressions, f-strings, list comprehensions, slicing, a modest set of
//!   `str`/`list`/`dict` methods
//!
//! # Not supported
//!
//! - imports (refused by policy), classes, try/except, lambdas, generators,
//!   async code, file or network access of any kind

mod builtins;
mod error;
mod eval;
mod llm;
mod methods;
mod operators;
mod policy;
mod precheck;
mod review;
mod sandbox;
mod slice;
mod summary;
mod text;
mod value;

pub use error::{Error, Result};
pub use llm::{API_KEY_ENV, ExplainError, ExplainRequest, Explainer, OpenAiExplainer};
pub use policy::Policy;
pub use review::{ExplanationResult, Review, ReviewOptions, review};
pub use sandbox::{Refusal, Sandbox, SandboxResult};
pub use summary::{CodeFacts, FunctionInfo, StructuralSummary, summarize};
pub use value::PyValue;
