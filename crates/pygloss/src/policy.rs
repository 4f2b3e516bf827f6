use std::collections::BTreeSet;
use std::time::Duration;

/// Capability allow-list governing a sandbox run.
///
/// The execution environment is built *from* this policy rather than by
/// subtracting dangerous names from a full one: only `allowed_builtins` are
/// reachable at runtime, and the static pre-check refuses the denied names
/// up front so the user gets a precise reason instead of a bare `NameError`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use pygloss::Policy;
///
/// let policy = Policy::default()
///     .allow_builtin("int")
///     .with_time_limit(Duration::from_millis(500));
/// assert!(policy.allowed_builtins.contains("int"));
/// assert!(policy.allowed_builtins.contains("print"));
/// ```
#[derive(Debug, Clone)]
pub struct Policy {
    /// Builtin names resolvable from sandbox code.
    pub allowed_builtins: BTreeSet<String>,
    /// Call targets refused by the static pre-check.
    pub denied_calls: BTreeSet<String>,
    /// Base names whose attribute access is refused (`os.path`, `sys.argv`, ...).
    pub denied_attr_parents: BTreeSet<String>,
    /// Maximum interpreter steps per run.
    pub step_limit: u64,
    /// Maximum user-function call depth.
    pub recursion_limit: usize,
    /// Wall-clock ceiling per run.
    pub time_limit: Duration,
}

const DEFAULT_BUILTINS: &[&str] = &[
    "print", "range", "len", "enumerate", "sum", "min", "max", "sorted", "abs", "any", "all",
    "zip",
];

const DEFAULT_DENIED_CALLS: &[&str] = &[
    "exec",
    "eval",
    "__import__",
    "open",
    "compile",
    "input",
    "help",
    "license",
    "credits",
    "os",
    "sys",
    "subprocess",
    "shutil",
    "pathlib",
    "socket",
    "requests",
];

const DEFAULT_DENIED_ATTR_PARENTS: &[&str] =
    &["os", "sys", "subprocess", "shutil", "pathlib", "socket"];

fn name_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allowed_builtins: name_set(DEFAULT_BUILTINS),
            denied_calls: name_set(DEFAULT_DENIED_CALLS),
            denied_attr_parents: name_set(DEFAULT_DENIED_ATTR_PARENTS),
            step_limit: 1_000_000,
            recursion_limit: 64,
            time_limit: Duration::from_secs(2),
        }
    }
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant an additional builtin (e.g. `int` for conversion-heavy lessons).
    pub fn allow_builtin(mut self, name: impl Into<String>) -> Self {
        self.allowed_builtins.insert(name.into());
        self
    }

    /// Refuse calls to `name` during the static pre-check.
    pub fn deny_call(mut self, name: impl Into<String>) -> Self {
        self.denied_calls.insert(name.into());
        self
    }

    /// Refuse attribute access rooted at `name`.
    pub fn deny_attr_parent(mut self, name: impl Into<String>) -> Self {
        self.denied_attr_parents.insert(name.into());
        self
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_the_classroom_allow_list() {
        let policy = Policy::default();
        for name in ["print", "range", "zip", "sorted"] {
            assert!(policy.allowed_builtins.contains(name), "{name} missing");
        }
        for name in ["eval", "open", "__import__", "socket"] {
            assert!(policy.denied_calls.contains(name), "{name} missing");
        }
        assert!(!policy.allowed_builtins.contains("int"));
    }
}
