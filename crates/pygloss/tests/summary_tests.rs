use pretty_assertions::assert_eq;
use pygloss::{StructuralSummary, summarize};

#[test]
fn function_loop_and_call_are_reported() {
    let summary = summarize("def f(x):\n    return x+1\nfor i in range(3):\n    f(i)\n");
    let facts = summary.facts().expect("valid code parses");

    assert_eq!(facts.functions.len(), 1);
    assert_eq!(facts.functions[0].name, "f");
    assert_eq!(facts.functions[0].params, vec!["x".to_string()]);
    assert_eq!(facts.loop_count(), 1);
    assert_eq!(facts.for_loops, 1);
    assert!(facts.calls.contains(&"f".to_string()));
    assert_eq!(facts.call_count, 2); // range(3) and f(i)
    assert_eq!(facts.returns, 1);
}

#[test]
fn classes_assignments_and_conditionals_are_counted() {
    let code = "\
class Greeter:
    def hello(self):
        return 'hi'

x = 1
x += 1
y: int = 2
if x > y:
    pass
";
    let facts = summarize(code).facts().unwrap().clone();
    assert_eq!(facts.classes, vec!["Greeter".to_string()]);
    assert_eq!(facts.functions[0].name, "hello");
    assert_eq!(facts.assignments, 3);
    assert_eq!(facts.conditionals, 1);
}

#[test]
fn call_targets_include_method_names() {
    let facts = summarize("xs = []\nxs.append(len('abc'))\n")
        .facts()
        .unwrap()
        .clone();
    assert!(facts.calls.contains(&"append".to_string()));
    assert!(facts.calls.contains(&"len".to_string()));
}

#[test]
fn calls_are_sorted_and_deduplicated() {
    let facts = summarize("print(1)\nprint(2)\nabs(-1)\n")
        .facts()
        .unwrap()
        .clone();
    assert_eq!(facts.calls, vec!["abs".to_string(), "print".to_string()]);
    assert_eq!(facts.call_count, 3);
}

#[test]
fn imports_are_counted_not_refused() {
    let facts = summarize("import os\nfrom sys import argv\n")
        .facts()
        .unwrap()
        .clone();
    assert_eq!(facts.imports, 2);
}

#[test]
fn loop_kinds_and_nesting_depth() {
    let code = "\
while x:
    for i in xs:
        for j in ys:
            pass
";
    let facts = summarize(code).facts().unwrap().clone();
    assert_eq!(facts.while_loops, 1);
    assert_eq!(facts.for_loops, 2);
    assert_eq!(facts.max_loop_depth, 3);
    assert!(facts.complexity_hint().contains("O(n^3)"));
}

#[test]
fn loop_depth_resets_inside_function_bodies() {
    let code = "\
for i in xs:
    pass
def f():
    for j in ys:
        pass
";
    let facts = summarize(code).facts().unwrap().clone();
    assert_eq!(facts.max_loop_depth, 1);
}

#[test]
fn syntax_errors_never_raise() {
    let summary = summarize("def broken(:\n");
    match summary {
        StructuralSummary::Unparsable { line, message } => {
            assert_eq!(line, 1);
            assert!(!message.is_empty());
        }
        StructuralSummary::Parsed(_) => panic!("broken code must be unparsable"),
    }
}

#[test]
fn empty_submission_is_valid() {
    let facts = summarize("").facts().unwrap().clone();
    assert_eq!(facts.loop_count(), 0);
    assert!(facts.calls.is_empty());
}

#[test]
fn digest_reads_like_a_report() {
    let digest = summarize("def f(x):\n    return x+1\nfor i in range(3):\n    f(i)\n")
        .digest_lines()
        .join("\n");
    assert!(digest.contains("Functions defined: f(x)"));
    assert!(digest.contains("Calls detected: f, range"));
    assert!(digest.contains("Complexity"));
}
