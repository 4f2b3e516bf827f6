use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use pygloss::{Policy, Refusal, Sandbox, SandboxResult};

fn run(code: &str) -> SandboxResult {
    Sandbox::new().run(code)
}

fn output_of(code: &str) -> String {
    let result = run(code);
    assert!(
        result.succeeded(),
        "expected success, got {:?}",
        result.refusal()
    );
    result.output().to_string()
}

fn refusal_of(code: &str) -> Refusal {
    match run(code) {
        SandboxResult::Refused { reason, .. } => reason,
        SandboxResult::Completed { output } => {
            panic!("expected a refusal, program completed with output {output:?}")
        }
    }
}

#[test]
fn simple_print() {
    assert_eq!(output_of("print(2 + 2)"), "4\n");
}

#[test]
fn arithmetic_matches_python() {
    assert_eq!(
        output_of("print(10 / 4)\nprint(10 // 3)\nprint(10 % 3)\nprint(2 ** 8)\nprint(-7 % 3)\n"),
        "2.5\n3\n1\n256\n2\n"
    );
}

#[test]
fn print_renders_like_python() {
    assert_eq!(
        output_of("print('a', 1, [1, 'b'], (1,), {'k': 2}, 1.5, True, None)\n"),
        "a 1 [1, 'b'] (1,) {'k': 2} 1.5 True None\n"
    );
}

#[test]
fn variables_and_augmented_assignment() {
    assert_eq!(output_of("x = 10\nx += 5\nx *= 2\nprint(x)\n"), "30\n");
}

#[test]
fn tuple_unpacking() {
    assert_eq!(output_of("a, b = 1, 2\na, b = b, a\nprint(a, b)\n"), "2 1\n");
}

#[test]
fn while_loop_with_break_and_continue() {
    let code = "\
total = 0
i = 0
while True:
    i += 1
    if i > 10:
        break
    if i % 2 == 0:
        continue
    total += i
print(total)
";
    assert_eq!(output_of(code), "25\n");
}

#[test]
fn for_loop_over_range_and_strings() {
    assert_eq!(
        output_of("for i in range(3):\n    print(i)\nfor c in 'ab':\n    print(c)\n"),
        "0\n1\n2\na\nb\n"
    );
}

#[test]
fn for_else_runs_without_break() {
    let code = "\
for i in range(3):
    pass
else:
    print('done')
for i in range(3):
    break
else:
    print('not printed')
";
    assert_eq!(output_of(code), "done\n");
}

#[test]
fn user_function_with_defaults_and_keywords() {
    let code = "\
def greet(name, punct='!'):
    return 'hi ' + name + punct
print(greet('ada'))
print(greet('ada', punct='?'))
";
    assert_eq!(output_of(code), "hi ada!\nhi ada?\n");
}

#[test]
fn recursive_function() {
    let code = "\
def fib(n):
    if n < 2:
        return n
    return fib(n - 1) + fib(n - 2)
print(fib(10))
";
    assert_eq!(output_of(code), "55\n");
}

#[test]
fn gcd_example_end_to_end() {
    let code = "\
def gcd(a, b):
    while b != 0:
        a, b = b, a % b
    return a

print(gcd(42, 30))
";
    assert_eq!(output_of(code), "6\n");
}

#[test]
fn list_methods_mutate_through_variables() {
    let code = "\
xs = [3, 1]
xs.append(2)
xs.sort()
print(xs)
print(xs.pop())
print(xs)
";
    assert_eq!(output_of(code), "[1, 2, 3]\n3\n[1, 2]\n");
}

#[test]
fn dict_operations() {
    let code = "\
d = {'a': 1}
d['b'] = 2
d['a'] = 10
print(d['a'], d.get('missing', 0))
print(sorted(d.keys()))
";
    assert_eq!(output_of(code), "10 0\n['a', 'b']\n");
}

#[test]
fn string_methods_and_fstrings() {
    let code = "\
name = '  Ada  '
clean = name.strip().lower()
print(f'hello {clean}, {1 + 1}')
print('-'.join(['a', 'b', 'c']))
";
    assert_eq!(output_of(code), "hello ada, 2\na-b-c\n");
}

#[test]
fn comprehensions_and_slices() {
    let code = "\
squares = [x * x for x in range(5) if x % 2 == 0]
print(squares)
print(squares[::-1])
print('hello'[1:4])
";
    assert_eq!(output_of(code), "[0, 4, 16]\n[16, 4, 0]\nell\n");
}

#[test]
fn allowed_builtins_cover_the_classroom_set() {
    let code = "\
xs = [3, 1, 2]
print(len(xs), sum(xs), min(xs), max(xs), abs(-5))
print(sorted(xs))
print(any([0, 1]), all([1, 1]))
for i, x in enumerate(xs):
    pass
for a, b in zip([1, 2], [3, 4]):
    print(a + b)
";
    assert_eq!(
        output_of(code),
        "3 6 1 3 5\n[1, 2, 3]\nTrue True\n4\n6\n"
    );
}

#[test]
fn program_with_no_output() {
    assert_eq!(output_of("x = 1 + 1"), "");
}

// ---------------------------------------------------------------------------
// Refusals
// ---------------------------------------------------------------------------

#[test]
fn imports_are_refused_before_anything_runs() {
    let result = run("print('leaked')\nimport os\n");
    match result {
        SandboxResult::Refused { reason, output } => {
            assert_eq!(reason, Refusal::Import { line: 2 });
            assert_eq!(output, "", "nothing may execute when imports are present");
        }
        SandboxResult::Completed { .. } => panic!("import must be refused"),
    }
}

#[test]
fn from_imports_are_refused() {
    assert!(matches!(
        refusal_of("from os import path"),
        Refusal::Import { line: 1 }
    ));
}

#[test]
fn dangerous_calls_are_refused() {
    assert!(matches!(
        refusal_of("open('secret.txt', 'w')"),
        Refusal::DeniedCall { ref name, .. } if name == "open"
    ));
    assert!(matches!(
        refusal_of("eval('2 + 2')"),
        Refusal::DeniedCall { ref name, .. } if name == "eval"
    ));
    assert!(matches!(
        refusal_of("__import__('os')"),
        Refusal::DeniedCall { ref name, .. } if name == "__import__"
    ));
}

#[test]
fn dangerous_attribute_access_is_refused() {
    assert!(matches!(
        refusal_of("os.system('ls')"),
        Refusal::DeniedAttribute { ref base, .. } if base == "os"
    ));
    assert!(matches!(
        refusal_of("x = sys.argv"),
        Refusal::DeniedAttribute { ref base, ref attr, .. } if base == "sys" && attr == "argv"
    ));
}

#[test]
fn with_blocks_are_refused() {
    assert!(matches!(
        refusal_of("with x:\n    pass\n"),
        Refusal::WithBlock { line: 1 }
    ));
}

#[test]
fn syntax_errors_are_refusals_not_panics() {
    assert!(matches!(
        refusal_of("def broken(:\n"),
        Refusal::SyntaxError { .. }
    ));
}

#[test]
fn unlisted_builtins_are_simply_undefined() {
    let reason = refusal_of("int('3')");
    match reason {
        Refusal::Runtime { message } => assert!(message.contains("'int'"), "got: {message}"),
        other => panic!("expected a runtime refusal, got {other:?}"),
    }
}

#[test]
fn policy_can_grant_extra_builtins() {
    let sandbox = Sandbox::with_policy(Policy::default().allow_builtin("int"));
    let result = sandbox.run("print(int('3') + 1)");
    assert_eq!(result.output(), "4\n");
}

#[test]
fn runtime_errors_keep_partial_output() {
    let result = run("print('before')\nprint(1 / 0)\n");
    match result {
        SandboxResult::Refused { reason, output } => {
            assert_eq!(output, "before\n");
            assert!(matches!(reason, Refusal::Runtime { .. }));
        }
        SandboxResult::Completed { .. } => panic!("division by zero must refuse"),
    }
}

#[test]
fn unbounded_loop_is_refused_within_the_ceiling() {
    let start = Instant::now();
    let reason = refusal_of("while True:\n    pass\n");
    let elapsed = start.elapsed();

    assert!(reason.is_budget_exhausted(), "got: {reason:?}");
    assert!(
        elapsed < Duration::from_secs(5),
        "refusal took {elapsed:?}, longer than the ceiling allows"
    );
}

#[test]
fn wall_clock_ceiling_fires_when_steps_are_unbounded() {
    let policy = Policy::default()
        .with_step_limit(u64::MAX)
        .with_time_limit(Duration::from_millis(100));
    let start = Instant::now();
    let result = Sandbox::with_policy(policy).run("while True:\n    pass\n");
    let elapsed = start.elapsed();

    assert!(matches!(
        result.refusal(),
        Some(Refusal::TimeLimit { .. })
    ));
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
}

#[test]
fn runaway_recursion_is_refused() {
    let reason = refusal_of("def f():\n    return f()\nf()\n");
    assert!(matches!(reason, Refusal::RecursionLimit { .. }));
}

#[test]
fn oversized_range_is_refused() {
    let reason = refusal_of("for i in range(10 ** 12):\n    pass\n");
    assert!(matches!(reason, Refusal::Runtime { .. }));
}

#[test]
fn integer_overflow_is_a_refusal_not_a_crash() {
    let reason = refusal_of("x = 2 ** 62\nprint(x * 100)\n");
    assert!(matches!(reason, Refusal::Runtime { .. }));
}

#[test]
fn unsupported_constructs_are_reported() {
    assert!(matches!(
        refusal_of("class A:\n    pass\n"),
        Refusal::Runtime { .. }
    ));
    assert!(matches!(
        refusal_of("f = lambda x: x\n"),
        Refusal::Runtime { .. }
    ));
}

#[test]
fn submissions_do_not_share_state() {
    let sandbox = Sandbox::new();
    assert_eq!(sandbox.run("x = 41").output(), "");
    let reason = match sandbox.run("print(x)") {
        SandboxResult::Refused { reason, .. } => reason,
        SandboxResult::Completed { output } => panic!("state leaked: {output:?}"),
    };
    assert!(matches!(reason, Refusal::Runtime { .. }));
}
