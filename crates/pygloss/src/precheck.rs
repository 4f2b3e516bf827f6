//! Static pre-check run before any part of a submission executes.
//!
//! Walks the parsed module and refuses imports, calls to denied names,
//! attribute access rooted at denied names, and `with` blocks. This is the
//! first of two fences: even when a construct slips past (e.g. smuggled
//! through a `match` pattern), the interpreter's allow-list namespace has no
//! usable reference to anything unsafe.

use rustpython_parser::ast::{Expr, Ranged, Stmt};

use crate::policy::Policy;
use crate::sandbox::Refusal;
use crate::text::line_at;

pub(crate) fn check_module(body: &[Stmt], policy: &Policy, source: &str) -> Result<(), Refusal> {
    let checker = Checker { policy, source };
    checker.check_body(body)
}

struct Checker<'a> {
    policy: &'a Policy,
    source: &'a str,
}

impl Checker<'_> {
    fn line(&self, node: &impl Ranged) -> usize {
        line_at(self.source, node.range().start().to_usize())
    }

    fn check_arg_defaults(
        &self,
        args: &rustpython_parser::ast::Arguments,
    ) -> Result<(), Refusal> {
        let positional = args.posonlyargs.iter().chain(&args.args);
        for arg in positional.chain(&args.kwonlyargs) {
            if let Some(default) = &arg.default {
                self.check_expr(default)?;
            }
        }
        Ok(())
    }

    fn check_body(&self, body: &[Stmt]) -> Result<(), Refusal> {
        for stmt in body {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_stmt(&self, stmt: &Stmt) -> Result<(), Refusal> {
        match stmt {
            Stmt::Import(node) => Err(Refusal::Import {
                line: self.line(node),
            }),
            Stmt::ImportFrom(node) => Err(Refusal::Import {
                line: self.line(node),
            }),
            Stmt::With(node) => Err(Refusal::WithBlock {
                line: self.line(node),
            }),
            Stmt::AsyncWith(node) => Err(Refusal::WithBlock {
                line: self.line(node),
            }),

            Stmt::FunctionDef(node) => {
                self.check_arg_defaults(&node.args)?;
                for decorator in &node.decorator_list {
                    self.check_expr(decorator)?;
                }
                self.check_body(&node.body)
            }
            Stmt::AsyncFunctionDef(node) => {
                self.check_arg_defaults(&node.args)?;
                for decorator in &node.decorator_list {
                    self.check_expr(decorator)?;
                }
                self.check_body(&node.body)
            }
            Stmt::ClassDef(node) => {
                for base in &node.bases {
                    self.check_expr(base)?;
                }
                for keyword in &node.keywords {
                    self.check_expr(&keyword.value)?;
                }
                for decorator in &node.decorator_list {
                    self.check_expr(decorator)?;
                }
                self.check_body(&node.body)
            }
            Stmt::Return(node) => match &node.value {
                Some(value) => self.check_expr(value),
                None => Ok(()),
            },
            Stmt::Delete(node) => {
                for target in &node.targets {
                    self.check_expr(target)?;
                }
                Ok(())
            }
            Stmt::Assign(node) => {
                for target in &node.targets {
                    self.check_expr(target)?;
                }
                self.check_expr(&node.value)
            }
            Stmt::AugAssign(node) => {
                self.check_expr(&node.target)?;
                self.check_expr(&node.value)
            }
            Stmt::AnnAssign(node) => {
                self.check_expr(&node.target)?;
                match &node.value {
                    Some(value) => self.check_expr(value),
                    None => Ok(()),
                }
            }
            Stmt::For(node) => {
                self.check_expr(&node.target)?;
                self.check_expr(&node.iter)?;
                self.check_body(&node.body)?;
                self.check_body(&node.orelse)
            }
            Stmt::AsyncFor(node) => {
                self.check_expr(&node.target)?;
                self.check_expr(&node.iter)?;
                self.check_body(&node.body)?;
                self.check_body(&node.orelse)
            }
            Stmt::While(node) => {
                self.check_expr(&node.test)?;
                self.check_body(&node.body)?;
                self.check_body(&node.orelse)
            }
            Stmt::If(node) => {
                self.check_expr(&node.test)?;
                self.check_body(&node.body)?;
                self.check_body(&node.orelse)
            }
            Stmt::Raise(node) => {
                if let Some(exc) = &node.exc {
                    self.check_expr(exc)?;
                }
                match &node.cause {
                    Some(cause) => self.check_expr(cause),
                    None => Ok(()),
                }
            }
            // Handler bodies are not walked; the interpreter refuses the
            // whole try statement before any of them could run.
            Stmt::Try(node) => {
                self.check_body(&node.body)?;
                self.check_body(&node.orelse)?;
                self.check_body(&node.finalbody)
            }
            Stmt::TryStar(node) => {
                self.check_body(&node.body)?;
                self.check_body(&node.orelse)?;
                self.check_body(&node.finalbody)
            }
            Stmt::Assert(node) => {
                self.check_expr(&node.test)?;
                match &node.msg {
                    Some(msg) => self.check_expr(msg),
                    None => Ok(()),
                }
            }
            Stmt::Match(node) => {
                self.check_expr(&node.subject)?;
                for case in &node.cases {
                    if let Some(guard) = &case.guard {
                        self.check_expr(guard)?;
                    }
                    self.check_body(&case.body)?;
                }
                Ok(())
            }
            Stmt::Expr(node) => self.check_expr(&node.value),

            Stmt::Global(_) | Stmt::Nonlocal(_) | Stmt::Pass(_) | Stmt::Break(_)
            | Stmt::Continue(_) => Ok(()),
            // Anything newer than this walk is still fenced by the
            // interpreter's allow-list namespace.
            #[allow(unreachable_patterns)]
            _ => Ok(()),
        }
    }

    fn check_expr(&self, expr: &Expr) -> Result<(), Refusal> {
        match expr {
            Expr::Call(node) => {
                if let Expr::Name(name) = node.func.as_ref()
                    && self.policy.denied_calls.contains(name.id.as_str())
                {
                    return Err(Refusal::DeniedCall {
                        name: name.id.to_string(),
                        line: self.line(node),
                    });
                }
                self.check_expr(&node.func)?;
                for arg in &node.args {
                    self.check_expr(arg)?;
                }
                for keyword in &node.keywords {
                    self.check_expr(&keyword.value)?;
                }
                Ok(())
            }
            Expr::Attribute(node) => {
                if let Expr::Name(base) = node.value.as_ref()
                    && self.policy.denied_attr_parents.contains(base.id.as_str())
                {
                    return Err(Refusal::DeniedAttribute {
                        base: base.id.to_string(),
                        attr: node.attr.to_string(),
                        line: self.line(node),
                    });
                }
                self.check_expr(&node.value)
            }

            Expr::BoolOp(node) => {
                for value in &node.values {
                    self.check_expr(value)?;
                }
                Ok(())
            }
            Expr::NamedExpr(node) => {
                self.check_expr(&node.target)?;
                self.check_expr(&node.value)
            }
            Expr::BinOp(node) => {
                self.check_expr(&node.left)?;
                self.check_expr(&node.right)
            }
            Expr::UnaryOp(node) => self.check_expr(&node.operand),
            Expr::Lambda(node) => {
                self.check_arg_defaults(&node.args)?;
                self.check_expr(&node.body)
            }
            Expr::IfExp(node) => {
                self.check_expr(&node.test)?;
                self.check_expr(&node.body)?;
                self.check_expr(&node.orelse)
            }
            Expr::Dict(node) => {
                for key in node.keys.iter().flatten() {
                    self.check_expr(key)?;
                }
                for value in &node.values {
                    self.check_expr(value)?;
                }
                Ok(())
            }
            Expr::Set(node) => {
                for elt in &node.elts {
                    self.check_expr(elt)?;
                }
                Ok(())
            }
            Expr::ListComp(node) => {
                self.check_expr(&node.elt)?;
                self.check_generators(&node.generators)
            }
            Expr::SetComp(node) => {
                self.check_expr(&node.elt)?;
                self.check_generators(&node.generators)
            }
            Expr::DictComp(node) => {
                self.check_expr(&node.key)?;
                self.check_expr(&node.value)?;
                self.check_generators(&node.generators)
            }
            Expr::GeneratorExp(node) => {
                self.check_expr(&node.elt)?;
                self.check_generators(&node.generators)
            }
            Expr::Await(node) => self.check_expr(&node.value),
            Expr::Yield(node) => match &node.value {
                Some(value) => self.check_expr(value),
                None => Ok(()),
            },
            Expr::YieldFrom(node) => self.check_expr(&node.value),
            Expr::Compare(node) => {
                self.check_expr(&node.left)?;
                for comparator in &node.comparators {
                    self.check_expr(comparator)?;
                }
                Ok(())
            }
            Expr::FormattedValue(node) => self.check_expr(&node.value),
            Expr::JoinedStr(node) => {
                for value in &node.values {
                    self.check_expr(value)?;
                }
                Ok(())
            }
            Expr::Subscript(node) => {
                self.check_expr(&node.value)?;
                self.check_expr(&node.slice)
            }
            Expr::Starred(node) => self.check_expr(&node.value),
            Expr::List(node) => {
                for elt in &node.elts {
                    self.check_expr(elt)?;
                }
                Ok(())
            }
            Expr::Tuple(node) => {
                for elt in &node.elts {
                    self.check_expr(elt)?;
                }
                Ok(())
            }
            Expr::Slice(node) => {
                for part in [&node.lower, &node.upper, &node.step].into_iter().flatten() {
                    self.check_expr(part)?;
                }
                Ok(())
            }
            Expr::Constant(_) | Expr::Name(_) => Ok(()),
            #[allow(unreachable_patterns)]
            _ => Ok(()),
        }
    }

    fn check_generators(
        &self,
        generators: &[rustpython_parser::ast::Comprehension],
    ) -> Result<(), Refusal> {
        for generator in generators {
            self.check_expr(&generator.target)?;
            self.check_expr(&generator.iter)?;
            for condition in &generator.ifs {
                self.check_expr(condition)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_parser::{Mode, parse};

    fn check(code: &str) -> Result<(), Refusal> {
        let parsed = parse(code, Mode::Module, "<test>").expect("test code parses");
        let module = parsed.as_module().expect("module");
        check_module(&module.body, &Policy::default(), code)
    }

    #[test]
    fn refuses_imports_anywhere() {
        assert!(matches!(
            check("import os"),
            Err(Refusal::Import { line: 1 })
        ));
        assert!(matches!(
            check("def f():\n    import sys\n"),
            Err(Refusal::Import { line: 2 })
        ));
    }

    #[test]
    fn refuses_denied_calls_and_attributes() {
        assert!(matches!(
            check("open('secret.txt', 'w')"),
            Err(Refusal::DeniedCall { ref name, .. }) if name == "open"
        ));
        assert!(matches!(
            check("x = os.path"),
            Err(Refusal::DeniedAttribute { ref base, .. }) if base == "os"
        ));
        assert!(matches!(
            check("eval('1')"),
            Err(Refusal::DeniedCall { ref name, .. }) if name == "eval"
        ));
    }

    #[test]
    fn refuses_with_blocks() {
        assert!(matches!(
            check("with x:\n    pass\n"),
            Err(Refusal::WithBlock { line: 1 })
        ));
    }

    #[test]
    fn accepts_plain_arithmetic() {
        assert!(check("print(1 + 2)").is_ok());
        assert!(check("def f(x):\n    return x + 1\n").is_ok());
    }
}
