//! The restricted tree-walking interpreter.
//!
//! Executes a parsed module against the names a [`Policy`] grants and
//! nothing else. The environment is built from the allow-list, so even a
//! construct the static pre-check missed resolves to a `NameError` rather
//! than a capability. Every evaluation step is metered against the policy's
//! step budget and wall-clock ceiling.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use rustpython_parser::ast::{self, BoolOp, Constant, Expr, Stmt, UnaryOp};

use crate::builtins::{BuiltinResult, to_iterable_items, try_builtin};
use crate::error::{Error, Result};
use crate::methods::call_method;
use crate::operators::{apply_binop, apply_cmpop};
use crate::policy::Policy;
use crate::value::PyValue;

/// How often the wall clock is sampled, in steps.
const CLOCK_CHECK_MASK: u64 = 0x3ff;

/// A user-defined function captured at `def` time.
struct UserFn {
    name: String,
    params: Vec<String>,
    /// Defaults for the trailing `defaults.len()` parameters.
    defaults: Vec<PyValue>,
    body: Vec<Stmt>,
}

/// One user-function activation.
struct Frame {
    locals: HashMap<String, PyValue>,
    fns: HashMap<String, Rc<UserFn>>,
}

/// Statement outcome threaded through loop and function bodies.
enum Flow {
    Normal,
    Break,
    Continue,
    Return(PyValue),
}

pub(crate) struct Evaluator<'a> {
    policy: &'a Policy,
    globals: HashMap<String, PyValue>,
    global_fns: HashMap<String, Rc<UserFn>>,
    frames: Vec<Frame>,
    print_buffer: Vec<String>,
    steps: u64,
    deadline: Instant,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(policy: &'a Policy) -> Self {
        Self {
            policy,
            globals: HashMap::new(),
            global_fns: HashMap::new(),
            frames: Vec::new(),
            print_buffer: Vec::new(),
            steps: 0,
            deadline: Instant::now() + policy.time_limit,
        }
    }

    /// Execute a module body to completion.
    pub(crate) fn run(&mut self, body: &[Stmt]) -> Result<()> {
        for stmt in body {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                Flow::Break | Flow::Continue => {
                    return Err(Error::Runtime(
                        "'break' or 'continue' outside a loop".to_string(),
                    ));
                }
                Flow::Return(_) => {
                    return Err(Error::Runtime("'return' outside a function".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Take everything `print()` produced so far.
    pub(crate) fn take_print_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.print_buffer)
    }

    fn tick(&mut self) -> Result<()> {
        self.steps += 1;
        if self.steps > self.policy.step_limit {
            return Err(Error::StepLimitExceeded(self.policy.step_limit));
        }
        if (self.steps & CLOCK_CHECK_MASK) == 0 && Instant::now() >= self.deadline {
            return Err(Error::TimeLimitExceeded(self.policy.time_limit));
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------

    fn exec_body(&mut self, body: &[Stmt]) -> Result<Flow> {
        for stmt in body {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        self.tick()?;

        match stmt {
            Stmt::Expr(node) => {
                self.eval_expr(&node.value)?;
                Ok(Flow::Normal)
            }

            Stmt::Assign(node) => {
                let value = self.eval_expr(&node.value)?;
                for target in &node.targets {
                    self.assign_target(target, value.clone())?;
                }
                Ok(Flow::Normal)
            }

            Stmt::AugAssign(node) => {
                let current = self.eval_expr(&node.target)?;
                let right = self.eval_expr(&node.value)?;
                let result = apply_binop(&node.op, &current, &right)?;
                self.assign_target(&node.target, result)?;
                Ok(Flow::Normal)
            }

            Stmt::AnnAssign(node) => {
                if let Some(value) = &node.value {
                    let value = self.eval_expr(value)?;
                    self.assign_target(&node.target, value)?;
                }
                Ok(Flow::Normal)
            }

            Stmt::If(node) => {
                if self.eval_expr(&node.test)?.is_truthy() {
                    self.exec_body(&node.body)
                } else {
                    self.exec_body(&node.orelse)
                }
            }

            Stmt::While(node) => {
                while self.eval_expr(&node.test)?.is_truthy() {
                    match self.exec_body(&node.body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => return Ok(Flow::Normal),
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                self.exec_body(&node.orelse)
            }

            Stmt::For(node) => {
                let iter_value = self.eval_expr(&node.iter)?;
                let items = to_iterable_items(&iter_value)?;
                for item in items {
                    self.assign_target(&node.target, item)?;
                    match self.exec_body(&node.body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => return Ok(Flow::Normal),
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                self.exec_body(&node.orelse)
            }

            Stmt::FunctionDef(node) => {
                self.define_function(node)?;
                Ok(Flow::Normal)
            }

            Stmt::Return(node) => {
                let value = match &node.value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => PyValue::None,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Pass(_) => Ok(Flow::Normal),
            Stmt::Break(_) => Ok(Flow::Break),
            Stmt::Continue(_) => Ok(Flow::Continue),

            Stmt::ClassDef(_) => Err(Error::Unsupported("class definitions".to_string())),
            Stmt::Import(_) | Stmt::ImportFrom(_) => {
                Err(Error::Unsupported("imports".to_string()))
            }
            Stmt::With(_) | Stmt::AsyncWith(_) => {
                Err(Error::Unsupported("'with' blocks".to_string()))
            }
            Stmt::Try(_) | Stmt::TryStar(_) => {
                Err(Error::Unsupported("try/except".to_string()))
            }
            Stmt::Raise(_) => Err(Error::Unsupported("raise".to_string())),
            Stmt::Assert(_) => Err(Error::Unsupported("assert".to_string())),
            Stmt::Delete(_) => Err(Error::Unsupported("del".to_string())),
            Stmt::Match(_) => Err(Error::Unsupported("match statements".to_string())),
            Stmt::Global(_) | Stmt::Nonlocal(_) => {
                Err(Error::Unsupported("global/nonlocal declarations".to_string()))
            }
            Stmt::AsyncFunctionDef(_) | Stmt::AsyncFor(_) => {
                Err(Error::Unsupported("async code".to_string()))
            }
            #[allow(unreachable_patterns)]
            _ => Err(Error::Unsupported("statement not supported".to_string())),
        }
    }

    fn define_function(&mut self, node: &ast::StmtFunctionDef) -> Result<()> {
        if !node.decorator_list.is_empty() {
            return Err(Error::Unsupported("decorators".to_string()));
        }
        if node.args.vararg.is_some() || node.args.kwarg.is_some() {
            return Err(Error::Unsupported("*args / **kwargs parameters".to_string()));
        }
        if !node.args.kwonlyargs.is_empty() {
            return Err(Error::Unsupported("keyword-only parameters".to_string()));
        }

        let mut params = Vec::new();
        let mut defaults = Vec::new();
        for arg in node.args.posonlyargs.iter().chain(&node.args.args) {
            params.push(arg.def.arg.to_string());
            if let Some(default) = &arg.default {
                defaults.push(self.eval_expr(default)?);
            } else if !defaults.is_empty() {
                // The parser normally rejects this; keep the message anyway.
                return Err(Error::Runtime(
                    "non-default argument follows default argument".to_string(),
                ));
            }
        }

        let func = Rc::new(UserFn {
            name: node.name.to_string(),
            params,
            defaults,
            body: node.body.clone(),
        });

        let name = node.name.to_string();
        match self.frames.last_mut() {
            Some(frame) => {
                frame.fns.insert(name, func);
            }
            None => {
                self.global_fns.insert(name, func);
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Name binding
    // -------------------------------------------------------------------

    fn load(&self, name: &str) -> Option<&PyValue> {
        if let Some(frame) = self.frames.last()
            && let Some(value) = frame.locals.get(name)
        {
            return Some(value);
        }
        self.globals.get(name)
    }

    fn lookup_fn(&self, name: &str) -> Option<Rc<UserFn>> {
        for frame in self.frames.iter().rev() {
            if let Some(func) = frame.fns.get(name) {
                return Some(func.clone());
            }
        }
        self.global_fns.get(name).cloned()
    }

    /// Bind `name` in the current scope (assignment semantics).
    fn store(&mut self, name: &str, value: PyValue) {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.locals.insert(name.to_string(), value);
            }
            None => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    /// Rebind `name` where it currently lives (method write-back semantics).
    fn store_existing(&mut self, name: &str, value: PyValue) {
        if let Some(frame) = self.frames.last_mut()
            && frame.locals.contains_key(name)
        {
            frame.locals.insert(name.to_string(), value);
            return;
        }
        if self.globals.contains_key(name) {
            self.globals.insert(name.to_string(), value);
            return;
        }
        self.store(name, value);
    }

    fn assign_target(&mut self, target: &Expr, value: PyValue) -> Result<()> {
        match target {
            Expr::Name(name) => {
                self.store(name.id.as_str(), value);
                Ok(())
            }

            Expr::Tuple(node) => self.unpack_into(&node.elts, value),
            Expr::List(node) => self.unpack_into(&node.elts, value),

            Expr::Subscript(node) => {
                let index = self.eval_expr(&node.slice)?;
                let Expr::Name(name) = node.value.as_ref() else {
                    return Err(Error::Unsupported(
                        "subscript assignment on a non-variable".to_string(),
                    ));
                };
                let variable = name.id.as_str();
                let container = self
                    .load(variable)
                    .cloned()
                    .ok_or_else(|| Error::NameError(name.id.to_string()))?;

                match (container, index) {
                    (PyValue::List(mut items), PyValue::Int(index)) => {
                        let len = items.len() as i64;
                        let actual = if index < 0 { len + index } else { index };
                        if actual < 0 || actual >= len {
                            return Err(Error::Runtime(format!(
                                "list assignment index out of range: {}",
                                index
                            )));
                        }
                        items[actual as usize] = value;
                        self.store_existing(variable, PyValue::List(items));
                        Ok(())
                    }
                    (PyValue::Dict(mut pairs), PyValue::Str(key)) => {
                        match pairs.iter_mut().find(|(k, _)| *k == key) {
                            Some((_, slot)) => *slot = value,
                            None => pairs.push((key, value)),
                        }
                        self.store_existing(variable, PyValue::Dict(pairs));
                        Ok(())
                    }
                    (container, index) => Err(Error::Type {
                        expected: "a list index or dict key".to_string(),
                        got: format!("{}[{}]", container.type_name(), index.type_name()),
                    }),
                }
            }

            _ => Err(Error::Unsupported(
                "assignment target not supported".to_string(),
            )),
        }
    }

    fn unpack_into(&mut self, targets: &[Expr], value: PyValue) -> Result<()> {
        let items = match value {
            PyValue::List(items) | PyValue::Tuple(items) => items,
            other => {
                return Err(Error::Type {
                    expected: "iterable to unpack".to_string(),
                    got: other.type_name().to_string(),
                });
            }
        };
        if items.len() != targets.len() {
            return Err(Error::Runtime(format!(
                "cannot unpack {} values into {} targets",
                items.len(),
                targets.len()
            )));
        }
        for (target, item) in targets.iter().zip(items) {
            self.assign_target(target, item)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------

    fn eval_expr(&mut self, expr: &Expr) -> Result<PyValue> {
        self.tick()?;

        match expr {
            Expr::Constant(node) => self.eval_constant(&node.value),

            Expr::Name(node) => {
                match node.id.as_str() {
                    "True" => return Ok(PyValue::Bool(true)),
                    "False" => return Ok(PyValue::Bool(false)),
                    "None" => return Ok(PyValue::None),
                    _ => {}
                }

                if let Some(value) = self.load(node.id.as_str()) {
                    return Ok(value.clone());
                }
                if self.lookup_fn(node.id.as_str()).is_some() {
                    return Err(Error::Runtime(format!(
                        "'{}' is a function; call it with parentheses",
                        node.id
                    )));
                }
                Err(Error::NameError(node.id.to_string()))
            }

            Expr::List(node) => {
                let items: Result<Vec<PyValue>> =
                    node.elts.iter().map(|e| self.eval_expr(e)).collect();
                Ok(PyValue::List(items?))
            }

            Expr::Tuple(node) => {
                let items: Result<Vec<PyValue>> =
                    node.elts.iter().map(|e| self.eval_expr(e)).collect();
                Ok(PyValue::Tuple(items?))
            }

            Expr::Dict(node) => {
                let mut pairs = Vec::new();
                for (key, value) in node.keys.iter().zip(node.values.iter()) {
                    let key = match key {
                        Some(k) => match self.eval_expr(k)? {
                            PyValue::Str(s) => s,
                            other => {
                                return Err(Error::Type {
                                    expected: "str dict key".to_string(),
                                    got: other.type_name().to_string(),
                                });
                            }
                        },
                        None => {
                            return Err(Error::Unsupported("dict unpacking".to_string()));
                        }
                    };
                    let value = self.eval_expr(value)?;
                    match pairs.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, slot)) => *slot = value,
                        None => pairs.push((key, value)),
                    }
                }
                Ok(PyValue::Dict(pairs))
            }

            Expr::BinOp(node) => {
                let left = self.eval_expr(&node.left)?;
                let right = self.eval_expr(&node.right)?;
                apply_binop(&node.op, &left, &right)
            }

            Expr::UnaryOp(node) => {
                let operand = self.eval_expr(&node.operand)?;
                match node.op {
                    UnaryOp::Not => Ok(PyValue::Bool(!operand.is_truthy())),
                    UnaryOp::USub => match operand {
                        PyValue::Int(i) => i
                            .checked_neg()
                            .map(PyValue::Int)
                            .ok_or_else(|| Error::Runtime("integer overflow".to_string())),
                        PyValue::Float(f) => Ok(PyValue::Float(-f)),
                        other => Err(Error::Type {
                            expected: "number".to_string(),
                            got: other.type_name().to_string(),
                        }),
                    },
                    UnaryOp::UAdd => match operand {
                        PyValue::Int(_) | PyValue::Float(_) => Ok(operand),
                        other => Err(Error::Type {
                            expected: "number".to_string(),
                            got: other.type_name().to_string(),
                        }),
                    },
                    UnaryOp::Invert => match operand {
                        PyValue::Int(i) => Ok(PyValue::Int(!i)),
                        other => Err(Error::Type {
                            expected: "int".to_string(),
                            got: other.type_name().to_string(),
                        }),
                    },
                }
            }

            Expr::BoolOp(node) => {
                let Some((last, rest)) = node.values.split_last() else {
                    return Ok(PyValue::None);
                };
                for value in rest {
                    let v = self.eval_expr(value)?;
                    match node.op {
                        BoolOp::And if !v.is_truthy() => return Ok(v),
                        BoolOp::Or if v.is_truthy() => return Ok(v),
                        _ => {}
                    }
                }
                self.eval_expr(last)
            }

            Expr::Compare(node) => {
                let mut left = self.eval_expr(&node.left)?;
                for (op, right_expr) in node.ops.iter().zip(node.comparators.iter()) {
                    let right = self.eval_expr(right_expr)?;
                    if !apply_cmpop(op, &left, &right)? {
                        return Ok(PyValue::Bool(false));
                    }
                    left = right;
                }
                Ok(PyValue::Bool(true))
            }

            Expr::IfExp(node) => {
                if self.eval_expr(&node.test)?.is_truthy() {
                    self.eval_expr(&node.body)
                } else {
                    self.eval_expr(&node.orelse)
                }
            }

            Expr::NamedExpr(node) => {
                let value = self.eval_expr(&node.value)?;
                self.assign_target(&node.target, value.clone())?;
                Ok(value)
            }

            Expr::Call(node) => self.eval_call(node),

            Expr::Subscript(node) => {
                let value = self.eval_expr(&node.value)?;
                if let Expr::Slice(slice) = node.slice.as_ref() {
                    let lower = self.eval_slice_part(slice.lower.as_deref())?;
                    let upper = self.eval_slice_part(slice.upper.as_deref())?;
                    let step = self.eval_slice_part(slice.step.as_deref())?;
                    crate::slice::slice_value(&value, lower, upper, step)
                } else {
                    let index = self.eval_expr(&node.slice)?;
                    index_value(&value, &index)
                }
            }

            Expr::ListComp(node) => {
                let mut results = Vec::new();
                self.eval_comprehension(&node.elt, &node.generators, 0, &mut results)?;
                Ok(PyValue::List(results))
            }

            Expr::JoinedStr(node) => {
                let mut out = String::new();
                for value in &node.values {
                    match value {
                        Expr::Constant(c) => match &c.value {
                            Constant::Str(s) => out.push_str(s),
                            other => {
                                out.push_str(&self.eval_constant(other)?.to_print_string())
                            }
                        },
                        Expr::FormattedValue(fv) => {
                            if fv.format_spec.is_some() {
                                return Err(Error::Unsupported(
                                    "format specifiers in f-strings".to_string(),
                                ));
                            }
                            let v = self.eval_expr(&fv.value)?;
                            out.push_str(&v.to_print_string());
                        }
                        other => {
                            let v = self.eval_expr(other)?;
                            out.push_str(&v.to_print_string());
                        }
                    }
                }
                Ok(PyValue::Str(out))
            }

            Expr::FormattedValue(node) => {
                let v = self.eval_expr(&node.value)?;
                Ok(PyValue::Str(v.to_print_string()))
            }

            Expr::Attribute(node) => {
                // Bare attribute reads have no supported surface; method
                // calls route through eval_call instead.
                let value = self.eval_expr(&node.value)?;
                Err(Error::Unsupported(format!(
                    "attribute access: {}.{}",
                    value.type_name(),
                    node.attr
                )))
            }

            Expr::Lambda(_) => Err(Error::Unsupported("lambda expressions".to_string())),
            Expr::Set(_) => Err(Error::Unsupported("set literals".to_string())),
            Expr::SetComp(_) | Expr::DictComp(_) | Expr::GeneratorExp(_) => Err(
                Error::Unsupported("set/dict comprehensions and generators".to_string()),
            ),
            Expr::Starred(_) => Err(Error::Unsupported("starred expressions".to_string())),
            Expr::Await(_) | Expr::Yield(_) | Expr::YieldFrom(_) => {
                Err(Error::Unsupported("async/generator expressions".to_string()))
            }
            Expr::Slice(_) => Err(Error::Unsupported(
                "slice outside of subscript".to_string(),
            )),
            #[allow(unreachable_patterns)]
            _ => Err(Error::Unsupported("expression not supported".to_string())),
        }
    }

    fn eval_slice_part(&mut self, part: Option<&Expr>) -> Result<Option<i64>> {
        match part {
            None => Ok(None),
            Some(expr) => {
                let value = self.eval_expr(expr)?;
                value.as_int().map(Some).ok_or_else(|| Error::Type {
                    expected: "int slice index".to_string(),
                    got: value.type_name().to_string(),
                })
            }
        }
    }

    fn eval_constant(&self, constant: &Constant) -> Result<PyValue> {
        match constant {
            Constant::None => Ok(PyValue::None),
            Constant::Bool(b) => Ok(PyValue::Bool(*b)),
            Constant::Int(i) => {
                let val: i64 = i
                    .try_into()
                    .map_err(|_| Error::Runtime("integer literal too large".to_string()))?;
                Ok(PyValue::Int(val))
            }
            Constant::Float(f) => Ok(PyValue::Float(*f)),
            Constant::Str(s) => Ok(PyValue::Str(s.clone())),
            Constant::Tuple(items) => {
                let values: Result<Vec<PyValue>> =
                    items.iter().map(|c| self.eval_constant(c)).collect();
                Ok(PyValue::Tuple(values?))
            }
            Constant::Bytes(_) => Err(Error::Unsupported("bytes literals".to_string())),
            Constant::Complex { .. } => Err(Error::Unsupported("complex numbers".to_string())),
            Constant::Ellipsis => Err(Error::Unsupported("ellipsis".to_string())),
        }
    }

    fn eval_comprehension(
        &mut self,
        elt: &Expr,
        generators: &[ast::Comprehension],
        index: usize,
        results: &mut Vec<PyValue>,
    ) -> Result<()> {
        if index >= generators.len() {
            let value = self.eval_expr(elt)?;
            results.push(value);
            return Ok(());
        }

        let generator = &generators[index];
        if generator.is_async {
            return Err(Error::Unsupported("async comprehensions".to_string()));
        }

        let iter_value = self.eval_expr(&generator.iter)?;
        let items = to_iterable_items(&iter_value)?;

        'items: for item in items {
            self.tick()?;
            self.assign_target(&generator.target, item)?;
            for condition in &generator.ifs {
                if !self.eval_expr(condition)?.is_truthy() {
                    continue 'items;
                }
            }
            self.eval_comprehension(elt, generators, index + 1, results)?;
        }

        Ok(())
    }

    // -------------------------------------------------------------------
    // Calls
    // -------------------------------------------------------------------

    fn eval_call(&mut self, call: &ast::ExprCall) -> Result<PyValue> {
        match call.func.as_ref() {
            Expr::Name(name) => self.eval_named_call(name.id.as_str(), call),
            Expr::Attribute(attr) => self.eval_method_call(attr, call),
            _ => Err(Error::Unsupported(
                "only named function calls are supported".to_string(),
            )),
        }
    }

    fn eval_named_call(&mut self, name: &str, call: &ast::ExprCall) -> Result<PyValue> {
        if let Some(func) = self.lookup_fn(name) {
            return self.call_user_fn(func, call);
        }

        // Denied or unknown names land here: the restricted namespace simply
        // has no such binding.
        if !self.policy.allowed_builtins.contains(name) {
            return Err(Error::NameError(name.to_string()));
        }
        if !call.keywords.is_empty() {
            return Err(Error::Runtime(format!(
                "{}() does not accept keyword arguments in the sandbox",
                name
            )));
        }

        let args = self.eval_args(&call.args)?;
        let max_materialized = usize::try_from(self.policy.step_limit).unwrap_or(usize::MAX);
        match try_builtin(name, args, &mut self.print_buffer, max_materialized) {
            BuiltinResult::Handled(result) => result,
            BuiltinResult::NotBuiltin => Err(Error::NameError(name.to_string())),
        }
    }

    fn eval_method_call(
        &mut self,
        attr: &ast::ExprAttribute,
        call: &ast::ExprCall,
    ) -> Result<PyValue> {
        if !call.keywords.is_empty() {
            return Err(Error::Runtime(format!(
                "{}() does not accept keyword arguments in the sandbox",
                attr.attr
            )));
        }
        let receiver = self.eval_expr(&attr.value)?;
        let args = self.eval_args(&call.args)?;
        let outcome = call_method(receiver, attr.attr.as_str(), args)?;

        if let Some(updated) = outcome.updated
            && let Expr::Name(name) = attr.value.as_ref()
        {
            // Mutation on a temporary (e.g. `[1].append(2)`) has nothing to
            // write back to; Python discards it the same way.
            self.store_existing(name.id.as_str(), updated);
        }
        Ok(outcome.returned)
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<PyValue>> {
        args.iter().map(|a| self.eval_expr(a)).collect()
    }

    fn call_user_fn(&mut self, func: Rc<UserFn>, call: &ast::ExprCall) -> Result<PyValue> {
        if self.frames.len() >= self.policy.recursion_limit {
            return Err(Error::RecursionLimitExceeded(self.policy.recursion_limit));
        }

        let mut bound: Vec<Option<PyValue>> = vec![None; func.params.len()];

        if call.args.len() > func.params.len() {
            return Err(Error::Runtime(format!(
                "{}() takes {} arguments but {} were given",
                func.name,
                func.params.len(),
                call.args.len()
            )));
        }
        for (slot, arg) in bound.iter_mut().zip(call.args.iter()) {
            *slot = Some(self.eval_expr(arg)?);
        }
        for keyword in &call.keywords {
            let Some(kw_name) = &keyword.arg else {
                return Err(Error::Unsupported("** argument unpacking".to_string()));
            };
            let value = self.eval_expr(&keyword.value)?;
            let position = func
                .params
                .iter()
                .position(|p| p == kw_name.as_str())
                .ok_or_else(|| {
                    Error::Runtime(format!(
                        "{}() got an unexpected keyword argument '{}'",
                        func.name, kw_name
                    ))
                })?;
            if bound[position].is_some() {
                return Err(Error::Runtime(format!(
                    "{}() got multiple values for argument '{}'",
                    func.name, kw_name
                )));
            }
            bound[position] = Some(value);
        }

        let first_default = func.params.len() - func.defaults.len();
        let mut locals = HashMap::new();
        for (i, (param, slot)) in func.params.iter().zip(bound).enumerate() {
            let value = match slot {
                Some(value) => value,
                None if i >= first_default => func.defaults[i - first_default].clone(),
                None => {
                    return Err(Error::Runtime(format!(
                        "{}() missing required argument '{}'",
                        func.name, param
                    )));
                }
            };
            locals.insert(param.clone(), value);
        }

        self.frames.push(Frame {
            locals,
            fns: HashMap::new(),
        });
        let flow = self.exec_body(&func.body);
        self.frames.pop();

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(PyValue::None),
            Flow::Break | Flow::Continue => Err(Error::Runtime(
                "'break' or 'continue' outside a loop".to_string(),
            )),
        }
    }
}

fn index_value(value: &PyValue, index: &PyValue) -> Result<PyValue> {
    match (value, index) {
        (PyValue::List(items), PyValue::Int(i)) | (PyValue::Tuple(items), PyValue::Int(i)) => {
            let len = items.len() as i64;
            let actual = if *i < 0 { len + i } else { *i };
            if actual < 0 || actual >= len {
                return Err(Error::Runtime(format!(
                    "{} index out of range: {}",
                    value.type_name(),
                    i
                )));
            }
            Ok(items[actual as usize].clone())
        }
        (PyValue::Str(s), PyValue::Int(i)) => {
            let len = s.chars().count() as i64;
            let actual = if *i < 0 { len + i } else { *i };
            if actual < 0 || actual >= len {
                return Err(Error::Runtime(format!("string index out of range: {}", i)));
            }
            s.chars()
                .nth(actual as usize)
                .map(|c| PyValue::Str(c.to_string()))
                .ok_or_else(|| Error::Runtime(format!("string index out of range: {}", i)))
        }
        (PyValue::Dict(pairs), PyValue::Str(key)) => pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| Error::Runtime(format!("KeyError: '{}'", key))),
        _ => Err(Error::Type {
            expected: "subscriptable".to_string(),
            got: format!("{}[{}]", value.type_name(), index.type_name()),
        }),
    }
}
