//! Resumable evaluation.
//!
//! [`Evaluation`] walks the tree with an explicit work stack instead of
//! native recursion. The work stack is the continuation: when the walk
//! reaches a host call (`platform.<name>(args)`, `computed.<name>(args)` or
//! `device.<name>(args)`) it stops and hands back a [`HostRequest`]; everything needed to continue stays on the two stacks
//! until [`Evaluation::resume`] delivers the host's answer.
//!
//! Order is strictly left to right, depth first. At most one host request
//! is outstanding at a time.
//!
//! ```text
//!            run()                     resume(Ok)
//! Running ----------> AwaitingHost ---------------> Running
//!    |                     |
//!    +--> Completed        +--> Failed  (host error outside maybe())
//!    +--> Failed           +--> Cancelled (cancel())
//! ```

use std::fmt;

use supercel_ir::{BinaryOp, Expr, ExprKind, Literal, LogicalOp, Span, UnaryOp};
use supercel_value::{Value, ValueMap};

use crate::bridge::HostError;
use crate::builtins::{call_function, call_method, MAYBE};
use crate::environment::{Environment, HostNamespace};
use crate::errors::{
    cancelled, host_callback_failed, index_out_of_bounds, invalid_state, type_mismatch,
    undefined_reference, wrong_arg_count, EvalError, EvalResult,
};
use crate::limits::{Budget, EvalLimits};
use crate::operators::evaluate_binary;
use crate::unary_operators::evaluate_unary;

/// Lifecycle of an [`Evaluation`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EvalState {
    Running,
    AwaitingHost,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for EvalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EvalState::Running => "running",
            EvalState::AwaitingHost => "awaiting a host answer",
            EvalState::Completed => "completed",
            EvalState::Failed => "failed",
            EvalState::Cancelled => "cancelled",
        })
    }
}

/// A suspended host property call.
#[derive(Clone, Debug, PartialEq)]
pub struct HostRequest {
    /// Which host interface answers.
    pub namespace: HostNamespace,
    /// Property name without the namespace prefix.
    pub name: String,
    /// Arguments, evaluated left to right.
    pub args: Vec<Value>,
    /// Location of the call expression.
    pub span: Span,
}

/// What [`Evaluation::run`] and [`Evaluation::resume`] stopped at.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Complete(Value),
    Host(HostRequest),
}

/// Pending work. Items that consume operands pop them from the value
/// stack, so operands are scheduled after (above) their consumer.
#[derive(Debug)]
enum Work<'a> {
    Eval(&'a Expr),
    Unary {
        op: UnaryOp,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        span: Span,
    },
    /// Left operand is on the value stack; decide whether `right` runs.
    Logical {
        op: LogicalOp,
        right: &'a Expr,
        span: Span,
    },
    /// Right operand is on the value stack; it must be a `Bool`.
    LogicalRight {
        op: LogicalOp,
        span: Span,
    },
    Branch {
        then_branch: &'a Expr,
        else_branch: &'a Expr,
        span: Span,
    },
    Member {
        node: &'a Expr,
        field: &'a str,
    },
    Index {
        node: &'a Expr,
    },
    BuildList {
        len: usize,
    },
    BuildMap {
        len: usize,
        span: Span,
    },
    CallFunction {
        name: &'a str,
        argc: usize,
        span: Span,
    },
    CallMethod {
        name: &'a str,
        argc: usize,
        span: Span,
    },
    CallHost {
        namespace: HostNamespace,
        name: &'a str,
        argc: usize,
        span: Span,
    },
    /// `maybe(a, b)` handler: a recoverable error raised above this frame
    /// truncates the value stack to `values_len` and runs `fallback`.
    Recover {
        fallback: &'a Expr,
        values_len: usize,
    },
}

#[derive(Copy, Clone, Debug)]
struct PendingCall<'a> {
    namespace: HostNamespace,
    name: &'a str,
    span: Span,
}

/// One evaluation of one tree against one environment.
///
/// Borrows both for its whole life; neither is modified.
pub struct Evaluation<'a> {
    env: &'a Environment,
    work: Vec<Work<'a>>,
    values: Vec<Value>,
    state: EvalState,
    budget: Budget,
    pending: Option<PendingCall<'a>>,
}

impl<'a> Evaluation<'a> {
    pub fn new(ast: &'a Expr, env: &'a Environment) -> Self {
        Evaluation {
            env,
            work: vec![Work::Eval(ast)],
            values: Vec::new(),
            state: EvalState::Running,
            budget: Budget::new(EvalLimits::default()),
            pending: None,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: EvalLimits) -> Self {
        self.budget = Budget::new(limits);
        self
    }

    pub fn state(&self) -> EvalState {
        self.state
    }

    /// Nodes visited so far.
    pub fn steps(&self) -> u64 {
        self.budget.steps()
    }

    /// Host calls issued so far.
    pub fn host_calls(&self) -> u32 {
        self.budget.host_calls()
    }

    /// Advance until the result is known or a host call is needed.
    pub fn run(&mut self) -> Result<Step, EvalError> {
        match self.state {
            EvalState::Running => self.drive(),
            EvalState::Cancelled => Err(cancelled()),
            state => Err(invalid_state(state, "run")),
        }
    }

    /// Deliver the answer to the outstanding host request and continue.
    ///
    /// A host error raises `HostCallback` at the call site: the innermost
    /// enclosing `maybe(...)` recovers it, otherwise the evaluation fails.
    /// After [`cancel`](Self::cancel) this returns `Cancelled` and changes
    /// nothing.
    pub fn resume(&mut self, outcome: Result<Value, HostError>) -> Result<Step, EvalError> {
        match self.state {
            EvalState::AwaitingHost => {}
            EvalState::Cancelled => return Err(cancelled()),
            state => return Err(invalid_state(state, "resume")),
        }
        let Some(call) = self.pending.take() else {
            unreachable!("evaluation awaiting a host answer without a pending call");
        };
        self.state = EvalState::Running;
        match outcome {
            Ok(value) => {
                tracing::debug!(property = call.name, "resumed with host answer");
                self.values.push(value);
                self.drive()
            }
            Err(cause) => {
                let err = host_callback_failed(call.namespace, call.name, cause).with_span(call.span);
                if self.unwind_to_recover() {
                    tracing::trace!(error = %err, "recovered by maybe()");
                    self.drive()
                } else {
                    Err(self.fail(err))
                }
            }
        }
    }

    /// Abandon the evaluation, releasing its stacks. No-op once finished.
    pub fn cancel(&mut self) {
        if matches!(self.state, EvalState::Running | EvalState::AwaitingHost) {
            tracing::debug!(state = %self.state, "evaluation cancelled");
            self.state = EvalState::Cancelled;
            self.release();
        }
    }

    /// Drive to completion, answering host requests with `host`.
    pub fn run_with<F>(&mut self, mut host: F) -> EvalResult
    where
        F: FnMut(&HostRequest) -> Result<Value, HostError>,
    {
        let mut step = self.run()?;
        loop {
            match step {
                Step::Complete(value) => return Ok(value),
                Step::Host(request) => {
                    let outcome = host(&request);
                    step = self.resume(outcome)?;
                }
            }
        }
    }

    fn drive(&mut self) -> Result<Step, EvalError> {
        loop {
            let Some(work) = self.work.pop() else {
                return Ok(Step::Complete(self.finish()));
            };
            match self.step(work) {
                Ok(None) => {}
                Ok(Some(request)) => {
                    self.state = EvalState::AwaitingHost;
                    return Ok(Step::Host(request));
                }
                Err(err) if err.is_recoverable() && self.unwind_to_recover() => {
                    tracing::trace!(error = %err, "recovered by maybe()");
                }
                Err(err) => return Err(self.fail(err)),
            }
        }
    }

    fn finish(&mut self) -> Value {
        let (Some(value), true) = (self.values.pop(), self.values.is_empty()) else {
            unreachable!("evaluation finished with {} values", self.values.len() + 1);
        };
        self.state = EvalState::Completed;
        tracing::debug!(
            steps = self.budget.steps(),
            host_calls = self.budget.host_calls(),
            "evaluation completed"
        );
        value
    }

    fn fail(&mut self, err: EvalError) -> EvalError {
        tracing::debug!(code = err.code(), error = %err, "evaluation failed");
        self.state = EvalState::Failed;
        self.release();
        err
    }

    fn release(&mut self) {
        self.work = Vec::new();
        self.values = Vec::new();
        self.pending = None;
    }

    /// Pop work up to the innermost `Recover` frame and schedule its
    /// fallback. Returns `false` if there is none.
    fn unwind_to_recover(&mut self) -> bool {
        while let Some(work) = self.work.pop() {
            if let Work::Recover {
                fallback,
                values_len,
            } = work
            {
                self.values.truncate(values_len);
                self.work.push(Work::Eval(fallback));
                return true;
            }
        }
        false
    }

    fn pop_value(&mut self) -> Value {
        let Some(value) = self.values.pop() else {
            unreachable!("value stack underflow");
        };
        value
    }

    fn pop_values(&mut self, n: usize) -> Vec<Value> {
        let Some(start) = self.values.len().checked_sub(n) else {
            unreachable!("value stack underflow: need {n}, have {}", self.values.len());
        };
        self.values.split_off(start)
    }

    /// Execute one work item. Returns a request when the walk reached a
    /// host call.
    fn step(&mut self, work: Work<'a>) -> Result<Option<HostRequest>, EvalError> {
        match work {
            Work::Eval(expr) => self.eval(expr)?,
            Work::Unary { op, span } => {
                let operand = self.pop_value();
                let value = evaluate_unary(operand, op).map_err(|e| e.with_span(span))?;
                self.values.push(value);
            }
            Work::Binary { op, span } => {
                let right = self.pop_value();
                let left = self.pop_value();
                let value = evaluate_binary(left, right, op).map_err(|e| e.with_span(span))?;
                self.values.push(value);
            }
            Work::Logical { op, right, span } => match self.pop_value() {
                Value::Bool(b) if b == op.short_circuit_on() => self.values.push(Value::Bool(b)),
                Value::Bool(_) => {
                    self.work.push(Work::LogicalRight { op, span });
                    self.work.push(Work::Eval(right));
                }
                other => {
                    return Err(
                        type_mismatch(format!("bool operand for `{op}`"), other.type_name())
                            .with_span(span),
                    )
                }
            },
            Work::LogicalRight { op, span } => {
                let value = self.pop_value();
                if !matches!(value, Value::Bool(_)) {
                    return Err(
                        type_mismatch(format!("bool operand for `{op}`"), value.type_name())
                            .with_span(span),
                    );
                }
                self.values.push(value);
            }
            Work::Branch {
                then_branch,
                else_branch,
                span,
            } => match self.pop_value() {
                Value::Bool(true) => self.work.push(Work::Eval(then_branch)),
                Value::Bool(false) => self.work.push(Work::Eval(else_branch)),
                other => {
                    return Err(type_mismatch("bool condition", other.type_name()).with_span(span))
                }
            },
            Work::Member { node, field } => {
                let target = self.pop_value();
                let value = member(target, field, node).map_err(|e| e.with_span(node.span))?;
                self.values.push(value);
            }
            Work::Index { node } => {
                let index = self.pop_value();
                let target = self.pop_value();
                let value = index_into(target, index, node).map_err(|e| e.with_span(node.span))?;
                self.values.push(value);
            }
            Work::BuildList { len } => {
                let items = self.pop_values(len);
                self.values.push(Value::List(items));
            }
            Work::BuildMap { len, span } => {
                let flat = self.pop_values(len * 2);
                let mut map = ValueMap::default();
                map.reserve(len);
                let mut iter = flat.into_iter();
                while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                    let Value::String(key) = key else {
                        return Err(type_mismatch("string map key", key.type_name()).with_span(span));
                    };
                    map.insert(key, value);
                }
                self.values.push(Value::Map(map));
            }
            Work::CallFunction { name, argc, span } => {
                let args = self.pop_values(argc);
                let value = call_function(name, args).map_err(|e| e.with_span(span))?;
                self.values.push(value);
            }
            Work::CallMethod { name, argc, span } => {
                let args = self.pop_values(argc);
                let receiver = self.pop_value();
                let value = call_method(&receiver, name, &args).map_err(|e| e.with_span(span))?;
                self.values.push(value);
            }
            Work::CallHost {
                namespace,
                name,
                argc,
                span,
            } => {
                let args = self.pop_values(argc);
                self.budget
                    .charge_host_call()
                    .map_err(|e| e.with_span(span))?;
                tracing::debug!(%namespace, property = name, args = argc, "suspending for host call");
                self.pending = Some(PendingCall {
                    namespace,
                    name,
                    span,
                });
                return Ok(Some(HostRequest {
                    namespace,
                    name: name.to_string(),
                    args,
                    span,
                }));
            }
            // The guarded expression succeeded; its value stays.
            Work::Recover { .. } => {}
        }
        Ok(None)
    }

    /// Visit one node: leaves push a value, inner nodes schedule their
    /// consumer and then their operands in reverse order.
    fn eval(&mut self, expr: &'a Expr) -> Result<(), EvalError> {
        self.budget
            .charge_step()
            .map_err(|e| e.with_span(expr.span))?;
        tracing::trace!(step = self.budget.steps(), span = %expr.span, "eval");

        match &expr.kind {
            ExprKind::Literal(lit) => self.values.push(literal_value(lit)),
            ExprKind::Ident(name) => {
                let value = if let Some(namespace) = HostNamespace::from_root(name) {
                    self.env.declarations(namespace).to_value()
                } else {
                    self.env
                        .resolve(&[name.as_str()])
                        .map_err(|e| e.with_span(expr.span))?
                        .clone()
                };
                self.values.push(value);
            }
            ExprKind::Member { target, field } => {
                if let Some(path) = expr.member_path() {
                    if HostNamespace::from_root(path[0]).is_some() {
                        return Err(uncalled_host_property(&path).with_span(expr.span));
                    }
                    // Plain variable path: look it up in place, clone only the leaf.
                    let value = self
                        .env
                        .resolve(&path)
                        .map_err(|e| e.with_span(expr.span))?
                        .clone();
                    self.values.push(value);
                } else {
                    self.work.push(Work::Member { node: expr, field });
                    self.work.push(Work::Eval(target));
                }
            }
            ExprKind::Index { target, index } => {
                self.work.push(Work::Index { node: expr });
                self.work.push(Work::Eval(index));
                self.work.push(Work::Eval(target));
            }
            ExprKind::Call { callee, args } => self.schedule_call(expr, callee, args)?,
            ExprKind::Unary { op, operand } => {
                self.work.push(Work::Unary {
                    op: *op,
                    span: expr.span,
                });
                self.work.push(Work::Eval(operand));
            }
            ExprKind::Binary { op, left, right } => {
                self.work.push(Work::Binary {
                    op: *op,
                    span: expr.span,
                });
                self.work.push(Work::Eval(right));
                self.work.push(Work::Eval(left));
            }
            ExprKind::Logical { op, left, right } => {
                self.work.push(Work::Logical {
                    op: *op,
                    right,
                    span: expr.span,
                });
                self.work.push(Work::Eval(left));
            }
            ExprKind::Grouping(inner) => self.work.push(Work::Eval(inner)),
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                self.work.push(Work::Branch {
                    then_branch,
                    else_branch,
                    span: condition.span,
                });
                self.work.push(Work::Eval(condition));
            }
            ExprKind::List(items) => {
                self.work.push(Work::BuildList { len: items.len() });
                self.work.extend(items.iter().rev().map(Work::Eval));
            }
            ExprKind::Map(entries) => {
                self.work.push(Work::BuildMap {
                    len: entries.len(),
                    span: expr.span,
                });
                for entry in entries.iter().rev() {
                    self.work.push(Work::Eval(&entry.value));
                    self.work.push(Work::Eval(&entry.key));
                }
            }
        }
        Ok(())
    }

    fn schedule_call(
        &mut self,
        call: &'a Expr,
        callee: &'a Expr,
        args: &'a [Expr],
    ) -> Result<(), EvalError> {
        let span = call.span;
        let argc = args.len();
        let host_call = callee
            .as_rooted_member()
            .and_then(|(root, name)| Some((HostNamespace::from_root(root)?, name)));
        if let Some((namespace, name)) = host_call {
            self.work.push(Work::CallHost {
                namespace,
                name,
                argc,
                span,
            });
            self.work.extend(args.iter().rev().map(Work::Eval));
            return Ok(());
        }
        match &callee.kind {
            ExprKind::Ident(name) if name == MAYBE => {
                let [guarded, fallback] = args else {
                    return Err(wrong_arg_count(MAYBE, 2, argc).with_span(span));
                };
                self.work.push(Work::Recover {
                    fallback,
                    values_len: self.values.len(),
                });
                self.work.push(Work::Eval(guarded));
            }
            ExprKind::Ident(name) => {
                self.work.push(Work::CallFunction { name, argc, span });
                self.work.extend(args.iter().rev().map(Work::Eval));
            }
            ExprKind::Member { target, field } => {
                self.work.push(Work::CallMethod {
                    name: field,
                    argc,
                    span,
                });
                self.work.extend(args.iter().rev().map(Work::Eval));
                self.work.push(Work::Eval(target));
            }
            _ => {
                return Err(
                    type_mismatch("function or method name", format!("call of `{callee}`"))
                        .with_span(callee.span),
                )
            }
        }
        Ok(())
    }
}

impl Drop for Evaluation<'_> {
    fn drop(&mut self) {
        // Dropping mid-flight (e.g. an abandoned future) counts as cancellation.
        self.cancel();
    }
}

impl fmt::Debug for Evaluation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluation")
            .field("state", &self.state)
            .field("pending_work", &self.work.len())
            .field("values", &self.values.len())
            .field("steps", &self.budget.steps())
            .finish_non_exhaustive()
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Uint(n) => Value::Uint(*n),
        Literal::Double(d) => Value::Double(*d),
        Literal::String(s) => Value::String(s.clone()),
    }
}

#[cold]
fn uncalled_host_property(path: &[&str]) -> EvalError {
    type_mismatch(
        format!("call `{}(...)`", path.join(".")),
        "host property access without a call",
    )
}

fn member(target: Value, field: &str, node: &Expr) -> EvalResult {
    match target {
        Value::Map(mut map) => map
            .remove(field)
            .ok_or_else(|| undefined_reference(node.to_string())),
        other => Err(type_mismatch(
            format!("map for member access `.{field}`"),
            other.type_name(),
        )),
    }
}

fn index_into(target: Value, index: Value, node: &Expr) -> EvalResult {
    match (target, index) {
        (Value::List(mut items), Value::Int(i)) => {
            let len = items.len();
            match usize::try_from(i) {
                Ok(i) if i < len => Ok(items.swap_remove(i)),
                _ => Err(index_out_of_bounds(i128::from(i), len)),
            }
        }
        (Value::List(mut items), Value::Uint(u)) => {
            let len = items.len();
            match usize::try_from(u) {
                Ok(i) if i < len => Ok(items.swap_remove(i)),
                _ => Err(index_out_of_bounds(i128::from(u), len)),
            }
        }
        (Value::Map(mut map), Value::String(key)) => map
            .remove(&key)
            .ok_or_else(|| undefined_reference(node.to_string())),
        (Value::List(_), other) => Err(type_mismatch("int or uint list index", other.type_name())),
        (Value::Map(_), other) => Err(type_mismatch("string map key", other.type_name())),
        (other, _) => Err(type_mismatch("list or map for indexing", other.type_name())),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
