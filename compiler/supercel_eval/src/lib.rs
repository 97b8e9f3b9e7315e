//! Evaluator for supercel expressions.
//!
//! An expression tree from `supercel_parse` is evaluated against an
//! [`Environment`]. Calls of the form `platform.<name>(args)` (also spelled
//! `computed.<name>(args)`) and `device.<name>(args)` are answered by the
//! embedding host through a [`HostBridge`]; evaluation suspends at each one
//! and resumes with the host's value.
//!
//! - [`Evaluation`]: the resumable state machine, for hosts that want to
//!   drive suspension themselves.
//! - [`evaluate`] / [`evaluate_with_limits`]: async drivers over a bridge.
//! - [`evaluate_blocking`]: the same, blocking the current thread.

mod bridge;
mod builtins;
mod environment;
mod errors;
mod evaluation;
mod limits;
mod operators;
mod unary_operators;

pub use bridge::{
    decode_reply, encode_args, FnBridge, HostBridge, HostContext, HostError, NoHost, WireBridge,
};
pub use environment::{
    Environment, HostNamespace, PlatformDeclarations, COMPUTED_ROOT, DEVICE_ROOT, PLATFORM_ROOT,
};
pub use errors::{EvalError, EvalErrorKind, EvalResult};
pub use evaluation::{EvalState, Evaluation, HostRequest, Step};
pub use limits::EvalLimits;
pub use operators::{evaluate_binary, strict_equals};
pub use unary_operators::evaluate_unary;

use supercel_ir::Expr;

/// Evaluate `ast` against `env`, answering host calls through `bridge`.
///
/// Dropping the returned future cancels the evaluation together with any
/// pending bridge call.
pub async fn evaluate<B>(ast: &Expr, env: &Environment, bridge: &B) -> EvalResult
where
    B: HostBridge + ?Sized,
{
    evaluate_with_limits(ast, env, bridge, EvalLimits::default()).await
}

/// [`evaluate`] with resource limits.
#[tracing::instrument(level = "debug", skip_all, fields(nodes = ast.node_count()))]
pub async fn evaluate_with_limits<B>(
    ast: &Expr,
    env: &Environment,
    bridge: &B,
    limits: EvalLimits,
) -> EvalResult
where
    B: HostBridge + ?Sized,
{
    let mut evaluation = Evaluation::new(ast, env).with_limits(limits);
    let mut step = evaluation.run()?;
    loop {
        match step {
            Step::Complete(value) => return Ok(value),
            Step::Host(request) => {
                let outcome = match request.namespace {
                    HostNamespace::Computed => bridge.invoke(&request.name, &request.args).await,
                    HostNamespace::Device => {
                        bridge.invoke_device(&request.name, &request.args).await
                    }
                };
                step = evaluation.resume(outcome)?;
            }
        }
    }
}

/// [`evaluate_with_limits`] on the current thread.
pub fn evaluate_blocking<B>(
    ast: &Expr,
    env: &Environment,
    bridge: &B,
    limits: EvalLimits,
) -> EvalResult
where
    B: HostBridge + ?Sized,
{
    futures::executor::block_on(evaluate_with_limits(ast, env, bridge, limits))
}
