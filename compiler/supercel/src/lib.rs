//! supercel: an embeddable expression evaluator.
//!
//! Expressions are CEL-like (`user.age >= 18 && "admin" in user.roles`) and
//! may call into the embedding host with `platform.<name>(args)` (or
//! `computed.<name>(args)`) and `device.<name>(args)`. Evaluation
//! suspends at each such call and resumes once the host answers, so hosts can
//! compute values asynchronously.
//!
//! # Entry points
//!
//! - [`parse`] and [`parse_to_ast`] turn text into a reusable tree.
//! - [`evaluate`] runs a tree against an [`Environment`] and a [`HostBridge`].
//! - [`evaluate_with_context`] is the JSON-in, JSON-out boundary used by
//!   embedders that only speak text (WebAssembly, test harnesses).

mod diagnostic;
mod request;
mod response;

use std::sync::Once;

pub use diagnostic::render_parse_error;
pub use request::{EvalRequest, ExpressionSource, RequestError};
pub use response::{ErrorBody, Response};
pub use supercel_eval::{
    decode_reply, encode_args, evaluate, evaluate_blocking, evaluate_with_limits, Environment,
    EvalError, EvalErrorKind, EvalLimits, EvalResult, EvalState, Evaluation, FnBridge,
    HostBridge, HostContext, HostError, HostNamespace, HostRequest, NoHost, PlatformDeclarations,
    Step, WireBridge, COMPUTED_ROOT, DEVICE_ROOT, PLATFORM_ROOT,
};
pub use supercel_ir::{BinaryOp, Expr, ExprKind, Literal, LogicalOp, MapEntry, Span, UnaryOp};
pub use supercel_parse::{parse, ParseError, MAX_NESTING_DEPTH};
pub use supercel_value::{
    decode, decode_str, encode, encode_string, DecodeError, Value, ValueKind, ValueMap,
};

/// Any failure of [`evaluate_with_context`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Syntax(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl ContextError {
    /// snake_case kind used in JSON responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ContextError::Request(_) => "decode_error",
            ContextError::Syntax(_) => "syntax_error",
            ContextError::Eval(err) => err.code(),
        }
    }

    /// Byte offset into the expression text, when known.
    pub fn position(&self) -> Option<u32> {
        match self {
            ContextError::Request(_) => None,
            ContextError::Syntax(err) => Some(err.position()),
            ContextError::Eval(err) => err.span.map(|span| span.start),
        }
    }
}

/// Parse `source` and return the tree as JSON.
pub fn parse_to_ast(source: &str) -> Result<String, ParseError> {
    let ast = parse(source)?;
    match serde_json::to_string(&ast) {
        Ok(json) => Ok(json),
        Err(err) => unreachable!("AST serialization cannot fail: {err}"),
    }
}

/// Evaluate a decoded request.
pub async fn run_request<B>(request: &EvalRequest, bridge: &B) -> Result<Value, ContextError>
where
    B: HostBridge + ?Sized,
{
    let ast = request.expression.to_ast()?;
    let value = evaluate_with_limits(&ast, &request.environment, bridge, request.limits).await?;
    Ok(value)
}

/// JSON request in, JSON response out. Never fails: every problem is
/// reported inside the response.
#[tracing::instrument(level = "debug", skip_all, fields(len = request_json.len()))]
pub async fn evaluate_with_context<B>(request_json: &str, bridge: &B) -> String
where
    B: HostBridge + ?Sized,
{
    let result = match EvalRequest::from_json(request_json) {
        Ok(request) => run_request(&request, bridge).await,
        Err(err) => Err(err.into()),
    };
    if let Err(err) = &result {
        tracing::debug!(kind = err.kind(), error = %err, "request failed");
    }
    Response::from_result(result).to_json()
}

/// [`evaluate_with_context`] on the current thread.
pub fn evaluate_with_context_blocking<B>(request_json: &str, bridge: &B) -> String
where
    B: HostBridge + ?Sized,
{
    futures::executor::block_on(evaluate_with_context(request_json, bridge))
}

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing unless `RUST_LOG` is set. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    });
}
