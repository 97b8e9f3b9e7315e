//! supercel WASM bindings
//!
//! Exposes the evaluator to JavaScript. The host object passed to
//! `evaluate_with_context` answers `platform.<name>(args)` calls through its
//! `computed_property(name, argsJson)` method and `device.<name>(args)` calls
//! through `device_property(name, argsJson)`, returning wire-value JSON either
//! directly or as a Promise.

use js_sys::Promise;
use supercel::{
    decode_reply, encode_args, ContextError, EvalRequest, Evaluation, HostError, HostNamespace,
    HostRequest, Response, Step, Value,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen(typescript_custom_section)]
const HOST_CONTEXT_TS: &str = r#"
export interface WasmHostContext {
    computed_property(name: string, args: string): string | Promise<string>;
    device_property?(name: string, args: string): string | Promise<string>;
}
"#;

#[wasm_bindgen]
extern "C" {
    /// Host object supplied by the embedding page.
    #[wasm_bindgen(typescript_type = "WasmHostContext")]
    pub type JsHostContext;

    #[wasm_bindgen(method, catch)]
    fn computed_property(this: &JsHostContext, name: &str, args: &str)
        -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn device_property(this: &JsHostContext, name: &str, args: &str) -> Result<JsValue, JsValue>;
}

/// Initialize the WASM module (called once on load).
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// Evaluate a JSON request; resolves to the JSON response text.
///
/// Never rejects: failures are reported as `{"error": {...}}`.
#[wasm_bindgen]
pub async fn evaluate_with_context(definition: String, host: JsHostContext) -> String {
    Response::from_result(run(&definition, &host).await).to_json()
}

/// Parse an expression and return its AST as JSON.
#[wasm_bindgen]
pub fn parse_to_ast(expression: &str) -> Result<String, JsError> {
    supercel::parse_to_ast(expression).map_err(|err| JsError::new(&err.to_string()))
}

/// Library version.
#[wasm_bindgen]
pub fn version() -> String {
    format!("supercel {}", env!("CARGO_PKG_VERSION"))
}

// JsValue is not Send, so the evaluation is driven here rather than through
// a HostBridge.
async fn run(definition: &str, host: &JsHostContext) -> Result<Value, ContextError> {
    let request = EvalRequest::from_json(definition)?;
    let ast = request.expression.to_ast()?;
    let mut evaluation = Evaluation::new(&ast, &request.environment).with_limits(request.limits);
    let mut step = evaluation.run()?;
    loop {
        match step {
            Step::Complete(value) => return Ok(value),
            Step::Host(call) => {
                let outcome = call_host(host, &call).await;
                step = evaluation.resume(outcome)?;
            }
        }
    }
}

async fn call_host(host: &JsHostContext, call: &HostRequest) -> Result<Value, HostError> {
    let args = encode_args(&call.args);
    let reply = match call.namespace {
        HostNamespace::Computed => host.computed_property(&call.name, &args),
        HostNamespace::Device => host.device_property(&call.name, &args),
    }
    .map_err(js_failure)?;
    // Plain strings resolve immediately; thenables are awaited.
    let reply = JsFuture::from(Promise::resolve(&reply))
        .await
        .map_err(js_failure)?;
    let Some(text) = reply.as_string() else {
        return Err(HostError::MalformedResponse(format!(
            "`{}.{}` did not answer with a string",
            call.namespace, call.name
        )));
    };
    decode_reply(&call.name, &text)
}

fn js_failure(err: JsValue) -> HostError {
    let message = match err.dyn_ref::<js_sys::Error>() {
        Some(error) => String::from(error.message()),
        None => err.as_string().unwrap_or_else(|| format!("{err:?}")),
    };
    HostError::Failed(message)
}
