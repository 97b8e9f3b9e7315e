//! Host bridge: how host property calls reach the embedding host.
//!
//! Two levels of interface:
//!
//! - [`HostBridge`] works with typed [`Value`]s and is what the async
//!   driver calls.
//! - [`HostContext`] is the wire-level contract an embedder implements when
//!   its values already live as JSON text (`computed_property(name, args)`
//!   and `device_property(name, args)`). [`WireBridge`] adapts one into the
//!   other.
//!
//! Computed properties (`platform.<name>` / `computed.<name>`) are required;
//! device properties (`device.<name>`) are optional and fail unless the host
//! overrides them.

use async_trait::async_trait;
use serde_json::Value as Json;
use supercel_value::{decode_str, encode, Value};

/// Why a host call failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("{0}")]
    Failed(String),
    #[error("malformed host response: {0}")]
    MalformedResponse(String),
    #[error("host call timed out")]
    TimedOut,
}

impl HostError {
    pub fn failed(message: impl Into<String>) -> Self {
        HostError::Failed(message.into())
    }
}

/// Typed host interface.
///
/// Called at most once at a time per evaluation. Implementations may keep
/// state across calls (caching, counting) behind interior mutability.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Answer `platform.<name>(args)`.
    async fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, HostError>;

    /// Answer `device.<name>(args)`.
    async fn invoke_device(&self, name: &str, _args: &[Value]) -> Result<Value, HostError> {
        Err(no_device_property(name))
    }
}

/// Wire-level host interface: arguments arrive as a JSON array of wire
/// values, the answer is a single wire value as JSON text.
#[async_trait]
pub trait HostContext: Send + Sync {
    async fn computed_property(&self, name: &str, args_json: &str) -> Result<String, HostError>;

    async fn device_property(&self, name: &str, _args_json: &str) -> Result<String, HostError> {
        Err(no_device_property(name))
    }
}

#[cold]
fn no_device_property(name: &str) -> HostError {
    HostError::Failed(format!("host provides no device property `device.{name}`"))
}

/// Encode arguments as a JSON array of wire values.
pub fn encode_args(args: &[Value]) -> String {
    Json::Array(args.iter().map(encode).collect()).to_string()
}

/// Decode a wire-level reply for property `name`.
pub fn decode_reply(name: &str, reply: &str) -> Result<Value, HostError> {
    decode_str(reply).map_err(|err| {
        tracing::warn!(property = name, error = %err, "malformed host payload");
        HostError::MalformedResponse(err.to_string())
    })
}

/// [`HostBridge`] over a wire-level [`HostContext`].
#[derive(Clone, Debug, Default)]
pub struct WireBridge<H> {
    host: H,
}

impl<H: HostContext> WireBridge<H> {
    pub fn new(host: H) -> Self {
        WireBridge { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

#[async_trait]
impl<H: HostContext> HostBridge for WireBridge<H> {
    async fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, HostError> {
        let args_json = encode_args(args);
        let reply = self.host.computed_property(name, &args_json).await?;
        decode_reply(name, &reply)
    }

    async fn invoke_device(&self, name: &str, args: &[Value]) -> Result<Value, HostError> {
        let args_json = encode_args(args);
        let reply = self.host.device_property(name, &args_json).await?;
        decode_reply(name, &reply)
    }
}

/// [`HostBridge`] over a synchronous closure.
pub struct FnBridge<F> {
    f: F,
}

impl<F> FnBridge<F>
where
    F: Fn(&str, &[Value]) -> Result<Value, HostError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        FnBridge { f }
    }
}

#[async_trait]
impl<F> HostBridge for FnBridge<F>
where
    F: Fn(&str, &[Value]) -> Result<Value, HostError> + Send + Sync,
{
    async fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, HostError> {
        (self.f)(name, args)
    }
}

/// Bridge for evaluations with no host: every call fails.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoHost;

#[async_trait]
impl HostBridge for NoHost {
    async fn invoke(&self, name: &str, _args: &[Value]) -> Result<Value, HostError> {
        Err(HostError::Failed(format!(
            "no host bridge available for `platform.{name}`"
        )))
    }

    async fn invoke_device(&self, name: &str, _args: &[Value]) -> Result<Value, HostError> {
        Err(HostError::Failed(format!(
            "no host bridge available for `device.{name}`"
        )))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    struct Echo;

    #[async_trait]
    impl HostContext for Echo {
        async fn computed_property(
            &self,
            name: &str,
            args_json: &str,
        ) -> Result<String, HostError> {
            match name {
                "args" => Ok(format!(r#"{{"type":"string","value":{}}}"#, Json::from(args_json))),
                "garbage" => Ok("not json".to_string()),
                _ => Err(HostError::failed("unknown")),
            }
        }
    }

    #[test]
    fn wire_bridge_encodes_arguments() {
        let bridge = WireBridge::new(Echo);
        let reply = block_on(bridge.invoke("args", &[Value::string("test"), Value::Uint(1)]))
            .unwrap();
        assert_eq!(
            reply,
            Value::string(r#"[{"type":"string","value":"test"},{"type":"uint","value":1}]"#)
        );
    }

    #[test]
    fn wire_bridge_rejects_malformed_reply() {
        let bridge = WireBridge::new(Echo);
        let err = block_on(bridge.invoke("garbage", &[])).unwrap_err();
        assert!(matches!(err, HostError::MalformedResponse(_)));
    }

    #[test]
    fn wire_bridge_passes_host_failure_through() {
        let bridge = WireBridge::new(Echo);
        assert_eq!(
            block_on(bridge.invoke("other", &[])),
            Err(HostError::failed("unknown"))
        );
    }

    struct Sensors;

    #[async_trait]
    impl HostContext for Sensors {
        async fn computed_property(&self, _: &str, _: &str) -> Result<String, HostError> {
            Ok(r#"{"type":"null","value":null}"#.to_string())
        }

        async fn device_property(
            &self,
            name: &str,
            args_json: &str,
        ) -> Result<String, HostError> {
            assert_eq!(args_json, r#"[{"type":"string","value":"e"}]"#);
            Ok(format!(r#"{{"type":"string","value":"{name}"}}"#))
        }
    }

    #[test]
    fn wire_bridge_routes_device_properties() {
        let bridge = WireBridge::new(Sensors);
        assert_eq!(
            block_on(bridge.invoke_device("timeSinceEvent", &[Value::string("e")])).unwrap(),
            Value::string("timeSinceEvent")
        );
        assert_eq!(block_on(bridge.invoke("any", &[])).unwrap(), Value::Null);
    }

    #[test]
    fn device_properties_fail_unless_provided() {
        let err = block_on(WireBridge::new(Echo).invoke_device("battery", &[])).unwrap_err();
        assert_eq!(
            err,
            HostError::failed("host provides no device property `device.battery`")
        );
        assert!(block_on(NoHost.invoke_device("battery", &[])).is_err());
    }

    #[test]
    fn fn_bridge_calls_closure() {
        let bridge = FnBridge::new(|name: &str, args: &[Value]| {
            Ok(Value::string(format!("{name}/{}", args.len())))
        });
        assert_eq!(
            block_on(bridge.invoke("f", &[Value::Null])).unwrap(),
            Value::string("f/1")
        );
    }
}
