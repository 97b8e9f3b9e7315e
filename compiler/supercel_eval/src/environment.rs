//! Variable bindings and advisory host property declarations.
//!
//! An [`Environment`] is read-only for the whole evaluation. It holds
//! separate channels:
//!
//! - `variables`: the caller's bindings, resolved by dotted path;
//! - `platform` and `device`: names of host properties with example
//!   argument lists, one set per [`HostNamespace`]. These are metadata for
//!   tooling and are never used to answer a call; calls always go to the
//!   host bridge.

use std::fmt;

use rustc_hash::FxHashMap;
use supercel_value::{Value, ValueMap};

use crate::errors::{type_mismatch, undefined_reference, EvalError};

/// Reserved root identifier for host-computed properties.
pub const PLATFORM_ROOT: &str = "platform";

/// Alternative spelling of [`PLATFORM_ROOT`].
pub const COMPUTED_ROOT: &str = "computed";

/// Reserved root identifier for device properties.
pub const DEVICE_ROOT: &str = "device";

/// Which host interface answers a call.
///
/// `platform.<name>(...)` and `computed.<name>(...)` are computed
/// properties; `device.<name>(...)` are device properties.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HostNamespace {
    Computed,
    Device,
}

impl HostNamespace {
    /// The namespace a reserved root identifier selects.
    pub fn from_root(root: &str) -> Option<Self> {
        match root {
            PLATFORM_ROOT | COMPUTED_ROOT => Some(HostNamespace::Computed),
            DEVICE_ROOT => Some(HostNamespace::Device),
            _ => None,
        }
    }

    /// Canonical root identifier.
    pub fn root(self) -> &'static str {
        match self {
            HostNamespace::Computed => PLATFORM_ROOT,
            HostNamespace::Device => DEVICE_ROOT,
        }
    }
}

impl fmt::Display for HostNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root())
    }
}

/// Advisory declarations: property name -> example argument list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlatformDeclarations {
    entries: FxHashMap<String, Vec<Value>>,
}

impl PlatformDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, example_args: Vec<Value>) {
        self.entries.insert(name.into(), example_args);
    }

    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.entries
            .iter()
            .map(|(name, args)| (name.as_str(), args.as_slice()))
    }

    /// The declarations as a `Map` of name -> `List`, the value a bare
    /// namespace root such as `platform` evaluates to.
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.entries
                .iter()
                .map(|(name, args)| (name.clone(), Value::List(args.clone())))
                .collect(),
        )
    }

    /// Read declarations for `namespace` from a `Map` of name -> `List`.
    pub fn from_value(namespace: HostNamespace, value: &Value) -> Result<Self, EvalError> {
        let Value::Map(map) = value else {
            return Err(type_mismatch(
                format!("map of {namespace} declarations"),
                value.type_name(),
            ));
        };
        let mut declarations = PlatformDeclarations::new();
        for (name, args) in map {
            let Value::List(args) = args else {
                return Err(type_mismatch(
                    format!("argument list for `{namespace}.{name}`"),
                    args.type_name(),
                ));
            };
            declarations.declare(name.clone(), args.clone());
        }
        Ok(declarations)
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<Value>)> for PlatformDeclarations {
    fn from_iter<I: IntoIterator<Item = (S, Vec<Value>)>>(iter: I) -> Self {
        PlatformDeclarations {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Evaluation environment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Environment {
    variables: ValueMap,
    platform: PlatformDeclarations,
    device: PlatformDeclarations,
}

impl Environment {
    pub fn new(variables: ValueMap) -> Self {
        Environment {
            variables,
            platform: PlatformDeclarations::default(),
            device: PlatformDeclarations::default(),
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: PlatformDeclarations) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_device(mut self, device: PlatformDeclarations) -> Self {
        self.device = device;
        self
    }

    /// Build from a single `Map` root with optional `variables`, `platform`
    /// (or `computed`) and `device` branches.
    pub fn from_value(root: &Value) -> Result<Self, EvalError> {
        let Value::Map(root) = root else {
            return Err(type_mismatch("map environment root", root.type_name()));
        };
        let variables = match root.get("variables") {
            None => ValueMap::default(),
            Some(Value::Map(vars)) => vars.clone(),
            Some(other) => return Err(type_mismatch("map of variables", other.type_name())),
        };
        let declarations = |namespace: HostNamespace, keys: &[&str]| {
            match keys.iter().find_map(|key| root.get(*key)) {
                None => Ok(PlatformDeclarations::default()),
                Some(decls) => PlatformDeclarations::from_value(namespace, decls),
            }
        };
        Ok(Environment {
            variables,
            platform: declarations(HostNamespace::Computed, &[PLATFORM_ROOT, COMPUTED_ROOT])?,
            device: declarations(HostNamespace::Device, &[DEVICE_ROOT])?,
        })
    }

    /// The inverse of [`Environment::from_value`].
    pub fn to_value(&self) -> Value {
        Value::map([
            ("variables", Value::Map(self.variables.clone())),
            (PLATFORM_ROOT, self.platform.to_value()),
            (DEVICE_ROOT, self.device.to_value()),
        ])
    }

    pub fn variables(&self) -> &ValueMap {
        &self.variables
    }

    pub fn platform(&self) -> &PlatformDeclarations {
        &self.platform
    }

    pub fn device(&self) -> &PlatformDeclarations {
        &self.device
    }

    /// Declarations for one host namespace.
    pub fn declarations(&self, namespace: HostNamespace) -> &PlatformDeclarations {
        match namespace {
            HostNamespace::Computed => &self.platform,
            HostNamespace::Device => &self.device,
        }
    }

    /// Look up a variable path by successive map keys.
    ///
    /// Fails with `UndefinedReference` naming the path up to the first
    /// segment that is missing or cannot be looked into. The host namespace
    /// roots are not resolved here; the evaluator handles them itself.
    pub fn resolve<'e>(&'e self, path: &[&str]) -> Result<&'e Value, EvalError> {
        let Some((root, rest)) = path.split_first() else {
            return Err(undefined_reference(""));
        };
        let mut current = self
            .variables
            .get(*root)
            .ok_or_else(|| undefined_reference(*root))?;
        for (i, segment) in rest.iter().enumerate() {
            current = current
                .get(segment)
                .ok_or_else(|| undefined_reference(path[..i + 2].join(".")))?;
        }
        Ok(current)
    }
}

impl FromIterator<(String, Value)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Environment::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env() -> Environment {
        Environment::new(
            [(
                "user".to_string(),
                Value::map([
                    ("some_value", Value::Uint(7)),
                    ("name", Value::string("ada")),
                ]),
            )]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn resolves_nested_path() {
        assert_eq!(env().resolve(&["user", "some_value"]).unwrap(), &Value::Uint(7));
    }

    #[test]
    fn missing_segment_names_path() {
        let err = env().resolve(&["user", "missing", "deeper"]).unwrap_err();
        assert_eq!(err.to_string(), "undefined reference: user.missing");

        let err = env().resolve(&["nobody"]).unwrap_err();
        assert_eq!(err.to_string(), "undefined reference: nobody");
    }

    #[test]
    fn cannot_look_into_scalar() {
        let err = env().resolve(&["user", "name", "first"]).unwrap_err();
        assert!(err.is_undefined_reference());
    }

    #[test]
    fn root_value_round_trip() {
        let platform: PlatformDeclarations =
            [("daysSinceEvent", vec![Value::string("test")])].into_iter().collect();
        let device: PlatformDeclarations = [("timeSinceEvent", vec![])].into_iter().collect();
        let env = env().with_platform(platform).with_device(device);
        let back = Environment::from_value(&env.to_value()).unwrap();
        assert_eq!(back, env);
        assert_eq!(
            back.platform().get("daysSinceEvent"),
            Some(&[Value::string("test")][..])
        );
        assert!(back.declarations(HostNamespace::Device).contains("timeSinceEvent"));
    }

    #[test]
    fn computed_branch_fills_platform_declarations() {
        let root = Value::map([(
            "computed",
            Value::map([("daysSinceEvent", Value::List(vec![Value::string("test")]))]),
        )]);
        let env = Environment::from_value(&root).unwrap();
        assert!(env.platform().contains("daysSinceEvent"));
        assert!(env.device().is_empty());
    }

    #[test]
    fn namespace_roots() {
        assert_eq!(HostNamespace::from_root("platform"), Some(HostNamespace::Computed));
        assert_eq!(HostNamespace::from_root("computed"), Some(HostNamespace::Computed));
        assert_eq!(HostNamespace::from_root("device"), Some(HostNamespace::Device));
        assert_eq!(HostNamespace::from_root("user"), None);
        assert_eq!(HostNamespace::Device.to_string(), "device");
    }

    #[test]
    fn from_value_rejects_bad_branches() {
        assert!(Environment::from_value(&Value::Int(1)).is_err());
        let root = Value::map([("platform", Value::map([("f", Value::Int(1))]))]);
        let err = Environment::from_value(&root).unwrap_err();
        assert_eq!(err.code(), "type_mismatch");
    }
}
