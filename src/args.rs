//! Typed, named benchmark parameters
//!
//! Each benchmark declares its parameters into an [`ArgumentContainer`]
//! before the run; the CLI's trailing tokens are then parsed against the
//! declarations. Unknown argument names are rejected — a typo silently
//! ignored would invalidate a measurement run.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::Backend;

/// Declared type of one benchmark parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgKind {
    /// true/false, 1/0, yes/no
    Bool,
    /// Signed integer
    Int,
    /// Integer strictly greater than zero
    PositiveInt,
    /// Unsigned 32-bit integer
    U32,
    /// Free-form string
    String,
    /// One of a fixed set of string variants
    Enum,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::PositiveInt => "positive int",
            Self::U32 => "u32",
            Self::String => "string",
            Self::Enum => "enum",
        };
        f.write_str(s)
    }
}

/// Description of one declared parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgumentDescriptor {
    /// Parameter name, matched against `--name` tokens
    pub name: String,
    /// One-line help text
    pub help: String,
    /// Declared type
    pub kind: ArgKind,
    /// Allowed variants (enum kind only)
    pub variants: Vec<String>,
}

/// Current value of one declared parameter
#[derive(Debug, Clone, PartialEq)]
enum ArgValue {
    Bool(bool),
    Int(i64),
    U32(u32),
    Text(String),
}

/// Argument parsing and validation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    /// Token did not look like `--name`
    #[error("Expected --<name>, got: {0}")]
    MalformedToken(String),

    /// Name was not declared by the benchmark
    #[error("Unknown argument: --{0}")]
    UnknownArgument(String),

    /// `--name` with no following value token
    #[error("Missing value for argument --{0}")]
    MissingValue(String),

    /// Value failed type conversion or validation
    #[error("Invalid value {value:?} for --{name}: expected {expected}")]
    InvalidValue {
        /// Argument name
        name: String,
        /// The offending raw value
        value: String,
        /// What would have been accepted
        expected: String,
    },
}

/// Ordered collection of declared parameters plus the common run fields
///
/// One instance per benchmark invocation; mutated by [`parse`], read-only
/// during the run.
///
/// [`parse`]: ArgumentContainer::parse
#[derive(Debug, Clone)]
pub struct ArgumentContainer {
    /// Selected API backend
    pub backend: Backend,
    /// Number of measured iterations
    pub iterations: usize,
    /// Number of untimed warmup iterations
    pub warmup: usize,
    /// Skip the benchmark body and record only a unit/type marker
    pub noop: bool,
    /// Filesystem root for kernel binary blobs
    pub kernels_dir: PathBuf,
    descriptors: Vec<ArgumentDescriptor>,
    values: HashMap<String, ArgValue>,
}

impl ArgumentContainer {
    /// Create a container with the common run fields and no declarations
    #[must_use]
    pub fn new(backend: Backend, iterations: usize, warmup: usize) -> Self {
        Self {
            backend,
            iterations,
            warmup,
            noop: false,
            kernels_dir: PathBuf::from("kernels"),
            descriptors: Vec::new(),
            values: HashMap::new(),
        }
    }

    /// Enable no-op mode
    #[must_use]
    pub fn with_noop(mut self, noop: bool) -> Self {
        self.noop = noop;
        self
    }

    /// Set the kernel blob directory
    #[must_use]
    pub fn with_kernels_dir(mut self, dir: PathBuf) -> Self {
        self.kernels_dir = dir;
        self
    }

    fn declare(&mut self, name: &str, help: &str, kind: ArgKind, value: ArgValue) {
        debug_assert!(
            !self.values.contains_key(name),
            "argument {name} declared twice"
        );
        self.descriptors.push(ArgumentDescriptor {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            variants: Vec::new(),
        });
        self.values.insert(name.to_string(), value);
    }

    /// Declare a boolean parameter
    pub fn declare_bool(&mut self, name: &str, help: &str, default: bool) {
        self.declare(name, help, ArgKind::Bool, ArgValue::Bool(default));
    }

    /// Declare a signed integer parameter
    pub fn declare_int(&mut self, name: &str, help: &str, default: i64) {
        self.declare(name, help, ArgKind::Int, ArgValue::Int(default));
    }

    /// Declare an integer parameter that must be strictly positive
    pub fn declare_positive_int(&mut self, name: &str, help: &str, default: i64) {
        debug_assert!(default > 0, "default for {name} must be positive");
        self.declare(name, help, ArgKind::PositiveInt, ArgValue::Int(default));
    }

    /// Declare an unsigned 32-bit parameter
    pub fn declare_u32(&mut self, name: &str, help: &str, default: u32) {
        self.declare(name, help, ArgKind::U32, ArgValue::U32(default));
    }

    /// Declare a string parameter
    pub fn declare_string(&mut self, name: &str, help: &str, default: &str) {
        self.declare(
            name,
            help,
            ArgKind::String,
            ArgValue::Text(default.to_string()),
        );
    }

    /// Declare an enum-of-strings parameter
    pub fn declare_enum(&mut self, name: &str, help: &str, variants: &[&str], default: &str) {
        debug_assert!(variants.contains(&default));
        self.descriptors.push(ArgumentDescriptor {
            name: name.to_string(),
            help: help.to_string(),
            kind: ArgKind::Enum,
            variants: variants.iter().map(ToString::to_string).collect(),
        });
        self.values
            .insert(name.to_string(), ArgValue::Text(default.to_string()));
    }

    /// Declared parameters, in declaration order
    #[must_use]
    pub fn descriptors(&self) -> &[ArgumentDescriptor] {
        &self.descriptors
    }

    /// Map `--name value` tokens onto the declared parameters
    ///
    /// Mutates the container in place; no I/O beyond reading `tokens`.
    ///
    /// # Errors
    ///
    /// Returns `ArgError` on unknown names, malformed tokens, missing values,
    /// type mismatches, or validation failures.
    pub fn parse(&mut self, tokens: &[String]) -> Result<(), ArgError> {
        let mut iter = tokens.iter();
        while let Some(token) = iter.next() {
            let name = token
                .strip_prefix("--")
                .ok_or_else(|| ArgError::MalformedToken(token.clone()))?;
            let descriptor = self
                .descriptors
                .iter()
                .find(|d| d.name == name)
                .cloned()
                .ok_or_else(|| ArgError::UnknownArgument(name.to_string()))?;
            let raw = iter
                .next()
                .ok_or_else(|| ArgError::MissingValue(name.to_string()))?;
            let value = convert(&descriptor, raw)?;
            self.values.insert(descriptor.name, value);
        }
        Ok(())
    }

    /// Read a boolean parameter
    #[must_use]
    pub fn bool_value(&self, name: &str) -> bool {
        match self.values.get(name) {
            Some(ArgValue::Bool(v)) => *v,
            _ => panic!("argument {name} is not a declared bool"),
        }
    }

    /// Read an integer (or positive-integer) parameter
    #[must_use]
    pub fn int_value(&self, name: &str) -> i64 {
        match self.values.get(name) {
            Some(ArgValue::Int(v)) => *v,
            _ => panic!("argument {name} is not a declared int"),
        }
    }

    /// Read a u32 parameter
    #[must_use]
    pub fn u32_value(&self, name: &str) -> u32 {
        match self.values.get(name) {
            Some(ArgValue::U32(v)) => *v,
            _ => panic!("argument {name} is not a declared u32"),
        }
    }

    /// Read a string or enum parameter
    #[must_use]
    pub fn string_value(&self, name: &str) -> &str {
        match self.values.get(name) {
            Some(ArgValue::Text(v)) => v,
            _ => panic!("argument {name} is not a declared string"),
        }
    }
}

fn convert(descriptor: &ArgumentDescriptor, raw: &str) -> Result<ArgValue, ArgError> {
    let invalid = |expected: &str| ArgError::InvalidValue {
        name: descriptor.name.clone(),
        value: raw.to_string(),
        expected: expected.to_string(),
    };

    match descriptor.kind {
        ArgKind::Bool => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(ArgValue::Bool(true)),
            "false" | "0" | "no" => Ok(ArgValue::Bool(false)),
            _ => Err(invalid("bool (true/false/1/0/yes/no)")),
        },
        ArgKind::Int => raw
            .parse::<i64>()
            .map(ArgValue::Int)
            .map_err(|_| invalid("integer")),
        ArgKind::PositiveInt => {
            let v: i64 = raw.parse().map_err(|_| invalid("positive integer"))?;
            if v <= 0 {
                return Err(invalid("positive integer"));
            }
            Ok(ArgValue::Int(v))
        },
        ArgKind::U32 => raw
            .parse::<u32>()
            .map(ArgValue::U32)
            .map_err(|_| invalid("unsigned 32-bit integer")),
        ArgKind::String => Ok(ArgValue::Text(raw.to_string())),
        ArgKind::Enum => {
            if descriptor.variants.iter().any(|v| v == raw) {
                Ok(ArgValue::Text(raw.to_string()))
            } else {
                Err(invalid(&format!("one of {:?}", descriptor.variants)))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> ArgumentContainer {
        let mut args = ArgumentContainer::new(Backend::Level0, 10, 1);
        args.declare_bool("useEvents", "Signal an event per submit", false);
        args.declare_positive_int("size", "Allocation size in bytes", 4096);
        args.declare_u32("workgroupCount", "Workgroups per launch", 1);
        args.declare_string("kernel", "Kernel entry point", "empty_kernel");
        args.declare_enum(
            "placement",
            "Memory placement",
            &["device", "host", "shared"],
            "device",
        );
        args
    }

    fn toks(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_defaults_before_parse() {
        let args = container();
        assert!(!args.bool_value("useEvents"));
        assert_eq!(args.int_value("size"), 4096);
        assert_eq!(args.u32_value("workgroupCount"), 1);
        assert_eq!(args.string_value("kernel"), "empty_kernel");
        assert_eq!(args.string_value("placement"), "device");
    }

    #[test]
    fn test_parse_overrides_in_place() {
        let mut args = container();
        args.parse(&toks(&[
            "--useEvents",
            "yes",
            "--size",
            "256",
            "--placement",
            "shared",
        ]))
        .unwrap();
        assert!(args.bool_value("useEvents"));
        assert_eq!(args.int_value("size"), 256);
        assert_eq!(args.string_value("placement"), "shared");
        // Untouched arguments keep their defaults.
        assert_eq!(args.u32_value("workgroupCount"), 1);
    }

    #[test]
    fn test_positive_int_rejects_zero_and_negative() {
        for bad in ["0", "-5"] {
            let mut args = container();
            let err = args.parse(&toks(&["--size", bad])).unwrap_err();
            assert_eq!(
                err,
                ArgError::InvalidValue {
                    name: "size".to_string(),
                    value: bad.to_string(),
                    expected: "positive integer".to_string(),
                }
            );
        }
    }

    #[test]
    fn test_positive_int_roundtrip() {
        let mut args = container();
        args.parse(&toks(&["--size", "256"])).unwrap();
        assert_eq!(args.int_value("size"), 256);
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let mut args = container();
        let err = args.parse(&toks(&["--nope", "1"])).unwrap_err();
        assert_eq!(err, ArgError::UnknownArgument("nope".to_string()));
    }

    #[test]
    fn test_malformed_and_missing_tokens() {
        let mut args = container();
        assert_eq!(
            args.parse(&toks(&["size", "1"])).unwrap_err(),
            ArgError::MalformedToken("size".to_string())
        );
        assert_eq!(
            args.parse(&toks(&["--size"])).unwrap_err(),
            ArgError::MissingValue("size".to_string())
        );
    }

    #[test]
    fn test_enum_rejects_unknown_variant() {
        let mut args = container();
        let err = args.parse(&toks(&["--placement", "remote"])).unwrap_err();
        assert!(matches!(err, ArgError::InvalidValue { .. }));
    }

    #[test]
    fn test_u32_rejects_negative_and_overflow() {
        let mut args = container();
        assert!(args.parse(&toks(&["--workgroupCount", "-1"])).is_err());
        assert!(args
            .parse(&toks(&["--workgroupCount", "4294967296"]))
            .is_err());
        args.parse(&toks(&["--workgroupCount", "4294967295"]))
            .unwrap();
        assert_eq!(args.u32_value("workgroupCount"), u32::MAX);
    }

    #[test]
    fn test_descriptor_order_matches_declaration() {
        let args = container();
        let names: Vec<&str> = args.descriptors().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["useEvents", "size", "workgroupCount", "kernel", "placement"]
        );
    }
}
