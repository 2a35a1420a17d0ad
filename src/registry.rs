//! Benchmark registry
//!
//! Associates a benchmark's name with its metadata and, separately, with the
//! concrete implementation for each API backend. Built once at program start
//! by [`Registry::builtin`] — an explicit list of registration calls, not
//! load-order-dependent static initializers — and read-only afterward.
//! Duplicate registrations are build-time logic errors and surface as
//! [`RegistryError`] before any benchmark executes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cases;
use crate::runner::BenchmarkCase;

/// Target native compute-driver interface a benchmark runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    /// Low-level GPU driver API (command lists, virtual memory, events)
    Level0,
    /// Higher-level compute runtime API
    OpenCl,
}

impl Backend {
    /// Get string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Level0 => "l0",
            Self::OpenCl => "ocl",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "l0" | "level0" | "levelzero" => Some(Self::Level0),
            "ocl" | "opencl" => Some(Self::OpenCl),
            _ => None,
        }
    }

    /// All supported backends, in dispatch-priority order
    #[must_use]
    pub fn all() -> &'static [Backend] {
        &[Self::Level0, Self::OpenCl]
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of one registered benchmark
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseMetadata {
    /// Unique benchmark name
    pub name: String,
    /// One-line help text for the CLI list surface
    pub help: String,
    /// Owning suite tag (e.g. "api_overhead")
    pub suite: String,
}

/// Registration conflicts, fatal at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two benchmarks registered under the same name
    #[error("Duplicate benchmark name: {0}")]
    DuplicateName(String),

    /// Two implementations registered for the same (name, backend) pair
    #[error("Duplicate implementation for {name} on backend {backend}")]
    DuplicateImplementation {
        /// Benchmark name
        name: String,
        /// Backend of the duplicate
        backend: Backend,
    },

    /// Implementation registered for a name with no metadata
    #[error("Implementation registered for unknown benchmark: {0}")]
    UnknownName(String),
}

/// Registry of benchmark metadata and per-backend implementations
pub struct Registry {
    metadata: Vec<TestCaseMetadata>,
    by_name: HashMap<String, usize>,
    impls: HashMap<(String, Backend), Arc<dyn BenchmarkCase>>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: Vec::new(),
            by_name: HashMap::new(),
            impls: HashMap::new(),
        }
    }

    /// Register a benchmark's metadata
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateName` if the name is already taken.
    pub fn register_metadata(
        &mut self,
        name: &str,
        help: &str,
        suite: &str,
    ) -> Result<(), RegistryError> {
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        self.by_name.insert(name.to_string(), self.metadata.len());
        self.metadata.push(TestCaseMetadata {
            name: name.to_string(),
            help: help.to_string(),
            suite: suite.to_string(),
        });
        Ok(())
    }

    /// Register the implementation of a benchmark for one backend
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::UnknownName` if no metadata exists for `name`,
    /// or `RegistryError::DuplicateImplementation` if the (name, backend)
    /// pair is already registered.
    pub fn register_case(
        &mut self,
        name: &str,
        backend: Backend,
        case: Arc<dyn BenchmarkCase>,
    ) -> Result<(), RegistryError> {
        if !self.by_name.contains_key(name) {
            return Err(RegistryError::UnknownName(name.to_string()));
        }
        let key = (name.to_string(), backend);
        if self.impls.contains_key(&key) {
            return Err(RegistryError::DuplicateImplementation {
                name: name.to_string(),
                backend,
            });
        }
        self.impls.insert(key, case);
        Ok(())
    }

    /// Find the implementation of `name` for `backend`
    ///
    /// Returns `None` for unregistered pairs; never panics.
    #[must_use]
    pub fn lookup(&self, name: &str, backend: Backend) -> Option<&dyn BenchmarkCase> {
        self.impls
            .get(&(name.to_string(), backend))
            .map(AsRef::as_ref)
    }

    /// Metadata for one benchmark by name
    #[must_use]
    pub fn metadata(&self, name: &str) -> Option<&TestCaseMetadata> {
        self.by_name.get(name).map(|&i| &self.metadata[i])
    }

    /// All registered benchmarks, in registration order
    #[must_use]
    pub fn list_all(&self) -> &[TestCaseMetadata] {
        &self.metadata
    }

    /// Backends `name` is implemented for, in dispatch-priority order
    #[must_use]
    pub fn backends_for(&self, name: &str) -> Vec<Backend> {
        Backend::all()
            .iter()
            .copied()
            .filter(|b| self.impls.contains_key(&(name.to_string(), *b)))
            .collect()
    }

    /// Build the registry of built-in benchmarks
    ///
    /// This is the single place every benchmark is registered; invoke it once
    /// at program start.
    ///
    /// # Errors
    ///
    /// Returns the first registration conflict, which indicates a logic error
    /// in the suite definition.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        cases::register_all(&mut registry)?;
        Ok(registry)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{CaseResult, RunContext, RunOutcome};

    struct StubCase;

    impl BenchmarkCase for StubCase {
        fn run(&self, _ctx: &mut RunContext<'_>) -> CaseResult {
            Ok(RunOutcome::Measured)
        }
    }

    #[test]
    fn test_backend_parse_aliases() {
        assert_eq!(Backend::parse("l0"), Some(Backend::Level0));
        assert_eq!(Backend::parse("LevelZero"), Some(Backend::Level0));
        assert_eq!(Backend::parse("OpenCL"), Some(Backend::OpenCl));
        assert_eq!(Backend::parse("vulkan"), None);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = Registry::new();
        registry.register_metadata("Foo", "help", "suite").unwrap();
        let err = registry
            .register_metadata("Foo", "other", "suite")
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("Foo".to_string()));
    }

    #[test]
    fn test_duplicate_implementation_rejected() {
        let mut registry = Registry::new();
        registry.register_metadata("Foo", "help", "suite").unwrap();
        registry
            .register_case("Foo", Backend::Level0, Arc::new(StubCase))
            .unwrap();
        let err = registry
            .register_case("Foo", Backend::Level0, Arc::new(StubCase))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateImplementation {
                name: "Foo".to_string(),
                backend: Backend::Level0,
            }
        );
    }

    #[test]
    fn test_implementation_requires_metadata() {
        let mut registry = Registry::new();
        let err = registry
            .register_case("Ghost", Backend::Level0, Arc::new(StubCase))
            .unwrap_err();
        assert_eq!(err, RegistryError::UnknownName("Ghost".to_string()));
    }

    #[test]
    fn test_looked_up_case_runs_to_success() {
        use crate::args::ArgumentContainer;
        use crate::driver::for_backend;
        use crate::runner::run_case;
        use crate::stats::Statistics;

        let mut registry = Registry::new();
        registry.register_metadata("Foo", "help", "suite").unwrap();
        registry
            .register_case("Foo", Backend::Level0, Arc::new(StubCase))
            .unwrap();
        registry
            .register_case("Foo", Backend::OpenCl, Arc::new(StubCase))
            .unwrap();

        let case = registry.lookup("Foo", Backend::Level0).unwrap();
        let args = ArgumentContainer::new(Backend::Level0, 1, 0);
        let driver = for_backend(Backend::Level0);
        let mut stats = Statistics::new();
        let outcome = run_case(case, &args, driver.as_ref(), &mut stats).unwrap();
        assert_eq!(outcome, RunOutcome::Measured);
    }

    #[test]
    fn test_lookup_unregistered_pair_is_none() {
        let mut registry = Registry::new();
        registry.register_metadata("Foo", "help", "suite").unwrap();
        registry
            .register_case("Foo", Backend::Level0, Arc::new(StubCase))
            .unwrap();

        assert!(registry.lookup("Foo", Backend::Level0).is_some());
        assert!(registry.lookup("Foo", Backend::OpenCl).is_none());
        assert!(registry.lookup("Bar", Backend::Level0).is_none());
    }

    #[test]
    fn test_list_all_preserves_registration_order() {
        let mut registry = Registry::new();
        registry.register_metadata("B", "b", "suite").unwrap();
        registry.register_metadata("A", "a", "suite").unwrap();
        let names: Vec<&str> = registry.list_all().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_builtin_registry_is_consistent() {
        let registry = Registry::builtin().expect("builtin registration must not conflict");
        assert!(!registry.list_all().is_empty());
        // Every registered name has at least one backend implementation.
        for meta in registry.list_all() {
            assert!(
                !registry.backends_for(&meta.name).is_empty(),
                "{} has no implementation",
                meta.name
            );
        }
    }
}
