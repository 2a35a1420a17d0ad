//! # Medir
//!
//! Micro-benchmark harness for measuring host-side and device-side overhead
//! of individual GPU compute-API calls (command list append, event
//! synchronization, memory management, kernel argument setting, module
//! creation).
//!
//! Medir (Spanish: "to measure") talks to the native driver exclusively
//! through the [`driver::ComputeDriver`] trait, so the harness — registries,
//! argument parsing, statistics, the run loop — is testable without GPU
//! hardware, and the shipped [`driver::MockDriver`] doubles as the target of
//! the no-op/harness-overhead mode.
//!
//! ## Example
//!
//! ```rust
//! use medir::args::ArgumentContainer;
//! use medir::driver::for_backend;
//! use medir::registry::{Backend, Registry};
//! use medir::runner::{run_case, RunOutcome};
//! use medir::stats::Statistics;
//!
//! let registry = Registry::builtin().unwrap();
//! let case = registry.lookup("MemoryAllocate", Backend::Level0).unwrap();
//!
//! let mut args = ArgumentContainer::new(Backend::Level0, 16, 2);
//! case.declare_arguments(&mut args);
//!
//! let driver = for_backend(Backend::Level0);
//! let mut stats = Statistics::new();
//! let outcome = run_case(case, &args, driver.as_ref(), &mut stats).unwrap();
//! assert_eq!(outcome, RunOutcome::Measured);
//! assert_eq!(stats.len(), 16);
//! ```
//!
//! ## Architecture
//!
//! - [`registry`]: benchmark names and per-backend implementations, built
//!   once at startup by an explicit list of registration calls
//! - [`args`]: typed, named benchmark parameters parsed from CLI tokens
//! - [`stats`]: append-only sample sequence with units and measurement type
//! - [`runner`]: the shared run-loop contract (no-op exit, warmup, timing)
//! - [`driver`]: the black-box native driver seam plus scoped handle guards
//! - [`cases`]: the built-in suite, one module per driver subsystem
//! - [`report`]: per-run records emitted as text, JSON or CSV

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
// Clippy allows (MUST come after deny/warn to override them)
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)] // usize -> f64 for statistics is safe
#![allow(clippy::must_use_candidate)] // Not all methods need #[must_use]
#![allow(clippy::missing_panics_doc)] // Panics only in test helpers
#![allow(clippy::uninlined_format_args)] // Prefer explicit format args

/// Typed, named benchmark parameters and CLI token parsing
pub mod args;
/// Kernel binary blobs loaded by name from a filesystem location
pub mod blob;
/// The benchmark suite: one module per driver subsystem under test
pub mod cases;
/// CLI command handlers (extracted from main.rs for testability)
pub mod cli;
/// Black-box native driver seam, scoped handle guards, mock driver
pub mod driver;
pub mod error;
/// Benchmark registry: metadata plus per-(name, backend) implementations
pub mod registry;
/// Per-case result records and JSON/CSV emission
pub mod report;
/// Run-loop contract shared by every benchmark
pub mod runner;
/// Sample accumulation and on-demand aggregation
pub mod stats;

// Re-exports for convenience
pub use error::{MedirError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
