//! Grove-Core
//! ===
//!
//! Shared building blocks for the grove tree learners: the error type, Gini
//! impurity and majority utilities, the model traits, and the randomness
//! helpers used for bootstrap resampling and feature subsampling.
//!
//! Randomness
//! ---
//! Nothing in grove keeps a global or thread-local generator.  Every `fit`
//! takes an explicit `rand::Rng`; forests derive one seeded `XorShiftRng` per
//! tree from it so trees can be trained in any order, or in parallel, with the
//! same result.

#![warn(missing_docs, unused)]

/// Errors shared by every grove crate
pub mod error;

/// Gini impurity and majority class
pub mod impurity;

/// Defines the interfaces for models: evaluation, serialization and
/// instrumentation observers.
pub mod model;

/// Counter-based training observer
pub mod stats;

pub use crate::error::{ModelError, Result};
