//! Ripple JVM - Incremental Dependency Differentiation for JVM Targets
//!
//! Given the set of compiled units that changed between a "before" and an
//! "after" compilation snapshot, this crate computes the minimal additional
//! set of source files that must be recompiled so that no stale binary
//! artifact survives. It supplies the JVM node model, the derived
//! back-dependency indices, and a composable rule chain (general JVM rules
//! plus Kotlin-specific rules) over the persistent graph in `ripple_graph`.
//!
//! # One round
//!
//! ```
//! use ripple_graph::{Delta, NodeSource};
//! use ripple_jvm::differentiate::{differentiate, DifferentiateContext};
//! use ripple_jvm::index::new_graph;
//! use ripple_jvm::model::JvmClass;
//! use ripple_jvm::strategy::default_strategies;
//!
//! let mut graph = new_graph();
//! // ... integrate earlier rounds ...
//!
//! let before: Vec<JvmClass> = vec![];
//! let after = vec![JvmClass::new("com/example/Foo")];
//! let mut delta = Delta::new([NodeSource::new("Foo.kt")], []);
//! delta.associate(NodeSource::new("Foo.kt"), after.clone());
//!
//! let mut cx = DifferentiateContext::new(&graph, &delta);
//! differentiate(&mut cx, &before, &after, &[], &default_strategies())?;
//! let affected = cx.into_affected();
//! // nothing depends on the new class yet
//! assert!(affected.sources.is_empty());
//! // feed `affected.sources` back to the build coordinator, then commit:
//! graph.integrate(&delta);
//! # Ok::<(), ripple_jvm::error::DifferentiateError>(())
//! ```
//!
//! # Soundness posture
//!
//! An over-affecting bug shows up as a slower incremental build; an
//! under-affecting bug shows up as silent miscompilation. Every ambiguous
//! case here resolves toward over-affecting.

pub mod differentiate;
pub mod error;
pub mod index;
pub mod model;
pub mod strategy;

pub use differentiate::{differentiate, Affected, DifferentiateContext, DifferentiateParams};
pub use error::DifferentiateError;
pub use index::{
    jvm_indices, new_graph, KotlinSubclassesIndex, LookupsIndex, SubclassesIndex, TypealiasesIndex,
};
pub use model::{JvmClass, JvmField, JvmFlags, JvmMethod, JvmUsage, KotlinMeta};
pub use strategy::{
    default_strategies, DifferentiateStrategy, JvmDifferentiateStrategy,
    KotlinDifferentiateStrategy,
};
