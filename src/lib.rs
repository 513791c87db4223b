//! Shaded jar builder.
//!
//! `jarshade` packages a JVM module together with its runtime dependencies
//! into one jar, renaming the bundled packages so they cannot clash with the
//! copies a consumer already has. A build runs five stages:
//!
//! 1. [`resolver`] selects one version of every module in the dependency
//!    closure (nearest declaration wins, ranges are honoured).
//! 2. [`filter`] drops excluded artifacts and entries.
//! 3. [`merger`] combines the remaining payloads, unioning service files.
//! 4. [`relocator`] rewrites class files, service files, and text resources
//!    from source packages to shaded packages.
//! 5. [`archive`] writes a deterministic jar, with a marker jar and a
//!    [`report::BuildReport`] alongside.
//!
//! [`pipeline::Pipeline`] drives the stages for modules declared in a
//! [`config::BuildManifest`].

pub mod archive;
pub mod config;
pub mod digest;
pub mod error;
pub mod filter;
pub mod merger;
pub mod model;
pub mod naming;
pub mod pattern;
pub mod pipeline;
pub mod relocator;
pub mod report;
pub mod repository;
pub mod resolver;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workspace;

pub use config::{BuildManifest, ModuleConfig, ShadeConfig};
pub use error::{Result, ShadeError};
pub use pipeline::{BuildOutput, Pipeline, PipelineOptions};
