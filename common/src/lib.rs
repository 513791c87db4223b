//! Shared domain vocabulary for jarshade: Maven-style coordinates, version
//! ordering and constraints, and package-qualified names.

pub mod coordinate;
pub mod error;
pub mod qualified_name;
pub mod version;

pub use coordinate::{Coordinate, ModuleId, Requirement};
pub use error::{CoordinateError, Result};
pub use qualified_name::QualifiedName;
pub use version::{Version, VersionConstraint, VersionRange};
