//! procflow Registry
//!
//! Operator type registry used by the importer to instantiate operators.
//!
//! # Core Concepts
//!
//! - [`OperatorDescriptor`]: Parameters, ports, subprocesses and version history of a type
//! - [`OperatorFactory`]: Creates instances; descriptor-driven by default
//! - [`OperatorRegistry`]: Key → type mapping plus the deprecated-key replacement table
//! - [`Shared`]: Copy-on-write cell behind the process-wide registry
//!
//! # Example
//!
//! ```rust
//! use procflow_registry::{OperatorDescriptor, OperatorRegistry, ParameterType};
//! use procflow_model::{OperatorId, PortSpec, VersionNumber};
//!
//! let mut registry = OperatorRegistry::with_root(VersionNumber::new(9, 0, 0));
//! registry
//!     .register(
//!         OperatorDescriptor::new("a", VersionNumber::new(9, 0, 0))
//!             .with_parameter(ParameterType::single("size"))
//!             .with_output(PortSpec::any("out")),
//!     )
//!     .unwrap();
//!
//! let op = registry.require("a").unwrap().instantiate(OperatorId::new(1), "A");
//! assert_eq!(op.outputs.position("out"), Some(0));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod descriptor;
mod error;
mod factory;
mod registry;
mod shared;

pub use descriptor::{OperatorDescriptor, ParameterType, SubprocessSpec};
pub use error::{RegistryError, RegistryResult};
pub use factory::{placeholder, DescriptorFactory, OperatorFactory, PLACEHOLDER_KEY};
pub use registry::{root_descriptor, Catalog, OperatorRegistry, OperatorType, ResolvedKey, ROOT_KEY, ROOT_UNIT};
pub use shared::{global, Shared, SOFTWARE_VERSION};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
