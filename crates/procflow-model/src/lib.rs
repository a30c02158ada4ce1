//! procflow Model
//!
//! In-memory representation of a hierarchical process graph.
//!
//! # Core Concepts
//!
//! - [`Operator`]: A typed node with parameters, ports and nested units
//! - [`ExecutionUnit`]: Ordered container of sibling operators with boundary ports
//! - [`Ports`]: Same-direction port group, optionally growing through an extender
//! - [`Connection`]: Output → input edge stored as index pairs inside a unit
//! - [`VersionNumber`]: Three-part ordered version
//! - [`CompatibilityHistory`]: Incompatible-change history used to pin operator behavior
//!
//! # Example
//!
//! ```rust
//! use procflow_model::{CompatibilityHistory, VersionNumber};
//!
//! let history = CompatibilityHistory::new(
//!     VersionNumber::new(9, 0, 0),
//!     vec![VersionNumber::new(6, 0, 0)],
//! );
//! let resolution = history.resolve(&VersionNumber::new(5, 0, 0));
//! assert_eq!(resolution.working, VersionNumber::new(6, 0, 0));
//! assert!(resolution.is_pinned());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod compat;
mod error;
mod operator;
mod parameter;
mod port;
mod unit;
mod version;

pub use compat::{effective_declared, CompatibilityHistory, DeclaredSource, DeclaredVersion, Resolution};
pub use error::{GraphError, GraphResult};
pub use operator::{Breakpoint, IdAllocator, Operator, OperatorId};
pub use parameter::{ParameterKind, ParameterValue, Parameters};
pub use port::{accepts, ExtenderSpec, Port, PortDirection, PortLookup, PortSpec, Ports, ANY_TYPE};
pub use unit::{Connection, Endpoint, ExecutionUnit, NamedConnection, NodeRef};
pub use version::{VersionError, VersionNumber, DEFAULT_VERSION, PROCESS_LAYOUT_VERSION};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
