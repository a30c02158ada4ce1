//! procflow Rules
//!
//! Migration rules that rewrite obsolete operator constructs while a document
//! is imported.
//!
//! # Core Concepts
//!
//! - [`MigrationRule`]: Rewrites one operator, returns a message when it changed something
//! - [`DeclarativeRule`]: Rule described by a [`RuleAction`] and an optional [`Condition`]
//! - [`RuleRegistry`]: Ordered rules per type key, loadable from YAML documents
//! - [`RuleEngine`]: Applies the rules of one type, gated by declared version
//! - [`DeferredJob`]: Structural change a rule schedules for after tree construction
//!
//! # Example
//!
//! ```rust
//! use procflow_rules::RuleRegistry;
//!
//! let mut rules = RuleRegistry::new();
//! let loaded = rules
//!     .load_yaml(
//!         r#"
//! rules:
//!   - operator: read_csv
//!     action: rename_parameter
//!     from: filename
//!     to: csv_file
//! "#,
//!     )
//!     .unwrap();
//! assert_eq!(loaded, 1);
//! assert_eq!(rules.rules_for("read_csv").count(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod condition;
mod declarative;
mod error;
mod registry;
mod rule;

pub use condition::Condition;
pub use declarative::{DeclarativeRule, RuleAction, RuleDefinition, RuleDefinitionDocument, RuleTarget, ANY_OPERATOR};
pub use error::{RuleDefinitionError, RuleError};
pub use registry::{global, RuleEngine, RuleOutcome, RuleRegistry};
pub use rule::{DeferredJob, MigrationRule, RuleContext};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
