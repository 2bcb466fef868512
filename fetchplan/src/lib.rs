#![deny(missing_docs, unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # fetchplan
//!
//! A library for scoped, thread-local fetch-plan declarations against
//! tree-shaped data providers.
//!
//! Callers pre-declare which properties, patterns, and traversal scope should
//! be fetched together with an element, so the provider can batch the work in
//! a single round-trip. A declaration is a [`FetchPlan`]; activating one makes
//! it the calling thread's *current* plan for the duration of a scope, and
//! nested activations compose and revert in LIFO order. Query layers read the
//! in-effect declaration through [`FetchPlan::current`], which never fails.
//!
//! ## Core Types
//!
//! - [`FetchPlan`] and [`PlanActivation`]: plan declarations and scoped
//!   activation
//! - [`PropertyId`] and [`PatternId`]: validated fetch identifiers
//! - [`Condition`] and [`TreeScope`]: tree filtering and traversal options
//! - [`PlanSchema`]: declarative plan descriptions for configuration files
//! - [`Error`] and [`Result`]: error handling types
//!
//! ## Examples
//!
//! ```
//! use fetchplan::{FetchPlan, PropertyId, TreeScope};
//!
//! let plan = FetchPlan::new();
//! plan.add_property(PropertyId::try_from(30005).unwrap()).unwrap();
//! plan.set_tree_scope(TreeScope::Subtree).unwrap();
//!
//! let scope = plan.activate().unwrap();
//! assert_eq!(FetchPlan::current(), plan);
//!
//! scope.end().unwrap();
//! assert!(FetchPlan::current().is_default());
//! ```

pub mod condition;
pub mod error;
pub mod ident;
pub mod options;
pub mod plan;
pub mod resource;
pub mod schema;
mod stack;

#[cfg(all(test, feature = "property-tests"))]
mod proptests;

// Re-export key types at crate root for convenience
pub use condition::{Condition, PropertyValue};
pub use error::{Error, Result};
pub use ident::{InvalidIdError, PatternId, PropertyId};
pub use options::{ElementMode, TreeScope};
pub use plan::FetchPlan;
pub use resource::{install_factory, NullFactory, NullPlan, PlanFactory, RawPlan};
pub use schema::PlanSchema;
pub use stack::PlanActivation;
