//! Declarative plan schemas.
//!
//! A [`PlanSchema`] is a serializable description of a fetch plan, suitable
//! for checking into configuration files. Schemas parse from YAML or JSON and
//! are applied to plans through the same guarded mutators as programmatic
//! construction, so the validation and state rules hold either way.
//!
//! # Examples
//!
//! ```
//! use fetchplan::{PlanSchema, TreeScope};
//!
//! let schema = PlanSchema::from_yaml(
//!     "properties: [30005, 30010]\ntree_scope: subtree\n",
//! )
//! .unwrap();
//!
//! let plan = schema.to_plan().unwrap();
//! assert_eq!(plan.properties().unwrap().len(), 2);
//! assert_eq!(plan.tree_scope().unwrap(), TreeScope::Subtree);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::Result;
use crate::ident::{PatternId, PropertyId};
use crate::options::{ElementMode, TreeScope};
use crate::plan::FetchPlan;

/// A declarative description of a fetch plan.
///
/// All fields are optional; omitted fields leave the plan's defaults in
/// place. Identifier values are validated when the schema is applied, not
/// when it is parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanSchema {
    /// Property identifiers to fetch.
    #[serde(default)]
    pub properties: Vec<u32>,

    /// Pattern identifiers to fetch.
    #[serde(default)]
    pub patterns: Vec<u32>,

    /// Tree filter condition.
    pub tree_filter: Option<Condition>,

    /// Traversal scope.
    pub tree_scope: Option<TreeScope>,

    /// Element materialization mode.
    pub element_mode: Option<ElementMode>,
}

impl PlanSchema {
    /// Parses a schema from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid YAML for a schema.
    pub fn from_yaml(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Parses a schema from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid JSON for a schema.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Loads a schema from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fetchplan::PlanSchema;
    ///
    /// let schema = PlanSchema::load("plans/window-title.yaml").unwrap();
    /// let plan = schema.to_plan().unwrap();
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Applies this schema to an existing plan.
    ///
    /// Identifiers flow through [`PropertyId`]/[`PatternId`] validation, and
    /// mutation goes through the plan's guarded setters, so applying to an
    /// active, default, or disposed plan fails the same way direct mutation
    /// would. A partial application is possible when a later field fails.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid identifiers or when the plan rejects
    /// mutation.
    pub fn apply(&self, plan: &FetchPlan) -> Result<()> {
        for &raw in &self.properties {
            plan.add_property(PropertyId::try_from(raw)?)?;
        }
        for &raw in &self.patterns {
            plan.add_pattern(PatternId::try_from(raw)?)?;
        }
        if let Some(filter) = &self.tree_filter {
            plan.set_tree_filter(filter.clone())?;
        }
        if let Some(scope) = self.tree_scope {
            plan.set_tree_scope(scope)?;
        }
        if let Some(mode) = self.element_mode {
            plan.set_element_mode(mode)?;
        }
        Ok(())
    }

    /// Builds a new plan from this schema.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`apply`](Self::apply).
    pub fn to_plan(&self) -> Result<FetchPlan> {
        let plan = FetchPlan::new();
        self.apply(&plan)?;
        Ok(plan)
    }
}
