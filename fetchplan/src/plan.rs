//! Fetch plan objects.
//!
//! A [`FetchPlan`] declares which properties, patterns, and traversal scope
//! should be fetched together from the provider. Plans are cheap-to-clone
//! handles to shared state; [`FetchPlan::clone`] yields another handle to the
//! same plan, while [`FetchPlan::duplicate`] deep-copies the declaration into
//! an independent plan.
//!
//! A plan is mutable only while it is not activated on any thread's stack and
//! is not the process-wide default instance. Disposal releases the wrapped
//! provider resource exactly once.
//!
//! # Examples
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
//! scope.end().unwrap();
//! assert!(FetchPlan::current().is_default());
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::condition::Condition;
use crate::error::{Error, Result};
use crate::ident::{PatternId, PropertyId};
use crate::options::{ElementMode, TreeScope};
use crate::resource::{self, RawPlan};
use crate::stack::{self, PlanActivation};

/// A declaration of what to fetch together with elements of a tree query.
///
/// Cloning a `FetchPlan` clones the *handle*: both values refer to the same
/// underlying plan, and equality compares that identity. Use
/// [`duplicate`](Self::duplicate) for a deep copy of the declaration.
#[derive(Clone)]
pub struct FetchPlan {
    shared: Arc<PlanShared>,
}

struct PlanShared {
    state: RwLock<PlanState>,
    /// Number of activation stack frames referencing this plan, across all
    /// threads. Transitions happen only while holding the state write lock;
    /// reads are lock-free.
    active: AtomicU32,
    is_default: bool,
}

struct PlanState {
    /// `None` once disposed.
    raw: Option<Box<dyn RawPlan>>,
    properties: BTreeSet<PropertyId>,
    patterns: BTreeSet<PatternId>,
    tree_filter: Condition,
    tree_scope: TreeScope,
    element_mode: ElementMode,
}

impl Drop for PlanState {
    fn drop(&mut self) {
        // Backstop for plans dropped without an explicit dispose.
        if let Some(mut raw) = self.raw.take() {
            raw.release();
        }
    }
}

static DEFAULT: OnceLock<FetchPlan> = OnceLock::new();

impl FetchPlan {
    /// Creates a new, empty fetch plan with default option values.
    ///
    /// The wrapped provider resource comes from the installed factory (see
    /// [`install_factory`](crate::install_factory)).
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchplan::{FetchPlan, TreeScope};
    ///
    /// let plan = FetchPlan::new();
    /// assert_eq!(plan.tree_scope().unwrap(), TreeScope::Element);
    /// assert_eq!(plan.active_count(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::construct(false)
    }

    fn construct(is_default: bool) -> Self {
        Self {
            shared: Arc::new(PlanShared {
                state: RwLock::new(PlanState {
                    raw: Some(resource::create_raw()),
                    properties: BTreeSet::new(),
                    patterns: BTreeSet::new(),
                    tree_filter: Condition::default(),
                    tree_scope: TreeScope::default(),
                    element_mode: ElementMode::default(),
                }),
                active: AtomicU32::new(0),
                is_default,
            }),
        }
    }

    /// Returns a handle to the process-wide default plan.
    ///
    /// The default plan is permanently immutable, cannot be activated or
    /// disposed, and is what [`current`](Self::current) returns when the
    /// calling thread has no active plan.
    #[must_use]
    pub fn default_plan() -> Self {
        DEFAULT.get_or_init(|| Self::construct(true)).clone()
    }

    /// Returns the plan currently in effect on the calling thread.
    ///
    /// This is the top of the calling thread's activation stack, or the
    /// process-wide default plan when the stack is empty. Never fails; O(1).
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchplan::FetchPlan;
    ///
    /// let current = FetchPlan::current();
    /// assert!(current.is_default());
    /// ```
    #[must_use]
    pub fn current() -> Self {
        stack::top().unwrap_or_else(Self::default_plan)
    }

    /// Activates this plan on the calling thread.
    ///
    /// Pushes the plan onto the calling thread's activation stack and
    /// increments its active count. The returned guard ends the scope exactly
    /// once: explicitly via [`PlanActivation::end`], or when dropped. While
    /// any activation is outstanding the plan is immutable.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Disposed`] on a disposed plan and
    /// [`Error::InvalidState`] on the default plan, which never appears on a
    /// stack.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchplan::FetchPlan;
    ///
    /// let plan = FetchPlan::new();
    /// let scope = plan.activate().unwrap();
    /// assert_eq!(FetchPlan::current(), plan);
    /// drop(scope);
    /// assert_ne!(FetchPlan::current(), plan);
    /// ```
    pub fn activate(&self) -> Result<PlanActivation> {
        {
            let state = self.write_state();
            if state.raw.is_none() {
                return Err(Error::Disposed {
                    operation: "activate",
                });
            }
            if self.shared.is_default {
                return Err(Error::InvalidState {
                    details: "the default fetch plan cannot be activated".to_string(),
                });
            }
            self.shared.active.fetch_add(1, Ordering::AcqRel);
        }
        stack::push(self.clone());
        Ok(PlanActivation::new(self.clone()))
    }

    /// Pops this plan off the calling thread's stack and drops one active
    /// reference. Called from the activation guard.
    pub(crate) fn end_activation(&self) -> Result<()> {
        stack::pop_expecting(self)?;
        let _state = self.write_state();
        self.shared.active.fetch_sub(1, Ordering::AcqRel);
        Ok(())
    }

    /// Creates an independent deep copy of this plan's declaration.
    ///
    /// Option values are copied and the provider resource is duplicated; the
    /// copy starts with an active count of 0 regardless of this plan's state,
    /// so it is immediately mutable.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Disposed`] if this plan is disposed.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchplan::{FetchPlan, PropertyId};
    ///
    /// let plan = FetchPlan::new();
    /// plan.add_property(PropertyId::try_from(30005).unwrap()).unwrap();
    ///
    /// let copy = plan.duplicate().unwrap();
    /// assert_eq!(copy.properties().unwrap(), plan.properties().unwrap());
    /// assert_ne!(copy, plan);
    /// ```
    pub fn duplicate(&self) -> Result<Self> {
        let state = self.read_state();
        let raw = match state.raw.as_deref() {
            Some(raw) => raw.duplicate(),
            None => {
                return Err(Error::Disposed {
                    operation: "duplicate",
                })
            }
        };
        Ok(Self {
            shared: Arc::new(PlanShared {
                state: RwLock::new(PlanState {
                    raw: Some(raw),
                    properties: state.properties.clone(),
                    patterns: state.patterns.clone(),
                    tree_filter: state.tree_filter.clone(),
                    tree_scope: state.tree_scope,
                    element_mode: state.element_mode,
                }),
                active: AtomicU32::new(0),
                is_default: false,
            }),
        })
    }

    /// Adds a property to the plan's fetch declaration.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Disposed`] on a disposed plan and
    /// [`Error::InvalidState`] while the plan is active or is the default
    /// instance.
    pub fn add_property(&self, property: PropertyId) -> Result<()> {
        self.mutate("add_property", |state| {
            state.properties.insert(property);
        })
    }

    /// Adds a pattern to the plan's fetch declaration.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`add_property`](Self::add_property).
    pub fn add_pattern(&self, pattern: PatternId) -> Result<()> {
        self.mutate("add_pattern", |state| {
            state.patterns.insert(pattern);
        })
    }

    /// Sets the tree filter condition.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`add_property`](Self::add_property).
    pub fn set_tree_filter(&self, filter: Condition) -> Result<()> {
        self.mutate("set_tree_filter", |state| {
            state.tree_filter = filter;
        })
    }

    /// Sets the traversal scope.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`add_property`](Self::add_property).
    pub fn set_tree_scope(&self, scope: TreeScope) -> Result<()> {
        self.mutate("set_tree_scope", |state| {
            state.tree_scope = scope;
        })
    }

    /// Sets the element materialization mode.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`add_property`](Self::add_property).
    pub fn set_element_mode(&self, mode: ElementMode) -> Result<()> {
        self.mutate("set_element_mode", |state| {
            state.element_mode = mode;
        })
    }

    /// Returns the declared property set.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Disposed`] on a disposed plan.
    pub fn properties(&self) -> Result<BTreeSet<PropertyId>> {
        Ok(self.read_checked("properties")?.properties.clone())
    }

    /// Returns the declared pattern set.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Disposed`] on a disposed plan.
    pub fn patterns(&self) -> Result<BTreeSet<PatternId>> {
        Ok(self.read_checked("patterns")?.patterns.clone())
    }

    /// Returns the tree filter condition.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Disposed`] on a disposed plan.
    pub fn tree_filter(&self) -> Result<Condition> {
        Ok(self.read_checked("tree_filter")?.tree_filter.clone())
    }

    /// Returns the traversal scope.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Disposed`] on a disposed plan.
    pub fn tree_scope(&self) -> Result<TreeScope> {
        Ok(self.read_checked("tree_scope")?.tree_scope)
    }

    /// Returns the element materialization mode.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Disposed`] on a disposed plan.
    pub fn element_mode(&self) -> Result<ElementMode> {
        Ok(self.read_checked("element_mode")?.element_mode)
    }

    /// Runs `f` against the wrapped provider resource.
    ///
    /// This is the seam the query layer uses to hand the native declaration
    /// down to the provider.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Disposed`] on a disposed plan.
    pub fn with_raw<R>(&self, f: impl FnOnce(&dyn RawPlan) -> R) -> Result<R> {
        let state = self.read_state();
        match state.raw.as_deref() {
            Some(raw) => Ok(f(raw)),
            None => Err(Error::Disposed {
                operation: "with_raw",
            }),
        }
    }

    /// Releases the wrapped provider resource and marks the plan unusable.
    ///
    /// Idempotent: disposing an already-disposed plan is a no-op.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidState`] while the plan is active on any
    /// thread's stack, or when called on the default plan.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetchplan::FetchPlan;
    ///
    /// let plan = FetchPlan::new();
    /// plan.dispose().unwrap();
    /// plan.dispose().unwrap(); // no-op
    /// assert!(plan.is_disposed());
    /// assert!(plan.activate().unwrap_err().is_disposed());
    /// ```
    pub fn dispose(&self) -> Result<()> {
        let mut state = self.write_state();
        if state.raw.is_none() {
            return Ok(());
        }
        if self.shared.is_default {
            return Err(Error::InvalidState {
                details: "the default fetch plan cannot be disposed".to_string(),
            });
        }
        if self.shared.active.load(Ordering::Acquire) != 0 {
            return Err(Error::InvalidState {
                details: "cannot dispose an active fetch plan".to_string(),
            });
        }
        if let Some(mut raw) = state.raw.take() {
            raw.release();
        }
        log::debug!("fetch plan disposed");
        Ok(())
    }

    /// Returns the number of activation stack frames currently referencing
    /// this plan, across all threads.
    #[must_use]
    pub fn active_count(&self) -> u32 {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Returns `true` once the plan has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.read_state().raw.is_none()
    }

    /// Returns `true` for the process-wide default plan.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.shared.is_default
    }

    fn mutate(&self, operation: &'static str, apply: impl FnOnce(&mut PlanState)) -> Result<()> {
        let mut state = self.write_state();
        if state.raw.is_none() {
            return Err(Error::Disposed { operation });
        }
        self.check_access()?;
        apply(&mut state);
        Ok(())
    }

    /// Mutation guard: a plan can be changed only while inactive and not the
    /// default instance. Callers hold the write lock, so the check and the
    /// mutation are a single transition.
    fn check_access(&self) -> Result<()> {
        if self.shared.is_default {
            return Err(Error::InvalidState {
                details: "the default fetch plan is immutable".to_string(),
            });
        }
        if self.shared.active.load(Ordering::Acquire) != 0 {
            return Err(Error::InvalidState {
                details: "cannot modify an active fetch plan".to_string(),
            });
        }
        Ok(())
    }

    fn read_checked(&self, operation: &'static str) -> Result<RwLockReadGuard<'_, PlanState>> {
        let state = self.read_state();
        if state.raw.is_none() {
            return Err(Error::Disposed { operation });
        }
        Ok(state)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, PlanState> {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, PlanState> {
        self.shared
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FetchPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for FetchPlan {
    /// Identity comparison: two handles are equal when they refer to the same
    /// underlying plan.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for FetchPlan {}

impl fmt::Debug for FetchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read_state();
        f.debug_struct("FetchPlan")
            .field("disposed", &state.raw.is_none())
            .field("default", &self.shared.is_default)
            .field("active", &self.shared.active.load(Ordering::Acquire))
            .field("properties", &state.properties)
            .field("patterns", &state.patterns)
            .field("tree_filter", &state.tree_filter)
            .field("tree_scope", &state.tree_scope)
            .field("element_mode", &state.element_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::PropertyValue;

    fn prop(value: u32) -> PropertyId {
        PropertyId::try_from(value).unwrap()
    }

    fn pat(value: u32) -> PatternId {
        PatternId::try_from(value).unwrap()
    }

    #[test]
    fn test_new_plan_defaults() {
        let plan = FetchPlan::new();
        assert!(plan.properties().unwrap().is_empty());
        assert!(plan.patterns().unwrap().is_empty());
        assert!(plan.tree_filter().unwrap().is_unfiltered());
        assert_eq!(plan.tree_scope().unwrap(), TreeScope::Element);
        assert_eq!(plan.element_mode().unwrap(), ElementMode::Full);
        assert_eq!(plan.active_count(), 0);
        assert!(!plan.is_disposed());
        assert!(!plan.is_default());
    }

    #[test]
    fn test_mutators() {
        let plan = FetchPlan::new();
        plan.add_property(prop(1)).unwrap();
        plan.add_property(prop(2)).unwrap();
        plan.add_property(prop(1)).unwrap(); // set semantics
        plan.add_pattern(pat(9)).unwrap();
        plan.set_tree_scope(TreeScope::Descendants).unwrap();
        plan.set_element_mode(ElementMode::Reference).unwrap();
        plan.set_tree_filter(Condition::property(prop(3), PropertyValue::Bool(true)))
            .unwrap();

        assert_eq!(plan.properties().unwrap().len(), 2);
        assert_eq!(plan.patterns().unwrap().len(), 1);
        assert_eq!(plan.tree_scope().unwrap(), TreeScope::Descendants);
        assert_eq!(plan.element_mode().unwrap(), ElementMode::Reference);
        assert!(!plan.tree_filter().unwrap().is_unfiltered());
    }

    #[test]
    fn test_handle_clone_is_identity() {
        let plan = FetchPlan::new();
        let handle = plan.clone();
        assert_eq!(plan, handle);
        handle.add_property(prop(7)).unwrap();
        assert_eq!(plan.properties().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_is_independent() {
        let plan = FetchPlan::new();
        plan.add_property(prop(5)).unwrap();
        plan.set_tree_scope(TreeScope::Subtree).unwrap();

        let copy = plan.duplicate().unwrap();
        assert_ne!(copy, plan);
        assert_eq!(copy.properties().unwrap(), plan.properties().unwrap());
        assert_eq!(copy.tree_scope().unwrap(), TreeScope::Subtree);

        copy.add_property(prop(6)).unwrap();
        assert_eq!(plan.properties().unwrap().len(), 1);
        assert_eq!(copy.properties().unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_of_active_plan_starts_inactive() {
        let plan = FetchPlan::new();
        let scope = plan.activate().unwrap();
        assert_eq!(plan.active_count(), 1);

        let copy = plan.duplicate().unwrap();
        assert_eq!(copy.active_count(), 0);
        copy.add_property(prop(1)).unwrap(); // copy is mutable

        scope.end().unwrap();
    }

    #[test]
    fn test_mutation_fails_while_active() {
        let plan = FetchPlan::new();
        let scope = plan.activate().unwrap();

        let err = plan.add_property(prop(1)).unwrap_err();
        assert!(err.is_invalid_state());
        let err = plan.set_tree_scope(TreeScope::Subtree).unwrap_err();
        assert!(err.is_invalid_state());

        scope.end().unwrap();
        plan.add_property(prop(1)).unwrap();
    }

    #[test]
    fn test_default_plan_is_immutable() {
        let default = FetchPlan::default_plan();
        assert!(default.is_default());
        assert!(default.add_property(prop(1)).unwrap_err().is_invalid_state());
        assert!(default.add_pattern(pat(1)).unwrap_err().is_invalid_state());
        assert!(default
            .set_tree_scope(TreeScope::Subtree)
            .unwrap_err()
            .is_invalid_state());
        assert!(default
            .set_element_mode(ElementMode::Reference)
            .unwrap_err()
            .is_invalid_state());
        assert!(default
            .set_tree_filter(Condition::False)
            .unwrap_err()
            .is_invalid_state());
    }

    #[test]
    fn test_default_plan_cannot_be_activated_or_disposed() {
        let default = FetchPlan::default_plan();
        assert!(default.activate().unwrap_err().is_invalid_state());
        assert!(default.dispose().unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_default_plan_is_shared() {
        assert_eq!(FetchPlan::default_plan(), FetchPlan::default_plan());
        // FetchPlan::default() is a fresh plan, not the shared default
        assert_ne!(FetchPlan::default(), FetchPlan::default_plan());
    }

    #[test]
    fn test_dispose_guards_every_operation() {
        let plan = FetchPlan::new();
        plan.dispose().unwrap();

        assert!(plan.is_disposed());
        assert!(plan.add_property(prop(1)).unwrap_err().is_disposed());
        assert!(plan.add_pattern(pat(1)).unwrap_err().is_disposed());
        assert!(plan.set_tree_filter(Condition::True).unwrap_err().is_disposed());
        assert!(plan.set_tree_scope(TreeScope::Subtree).unwrap_err().is_disposed());
        assert!(plan
            .set_element_mode(ElementMode::Reference)
            .unwrap_err()
            .is_disposed());
        assert!(plan.properties().unwrap_err().is_disposed());
        assert!(plan.patterns().unwrap_err().is_disposed());
        assert!(plan.tree_filter().unwrap_err().is_disposed());
        assert!(plan.tree_scope().unwrap_err().is_disposed());
        assert!(plan.element_mode().unwrap_err().is_disposed());
        assert!(plan.activate().unwrap_err().is_disposed());
        assert!(plan.duplicate().unwrap_err().is_disposed());
        assert!(plan.with_raw(|_| ()).unwrap_err().is_disposed());

        // Second dispose is a no-op
        plan.dispose().unwrap();
    }

    #[test]
    fn test_disposed_check_precedes_state_check() {
        // A disposed plan reports Disposed, not InvalidState, even though the
        // mutation would also have been rejected for other reasons.
        let plan = FetchPlan::new();
        plan.dispose().unwrap();
        assert!(plan.add_property(prop(1)).unwrap_err().is_disposed());
    }

    #[test]
    fn test_dispose_while_active_fails() {
        let plan = FetchPlan::new();
        let scope = plan.activate().unwrap();

        let err = plan.dispose().unwrap_err();
        assert!(err.is_invalid_state());
        assert!(!plan.is_disposed());

        scope.end().unwrap();
        plan.dispose().unwrap();
    }

    #[test]
    fn test_active_count_transitions() {
        let plan = FetchPlan::new();
        assert_eq!(plan.active_count(), 0);

        let outer = plan.activate().unwrap();
        assert_eq!(plan.active_count(), 1);
        let inner = plan.activate().unwrap();
        assert_eq!(plan.active_count(), 2);

        inner.end().unwrap();
        assert_eq!(plan.active_count(), 1);
        outer.end().unwrap();
        assert_eq!(plan.active_count(), 0);
    }

    #[test]
    fn test_with_raw_reaches_resource() {
        let plan = FetchPlan::new();
        plan.with_raw(|_raw| ()).unwrap();
    }

    #[test]
    fn test_debug_output() {
        let plan = FetchPlan::new();
        let debug = format!("{plan:?}");
        assert!(debug.contains("FetchPlan"));
        assert!(debug.contains("disposed: false"));
    }
}
