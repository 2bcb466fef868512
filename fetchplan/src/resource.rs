//! Provider resource seam.
//!
//! A fetch plan wraps an opaque resource owned by the data provider that will
//! eventually serve the fetch. The provider integration supplies both sides of
//! the seam: a [`PlanFactory`] that produces new, empty resources, and
//! [`RawPlan`] implementations that know how to deep-copy and release
//! themselves. The crate guarantees `release` is invoked exactly once per
//! resource, from [`FetchPlan::dispose`](crate::FetchPlan::dispose) or, as a
//! backstop, when the last handle to an undisposed plan is dropped.
//!
//! Without an installed factory the crate falls back to [`NullFactory`], so it
//! is fully usable standalone and under test.

use std::sync::OnceLock;

use crate::error::{Error, Result};

/// An opaque provider-side resource wrapped by a fetch plan.
///
/// Implementations must be thread-safe: plans are shared across threads and a
/// resource may be inspected concurrently through
/// [`FetchPlan::with_raw`](crate::FetchPlan::with_raw).
pub trait RawPlan: Send + Sync {
    /// Produces a deep copy of this resource for a cloned plan.
    fn duplicate(&self) -> Box<dyn RawPlan>;

    /// Releases the resource.
    ///
    /// Called exactly once per resource; implementations do not need to guard
    /// against repeated invocation.
    fn release(&mut self);
}

/// Produces new, empty provider resources.
pub trait PlanFactory: Send + Sync {
    /// Creates a new, empty resource for a fresh fetch plan.
    fn create(&self) -> Box<dyn RawPlan>;
}

/// A resource with no provider backing. Used when no factory is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlan;

impl RawPlan for NullPlan {
    fn duplicate(&self) -> Box<dyn RawPlan> {
        Box::new(Self)
    }

    fn release(&mut self) {}
}

/// The fallback factory producing [`NullPlan`] resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFactory;

impl PlanFactory for NullFactory {
    fn create(&self) -> Box<dyn RawPlan> {
        Box::new(NullPlan)
    }
}

static FACTORY: OnceLock<Box<dyn PlanFactory>> = OnceLock::new();

/// Installs the process-wide provider factory.
///
/// Must be called before any plan is created: the first plan construction
/// (including the lazily created default plan) locks in whichever factory is
/// current at that point.
///
/// # Errors
///
/// Fails with [`Error::InvalidState`] if a factory is already installed or the
/// fallback has already been locked in by an earlier plan construction.
///
/// # Examples
///
/// ```no_run
/// use fetchplan::{install_factory, NullFactory};
///
/// install_factory(Box::new(NullFactory)).unwrap();
/// ```
pub fn install_factory(factory: Box<dyn PlanFactory>) -> Result<()> {
    FACTORY.set(factory).map_err(|_| Error::InvalidState {
        details: "a provider factory is already active for this process".to_string(),
    })?;
    log::debug!("provider factory installed");
    Ok(())
}

pub(crate) fn create_raw() -> Box<dyn RawPlan> {
    FACTORY.get_or_init(|| Box::new(NullFactory)).create()
}
