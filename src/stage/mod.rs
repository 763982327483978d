//! The callable capability and the shapes a stage invocation can produce.
//!
//! Every element of a composition is a [`Callable`]: an object that takes one
//! dynamically typed [`Value`] and produces either a ready result or a
//! deferred one. The capability is verified once, at construction, by the
//! composer families — never re-checked per call.
//!
//! # Deferred results
//!
//! A [`Deferred`] is a boxed future resolving to a stage result. It models a
//! single-threaded cooperative suspension point, not OS-level concurrency:
//! nothing here spawns tasks or takes locks. Dropping a deferred result
//! cancels whatever pipeline work it still carries.
//!
//! # Suspension contract
//!
//! [`Callable::suspends`] declares whether calls may suspend. The declared
//! capability is combined once at composition time; the actual [`Outcome`]
//! shape returned by each call remains the authoritative, per-call check,
//! because a stage may suspend only conditionally.
//!
//! # Examples
//!
//! Adapting a plain function and invoking it through the capability:
//!
//! ```
//! use catena::stage::{func, Outcome, Suspend};
//! use catena::value::Value;
//!
//! let stage = func("double", |x: i64| x * 2);
//! assert_eq!(stage.suspends(), Suspend::Never);
//!
//! let outcome = stage.call(Value::new(21_i64)).unwrap();
//! let Outcome::Ready(value) = outcome else {
//!     panic!("a pure function never suspends");
//! };
//! assert_eq!(value.downcast::<i64>().ok(), Some(42));
//! ```

mod adapters;

pub use adapters::{async_func, func, method, try_async_func, try_func};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::value::{Owner, Value};

/// Any error produced by a composed stage.
///
/// Stage failures propagate unmodified to the caller of the whole composed
/// call; the composer never catches, wraps, or retries them.
pub type StageError = Box<dyn std::error::Error + Send + Sync>;

/// A deferred stage result: a computation that may not yet be complete.
pub type Deferred = Pin<Box<dyn Future<Output = Result<Value, StageError>> + Send>>;

/// What a single stage invocation produced.
pub enum Outcome {
    /// The stage completed without suspending.
    Ready(Value),
    /// The stage suspended; the wrapped future yields the eventual result.
    Deferred(Deferred),
}

impl Outcome {
    /// Whether the result is already available.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Whether obtaining the result requires awaiting.
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// Resolves the outcome to its final value, awaiting if necessary.
    ///
    /// # Errors
    ///
    /// Propagates the rejection of a deferred result.
    pub async fn resolve(self) -> Result<Value, StageError> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Deferred(deferred) => deferred.await,
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => formatter.debug_tuple("Ready").field(value).finish(),
            Self::Deferred(_) => formatter.write_str("Deferred(..)"),
        }
    }
}

/// Declared suspension behavior of a callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspend {
    /// Calls never return a deferred result.
    Never,
    /// Calls may or may not suspend; only the returned [`Outcome`] tells.
    Sometimes,
    /// Calls always return a deferred result.
    Always,
}

/// The capability contract every composed stage satisfies.
///
/// Implementations must be cheap to call through a shared reference: the
/// composer holds stages behind [`Arc`] and invokes them concurrently from
/// however many composer clones exist. Stages are never mutated.
pub trait Callable: Send + Sync {
    /// Applies the stage to one argument.
    ///
    /// # Errors
    ///
    /// Any failure is surfaced to the caller of the composed call unchanged.
    fn call(&self, input: Value) -> Result<Outcome, StageError>;

    /// Writes the stage's textual representation.
    ///
    /// Used by the composer's `Display`/`Debug` output; implementations
    /// should emit something that identifies the stage in a re-constructible
    /// composition listing.
    fn render(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// The declared suspension behavior.
    ///
    /// The default is deliberately conservative: without a declaration, a
    /// stage is assumed to suspend conditionally.
    fn suspends(&self) -> Suspend {
        Suspend::Sometimes
    }

    /// Attempts to rebind this stage to an owning receiver.
    ///
    /// Returns `None` when the stage does not support binding, or does not
    /// support binding to this particular owner. Only the first stage of a
    /// composition is ever asked to rebind.
    fn bind(&self, _owner: &Owner) -> Option<Arc<dyn Callable>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_ready_shape() {
        let outcome = Outcome::Ready(Value::new(1_u8));
        assert!(outcome.is_ready());
        assert!(!outcome.is_deferred());
        assert_eq!(format!("{outcome:?}"), "Ready(Value(u8))");
    }

    #[test]
    fn test_outcome_deferred_shape() {
        let outcome = Outcome::Deferred(Box::pin(async { Ok(Value::new(1_u8)) }));
        assert!(outcome.is_deferred());
        assert_eq!(format!("{outcome:?}"), "Deferred(..)");
    }
}
