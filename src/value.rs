//! Dynamically typed values threaded between composed stages.
//!
//! A composition pipeline carries one value from stage to stage without any
//! compile-time knowledge of the intermediate types. [`Value`] is that
//! carrier: a boxed [`Any`] payload tagged with the name of the stored type
//! so that mismatches can be reported usefully at call time.
//!
//! # Examples
//!
//! ```
//! use catena::value::Value;
//!
//! let value = Value::new(21_i32);
//! assert!(value.is::<i32>());
//! assert_eq!(value.type_name(), "i32");
//! assert_eq!(value.downcast::<i32>().ok(), Some(21));
//! ```

use std::any::{self, Any};
use std::fmt;
use std::sync::Arc;

/// The receiver object a method stage can be bound to.
///
/// Rebinding is an explicit operation on the callable capability (see
/// [`Callable::bind`](crate::stage::Callable::bind)); the owner is shared
/// rather than consumed so that one receiver can back many bound stages.
pub type Owner = Arc<dyn Any + Send + Sync>;

/// A single dynamically typed value flowing through a composition.
///
/// `Value` owns its payload. Downcasting back to the concrete type consumes
/// the value; a failed downcast hands the value back unconsumed so it can be
/// retried or reported.
pub struct Value {
    payload: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Value {
    /// Wraps an arbitrary sendable value.
    #[must_use]
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            payload: Box::new(value),
            type_name: any::type_name::<T>(),
        }
    }

    /// The name of the stored type, as captured at wrap time.
    ///
    /// Diagnostic only: the string comes from [`std::any::type_name`] and has
    /// no stability guarantees beyond being readable.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the payload is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// Recovers the concrete payload, consuming the value.
    ///
    /// # Errors
    ///
    /// Returns the value unchanged when the payload is not a `T`.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let type_name = self.type_name;
        match self.payload.downcast::<T>() {
            Ok(payload) => Ok(*payload),
            Err(payload) => Err(Self { payload, type_name }),
        }
    }

    /// Borrows the payload as a `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The payload itself is opaque; the captured type name is the only
        // thing that can be shown without a Debug bound on construction.
        write!(formatter, "Value({})", self.type_name)
    }
}
