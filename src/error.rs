//! Error types for composition construction and stage invocation.
//!
//! Construction failures are the only errors the crate itself produces:
//! composing zero steps or composing a step that carries no callable
//! capability. Everything that goes wrong *inside* a composed call — a stage
//! returning an error, a deferred result rejecting, an adapter receiving an
//! argument of the wrong dynamic type — propagates to the caller unmodified
//! as a [`StageError`](crate::stage::StageError); nothing is caught, wrapped,
//! or retried on the way out.

use crate::composer::Family;

/// Construction failure for any composer family.
///
/// # Examples
///
/// ```
/// use catena::composer::{Composer, Family};
/// use catena::error::ComposeError;
///
/// let error = Composer::new([]).unwrap_err();
/// assert_eq!(error, ComposeError::Empty { family: Family::Auto });
/// assert_eq!(format!("{error}"), "Composer needs at least one step");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// No steps were given. Every family requires at least one.
    Empty {
        /// The family that was being constructed.
        family: Family,
    },
    /// A step carried a bare value with no callable capability.
    NotCallable {
        /// The family that was being constructed.
        family: Family,
        /// Position of the offending step, in declaration order.
        position: usize,
        /// Type name of the rejected value.
        found: &'static str,
    },
}

impl std::fmt::Display for ComposeError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty { family } => {
                write!(formatter, "{family} needs at least one step")
            }
            Self::NotCallable {
                family,
                position,
                found,
            } => {
                write!(
                    formatter,
                    "{family} step at position {position} is not callable: {found}"
                )
            }
        }
    }
}

impl std::error::Error for ComposeError {}

/// An adapter stage received an argument of the wrong dynamic type.
///
/// Intermediate values are not type-checked at composition time; the check
/// happens when the adapter downcasts its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatchError {
    /// Label of the stage that rejected its input.
    pub stage: String,
    /// The argument type the stage expects.
    pub expected: &'static str,
    /// The type that actually arrived.
    pub found: &'static str,
}

impl std::fmt::Display for TypeMismatchError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "stage `{}` expected an argument of type {}, received {}",
            self.stage, self.expected, self.found
        )
    }
}

impl std::error::Error for TypeMismatchError {}

/// A method stage was invoked without a bound receiver.
///
/// Method stages only become callable after [`bind`](crate::stage::Callable::bind)
/// attaches an owner; calling the unbound form fails with this error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnboundMethodError {
    /// Label of the method stage.
    pub stage: String,
}

impl std::fmt::Display for UnboundMethodError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "method stage `{}` called without a bound receiver",
            self.stage
        )
    }
}

impl std::error::Error for UnboundMethodError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_error_display() {
        let error = ComposeError::Empty {
            family: Family::Deferred,
        };
        assert_eq!(format!("{error}"), "AsyncComposer needs at least one step");
    }

    #[test]
    fn test_not_callable_error_display() {
        let error = ComposeError::NotCallable {
            family: Family::Immediate,
            position: 2,
            found: "i32",
        };
        assert_eq!(
            format!("{error}"),
            "SyncComposer step at position 2 is not callable: i32"
        );
    }

    #[test]
    fn test_type_mismatch_error_display() {
        let error = TypeMismatchError {
            stage: String::from("double"),
            expected: "i64",
            found: "alloc::string::String",
        };
        assert_eq!(
            format!("{error}"),
            "stage `double` expected an argument of type i64, received alloc::string::String"
        );
    }

    #[test]
    fn test_unbound_method_error_display() {
        let error = UnboundMethodError {
            stage: String::from("greet"),
        };
        assert_eq!(
            format!("{error}"),
            "method stage `greet` called without a bound receiver"
        );
    }

    #[test]
    fn test_compose_error_equality() {
        let first = ComposeError::Empty {
            family: Family::Auto,
        };
        let second = ComposeError::Empty {
            family: Family::Auto,
        };
        let third = ComposeError::Empty {
            family: Family::Immediate,
        };
        assert_eq!(first, second);
        assert_ne!(first, third);
    }

    #[test]
    fn test_errors_have_no_source() {
        use std::error::Error;

        let error = ComposeError::Empty {
            family: Family::Auto,
        };
        assert!(error.source().is_none());

        let error = TypeMismatchError {
            stage: String::from("double"),
            expected: "i64",
            found: "u8",
        };
        assert!(error.source().is_none());
    }
}
