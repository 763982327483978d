//! # catena
//!
//! Runtime function composition with three interchangeable call-semantics
//! families.
//!
//! ## Overview
//!
//! A composer is one callable value built from an ordered list of stages.
//! Calling it invokes the stages in reverse-declaration order — the last
//! declared stage runs first — threading each result into the next stage.
//! The families differ only in how a deferred (future-like) stage result is
//! handled:
//!
//! - [`Composer`](composer::Composer): auto-detects. Synchronous until a
//!   stage suspends, deferred from that point on; the call yields a plain
//!   value when no stage suspended and a deferred value otherwise.
//! - [`AsyncComposer`](composer::AsyncComposer): forced-deferred. Always
//!   returns a deferred value.
//! - [`SyncComposer`](composer::SyncComposer): forced-immediate. Never
//!   awaits; deferred results pass through unawaited.
//!
//! Nested composers of a compatible family are flattened at construction,
//! so the exposed stage sequence always lists leaf callables. Composition is
//! immutable: stages run in the fixed construction-derived order, one at a
//! time, with no locks, no spawned threads, and no shared mutable state.
//! Errors from any stage propagate to the caller unmodified.
//!
//! ## Example
//!
//! ```rust
//! use catena::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let composer = Composer::new(steps![
//!     func("exclaim", |s: String| s + "!"),
//!     func("greet", |name: String| format!("hello {name}")),
//! ])?;
//!
//! let outcome = composer.call(Value::new(String::from("world")))?;
//! let Outcome::Ready(value) = outcome else {
//!     panic!("pure stages never suspend");
//! };
//! assert_eq!(value.downcast::<String>().ok(), Some(String::from("hello world!")));
//! # Ok(())
//! # }
//! ```
//!
//! With a suspending stage the same call shape hands back a deferred value
//! instead (requires an async context to drive it):
//!
//! ```rust,ignore
//! let composer = Composer::new(steps![
//!     func("shout", |s: String| s.to_uppercase()),
//!     async_func("fetch", |key: String| async move { lookup(key).await }),
//! ])?;
//!
//! let Outcome::Deferred(deferred) = composer.call(Value::new(key))? else {
//!     unreachable!("fetch always suspends");
//! };
//! let value = deferred.await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports the whole public surface.
///
/// # Usage
///
/// ```rust
/// use catena::prelude::*;
/// ```
pub mod prelude {
    pub use crate::composer::{AsyncComposer, Composer, Family, Step, SyncComposer};
    pub use crate::error::{ComposeError, TypeMismatchError, UnboundMethodError};
    pub use crate::stage::{
        Callable, Deferred, Outcome, StageError, Suspend, async_func, func, method,
        try_async_func, try_func,
    };
    pub use crate::steps;
    pub use crate::value::{Owner, Value};
}

pub mod composer;
pub mod error;
pub mod stage;
pub mod value;
