//! The forced-immediate composition family.

use std::fmt;
use std::sync::Arc;

use super::{Chain, Family, Step, render_chain};
use crate::error::ComposeError;
use crate::stage::{Callable, Outcome, StageError, Suspend};
use crate::value::{Owner, Value};

/// Function composition that never suspends.
///
/// A deferred result returned by any stage is not awaited: it is repackaged
/// as a plain [`Value`] holding the pending [`Deferred`](crate::stage::Deferred)
/// and handed to the next stage (or returned) untouched. This is a
/// deliberate escape hatch for pipelines that must stay synchronous even
/// when a stage happens to produce a deferred-looking value — the receiving
/// stage can downcast the value back to the deferred type and decide for
/// itself what to do with it.
///
/// # Examples
///
/// ```
/// use catena::composer::SyncComposer;
/// use catena::stage::func;
/// use catena::value::Value;
/// use catena::steps;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let composer = SyncComposer::new(steps![
///     func("double", |x: i64| x * 2),
///     func("increment", |x: i64| x + 1),
/// ])?;
///
/// let value = composer.call(Value::new(20_i64))?;
/// assert_eq!(value.downcast::<i64>().ok(), Some(42));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SyncComposer {
    pub(super) chain: Chain,
}

impl_family_common!(SyncComposer, Immediate);

impl SyncComposer {
    /// Calls the composed stages without ever awaiting.
    ///
    /// The result may itself be a [`Value`] wrapping an un-awaited
    /// [`Deferred`](crate::stage::Deferred) if the last executed stage
    /// suspended.
    ///
    /// # Errors
    ///
    /// The first stage failure is propagated unmodified; no later stage
    /// runs.
    pub fn call(&self, input: Value) -> Result<Value, StageError> {
        let mut value = match self.chain.first.call(input)? {
            Outcome::Ready(value) => value,
            Outcome::Deferred(deferred) => Value::new(deferred),
        };
        for stage in self.chain.tail.iter() {
            value = match stage.call(value)? {
                Outcome::Ready(value) => value,
                Outcome::Deferred(deferred) => Value::new(deferred),
            };
        }
        Ok(value)
    }

    /// Always [`Suspend::Never`]: the call completes synchronously no
    /// matter what the stages declare.
    #[must_use]
    pub const fn suspends(&self) -> Suspend {
        Suspend::Never
    }
}

impl Callable for SyncComposer {
    fn call(&self, input: Value) -> Result<Outcome, StageError> {
        Self::call(self, input).map(Outcome::Ready)
    }

    fn render(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_chain(&self.chain, formatter)
    }

    fn suspends(&self) -> Suspend {
        Suspend::Never
    }

    fn bind(&self, owner: &Owner) -> Option<Arc<dyn Callable>> {
        self.chain
            .rebound(owner)
            .map(|chain| Arc::new(Self { chain }) as Arc<dyn Callable>)
    }
}
