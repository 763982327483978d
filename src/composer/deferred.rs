//! The forced-deferred composition family.

use std::fmt;
use std::sync::Arc;

use super::{Chain, Family, Step, render_chain};
use crate::error::ComposeError;
use crate::stage::{Callable, Deferred, Outcome, StageError, Suspend};
use crate::value::{Owner, Value};

/// Function composition that always returns a deferred value.
///
/// The whole call runs inside one deferred execution context, whether or not
/// any inner stage needs suspension: every stage result that is deferred is
/// awaited, everything else flows straight through. Callers always receive a
/// [`Deferred`] and always await it — there is no dual-shape result to
/// tolerate, which is the point of forcing the family.
///
/// Stage failures, including ones raised before the first suspension point,
/// surface when the returned deferred value is polled.
///
/// # Examples
///
/// ```rust,ignore
/// let composer = AsyncComposer::new(steps![
///     func("shout", |s: String| s.to_uppercase()),
///     func("greet", |name: String| format!("hello {name}")),
/// ])?;
///
/// // All-sync stages, yet the result still needs an await.
/// let value = composer.call(Value::new(String::from("world"))).await?;
/// assert_eq!(value.downcast::<String>().ok(), Some(String::from("HELLO WORLD")));
/// ```
#[derive(Clone)]
pub struct AsyncComposer {
    pub(super) chain: Chain,
}

impl_family_common!(AsyncComposer, Deferred);

impl AsyncComposer {
    /// Calls the composed stages inside a deferred execution context.
    ///
    /// The returned future resolves to the final value, or to the first
    /// stage failure, propagated unmodified; no later stage runs after a
    /// failure. Dropping the future cancels the remaining stages.
    #[must_use]
    pub fn call(&self, input: Value) -> Deferred {
        let chain = self.chain.clone();
        Box::pin(async move {
            let mut value = match chain.first.call(input)? {
                Outcome::Ready(value) => value,
                Outcome::Deferred(deferred) => deferred.await?,
            };
            for stage in chain.tail.iter() {
                value = match stage.call(value)? {
                    Outcome::Ready(value) => value,
                    Outcome::Deferred(deferred) => deferred.await?,
                };
            }
            Ok(value)
        })
    }

    /// Always [`Suspend::Always`]: the call returns a deferred value no
    /// matter what the stages declare.
    #[must_use]
    pub const fn suspends(&self) -> Suspend {
        Suspend::Always
    }
}

impl Callable for AsyncComposer {
    fn call(&self, input: Value) -> Result<Outcome, StageError> {
        Ok(Outcome::Deferred(Self::call(self, input)))
    }

    fn render(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_chain(&self.chain, formatter)
    }

    fn suspends(&self) -> Suspend {
        Suspend::Always
    }

    fn bind(&self, owner: &Owner) -> Option<Arc<dyn Callable>> {
        self.chain
            .rebound(owner)
            .map(|chain| Arc::new(Self { chain }) as Arc<dyn Callable>)
    }
}
