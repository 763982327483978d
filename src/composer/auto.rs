//! The auto-detecting composition family.

use std::fmt;
use std::sync::Arc;

use super::{Chain, Family, Step, render_chain};
use crate::error::ComposeError;
use crate::stage::{Callable, Deferred, Outcome, StageError, Suspend};
use crate::value::{Owner, Value};

/// Function composition with automatic deferred-result detection.
///
/// Stages run synchronously, each result fed to the next stage, until one of
/// them returns a deferred value. From that point the call switches to
/// deferred resolution: the pending result is awaited, its value fed onward,
/// and every later stage result checked for suspension again. The overall
/// call therefore yields [`Outcome::Ready`] when no stage ever suspended and
/// [`Outcome::Deferred`] otherwise — callers must tolerate either shape.
///
/// # Examples
///
/// ```
/// use catena::composer::Composer;
/// use catena::stage::{func, Outcome};
/// use catena::value::Value;
/// use catena::steps;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let composer = Composer::new(steps![
///     func("f", |s: String| s + "f"),
///     func("g", |s: String| s + "g"),
/// ])?;
///
/// // The last declared stage runs first: f(g("")) == "gf".
/// let outcome = composer.call(Value::new(String::new()))?;
/// let Outcome::Ready(value) = outcome else {
///     panic!("pure stages never suspend");
/// };
/// assert_eq!(value.downcast::<String>().ok(), Some(String::from("gf")));
/// # Ok(())
/// # }
/// ```
///
/// With a suspending stage, the same composer hands back a deferred value:
///
/// ```rust,ignore
/// let composer = Composer::new(steps![
///     func("shout", |s: String| s.to_uppercase()),
///     async_func("fetch", |key: String| async move { lookup(key).await }),
/// ])?;
/// let Outcome::Deferred(deferred) = composer.call(Value::new(key))? else {
///     unreachable!("fetch always suspends");
/// };
/// let value = deferred.await?;
/// ```
#[derive(Clone)]
pub struct Composer {
    pub(super) chain: Chain,
}

impl_family_common!(Composer, Auto);

impl Composer {
    /// Calls the composed stages with automatic deferred-result detection.
    ///
    /// Returns [`Outcome::Ready`] if every stage completed synchronously,
    /// [`Outcome::Deferred`] the moment any stage suspends. Dropping the
    /// deferred result cancels the remaining stages.
    ///
    /// # Errors
    ///
    /// A stage failure before the first suspension surfaces here; one after
    /// it surfaces as the rejection of the returned deferred value. Either
    /// way the error is propagated unmodified and no later stage runs.
    pub fn call(&self, input: Value) -> Result<Outcome, StageError> {
        let mut value = match self.chain.first.call(input)? {
            Outcome::Ready(value) => value,
            Outcome::Deferred(deferred) => {
                return Ok(Outcome::Deferred(resume(
                    Arc::clone(&self.chain.tail),
                    0,
                    deferred,
                )));
            }
        };
        for (position, stage) in self.chain.tail.iter().enumerate() {
            value = match stage.call(value)? {
                Outcome::Ready(value) => value,
                Outcome::Deferred(deferred) => {
                    return Ok(Outcome::Deferred(resume(
                        Arc::clone(&self.chain.tail),
                        position + 1,
                        deferred,
                    )));
                }
            };
        }
        Ok(Outcome::Ready(value))
    }

    /// The combined declared suspension behavior of the composed stages.
    ///
    /// [`Suspend::Sometimes`] means the shape of each call's [`Outcome`] is
    /// the only way to know.
    #[must_use]
    pub const fn suspends(&self) -> Suspend {
        self.chain.suspends
    }
}

/// Drives the remaining stages once the call has switched to deferred
/// resolution.
fn resume(tail: Arc<[Arc<dyn Callable>]>, next: usize, deferred: Deferred) -> Deferred {
    Box::pin(async move {
        let mut value = deferred.await?;
        for stage in &tail[next..] {
            value = match stage.call(value)? {
                Outcome::Ready(value) => value,
                Outcome::Deferred(deferred) => deferred.await?,
            };
        }
        Ok(value)
    })
}

impl Callable for Composer {
    fn call(&self, input: Value) -> Result<Outcome, StageError> {
        Self::call(self, input)
    }

    fn render(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_chain(&self.chain, formatter)
    }

    fn suspends(&self) -> Suspend {
        self.chain.suspends
    }

    fn bind(&self, owner: &Owner) -> Option<Arc<dyn Callable>> {
        self.chain
            .rebound(owner)
            .map(|chain| Arc::new(Self { chain }) as Arc<dyn Callable>)
    }
}
