//! The three composition families over one shared stage chain.
//!
//! A composer is built from an ordered list of [`Step`]s and calls its
//! stages in reverse-declaration order: the last step runs first and every
//! earlier step receives the previous result. The three families share
//! construction, flattening, introspection, rebinding, and rendering; they
//! differ only in how a deferred stage result is handled at call time:
//!
//! - [`Composer`] auto-detects: synchronous until a stage suspends, deferred
//!   from that point on.
//! - [`AsyncComposer`] always returns a deferred value.
//! - [`SyncComposer`] never suspends and passes deferred results through
//!   unawaited.
//!
//! # Flattening
//!
//! A nested composer of a compatible family is spliced into the constructed
//! sequence instead of nesting, so the exposed sequence always lists leaf
//! stages only. [`Composer`] and [`AsyncComposer`] absorb each other and
//! themselves; [`SyncComposer`] absorbs only itself. An incompatible nested
//! composer is kept as a single opaque stage (every family implements
//! [`Callable`]).
//!
//! ```
//! use catena::composer::Composer;
//! use catena::stage::func;
//! use catena::steps;
//!
//! # fn main() -> Result<(), catena::error::ComposeError> {
//! let f = func("f", |s: String| s + "f");
//! let g = func("g", |s: String| s + "g");
//! let h = func("h", |s: String| s + "h");
//!
//! let inner = Composer::new(steps![f.clone(), g.clone()])?;
//! let nested = Composer::new(steps![inner, h.clone()])?;
//! let flat = Composer::new(steps![f, g, h])?;
//!
//! assert_eq!(nested.stages().count(), 3);
//! assert_eq!(format!("{nested}"), format!("{flat}"));
//! # Ok(())
//! # }
//! ```
//!
//! # Rendering
//!
//! `Display` and `Debug` list the stages in declaration order (the reverse
//! of execution order), prefixed by the family's type name:
//! `Composer(f, g)`. A stage whose rendering recursively reaches the
//! composer being rendered is cut off with the fixed placeholder
//! [`RECURSION_PLACEHOLDER`] instead of looping.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::iter;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use smallvec::SmallVec;
use static_assertions::assert_impl_all;

use crate::error::ComposeError;
use crate::stage::{Callable, Suspend};
use crate::value::{Owner, Value};

/// One of the three call-semantics families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Auto-detecting composition ([`Composer`]).
    Auto,
    /// Forced-deferred composition ([`AsyncComposer`]).
    Deferred,
    /// Forced-immediate composition ([`SyncComposer`]).
    Immediate,
}

impl Family {
    /// The family's rendered type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auto => "Composer",
            Self::Deferred => "AsyncComposer",
            Self::Immediate => "SyncComposer",
        }
    }

    /// Whether a nested composer of family `nested` is spliced into this
    /// family's sequence rather than kept as one opaque stage.
    ///
    /// Absorption is decided here, at construction, and never depends on
    /// whether suspension is later observed.
    #[must_use]
    pub const fn absorbs(self, nested: Self) -> bool {
        match self {
            Self::Auto | Self::Deferred => matches!(nested, Self::Auto | Self::Deferred),
            Self::Immediate => matches!(nested, Self::Immediate),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// One argument to composition.
///
/// The tagged union makes the construction-time capability check explicit:
/// leaf stages and nested composers carry the callable capability, a bare
/// [`Value`] does not and is rejected with
/// [`ComposeError::NotCallable`].
pub enum Step {
    /// A leaf stage.
    Callable(Arc<dyn Callable>),
    /// A nested auto-detect composer.
    Auto(Composer),
    /// A nested forced-deferred composer.
    Deferred(AsyncComposer),
    /// A nested forced-immediate composer.
    Immediate(SyncComposer),
    /// A bare value with no callable capability.
    Opaque(Value),
}

impl Step {
    /// Erases a concrete stage into a step.
    pub fn callable<C: Callable + 'static>(stage: C) -> Self {
        Self::Callable(Arc::new(stage))
    }
}

impl From<Arc<dyn Callable>> for Step {
    fn from(stage: Arc<dyn Callable>) -> Self {
        Self::Callable(stage)
    }
}

impl From<Value> for Step {
    fn from(value: Value) -> Self {
        Self::Opaque(value)
    }
}

/// Builds a `Vec<`[`Step`]`>` from anything convertible into a step.
///
/// # Examples
///
/// ```
/// use catena::composer::Composer;
/// use catena::stage::func;
/// use catena::steps;
///
/// let composer = Composer::new(steps![
///     func("exclaim", |s: String| s + "!"),
///     func("greet", |name: String| format!("hello {name}")),
/// ])
/// .unwrap();
/// ```
#[macro_export]
macro_rules! steps {
    ($($step:expr),* $(,)?) => {
        ::std::vec![$($crate::composer::Step::from($step)),*]
    };
}

/// Emitted in place of a composer whose rendering recursively reaches
/// itself.
pub const RECURSION_PLACEHOLDER: &str = "<...>";

static NEXT_CHAIN_ID: AtomicUsize = AtomicUsize::new(0);

fn next_chain_id() -> usize {
    NEXT_CHAIN_ID.fetch_add(1, Ordering::Relaxed)
}

/// The immutable core shared by all three families: the stage executed
/// first, the remaining stages in execution order, and the combined declared
/// suspension behavior. Cloning shares the stage allocations; the `id` is
/// process-unique per construction and identifies the chain to the
/// rendering recursion guard.
#[derive(Clone)]
pub(super) struct Chain {
    pub(super) id: usize,
    pub(super) family: Family,
    pub(super) first: Arc<dyn Callable>,
    pub(super) tail: Arc<[Arc<dyn Callable>]>,
    pub(super) suspends: Suspend,
}

impl Chain {
    pub(super) fn build<I>(family: Family, steps: I) -> Result<Self, ComposeError>
    where
        I: IntoIterator<Item = Step>,
    {
        let declared: Vec<Step> = steps.into_iter().collect();
        if declared.is_empty() {
            return Err(ComposeError::Empty { family });
        }
        // Execution order is the reverse of declaration order: the last
        // declared step runs first.
        let mut stages: SmallVec<[Arc<dyn Callable>; 8]> = SmallVec::new();
        for (position, step) in declared.into_iter().enumerate().rev() {
            match step {
                Step::Callable(stage) => stages.push(stage),
                Step::Auto(composer) if family.absorbs(Family::Auto) => {
                    splice(&mut stages, &composer.chain);
                }
                Step::Auto(composer) => stages.push(Arc::new(composer)),
                Step::Deferred(composer) if family.absorbs(Family::Deferred) => {
                    splice(&mut stages, &composer.chain);
                }
                Step::Deferred(composer) => stages.push(Arc::new(composer)),
                Step::Immediate(composer) if family.absorbs(Family::Immediate) => {
                    splice(&mut stages, &composer.chain);
                }
                Step::Immediate(composer) => stages.push(Arc::new(composer)),
                Step::Opaque(value) => {
                    return Err(ComposeError::NotCallable {
                        family,
                        position,
                        found: value.type_name(),
                    });
                }
            }
        }
        let suspends = combined_suspend(stages.iter());
        let mut stages = stages.into_iter();
        let Some(first) = stages.next() else {
            return Err(ComposeError::Empty { family });
        };
        let tail: Arc<[Arc<dyn Callable>]> = stages.collect();
        Ok(Self {
            id: next_chain_id(),
            family,
            first,
            tail,
            suspends,
        })
    }

    /// Every stage in execution order.
    pub(super) fn stages(&self) -> impl Iterator<Item = &Arc<dyn Callable>> {
        iter::once(&self.first).chain(self.tail.iter())
    }

    /// Every stage in declaration order (the reverse of execution order).
    fn declaration_order(&self) -> impl Iterator<Item = &Arc<dyn Callable>> {
        self.tail.iter().rev().chain(iter::once(&self.first))
    }

    /// A new chain with `first` rebound to `owner` and the tail shared
    /// unchanged, or `None` when `first` does not rebind.
    pub(super) fn rebound(&self, owner: &Owner) -> Option<Self> {
        let first = self.first.bind(owner)?;
        let suspends = combined_suspend(iter::once(&first).chain(self.tail.iter()));
        Some(Self {
            id: next_chain_id(),
            family: self.family,
            first,
            tail: Arc::clone(&self.tail),
            suspends,
        })
    }
}

fn splice(stages: &mut SmallVec<[Arc<dyn Callable>; 8]>, nested: &Chain) {
    stages.push(Arc::clone(&nested.first));
    stages.extend(nested.tail.iter().cloned());
}

fn combined_suspend<'a, I>(stages: I) -> Suspend
where
    I: Iterator<Item = &'a Arc<dyn Callable>>,
{
    let mut conditional = false;
    for stage in stages {
        match stage.suspends() {
            Suspend::Always => return Suspend::Always,
            Suspend::Sometimes => conditional = true,
            Suspend::Never => {}
        }
    }
    if conditional {
        Suspend::Sometimes
    } else {
        Suspend::Never
    }
}

thread_local! {
    static RENDERING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

struct RenderGuard {
    id: usize,
    entered: bool,
}

impl RenderGuard {
    fn enter(id: usize) -> Self {
        let entered = RENDERING.with(|active| active.borrow_mut().insert(id));
        Self { id, entered }
    }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        if self.entered {
            RENDERING.with(|active| {
                active.borrow_mut().remove(&self.id);
            });
        }
    }
}

pub(super) fn render_chain(chain: &Chain, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    let guard = RenderGuard::enter(chain.id);
    if !guard.entered {
        return formatter.write_str(RECURSION_PLACEHOLDER);
    }
    write!(formatter, "{}(", chain.family)?;
    for (index, stage) in chain.declaration_order().enumerate() {
        if index > 0 {
            formatter.write_str(", ")?;
        }
        stage.render(formatter)?;
    }
    formatter.write_str(")")
}

/// Generates the construction, introspection, rebinding, rendering, and
/// step-conversion surface shared by the three families. Call semantics stay
/// in each family's own module.
macro_rules! impl_family_common {
    ($type:ident, $family:ident) => {
        impl $type {
            #[doc = concat!("Composes the given steps into a new `", stringify!($type), "`.")]
            ///
            /// Steps are declared in composition order: the last step runs
            /// first and every earlier step receives the previous result.
            /// Nested composers of a compatible family are spliced into the
            /// stored sequence instead of nesting.
            ///
            /// # Errors
            ///
            /// [`ComposeError::Empty`] when no steps are given;
            /// [`ComposeError::NotCallable`] when any step carries a bare
            /// value, whatever its position.
            pub fn new<I>(steps: I) -> Result<Self, ComposeError>
            where
                I: IntoIterator<Item = Step>,
            {
                Chain::build(Family::$family, steps).map(|chain| Self { chain })
            }

            /// The stage executed first.
            #[must_use]
            pub fn first(&self) -> &Arc<dyn Callable> {
                &self.chain.first
            }

            /// The stages applied after `first`, in execution order.
            #[must_use]
            pub fn tail(&self) -> &[Arc<dyn Callable>] {
                &self.chain.tail
            }

            /// Every composed stage, flattened, in execution order.
            pub fn stages(&self) -> impl Iterator<Item = &Arc<dyn Callable>> {
                self.chain.stages()
            }

            /// Rebinds the first stage to `owner`, as when the composition
            /// is looked up through a method table. Only `first` is ever
            /// rebound; the tail is shared unchanged. When `first` does not
            /// support binding (or not to this owner), the composer is
            /// returned unchanged.
            #[must_use]
            pub fn bind(&self, owner: &Owner) -> Self {
                match self.chain.rebound(owner) {
                    Some(chain) => Self { chain },
                    None => self.clone(),
                }
            }
        }

        impl fmt::Display for $type {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                render_chain(&self.chain, formatter)
            }
        }

        impl fmt::Debug for $type {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                render_chain(&self.chain, formatter)
            }
        }

        impl From<$type> for Step {
            fn from(composer: $type) -> Self {
                Self::$family(composer)
            }
        }
    };
}

mod auto;
mod deferred;
mod immediate;

pub use auto::Composer;
pub use deferred::AsyncComposer;
pub use immediate::SyncComposer;

assert_impl_all!(Composer: Send, Sync, Clone);
assert_impl_all!(AsyncComposer: Send, Sync, Clone);
assert_impl_all!(SyncComposer: Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorption_table() {
        assert!(Family::Auto.absorbs(Family::Auto));
        assert!(Family::Auto.absorbs(Family::Deferred));
        assert!(!Family::Auto.absorbs(Family::Immediate));

        assert!(Family::Deferred.absorbs(Family::Auto));
        assert!(Family::Deferred.absorbs(Family::Deferred));
        assert!(!Family::Deferred.absorbs(Family::Immediate));

        assert!(!Family::Immediate.absorbs(Family::Auto));
        assert!(!Family::Immediate.absorbs(Family::Deferred));
        assert!(Family::Immediate.absorbs(Family::Immediate));
    }

    #[test]
    fn test_family_names() {
        assert_eq!(Family::Auto.to_string(), "Composer");
        assert_eq!(Family::Deferred.to_string(), "AsyncComposer");
        assert_eq!(Family::Immediate.to_string(), "SyncComposer");
    }

    #[test]
    fn test_chain_ids_are_unique() {
        let first = next_chain_id();
        let second = next_chain_id();
        assert_ne!(first, second);
    }
}
