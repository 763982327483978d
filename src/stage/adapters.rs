//! Adapters from ordinary Rust functions to the [`Callable`] capability.
//!
//! The composition engine is dynamically typed; these adapters are the
//! bridge from statically typed closures. Each adapter downcasts its input
//! [`Value`] to the declared argument type, failing the call with
//! [`TypeMismatchError`] when something else arrives, and re-wraps the
//! output.
//!
//! Every adapter takes a label. Labels are what the composer's `Display`
//! output shows for the stage, so pick the name you would want to read back
//! in a composition listing.
//!
//! # Examples
//!
//! ```
//! use catena::stage::{func, try_func, Outcome};
//! use catena::value::Value;
//!
//! let double = func("double", |x: i64| x * 2);
//! let parse = try_func("parse", |text: String| text.parse::<i64>());
//!
//! let outcome = parse.call(Value::new(String::from("21"))).unwrap();
//! let Outcome::Ready(value) = outcome else { unreachable!() };
//! let outcome = double.call(value).unwrap();
//! let Outcome::Ready(value) = outcome else { unreachable!() };
//! assert_eq!(value.downcast::<i64>().ok(), Some(42));
//! ```

use std::any::{self, Any};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{TypeMismatchError, UnboundMethodError};
use crate::stage::{Callable, Outcome, StageError, Suspend};
use crate::value::{Owner, Value};

fn downcast_argument<A: Any + Send>(stage: &str, input: Value) -> Result<A, StageError> {
    let found = input.type_name();
    input.downcast::<A>().map_err(|_| {
        TypeMismatchError {
            stage: stage.to_owned(),
            expected: any::type_name::<A>(),
            found,
        }
        .into()
    })
}

/// Adapts an infallible synchronous function into a stage.
///
/// The resulting stage declares [`Suspend::Never`].
pub fn func<A, B, F>(label: impl Into<String>, function: F) -> Arc<dyn Callable>
where
    A: Any + Send,
    B: Any + Send,
    F: Fn(A) -> B + Send + Sync + 'static,
{
    Arc::new(FuncStage {
        label: label.into(),
        function,
        signature: PhantomData,
    })
}

struct FuncStage<A, B, F> {
    label: String,
    function: F,
    signature: PhantomData<fn(A) -> B>,
}

impl<A, B, F> Callable for FuncStage<A, B, F>
where
    A: Any + Send,
    B: Any + Send,
    F: Fn(A) -> B + Send + Sync,
{
    fn call(&self, input: Value) -> Result<Outcome, StageError> {
        let argument = downcast_argument::<A>(&self.label, input)?;
        Ok(Outcome::Ready(Value::new((self.function)(argument))))
    }

    fn render(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.label)
    }

    fn suspends(&self) -> Suspend {
        Suspend::Never
    }
}

/// Adapts a fallible synchronous function into a stage.
///
/// The error is surfaced to the caller of the composed call unchanged.
pub fn try_func<A, B, E, F>(label: impl Into<String>, function: F) -> Arc<dyn Callable>
where
    A: Any + Send,
    B: Any + Send,
    E: Into<StageError> + 'static,
    F: Fn(A) -> Result<B, E> + Send + Sync + 'static,
{
    Arc::new(TryFuncStage {
        label: label.into(),
        function,
        signature: PhantomData,
    })
}

struct TryFuncStage<A, B, E, F> {
    label: String,
    function: F,
    signature: PhantomData<fn(A) -> Result<B, E>>,
}

impl<A, B, E, F> Callable for TryFuncStage<A, B, E, F>
where
    A: Any + Send,
    B: Any + Send,
    E: Into<StageError>,
    F: Fn(A) -> Result<B, E> + Send + Sync,
{
    fn call(&self, input: Value) -> Result<Outcome, StageError> {
        let argument = downcast_argument::<A>(&self.label, input)?;
        match (self.function)(argument) {
            Ok(output) => Ok(Outcome::Ready(Value::new(output))),
            Err(error) => Err(error.into()),
        }
    }

    fn render(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.label)
    }

    fn suspends(&self) -> Suspend {
        Suspend::Never
    }
}

/// Adapts an async function into a stage that always suspends.
///
/// The future is created eagerly at call time but only driven when the
/// deferred result is awaited.
pub fn async_func<A, Fut, F>(label: impl Into<String>, function: F) -> Arc<dyn Callable>
where
    A: Any + Send,
    Fut: Future + Send + 'static,
    Fut::Output: Any + Send,
    F: Fn(A) -> Fut + Send + Sync + 'static,
{
    Arc::new(AsyncFuncStage {
        label: label.into(),
        function,
        signature: PhantomData,
    })
}

struct AsyncFuncStage<A, Fut, F> {
    label: String,
    function: F,
    signature: PhantomData<fn(A) -> Fut>,
}

impl<A, Fut, F> Callable for AsyncFuncStage<A, Fut, F>
where
    A: Any + Send,
    Fut: Future + Send + 'static,
    Fut::Output: Any + Send,
    F: Fn(A) -> Fut + Send + Sync,
{
    fn call(&self, input: Value) -> Result<Outcome, StageError> {
        let argument = downcast_argument::<A>(&self.label, input)?;
        let future = (self.function)(argument);
        Ok(Outcome::Deferred(Box::pin(async move {
            Ok(Value::new(future.await))
        })))
    }

    fn render(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.label)
    }

    fn suspends(&self) -> Suspend {
        Suspend::Always
    }
}

/// Adapts a fallible async function into a stage that always suspends.
///
/// A rejection of the returned future propagates to the caller of the whole
/// composed call, aborting all remaining stages.
pub fn try_async_func<A, B, E, Fut, F>(label: impl Into<String>, function: F) -> Arc<dyn Callable>
where
    A: Any + Send,
    B: Any + Send,
    E: Into<StageError> + Send,
    Fut: Future<Output = Result<B, E>> + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
{
    Arc::new(TryAsyncFuncStage {
        label: label.into(),
        function,
        signature: PhantomData,
    })
}

struct TryAsyncFuncStage<A, Fut, F> {
    label: String,
    function: F,
    signature: PhantomData<fn(A) -> Fut>,
}

impl<A, B, E, Fut, F> Callable for TryAsyncFuncStage<A, Fut, F>
where
    A: Any + Send,
    B: Any + Send,
    E: Into<StageError> + Send,
    Fut: Future<Output = Result<B, E>> + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync,
{
    fn call(&self, input: Value) -> Result<Outcome, StageError> {
        let argument = downcast_argument::<A>(&self.label, input)?;
        let future = (self.function)(argument);
        Ok(Outcome::Deferred(Box::pin(async move {
            match future.await {
                Ok(output) => Ok(Value::new(output)),
                Err(error) => Err(error.into()),
            }
        })))
    }

    fn render(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.label)
    }

    fn suspends(&self) -> Suspend {
        Suspend::Always
    }
}

/// Adapts a method — a function over a receiver and one argument — into an
/// unbound stage.
///
/// The unbound stage fails every call with
/// [`UnboundMethodError`]; it becomes useful once
/// [`bind`](Callable::bind) attaches an owner of type `T`. Binding with an
/// owner of a different dynamic type returns `None`, leaving any enclosing
/// composition unchanged.
pub fn method<T, A, B, F>(label: impl Into<String>, function: F) -> Arc<dyn Callable>
where
    T: Any + Send + Sync,
    A: Any + Send,
    B: Any + Send,
    F: Fn(&T, A) -> B + Send + Sync + 'static,
{
    Arc::new(MethodStage {
        label: label.into(),
        function: Arc::new(function),
        signature: PhantomData,
    })
}

struct MethodStage<T, A, F> {
    label: String,
    function: Arc<F>,
    signature: PhantomData<fn(&T, A)>,
}

impl<T, A, B, F> Callable for MethodStage<T, A, F>
where
    T: Any + Send + Sync,
    A: Any + Send,
    B: Any + Send,
    F: Fn(&T, A) -> B + Send + Sync + 'static,
{
    fn call(&self, _input: Value) -> Result<Outcome, StageError> {
        Err(UnboundMethodError {
            stage: self.label.clone(),
        }
        .into())
    }

    fn render(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.label)
    }

    fn suspends(&self) -> Suspend {
        Suspend::Never
    }

    fn bind(&self, owner: &Owner) -> Option<Arc<dyn Callable>> {
        let receiver = Arc::clone(owner).downcast::<T>().ok()?;
        Some(Arc::new(BoundMethodStage {
            label: self.label.clone(),
            receiver,
            function: Arc::clone(&self.function),
            signature: PhantomData,
        }))
    }
}

struct BoundMethodStage<T, A, F> {
    label: String,
    receiver: Arc<T>,
    function: Arc<F>,
    signature: PhantomData<fn(A)>,
}

impl<T, A, B, F> Callable for BoundMethodStage<T, A, F>
where
    T: Any + Send + Sync,
    A: Any + Send,
    B: Any + Send,
    F: Fn(&T, A) -> B + Send + Sync + 'static,
{
    fn call(&self, input: Value) -> Result<Outcome, StageError> {
        let argument = downcast_argument::<A>(&self.label, input)?;
        Ok(Outcome::Ready(Value::new((self.function)(
            self.receiver.as_ref(),
            argument,
        ))))
    }

    fn render(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.label)
    }

    fn suspends(&self) -> Suspend {
        Suspend::Never
    }

    fn bind(&self, owner: &Owner) -> Option<Arc<dyn Callable>> {
        // Rebinding an already-bound method replaces the receiver.
        let receiver = Arc::clone(owner).downcast::<T>().ok()?;
        Some(Arc::new(Self {
            label: self.label.clone(),
            receiver,
            function: Arc::clone(&self.function),
            signature: PhantomData,
        }))
    }
}
