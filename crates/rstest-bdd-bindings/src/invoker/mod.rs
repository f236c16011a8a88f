//! Binding invocation.
//!
//! [`BindingInvoker::invoke`] resolves the callable handle of a binding,
//! dispatches the supplied arguments to it inside a locale scope derived from
//! the feature language, measures how long the call took and normalizes any
//! failure into an [`InvokeError`]. Success and failure both carry the
//! measured duration.
//!
//! Failures are normalized in priority order: argument-shape mismatches name
//! the binding method; a single failure raised by the implementation is
//! wrapped in a [`LocatedFailure`](crate::LocatedFailure) with its cause left
//! untouched; an aggregate failure keeps only its first member and discards
//! the rest; everything else passes through unchanged.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::binding::MethodBinding;
use crate::config::InvokerConfig;
use crate::context::ContextAccessor;
use crate::entry::DispatchError;
use crate::failure::{LocatedFailure, RaisedFailure, TargetFailure};
use crate::localization::ScopedLocalization;
use crate::method::{Argument, ArgumentSnapshot, BindingValue, MethodDescriptor, MethodKind};
use crate::panic_support::panic_message;

mod clock;
mod error;
mod handle;
mod trace;

pub use clock::{Clock, ProcessClock};
pub use error::{ArgumentMismatch, InvocationError, InvokeError};
pub use handle::{CallableHandle, MAX_PARAMETERS};
pub use trace::{BindingTracer, LogTracer, NoopTracer, TIMING_TARGET};

/// A successful invocation: the produced value, if any, and the time it took.
#[derive(Debug)]
pub struct Invocation {
    value: Option<BindingValue>,
    duration: Duration,
}

impl Invocation {
    /// Value returned by the implementation; `None` for unit returns.
    #[must_use]
    pub fn value(&self) -> Option<&BindingValue> {
        self.value.as_ref()
    }

    /// Borrow the returned value as `T`.
    #[must_use]
    pub fn value_as<T: 'static>(&self) -> Option<&T> {
        self.value.as_ref()?.downcast_ref::<T>()
    }

    /// Take ownership of the returned value.
    #[must_use]
    pub fn into_value(self) -> Option<BindingValue> {
        self.value
    }

    /// Time spent in the implementation.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }
}

/// Executes bindings and measures them.
///
/// # Examples
///
/// ```
/// use rstest_bdd_bindings::{
///     Argument, BindingInvoker, BindingMethod, NoopTracer, ScenarioContext,
/// };
///
/// struct Steps;
///
/// let method = BindingMethod::static_fn::<Steps, _, _>("double", |n: u32| n * 2);
/// let invoker = BindingInvoker::default();
/// let invocation = invoker
///     .invoke(&method, &ScenarioContext::default(), vec![Argument::new(21_u32)], &NoopTracer)
///     .unwrap();
/// assert_eq!(invocation.value_as::<u32>(), Some(&42));
/// ```
#[derive(Clone)]
pub struct BindingInvoker {
    config: InvokerConfig,
    clock: Arc<dyn Clock>,
}

impl Default for BindingInvoker {
    fn default() -> Self {
        Self::new(InvokerConfig::default())
    }
}

impl BindingInvoker {
    /// Create an invoker timed by the process-wide clock.
    #[must_use]
    pub fn new(config: InvokerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(ProcessClock),
        }
    }

    /// Replace the clock used to measure durations.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Invoke `binding` with `arguments`.
    ///
    /// Instance methods receive the bound instance of their declaring type,
    /// looked up through `context`, ahead of `arguments`. Static methods
    /// receive exactly `arguments`; an empty vector calls a parameterless
    /// implementation. When traces are enabled and the call lasts at least
    /// the configured threshold, `tracer` is told about it.
    ///
    /// # Errors
    ///
    /// Returns an [`InvocationError`] wrapping:
    /// - [`InvokeError::Unresolvable`] or [`InvokeError::TooManyParameters`]
    ///   when no handle can be resolved; nothing is dispatched and the
    ///   duration is zero;
    /// - [`InvokeError::MissingInstance`] when an instance method has no
    ///   bound instance;
    /// - [`InvokeError::ArgumentMismatch`] when the arguments do not fit;
    /// - [`InvokeError::Target`] when the implementation failed;
    /// - [`InvokeError::EmptyAggregate`] or [`InvokeError::Localization`] for
    ///   the remaining cases.
    pub fn invoke<B>(
        &self,
        binding: &B,
        context: &dyn ContextAccessor,
        arguments: Vec<Argument>,
        tracer: &dyn BindingTracer,
    ) -> Result<Invocation, InvocationError>
    where
        B: MethodBinding + ?Sized,
    {
        let method = binding.method();
        let handle = method
            .handle()
            .map_err(|error| InvocationError::new(error, Duration::ZERO))?;
        let descriptor = method.descriptor();
        let snapshots: Vec<ArgumentSnapshot> = if self.config.trace_timings() {
            arguments.iter().map(Argument::snapshot).collect()
        } else {
            Vec::new()
        };

        let start = self.clock.elapsed();
        let outcome = dispatch(handle, descriptor, context, arguments);
        let duration = self.clock.elapsed().saturating_sub(start);

        if self.config.should_trace(duration) {
            report_timing(tracer, duration, descriptor, &snapshots);
        }
        outcome
            .map(|value| Invocation { value, duration })
            .map_err(|error| InvocationError::new(error, duration))
    }
}

impl std::fmt::Debug for BindingInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingInvoker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn dispatch(
    handle: &CallableHandle,
    descriptor: &MethodDescriptor,
    context: &dyn ContextAccessor,
    mut arguments: Vec<Argument>,
) -> Result<Option<BindingValue>, InvokeError> {
    let _locale = ScopedLocalization::for_language(context.feature_context().language())
        .map_err(|error| InvokeError::Localization {
            method: descriptor.to_string(),
            error: Arc::new(error),
        })?;
    if handle.kind() == MethodKind::Instance {
        let instance = context
            .bound_instance(descriptor.declaring_type())
            .ok_or_else(|| InvokeError::MissingInstance {
                declaring_type: descriptor.declaring_type().to_string(),
                method: descriptor.to_string(),
            })?;
        arguments.insert(0, Argument::opaque(instance));
    }
    handle
        .dispatch(arguments)
        .map_err(|error| normalize(descriptor, error))
}

fn normalize(descriptor: &MethodDescriptor, error: DispatchError) -> InvokeError {
    match error {
        DispatchError::ArgumentMismatch(detail) => InvokeError::ArgumentMismatch {
            method: descriptor.to_string(),
            detail,
        },
        DispatchError::Raised(RaisedFailure::Single(failure)) => located(descriptor, failure),
        DispatchError::Raised(RaisedFailure::Aggregate(aggregate)) => {
            aggregate.into_first().map_or_else(
                || InvokeError::EmptyAggregate {
                    method: descriptor.to_string(),
                },
                |first| located(descriptor, first),
            )
        }
    }
}

fn located(descriptor: &MethodDescriptor, failure: TargetFailure) -> InvokeError {
    InvokeError::Target(Box::new(LocatedFailure::new(descriptor, failure)))
}

fn report_timing(
    tracer: &dyn BindingTracer,
    duration: Duration,
    descriptor: &MethodDescriptor,
    snapshots: &[ArgumentSnapshot],
) {
    let traced = panic::catch_unwind(AssertUnwindSafe(|| {
        tracer.trace_duration(duration, descriptor, snapshots);
    }));
    if let Err(payload) = traced {
        log::warn!(
            "timing tracer panicked for {descriptor}: {}",
            panic_message(payload.as_ref())
        );
    }
}
