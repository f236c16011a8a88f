//! Failures raised by binding implementations.
//!
//! An implementation fails by returning an error or by panicking. Either way
//! the invoker captures a [`TargetFailure`] describing the original cause and
//! wraps it in a [`LocatedFailure`] that names the offending binding. The
//! wrapper never alters the cause: [`LocatedFailure::cause`] and
//! [`LocatedFailure::into_cause`] hand it back exactly as it was raised.
//!
//! Implementations that fan work out may report several failures at once as
//! an [`AggregateFailure`]. Only the first recorded member survives
//! normalization; the remainder are discarded.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::localization;
use crate::method::{MethodDescriptor, SourceLocation};
use crate::panic_support::panic_message;

/// How a target failure was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The implementation returned an error value.
    Error,
    /// The implementation panicked.
    Panic,
}

/// The original failure raised by a binding implementation.
///
/// # Examples
///
/// ```
/// use rstest_bdd_bindings::{FailureKind, TargetFailure};
///
/// let failure = TargetFailure::msg("basket is empty");
/// assert_eq!(failure.kind(), FailureKind::Error);
/// assert_eq!(failure.to_string(), "basket is empty");
/// assert!(failure.origin().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct TargetFailure {
    kind: FailureKind,
    message: String,
    error: Option<Arc<dyn Error + Send + Sync>>,
    origin: Option<SourceLocation>,
}

impl TargetFailure {
    /// Raise a failure from a plain message, recording the caller as origin.
    #[must_use]
    #[track_caller]
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Error,
            message: message.into(),
            error: None,
            origin: Some(SourceLocation::caller()),
        }
    }

    /// Capture an error value returned by an implementation.
    #[must_use]
    pub fn from_error<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self::from_boxed(Box::new(error))
    }

    pub(crate) fn from_boxed(error: Box<dyn Error + Send + Sync>) -> Self {
        Self {
            kind: FailureKind::Error,
            message: error.to_string(),
            error: Some(Arc::from(error)),
            origin: None,
        }
    }

    pub(crate) fn from_panic(
        payload: &(dyn Any + Send),
        origin: Option<SourceLocation>,
    ) -> Self {
        Self {
            kind: FailureKind::Panic,
            message: panic_message(payload),
            error: None,
            origin,
        }
    }

    /// Whether the failure was returned or panicked.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Message of the original failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Where the failure was raised, when known.
    ///
    /// Panics record the panic site; [`TargetFailure::msg`] records its
    /// caller. Returned error values carry their own context instead.
    #[must_use]
    pub fn origin(&self) -> Option<&SourceLocation> {
        self.origin.as_ref()
    }

    /// The original error value, for failures raised by returning one.
    #[must_use]
    pub fn error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.error.as_deref()
    }

    /// Borrow the original error value as `E`.
    #[must_use]
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.error()?.downcast_ref::<E>()
    }
}

impl fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for TargetFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.error.as_deref()?.source()
    }
}

/// Several failures raised together by one implementation.
///
/// # Examples
///
/// ```
/// use rstest_bdd_bindings::{AggregateFailure, TargetFailure};
///
/// let aggregate = AggregateFailure::new([
///     TargetFailure::msg("first"),
///     TargetFailure::msg("second"),
/// ]);
/// assert_eq!(aggregate.len(), 2);
/// assert_eq!(aggregate.first().map(TargetFailure::message), Some("first"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AggregateFailure {
    failures: Vec<TargetFailure>,
}

impl AggregateFailure {
    /// Collect failures in the order they were recorded.
    #[must_use]
    pub fn new(failures: impl IntoIterator<Item = TargetFailure>) -> Self {
        Self {
            failures: failures.into_iter().collect(),
        }
    }

    /// Record another failure.
    pub fn push(&mut self, failure: TargetFailure) {
        self.failures.push(failure);
    }

    /// All recorded failures.
    #[must_use]
    pub fn failures(&self) -> &[TargetFailure] {
        &self.failures
    }

    /// The first recorded failure.
    #[must_use]
    pub fn first(&self) -> Option<&TargetFailure> {
        self.failures.first()
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether no failure was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn into_first(self) -> Option<TargetFailure> {
        self.failures.into_iter().next()
    }
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = localization::message_with_args("aggregate-failure", |args| {
            args.set("count", self.failures.len().to_string());
        });
        f.write_str(&message)
    }
}

impl Error for AggregateFailure {}

/// Failure raised across the dispatch boundary, before normalization.
#[derive(Debug)]
pub enum RaisedFailure {
    /// A single failure wrapping its original cause.
    Single(TargetFailure),
    /// Several failures raised together.
    Aggregate(AggregateFailure),
}

impl<E> From<E> for RaisedFailure
where
    E: Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        let boxed: Box<dyn Error + Send + Sync> = Box::new(error);
        let boxed = match boxed.downcast::<AggregateFailure>() {
            Ok(aggregate) => return Self::Aggregate(*aggregate),
            Err(other) => other,
        };
        let failure = boxed
            .downcast::<TargetFailure>()
            .map_or_else(TargetFailure::from_boxed, |failure| *failure);
        Self::Single(failure)
    }
}

/// A target failure annotated with the binding method that raised it.
///
/// The rendered message starts with a header naming the binding method and
/// its declaration site, followed by the original message on the next line.
#[derive(Debug, Clone)]
pub struct LocatedFailure {
    method: String,
    location: Option<SourceLocation>,
    cause: TargetFailure,
}

impl LocatedFailure {
    pub(crate) fn new(method: &MethodDescriptor, cause: TargetFailure) -> Self {
        Self {
            method: method.to_string(),
            location: method.location().cloned(),
            cause,
        }
    }

    /// Rendered description of the binding method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Declaration site of the binding method, when recorded.
    #[must_use]
    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    /// Header line identifying the binding.
    #[must_use]
    pub fn header(&self) -> String {
        localization::message_with_args("located-failure-header", |args| {
            args.set("method", self.method.clone());
            args.set(
                "has_location",
                if self.location.is_some() { "yes" } else { "no" }.to_string(),
            );
            args.set(
                "location",
                self.location
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            );
        })
    }

    /// The original failure, unchanged.
    #[must_use]
    pub fn cause(&self) -> &TargetFailure {
        &self.cause
    }

    /// Discard the binding context and return the original failure.
    #[must_use]
    pub fn into_cause(self) -> TargetFailure {
        self.cause
    }
}

impl fmt::Display for LocatedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.header(), self.cause)
    }
}

impl Error for LocatedFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}
