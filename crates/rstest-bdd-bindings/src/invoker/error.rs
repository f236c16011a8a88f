//! Error types for binding invocation failures.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use i18n_embed::fluent::FluentLanguageLoader;

use crate::failure::LocatedFailure;
use crate::localization::{self, LocalizationError};

/// Why supplied argument slots do not fit a binding signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentMismatch {
    /// The number of slots differs from the signature.
    Arity {
        /// Slots the signature occupies, including any receiver.
        expected: usize,
        /// Slots supplied.
        actual: usize,
    },
    /// A slot holds a value of the wrong type.
    Type {
        /// Zero-based parameter position, excluding any receiver.
        position: usize,
        /// Declared parameter type.
        expected: String,
        /// Type of the supplied value.
        actual: String,
    },
    /// The receiver slot does not hold an instance of the declaring type.
    Receiver {
        /// Declaring type.
        expected: String,
    },
}

impl ArgumentMismatch {
    /// Render the mismatch using the provided Fluent loader.
    #[must_use]
    pub fn format_with_loader(&self, loader: &FluentLanguageLoader) -> String {
        match self {
            Self::Arity { expected, actual } => {
                localization::message_with_loader(loader, "argument-mismatch-arity", |args| {
                    args.set("expected", expected.to_string());
                    args.set("actual", actual.to_string());
                })
            }
            Self::Type {
                position,
                expected,
                actual,
            } => localization::message_with_loader(loader, "argument-mismatch-type", |args| {
                args.set("position", position.to_string());
                args.set("expected", expected.clone());
                args.set("actual", actual.clone());
            }),
            Self::Receiver { expected } => {
                localization::message_with_loader(loader, "argument-mismatch-receiver", |args| {
                    args.set("expected", expected.clone());
                })
            }
        }
    }
}

impl fmt::Display for ArgumentMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = localization::with_loader(|loader| self.format_with_loader(loader));
        f.write_str(&message)
    }
}

impl std::error::Error for ArgumentMismatch {}

/// Error type for binding invocation failures.
///
/// Configuration problems ([`Unresolvable`][Self::Unresolvable],
/// [`TooManyParameters`][Self::TooManyParameters],
/// [`MissingInstance`][Self::MissingInstance]) are reported before the
/// implementation runs. [`Target`][Self::Target] carries the failure the
/// implementation itself raised.
///
/// # Examples
///
/// ```
/// use rstest_bdd_bindings::InvokeError;
/// use rstest_bdd_bindings::localization::strip_directional_isolates;
///
/// let error = InvokeError::Unresolvable { binding: "Steps::missing()".into() };
/// assert!(error.is_configuration());
/// assert_eq!(
///     strip_directional_isolates(&error.to_string()),
///     "Binding Steps::missing() cannot be resolved to a callable implementation",
/// );
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum InvokeError {
    /// The binding has no callable entry point.
    Unresolvable {
        /// Rendered description of the binding method.
        binding: String,
    },
    /// The binding declares more parameters than dispatch supports.
    TooManyParameters {
        /// Rendered description of the binding method.
        method: String,
        /// Declared parameter count, excluding any receiver.
        declared: usize,
        /// Supported parameter count.
        limit: usize,
    },
    /// No bound instance of the declaring type was available.
    MissingInstance {
        /// Declaring type of the instance method.
        declaring_type: String,
        /// Rendered description of the binding method.
        method: String,
    },
    /// The supplied arguments do not fit the binding signature.
    ArgumentMismatch {
        /// Rendered description of the binding method.
        method: String,
        /// What did not fit.
        detail: ArgumentMismatch,
    },
    /// The feature language could not be applied around the call.
    Localization {
        /// Rendered description of the binding method.
        method: String,
        /// Underlying localization failure, wrapped in `Arc` for `Clone`.
        error: Arc<LocalizationError>,
    },
    /// The implementation raised an aggregate failure with no members.
    EmptyAggregate {
        /// Rendered description of the binding method.
        method: String,
    },
    /// The implementation failed.
    ///
    /// The located failure is boxed to keep `Result<T, InvokeError>` small.
    Target(Box<LocatedFailure>),
}

impl InvokeError {
    /// Whether the error was detected before the implementation ran.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Unresolvable { .. }
                | Self::TooManyParameters { .. }
                | Self::MissingInstance { .. }
        )
    }

    /// The implementation's own failure, if that is what this error carries.
    #[must_use]
    pub fn target(&self) -> Option<&LocatedFailure> {
        match self {
            Self::Target(failure) => Some(failure.as_ref()),
            _ => None,
        }
    }

    /// Render the error message using the provided Fluent loader.
    #[must_use]
    pub fn format_with_loader(&self, loader: &FluentLanguageLoader) -> String {
        match self {
            Self::Unresolvable { binding } => {
                localization::message_with_loader(loader, "invoke-error-unresolvable", |args| {
                    args.set("binding", binding.clone());
                })
            }
            Self::TooManyParameters {
                method,
                declared,
                limit,
            } => localization::message_with_loader(
                loader,
                "invoke-error-too-many-parameters",
                |args| {
                    args.set("method", method.clone());
                    args.set("declared", declared.to_string());
                    args.set("limit", limit.to_string());
                },
            ),
            Self::MissingInstance {
                declaring_type,
                method,
            } => localization::message_with_loader(
                loader,
                "invoke-error-missing-instance",
                |args| {
                    args.set("declaring_type", declaring_type.clone());
                    args.set("method", method.clone());
                },
            ),
            Self::ArgumentMismatch { method, detail } => localization::message_with_loader(
                loader,
                "invoke-error-argument-mismatch",
                |args| {
                    args.set("method", method.clone());
                    args.set("detail", detail.format_with_loader(loader));
                },
            ),
            Self::Localization { method, error } => {
                localization::message_with_loader(loader, "invoke-error-localization", |args| {
                    args.set("method", method.clone());
                    args.set("details", error.to_string());
                })
            }
            Self::EmptyAggregate { method } => {
                localization::message_with_loader(loader, "invoke-error-empty-aggregate", |args| {
                    args.set("method", method.clone());
                })
            }
            Self::Target(failure) => failure.to_string(),
        }
    }
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = localization::with_loader(|loader| self.format_with_loader(loader));
        f.write_str(&message)
    }
}

impl std::error::Error for InvokeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ArgumentMismatch { detail, .. } => Some(detail),
            Self::Localization { error, .. } => Some(error.as_ref()),
            Self::Target(failure) => Some(LocatedFailure::cause(failure)),
            _ => None,
        }
    }
}

/// A failed invocation together with the time it took.
///
/// Configuration errors detected before dispatch report a zero duration.
#[derive(Debug, Clone)]
pub struct InvocationError {
    error: InvokeError,
    duration: Duration,
}

impl InvocationError {
    pub(crate) const fn new(error: InvokeError, duration: Duration) -> Self {
        Self { error, duration }
    }

    /// The normalized failure.
    #[must_use]
    pub fn error(&self) -> &InvokeError {
        &self.error
    }

    /// Time spent in the invocation before it failed.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Discard the duration.
    #[must_use]
    pub fn into_error(self) -> InvokeError {
        self.error
    }
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for InvocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
