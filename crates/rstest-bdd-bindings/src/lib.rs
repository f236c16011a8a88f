//! Binding registry, invoker and result collector for `rstest-bdd`.
//!
//! This crate is the execution core that sits between binding discovery and
//! scenario reporting:
//!
//! - [`BindingRegistry`] catalogues step definitions, lifecycle hooks and
//!   step argument transformations once discovery has found them.
//! - [`BindingInvoker`] calls the implementation behind a binding with
//!   type-erased [`Argument`]s, scoping the feature language around the call,
//!   timing it and turning failures into [`InvokeError`]s that still carry
//!   the original cause.
//! - [`ResultCollector`] records the terminal status of every executed
//!   scenario and summarizes them as a [`TestRunResult`].
//!
//! Implementations are ordinary Rust closures or functions of up to
//! [`MAX_PARAMETERS`] parameters:
//!
//! ```
//! use rstest_bdd_bindings::{
//!     Argument, BindingInvoker, BindingMethod, LogTracer, ScenarioContext,
//!     StepDefinitionBinding, StepDefinitionType,
//! };
//!
//! struct Basket {
//!     apples: u32,
//! }
//!
//! let step = StepDefinitionBinding::new(
//!     StepDefinitionType::Then,
//!     "the basket holds {n} apples",
//!     BindingMethod::instance::<Basket, _, _>("holds", |basket: &Basket, n: u32| {
//!         assert_eq!(basket.apples, n);
//!     }),
//! );
//!
//! let mut context = ScenarioContext::default();
//! context.bind(Basket { apples: 3 });
//!
//! let invoker = BindingInvoker::default();
//! assert!(invoker
//!     .invoke(&step, &context, vec![Argument::new(3_u32)], &LogTracer)
//!     .is_ok());
//! assert!(invoker
//!     .invoke(&step, &context, vec![Argument::new(4_u32)], &LogTracer)
//!     .is_err());
//! ```

mod binding;
mod config;
mod context;
mod entry;
mod failure;
pub mod invoker;
pub mod localization;
mod method;
mod panic_support;
pub mod registry;
pub mod results;
mod types;

pub use binding::{
    Binding, BindingMethod, DEFAULT_HOOK_ORDER, HookBinding, MethodBinding,
    StepArgumentTransformationBinding, StepDefinitionBinding,
};
pub use config::{ConfigError, InvokerConfig, MIN_TRACED_MS_ENV, TRACE_TIMINGS_ENV};
pub use context::{BoundInstance, ContextAccessor, FeatureContext, ScenarioContext};
pub use entry::{BindingReturn, EntryPoint, IntoInstanceEntry, IntoStaticEntry, Returned};
pub use failure::{AggregateFailure, FailureKind, LocatedFailure, RaisedFailure, TargetFailure};
pub use i18n_embed::fluent::FluentLanguageLoader;
pub use invoker::{
    ArgumentMismatch, BindingInvoker, BindingTracer, CallableHandle, Clock, Invocation,
    InvocationError, InvokeError, LogTracer, MAX_PARAMETERS, NoopTracer, ProcessClock,
};
pub use localization::{
    LocalizationError, Localizations, ScopedLocalization, current_languages,
    install_localization_loader, select_localizations, strip_directional_isolates,
};
pub use method::{
    Argument, ArgumentSnapshot, BindingValue, MethodDescriptor, MethodKind, SourceLocation,
    TypeDescriptor,
};
pub use panic_support::panic_message;
pub use registry::BindingRegistry;
pub use results::{
    CollectError, NotStarted, ResultCollector, ScenarioInfo, TestResult, TestRunResult,
};
pub use types::{HookType, StepDefinitionType, TagParseError};
