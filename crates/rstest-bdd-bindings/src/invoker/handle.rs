//! Resolved dispatch targets.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::error::{ArgumentMismatch, InvokeError};
use crate::entry::{DispatchError, EntryPoint};
use crate::failure::{AggregateFailure, RaisedFailure, TargetFailure};
use crate::method::{Argument, BindingValue, MethodDescriptor, MethodKind, TypeDescriptor};
use crate::panic_support::{install_location_hook, take_last_panic_location};

/// Most declared parameters a binding implementation may have, excluding the
/// receiver of instance methods.
pub const MAX_PARAMETERS: usize = 20;

/// A dispatch target resolved from a binding's entry point.
///
/// Resolution checks the parameter ceiling once; each dispatch then checks
/// the supplied slots against the declared parameter types.
#[derive(Clone)]
pub struct CallableHandle {
    kind: MethodKind,
    parameters: Vec<TypeDescriptor>,
    entry: EntryPoint,
}

impl CallableHandle {
    pub(crate) fn resolve(
        descriptor: &MethodDescriptor,
        entry: &EntryPoint,
    ) -> Result<Self, InvokeError> {
        let declared = entry.parameters().len();
        if declared > MAX_PARAMETERS {
            return Err(InvokeError::TooManyParameters {
                method: descriptor.to_string(),
                declared,
                limit: MAX_PARAMETERS,
            });
        }
        log::trace!("resolved callable handle for {descriptor}");
        Ok(Self {
            kind: entry.kind(),
            parameters: entry.parameters().to_vec(),
            entry: entry.clone(),
        })
    }

    /// Static or instance dispatch.
    #[must_use]
    pub const fn kind(&self) -> MethodKind {
        self.kind
    }

    /// Argument slots a call occupies, including any receiver.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        match self.kind {
            MethodKind::Static => self.parameters.len(),
            MethodKind::Instance => self.parameters.len() + 1,
        }
    }

    /// Validate the slots and call the implementation, capturing panics.
    pub(crate) fn dispatch(
        &self,
        arguments: Vec<Argument>,
    ) -> Result<Option<BindingValue>, DispatchError> {
        self.validate(&arguments)
            .map_err(DispatchError::ArgumentMismatch)?;
        install_location_hook();
        let _ = take_last_panic_location();
        let call = Arc::clone(self.entry.call());
        panic::catch_unwind(AssertUnwindSafe(move || call(arguments)))
            .unwrap_or_else(|payload| Err(DispatchError::Raised(raised_from_panic(payload))))
    }

    fn validate(&self, arguments: &[Argument]) -> Result<(), ArgumentMismatch> {
        let expected = self.slot_count();
        if arguments.len() != expected {
            return Err(ArgumentMismatch::Arity {
                expected,
                actual: arguments.len(),
            });
        }
        let offset = expected - self.parameters.len();
        for (position, (parameter, argument)) in self
            .parameters
            .iter()
            .zip(arguments.iter().skip(offset))
            .enumerate()
        {
            if !parameter.accepts(argument.value_type_id()) {
                return Err(ArgumentMismatch::Type {
                    position,
                    expected: parameter.name().to_owned(),
                    actual: argument.type_name().to_owned(),
                });
            }
        }
        Ok(())
    }
}

/// Panics carrying a failure value keep it; anything else becomes a panic failure.
fn raised_from_panic(payload: Box<dyn Any + Send>) -> RaisedFailure {
    let payload = match payload.downcast::<AggregateFailure>() {
        Ok(aggregate) => return RaisedFailure::Aggregate(*aggregate),
        Err(payload) => payload,
    };
    let failure = payload.downcast::<TargetFailure>().map_or_else(
        |payload| TargetFailure::from_panic(payload.as_ref(), take_last_panic_location()),
        |failure| *failure,
    );
    RaisedFailure::Single(failure)
}

impl fmt::Debug for CallableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableHandle")
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}
