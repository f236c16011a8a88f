//! Type-erased entry points for binding implementations.
//!
//! Ordinary Rust closures and functions of up to twenty parameters convert
//! into an [`EntryPoint`] through [`IntoStaticEntry`] or, when they take the
//! declaring type as a leading `&T` receiver, [`IntoInstanceEntry`]. The
//! conversion records the parameter and return types and wraps the callable
//! in a closure that accepts a homogeneous `Vec<Argument>`, so the invoker
//! needs no per-signature code.
//!
//! Entry points whose signature is only known at runtime are declared with
//! [`EntryPoint::dynamic`].

use std::any::{Any, TypeId};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::context::BoundInstance;
use crate::failure::RaisedFailure;
use crate::invoker::ArgumentMismatch;
use crate::method::{Argument, BindingValue, MethodKind, TypeDescriptor};

/// Failure observed at the dispatch boundary.
#[derive(Debug)]
pub(crate) enum DispatchError {
    /// The argument slots did not fit the declared signature.
    ArgumentMismatch(ArgumentMismatch),
    /// The implementation itself failed.
    Raised(RaisedFailure),
}

pub(crate) type ErasedCall =
    dyn Fn(Vec<Argument>) -> Result<Option<BindingValue>, DispatchError> + Send + Sync;

/// A callable binding implementation together with its signature.
///
/// # Examples
///
/// ```
/// use rstest_bdd_bindings::{EntryPoint, MethodKind};
///
/// let entry = EntryPoint::function(|apples: u32, pears: u32| apples + pears);
/// assert_eq!(entry.kind(), MethodKind::Static);
/// assert_eq!(entry.parameters().len(), 2);
/// assert_eq!(entry.return_type().name(), "u32");
/// ```
#[derive(Clone)]
pub struct EntryPoint {
    kind: MethodKind,
    parameters: Vec<TypeDescriptor>,
    return_type: TypeDescriptor,
    call: Arc<ErasedCall>,
}

impl EntryPoint {
    /// Erase a free function or closure.
    #[must_use]
    pub fn function<Marker, F>(implementation: F) -> Self
    where
        F: IntoStaticEntry<Marker>,
    {
        implementation.into_entry()
    }

    /// Erase a method whose first parameter is `&T`, the declaring type.
    #[must_use]
    pub fn method<T, Marker, F>(implementation: F) -> Self
    where
        F: IntoInstanceEntry<T, Marker>,
    {
        implementation.into_entry()
    }

    /// Declare an entry point whose signature is only known at runtime.
    ///
    /// The declared `parameters` are validated before `call` runs. Instance
    /// entry points receive the bound instance in the first slot as a
    /// [`BoundInstance`].
    #[must_use]
    pub fn dynamic<F>(
        kind: MethodKind,
        parameters: Vec<TypeDescriptor>,
        return_type: TypeDescriptor,
        call: F,
    ) -> Self
    where
        F: Fn(Vec<Argument>) -> Result<Option<BindingValue>, RaisedFailure>
            + Send
            + Sync
            + 'static,
    {
        Self::erased(kind, parameters, return_type, move |arguments| {
            call(arguments).map_err(DispatchError::Raised)
        })
    }

    fn erased<F>(
        kind: MethodKind,
        parameters: Vec<TypeDescriptor>,
        return_type: TypeDescriptor,
        call: F,
    ) -> Self
    where
        F: Fn(Vec<Argument>) -> Result<Option<BindingValue>, DispatchError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            kind,
            parameters,
            return_type,
            call: Arc::new(call),
        }
    }

    /// Static or instance implementation.
    #[must_use]
    pub const fn kind(&self) -> MethodKind {
        self.kind
    }

    /// Declared parameter types, excluding any receiver.
    #[must_use]
    pub fn parameters(&self) -> &[TypeDescriptor] {
        &self.parameters
    }

    /// Declared return type.
    #[must_use]
    pub fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    pub(crate) fn call(&self) -> &Arc<ErasedCall> {
        &self.call
    }

    pub(crate) fn same_callable(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.call, &other.call)
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

/// Conversion of a callable without receiver into an [`EntryPoint`].
///
/// `Marker` is the callable's `fn` signature; it only disambiguates the
/// per-arity implementations.
pub trait IntoStaticEntry<Marker>: Send + Sync + 'static {
    /// Erase the callable.
    fn into_entry(self) -> EntryPoint;
}

/// Conversion of a callable taking `&T` first into an instance [`EntryPoint`].
pub trait IntoInstanceEntry<T, Marker>: Send + Sync + 'static {
    /// Erase the callable.
    fn into_entry(self) -> EntryPoint;
}

/// Return values a binding implementation may produce.
///
/// `()` produces no value. `Result<T, E>` produces `T` or raises `E`, with
/// `Result<(), E>` producing no value on success. Common owned types are
/// returned as-is; wrap anything else in [`Returned`].
pub trait BindingReturn: 'static {
    /// Descriptor of the value type produced on success.
    fn return_type() -> TypeDescriptor;

    /// Split the return value into a produced value or a raised failure.
    ///
    /// # Errors
    ///
    /// Returns the failure an implementation raised by returning `Err`.
    fn into_outcome(self) -> Result<Option<BindingValue>, RaisedFailure>;
}

fn produced<T: Any + Send>(value: T) -> Option<BindingValue> {
    if TypeId::of::<T>() == TypeId::of::<()>() {
        None
    } else {
        Some(Box::new(value))
    }
}

impl BindingReturn for () {
    fn return_type() -> TypeDescriptor {
        TypeDescriptor::of::<()>()
    }

    fn into_outcome(self) -> Result<Option<BindingValue>, RaisedFailure> {
        Ok(None)
    }
}

impl<T, E> BindingReturn for Result<T, E>
where
    T: Any + Send,
    E: Error + Send + Sync + 'static,
{
    fn return_type() -> TypeDescriptor {
        TypeDescriptor::of::<T>()
    }

    fn into_outcome(self) -> Result<Option<BindingValue>, RaisedFailure> {
        self.map(produced).map_err(RaisedFailure::from)
    }
}

/// Wrapper returning an arbitrary value from a binding implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Returned<T>(pub T);

impl<T: Any + Send> BindingReturn for Returned<T> {
    fn return_type() -> TypeDescriptor {
        TypeDescriptor::of::<T>()
    }

    fn into_outcome(self) -> Result<Option<BindingValue>, RaisedFailure> {
        Ok(produced(self.0))
    }
}

macro_rules! plain_returns {
    ($($ty:ty),* $(,)?) => {
        $(
            impl BindingReturn for $ty {
                fn return_type() -> TypeDescriptor {
                    TypeDescriptor::of::<$ty>()
                }

                fn into_outcome(self) -> Result<Option<BindingValue>, RaisedFailure> {
                    Ok(produced(self))
                }
            }
        )*
    };
}

plain_returns!(
    bool, char, String, &'static str, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128,
    isize, f32, f64,
);

impl<T: Any + Send> BindingReturn for Vec<T> {
    fn return_type() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
    }

    fn into_outcome(self) -> Result<Option<BindingValue>, RaisedFailure> {
        Ok(produced(self))
    }
}

impl<T: Any + Send> BindingReturn for Option<T> {
    fn return_type() -> TypeDescriptor {
        TypeDescriptor::of::<Self>()
    }

    fn into_outcome(self) -> Result<Option<BindingValue>, RaisedFailure> {
        Ok(produced(self))
    }
}

/// Argument slots being unpacked for one typed call.
struct Slots {
    inner: std::vec::IntoIter<Argument>,
    expected: usize,
    position: usize,
}

impl Slots {
    fn new(arguments: Vec<Argument>, expected: usize) -> Result<Self, DispatchError> {
        if arguments.len() != expected {
            return Err(DispatchError::ArgumentMismatch(ArgumentMismatch::Arity {
                expected,
                actual: arguments.len(),
            }));
        }
        Ok(Self {
            inner: arguments.into_iter(),
            expected,
            position: 0,
        })
    }

    fn receiver(&mut self) -> Result<BoundInstance, DispatchError> {
        let argument = self.inner.next().ok_or(DispatchError::ArgumentMismatch(
            ArgumentMismatch::Arity {
                expected: self.expected,
                actual: 0,
            },
        ))?;
        argument.downcast::<BoundInstance>().map_err(|_| {
            DispatchError::ArgumentMismatch(ArgumentMismatch::Receiver {
                expected: "bound instance".to_owned(),
            })
        })
    }

    fn take<T: Any>(&mut self) -> Result<T, DispatchError> {
        let position = self.position;
        self.position += 1;
        let argument = self.inner.next().ok_or(DispatchError::ArgumentMismatch(
            ArgumentMismatch::Arity {
                expected: self.expected,
                actual: position,
            },
        ))?;
        argument.downcast::<T>().map_err(|argument| {
            DispatchError::ArgumentMismatch(ArgumentMismatch::Type {
                position,
                expected: std::any::type_name::<T>().to_owned(),
                actual: argument.type_name().to_owned(),
            })
        })
    }

    fn finish(&mut self) -> Result<(), DispatchError> {
        let leftover = self.inner.len();
        if leftover == 0 {
            Ok(())
        } else {
            Err(DispatchError::ArgumentMismatch(ArgumentMismatch::Arity {
                expected: self.expected,
                actual: self.expected + leftover,
            }))
        }
    }
}

fn receiver_of<T: Any>(instance: &BoundInstance) -> Result<&T, DispatchError> {
    instance.downcast_ref::<T>().ok_or_else(|| {
        DispatchError::ArgumentMismatch(ArgumentMismatch::Receiver {
            expected: std::any::type_name::<T>().to_owned(),
        })
    })
}

macro_rules! typed_entries {
    ($($ty:ident $var:ident),*) => {
        impl<Func, Ret, $($ty,)*> IntoStaticEntry<fn($($ty,)*) -> Ret> for Func
        where
            Func: Fn($($ty),*) -> Ret + Send + Sync + 'static,
            Ret: BindingReturn,
            $($ty: Any + Send,)*
        {
            fn into_entry(self) -> EntryPoint {
                let parameters = vec![$(TypeDescriptor::of::<$ty>()),*];
                let expected = parameters.len();
                EntryPoint::erased(
                    MethodKind::Static,
                    parameters,
                    Ret::return_type(),
                    move |arguments| {
                        let mut slots = Slots::new(arguments, expected)?;
                        $(let $var = slots.take::<$ty>()?;)*
                        slots.finish()?;
                        (self)($($var),*)
                            .into_outcome()
                            .map_err(DispatchError::Raised)
                    },
                )
            }
        }

        impl<Recv, Func, Ret, $($ty,)*> IntoInstanceEntry<Recv, fn(&Recv, $($ty,)*) -> Ret>
            for Func
        where
            Recv: Any + Send + Sync,
            Func: Fn(&Recv, $($ty),*) -> Ret + Send + Sync + 'static,
            Ret: BindingReturn,
            $($ty: Any + Send,)*
        {
            fn into_entry(self) -> EntryPoint {
                let parameters = vec![$(TypeDescriptor::of::<$ty>()),*];
                let expected = parameters.len() + 1;
                EntryPoint::erased(
                    MethodKind::Instance,
                    parameters,
                    Ret::return_type(),
                    move |arguments| {
                        let mut slots = Slots::new(arguments, expected)?;
                        let instance = slots.receiver()?;
                        let receiver = receiver_of::<Recv>(&instance)?;
                        $(let $var = slots.take::<$ty>()?;)*
                        slots.finish()?;
                        (self)(receiver, $($var),*)
                            .into_outcome()
                            .map_err(DispatchError::Raised)
                    },
                )
            }
        }
    };
}

macro_rules! typed_entries_up_to {
    () => {
        typed_entries!();
    };
    ($head_ty:ident $head_var:ident $(, $ty:ident $var:ident)*) => {
        typed_entries!($head_ty $head_var $(, $ty $var)*);
        typed_entries_up_to!($($ty $var),*);
    };
}

typed_entries_up_to!(
    A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8, A9 a9, A10 a10,
    A11 a11, A12 a12, A13 a13, A14 a14, A15 a15, A16 a16, A17 a17, A18 a18, A19 a19, A20 a20
);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter {
        start: u32,
    }

    fn dispatch(
        entry: &EntryPoint,
        arguments: Vec<Argument>,
    ) -> Result<Option<BindingValue>, DispatchError> {
        (entry.call())(arguments)
    }

    #[test]
    fn static_entry_records_signature_and_calls_through() {
        let entry = EntryPoint::function(|left: u32, right: String| format!("{left}-{right}"));
        assert_eq!(
            entry.parameters(),
            [TypeDescriptor::of::<u32>(), TypeDescriptor::of::<String>()]
        );
        let arguments = vec![Argument::new(3_u32), Argument::new(String::from("x"))];
        let Ok(Some(value)) = dispatch(&entry, arguments) else {
            panic!("call should produce a value");
        };
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("3-x"));
    }

    #[test]
    fn unit_results_produce_no_value() {
        let entry = EntryPoint::function(|| -> Result<(), std::fmt::Error> { Ok(()) });
        assert!(matches!(dispatch(&entry, Vec::new()), Ok(None)));
    }

    #[test]
    fn wrong_argument_type_is_reported_by_position() {
        let entry = EntryPoint::function(|_: u8, _: u16| ());
        let outcome = dispatch(&entry, vec![Argument::new(1_u8), Argument::new(2_u32)]);
        let Err(DispatchError::ArgumentMismatch(ArgumentMismatch::Type {
            position, actual, ..
        })) = outcome
        else {
            panic!("expected a type mismatch, got {outcome:?}");
        };
        assert_eq!(position, 1);
        assert_eq!(actual, "u32");
    }

    #[test]
    fn instance_entry_borrows_the_receiver() {
        let entry = EntryPoint::method(|counter: &Counter, step: u32| counter.start + step);
        assert_eq!(entry.kind(), MethodKind::Instance);
        let instance: BoundInstance = Arc::new(Counter { start: 40 });
        let outcome = dispatch(&entry, vec![Argument::opaque(instance), Argument::new(2_u32)]);
        let Ok(Some(value)) = outcome else {
            panic!("call should produce a value");
        };
        assert_eq!(value.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn instance_entry_rejects_foreign_receiver() {
        let entry = EntryPoint::method(|counter: &Counter| counter.start);
        let instance: BoundInstance = Arc::new(String::from("not a counter"));
        let outcome = dispatch(&entry, vec![Argument::opaque(instance)]);
        assert!(matches!(
            outcome,
            Err(DispatchError::ArgumentMismatch(ArgumentMismatch::Receiver { .. }))
        ));
    }

    #[test]
    fn twenty_parameters_are_supported() {
        #[expect(clippy::too_many_arguments, reason = "exercises the widest supported arity")]
        fn widest(
            a: u8,
            b: u8,
            c: u8,
            d: u8,
            e: u8,
            f: u8,
            g: u8,
            h: u8,
            i: u8,
            j: u8,
            k: u8,
            l: u8,
            m: u8,
            n: u8,
            o: u8,
            p: u8,
            q: u8,
            r: u8,
            s: u8,
            t: u8,
        ) -> u32 {
            [a, b, c, d, e, f, g, h, i, j, k, l, m, n, o, p, q, r, s, t]
                .into_iter()
                .map(u32::from)
                .sum()
        }
        let entry = EntryPoint::function(widest);
        assert_eq!(entry.parameters().len(), 20);
        let arguments = (0..20).map(|_| Argument::new(1_u8)).collect();
        let Ok(Some(value)) = dispatch(&entry, arguments) else {
            panic!("call should produce a value");
        };
        assert_eq!(value.downcast_ref::<u32>(), Some(&20));
    }

    #[test]
    fn returned_errors_become_raised_failures() {
        let entry = EntryPoint::function(|text: String| text.parse::<u32>());
        let outcome = dispatch(&entry, vec![Argument::new(String::from("many"))]);
        assert!(matches!(
            outcome,
            Err(DispatchError::Raised(RaisedFailure::Single(_)))
        ));
    }
}
