//! Method descriptors and type-erased arguments.
//!
//! A [`MethodDescriptor`] records everything the invoker needs to know about a
//! binding implementation without holding the implementation itself: the
//! declaring type, whether a receiver is required, the ordered parameter
//! types, the return type and the declaration site. Arguments travel as a
//! homogeneous sequence of [`Argument`] values that remember their concrete
//! type so they can be validated against the descriptor before dispatch.

use std::any::{Any, TypeId, type_name};
use std::borrow::Cow;
use std::fmt;
use std::panic::Location;

/// Value produced by a binding implementation.
pub type BindingValue = Box<dyn Any + Send>;

/// Runtime description of a Rust type used in a binding signature.
///
/// Descriptors built with [`TypeDescriptor::of`] carry a [`TypeId`] and only
/// accept arguments of exactly that type. Descriptors built with
/// [`TypeDescriptor::named`] carry a name only and accept any argument; they
/// describe parameters of dynamically declared entry points.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    name: Cow<'static, str>,
    id: Option<TypeId>,
}

impl TypeDescriptor {
    /// Describe the concrete type `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rstest_bdd_bindings::TypeDescriptor;
    ///
    /// let ty = TypeDescriptor::of::<u32>();
    /// assert_eq!(ty.name(), "u32");
    /// assert!(ty.accepts(std::any::TypeId::of::<u32>()));
    /// assert!(!ty.accepts(std::any::TypeId::of::<i64>()));
    /// ```
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            name: Cow::Borrowed(type_name::<T>()),
            id: Some(TypeId::of::<T>()),
        }
    }

    /// Describe a type by name alone.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    /// Human-readable type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Concrete [`TypeId`], when known.
    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        self.id
    }

    /// Whether a value with the given [`TypeId`] satisfies this descriptor.
    #[must_use]
    pub fn accepts(&self, id: TypeId) -> bool {
        self.id.is_none_or(|expected| expected == id)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Whether an implementation needs a bound receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "diagnostics", derive(serde::Serialize))]
pub enum MethodKind {
    /// Free function or associated function; called with the supplied
    /// arguments only.
    Static,
    /// Method on the declaring type; the invoker prepends the current bound
    /// instance of that type as a receiver slot.
    Instance,
}

/// Source position where a binding was declared or a failure was raised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    file: Cow<'static, str>,
    line: u32,
    column: u32,
}

impl SourceLocation {
    /// Construct a location from its parts.
    #[must_use]
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Capture the location of the caller.
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }

    /// Source file path.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// One-based line number.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// One-based column number.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }
}

impl From<&'static Location<'static>> for SourceLocation {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line(), location.column())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Signature and provenance of a binding implementation.
///
/// # Examples
///
/// ```
/// use rstest_bdd_bindings::{MethodDescriptor, MethodKind, TypeDescriptor};
///
/// struct Basket;
///
/// let method = MethodDescriptor::new(
///     TypeDescriptor::of::<Basket>(),
///     "add_apples",
///     MethodKind::Instance,
///     vec![TypeDescriptor::of::<u32>()],
///     TypeDescriptor::of::<()>(),
/// );
/// assert_eq!(method.arity(), 1);
/// assert_eq!(method.slot_count(), 2);
/// assert!(method.to_string().ends_with("Basket::add_apples(u32)"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    declaring_type: TypeDescriptor,
    name: Cow<'static, str>,
    kind: MethodKind,
    parameters: Vec<TypeDescriptor>,
    return_type: TypeDescriptor,
    location: Option<SourceLocation>,
}

impl MethodDescriptor {
    /// Describe a method without recording where it was declared.
    #[must_use]
    pub fn new(
        declaring_type: TypeDescriptor,
        name: impl Into<Cow<'static, str>>,
        kind: MethodKind,
        parameters: Vec<TypeDescriptor>,
        return_type: TypeDescriptor,
    ) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            kind,
            parameters,
            return_type,
            location: None,
        }
    }

    /// Attach the declaration site.
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Type that declares the implementation.
    #[must_use]
    pub fn declaring_type(&self) -> &TypeDescriptor {
        &self.declaring_type
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
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

    /// Declaration site, when recorded.
    #[must_use]
    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    /// Number of declared parameters, excluding any receiver.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Number of argument slots a call occupies, including the receiver of
    /// instance methods.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        match self.kind {
            MethodKind::Static => self.parameters.len(),
            MethodKind::Instance => self.parameters.len() + 1,
        }
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}(", self.declaring_type, self.name)?;
        for (index, parameter) in self.parameters.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{parameter}")?;
        }
        f.write_str(")")
    }
}

type Renderer = fn(&(dyn Any + Send)) -> Option<String>;

fn render_debug<T: Any + fmt::Debug>(value: &(dyn Any + Send)) -> Option<String> {
    value.downcast_ref::<T>().map(|value| format!("{value:?}"))
}

/// A single type-erased argument passed to a binding implementation.
///
/// Arguments built with [`Argument::new`] can render themselves for timing
/// traces; [`Argument::opaque`] accepts values without a `Debug` impl.
///
/// # Examples
///
/// ```
/// use rstest_bdd_bindings::Argument;
///
/// let argument = Argument::new(42_u32);
/// assert_eq!(argument.type_name(), "u32");
/// assert_eq!(argument.snapshot().rendered(), Some("42"));
/// assert_eq!(argument.downcast::<u32>().ok(), Some(42));
/// ```
pub struct Argument {
    value: BindingValue,
    type_name: &'static str,
    render: Option<Renderer>,
}

impl Argument {
    /// Wrap a value that can be rendered in timing traces.
    #[must_use]
    pub fn new<T: Any + Send + fmt::Debug>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
            render: Some(render_debug::<T>),
        }
    }

    /// Wrap a value that traces report by type name only.
    #[must_use]
    pub fn opaque<T: Any + Send>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
            render: None,
        }
    }

    /// Name of the wrapped value's type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// [`TypeId`] of the wrapped value.
    #[must_use]
    pub fn value_type_id(&self) -> TypeId {
        Any::type_id(&*self.value)
    }

    /// Borrow the wrapped value as `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Take the wrapped value as `T`, handing the argument back on mismatch.
    ///
    /// # Errors
    ///
    /// Returns the unchanged argument when it does not hold a `T`.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let Self {
            value,
            type_name,
            render,
        } = self;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self {
                value,
                type_name,
                render,
            }),
        }
    }

    /// Capture a printable summary of the argument.
    #[must_use]
    pub fn snapshot(&self) -> ArgumentSnapshot {
        ArgumentSnapshot {
            type_name: self.type_name,
            rendered: self.render.and_then(|render| render(self.value.as_ref())),
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("Argument")
            .field("type_name", &snapshot.type_name)
            .field("rendered", &snapshot.rendered)
            .finish()
    }
}

/// Printable summary of an [`Argument`], taken before the argument is moved
/// into a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSnapshot {
    type_name: &'static str,
    rendered: Option<String>,
}

impl ArgumentSnapshot {
    /// Name of the argument's type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// `Debug` rendering of the value, unless the argument was opaque.
    #[must_use]
    pub fn rendered(&self) -> Option<&str> {
        self.rendered.as_deref()
    }
}

impl fmt::Display for ArgumentSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(rendered) = self.rendered.as_deref() else {
            return write!(f, "<{}>", self.type_name);
        };
        f.write_str(rendered)
    }
}
