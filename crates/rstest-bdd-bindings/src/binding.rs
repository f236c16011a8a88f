//! Binding descriptors for step definitions, hooks and argument transformations.
//!
//! Every binding points at a [`BindingMethod`]: the descriptor of the
//! implementation plus, when one was supplied, its type-erased
//! [`EntryPoint`]. The callable handle derived from the entry point is
//! memoized on the method and shared by every clone of the binding.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::entry::{EntryPoint, IntoInstanceEntry, IntoStaticEntry};
use crate::invoker::{CallableHandle, InvokeError};
use crate::method::{MethodDescriptor, SourceLocation, TypeDescriptor};
use crate::types::{HookType, StepDefinitionType};

/// Hook order used when a hook does not request one.
pub const DEFAULT_HOOK_ORDER: i32 = 10_000;

/// A binding implementation: its descriptor and, if resolvable, its entry point.
#[derive(Clone)]
pub struct BindingMethod {
    descriptor: Arc<MethodDescriptor>,
    entry: Option<EntryPoint>,
    handle: Arc<OnceLock<CallableHandle>>,
}

impl BindingMethod {
    /// Bind a free function declared on `D`, recording the caller as the
    /// declaration site.
    ///
    /// # Examples
    ///
    /// ```
    /// use rstest_bdd_bindings::BindingMethod;
    ///
    /// struct BasketSteps;
    ///
    /// let method = BindingMethod::static_fn::<BasketSteps, _, _>("add", |n: u32| n + 1);
    /// assert!(method.descriptor().to_string().ends_with("BasketSteps::add(u32)"));
    /// assert!(method.descriptor().location().is_some());
    /// ```
    #[must_use]
    #[track_caller]
    pub fn static_fn<D, Marker, F>(name: &'static str, implementation: F) -> Self
    where
        D: Any,
        F: IntoStaticEntry<Marker>,
    {
        Self::new(
            TypeDescriptor::of::<D>(),
            name,
            EntryPoint::function(implementation),
        )
    }

    /// Bind a method on `T`, called with the bound instance of `T` as receiver.
    #[must_use]
    #[track_caller]
    pub fn instance<T, Marker, F>(name: &'static str, implementation: F) -> Self
    where
        T: Any,
        F: IntoInstanceEntry<T, Marker>,
    {
        Self::new(
            TypeDescriptor::of::<T>(),
            name,
            EntryPoint::method(implementation),
        )
    }

    /// Bind an arbitrary entry point, deriving the descriptor from its signature.
    #[must_use]
    #[track_caller]
    pub fn new(declaring_type: TypeDescriptor, name: &'static str, entry: EntryPoint) -> Self {
        let descriptor = MethodDescriptor::new(
            declaring_type,
            name,
            entry.kind(),
            entry.parameters().to_vec(),
            entry.return_type().clone(),
        )
        .with_location(SourceLocation::caller());
        Self {
            descriptor: Arc::new(descriptor),
            entry: Some(entry),
            handle: Arc::new(OnceLock::new()),
        }
    }

    /// A method known only by its descriptor; invoking it fails as unresolvable.
    #[must_use]
    pub fn unresolved(descriptor: MethodDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            entry: None,
            handle: Arc::new(OnceLock::new()),
        }
    }

    /// Descriptor of the implementation.
    #[must_use]
    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    /// Entry point of the implementation, if one was supplied.
    #[must_use]
    pub fn entry(&self) -> Option<&EntryPoint> {
        self.entry.as_ref()
    }

    /// Whether the callable handle has already been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.handle.get().is_some()
    }

    /// Resolve the callable handle, reusing the memoized one when present.
    ///
    /// Resolution failures are not memoized; concurrent first calls may both
    /// compute a handle, and whichever is stored first is kept.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Unresolvable`] when no entry point was supplied
    /// and [`InvokeError::TooManyParameters`] when its signature exceeds the
    /// supported parameter count.
    pub fn handle(&self) -> Result<&CallableHandle, InvokeError> {
        if let Some(handle) = self.handle.get() {
            return Ok(handle);
        }
        let entry = self
            .entry
            .as_ref()
            .ok_or_else(|| InvokeError::Unresolvable {
                binding: self.descriptor.to_string(),
            })?;
        let handle = CallableHandle::resolve(&self.descriptor, entry)?;
        Ok(self.handle.get_or_init(move || handle))
    }
}

impl PartialEq for BindingMethod {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor
            && match (&self.entry, &other.entry) {
                (Some(left), Some(right)) => left.same_callable(right),
                (None, None) => true,
                _ => false,
            }
    }
}

impl Eq for BindingMethod {}

impl fmt::Debug for BindingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingMethod")
            .field("descriptor", &self.descriptor)
            .field("resolvable", &self.entry.is_some())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl fmt::Display for BindingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.descriptor, f)
    }
}

/// Anything that can be invoked through a [`BindingMethod`].
pub trait MethodBinding {
    /// The implementation behind the binding.
    fn method(&self) -> &BindingMethod;
}

impl MethodBinding for BindingMethod {
    fn method(&self) -> &BindingMethod {
        self
    }
}

/// A step definition: keyword class, matching expression and implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinitionBinding {
    step_type: StepDefinitionType,
    expression: String,
    method: BindingMethod,
}

impl StepDefinitionBinding {
    /// Declare a step definition.
    ///
    /// The expression is opaque here; matching it against step text is the
    /// job of the step matcher.
    #[must_use]
    pub fn new(
        step_type: StepDefinitionType,
        expression: impl Into<String>,
        method: BindingMethod,
    ) -> Self {
        Self {
            step_type,
            expression: expression.into(),
            method,
        }
    }

    /// Keyword class the step answers to.
    #[must_use]
    pub const fn step_type(&self) -> StepDefinitionType {
        self.step_type
    }

    /// Matching expression.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl MethodBinding for StepDefinitionBinding {
    fn method(&self) -> &BindingMethod {
        &self.method
    }
}

/// A lifecycle hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookBinding {
    hook_type: HookType,
    order: i32,
    method: BindingMethod,
}

impl HookBinding {
    /// Declare a hook with the default order.
    #[must_use]
    pub fn new(hook_type: HookType, method: BindingMethod) -> Self {
        Self {
            hook_type,
            order: DEFAULT_HOOK_ORDER,
            method,
        }
    }

    /// Override the order; lower values run first.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Lifecycle point the hook runs at.
    #[must_use]
    pub const fn hook_type(&self) -> HookType {
        self.hook_type
    }

    /// Relative order among hooks of the same type.
    #[must_use]
    pub const fn order(&self) -> i32 {
        self.order
    }
}

impl MethodBinding for HookBinding {
    fn method(&self) -> &BindingMethod {
        &self.method
    }
}

/// A conversion from step text to a typed step argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepArgumentTransformationBinding {
    expression: Option<String>,
    method: BindingMethod,
}

impl StepArgumentTransformationBinding {
    /// Declare a transformation applying to every argument of its target type.
    #[must_use]
    pub fn new(method: BindingMethod) -> Self {
        Self {
            expression: None,
            method,
        }
    }

    /// Restrict the transformation to text matching `expression`.
    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Matching expression, if the transformation is restricted.
    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }
}

impl MethodBinding for StepArgumentTransformationBinding {
    fn method(&self) -> &BindingMethod {
        &self.method
    }
}

/// Any registered binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// A step definition.
    StepDefinition(StepDefinitionBinding),
    /// A lifecycle hook.
    Hook(HookBinding),
    /// A step argument transformation.
    StepArgumentTransformation(StepArgumentTransformationBinding),
}

impl MethodBinding for Binding {
    fn method(&self) -> &BindingMethod {
        match self {
            Self::StepDefinition(binding) => binding.method(),
            Self::Hook(binding) => binding.method(),
            Self::StepArgumentTransformation(binding) => binding.method(),
        }
    }
}

impl From<StepDefinitionBinding> for Binding {
    fn from(binding: StepDefinitionBinding) -> Self {
        Self::StepDefinition(binding)
    }
}

impl From<HookBinding> for Binding {
    fn from(binding: HookBinding) -> Self {
        Self::Hook(binding)
    }
}

impl From<StepArgumentTransformationBinding> for Binding {
    fn from(binding: StepArgumentTransformationBinding) -> Self {
        Self::StepArgumentTransformation(binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodKind;

    struct Hooks;

    fn reset() {}

    #[test]
    fn clones_share_identity_and_memo() {
        let method = BindingMethod::static_fn::<Hooks, _, _>("reset", reset);
        let copy = method.clone();
        assert_eq!(method, copy);
        assert!(!copy.is_resolved());
        assert!(method.handle().is_ok());
        assert!(copy.is_resolved());
    }

    #[test]
    fn separately_built_methods_differ() {
        let first = BindingMethod::static_fn::<Hooks, _, _>("reset", reset);
        let second = BindingMethod::static_fn::<Hooks, _, _>("reset", reset);
        assert_ne!(first, second);
    }

    #[test]
    fn unresolved_method_reports_its_name() {
        let descriptor = MethodDescriptor::new(
            TypeDescriptor::named("Hooks"),
            "missing",
            MethodKind::Static,
            Vec::new(),
            TypeDescriptor::of::<()>(),
        );
        let method = BindingMethod::unresolved(descriptor);
        let Err(InvokeError::Unresolvable { binding }) = method.handle() else {
            panic!("unresolved methods must not produce a handle");
        };
        assert_eq!(binding, "Hooks::missing()");
        assert!(!method.is_resolved());
    }

    #[test]
    fn hooks_default_to_standard_order() {
        let method = BindingMethod::static_fn::<Hooks, _, _>("reset", reset);
        let hook = HookBinding::new(HookType::BeforeScenario, method.clone());
        assert_eq!(hook.order(), DEFAULT_HOOK_ORDER);
        assert_eq!(hook.clone().with_order(5).order(), 5);
        let binding = Binding::from(hook);
        assert_eq!(binding.method(), &method);
    }
}
