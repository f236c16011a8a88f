//! Binding catalogue populated during discovery and queried during execution.
//!
//! Discovery registers every binding through the `register_*` methods on a
//! single thread, then calls [`BindingRegistry::mark_ready`]. From then on the
//! registry is treated as an immutable snapshot: it can be shared behind an
//! `Arc` or installed once as the process-wide registry with
//! [`install_global`]. Readiness is advisory; late registrations are accepted
//! and logged.

use std::sync::OnceLock;

use hashbrown::HashMap;

use crate::binding::{
    HookBinding, MethodBinding, StepArgumentTransformationBinding, StepDefinitionBinding,
};
use crate::types::{HookType, StepDefinitionType};

#[cfg(feature = "diagnostics")]
mod diagnostics;

static GLOBAL_REGISTRY: OnceLock<BindingRegistry> = OnceLock::new();

/// Catalogue of step definitions, hooks and argument transformations.
///
/// # Examples
///
/// ```
/// use rstest_bdd_bindings::{
///     BindingMethod, BindingRegistry, HookBinding, HookType, StepDefinitionBinding,
///     StepDefinitionType,
/// };
///
/// struct Steps;
///
/// let mut registry = BindingRegistry::new();
/// let method = BindingMethod::static_fn::<Steps, _, _>("start", || ());
/// let hook = HookBinding::new(HookType::BeforeScenario, method.clone());
/// registry.register_hook(hook.clone());
/// registry.register_hook(hook);
/// registry.register_step_definition(StepDefinitionBinding::new(
///     StepDefinitionType::Given,
///     "a started engine",
///     method,
/// ));
/// registry.mark_ready();
///
/// assert_eq!(registry.hooks_of(HookType::BeforeScenario).len(), 1);
/// assert!(registry.hooks_of(HookType::AfterScenario).is_empty());
/// assert_eq!(registry.step_definitions().len(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct BindingRegistry {
    step_definitions: Vec<StepDefinitionBinding>,
    hooks: HashMap<HookType, Vec<HookBinding>>,
    transformations: Vec<StepArgumentTransformationBinding>,
    ready: bool,
}

impl BindingRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step definition. Equal definitions are kept.
    pub fn register_step_definition(&mut self, binding: StepDefinitionBinding) {
        self.warn_if_ready("step definition");
        log::debug!(
            "registered {} step definition {:?} -> {}",
            binding.step_type(),
            binding.expression(),
            binding.method()
        );
        self.step_definitions.push(binding);
    }

    /// Append a hook unless an equal hook is already registered for its type.
    pub fn register_hook(&mut self, binding: HookBinding) {
        self.warn_if_ready("hook");
        let hooks = self.hooks.entry(binding.hook_type()).or_default();
        if hooks.contains(&binding) {
            log::trace!(
                "ignored duplicate {} hook {}",
                binding.hook_type(),
                binding.method()
            );
            return;
        }
        log::debug!(
            "registered {} hook {}",
            binding.hook_type(),
            binding.method()
        );
        hooks.push(binding);
    }

    /// Append a step argument transformation. Equal transformations are kept.
    pub fn register_step_argument_transformation(
        &mut self,
        binding: StepArgumentTransformationBinding,
    ) {
        self.warn_if_ready("step argument transformation");
        log::debug!(
            "registered step argument transformation {}",
            binding.method()
        );
        self.transformations.push(binding);
    }

    /// Every step definition in registration order.
    #[must_use]
    pub fn step_definitions(&self) -> &[StepDefinitionBinding] {
        &self.step_definitions
    }

    /// Step definitions of `step_type`, in registration order.
    ///
    /// `step_text` is accepted for matchers that want to narrow the candidate
    /// set; it currently has no effect and every definition of the requested
    /// type is returned.
    #[must_use]
    pub fn considered_step_definitions(
        &self,
        step_type: StepDefinitionType,
        step_text: &str,
    ) -> Vec<&StepDefinitionBinding> {
        let _ = step_text;
        self.step_definitions
            .iter()
            .filter(|binding| binding.step_type() == step_type)
            .collect()
    }

    /// Every hook, grouped by type in lifecycle order and in registration
    /// order within each type.
    #[must_use]
    pub fn hooks(&self) -> Vec<&HookBinding> {
        HookType::ALL
            .into_iter()
            .flat_map(|hook_type| self.hooks_of(hook_type))
            .collect()
    }

    /// Hooks of `hook_type` in registration order; empty when none were
    /// registered.
    #[must_use]
    pub fn hooks_of(&self, hook_type: HookType) -> &[HookBinding] {
        self.hooks
            .get(&hook_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Hooks of `hook_type` sorted by ascending order, registration order
    /// breaking ties.
    #[must_use]
    pub fn hooks_in_order(&self, hook_type: HookType) -> Vec<&HookBinding> {
        let mut hooks: Vec<&HookBinding> = self.hooks_of(hook_type).iter().collect();
        hooks.sort_by_key(|hook| hook.order());
        hooks
    }

    /// Every step argument transformation in registration order.
    #[must_use]
    pub fn step_transformations(&self) -> &[StepArgumentTransformationBinding] {
        &self.transformations
    }

    /// Declare discovery complete.
    pub fn mark_ready(&mut self) {
        if !self.ready {
            log::debug!(
                "binding registry ready: {} step definitions, {} hooks, {} transformations",
                self.step_definitions.len(),
                self.hooks.values().map(Vec::len).sum::<usize>(),
                self.transformations.len()
            );
        }
        self.ready = true;
    }

    /// Whether discovery has declared the registry complete.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Serialize the registry to JSON for diagnostic tooling.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    #[cfg(feature = "diagnostics")]
    pub fn dump(&self) -> serde_json::Result<String> {
        diagnostics::dump(self)
    }

    fn warn_if_ready(&self, what: &str) {
        if self.ready {
            log::warn!("{what} registered after the binding registry was marked ready");
        }
    }
}

/// Install `registry` as the process-wide registry, marking it ready.
///
/// # Errors
///
/// Hands `registry` back when a process-wide registry is already installed.
pub fn install_global(mut registry: BindingRegistry) -> Result<(), BindingRegistry> {
    registry.mark_ready();
    GLOBAL_REGISTRY.set(registry)
}

/// The process-wide registry, if one has been installed.
#[must_use]
pub fn global() -> Option<&'static BindingRegistry> {
    GLOBAL_REGISTRY.get()
}
