//! Caller context consulted by the invoker.
//!
//! The execution engine exposes two things to the invoker: the current bound
//! instance of a declaring type, for instance methods, and the feature-level
//! context whose language scopes each call. [`ScenarioContext`] is a ready
//! made accessor that stores instances in a type-indexed map.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use unic_langid::{LanguageIdentifier, langid};

use crate::method::TypeDescriptor;

/// Shared handle to an instance that receives instance-method calls.
pub type BoundInstance = Arc<dyn Any + Send + Sync>;

/// Feature-level state visible to every binding call in a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureContext {
    title: String,
    language: LanguageIdentifier,
}

impl FeatureContext {
    /// Describe a feature written in `language`.
    #[must_use]
    pub fn new(title: impl Into<String>, language: LanguageIdentifier) -> Self {
        Self {
            title: title.into(),
            language,
        }
    }

    /// Feature title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Language the feature is written in.
    #[must_use]
    pub fn language(&self) -> &LanguageIdentifier {
        &self.language
    }
}

impl Default for FeatureContext {
    fn default() -> Self {
        Self::new(String::new(), langid!("en-US"))
    }
}

/// What the invoker may ask of the execution engine.
pub trait ContextAccessor {
    /// The current instance of `declaring_type`, if one is bound.
    fn bound_instance(&self, declaring_type: &TypeDescriptor) -> Option<BoundInstance>;

    /// The context of the feature being executed.
    fn feature_context(&self) -> &FeatureContext;
}

/// Type-indexed store of bound instances for one scenario.
///
/// # Examples
///
/// ```
/// use rstest_bdd_bindings::{ContextAccessor, ScenarioContext, TypeDescriptor};
///
/// struct Basket(u32);
///
/// let mut context = ScenarioContext::default();
/// context.bind(Basket(3));
/// assert_eq!(context.instance::<Basket>().map(|b| b.0), Some(3));
/// assert!(context.bound_instance(&TypeDescriptor::of::<Basket>()).is_some());
/// assert!(context.bound_instance(&TypeDescriptor::named("Basket")).is_none());
/// ```
#[derive(Default)]
pub struct ScenarioContext {
    feature: FeatureContext,
    instances: HashMap<TypeId, BoundInstance>,
}

impl ScenarioContext {
    /// Start an empty scenario context within `feature`.
    #[must_use]
    pub fn new(feature: FeatureContext) -> Self {
        Self {
            feature,
            instances: HashMap::new(),
        }
    }

    /// Bind `value` as the current instance of `T`, replacing any previous one.
    pub fn bind<T: Any + Send + Sync>(&mut self, value: T) {
        self.instances.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Bind an already shared instance of `T`.
    pub fn bind_shared<T: Any + Send + Sync>(&mut self, value: Arc<T>) {
        self.instances.insert(TypeId::of::<T>(), value);
    }

    /// Borrow the current instance of `T`.
    #[must_use]
    pub fn instance<T: Any>(&self) -> Option<&T> {
        self.instances.get(&TypeId::of::<T>())?.downcast_ref::<T>()
    }

    /// Drop every bound instance, keeping the feature context.
    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

impl ContextAccessor for ScenarioContext {
    fn bound_instance(&self, declaring_type: &TypeDescriptor) -> Option<BoundInstance> {
        let id = declaring_type.type_id()?;
        self.instances.get(&id).cloned()
    }

    fn feature_context(&self) -> &FeatureContext {
        &self.feature
    }
}

impl std::fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("feature", &self.feature)
            .field("instances", &self.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Cart(Vec<&'static str>);

    #[test]
    fn rebinding_replaces_previous_instance() {
        let mut context = ScenarioContext::default();
        context.bind(Cart(vec!["apple"]));
        context.bind(Cart(vec!["pear"]));
        assert_eq!(context.instance::<Cart>(), Some(&Cart(vec!["pear"])));
    }

    #[test]
    fn shared_instances_are_not_copied() {
        let shared = Arc::new(Cart(Vec::new()));
        let mut context = ScenarioContext::default();
        context.bind_shared(Arc::clone(&shared));
        let Some(bound) = context.bound_instance(&TypeDescriptor::of::<Cart>()) else {
            panic!("cart should be bound");
        };
        assert_eq!(Arc::strong_count(&shared), 3);
        drop(bound);
        context.clear();
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[test]
    fn default_feature_is_english() {
        let context = ScenarioContext::default();
        assert_eq!(context.feature_context().language(), &langid!("en-US"));
    }
}
