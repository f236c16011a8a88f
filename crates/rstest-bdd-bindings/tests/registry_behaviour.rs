//! Behavioural coverage for binding registration and lookup.

use std::sync::Arc;
use std::thread;

use rstest::rstest;
use rstest_bdd_bindings::{
    Binding, BindingMethod, BindingRegistry, HookBinding, HookType, MethodBinding,
    StepArgumentTransformationBinding, StepDefinitionBinding, StepDefinitionType, registry,
};
use serial_test::serial;

struct LibrarySteps;

fn step(step_type: StepDefinitionType, expression: &str) -> StepDefinitionBinding {
    StepDefinitionBinding::new(
        step_type,
        expression,
        BindingMethod::static_fn::<LibrarySteps, _, _>("step", || ()),
    )
}

fn discovered_registry() -> BindingRegistry {
    let mut registry = BindingRegistry::new();
    registry.register_step_definition(step(StepDefinitionType::Given, "a library"));
    registry.register_step_definition(step(StepDefinitionType::When, "I borrow {title}"));
    registry.register_step_definition(step(StepDefinitionType::Then, "{title} is on loan"));
    registry.register_step_definition(step(StepDefinitionType::Given, "a member"));
    let open = BindingMethod::static_fn::<LibrarySteps, _, _>("open", || ());
    registry.register_hook(HookBinding::new(HookType::BeforeFeature, open.clone()));
    registry.register_hook(HookBinding::new(HookType::BeforeFeature, open));
    registry.register_step_argument_transformation(StepArgumentTransformationBinding::new(
        BindingMethod::static_fn::<LibrarySteps, _, _>("to_title", |text: String| text),
    ));
    registry.mark_ready();
    registry
}

#[test]
fn step_definitions_keep_registration_order() {
    let registry = discovered_registry();
    let expressions: Vec<&str> = registry
        .step_definitions()
        .iter()
        .map(StepDefinitionBinding::expression)
        .collect();
    assert_eq!(
        expressions,
        ["a library", "I borrow {title}", "{title} is on loan", "a member"]
    );
}

#[rstest]
#[case(StepDefinitionType::Given, 2)]
#[case(StepDefinitionType::When, 1)]
#[case(StepDefinitionType::Then, 1)]
fn considered_definitions_match_the_keyword_class(
    #[case] step_type: StepDefinitionType,
    #[case] expected: usize,
) {
    let registry = discovered_registry();
    let considered = registry.considered_step_definitions(step_type, "I borrow Dune");
    assert_eq!(considered.len(), expected);
    assert!(considered.iter().all(|binding| binding.step_type() == step_type));
}

#[rstest]
fn unregistered_hook_types_are_empty(
    #[values(
        HookType::BeforeTestRun,
        HookType::AfterTestRun,
        HookType::AfterFeature,
        HookType::BeforeStep
    )]
    hook_type: HookType,
) {
    let registry = discovered_registry();
    assert!(registry.hooks_of(hook_type).is_empty());
    assert!(registry.hooks_in_order(hook_type).is_empty());
}

#[test]
fn duplicate_hook_registration_keeps_one() {
    let registry = discovered_registry();
    assert_eq!(registry.hooks_of(HookType::BeforeFeature).len(), 1);
    assert_eq!(registry.hooks().len(), 1);
}

#[test]
fn bindings_share_a_common_view() {
    let registry = discovered_registry();
    let bindings: Vec<Binding> = registry
        .step_definitions()
        .iter()
        .cloned()
        .map(Binding::from)
        .chain(registry.hooks().into_iter().cloned().map(Binding::from))
        .chain(registry.step_transformations().iter().cloned().map(Binding::from))
        .collect();
    assert_eq!(bindings.len(), 6);
    let names: Vec<&str> = bindings
        .iter()
        .map(|binding| binding.method().descriptor().name())
        .collect();
    assert_eq!(names.last(), Some(&"to_title"));
}

#[test]
fn ready_registry_is_shareable_across_threads() {
    let registry = Arc::new(discovered_registry());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry
                    .considered_step_definitions(StepDefinitionType::Given, "")
                    .len()
            })
        })
        .collect();
    for handle in handles {
        assert!(matches!(handle.join(), Ok(2)));
    }
}

#[test]
#[serial]
fn global_registry_installs_once() {
    let installed = registry::install_global(discovered_registry());
    let second = registry::install_global(BindingRegistry::new());
    assert!(installed.is_ok() || registry::global().is_some());
    assert!(second.is_err());
    let Some(global) = registry::global() else {
        panic!("global registry should be installed");
    };
    assert!(global.is_ready());
    assert_eq!(global.step_definitions().len(), 4);
}
