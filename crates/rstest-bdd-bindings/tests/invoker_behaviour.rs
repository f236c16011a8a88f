//! Behavioural coverage for binding invocation, failure normalization and timing.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use rstest::{fixture, rstest};
use rstest_bdd_bindings::localization::{current_languages, strip_directional_isolates};
use rstest_bdd_bindings::{
    AggregateFailure, Argument, BindingInvoker, BindingMethod, BindingValue, BoundInstance,
    ContextAccessor, EntryPoint, FailureKind, FeatureContext, HookBinding, HookType, InvokeError,
    LogTracer, MAX_PARAMETERS, MethodDescriptor, MethodKind, NoopTracer, ScenarioContext,
    StepDefinitionBinding, StepDefinitionType, TargetFailure, TypeDescriptor,
};
use unic_langid::{LanguageIdentifier, langid};

#[derive(Debug)]
struct Basket {
    apples: u32,
}

struct BasketSteps;

#[derive(Debug, PartialEq, Eq)]
struct Bruised {
    count: u32,
}

impl fmt::Display for Bruised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} apples are bruised", self.count)
    }
}

impl std::error::Error for Bruised {}

/// Accessor that counts how often a bound instance is requested.
struct CountingAccessor {
    inner: ScenarioContext,
    lookups: Cell<usize>,
}

impl CountingAccessor {
    fn new(inner: ScenarioContext) -> Self {
        Self {
            inner,
            lookups: Cell::new(0),
        }
    }
}

impl ContextAccessor for CountingAccessor {
    fn bound_instance(&self, declaring_type: &TypeDescriptor) -> Option<BoundInstance> {
        self.lookups.set(self.lookups.get() + 1);
        self.inner.bound_instance(declaring_type)
    }

    fn feature_context(&self) -> &FeatureContext {
        self.inner.feature_context()
    }
}

#[fixture]
fn invoker() -> BindingInvoker {
    BindingInvoker::default()
}

#[fixture]
fn basket_context() -> ScenarioContext {
    let mut context = ScenarioContext::default();
    context.bind(Basket { apples: 5 });
    context
}

#[rstest]
fn parameterless_static_binding_never_requests_an_instance(invoker: BindingInvoker) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let method = BindingMethod::static_fn::<BasketSteps, _, _>("tick", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let accessor = CountingAccessor::new(ScenarioContext::default());
    let outcome = invoker.invoke(&method, &accessor, Vec::new(), &NoopTracer);
    assert!(outcome.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(accessor.lookups.get(), 0);
}

#[rstest]
#[case::default_locale(ScenarioContext::default())]
#[case::english(ScenarioContext::new(FeatureContext::new("Basket", langid!("en-US"))))]
#[case::french(ScenarioContext::new(FeatureContext::new("Panier", langid!("fr"))))]
#[case::without_resources(ScenarioContext::new(FeatureContext::new("Korb", langid!("de"))))]
fn noop_binding_runs_in_every_feature_language(
    invoker: BindingInvoker,
    #[case] context: ScenarioContext,
) {
    let method = BindingMethod::static_fn::<BasketSteps, _, _>("noop", || ());
    let invocation = match invoker.invoke(&method, &context, Vec::new(), &NoopTracer) {
        Ok(invocation) => invocation,
        Err(error) => panic!("noop binding should run: {error}"),
    };
    assert!(invocation.value().is_none());
}

#[rstest]
fn instance_binding_receives_bound_instance(invoker: BindingInvoker) {
    let method = BindingMethod::instance::<Basket, _, _>("with_more", |basket: &Basket, n: u32| {
        basket.apples + n
    });
    let mut context = ScenarioContext::default();
    context.bind(Basket { apples: 5 });
    let accessor = CountingAccessor::new(context);
    let Ok(invocation) = invoker.invoke(&method, &accessor, vec![Argument::new(2_u32)], &NoopTracer)
    else {
        panic!("instance binding should succeed");
    };
    assert_eq!(invocation.value_as::<u32>(), Some(&7));
    assert_eq!(accessor.lookups.get(), 1);
}

#[rstest]
fn missing_instance_is_reported_with_duration(invoker: BindingInvoker) {
    let method = BindingMethod::instance::<Basket, _, _>("count", |basket: &Basket| basket.apples);
    let Err(error) = invoker.invoke(&method, &ScenarioContext::default(), Vec::new(), &NoopTracer)
    else {
        panic!("instance binding without instance should fail");
    };
    assert!(matches!(error.error(), InvokeError::MissingInstance { .. }));
    assert!(error.error().is_configuration());
    assert!(error.duration() >= Duration::ZERO);
}

#[rstest]
fn exceeding_parameter_ceiling_never_dispatches(invoker: BindingInvoker) {
    let dispatched = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&dispatched);
    let entry = EntryPoint::dynamic(
        MethodKind::Static,
        vec![TypeDescriptor::of::<u8>(); MAX_PARAMETERS + 1],
        TypeDescriptor::of::<()>(),
        move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(None)
        },
    );
    let method = BindingMethod::new(TypeDescriptor::named("Wide"), "too_wide", entry);
    let arguments = (0..=MAX_PARAMETERS).map(|_| Argument::new(0_u8)).collect();
    let Err(error) = invoker.invoke(&method, &ScenarioContext::default(), arguments, &NoopTracer)
    else {
        panic!("21 parameters must be rejected");
    };
    let InvokeError::TooManyParameters {
        declared, limit, ..
    } = error.error()
    else {
        panic!("unexpected error: {error:?}");
    };
    assert_eq!((*declared, *limit), (21, 20));
    assert_eq!(error.duration(), Duration::ZERO);
    assert!(!dispatched.load(Ordering::SeqCst));
    assert!(!method.is_resolved());
}

#[rstest]
fn instance_methods_take_twenty_parameters_plus_receiver(
    invoker: BindingInvoker,
    basket_context: ScenarioContext,
) {
    let entry = EntryPoint::dynamic(
        MethodKind::Instance,
        vec![TypeDescriptor::of::<u32>(); MAX_PARAMETERS],
        TypeDescriptor::of::<u32>(),
        |arguments| {
            let mut slots = arguments.into_iter();
            let receiver = slots
                .next()
                .and_then(|slot| slot.downcast::<BoundInstance>().ok())
                .ok_or_else(|| TargetFailure::msg("receiver slot missing"))?;
            let basket = receiver
                .downcast_ref::<Basket>()
                .ok_or_else(|| TargetFailure::msg("receiver is not a basket"))?;
            let extra: u32 = slots.filter_map(|slot| slot.downcast::<u32>().ok()).sum();
            let total: BindingValue = Box::new(basket.apples + extra);
            Ok(Some(total))
        },
    );
    let method = BindingMethod::new(TypeDescriptor::of::<Basket>(), "widest", entry);
    let arguments = (0..MAX_PARAMETERS).map(|_| Argument::new(1_u32)).collect();
    let Ok(invocation) = invoker.invoke(&method, &basket_context, arguments, &NoopTracer) else {
        panic!("twenty parameters plus receiver should be accepted");
    };
    assert_eq!(invocation.value_as::<u32>(), Some(&25));
}

#[rstest]
#[case::too_few(Vec::new())]
#[case::too_many(vec![Argument::new(1_u32), Argument::new(2_u32)])]
#[case::wrong_type(vec![Argument::new("one")])]
fn argument_mismatch_names_the_method(invoker: BindingInvoker, #[case] arguments: Vec<Argument>) {
    let method = BindingMethod::static_fn::<BasketSteps, _, _>("add", |n: u32| n);
    let Err(error) = invoker.invoke(&method, &ScenarioContext::default(), arguments, &NoopTracer)
    else {
        panic!("mismatched arguments must be rejected");
    };
    let InvokeError::ArgumentMismatch { method: name, .. } = error.error() else {
        panic!("unexpected error: {error:?}");
    };
    assert!(name.ends_with("BasketSteps::add(u32)"), "unexpected method: {name}");
}

#[rstest]
fn returned_error_keeps_its_identity(invoker: BindingInvoker, basket_context: ScenarioContext) {
    let step = StepDefinitionBinding::new(
        StepDefinitionType::Then,
        "no apple is bruised",
        BindingMethod::instance::<Basket, _, _>(
            "inspect",
            |basket: &Basket| -> Result<(), Bruised> {
                Err(Bruised {
                    count: basket.apples,
                })
            },
        ),
    );
    let Err(error) = invoker.invoke(&step, &basket_context, Vec::new(), &NoopTracer) else {
        panic!("inspection should fail");
    };
    let Some(located) = error.error().target() else {
        panic!("implementation failure expected, got {error:?}");
    };
    assert_eq!(located.cause().kind(), FailureKind::Error);
    assert_eq!(located.cause().downcast_ref::<Bruised>(), Some(&Bruised { count: 5 }));
    let Some(location) = located.location() else {
        panic!("binding declaration site should be recorded");
    };
    assert!(location.file().ends_with("invoker_behaviour.rs"));
    let rendered = strip_directional_isolates(&error.to_string());
    assert!(rendered.starts_with("Error in binding "), "unexpected: {rendered}");
    assert!(rendered.ends_with("\n5 apples are bruised"), "unexpected: {rendered}");
}

#[rstest]
fn aggregate_failure_surfaces_first_member(invoker: BindingInvoker) {
    let method = BindingMethod::static_fn::<BasketSteps, _, _>(
        "sweep",
        || -> Result<(), AggregateFailure> {
            Err(AggregateFailure::new([
                TargetFailure::msg("first shelf empty"),
                TargetFailure::msg("second shelf empty"),
            ]))
        },
    );
    let Err(error) = invoker.invoke(&method, &ScenarioContext::default(), Vec::new(), &NoopTracer)
    else {
        panic!("sweep should fail");
    };
    let Some(located) = error.error().target() else {
        panic!("implementation failure expected, got {error:?}");
    };
    assert_eq!(located.cause().message(), "first shelf empty");
}

#[rstest]
fn empty_aggregate_is_reported_as_such(invoker: BindingInvoker) {
    let method = BindingMethod::static_fn::<BasketSteps, _, _>(
        "nothing",
        || -> Result<(), AggregateFailure> { Err(AggregateFailure::default()) },
    );
    let Err(error) = invoker.invoke(&method, &ScenarioContext::default(), Vec::new(), &NoopTracer)
    else {
        panic!("empty aggregate should still fail");
    };
    assert!(matches!(error.error(), InvokeError::EmptyAggregate { .. }));
}

#[rstest]
fn panicking_hook_is_captured(invoker: BindingInvoker) {
    let hook = HookBinding::new(
        HookType::AfterScenario,
        BindingMethod::static_fn::<BasketSteps, _, _>("teardown", || -> Result<(), Bruised> {
            panic!("teardown failed")
        }),
    );
    let Err(error) = invoker.invoke(&hook, &ScenarioContext::default(), Vec::new(), &NoopTracer)
    else {
        panic!("panicking hook should fail");
    };
    let Some(located) = error.error().target() else {
        panic!("implementation failure expected, got {error:?}");
    };
    assert_eq!(located.cause().kind(), FailureKind::Panic);
    assert_eq!(located.cause().message(), "teardown failed");
    assert!(located.cause().origin().is_some());
}

#[rstest]
fn unresolved_binding_fails_without_dispatch(invoker: BindingInvoker) {
    let descriptor = MethodDescriptor::new(
        TypeDescriptor::named("GeneratedSteps"),
        "lost",
        MethodKind::Static,
        Vec::new(),
        TypeDescriptor::of::<()>(),
    );
    let method = BindingMethod::unresolved(descriptor);
    let Err(error) = invoker.invoke(&method, &ScenarioContext::default(), Vec::new(), &NoopTracer)
    else {
        panic!("unresolved binding should fail");
    };
    assert!(matches!(
        error.error(),
        InvokeError::Unresolvable { binding } if binding == "GeneratedSteps::lost()"
    ));
    assert_eq!(error.duration(), Duration::ZERO);
}

#[rstest]
#[case(langid!("fr"))]
#[case(langid!("en-US"))]
fn feature_language_is_scoped_to_the_call(
    invoker: BindingInvoker,
    #[case] language: LanguageIdentifier,
) {
    let observed = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);
    let method = BindingMethod::static_fn::<BasketSteps, _, _>("observe", move || {
        let languages = current_languages().unwrap_or_default();
        sink.lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend(languages.into_iter().take(1));
    });
    let context = ScenarioContext::new(FeatureContext::new("Basket", language.clone()));
    assert!(invoker.invoke(&method, &context, Vec::new(), &LogTracer).is_ok());
    let observed = observed
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .clone();
    assert_eq!(observed, vec![language]);
    let after = current_languages().unwrap_or_default();
    assert_eq!(after.first(), Some(&langid!("en-US")));
}

#[rstest]
fn locale_scope_is_released_when_binding_fails(invoker: BindingInvoker) {
    let method = BindingMethod::static_fn::<BasketSteps, _, _>("fail", || -> Result<(), Bruised> {
        panic!("always")
    });
    let context = ScenarioContext::new(FeatureContext::new("Panier", langid!("fr")));
    assert!(invoker.invoke(&method, &context, Vec::new(), &NoopTracer).is_err());
    let after = current_languages().unwrap_or_default();
    assert_eq!(after.first(), Some(&langid!("en-US")));
}
