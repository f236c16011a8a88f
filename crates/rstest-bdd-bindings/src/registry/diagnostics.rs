//! Diagnostics-only registry export.
//!
//! The dump lists every binding with its tag, the rendered method signature
//! and its declaration site so external tooling can report on discovery.

use serde::Serialize;

use super::BindingRegistry;
use crate::binding::{BindingMethod, MethodBinding};
use crate::method::MethodKind;
use crate::types::{HookType, StepDefinitionType};

#[derive(Serialize)]
struct DumpedMethod {
    signature: String,
    kind: MethodKind,
    return_type: String,
    location: Option<String>,
    resolvable: bool,
}

impl From<&BindingMethod> for DumpedMethod {
    fn from(method: &BindingMethod) -> Self {
        let descriptor = method.descriptor();
        Self {
            signature: descriptor.to_string(),
            kind: descriptor.kind(),
            return_type: descriptor.return_type().to_string(),
            location: descriptor.location().map(ToString::to_string),
            resolvable: method.entry().is_some(),
        }
    }
}

#[derive(Serialize)]
struct DumpedStepDefinition {
    step_type: StepDefinitionType,
    expression: String,
    method: DumpedMethod,
}

#[derive(Serialize)]
struct DumpedHook {
    hook_type: HookType,
    order: i32,
    method: DumpedMethod,
}

#[derive(Serialize)]
struct DumpedTransformation {
    expression: Option<String>,
    method: DumpedMethod,
}

#[derive(Serialize)]
struct RegistryDump {
    ready: bool,
    step_definitions: Vec<DumpedStepDefinition>,
    hooks: Vec<DumpedHook>,
    step_transformations: Vec<DumpedTransformation>,
}

pub(super) fn dump(registry: &BindingRegistry) -> serde_json::Result<String> {
    let step_definitions = registry
        .step_definitions()
        .iter()
        .map(|binding| DumpedStepDefinition {
            step_type: binding.step_type(),
            expression: binding.expression().to_owned(),
            method: binding.method().into(),
        })
        .collect();
    let hooks = registry
        .hooks()
        .into_iter()
        .map(|binding| DumpedHook {
            hook_type: binding.hook_type(),
            order: binding.order(),
            method: binding.method().into(),
        })
        .collect();
    let step_transformations = registry
        .step_transformations()
        .iter()
        .map(|binding| DumpedTransformation {
            expression: binding.expression().map(str::to_owned),
            method: binding.method().into(),
        })
        .collect();
    serde_json::to_string(&RegistryDump {
        ready: registry.is_ready(),
        step_definitions,
        hooks,
        step_transformations,
    })
}
