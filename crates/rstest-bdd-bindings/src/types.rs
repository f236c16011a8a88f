//! Step definition and hook classification tags.
//!
//! Step definitions are tagged with the Gherkin keyword class they answer to
//! and hooks with the lifecycle point at which they run. Both tags are plain
//! `Copy` enums so the registry can key collections by them.

use std::fmt;
use std::str::FromStr;

/// Keyword class a step definition answers to.
///
/// Conjunctions (`And`/`But`) are resolved by the external feature parser
/// before step matching, so only the three primary classes appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "diagnostics", derive(serde::Serialize))]
pub enum StepDefinitionType {
    /// Setup preconditions for a scenario.
    Given,
    /// Perform an action when testing behaviour.
    When,
    /// Assert the expected outcome of a scenario.
    Then,
}

impl StepDefinitionType {
    /// Return the keyword as a string slice.
    ///
    /// # Examples
    ///
    /// ```
    /// use rstest_bdd_bindings::StepDefinitionType;
    ///
    /// assert_eq!(StepDefinitionType::When.as_str(), "When");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
        }
    }
}

impl fmt::Display for StepDefinitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`StepDefinitionType`] or [`HookType`] fails.
///
/// Contains the unrecognised text for diagnostic purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagParseError(pub String);

impl fmt::Display for TagParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised binding tag: {}", self.0)
    }
}

impl std::error::Error for TagParseError {}

impl FromStr for StepDefinitionType {
    type Err = TagParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("given") {
            Ok(Self::Given)
        } else if trimmed.eq_ignore_ascii_case("when") {
            Ok(Self::When)
        } else if trimmed.eq_ignore_ascii_case("then") {
            Ok(Self::Then)
        } else {
            Err(TagParseError(trimmed.to_string()))
        }
    }
}

/// Lifecycle point at which a hook binding runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "diagnostics", derive(serde::Serialize))]
pub enum HookType {
    /// Once before any feature runs.
    BeforeTestRun,
    /// Once after every feature has run.
    AfterTestRun,
    /// Before the first scenario of a feature.
    BeforeFeature,
    /// After the last scenario of a feature.
    AfterFeature,
    /// Before each scenario, including each example row of an outline.
    BeforeScenario,
    /// After each scenario.
    AfterScenario,
    /// Before each block of same-class steps (Given, When or Then).
    BeforeScenarioBlock,
    /// After each block of same-class steps.
    AfterScenarioBlock,
    /// Before each step.
    BeforeStep,
    /// After each step.
    AfterStep,
}

impl HookType {
    /// Every hook type, in lifecycle order.
    pub const ALL: [Self; 10] = [
        Self::BeforeTestRun,
        Self::BeforeFeature,
        Self::BeforeScenario,
        Self::BeforeScenarioBlock,
        Self::BeforeStep,
        Self::AfterStep,
        Self::AfterScenarioBlock,
        Self::AfterScenario,
        Self::AfterFeature,
        Self::AfterTestRun,
    ];

    /// Return the hook name as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeTestRun => "BeforeTestRun",
            Self::AfterTestRun => "AfterTestRun",
            Self::BeforeFeature => "BeforeFeature",
            Self::AfterFeature => "AfterFeature",
            Self::BeforeScenario => "BeforeScenario",
            Self::AfterScenario => "AfterScenario",
            Self::BeforeScenarioBlock => "BeforeScenarioBlock",
            Self::AfterScenarioBlock => "AfterScenarioBlock",
            Self::BeforeStep => "BeforeStep",
            Self::AfterStep => "AfterStep",
        }
    }

    /// Whether the hook runs before its lifecycle point rather than after it.
    ///
    /// # Examples
    ///
    /// ```
    /// use rstest_bdd_bindings::HookType;
    ///
    /// assert!(HookType::BeforeStep.is_before());
    /// assert!(!HookType::AfterFeature.is_before());
    /// ```
    #[must_use]
    pub const fn is_before(&self) -> bool {
        matches!(
            self,
            Self::BeforeTestRun
                | Self::BeforeFeature
                | Self::BeforeScenario
                | Self::BeforeScenarioBlock
                | Self::BeforeStep
        )
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookType {
    type Err = TagParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|hook| hook.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| TagParseError(trimmed.to_string()))
    }
}
