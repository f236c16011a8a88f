//! Errors reported by the result collector.

use std::fmt;

use i18n_embed::fluent::FluentLanguageLoader;

use super::{ScenarioInfo, TestResult};
use crate::localization;

/// Result collection was queried before [`start_collecting`] was called.
///
/// [`start_collecting`]: super::ResultCollector::start_collecting
///
/// # Examples
///
/// ```
/// use rstest_bdd_bindings::NotStarted;
///
/// assert_eq!(NotStarted.to_string(), "Result collection has not been started");
/// assert_eq!(NotStarted.message(), NotStarted::MESSAGE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotStarted;

impl NotStarted {
    /// Canonical message, independent of the active locale.
    pub const MESSAGE: &'static str = "Result collection has not been started";

    /// Canonical message; `Display` renders the localized form instead.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        Self::MESSAGE
    }

    /// Render the message using the provided Fluent loader.
    #[must_use]
    pub fn format_with_loader(&self, loader: &FluentLanguageLoader) -> String {
        localization::message_with_loader(loader, "results-not-started", |_| {})
    }
}

impl fmt::Display for NotStarted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = localization::with_loader(|loader| self.format_with_loader(loader));
        f.write_str(&message)
    }
}

impl std::error::Error for NotStarted {}

/// Why a scenario result could not be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CollectError {
    /// Collection has not been started.
    NotStarted(NotStarted),
    /// A result for the scenario was already recorded; it is left unchanged.
    DuplicateScenario {
        /// The scenario submitted twice.
        scenario: ScenarioInfo,
        /// The result recorded first.
        existing: TestResult,
    },
}

impl CollectError {
    /// Render the error message using the provided Fluent loader.
    #[must_use]
    pub fn format_with_loader(&self, loader: &FluentLanguageLoader) -> String {
        match self {
            Self::NotStarted(error) => error.format_with_loader(loader),
            Self::DuplicateScenario { scenario, existing } => localization::message_with_loader(
                loader,
                "results-duplicate-scenario",
                |args| {
                    args.set("scenario", scenario.to_string());
                    args.set("existing", existing.label().to_owned());
                },
            ),
        }
    }
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = localization::with_loader(|loader| self.format_with_loader(loader));
        f.write_str(&message)
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotStarted(error) => Some(error),
            Self::DuplicateScenario { .. } => None,
        }
    }
}

impl From<NotStarted> for CollectError {
    fn from(error: NotStarted) -> Self {
        Self::NotStarted(error)
    }
}
