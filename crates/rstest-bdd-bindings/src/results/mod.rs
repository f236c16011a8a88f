//! Scenario result collection.
//!
//! The collector is a ledger mapping each executed scenario to its terminal
//! status. It must be started before results are recorded; each scenario is
//! recorded at most once, and a second submission is rejected without
//! touching the first. All state sits behind one mutex, so any number of
//! threads may record and read concurrently.

use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock};

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

mod error;

pub use error::{CollectError, NotStarted};

/// Identity of one executed scenario.
///
/// Scenario outlines produce one identity per example row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "diagnostics", derive(serde::Serialize))]
pub struct ScenarioInfo {
    feature_title: String,
    scenario_title: String,
    example_index: Option<usize>,
}

impl ScenarioInfo {
    /// Identify a plain scenario.
    #[must_use]
    pub fn new(feature_title: impl Into<String>, scenario_title: impl Into<String>) -> Self {
        Self {
            feature_title: feature_title.into(),
            scenario_title: scenario_title.into(),
            example_index: None,
        }
    }

    /// Identify one example row of a scenario outline.
    #[must_use]
    pub fn with_example(mut self, index: usize) -> Self {
        self.example_index = Some(index);
        self
    }

    /// Title of the containing feature.
    #[must_use]
    pub fn feature_title(&self) -> &str {
        &self.feature_title
    }

    /// Title of the scenario.
    #[must_use]
    pub fn scenario_title(&self) -> &str {
        &self.scenario_title
    }

    /// Zero-based example row, for scenario outlines.
    #[must_use]
    pub const fn example_index(&self) -> Option<usize> {
        self.example_index
    }
}

impl fmt::Display for ScenarioInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.feature_title, self.scenario_title)?;
        if let Some(index) = self.example_index {
            write!(f, " [example {index}]")?;
        }
        Ok(())
    }
}

/// Terminal status of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TestResult {
    /// Every step passed.
    Passed,
    /// A step or hook failed.
    Failed,
    /// The scenario was skipped.
    Skipped,
    /// A step matched more than one step definition.
    Ambiguous,
    /// A step matched no step definition.
    Undefined,
    /// A status this collector does not tally individually.
    Unrecognized(String),
}

impl TestResult {
    /// Lower-case label of the status.
    ///
    /// # Examples
    ///
    /// ```
    /// use rstest_bdd_bindings::TestResult;
    ///
    /// assert_eq!(TestResult::Ambiguous.label(), "ambiguous");
    /// assert_eq!(TestResult::from_label("PASSED"), TestResult::Passed);
    /// assert_eq!(
    ///     TestResult::from_label("pending"),
    ///     TestResult::Unrecognized("pending".into()),
    /// );
    /// ```
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Ambiguous => "ambiguous",
            Self::Undefined => "undefined",
            Self::Unrecognized(label) => label,
        }
    }

    /// Parse a label case-insensitively; unknown labels are kept as
    /// [`TestResult::Unrecognized`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        [
            Self::Passed,
            Self::Failed,
            Self::Skipped,
            Self::Ambiguous,
            Self::Undefined,
        ]
        .into_iter()
        .find(|status| status.label().eq_ignore_ascii_case(trimmed))
        .unwrap_or_else(|| Self::Unrecognized(trimmed.to_owned()))
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Summary of the results collected so far.
///
/// `total` counts every recorded scenario, including those with an
/// unrecognised status, so the named counters may sum to less than `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(serde::Serialize))]
pub struct TestRunResult {
    /// Recorded scenarios.
    pub total: usize,
    /// Scenarios that passed.
    pub passed: usize,
    /// Scenarios that failed.
    pub failed: usize,
    /// Scenarios that were skipped.
    pub skipped: usize,
    /// Scenarios with an ambiguous step.
    pub ambiguous: usize,
    /// Scenarios with an undefined step.
    pub undefined: usize,
}

impl TestRunResult {
    /// Whether nothing failed, was ambiguous or was undefined.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.failed == 0 && self.ambiguous == 0 && self.undefined == 0
    }

    fn tally<'a>(results: impl ExactSizeIterator<Item = &'a TestResult>) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result {
                TestResult::Passed => summary.passed += 1,
                TestResult::Failed => summary.failed += 1,
                TestResult::Skipped => summary.skipped += 1,
                TestResult::Ambiguous => summary.ambiguous += 1,
                TestResult::Undefined => summary.undefined += 1,
                TestResult::Unrecognized(_) => {}
            }
        }
        summary
    }
}

#[derive(Debug, Default)]
enum CollectorState {
    #[default]
    NotStarted,
    Started(HashMap<ScenarioInfo, TestResult>),
}

/// Thread-safe ledger of scenario results.
///
/// # Examples
///
/// ```
/// use rstest_bdd_bindings::{ResultCollector, ScenarioInfo, TestResult};
///
/// let collector = ResultCollector::new();
/// collector.start_collecting();
/// collector
///     .collect(ScenarioInfo::new("Basket", "adding apples"), TestResult::Passed)
///     .unwrap();
/// let summary = collector.current_result().unwrap();
/// assert_eq!((summary.total, summary.passed), (1, 1));
/// assert!(summary.succeeded());
/// ```
#[derive(Debug, Default)]
pub struct ResultCollector {
    state: Mutex<CollectorState>,
}

impl ResultCollector {
    /// Create a collector that has not started collecting.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CollectorState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Begin accepting results. Calling this again has no effect.
    pub fn start_collecting(&self) {
        let mut state = self.lock();
        if matches!(*state, CollectorState::NotStarted) {
            log::debug!("result collection started");
            *state = CollectorState::Started(HashMap::new());
        }
    }

    /// Whether collection has started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(*self.lock(), CollectorState::Started(_))
    }

    /// Record the result of `scenario`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::NotStarted`] before [`Self::start_collecting`]
    /// and [`CollectError::DuplicateScenario`] when `scenario` already has a
    /// result; the recorded result is left unchanged.
    pub fn collect(&self, scenario: ScenarioInfo, result: TestResult) -> Result<(), CollectError> {
        let mut state = self.lock();
        let CollectorState::Started(results) = &mut *state else {
            return Err(CollectError::NotStarted(NotStarted));
        };
        match results.entry(scenario) {
            Entry::Occupied(entry) => Err(CollectError::DuplicateScenario {
                scenario: entry.key().clone(),
                existing: entry.get().clone(),
            }),
            Entry::Vacant(entry) => {
                log::trace!("collected {result} for {}", entry.key());
                entry.insert(result);
                Ok(())
            }
        }
    }

    /// Summarize the results recorded so far.
    ///
    /// # Errors
    ///
    /// Returns [`NotStarted`] before [`Self::start_collecting`].
    pub fn current_result(&self) -> Result<TestRunResult, NotStarted> {
        match &*self.lock() {
            CollectorState::NotStarted => Err(NotStarted),
            CollectorState::Started(results) => Ok(TestRunResult::tally(results.values())),
        }
    }
}

/// The process-wide collector shared by every caller in a test run.
#[must_use]
pub fn global() -> &'static ResultCollector {
    static COLLECTOR: OnceLock<ResultCollector> = OnceLock::new();
    COLLECTOR.get_or_init(ResultCollector::new)
}
