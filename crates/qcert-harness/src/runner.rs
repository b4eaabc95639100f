//! Sequential, fail-fast execution of a check battery

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;

use crate::{CheckError, CheckResult, HarnessError, HarnessResult, Reporter};

/// Procedure run by a [`Check`] against the live suite context
pub type CheckFn<C> = for<'a> fn(&'a C) -> BoxFuture<'a, CheckResult>;

/// One named, ordered unit of verification
pub struct Check<C> {
    pub sequence: u32,
    /// Short upper-case group name, e.g. `INSERT`
    pub category: &'static str,
    pub description: &'static str,
    /// Prefix of the failure message when an assertion does not hold
    pub fail_message: &'static str,
    pub procedure: CheckFn<C>,
}

impl<C> Check<C> {
    pub fn new(
        category: &'static str,
        description: &'static str,
        fail_message: &'static str,
        procedure: CheckFn<C>,
    ) -> Self {
        Self {
            sequence: 0,
            category,
            description,
            fail_message,
            procedure,
        }
    }
}

impl<C> fmt::Debug for Check<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("sequence", &self.sequence)
            .field("category", &self.category)
            .field("description", &self.description)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    Errored,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Passed => write!(f, "passed"),
            CheckStatus::Failed => write!(f, "failed"),
            CheckStatus::Errored => write!(f, "errored"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub sequence: u32,
    pub category: String,
    pub description: String,
    pub status: CheckStatus,
    pub message: Option<String>,
}

/// Outcomes of one run, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<CheckOutcome>,
    /// Number of checks in the battery, executed or not
    pub total: usize,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.count(CheckStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(CheckStatus::Failed)
    }

    pub fn errored(&self) -> usize {
        self.count(CheckStatus::Errored)
    }

    /// Checks never started because the run halted
    pub fn skipped(&self) -> usize {
        self.total.saturating_sub(self.outcomes.len())
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.len() == self.total && self.passed() == self.total
    }

    /// The failed or errored outcome that stopped the run
    pub fn halted_at(&self) -> Option<&CheckOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.status != CheckStatus::Passed)
    }

    pub fn into_result(self) -> HarnessResult<RunReport> {
        let Some(halt) = self.halted_at() else {
            return Ok(self);
        };
        let (sequence, category) = (halt.sequence, halt.category.clone());
        let message = halt.message.clone().unwrap_or_default();
        Err(match halt.status {
            CheckStatus::Failed => HarnessError::CheckFailed {
                sequence,
                category,
                message,
            },
            _ => HarnessError::CheckErrored {
                sequence,
                category,
                message,
            },
        })
    }
}

/// Runs checks strictly in order, stopping at the first failure or error
pub struct SuiteRunner<C> {
    checks: Vec<Check<C>>,
}

impl<C: Sync> SuiteRunner<C> {
    /// Build a runner; checks are renumbered from 1 in the given order.
    pub fn new(mut checks: Vec<Check<C>>) -> Self {
        for (i, check) in checks.iter_mut().enumerate() {
            check.sequence = i as u32 + 1;
        }
        Self { checks }
    }

    pub fn checks(&self) -> &[Check<C>] {
        &self.checks
    }

    pub async fn run(&self, context: &C, reporter: &mut dyn Reporter) -> RunReport {
        let mut report = RunReport {
            outcomes: Vec::with_capacity(self.checks.len()),
            total: self.checks.len(),
        };
        reporter.run_started(self.checks.len());

        for check in &self.checks {
            reporter.check_started(check.sequence, check.category, check.description);
            let result = AssertUnwindSafe((check.procedure)(context))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(CheckError::Unexpected(panic_message(panic))));

            let (status, message) = match result {
                Ok(detail) => (CheckStatus::Passed, detail),
                Err(CheckError::Assertion(detail)) => (
                    CheckStatus::Failed,
                    Some(format!("{}: {}", check.fail_message, detail)),
                ),
                Err(err) => (CheckStatus::Errored, Some(err.to_string())),
            };
            let outcome = CheckOutcome {
                sequence: check.sequence,
                category: check.category.to_string(),
                description: check.description.to_string(),
                status,
                message,
            };

            match status {
                CheckStatus::Passed => reporter.check_passed(&outcome),
                CheckStatus::Failed => reporter.check_failed(&outcome),
                CheckStatus::Errored => reporter.check_errored(&outcome),
            }
            report.outcomes.push(outcome);
            if status != CheckStatus::Passed {
                break;
            }
        }

        reporter.run_finished(&report);
        report
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RecordingReporter, ReporterEvent, ensure_check};
    use pretty_assertions::assert_eq;
    use qcert_core::QcertError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tally {
        calls: AtomicUsize,
    }

    fn pass(tally: &Tally) -> BoxFuture<'_, CheckResult> {
        async move {
            tally.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(format!("call {}", tally.calls.load(Ordering::SeqCst))))
        }
        .boxed()
    }

    fn fail(tally: &Tally) -> BoxFuture<'_, CheckResult> {
        async move {
            tally.calls.fetch_add(1, Ordering::SeqCst);
            ensure_check!(1 + 1 == 3, "arithmetic is {}", "broken");
            Ok(None)
        }
        .boxed()
    }

    fn adapter_error(_: &Tally) -> BoxFuture<'_, CheckResult> {
        async move { Err(QcertError::TableNotFound("Car".into()).into()) }.boxed()
    }

    fn panics(_: &Tally) -> BoxFuture<'_, CheckResult> {
        async move {
            let rows: Vec<u8> = Vec::new();
            Ok(Some(rows[3].to_string()))
        }
        .boxed()
    }

    fn battery(middle: CheckFn<Tally>) -> SuiteRunner<Tally> {
        SuiteRunner::new(vec![
            Check::new("FIRST", "first", "first broke", pass),
            Check::new("MIDDLE", "middle", "middle broke", middle),
            Check::new("LAST", "last", "last broke", pass),
        ])
    }

    #[tokio::test]
    async fn test_all_checks_run_in_order() {
        let tally = Tally::default();
        let mut reporter = RecordingReporter::default();
        let report = battery(pass).run(&tally, &mut reporter).await;

        assert!(report.is_success());
        assert_eq!(report.passed(), 3);
        assert_eq!(tally.calls.load(Ordering::SeqCst), 3);
        let sequences: Vec<u32> = report.outcomes.iter().map(|o| o.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(report.outcomes[2].message.as_deref(), Some("call 3"));
        assert!(report.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_failure_halts_the_run() {
        let tally = Tally::default();
        let mut reporter = RecordingReporter::default();
        let report = battery(fail).run(&tally, &mut reporter).await;

        assert_eq!(tally.calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.skipped(), 1);
        let halt = report.halted_at().unwrap();
        assert_eq!(halt.status, CheckStatus::Failed);
        assert_eq!(halt.message.as_deref(), Some("middle broke: arithmetic is broken"));
        assert_eq!(
            reporter.events().last(),
            Some(&ReporterEvent::Finished { executed: 2, total: 3 })
        );
        assert!(matches!(
            report.into_result(),
            Err(HarnessError::CheckFailed { sequence: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_adapter_error_is_errored_not_failed() {
        let tally = Tally::default();
        let report = battery(adapter_error)
            .run(&tally, &mut RecordingReporter::default())
            .await;

        let halt = report.halted_at().unwrap();
        assert_eq!(halt.status, CheckStatus::Errored);
        assert!(halt.message.as_deref().unwrap().contains("Car"));
        assert_eq!(report.errored(), 1);
        assert!(matches!(
            report.into_result(),
            Err(HarnessError::CheckErrored { sequence: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_panic_is_contained_and_errored() {
        let tally = Tally::default();
        let mut reporter = RecordingReporter::default();
        let report = battery(panics).run(&tally, &mut reporter).await;

        assert_eq!(report.outcomes.len(), 2);
        let halt = report.halted_at().unwrap();
        assert_eq!(halt.status, CheckStatus::Errored);
        assert!(halt.message.as_deref().unwrap().contains("panicked"));
        assert!(matches!(
            reporter.events().iter().rev().nth(1),
            Some(ReporterEvent::Errored(outcome)) if outcome.sequence == 2
        ));
    }

    #[tokio::test]
    async fn test_every_check_announces_its_start() {
        let tally = Tally::default();
        let mut reporter = RecordingReporter::default();
        battery(pass).run(&tally, &mut reporter).await;

        let started: Vec<&str> = reporter
            .events()
            .iter()
            .filter_map(|e| match e {
                ReporterEvent::Started { description, .. } => Some(description.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec!["first", "middle", "last"]);
    }
}
