//! Notification stream emitted while a battery runs

use serde::Serialize;

use crate::{CheckOutcome, RunReport};

/// Receives start/pass/fail/error notifications from a [`crate::SuiteRunner`]
pub trait Reporter: Send {
    fn run_started(&mut self, _total: usize) {}

    fn check_started(&mut self, sequence: u32, category: &str, description: &str);

    fn check_passed(&mut self, outcome: &CheckOutcome);

    fn check_failed(&mut self, outcome: &CheckOutcome);

    fn check_errored(&mut self, outcome: &CheckOutcome);

    fn run_finished(&mut self, _report: &RunReport) {}
}

/// Emits each notification as a structured `tracing` event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn run_started(&mut self, total: usize) {
        tracing::info!(total, "starting conformance run");
    }

    fn check_started(&mut self, sequence: u32, category: &str, description: &str) {
        tracing::info!(sequence, category = %category, "{}", description);
    }

    fn check_passed(&mut self, outcome: &CheckOutcome) {
        match &outcome.message {
            Some(detail) => tracing::info!(sequence = outcome.sequence, "passed: {}", detail),
            None => tracing::info!(sequence = outcome.sequence, "passed"),
        }
    }

    fn check_failed(&mut self, outcome: &CheckOutcome) {
        tracing::warn!(
            sequence = outcome.sequence,
            category = %outcome.category,
            "failed: {}",
            outcome.message.as_deref().unwrap_or_default()
        );
    }

    fn check_errored(&mut self, outcome: &CheckOutcome) {
        tracing::error!(
            sequence = outcome.sequence,
            category = %outcome.category,
            "errored: {}",
            outcome.message.as_deref().unwrap_or_default()
        );
    }

    fn run_finished(&mut self, report: &RunReport) {
        tracing::info!(
            passed = report.passed(),
            failed = report.failed(),
            errored = report.errored(),
            skipped = report.skipped(),
            "conformance run finished"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReporterEvent {
    RunStarted {
        total: usize,
    },
    Started {
        sequence: u32,
        category: String,
        description: String,
    },
    Passed(CheckOutcome),
    Failed(CheckOutcome),
    Errored(CheckOutcome),
    Finished {
        executed: usize,
        total: usize,
    },
}

/// Keeps every notification for later inspection
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    events: Vec<ReporterEvent>,
}

impl RecordingReporter {
    pub fn events(&self) -> &[ReporterEvent] {
        &self.events
    }

    /// Final outcome of every executed check
    pub fn outcomes(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.events.iter().filter_map(|e| match e {
            ReporterEvent::Passed(o) | ReporterEvent::Failed(o) | ReporterEvent::Errored(o) => Some(o),
            _ => None,
        })
    }
}

impl Reporter for RecordingReporter {
    fn run_started(&mut self, total: usize) {
        self.events.push(ReporterEvent::RunStarted { total });
    }

    fn check_started(&mut self, sequence: u32, category: &str, description: &str) {
        self.events.push(ReporterEvent::Started {
            sequence,
            category: category.to_string(),
            description: description.to_string(),
        });
    }

    fn check_passed(&mut self, outcome: &CheckOutcome) {
        self.events.push(ReporterEvent::Passed(outcome.clone()));
    }

    fn check_failed(&mut self, outcome: &CheckOutcome) {
        self.events.push(ReporterEvent::Failed(outcome.clone()));
    }

    fn check_errored(&mut self, outcome: &CheckOutcome) {
        self.events.push(ReporterEvent::Errored(outcome.clone()));
    }

    fn run_finished(&mut self, report: &RunReport) {
        self.events.push(ReporterEvent::Finished {
            executed: report.outcomes.len(),
            total: report.total,
        });
    }
}

/// Forwards every notification to each wrapped reporter in turn
#[derive(Default)]
pub struct Reporters<'a> {
    inner: Vec<&'a mut dyn Reporter>,
}

impl<'a> Reporters<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: &'a mut dyn Reporter) -> Self {
        self.inner.push(reporter);
        self
    }
}

impl Reporter for Reporters<'_> {
    fn run_started(&mut self, total: usize) {
        self.inner.iter_mut().for_each(|r| r.run_started(total));
    }

    fn check_started(&mut self, sequence: u32, category: &str, description: &str) {
        self.inner
            .iter_mut()
            .for_each(|r| r.check_started(sequence, category, description));
    }

    fn check_passed(&mut self, outcome: &CheckOutcome) {
        self.inner.iter_mut().for_each(|r| r.check_passed(outcome));
    }

    fn check_failed(&mut self, outcome: &CheckOutcome) {
        self.inner.iter_mut().for_each(|r| r.check_failed(outcome));
    }

    fn check_errored(&mut self, outcome: &CheckOutcome) {
        self.inner.iter_mut().for_each(|r| r.check_errored(outcome));
    }

    fn run_finished(&mut self, report: &RunReport) {
        self.inner.iter_mut().for_each(|r| r.run_finished(report));
    }
}
