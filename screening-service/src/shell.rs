use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;
use view_flow::{RequestTicket, Settlement};

use crate::error::ScreeningError;
use crate::gemini::RequestFormatter;
use crate::views::{
    KnowledgeQueryController, KnowledgeQuerySnapshot, RiskProfilerController,
    RiskProfilerSnapshot, ScanAnalysisController, ScanAnalysisSnapshot, Submission,
};
use crate::workflow::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Home,
    Analyze,
    Risk,
    Info,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Home => "home",
            View::Analyze => "analyze",
            View::Risk => "risk",
            View::Info => "info",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
enum ActiveView {
    Home,
    Analyze(ScanAnalysisController),
    Risk(RiskProfilerController),
    Info(KnowledgeQueryController),
}

impl ActiveView {
    fn kind(&self) -> View {
        match self {
            ActiveView::Home => View::Home,
            ActiveView::Analyze(_) => View::Analyze,
            ActiveView::Risk(_) => View::Risk,
            ActiveView::Info(_) => View::Info,
        }
    }
}

/// Current view and its state, as sent to the browser
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewSnapshot {
    Home,
    Analyze(ScanAnalysisSnapshot),
    Risk(RiskProfilerSnapshot),
    Info(KnowledgeQuerySnapshot),
}

/// Holds the selected view. Only that view's controller exists; leaving a view
/// drops its controller, which cancels any request it still has in flight.
#[derive(Debug)]
pub struct NavigationShell {
    active: ActiveView,
}

impl Default for NavigationShell {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationShell {
    pub fn new() -> Self {
        Self {
            active: ActiveView::Home,
        }
    }

    pub fn current(&self) -> View {
        self.active.kind()
    }

    /// Switch to `view`, starting it from a fresh state.
    ///
    /// Returns the request the new view issues on entry, if any. Selecting the
    /// view that is already shown changes nothing.
    pub fn navigate(&mut self, view: View, formatter: &RequestFormatter) -> Option<Submission> {
        if view == self.current() {
            return None;
        }

        info!(from = %self.current(), to = %view, "Navigating");

        let (active, submission) = match view {
            View::Home => (ActiveView::Home, None),
            View::Analyze => (ActiveView::Analyze(ScanAnalysisController::new()), None),
            View::Risk => (ActiveView::Risk(RiskProfilerController::new()), None),
            View::Info => {
                let mut controller = KnowledgeQueryController::new();
                let submission = controller.open(formatter);
                (ActiveView::Info(controller), Some(submission))
            }
        };
        self.active = active;
        submission
    }

    pub fn scan_mut(&mut self) -> Result<&mut ScanAnalysisController, ScreeningError> {
        let current = self.current();
        match &mut self.active {
            ActiveView::Analyze(controller) => Ok(controller),
            _ => Err(ScreeningError::WrongView {
                expected: View::Analyze,
                current,
            }),
        }
    }

    pub fn risk_mut(&mut self) -> Result<&mut RiskProfilerController, ScreeningError> {
        let current = self.current();
        match &mut self.active {
            ActiveView::Risk(controller) => Ok(controller),
            _ => Err(ScreeningError::WrongView {
                expected: View::Risk,
                current,
            }),
        }
    }

    pub fn knowledge_mut(&mut self) -> Result<&mut KnowledgeQueryController, ScreeningError> {
        let current = self.current();
        match &mut self.active {
            ActiveView::Info(controller) => Ok(controller),
            _ => Err(ScreeningError::WrongView {
                expected: View::Info,
                current,
            }),
        }
    }

    /// Route a finished request's outcome to the view that issued it.
    ///
    /// If that view is no longer shown the outcome is stale.
    pub fn settle(&mut self, ticket: &RequestTicket, outcome: Outcome) -> Settlement {
        match (&mut self.active, outcome) {
            (ActiveView::Analyze(controller), Outcome::ScanAnalysis(result)) => {
                controller.settle(ticket, result)
            }
            (ActiveView::Risk(controller), Outcome::RiskAssessment(result)) => {
                controller.settle(ticket, result)
            }
            (ActiveView::Info(controller), Outcome::KnowledgeQuery(result)) => {
                controller.settle(ticket, result)
            }
            _ => Settlement::Stale,
        }
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        match &self.active {
            ActiveView::Home => ViewSnapshot::Home,
            ActiveView::Analyze(controller) => ViewSnapshot::Analyze(controller.snapshot()),
            ActiveView::Risk(controller) => ViewSnapshot::Risk(controller.snapshot()),
            ActiveView::Info(controller) => ViewSnapshot::Info(controller.snapshot()),
        }
    }
}
