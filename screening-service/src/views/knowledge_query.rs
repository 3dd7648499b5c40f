use serde::Serialize;
use tracing::{error, info};
use view_flow::{RequestTicket, Settlement, ViewSlot, ViewState};

use super::{Submission, SubmissionKind};
use crate::error::ScreeningError;
use crate::gemini::RequestFormatter;
use crate::models::KnowledgeAnswer;

pub const DEFAULT_QUERY: &str = "Lung cancer early symptoms and screening guidelines";

pub const TOPICS: [&str; 5] = [
    "Early symptoms",
    "Screening guidelines",
    "Immunotherapy advances",
    "Stage IV treatments",
    "Smoking vs Genetic factors",
];

pub const KNOWLEDGE_FAILURE_MESSAGE: &str = "Unable to retrieve information. Please try again.";

/// Free-text questions answered with search grounding.
///
/// Unlike the other views this one issues a request by itself: the default
/// query is submitted as soon as the view is opened. A new query supersedes
/// whatever is still in flight.
#[derive(Debug)]
pub struct KnowledgeQueryController {
    query: String,
    slot: ViewSlot<KnowledgeAnswer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeQuerySnapshot {
    pub query: String,
    pub topics: &'static [&'static str],
    pub state: ViewState<KnowledgeAnswer>,
}

impl Default for KnowledgeQueryController {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeQueryController {
    pub fn new() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            slot: ViewSlot::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn state(&self) -> &ViewState<KnowledgeAnswer> {
        self.slot.state()
    }

    /// Submit the current query on first display
    pub fn open(&mut self, formatter: &RequestFormatter) -> Submission {
        self.dispatch(formatter)
    }

    /// Submit a topic or free-text query
    pub fn submit_query(
        &mut self,
        query: &str,
        formatter: &RequestFormatter,
    ) -> Result<Submission, ScreeningError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ScreeningError::EmptyQuery);
        }
        self.query = query.to_string();
        Ok(self.dispatch(formatter))
    }

    pub fn settle(
        &mut self,
        ticket: &RequestTicket,
        outcome: Result<KnowledgeAnswer, ScreeningError>,
    ) -> Settlement {
        let outcome = outcome.map_err(|e| {
            error!(seq = ticket.seq(), "Knowledge query failed: {}", e);
            KNOWLEDGE_FAILURE_MESSAGE.to_string()
        });
        self.slot.settle(ticket, outcome)
    }

    pub fn snapshot(&self) -> KnowledgeQuerySnapshot {
        KnowledgeQuerySnapshot {
            query: self.query.clone(),
            topics: &TOPICS,
            state: self.slot.state().clone(),
        }
    }

    fn dispatch(&mut self, formatter: &RequestFormatter) -> Submission {
        let request = formatter.knowledge_query(&self.query);
        let ticket = self.slot.supersede();

        info!(seq = ticket.seq(), query = %self.query, "Knowledge query submitted");
        Submission {
            kind: SubmissionKind::KnowledgeQuery,
            ticket,
            request,
        }
    }
}
