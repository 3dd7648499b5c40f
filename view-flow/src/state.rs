use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{FlowError, Result},
    ticket::{RequestTicket, TicketIssuer},
};

/// State of a view with respect to its remote request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum ViewState<T> {
    /// Nothing to show yet
    Idle,
    /// A request is in flight
    Loading,
    /// The last request produced a result
    Success(T),
    /// The last request failed; holds the message shown to the user
    Failed(String),
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        ViewState::Idle
    }
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn result(&self) -> Option<&T> {
        match self {
            ViewState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// What became of an outcome handed to [`ViewSlot::settle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The outcome was written into the view
    Applied,
    /// The ticket was superseded, cancelled or already settled; the outcome was dropped
    Stale,
}

/// A view's state together with the tickets guarding it.
///
/// Every transition into [`ViewState::Loading`] issues a ticket, and only the
/// holder of the current ticket may move the slot out of it. Late answers to
/// superseded requests therefore never overwrite newer state.
#[derive(Debug)]
pub struct ViewSlot<T> {
    state: ViewState<T>,
    tickets: TicketIssuer,
}

impl<T> Default for ViewSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ViewSlot<T> {
    pub fn new() -> Self {
        Self {
            state: ViewState::Idle,
            tickets: TicketIssuer::new(),
        }
    }

    pub fn state(&self) -> &ViewState<T> {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Start a request, refusing if one is already in flight
    pub fn begin(&mut self) -> Result<RequestTicket> {
        if self.is_loading() {
            return Err(FlowError::RequestInFlight);
        }
        Ok(self.supersede())
    }

    /// Start a request, cancelling any request still in flight
    pub fn supersede(&mut self) -> RequestTicket {
        let ticket = self.tickets.issue();
        self.state = ViewState::Loading;
        ticket
    }

    /// Apply the outcome of the request identified by `ticket`
    pub fn settle(
        &mut self,
        ticket: &RequestTicket,
        outcome: std::result::Result<T, String>,
    ) -> Settlement {
        if ticket.is_cancelled() || !self.tickets.retire(ticket) {
            debug!(
                seq = ticket.seq(),
                latest = self.tickets.last_seq(),
                "Discarding outcome of stale request"
            );
            return Settlement::Stale;
        }

        self.state = match outcome {
            Ok(value) => ViewState::Success(value),
            Err(message) => ViewState::Failed(message),
        };
        Settlement::Applied
    }

    /// Cancel anything in flight and go back to idle
    pub fn reset(&mut self) {
        self.tickets.cancel_active();
        self.state = ViewState::Idle;
    }
}
