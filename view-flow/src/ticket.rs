use tokio_util::sync::CancellationToken;

/// Handle for one issued request.
///
/// The sequence number identifies the request within its view; the cancellation
/// token lets the view abandon it. Clones share the same token.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    seq: u64,
    cancel: CancellationToken,
}

impl RequestTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Issues monotonically increasing tickets for a single view and remembers
/// which one is current.
///
/// Only one ticket is active at a time: issuing a new one cancels the previous
/// one, and dropping the issuer cancels whatever is still active.
#[derive(Debug, Default)]
pub struct TicketIssuer {
    last_seq: u64,
    active: Option<RequestTicket>,
}

impl TicketIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh ticket, cancelling the active one if any
    pub fn issue(&mut self) -> RequestTicket {
        self.cancel_active();
        self.last_seq += 1;

        let ticket = RequestTicket {
            seq: self.last_seq,
            cancel: CancellationToken::new(),
        };
        self.active = Some(ticket.clone());
        ticket
    }

    /// True when `ticket` is the latest one issued and has not been retired
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.seq == ticket.seq)
    }

    /// Mark `ticket` as settled. Returns false if it was not the current one.
    pub fn retire(&mut self, ticket: &RequestTicket) -> bool {
        if self.is_current(ticket) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn cancel_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }

    pub fn has_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }
}

impl Drop for TicketIssuer {
    fn drop(&mut self) {
        self.cancel_active();
    }
}
