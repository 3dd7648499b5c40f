//! Cancellable execution of a view's remote request.
//!
//! A view hands out a [`RequestTicket`] when it enters the loading state and the
//! caller drives the remote call through [`run_cancellable`]. If the view cancels
//! the ticket before the call finishes (a newer submission, an explicit reset, or
//! the view being dropped on navigation) the call future is dropped on the spot
//! and no outcome is produced.
//!
//! ```rust,ignore
//! let ticket = slot.begin()?;
//! // release any lock guarding `slot` here
//! if let Some(outcome) = run_cancellable(&ticket, client.invoke(&request)).await {
//!     // re-acquire the lock
//!     slot.settle(&ticket, outcome.map_err(|e| e.to_string()));
//! }
//! ```
//!
//! Even when the call wins the race, [`ViewSlot::settle`](crate::ViewSlot::settle)
//! still checks the ticket, since cancellation may land between completion and
//! the lock being re-acquired.

use std::future::Future;

use tracing::debug;

use crate::ticket::RequestTicket;

/// Drive `work` to completion unless `ticket` is cancelled first.
///
/// Returns `None` when cancellation wins.
pub async fn run_cancellable<F>(ticket: &RequestTicket, work: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = ticket.cancellation_token().cancelled() => {
            debug!(seq = ticket.seq(), "Request cancelled before completion");
            None
        }
        output = work => Some(output),
    }
}
