pub mod error;
pub mod runner;
pub mod state;
pub mod storage;
pub mod ticket;

// Re-export commonly used types
pub use error::{FlowError, Result};
pub use runner::run_cancellable;
pub use state::{Settlement, ViewSlot, ViewState};
pub use storage::{InMemorySessionStorage, SessionStorage};
pub use ticket::{RequestTicket, TicketIssuer};
