pub mod config;
pub mod error;
pub mod gemini;
pub mod models;
pub mod service;
pub mod shell;
pub mod views;
pub mod workflow;

#[cfg(test)]
mod test_support;

pub use config::{ModelSet, ServiceConfig};
pub use error::ScreeningError;
pub use service::{AppState, build_router, create_app};
pub use shell::{NavigationShell, View, ViewSnapshot};
pub use workflow::{ScreeningSession, create_screening_session, spawn_submission};
pub use models::*;
