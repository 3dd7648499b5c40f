use thiserror::Error;
use view_flow::FlowError;

use crate::gemini::{InferenceError, ParseError};
use crate::shell::View;

#[derive(Error, Debug)]
pub enum ScreeningError {
    #[error("No scan image selected")]
    NoImageSelected,

    #[error("Unsupported image upload: {0}")]
    UnsupportedImage(String),

    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error("Risk profile is locked while an assessment is loading or shown")]
    FormLocked,

    #[error("Operation requires the {expected} view but the {current} view is active")]
    WrongView { expected: View, current: View },

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
