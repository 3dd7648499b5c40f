pub mod client;
pub mod parse;
pub mod request;
pub mod response;
pub mod schema;

pub use client::{GeminiClient, InferenceClient, InferenceError};
pub use parse::{
    KNOWLEDGE_FALLBACK, ParseError, RISK_FALLBACK, extract_sources, parse_knowledge_answer,
    parse_risk_assessment, parse_scan_analysis,
};
pub use request::{GenerateRequest, RequestFormatter};
pub use response::GenerateResponse;
