pub mod knowledge_query;
pub mod risk_profiler;
pub mod scan_analysis;

pub use knowledge_query::{KnowledgeQueryController, KnowledgeQuerySnapshot};
pub use risk_profiler::{RiskProfilerController, RiskProfilerSnapshot};
pub use scan_analysis::{ScanAnalysisController, ScanAnalysisSnapshot};

use view_flow::RequestTicket;

use crate::gemini::GenerateRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    ScanAnalysis,
    RiskAssessment,
    KnowledgeQuery,
}

/// A request a controller has committed to: the view is loading and waits for
/// the outcome tagged with `ticket`.
#[derive(Debug, Clone)]
pub struct Submission {
    pub kind: SubmissionKind,
    pub ticket: RequestTicket,
    pub request: GenerateRequest,
}
