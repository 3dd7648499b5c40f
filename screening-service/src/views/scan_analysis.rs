use serde::Serialize;
use tracing::{error, info};
use view_flow::{RequestTicket, Settlement, ViewSlot, ViewState};

use super::{Submission, SubmissionKind};
use crate::error::ScreeningError;
use crate::gemini::RequestFormatter;
use crate::models::{ScanAnalysisResult, ScanImage};

pub const SCAN_FAILURE_MESSAGE: &str = "Analysis failed. Please try again with a clearer image.";

/// Upload a scan, then explicitly ask for it to be analyzed
#[derive(Debug, Default)]
pub struct ScanAnalysisController {
    image: Option<ScanImage>,
    slot: ViewSlot<ScanAnalysisResult>,
}

/// Metadata of the selected image. The bytes are served separately.
#[derive(Debug, Clone, Serialize)]
pub struct ImagePreview {
    pub mime_type: String,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanAnalysisSnapshot {
    pub image: Option<ImagePreview>,
    pub state: ViewState<ScanAnalysisResult>,
}

impl ScanAnalysisController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&ScanImage> {
        self.image.as_ref()
    }

    pub fn state(&self) -> &ViewState<ScanAnalysisResult> {
        self.slot.state()
    }

    /// Replace the selected image. Any previous result, error or in-flight
    /// analysis belongs to the old image and is discarded.
    pub fn select_image(&mut self, image: ScanImage) {
        info!(mime_type = image.mime_type(), bytes = image.bytes().len(), "Scan image selected");
        self.slot.reset();
        self.image = Some(image);
    }

    pub fn clear_image(&mut self) {
        self.slot.reset();
        self.image = None;
    }

    pub fn begin_analysis(
        &mut self,
        formatter: &RequestFormatter,
    ) -> Result<Submission, ScreeningError> {
        let image = self.image.as_ref().ok_or(ScreeningError::NoImageSelected)?;
        let request = formatter.scan_analysis(image);
        let ticket = self.slot.begin()?;

        info!(seq = ticket.seq(), "Scan analysis submitted");
        Ok(Submission {
            kind: SubmissionKind::ScanAnalysis,
            ticket,
            request,
        })
    }

    pub fn settle(
        &mut self,
        ticket: &RequestTicket,
        outcome: Result<ScanAnalysisResult, ScreeningError>,
    ) -> Settlement {
        let outcome = outcome.map_err(|e| {
            error!(seq = ticket.seq(), "Scan analysis failed: {}", e);
            SCAN_FAILURE_MESSAGE.to_string()
        });
        self.slot.settle(ticket, outcome)
    }

    pub fn snapshot(&self) -> ScanAnalysisSnapshot {
        ScanAnalysisSnapshot {
            image: self.image.as_ref().map(|image| ImagePreview {
                mime_type: image.mime_type().to_string(),
                size_bytes: image.bytes().len(),
            }),
            state: self.slot.state().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use view_flow::FlowError;

    fn png() -> ScanImage {
        ScanImage::from_bytes(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap()
    }

    fn sample_result() -> ScanAnalysisResult {
        ScanAnalysisResult {
            summary: "Clear.".to_string(),
            findings: vec![],
            recommendations: vec![],
            disclaimer: "Not a diagnosis.".to_string(),
        }
    }

    #[test]
    fn test_analysis_requires_an_image() {
        let mut controller = ScanAnalysisController::new();
        let err = controller
            .begin_analysis(&RequestFormatter::default())
            .unwrap_err();

        assert!(matches!(err, ScreeningError::NoImageSelected));
        assert_eq!(controller.state(), &ViewState::Idle);
    }

    #[test]
    fn test_selecting_an_image_does_not_submit() {
        let mut controller = ScanAnalysisController::new();
        controller.select_image(png());

        assert!(controller.image().is_some());
        assert_eq!(controller.state(), &ViewState::Idle);
    }

    #[test]
    fn test_successful_analysis() {
        let mut controller = ScanAnalysisController::new();
        controller.select_image(png());

        let submission = controller
            .begin_analysis(&RequestFormatter::default())
            .unwrap();
        assert_eq!(submission.kind, SubmissionKind::ScanAnalysis);
        assert!(controller.state().is_loading());

        let settlement = controller.settle(&submission.ticket, Ok(sample_result()));
        assert_eq!(settlement, Settlement::Applied);
        assert_eq!(controller.state().result(), Some(&sample_result()));
    }

    #[test]
    fn test_second_submission_while_loading_is_refused() {
        let mut controller = ScanAnalysisController::new();
        controller.select_image(png());
        controller
            .begin_analysis(&RequestFormatter::default())
            .unwrap();

        let err = controller
            .begin_analysis(&RequestFormatter::default())
            .unwrap_err();
        assert!(matches!(err, ScreeningError::Flow(FlowError::RequestInFlight)));
    }

    #[test]
    fn test_failure_shows_generic_message() {
        let mut controller = ScanAnalysisController::new();
        controller.select_image(png());
        let submission = controller
            .begin_analysis(&RequestFormatter::default())
            .unwrap();

        let parse_error = serde_json::from_str::<ScanAnalysisResult>("not json").unwrap_err();
        controller.settle(
            &submission.ticket,
            Err(ScreeningError::Parse(parse_error.into())),
        );

        assert_eq!(controller.state().error(), Some(SCAN_FAILURE_MESSAGE));
        assert!(controller.state().result().is_none());
    }

    #[test]
    fn test_result_for_replaced_image_is_discarded() {
        let mut controller = ScanAnalysisController::new();
        controller.select_image(png());
        let submission = controller
            .begin_analysis(&RequestFormatter::default())
            .unwrap();

        controller.select_image(png());

        assert!(submission.ticket.is_cancelled());
        let settlement = controller.settle(&submission.ticket, Ok(sample_result()));
        assert_eq!(settlement, Settlement::Stale);
        assert_eq!(controller.state(), &ViewState::Idle);
    }

    #[test]
    fn test_clear_returns_to_idle_without_image() {
        let mut controller = ScanAnalysisController::new();
        controller.select_image(png());
        let submission = controller
            .begin_analysis(&RequestFormatter::default())
            .unwrap();
        controller.settle(&submission.ticket, Ok(sample_result()));

        controller.clear_image();

        assert!(controller.image().is_none());
        assert_eq!(controller.state(), &ViewState::Idle);
        assert!(controller.snapshot().image.is_none());
    }

    #[test]
    fn test_clear_while_loading_cancels_analysis() {
        let mut controller = ScanAnalysisController::new();
        controller.select_image(png());
        let submission = controller
            .begin_analysis(&RequestFormatter::default())
            .unwrap();

        controller.clear_image();

        assert!(submission.ticket.is_cancelled());
        assert_eq!(controller.state(), &ViewState::Idle);
        assert_eq!(
            controller.settle(&submission.ticket, Ok(sample_result())),
            Settlement::Stale
        );
        assert_eq!(controller.state(), &ViewState::Idle);
        assert!(controller.image().is_none());
    }

    #[test]
    fn test_snapshot_does_not_embed_image_bytes() {
        let mut controller = ScanAnalysisController::new();
        controller.select_image(png());

        let snapshot = serde_json::to_value(controller.snapshot()).unwrap();
        assert_eq!(
            snapshot["image"],
            serde_json::json!({ "mime_type": "image/png", "size_bytes": 8 })
        );
    }
}
