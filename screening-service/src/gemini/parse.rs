use thiserror::Error;

use super::response::{GenerateResponse, GroundingChunk};
use crate::models::{KnowledgeAnswer, RiskAssessment, ScanAnalysisResult, Source};

pub const RISK_FALLBACK: &str = "Unable to generate assessment.";
pub const KNOWLEDGE_FALLBACK: &str = "Information unavailable.";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Scan analysis payload is not a valid result: {0}")]
    InvalidScanPayload(#[from] serde_json::Error),
}

/// Parse the structured scan reading. Any missing field fails the whole result.
pub fn parse_scan_analysis(response: &GenerateResponse) -> Result<ScanAnalysisResult, ParseError> {
    let text = response.text();
    Ok(serde_json::from_str(text.trim())?)
}

pub fn parse_risk_assessment(response: &GenerateResponse) -> RiskAssessment {
    RiskAssessment::new(text_or(response, RISK_FALLBACK))
}

pub fn parse_knowledge_answer(response: &GenerateResponse) -> KnowledgeAnswer {
    KnowledgeAnswer::new(
        text_or(response, KNOWLEDGE_FALLBACK),
        extract_sources(response.grounding_chunks()),
    )
}

/// Normalize grounding chunks into citations.
///
/// A chunk contributes its web reference, else its maps reference. Chunks with
/// neither, or whose reference has no uri, are dropped. Order is preserved.
pub fn extract_sources(chunks: &[GroundingChunk]) -> Vec<Source> {
    chunks
        .iter()
        .filter_map(|chunk| chunk.web.as_ref().or(chunk.maps.as_ref()))
        .filter_map(|reference| {
            let uri = reference.uri.as_deref()?.trim();
            if uri.is_empty() {
                return None;
            }
            let title = reference
                .title
                .as_deref()
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .unwrap_or(uri);
            Some(Source {
                title: title.to_string(),
                uri: uri.to_string(),
            })
        })
        .collect()
}

fn text_or(response: &GenerateResponse, fallback: &str) -> String {
    let text = response.text();
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::response::ChunkReference;

    fn reference(uri: &str, title: Option<&str>) -> Option<ChunkReference> {
        Some(ChunkReference {
            uri: Some(uri.to_string()),
            title: title.map(str::to_string),
        })
    }

    #[test]
    fn test_parse_well_formed_scan_analysis() {
        let response = GenerateResponse::from_text(
            r#"{
                "summary": "No acute findings. Lungs are clear.",
                "findings": ["No nodules", "No effusion"],
                "recommendations": ["Routine follow-up"],
                "disclaimer": "Not a diagnosis."
            }"#,
        );

        let result = parse_scan_analysis(&response).unwrap();

        assert_eq!(
            result,
            ScanAnalysisResult {
                summary: "No acute findings. Lungs are clear.".to_string(),
                findings: vec!["No nodules".to_string(), "No effusion".to_string()],
                recommendations: vec!["Routine follow-up".to_string()],
                disclaimer: "Not a diagnosis.".to_string(),
            }
        );
    }

    #[test]
    fn test_scan_analysis_missing_field_fails() {
        let response = GenerateResponse::from_text(
            r#"{"summary": "s", "findings": [], "recommendations": []}"#,
        );
        let err = parse_scan_analysis(&response).unwrap_err();
        assert!(err.to_string().contains("disclaimer"));
    }

    #[test]
    fn test_scan_analysis_non_json_fails() {
        let response = GenerateResponse::from_text("I cannot analyze this image.");
        assert!(parse_scan_analysis(&response).is_err());

        assert!(parse_scan_analysis(&GenerateResponse::default()).is_err());
    }

    #[test]
    fn test_risk_assessment_passes_text_through() {
        let response = GenerateResponse::from_text("Moderate risk.\nConsider LDCT.");
        let assessment = parse_risk_assessment(&response);

        assert_eq!(assessment.text, "Moderate risk.\nConsider LDCT.");
        assert_eq!(assessment.paragraphs, vec!["Moderate risk.", "Consider LDCT."]);
    }

    #[test]
    fn test_empty_payloads_use_fallback_text() {
        let empty = GenerateResponse::from_text("");

        assert_eq!(parse_risk_assessment(&empty).text, RISK_FALLBACK);
        assert_eq!(parse_knowledge_answer(&empty).text, KNOWLEDGE_FALLBACK);
        assert_eq!(
            parse_knowledge_answer(&GenerateResponse::default()).text,
            KNOWLEDGE_FALLBACK
        );
    }

    #[test]
    fn test_knowledge_answer_without_sources() {
        let response = GenerateResponse::from_text("Early symptoms include a persistent cough.")
            .with_grounding(Vec::new());

        let answer = parse_knowledge_answer(&response);

        assert!(answer.sources.is_empty());
        assert_eq!(answer.text, "Early symptoms include a persistent cough.");
    }

    #[test]
    fn test_extract_sources_drops_unreferenced_chunks_and_keeps_order() {
        let chunks = vec![
            GroundingChunk {
                web: reference("https://a.example", Some("A")),
                maps: None,
            },
            GroundingChunk {
                web: None,
                maps: None,
            },
            GroundingChunk {
                web: None,
                maps: reference("https://maps.example/clinic", None),
            },
            GroundingChunk {
                web: reference("https://c.example", Some("C")),
                maps: reference("https://ignored.example", Some("ignored")),
            },
        ];

        let sources = extract_sources(&chunks);

        assert_eq!(
            sources,
            vec![
                Source {
                    title: "A".to_string(),
                    uri: "https://a.example".to_string(),
                },
                Source {
                    title: "https://maps.example/clinic".to_string(),
                    uri: "https://maps.example/clinic".to_string(),
                },
                Source {
                    title: "C".to_string(),
                    uri: "https://c.example".to_string(),
                },
            ]
        );
    }
}
