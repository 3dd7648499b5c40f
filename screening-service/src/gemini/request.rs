use serde::Serialize;
use serde_json::Value;

use super::schema::SCAN_ANALYSIS_SCHEMA;
use crate::config::ModelSet;
use crate::models::{RiskProfile, ScanImage};

const SCAN_ANALYSIS_PROMPT: &str = "Analyze this chest X-ray or CT scan image for potential indicators of lung cancer or other pulmonary abnormalities.

CRITICAL: This is for educational and screening assistance purposes only.

Structure your response as JSON with:
- summary: A brief 2-sentence overview.
- findings: A list of specific observations (e.g., nodules, pleural effusion, opacities).
- recommendations: Suggested next steps (e.g., consult oncologist, follow-up CT).
- disclaimer: A strong medical disclaimer.";

const RISK_ASSESSMENT_INSTRUCTIONS: &str = "Provide a professional, empathetic analysis. Mention specific risk factors from medical literature (like USPSTF screening guidelines).
Include a clear section on whether they might qualify for LDCT screening.
Always include a disclaimer that this is not a medical diagnosis.";

const RISK_TEMPERATURE: f64 = 0.7;

const NONE_REPORTED: &str = "None reported";

/// One `generateContent` call: the target model plus the JSON body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(skip)]
    pub model: String,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<&'static Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub google_search: GoogleSearch,
}

/// Enables search grounding; serialized as an empty object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GoogleSearch {}

impl GenerateRequest {
    pub fn uses_search_grounding(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// Turns domain inputs into provider requests
#[derive(Debug, Clone, Default)]
pub struct RequestFormatter {
    models: ModelSet,
}

impl RequestFormatter {
    pub fn new(models: ModelSet) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    /// Image plus prompt, constrained to the scan-analysis JSON schema
    pub fn scan_analysis(&self, image: &ScanImage) -> GenerateRequest {
        GenerateRequest {
            model: self.models.scan.clone(),
            contents: vec![Content::user(vec![
                Part::InlineData {
                    inline_data: Blob {
                        mime_type: image.mime_type().to_string(),
                        data: image.to_base64(),
                    },
                },
                Part::Text {
                    text: SCAN_ANALYSIS_PROMPT.to_string(),
                },
            ])],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(&*SCAN_ANALYSIS_SCHEMA),
                temperature: None,
            }),
            tools: Vec::new(),
        }
    }

    pub fn risk_assessment(&self, profile: &RiskProfile) -> GenerateRequest {
        GenerateRequest {
            model: self.models.risk.clone(),
            contents: vec![Content::user(vec![Part::Text {
                text: risk_assessment_prompt(profile),
            }])],
            generation_config: Some(GenerationConfig {
                temperature: Some(RISK_TEMPERATURE),
                ..GenerationConfig::default()
            }),
            tools: Vec::new(),
        }
    }

    pub fn knowledge_query(&self, query: &str) -> GenerateRequest {
        GenerateRequest {
            model: self.models.knowledge.clone(),
            contents: vec![Content::user(vec![Part::Text {
                text: knowledge_query_prompt(query),
            }])],
            generation_config: None,
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
        }
    }
}

/// Linearize the questionnaire into the risk-assessment prompt
pub fn risk_assessment_prompt(profile: &RiskProfile) -> String {
    let mut lines = vec![
        "Conduct a detailed lung cancer risk assessment based on the following patient data:"
            .to_string(),
        format!("Age: {}", profile.age),
        format!("Smoking Status: {}", profile.smoking_status),
    ];

    if let Some(pack_years) = profile.applicable_pack_years() {
        lines.push(format!("Pack Years (if applicable): {}", pack_years));
    }

    lines.push(format!(
        "Family History: {}",
        if profile.family_history { "Yes" } else { "No" }
    ));
    lines.push(format!("Symptoms: {}", join_or_none(&profile.symptoms)));
    lines.push(format!(
        "Occupational Hazards: {}",
        join_or_none(&profile.occupational_hazards)
    ));
    lines.push(String::new());
    lines.push(RISK_ASSESSMENT_INSTRUCTIONS.to_string());

    lines.join("\n")
}

pub fn knowledge_query_prompt(query: &str) -> String {
    format!(
        "Provide up-to-date medical information about: {}. Use search grounding for accuracy.",
        query
    )
}

fn join_or_none<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return NONE_REPORTED.to_string();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
