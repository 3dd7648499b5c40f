use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ScreeningError;

/// Structured reading of a chest scan returned by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanAnalysisResult {
    pub summary: String,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub disclaimer: String,
}

const ACCEPTED_IMAGE_FORMATS: [ImageFormat; 6] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

/// An uploaded scan image
#[derive(Clone, PartialEq, Eq)]
pub struct ScanImage {
    bytes: Vec<u8>,
    mime_type: &'static str,
}

impl ScanImage {
    /// Accept raw upload bytes, detecting the image format from their content
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ScreeningError> {
        if bytes.is_empty() {
            return Err(ScreeningError::UnsupportedImage(
                "upload is empty".to_string(),
            ));
        }

        let format = image::guess_format(&bytes)
            .map_err(|e| ScreeningError::UnsupportedImage(e.to_string()))?;

        if !ACCEPTED_IMAGE_FORMATS.contains(&format) {
            return Err(ScreeningError::UnsupportedImage(format!(
                "{:?} images are not accepted",
                format
            )));
        }

        Ok(Self {
            bytes,
            mime_type: format.to_mime_type(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

impl fmt::Debug for ScanImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmokingStatus {
    #[default]
    Never,
    Former,
    Current,
}

impl SmokingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmokingStatus::Never => "never",
            SmokingStatus::Former => "former",
            SmokingStatus::Current => "current",
        }
    }
}

impl fmt::Display for SmokingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declares a closed vocabulary whose wire form is the human-readable label
macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

vocabulary!(
    /// Symptoms offered by the risk questionnaire
    Symptom {
        PersistentCough => "Persistent cough",
        ShortnessOfBreath => "Shortness of breath",
        ChestPain => "Chest pain",
        CoughingUpBlood => "Coughing up blood",
        Hoarseness => "Hoarseness",
        WeightLoss => "Weight loss",
        Fatigue => "Fatigue",
    }
);

vocabulary!(
    /// Occupational exposures offered by the risk questionnaire
    OccupationalHazard {
        Asbestos => "Asbestos",
        RadonGas => "Radon gas",
        DieselExhaust => "Diesel exhaust",
        Arsenic => "Arsenic",
        Silica => "Silica",
        CoalSmoke => "Coal smoke",
    }
);

/// Risk-factor questionnaire as filled in by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub age: u32,
    pub smoking_status: SmokingStatus,
    /// Only meaningful when `smoking_status` is not `Never`
    pub pack_years: u32,
    pub family_history: bool,
    pub symptoms: Vec<Symptom>,
    pub occupational_hazards: Vec<OccupationalHazard>,
}

impl Default for RiskProfile {
    fn default() -> Self {
        Self {
            age: 45,
            smoking_status: SmokingStatus::Never,
            pack_years: 0,
            family_history: false,
            symptoms: Vec::new(),
            occupational_hazards: Vec::new(),
        }
    }
}

impl RiskProfile {
    pub fn apply(&mut self, update: RiskProfileUpdate) {
        if let Some(age) = update.age {
            self.age = age;
        }
        if let Some(status) = update.smoking_status {
            self.smoking_status = status;
        }
        if let Some(pack_years) = update.pack_years {
            self.pack_years = pack_years;
        }
        if let Some(family_history) = update.family_history {
            self.family_history = family_history;
        }
    }

    pub fn toggle_symptom(&mut self, symptom: Symptom) {
        toggle(&mut self.symptoms, symptom);
    }

    pub fn toggle_hazard(&mut self, hazard: OccupationalHazard) {
        toggle(&mut self.occupational_hazards, hazard);
    }

    /// Pack-years, if they apply to the selected smoking status
    pub fn applicable_pack_years(&self) -> Option<u32> {
        match self.smoking_status {
            SmokingStatus::Never => None,
            _ => Some(self.pack_years),
        }
    }
}

// Removes the item if present, otherwise appends it.
fn toggle<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if let Some(pos) = items.iter().position(|existing| *existing == item) {
        items.remove(pos);
    } else {
        items.push(item);
    }
}

/// Narrative risk assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub text: String,
    pub paragraphs: Vec<String>,
}

impl RiskAssessment {
    pub fn new(text: String) -> Self {
        let paragraphs = split_lines(&text);
        Self { text, paragraphs }
    }
}

/// A citation attached to a grounded answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Page title, or the uri when the provider gave no title
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeAnswer {
    pub text: String,
    pub paragraphs: Vec<String>,
    pub sources: Vec<Source>,
}

impl KnowledgeAnswer {
    pub fn new(text: String, sources: Vec<Source>) -> Self {
        let paragraphs = split_lines(&text);
        Self {
            text,
            paragraphs,
            sources,
        }
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

// HTTP request bodies

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskProfileUpdate {
    pub age: Option<u32>,
    pub smoking_status: Option<SmokingStatus>,
    pub pack_years: Option<u32>,
    pub family_history: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleRequest<T> {
    pub item: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KnowledgeQueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NavigateRequest {
    pub view: crate::shell::View,
}

// HTTP response bodies

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    pub view: crate::shell::ViewSnapshot,
}
