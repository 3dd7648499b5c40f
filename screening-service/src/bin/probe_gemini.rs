use anyhow::{Context, bail};
use screening_service::ServiceConfig;
use screening_service::gemini::{GeminiClient, RequestFormatter};
use screening_service::models::{RiskProfileUpdate, ScanImage, SmokingStatus, Symptom};
use screening_service::views::{KnowledgeQueryController, RiskProfilerController, ScanAnalysisController};
use screening_service::workflow::{Outcome, execute_submission};
use std::env;
use tracing::{error, info};

/// Runs each kind of request once against the live Gemini API.
///
/// Usage: `probe_gemini [path/to/scan.png]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = ServiceConfig::from_env();
    if config.api_key.is_none() {
        error!("GEMINI_API_KEY environment variable not set");
        error!("Please set your Gemini API key to probe the live endpoint");
        return Ok(());
    }

    let client = GeminiClient::from_config(&config);
    let formatter = RequestFormatter::new(config.models.clone());

    info!("\n=== RISK ASSESSMENT ===");
    let mut risk = RiskProfilerController::new();
    risk.update_profile(RiskProfileUpdate {
        age: Some(64),
        smoking_status: Some(SmokingStatus::Former),
        pack_years: Some(30),
        family_history: Some(true),
    })?;
    risk.toggle_symptom(Symptom::PersistentCough)?;
    let submission = risk.begin_assessment(&formatter)?;
    match execute_submission(&client, &submission).await {
        Some(Outcome::RiskAssessment(Ok(assessment))) => {
            for paragraph in assessment.paragraphs.iter().filter(|p| !p.trim().is_empty()) {
                info!("{}", paragraph);
            }
        }
        Some(Outcome::RiskAssessment(Err(e))) => error!("Risk assessment failed: {}", e),
        other => bail!("unexpected outcome: {:?}", other),
    }

    info!("\n=== KNOWLEDGE QUERY ===");
    let mut knowledge = KnowledgeQueryController::new();
    let submission = knowledge.open(&formatter);
    info!("Query: {}", knowledge.query());
    match execute_submission(&client, &submission).await {
        Some(Outcome::KnowledgeQuery(Ok(answer))) => {
            info!("{}", answer.text);
            info!("\nSources: {}", answer.sources.len());
            for (i, source) in answer.sources.iter().enumerate() {
                info!("  {}: {} ({})", i + 1, source.title, source.uri);
            }
        }
        Some(Outcome::KnowledgeQuery(Err(e))) => error!("Knowledge query failed: {}", e),
        other => bail!("unexpected outcome: {:?}", other),
    }

    if let Some(path) = env::args().nth(1) {
        info!("\n=== SCAN ANALYSIS: {} ===", path);
        let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path))?;
        let mut scan = ScanAnalysisController::new();
        scan.select_image(ScanImage::from_bytes(bytes)?);
        let submission = scan.begin_analysis(&formatter)?;
        match execute_submission(&client, &submission).await {
            Some(Outcome::ScanAnalysis(Ok(result))) => {
                info!("Summary: {}", result.summary);
                for finding in &result.findings {
                    info!("  Finding: {}", finding);
                }
                for recommendation in &result.recommendations {
                    info!("  Recommendation: {}", recommendation);
                }
                info!("Disclaimer: {}", result.disclaimer);
            }
            Some(Outcome::ScanAnalysis(Err(e))) => error!("Scan analysis failed: {}", e),
            other => bail!("unexpected outcome: {:?}", other),
        }
    }

    info!("\nProbe completed");
    Ok(())
}
