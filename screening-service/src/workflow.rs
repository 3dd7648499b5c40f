use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;
use view_flow::{SessionStorage, Settlement, run_cancellable};

use crate::error::ScreeningError;
use crate::gemini::{
    InferenceClient, parse_knowledge_answer, parse_risk_assessment, parse_scan_analysis,
};
use crate::models::{KnowledgeAnswer, RiskAssessment, ScanAnalysisResult};
use crate::shell::NavigationShell;
use crate::views::{Submission, SubmissionKind};

/// One browser session: the navigation shell and whatever view it shows
#[derive(Debug)]
pub struct ScreeningSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    last_active_ms: AtomicI64,
    shell: Mutex<NavigationShell>,
}

impl ScreeningSession {
    pub async fn lock(&self) -> MutexGuard<'_, NavigationShell> {
        self.shell.lock().await
    }

    /// Record activity from the browser
    pub fn touch(&self) {
        self.touch_at(Utc::now());
    }

    fn touch_at(&self, at: DateTime<Utc>) {
        self.last_active_ms
            .fetch_max(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_active_ms.load(Ordering::Relaxed))
            .unwrap_or(self.created_at)
    }

    /// Drop the active view, cancelling whatever request it has in flight
    pub async fn close(&self) {
        *self.shell.lock().await = NavigationShell::new();
    }
}

pub fn create_screening_session() -> Arc<ScreeningSession> {
    let created_at = Utc::now();
    Arc::new(ScreeningSession {
        id: Uuid::new_v4().to_string(),
        created_at,
        last_active_ms: AtomicI64::new(created_at.timestamp_millis()),
        shell: Mutex::new(NavigationShell::new()),
    })
}

/// Remove and close every session with no activity since `cutoff`.
///
/// Returns how many sessions were evicted.
pub async fn evict_idle_sessions(
    storage: &dyn SessionStorage<ScreeningSession>,
    cutoff: DateTime<Utc>,
) -> view_flow::Result<usize> {
    let evicted = storage
        .retain(&|session: &ScreeningSession| session.last_active() >= cutoff)
        .await?;

    for session in &evicted {
        session.close().await;
        info!(session_id = %session.id, last_active = %session.last_active(), "Evicted idle session");
    }
    Ok(evicted.len())
}

/// Periodically evict sessions idle for longer than `idle_timeout`
pub fn spawn_session_sweeper(
    storage: Arc<dyn SessionStorage<ScreeningSession>>,
    idle_timeout: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let Ok(idle_timeout) = chrono::Duration::from_std(idle_timeout) else {
                error!(?idle_timeout, "Session idle timeout out of range, sweeper stopped");
                return;
            };
            if let Err(e) = evict_idle_sessions(storage.as_ref(), Utc::now() - idle_timeout).await {
                error!("Failed to evict idle sessions: {}", e);
            }
        }
    })
}

/// Parsed result of a finished request, tagged with the view it belongs to
#[derive(Debug)]
pub enum Outcome {
    ScanAnalysis(Result<ScanAnalysisResult, ScreeningError>),
    RiskAssessment(Result<RiskAssessment, ScreeningError>),
    KnowledgeQuery(Result<KnowledgeAnswer, ScreeningError>),
}

/// Call the model and parse its answer for the submitting view.
///
/// Returns `None` if the submission was cancelled before the call finished.
pub async fn execute_submission(
    client: &dyn InferenceClient,
    submission: &Submission,
) -> Option<Outcome> {
    let response = run_cancellable(&submission.ticket, client.invoke(&submission.request)).await?;

    let outcome = match submission.kind {
        SubmissionKind::ScanAnalysis => Outcome::ScanAnalysis(
            response
                .map_err(ScreeningError::from)
                .and_then(|r| parse_scan_analysis(&r).map_err(ScreeningError::from)),
        ),
        SubmissionKind::RiskAssessment => Outcome::RiskAssessment(
            response
                .map(|r| parse_risk_assessment(&r))
                .map_err(ScreeningError::from),
        ),
        SubmissionKind::KnowledgeQuery => Outcome::KnowledgeQuery(
            response
                .map(|r| parse_knowledge_answer(&r))
                .map_err(ScreeningError::from),
        ),
    };

    Some(outcome)
}

/// Run a submission in the background and write its outcome back into the
/// session, unless the view has moved on in the meantime.
pub fn spawn_submission(
    session: Arc<ScreeningSession>,
    client: Arc<dyn InferenceClient>,
    submission: Submission,
) -> JoinHandle<Option<Settlement>> {
    tokio::spawn(async move {
        let Some(outcome) = execute_submission(client.as_ref(), &submission).await else {
            debug!(
                session_id = %session.id,
                seq = submission.ticket.seq(),
                "Submission abandoned"
            );
            return None;
        };

        let settlement = session.lock().await.settle(&submission.ticket, outcome);
        match settlement {
            Settlement::Applied => info!(
                session_id = %session.id,
                kind = ?submission.kind,
                seq = submission.ticket.seq(),
                "Submission settled"
            ),
            Settlement::Stale => debug!(
                session_id = %session.id,
                kind = ?submission.kind,
                seq = submission.ticket.seq(),
                "Submission outcome discarded as stale"
            ),
        }
        Some(settlement)
    })
}
