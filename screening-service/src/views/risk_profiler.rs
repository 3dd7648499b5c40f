use serde::Serialize;
use tracing::{error, info};
use view_flow::{RequestTicket, Settlement, ViewSlot, ViewState};

use super::{Submission, SubmissionKind};
use crate::error::ScreeningError;
use crate::gemini::RequestFormatter;
use crate::models::{OccupationalHazard, RiskAssessment, RiskProfile, RiskProfileUpdate, Symptom};

pub const RISK_FAILURE_MESSAGE: &str = "Risk assessment failed. Please try again.";

/// Questionnaire form that is submitted for a narrative risk assessment
#[derive(Debug, Default)]
pub struct RiskProfilerController {
    profile: RiskProfile,
    slot: ViewSlot<RiskAssessment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskProfilerSnapshot {
    pub profile: RiskProfile,
    pub symptom_options: &'static [Symptom],
    pub hazard_options: &'static [OccupationalHazard],
    pub state: ViewState<RiskAssessment>,
}

impl RiskProfilerController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> &RiskProfile {
        &self.profile
    }

    pub fn state(&self) -> &ViewState<RiskAssessment> {
        self.slot.state()
    }

    pub fn update_profile(&mut self, update: RiskProfileUpdate) -> Result<(), ScreeningError> {
        self.ensure_editable()?;
        self.profile.apply(update);
        Ok(())
    }

    pub fn toggle_symptom(&mut self, symptom: Symptom) -> Result<(), ScreeningError> {
        self.ensure_editable()?;
        self.profile.toggle_symptom(symptom);
        Ok(())
    }

    pub fn toggle_hazard(&mut self, hazard: OccupationalHazard) -> Result<(), ScreeningError> {
        self.ensure_editable()?;
        self.profile.toggle_hazard(hazard);
        Ok(())
    }

    pub fn begin_assessment(
        &mut self,
        formatter: &RequestFormatter,
    ) -> Result<Submission, ScreeningError> {
        if matches!(self.slot.state(), ViewState::Success(_)) {
            return Err(ScreeningError::FormLocked);
        }
        let request = formatter.risk_assessment(&self.profile);
        let ticket = self.slot.begin()?;

        info!(seq = ticket.seq(), age = self.profile.age, "Risk assessment submitted");
        Ok(Submission {
            kind: SubmissionKind::RiskAssessment,
            ticket,
            request,
        })
    }

    /// Leave the assessment and return to the form, keeping every answer
    pub fn edit(&mut self) {
        self.slot.reset();
    }

    pub fn settle(
        &mut self,
        ticket: &RequestTicket,
        outcome: Result<RiskAssessment, ScreeningError>,
    ) -> Settlement {
        let outcome = outcome.map_err(|e| {
            error!(seq = ticket.seq(), "Risk assessment failed: {}", e);
            RISK_FAILURE_MESSAGE.to_string()
        });
        self.slot.settle(ticket, outcome)
    }

    pub fn snapshot(&self) -> RiskProfilerSnapshot {
        RiskProfilerSnapshot {
            profile: self.profile.clone(),
            symptom_options: Symptom::ALL,
            hazard_options: OccupationalHazard::ALL,
            state: self.slot.state().clone(),
        }
    }

    // The form is hidden while loading and while an assessment is shown.
    // Editing after a failure clears the failure message.
    fn ensure_editable(&mut self) -> Result<(), ScreeningError> {
        match self.slot.state() {
            ViewState::Loading | ViewState::Success(_) => Err(ScreeningError::FormLocked),
            ViewState::Failed(_) => {
                self.slot.reset();
                Ok(())
            }
            ViewState::Idle => Ok(()),
        }
    }
}
