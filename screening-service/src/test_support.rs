use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::gemini::{GenerateRequest, GenerateResponse, InferenceClient, InferenceError};

/// Inference client that replays queued responses and records every request
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<GenerateResponse, InferenceError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Result<GenerateResponse, InferenceError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Make every call wait until the returned handle is notified
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn invoke(&self, request: &GenerateRequest) -> Result<GenerateResponse, InferenceError> {
        self.requests.lock().unwrap().push(request.clone());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(InferenceError::Status {
                    status: 500,
                    body: "no scripted response".to_string(),
                })
            })
    }
}
