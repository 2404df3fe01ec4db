//! Scripted inference backend for unit tests.

use sentiscope_core::{
    EndpointKind, InferenceBackend, InferenceOutput, InferenceRequest, InferenceResult, LabelScore,
};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&InferenceRequest) -> InferenceResult + Send + Sync>;

/// Backend that answers from a closure and records every request.
pub(crate) struct ScriptedBackend {
    responder: Responder,
    calls: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedBackend {
    pub(crate) fn new(
        responder: impl Fn(&InferenceRequest) -> InferenceResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<InferenceRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, kind: EndpointKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.endpoint() == kind)
            .count()
    }
}

#[async_trait::async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn call(&self, request: &InferenceRequest) -> InferenceResult {
        self.calls.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }

    fn name(&self) -> &'static str {
        "ScriptedBackend"
    }
}

pub(crate) fn labels(pairs: &[(&str, f64)]) -> InferenceResult {
    Ok(InferenceOutput::Labels(
        pairs.iter().map(|(l, s)| LabelScore::new(*l, *s)).collect(),
    ))
}

pub(crate) fn text(value: &str) -> InferenceResult {
    Ok(InferenceOutput::Text(value.to_string()))
}
