//! Shared test helpers for coordinator tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use contextfuse_core::error::{ProducerError, SynthesisError};
use contextfuse_core::{
    Fact, Producer, ProducerRegistry, Snapshot, SynthesisBackend, SynthesisRequest,
    SynthesisResponse, Usage,
};

/// What a scripted producer should do when invoked.
enum Script {
    Succeed { raw_tokens: usize },
    SucceedAfter { delay: Duration, raw_tokens: usize },
    Fail { reason: String },
    Panic,
    Mislabel { claimed_id: String },
}

/// A producer that follows a fixed script. One snapshot per call, no state.
pub struct ScriptedProducer {
    id: String,
    script: Script,
}

#[async_trait]
impl Producer for ScriptedProducer {
    fn producer_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "scripted test producer"
    }

    async fn produce(&self, query: &str) -> Result<Snapshot, ProducerError> {
        match &self.script {
            Script::Succeed { raw_tokens } => Ok(self.snapshot(query, *raw_tokens)),
            Script::SucceedAfter { delay, raw_tokens } => {
                tokio::time::sleep(*delay).await;
                Ok(self.snapshot(query, *raw_tokens))
            }
            Script::Fail { reason } => Err(ProducerError::Failed {
                producer_id: self.id.clone(),
                reason: reason.clone(),
            }),
            Script::Panic => panic!("scripted panic in producer '{}'", self.id),
            Script::Mislabel { claimed_id } => Ok(Snapshot::new(claimed_id, "mislabeled").unwrap()),
        }
    }
}

impl ScriptedProducer {
    fn snapshot(&self, query: &str, raw_tokens: usize) -> Snapshot {
        Snapshot::new(&self.id, format!("{} findings for '{query}'", self.id))
            .unwrap()
            .with_facts(vec![
                Fact::new("finding", format!("what {} found", self.id)).unwrap(),
            ])
            .with_raw_context(format!("raw detail from {}", self.id), raw_tokens)
    }
}

pub fn scripted_ok(id: &str, raw_tokens: usize) -> Arc<dyn Producer> {
    Arc::new(ScriptedProducer {
        id: id.into(),
        script: Script::Succeed { raw_tokens },
    })
}

pub fn scripted_slow_ok(id: &str, delay: Duration) -> Arc<dyn Producer> {
    Arc::new(ScriptedProducer {
        id: id.into(),
        script: Script::SucceedAfter {
            delay,
            raw_tokens: 10,
        },
    })
}

/// A producer guaranteed to hit the coordinator's timeout.
pub fn scripted_slow(id: &str, delay: Duration) -> Arc<dyn Producer> {
    scripted_slow_ok(id, delay)
}

pub fn scripted_fail(id: &str, reason: &str) -> Arc<dyn Producer> {
    Arc::new(ScriptedProducer {
        id: id.into(),
        script: Script::Fail {
            reason: reason.into(),
        },
    })
}

pub fn scripted_panic(id: &str) -> Arc<dyn Producer> {
    Arc::new(ScriptedProducer {
        id: id.into(),
        script: Script::Panic,
    })
}

pub fn scripted_mislabeled(id: &str, claimed_id: &str) -> Arc<dyn Producer> {
    Arc::new(ScriptedProducer {
        id: id.into(),
        script: Script::Mislabel {
            claimed_id: claimed_id.into(),
        },
    })
}

pub fn registry_of(producers: Vec<Arc<dyn Producer>>) -> Arc<ProducerRegistry> {
    let mut registry = ProducerRegistry::new();
    for producer in producers {
        registry.register(producer).unwrap();
    }
    Arc::new(registry)
}

/// A synthesis backend that records calls and returns a fixed answer.
pub struct MockBackend {
    answer: Option<String>,
    calls: Mutex<usize>,
    last_request: Mutex<Option<SynthesisRequest>>,
}

impl MockBackend {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.into()),
            calls: Mutex::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: Mutex::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn last_request(&self) -> Option<SynthesisRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl SynthesisBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> Result<SynthesisResponse, SynthesisError> {
        *self.calls.lock().unwrap() += 1;
        *self.last_request.lock().unwrap() = Some(request);
        match &self.answer {
            Some(answer) => Ok(SynthesisResponse {
                answer: answer.clone(),
                model: "mock-model".into(),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
            }),
            None => Err(SynthesisError::Api {
                status_code: 500,
                message: "scripted backend failure".into(),
            }),
        }
    }
}
