//! Decision service seam
//!
//! The strategist submits a request and polls the returned `PendingDecision`
//! once per tick; the simulation never blocks on the network. The HTTP
//! implementation runs each request as a task on a tokio runtime and
//! enforces the timeout there.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::core::config::DecisionServiceConfig;
use crate::core::error::{Result, ZoneError};
use crate::llm::client::LlmClient;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub system_prompt: String,
    pub snapshot_json: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl DecisionRequest {
    pub fn new(system_prompt: &str, snapshot_json: String, config: &DecisionServiceConfig) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            snapshot_json,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Only `raw_text` is parsed; the rest is metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub raw_text: String,
    pub model: String,
    pub provider: String,
    pub latency_ms: u64,
}

/// What a poll of a pending decision found
#[derive(Debug)]
pub enum DecisionPoll {
    Pending,
    Ready(Result<DecisionResponse>),
}

/// A request in flight. Dropping it discards whatever reply arrives later.
#[derive(Debug)]
pub struct PendingDecision {
    receiver: oneshot::Receiver<Result<DecisionResponse>>,
}

impl PendingDecision {
    /// A pending decision and the sender that completes it
    pub fn channel() -> (oneshot::Sender<Result<DecisionResponse>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { receiver: rx })
    }

    /// Already resolved
    pub fn ready(result: Result<DecisionResponse>) -> Self {
        let (tx, pending) = Self::channel();
        let _ = tx.send(result);
        pending
    }

    pub fn poll(&mut self) -> DecisionPoll {
        match self.receiver.try_recv() {
            Ok(result) => DecisionPoll::Ready(result),
            Err(TryRecvError::Empty) => DecisionPoll::Pending,
            Err(TryRecvError::Closed) => {
                DecisionPoll::Ready(Err(ZoneError::Llm("decision task dropped without a reply".into())))
            }
        }
    }
}

pub trait DecisionService {
    /// Start a request without waiting for it
    fn submit(&mut self, request: DecisionRequest) -> PendingDecision;

    fn name(&self) -> &str;
}

/// Decision service backed by the HTTP client
pub struct LlmDecisionService {
    client: Arc<LlmClient>,
    runtime: Handle,
    timeout: Duration,
}

impl LlmDecisionService {
    pub fn new(client: LlmClient, runtime: Handle, timeout: Duration) -> Self {
        Self {
            client: Arc::new(client),
            runtime,
            timeout,
        }
    }
}

impl DecisionService for LlmDecisionService {
    fn submit(&mut self, request: DecisionRequest) -> PendingDecision {
        let (tx, pending) = PendingDecision::channel();
        let client = Arc::clone(&self.client);
        let timeout = self.timeout;

        self.runtime.spawn(async move {
            let started = Instant::now();
            let result = match tokio::time::timeout(timeout, client.complete(&request)).await {
                Ok(Ok(completion)) => Ok(DecisionResponse {
                    raw_text: completion.text,
                    model: completion.model,
                    provider: completion.provider.to_string(),
                    latency_ms: started.elapsed().as_millis() as u64,
                }),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(ZoneError::Llm(format!("request timed out after {:.1}s", timeout.as_secs_f32()))),
            };
            if tx.send(result).is_err() {
                tracing::debug!("decision reply discarded, requester gave up");
            }
        });

        pending
    }

    fn name(&self) -> &str {
        "llm"
    }
}

/// Replays canned replies in order; an empty script answers with an error
#[derive(Debug, Default)]
pub struct ScriptedDecisionService {
    replies: VecDeque<std::result::Result<String, String>>,
    /// Requests seen so far, newest last
    pub requests: Vec<DecisionRequest>,
}

impl ScriptedDecisionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, raw_text: impl Into<String>) -> Self {
        self.replies.push_back(Ok(raw_text.into()));
        self
    }

    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.replies.push_back(Err(message.into()));
        self
    }
}

impl DecisionService for ScriptedDecisionService {
    fn submit(&mut self, request: DecisionRequest) -> PendingDecision {
        let model = request.model.clone();
        self.requests.push(request);
        let result = match self.replies.pop_front() {
            Some(Ok(raw_text)) => Ok(DecisionResponse {
                raw_text,
                model,
                provider: "scripted".into(),
                latency_ms: 0,
            }),
            Some(Err(message)) => Err(ZoneError::Llm(message)),
            None => Err(ZoneError::Llm("no scripted reply left".into())),
        };
        PendingDecision::ready(result)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DecisionRequest {
        DecisionRequest::new("sys", "{}".into(), &DecisionServiceConfig::default())
    }

    #[test]
    fn test_scripted_replies_in_order() {
        let mut service = ScriptedDecisionService::new().reply("first").fail("boom");
        let mut a = service.submit(request());
        let mut b = service.submit(request());
        let mut c = service.submit(request());

        match a.poll() {
            DecisionPoll::Ready(Ok(r)) => assert_eq!(r.raw_text, "first"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(b.poll(), DecisionPoll::Ready(Err(ZoneError::Llm(_)))));
        assert!(matches!(c.poll(), DecisionPoll::Ready(Err(_))));
        assert_eq!(service.requests.len(), 3);
    }

    #[test]
    fn test_pending_until_sent() {
        let (tx, mut pending) = PendingDecision::channel();
        assert!(matches!(pending.poll(), DecisionPoll::Pending));
        tx.send(Err(ZoneError::Llm("x".into()))).unwrap();
        assert!(matches!(pending.poll(), DecisionPoll::Ready(Err(_))));
    }

    #[test]
    fn test_dropped_sender_reports_failure() {
        let (tx, mut pending) = PendingDecision::channel();
        drop(tx);
        assert!(matches!(pending.poll(), DecisionPoll::Ready(Err(ZoneError::Llm(_)))));
    }

    #[tokio::test]
    async fn test_http_service_times_out_against_silent_server() {
        // A listener that accepts but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = LlmClient::new("key".into(), format!("http://{}/v1/chat/completions", addr));
        let mut service = LlmDecisionService::new(client, Handle::current(), Duration::from_millis(100));
        let mut pending = service.submit(request());

        let result = loop {
            match pending.poll() {
                DecisionPoll::Pending => tokio::time::sleep(Duration::from_millis(20)).await,
                DecisionPoll::Ready(result) => break result,
            }
        };
        let err = result.unwrap_err();
        assert!(err.to_string().contains("timed out"), "{}", err);
    }
}
