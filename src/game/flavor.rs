//! Flavor-text provider
//!
//! Asks a generative model for a few dramatic log lines per stage. Purely
//! cosmetic: the runner asks once per stage, never waits, and falls back to
//! its canned lines whenever anything goes wrong.

use crate::config::FlavorCfg;
use crate::ConsoleError;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, warn};

pub type FlavorResult = std::result::Result<Vec<String>, ConsoleError>;

/// Source of generated log lines for a stage
pub trait FlavorTextProvider {
    /// Start a single fetch for `stage_name`. Must not block.
    fn fetch_lines(&self, stage_name: &str) -> FlavorTicket;
}

/// State of an outstanding fetch
#[derive(Debug, PartialEq, Eq)]
pub enum TicketPoll {
    Pending,
    Ready(FlavorResult),
}

/// Receiving end of one fetch
#[derive(Debug)]
pub struct FlavorTicket {
    rx: oneshot::Receiver<FlavorResult>,
}

impl FlavorTicket {
    pub fn channel() -> (oneshot::Sender<FlavorResult>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// A ticket that is already resolved
    pub fn ready(result: FlavorResult) -> Self {
        let (tx, ticket) = Self::channel();
        let _ = tx.send(result);
        ticket
    }

    /// Non-blocking check. A sender dropped without answering counts as a failure.
    pub fn poll(&mut self) -> TicketPoll {
        match self.rx.try_recv() {
            Ok(result) => TicketPoll::Ready(result),
            Err(TryRecvError::Empty) => TicketPoll::Pending,
            Err(TryRecvError::Closed) => TicketPoll::Ready(Err(ConsoleError::FlavorTextUnavailable(
                "provider went away".to_string(),
            ))),
        }
    }
}

/// Gemini `generateContent` client
pub struct GeminiProvider {
    client: reqwest::Client,
    handle: Handle,
    api_key: String,
    model: String,
    endpoint: String,
    max_lines: usize,
}

impl GeminiProvider {
    /// Fails when credentials are missing or the HTTP client cannot be built
    pub fn from_config(cfg: &FlavorCfg, handle: Handle) -> Result<Self, ConsoleError> {
        if !cfg.enabled {
            return Err(ConsoleError::FlavorTextUnavailable("disabled by configuration".into()));
        }
        let api_key = cfg.api_key().ok_or_else(|| {
            ConsoleError::FlavorTextUnavailable(format!("{} is not set", cfg.api_key_env))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .build()
            .map_err(|e| ConsoleError::FlavorTextUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            handle,
            api_key,
            model: cfg.model.clone(),
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            max_lines: cfg.max_lines,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl FlavorTextProvider for GeminiProvider {
    fn fetch_lines(&self, stage_name: &str) -> FlavorTicket {
        let (tx, ticket) = FlavorTicket::channel();
        let request = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(stage_name));
        let max_lines = self.max_lines;
        let stage = stage_name.to_string();

        self.handle.spawn(async move {
            let result = async {
                let response = request.send().await?.error_for_status()?;
                response.json::<GenerateContentResponse>().await
            }
            .await
            .map_err(|e| ConsoleError::FlavorTextUnavailable(e.to_string()))
            .and_then(|payload| extract_lines(&payload, max_lines));

            match &result {
                Ok(lines) => debug!(stage = %stage, count = lines.len(), "flavor text received"),
                Err(err) => warn!(stage = %stage, error = %err, "flavor text request failed"),
            }
            let _ = tx.send(result);
        });

        ticket
    }
}

fn prompt(stage_name: &str) -> String {
    format!(
        "You are a log generator for a fictional cyberpunk hacking tool. Generate 3 short, \
         technical-sounding log messages for the following operation: '{stage_name}'. The logs \
         should be concise and dramatic. Example: \"Injecting FRP bypass payload into bootloader.\""
    )
}

fn request_body(stage_name: &str) -> serde_json::Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt(stage_name) }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "logs": { "type": "ARRAY", "items": { "type": "STRING" } }
                }
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// The schema the model is asked to answer in
#[derive(Debug, Deserialize)]
struct GeneratedLogs {
    #[serde(default)]
    logs: Vec<String>,
}

fn extract_lines(payload: &GenerateContentResponse, max_lines: usize) -> FlavorResult {
    let text = payload
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .find_map(|p| p.text.as_deref())
        .ok_or_else(|| ConsoleError::FlavorTextUnavailable("response had no text part".into()))?;

    let parsed: GeneratedLogs = serde_json::from_str(text.trim())
        .map_err(|e| ConsoleError::FlavorTextUnavailable(format!("malformed logs payload: {e}")))?;

    Ok(parsed
        .logs
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .collect())
}
