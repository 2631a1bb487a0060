//! Availability-gated chat surface on top of orchestrator state.
//!
//! The gateway mirrors the active project and flips `is_available` only
//! when that project's ingestion is complete. Chat calls return structured
//! outcomes: server and transport failures are data for the UI, never
//! panics or thrown errors.

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::{
   Result,
   api::{
      ChatApi,
      types::{
         ChatMessage, ChatResponse, ChatSendRequest, ChatSession, DEFAULT_MODEL_ID,
         IngestionStatus, StreamEvent,
      },
   },
   sync::SyncEvent,
};

const UNAVAILABLE_ERROR: &str = "project is still being ingested; chat is unavailable";
const NO_PROJECT_ERROR: &str = "no active project";

/// Structured outcome of a one-shot chat call.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
   Reply(ChatResponse),
   Failed { error: String },
}

impl ChatOutcome {
   pub const fn is_success(&self) -> bool {
      matches!(self, Self::Reply(_))
   }

   fn failed(error: impl Into<String>) -> Self {
      Self::Failed { error: error.into() }
   }
}

/// Availability notification, fired on edges only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityChanged {
   pub available: bool,
}

/// Receives decoded stream events.
pub trait StreamCallback: Send {
   fn event(&mut self, event: StreamEvent);
}

impl<F: FnMut(StreamEvent) + Send> StreamCallback for F {
   fn event(&mut self, event: StreamEvent) {
      self(event);
   }
}

impl StreamCallback for () {
   fn event(&mut self, _event: StreamEvent) {}
}

#[derive(Debug, Default)]
struct GatewayState {
   available:  bool,
   project_id: Option<String>,
}

/// Per-project chat sessions and streaming, gated on ingestion status.
pub struct ChatGateway<A: ChatApi> {
   api:    A,
   state:  Mutex<GatewayState>,
   events: broadcast::Sender<AvailabilityChanged>,
}

impl<A: ChatApi> ChatGateway<A> {
   pub fn new(api: A) -> Self {
      let (events, _) = broadcast::channel(16);
      Self { api, state: Mutex::new(GatewayState::default()), events }
   }

   pub fn subscribe(&self) -> broadcast::Receiver<AvailabilityChanged> {
      self.events.subscribe()
   }

   pub fn is_available(&self) -> bool {
      self.state.lock().available
   }

   pub fn current_project_id(&self) -> Option<String> {
      self.state.lock().project_id.clone()
   }

   /// Applies one orchestrator event to the availability flags, notifying
   /// subscribers only when availability actually flips.
   pub fn handle_event(&self, event: &SyncEvent) {
      let mut state = self.state.lock();
      let was = state.available;

      match event {
         SyncEvent::ProjectChanged { project: Some(info) } => {
            state.project_id = Some(info.project_id.clone());
            state.available = info.ingestion_status == IngestionStatus::Completed;
         },
         SyncEvent::ProjectChanged { project: None } => {
            state.project_id = None;
            state.available = false;
         },
         SyncEvent::Complete { project_id } => {
            if state.project_id.as_deref() == Some(project_id.as_str()) {
               state.available = true;
            }
         },
         SyncEvent::Progress { .. } | SyncEvent::Error { .. } => {},
      }

      let now = state.available;
      drop(state);

      if was != now {
         let _ = self.events.send(AvailabilityChanged { available: now });
      }
   }

   /// Pumps orchestrator events until the sender side closes.
   pub async fn run(&self, mut events: broadcast::Receiver<SyncEvent>) {
      loop {
         match events.recv().await {
            Ok(event) => self.handle_event(&event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
               tracing::warn!("gateway lagged behind sync events, skipped {}", skipped);
            },
            Err(broadcast::error::RecvError::Closed) => return,
         }
      }
   }

   /// One-shot chat request. When unavailable, fails without contacting
   /// the server; the model falls back to the service default when the
   /// request leaves it unset.
   pub async fn send_message(&self, mut request: ChatSendRequest) -> ChatOutcome {
      match self.gate() {
         Ok(project_id) => request.project_id = project_id,
         Err(error) => return ChatOutcome::Failed { error },
      }

      if request.model.is_none() {
         request.model = Some(self.resolve_model().await);
      }

      match self.api.send(&request).await {
         Ok(response) => ChatOutcome::Reply(response),
         Err(e) => ChatOutcome::failed(e.to_string()),
      }
   }

   /// Streaming chat request. Decodes the SSE body line by line and feeds
   /// each `data:` payload to the callback; transport or parse failures
   /// yield a single error event and end the stream.
   pub async fn send_message_stream(
      &self,
      mut request: ChatSendRequest,
      callback: &mut dyn StreamCallback,
   ) {
      match self.gate() {
         Ok(project_id) => request.project_id = project_id,
         Err(error) => {
            callback.event(StreamEvent::Error { error });
            return;
         },
      }

      if request.model.is_none() {
         request.model = Some(self.resolve_model().await);
      }

      let mut stream = match self.api.send_stream(&request).await {
         Ok(stream) => stream,
         Err(e) => {
            callback.event(StreamEvent::Error { error: e.to_string() });
            return;
         },
      };

      let mut decoder = SseDecoder::default();
      while let Some(chunk) = stream.next().await {
         let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
               callback.event(StreamEvent::Error { error: e.to_string() });
               return;
            },
         };

         for payload in decoder.push(&chunk) {
            match serde_json::from_str::<StreamEvent>(&payload) {
               Ok(event) => callback.event(event),
               Err(e) => {
                  callback.event(StreamEvent::Error {
                     error: format!("malformed stream payload: {e}"),
                  });
                  return;
               },
            }
         }
      }
   }

   /// Default model id, falling back to the offline table when the models
   /// endpoint is unreachable.
   pub async fn resolve_model(&self) -> String {
      match self.api.models().await {
         Ok(response) => response
            .default
            .or_else(|| {
               response.models.iter().find(|m| m.is_default).map(|m| m.id.clone())
            })
            .or_else(|| response.models.first().map(|m| m.id.clone()))
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
         Err(e) => {
            tracing::warn!("model listing failed, using default: {}", e);
            DEFAULT_MODEL_ID.to_string()
         },
      }
   }

   /// Lists sessions for a project; failures degrade to an empty list.
   pub async fn get_sessions(&self, project_id: &str) -> Vec<ChatSession> {
      match self.api.sessions(project_id).await {
         Ok(response) => response.sessions,
         Err(e) => {
            tracing::warn!("failed to list sessions for {}: {}", project_id, e);
            Vec::new()
         },
      }
   }

   /// Message history for a session; failures degrade to an empty list.
   pub async fn get_session_history(&self, session_id: &str) -> Vec<ChatMessage> {
      match self.api.history(session_id).await {
         Ok(response) => response.messages,
         Err(e) => {
            tracing::warn!("failed to load history for {}: {}", session_id, e);
            Vec::new()
         },
      }
   }

   pub async fn delete_session(&self, session_id: &str) -> Result<()> {
      self.api.delete_session(session_id).await?;
      Ok(())
   }

   fn gate(&self) -> Result<String, String> {
      let state = self.state.lock();
      if !state.available {
         return Err(UNAVAILABLE_ERROR.to_string());
      }
      state.project_id.clone().ok_or_else(|| NO_PROJECT_ERROR.to_string())
   }
}

/// Incremental decoder for `text/event-stream` bodies.
///
/// Accumulates raw bytes, splits on `\n`, and yields the JSON payloads of
/// complete `data:` lines. A partial trailing line stays buffered across
/// chunks; a `\n` byte never lands inside a UTF-8 sequence, so per-line
/// decoding is safe.
#[derive(Default)]
struct SseDecoder {
   buffer: Vec<u8>,
}

impl SseDecoder {
   fn push(&mut self, chunk: &[u8]) -> Vec<String> {
      self.buffer.extend_from_slice(chunk);
      let mut payloads = Vec::new();

      while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
         let line: Vec<u8> = self.buffer.drain(..=pos).collect();
         let line = String::from_utf8_lossy(&line);
         let line = line.trim_end_matches(['\n', '\r']);
         if let Some(payload) = line.strip_prefix("data: ") {
            payloads.push(payload.to_string());
         }
      }

      payloads
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn decoder_splits_complete_lines() {
      let mut decoder = SseDecoder::default();
      let payloads = decoder.push(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n");
      assert_eq!(payloads, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
   }

   #[test]
   fn decoder_retains_partial_trailing_line() {
      let mut decoder = SseDecoder::default();
      assert!(decoder.push(b"data: {\"a\"").is_empty());
      let payloads = decoder.push(b":1}\n");
      assert_eq!(payloads, vec![r#"{"a":1}"#]);
   }

   #[test]
   fn decoder_handles_multibyte_split_across_chunks() {
      let mut decoder = SseDecoder::default();
      let frame = "data: {\"c\":\"héllo\"}\n".as_bytes();
      let (head, tail) = frame.split_at(12);
      assert!(decoder.push(head).is_empty());
      assert_eq!(decoder.push(tail), vec![r#"{"c":"héllo"}"#]);
   }

   #[test]
   fn decoder_ignores_non_data_lines() {
      let mut decoder = SseDecoder::default();
      let payloads = decoder.push(b"event: ping\nretry: 500\ndata: {}\n");
      assert_eq!(payloads, vec!["{}"]);
   }

   #[test]
   fn decoder_strips_carriage_returns() {
      let mut decoder = SseDecoder::default();
      let payloads = decoder.push(b"data: {\"a\":1}\r\n");
      assert_eq!(payloads, vec![r#"{"a":1}"#]);
   }
}
