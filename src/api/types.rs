//! Wire types for the ingestion and chat endpoints.
//!
//! Field names are camelCase on the wire; enum discriminants are lowercase.
//! Response-side fields default aggressively so a server rolling out new
//! fields never breaks decoding.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::merkle::{
   MerkleNode,
   diff::{Change, DiffSummary},
};

/// Server-side ingestion lifecycle for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStatus {
   Pending,
   Processing,
   Completed,
   Failed,
}

impl IngestionStatus {
   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Pending => "pending",
         Self::Processing => "processing",
         Self::Completed => "completed",
         Self::Failed => "failed",
      }
   }
}

impl std::fmt::Display for IngestionStatus {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.write_str(self.as_str())
   }
}

/// Remote project row for a local folder. Created by the server on first
/// sight of a local hash; the client never persists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalProjectInfo {
   pub project_id:       String,
   pub local_hash:       String,
   pub folder_name:      String,
   pub folder_path:      String,
   pub ingestion_status: IngestionStatus,
   #[serde(default)]
   pub total_files:      u64,
   #[serde(default)]
   pub processed_files:  u64,
   #[serde(default)]
   pub total_chunks:     u64,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub error:            Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckProjectRequest {
   pub folder_path: String,
   pub folder_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckProjectResponse {
   pub exists:  bool,
   #[serde(default)]
   pub project: Option<LocalProjectInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectResponse {
   pub project_id: String,
   pub local_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectStatusResponse {
   pub project: LocalProjectInfo,
}

/// Catch-all acknowledgement body; any 2xx counts as success even when the
/// body is empty or unknown.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OkResponse {
   #[serde(default)]
   pub ok: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitIngestRequest {
   pub total_files: u64,
   pub merkle_tree: MerkleNode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
   pub path:          String,
   pub content:       String,
   pub size:          u64,
   pub last_modified: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBatchRequest {
   pub files:         Vec<FileUpload>,
   pub batch_index:   usize,
   pub total_batches: usize,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBatchResponse {
   #[serde(default)]
   pub total_processed: u64,
   #[serde(default)]
   pub total_chunks:    u64,
   #[serde(default)]
   pub is_complete:     bool,
}

/// Progress sample surfaced to the UI. `processed` and `chunks` are always
/// the server's own counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionProgress {
   #[serde(default)]
   pub total:     u64,
   #[serde(default)]
   pub processed: u64,
   #[serde(default)]
   pub chunks:    u64,
   #[serde(default)]
   pub percent:   f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressResponse {
   pub status:   IngestionStatus,
   #[serde(default)]
   pub progress: IngestionProgress,
   #[serde(default)]
   pub error:    Option<String>,
}

/// `{merkleTree}` envelope shared by the merkle GET/PUT pair and sync
/// phase 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleTreeEnvelope {
   pub merkle_tree: MerkleNode,
}

/// Phase-1 response: what changed and which contents the server wants.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleSyncPlan {
   #[serde(default)]
   pub changes:     Vec<Change>,
   #[serde(default)]
   pub summary:     DiffSummary,
   #[serde(default)]
   pub needs_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFileContent {
   pub content: String,
}

/// Phase-2 request: the tree again plus the requested contents.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleSyncUpload {
   pub merkle_tree: MerkleNode,
   pub files:       HashMap<String, SyncFileContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleSyncReport {
   #[serde(default)]
   pub changes:         Vec<Change>,
   #[serde(default)]
   pub summary:         DiffSummary,
   #[serde(default)]
   pub files_processed: u64,
   #[serde(default)]
   pub files_deleted:   u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
   pub id:     String,
   pub name:   String,
   pub vendor: String,
   #[serde(default)]
   pub is_default: bool,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
   #[serde(default)]
   pub models:  Vec<ModelInfo>,
   #[serde(default)]
   pub default: Option<String>,
}

/// Model id used when the models endpoint is unreachable.
pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-pro";

/// Offline fallback for the model dropdown.
pub fn default_models() -> Vec<ModelInfo> {
   vec![
      ModelInfo {
         id:     DEFAULT_MODEL_ID.to_string(),
         name:   "Gemini 2.5 Pro".to_string(),
         vendor: "google".to_string(),
         is_default: true,
         max_tokens: None,
      },
      ModelInfo {
         id:     "gemini-2.5-flash".to_string(),
         name:   "Gemini 2.5 Flash".to_string(),
         vendor: "google".to_string(),
         is_default: false,
         max_tokens: None,
      },
      ModelInfo {
         id:     "gemini-2.0-flash".to_string(),
         name:   "Gemini 2.0 Flash".to_string(),
         vendor: "google".to_string(),
         is_default: false,
         max_tokens: None,
      },
   ]
}

/// Outgoing chat request. The gateway fills `project_id` from its mirror
/// of the orchestrator state.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendRequest {
   pub project_id: String,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub session_id: Option<String>,
   pub message:    String,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub model:      Option<String>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub context_files: Option<Vec<String>>,
}

impl ChatSendRequest {
   pub fn new(message: impl Into<String>) -> Self {
      Self { message: message.into(), ..Self::default() }
   }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
   pub session_id: String,
   pub reply:      String,
   #[serde(default)]
   pub edits:      Vec<Edit>,
   #[serde(default)]
   pub context_used: Vec<String>,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub merkle_tree: Option<MerkleNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditType {
   Create,
   Modify,
   Delete,
}

impl EditType {
   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Create => "create",
         Self::Modify => "modify",
         Self::Delete => "delete",
      }
   }
}

/// Server-proposed file change relayed opaquely to the host editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edit {
   pub file_path: String,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub original_content: Option<String>,
   pub new_content: String,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub start_line: Option<u32>,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub end_line: Option<u32>,
   #[serde(rename = "type")]
   pub edit_type: EditType,
}

/// One decoded server-sent event on the streaming chat path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
   #[serde(rename_all = "camelCase")]
   Start {
      #[serde(default, skip_serializing_if = "Option::is_none")]
      session_id: Option<String>,
   },
   Response {
      #[serde(default)]
      content: String,
   },
   #[serde(rename_all = "camelCase")]
   Complete {
      #[serde(default, skip_serializing_if = "Option::is_none")]
      session_id: Option<String>,
      #[serde(default)]
      edits: Vec<Edit>,
      #[serde(default)]
      context_used: Vec<String>,
   },
   Error {
      #[serde(default)]
      error: String,
   },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
   pub session_id: String,
   #[serde(default)]
   pub title: Option<String>,
   #[serde(default)]
   pub message_count: u64,
   #[serde(default)]
   pub created_at: Option<String>,
   #[serde(default)]
   pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionsResponse {
   #[serde(default)]
   pub sessions: Vec<ChatSession>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
   pub role:    String,
   pub content: String,
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
   #[serde(default)]
   pub messages: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn ingestion_status_wire_names() {
      assert_eq!(serde_json::to_string(&IngestionStatus::Pending).unwrap(), r#""pending""#);
      let status: IngestionStatus = serde_json::from_str(r#""failed""#).unwrap();
      assert_eq!(status, IngestionStatus::Failed);
   }

   #[test]
   fn project_info_tolerates_missing_counters() {
      let raw = r#"{
         "projectId": "p1",
         "localHash": "abc",
         "folderName": "app",
         "folderPath": "/home/dev/app",
         "ingestionStatus": "processing"
      }"#;
      let info: LocalProjectInfo = serde_json::from_str(raw).unwrap();
      assert_eq!(info.total_files, 0);
      assert!(info.error.is_none());
   }

   #[test]
   fn stream_events_decode_by_type_tag() {
      let start: StreamEvent = serde_json::from_str(r#"{"type":"start","sessionId":"s1"}"#).unwrap();
      assert_eq!(start, StreamEvent::Start { session_id: Some("s1".to_string()) });

      let chunk: StreamEvent = serde_json::from_str(r#"{"type":"response","content":"hi"}"#).unwrap();
      assert_eq!(chunk, StreamEvent::Response { content: "hi".to_string() });

      let done: StreamEvent = serde_json::from_str(r#"{"type":"complete"}"#).unwrap();
      assert!(matches!(done, StreamEvent::Complete { .. }));
   }

   #[test]
   fn edit_type_field_is_renamed() {
      let raw = r#"{"filePath":"src/a.rs","newContent":"x","type":"create"}"#;
      let edit: Edit = serde_json::from_str(raw).unwrap();
      assert_eq!(edit.edit_type, EditType::Create);
      let value = serde_json::to_value(&edit).unwrap();
      assert_eq!(value["type"], "create");
   }

   #[test]
   fn default_models_pin_gemini_pro() {
      let models = default_models();
      assert_eq!(models[0].id, DEFAULT_MODEL_ID);
      assert!(models[0].is_default);
      assert_eq!(models.len(), 3);
   }
}
