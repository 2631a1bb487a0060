#![allow(dead_code)]

use std::{
   collections::{BTreeMap, BTreeSet, VecDeque},
   io,
   ops::Deref,
   path::{Path, PathBuf},
   sync::Arc,
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use parking_lot::Mutex;
use tether::{
   Error, Result,
   api::{
      ChatApi, IngestApi,
      types::{
         ChatMessage, ChatResponse, ChatSendRequest, ChatSession, CheckProjectRequest,
         CheckProjectResponse, CreateProjectResponse, HistoryResponse, IngestionStatus,
         InitIngestRequest, LocalProjectInfo, MerkleSyncPlan, MerkleSyncReport, MerkleSyncUpload,
         MerkleTreeEnvelope, ModelsResponse, OkResponse, ProgressResponse, ProjectStatusResponse,
         SessionsResponse, UploadBatchRequest, UploadBatchResponse,
      },
   },
   file::{FileService, FileStat},
   merkle::{Clock, MerkleNode},
};
use tokio::sync::broadcast;

pub const FIXED_NOW_MS: i64 = 1_700_000_000_000;
pub const FIXED_MTIME_MS: i64 = 1_699_000_000_000;

/// Deterministic clock for tree builds.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
   fn now_ms(&self) -> i64 {
      self.0
   }
}

impl Default for FixedClock {
   fn default() -> Self {
      Self(FIXED_NOW_MS)
   }
}

/// In-memory file service: a root, file contents, and optional poisoned
/// paths that fail on read.
pub struct MemoryFileService {
   root:       PathBuf,
   files:      BTreeMap<PathBuf, String>,
   dirs:       BTreeSet<PathBuf>,
   unreadable: BTreeSet<PathBuf>,
}

impl MemoryFileService {
   pub fn new(root: impl Into<PathBuf>) -> Self {
      let root = root.into();
      let mut dirs = BTreeSet::new();
      dirs.insert(root.clone());
      Self { root, files: BTreeMap::new(), dirs, unreadable: BTreeSet::new() }
   }

   pub fn root(&self) -> &Path {
      &self.root
   }

   pub fn insert(&mut self, rel: &str, content: &str) {
      let path = self.root.join(rel);
      let mut current = path.parent();
      while let Some(dir) = current {
         if !dir.starts_with(&self.root) {
            break;
         }
         self.dirs.insert(dir.to_path_buf());
         if dir == self.root {
            break;
         }
         current = dir.parent();
      }
      self.files.insert(path, content.to_string());
   }

   /// Keeps the file visible to stat but makes reads fail.
   pub fn poison(&mut self, rel: &str) {
      self.unreadable.insert(self.root.join(rel));
   }
}

#[async_trait]
impl FileService for MemoryFileService {
   async fn stat(&self, path: &Path) -> Result<FileStat> {
      if let Some(content) = self.files.get(path) {
         return Ok(FileStat {
            is_file:      true,
            is_directory: false,
            size:         content.len() as u64,
            modified_ms:  Some(FIXED_MTIME_MS),
            children:     Vec::new(),
         });
      }

      if self.dirs.contains(path) {
         let children: Vec<PathBuf> = self
            .files
            .keys()
            .chain(self.dirs.iter())
            .filter(|candidate| candidate.parent() == Some(path))
            .cloned()
            .collect();
         return Ok(FileStat {
            is_file: false,
            is_directory: true,
            size: 0,
            modified_ms: None,
            children,
         });
      }

      Err(Error::Io(io::Error::new(
         io::ErrorKind::NotFound,
         format!("{} not found", path.display()),
      )))
   }

   async fn read_to_string(&self, path: &Path) -> Result<String> {
      if self.unreadable.contains(path) {
         return Err(Error::Io(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("{} unreadable", path.display()),
         )));
      }
      self.files.get(path).cloned().ok_or_else(|| {
         Error::Io(io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())))
      })
   }
}

/// Scripted API double shared between the test and the orchestrator via a
/// cheap clone.
#[derive(Clone, Default)]
pub struct MockApi {
   inner: Arc<MockState>,
}

impl Deref for MockApi {
   type Target = MockState;

   fn deref(&self) -> &MockState {
      &self.inner
   }
}

#[derive(Default)]
pub struct MockState {
   // scripted responses; `None` means the endpoint fails
   pub check_response:   Mutex<Option<CheckProjectResponse>>,
   pub status_response:  Mutex<Option<LocalProjectInfo>>,
   pub progress_feed:    Mutex<VecDeque<ProgressResponse>>,
   pub plan_response:    Mutex<Option<MerkleSyncPlan>>,
   pub report_response:  Mutex<Option<MerkleSyncReport>>,
   pub remote_tree:      Mutex<Option<MerkleNode>>,
   pub fail_batches_from: Mutex<Option<usize>>,
   pub fail_init:        Mutex<bool>,

   pub models_response:   Mutex<Option<ModelsResponse>>,
   pub send_response:     Mutex<Option<ChatResponse>>,
   pub stream_chunks:     Mutex<Vec<std::result::Result<Vec<u8>, String>>>,
   pub sessions_response: Mutex<Option<Vec<ChatSession>>>,
   pub history_response:  Mutex<Option<Vec<ChatMessage>>>,

   // recordings
   pub init_requests: Mutex<Vec<InitIngestRequest>>,
   pub batches:       Mutex<Vec<UploadBatchRequest>>,
   pub plans:         Mutex<Vec<MerkleTreeEnvelope>>,
   pub sync_uploads:  Mutex<Vec<MerkleSyncUpload>>,
   pub stored_trees:  Mutex<Vec<MerkleTreeEnvelope>>,
   pub retried:       Mutex<Vec<String>>,
   pub progress_polls: Mutex<usize>,
   pub sent:          Mutex<Vec<ChatSendRequest>>,
   pub deleted:       Mutex<Vec<String>>,
}

fn unreachable_endpoint(op: &'static str) -> Error {
   Error::Server { op, reason: "mock endpoint not scripted".to_string() }
}

#[async_trait]
impl IngestApi for MockApi {
   async fn check_project(&self, _req: &CheckProjectRequest) -> Result<CheckProjectResponse> {
      Ok(self
         .check_response
         .lock()
         .clone()
         .unwrap_or(CheckProjectResponse { exists: false, project: None }))
   }

   async fn create_project(&self, req: &CheckProjectRequest) -> Result<CreateProjectResponse> {
      let _ = req;
      Ok(CreateProjectResponse { project_id: "p1".to_string(), local_hash: "hash1".to_string() })
   }

   async fn project_status(&self, _project_id: &str) -> Result<ProjectStatusResponse> {
      self
         .status_response
         .lock()
         .clone()
         .map(|project| ProjectStatusResponse { project })
         .ok_or_else(|| unreachable_endpoint("status"))
   }

   async fn init_ingest(&self, _project_id: &str, req: &InitIngestRequest) -> Result<OkResponse> {
      if *self.fail_init.lock() {
         return Err(unreachable_endpoint("init"));
      }
      self.init_requests.lock().push(req.clone());
      Ok(OkResponse { ok: true })
   }

   async fn upload_batch(
      &self,
      _project_id: &str,
      req: &UploadBatchRequest,
   ) -> Result<UploadBatchResponse> {
      if let Some(from) = *self.fail_batches_from.lock()
         && req.batch_index >= from
      {
         self.batches.lock().push(req.clone());
         return Err(unreachable_endpoint("files"));
      }

      self.batches.lock().push(req.clone());
      let total_processed: u64 =
         self.batches.lock().iter().map(|b| b.files.len() as u64).sum();
      Ok(UploadBatchResponse {
         total_processed,
         total_chunks: total_processed * 2,
         is_complete: req.batch_index + 1 == req.total_batches,
      })
   }

   async fn ingest_progress(&self, _project_id: &str) -> Result<ProgressResponse> {
      *self.progress_polls.lock() += 1;
      self
         .progress_feed
         .lock()
         .pop_front()
         .ok_or_else(|| unreachable_endpoint("progress"))
   }

   async fn retry_ingest(&self, project_id: &str) -> Result<OkResponse> {
      self.retried.lock().push(project_id.to_string());
      Ok(OkResponse { ok: true })
   }

   async fn fetch_merkle(&self, _project_id: &str) -> Result<MerkleTreeEnvelope> {
      self
         .remote_tree
         .lock()
         .clone()
         .map(|merkle_tree| MerkleTreeEnvelope { merkle_tree })
         .ok_or_else(|| unreachable_endpoint("merkle"))
   }

   async fn store_merkle(&self, _project_id: &str, req: &MerkleTreeEnvelope) -> Result<OkResponse> {
      self.stored_trees.lock().push(req.clone());
      Ok(OkResponse { ok: true })
   }

   async fn merkle_sync_plan(
      &self,
      _project_id: &str,
      req: &MerkleTreeEnvelope,
   ) -> Result<MerkleSyncPlan> {
      self.plans.lock().push(req.clone());
      self.plan_response.lock().clone().ok_or_else(|| unreachable_endpoint("merkle-sync"))
   }

   async fn merkle_sync_upload(
      &self,
      _project_id: &str,
      req: &MerkleSyncUpload,
   ) -> Result<MerkleSyncReport> {
      self.sync_uploads.lock().push(req.clone());
      self.report_response.lock().clone().ok_or_else(|| unreachable_endpoint("merkle-sync"))
   }
}

#[async_trait]
impl ChatApi for MockApi {
   async fn models(&self) -> Result<ModelsResponse> {
      self.models_response.lock().clone().ok_or_else(|| unreachable_endpoint("models"))
   }

   async fn send(&self, req: &ChatSendRequest) -> Result<ChatResponse> {
      self.sent.lock().push(req.clone());
      self.send_response.lock().clone().ok_or_else(|| unreachable_endpoint("send"))
   }

   async fn send_stream(
      &self,
      req: &ChatSendRequest,
   ) -> Result<BoxStream<'static, Result<Bytes>>> {
      self.sent.lock().push(req.clone());
      let items: Vec<Result<Bytes>> = self
         .stream_chunks
         .lock()
         .iter()
         .map(|chunk| match chunk {
            Ok(bytes) => Ok(Bytes::from(bytes.clone())),
            Err(reason) => Err(Error::Server { op: "stream", reason: reason.clone() }),
         })
         .collect();
      Ok(futures::stream::iter(items).boxed())
   }

   async fn sessions(&self, _project_id: &str) -> Result<SessionsResponse> {
      self
         .sessions_response
         .lock()
         .clone()
         .map(|sessions| SessionsResponse { sessions })
         .ok_or_else(|| unreachable_endpoint("sessions"))
   }

   async fn history(&self, _session_id: &str) -> Result<HistoryResponse> {
      self
         .history_response
         .lock()
         .clone()
         .map(|messages| HistoryResponse { messages })
         .ok_or_else(|| unreachable_endpoint("history"))
   }

   async fn delete_session(&self, session_id: &str) -> Result<OkResponse> {
      self.deleted.lock().push(session_id.to_string());
      Ok(OkResponse { ok: true })
   }
}

/// Canned project row.
pub fn project(status: IngestionStatus) -> LocalProjectInfo {
   LocalProjectInfo {
      project_id: "p1".to_string(),
      local_hash: "hash1".to_string(),
      folder_name: "app".to_string(),
      folder_path: "/ws/app".to_string(),
      ingestion_status: status,
      total_files: 0,
      processed_files: 0,
      total_chunks: 0,
      error: None,
   }
}

/// Drains everything currently buffered in a broadcast receiver.
pub fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
   let mut out = Vec::new();
   while let Ok(event) = rx.try_recv() {
      out.push(event);
   }
   out
}
