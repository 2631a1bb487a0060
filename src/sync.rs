//! Sync orchestration: project identity, the ingestion state machine, and
//! progress events.
//!
//! One orchestrator owns one active project at a time. On workspace open it
//! asks the server whether the folder is known; unknown folders get a full
//! batched ingestion, completed ones get a two-phase merkle sync, and
//! in-flight ones are polled until they settle. Events go out on a
//! broadcast channel; one-shot failures are typed results, never panics.

use std::{collections::HashMap, path::Path, time::Duration};

use serde::Serialize;
use tokio::sync::{Mutex, broadcast};

use crate::{
   api::{
      IngestApi,
      types::{
         CheckProjectRequest, FileUpload, IngestionProgress, IngestionStatus, InitIngestRequest,
         LocalProjectInfo, MerkleSyncUpload, MerkleTreeEnvelope, SyncFileContent,
         UploadBatchRequest,
      },
   },
   config,
   error::Result,
   file::{FileService, Workspace, collect_files},
   identity,
   merkle::{Clock, FileInput, MerkleNode, SystemClock, TreeBuilder},
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events emitted by the orchestrator; single writer, any number of
/// readers. For a newly adopted project, `ProjectChanged` always precedes
/// the first `Progress`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SyncEvent {
   /// The active project changed; `None` when the workspace has no root.
   #[serde(rename_all = "camelCase")]
   ProjectChanged { project: Option<LocalProjectInfo> },
   /// Server-reported ingestion progress.
   #[serde(rename_all = "camelCase")]
   Progress {
      project_id: String,
      progress:   IngestionProgress,
   },
   /// Ingestion or sync reached a successful terminal state.
   #[serde(rename_all = "camelCase")]
   Complete { project_id: String },
   /// A sync step failed; orchestrator state is left untouched.
   #[serde(rename_all = "camelCase")]
   Error { project_id: String, error: String },
}

#[derive(Default)]
struct ActiveProject {
   info: Option<LocalProjectInfo>,
   tree: Option<MerkleNode>,
}

/// Drives ingestion and incremental sync for the workspace's first root.
pub struct SyncOrchestrator<W, F, A, C = SystemClock>
where
   W: Workspace,
   F: FileService,
   A: IngestApi,
   C: Clock,
{
   workspace:    W,
   file_service: F,
   api:          A,
   user_id:      String,
   builder:      TreeBuilder<C>,
   current:      Mutex<ActiveProject>,
   events:       broadcast::Sender<SyncEvent>,
}

impl<W, F, A> SyncOrchestrator<W, F, A>
where
   W: Workspace,
   F: FileService,
   A: IngestApi,
{
   pub fn new(workspace: W, file_service: F, api: A, user_id: impl Into<String>) -> Self {
      Self::with_clock(workspace, file_service, api, user_id, SystemClock)
   }
}

impl<W, F, A, C> SyncOrchestrator<W, F, A, C>
where
   W: Workspace,
   F: FileService,
   A: IngestApi,
   C: Clock,
{
   pub fn with_clock(
      workspace: W,
      file_service: F,
      api: A,
      user_id: impl Into<String>,
      clock: C,
   ) -> Self {
      let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
      Self {
         workspace,
         file_service,
         api,
         user_id: user_id.into(),
         builder: TreeBuilder::with_clock(clock),
         current: Mutex::new(ActiveProject::default()),
         events,
      }
   }

   pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
      self.events.subscribe()
   }

   /// Snapshot of the active project, if any.
   pub async fn current_project(&self) -> Option<LocalProjectInfo> {
      self.current.lock().await.info.clone()
   }

   /// The last successfully synced tree.
   pub async fn current_tree(&self) -> Option<MerkleNode> {
      self.current.lock().await.tree.clone()
   }

   /// Entry point after transport configuration: immediately reconciles
   /// the workspace.
   pub async fn initialize(&self) -> Result<()> {
      self.check_and_ingest_workspace().await
   }

   /// Reads the workspace's first root and drives ingestion for it. With
   /// no root, the active project is cleared and a null project-changed
   /// event goes out.
   pub async fn check_and_ingest_workspace(&self) -> Result<()> {
      let Some(root) = self.workspace.roots().into_iter().next() else {
         let mut current = self.current.lock().await;
         current.info = None;
         current.tree = None;
         drop(current);
         self.emit(SyncEvent::ProjectChanged { project: None });
         return Ok(());
      };
      self.ingest_folder(&root).await
   }

   /// Main driver: adopt-or-create the project for `root`, then run the
   /// path its server-side status calls for.
   pub async fn ingest_folder(&self, root: &Path) -> Result<()> {
      let (folder_path, folder_name) = identity::folder_parts(root)?;
      let local_hash = identity::project_identity(&self.user_id, &folder_path, &folder_name);
      tracing::debug!("checking project {} ({})", folder_name, local_hash);

      let request = CheckProjectRequest {
         folder_path: folder_path.clone(),
         folder_name: folder_name.clone(),
      };
      let check = self.api.check_project(&request).await?;

      match check.project.filter(|_| check.exists) {
         None => {
            let created = self.api.create_project(&request).await?;
            let project_id = created.project_id.clone();
            self
               .adopt(LocalProjectInfo {
                  project_id: created.project_id,
                  local_hash: created.local_hash,
                  folder_name,
                  folder_path,
                  ingestion_status: IngestionStatus::Pending,
                  total_files: 0,
                  processed_files: 0,
                  total_chunks: 0,
                  error: None,
               })
               .await;
            self.full_ingest(&project_id, root).await
         },
         Some(project) => {
            let project_id = project.project_id.clone();
            let status = project.ingestion_status;
            self.adopt(project).await;

            match status {
               IngestionStatus::Completed => self.sync_with_merkle(&project_id, root).await,
               IngestionStatus::Processing => self.poll_progress(&project_id).await,
               IngestionStatus::Failed => {
                  tracing::warn!("project {} failed ingestion; awaiting retry", project_id);
                  Ok(())
               },
               // Created but never uploaded (an interrupted first run):
               // run the full ingestion path again.
               IngestionStatus::Pending => self.full_ingest(&project_id, root).await,
            }
         },
      }
   }

   /// Fetches the server's view of a project.
   pub async fn get_project_status(&self, project_id: &str) -> Result<LocalProjectInfo> {
      Ok(self.api.project_status(project_id).await?.project)
   }

   /// Server-side retry back to `pending`, then re-enter from the top.
   /// Any 2xx on the retry endpoint counts as success.
   pub async fn retry_ingestion(&self, project_id: &str) -> Result<()> {
      self.api.retry_ingest(project_id).await?;
      self.check_and_ingest_workspace().await
   }

   /// Downloads the server's stored tree.
   pub async fn get_merkle_tree(&self, project_id: &str) -> Result<MerkleNode> {
      Ok(self.api.fetch_merkle(project_id).await?.merkle_tree)
   }

   /// Replaces the server's stored tree and adopts it locally.
   pub async fn update_merkle_tree(&self, project_id: &str, tree: MerkleNode) -> Result<()> {
      self
         .api
         .store_merkle(project_id, &MerkleTreeEnvelope { merkle_tree: tree.clone() })
         .await?;
      self.set_tree(tree).await;
      Ok(())
   }

   /// Two-phase diff-and-upload against the server's stored tree; also
   /// usable standalone and safe to re-run.
   ///
   /// Phase 1 posts the fresh tree alone. An empty `needsFiles` answer
   /// means deletes-only or no-op and completes immediately. Phase 2
   /// uploads the requested contents from the call-owned path→content map;
   /// the current tree advances only when the exchange succeeds.
   pub async fn sync_with_merkle(&self, project_id: &str, root: &Path) -> Result<()> {
      let collected = collect_files(&self.file_service, root).await?;
      let mut contents: HashMap<String, String> = HashMap::with_capacity(collected.len());
      let mut inputs: Vec<FileInput> = Vec::with_capacity(collected.len());

      for file in &collected {
         let content = match self.file_service.read_to_string(&file.abs_path).await {
            Ok(content) => content,
            Err(e) => {
               tracing::warn!("failed to read {}: {}", file.abs_path.display(), e);
               continue;
            },
         };
         contents.insert(file.rel_path.clone(), content.clone());
         inputs.push(FileInput {
            path: file.rel_path.clone(),
            content,
            size: Some(file.size),
            last_modified: file.modified_ms,
         });
      }

      let tree = self.builder.build(&inputs);
      let envelope = MerkleTreeEnvelope { merkle_tree: tree.clone() };
      let plan =
         self.observe(project_id, self.api.merkle_sync_plan(project_id, &envelope).await)?;

      if plan.needs_files.is_empty() {
         tracing::debug!(
            "merkle sync for {}: {} changes, no content requested",
            project_id,
            plan.summary.total
         );
         self.finish(project_id, tree).await;
         return Ok(());
      }

      let mut files = HashMap::with_capacity(plan.needs_files.len());
      for path in &plan.needs_files {
         match contents.get(path) {
            Some(content) => {
               files.insert(path.clone(), SyncFileContent { content: content.clone() });
            },
            None => tracing::warn!("server requested unknown path {}", path),
         }
      }

      let upload = MerkleSyncUpload { merkle_tree: tree.clone(), files };
      let report =
         self.observe(project_id, self.api.merkle_sync_upload(project_id, &upload).await)?;

      tracing::debug!(
         "merkle sync for {}: {} processed, {} deleted",
         project_id,
         report.files_processed,
         report.files_deleted
      );
      self.finish(project_id, tree).await;
      Ok(())
   }

   /// Full batched ingestion for a fresh project: collect, build, init,
   /// then post batches strictly sequentially, emitting a progress event
   /// per acknowledged batch. The server flags the terminal batch.
   async fn full_ingest(&self, project_id: &str, root: &Path) -> Result<()> {
      let collected = collect_files(&self.file_service, root).await?;
      let now_ms = self.builder.clock().now_ms();
      let mut uploads: Vec<FileUpload> = Vec::with_capacity(collected.len());
      let mut inputs: Vec<FileInput> = Vec::with_capacity(collected.len());

      for file in &collected {
         let content = match self.file_service.read_to_string(&file.abs_path).await {
            Ok(content) => content,
            Err(e) => {
               tracing::warn!("failed to read {}: {}", file.abs_path.display(), e);
               continue;
            },
         };
         uploads.push(FileUpload {
            path:          file.rel_path.clone(),
            content:       content.clone(),
            size:          file.size,
            last_modified: file.modified_ms.unwrap_or(now_ms),
         });
         inputs.push(FileInput {
            path: file.rel_path.clone(),
            content,
            size: Some(file.size),
            last_modified: file.modified_ms,
         });
      }

      let tree = self.builder.build(&inputs);
      let total_files = uploads.len() as u64;
      let init = InitIngestRequest { total_files, merkle_tree: tree.clone() };
      self.observe(project_id, self.api.init_ingest(project_id, &init).await)?;
      self.set_tree(tree).await;

      if uploads.is_empty() {
         self.mark_completed(project_id).await;
         self.emit(SyncEvent::Complete { project_id: project_id.to_string() });
         return Ok(());
      }

      let batch_size = config::get().effective_upload_batch_size();
      let total_batches = uploads.len().div_ceil(batch_size);

      for (batch_index, files) in uploads.chunks(batch_size).enumerate() {
         let request = UploadBatchRequest { files: files.to_vec(), batch_index, total_batches };
         let response =
            self.observe(project_id, self.api.upload_batch(project_id, &request).await)?;

         let progress = IngestionProgress {
            total:     total_files,
            processed: response.total_processed,
            chunks:    response.total_chunks,
            percent:   response.total_processed as f64 * 100.0 / total_files as f64,
         };
         self.emit(SyncEvent::Progress { project_id: project_id.to_string(), progress });

         if response.is_complete {
            self.mark_completed(project_id).await;
            self.emit(SyncEvent::Complete { project_id: project_id.to_string() });
            return Ok(());
         }
      }

      Ok(())
   }

   /// Samples the progress endpoint until the status leaves `processing`,
   /// emitting each sample. Transport failures end the loop silently; the
   /// next workspace change or an explicit retry resumes work.
   async fn poll_progress(&self, project_id: &str) -> Result<()> {
      let interval = Duration::from_millis(config::get().effective_poll_interval_ms());

      loop {
         let response = match self.api.ingest_progress(project_id).await {
            Ok(response) => response,
            Err(e) => {
               tracing::debug!("progress poll for {} ended: {}", project_id, e);
               return Ok(());
            },
         };

         self.emit(SyncEvent::Progress {
            project_id: project_id.to_string(),
            progress:   response.progress,
         });

         match response.status {
            IngestionStatus::Processing => {},
            IngestionStatus::Completed => {
               self.mark_completed(project_id).await;
               self.emit(SyncEvent::Complete { project_id: project_id.to_string() });
               return Ok(());
            },
            status => {
               let error = response
                  .error
                  .unwrap_or_else(|| format!("ingestion ended with status {status}"));
               self.set_status(project_id, status).await;
               self.emit(SyncEvent::Error { project_id: project_id.to_string(), error });
               return Ok(());
            },
         }

         tokio::time::sleep(interval).await;
      }
   }

   fn emit(&self, event: SyncEvent) {
      // Nobody listening is fine; events are advisory.
      let _ = self.events.send(event);
   }

   /// Emits an error event for a failed step without touching state.
   fn observe<T>(&self, project_id: &str, result: Result<T>) -> Result<T> {
      if let Err(e) = &result {
         self.emit(SyncEvent::Error {
            project_id: project_id.to_string(),
            error:      e.to_string(),
         });
      }
      result
   }

   async fn adopt(&self, info: LocalProjectInfo) {
      let mut current = self.current.lock().await;
      current.info = Some(info.clone());
      drop(current);
      self.emit(SyncEvent::ProjectChanged { project: Some(info) });
   }

   async fn set_tree(&self, tree: MerkleNode) {
      self.current.lock().await.tree = Some(tree);
   }

   async fn set_status(&self, project_id: &str, status: IngestionStatus) {
      let mut current = self.current.lock().await;
      if let Some(info) = current.info.as_mut()
         && info.project_id == project_id
      {
         info.ingestion_status = status;
      }
   }

   async fn mark_completed(&self, project_id: &str) {
      self.set_status(project_id, IngestionStatus::Completed).await;
   }

   /// Adopts `tree` as current, marks the project completed, and emits the
   /// completion event.
   async fn finish(&self, project_id: &str, tree: MerkleNode) {
      self.set_tree(tree).await;
      self.mark_completed(project_id).await;
      self.emit(SyncEvent::Complete { project_id: project_id.to_string() });
   }
}
