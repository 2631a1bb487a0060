//! HTTP boundary: typed endpoint clients over reqwest.
//!
//! The orchestrator and gateway consume the `IngestApi`/`ChatApi` traits;
//! `HttpApi` is the production implementation. Non-2xx responses become
//! `HttpError::Status` with the body text retained, and decode failures
//! surface as transport failures at this boundary, never deeper.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use serde::{Serialize, de::DeserializeOwned};

use self::types::{
   ChatResponse, ChatSendRequest, CheckProjectRequest, CheckProjectResponse,
   CreateProjectResponse, HistoryResponse, InitIngestRequest, MerkleSyncPlan, MerkleSyncReport,
   MerkleSyncUpload, MerkleTreeEnvelope, ModelsResponse, OkResponse, ProgressResponse,
   ProjectStatusResponse, SessionsResponse, UploadBatchRequest, UploadBatchResponse,
};
use crate::{
   config,
   error::{Error, HttpError, Result},
};

/// Backend endpoint and bearer credentials injected at startup.
#[derive(Debug, Clone)]
pub struct Transport {
   pub base_url: String,
   pub token:    String,
}

impl Transport {
   pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
      let mut base_url: String = base_url.into();
      while base_url.ends_with('/') {
         base_url.pop();
      }
      Self { base_url, token: token.into() }
   }
}

/// Ingestion-side endpoints consumed by the sync orchestrator.
#[async_trait]
pub trait IngestApi: Send + Sync {
   async fn check_project(&self, req: &CheckProjectRequest) -> Result<CheckProjectResponse>;
   async fn create_project(&self, req: &CheckProjectRequest) -> Result<CreateProjectResponse>;
   async fn project_status(&self, project_id: &str) -> Result<ProjectStatusResponse>;
   async fn init_ingest(&self, project_id: &str, req: &InitIngestRequest) -> Result<OkResponse>;
   async fn upload_batch(
      &self,
      project_id: &str,
      req: &UploadBatchRequest,
   ) -> Result<UploadBatchResponse>;
   async fn ingest_progress(&self, project_id: &str) -> Result<ProgressResponse>;
   async fn retry_ingest(&self, project_id: &str) -> Result<OkResponse>;
   async fn fetch_merkle(&self, project_id: &str) -> Result<MerkleTreeEnvelope>;
   async fn store_merkle(&self, project_id: &str, req: &MerkleTreeEnvelope) -> Result<OkResponse>;
   async fn merkle_sync_plan(
      &self,
      project_id: &str,
      req: &MerkleTreeEnvelope,
   ) -> Result<MerkleSyncPlan>;
   async fn merkle_sync_upload(
      &self,
      project_id: &str,
      req: &MerkleSyncUpload,
   ) -> Result<MerkleSyncReport>;
}

/// Chat-side endpoints consumed by the session gateway.
#[async_trait]
pub trait ChatApi: Send + Sync {
   async fn models(&self) -> Result<ModelsResponse>;
   async fn send(&self, req: &ChatSendRequest) -> Result<ChatResponse>;
   /// Opens the SSE response and hands back the raw byte stream; the
   /// gateway owns frame decoding.
   async fn send_stream(&self, req: &ChatSendRequest)
   -> Result<BoxStream<'static, Result<Bytes>>>;
   async fn sessions(&self, project_id: &str) -> Result<SessionsResponse>;
   async fn history(&self, session_id: &str) -> Result<HistoryResponse>;
   async fn delete_session(&self, session_id: &str) -> Result<OkResponse>;
}

/// reqwest-backed client implementing both endpoint families.
#[derive(Clone)]
pub struct HttpApi {
   client:    reqwest::Client,
   transport: Transport,
}

impl HttpApi {
   pub fn new(transport: Transport) -> Self {
      Self { client: reqwest::Client::new(), transport }
   }

   fn url(&self, path: &str) -> String {
      format!("{}{path}", self.transport.base_url)
   }

   fn timeout() -> Duration {
      Duration::from_secs(config::get().request_timeout_secs)
   }

   fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
      request.bearer_auth(&self.transport.token)
   }

   async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
      let status = response.status();
      if !status.is_success() {
         let body = response.text().await.unwrap_or_default();
         return Err(HttpError::Status { status: status.as_u16(), body }.into());
      }
      Ok(response.json::<T>().await.map_err(HttpError::Request)?)
   }

   async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
      let response = self
         .authorize(self.client.get(self.url(path)))
         .timeout(Self::timeout())
         .send()
         .await
         .map_err(HttpError::Request)?;
      Self::decode(response).await
   }

   async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
   where
      B: Serialize + Sync,
      T: DeserializeOwned,
   {
      let response = self
         .authorize(self.client.post(self.url(path)))
         .timeout(Self::timeout())
         .json(body)
         .send()
         .await
         .map_err(HttpError::Request)?;
      Self::decode(response).await
   }

   async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
      let response = self
         .authorize(self.client.post(self.url(path)))
         .timeout(Self::timeout())
         .send()
         .await
         .map_err(HttpError::Request)?;
      Self::decode(response).await
   }

   async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
   where
      B: Serialize + Sync,
      T: DeserializeOwned,
   {
      let response = self
         .authorize(self.client.put(self.url(path)))
         .timeout(Self::timeout())
         .json(body)
         .send()
         .await
         .map_err(HttpError::Request)?;
      Self::decode(response).await
   }

   async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
      let response = self
         .authorize(self.client.delete(self.url(path)))
         .timeout(Self::timeout())
         .send()
         .await
         .map_err(HttpError::Request)?;
      Self::decode(response).await
   }
}

#[async_trait]
impl IngestApi for HttpApi {
   async fn check_project(&self, req: &CheckProjectRequest) -> Result<CheckProjectResponse> {
      self.post_json("/api/local-projects/check", req).await
   }

   async fn create_project(&self, req: &CheckProjectRequest) -> Result<CreateProjectResponse> {
      self.post_json("/api/local-projects/create", req).await
   }

   async fn project_status(&self, project_id: &str) -> Result<ProjectStatusResponse> {
      self.get_json(&format!("/api/local-projects/{project_id}/status")).await
   }

   async fn init_ingest(&self, project_id: &str, req: &InitIngestRequest) -> Result<OkResponse> {
      self.post_json(&format!("/api/local-ingest/{project_id}/init"), req).await
   }

   async fn upload_batch(
      &self,
      project_id: &str,
      req: &UploadBatchRequest,
   ) -> Result<UploadBatchResponse> {
      self.post_json(&format!("/api/local-ingest/{project_id}/files"), req).await
   }

   async fn ingest_progress(&self, project_id: &str) -> Result<ProgressResponse> {
      self.get_json(&format!("/api/local-ingest/{project_id}/progress")).await
   }

   async fn retry_ingest(&self, project_id: &str) -> Result<OkResponse> {
      self.post_empty(&format!("/api/local-ingest/{project_id}/retry")).await
   }

   async fn fetch_merkle(&self, project_id: &str) -> Result<MerkleTreeEnvelope> {
      self.get_json(&format!("/api/local-ingest/{project_id}/merkle")).await
   }

   async fn store_merkle(&self, project_id: &str, req: &MerkleTreeEnvelope) -> Result<OkResponse> {
      self.put_json(&format!("/api/local-ingest/{project_id}/merkle"), req).await
   }

   async fn merkle_sync_plan(
      &self,
      project_id: &str,
      req: &MerkleTreeEnvelope,
   ) -> Result<MerkleSyncPlan> {
      self.post_json(&format!("/api/projects/{project_id}/merkle-sync"), req).await
   }

   async fn merkle_sync_upload(
      &self,
      project_id: &str,
      req: &MerkleSyncUpload,
   ) -> Result<MerkleSyncReport> {
      self.post_json(&format!("/api/projects/{project_id}/merkle-sync"), req).await
   }
}

#[async_trait]
impl ChatApi for HttpApi {
   async fn models(&self) -> Result<ModelsResponse> {
      self.get_json("/api/custom-chat/models").await
   }

   async fn send(&self, req: &ChatSendRequest) -> Result<ChatResponse> {
      self.post_json("/api/custom-chat/send", req).await
   }

   async fn send_stream(
      &self,
      req: &ChatSendRequest,
   ) -> Result<BoxStream<'static, Result<Bytes>>> {
      // No request timeout here: the stream stays open for the whole
      // generation.
      let response = self
         .authorize(self.client.post(self.url("/api/custom-chat/send-stream")))
         .json(req)
         .send()
         .await
         .map_err(HttpError::Request)?;

      let status = response.status();
      if !status.is_success() {
         let body = response.text().await.unwrap_or_default();
         return Err(HttpError::Status { status: status.as_u16(), body }.into());
      }

      Ok(response
         .bytes_stream()
         .map(|chunk| chunk.map_err(|e| Error::from(HttpError::Request(e))))
         .boxed())
   }

   async fn sessions(&self, project_id: &str) -> Result<SessionsResponse> {
      self.get_json(&format!("/api/custom-chat/sessions/{project_id}")).await
   }

   async fn history(&self, session_id: &str) -> Result<HistoryResponse> {
      self.get_json(&format!("/api/custom-chat/history/{session_id}")).await
   }

   async fn delete_session(&self, session_id: &str) -> Result<OkResponse> {
      self.delete_json(&format!("/api/custom-chat/sessions/{session_id}")).await
   }
}
