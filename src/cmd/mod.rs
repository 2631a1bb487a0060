//! CLI command implementations for tether.
//!
//! Each module corresponds to a subcommand. Shared wiring (transport from
//! config, root resolution, project lookup) lives here.

pub mod chat;
pub mod delete_session;
pub mod history;
pub mod models;
pub mod retry;
pub mod sessions;
pub mod status;
pub mod sync;
pub mod tree;

use std::path::PathBuf;

use crate::{
   Result,
   api::{
      HttpApi, IngestApi, Transport,
      types::{CheckProjectRequest, LocalProjectInfo},
   },
   config, identity,
};

/// Builds the production HTTP client from the active configuration.
pub(crate) fn http_api() -> HttpApi {
   let cfg = config::get();
   HttpApi::new(Transport::new(&cfg.backend_url, &cfg.auth_token))
}

/// Resolves the folder argument to an absolute root, defaulting to cwd.
pub(crate) fn resolve_root(path: Option<PathBuf>) -> Result<PathBuf> {
   let root = match path {
      Some(path) => path,
      None => std::env::current_dir()?,
   };
   Ok(root.canonicalize().unwrap_or(root))
}

/// Looks up the server-side project row for a root, if one exists.
pub(crate) async fn lookup_project(
   api: &HttpApi,
   root: &std::path::Path,
) -> Result<Option<LocalProjectInfo>> {
   let (folder_path, folder_name) = identity::folder_parts(root)?;
   let check = api
      .check_project(&CheckProjectRequest { folder_path, folder_name })
      .await?;
   Ok(check.project.filter(|_| check.exists))
}
