//! Local-disk implementations of the host seams.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{
   Result,
   file::{FileService, FileStat, Workspace},
};

/// File service backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileService;

#[async_trait]
impl FileService for LocalFileService {
   async fn stat(&self, path: &Path) -> Result<FileStat> {
      let metadata = tokio::fs::metadata(path).await?;
      let modified_ms = metadata
         .modified()
         .ok()
         .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
         .map(|d| d.as_millis() as i64);

      let mut stat = FileStat {
         is_file: metadata.is_file(),
         is_directory: metadata.is_dir(),
         size: metadata.len(),
         modified_ms,
         children: Vec::new(),
      };

      if stat.is_directory {
         let mut entries = tokio::fs::read_dir(path).await?;
         while let Some(entry) = entries.next_entry().await? {
            stat.children.push(entry.path());
         }
      }

      Ok(stat)
   }

   async fn read_to_string(&self, path: &Path) -> Result<String> {
      Ok(tokio::fs::read_to_string(path).await?)
   }
}

/// Single-root workspace used by the CLI.
#[derive(Debug, Clone, Default)]
pub struct LocalWorkspace {
   root: Option<PathBuf>,
}

impl LocalWorkspace {
   pub fn new(root: impl Into<PathBuf>) -> Self {
      Self { root: Some(root.into()) }
   }

   pub const fn empty() -> Self {
      Self { root: None }
   }
}

impl Workspace for LocalWorkspace {
   fn roots(&self) -> Vec<PathBuf> {
      self.root.clone().into_iter().collect()
   }
}
