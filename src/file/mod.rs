//! Host workspace and file-service seams.
//!
//! The sync engine never touches the disk directly; it goes through these
//! injected interfaces so the orchestrator is testable with in-memory
//! inputs and portable across host editors.

mod collect;
mod local;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use self::{
   collect::{CollectedFile, collect_files},
   local::{LocalFileService, LocalWorkspace},
};
use crate::Result;

/// Resolved metadata for a single path.
#[derive(Debug, Clone, Default)]
pub struct FileStat {
   pub is_file:      bool,
   pub is_directory: bool,
   pub size:         u64,
   /// Modification time in milliseconds since epoch, when the host exposes
   /// one.
   pub modified_ms:  Option<i64>,
   /// Direct children; populated only for directories.
   pub children:     Vec<PathBuf>,
}

/// Minimal file-service contract consumed from the host.
#[async_trait]
pub trait FileService: Send + Sync {
   async fn stat(&self, path: &Path) -> Result<FileStat>;
   async fn read_to_string(&self, path: &Path) -> Result<String>;
}

/// Workspace surface: the ordered root folders currently open. Sync adopts
/// the first root; the host re-invokes the orchestrator when this changes.
pub trait Workspace: Send + Sync {
   fn roots(&self) -> Vec<PathBuf>;
}
