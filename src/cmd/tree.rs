//! Merkle tree inspection command.

use std::path::{Path, PathBuf};

use console::style;

use crate::{
   Result, config,
   file::{FileService, LocalFileService, LocalWorkspace, collect_files},
   merkle::{FileInput, MerkleNode, TreeBuilder, diff},
   sync::SyncOrchestrator,
};

/// Executes the tree command: local root hash, optionally compared with or
/// pushed over the server's stored tree.
pub async fn execute(path: Option<PathBuf>, pull: bool, push: bool) -> Result<()> {
   let root = super::resolve_root(path)?;
   let local = build_local_tree(&root).await?;

   println!(
      "{} {} {}",
      style("local").bold(),
      local.hash,
      style(format!("({} files)", local.file_count())).dim()
   );

   if !pull && !push {
      return Ok(());
   }

   let api = super::http_api();
   let Some(project) = super::lookup_project(&api, &root).await? else {
      println!("{}", style("Folder is not ingested; no server tree").dim());
      return Ok(());
   };

   let orchestrator = SyncOrchestrator::new(
      LocalWorkspace::new(root),
      LocalFileService,
      api,
      config::get().user_id.clone(),
   );

   if push {
      orchestrator.update_merkle_tree(&project.project_id, local).await?;
      println!("{}", style("Pushed local tree to server").green());
      return Ok(());
   }

   let remote = orchestrator.get_merkle_tree(&project.project_id).await?;
   println!("{} {}", style("remote").bold(), remote.hash);

   if remote.hash == local.hash {
      println!("{}", style("Trees match").green());
   } else {
      let diff = diff::compare(Some(&remote), &local);
      println!(
         "{} +{} ~{} -{}",
         style("Trees differ:").yellow(),
         diff.summary.added,
         diff.summary.modified,
         diff.summary.deleted
      );
   }

   Ok(())
}

async fn build_local_tree(root: &Path) -> Result<MerkleNode> {
   let fs = LocalFileService;
   let collected = collect_files(&fs, root).await?;
   let mut inputs = Vec::with_capacity(collected.len());

   for file in &collected {
      let content = match fs.read_to_string(&file.abs_path).await {
         Ok(content) => content,
         Err(e) => {
            tracing::warn!("failed to read {}: {}", file.abs_path.display(), e);
            continue;
         },
      };
      inputs.push(FileInput {
         path: file.rel_path.clone(),
         content,
         size: Some(file.size),
         last_modified: file.modified_ms,
      });
   }

   Ok(TreeBuilder::new().build(&inputs))
}
