//! Ingestion status command.

use std::path::PathBuf;

use console::style;

use crate::{
   Result,
   api::{IngestApi, types::IngestionStatus},
};

/// Executes the status command for a folder.
pub async fn execute(path: Option<PathBuf>, json: bool) -> Result<()> {
   let root = super::resolve_root(path)?;
   let api = super::http_api();

   let Some(project) = super::lookup_project(&api, &root).await? else {
      if json {
         println!("null");
      } else {
         println!("{}", style("Folder is not ingested").dim());
      }
      return Ok(());
   };

   // Refresh counters; the check response can lag behind the ingest queue.
   let project = api
      .project_status(&project.project_id)
      .await
      .map(|r| r.project)
      .unwrap_or(project);

   if json {
      println!("{}", serde_json::to_string_pretty(&project)?);
      return Ok(());
   }

   let dot = match project.ingestion_status {
      IngestionStatus::Completed => style("●").green(),
      IngestionStatus::Processing | IngestionStatus::Pending => style("●").yellow(),
      IngestionStatus::Failed => style("●").red(),
   };
   println!("{} {} {}", dot, project.folder_name, style(&project.project_id).dim());
   println!(
      "  {} {}/{} files, {} chunks",
      project.ingestion_status,
      project.processed_files,
      project.total_files,
      project.total_chunks
   );
   if let Some(error) = &project.error {
      println!("  {} {}", style("error:").red(), error);
   }

   Ok(())
}
