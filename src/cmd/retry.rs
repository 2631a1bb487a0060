//! Ingestion retry command.

use std::path::PathBuf;

use console::style;

use crate::{
   Result, config,
   file::{LocalFileService, LocalWorkspace},
   sync::SyncOrchestrator,
};

/// Executes the retry command: server-side retry, then a fresh sync pass.
pub async fn execute(path: Option<PathBuf>) -> Result<()> {
   let root = super::resolve_root(path)?;
   let api = super::http_api();

   let Some(project) = super::lookup_project(&api, &root).await? else {
      println!("{}", style("Folder is not ingested; run `tether sync` first").dim());
      return Ok(());
   };

   println!(
      "{} {} {}",
      style("Retrying").bold(),
      project.folder_name,
      style(&project.project_id).dim()
   );

   let orchestrator = SyncOrchestrator::new(
      LocalWorkspace::new(root),
      LocalFileService,
      api,
      config::get().user_id.clone(),
   );

   let events = orchestrator.subscribe();
   let printer = tokio::spawn(super::sync::render_events(events, false));

   let result = orchestrator.retry_ingestion(&project.project_id).await;
   drop(orchestrator);
   let _ = printer.await;

   result
}
