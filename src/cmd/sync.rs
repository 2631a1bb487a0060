//! Workspace ingestion command.

use std::path::PathBuf;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;

use crate::{
   Result, config,
   file::{LocalFileService, LocalWorkspace},
   sync::{SyncEvent, SyncOrchestrator},
};

/// Executes the sync command: ingest or incrementally sync a folder.
pub async fn execute(path: Option<PathBuf>, json: bool) -> Result<()> {
   let root = super::resolve_root(path)?;
   println!("{} {}", style("Syncing").bold(), style(root.display()).dim());

   let orchestrator = SyncOrchestrator::new(
      LocalWorkspace::new(root),
      LocalFileService,
      super::http_api(),
      config::get().user_id.clone(),
   );

   let events = orchestrator.subscribe();
   let printer = tokio::spawn(render_events(events, json));

   let result = orchestrator.initialize().await;
   drop(orchestrator);
   let _ = printer.await;

   result
}

/// Renders orchestrator events: JSON lines, or a progress bar for humans.
pub(crate) async fn render_events(mut events: broadcast::Receiver<SyncEvent>, json: bool) {
   let mut bar: Option<ProgressBar> = None;

   loop {
      let event = match events.recv().await {
         Ok(event) => event,
         Err(broadcast::error::RecvError::Lagged(_)) => continue,
         Err(broadcast::error::RecvError::Closed) => break,
      };

      if json {
         if let Ok(line) = serde_json::to_string(&event) {
            println!("{line}");
         }
         continue;
      }

      match event {
         SyncEvent::ProjectChanged { project: Some(info) } => {
            println!(
               "{} {} {}",
               style("project").bold(),
               info.folder_name,
               style(format!("({}, {})", info.project_id, info.ingestion_status)).dim()
            );
         },
         SyncEvent::ProjectChanged { project: None } => {
            println!("{}", style("No workspace root; nothing to sync").dim());
         },
         SyncEvent::Progress { progress, .. } => {
            let bar = bar.get_or_insert_with(|| {
               let bar = ProgressBar::new(progress.total.max(1));
               bar.set_style(
                  ProgressStyle::with_template("{bar:40} {pos}/{len} files {msg}")
                     .unwrap_or_else(|_| ProgressStyle::default_bar()),
               );
               bar
            });
            if progress.total > 0 {
               bar.set_length(progress.total);
            }
            bar.set_position(progress.processed);
            bar.set_message(format!("({} chunks)", progress.chunks));
         },
         SyncEvent::Complete { .. } => {
            if let Some(bar) = bar.take() {
               bar.finish_and_clear();
            }
            println!("{}", style("Sync complete").green().bold());
         },
         SyncEvent::Error { error, .. } => {
            if let Some(bar) = bar.take() {
               bar.finish_and_clear();
            }
            eprintln!("{} {}", style("sync error:").red().bold(), error);
         },
      }
   }
}
