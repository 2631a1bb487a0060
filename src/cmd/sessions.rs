//! Chat session listing command.

use std::path::PathBuf;

use console::style;

use crate::{Result, chat::ChatGateway};

/// Executes the sessions command for a folder's project.
pub async fn execute(path: Option<PathBuf>) -> Result<()> {
   let root = super::resolve_root(path)?;
   let api = super::http_api();

   let Some(project) = super::lookup_project(&api, &root).await? else {
      println!("{}", style("Folder is not ingested").dim());
      return Ok(());
   };

   let gateway = ChatGateway::new(api);
   let sessions = gateway.get_sessions(&project.project_id).await;

   if sessions.is_empty() {
      println!("{}", style("No sessions").dim());
      return Ok(());
   }

   for session in sessions {
      println!(
         "{} {} {}",
         style(&session.session_id).bold(),
         session.title.as_deref().unwrap_or("(untitled)"),
         style(format!("{} messages", session.message_count)).dim()
      );
   }

   Ok(())
}
