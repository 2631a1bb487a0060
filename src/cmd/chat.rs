//! One-shot and streaming chat commands.

use std::{
   io::{self, Write},
   path::PathBuf,
};

use console::style;

use crate::{
   Result,
   api::types::{ChatSendRequest, Edit, StreamEvent},
   chat::{ChatGateway, ChatOutcome},
   sync::SyncEvent,
};

/// Executes the chat command against the project ingested for `path`.
pub async fn execute(
   message: String,
   path: Option<PathBuf>,
   stream: bool,
   model: Option<String>,
   session: Option<String>,
) -> Result<()> {
   let root = super::resolve_root(path)?;
   let api = super::http_api();
   let project = super::lookup_project(&api, &root).await?;

   let gateway = ChatGateway::new(api);
   // Prime availability from the server's view; the gateway refuses the
   // call if ingestion has not completed.
   gateway.handle_event(&SyncEvent::ProjectChanged { project });

   let request = ChatSendRequest {
      session_id: session,
      model,
      ..ChatSendRequest::new(message)
   };

   if stream {
      return execute_stream(&gateway, request).await;
   }

   match gateway.send_message(request).await {
      ChatOutcome::Reply(response) => {
         println!("{}", response.reply);
         print_edits(&response.edits);
         println!();
         println!("{}", style(format!("session {}", response.session_id)).dim());
         Ok(())
      },
      ChatOutcome::Failed { error } => {
         eprintln!("{} {}", style("chat failed:").red().bold(), error);
         Ok(())
      },
   }
}

async fn execute_stream(
   gateway: &ChatGateway<crate::api::HttpApi>,
   request: ChatSendRequest,
) -> Result<()> {
   let mut session_id: Option<String> = None;

   gateway
      .send_message_stream(request, &mut |event: StreamEvent| match event {
         StreamEvent::Start { session_id: started } => {
            session_id = started;
         },
         StreamEvent::Response { content } => {
            print!("{content}");
            let _ = io::stdout().flush();
         },
         StreamEvent::Complete { session_id: finished, edits, .. } => {
            println!();
            print_edits(&edits);
            if let Some(finished) = finished.or_else(|| session_id.clone()) {
               println!("{}", style(format!("session {finished}")).dim());
            }
         },
         StreamEvent::Error { error } => {
            eprintln!("{} {}", style("stream error:").red().bold(), error);
         },
      })
      .await;

   Ok(())
}

fn print_edits(edits: &[Edit]) {
   if edits.is_empty() {
      return;
   }
   println!();
   println!("{}", style("Proposed edits:").bold());
   for edit in edits {
      println!(
         "  {} {} {}",
         style(edit.edit_type.as_str()).yellow(),
         edit.file_path,
         style(match (edit.start_line, edit.end_line) {
            (Some(start), Some(end)) => format!("lines {start}-{end}"),
            _ => String::new(),
         })
         .dim()
      );
   }
}
