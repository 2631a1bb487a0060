//! Session history command.

use console::style;

use crate::{Result, chat::ChatGateway};

/// Executes the history command for a session.
pub async fn execute(session_id: String) -> Result<()> {
   let gateway = ChatGateway::new(super::http_api());
   let messages = gateway.get_session_history(&session_id).await;

   if messages.is_empty() {
      println!("{}", style("No messages").dim());
      return Ok(());
   }

   for message in messages {
      let role = match message.role.as_str() {
         "user" => style(&message.role).bold().cyan(),
         _ => style(&message.role).bold().green(),
      };
      println!("{role}: {}", message.content);
   }

   Ok(())
}
