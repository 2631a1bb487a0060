//! Session deletion command.

use console::style;

use crate::{Result, chat::ChatGateway};

/// Executes the delete-session command.
pub async fn execute(session_id: String) -> Result<()> {
   let gateway = ChatGateway::new(super::http_api());
   gateway.delete_session(&session_id).await?;
   println!("{} {}", style("Deleted").green(), session_id);
   Ok(())
}
