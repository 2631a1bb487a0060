//! Model listing command.

use console::style;

use crate::{
   Result,
   api::{ChatApi, types::default_models},
};

/// Executes the models command, falling back to the offline table when the
/// endpoint is unreachable.
pub async fn execute() -> Result<()> {
   let api = super::http_api();

   let models = match api.models().await {
      Ok(response) => response.models,
      Err(e) => {
         tracing::warn!("models endpoint unreachable: {}", e);
         println!("{}", style("(offline defaults)").dim());
         default_models()
      },
   };

   for model in models {
      let marker = if model.is_default { style("*").green() } else { style(" ").dim() };
      println!("{} {} {} {}", marker, style(&model.id).bold(), model.name, style(&model.vendor).dim());
   }

   Ok(())
}
