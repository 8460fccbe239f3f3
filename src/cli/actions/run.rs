use crate::cli::actions::{server, Action};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions. New `Action::*` variants get a
// matching `*::execute` call here.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
    }
}
