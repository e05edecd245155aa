//! Chat command handler.

#![allow(clippy::print_stdout)]

use heritage_kg::config::HeritageConfig;
use heritage_kg::services::voice::ScriptedResponder;

/// Chat command.
///
/// Answers from the scripted rules only; no store is opened.
pub fn cmd_chat(config: &HeritageConfig, message: &str) -> anyhow::Result<()> {
    let message = message.trim();
    if message.is_empty() {
        anyhow::bail!("message must not be empty");
    }

    let responder = ScriptedResponder::new(config.chat.clone());
    tracing::debug!(rules = responder.rule_count(), "Loaded response rules");
    println!("{}", responder.respond(message));
    Ok(())
}
