use quotecraft_agent::build_quote_service;
use quotecraft_core::config::{AppConfig, LoadOptions};
use quotecraft_core::{failure_banner, GenerationController, QuoteData, RequestOutcome};
use serde_json::json;

use crate::commands::CommandResult;

const COMMAND: &str = "generate";
const NOTHING_TO_GENERATE: &str = "Nothing to generate: provide at least one keyword";

pub fn run(keywords: &str, json_output: bool) -> CommandResult {
    run_with_options(LoadOptions::default(), keywords, json_output)
}

/// One request through the generation controller, start to settlement.
///
/// Exit codes: 0 quotes generated, 2 configuration, 3 runtime, 4 generation
/// failed, 5 nothing to generate.
pub fn run_with_options(options: LoadOptions, keywords: &str, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let service = match build_quote_service(&config.llm) {
        Ok(service) => service,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let controller = GenerationController::new(service).with_actor("cli");
    controller.set_keywords(keywords);
    let outcome = runtime.block_on(controller.request_generation());

    match outcome {
        RequestOutcome::Succeeded { .. } => {
            let state = controller.state();
            let quotes = state.quotes().cloned().unwrap_or_default();
            if json_output {
                CommandResult::success_with_data(
                    COMMAND,
                    format!("generated {} quote(s)", quotes.len()),
                    Some(json!({ "keywords": state.keywords().trimmed(), "quotes": quotes })),
                )
            } else {
                CommandResult::plain(0, render_quotes(&quotes))
            }
        }
        RequestOutcome::Failed { message } => failed(message, json_output),
        RequestOutcome::Rejected { reason } => {
            if json_output {
                CommandResult::failure(COMMAND, reason.as_str(), NOTHING_TO_GENERATE, 5)
            } else {
                CommandResult::plain(5, NOTHING_TO_GENERATE)
            }
        }
    }
}

fn failed(message: String, json_output: bool) -> CommandResult {
    if json_output {
        CommandResult::failure(COMMAND, "generation_failed", message, 4)
    } else {
        CommandResult::plain(4, failure_banner(&message))
    }
}

fn render_quotes(quotes: &QuoteData) -> String {
    quotes
        .entries()
        .iter()
        .map(|entry| match &entry.author {
            Some(author) => format!("\"{}\"\n    - {author}", entry.text),
            None => format!("\"{}\"", entry.text),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
