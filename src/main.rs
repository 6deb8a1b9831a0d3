#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! sqlfmtcli: format or obfuscate T-SQL from files or standard input.

mod cli;
mod engine;
mod pipeline;
mod telemetry;
mod types;

use cli::{Invocation, Surface, WHITELIST, write_error, write_options};
use engine::{FormatEngine, SqlEngine};
use types::OptionInfoOutput;

fn main() {
    telemetry::init_tracing("warn");

    let engine = SqlEngine::new();
    let surface = Surface::new(engine.option_reference(), WHITELIST);

    let invocation = match surface.parse(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(err) => err.exit(),
    };

    match invocation {
        Invocation::ListOptions(args) => {
            let listing: Vec<OptionInfoOutput> =
                surface.exposed().iter().map(OptionInfoOutput::from).collect();
            write_options(&listing, args.output, args.no_header);
        }
        Invocation::Format(request) => {
            tracing::debug!(
                mode = %request.mode,
                options = request.options.iter().count(),
                "formatting"
            );
            let result = pipeline::run(
                &request,
                &engine,
                std::io::stdin().lock(),
                std::io::stdout().lock(),
            );
            if let Some(message) = &result.error_message {
                write_error(message);
            }
            std::process::exit(result.exit_code);
        }
    }
}
