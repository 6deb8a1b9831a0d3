/// Execution pipeline: resolve I/O, format once, map the outcome to an exit
/// code and to output.
pub mod errors;
pub mod resolution;

use std::io::{Read, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::engine::{DEFAULT_ERROR_PREFIX, FormatEngine, FormattingMode, OptionSet, OptionValue};
use crate::telemetry::StageTimer;

pub use errors::{CliError, EXIT_FORMAT_ERROR, EXIT_SUCCESS};
pub use resolution::{Destination, IoResolution};

/// Message sent to stderr when parse trouble is not ignored.
pub const PARSE_ERROR_WARNING: &str =
    "Parsing errors found. Result may be unsafely / unexpectedly modified.";

/// A fully parsed formatting invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRequest {
    pub mode: FormattingMode,
    /// Only the options the user set.
    pub options: OptionSet,
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub input_encoding: String,
    pub output_encoding: String,
    pub force_output_bom: bool,
    pub ignore_errors: bool,
}

/// What one invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub exit_code: i32,
    /// Text handed to the destination (banner included); empty when the
    /// invocation failed before formatting.
    pub formatted_text: String,
    /// The engine reported parse trouble, or the invocation failed outright.
    pub error_occurred: bool,
    /// Message for stderr, if any.
    pub error_message: Option<String>,
}

impl InvocationResult {
    fn failed(err: &CliError) -> Self {
        Self {
            exit_code: err.exit_code(),
            formatted_text: String::new(),
            error_occurred: true,
            error_message: Some(err.to_string()),
        }
    }
}

/// Run one invocation: at most one read, one engine call and one write.
pub fn run<E, R, W>(request: &FormatRequest, engine: &E, stdin: R, stdout: W) -> InvocationResult
where
    E: FormatEngine + ?Sized,
    R: Read,
    W: Write,
{
    match execute(request, engine, stdin, stdout) {
        Ok(result) => result,
        Err(err) => {
            debug!(error = %err, "invocation failed");
            InvocationResult::failed(&err)
        }
    }
}

fn execute<E, R, W>(
    request: &FormatRequest,
    engine: &E,
    stdin: R,
    stdout: W,
) -> Result<InvocationResult, CliError>
where
    E: FormatEngine + ?Sized,
    R: Read,
    W: Write,
{
    let io = IoResolution::from_request(request)?;

    let t_read = StageTimer::start("read_input");
    let input = io.read_input(stdin)?;
    drop(t_read);

    let t_format = StageTimer::start("format");
    let outcome = engine.format_sql(&input, request.mode, &request.options)?;
    drop(t_format);

    let unsuppressed = outcome.error_found && !request.ignore_errors;
    let mut text = outcome.text;
    if unsuppressed {
        let prefix = match request
            .options
            .effective(engine.option_reference(), "errorOutputPrefix")
        {
            Some(OptionValue::Str(prefix)) => prefix,
            _ => DEFAULT_ERROR_PREFIX.to_owned(),
        };
        text.insert_str(0, &prefix);
    }

    let error_message = match (&io.destination, unsuppressed) {
        (_, false) => {
            let _t = StageTimer::start("write_output");
            io.write_output(&text, stdout)?;
            None
        }
        (Destination::Stdout, true) => {
            io.write_output(&text, stdout)?;
            Some(PARSE_ERROR_WARNING.to_owned())
        }
        (Destination::File(path), true) => Some(format!(
            "{PARSE_ERROR_WARNING} Output file '{}' was not written.",
            path.display()
        )),
    };

    Ok(InvocationResult {
        exit_code: if unsuppressed {
            EXIT_FORMAT_ERROR
        } else {
            EXIT_SUCCESS
        },
        formatted_text: text,
        error_occurred: outcome.error_found,
        error_message,
    })
}
