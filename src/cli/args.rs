/// Fixed CLI flags, declared via clap derive.
///
/// Per-option flags are generated at runtime from the engine registry (see
/// `surface`); these structs are merged into that generated command.
use std::path::PathBuf;

use clap::{Args, ValueEnum};

/// Encoding assumed for input and output when none is requested.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Flags accepted in every formatting mode.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Return 0 (success) exit code even if parsing failed (and so the
    /// formatted output is suspect).
    #[arg(short = 'e', long = "ignoreErrors", global = true)]
    pub ignore_errors: bool,

    /// Character encoding of the input (any WHATWG label).
    #[arg(
        long = "inputEncoding",
        value_name = "ENCODING",
        default_value = DEFAULT_ENCODING,
        global = true
    )]
    pub input_encoding: String,

    /// Character encoding of the output (any WHATWG label).
    #[arg(
        long = "outputEncoding",
        value_name = "ENCODING",
        default_value = DEFAULT_ENCODING,
        global = true
    )]
    pub output_encoding: String,

    /// Read SQL from this file instead of standard input.
    #[arg(short = 'f', long = "inputFile", value_name = "PATH", global = true)]
    pub input_file: Option<PathBuf>,

    /// Write the result to this file instead of standard output.
    #[arg(short = 'g', long = "outputFile", value_name = "PATH", global = true)]
    pub output_file: Option<PathBuf>,

    /// Start the output with a byte-order mark (UTF-8 and UTF-16 only).
    #[arg(long = "forceOutputBOM", global = true)]
    pub force_output_bom: bool,
}

/// Arguments for `sqlfmtcli options`.
#[derive(Debug, Clone, Args)]
pub struct OptionsArgs {
    /// Output format for the option listing.
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output: ListFormat,

    /// Omit table headers (useful for awk/cut processing).
    #[arg(long)]
    pub no_header: bool,
}

/// Output format variants for the option listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ListFormat {
    /// Aligned table with headers (human-readable).
    #[default]
    Table,
    /// JSON array (pretty-printed).
    Json,
    /// Compact single-line JSON.
    Compact,
    /// Long flag only, one per line.
    Name,
}
