/// Output for the `options` listing and for stderr messages.
use std::io::Write;

use comfy_table::{Cell, Table, presets::UTF8_BORDERS_ONLY};
use serde::Serialize;

use super::args::ListFormat;
use crate::engine::OptionValue;
use crate::types::OptionInfoOutput;

/// Write the option listing to stdout.
pub fn write_options(options: &[OptionInfoOutput], format: ListFormat, no_header: bool) {
    match format {
        ListFormat::Json => print_json(options),
        ListFormat::Compact => print_compact_json(options),
        ListFormat::Name => {
            for opt in options {
                println!("{}", opt.flag);
            }
        }
        ListFormat::Table => println!("{}", options_table(options, no_header)),
    }
}

fn options_table(options: &[OptionInfoOutput], no_header: bool) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    if !no_header {
        table.set_header(["FLAG", "SHORT", "TYPE", "DEFAULT", "MODES"]);
    }
    for opt in options {
        let modes: Vec<&str> = opt.modes.iter().map(|m| m.as_str()).collect();
        table.add_row([
            Cell::new(&opt.flag),
            Cell::new(opt.short.as_deref().unwrap_or("")),
            Cell::new(opt.kind),
            Cell::new(display_default(&opt.default)),
            Cell::new(modes.join(",")),
        ]);
    }
    table
}

/// Render a default so whitespace and newlines stay visible in a table cell.
fn display_default(value: &OptionValue) -> String {
    match value {
        OptionValue::Bool(b) => if *b { "on" } else { "off" }.to_owned(),
        OptionValue::Int(n) => n.to_string(),
        OptionValue::Str(s) => format!("\"{}\"", s.escape_debug()),
    }
}

/// Write a message line to stderr.
pub fn write_error(message: &str) {
    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    let _ = writeln!(out, "{message}");
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("JSON serialization error: {e}"),
    }
}

fn print_compact_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("JSON serialization error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FormattingMode;

    fn sample() -> OptionInfoOutput {
        OptionInfoOutput {
            name: "indent".to_owned(),
            flag: "--indent".to_owned(),
            short: Some("-d".to_owned()),
            kind: "string",
            default: OptionValue::Str("\t".to_owned()),
            modes: vec![FormattingMode::Standard],
            description: "The unit of indentation".to_owned(),
        }
    }

    #[test]
    fn test_display_default() {
        assert_eq!(display_default(&OptionValue::Bool(true)), "on");
        assert_eq!(display_default(&OptionValue::Int(4)), "4");
        assert_eq!(display_default(&OptionValue::Str("\t".to_owned())), "\"\\t\"");
    }

    #[test]
    fn test_table_header_toggle() {
        let with = options_table(&[sample()], false).to_string();
        let without = options_table(&[sample()], true).to_string();
        assert!(with.contains("FLAG"));
        assert!(!without.contains("FLAG"));
        assert!(without.contains("--indent"));
        assert!(without.contains("standard"));
    }
}
