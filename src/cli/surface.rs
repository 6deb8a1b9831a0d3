/// Command-line surface generated from the engine registry and the whitelist.
///
/// A fresh `clap::Command` is built per `Surface`; nothing is process-global,
/// so parsing can be exercised in-process.
use std::convert::Infallible;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Args, Command, FromArgMatches};
use tracing::warn;

use super::args::{GlobalArgs, OptionsArgs};
use super::whitelist::{WhitelistEntry, lookup};
use crate::engine::reference::find;
use crate::engine::{
    FormattingMode, OptionDefault, OptionDescriptor, OptionKind, OptionSet, OptionValue,
};
use crate::pipeline::FormatRequest;

/// Sub-command selecting obfuscation mode.
pub const OBFUSCATION_COMMAND: &str = "obfuscation";
/// Short alias for [`OBFUSCATION_COMMAND`].
pub const OBFUSCATION_ALIAS: &str = "min";
/// Sub-command listing the exposed options.
pub const OPTIONS_COMMAND: &str = "options";

const FILE_ARG: &str = "FILE";

/// What the user asked for.
#[derive(Debug, Clone)]
pub enum Invocation {
    /// Format (or obfuscate) SQL.
    Format(FormatRequest),
    /// List the exposed options.
    ListOptions(OptionsArgs),
}

/// A whitelisted engine option and its command-line shape.
#[derive(Debug, Clone, Copy)]
pub struct ExposedOption {
    pub descriptor: &'static OptionDescriptor,
    pub abbrev: Option<char>,
}

impl ExposedOption {
    /// Boolean options that default to on are exposed as `--no-<name>`.
    #[must_use]
    pub fn negated(&self) -> bool {
        self.descriptor.kind == OptionKind::Bool
            && self.descriptor.default == OptionDefault::Bool(true)
    }

    #[must_use]
    pub fn long(&self) -> String {
        if self.negated() {
            format!("no-{}", self.descriptor.name)
        } else {
            self.descriptor.name.to_owned()
        }
    }

    #[must_use]
    pub fn short(&self) -> Option<char> {
        self.abbrev.map(|c| {
            if self.negated() {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
    }

    /// Whether this option is registered once for all modes.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.descriptor.applies_to_all_modes()
    }

    fn help(&self) -> String {
        let d = self.descriptor;
        match d.kind {
            OptionKind::Bool if self.negated() => format!("{} [default: on]", d.description),
            OptionKind::Bool => d.description.to_owned(),
            _ => format!("{} [{}]", d.description, d.default),
        }
    }

    fn to_arg(self) -> Arg {
        let d = self.descriptor;
        let mut arg = Arg::new(d.name)
            .long(self.long())
            .help(self.help())
            .global(self.is_global());
        if let Some(c) = self.short() {
            arg = arg.short(c);
        }

        match d.kind {
            OptionKind::Bool => arg.action(ArgAction::SetTrue),
            OptionKind::Int => arg
                .action(ArgAction::Set)
                .value_name("N")
                .value_parser(clap::value_parser!(i64).range(0..)),
            OptionKind::Str => arg
                .action(ArgAction::Set)
                .value_name("VALUE")
                .value_parser(unescape),
            OptionKind::Enum(choices) => arg
                .action(ArgAction::Set)
                .value_name("VALUE")
                .value_parser(PossibleValuesParser::new(choices.iter().copied())),
        }
    }

    /// The user-supplied value, or `None` when the flag was not given.
    fn read(&self, matches: &ArgMatches) -> Option<OptionValue> {
        let name = self.descriptor.name;
        if matches.value_source(name) != Some(ValueSource::CommandLine) {
            return None;
        }
        match self.descriptor.kind {
            OptionKind::Bool => Some(OptionValue::Bool(!self.negated())),
            OptionKind::Int => matches.get_one::<i64>(name).copied().map(OptionValue::Int),
            OptionKind::Str | OptionKind::Enum(_) => matches
                .get_one::<String>(name)
                .cloned()
                .map(OptionValue::Str),
        }
    }
}

/// Expand `\t`, `\n`, `\r` and `\\` so whitespace options can be typed in a shell.
fn unescape(raw: &str) -> Result<String, Infallible> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Ok(out)
}

/// The generated command-line surface.
#[derive(Debug, Clone)]
pub struct Surface {
    command: Command,
    exposed: Vec<ExposedOption>,
}

impl Surface {
    /// Build the surface for every whitelisted option the engine offers.
    /// Whitelisted names the engine does not know are skipped.
    #[must_use]
    pub fn new(reference: &'static [OptionDescriptor], whitelist: &[WhitelistEntry]) -> Self {
        for entry in whitelist {
            if find(reference, entry.name).is_none() {
                warn!(option = entry.name, "whitelisted option is not offered by the engine");
            }
        }

        let exposed: Vec<ExposedOption> = reference
            .iter()
            .filter_map(|descriptor| {
                lookup(whitelist, descriptor.name).map(|entry| ExposedOption {
                    descriptor,
                    abbrev: entry.abbrev,
                })
            })
            .collect();

        let mut root = GlobalArgs::augment_args(
            Command::new(env!("CARGO_PKG_NAME"))
                .version(env!("CARGO_PKG_VERSION"))
                .about("Format T-SQL from files or standard input")
                .arg(file_arg()),
        );
        for opt in exposed.iter().filter(|o| o.is_global()) {
            root = root.arg(opt.to_arg());
        }
        root = add_mode_options(root, &exposed, FormattingMode::Standard);

        let obfuscation = add_mode_options(
            Command::new(OBFUSCATION_COMMAND)
                .visible_alias(OBFUSCATION_ALIAS)
                .about(
                    "Format your SQL to make it LESS legible instead of more. \
                     Typically used for minifying.",
                )
                .arg(file_arg()),
            &exposed,
            FormattingMode::Obfuscation,
        );

        let options = OptionsArgs::augment_args(
            Command::new(OPTIONS_COMMAND).about("List the formatting options this tool exposes"),
        );

        Self {
            command: root.subcommand(obfuscation).subcommand(options),
            exposed,
        }
    }

    /// The generated clap command (for help rendering and inspection).
    #[must_use]
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Every exposed option, in registry order.
    #[must_use]
    pub fn exposed(&self) -> &[ExposedOption] {
        &self.exposed
    }

    /// Parse raw process arguments (including the program name).
    ///
    /// # Errors
    ///
    /// Returns a clap error for unknown flags, malformed values, extra
    /// positional arguments, conflicting input paths, or standard-mode
    /// options combined with the obfuscation sub-command. Help and version
    /// requests also surface as (non-failure) clap errors.
    pub fn parse<I, T>(&self, args: I) -> Result<Invocation, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command.clone().try_get_matches_from(args)?;

        match matches.subcommand() {
            Some((OPTIONS_COMMAND, sub)) => {
                Ok(Invocation::ListOptions(OptionsArgs::from_arg_matches(sub)?))
            }
            Some((OBFUSCATION_COMMAND, sub)) => {
                if let Some(opt) = self
                    .mode_options(FormattingMode::Standard)
                    .find(|o| o.read(&matches).is_some())
                {
                    return Err(self.conflict(format!(
                        "'--{}' cannot be used with the '{OBFUSCATION_COMMAND}' command",
                        opt.long()
                    )));
                }
                let root_file = matches.get_one::<PathBuf>(FILE_ARG).cloned();
                self.request(FormattingMode::Obfuscation, sub, root_file)
            }
            _ => self.request(FormattingMode::Standard, &matches, None),
        }
    }

    fn mode_options(&self, mode: FormattingMode) -> impl Iterator<Item = &ExposedOption> {
        self.exposed
            .iter()
            .filter(move |o| !o.is_global() && o.descriptor.applies_to(mode))
    }

    fn request(
        &self,
        mode: FormattingMode,
        matches: &ArgMatches,
        outer_file: Option<PathBuf>,
    ) -> Result<Invocation, clap::Error> {
        let globals = GlobalArgs::from_arg_matches(matches)?;

        let mut options = OptionSet::new();
        for opt in self.exposed.iter().filter(|o| o.descriptor.applies_to(mode)) {
            if let Some(value) = opt.read(matches) {
                options.insert(opt.descriptor.name, value);
            }
        }

        let mut paths = [
            globals.input_file.clone(),
            matches.get_one::<PathBuf>(FILE_ARG).cloned(),
            outer_file,
        ]
        .into_iter()
        .flatten();
        let input_path = paths.next();
        if paths.next().is_some() {
            return Err(self.conflict(
                "only one input file may be given (positional FILE or --inputFile)".to_owned(),
            ));
        }

        Ok(Invocation::Format(FormatRequest {
            mode,
            options,
            input_path,
            output_path: globals.output_file,
            input_encoding: globals.input_encoding,
            output_encoding: globals.output_encoding,
            force_output_bom: globals.force_output_bom,
            ignore_errors: globals.ignore_errors,
        }))
    }

    fn conflict(&self, message: String) -> clap::Error {
        self.command
            .clone()
            .error(ErrorKind::ArgumentConflict, message)
    }
}

fn file_arg() -> Arg {
    Arg::new(FILE_ARG)
        .value_name("FILE")
        .value_parser(clap::value_parser!(PathBuf))
        .help("SQL file to read (standard input when omitted)")
}

fn add_mode_options(
    mut command: Command,
    exposed: &[ExposedOption],
    mode: FormattingMode,
) -> Command {
    for opt in exposed
        .iter()
        .filter(|o| !o.is_global() && o.descriptor.applies_to(mode))
    {
        command = command.arg(opt.to_arg());
    }
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::whitelist::WHITELIST;
    use crate::engine::OPTION_REFERENCE;

    fn surface() -> Surface {
        Surface::new(OPTION_REFERENCE, WHITELIST)
    }

    fn request(args: &[&str]) -> FormatRequest {
        let argv = std::iter::once("sqlfmtcli").chain(args.iter().copied());
        match surface().parse(argv).unwrap() {
            Invocation::Format(request) => request,
            Invocation::ListOptions(_) => panic!("expected a format invocation"),
        }
    }

    fn parse_err(args: &[&str]) -> ErrorKind {
        let argv = std::iter::once("sqlfmtcli").chain(args.iter().copied());
        surface().parse(argv).unwrap_err().kind()
    }

    #[test]
    fn test_command_is_well_formed() {
        surface().command().clone().debug_assert();
    }

    #[test]
    fn test_no_flags_sets_nothing() {
        let req = request(&[]);
        assert_eq!(req.mode, FormattingMode::Standard);
        assert!(req.options.is_empty());
        assert_eq!(req.input_encoding, "utf-8");
        assert_eq!(req.output_encoding, "utf-8");
        assert!(req.input_path.is_none());
        assert!(!req.ignore_errors);
    }

    #[test]
    fn test_default_on_booleans_are_negated() {
        for opt in surface().exposed() {
            let default_on = opt.descriptor.default == OptionDefault::Bool(true);
            assert_eq!(opt.long().starts_with("no-"), default_on, "{}", opt.long());
            if default_on {
                if let Some(c) = opt.short() {
                    assert!(c.is_ascii_uppercase());
                }
            }
        }
    }

    #[test]
    fn test_negated_flag_turns_option_off() {
        let req = request(&["--no-uppercaseKeywords"]);
        assert_eq!(
            req.options.get("uppercaseKeywords"),
            Some(&OptionValue::Bool(false))
        );
        let req = request(&["-U"]);
        assert_eq!(
            req.options.get("uppercaseKeywords"),
            Some(&OptionValue::Bool(false))
        );
        assert!(!request(&[]).options.is_set("uppercaseKeywords"));
    }

    #[test]
    fn test_plain_flag_turns_option_on() {
        let req = request(&["--trailingCommas"]);
        assert_eq!(
            req.options.get("trailingCommas"),
            Some(&OptionValue::Bool(true))
        );
        assert_eq!(request(&["-t"]).options, req.options);
    }

    #[test]
    fn test_abbreviations_match_long_forms() {
        let cases: &[(&[&str], &[&str])] = &[
            (&["-d", "  "], &["--indent", "  "]),
            (&["-s", "2"], &["--spacesPerTab", "2"]),
            (&["-m", "80"], &["--maxLineWidth", "80"]),
            (&["-b", "1"], &["--statementBreaks", "1"]),
            (&["-l", "2"], &["--clauseBreaks", "2"]),
            (&["-C"], &["--no-expandCommaLists"]),
            (&["-O"], &["--no-expandBooleanExpressions"]),
            (&["-A"], &["--no-expandCaseStatements"]),
            (&["-W"], &["--no-expandBetweenConditions"]),
            (&["-I"], &["--no-expandInLists"]),
            (&["-j"], &["--breakJoinOnSections"]),
            (&["-p", "oops"], &["--errorOutputPrefix", "oops"]),
        ];
        for (short, long) in cases {
            let a = request(short);
            let b = request(long);
            assert!(!a.options.is_empty(), "{short:?} set nothing");
            assert_eq!(a.options, b.options, "{short:?} vs {long:?}");
        }
    }

    #[test]
    fn test_values_are_typed() {
        let req = request(&["--spacesPerTab", "8", "--indent", "    "]);
        assert_eq!(req.options.get("spacesPerTab"), Some(&OptionValue::Int(8)));
        assert_eq!(
            req.options.get("indent"),
            Some(&OptionValue::Str("    ".to_owned()))
        );
    }

    #[test]
    fn test_string_values_unescape() {
        let req = request(&["-p", "--oops\\n", "-d", "\\t"]);
        assert_eq!(
            req.options.get("errorOutputPrefix"),
            Some(&OptionValue::Str("--oops\n".to_owned()))
        );
        assert_eq!(
            req.options.get("indent"),
            Some(&OptionValue::Str("\t".to_owned()))
        );
    }

    #[test]
    fn test_unescape_keeps_unknown_sequences() {
        assert_eq!(unescape("a\\qb\\").unwrap(), "a\\qb\\");
        assert_eq!(unescape("\\\\t").unwrap(), "\\t");
    }

    #[test]
    fn test_help_shows_defaults() {
        let s = surface();
        let help = |id: &str| {
            s.command()
                .get_arguments()
                .find(|a| a.get_id() == id)
                .and_then(|a| a.get_help())
                .map(ToString::to_string)
                .unwrap()
        };
        assert!(help("indent").ends_with("[\\t]"));
        assert!(help("maxLineWidth").ends_with("[999]"));
    }

    #[test]
    fn test_non_whitelisted_options_are_rejected() {
        assert_eq!(parse_err(&["--htmlColoring"]), ErrorKind::UnknownArgument);
        assert_eq!(
            parse_err(&["--formattingType", "identity"]),
            ErrorKind::UnknownArgument
        );
        assert_eq!(parse_err(&["--bogus"]), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert_eq!(parse_err(&["--spacesPerTab", "four"]), ErrorKind::ValueValidation);
        assert!(surface().parse(["sqlfmtcli", "--indent"]).is_err());
    }

    #[test]
    fn test_extra_positional_is_rejected() {
        assert!(matches!(
            parse_err(&["a.sql", "b.sql"]),
            ErrorKind::UnknownArgument | ErrorKind::InvalidSubcommand
        ));
    }

    #[test]
    fn test_positional_and_input_flag_conflict() {
        assert_eq!(
            parse_err(&["-f", "a.sql", "b.sql"]),
            ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_positional_input_path() {
        let req = request(&["query.sql"]);
        assert_eq!(req.input_path, Some(PathBuf::from("query.sql")));
        let req = request(&["--inputFile", "query.sql", "-g", "out.sql"]);
        assert_eq!(req.input_path, Some(PathBuf::from("query.sql")));
        assert_eq!(req.output_path, Some(PathBuf::from("out.sql")));
    }

    #[test]
    fn test_obfuscation_command_and_alias() {
        for name in [OBFUSCATION_COMMAND, OBFUSCATION_ALIAS] {
            let req = request(&[name, "--randomizeKeywordCase", "--no-preserveComments"]);
            assert_eq!(req.mode, FormattingMode::Obfuscation);
            assert_eq!(
                req.options.get("randomizeKeywordCase"),
                Some(&OptionValue::Bool(true))
            );
            assert_eq!(
                req.options.get("preserveComments"),
                Some(&OptionValue::Bool(false))
            );
        }
    }

    #[test]
    fn test_obfuscation_takes_positional_file() {
        let req = request(&["min", "query.sql"]);
        assert_eq!(req.input_path, Some(PathBuf::from("query.sql")));
    }

    #[test]
    fn test_modes_do_not_share_options() {
        assert_eq!(
            parse_err(&["--randomizeKeywordCase"]),
            ErrorKind::UnknownArgument
        );
        assert_eq!(
            parse_err(&["min", "--indent", "  "]),
            ErrorKind::UnknownArgument
        );
        assert_eq!(
            parse_err(&["--indent", "  ", "min"]),
            ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_global_flags_work_in_both_modes() {
        let req = request(&["min", "-e", "-p", "oops", "--outputEncoding", "utf-16le"]);
        assert!(req.ignore_errors);
        assert_eq!(req.output_encoding, "utf-16le");
        assert_eq!(
            req.options.get("errorOutputPrefix"),
            Some(&OptionValue::Str("oops".to_owned()))
        );

        let req = request(&["--ignoreErrors", "--forceOutputBOM"]);
        assert!(req.ignore_errors);
        assert!(req.force_output_bom);
    }

    #[test]
    fn test_options_command() {
        let argv = ["sqlfmtcli", "options", "--output", "json", "--no-header"];
        match surface().parse(argv).unwrap() {
            Invocation::ListOptions(args) => {
                assert_eq!(args.output, crate::cli::args::ListFormat::Json);
                assert!(args.no_header);
            }
            Invocation::Format(_) => panic!("expected the options listing"),
        }
    }

    #[test]
    fn test_whitelist_entries_unknown_to_engine_are_skipped() {
        let whitelist = [
            WhitelistEntry {
                name: "indent",
                abbrev: Some('d'),
            },
            WhitelistEntry {
                name: "notAnOption",
                abbrev: Some('z'),
            },
        ];
        let s = Surface::new(OPTION_REFERENCE, &whitelist);
        assert_eq!(s.exposed().len(), 1);
        assert_eq!(s.exposed()[0].descriptor.name, "indent");
    }

    #[test]
    fn test_help_is_not_a_failure() {
        assert_eq!(parse_err(&["--help"]), ErrorKind::DisplayHelp);
        assert_eq!(parse_err(&["--version"]), ErrorKind::DisplayVersion);
    }
}
