/// Formatting engine: the option registry, the `FormatEngine` seam, and the
/// shipped token-driven implementation.
pub mod errors;
pub mod keywords;
pub mod lexer;
pub mod obfuscate;
pub mod reference;
pub mod standard;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

pub use errors::EngineError;
pub use reference::{
    DEFAULT_ERROR_PREFIX, FormattingMode, OPTION_REFERENCE, OptionDefault, OptionDescriptor,
    OptionKind, OptionSet, OptionValue,
};

/// Result of one formatting call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOutcome {
    /// Best-effort formatted text, always ending in a single newline.
    pub text: String,
    /// The input could not be fully parsed; `text` may be unsafely modified.
    pub error_found: bool,
}

/// A SQL formatting engine as seen by the CLI.
pub trait FormatEngine {
    /// Every option the engine understands.
    fn option_reference(&self) -> &'static [OptionDescriptor];

    /// Format `input` once. Options absent from `options` take the engine's
    /// own defaults.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` when `options` holds an unknown, inapplicable or
    /// malformed option. Parse trouble in `input` is not an error; it is
    /// reported through [`FormatOutcome::error_found`].
    fn format_sql(
        &self,
        input: &str,
        mode: FormattingMode,
        options: &OptionSet,
    ) -> Result<FormatOutcome, EngineError>;
}

/// Engine with a token-driven layout pass for standard mode and a
/// token-level minifier for obfuscation.
#[derive(Debug, Clone, Default)]
pub struct SqlEngine {
    seed: Option<u64>,
}

impl SqlEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose obfuscation randomness is reproducible.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl FormatEngine for SqlEngine {
    fn option_reference(&self) -> &'static [OptionDescriptor] {
        OPTION_REFERENCE
    }

    fn format_sql(
        &self,
        input: &str,
        mode: FormattingMode,
        options: &OptionSet,
    ) -> Result<FormatOutcome, EngineError> {
        validate(OPTION_REFERENCE, options, mode)?;

        let tokens = lexer::tokenize(input);
        let error_found = lexer::has_parse_trouble(&tokens);

        let text = match options.get("formattingType") {
            Some(OptionValue::Str(t)) if t == "identity" => input.to_owned(),
            _ => match mode {
                FormattingMode::Standard => standard::format(&tokens, options)?,
                FormattingMode::Obfuscation => {
                    obfuscate::format(&tokens, options, &mut self.rng())
                }
            },
        };

        debug!(
            %mode,
            input_len = input.len(),
            tokens = tokens.len(),
            error_found,
            "formatted input"
        );

        Ok(FormatOutcome {
            text: finish_line(&text),
            error_found,
        })
    }
}

/// Replace trailing line breaks with exactly one. Other trailing whitespace
/// is kept (`IF ` without a condition).
fn finish_line(text: &str) -> String {
    let mut out = text.trim_end_matches(['\n', '\r']).to_owned();
    out.push('\n');
    out
}

/// Check every supplied option against the registry for `mode`.
///
/// # Errors
///
/// Returns the first problem found, in option-name order.
pub fn validate(
    reference: &'static [OptionDescriptor],
    options: &OptionSet,
    mode: FormattingMode,
) -> Result<(), EngineError> {
    for (name, value) in options.iter() {
        let descriptor =
            reference::find(reference, name).ok_or_else(|| EngineError::UnknownOption {
                name: name.to_owned(),
            })?;

        if !descriptor.applies_to(mode) {
            return Err(EngineError::NotApplicable {
                name: name.to_owned(),
                mode,
            });
        }

        match (descriptor.kind, value) {
            (OptionKind::Bool, OptionValue::Bool(_)) | (OptionKind::Str, OptionValue::Str(_)) => {}
            (OptionKind::Int, OptionValue::Int(n)) => {
                if *n < 0 {
                    return Err(EngineError::InvalidValue {
                        name: name.to_owned(),
                        value: n.to_string(),
                        reason: "must not be negative".to_owned(),
                    });
                }
            }
            (OptionKind::Enum(choices), OptionValue::Str(s)) => {
                if !choices.contains(&s.as_str()) {
                    return Err(EngineError::InvalidValue {
                        name: name.to_owned(),
                        value: s.clone(),
                        reason: format!("expected one of {}", choices.join(", ")),
                    });
                }
                if name == "formattingType" && s != "identity" && s != mode.as_str() {
                    return Err(EngineError::InvalidValue {
                        name: name.to_owned(),
                        value: s.clone(),
                        reason: format!("conflicts with {mode} formatting"),
                    });
                }
            }
            (kind, value) => {
                return Err(EngineError::TypeMismatch {
                    name: name.to_owned(),
                    expected: kind.as_str(),
                    found: value.kind_name(),
                });
            }
        }
    }
    Ok(())
}

/// Effective boolean value of `name` (user value or registry default).
pub(crate) fn flag(options: &OptionSet, name: &str) -> bool {
    matches!(
        options.effective(OPTION_REFERENCE, name),
        Some(OptionValue::Bool(true))
    )
}

/// Effective integer value of `name`.
pub(crate) fn int(options: &OptionSet, name: &str) -> i64 {
    match options.effective(OPTION_REFERENCE, name) {
        Some(OptionValue::Int(n)) => n,
        _ => 0,
    }
}

/// Effective string value of `name`.
pub(crate) fn string(options: &OptionSet, name: &str) -> String {
    match options.effective(OPTION_REFERENCE, name) {
        Some(OptionValue::Str(s)) => s,
        _ => String::new(),
    }
}
