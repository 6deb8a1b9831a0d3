/// Option registry published by the formatting engine.
///
/// Every option the engine understands is described here once: its value
/// type, default, which formatting modes it applies to, and a description.
/// The CLI looks descriptors up by name and never duplicates this metadata.
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Which rule set the engine applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormattingMode {
    /// Legibility-oriented layout.
    #[default]
    Standard,
    /// Minifying / obfuscating output.
    Obfuscation,
}

impl FormattingMode {
    /// All modes, in declaration order.
    pub const ALL: &'static [Self] = &[Self::Standard, Self::Obfuscation];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Obfuscation => "obfuscation",
        }
    }
}

impl fmt::Display for FormattingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Int,
    Str,
    /// String restricted to a fixed set of choices.
    Enum(&'static [&'static str]),
}

impl OptionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Str => "string",
            Self::Enum(_) => "enum",
        }
    }
}

/// Default value of an option; always matches the option's [`OptionKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionDefault {
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

impl OptionDefault {
    #[must_use]
    pub fn to_value(self) -> OptionValue {
        match self {
            Self::Bool(b) => OptionValue::Bool(b),
            Self::Int(n) => OptionValue::Int(n),
            Self::Str(s) => OptionValue::Str(s.to_owned()),
        }
    }
}

impl fmt::Display for OptionDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{}", s.escape_debug()),
        }
    }
}

/// One entry of the engine's option registry.
#[derive(Debug, Clone, Copy)]
pub struct OptionDescriptor {
    /// Unique key, also used verbatim as the long flag name.
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: OptionDefault,
    pub description: &'static str,
    /// Modes in which this option has any meaning.
    pub modes: &'static [FormattingMode],
}

const STANDARD: &[FormattingMode] = &[FormattingMode::Standard];
const OBFUSCATION: &[FormattingMode] = &[FormattingMode::Obfuscation];
const ALL_MODES: &[FormattingMode] = FormattingMode::ALL;

impl OptionDescriptor {
    const fn flag(
        name: &'static str,
        default: bool,
        modes: &'static [FormattingMode],
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: OptionKind::Bool,
            default: OptionDefault::Bool(default),
            description,
            modes,
        }
    }

    const fn int(
        name: &'static str,
        default: i64,
        modes: &'static [FormattingMode],
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: OptionKind::Int,
            default: OptionDefault::Int(default),
            description,
            modes,
        }
    }

    const fn string(
        name: &'static str,
        default: &'static str,
        modes: &'static [FormattingMode],
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: OptionKind::Str,
            default: OptionDefault::Str(default),
            description,
            modes,
        }
    }

    const fn choice(
        name: &'static str,
        choices: &'static [&'static str],
        default: &'static str,
        modes: &'static [FormattingMode],
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: OptionKind::Enum(choices),
            default: OptionDefault::Str(default),
            description,
            modes,
        }
    }

    /// Whether this option has any meaning in `mode`.
    #[must_use]
    pub fn applies_to(&self, mode: FormattingMode) -> bool {
        self.modes.contains(&mode)
    }

    /// Whether this option applies to every formatting mode.
    #[must_use]
    pub fn applies_to_all_modes(&self) -> bool {
        FormattingMode::ALL.iter().all(|m| self.applies_to(*m))
    }
}

/// Banner prepended to output when parsing trouble is reported.
pub const DEFAULT_ERROR_PREFIX: &str = "--WARNING! ERRORS ENCOUNTERED DURING SQL PARSING!\n";

/// The full registry, in presentation order.
pub const OPTION_REFERENCE: &[OptionDescriptor] = &[
    OptionDescriptor::choice(
        "formattingType",
        &["standard", "obfuscation", "identity"],
        "standard",
        ALL_MODES,
        "Which rule set to apply to the input",
    ),
    OptionDescriptor::string(
        "indent",
        "\t",
        STANDARD,
        "The unit of indentation - typically a tab (\\t) or a number of spaces",
    ),
    OptionDescriptor::int(
        "spacesPerTab",
        4,
        STANDARD,
        "The number of spaces a tab represents when computing line widths",
    ),
    OptionDescriptor::int(
        "maxLineWidth",
        999,
        STANDARD,
        "Request that the formatter wrap long lines to avoid exceeding this line length",
    ),
    OptionDescriptor::int(
        "statementBreaks",
        2,
        STANDARD,
        "The number of line breaks between statements",
    ),
    OptionDescriptor::int(
        "clauseBreaks",
        1,
        STANDARD,
        "The number of line breaks between clauses within a statement",
    ),
    OptionDescriptor::flag(
        "expandCommaLists",
        true,
        STANDARD,
        "Expand comma-delimited lists (columns, group by args, etc) onto new lines",
    ),
    OptionDescriptor::flag(
        "trailingCommas",
        false,
        STANDARD,
        "When starting a new line because of a comma, keep the comma on the previous line",
    ),
    OptionDescriptor::flag(
        "spaceAfterExpandedComma",
        false,
        STANDARD,
        "Add a space after the comma when a comma list is expanded",
    ),
    OptionDescriptor::flag(
        "expandBooleanExpressions",
        true,
        STANDARD,
        "Expand boolean expressions onto new lines",
    ),
    OptionDescriptor::flag(
        "expandCaseStatements",
        true,
        STANDARD,
        "Expand CASE expressions onto new lines",
    ),
    OptionDescriptor::flag(
        "expandBetweenConditions",
        true,
        STANDARD,
        "Expand BETWEEN conditions onto new lines",
    ),
    OptionDescriptor::flag(
        "expandInLists",
        true,
        STANDARD,
        "Expand IN lists onto new lines",
    ),
    OptionDescriptor::flag(
        "breakJoinOnSections",
        false,
        STANDARD,
        "Place the ON section of a JOIN clause on its own line",
    ),
    OptionDescriptor::flag(
        "uppercaseKeywords",
        true,
        STANDARD,
        "Output keywords in upper case",
    ),
    OptionDescriptor::flag(
        "keywordStandardization",
        false,
        STANDARD,
        "Replace short keyword forms (PROC, TRAN, EXEC) with their full forms",
    ),
    OptionDescriptor::flag(
        "htmlColoring",
        false,
        STANDARD,
        "Emit HTML with syntax coloring instead of plain text",
    ),
    OptionDescriptor::flag(
        "randomizeKeywordCase",
        false,
        OBFUSCATION,
        "Randomize the case of every keyword character",
    ),
    OptionDescriptor::flag(
        "randomizeLineLengths",
        false,
        OBFUSCATION,
        "Break the output into lines of random length",
    ),
    OptionDescriptor::flag(
        "preserveComments",
        true,
        OBFUSCATION,
        "Keep comments in the output",
    ),
    OptionDescriptor::flag(
        "enableKeywordSubstitution",
        false,
        OBFUSCATION,
        "Swap keywords for equivalent alternate forms (PROCEDURE -> PROC, etc)",
    ),
    OptionDescriptor::string(
        "errorOutputPrefix",
        DEFAULT_ERROR_PREFIX,
        ALL_MODES,
        "Text to place before the output when parsing errors are found",
    ),
];

/// Look up a descriptor by name.
#[must_use]
pub fn find(
    reference: &'static [OptionDescriptor],
    name: &str,
) -> Option<&'static OptionDescriptor> {
    reference.iter().find(|d| d.name == name)
}

/// A concrete option value supplied by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl OptionValue {
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "string",
        }
    }
}

/// Options the user explicitly set, keyed by registry name.
///
/// Unset options are absent: the engine applies its own defaults for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    values: BTreeMap<&'static str, OptionValue>,
}

impl OptionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, value: OptionValue) {
        self.values.insert(name, value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The user's value for `name`, or the registry default when unset.
    #[must_use]
    pub fn effective(
        &self,
        reference: &'static [OptionDescriptor],
        name: &str,
    ) -> Option<OptionValue> {
        self.get(name)
            .cloned()
            .or_else(|| find(reference, name).map(|d| d.default.to_value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        for d in OPTION_REFERENCE {
            assert!(seen.insert(d.name), "duplicate option {}", d.name);
        }
    }

    #[test]
    fn test_defaults_match_kinds() {
        for d in OPTION_REFERENCE {
            let ok = match (d.kind, d.default) {
                (OptionKind::Bool, OptionDefault::Bool(_))
                | (OptionKind::Int, OptionDefault::Int(_))
                | (OptionKind::Str, OptionDefault::Str(_)) => true,
                (OptionKind::Enum(choices), OptionDefault::Str(s)) => choices.contains(&s),
                _ => false,
            };
            assert!(ok, "default of {} does not match its kind", d.name);
        }
    }

    #[test]
    fn test_every_option_applies_somewhere() {
        assert!(OPTION_REFERENCE.iter().all(|d| !d.modes.is_empty()));
    }

    #[test]
    fn test_effective_falls_back_to_default() {
        let mut set = OptionSet::new();
        assert_eq!(
            set.effective(OPTION_REFERENCE, "spacesPerTab"),
            Some(OptionValue::Int(4))
        );
        set.insert("spacesPerTab", OptionValue::Int(8));
        assert_eq!(
            set.effective(OPTION_REFERENCE, "spacesPerTab"),
            Some(OptionValue::Int(8))
        );
        assert_eq!(set.effective(OPTION_REFERENCE, "noSuchOption"), None);
    }

    #[test]
    fn test_error_prefix_applies_to_all_modes() {
        let d = find(OPTION_REFERENCE, "errorOutputPrefix").unwrap();
        assert!(d.applies_to_all_modes());
        let d = find(OPTION_REFERENCE, "indent").unwrap();
        assert!(!d.applies_to_all_modes());
    }
}
