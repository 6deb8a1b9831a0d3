/// The engine options this CLI exposes, with their short abbreviations.
///
/// Only names listed here become flags, whatever else the engine offers.
/// Output-format options (HTML, parse trees) and the formatting type itself
/// are deliberately absent: text output only, and the mode is a sub-command.

/// One exposed option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhitelistEntry {
    /// Engine option name.
    pub name: &'static str,
    /// Single-letter abbreviation. Upper-cased when the flag is negated.
    pub abbrev: Option<char>,
}

const fn entry(name: &'static str, abbrev: Option<char>) -> WhitelistEntry {
    WhitelistEntry { name, abbrev }
}

pub const WHITELIST: &[WhitelistEntry] = &[
    entry("indent", Some('d')),
    entry("spacesPerTab", Some('s')),
    entry("maxLineWidth", Some('m')),
    entry("statementBreaks", Some('b')),
    entry("clauseBreaks", Some('l')),
    entry("expandCommaLists", Some('c')),
    entry("trailingCommas", Some('t')),
    entry("spaceAfterExpandedComma", None),
    entry("expandBooleanExpressions", Some('o')),
    entry("expandCaseStatements", Some('a')),
    entry("expandBetweenConditions", Some('w')),
    entry("expandInLists", Some('i')),
    entry("breakJoinOnSections", Some('j')),
    entry("uppercaseKeywords", Some('u')),
    entry("keywordStandardization", None),
    entry("randomizeKeywordCase", None),
    entry("randomizeLineLengths", None),
    entry("preserveComments", None),
    entry("enableKeywordSubstitution", None),
    entry("errorOutputPrefix", Some('p')),
];

/// Look up the whitelist entry for an engine option.
#[must_use]
pub fn lookup(whitelist: &[WhitelistEntry], name: &str) -> Option<WhitelistEntry> {
    whitelist.iter().copied().find(|e| e.name == name)
}
