/// Obfuscation (minifying) formatting.
///
/// Works on the token stream directly: whitespace collapses, comments go
/// unless asked to stay, and keywords can be case-scrambled or swapped for
/// alternate forms. Line breaks only ever replace whitespace that was already
/// there, so no two tokens are fused into one.
use std::borrow::Cow;

use rand::Rng;

use super::keywords::{alternate_form, is_keyword, match_case};
use super::lexer::{Token, TokenKind};
use super::{OptionSet, flag};

const MIN_LINE_LENGTH: usize = 10;
const MAX_LINE_LENGTH: usize = 80;

/// Minify the tokenized input.
pub fn format<R: Rng>(tokens: &[Token<'_>], options: &OptionSet, rng: &mut R) -> String {
    let preserve_comments = flag(options, "preserveComments");
    let randomize_case = flag(options, "randomizeKeywordCase");
    let randomize_lines = flag(options, "randomizeLineLengths");
    let substitute = flag(options, "enableKeywordSubstitution");

    let mut out = String::new();
    let mut line_len = 0usize;
    let mut line_target = rng.gen_range(MIN_LINE_LENGTH..=MAX_LINE_LENGTH);
    let mut gap = false;
    let mut after_line_comment = false;
    let mut prev: Option<TokenKind> = None;

    for token in tokens {
        if token.kind == TokenKind::Whitespace || (token.is_comment() && !preserve_comments) {
            gap = true;
            continue;
        }

        if after_line_comment {
            out.push('\n');
            line_len = 0;
        } else if let (true, Some(prev)) = (gap, prev) {
            if randomize_lines && line_len >= line_target {
                out.push('\n');
                line_len = 0;
                line_target = rng.gen_range(MIN_LINE_LENGTH..=MAX_LINE_LENGTH);
            } else if needs_space(prev, token.kind) {
                out.push(' ');
                line_len += 1;
            }
        }

        let text = render(token, substitute, randomize_case, rng);
        line_len += text.chars().count();
        out.push_str(&text);

        after_line_comment = token.kind == TokenKind::LineComment;
        gap = false;
        prev = Some(token.kind);
    }

    out
}

fn render<'a, R: Rng>(
    token: &Token<'a>,
    substitute: bool,
    randomize_case: bool,
    rng: &mut R,
) -> Cow<'a, str> {
    if token.kind != TokenKind::Word {
        return Cow::Borrowed(token.text);
    }

    let mut word = Cow::Borrowed(token.text);
    if substitute {
        if let Some(alt) = alternate_form(token.text) {
            word = Cow::Owned(match_case(token.text, alt));
        }
    }
    if randomize_case && is_keyword(&word) {
        word = Cow::Owned(
            word.chars()
                .map(|c| {
                    if rng.gen_bool(0.5) {
                        c.to_ascii_uppercase()
                    } else {
                        c.to_ascii_lowercase()
                    }
                })
                .collect(),
        );
    }
    word
}

/// Whether whitespace between `prev` and `next` must survive as a space.
fn needs_space(prev: TokenKind, next: TokenKind) -> bool {
    let tight = |k: TokenKind| {
        matches!(
            k,
            TokenKind::Comma | TokenKind::OpenParen | TokenKind::CloseParen | TokenKind::Semicolon
        )
    };
    let operand = |k: TokenKind| {
        matches!(
            k,
            TokenKind::Word
                | TokenKind::Number
                | TokenKind::StringLiteral { .. }
                | TokenKind::QuotedIdent { .. }
        )
    };

    if tight(prev) || tight(next) {
        return false;
    }
    let operator_next_to_operand = (prev == TokenKind::Other && operand(next))
        || (operand(prev) && next == TokenKind::Other);
    !operator_next_to_operand
}
