/// SQL tokenizer shared by parse-trouble detection, layout and obfuscation.
///
/// It only needs to be good enough to keep strings, comments and quoted
/// identifiers intact and to track parenthesis and block nesting.
use super::keywords;

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    /// `-- ...` up to (not including) the line break.
    LineComment,
    /// `/* ... */`, possibly nested.
    BlockComment { terminated: bool },
    /// `'...'` or `N'...'`, with `''` as the escaped quote.
    StringLiteral { terminated: bool },
    /// `[...]` or `"..."`.
    QuotedIdent { terminated: bool },
    /// Keyword, identifier, variable (`@x`) or temp table name (`#t`).
    Word,
    Number,
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    /// Any other operator or punctuation character.
    Other,
}

/// A token borrowing its text from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl Token<'_> {
    /// Whether the token is a comment of either style.
    #[must_use]
    pub fn is_comment(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::LineComment | TokenKind::BlockComment { .. }
        )
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '_' | '@' | '#')
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '$')
}

/// Split `input` into tokens. Never fails: unterminated constructs are
/// flagged on the token instead.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while let Some(c) = rest.chars().next() {
        let (kind, len) = scan(c, rest);
        let (text, tail) = rest.split_at(len);
        tokens.push(Token { kind, text });
        rest = tail;
    }

    tokens
}

fn scan(c: char, rest: &str) -> (TokenKind, usize) {
    let bytes = rest.as_bytes();
    match c {
        c if c.is_whitespace() => (
            TokenKind::Whitespace,
            take_while(rest, char::is_whitespace),
        ),
        '-' if bytes.get(1) == Some(&b'-') => (
            TokenKind::LineComment,
            rest.find(['\r', '\n']).unwrap_or(rest.len()),
        ),
        '/' if bytes.get(1) == Some(&b'*') => scan_block_comment(rest),
        '\'' => scan_quoted(rest, 0, '\'', true),
        'N' | 'n' if bytes.get(1) == Some(&b'\'') => scan_quoted(rest, 1, '\'', true),
        '[' => scan_quoted(rest, 0, ']', false),
        '"' => scan_quoted(rest, 0, '"', false),
        c if c.is_ascii_digit() => (
            TokenKind::Number,
            take_while(rest, |c| c.is_ascii_alphanumeric() || c == '.'),
        ),
        c if is_word_start(c) => (TokenKind::Word, take_while(rest, is_word_char)),
        '(' => (TokenKind::OpenParen, 1),
        ')' => (TokenKind::CloseParen, 1),
        ',' => (TokenKind::Comma, 1),
        ';' => (TokenKind::Semicolon, 1),
        c => (TokenKind::Other, c.len_utf8()),
    }
}

fn take_while(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.char_indices()
        .find(|(_, c)| !pred(*c))
        .map_or(s.len(), |(i, _)| i)
}

fn scan_block_comment(rest: &str) -> (TokenKind, usize) {
    let bytes = rest.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return (TokenKind::BlockComment { terminated: true }, i);
                }
            }
            _ => i += 1,
        }
    }
    (TokenKind::BlockComment { terminated: false }, rest.len())
}

/// Scan a quoted construct starting at byte `open` (the opening delimiter).
/// A doubled closing delimiter is an escaped delimiter, not the end.
fn scan_quoted(rest: &str, open: usize, close: char, literal: bool) -> (TokenKind, usize) {
    let make = |terminated| {
        if literal {
            TokenKind::StringLiteral { terminated }
        } else {
            TokenKind::QuotedIdent { terminated }
        }
    };

    let body_start = open + 1;
    let mut chars = rest[body_start..].char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != close {
            continue;
        }
        if chars.peek().is_some_and(|(_, next)| *next == close) {
            chars.next();
            continue;
        }
        return (make(true), body_start + i + close.len_utf8());
    }
    (make(false), rest.len())
}

/// Whether the token stream shows trouble a parser would choke on:
/// unterminated strings, identifiers or comments, unbalanced parentheses,
/// or statements that stop short (`IF` without a condition, `ELSE` without a
/// body, unmatched `BEGIN`/`CASE`/`END`).
#[must_use]
pub fn has_parse_trouble(tokens: &[Token<'_>]) -> bool {
    unbalanced(tokens) || incomplete_statement(tokens)
}

fn unbalanced(tokens: &[Token<'_>]) -> bool {
    let mut depth: i64 = 0;
    for token in tokens {
        match token.kind {
            TokenKind::BlockComment { terminated: false }
            | TokenKind::StringLiteral { terminated: false }
            | TokenKind::QuotedIdent { terminated: false } => return true,
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => {}
        }
    }
    depth != 0
}

fn incomplete_statement(tokens: &[Token<'_>]) -> bool {
    let significant: Vec<&Token<'_>> = tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Whitespace && !t.is_comment())
        .collect();

    let mut open_cases = 0usize;
    let mut open_blocks = 0usize;
    for (i, token) in significant.iter().enumerate() {
        if token.kind != TokenKind::Word {
            continue;
        }
        let next = significant.get(i + 1).copied();
        match token.text.to_ascii_uppercase().as_str() {
            "IF" | "WHILE" if !opens_condition(next) => return true,
            "ELSE" if open_cases == 0 && !opens_body(next) => return true,
            "CASE" => open_cases += 1,
            "BEGIN" if !opens_transaction(next) => open_blocks += 1,
            "END" => {
                if open_cases > 0 {
                    open_cases -= 1;
                } else if open_blocks > 0 {
                    open_blocks -= 1;
                } else {
                    return true;
                }
            }
            _ => {}
        }
    }
    open_cases != 0 || open_blocks != 0
}

fn opens_transaction(next: Option<&Token<'_>>) -> bool {
    next.is_some_and(|t| is_word(t, &["TRAN", "TRANSACTION", "DISTRIBUTED"]))
}

fn is_word(token: &Token<'_>, words: &[&str]) -> bool {
    token.kind == TokenKind::Word && words.iter().any(|w| w.eq_ignore_ascii_case(token.text))
}

/// A condition can start with anything but punctuation that ends it or a
/// word that opens another statement.
fn opens_condition(next: Option<&Token<'_>>) -> bool {
    match next {
        None => false,
        Some(t) => match t.kind {
            TokenKind::Semicolon | TokenKind::CloseParen | TokenKind::Comma => false,
            TokenKind::Word => !keywords::is_statement_starter(t.text),
            _ => true,
        },
    }
}

fn opens_body(next: Option<&Token<'_>>) -> bool {
    match next {
        None => false,
        Some(t) => match t.kind {
            TokenKind::Semicolon | TokenKind::CloseParen | TokenKind::Comma => false,
            TokenKind::Word => !is_word(t, &["END", "ELSE"]),
            _ => true,
        },
    }
}
