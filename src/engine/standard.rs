/// Standard (legibility-oriented) formatting.
///
/// A single pass over the token stream. Statements, clauses, comma lists,
/// boolean chains, CASE expressions and subqueries get their own lines;
/// everything else is laid out inline with normalized spacing.
use super::keywords::{is_keyword, is_statement_starter, standard_form};
use super::lexer::{Token, TokenKind};
use super::{EngineError, OptionSet, flag, int, string};

/// Upper bound for the statement and clause break counts.
const MAX_BREAKS: usize = 100;

/// Option values resolved once per call.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
struct Settings {
    indent: String,
    spaces_per_tab: usize,
    max_line_width: usize,
    statement_breaks: usize,
    clause_breaks: usize,
    expand_comma_lists: bool,
    trailing_commas: bool,
    space_after_expanded_comma: bool,
    expand_boolean_expressions: bool,
    expand_case_statements: bool,
    expand_between_conditions: bool,
    expand_in_lists: bool,
    break_join_on_sections: bool,
    uppercase_keywords: bool,
    keyword_standardization: bool,
    html_coloring: bool,
}

impl Settings {
    fn from_options(options: &OptionSet) -> Result<Self, EngineError> {
        Ok(Self {
            indent: string(options, "indent"),
            spaces_per_tab: count(options, "spacesPerTab", usize::MAX)?,
            max_line_width: count(options, "maxLineWidth", usize::MAX)?,
            statement_breaks: count(options, "statementBreaks", MAX_BREAKS)?,
            clause_breaks: count(options, "clauseBreaks", MAX_BREAKS)?,
            expand_comma_lists: flag(options, "expandCommaLists"),
            trailing_commas: flag(options, "trailingCommas"),
            space_after_expanded_comma: flag(options, "spaceAfterExpandedComma"),
            expand_boolean_expressions: flag(options, "expandBooleanExpressions"),
            expand_case_statements: flag(options, "expandCaseStatements"),
            expand_between_conditions: flag(options, "expandBetweenConditions"),
            expand_in_lists: flag(options, "expandInLists"),
            break_join_on_sections: flag(options, "breakJoinOnSections"),
            uppercase_keywords: flag(options, "uppercaseKeywords"),
            keyword_standardization: flag(options, "keywordStandardization"),
            html_coloring: flag(options, "htmlColoring"),
        })
    }

    /// Display width of `text`, counting a tab as `spacesPerTab` columns.
    fn width(&self, text: &str) -> usize {
        text.chars()
            .map(|c| if c == '\t' { self.spaces_per_tab } else { 1 })
            .sum()
    }
}

fn count(options: &OptionSet, name: &str, max: usize) -> Result<usize, EngineError> {
    let n = int(options, name);
    usize::try_from(n)
        .ok()
        .filter(|n| *n <= max)
        .ok_or_else(|| EngineError::InvalidValue {
            name: name.to_owned(),
            value: n.to_string(),
            reason: format!("must be between 0 and {max}"),
        })
}

/// Lay out the tokenized input.
///
/// # Errors
///
/// Returns `EngineError::InvalidValue` for a count option out of range.
pub fn format(tokens: &[Token<'_>], options: &OptionSet) -> Result<String, EngineError> {
    let settings = Settings::from_options(options)?;
    let items: Vec<Item<'_>> = tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Whitespace)
        .map(|t| Item {
            token: *t,
            word: if t.kind == TokenKind::Word {
                t.text.to_ascii_uppercase()
            } else {
                String::new()
            },
        })
        .collect();

    let mut layout = Layout::new(&settings);
    let mut i = 0;
    while i < items.len() {
        i = layout.step(&items, i);
    }
    Ok(layout.w.out)
}

// --- Writer ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    None,
    Space,
    Break { lines: usize, level: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Plain,
    Keyword,
    Comment,
    Literal,
    Operator,
}

/// Accumulates output text. Separators are decided lazily: the strongest
/// one requested since the last token wins when the next token arrives.
struct Writer<'s> {
    settings: &'s Settings,
    out: String,
    gap: Gap,
    /// The next token attaches without a space (line breaks still apply).
    glued: bool,
    /// `out` ends with a space that belongs to the previous token.
    trailing_space: bool,
    line_width: usize,
    /// Indent level of the current line, ignoring wraps.
    line_level: usize,
    line_has_content: bool,
}

impl<'s> Writer<'s> {
    fn new(settings: &'s Settings) -> Self {
        Self {
            settings,
            out: String::new(),
            gap: Gap::None,
            glued: false,
            trailing_space: false,
            line_width: 0,
            line_level: 0,
            line_has_content: false,
        }
    }

    fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    fn space(&mut self) {
        if self.gap == Gap::None && !self.glued {
            self.gap = Gap::Space;
        }
    }

    fn tight(&mut self) {
        if self.gap == Gap::Space {
            self.gap = Gap::None;
        }
    }

    fn glue(&mut self) {
        self.glued = true;
    }

    /// Put the next token `lines` lines down at `level`. Zero lines is a space.
    fn line_break(&mut self, lines: usize, level: usize) {
        if lines == 0 {
            self.space();
            return;
        }
        let lines = match self.gap {
            Gap::Break { lines: pending, .. } => pending.max(lines),
            _ => lines,
        };
        self.gap = Gap::Break { lines, level };
    }

    fn push(&mut self, text: &str, style: Style) {
        let gap = std::mem::replace(&mut self.gap, Gap::None);
        if !self.out.is_empty() {
            match gap {
                Gap::None => {}
                Gap::Space => {
                    let first_line = text.split('\n').next().unwrap_or_default();
                    let needed = self.line_width + 1 + self.settings.width(first_line);
                    if self.line_has_content && needed > self.settings.max_line_width {
                        self.new_line(1, self.line_level + 1);
                    } else if !self.trailing_space {
                        self.out.push(' ');
                        self.line_width += 1;
                    }
                }
                Gap::Break { lines, level } => {
                    self.new_line(lines, level);
                    self.line_level = level;
                }
            }
        }
        self.glued = false;
        self.trailing_space = false;
        self.write_styled(text, style);
        self.line_has_content = true;
        match text.rfind('\n') {
            Some(at) => self.line_width = self.settings.width(&text[at + 1..]),
            None => self.line_width += self.settings.width(text),
        }
    }

    /// Push `text` followed by a space that stays even at the end of output.
    fn push_open(&mut self, text: &str, style: Style) {
        self.push(text, style);
        self.out.push(' ');
        self.line_width += 1;
        self.trailing_space = true;
        self.glued = true;
    }

    fn new_line(&mut self, lines: usize, level: usize) {
        if self.trailing_space {
            self.out.pop();
            self.trailing_space = false;
        }
        for _ in 0..lines {
            self.out.push('\n');
        }
        for _ in 0..level {
            self.out.push_str(&self.settings.indent);
        }
        self.line_width = level * self.settings.width(&self.settings.indent);
        self.line_has_content = false;
    }

    fn write_styled(&mut self, text: &str, style: Style) {
        if !self.settings.html_coloring {
            self.out.push_str(text);
            return;
        }
        let class = match style {
            Style::Plain => None,
            Style::Keyword => Some("SQLKeyword"),
            Style::Comment => Some("SQLComment"),
            Style::Literal => Some("SQLString"),
            Style::Operator => Some("SQLOperator"),
        };
        if let Some(class) = class {
            self.out.push_str("<span class=\"");
            self.out.push_str(class);
            self.out.push_str("\">");
        }
        for c in text.chars() {
            match c {
                '&' => self.out.push_str("&amp;"),
                '<' => self.out.push_str("&lt;"),
                '>' => self.out.push_str("&gt;"),
                c => self.out.push(c),
            }
        }
        if class.is_some() {
            self.out.push_str("</span>");
        }
    }
}

// --- Layout ---

struct Item<'a> {
    token: Token<'a>,
    /// Upper-cased text for words, empty otherwise.
    word: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    With,
    Control,
    Block,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Other,
    /// Table name after INSERT/UPDATE/DELETE.
    Target,
    Select,
    Into,
    From,
    Join,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Set,
    Values,
    Union,
    /// IF/WHILE condition.
    Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParenKind {
    /// Expanded IN list.
    List,
    Inline,
}

struct Paren {
    kind: ParenKind,
    level: usize,
}

struct Case {
    level: usize,
    expanded: bool,
}

/// A statement, or a subquery nested inside one.
struct Scope {
    /// Level of the clause keywords.
    level: usize,
    kind: StatementKind,
    clause: Clause,
    parens: Vec<Paren>,
    cases: Vec<Case>,
    between: bool,
    started: bool,
}

impl Scope {
    fn new(level: usize, kind: StatementKind, clause: Clause) -> Self {
        Self {
            level,
            kind,
            clause,
            parens: Vec::new(),
            cases: Vec::new(),
            between: false,
            started: false,
        }
    }
}

/// Indentation owed to control flow. Levels are the content level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// BEGIN ... END.
    Block { level: usize },
    /// The single statement governed by IF, WHILE or ELSE.
    Body { level: usize, started: bool },
}

struct Layout<'s> {
    settings: &'s Settings,
    w: Writer<'s>,
    frames: Vec<Frame>,
    root: Scope,
    nested: Vec<Scope>,
    statement_open: bool,
    /// The next statement is the first inside BEGIN, IF or ELSE.
    container_start: bool,
    /// The next statement continues the current line (ELSE IF).
    chain: bool,
    /// Index of the previous non-comment item.
    prev: Option<usize>,
    prev_comment: bool,
}

fn word_at<'i>(items: &'i [Item<'_>], at: usize) -> &'i str {
    items.get(at).map_or("", |item| item.word.as_str())
}

/// Word of the next non-comment item after `at`.
fn next_word<'i>(items: &'i [Item<'_>], at: usize) -> &'i str {
    items[at + 1..]
        .iter()
        .find(|item| !item.token.is_comment())
        .map_or("", |item| item.word.as_str())
}

fn is_transaction(word: &str) -> bool {
    matches!(word, "TRAN" | "TRANSACTION" | "DISTRIBUTED")
}

fn compound_operator(prev: &str, next: &str) -> bool {
    matches!(
        (prev, next),
        ("<" | ">" | "!" | "=" | "+" | "-" | "*" | "/" | "%" | "&" | "|" | "^", "=")
            | ("<", ">")
            | ("!", "<" | ">")
    )
}

impl<'s> Layout<'s> {
    fn new(settings: &'s Settings) -> Self {
        Self {
            settings,
            w: Writer::new(settings),
            frames: Vec::new(),
            root: Scope::new(0, StatementKind::Other, Clause::Other),
            nested: Vec::new(),
            statement_open: false,
            container_start: false,
            chain: false,
            prev: None,
            prev_comment: false,
        }
    }

    fn scope(&self) -> &Scope {
        self.nested.last().unwrap_or(&self.root)
    }

    fn scope_mut(&mut self) -> &mut Scope {
        match self.nested.last_mut() {
            Some(scope) => scope,
            None => &mut self.root,
        }
    }

    fn base_level(&self) -> usize {
        match self.frames.last() {
            Some(Frame::Block { level } | Frame::Body { level, .. }) => *level,
            None => 0,
        }
    }

    /// Level for continuation lines of the current item.
    fn item_level(&self) -> usize {
        let scope = self.scope();
        let mut level = scope.level + 1;
        if let Some(list) = scope.parens.iter().rev().find(|p| p.kind == ParenKind::List) {
            level = level.max(list.level);
        }
        if let Some(case) = scope.cases.iter().rev().find(|c| c.expanded) {
            level = level.max(case.level + 2);
        }
        level
    }

    fn in_condition(&self) -> bool {
        self.statement_open && self.nested.is_empty() && self.root.clause == Clause::Condition
    }

    fn step(&mut self, items: &[Item<'_>], i: usize) -> usize {
        let item = &items[i];
        if item.token.is_comment() {
            self.comment(item);
            return i + 1;
        }

        let next = if item.token.kind == TokenKind::Word {
            self.spacing(items, i);
            if !self.statement_open || self.is_statement_boundary(items, i) {
                self.statement_start(items, i)
            } else if let Some(next) = self.clause(items, i) {
                next
            } else {
                self.word(items, i)
            }
        } else {
            let continues = matches!(
                item.token.kind,
                TokenKind::Semicolon | TokenKind::Comma | TokenKind::CloseParen
            );
            if !self.statement_open && !continues {
                self.pop_bodies(false);
                self.open_statement(StatementKind::Other, Clause::Other);
            }
            self.spacing(items, i);
            self.punctuation(items, i);
            i + 1
        };

        self.prev = Some(next - 1);
        self.prev_comment = false;
        next
    }

    fn render(&self, item: &Item<'_>) -> String {
        let text = item.token.text;
        if item.token.kind != TokenKind::Word {
            return text.to_owned();
        }
        let text = match standard_form(text) {
            Some(full) if self.settings.keyword_standardization => full,
            _ => text,
        };
        if !is_keyword(text) {
            text.to_owned()
        } else if self.settings.uppercase_keywords {
            text.to_uppercase()
        } else {
            text.to_lowercase()
        }
    }

    fn emit(&mut self, item: &Item<'_>) {
        let style = match item.token.kind {
            TokenKind::Word if is_keyword(item.token.text) => Style::Keyword,
            TokenKind::StringLiteral { .. } => Style::Literal,
            TokenKind::LineComment | TokenKind::BlockComment { .. } => Style::Comment,
            TokenKind::Other if item.token.text != "." => Style::Operator,
            _ => Style::Plain,
        };
        let text = self.render(item);
        self.w.push(&text, style);
        self.scope_mut().started = true;
    }

    /// Emit `count` adjacent words separated by single spaces.
    fn emit_words(&mut self, items: &[Item<'_>], i: usize, count: usize) {
        for (n, item) in items[i..i + count].iter().enumerate() {
            if n > 0 {
                self.w.space();
            }
            self.emit(item);
        }
    }

    fn comment(&mut self, item: &Item<'_>) {
        self.w.space();
        self.w.push(item.token.text, Style::Comment);
        if item.token.kind == TokenKind::LineComment {
            let level = self.w.line_level;
            self.w.line_break(1, level);
        }
        self.prev_comment = true;
    }

    fn spacing(&mut self, items: &[Item<'_>], i: usize) {
        let Some(p) = self.prev else {
            return;
        };
        let prev = &items[p].token;
        let cur = &items[i].token;
        let tight = match (prev.kind, cur.kind) {
            (_, TokenKind::Comma | TokenKind::Semicolon | TokenKind::CloseParen)
            | (TokenKind::OpenParen, _) => true,
            (_, TokenKind::OpenParen) => self.call_paren(&items[p]),
            (TokenKind::Other, _) | (_, TokenKind::Other) if prev.text == "." || cur.text == "." => {
                true
            }
            (TokenKind::Other, TokenKind::Other) => compound_operator(prev.text, cur.text),
            _ => false,
        };
        if tight {
            self.w.tight();
        } else {
            self.w.space();
        }
    }

    /// Whether a `(` after `prev` opens an argument list.
    fn call_paren(&self, prev: &Item<'_>) -> bool {
        match prev.token.kind {
            TokenKind::QuotedIdent { .. } => true,
            TokenKind::Word => {
                let insert_target = self.nested.is_empty()
                    && self.root.kind == StatementKind::Insert
                    && self.root.clause == Clause::Target
                    && self.root.parens.is_empty();
                !insert_target
                    && (!is_keyword(&prev.word)
                        || matches!(prev.word.as_str(), "CAST" | "CONVERT" | "LEFT" | "RIGHT"))
            }
            _ => false,
        }
    }

    // --- Statements ---

    fn is_statement_boundary(&self, items: &[Item<'_>], i: usize) -> bool {
        if !self.nested.is_empty() || !self.root.parens.is_empty() {
            return false;
        }
        let word = items[i].word.as_str();
        if !is_statement_starter(word) {
            return false;
        }
        let prev = self.prev.map_or("", |p| items[p].word.as_str());
        let kind = self.root.kind;
        match word {
            "ELSE" | "END" => self.root.cases.is_empty(),
            "SELECT" => {
                !matches!(kind, StatementKind::Insert | StatementKind::With)
                    && !matches!(prev, "UNION" | "ALL" | "EXCEPT" | "INTERSECT" | "AS" | "FOR")
            }
            "INSERT" | "UPDATE" | "DELETE" | "MERGE" => kind != StatementKind::With,
            "SET" => kind != StatementKind::Update,
            "EXEC" | "EXECUTE" => kind != StatementKind::Insert,
            _ => true,
        }
    }

    fn statement_start(&mut self, items: &[Item<'_>], i: usize) -> usize {
        let word = items[i].word.as_str();
        match word {
            "END" => return self.close_block(items, i),
            "ELSE" => return self.else_branch(items, i),
            _ => {}
        }

        let block = word == "BEGIN" && !is_transaction(word_at(items, i + 1));
        if self.in_condition() {
            let level = self.root.level;
            self.frames.push(Frame::Body {
                level: if block { level } else { level + 1 },
                started: false,
            });
            self.container_start = true;
        } else {
            self.pop_bodies(false);
        }
        if block {
            return self.open_block(items, i);
        }

        let next = word_at(items, i + 1);
        let (kind, clause, count) = match word {
            "SELECT" => (StatementKind::Select, Clause::Select, 1),
            "INSERT" => (StatementKind::Insert, Clause::Target, 1 + usize::from(next == "INTO")),
            "UPDATE" => (StatementKind::Update, Clause::Target, 1),
            "DELETE" => (StatementKind::Delete, Clause::Target, 1 + usize::from(next == "FROM")),
            "WITH" => (StatementKind::With, Clause::Other, 1),
            "IF" | "WHILE" => (StatementKind::Control, Clause::Condition, 1),
            _ => (StatementKind::Other, Clause::Other, 1),
        };
        self.open_statement(kind, clause);

        if kind == StatementKind::Control {
            // The condition follows on the same line, even when it is missing.
            let text = self.render(&items[i]);
            self.w.push_open(&text, Style::Keyword);
            self.scope_mut().started = true;
        } else {
            self.emit_words(items, i, count);
        }
        i + count
    }

    fn open_statement(&mut self, kind: StatementKind, clause: Clause) {
        self.mark_body_started();
        let level = self.base_level();
        self.separate(level);
        self.root = Scope::new(level, kind, clause);
        self.nested.clear();
        self.statement_open = true;
    }

    /// Queue the separator in front of a new statement.
    fn separate(&mut self, level: usize) {
        if !self.w.is_empty() {
            if self.chain {
                self.w.space();
            } else {
                let lines = if self.prev_comment {
                    1
                } else if self.container_start {
                    self.settings.clause_breaks
                } else {
                    self.settings.statement_breaks
                };
                self.w.line_break(lines, level);
            }
        }
        self.chain = false;
        self.container_start = false;
    }

    fn mark_body_started(&mut self) {
        if let Some(Frame::Body { started, .. }) = self.frames.last_mut() {
            *started = true;
        }
    }

    /// Drop finished IF/WHILE/ELSE bodies: all of them, or only the innermost.
    fn pop_bodies(&mut self, innermost: bool) {
        while let Some(Frame::Body { started: true, .. }) = self.frames.last() {
            self.frames.pop();
            if innermost {
                break;
            }
        }
    }

    fn open_block(&mut self, items: &[Item<'_>], i: usize) -> usize {
        self.mark_body_started();
        let level = self.base_level();
        self.separate(level);
        self.root = Scope::new(level, StatementKind::Block, Clause::Other);
        self.nested.clear();

        let count = 1 + usize::from(matches!(word_at(items, i + 1), "TRY" | "CATCH"));
        self.emit_words(items, i, count);
        self.frames.push(Frame::Block { level: level + 1 });
        self.container_start = true;
        self.statement_open = false;
        i + count
    }

    fn close_block(&mut self, items: &[Item<'_>], i: usize) -> usize {
        let mut level = self.base_level();
        if self.frames.iter().any(|f| matches!(f, Frame::Block { .. })) {
            while let Some(frame) = self.frames.pop() {
                if let Frame::Block { level: inner } = frame {
                    level = inner.saturating_sub(1);
                    break;
                }
            }
        }
        if !self.w.is_empty() {
            let lines = if self.prev_comment {
                1
            } else {
                self.settings.clause_breaks
            };
            self.w.line_break(lines, level);
        }
        self.root = Scope::new(level, StatementKind::Block, Clause::Other);
        self.nested.clear();

        let count = 1 + usize::from(matches!(word_at(items, i + 1), "TRY" | "CATCH"));
        self.emit_words(items, i, count);
        self.statement_open = false;
        self.container_start = false;
        self.chain = false;
        i + count
    }

    fn else_branch(&mut self, items: &[Item<'_>], i: usize) -> usize {
        self.pop_bodies(true);
        let level = self.base_level();
        if !self.w.is_empty() {
            let lines = if self.prev_comment {
                1
            } else {
                self.settings.clause_breaks
            };
            self.w.line_break(lines, level);
        }
        self.root = Scope::new(level, StatementKind::Control, Clause::Other);
        self.nested.clear();
        self.emit_words(items, i, 1);

        let next = word_at(items, i + 1);
        let chained = next == "IF";
        let block = next == "BEGIN" && !is_transaction(word_at(items, i + 2));
        self.frames.push(Frame::Body {
            level: if chained || block { level } else { level + 1 },
            started: false,
        });
        self.chain = chained;
        self.container_start = true;
        self.statement_open = false;
        i + 1
    }

    // --- Clauses ---

    fn clause(&mut self, items: &[Item<'_>], i: usize) -> Option<usize> {
        let scope = self.scope();
        if !scope.parens.is_empty() {
            return None;
        }
        let word = items[i].word.as_str();
        let next = word_at(items, i + 1);
        let kind = scope.kind;
        let query = matches!(
            kind,
            StatementKind::Select
                | StatementKind::Insert
                | StatementKind::Update
                | StatementKind::Delete
                | StatementKind::With
        );

        let (clause, kind, count) = match word {
            "SELECT" => (Clause::Select, StatementKind::Select, 1),
            "INSERT" if kind == StatementKind::With => {
                (Clause::Target, StatementKind::Insert, 1 + usize::from(next == "INTO"))
            }
            "UPDATE" if kind == StatementKind::With => (Clause::Target, StatementKind::Update, 1),
            "DELETE" if kind == StatementKind::With => {
                (Clause::Target, StatementKind::Delete, 1 + usize::from(next == "FROM"))
            }
            "EXEC" | "EXECUTE" if kind == StatementKind::Insert => (Clause::Other, kind, 1),
            _ if !query => return None,
            "FROM" => (Clause::From, kind, 1),
            "WHERE" => (Clause::Where, kind, 1),
            "HAVING" => (Clause::Having, kind, 1),
            "GROUP" if next == "BY" => (Clause::GroupBy, kind, 2),
            "ORDER" if next == "BY" => (Clause::OrderBy, kind, 2),
            "INTO" if scope.clause == Clause::Select => (Clause::Into, kind, 1),
            "VALUES" => (Clause::Values, kind, 1),
            "SET" if kind == StatementKind::Update => (Clause::Set, kind, 1),
            "OUTPUT" | "OPTION" if word == "OPTION" || kind != StatementKind::Select => {
                (Clause::Other, kind, 1)
            }
            "UNION" => (Clause::Union, kind, 1 + usize::from(next == "ALL")),
            "EXCEPT" | "INTERSECT" => (Clause::Union, kind, 1),
            _ => return self.join(items, i),
        };
        self.emit_clause(items, i, count, clause, kind);
        Some(i + count)
    }

    fn join(&mut self, items: &[Item<'_>], i: usize) -> Option<usize> {
        let word = items[i].word.as_str();
        let next = word_at(items, i + 1);
        let count = match word {
            "JOIN" => 1,
            "INNER" | "CROSS" if matches!(next, "JOIN" | "APPLY") => 2,
            "OUTER" if next == "APPLY" => 2,
            "LEFT" | "RIGHT" | "FULL" if next == "JOIN" => 2,
            "LEFT" | "RIGHT" | "FULL" if next == "OUTER" && word_at(items, i + 2) == "JOIN" => 3,
            "ON" if self.scope().clause == Clause::Join => {
                if self.settings.break_join_on_sections {
                    let level = self.scope().level + 1;
                    self.w.line_break(1, level);
                }
                self.emit_words(items, i, 1);
                return Some(i + 1);
            }
            _ => return None,
        };
        let kind = self.scope().kind;
        self.emit_clause(items, i, count, Clause::Join, kind);
        Some(i + count)
    }

    fn emit_clause(
        &mut self,
        items: &[Item<'_>],
        i: usize,
        count: usize,
        clause: Clause,
        kind: StatementKind,
    ) {
        let (level, started) = (self.scope().level, self.scope().started);
        if started {
            self.w.line_break(self.settings.clause_breaks, level);
        }
        self.emit_words(items, i, count);
        let scope = self.scope_mut();
        scope.clause = clause;
        scope.kind = kind;
        scope.between = false;
    }

    // --- Words and punctuation ---

    fn word(&mut self, items: &[Item<'_>], i: usize) -> usize {
        let case = self.scope().cases.last().map(|c| (c.level, c.expanded));
        match (items[i].word.as_str(), case) {
            ("CASE", _) => {
                let level = self.item_level();
                self.emit(&items[i]);
                let expanded = self.settings.expand_case_statements;
                self.scope_mut().cases.push(Case { level, expanded });
            }
            ("WHEN" | "ELSE", Some((level, true))) => {
                self.w.line_break(1, level + 1);
                self.emit(&items[i]);
            }
            ("END", Some((level, expanded))) => {
                if expanded {
                    self.w.line_break(1, level + 1);
                }
                self.emit(&items[i]);
                self.scope_mut().cases.pop();
            }
            ("AND" | "OR", _) => self.boolean(&items[i]),
            ("BETWEEN", _) => {
                self.emit(&items[i]);
                self.scope_mut().between = true;
            }
            _ => self.emit(&items[i]),
        }
        i + 1
    }

    fn boolean(&mut self, item: &Item<'_>) {
        let between = std::mem::take(&mut self.scope_mut().between);
        if between && item.word == "AND" {
            if self.settings.expand_between_conditions {
                let level = self.item_level() + 1;
                self.w.line_break(1, level);
            }
        } else if self.settings.expand_boolean_expressions {
            let scope = self.scope();
            let chain = scope.parens.is_empty()
                && scope.cases.is_empty()
                && matches!(
                    scope.clause,
                    Clause::Where | Clause::Having | Clause::Join | Clause::Condition
                );
            if chain {
                let level = scope.level + 1;
                self.w.line_break(1, level);
            }
        }
        self.emit(item);
    }

    fn punctuation(&mut self, items: &[Item<'_>], i: usize) {
        let item = &items[i];
        match item.token.kind {
            TokenKind::OpenParen => self.open_paren(items, i),
            TokenKind::CloseParen => self.close_paren(item),
            TokenKind::Comma => self.comma(item),
            TokenKind::Semicolon => {
                self.emit(item);
                if self.nested.is_empty() && self.root.parens.is_empty() {
                    self.statement_open = false;
                }
            }
            TokenKind::Other if self.is_unary(items, i) => {
                self.emit(item);
                self.w.glue();
            }
            _ => self.emit(item),
        }
    }

    fn is_unary(&self, items: &[Item<'_>], i: usize) -> bool {
        if !matches!(items[i].token.text, "-" | "+" | "~") {
            return false;
        }
        match self.prev.map(|p| &items[p]) {
            None => true,
            Some(prev) => match prev.token.kind {
                TokenKind::OpenParen | TokenKind::Comma => true,
                TokenKind::Other => prev.token.text != ".",
                TokenKind::Word => is_keyword(&prev.word),
                _ => false,
            },
        }
    }

    fn open_paren(&mut self, items: &[Item<'_>], i: usize) {
        let level = self.item_level();
        if matches!(next_word(items, i), "SELECT" | "WITH") {
            self.emit(&items[i]);
            self.w.line_break(1, level);
            self.nested
                .push(Scope::new(level, StatementKind::Select, Clause::Other));
            return;
        }

        let after_in = self.prev.is_some_and(|p| items[p].word == "IN");
        let list = after_in && self.settings.expand_in_lists && self.settings.expand_comma_lists;
        self.emit(&items[i]);
        if list {
            self.w.line_break(1, level);
        }
        let kind = if list {
            ParenKind::List
        } else {
            ParenKind::Inline
        };
        self.scope_mut().parens.push(Paren { kind, level });
    }

    fn close_paren(&mut self, item: &Item<'_>) {
        if let Some(paren) = self.scope_mut().parens.pop() {
            if paren.kind == ParenKind::List {
                self.w.line_break(1, paren.level);
            }
        } else if let Some(closed) = self.nested.pop() {
            self.w.line_break(1, closed.level);
        }
        self.emit(item);
    }

    fn comma(&mut self, item: &Item<'_>) {
        let scope = self.scope();
        let target = match scope.parens.last() {
            Some(paren) => (paren.kind == ParenKind::List).then_some(paren.level),
            None => (self.settings.expand_comma_lists
                && scope.cases.is_empty()
                && scope.clause != Clause::Condition)
                .then_some(scope.level + 1),
        };

        match target {
            None => self.emit(item),
            Some(level) if self.settings.trailing_commas => {
                self.emit(item);
                self.w.line_break(1, level);
            }
            Some(level) => {
                self.w.line_break(1, level);
                self.emit(item);
                if !self.settings.space_after_expanded_comma {
                    self.w.glue();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::OptionValue;
    use crate::engine::lexer::tokenize;

    const QUERY: &str = "select a, b from t where x = 1 and y = 2";

    fn run(input: &str, options: &OptionSet) -> String {
        format(&tokenize(input), options).unwrap()
    }

    fn with(values: &[(&'static str, OptionValue)]) -> OptionSet {
        let mut options = OptionSet::new();
        for (name, value) in values {
            options.insert(*name, value.clone());
        }
        options
    }

    #[test]
    fn test_default_layout() {
        assert_eq!(
            run(QUERY, &OptionSet::new()),
            "SELECT a\n\t,b\nFROM t\nWHERE x = 1\n\tAND y = 2"
        );
    }

    #[test]
    fn test_single_keyword() {
        assert_eq!(run("select", &OptionSet::new()), "SELECT");
    }

    #[test]
    fn test_missing_condition_keeps_open_keyword() {
        assert_eq!(run("select if", &OptionSet::new()), "SELECT\n\nIF ");
    }

    #[test]
    fn test_lowercase_keywords_from_upper_case_input() {
        let options = with(&[("uppercaseKeywords", OptionValue::Bool(false))]);
        assert_eq!(run("SELECT A FROM T", &options), "select A\nfrom T");
    }

    #[test]
    fn test_comma_lists_inline() {
        let options = with(&[("expandCommaLists", OptionValue::Bool(false))]);
        assert!(run(QUERY, &options).starts_with("SELECT a, b\nFROM t"));
    }

    #[test]
    fn test_trailing_commas() {
        let options = with(&[("trailingCommas", OptionValue::Bool(true))]);
        assert!(run(QUERY, &options).starts_with("SELECT a,\n\tb\nFROM"));
    }

    #[test]
    fn test_space_after_expanded_comma() {
        let options = with(&[("spaceAfterExpandedComma", OptionValue::Bool(true))]);
        assert!(run(QUERY, &options).starts_with("SELECT a\n\t, b\nFROM"));
    }

    #[test]
    fn test_clause_breaks() {
        let options = with(&[("clauseBreaks", OptionValue::Int(2))]);
        assert_eq!(
            run(QUERY, &options),
            "SELECT a\n\t,b\n\nFROM t\n\nWHERE x = 1\n\tAND y = 2"
        );
    }

    #[test]
    fn test_boolean_expressions_inline() {
        let options = with(&[("expandBooleanExpressions", OptionValue::Bool(false))]);
        assert!(run(QUERY, &options).ends_with("WHERE x = 1 AND y = 2"));
    }

    #[test]
    fn test_indent_unit() {
        let options = with(&[("indent", OptionValue::Str("\t\t".to_owned()))]);
        assert!(run(QUERY, &options).starts_with("SELECT a\n\t\t,b"));
        let options = with(&[("indent", OptionValue::Str("    ".to_owned()))]);
        assert!(run(QUERY, &options).starts_with("SELECT a\n    ,b"));
    }

    #[test]
    fn test_statement_breaks() {
        let sql = "select 1; select 2";
        assert_eq!(run(sql, &OptionSet::new()), "SELECT 1;\n\nSELECT 2");
        let options = with(&[("statementBreaks", OptionValue::Int(1))]);
        assert_eq!(run(sql, &options), "SELECT 1;\nSELECT 2");
    }

    #[test]
    fn test_break_counts_out_of_range() {
        let options = with(&[("statementBreaks", OptionValue::Int(300))]);
        let err = format(&tokenize("select 1"), &options).unwrap_err();
        assert!(matches!(err, EngineError::InvalidValue { .. }));
    }

    #[test]
    fn test_case_expansion() {
        let sql = "select case when a = 1 then 'x' else 'y' end from t";
        assert_eq!(
            run(sql, &OptionSet::new()),
            "SELECT CASE\n\t\tWHEN a = 1 THEN 'x'\n\t\tELSE 'y'\n\t\tEND\nFROM t"
        );
        let options = with(&[("expandCaseStatements", OptionValue::Bool(false))]);
        assert_eq!(
            run(sql, &options),
            "SELECT CASE WHEN a = 1 THEN 'x' ELSE 'y' END\nFROM t"
        );
    }

    #[test]
    fn test_between_conditions() {
        let sql = "select a from t where x between 1 and 2";
        assert!(run(sql, &OptionSet::new()).ends_with("WHERE x BETWEEN 1\n\t\tAND 2"));
        let options = with(&[("expandBetweenConditions", OptionValue::Bool(false))]);
        assert!(run(sql, &options).ends_with("WHERE x BETWEEN 1 AND 2"));
    }

    #[test]
    fn test_in_lists() {
        let sql = "select a from t where x in (1, 2)";
        assert!(run(sql, &OptionSet::new()).ends_with("WHERE x IN (\n\t1\n\t,2\n\t)"));
        let options = with(&[("expandInLists", OptionValue::Bool(false))]);
        assert!(run(sql, &options).ends_with("WHERE x IN (1, 2)"));
    }

    #[test]
    fn test_join_on_sections() {
        let sql = "select a from t inner join u on t.id = u.id and t.k = u.k";
        assert!(
            run(sql, &OptionSet::new())
                .ends_with("INNER JOIN u ON t.id = u.id\n\tAND t.k = u.k")
        );
        let options = with(&[("breakJoinOnSections", OptionValue::Bool(true))]);
        assert!(run(sql, &options).ends_with("INNER JOIN u\n\tON t.id = u.id\n\tAND t.k = u.k"));
    }

    #[test]
    fn test_max_line_width_wraps() {
        let options = with(&[
            ("expandCommaLists", OptionValue::Bool(false)),
            ("maxLineWidth", OptionValue::Int(12)),
        ]);
        assert_eq!(
            run("select aaaa, bbbb from t", &options),
            "SELECT aaaa,\n\tbbbb\nFROM t"
        );
    }

    #[test]
    fn test_spaces_per_tab_counts_toward_width() {
        let sql = "select a from t where x = 1 and yy = 22";
        let narrow = with(&[
            ("maxLineWidth", OptionValue::Int(12)),
            ("spacesPerTab", OptionValue::Int(8)),
        ]);
        let wide = with(&[
            ("maxLineWidth", OptionValue::Int(12)),
            ("spacesPerTab", OptionValue::Int(1)),
        ]);
        assert_ne!(run(sql, &narrow), run(sql, &wide));
        assert!(run(sql, &wide).ends_with("\tAND yy = 22"));
    }

    #[test]
    fn test_if_else_bodies() {
        assert_eq!(
            run("if @a = 1 select 1 else select 2", &OptionSet::new()),
            "IF @a = 1\n\tSELECT 1\nELSE\n\tSELECT 2"
        );
    }

    #[test]
    fn test_begin_end_block() {
        assert_eq!(
            run("if @a = 1 begin select 1; select 2 end", &OptionSet::new()),
            "IF @a = 1\nBEGIN\n\tSELECT 1;\n\n\tSELECT 2\nEND"
        );
    }

    #[test]
    fn test_subquery() {
        assert_eq!(
            run("select a from (select b from t) x", &OptionSet::new()),
            "SELECT a\nFROM (\n\tSELECT b\n\tFROM t\n\t) x"
        );
    }

    #[test]
    fn test_insert_values() {
        assert_eq!(
            run("insert into t (a, b) values (1, 2)", &OptionSet::new()),
            "INSERT INTO t (a, b)\nVALUES (1, 2)"
        );
    }

    #[test]
    fn test_operators_and_calls() {
        assert_eq!(
            run("select -1, a - b, count(*) from t", &OptionSet::new()),
            "SELECT -1\n\t,a - b\n\t,count(*)\nFROM t"
        );
        assert!(run("select a from t where x >= 1", &OptionSet::new()).ends_with("x >= 1"));
    }

    #[test]
    fn test_line_comment_forces_break() {
        assert_eq!(
            run("select a -- note\nfrom t", &OptionSet::new()),
            "SELECT a -- note\nFROM t"
        );
    }

    #[test]
    fn test_keyword_standardization() {
        let options = with(&[("keywordStandardization", OptionValue::Bool(true))]);
        assert_eq!(run("exec dbo.p 'proc'", &options), "EXECUTE dbo.p 'proc'");
        assert_eq!(run("exec dbo.p", &OptionSet::new()), "EXEC dbo.p");
    }

    #[test]
    fn test_html_coloring() {
        let options = with(&[("htmlColoring", OptionValue::Bool(true))]);
        let out = run("select a from t where b < 'x'", &options);
        assert!(out.starts_with("<span class=\"SQLKeyword\">SELECT</span> a"));
        assert!(out.contains("<span class=\"SQLOperator\">&lt;</span>"));
        assert!(out.contains("<span class=\"SQLString\">'x'</span>"));
    }
}
