// SQL statement classification and splitting

use super::error::LexResult;
use super::lexer::Lexer;
use super::token::{Keyword, Token, TokenKind};
use crate::dialect::DialectPolicy;
use log::{debug, trace};
use serde::Serialize;
use std::fmt;

/// Whether a statement returns rows or mutates state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Read,
    Write,
    Unknown,
}

impl StatementKind {
    /// Map a leading keyword to its statement kind.
    pub fn from_keyword(keyword: Keyword) -> Self {
        match keyword {
            Keyword::Select
            | Keyword::With
            | Keyword::Show
            | Keyword::Explain
            | Keyword::Describe => StatementKind::Read,
            Keyword::Insert
            | Keyword::Update
            | Keyword::Delete
            | Keyword::Merge
            | Keyword::Create
            | Keyword::Alter
            | Keyword::Drop
            | Keyword::Truncate
            | Keyword::Replace
            | Keyword::Grant
            | Keyword::Revoke => StatementKind::Write,
            _ => StatementKind::Unknown,
        }
    }

    pub fn is_read(&self) -> bool {
        *self == StatementKind::Read
    }

    /// Binary choice for callers: anything not known to be a read takes the
    /// exec path.
    pub fn is_write(&self) -> bool {
        !self.is_read()
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Read => f.write_str("read"),
            StatementKind::Write => f.write_str("write"),
            StatementKind::Unknown => f.write_str("unknown"),
        }
    }
}

/// Classify the first statement of `sql` by its leading keyword.
///
/// Never fails: lexical errors before the first token yield `Unknown`.
pub fn classify(sql: &str) -> StatementKind {
    classify_with_dialect(sql, DialectPolicy::default())
}

pub fn classify_with_dialect(sql: &str, dialect: DialectPolicy) -> StatementKind {
    let mut lexer = Lexer::with_dialect(sql, dialect);
    let token = match lexer.skip_ignored().and_then(|_| lexer.next_token()) {
        Ok(token) => token,
        Err(e) => {
            debug!("classify: lexing failed before first token: {}", e);
            return StatementKind::Unknown;
        }
    };
    let kind = match token.kind {
        TokenKind::Keyword(keyword) => StatementKind::from_keyword(keyword),
        _ => StatementKind::Unknown,
    };
    trace!("classify: leading token {:?} -> {}", token.text, kind);
    kind
}

/// Check whether the next statement in `lexer` is a read.
///
/// Unlike [`classify`], lexical errors are returned to the caller.
pub fn is_select_sql(lexer: &mut Lexer<'_>) -> LexResult<bool> {
    lexer.skip_ignored()?;
    let kind = lexer.look_ahead()?;
    Ok(kind
        .keyword()
        .map(StatementKind::from_keyword)
        .is_some_and(|k| k.is_read()))
}

/// Tokens of one statement, without the terminating `;`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub line: u32,
    pub kind: StatementKind,
    pub keyword: Option<Keyword>,
    pub tokens: Vec<Token>,
}

impl Statement {
    fn from_tokens(tokens: Vec<Token>) -> Self {
        let first = &tokens[0];
        let keyword = first.kind.keyword().filter(|k| k.is_statement_leading());
        Statement {
            line: first.line,
            kind: keyword
                .map(StatementKind::from_keyword)
                .unwrap_or(StatementKind::Unknown),
            keyword,
            tokens,
        }
    }
}

/// A source text split into statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Sql {
    /// Line of the EOF token
    pub last_line: u32,
    pub statements: Vec<Statement>,
}

impl Sql {
    pub fn first(&self) -> Option<&Statement> {
        self.statements.first()
    }
}

/// Split `sql` at top-level semicolons. Empty statements are dropped.
pub fn split_statements(sql: &str, dialect: DialectPolicy) -> LexResult<Sql> {
    let mut lexer = Lexer::with_dialect(sql, dialect);
    let mut statements = Vec::new();
    let mut current: Vec<Token> = Vec::new();

    loop {
        let token = lexer.next_token()?;
        if token.is_eof() {
            if !current.is_empty() {
                statements.push(Statement::from_tokens(current));
            }
            return Ok(Sql {
                last_line: token.line,
                statements,
            });
        }
        if token.is_semicolon() {
            if !current.is_empty() {
                statements.push(Statement::from_tokens(std::mem::take(&mut current)));
            }
            continue;
        }
        current.push(token);
    }
}
