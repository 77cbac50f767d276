// SQL tokens for lexical analysis

use std::fmt;

/// Keywords recognised by the lexer.
///
/// The table is deliberately small: only statement-leading keywords and the
/// handful of clause keywords that show up around template placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Statement-leading, read
    Select,
    With,
    Show,
    Explain,
    Describe,

    // Statement-leading, write
    Insert,
    Update,
    Delete,
    Merge,
    Create,
    Alter,
    Drop,
    Truncate,
    Replace,
    Grant,
    Revoke,

    // Clause keywords
    From,
    Where,
    Into,
    Values,
    Set,
    And,
    Or,
    Not,
    Null,
    In,
    Is,
    Like,
    As,
    On,
    Join,
    Order,
    Group,
    By,
    Having,
    Limit,
    Offset,
    Returning,
    Table,
}

impl Keyword {
    /// Convert a word to a keyword if it matches, ignoring ASCII case.
    pub fn from_word(word: &str) -> Option<Keyword> {
        // Longest keyword is "returning"
        if word.len() > 9 || !word.is_ascii() {
            return None;
        }
        match word.to_ascii_uppercase().as_str() {
            "SELECT" => Some(Keyword::Select),
            "WITH" => Some(Keyword::With),
            "SHOW" => Some(Keyword::Show),
            "EXPLAIN" => Some(Keyword::Explain),
            "DESCRIBE" => Some(Keyword::Describe),
            "INSERT" => Some(Keyword::Insert),
            "UPDATE" => Some(Keyword::Update),
            "DELETE" => Some(Keyword::Delete),
            "MERGE" => Some(Keyword::Merge),
            "CREATE" => Some(Keyword::Create),
            "ALTER" => Some(Keyword::Alter),
            "DROP" => Some(Keyword::Drop),
            "TRUNCATE" => Some(Keyword::Truncate),
            "REPLACE" => Some(Keyword::Replace),
            "GRANT" => Some(Keyword::Grant),
            "REVOKE" => Some(Keyword::Revoke),
            "FROM" => Some(Keyword::From),
            "WHERE" => Some(Keyword::Where),
            "INTO" => Some(Keyword::Into),
            "VALUES" => Some(Keyword::Values),
            "SET" => Some(Keyword::Set),
            "AND" => Some(Keyword::And),
            "OR" => Some(Keyword::Or),
            "NOT" => Some(Keyword::Not),
            "NULL" => Some(Keyword::Null),
            "IN" => Some(Keyword::In),
            "IS" => Some(Keyword::Is),
            "LIKE" => Some(Keyword::Like),
            "AS" => Some(Keyword::As),
            "ON" => Some(Keyword::On),
            "JOIN" => Some(Keyword::Join),
            "ORDER" => Some(Keyword::Order),
            "GROUP" => Some(Keyword::Group),
            "BY" => Some(Keyword::By),
            "HAVING" => Some(Keyword::Having),
            "LIMIT" => Some(Keyword::Limit),
            "OFFSET" => Some(Keyword::Offset),
            "RETURNING" => Some(Keyword::Returning),
            "TABLE" => Some(Keyword::Table),
            _ => None,
        }
    }

    /// Check if the keyword can open a statement
    pub fn is_statement_leading(&self) -> bool {
        matches!(
            self,
            Keyword::Select
                | Keyword::With
                | Keyword::Show
                | Keyword::Explain
                | Keyword::Describe
                | Keyword::Insert
                | Keyword::Update
                | Keyword::Delete
                | Keyword::Merge
                | Keyword::Create
                | Keyword::Alter
                | Keyword::Drop
                | Keyword::Truncate
                | Keyword::Replace
                | Keyword::Grant
                | Keyword::Revoke
        )
    }

    /// Lowercase name, matching how tokens are reported to users.
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Select => "select",
            Keyword::With => "with",
            Keyword::Show => "show",
            Keyword::Explain => "explain",
            Keyword::Describe => "describe",
            Keyword::Insert => "insert",
            Keyword::Update => "update",
            Keyword::Delete => "delete",
            Keyword::Merge => "merge",
            Keyword::Create => "create",
            Keyword::Alter => "alter",
            Keyword::Drop => "drop",
            Keyword::Truncate => "truncate",
            Keyword::Replace => "replace",
            Keyword::Grant => "grant",
            Keyword::Revoke => "revoke",
            Keyword::From => "from",
            Keyword::Where => "where",
            Keyword::Into => "into",
            Keyword::Values => "values",
            Keyword::Set => "set",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::Null => "null",
            Keyword::In => "in",
            Keyword::Is => "is",
            Keyword::Like => "like",
            Keyword::As => "as",
            Keyword::On => "on",
            Keyword::Join => "join",
            Keyword::Order => "order",
            Keyword::Group => "group",
            Keyword::By => "by",
            Keyword::Having => "having",
            Keyword::Limit => "limit",
            Keyword::Offset => "offset",
            Keyword::Returning => "returning",
            Keyword::Table => "table",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier,
    String,
    Number,
    Operator,
    Comment,
    Whitespace,
    /// Template span (`{{path}}`) or bind marker (`?`, `$1`, `:name`, `@name`)
    Placeholder,
    Eof,
    Invalid,
}

impl TokenKind {
    pub fn is_keyword(&self) -> bool {
        matches!(self, TokenKind::Keyword(_))
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(kw) => write!(f, "{}", kw),
            TokenKind::Identifier => f.write_str("identifier"),
            TokenKind::String => f.write_str("string"),
            TokenKind::Number => f.write_str("number"),
            TokenKind::Operator => f.write_str("operator"),
            TokenKind::Comment => f.write_str("comment"),
            TokenKind::Whitespace => f.write_str("whitespace"),
            TokenKind::Placeholder => f.write_str("placeholder"),
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::Invalid => f.write_str("invalid"),
        }
    }
}

/// A single lexed token. `text` is the exact source slice, quotes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// 1-based line where the token starts
    pub line: u32,
    /// Byte offset of the first byte of the token
    pub offset: usize,
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32, offset: usize) -> Self {
        Self {
            line,
            offset,
            kind,
            text: text.into(),
        }
    }

    pub fn eof(line: u32, offset: usize) -> Self {
        Self::new(TokenKind::Eof, "", line, offset)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// True for a top-level `;`
    pub fn is_semicolon(&self) -> bool {
        self.kind == TokenKind::Operator && self.text == ";"
    }
}
