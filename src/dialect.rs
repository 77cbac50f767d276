//! Dialect policy: placeholder syntax and quoting rules for a database family.
//!
//! A policy is a small `Copy` value handed to the lexer and the escaper. It is
//! selected from a [`DialectId`], which is the identifier connectors store next
//! to a resource definition.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How bind markers are written into rewritten SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1, $2, ...` (PostgreSQL)
    Positional,
    /// `?` (MySQL, SQLite, Snowflake, ClickHouse)
    QuestionMark,
    /// `:1, :2, ...` (Oracle)
    Named,
    /// `@p1, @p2, ...` (SQL Server)
    AtNamed,
}

impl PlaceholderStyle {
    /// Append the marker for the 1-based parameter `index` to `out`.
    pub fn write_marker(self, index: usize, out: &mut String) {
        match self {
            PlaceholderStyle::Positional => {
                out.push('$');
                out.push_str(&index.to_string());
            }
            PlaceholderStyle::QuestionMark => out.push('?'),
            PlaceholderStyle::Named => {
                out.push(':');
                out.push_str(&index.to_string());
            }
            PlaceholderStyle::AtNamed => {
                out.push_str("@p");
                out.push_str(&index.to_string());
            }
        }
    }
}

/// How a quote character is escaped inside a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEscape {
    /// `'it''s'`
    DoubledQuote,
    /// `'it\'s'`; doubled quotes are accepted too when lexing.
    Backslash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteStyle {
    /// Opens and closes string literals
    pub string: char,
    /// Opens and closes quoted identifiers
    pub identifier: char,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectPolicy {
    pub placeholder_style: PlaceholderStyle,
    pub quote_style: QuoteStyle,
    pub string_escape: StringEscape,
    /// `#` starts a line comment
    pub hash_comments: bool,
}

impl Default for DialectPolicy {
    /// ANSI quoting with `$n` markers, accepting `#` comments.
    fn default() -> Self {
        Self {
            placeholder_style: PlaceholderStyle::Positional,
            quote_style: QuoteStyle {
                string: '\'',
                identifier: '"',
            },
            string_escape: StringEscape::DoubledQuote,
            hash_comments: true,
        }
    }
}

impl DialectPolicy {
    pub fn postgres() -> Self {
        Self {
            hash_comments: false,
            ..Self::default()
        }
    }

    pub fn mysql() -> Self {
        Self {
            placeholder_style: PlaceholderStyle::QuestionMark,
            quote_style: QuoteStyle {
                string: '\'',
                identifier: '`',
            },
            string_escape: StringEscape::Backslash,
            hash_comments: true,
        }
    }

    pub fn snowflake() -> Self {
        Self {
            placeholder_style: PlaceholderStyle::QuestionMark,
            hash_comments: false,
            ..Self::default()
        }
    }

    pub fn clickhouse() -> Self {
        Self {
            placeholder_style: PlaceholderStyle::QuestionMark,
            quote_style: QuoteStyle {
                string: '\'',
                identifier: '`',
            },
            string_escape: StringEscape::Backslash,
            hash_comments: false,
        }
    }

    pub fn mssql() -> Self {
        Self {
            placeholder_style: PlaceholderStyle::AtNamed,
            hash_comments: false,
            ..Self::default()
        }
    }

    pub fn oracle() -> Self {
        Self {
            placeholder_style: PlaceholderStyle::Named,
            hash_comments: false,
            ..Self::default()
        }
    }

    pub fn sqlite() -> Self {
        Self {
            placeholder_style: PlaceholderStyle::QuestionMark,
            hash_comments: false,
            ..Self::default()
        }
    }

    /// Whether backslash escapes are honoured inside literals.
    pub fn backslash_escapes(&self) -> bool {
        self.string_escape == StringEscape::Backslash
    }

    /// Escape `s` for use between string quotes, without adding the quotes.
    pub fn escape_str(&self, s: &str) -> String {
        self.escape_quoted(s, self.quote_style.string)
    }

    /// Escape `s` for the body of a string literal delimited by `quote`.
    pub fn escape_quoted(&self, s: &str, quote: char) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        for c in s.chars() {
            match self.string_escape {
                StringEscape::DoubledQuote if c == quote => {
                    out.push(quote);
                    out.push(quote);
                }
                StringEscape::Backslash if c == quote || c == '\\' => {
                    out.push('\\');
                    out.push(c);
                }
                _ => out.push(c),
            }
        }
        out
    }

    /// Decode the body of a string literal delimited by `quote`.
    ///
    /// Backslash sequences follow MySQL: `\%` and `\_` keep their backslash
    /// so LIKE patterns survive, unknown escapes drop it.
    pub fn unescape_quoted(&self, body: &str, quote: char) -> String {
        let mut out = String::with_capacity(body.len());
        let mut chars = body.chars().peekable();
        while let Some(c) = chars.next() {
            if c == quote && chars.peek() == Some(&quote) {
                chars.next();
                out.push(quote);
                continue;
            }
            if c != '\\' || !self.backslash_escapes() {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('0') => out.push('\0'),
                Some('b') => out.push('\u{8}'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('Z') => out.push('\u{1a}'),
                Some(c @ ('%' | '_')) => {
                    out.push('\\');
                    out.push(c);
                }
                Some(c) => out.push(c),
                None => out.push('\\'),
            }
        }
        out
    }

    /// Escape `s` for the body of a quoted identifier delimited by `quote`.
    pub fn escape_ident(&self, s: &str, quote: char) -> String {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            if c == quote {
                out.push(quote);
            }
            out.push(c);
        }
        out
    }

    /// Escape `s` and wrap it in string quotes.
    pub fn quote_str(&self, s: &str) -> String {
        let quote = self.quote_style.string;
        format!("{}{}{}", quote, self.escape_str(s), quote)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialectError {
    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),
}

/// Resource identifiers of the SQL-speaking connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectId {
    #[default]
    Postgresql,
    Cockroachdb,
    Hydra,
    Neon,
    Supabase,
    Mysql,
    Mariadb,
    Tidb,
    Snowflake,
    Clickhouse,
    Mssql,
    Oracle,
    Sqlite,
}

impl DialectId {
    pub const ALL: [DialectId; 13] = [
        DialectId::Postgresql,
        DialectId::Cockroachdb,
        DialectId::Hydra,
        DialectId::Neon,
        DialectId::Supabase,
        DialectId::Mysql,
        DialectId::Mariadb,
        DialectId::Tidb,
        DialectId::Snowflake,
        DialectId::Clickhouse,
        DialectId::Mssql,
        DialectId::Oracle,
        DialectId::Sqlite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialectId::Postgresql => "postgresql",
            DialectId::Cockroachdb => "cockroachdb",
            DialectId::Hydra => "hydra",
            DialectId::Neon => "neon",
            DialectId::Supabase => "supabase",
            DialectId::Mysql => "mysql",
            DialectId::Mariadb => "mariadb",
            DialectId::Tidb => "tidb",
            DialectId::Snowflake => "snowflake",
            DialectId::Clickhouse => "clickhouse",
            DialectId::Mssql => "mssql",
            DialectId::Oracle => "oracle",
            DialectId::Sqlite => "sqlite",
        }
    }

    pub fn policy(&self) -> DialectPolicy {
        match self {
            DialectId::Postgresql
            | DialectId::Cockroachdb
            | DialectId::Hydra
            | DialectId::Neon
            | DialectId::Supabase => DialectPolicy::postgres(),
            DialectId::Mysql | DialectId::Mariadb | DialectId::Tidb => DialectPolicy::mysql(),
            DialectId::Snowflake => DialectPolicy::snowflake(),
            DialectId::Clickhouse => DialectPolicy::clickhouse(),
            DialectId::Mssql => DialectPolicy::mssql(),
            DialectId::Oracle => DialectPolicy::oracle(),
            DialectId::Sqlite => DialectPolicy::sqlite(),
        }
    }
}

impl fmt::Display for DialectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectId {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "postgres" | "pg" => return Ok(DialectId::Postgresql),
            "sqlserver" => return Ok(DialectId::Mssql),
            _ => {}
        }
        DialectId::ALL
            .iter()
            .find(|id| id.as_str() == lowered)
            .copied()
            .ok_or_else(|| DialectError::UnknownDialect(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_marker() {
        let mut s = String::new();
        PlaceholderStyle::Positional.write_marker(12, &mut s);
        s.push(' ');
        PlaceholderStyle::QuestionMark.write_marker(3, &mut s);
        s.push(' ');
        PlaceholderStyle::Named.write_marker(2, &mut s);
        s.push(' ');
        PlaceholderStyle::AtNamed.write_marker(1, &mut s);
        assert_eq!(s, "$12 ? :2 @p1");
    }

    #[test]
    fn test_escape_doubled_quote() {
        let policy = DialectPolicy::postgres();
        assert_eq!(policy.escape_str("it's"), "it''s");
        assert_eq!(policy.quote_str(r"a\b"), r"'a\b'");
    }

    #[test]
    fn test_escape_backslash() {
        let policy = DialectPolicy::mysql();
        assert_eq!(policy.escape_str("it's"), r"it\'s");
        assert_eq!(policy.quote_str(r"a\b"), r"'a\\b'");
        assert_eq!(policy.escape_quoted(r#"say "hi""#, '"'), r#"say \"hi\""#);
    }

    #[test]
    fn test_unescape_quoted() {
        let pg = DialectPolicy::postgres();
        assert_eq!(pg.unescape_quoted("it''s", '\''), "it's");
        assert_eq!(pg.unescape_quoted(r"a\n", '\''), r"a\n");

        let mysql = DialectPolicy::mysql();
        assert_eq!(mysql.unescape_quoted(r"it\'s", '\''), "it's");
        assert_eq!(mysql.unescape_quoted("it''s", '\''), "it's");
        assert_eq!(mysql.unescape_quoted(r#"a\"b"#, '"'), r#"a"b"#);
        assert_eq!(mysql.unescape_quoted(r"100\%\n", '\''), "100\\%\n");
    }

    #[test]
    fn test_escape_ident() {
        let pg = DialectPolicy::postgres();
        assert_eq!(pg.escape_ident(r#"a"b"#, '"'), r#"a""b"#);
        assert_eq!(DialectPolicy::mysql().escape_ident("a`b", '`'), "a``b");
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("postgresql".parse::<DialectId>(), Ok(DialectId::Postgresql));
        assert_eq!("Postgres".parse::<DialectId>(), Ok(DialectId::Postgresql));
        assert_eq!("TiDB".parse::<DialectId>(), Ok(DialectId::Tidb));
        assert_eq!("sqlserver".parse::<DialectId>(), Ok(DialectId::Mssql));
        assert_eq!(
            "dynamodb".parse::<DialectId>(),
            Err(DialectError::UnknownDialect("dynamodb".to_string()))
        );
        for id in DialectId::ALL {
            assert_eq!(id.to_string().parse::<DialectId>(), Ok(id));
        }
    }

    #[test]
    fn test_dialect_policies() {
        assert_eq!(
            DialectId::Mariadb.policy().placeholder_style,
            PlaceholderStyle::QuestionMark
        );
        assert_eq!(
            DialectId::Supabase.policy().placeholder_style,
            PlaceholderStyle::Positional
        );
        assert_eq!(DialectId::Oracle.policy().placeholder_style, PlaceholderStyle::Named);
        assert!(DialectId::Mysql.policy().hash_comments);
        assert!(!DialectId::Postgresql.policy().hash_comments);
    }
}
