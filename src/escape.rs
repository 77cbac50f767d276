//! Template escaping: turn a query template plus run context into SQL.
//!
//! Safe mode replaces every placeholder with a dialect bind marker and
//! returns the resolved values separately, so user data never becomes SQL
//! text. Unsafe mode splices the values into the text with best-effort
//! literal quoting; callers opt into it explicitly.
//!
//! Where a placeholder sits is decided by lexing the template with the
//! dialect's quoting rules:
//!
//! - Plain SQL text: safe mode binds the value, unsafe mode inlines it,
//!   quoting strings.
//! - The whole body of a string literal (`'{{trigger.body.email}}'`): safe
//!   mode replaces the literal, quotes included, with one marker bound to the
//!   value.
//! - Part of a longer literal (`'%{{q}}%'`): safe mode replaces the literal
//!   with one marker bound to the literal's text with every placeholder
//!   filled in. Unsafe mode escapes the value for the enclosing quote and
//!   never adds quotes of its own.
//! - A quoted identifier: cannot be bound, so safe mode fails. Unsafe mode
//!   escapes the value for the identifier quote.
//! - A comment: left untouched in both modes.

use crate::dialect::DialectPolicy;
use crate::sql::{LexError, Lexer, TokenKind};
use crate::template::{extract_placeholders, Context, PlaceholderError, PlaceholderSpan, Value};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use thiserror::Error;

/// Escaping strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapeMode {
    /// Bind values as query parameters.
    Safe,
    /// Inline values into the SQL text. Not injection-safe.
    Unsafe,
}

impl fmt::Display for EscapeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscapeMode::Safe => f.write_str("safe"),
            EscapeMode::Unsafe => f.write_str("unsafe"),
        }
    }
}

/// What unsafe mode does with a path missing from the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsafeMissing {
    /// Substitute an empty string.
    #[default]
    Empty,
    /// Fail like safe mode does.
    Error,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscapeError {
    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),

    #[error("Cannot scan template: {0}")]
    Lex(#[from] LexError),

    #[error("Placeholder {{{{{path}}}}} at offset {offset} is inside a quoted identifier and cannot be bound")]
    QuotedIdentifier { path: String, offset: usize },
}

/// Output of one escaping call. `bind_values` is empty in unsafe mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EscapeResult {
    pub rewritten_sql: String,
    pub bind_values: Vec<Value>,
    pub mode: EscapeMode,
}

/// A quoted or commented stretch of the template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Region {
    Literal { range: Range<usize>, quote: char },
    Identifier { range: Range<usize>, quote: char },
    Comment { range: Range<usize> },
}

impl Region {
    fn range(&self) -> &Range<usize> {
        match self {
            Region::Literal { range, .. }
            | Region::Identifier { range, .. }
            | Region::Comment { range } => range,
        }
    }

    fn contains(&self, span: &PlaceholderSpan) -> bool {
        self.range().start <= span.start && span.end <= self.range().end
    }

    fn overlaps(&self, span: &PlaceholderSpan) -> bool {
        self.range().start < span.end && span.start < self.range().end
    }
}

/// Rewrites templates for one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Escaper {
    dialect: DialectPolicy,
    unsafe_missing: UnsafeMissing,
}

impl Escaper {
    pub fn new(dialect: DialectPolicy) -> Self {
        Self {
            dialect,
            unsafe_missing: UnsafeMissing::default(),
        }
    }

    pub fn with_unsafe_missing(mut self, unsafe_missing: UnsafeMissing) -> Self {
        self.unsafe_missing = unsafe_missing;
        self
    }

    pub fn dialect(&self) -> &DialectPolicy {
        &self.dialect
    }

    pub fn escape(
        &self,
        template: &str,
        ctx: &Context,
        mode: EscapeMode,
    ) -> Result<EscapeResult, EscapeError> {
        let spans = extract_placeholders(template)?;
        let placements = self.place(template, &spans)?;
        debug!("escaping template with {} placeholder(s) in {} mode", spans.len(), mode);
        match mode {
            EscapeMode::Safe => self.escape_safe(template, &spans, &placements, ctx),
            EscapeMode::Unsafe => self.escape_unsafe(template, &spans, &placements, ctx),
        }
    }

    /// Quoted and commented regions of `template`, in order.
    fn regions(&self, template: &str) -> Result<Vec<Region>, LexError> {
        let identifier_quote = self.dialect.quote_style.identifier;
        let mut regions = Vec::new();
        for token in Lexer::with_dialect(template, self.dialect).keep_comments(true) {
            let token = token?;
            let range = token.offset..token.offset + token.text.len();
            let first = token.text.chars().next();
            let region = match (token.kind, first) {
                (TokenKind::String, Some(quote)) => Region::Literal { range, quote },
                (TokenKind::Identifier, Some(quote)) if quote == identifier_quote || quote == '"' => {
                    Region::Identifier { range, quote }
                }
                (TokenKind::Comment, _) => Region::Comment { range },
                _ => continue,
            };
            regions.push(region);
        }
        Ok(regions)
    }

    /// The region enclosing each span, `None` for plain SQL text.
    fn place(
        &self,
        template: &str,
        spans: &[PlaceholderSpan],
    ) -> Result<Vec<Option<Region>>, EscapeError> {
        if spans.is_empty() {
            return Ok(Vec::new());
        }
        let regions = self.regions(template)?;
        spans
            .iter()
            .map(|span| match regions.iter().find(|r| r.overlaps(span)) {
                None => Ok(None),
                Some(region) if region.contains(span) => Ok(Some(region.clone())),
                Some(_) => Err(PlaceholderError::malformed(
                    template,
                    span.start,
                    "placeholder crosses a quote or comment boundary",
                )
                .into()),
            })
            .collect()
    }

    fn escape_safe(
        &self,
        template: &str,
        spans: &[PlaceholderSpan],
        placements: &[Option<Region>],
        ctx: &Context,
    ) -> Result<EscapeResult, EscapeError> {
        // Resolve everything first so a failure never yields partial output
        let mut values = Vec::with_capacity(spans.len());
        for (span, placement) in spans.iter().zip(placements) {
            let value = match placement {
                Some(Region::Comment { .. }) => Value::Null,
                Some(Region::Identifier { .. }) => {
                    return Err(EscapeError::QuotedIdentifier {
                        path: span.path.clone(),
                        offset: span.start,
                    });
                }
                _ => ctx.resolve(&span.path)?,
            };
            values.push(value);
        }

        let mut out = String::with_capacity(template.len());
        let mut bind_values = Vec::new();
        let mut last = 0;
        let mut i = 0;
        while i < spans.len() {
            match &placements[i] {
                None => {
                    out.push_str(&template[last..spans[i].start]);
                    last = spans[i].end;
                    bind_values.push(values[i].clone());
                    i += 1;
                }
                Some(Region::Literal { range, quote }) => {
                    let group = placements[i..]
                        .iter()
                        .take_while(|p| matches!(p, Some(region) if region.range() == range))
                        .count();
                    let value = if group == 1 && is_whole_body(&spans[i], range, *quote) {
                        values[i].clone()
                    } else {
                        Value::String(self.literal_text(
                            template,
                            range,
                            *quote,
                            &spans[i..i + group],
                            &values[i..i + group],
                        ))
                    };
                    out.push_str(&template[last..range.start]);
                    last = range.end;
                    bind_values.push(value);
                    i += group;
                }
                Some(_) => {
                    i += 1;
                    continue;
                }
            }
            self.dialect
                .placeholder_style
                .write_marker(bind_values.len(), &mut out);
        }
        out.push_str(&template[last..]);

        Ok(EscapeResult {
            rewritten_sql: out,
            bind_values,
            mode: EscapeMode::Safe,
        })
    }

    fn escape_unsafe(
        &self,
        template: &str,
        spans: &[PlaceholderSpan],
        placements: &[Option<Region>],
        ctx: &Context,
    ) -> Result<EscapeResult, EscapeError> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for (span, placement) in spans.iter().zip(placements) {
            if let Some(Region::Comment { .. }) = placement {
                continue;
            }
            let value = match ctx.lookup(&span.path) {
                Ok(json) => Value::from_json(json).unwrap_or_else(|| Value::String(json.to_string())),
                Err(e @ PlaceholderError::PathNotFound { .. }) => match self.unsafe_missing {
                    UnsafeMissing::Empty => {
                        warn!("unresolved placeholder {{{{{}}}}} replaced with empty string", span.path);
                        Value::String(String::new())
                    }
                    UnsafeMissing::Error => return Err(e.into()),
                },
                Err(e) => return Err(e.into()),
            };
            let rendered = match placement {
                Some(Region::Literal { quote, .. }) => self.dialect.escape_quoted(&value.to_text(), *quote),
                Some(Region::Identifier { quote, .. }) => self.dialect.escape_ident(&value.to_text(), *quote),
                _ => self.render_bare(&value),
            };
            out.push_str(&template[last..span.start]);
            out.push_str(&rendered);
            last = span.end;
        }
        out.push_str(&template[last..]);

        Ok(EscapeResult {
            rewritten_sql: out,
            bind_values: Vec::new(),
            mode: EscapeMode::Unsafe,
        })
    }

    /// Text of a literal with its placeholders filled in, escapes decoded.
    fn literal_text(
        &self,
        template: &str,
        range: &Range<usize>,
        quote: char,
        spans: &[PlaceholderSpan],
        values: &[Value],
    ) -> String {
        let body_end = range.end - quote.len_utf8();
        let mut text = String::new();
        let mut cursor = range.start + quote.len_utf8();
        for (span, value) in spans.iter().zip(values) {
            text.push_str(&self.dialect.unescape_quoted(&template[cursor..span.start], quote));
            text.push_str(&value.to_text());
            cursor = span.end;
        }
        text.push_str(&self.dialect.unescape_quoted(&template[cursor..body_end], quote));
        text
    }

    /// Unsafe-mode text for a value in plain SQL: strings gain quotes.
    fn render_bare(&self, value: &Value) -> String {
        match value {
            Value::String(s) => self.dialect.quote_str(s),
            other => other.to_string(),
        }
    }
}

/// The span is the entire body of the literal: `'{{path}}'`.
fn is_whole_body(span: &PlaceholderSpan, literal: &Range<usize>, quote: char) -> bool {
    span.start == literal.start + quote.len_utf8() && span.end + quote.len_utf8() == literal.end
}

/// Escape `template` against `ctx` for `dialect`.
pub fn escape(
    template: &str,
    ctx: &Context,
    mode: EscapeMode,
    dialect: &DialectPolicy,
) -> Result<EscapeResult, EscapeError> {
    Escaper::new(*dialect).escape(template, ctx, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Context {
        Context::from_json(json!({
            "trigger": {"body": {"email": "a@b.com", "name": "O'Brien"}},
            "ctx": {"id": 5, "active": true, "none": null, "tags": ["x"]},
            "a": "first",
            "b": 2
        }))
        .unwrap()
    }

    #[test]
    fn test_safe_quoted_placeholder_becomes_parameter() {
        let result = escape(
            "SELECT * FROM users WHERE email = '{{trigger.body.email}}';",
            &ctx(),
            EscapeMode::Safe,
            &DialectPolicy::postgres(),
        )
        .unwrap();
        assert_eq!(result.rewritten_sql, "SELECT * FROM users WHERE email = $1;");
        assert_eq!(result.bind_values, vec![Value::from("a@b.com")]);
    }

    #[test]
    fn test_safe_bare_placeholder() {
        let result = escape(
            "DELETE FROM users WHERE id = {{ctx.id}};",
            &ctx(),
            EscapeMode::Safe,
            &DialectPolicy::postgres(),
        )
        .unwrap();
        assert_eq!(result.rewritten_sql, "DELETE FROM users WHERE id = $1;");
        assert_eq!(result.bind_values, vec![Value::Int(5)]);
    }

    #[test]
    fn test_safe_binds_per_occurrence() {
        let result = escape(
            "SELECT {{a}}, {{b}}, {{a}}",
            &ctx(),
            EscapeMode::Safe,
            &DialectPolicy::postgres(),
        )
        .unwrap();
        assert_eq!(result.rewritten_sql, "SELECT $1, $2, $3");
        assert_eq!(
            result.bind_values,
            vec![Value::from("first"), Value::Int(2), Value::from("first")]
        );
    }

    #[test]
    fn test_safe_marker_styles() {
        let template = "UPDATE t SET a = {{a}} WHERE b = {{b}}";
        let cases = [
            (DialectPolicy::mysql(), "UPDATE t SET a = ? WHERE b = ?"),
            (DialectPolicy::oracle(), "UPDATE t SET a = :1 WHERE b = :2"),
            (DialectPolicy::mssql(), "UPDATE t SET a = @p1 WHERE b = @p2"),
        ];
        for (dialect, expected) in cases {
            let result = escape(template, &ctx(), EscapeMode::Safe, &dialect).unwrap();
            assert_eq!(result.rewritten_sql, expected);
            assert_eq!(result.bind_values.len(), 2);
        }
    }

    #[test]
    fn test_safe_fails_fast_on_first_bad_path() {
        let err = escape(
            "SELECT {{a}}, {{missing.one}}, {{ctx}}",
            &ctx(),
            EscapeMode::Safe,
            &DialectPolicy::postgres(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EscapeError::Placeholder(PlaceholderError::PathNotFound {
                path: "missing.one".to_string()
            })
        );

        let err = escape("SELECT {{ctx}}", &ctx(), EscapeMode::Safe, &DialectPolicy::postgres())
            .unwrap_err();
        assert_eq!(
            err,
            EscapeError::Placeholder(PlaceholderError::PathNotScalar {
                path: "ctx".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_template_fails_in_both_modes() {
        for mode in [EscapeMode::Safe, EscapeMode::Unsafe] {
            let err = escape("SELECT {{a{{b}} FROM t;", &ctx(), mode, &DialectPolicy::postgres())
                .unwrap_err();
            assert!(matches!(
                err,
                EscapeError::Placeholder(PlaceholderError::MalformedPlaceholder { offset: 10, .. })
            ));
        }
    }

    #[test]
    fn test_safe_preserves_comments_and_whitespace() {
        let template = "/* lookup */\n  SELECT *   -- by id\nFROM t WHERE id = {{ctx.id}}\n";
        let result = escape(template, &ctx(), EscapeMode::Safe, &DialectPolicy::postgres()).unwrap();
        assert_eq!(
            result.rewritten_sql,
            "/* lookup */\n  SELECT *   -- by id\nFROM t WHERE id = $1\n"
        );
    }

    #[test]
    fn test_touching_literals() {
        let pg = DialectPolicy::postgres();
        let result = escape("'{{a}}' '{{b}}'{{b}}''", &ctx(), EscapeMode::Safe, &pg).unwrap();
        assert_eq!(result.rewritten_sql, "$1 $2$3''");
        assert_eq!(
            result.bind_values,
            vec![Value::from("first"), Value::Int(2), Value::Int(2)]
        );

        // A doubled quote continues the literal instead of closing it
        let result = escape("SELECT '{{a}}''{{b}}'", &ctx(), EscapeMode::Safe, &pg).unwrap();
        assert_eq!(result.rewritten_sql, "SELECT $1");
        assert_eq!(result.bind_values, vec![Value::from("first'2")]);
    }

    #[test]
    fn test_unterminated_literal_in_template() {
        for mode in [EscapeMode::Safe, EscapeMode::Unsafe] {
            let err = escape("SELECT '{{a}}", &ctx(), mode, &DialectPolicy::postgres()).unwrap_err();
            assert!(matches!(
                err,
                EscapeError::Lex(LexError::UnterminatedLiteral { .. })
            ));
        }
        // Without placeholders the template is not scanned
        let result = escape("SELECT 'x", &ctx(), EscapeMode::Safe, &DialectPolicy::postgres()).unwrap();
        assert_eq!(result.rewritten_sql, "SELECT 'x");
    }

    #[test]
    fn test_safe_partial_literal_binds_whole_literal() {
        let result = escape(
            "SELECT * FROM t WHERE name LIKE '%{{trigger.body.name}}%' AND id = {{ctx.id}}",
            &ctx(),
            EscapeMode::Safe,
            &DialectPolicy::postgres(),
        )
        .unwrap();
        assert_eq!(result.rewritten_sql, "SELECT * FROM t WHERE name LIKE $1 AND id = $2");
        assert_eq!(
            result.bind_values,
            vec![Value::from("%O'Brien%"), Value::Int(5)]
        );

        let result = escape(
            r"SELECT 'it's {{a}} at 100\%'",
            &ctx(),
            EscapeMode::Safe,
            &DialectPolicy::mysql(),
        )
        .unwrap();
        assert_eq!(result.rewritten_sql, "SELECT ?");
        assert_eq!(result.bind_values, vec![Value::from(r"it's first at 100\%")]);
    }

    #[test]
    fn test_mysql_double_quoted_literal() {
        let template = r#"SELECT * FROM t WHERE a = "{{trigger.body.name}}" AND b = `{{a}}`"#;
        let mysql = DialectPolicy::mysql();

        let result = escape(template, &ctx(), EscapeMode::Unsafe, &mysql).unwrap();
        assert_eq!(
            result.rewritten_sql,
            r#"SELECT * FROM t WHERE a = "O'Brien" AND b = `first`"#
        );

        let result = escape(
            r#"SELECT * FROM t WHERE a = "{{trigger.body.name}}""#,
            &ctx(),
            EscapeMode::Safe,
            &mysql,
        )
        .unwrap();
        assert_eq!(result.rewritten_sql, "SELECT * FROM t WHERE a = ?");
        assert_eq!(result.bind_values, vec![Value::from("O'Brien")]);

        let ctx = Context::new().with("q", json!(r#"x" OR "1"="1"#));
        let result = escape(r#"SELECT "%{{q}}%""#, &ctx, EscapeMode::Unsafe, &mysql).unwrap();
        assert_eq!(result.rewritten_sql, r#"SELECT "%x" OR "1"="1%""#);
    }

    #[test]
    fn test_quoted_identifier() {
        let pg = DialectPolicy::postgres();
        let err = escape(r#"SELECT * FROM "{{a}}""#, &ctx(), EscapeMode::Safe, &pg).unwrap_err();
        assert_eq!(
            err,
            EscapeError::QuotedIdentifier {
                path: "a".to_string(),
                offset: 15
            }
        );

        let ctx = Context::new().with("t", json!(r#"x"; DROP TABLE y; --"#));
        let result = escape(r#"SELECT * FROM "{{t}}""#, &ctx, EscapeMode::Unsafe, &pg).unwrap();
        assert_eq!(result.rewritten_sql, r#"SELECT * FROM "x""; DROP TABLE y; --""#);
    }

    #[test]
    fn test_placeholders_in_comments_are_left_alone() {
        let template = "-- by {{a}}\nSELECT {{b}} /* {{missing}} */";
        let pg = DialectPolicy::postgres();

        let result = escape(template, &ctx(), EscapeMode::Safe, &pg).unwrap();
        assert_eq!(result.rewritten_sql, "-- by {{a}}\nSELECT $1 /* {{missing}} */");
        assert_eq!(result.bind_values, vec![Value::Int(2)]);

        let result = escape(template, &ctx(), EscapeMode::Unsafe, &pg).unwrap();
        assert_eq!(result.rewritten_sql, "-- by {{a}}\nSELECT 2 /* {{missing}} */");
    }

    #[test]
    fn test_placeholder_across_comment_boundary() {
        let err = escape("SELECT /*{{a*/}}", &ctx(), EscapeMode::Safe, &DialectPolicy::postgres())
            .unwrap_err();
        assert!(matches!(
            err,
            EscapeError::Placeholder(PlaceholderError::MalformedPlaceholder { offset: 9, .. })
        ));
    }

    #[test]
    fn test_unsafe_inlines_values() {
        let result = escape(
            "SELECT * FROM users WHERE name = '{{trigger.body.name}}' AND id = {{ctx.id}} AND active = {{ctx.active}}",
            &ctx(),
            EscapeMode::Unsafe,
            &DialectPolicy::postgres(),
        )
        .unwrap();
        assert_eq!(
            result.rewritten_sql,
            "SELECT * FROM users WHERE name = 'O''Brien' AND id = 5 AND active = true"
        );
        assert!(result.bind_values.is_empty());
    }

    #[test]
    fn test_unsafe_quotes_bare_strings() {
        let result = escape(
            "SELECT {{trigger.body.name}}, {{ctx.none}}, '{{ctx.none}}'",
            &ctx(),
            EscapeMode::Unsafe,
            &DialectPolicy::mysql(),
        )
        .unwrap();
        assert_eq!(result.rewritten_sql, r"SELECT 'O\'Brien', NULL, ''");
    }

    #[test]
    fn test_unsafe_stays_inside_enclosing_literal() {
        let template = "SELECT * FROM t WHERE name LIKE '%{{q}}%'";
        let cases = [
            ("abc", DialectPolicy::postgres(), "SELECT * FROM t WHERE name LIKE '%abc%'"),
            (
                "1' OR '1'='1",
                DialectPolicy::postgres(),
                "SELECT * FROM t WHERE name LIKE '%1'' OR ''1''=''1%'",
            ),
            (
                r"1\' OR 1=1 --",
                DialectPolicy::mysql(),
                r"SELECT * FROM t WHERE name LIKE '%1\\\' OR 1=1 --%'",
            ),
        ];
        for (q, dialect, expected) in cases {
            let ctx = Context::new().with("q", json!(q));
            let result = escape(template, &ctx, EscapeMode::Unsafe, &dialect).unwrap();
            assert_eq!(result.rewritten_sql, expected);

            // The value never closes the literal it sits in
            let tokens: Vec<_> = Lexer::with_dialect(&result.rewritten_sql, dialect)
                .map(|t| t.unwrap())
                .collect();
            assert_eq!(tokens.last().unwrap().kind, TokenKind::String);
            assert_eq!(tokens.len(), 8);
        }

        let result = escape(
            "SELECT 'Mr {{trigger.body.name}}'",
            &ctx(),
            EscapeMode::Unsafe,
            &DialectPolicy::postgres(),
        )
        .unwrap();
        assert_eq!(result.rewritten_sql, "SELECT 'Mr O''Brien'");
    }

    #[test]
    fn test_unsafe_renders_containers_as_json() {
        let result = escape("SELECT '{{ctx.tags}}'", &ctx(), EscapeMode::Unsafe, &DialectPolicy::postgres())
            .unwrap();
        assert_eq!(result.rewritten_sql, r#"SELECT '["x"]'"#);
    }

    #[test]
    fn test_unsafe_missing_path() {
        let template = "SELECT * FROM t WHERE a = '{{nope}}'";
        let result = escape(template, &ctx(), EscapeMode::Unsafe, &DialectPolicy::postgres()).unwrap();
        assert_eq!(result.rewritten_sql, "SELECT * FROM t WHERE a = ''");

        let strict = Escaper::new(DialectPolicy::postgres()).with_unsafe_missing(UnsafeMissing::Error);
        assert_eq!(
            strict.escape(template, &ctx(), EscapeMode::Unsafe),
            Err(EscapeError::Placeholder(PlaceholderError::PathNotFound {
                path: "nope".to_string()
            }))
        );
    }

    #[test]
    fn test_no_placeholders_is_identity() {
        let sql = "SELECT 1 -- {{ not closed";
        // An unclosed delimiter is still malformed, even after a comment marker
        assert!(escape(sql, &ctx(), EscapeMode::Safe, &DialectPolicy::postgres()).is_err());

        let sql = "SELECT 1 /* plain */";
        for mode in [EscapeMode::Safe, EscapeMode::Unsafe] {
            let result = escape(sql, &ctx(), mode, &DialectPolicy::postgres()).unwrap();
            assert_eq!(result.rewritten_sql, sql);
        }
    }
}
