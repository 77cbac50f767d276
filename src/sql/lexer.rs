// SQL lexer - splits SQL text into classified tokens

use super::error::{LexError, LexResult};
use super::token::{Keyword, Token, TokenKind};
use crate::dialect::DialectPolicy;

const TWO_CHAR_OPERATORS: [&str; 8] = ["<=", ">=", "<>", "!=", "||", "::", "->", "=>"];

pub struct Lexer<'a> {
    input: &'a str,
    /// Byte offset of the next unread character
    position: usize,
    line: u32,
    dialect: DialectPolicy,
    keep_comments: bool,
    peeked: Option<LexResult<Token>>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::with_dialect(input, DialectPolicy::default())
    }

    pub fn with_dialect(input: &'a str, dialect: DialectPolicy) -> Self {
        Lexer {
            input,
            position: 0,
            line: 1,
            dialect,
            keep_comments: false,
            peeked: None,
            finished: false,
        }
    }

    /// Build a lexer over raw bytes, rejecting input that is not valid UTF-8.
    pub fn from_bytes(bytes: &'a [u8]) -> LexResult<Self> {
        match std::str::from_utf8(bytes) {
            Ok(input) => Ok(Self::new(input)),
            Err(e) => {
                let offset = e.valid_up_to();
                let newlines = bytes[..offset].iter().filter(|b| **b == b'\n').count();
                Err(LexError::InvalidByteSequence {
                    line: 1 + newlines as u32,
                    offset,
                })
            }
        }
    }

    /// Emit comment tokens instead of discarding them.
    pub fn keep_comments(mut self, keep: bool) -> Self {
        self.keep_comments = keep;
        self
    }

    /// Current 1-based line of the cursor.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Get the next significant token from the input.
    ///
    /// Returns an EOF token once the input is exhausted, on every call.
    pub fn next_token(&mut self) -> LexResult<Token> {
        if let Some(peeked) = self.peeked.take() {
            return peeked;
        }
        self.scan_token()
    }

    /// Return the next token without consuming it.
    pub fn peek(&mut self) -> LexResult<Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.scan_token(),
        };
        self.peeked = Some(token.clone());
        token
    }

    /// Kind of the next token, without consuming it.
    pub fn look_ahead(&mut self) -> LexResult<TokenKind> {
        Ok(self.peek()?.kind)
    }

    /// Consume the next token, failing unless it has the expected kind.
    pub fn next_token_is(&mut self, expected: TokenKind) -> LexResult<Token> {
        let token = self.next_token()?;
        if token.kind == expected {
            return Ok(token);
        }
        let found = if token.kind.is_keyword() || token.text.is_empty() {
            token.kind.to_string()
        } else {
            format!("{} '{}'", token.kind, token.text)
        };
        Err(LexError::UnexpectedToken {
            line: token.line,
            expected: expected.to_string(),
            found,
        })
    }

    /// Check whether the next token is the given keyword, ignoring case.
    pub fn next_sql_is(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Ok(token) => token.kind.is_keyword() && token.text.eq_ignore_ascii_case(keyword),
            Err(_) => false,
        }
    }

    /// Advance past any run of whitespace and comments.
    pub fn skip_ignored(&mut self) -> LexResult<()> {
        match &self.peeked {
            Some(Ok(token)) if token.kind == TokenKind::Comment => self.peeked = None,
            Some(_) => return Ok(()),
            None => {}
        }
        self.skip_trivia()
    }

    /// Tokenize the entire input. The last token is always EOF.
    pub fn tokenize(&mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let eof = token.is_eof();
            tokens.push(token);
            if eof {
                return Ok(tokens);
            }
        }
    }

    fn current(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    fn starts_with(&self, pattern: &str) -> bool {
        self.input[self.position..].starts_with(pattern)
    }

    /// Advance one character, counting newlines
    fn bump(&mut self) -> Option<char> {
        let c = self.current()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn at_comment(&self) -> bool {
        self.starts_with("--")
            || self.starts_with("/*")
            || (self.dialect.hash_comments && self.current() == Some('#'))
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            if !c.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    fn skip_trivia(&mut self) -> LexResult<()> {
        loop {
            self.skip_whitespace();
            if !self.at_comment() {
                return Ok(());
            }
            self.read_comment()?;
        }
    }

    /// Consume one comment; the cursor must be on its opening characters.
    fn read_comment(&mut self) -> LexResult<()> {
        if self.starts_with("/*") {
            let line = self.line;
            self.bump();
            self.bump();
            loop {
                if self.starts_with("*/") {
                    self.bump();
                    self.bump();
                    return Ok(());
                }
                if self.bump().is_none() {
                    return Err(LexError::UnterminatedComment {
                        line: self.line,
                        start_line: line,
                    });
                }
            }
        }
        // Line comment; the newline is left for whitespace skipping
        while let Some(c) = self.current() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
        Ok(())
    }

    fn scan_token(&mut self) -> LexResult<Token> {
        if self.keep_comments {
            self.skip_whitespace();
            if self.at_comment() {
                let (start, line) = (self.position, self.line);
                self.read_comment()?;
                return Ok(self.token_from(TokenKind::Comment, start, line));
            }
        } else {
            self.skip_trivia()?;
        }

        let (start, line) = (self.position, self.line);
        let Some(c) = self.current() else {
            self.finished = true;
            return Ok(Token::eof(line, start));
        };

        let quotes = self.dialect.quote_style;
        let kind = match c {
            c if c == quotes.string => {
                self.read_quoted(c, line, self.dialect.backslash_escapes())?;
                TokenKind::String
            }
            '"' if quotes.identifier != '"' => {
                // MySQL family treats double quotes as string delimiters
                self.read_quoted('"', line, self.dialect.backslash_escapes())?;
                TokenKind::String
            }
            c if c == quotes.identifier || c == '"' => {
                self.read_quoted(c, line, false)?;
                TokenKind::Identifier
            }
            '{' if self.starts_with("{{") => self.read_template(),
            '?' => {
                self.bump();
                TokenKind::Placeholder
            }
            '$' if self.peek_char().is_some_and(|n| n.is_ascii_digit()) => {
                self.bump();
                self.eat_while(|c| c.is_ascii_digit());
                TokenKind::Placeholder
            }
            ':' | '@' if self.peek_char().is_some_and(is_word_start) => {
                self.bump();
                self.eat_while(is_word_char);
                TokenKind::Placeholder
            }
            c if c.is_ascii_digit() => self.read_number(),
            '.' if self.peek_char().is_some_and(|n| n.is_ascii_digit()) => self.read_number(),
            c if is_word_start(c) => self.read_word(),
            c if is_operator_char(c) => self.read_operator(),
            _ => {
                self.bump();
                TokenKind::Invalid
            }
        };

        Ok(self.token_from(kind, start, line))
    }

    fn token_from(&self, kind: TokenKind, start: usize, line: u32) -> Token {
        Token::new(kind, &self.input[start..self.position], line, start)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.current() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
    }

    /// Read a quoted literal or identifier, doubled quotes included.
    fn read_quoted(&mut self, quote: char, line: u32, backslash: bool) -> LexResult<()> {
        let unterminated = |lexer: &Self| LexError::UnterminatedLiteral {
            line: lexer.line,
            start_line: line,
        };
        self.bump(); // Skip opening quote
        loop {
            match self.bump() {
                None => return Err(unterminated(self)),
                Some('\\') if backslash => {
                    if self.bump().is_none() {
                        return Err(unterminated(self));
                    }
                }
                Some(c) if c == quote => {
                    if self.current() == Some(quote) {
                        self.bump();
                    } else {
                        return Ok(());
                    }
                }
                Some(_) => {}
            }
        }
    }

    /// Read a `{{ ... }}` template span. An unclosed span is an invalid token;
    /// the template extractor reports the precise problem.
    fn read_template(&mut self) -> TokenKind {
        self.bump();
        self.bump();
        loop {
            if self.starts_with("}}") {
                self.bump();
                self.bump();
                return TokenKind::Placeholder;
            }
            if self.bump().is_none() {
                return TokenKind::Invalid;
            }
        }
    }

    /// Read a number (integer, decimal or exponent form)
    fn read_number(&mut self) -> TokenKind {
        self.eat_while(|c| c.is_ascii_digit());
        if self.current() == Some('.') {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }
        if matches!(self.current(), Some('e' | 'E')) {
            let rest = &self.input[self.position + 1..];
            let digits = rest.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(rest);
            if digits.starts_with(|c: char| c.is_ascii_digit()) {
                self.bump();
                if matches!(self.current(), Some('+' | '-')) {
                    self.bump();
                }
                self.eat_while(|c| c.is_ascii_digit());
            }
        }
        TokenKind::Number
    }

    /// Read an identifier or keyword
    fn read_word(&mut self) -> TokenKind {
        let start = self.position;
        self.eat_while(is_word_char);
        match Keyword::from_word(&self.input[start..self.position]) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier,
        }
    }

    fn read_operator(&mut self) -> TokenKind {
        if TWO_CHAR_OPERATORS.iter().any(|op| self.starts_with(op)) {
            self.bump();
        }
        self.bump();
        TokenKind::Operator
    }
}

impl Iterator for Lexer<'_> {
    type Item = LexResult<Token>;

    /// Yields tokens up to, but not including, EOF. Stops after the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished && self.peeked.is_none() {
            return None;
        }
        match self.next_token() {
            Ok(token) if token.is_eof() => {
                self.finished = true;
                None
            }
            Ok(token) => Some(Ok(token)),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | ',' | ';' | '.' | '*' | '+' | '-' | '/' | '%' | '=' | '<' | '>' | '!' | '|'
            | '&' | '^' | '~' | '[' | ']' | ':' | '#'
    )
}
