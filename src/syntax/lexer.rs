//! Tokenizer for Java source text.
//!
//! Produces a flat token stream with 1-based positions. Comments and
//! whitespace are dropped. `>` is never merged into `>>` or `>>>` so the
//! parser can close nested generic argument lists; the `joint` flag lets it
//! rebuild shift operators inside expressions.

use crate::utils::error::SyntaxError;

/// Category of a lexed token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Keyword,
    Int,
    Float,
    Char,
    Str,
    TextBlock,
    Punct,
    Eof,
}

/// A single token with its source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
    /// True when the next token follows without any whitespace or comment
    pub joint: bool,
}

impl Token {
    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == text
    }
}

const KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null",
];

// Longest first, so the first prefix match wins
const PUNCTUATION: &[&str] = &[
    ">>>=", "<<=", ">>=", "...", "->", "::", "++", "--", "&&", "||", "==", "!=", "<=", ">=", "+=",
    "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<", "(", ")", "{", "}", "[", "]", ";", ",", ".",
    "@", "=", ">", "<", "!", "~", "?", ":", "+", "-", "*", "/", "&", "|", "^", "%",
];

/// Tokenize Java source
///
/// **Public** - entry point used by the parser
///
/// # Errors
/// * Unterminated string, char, text block or block comment
/// * Characters that cannot start any Java token
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
    };
    let mut tokens: Vec<Token> = Vec::new();

    loop {
        let had_gap = lexer.skip_trivia()?;
        if let Some(prev) = tokens.last_mut() {
            prev.joint = !had_gap;
        }
        if lexer.at_end() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                line: lexer.line,
                column: lexer.column,
                joint: false,
            });
            return Ok(tokens);
        }
        tokens.push(lexer.next_token()?);
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c))
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.line, self.column, message)
    }

    /// Skip whitespace and comments; returns whether anything was skipped
    fn skip_trivia(&mut self) -> Result<bool, SyntaxError> {
        let start = self.pos;
        loop {
            match self.peek(0) {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek(1) == Some('/') => {
                    while let Some(c) = self.peek(0) {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek(1) == Some('*') => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        if self.at_end() {
                            return Err(SyntaxError::new(line, column, "unterminated comment"));
                        }
                        if self.starts_with("*/") {
                            self.bump();
                            self.bump();
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return Ok(self.pos != start),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        let c = self.peek(0).ok_or_else(|| self.error("unexpected end of input"))?;

        let kind = if is_ident_start(c) {
            while self.peek(0).is_some_and(is_ident_part) {
                self.bump();
            }
            let word: String = self.chars[start..self.pos].iter().collect();
            if KEYWORDS.contains(&word.as_str()) {
                TokenKind::Keyword
            } else {
                TokenKind::Ident
            }
        } else if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|n| n.is_ascii_digit())) {
            self.lex_number()
        } else if self.starts_with("\"\"\"") {
            self.lex_text_block(line, column)?
        } else if c == '"' {
            self.lex_quoted('"', line, column)?;
            TokenKind::Str
        } else if c == '\'' {
            self.lex_quoted('\'', line, column)?;
            TokenKind::Char
        } else {
            let punct = PUNCTUATION
                .iter()
                .find(|p| self.starts_with(p))
                .ok_or_else(|| self.error(format!("unexpected character '{}'", c)))?;
            for _ in 0..punct.chars().count() {
                self.bump();
            }
            TokenKind::Punct
        };

        Ok(Token {
            kind,
            text: self.chars[start..self.pos].iter().collect(),
            line,
            column,
            joint: false,
        })
    }

    fn lex_number(&mut self) -> TokenKind {
        let radix_prefix = self.peek(0) == Some('0')
            && matches!(self.peek(1), Some('x' | 'X' | 'b' | 'B'));
        if radix_prefix {
            self.bump();
            self.bump();
            while self.peek(0).is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.bump();
            }
            if matches!(self.peek(0), Some('l' | 'L')) {
                self.bump();
            }
            return TokenKind::Int;
        }

        let mut is_float = false;
        self.eat_digits();
        if self.peek(0) == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            self.eat_digits();
        } else if self.peek(0) == Some('.') && !self.peek(1).is_some_and(is_ident_start) {
            // `1.` is a complete double literal
            is_float = true;
            self.bump();
        }
        if matches!(self.peek(0), Some('e' | 'E')) {
            let sign = matches!(self.peek(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..digit_at {
                    self.bump();
                }
                self.eat_digits();
            }
        }
        match self.peek(0) {
            Some('f' | 'F' | 'd' | 'D') => {
                self.bump();
                TokenKind::Float
            }
            Some('l' | 'L') => {
                self.bump();
                TokenKind::Int
            }
            _ if is_float => TokenKind::Float,
            _ => TokenKind::Int,
        }
    }

    fn eat_digits(&mut self) {
        while self.peek(0).is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.bump();
        }
    }

    fn lex_quoted(&mut self, quote: char, line: usize, column: usize) -> Result<(), SyntaxError> {
        self.bump();
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some(c) if c == quote => return Ok(()),
                Some('\n') | None => {
                    let what = if quote == '"' { "string" } else { "character" };
                    return Err(SyntaxError::new(line, column, format!("unterminated {} literal", what)));
                }
                Some(_) => {}
            }
        }
    }

    fn lex_text_block(&mut self, line: usize, column: usize) -> Result<TokenKind, SyntaxError> {
        for _ in 0..3 {
            self.bump();
        }
        loop {
            if self.at_end() {
                return Err(SyntaxError::new(line, column, "unterminated text block"));
            }
            if self.peek(0) == Some('\\') {
                self.bump();
                self.bump();
                continue;
            }
            if self.starts_with("\"\"\"") {
                for _ in 0..3 {
                    self.bump();
                }
                return Ok(TokenKind::TextBlock);
            }
            self.bump();
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
