use std::fmt;

use tracing::{debug, trace};

use crate::diagnostics::{Diagnostic, DiagnosticKind, ErrorCollector, SourceSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Var,
    Print,
    Type,
    True,
    False,
    Name,
    Number,
    String,
    BuiltinType,
    Vec,
    Comment,
    LAngle,
    RAngle,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Assign,
    EqualEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Ampersand,
    DoubleAmpersand,
    DoublePipe,
    Bang,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: SourceSpan,
}

impl Token {
    pub fn line(&self) -> usize {
        self.span.line
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.lexeme)
    }
}

/// Scans a single source line with one character of lookahead.
pub struct Lexer<'a> {
    source: &'a str,
    line: usize,
    chars: std::str::CharIndices<'a>,
    current: usize,
    peeked: Option<(usize, char)>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, line: usize) -> Self {
        Self {
            source,
            line,
            chars: source.char_indices(),
            current: 0,
            peeked: None,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = if let Some((idx, ch)) = self.peeked.take() {
            Some((idx, ch))
        } else {
            self.chars.next()
        };
        if let Some((idx, ch)) = next {
            self.current = idx + ch.len_utf8();
            Some((idx, ch))
        } else {
            None
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    fn match_next(&mut self, expected: char) -> bool {
        if let Some((idx, ch)) = self.peek() {
            if ch == expected {
                self.peeked = None;
                self.current = idx + ch.len_utf8();
                true
            } else {
                false
            }
        } else {
            false
        }
    }

    fn collect_while<F>(&mut self, mut predicate: F)
    where
        F: FnMut(char) -> bool,
    {
        while let Some((_, ch)) = self.peek() {
            if predicate(ch) {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn span(&self, start: usize) -> SourceSpan {
        SourceSpan::new(self.line, start, self.current)
    }

    fn simple_token(&self, start: usize, kind: TokenKind) -> Token {
        Token {
            kind,
            lexeme: self.source[start..self.current].to_string(),
            span: self.span(start),
        }
    }

    fn error(&self, column: usize, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Lexer, message)
            .with_span(SourceSpan::point(self.line, column))
    }

    fn identifier_or_keyword(&mut self, start: usize) -> Token {
        self.collect_while(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        let lexeme = self.source[start..self.current].to_string();
        let kind = keyword_for(&lexeme).unwrap_or(TokenKind::Name);
        Token {
            kind,
            lexeme,
            span: self.span(start),
        }
    }

    // No validation beyond the character set: `1e` and `2ee5` lex fine and are
    // rejected later when the parser converts the text.
    fn number_literal(&mut self, start: usize, mut seen_dot: bool) -> Token {
        while let Some((_, ch)) = self.peek() {
            match ch {
                '0'..='9' | 'e' => {
                    self.bump();
                }
                '.' if !seen_dot => {
                    seen_dot = true;
                    self.bump();
                }
                _ => break,
            }
        }
        self.simple_token(start, TokenKind::Number)
    }

    fn string_literal(&mut self, start: usize) -> Result<Token, Diagnostic> {
        let mut value = String::new();
        while let Some((_, ch)) = self.bump() {
            match ch {
                '"' => {
                    return Ok(Token {
                        kind: TokenKind::String,
                        lexeme: value,
                        span: self.span(start),
                    });
                }
                '\\' => match self.bump() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, other)) => value.push(other),
                    None => break,
                },
                _ => value.push(ch),
            }
        }
        Err(self.error(start, "no closing `\"` for string literal"))
    }

    fn comment(&mut self, start: usize) -> Token {
        self.collect_while(|_| true);
        Token {
            kind: TokenKind::Comment,
            lexeme: self.source[start + 2..].to_string(),
            span: self.span(start),
        }
    }

    /// Produces the tokens of the line, recording problems in `errors`.
    ///
    /// Unknown characters and unterminated strings end the scan; the tokens produced
    /// before that point are still returned.
    pub fn tokenize(mut self, errors: &mut ErrorCollector) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some((start, ch)) = self.bump() {
            let token = match ch {
                ' ' | '\t' => continue,
                'a'..='z' | 'A'..='Z' => self.identifier_or_keyword(start),
                '0'..='9' => self.number_literal(start, false),
                '"' => match self.string_literal(start) {
                    Ok(token) => token,
                    Err(diagnostic) => {
                        errors.push(diagnostic);
                        break;
                    }
                },
                '.' => match self.peek() {
                    Some((_, '0'..='9')) => self.number_literal(start, true),
                    _ => self.simple_token(start, TokenKind::Dot),
                },
                '(' => self.simple_token(start, TokenKind::LParen),
                ')' => self.simple_token(start, TokenKind::RParen),
                '{' => self.simple_token(start, TokenKind::LBrace),
                '}' => self.simple_token(start, TokenKind::RBrace),
                '[' => self.simple_token(start, TokenKind::LBracket),
                ']' => self.simple_token(start, TokenKind::RBracket),
                '<' => self.simple_token(start, TokenKind::LAngle),
                '>' => self.simple_token(start, TokenKind::RAngle),
                ',' => self.simple_token(start, TokenKind::Comma),
                '+' => self.simple_token(start, TokenKind::Plus),
                '-' => self.simple_token(start, TokenKind::Minus),
                '*' => self.simple_token(start, TokenKind::Star),
                '!' => self.simple_token(start, TokenKind::Bang),
                '=' => {
                    if self.match_next('=') {
                        self.simple_token(start, TokenKind::EqualEqual)
                    } else {
                        self.simple_token(start, TokenKind::Assign)
                    }
                }
                '&' => {
                    if self.match_next('&') {
                        self.simple_token(start, TokenKind::DoubleAmpersand)
                    } else {
                        self.simple_token(start, TokenKind::Ampersand)
                    }
                }
                '|' => {
                    if self.match_next('|') {
                        self.simple_token(start, TokenKind::DoublePipe)
                    } else {
                        errors.push(self.error(start, "no such operator `|`; did you mean `||`?"));
                        continue;
                    }
                }
                '/' => {
                    if self.match_next('/') {
                        self.comment(start)
                    } else {
                        self.simple_token(start, TokenKind::Slash)
                    }
                }
                other => {
                    debug!(line = self.line, column = start, ?other, "unknown character");
                    errors.push(self.error(start, format!("unknown character `{other}`")));
                    break;
                }
            };
            trace!(line = self.line, token = %token, "lexed token");
            tokens.push(token);
        }
        tokens
    }
}

/// Splits `source` into lines and tokenizes each one; line numbers start at 1.
pub fn tokenize(source: &str, errors: &mut ErrorCollector) -> Vec<Vec<Token>> {
    source
        .lines()
        .enumerate()
        .map(|(idx, line)| Lexer::new(line, idx + 1).tokenize(errors))
        .collect()
}

fn keyword_for(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "var" => TokenKind::Var,
        "print" => TokenKind::Print,
        "type" => TokenKind::Type,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "int" | "float" | "string" | "bool" | "tuple" => TokenKind::BuiltinType,
        "vec" => TokenKind::Vec,
        _ => return None,
    };
    Some(kind)
}
