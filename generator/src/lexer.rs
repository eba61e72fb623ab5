// Lexer for kernel definition bodies.
//
// The definition sublanguage is indentation-structured, so lexing is
// line-oriented: each physical line is tokenized with `logos`, and block
// structure is materialized as synthetic `Indent`/`Dedent` tokens from a
// classic indent stack. Blank and comment-only lines produce no tokens and
// do not affect block structure.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: unrecognized characters, tabs in leading whitespace, and
// inconsistent dedents produce `LexError`; lexing continues.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// Definition-body token types.
///
/// `Indent`, `Dedent`, and `Newline` are synthesized by `lex()` rather than
/// matched by the DFA; everything else mirrors `RawToken` one-to-one.
/// Identifiers carry no value — use the span to retrieve the text from the
/// source.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ── Keywords ──
    Def,
    For,
    While,
    If,
    Else,
    In,
    Range,
    True,
    False,

    // ── Symbols ──
    Colon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    Ne,
    Plus,
    Minus,
    Star,

    // ── Literals and identifiers ──
    Int(i64),
    Ident,

    // ── Structure ──
    Newline,
    Indent,
    Dedent,
}

/// Within-line tokens, matched by logos. Promoted to `Token` by `lex()`.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t]+|#[^\n]*")]
enum RawToken {
    #[token("def")]
    Def,
    #[token("for")]
    For,
    #[token("while")]
    While,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("in")]
    In,
    #[token("range")]
    Range,
    #[token("True")]
    True,
    #[token("False")]
    False,

    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,

    /// Integer literal. Negative literals are composed in the parser.
    #[regex(r"[0-9]+", parse_int)]
    Int(i64),

    /// Identifier: `[a-zA-Z_][a-zA-Z0-9_]*`. Keywords win by fixed-token
    /// priority.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

fn parse_int(lex: &mut logos::Lexer<'_, RawToken>) -> Option<i64> {
    lex.slice().parse().ok()
}

impl From<RawToken> for Token {
    fn from(raw: RawToken) -> Token {
        match raw {
            RawToken::Def => Token::Def,
            RawToken::For => Token::For,
            RawToken::While => Token::While,
            RawToken::If => Token::If,
            RawToken::Else => Token::Else,
            RawToken::In => Token::In,
            RawToken::Range => Token::Range,
            RawToken::True => Token::True,
            RawToken::False => Token::False,
            RawToken::Colon => Token::Colon,
            RawToken::Comma => Token::Comma,
            RawToken::LParen => Token::LParen,
            RawToken::RParen => Token::RParen,
            RawToken::LBracket => Token::LBracket,
            RawToken::RBracket => Token::RBracket,
            RawToken::Assign => Token::Assign,
            RawToken::PlusAssign => Token::PlusAssign,
            RawToken::MinusAssign => Token::MinusAssign,
            RawToken::StarAssign => Token::StarAssign,
            RawToken::Lt => Token::Lt,
            RawToken::Gt => Token::Gt,
            RawToken::Le => Token::Le,
            RawToken::Ge => Token::Ge,
            RawToken::EqEq => Token::EqEq,
            RawToken::Ne => Token::Ne,
            RawToken::Plus => Token::Plus,
            RawToken::Minus => Token::Minus,
            RawToken::Star => Token::Star,
            RawToken::Int(v) => Token::Int(v),
            RawToken::Ident => Token::Ident,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Def => write!(f, "def"),
            Token::For => write!(f, "for"),
            Token::While => write!(f, "while"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::In => write!(f, "in"),
            Token::Range => write!(f, "range"),
            Token::True => write!(f, "True"),
            Token::False => write!(f, "False"),
            Token::Colon => write!(f, ":"),
            Token::Comma => write!(f, ","),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Assign => write!(f, "="),
            Token::PlusAssign => write!(f, "+="),
            Token::MinusAssign => write!(f, "-="),
            Token::StarAssign => write!(f, "*="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Le => write!(f, "<="),
            Token::Ge => write!(f, ">="),
            Token::EqEq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Int(v) => write!(f, "{v}"),
            Token::Ident => write!(f, "<ident>"),
            Token::Newline => write!(f, "<newline>"),
            Token::Indent => write!(f, "<indent>"),
            Token::Dedent => write!(f, "<dedent>"),
        }
    }
}

// ── Public API ──

/// Lex a definition body into tokens.
///
/// Emits an `Indent` when a line is deeper than the enclosing level and as
/// many `Dedent`s as needed when it is shallower; every line with content
/// is terminated by a `Newline`. Open blocks are closed with `Dedent`s at
/// end of input. Lexing is non-fatal: errors are collected and lexing
/// continues past bad characters.
pub fn lex(source: &str) -> LexResult {
    let mut tokens: Vec<(Token, Span)> = Vec::new();
    let mut errors: Vec<LexError> = Vec::new();
    let mut stack: Vec<usize> = vec![0];
    let mut pos = 0;

    for raw_line in source.split_inclusive('\n') {
        let line_start = pos;
        pos += raw_line.len();

        let content = raw_line.strip_suffix('\n').unwrap_or(raw_line);
        let content = content.strip_suffix('\r').unwrap_or(content);

        let indent = content.len() - content.trim_start().len();
        if content[..indent].contains('\t') {
            errors.push(LexError {
                span: Span {
                    start: line_start,
                    end: line_start + indent,
                },
                message: "tab in leading whitespace".to_string(),
            });
            continue;
        }

        // Tokenize the line body first: blank and comment-only lines are
        // skipped before indentation is considered.
        let body = &content[indent..];
        let mut line_tokens: Vec<(Token, Span)> = Vec::new();
        let mut line_errors: Vec<LexError> = Vec::new();
        for (result, range) in RawToken::lexer(body).spanned() {
            let span = Span {
                start: line_start + indent + range.start,
                end: line_start + indent + range.end,
            };
            match result {
                Ok(raw) => line_tokens.push((Token::from(raw), span)),
                Err(()) => line_errors.push(LexError {
                    span,
                    message: format!("unexpected character: {:?}", &body[range.clone()]),
                }),
            }
        }
        if line_tokens.is_empty() {
            errors.append(&mut line_errors);
            continue;
        }

        let top = *stack.last().unwrap();
        if indent > top {
            stack.push(indent);
            tokens.push((
                Token::Indent,
                Span {
                    start: line_start,
                    end: line_start + indent,
                },
            ));
        } else if indent < top {
            while *stack.last().unwrap() > indent {
                stack.pop();
                tokens.push((
                    Token::Dedent,
                    Span {
                        start: line_start,
                        end: line_start,
                    },
                ));
            }
            if *stack.last().unwrap() != indent {
                errors.push(LexError {
                    span: Span {
                        start: line_start,
                        end: line_start + indent,
                    },
                    message: "inconsistent indentation".to_string(),
                });
            }
        }

        errors.append(&mut line_errors);
        tokens.append(&mut line_tokens);
        tokens.push((
            Token::Newline,
            Span {
                start: line_start + content.len(),
                end: line_start + raw_line.len(),
            },
        ));
    }

    let end = source.len();
    while stack.len() > 1 {
        stack.pop();
        tokens.push((Token::Dedent, Span { start: end, end }));
    }

    LexResult { tokens, errors }
}

// ── Tests ──
