//! Predicate lexer using logos.

use logos::Logos;

use crate::ast::Span;

/// A token with its source span.
pub type SpannedToken = (Token, Span);

/// Lexer error with span information.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

/// Predicate tokens.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // === Numeric Literals ===
    // Order matters: more specific patterns first

    // Decimal: 19.99m, 5M
    #[regex(r"[0-9]+(\.[0-9]+)?[mM]", lex_decimal, priority = 6)]
    Decimal(String),

    // Hex unsigned: 0x1Fu
    #[regex(r"0[xX][0-9a-fA-F]+[uU]", lex_hex_uint)]
    // Decimal unsigned: 123u, 123UL
    #[regex(r"[0-9]+([uU][lL]?|[lL][uU])", lex_decimal_uint, priority = 4)]
    UInt(u64),

    // Hex int: 0x1F
    #[regex(r"0[xX][0-9a-fA-F]+", lex_hex_int, priority = 3)]
    // Decimal int: 123, 123L
    #[regex(r"[0-9]+[lL]?", lex_decimal_int, priority = 1)]
    Int(i64),

    // Float with decimal point and optional exponent: 1.5, 1.5e10, 1.5d
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?[dDfF]?", lex_float, priority = 5)]
    // Float with exponent only: 1e10, 1E-5
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[dDfF]?", lex_float, priority = 2)]
    // Integer digits with a float suffix: 2d, 3f
    #[regex(r"[0-9]+[dDfF]", lex_float, priority = 2)]
    Float(f64),

    // === Text Literals ===
    #[regex(r#"@""#, lex_verbatim_string)]
    #[regex(r#"""#, lex_string)]
    String(String),

    #[regex(r"'", lex_char)]
    Char(char),

    // === Keywords ===
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("typeof")]
    TypeOf,
    #[token("new")]
    New,

    // === Reserved Words ===
    // Statement and declaration keywords have no place in a predicate.
    #[token("as", |_| "as".to_string())]
    #[token("async", |_| "async".to_string())]
    #[token("await", |_| "await".to_string())]
    #[token("break", |_| "break".to_string())]
    #[token("checked", |_| "checked".to_string())]
    #[token("class", |_| "class".to_string())]
    #[token("const", |_| "const".to_string())]
    #[token("continue", |_| "continue".to_string())]
    #[token("default", |_| "default".to_string())]
    #[token("delegate", |_| "delegate".to_string())]
    #[token("do", |_| "do".to_string())]
    #[token("else", |_| "else".to_string())]
    #[token("event", |_| "event".to_string())]
    #[token("extern", |_| "extern".to_string())]
    #[token("fixed", |_| "fixed".to_string())]
    #[token("for", |_| "for".to_string())]
    #[token("foreach", |_| "foreach".to_string())]
    #[token("goto", |_| "goto".to_string())]
    #[token("if", |_| "if".to_string())]
    #[token("is", |_| "is".to_string())]
    #[token("lock", |_| "lock".to_string())]
    #[token("namespace", |_| "namespace".to_string())]
    #[token("operator", |_| "operator".to_string())]
    #[token("return", |_| "return".to_string())]
    #[token("sizeof", |_| "sizeof".to_string())]
    #[token("stackalloc", |_| "stackalloc".to_string())]
    #[token("switch", |_| "switch".to_string())]
    #[token("throw", |_| "throw".to_string())]
    #[token("try", |_| "try".to_string())]
    #[token("unchecked", |_| "unchecked".to_string())]
    #[token("unsafe", |_| "unsafe".to_string())]
    #[token("using", |_| "using".to_string())]
    #[token("var", |_| "var".to_string())]
    #[token("void", |_| "void".to_string())]
    #[token("while", |_| "while".to_string())]
    #[token("yield", |_| "yield".to_string())]
    Reserved(String),

    // === Identifier ===
    // A leading `@` marks a verbatim identifier and is not part of the name.
    #[regex(r"@?[a-zA-Z_][a-zA-Z0-9_]*", lex_ident, priority = 0)]
    Ident(String),

    // === Operators (multi-char first) ===
    #[token("=>")]
    Arrow,
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("&&")]
    And,
    #[token("||")]
    Or,

    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Not,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Decimal(s) => write!(f, "{}m", s),
            Token::Int(n) => write!(f, "{}", n),
            Token::UInt(n) => write!(f, "{}u", n),
            Token::Float(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::Char(c) => write!(f, "'{}'", c),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::TypeOf => write!(f, "typeof"),
            Token::New => write!(f, "new"),
            Token::Reserved(s) => write!(f, "{}", s),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Arrow => write!(f, "=>"),
            Token::EqEq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Le => write!(f, "<="),
            Token::Ge => write!(f, ">="),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Assign => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Not => write!(f, "!"),
            Token::Question => write!(f, "?"),
            Token::Colon => write!(f, ":"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
        }
    }
}

// === Lexer Callbacks for Numbers ===

/// Strips C# numeric suffixes (`u`, `l`, `d`, `f`, `m`) from a literal slice.
fn strip_suffix(s: &str) -> &str {
    s.trim_end_matches(['u', 'U', 'l', 'L', 'd', 'D', 'f', 'F', 'm', 'M'])
}

fn lex_decimal(lex: &mut logos::Lexer<Token>) -> Option<String> {
    Some(strip_suffix(lex.slice()).to_string())
}

fn lex_decimal_int(lex: &mut logos::Lexer<Token>) -> Option<i64> {
    strip_suffix(lex.slice()).parse().ok()
}

fn lex_decimal_uint(lex: &mut logos::Lexer<Token>) -> Option<u64> {
    strip_suffix(lex.slice()).parse().ok()
}

/// Digits of a `0x` literal, without prefix or suffix.
fn hex_digits<'s>(lex: &logos::Lexer<'s, Token>) -> &'s str {
    lex.slice()[2..].trim_end_matches(['u', 'U'])
}

fn lex_hex_int(lex: &mut logos::Lexer<Token>) -> Option<i64> {
    i64::from_str_radix(hex_digits(lex), 16).ok()
}

fn lex_hex_uint(lex: &mut logos::Lexer<Token>) -> Option<u64> {
    u64::from_str_radix(hex_digits(lex), 16).ok()
}

fn lex_float(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    let s = lex.slice();
    // Exponent markers are never suffixes, so only trim the float suffixes.
    s.trim_end_matches(['d', 'D', 'f', 'F']).parse().ok()
}

// === Lexer Callbacks for Text ===

fn lex_ident(lex: &mut logos::Lexer<Token>) -> String {
    lex.slice().trim_start_matches('@').to_string()
}

/// Reads one escape sequence after a backslash.
fn read_escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, consumed: &mut usize) -> Option<char> {
    let escape_char = chars.next()?;
    *consumed += escape_char.len_utf8();
    let c = match escape_char {
        '\\' => '\\',
        '"' => '"',
        '\'' => '\'',
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0C',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0B',
        'u' => {
            // \uXXXX - 4 hex digits
            let hex: String = chars.by_ref().take(4).collect();
            *consumed += hex.len();
            if hex.len() != 4 {
                return None;
            }
            char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?
        }
        'x' => {
            // \xH[H][H][H] - 1 to 4 hex digits
            let mut hex = String::new();
            while hex.len() < 4 {
                match chars.peek() {
                    Some(c) if c.is_ascii_hexdigit() => {
                        hex.push(*c);
                        chars.next();
                    }
                    _ => break,
                }
            }
            *consumed += hex.len();
            if hex.is_empty() {
                return None;
            }
            char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?
        }
        _ => return None, // Invalid escape
    };
    Some(c)
}

fn lex_string(lex: &mut logos::Lexer<Token>) -> Option<String> {
    scan_quoted(lex, false)
}

fn lex_verbatim_string(lex: &mut logos::Lexer<Token>) -> Option<String> {
    scan_quoted(lex, true)
}

/// Reads a string body up to its closing quote and advances past it.
///
/// Regular strings take backslash escapes and may not span lines. Verbatim
/// strings take everything literally except `""`, which is one quote.
fn scan_quoted(lex: &mut logos::Lexer<Token>, verbatim: bool) -> Option<String> {
    let mut chars = lex.remainder().chars().peekable();
    let mut body = String::new();
    let mut consumed = 0;

    while let Some(c) = chars.next() {
        consumed += c.len_utf8();
        match c {
            '"' if verbatim && chars.peek() == Some(&'"') => {
                chars.next();
                consumed += 1;
                body.push('"');
            }
            '"' => {
                lex.bump(consumed);
                return Some(body);
            }
            '\\' if !verbatim => body.push(read_escape(&mut chars, &mut consumed)?),
            '\n' if !verbatim => return None,
            _ => body.push(c),
        }
    }
    None
}

fn lex_char(lex: &mut logos::Lexer<Token>) -> Option<char> {
    let remainder = lex.remainder();
    let mut chars = remainder.chars().peekable();
    let mut consumed = 0;

    let first = chars.next()?;
    consumed += first.len_utf8();
    let value = match first {
        '\'' | '\n' => return None,
        '\\' => read_escape(&mut chars, &mut consumed)?,
        c => c,
    };

    match chars.next() {
        Some('\'') => {
            lex.bump(consumed + 1);
            Some(value)
        }
        _ => None,
    }
}

// === Public Lexer API ===

/// Tokenize the input string.
pub fn lex(input: &str) -> Result<Vec<SpannedToken>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(input);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                let slice = &input[span.clone()];
                let message = if slice.starts_with('"') || slice.starts_with("@\"") {
                    "unterminated or malformed string literal".to_string()
                } else if slice.starts_with('\'') {
                    "malformed character literal".to_string()
                } else if slice.starts_with(|c: char| c.is_ascii_digit()) {
                    format!("malformed numeric literal '{}'", slice)
                } else {
                    format!("unexpected character '{}'", slice)
                };
                return Err(LexError { message, span });
            }
        }
    }

    Ok(tokens)
}
