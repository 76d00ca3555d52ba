//! Parser for the predicate expression language.
//!
//! The language is a single C#-flavoured boolean expression: literals,
//! identifiers, member access, calls, indexing, unary and binary operators,
//! the conditional operator, array literals, single-parameter lambdas and
//! `typeof`. There are no statements or declarations.

pub mod ast;
mod lexer;
mod parser;

pub use ast::{BinaryOp, Expr, Literal, Span, Spanned, SpannedExpr, UnaryOp};

/// Default limit on expression nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A parse error with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

/// Options controlling the parser.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum nesting depth of the resulting tree.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Result of parsing a predicate expression.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The parsed AST. May be present alongside errors when the expression
    /// itself parsed but failed a later structural check.
    pub ast: Option<SpannedExpr>,
    /// Any parse errors encountered.
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// Returns true if parsing completed without errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && self.ast.is_some()
    }

    /// Returns true if there are any parse errors.
    pub fn is_err(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Converts to a Result, discarding any partial AST on error.
    pub fn into_result(self) -> Result<SpannedExpr, Vec<ParseError>> {
        if self.errors.is_empty() {
            self.ast.ok_or_else(Vec::new)
        } else {
            Err(self.errors)
        }
    }
}

/// Parse a predicate expression with default options.
pub fn parse(input: &str) -> ParseResult {
    parse_with_options(input, &ParseOptions::default())
}

/// Parse a predicate expression.
pub fn parse_with_options(input: &str, options: &ParseOptions) -> ParseResult {
    let tokens = match lexer::lex(input) {
        Ok(tokens) => tokens,
        Err(e) => {
            return ParseResult {
                ast: None,
                errors: vec![ParseError {
                    message: e.message,
                    span: e.span,
                }],
            };
        }
    };

    let (ast, errors) = parser::parse_tokens(&tokens, options);
    ParseResult { ast, errors }
}
