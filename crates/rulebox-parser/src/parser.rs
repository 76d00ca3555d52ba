//! Predicate parser - hand-written recursive descent.

use crate::ast::{BinaryOp, Expr, Literal, Spanned, SpannedExpr, UnaryOp};
use crate::lexer::{SpannedToken, Token};
use crate::{ParseError, ParseOptions, Span};

/// Recursive descent parser for predicate expressions.
pub struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    /// Counter for generating unique node IDs (starts at 1)
    next_id: i64,
    /// Current recursion depth.
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given token stream.
    pub fn new(tokens: &'a [SpannedToken], max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            next_id: 1,
            depth: 0,
            max_depth,
        }
    }

    /// Allocate the next unique node ID.
    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn node(&mut self, expr: Expr, span: Span) -> SpannedExpr {
        Spanned::new(self.next_id(), expr, span)
    }

    // === Utility Methods ===

    /// Peek at the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    /// Peek `n` tokens ahead of the current one.
    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(t, _)| t)
    }

    /// Get the span of the current token.
    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| self.eof_span())
    }

    /// Get the span representing end-of-input.
    fn eof_span(&self) -> Span {
        let end = self.tokens.last().map(|(_, s)| s.end).unwrap_or(0);
        end..end
    }

    /// Advance to the next token, returning the current one.
    fn advance(&mut self) -> Option<&SpannedToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Check if the current token matches the given token.
    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    /// Consume the current token if it matches, returning true if consumed.
    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a specific token, returning an error if not found.
    fn expect(&mut self, token: &Token) -> Result<Span, ParseError> {
        if self.check(token) {
            let span = self.peek_span();
            self.advance();
            Ok(span)
        } else {
            Err(ParseError {
                message: match self.peek() {
                    Some(found) => format!("expected '{}', found '{}'", token, found),
                    None => format!("expected '{}', found end of input", token),
                },
                span: self.peek_span(),
            })
        }
    }

    /// Check if we've reached the end of the token stream.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError {
                message: format!("expression nests deeper than {} levels", self.max_depth),
                span: self.peek_span(),
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // === Expression Parsing ===

    /// Parse an expression (entry point).
    pub fn parse_expr(&mut self) -> Result<SpannedExpr, ParseError> {
        self.enter()?;
        let result = if self.at_lambda() {
            self.parse_lambda()
        } else {
            self.parse_conditional()
        };
        self.leave();
        result
    }

    /// Check for `x =>` or `(x) =>` at the current position.
    fn at_lambda(&self) -> bool {
        match (self.peek(), self.peek_at(1)) {
            (Some(Token::Ident(_)), Some(Token::Arrow)) => true,
            (Some(Token::LParen), Some(Token::Ident(_))) => {
                self.peek_at(2) == Some(&Token::RParen) && self.peek_at(3) == Some(&Token::Arrow)
            }
            _ => false,
        }
    }

    /// Parse a single-parameter lambda: x => body
    fn parse_lambda(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        let parenthesized = self.match_token(&Token::LParen);
        let param = match self.advance() {
            Some((Token::Ident(name), _)) => name.clone(),
            _ => {
                return Err(ParseError {
                    message: "expected lambda parameter".to_string(),
                    span: self.peek_span(),
                })
            }
        };
        if parenthesized {
            self.expect(&Token::RParen)?;
        }
        self.expect(&Token::Arrow)?;
        let body = self.parse_expr()?;
        let span = start..body.span.end;

        Ok(self.node(
            Expr::Lambda {
                param,
                body: Box::new(body),
            },
            span,
        ))
    }

    /// Parse conditional: expr ? expr : expr
    fn parse_conditional(&mut self) -> Result<SpannedExpr, ParseError> {
        let cond = self.parse_or()?;

        if self.match_token(&Token::Question) {
            let then_expr = self.parse_expr()?;
            self.expect(&Token::Colon)?;
            let else_expr = self.parse_expr()?;
            let span = cond.span.start..else_expr.span.end;

            Ok(self.node(
                Expr::Conditional {
                    cond: Box::new(cond),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                span,
            ))
        } else {
            Ok(cond)
        }
    }

    fn binary(&mut self, op: BinaryOp, left: SpannedExpr, right: SpannedExpr) -> SpannedExpr {
        let span = left.span.start..right.span.end;
        self.node(
            Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    /// Parse logical OR: expr || expr
    fn parse_or(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_and()?;

        while self.match_token(&Token::Or) {
            let right = self.parse_and()?;
            left = self.binary(BinaryOp::Or, left, right);
        }

        Ok(left)
    }

    /// Parse logical AND: expr && expr
    fn parse_and(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_equality()?;

        while self.match_token(&Token::And) {
            let right = self.parse_equality()?;
            left = self.binary(BinaryOp::And, left, right);
        }

        Ok(left)
    }

    /// Parse equality operators: == !=
    fn parse_equality(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_relation()?;

        loop {
            let op = if self.match_token(&Token::EqEq) {
                BinaryOp::Eq
            } else if self.match_token(&Token::Ne) {
                BinaryOp::Ne
            } else if self.check(&Token::Assign) {
                return Err(ParseError {
                    message: "assignment is not allowed in a predicate (did you mean '=='?)"
                        .to_string(),
                    span: self.peek_span(),
                });
            } else {
                break;
            };

            let right = self.parse_relation()?;
            left = self.binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse relational operators: < <= > >=
    fn parse_relation(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_addition()?;

        while let Some(op) = self.peek_relop() {
            self.advance();
            let right = self.parse_addition()?;
            left = self.binary(op, left, right);
        }

        Ok(left)
    }

    /// Check if the current token is a relational operator.
    fn peek_relop(&self) -> Option<BinaryOp> {
        match self.peek()? {
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        }
    }

    /// Parse additive operators: + -
    fn parse_addition(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_mult()?;

        loop {
            let op = if self.match_token(&Token::Plus) {
                BinaryOp::Add
            } else if self.match_token(&Token::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };

            let right = self.parse_mult()?;
            left = self.binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse multiplicative operators: * / %
    fn parse_mult(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = if self.match_token(&Token::Star) {
                BinaryOp::Mul
            } else if self.match_token(&Token::Slash) {
                BinaryOp::Div
            } else if self.match_token(&Token::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };

            let right = self.parse_unary()?;
            left = self.binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse unary operators: - !
    fn parse_unary(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;

        let op = if self.match_token(&Token::Minus) {
            UnaryOp::Neg
        } else if self.match_token(&Token::Not) {
            UnaryOp::Not
        } else {
            return self.parse_postfix();
        };

        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        let operand = operand?;
        let span = start..operand.span.end;

        Ok(self.node(
            Expr::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// Parse postfix operators: . [] ()
    fn parse_postfix(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            if self.check(&Token::LParen) {
                expr = self.parse_call(expr)?;
            } else if self.check(&Token::LBracket) {
                expr = self.parse_index(expr)?;
            } else if self.check(&Token::Dot) {
                expr = self.parse_member(expr)?;
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse a comma-separated list of expressions up to `close`.
    fn parse_expr_list(&mut self, close: &Token) -> Result<(Vec<SpannedExpr>, Span), ParseError> {
        let mut items = Vec::new();
        if !self.check(close) {
            items.push(self.parse_expr()?);
            while self.match_token(&Token::Comma) {
                if self.check(close) {
                    break; // trailing comma
                }
                items.push(self.parse_expr()?);
            }
        }

        let end_span = self.expect(close)?;
        Ok((items, end_span))
    }

    /// Parse a function call: expr(args...)
    fn parse_call(&mut self, callee: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = callee.span.start;
        self.expect(&Token::LParen)?;
        let (args, end_span) = self.parse_expr_list(&Token::RParen)?;

        Ok(self.node(
            Expr::Call {
                callee: Box::new(callee),
                args,
            },
            start..end_span.end,
        ))
    }

    /// Parse an index operation: expr[index]
    fn parse_index(&mut self, target: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = target.span.start;
        self.expect(&Token::LBracket)?;
        let index = self.parse_expr()?;
        let end_span = self.expect(&Token::RBracket)?;

        Ok(self.node(
            Expr::Index {
                target: Box::new(target),
                index: Box::new(index),
            },
            start..end_span.end,
        ))
    }

    /// Parse member access: expr.name
    fn parse_member(&mut self, target: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = target.span.start;
        self.expect(&Token::Dot)?;

        let (name, end) = match self.advance() {
            Some((Token::Ident(name), span)) => (name.clone(), span.end),
            other => {
                let found = other.map(|(t, _)| t.to_string());
                return Err(ParseError {
                    message: match found {
                        Some(found) => format!("expected member name after '.', found '{}'", found),
                        None => "expected member name after '.'".to_string(),
                    },
                    span: self.peek_span(),
                });
            }
        };

        Ok(self.node(
            Expr::Member {
                target: Box::new(target),
                name,
            },
            start..end,
        ))
    }

    /// Parse an atom: literal, identifier, parenthesized expression, array, or typeof.
    fn parse_atom(&mut self) -> Result<SpannedExpr, ParseError> {
        let span = self.peek_span();

        // Clone the token to avoid borrowing issues
        let token = self.peek().cloned();

        let literal = match token {
            Some(Token::Int(n)) => Literal::Int(n),
            Some(Token::UInt(n)) => Literal::UInt(n),
            Some(Token::Float(n)) => Literal::Float(n),
            Some(Token::Decimal(ref s)) => Literal::Decimal(s.clone()),
            Some(Token::String(ref s)) => Literal::String(s.clone()),
            Some(Token::Char(c)) => Literal::Char(c),
            Some(Token::True) => Literal::Bool(true),
            Some(Token::False) => Literal::Bool(false),
            Some(Token::Null) => Literal::Null,

            Some(Token::Ident(name)) => {
                self.advance();
                return Ok(self.node(Expr::Ident(name), span));
            }

            Some(Token::TypeOf) => return self.parse_typeof(),

            Some(Token::New) => return self.parse_new_array(),

            Some(Token::Reserved(word)) => {
                return Err(ParseError {
                    message: format!("'{}' is a reserved word and cannot be used in a predicate", word),
                    span,
                })
            }

            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                return Ok(expr);
            }

            Some(Token::LBracket) => {
                self.advance();
                let (items, end_span) = self.parse_expr_list(&Token::RBracket)?;
                return Ok(self.node(Expr::Array(items), span.start..end_span.end));
            }

            Some(Token::Semicolon) => {
                return Err(ParseError {
                    message: "statements are not allowed; a predicate is a single expression"
                        .to_string(),
                    span,
                })
            }

            Some(token) => {
                return Err(ParseError {
                    message: format!("unexpected token '{}'", token),
                    span,
                })
            }

            None => {
                return Err(ParseError {
                    message: "unexpected end of input".to_string(),
                    span: self.eof_span(),
                })
            }
        };

        self.advance();
        Ok(self.node(Expr::Literal(literal), span))
    }

    /// Parse `typeof(Name)`.
    fn parse_typeof(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        self.expect(&Token::TypeOf)?;
        self.expect(&Token::LParen)?;

        let mut name = match self.advance() {
            Some((Token::Ident(name), _)) => name.clone(),
            _ => {
                return Err(ParseError {
                    message: "expected type name in typeof".to_string(),
                    span: self.peek_span(),
                })
            }
        };
        while self.match_token(&Token::Dot) {
            match self.advance() {
                Some((Token::Ident(segment), _)) => {
                    name.push('.');
                    name.push_str(segment);
                }
                _ => {
                    return Err(ParseError {
                        message: "expected type name in typeof".to_string(),
                        span: self.peek_span(),
                    })
                }
            }
        }

        let end_span = self.expect(&Token::RParen)?;
        Ok(self.node(Expr::TypeOf(name), start..end_span.end))
    }

    /// Parse `new[] { a, b }`. Any other object creation is rejected.
    fn parse_new_array(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        self.expect(&Token::New)?;

        if !(self.check(&Token::LBracket) && self.peek_at(1) == Some(&Token::RBracket)) {
            return Err(ParseError {
                message: "object creation is not allowed; only 'new[] { ... }' arrays are supported"
                    .to_string(),
                span: start..self.peek_span().end,
            });
        }
        self.advance();
        self.advance();

        self.expect(&Token::LBrace)?;
        let (items, end_span) = self.parse_expr_list(&Token::RBrace)?;
        Ok(self.node(Expr::Array(items), start..end_span.end))
    }
}

/// Depth of the deepest path through the tree, computed without recursion so
/// long left-leaning operator chains cannot overflow the stack.
fn tree_depth(root: &SpannedExpr) -> usize {
    let mut max = 0;
    let mut stack = vec![(root, 1usize)];

    while let Some((expr, depth)) = stack.pop() {
        max = max.max(depth);
        let next = depth + 1;
        match &expr.node {
            Expr::Literal(_) | Expr::Ident(_) | Expr::TypeOf(_) => {}
            Expr::Member { target, .. } => stack.push((target, next)),
            Expr::Call { callee, args } => {
                stack.push((callee, next));
                stack.extend(args.iter().map(|a| (a, next)));
            }
            Expr::Index { target, index } => {
                stack.push((target, next));
                stack.push((index, next));
            }
            Expr::Unary { operand, .. } => stack.push((operand, next)),
            Expr::Binary { left, right, .. } => {
                stack.push((left, next));
                stack.push((right, next));
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                stack.push((cond, next));
                stack.push((then_expr, next));
                stack.push((else_expr, next));
            }
            Expr::Array(items) => stack.extend(items.iter().map(|a| (a, next))),
            Expr::Lambda { body, .. } => stack.push((body, next)),
        }
    }

    max
}

/// Parse tokens into an AST.
/// Returns the AST and any parse errors encountered.
pub fn parse_tokens(
    tokens: &[SpannedToken],
    options: &ParseOptions,
) -> (Option<SpannedExpr>, Vec<ParseError>) {
    // A trailing statement terminator is tolerated; anywhere else it is an error.
    let mut tokens = tokens;
    while let Some(((Token::Semicolon, _), rest)) = tokens.split_last() {
        tokens = rest;
    }

    if tokens.is_empty() {
        return (
            None,
            vec![ParseError {
                message: "empty input".to_string(),
                span: 0..0,
            }],
        );
    }

    let mut parser = Parser::new(tokens, options.max_depth);
    match parser.parse_expr() {
        Ok(ast) => {
            if !parser.at_end() {
                let message = match parser.peek() {
                    Some(Token::Semicolon) => {
                        "statements are not allowed; a predicate is a single expression".to_string()
                    }
                    Some(token) => format!("unexpected '{}' after expression", token),
                    None => "unexpected tokens after expression".to_string(),
                };
                return (
                    Some(ast),
                    vec![ParseError {
                        message,
                        span: parser.peek_span(),
                    }],
                );
            }

            if tree_depth(&ast) > options.max_depth {
                let span = ast.span.clone();
                return (
                    Some(ast),
                    vec![ParseError {
                        message: format!("expression nests deeper than {} levels", options.max_depth),
                        span,
                    }],
                );
            }

            (Some(ast), vec![])
        }
        Err(e) => (None, vec![e]),
    }
}
