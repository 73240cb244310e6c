//! Recursive-descent parser for procedure scripts.
//!
//! Grammar (highest line binds loosest):
//!
//! ```text
//! script     := (NEWLINE | statement NEWLINE)* statement?
//! statement  := IDENT '=' ternary | ternary
//! ternary    := or_expr ('if' or_expr 'else' ternary)?
//! or_expr    := and_expr ('or' and_expr)*
//! and_expr   := not_expr ('and' not_expr)*
//! not_expr   := 'not' not_expr | comparison
//! comparison := additive (('=='|'!='|'<'|'<='|'>'|'>=') additive)?
//! additive   := term (('+'|'-') term)*
//! term       := power (('*'|'/'|'//'|'%') power)*
//! power      := unary ('**' power)?
//! unary      := '-' unary | postfix
//! postfix    := primary ('.' IDENT | '[' ternary ']' | '(' args ')')*
//! primary    := NUMBER | STRING | IDENT | 'True' | 'False' | 'None'
//!             | '[' args ']' | '(' ternary ')'
//! ```

use crate::ast::{BinOp, CmpOp, Expr, LogicOp, Stmt, UnaryOp};
use crate::error::ParseError;
use crate::lexer::lex;
use crate::token::{Token, TokenKind};

/// Lexes and parses a complete procedure script.
pub fn parse(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let tokens = lex(source)?;
    Parser::new(tokens).script()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn script(mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        self.skip_newlines();
        while !self.at_end() {
            stmts.push(self.statement()?);
            // A statement ends at a newline or at end of input.
            if !self.at_end() {
                self.expect(TokenKind::Newline)?;
                self.skip_newlines();
            }
        }
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        // Assignment needs two tokens of lookahead: IDENT '='.
        if let (Some(TokenKind::Ident(name)), Some(TokenKind::Assign)) =
            (self.peek_kind(0), self.peek_kind(1))
        {
            let name = name.clone();
            self.pos += 2;
            let expr = self.ternary()?;
            return Ok(Stmt::Assign { name, expr });
        }
        Ok(Stmt::Expr(self.ternary()?))
    }

    fn ternary(&mut self) -> Result<Expr, ParseError> {
        let then = self.or_expr()?;
        if self.eat(&TokenKind::If) {
            let cond = self.or_expr()?;
            self.expect(TokenKind::Else)?;
            let otherwise = self.ternary()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(then)
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.and_expr()?;
            lhs = Expr::Logic {
                op: LogicOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.not_expr()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.not_expr()?;
            lhs = Expr::Logic {
                op: LogicOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Not) {
            let expr = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.additive()?;
        let op = match self.peek_kind(0) {
            Some(TokenKind::Eq) => CmpOp::Eq,
            Some(TokenKind::Ne) => CmpOp::Ne,
            Some(TokenKind::Lt) => CmpOp::Lt,
            Some(TokenKind::Le) => CmpOp::Le,
            Some(TokenKind::Gt) => CmpOp::Gt,
            Some(TokenKind::Ge) => CmpOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.additive()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek_kind(0) {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.power()?;
        loop {
            let op = match self.peek_kind(0) {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                Some(TokenKind::DoubleSlash) => BinOp::FloorDiv,
                Some(TokenKind::Percent) => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.power()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.unary()?;
        if self.eat(&TokenKind::DoubleStar) {
            // Right-associative.
            let exponent = self.power()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&TokenKind::Minus) {
            let expr = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let name = self.expect_ident()?;
                expr = Expr::Attr {
                    base: Box::new(expr),
                    name,
                };
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.ternary()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(&TokenKind::LParen) {
                let args = self.args(TokenKind::RParen)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Ident(name) => Ok(Expr::Ident(name)),
            TokenKind::True => Ok(Expr::Bool(true)),
            TokenKind::False => Ok(Expr::Bool(false)),
            TokenKind::None => Ok(Expr::None),
            TokenKind::LBracket => {
                let items = self.args(TokenKind::RBracket)?;
                Ok(Expr::List(items))
            }
            TokenKind::LParen => {
                let expr = self.ternary()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            kind => Err(ParseError::UnexpectedToken {
                found: kind.to_string(),
                pos: token.pos,
            }),
        }
    }

    /// Parses a comma-separated argument/element list up to `close`.
    fn args(&mut self, close: TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.ternary()?);
            if self.eat(&TokenKind::Comma) {
                // Trailing comma before the closer is allowed.
                if self.eat(&close) {
                    return Ok(items);
                }
                continue;
            }
            self.expect(close)?;
            return Ok(items);
        }
    }

    // -----------------------------------------------------------------------
    // Token cursor helpers
    // -----------------------------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek_kind(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind(0) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(())
            }
            Some(token) => Err(ParseError::UnexpectedToken {
                found: token.kind.to_string(),
                pos: token.pos,
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.tokens.get(self.pos) {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            Some(token) => Err(ParseError::UnexpectedToken {
                found: token.kind.to_string(),
                pos: token.pos,
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&TokenKind::Newline) {}
    }
}
