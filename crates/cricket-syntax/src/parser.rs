//! Recursive descent parser for the cricket input language.
//!
//! Produces the unvalidated IR: variable occurrences and calls are resolved
//! later by `cricket_ir::validate`.

use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};
use cricket_ir::{BinOp, Expr, Predicate, Program, Stmt, Ty, UnOp, VarName};
use thiserror::Error;

/// Parser error.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected token at {span}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("invalid syntax at {span}: {message}")]
    InvalidSyntax { message: String, span: Span },
}

impl ParseError {
    /// Get the source span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::InvalidSyntax { span, .. } => *span,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parser for cricket source code.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from source text.
    pub fn new(source: &str) -> Self {
        let tokens: Vec<_> = Lexer::new(source)
            .tokenize()
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .collect();
        Self { tokens, pos: 0 }
    }

    /// Parse a complete program: globals followed by functions.
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut globals = Vec::new();
        let mut funs = Vec::new();

        while !self.is_at_end() {
            match self.peek_kind() {
                TokenKind::Bool | TokenKind::Int => {
                    globals.push(self.parse_var_decl()?);
                }
                TokenKind::Void => {
                    funs.push(self.parse_fun_decl()?);
                }
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "variable or function declaration".into(),
                        found: other.to_string(),
                        span: self.current_span(),
                    });
                }
            }
        }

        Ok(Program::new(globals, funs))
    }

    /// Parse a predicate list: `scope: expr;` lines, scope `global` or a
    /// function name.
    pub fn parse_predicates(&mut self) -> ParseResult<Vec<(String, Predicate)>> {
        let mut preds = Vec::new();
        while !self.is_at_end() {
            let scope = match self.peek_kind() {
                TokenKind::Global => {
                    self.advance();
                    "global".to_string()
                }
                TokenKind::Ident(name) => {
                    self.advance();
                    name
                }
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "predicate scope".into(),
                        found: other.to_string(),
                        span: self.current_span(),
                    });
                }
            };
            self.expect(TokenKind::Colon)?;
            let expr = self.parse_expr()?;
            self.expect(TokenKind::Semicolon)?;
            preds.push((scope, Predicate::new(expr)));
        }
        Ok(preds)
    }

    // === Declarations ===

    fn parse_ty(&mut self) -> ParseResult<Ty> {
        match self.peek_kind() {
            TokenKind::Bool => {
                self.advance();
                Ok(Ty::Bool)
            }
            TokenKind::Int => {
                self.advance();
                Ok(Ty::Int)
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "'bool' or 'int'".into(),
                found: other.to_string(),
                span: self.current_span(),
            }),
        }
    }

    fn parse_var_decl(&mut self) -> ParseResult<(String, Ty)> {
        let ty = self.parse_ty()?;
        let name = self.parse_ident()?;
        self.expect(TokenKind::Semicolon)?;
        Ok((name, ty))
    }

    fn parse_fun_decl(&mut self) -> ParseResult<(String, Vec<(String, Ty)>, Vec<Stmt>)> {
        self.expect(TokenKind::Void)?;
        let name = self.parse_ident()?;
        self.expect(TokenKind::LParen)?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LBrace)?;

        // Local declarations precede statements.
        let mut locals = Vec::new();
        while matches!(self.peek_kind(), TokenKind::Bool | TokenKind::Int) {
            locals.push(self.parse_var_decl()?);
        }

        let mut body = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace)?;

        Ok((name, locals, body))
    }

    // === Statements ===

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        match self.peek_kind() {
            TokenKind::If => self.parse_ite(),
            TokenKind::While => self.parse_while(),
            TokenKind::Assert => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let cond = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::assert(cond))
            }
            TokenKind::Skip => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::skip())
            }
            TokenKind::Ident(_) => {
                if self.peek_ahead_kind(1) == TokenKind::LParen {
                    let name = self.parse_ident()?;
                    self.expect(TokenKind::LParen)?;
                    self.expect(TokenKind::RParen)?;
                    self.expect(TokenKind::Semicolon)?;
                    Ok(Stmt::call(name))
                } else {
                    self.parse_assignment()
                }
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "statement".into(),
                found: other.to_string(),
                span: self.current_span(),
            }),
        }
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_ite(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let then_body = self.parse_block()?;
        let else_body = if self.match_token(TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::Ite {
            cond,
            then_body,
            else_body,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_assignment(&mut self) -> ParseResult<Stmt> {
        let span = self.current_span();
        let mut vars = vec![VarName::new(self.parse_ident()?)];
        while self.match_token(TokenKind::Comma) {
            vars.push(VarName::new(self.parse_ident()?));
        }
        self.expect(TokenKind::Assign)?;
        let mut exprs = vec![self.parse_expr()?];
        while self.match_token(TokenKind::Comma) {
            exprs.push(self.parse_expr()?);
        }
        self.expect(TokenKind::Semicolon)?;

        if vars.len() != exprs.len() {
            return Err(ParseError::InvalidSyntax {
                message: format!(
                    "parallel assignment is unbalanced: {} targets, {} expressions",
                    vars.len(),
                    exprs.len()
                ),
                span,
            });
        }
        if vars.len() == 1 {
            Ok(Stmt::Assign {
                var: vars.pop().unwrap(),
                expr: exprs.pop().unwrap(),
                origin: None,
            })
        } else {
            Ok(Stmt::ParallelAssign {
                vars,
                exprs,
                origin: None,
            })
        }
    }

    // === Expression parsing with precedence climbing ===

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_binary_expr(1)
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary_expr()?;

        while let Some(op) = self.peek_binop() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            // left associative: parse the right side one level tighter
            let rhs = self.parse_binary_expr(prec + 1)?;
            lhs = Expr::binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    fn peek_binop(&self) -> Option<BinOp> {
        match self.peek_kind() {
            TokenKind::OrOr => Some(BinOp::Or),
            TokenKind::AndAnd => Some(BinOp::And),
            TokenKind::Eq => Some(BinOp::Eq),
            TokenKind::Ne => Some(BinOp::Ne),
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::Le => Some(BinOp::Le),
            TokenKind::Gt => Some(BinOp::Gt),
            TokenKind::Ge => Some(BinOp::Ge),
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            _ => None,
        }
    }

    fn parse_unary_expr(&mut self) -> ParseResult<Expr> {
        match self.peek_kind() {
            TokenKind::Bang => {
                self.advance();
                let child = self.parse_unary_expr()?;
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    child: Box::new(child),
                })
            }
            TokenKind::Minus => {
                self.advance();
                let child = self.parse_unary_expr()?;
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    child: Box::new(child),
                })
            }
            _ => self.parse_primary_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> ParseResult<Expr> {
        match self.peek_kind() {
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::Unknown => {
                self.advance();
                Ok(Expr::Unknown)
            }
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Int(n))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::var(name))
            }
            TokenKind::LParen => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(e)
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "expression".into(),
                found: other.to_string(),
                span: self.current_span(),
            }),
        }
    }

    // === Token helpers ===

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| self.tokens.last().expect("tokens should have at least EOF"))
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind.clone()
    }

    /// Peek ahead by `offset` tokens (0 = current token).
    fn peek_ahead_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind.clone())
            .unwrap_or(TokenKind::Eof)
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn check(&self, kind: TokenKind) -> bool {
        std::mem::discriminant(&self.peek_kind()) == std::mem::discriminant(&kind)
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.check(kind.clone()) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: kind.to_string(),
                found: self.peek_kind().to_string(),
                span: self.current_span(),
            })
        }
    }

    fn parse_ident(&mut self) -> ParseResult<String> {
        match self.peek_kind() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "identifier".into(),
                found: other.to_string(),
                span: self.current_span(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(source).parse_program().unwrap()
    }

    #[test]
    fn test_globals_and_main() {
        let prog = parse("int x; bool b; void main() { }");
        assert_eq!(prog.num_globals(), 2);
        assert_eq!(prog.funs.len(), 1);
        assert_eq!(prog.funs[0].name, "main");
    }

    #[test]
    fn test_locals_precede_statements() {
        let prog = parse("void main() { int i; i = 0; }");
        assert_eq!(prog.funs[0].locals.len(), 1);
        assert_eq!(prog.funs[0].body.len(), 1);
    }

    #[test]
    fn test_if_else_and_while() {
        let prog = parse(
            "int x; void main() { if (x == 0) { x = 1; } else { skip; } while (x < 3) { x = x + 1; } }",
        );
        assert_eq!(prog.funs[0].body.len(), 2);
        assert!(matches!(prog.funs[0].body[0], Stmt::Ite { .. }));
        assert!(matches!(prog.funs[0].body[1], Stmt::While { .. }));
    }

    #[test]
    fn test_if_without_else() {
        let prog = parse("int x; void main() { if (x == 0) { x = 1; } }");
        match &prog.funs[0].body[0] {
            Stmt::Ite { else_body, .. } => assert!(else_body.is_none()),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_call_statement() {
        let prog = parse("void main() { helper(); } void helper() { }");
        assert!(matches!(prog.funs[0].body[0], Stmt::Call { .. }));
    }

    #[test]
    fn test_parallel_assignment() {
        let prog = parse("int x; int y; void main() { x, y = y, x; }");
        match &prog.funs[0].body[0] {
            Stmt::ParallelAssign { vars, exprs, .. } => {
                assert_eq!(vars.len(), 2);
                assert_eq!(exprs.len(), 2);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unbalanced_parallel_assignment_rejected() {
        let err = Parser::new("int x; void main() { x, x = 1; }")
            .parse_program()
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_parse_precedence() {
        let prog = parse("int x; void main() { assert(x + 1 * 2 == 3 || false); }");
        match &prog.funs[0].body[0] {
            Stmt::Assert { cond, .. } => {
                assert_eq!(cond.to_string(), "x + 1 * 2 == 3 || false");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unary_binding() {
        let prog = parse("bool b; void main() { assert(!b && b); }");
        match &prog.funs[0].body[0] {
            Stmt::Assert { cond, .. } => assert_eq!(cond.to_string(), "!b && b"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_assert_inside_while() {
        let prog = parse("int i; void main() { while (i < 3) { assert(i < 3); i = i + 1; } }");
        match &prog.funs[0].body[0] {
            Stmt::While { body, .. } => assert_eq!(body.len(), 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_predicates() {
        let preds = Parser::new("global: x == 1; main: i < 3;")
            .parse_predicates()
            .unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0].0, "global");
        assert_eq!(preds[1].0, "main");
        assert_eq!(preds[1].1.expr.to_string(), "i < 3");
    }

    #[test]
    fn test_error_has_span() {
        let err = Parser::new("void main() { if }").parse_program().unwrap_err();
        assert!(err.span().line >= 1);
    }
}
