//! Recursive descent parser.
//!
//! The parser consumes a [`TokenCursor`] and produces one [`Expr`] per
//! source file. Precedence climbs from `or` at the bottom to postfix
//! call/index/field chains at the top:
//!
//! ```text
//! expression := or ( "for" Ident "in" or | "as" type )*
//! or         := and ("or" and)*              (right-associative)
//! and        := eq ("and" eq)*               (right-associative)
//! eq         := cmp ("is" "not"? cmp)?
//! cmp        := add (("<"|">") "="? add)*
//! add        := mul (("+"|"-") mul)*
//! mul        := not (("*"|"/"|"%") not)*
//! not        := "not" not | postfix
//! postfix    := atom (call | index | slice | field)*
//! ```
//!
//! Comparison operators `<=`/`>=` are assembled here from the lexer's two
//! single-character tokens. A `-` in atom position immediately followed by a
//! number token is a negative literal; everywhere else `-` is subtraction.
//!
//! The type grammar lives here too (`sum := funcType ("|" funcType)*`, list
//! types in brackets, object types in braces, the five primitive names). In
//! trailing-annotation positions (array-literal element types, function
//! return types) a `[` always belongs to the expression grammar — so
//! `[1, 2][0]` stays an index and `func(x) [x]` keeps its array-literal
//! body — while an ambiguous `(`/`{`/`func` is resolved by attempting the
//! type and rewinding when it does not parse.
//!
//! Parse errors wrap the inner "unexpected token" diagnostic in contextual
//! layers ("to terminate array literal", "in let clause", …).

use crate::ast::{AddOp, Binding, CmpOp, EqOp, Expr, Literal, MatchArm, MulOp, Param};
use crate::error::Diagnostic;
use crate::lexer::{Token, TokenCursor, TokenKind};
use crate::source::SourceLoc;
use crate::types::{Primitive, Type};
use std::rc::Rc;

/// The parser.
///
/// # Example
///
/// ```rust
/// use rill::lexer::tokenize;
/// use rill::parser::Parser;
/// use rill::source::FileId;
///
/// let toks = tokenize(FileId::default(), &["1 + 2 * 3".to_string()]).unwrap();
/// let expr = Parser::new(toks).parse_program().unwrap();
/// assert_eq!(expr.to_string(), "1 + 2 * 3");
/// ```
pub struct Parser {
    cur: TokenCursor,
}

impl Parser {
    /// Creates a parser over a token stream.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            cur: TokenCursor::new(tokens),
        }
    }

    /// Parses the single top-level expression of a file.
    ///
    /// Anything left over after the expression is an "unexpected token"
    /// error.
    pub fn parse_program(&mut self) -> Result<Expr, Diagnostic> {
        let expr = self.parse_expression()?;
        match self.cur.peek() {
            Some(tok) => Err(Diagnostic::at("unexpected token", tok.loc)),
            None => Ok(expr),
        }
    }

    /// Parses one expression, including comprehension and cast tails.
    pub fn parse_expression(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_or()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::For) => {
                    let for_tok = self.cur.pop().expect("peeked");
                    let var = self.expect(TokenKind::Ident, "comprehension variable")?;
                    self.expect(TokenKind::In, "\"in\" clause of comprehension")?;
                    let iter = self.parse_or()?;
                    expr = Expr::For {
                        body: Box::new(expr),
                        var: var.text,
                        iter: Box::new(iter),
                        loc: for_tok.loc,
                    };
                }
                Some(TokenKind::As) => {
                    let as_tok = self.cur.pop().expect("peeked");
                    let ty = self
                        .parse_type()
                        .map_err(|e| e.context("in \"as\" expression", as_tok.loc))?;
                    expr = Expr::As {
                        expr: Box::new(expr),
                        ty,
                        loc: as_tok.loc,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    // === Expression precedence chain ===

    fn parse_or(&mut self) -> Result<Expr, Diagnostic> {
        let left = self.parse_and()?;
        if self.at(TokenKind::Or) {
            let tok = self.cur.pop().expect("peeked");
            let right = self.parse_or()?;
            return Ok(Expr::Or {
                left: Box::new(left),
                right: Box::new(right),
                loc: tok.loc,
            });
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Diagnostic> {
        let left = self.parse_eq()?;
        if self.at(TokenKind::And) {
            let tok = self.cur.pop().expect("peeked");
            let right = self.parse_and()?;
            return Ok(Expr::And {
                left: Box::new(left),
                right: Box::new(right),
                loc: tok.loc,
            });
        }
        Ok(left)
    }

    fn parse_eq(&mut self) -> Result<Expr, Diagnostic> {
        let left = self.parse_cmp()?;
        if self.at(TokenKind::Is) {
            let tok = self.cur.pop().expect("peeked");
            let op = if self.at(TokenKind::Not) {
                self.cur.pop();
                EqOp::Ne
            } else {
                EqOp::Eq
            };
            let right = self.parse_cmp()?;
            return Ok(Expr::Eq {
                left: Box::new(left),
                op,
                right: Box::new(right),
                loc: tok.loc,
            });
        }
        Ok(left)
    }

    fn parse_cmp(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_add()?;
        loop {
            let strict = match self.peek_kind() {
                Some(TokenKind::LAngle) => true,
                Some(TokenKind::RAngle) => false,
                _ => break,
            };
            let tok = self.cur.pop().expect("peeked");
            let op = if self.at(TokenKind::Equal) {
                self.cur.pop();
                if strict {
                    CmpOp::Le
                } else {
                    CmpOp::Ge
                }
            } else if strict {
                CmpOp::Lt
            } else {
                CmpOp::Gt
            };
            let right = self.parse_add()?;
            left = Expr::Cmp {
                left: Box::new(left),
                op,
                right: Box::new(right),
                loc: tok.loc,
            };
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => AddOp::Add,
                Some(TokenKind::Minus) => AddOp::Sub,
                _ => break,
            };
            let tok = self.cur.pop().expect("peeked");
            let right = self.parse_mul()?;
            left = Expr::Add {
                left: Box::new(left),
                op,
                right: Box::new(right),
                loc: tok.loc,
            };
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_not()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => MulOp::Mul,
                Some(TokenKind::Slash) => MulOp::Div,
                Some(TokenKind::Percent) => MulOp::Rem,
                _ => break,
            };
            let tok = self.cur.pop().expect("peeked");
            let right = self.parse_not()?;
            left = Expr::Mul {
                left: Box::new(left),
                op,
                right: Box::new(right),
                loc: tok.loc,
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, Diagnostic> {
        if self.at(TokenKind::Not) {
            let tok = self.cur.pop().expect("peeked");
            let inner = self.parse_not()?;
            return Ok(Expr::Not {
                expr: Box::new(inner),
                loc: tok.loc,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::LParen) => {
                    let lparen = self.cur.pop().expect("peeked");
                    let mut args = Vec::new();
                    if !self.at(TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expression()?);
                            if self.at(TokenKind::Comma) {
                                self.cur.pop();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, "closing parenthesis")
                        .map_err(|e| e.context("to terminate call", lparen.loc))?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        loc: lparen.loc,
                    };
                }
                Some(TokenKind::LBracket) => {
                    let lbracket = self.cur.pop().expect("peeked");
                    expr = self
                        .parse_index_or_slice(expr, lbracket.loc)
                        .map_err(|e| e.context("to terminate array index", lbracket.loc))?;
                }
                Some(TokenKind::Dot) => {
                    let dot = self.cur.pop().expect("peeked");
                    let field = self.expect(TokenKind::Ident, "field name")?;
                    expr = Expr::FieldAccess {
                        object: Box::new(expr),
                        field: field.text,
                        loc: dot.loc,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Parses the remainder of `expr[` — either an index or a slice.
    fn parse_index_or_slice(&mut self, array: Expr, loc: SourceLoc) -> Result<Expr, Diagnostic> {
        // `[:e]`, `[:]`
        if self.at(TokenKind::Colon) {
            self.cur.pop();
            let end = self.parse_slice_end()?;
            self.expect(TokenKind::RBracket, "closing square bracket")?;
            return Ok(Expr::Slice {
                array: Box::new(array),
                begin: None,
                end,
                loc,
            });
        }

        if self.at(TokenKind::RBracket) {
            return Err(Diagnostic::at(
                "expected array index expression",
                self.cur.current_loc(),
            ));
        }

        let first = self.parse_expression()?;
        if self.at(TokenKind::Colon) {
            self.cur.pop();
            let end = self.parse_slice_end()?;
            self.expect(TokenKind::RBracket, "closing square bracket")?;
            return Ok(Expr::Slice {
                array: Box::new(array),
                begin: Some(Box::new(first)),
                end,
                loc,
            });
        }

        self.expect(TokenKind::RBracket, "closing square bracket")?;
        Ok(Expr::Index {
            array: Box::new(array),
            index: Box::new(first),
            loc,
        })
    }

    fn parse_slice_end(&mut self) -> Result<Option<Box<Expr>>, Diagnostic> {
        if self.at(TokenKind::RBracket) {
            Ok(None)
        } else {
            Ok(Some(Box::new(self.parse_expression()?)))
        }
    }

    // === Atoms ===

    fn parse_atom(&mut self) -> Result<Expr, Diagnostic> {
        let tok = match self.cur.peek() {
            Some(tok) => tok.clone(),
            None => {
                return Err(Diagnostic::at(
                    "unexpected end of input; expected expression",
                    self.cur.current_loc(),
                ))
            }
        };

        match tok.kind {
            TokenKind::Number => {
                self.cur.pop();
                Ok(Expr::Literal {
                    value: Literal::Int(parse_number(&tok.text, tok.loc)?),
                    loc: tok.loc,
                })
            }
            TokenKind::Minus => {
                // unary minus: only valid immediately before a number
                self.cur.pop();
                let num = self.expect(TokenKind::Number, "number literal")?;
                let text = format!("-{}", num.text);
                Ok(Expr::Literal {
                    value: Literal::Int(parse_number(&text, num.loc)?),
                    loc: tok.loc,
                })
            }
            TokenKind::String => {
                self.cur.pop();
                Ok(Expr::Literal {
                    value: Literal::Str(tok.text),
                    loc: tok.loc,
                })
            }
            TokenKind::Ident => {
                self.cur.pop();
                match tok.text.as_str() {
                    "true" => Ok(Expr::Literal {
                        value: Literal::Bool(true),
                        loc: tok.loc,
                    }),
                    "false" => Ok(Expr::Literal {
                        value: Literal::Bool(false),
                        loc: tok.loc,
                    }),
                    _ => Ok(Expr::Identifier {
                        name: tok.text,
                        loc: tok.loc,
                    }),
                }
            }
            TokenKind::LParen => {
                self.cur.pop();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "closing parenthesis")?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::Let => self.parse_let(),
            TokenKind::If => self.parse_if(),
            TokenKind::Func => self.parse_func(),
            TokenKind::Match => self.parse_match(),
            _ => Err(Diagnostic::at("unexpected token", tok.loc)),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expr, Diagnostic> {
        let lbracket = self.cur.pop().expect("caller matched '['");
        let mut elems = Vec::new();
        if !self.at(TokenKind::RBracket) {
            loop {
                elems.push(self.parse_expression()?);
                if self.at(TokenKind::Comma) {
                    self.cur.pop();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket, "closing square bracket")
            .map_err(|e| e.context("to terminate array literal", lbracket.loc))?;

        // An element-type annotation may follow; `[` always means indexing
        // here, and an ambiguous `(`/`{`/`func` is resolved by trying the
        // type first.
        let elem_type = self.parse_optional_annotation()?;

        Ok(Expr::ArrayLiteral {
            elems,
            elem_type,
            loc: lbracket.loc,
        })
    }

    fn parse_object_literal(&mut self) -> Result<Expr, Diagnostic> {
        let lbrace = self.cur.pop().expect("caller matched '{'");
        let mut fields = Vec::new();
        loop {
            if self.at(TokenKind::RBrace) {
                self.cur.pop();
                break;
            }
            let key = self
                .expect(TokenKind::Ident, "field name or closing bracket")
                .map_err(|e| e.context("in object literal", lbrace.loc))?;
            self.expect(TokenKind::Colon, "colon")
                .map_err(|e| {
                    e.context(format!("to bind object field {}", key.text), key.loc)
                        .context("in object literal", lbrace.loc)
                })?;
            let value = self.parse_expression()?;
            fields.push((key.text, value));

            if self.at(TokenKind::Comma) {
                self.cur.pop();
            } else {
                self.expect(TokenKind::RBrace, "comma or closing bracket")
                    .map_err(|e| e.context("to terminate object literal", lbrace.loc))?;
                break;
            }
        }
        Ok(Expr::ObjectLiteral {
            fields,
            loc: lbrace.loc,
        })
    }

    fn parse_let(&mut self) -> Result<Expr, Diagnostic> {
        let let_tok = self.cur.pop().expect("caller matched 'let'");
        let mut bindings = Vec::new();
        loop {
            let binding = self
                .parse_binding()
                .map_err(|e| e.context("in let clause", let_tok.loc))?;
            bindings.push(binding);
            if self.at(TokenKind::Comma) {
                self.cur.pop();
            } else {
                break;
            }
        }
        self.expect(TokenKind::In, "\"in\" clause")
            .map_err(|e| e.context("in let expression", let_tok.loc))?;
        let body = self.parse_expression()?;
        Ok(Expr::Let {
            bindings,
            body: Box::new(body),
            loc: let_tok.loc,
        })
    }

    fn parse_binding(&mut self) -> Result<Binding, Diagnostic> {
        let name = self.expect(TokenKind::Ident, "binding name")?;
        let ty = if !self.at(TokenKind::Equal) && self.at_type_start() {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Equal, "'='")?;
        let expr = self.parse_expression()?;
        Ok(Binding {
            name: name.text,
            ty,
            expr,
        })
    }

    fn parse_if(&mut self) -> Result<Expr, Diagnostic> {
        let if_tok = self.cur.pop().expect("caller matched 'if'");
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Then, "\"then\" clause")
            .map_err(|e| e.context("in \"if\" expression", if_tok.loc))?;
        let then = self.parse_expression()?;
        self.expect(TokenKind::Else, "\"else\" clause")
            .map_err(|e| e.context("in \"if\" expression", if_tok.loc))?;
        let els = self.parse_expression()?;
        Ok(Expr::If {
            cond: Box::new(cond),
            then: Box::new(then),
            els: Box::new(els),
            loc: if_tok.loc,
        })
    }

    fn parse_func(&mut self) -> Result<Expr, Diagnostic> {
        let func_tok = self.cur.pop().expect("caller matched 'func'");
        self.expect(TokenKind::LParen, "opening parenthesis")
            .map_err(|e| e.context("in function expression", func_tok.loc))?;

        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let name = self
                    .expect(TokenKind::Ident, "parameter name")
                    .map_err(|e| e.context("in function parameter list", func_tok.loc))?;
                let ty = if self.at(TokenKind::Comma) || self.at(TokenKind::RParen) {
                    Type::ANY
                } else {
                    self.parse_type()
                        .map_err(|e| e.context("in function parameter list", func_tok.loc))?
                };
                params.push(Param {
                    name: name.text,
                    ty,
                });
                if self.at(TokenKind::Comma) {
                    self.cur.pop();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "closing parenthesis")
            .map_err(|e| e.context("in function parameter list", func_tok.loc))?;

        // A return-type annotation may follow; `[` always begins an
        // array-literal body, and an ambiguous `(`/`{`/`func` is resolved
        // by trying the type first.
        let ret = self.parse_optional_annotation()?.unwrap_or(Type::ANY);

        let body = self.parse_expression()?;
        Ok(Expr::Func {
            params,
            ret,
            body: Rc::new(body),
            loc: func_tok.loc,
        })
    }

    fn parse_match(&mut self) -> Result<Expr, Diagnostic> {
        let match_tok = self.cur.pop().expect("caller matched 'match'");
        let binding = self
            .expect(TokenKind::Ident, "match binding")
            .map_err(|e| e.context("in match expression", match_tok.loc))?;
        self.expect(TokenKind::On, "\"on\" clause")
            .map_err(|e| e.context("in match expression", match_tok.loc))?;
        let scrutinee = self.parse_expression()?;

        let mut arms = Vec::new();
        while self.at(TokenKind::Case) {
            let case_tok = self.cur.pop().expect("peeked");
            let ty = self
                .parse_type()
                .map_err(|e| e.context("in match arm", case_tok.loc))?;
            let expr = self.parse_expression()?;
            arms.push(MatchArm { ty, expr });
        }

        Ok(Expr::Match {
            scrutinee: Box::new(scrutinee),
            binding: binding.text,
            arms,
            loc: match_tok.loc,
        })
    }

    // === Type syntax ===

    /// Parses a type: `sum := funcType ("|" funcType)*`.
    pub fn parse_type(&mut self) -> Result<Type, Diagnostic> {
        let mut parts = vec![self.parse_func_type()?];
        while self.at(TokenKind::Pipe) {
            self.cur.pop();
            parts.push(self.parse_func_type()?);
        }
        Ok(Type::sum(parts))
    }

    fn parse_func_type(&mut self) -> Result<Type, Diagnostic> {
        if !self.at(TokenKind::Func) {
            return self.parse_atomic_type();
        }
        let func_tok = self.cur.pop().expect("peeked");
        self.expect(TokenKind::LParen, "opening parenthesis")
            .map_err(|e| e.context("in function type", func_tok.loc))?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_type()?);
                if self.at(TokenKind::Comma) {
                    self.cur.pop();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "comma or closing parenthesis")
            .map_err(|e| e.context("in function type", func_tok.loc))?;

        let ret = if self.at_type_start() {
            self.parse_type()?
        } else {
            Type::ANY
        };
        Ok(Type::func(args, ret))
    }

    fn parse_atomic_type(&mut self) -> Result<Type, Diagnostic> {
        let tok = match self.cur.peek() {
            Some(tok) => tok.clone(),
            None => {
                return Err(Diagnostic::at(
                    "unexpected end of input; expected type",
                    self.cur.current_loc(),
                ))
            }
        };

        match tok.kind {
            TokenKind::Ident => match Primitive::from_name(&tok.text) {
                Some(p) => {
                    self.cur.pop();
                    Ok(Type::Primitive(p))
                }
                None => Err(Diagnostic::at(
                    format!("unknown type '{}'", tok.text),
                    tok.loc,
                )),
            },
            TokenKind::LParen => {
                self.cur.pop();
                let ty = self.parse_type()?;
                self.expect(TokenKind::RParen, "closing parenthesis")?;
                Ok(ty)
            }
            TokenKind::LBracket => {
                self.cur.pop();
                let elem = self.parse_type()?;
                self.expect(TokenKind::RBracket, "closing square bracket")?;
                Ok(Type::list(elem))
            }
            TokenKind::LBrace => self.parse_object_type(),
            TokenKind::Func => self.parse_func_type(),
            _ => Err(Diagnostic::at(
                "unexpected token; expected type",
                tok.loc,
            )),
        }
    }

    fn parse_object_type(&mut self) -> Result<Type, Diagnostic> {
        let lbrace = self.cur.pop().expect("caller matched '{'");
        let mut fields = Vec::new();
        loop {
            if self.at(TokenKind::RBrace) {
                self.cur.pop();
                break;
            }
            let key = self
                .expect(TokenKind::Ident, "field name or closing bracket")
                .map_err(|e| e.context("in object type", lbrace.loc))?;
            self.expect(TokenKind::Colon, "colon")
                .map_err(|e| e.context("in object type", lbrace.loc))?;
            let ty = self.parse_type()?;
            fields.push((key.text, ty));

            if self.at(TokenKind::Comma) {
                self.cur.pop();
            } else {
                self.expect(TokenKind::RBrace, "comma or closing bracket")
                    .map_err(|e| e.context("in object type", lbrace.loc))?;
                break;
            }
        }
        Ok(Type::object(fields))
    }

    // === Helpers ===

    fn peek_kind(&self) -> Option<TokenKind> {
        self.cur.peek().map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    /// True when the next token can begin a type in any position.
    fn at_type_start(&self) -> bool {
        match self.cur.peek() {
            Some(tok) => match tok.kind {
                TokenKind::Func
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace => true,
                TokenKind::Ident => Primitive::from_name(&tok.text).is_some(),
                _ => false,
            },
            None => false,
        }
    }

    /// Parses a trailing optional type annotation (array-literal element
    /// types, function return types).
    ///
    /// A primitive name always starts the annotation. `func`, `{`, and `(`
    /// are ambiguous with a following expression, so the type is attempted
    /// and the cursor rewound when it does not parse. `[` is never an
    /// annotation in these positions — it belongs to the expression
    /// grammar; a bracketed list type is written in parentheses instead.
    fn parse_optional_annotation(&mut self) -> Result<Option<Type>, Diagnostic> {
        if self.at_primitive_name() {
            return self.parse_type().map(Some);
        }
        match self.peek_kind() {
            Some(TokenKind::Func) | Some(TokenKind::LBrace) | Some(TokenKind::LParen) => {
                let mark = self.cur.position();
                match self.parse_type() {
                    Ok(ty) => Ok(Some(ty)),
                    Err(_) => {
                        self.cur.rewind(mark);
                        Ok(None)
                    }
                }
            }
            _ => Ok(None),
        }
    }

    /// True when the next token is one of the five primitive type names.
    fn at_primitive_name(&self) -> bool {
        match self.cur.peek() {
            Some(tok) if tok.kind == TokenKind::Ident => {
                Primitive::from_name(&tok.text).is_some()
            }
            _ => false,
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Diagnostic> {
        match self.cur.peek() {
            Some(tok) if tok.kind == kind => Ok(self.cur.pop().expect("peeked")),
            Some(tok) => Err(Diagnostic::at(
                format!("unexpected token; expected {}", what),
                tok.loc,
            )),
            None => Err(Diagnostic::at(
                format!("unexpected end of input; expected {}", what),
                self.cur.current_loc(),
            )),
        }
    }
}

fn parse_number(text: &str, loc: SourceLoc) -> Result<i64, Diagnostic> {
    text.parse::<i64>()
        .map_err(|_| Diagnostic::at(format!("malformed number literal '{}'", text), loc))
}
