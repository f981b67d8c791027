//! The expression AST.
//!
//! The parser produces one [`Expr`] per source file; nodes are immutable
//! after construction and every node carries the [`SourceLoc`] of the
//! token that introduced it. The evaluator walks the same nodes many times
//! (once per comprehension iteration, once per recursive call), so closure
//! bodies are shared behind `Rc` instead of cloned.
//!
//! [`Expr`] implements [`Display`](std::fmt::Display) as a canonical
//! pretty-printer: re-parsing the printed form yields a structurally equal
//! tree.

use crate::source::SourceLoc;
use crate::types::Type;
use std::fmt;
use std::rc::Rc;

/// A literal value appearing in source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// An integer literal (including parser-negated ones).
    Int(i64),
    /// A string literal, already unescaped.
    Str(String),
    /// `true` or `false`.
    Bool(bool),
}

/// Equality operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqOp {
    /// `is`
    Eq,
    /// `is not`
    Ne,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Additive operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOp {
    /// `+`
    Add,
    /// `-`
    Sub,
}

/// Multiplicative operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulOp {
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

macro_rules! fmt_op {
    ($($variant:path => $text:expr),* $(,)?) => {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let s = match self {
                $($variant => $text),*
            };
            write!(f, "{}", s)
        }
    };
}

impl fmt::Display for CmpOp {
    fmt_op!(CmpOp::Lt => "<", CmpOp::Le => "<=", CmpOp::Gt => ">", CmpOp::Ge => ">=");
}

impl fmt::Display for AddOp {
    fmt_op!(AddOp::Add => "+", AddOp::Sub => "-");
}

impl fmt::Display for MulOp {
    fmt_op!(MulOp::Mul => "*", MulOp::Div => "/", MulOp::Rem => "%");
}

/// One `name type? = expr` clause of a `let` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// The bound identifier.
    pub name: String,
    /// The annotated type, when present.
    pub ty: Option<Type>,
    /// The bound expression.
    pub expr: Expr,
}

/// One `name type?` parameter of a `func` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// The parameter name.
    pub name: String,
    /// The declared type; `any` when omitted.
    pub ty: Type,
}

/// One `case type expr` arm of a `match` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    /// The type this arm accepts.
    pub ty: Type,
    /// The arm's expression.
    pub expr: Expr,
}

/// An expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal {
        /// The value.
        value: Literal,
        /// Source position.
        loc: SourceLoc,
    },
    /// A variable reference.
    Identifier {
        /// The referenced name.
        name: String,
        /// Source position.
        loc: SourceLoc,
    },
    /// `[e1, e2, …] type?`
    ArrayLiteral {
        /// The element expressions, in source order.
        elems: Vec<Expr>,
        /// The annotated element type, when present.
        elem_type: Option<Type>,
        /// Source position of the opening bracket.
        loc: SourceLoc,
    },
    /// `{k1: e1, k2: e2, …}`
    ObjectLiteral {
        /// Field name/expression pairs, in source order.
        fields: Vec<(String, Expr)>,
        /// Source position of the opening brace.
        loc: SourceLoc,
    },
    /// `let bindings in body`
    Let {
        /// The binding clauses, in order.
        bindings: Vec<Binding>,
        /// The `in` body.
        body: Box<Expr>,
        /// Source position of the `let` keyword.
        loc: SourceLoc,
    },
    /// `if cond then then else els`
    If {
        /// The condition.
        cond: Box<Expr>,
        /// The `then` branch.
        then: Box<Expr>,
        /// The `else` branch.
        els: Box<Expr>,
        /// Source position of the `if` keyword.
        loc: SourceLoc,
    },
    /// `body for var in iter` — a list comprehension.
    For {
        /// The expression evaluated per element.
        body: Box<Expr>,
        /// The loop variable.
        var: String,
        /// The iterated list expression.
        iter: Box<Expr>,
        /// Source position of the `for` keyword.
        loc: SourceLoc,
    },
    /// `func(params) ret? body`
    Func {
        /// The parameters, in order.
        params: Vec<Param>,
        /// The declared return type; `any` when omitted.
        ret: Type,
        /// The body, shared with closures created from this node.
        body: Rc<Expr>,
        /// Source position of the `func` keyword.
        loc: SourceLoc,
    },
    /// `callee(args)`
    Call {
        /// The called expression.
        callee: Box<Expr>,
        /// The arguments, in order.
        args: Vec<Expr>,
        /// Source position of the call's opening parenthesis.
        loc: SourceLoc,
    },
    /// `array[index]`
    Index {
        /// The indexed expression.
        array: Box<Expr>,
        /// The index expression.
        index: Box<Expr>,
        /// Source position of the opening bracket.
        loc: SourceLoc,
    },
    /// `array[begin? : end?]`
    Slice {
        /// The sliced expression.
        array: Box<Expr>,
        /// The begin bound; defaults to `0`.
        begin: Option<Box<Expr>>,
        /// The end bound; defaults to the length.
        end: Option<Box<Expr>>,
        /// Source position of the opening bracket.
        loc: SourceLoc,
    },
    /// `object.field`
    FieldAccess {
        /// The accessed expression.
        object: Box<Expr>,
        /// The field name.
        field: String,
        /// Source position of the dot.
        loc: SourceLoc,
    },
    /// `not expr`
    Not {
        /// The negated expression.
        expr: Box<Expr>,
        /// Source position of the `not` keyword.
        loc: SourceLoc,
    },
    /// `left and right`
    And {
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
        /// Source position of the operator.
        loc: SourceLoc,
    },
    /// `left or right`
    Or {
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
        /// Source position of the operator.
        loc: SourceLoc,
    },
    /// `left is right` / `left is not right`
    Eq {
        /// Left operand.
        left: Box<Expr>,
        /// The operator.
        op: EqOp,
        /// Right operand.
        right: Box<Expr>,
        /// Source position of the operator.
        loc: SourceLoc,
    },
    /// `left < right` and friends
    Cmp {
        /// Left operand.
        left: Box<Expr>,
        /// The operator.
        op: CmpOp,
        /// Right operand.
        right: Box<Expr>,
        /// Source position of the operator.
        loc: SourceLoc,
    },
    /// `left + right` / `left - right`
    Add {
        /// Left operand.
        left: Box<Expr>,
        /// The operator.
        op: AddOp,
        /// Right operand.
        right: Box<Expr>,
        /// Source position of the operator.
        loc: SourceLoc,
    },
    /// `left * right` / `left / right` / `left % right`
    Mul {
        /// Left operand.
        left: Box<Expr>,
        /// The operator.
        op: MulOp,
        /// Right operand.
        right: Box<Expr>,
        /// Source position of the operator.
        loc: SourceLoc,
    },
    /// `expr as type` — a checked downcast.
    As {
        /// The cast expression.
        expr: Box<Expr>,
        /// The target type.
        ty: Type,
        /// Source position of the `as` keyword.
        loc: SourceLoc,
    },
    /// `match binding on scrutinee case ty expr …`
    Match {
        /// The matched expression.
        scrutinee: Box<Expr>,
        /// The name the scrutinee value is bound to inside arms.
        binding: String,
        /// The arms, in declaration order.
        arms: Vec<MatchArm>,
        /// Source position of the `match` keyword.
        loc: SourceLoc,
    },
}

impl Expr {
    /// The source location of this node.
    pub fn loc(&self) -> SourceLoc {
        match self {
            Expr::Literal { loc, .. }
            | Expr::Identifier { loc, .. }
            | Expr::ArrayLiteral { loc, .. }
            | Expr::ObjectLiteral { loc, .. }
            | Expr::Let { loc, .. }
            | Expr::If { loc, .. }
            | Expr::For { loc, .. }
            | Expr::Func { loc, .. }
            | Expr::Call { loc, .. }
            | Expr::Index { loc, .. }
            | Expr::Slice { loc, .. }
            | Expr::FieldAccess { loc, .. }
            | Expr::Not { loc, .. }
            | Expr::And { loc, .. }
            | Expr::Or { loc, .. }
            | Expr::Eq { loc, .. }
            | Expr::Cmp { loc, .. }
            | Expr::Add { loc, .. }
            | Expr::Mul { loc, .. }
            | Expr::As { loc, .. }
            | Expr::Match { loc, .. } => *loc,
        }
    }

    /// The binding power used by the pretty-printer: higher binds tighter.
    fn power(&self) -> u8 {
        match self {
            Expr::Let { .. }
            | Expr::If { .. }
            | Expr::For { .. }
            | Expr::Func { .. }
            | Expr::Match { .. }
            | Expr::As { .. } => 0,
            Expr::Or { .. } => 1,
            Expr::And { .. } => 2,
            Expr::Eq { .. } => 3,
            Expr::Cmp { .. } => 4,
            Expr::Add { .. } => 5,
            Expr::Mul { .. } => 6,
            Expr::Not { .. } => 7,
            Expr::Call { .. }
            | Expr::Index { .. }
            | Expr::Slice { .. }
            | Expr::FieldAccess { .. } => 8,
            Expr::Literal { .. }
            | Expr::Identifier { .. }
            | Expr::ArrayLiteral { .. }
            | Expr::ObjectLiteral { .. } => 9,
        }
    }

    fn write_prec(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.power() < min {
            write!(f, "(")?;
            self.write(f)?;
            write!(f, ")")
        } else {
            self.write(f)
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value, .. } => match value {
                Literal::Int(n) => write!(f, "{}", n),
                Literal::Bool(b) => write!(f, "{}", b),
                Literal::Str(s) => write_escaped(f, s),
            },
            Expr::Identifier { name, .. } => write!(f, "{}", name),
            Expr::ArrayLiteral {
                elems, elem_type, ..
            } => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    e.write_prec(f, 0)?;
                }
                write!(f, "]")?;
                if let Some(t) = elem_type {
                    write!(f, " ")?;
                    write_annotation(f, t)?;
                }
                Ok(())
            }
            Expr::ObjectLiteral { fields, .. } => {
                write!(f, "{{")?;
                for (i, (k, e)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", k)?;
                    e.write_prec(f, 0)?;
                }
                write!(f, "}}")
            }
            Expr::Let { bindings, body, .. } => {
                write!(f, "let ")?;
                for (i, b) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", b.name)?;
                    if let Some(t) = &b.ty {
                        write!(f, " {}", t)?;
                    }
                    write!(f, " = ")?;
                    b.expr.write_prec(f, 0)?;
                }
                write!(f, " in ")?;
                body.write_prec(f, 0)
            }
            Expr::If {
                cond, then, els, ..
            } => {
                write!(f, "if ")?;
                cond.write_prec(f, 0)?;
                write!(f, " then ")?;
                then.write_prec(f, 0)?;
                write!(f, " else ")?;
                els.write_prec(f, 0)
            }
            Expr::For {
                body, var, iter, ..
            } => {
                body.write_prec(f, 1)?;
                write!(f, " for {} in ", var)?;
                iter.write_prec(f, 1)
            }
            Expr::Func {
                params, ret, body, ..
            } => {
                write!(f, "func(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p.name)?;
                    if p.ty != Type::ANY {
                        write!(f, " {}", p.ty)?;
                    }
                }
                write!(f, ")")?;
                if *ret != Type::ANY {
                    write!(f, " ")?;
                    write_annotation(f, ret)?;
                }
                write!(f, " ")?;
                body.write_prec(f, 0)
            }
            Expr::Call { callee, args, .. } => {
                callee.write_prec(f, 8)?;
                write!(f, "(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    a.write_prec(f, 0)?;
                }
                write!(f, ")")
            }
            Expr::Index { array, index, .. } => {
                array.write_prec(f, 8)?;
                write!(f, "[")?;
                index.write_prec(f, 0)?;
                write!(f, "]")
            }
            Expr::Slice {
                array, begin, end, ..
            } => {
                array.write_prec(f, 8)?;
                write!(f, "[")?;
                if let Some(b) = begin {
                    b.write_prec(f, 0)?;
                }
                write!(f, ":")?;
                if let Some(e) = end {
                    e.write_prec(f, 0)?;
                }
                write!(f, "]")
            }
            Expr::FieldAccess { object, field, .. } => {
                object.write_prec(f, 8)?;
                write!(f, ".{}", field)
            }
            Expr::Not { expr, .. } => {
                write!(f, "not ")?;
                expr.write_prec(f, 7)
            }
            Expr::And { left, right, .. } => {
                left.write_prec(f, 3)?;
                write!(f, " and ")?;
                right.write_prec(f, 2)
            }
            Expr::Or { left, right, .. } => {
                left.write_prec(f, 2)?;
                write!(f, " or ")?;
                right.write_prec(f, 1)
            }
            Expr::Eq {
                left, op, right, ..
            } => {
                left.write_prec(f, 4)?;
                match op {
                    EqOp::Eq => write!(f, " is ")?,
                    EqOp::Ne => write!(f, " is not ")?,
                }
                right.write_prec(f, 4)
            }
            Expr::Cmp {
                left, op, right, ..
            } => {
                left.write_prec(f, 4)?;
                write!(f, " {} ", op)?;
                right.write_prec(f, 5)
            }
            Expr::Add {
                left, op, right, ..
            } => {
                left.write_prec(f, 5)?;
                write!(f, " {} ", op)?;
                right.write_prec(f, 6)
            }
            Expr::Mul {
                left, op, right, ..
            } => {
                left.write_prec(f, 6)?;
                write!(f, " {} ", op)?;
                right.write_prec(f, 7)
            }
            Expr::As { expr, ty, .. } => {
                expr.write_prec(f, 1)?;
                write!(f, " as {}", ty)
            }
            Expr::Match {
                scrutinee,
                binding,
                arms,
                ..
            } => {
                write!(f, "match {} on ", binding)?;
                scrutinee.write_prec(f, 1)?;
                for arm in arms {
                    write!(f, " case {} ", arm.ty)?;
                    arm.expr.write_prec(f, 1)?;
                }
                Ok(())
            }
        }
    }
}

/// Writes a trailing type annotation, parenthesized when its display would
/// start with `[` — in annotation position a bare bracket reads as part of
/// the expression grammar.
fn write_annotation(f: &mut fmt::Formatter<'_>, ty: &Type) -> fmt::Result {
    let bracket_first = match ty {
        Type::List(_) => true,
        Type::Sum(branches) => matches!(branches.first(), Some(Type::List(_))),
        _ => false,
    };
    if bracket_first {
        write!(f, "({})", ty)
    } else {
        write!(f, "{}", ty)
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in s.chars() {
        match ch {
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            '\\' => write!(f, "\\\\")?,
            '"' => write!(f, "\\\"")?,
            other => write!(f, "{}", other)?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f)
    }
}
