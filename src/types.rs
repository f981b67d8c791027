//! Type terms and the structural subtyping relation.
//!
//! Types are structural: two object types with the same fields are the same
//! type, whatever expressions produced them. The relation
//! [`Type::is_supertype_of`] (written `T₁ ≽ T₂`) means a value of runtime
//! type `T₂` is assignable where `T₁` is required:
//!
//! - `any` is a supertype of everything.
//! - Primitives are supertypes of themselves only.
//! - Lists are covariant in their element type.
//! - Object subtyping is width + depth: the required type's fields must all
//!   be present (the value may carry extra fields), each at a subtype.
//! - Function types are contravariant in their arguments and covariant in
//!   their return type.
//! - A sum is required ⇒ some branch must accept; a sum is supplied ⇒ every
//!   branch must be accepted.
//!
//! Sum types are only built through the normalizing constructor
//! [`Type::sum`], which flattens nesting, drops redundant branches, absorbs
//! into `any`, and unwraps single-branch sums.
//!
//! # Example
//!
//! ```rust
//! use rill::types::{Primitive, Type};
//!
//! let t = Type::sum([Type::INT, Type::STR, Type::INT]);
//! assert_eq!(t, Type::sum([Type::INT, Type::STR]));
//! assert!(t.is_supertype_of(&Type::INT));
//! assert_eq!(Type::sum([Type::INT, Type::Primitive(Primitive::Any)]), Type::ANY);
//! ```

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Primitive {
    /// Signed integers.
    Int,
    /// UTF-8 strings.
    Str,
    /// Booleans.
    Bool,
    /// The single-valued type; result of side-effecting builtins.
    Unit,
    /// The top type; accepts every value.
    Any,
}

impl Primitive {
    /// Parses one of the five primitive type names.
    pub fn from_name(name: &str) -> Option<Primitive> {
        Some(match name {
            "int" => Primitive::Int,
            "string" => Primitive::Str,
            "bool" => Primitive::Bool,
            "unit" => Primitive::Unit,
            "any" => Primitive::Any,
            _ => return None,
        })
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Primitive::Int => "int",
            Primitive::Str => "string",
            Primitive::Bool => "bool",
            Primitive::Unit => "unit",
            Primitive::Any => "any",
        };
        write!(f, "{}", s)
    }
}

/// A type term.
///
/// Sum terms uphold these invariants when built via [`Type::sum`]: no
/// nested sums, no `any` branch, no branch that is a supertype of another,
/// and never exactly one branch. The empty sum can arise as the element
/// type of an empty list; it is the bottom type (assignable everywhere,
/// accepting nothing).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    /// A primitive type.
    Primitive(Primitive),
    /// Homogeneous list with the given element type.
    List(Box<Type>),
    /// Structural record; field order is irrelevant.
    Object(BTreeMap<String, Type>),
    /// Function type.
    Func {
        /// Argument types, in order.
        args: Vec<Type>,
        /// Return type.
        ret: Box<Type>,
    },
    /// Normalized union of two or more branches (or zero: the bottom type).
    Sum(Vec<Type>),
}

impl Type {
    /// The `int` type.
    pub const INT: Type = Type::Primitive(Primitive::Int);
    /// The `string` type.
    pub const STR: Type = Type::Primitive(Primitive::Str);
    /// The `bool` type.
    pub const BOOL: Type = Type::Primitive(Primitive::Bool);
    /// The `unit` type.
    pub const UNIT: Type = Type::Primitive(Primitive::Unit);
    /// The `any` type.
    pub const ANY: Type = Type::Primitive(Primitive::Any);

    /// Builds a list type.
    pub fn list(elem: Type) -> Type {
        Type::List(Box::new(elem))
    }

    /// Builds an object type from field pairs.
    pub fn object<I, S>(fields: I) -> Type
    where
        I: IntoIterator<Item = (S, Type)>,
        S: Into<String>,
    {
        Type::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds a function type.
    pub fn func<I>(args: I, ret: Type) -> Type
    where
        I: IntoIterator<Item = Type>,
    {
        Type::Func {
            args: args.into_iter().collect(),
            ret: Box::new(ret),
        }
    }

    /// Builds the normalized sum of the given types.
    ///
    /// Arguments are folded into an accumulator that stays in normal form
    /// after every step: nested sums are flattened into their branches, an
    /// argument already covered by some branch is skipped, branches covered
    /// by a new argument are evicted, and `any` absorbs the whole sum. A
    /// single surviving branch is returned unwrapped.
    pub fn sum<I>(types: I) -> Type
    where
        I: IntoIterator<Item = Type>,
    {
        let mut acc: Vec<Type> = Vec::new();
        for t in types {
            insert_branch(&mut acc, t);
        }
        if acc.len() == 1 {
            acc.pop().expect("len checked")
        } else {
            Type::Sum(acc)
        }
    }

    /// The supertype relation: `self ≽ other` means a value of runtime type
    /// `other` is assignable where `self` is required.
    ///
    /// The relation is reflexive and transitive, but not antisymmetric.
    pub fn is_supertype_of(&self, other: &Type) -> bool {
        // A supplied sum must be accepted branch by branch; a required sum
        // accepts through any one branch. The supplied side is inspected
        // first so two sums compare branch-wise.
        if let Type::Sum(branches) = other {
            return branches.iter().all(|b| self.is_supertype_of(b));
        }
        if let Type::Sum(branches) = self {
            return branches.iter().any(|b| b.is_supertype_of(other));
        }

        match (self, other) {
            (Type::Primitive(Primitive::Any), _) => true,
            (Type::Primitive(p1), Type::Primitive(p2)) => p1 == p2,
            (Type::Primitive(_), _) => false,
            (Type::List(e1), Type::List(e2)) => e1.is_supertype_of(e2),
            (Type::List(_), _) => false,
            (Type::Object(f1), Type::Object(f2)) => f1.iter().all(|(k, t1)| {
                f2.get(k)
                    .map(|t2| t1.is_supertype_of(t2))
                    .unwrap_or(false)
            }),
            (Type::Object(_), _) => false,
            (
                Type::Func {
                    args: a1,
                    ret: r1,
                },
                Type::Func {
                    args: a2,
                    ret: r2,
                },
            ) => {
                a1.len() == a2.len()
                    && a1
                        .iter()
                        .zip(a2.iter())
                        .all(|(t1, t2)| t2.is_supertype_of(t1))
                    && r1.is_supertype_of(r2)
            }
            (Type::Func { .. }, _) => false,
            (Type::Sum(_), _) => unreachable!("sums handled above"),
        }
    }
}

/// Inserts one type into a normalized accumulator, keeping it normalized.
fn insert_branch(acc: &mut Vec<Type>, t: Type) {
    match t {
        Type::Sum(branches) => {
            for b in branches {
                insert_branch(acc, b);
            }
        }
        t => {
            if acc.iter().any(|b| b.is_supertype_of(&t)) {
                return;
            }
            acc.retain(|b| !t.is_supertype_of(b));
            acc.push(t);
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p),
            Type::List(elem) => write!(f, "[{}]", elem),
            Type::Object(fields) => {
                write!(f, "{{")?;
                for (i, (k, t)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, t)?;
                }
                write!(f, "}}")
            }
            Type::Func { args, ret } => {
                write!(f, "func(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ") {}", ret)
            }
            Type::Sum(branches) => {
                if branches.is_empty() {
                    return write!(f, "never");
                }
                for (i, b) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    // parenthesize nested function types so the arrow-less
                    // syntax stays unambiguous
                    match b {
                        Type::Func { .. } => write!(f, "({})", b)?,
                        _ => write!(f, "{}", b)?,
                    }
                }
                Ok(())
            }
        }
    }
}
