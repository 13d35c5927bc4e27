//! Expression AST
//!
//! Defines the parsed form of a datum expression, the operator and
//! built-in function tables, and static reference extraction.

use serde::{Deserialize, Serialize};

/// The value type all expressions evaluate to.
///
/// The expression language is uniformly floating point; there are no
/// other value kinds.
pub type Value = f64;

/// Binary operators, in the usual precedence order (lowest first:
/// `+ -`, then `* / %`, then `^`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    Neg,
}

/// The fixed table of built-in functions.
///
/// The set is static and known at parse time, so unknown names and wrong
/// argument counts are parse errors rather than evaluation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Builtin {
    Min,
    Max,
    Pow,
    Atan2,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Round,
}

impl Builtin {
    /// Look up a builtin by its source-text name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "pow" => Builtin::Pow,
            "atan2" => Builtin::Atan2,
            "sin" => Builtin::Sin,
            "cos" => Builtin::Cos,
            "tan" => Builtin::Tan,
            "asin" => Builtin::Asin,
            "acos" => Builtin::Acos,
            "atan" => Builtin::Atan,
            "sqrt" => Builtin::Sqrt,
            "abs" => Builtin::Abs,
            "floor" => Builtin::Floor,
            "ceil" => Builtin::Ceil,
            "round" => Builtin::Round,
            _ => return None,
        })
    }

    /// The number of arguments the builtin takes.
    pub fn arity(&self) -> usize {
        match self {
            Builtin::Min | Builtin::Max | Builtin::Pow | Builtin::Atan2 => 2,
            _ => 1,
        }
    }

    /// The source-text name of the builtin.
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Pow => "pow",
            Builtin::Atan2 => "atan2",
            Builtin::Sin => "sin",
            Builtin::Cos => "cos",
            Builtin::Tan => "tan",
            Builtin::Asin => "asin",
            Builtin::Acos => "acos",
            Builtin::Atan => "atan",
            Builtin::Sqrt => "sqrt",
            Builtin::Abs => "abs",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
            Builtin::Round => "round",
        }
    }
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A numeric literal.
    Number(Value),
    /// A reference to another datum by name: bare (`x`) for a sibling on
    /// the same node, or qualified (`node.x`) across nodes.
    Ref(String),
    /// A unary operation.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// A binary operation.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// A call to a built-in function. Arity is validated at parse time.
    Call { func: Builtin, args: Vec<Expr> },
}

impl Expr {
    /// Collect every datum reference in the expression, in first-seen
    /// order with duplicates removed.
    ///
    /// Extraction is purely syntactic: it reports what the expression
    /// mentions regardless of whether the names currently resolve.
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ref(name) => {
                if !refs.contains(&name.as_str()) {
                    refs.push(name);
                }
            }
            Expr::Unary { operand, .. } => operand.collect_references(refs),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_references(refs);
                rhs.collect_references(refs);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_references(refs);
                }
            }
        }
    }
}
