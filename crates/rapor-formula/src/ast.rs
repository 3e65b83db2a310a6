//! Formula expression AST
//!
//! The AST serializes to tagged JSON; the generated document embeds the
//! serialized form and interprets it with a frozen JavaScript copy of the
//! evaluator, so the serde representation here is a wire contract.

use serde::{Deserialize, Serialize};

/// Formula expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Expr {
    /// Numeric literal
    Number { value: f64 },
    /// String literal
    Text { value: String },
    /// `$KEY` reference, bound to the current row at evaluation time
    Field { key: String },
    /// Unary operation
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Binary operation
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Function call
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn number(value: f64) -> Expr {
        Expr::Number { value }
    }

    pub fn text<S: Into<String>>(value: S) -> Expr {
        Expr::Text { value: value.into() }
    }

    pub fn field<S: Into<String>>(key: S) -> Expr {
        Expr::Field { key: key.into() }
    }

    /// Depth-first search for the first call with the given (uppercase) name
    pub fn find_call(&self, name: &str) -> Option<&Expr> {
        match self {
            Expr::Call { name: n, .. } if n == name => Some(self),
            Expr::Call { args, .. } => args.iter().find_map(|a| a.find_call(name)),
            Expr::Unary { operand, .. } => operand.find_call(name),
            Expr::Binary { left, right, .. } => {
                left.find_call(name).or_else(|| right.find_call(name))
            }
            _ => None,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    Neg,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ast_serde_is_tagged() {
        let expr = Expr::Binary {
            op: BinaryOp::Add,
            left: Box::new(Expr::field("A")),
            right: Box::new(Expr::number(1.0)),
        };
        let json = serde_json::to_string(&expr).unwrap();
        assert!(json.contains("\"kind\":\"binary\""));
        assert!(json.contains("\"op\":\"add\""));
        assert!(json.contains("\"kind\":\"field\""));
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }

    #[test]
    fn test_find_call() {
        let expr = Expr::Call {
            name: "IF".into(),
            args: vec![
                Expr::field("X"),
                Expr::Call {
                    name: "RANK".into(),
                    args: vec![Expr::field("Y")],
                },
                Expr::number(0.0),
            ],
        };
        assert!(expr.find_call("RANK").is_some());
        assert!(expr.find_call("SUM").is_none());
    }
}
