use serde::Serialize;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    // Comparison
    /// Equal (`=`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,
    /// Pattern match (`=~`), SQL `LIKE`
    Like,
    /// Negated pattern match (`!=~`), SQL `NOT LIKE`
    NotLike,

    // Arithmetic
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,

    // Logical
    /// Logical AND (`and`)
    And,
    /// Logical OR (`or`)
    Or,
}

impl BinOp {
    /// Comparison operator for a token value, as accepted in a comparison chain.
    pub fn comparison(value: &str) -> Option<BinOp> {
        match value {
            "=" => Some(BinOp::Equal),
            "!=" => Some(BinOp::NotEqual),
            "<" => Some(BinOp::LessThan),
            ">" => Some(BinOp::GreaterThan),
            "<=" => Some(BinOp::LessEqual),
            ">=" => Some(BinOp::GreaterEqual),
            "=~" => Some(BinOp::Like),
            "!=~" => Some(BinOp::NotLike),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Equal => "=",
            BinOp::NotEqual => "!=",
            BinOp::LessThan => "<",
            BinOp::GreaterThan => ">",
            BinOp::LessEqual => "<=",
            BinOp::GreaterEqual => ">=",
            BinOp::Like => "=~",
            BinOp::NotLike => "!=~",
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    /// Arithmetic negation (`-`)
    Negate,
    /// Logical negation (`not`)
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "not",
        }
    }
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
