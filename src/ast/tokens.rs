use serde::Serialize;

/// Source position of a token or node (0-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Self {
        Position { line, col }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

/// Category of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Quoted string, or the whole input of a non-formula cell
    ///
    /// # Examples
    /// ```text
    /// "groceries"
    /// 'rent'
    /// ```
    String,

    /// Run of spaces, tabs, newlines or non-breaking spaces
    Whitespace,

    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftCurly,
    /// `}`
    RightCurly,
    /// `,`
    Comma,

    /// Digit run
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 20170101
    /// ```
    Int,

    /// Digit run, `.`, digit run
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// ```
    Float,

    /// `true` or `false`
    Boolean,

    /// Identifier, keyword (`from`, `if`, `select`, ...) or cell name
    ///
    /// # Examples
    /// ```text
    /// transactions
    /// budget201701
    /// total_spent
    /// ```
    Symbol,

    /// `.` for member access
    Dot,

    /// `!` for sheet references (`budget201701!total`)
    Exclaim,

    /// Arithmetic, comparison and word operators (`+`, `!=~`, `and`, ...)
    Operator,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::String => "string",
            TokenKind::Whitespace => "whitespace",
            TokenKind::LeftParen => "left-paren",
            TokenKind::RightParen => "right-paren",
            TokenKind::LeftBracket => "left-bracket",
            TokenKind::RightBracket => "right-bracket",
            TokenKind::LeftCurly => "left-curly",
            TokenKind::RightCurly => "right-curly",
            TokenKind::Comma => "comma",
            TokenKind::Int => "int",
            TokenKind::Float => "float",
            TokenKind::Boolean => "boolean",
            TokenKind::Symbol => "symbol",
            TokenKind::Dot => "dot",
            TokenKind::Exclaim => "exclaim",
            TokenKind::Operator => "operator",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lexed token. The raw text is kept as-is; numbers are parsed by the
/// parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, line: usize, col: usize) -> Self {
        Token {
            kind,
            value: value.into(),
            line,
            col,
        }
    }

    pub fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }

    pub fn is(&self, kind: TokenKind, value: &str) -> bool {
        self.kind == kind && self.value == value
    }
}
