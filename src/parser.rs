use thiserror::Error;

use crate::{
    ast::{BinOp, Node, NodeKind, Position, Property, QueryNode, SelectItem, Token, TokenKind, UnaryOp},
    lexer::{LexError, Lexer},
    value::Value,
};

/// Syntax errors. Every positioned variant renders as
/// `[line, col] message:` followed by the offending source line and a caret.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("[{}, {}] {message}:\n{excerpt}", .line + 1, .col + 1)]
    Syntax {
        message: String,
        line: usize,
        col: usize,
        excerpt: String,
    },

    #[error("{message}\n\nSource:\n{src}\n")]
    UnexpectedEof { message: String, src: String },

    #[error("{source}:\n{excerpt}")]
    Lex { source: LexError, excerpt: String },
}

impl ParseError {
    pub fn position(&self) -> Option<Position> {
        match self {
            ParseError::Syntax { line, col, .. } => Some(Position::new(*line, *col)),
            ParseError::Lex { source, .. } => Some(source.pos()),
            ParseError::UnexpectedEof { .. } => None,
        }
    }
}

/// Parse one cell's source into a `Root` node.
pub fn parse(source: &str) -> Result<Node, ParseError> {
    Parser::new(source).parse()
}

pub struct Parser {
    src: String,
    lexer: Lexer,
    peeked: Option<Token>,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Parser {
            src: source.to_string(),
            lexer: Lexer::new(source),
            peeked: None,
        }
    }

    fn excerpt(&self, line: usize, col: usize) -> String {
        let text = self.src.split('\n').nth(line).unwrap_or("");
        format!("{}\n{}^", text, " ".repeat(col))
    }

    fn fail_at(&self, message: impl Into<String>, line: usize, col: usize) -> ParseError {
        ParseError::Syntax {
            message: message.into(),
            line,
            col,
            excerpt: self.excerpt(line, col),
        }
    }

    fn eof(&self, message: impl Into<String>) -> ParseError {
        ParseError::UnexpectedEof {
            message: message.into(),
            src: self.src.clone(),
        }
    }

    /// Error positioned at the upcoming token, or an end-of-input error.
    fn fail(&mut self, message: &str) -> ParseError {
        let pos = match self.peek_token() {
            Ok(tok) => tok.map(|t| (t.line, t.col)),
            Err(e) => return e,
        };
        match pos {
            Some((line, col)) => self.fail_at(message, line, col),
            None => self.eof(message),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        if let Some(tok) = self.peeked.take() {
            return Ok(Some(tok));
        }
        loop {
            let tok = self.lexer.next_token().map_err(|e| {
                let pos = e.pos();
                ParseError::Lex {
                    excerpt: self.excerpt(pos.line, pos.col),
                    source: e,
                }
            })?;
            match tok {
                Some(t) if t.kind == TokenKind::Whitespace => continue,
                other => return Ok(other),
            }
        }
    }

    fn peek_token(&mut self) -> Result<Option<&Token>, ParseError> {
        if self.peeked.is_none() {
            self.peeked = self.next_token()?;
        }
        Ok(self.peeked.as_ref())
    }

    fn check(&mut self, kind: TokenKind, value: Option<&str>) -> Result<bool, ParseError> {
        Ok(match self.peek_token()? {
            Some(tok) => tok.kind == kind && value.is_none_or(|v| tok.value == v),
            None => false,
        })
    }

    fn skip(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        let found = self.check(kind, None)?;
        if found {
            self.peeked = None;
        }
        Ok(found)
    }

    fn skip_value(&mut self, kind: TokenKind, value: &str) -> Result<bool, ParseError> {
        let found = self.check(kind, Some(value))?;
        if found {
            self.peeked = None;
        }
        Ok(found)
    }

    fn skip_symbol(&mut self, value: &str) -> Result<bool, ParseError> {
        self.skip_value(TokenKind::Symbol, value)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        match self.next_token()? {
            Some(tok) if tok.kind == kind => Ok(tok),
            Some(tok) => Err(self.fail_at(
                format!("expected {}, got {}", kind, tok.kind),
                tok.line,
                tok.col,
            )),
            None => Err(self.eof(format!("expected {}, got end of file", kind))),
        }
    }

    /// Parse a complete formula. Empty (or whitespace-only) input yields a
    /// `Root` without children.
    pub fn parse(&mut self) -> Result<Node, ParseError> {
        let root_pos = Position::default();
        if self.lexer.is_finished() {
            return Ok(Node::new(NodeKind::Root(vec![]), root_pos));
        }

        let expr = self.parse_expression()?;

        if let Some(tok) = self.next_token()? {
            return Err(self.fail_at(
                format!("Unexpected token after expression: {}", tok.value),
                tok.line,
                tok.col,
            ));
        }

        Ok(Node::new(NodeKind::Root(vec![expr]), root_pos))
    }

    pub fn parse_expression(&mut self) -> Result<Node, ParseError> {
        self.parse_or()
    }

    fn binop(op: BinOp, pos: Position, left: Node, right: Node) -> Node {
        Node::new(
            NodeKind::BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            pos,
        )
    }

    fn parse_or(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_and()?;
        while self.skip_value(TokenKind::Operator, "or")? {
            let right = self.parse_and()?;
            left = Self::binop(BinOp::Or, left.pos, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_not()?;
        while self.skip_value(TokenKind::Operator, "and")? {
            let right = self.parse_not()?;
            left = Self::binop(BinOp::And, left.pos, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Node, ParseError> {
        if self.check(TokenKind::Operator, Some("not"))? {
            let tok = self.next_token()?;
            let pos = tok.map(|t| t.pos()).unwrap_or_default();
            let target = self.parse_not()?;
            return Ok(Node::new(
                NodeKind::UnaryOp {
                    op: UnaryOp::Not,
                    target: Box::new(target),
                },
                pos,
            ));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_add()?;

        loop {
            let op = match self.peek_token()? {
                Some(tok) if tok.kind == TokenKind::Operator => {
                    BinOp::comparison(&tok.value).map(|op| (op, tok.pos()))
                }
                _ => None,
            };
            let Some((op, pos)) = op else {
                break;
            };
            self.peeked = None;
            let right = self.parse_add()?;
            node = Self::binop(op, pos, node, right);
        }

        Ok(node)
    }

    fn parse_add(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_sub()?;
        while self.skip_value(TokenKind::Operator, "+")? {
            let right = self.parse_sub()?;
            left = Self::binop(BinOp::Add, left.pos, left, right);
        }
        Ok(left)
    }

    fn parse_sub(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_mul()?;
        while self.skip_value(TokenKind::Operator, "-")? {
            let right = self.parse_mul()?;
            left = Self::binop(BinOp::Subtract, left.pos, left, right);
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_div()?;
        while self.skip_value(TokenKind::Operator, "*")? {
            let right = self.parse_div()?;
            left = Self::binop(BinOp::Multiply, left.pos, left, right);
        }
        Ok(left)
    }

    fn parse_div(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_unary()?;
        while self.skip_value(TokenKind::Operator, "/")? {
            let right = self.parse_unary()?;
            left = Self::binop(BinOp::Divide, left.pos, left, right);
        }
        Ok(left)
    }

    /// Negative number literals are folded here; any other negation becomes
    /// a `UnaryOp`.
    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        let pos = match self.peek_token()? {
            Some(tok) if tok.is(TokenKind::Operator, "-") => Some(tok.pos()),
            _ => None,
        };
        let Some(pos) = pos else {
            return self.parse_primary();
        };
        self.peeked = None;

        match self.peek_token()?.map(|tok| tok.kind) {
            Some(TokenKind::Int) | Some(TokenKind::Float) => {
                let tok = self.expect_number()?;
                let value = match self.number_value(&tok)? {
                    Value::Integer(n) => Value::Integer(-n),
                    Value::Float(n) => Value::Float(-n),
                    other => other,
                };
                Ok(Node::new(NodeKind::Literal(value), pos))
            }
            _ => {
                let target = self.parse_unary()?;
                Ok(Node::new(
                    NodeKind::UnaryOp {
                        op: UnaryOp::Negate,
                        target: Box::new(target),
                    },
                    pos,
                ))
            }
        }
    }

    fn expect_number(&mut self) -> Result<Token, ParseError> {
        match self.next_token()? {
            Some(tok) => Ok(tok),
            None => Err(self.eof("expected number, got end of file")),
        }
    }

    fn number_value(&self, tok: &Token) -> Result<Value, ParseError> {
        match tok.kind {
            // Literals beyond i64 degrade to floats
            TokenKind::Int => match tok.value.parse::<i64>() {
                Ok(n) => Ok(Value::Integer(n)),
                Err(_) => tok
                    .value
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| self.fail_at(format!("Invalid integer: {}", tok.value), tok.line, tok.col)),
            },
            _ => tok
                .value
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.fail_at(format!("Invalid float: {}", tok.value), tok.line, tok.col)),
        }
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let Some(tok) = self.next_token()? else {
            return Err(self.eof("expected expression, got end of file"));
        };
        let pos = tok.pos();

        match tok.kind {
            TokenKind::String => Ok(Node::literal(tok.value, pos)),
            TokenKind::Int | TokenKind::Float => {
                let value = self.number_value(&tok)?;
                Ok(Node::new(NodeKind::Literal(value), pos))
            }
            TokenKind::Boolean => Ok(Node::literal(tok.value == "true", pos)),
            TokenKind::Symbol => match tok.value.as_str() {
                "from" => self.parse_query(pos),
                "if" => self.parse_if(pos),
                _ => {
                    let symbol = Node::symbol(tok.value, pos);
                    self.parse_postfix(symbol)
                }
            },
            TokenKind::LeftParen => {
                let node = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                Ok(node)
            }
            _ => Err(self.fail_at(format!("Unexpected token: {}", tok.value), tok.line, tok.col)),
        }
    }

    fn parse_if(&mut self, pos: Position) -> Result<Node, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;

        self.expect(TokenKind::LeftCurly)?;
        let body = self.parse_expression()?;
        self.expect(TokenKind::RightCurly)?;

        let mut else_ = None;
        if self.skip_symbol("else")? {
            self.expect(TokenKind::LeftCurly)?;
            else_ = Some(Box::new(self.parse_expression()?));
            self.expect(TokenKind::RightCurly)?;
        }

        Ok(Node::new(
            NodeKind::If {
                cond: Box::new(cond),
                body: Box::new(body),
                else_,
            },
            pos,
        ))
    }

    /// Parse the rest of a query; `from` is already consumed.
    fn parse_query(&mut self, pos: Position) -> Result<Node, ParseError> {
        let table = self.expect(TokenKind::Symbol)?.value;

        let mut where_ = None;
        if self.skip_symbol("where")? {
            where_ = Some(self.parse_expression()?);
        }

        let mut groupby = None;
        if self.skip_symbol("groupby")? {
            groupby = Some(self.parse_expression()?);
        }

        let mut select = vec![];
        let calculated;

        if self.skip_symbol("select")? {
            calculated = false;
            self.expect(TokenKind::LeftCurly)?;

            let mut check_comma = false;
            while !self.skip(TokenKind::RightCurly)? {
                if check_comma && !self.skip(TokenKind::Comma)? {
                    let value = self.peek_token()?.map(|t| t.value.clone()).unwrap_or_default();
                    return Err(self.fail(&format!("Unexpected token in query select: {}", value)));
                }

                let expr = self.parse_expression()?;
                let mut alias = None;
                if self.skip_symbol("as")? {
                    alias = Some(self.expect(TokenKind::Symbol)?.value);
                }
                select.push(SelectItem { expr, alias });
                check_comma = true;
            }
        } else if self.skip_symbol("calculate")? {
            calculated = true;
            self.expect(TokenKind::LeftCurly)?;
            let expr = self.parse_expression()?;
            select.push(SelectItem { expr, alias: None });

            if !self.skip(TokenKind::RightCurly)? {
                return Err(self.fail("Only one expression allowed for `calculate`"));
            }
        } else {
            return Err(self.fail("Expected either the `select` or `calculate` keyword"));
        }

        Ok(Node::new(
            NodeKind::Query(Box::new(QueryNode {
                table,
                select,
                where_,
                groupby,
                calculated,
            })),
            pos,
        ))
    }

    fn parse_postfix(&mut self, mut node: Node) -> Result<Node, ParseError> {
        loop {
            let (kind, pos) = match self.peek_token()? {
                Some(tok) => (tok.kind, tok.pos()),
                None => break,
            };

            match kind {
                TokenKind::LeftParen => {
                    let args = self.parse_args()?;
                    node = Node::new(
                        NodeKind::FunCall {
                            callee: Box::new(node),
                            args: Box::new(args),
                        },
                        pos,
                    );
                }
                TokenKind::Dot => {
                    self.peeked = None;
                    let name = self.expect_name("Expected field name after '.'")?;
                    let property_pos = name.pos();
                    node = Node::new(
                        NodeKind::Member {
                            object: Box::new(node),
                            property: Property {
                                name: name.value,
                                pos: property_pos,
                            },
                        },
                        pos,
                    );
                }
                TokenKind::Exclaim => {
                    self.peeked = None;
                    let name = self.expect_name("Expected cell name in sheet reference")?;
                    let sheet = match node.as_symbol() {
                        Some(sheet) if !sheet.contains('!') => sheet.to_string(),
                        _ => {
                            return Err(self.fail_at(
                                "Sheet reference must follow a sheet name",
                                pos.line,
                                pos.col,
                            ));
                        }
                    };
                    node = Node::symbol(format!("{}!{}", sheet, name.value), node.pos);
                }
                _ => break,
            }
        }

        Ok(node)
    }

    fn expect_name(&mut self, message: &str) -> Result<Token, ParseError> {
        match self.next_token()? {
            Some(tok) if tok.kind == TokenKind::Symbol => Ok(tok),
            Some(tok) => Err(self.fail_at(message, tok.line, tok.col)),
            None => Err(self.eof(message)),
        }
    }

    fn parse_args(&mut self) -> Result<Node, ParseError> {
        let open = self.expect(TokenKind::LeftParen)?;
        let mut args = vec![];
        let mut check_comma = false;

        loop {
            match self.peek_token()?.map(|tok| tok.kind) {
                None => return Err(self.eof("expected right-paren, got end of file")),
                Some(TokenKind::RightParen) => {
                    self.peeked = None;
                    break;
                }
                Some(_) => {}
            }

            if check_comma && !self.skip(TokenKind::Comma)? {
                return Err(self.fail("Expected comma after function argument"));
            }

            args.push(self.parse_expression()?);
            check_comma = true;
        }

        Ok(Node::new(NodeKind::NodeList(args), open.pos()))
    }
}
