// tests/lexer_tests.rs

use sheet_lang::lexer::{tokenize, LexError, Lexer};
use sheet_lang::{Token, TokenKind};

fn all_tokens(src: &str) -> Vec<Token> {
    let mut lexer = tokenize(src);
    let mut out = vec![];
    while let Some(tok) = lexer.next_token().unwrap() {
        if tok.kind != TokenKind::Whitespace {
            out.push(tok);
        }
    }
    out
}

fn kinds(src: &str) -> Vec<(TokenKind, String)> {
    all_tokens(src).into_iter().map(|t| (t.kind, t.value)).collect()
}

// ============================================================================
// Mode Detection
// ============================================================================

#[test]
fn test_plain_text_is_one_string_token() {
    let mut lexer = Lexer::new("  Groceries + rent");
    let tok = lexer.next_token().unwrap().unwrap();
    assert_eq!(tok.kind, TokenKind::String);
    assert_eq!(tok.value, "Groceries + rent");
    assert_eq!((tok.line, tok.col), (0, 2));
    assert!(lexer.is_finished());
    assert_eq!(lexer.next_token().unwrap(), None);
}

#[test]
fn test_empty_and_whitespace_input() {
    for src in ["", "   ", "\n\t "] {
        let mut lexer = tokenize(src);
        assert!(lexer.is_finished(), "{:?} should be finished", src);
        assert_eq!(lexer.next_token().unwrap(), None);
    }
}

#[test]
fn test_formula_mode_consumes_equals() {
    let lexer = tokenize("  =1");
    assert!(!lexer.is_finished());
    assert_eq!(kinds("  =1"), vec![(TokenKind::Int, "1".to_string())]);
}

#[test]
fn test_equals_after_formula_start_is_operator() {
    assert_eq!(
        kinds("=a = b"),
        vec![
            (TokenKind::Symbol, "a".to_string()),
            (TokenKind::Operator, "=".to_string()),
            (TokenKind::Symbol, "b".to_string()),
        ]
    );
}

// ============================================================================
// Numbers, Booleans and Symbols
// ============================================================================

#[test]
fn test_numbers() {
    assert_eq!(
        kinds("=1 + 2.5 * 30"),
        vec![
            (TokenKind::Int, "1".to_string()),
            (TokenKind::Operator, "+".to_string()),
            (TokenKind::Float, "2.5".to_string()),
            (TokenKind::Operator, "*".to_string()),
            (TokenKind::Int, "30".to_string()),
        ]
    );
}

#[test]
fn test_minus_is_separate_token() {
    assert_eq!(
        kinds("=-5"),
        vec![(TokenKind::Operator, "-".to_string()), (TokenKind::Int, "5".to_string())]
    );
}

#[test]
fn test_trailing_dot_is_not_a_float() {
    assert_eq!(
        kinds("=3.x"),
        vec![
            (TokenKind::Int, "3".to_string()),
            (TokenKind::Dot, ".".to_string()),
            (TokenKind::Symbol, "x".to_string()),
        ]
    );
}

#[test]
fn test_member_chain() {
    assert_eq!(
        kinds("=acct.offbudget"),
        vec![
            (TokenKind::Symbol, "acct".to_string()),
            (TokenKind::Dot, ".".to_string()),
            (TokenKind::Symbol, "offbudget".to_string()),
        ]
    );
}

// ============================================================================
// Operators and Delimiters
// ============================================================================

#[test]
fn test_multi_char_operators() {
    let ops: Vec<String> = kinds("=a <= b != c =~ d !=~ e >= f == g")
        .into_iter()
        .filter(|(kind, _)| *kind == TokenKind::Operator)
        .map(|(_, value)| value)
        .collect();
    assert_eq!(ops, vec!["<=", "!=", "=~", "!=~", ">=", "=="]);
}

#[test]
fn test_delimiters() {
    let toks: Vec<TokenKind> = kinds("=( ) [ ] { } , !").into_iter().map(|(k, _)| k).collect();
    assert_eq!(
        toks,
        vec![
            TokenKind::LeftParen,
            TokenKind::RightParen,
            TokenKind::LeftBracket,
            TokenKind::RightBracket,
            TokenKind::LeftCurly,
            TokenKind::RightCurly,
            TokenKind::Comma,
            TokenKind::Exclaim,
        ]
    );
}

#[test]
fn test_whitespace_tokens_are_produced() {
    let mut lexer = tokenize("=a  b");
    let mut seen = vec![];
    while let Some(tok) = lexer.next_token().unwrap() {
        seen.push(tok.kind);
    }
    assert_eq!(seen, vec![TokenKind::Symbol, TokenKind::Whitespace, TokenKind::Symbol]);
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_string_escapes() {
    assert_eq!(
        kinds(r#"="a\"b\n" 'it\'s' "\q""#),
        vec![
            (TokenKind::String, "a\"b\n".to_string()),
            (TokenKind::String, "it's".to_string()),
            (TokenKind::String, "q".to_string()),
        ]
    );
}

#[test]
fn test_unterminated_string() {
    let mut lexer = tokenize("=\"abc");
    assert_eq!(
        lexer.next_token(),
        Err(LexError::UnterminatedString { line: 0, col: 1 })
    );
}

#[test]
fn test_unexpected_character() {
    let mut lexer = tokenize("=\u{1}");
    let err = lexer.next_token().unwrap_err();
    assert_eq!(
        err,
        LexError::UnexpectedCharacter {
            ch: '\u{1}',
            line: 0,
            col: 1
        }
    );
    assert!(err.to_string().starts_with("[1, 2]"));
}

// ============================================================================
// Positions
// ============================================================================

#[test]
fn test_positions_across_lines() {
    let toks = all_tokens("=from transactions\n  where amount < 0");
    let where_tok = toks.iter().find(|t| t.value == "where").unwrap();
    assert_eq!((where_tok.line, where_tok.col), (1, 2));
    let amount = toks.iter().find(|t| t.value == "amount").unwrap();
    assert_eq!((amount.line, amount.col), (1, 8));
}
