// tests/compiler_tests.rs

use sheet_lang::ast::BinOp;
use sheet_lang::{compile, CompileError, Compiler, Instruction, Operand, Schema, SchemaError, Value};

fn lit(n: i64) -> Operand {
    Operand::Literal(Value::Integer(n))
}

fn var(name: &str) -> Operand {
    Operand::Var(name.to_string())
}

fn mov(src: Operand, dst: Operand) -> Instruction {
    Instruction::Mov { src, dst }
}

fn store_result() -> Instruction {
    mov(Operand::Reg1, var("sheet!result"))
}

// ============================================================================
// Basics
// ============================================================================

#[test]
fn test_empty_program() {
    let program = compile("").unwrap();
    assert!(program.ops.is_empty());
    assert!(program.dependencies.is_empty());
    assert!(program.sql_dependencies.is_empty());
}

#[test]
fn test_literal() {
    let program = compile("=42").unwrap();
    assert_eq!(program.ops, vec![mov(lit(42), Operand::Reg1), store_result()]);
}

#[test]
fn test_plain_text_cell() {
    let program = compile("Groceries").unwrap();
    assert_eq!(
        program.ops[0],
        mov(Operand::Literal(Value::String("Groceries".into())), Operand::Reg1)
    );
}

#[test]
fn test_compilation_is_deterministic() {
    let src = "=from transactions where acct.offbudget = 0 calculate { count(date) } + budget!total";
    assert_eq!(compile(src).unwrap(), compile(src).unwrap());
}

// ============================================================================
// Operators and the Stack
// ============================================================================

#[test]
fn test_binary_with_literal_left_uses_stack() {
    let program = compile("=(1 + 2)").unwrap();
    assert_eq!(
        program.ops,
        vec![
            mov(lit(1), Operand::Reg1),
            mov(Operand::Reg1, Operand::Sp(0)),
            mov(lit(2), Operand::Reg1),
            Instruction::Bop {
                op: BinOp::Add,
                left: Operand::Sp(0),
                right: Operand::Reg1
            },
            store_result(),
        ]
    );
}

#[test]
fn test_symbol_left_operand_skips_the_stack() {
    let program = compile("=a + b").unwrap();
    assert_eq!(
        program.ops,
        vec![
            mov(var("sheet!b"), Operand::Reg1),
            Instruction::Bop {
                op: BinOp::Add,
                left: var("sheet!a"),
                right: Operand::Reg1
            },
            store_result(),
        ]
    );
    assert_eq!(program.dependencies, vec!["sheet!a", "sheet!b"]);
}

#[test]
fn test_repeated_symbol_is_one_dependency() {
    let program = compile("=a + a * a").unwrap();
    assert_eq!(program.dependencies, vec!["sheet!a"]);
}

#[test]
fn test_nested_operands_use_deeper_slots() {
    let program = compile("=(1 + 2) * (3 + 4)").unwrap();
    assert!(program.ops.contains(&mov(Operand::Reg1, Operand::Sp(1))));
    assert_eq!(
        program.ops[program.ops.len() - 2],
        Instruction::Bop {
            op: BinOp::Multiply,
            left: Operand::Sp(0),
            right: Operand::Reg1
        }
    );
}

#[test]
fn test_unary() {
    let program = compile("=not a").unwrap();
    assert_eq!(
        program.ops[1],
        Instruction::Uop {
            op: sheet_lang::UnaryOp::Not,
            target: Operand::Reg1
        }
    );
}

#[test]
fn test_sheet_references_are_not_rescoped() {
    let program = compile("=budget201701!total - spent").unwrap();
    assert_eq!(program.dependencies, vec!["budget201701!total", "sheet!spent"]);
}

#[test]
fn test_scope_and_binding() {
    let schema = Schema::budget();
    let program = Compiler::new(&schema)
        .compile_source("leftover", "budget202401", "=income - spent")
        .unwrap();
    assert_eq!(program.dependencies, vec!["budget202401!income", "budget202401!spent"]);
    assert_eq!(
        program.ops.last(),
        Some(&mov(Operand::Reg1, var("budget202401!leftover")))
    );
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_call_arguments() {
    let program = compile("=max(a, 1 + 2)").unwrap();
    assert_eq!(
        program.ops,
        vec![
            mov(lit(1), Operand::Reg1),
            mov(Operand::Reg1, Operand::Sp(0)),
            mov(lit(2), Operand::Reg1),
            Instruction::Bop {
                op: BinOp::Add,
                left: Operand::Sp(0),
                right: Operand::Reg1
            },
            mov(Operand::Reg1, Operand::Sp(0)),
            Instruction::Call {
                callee: "max".to_string(),
                args: vec![var("sheet!a"), Operand::Sp(0)]
            },
            store_result(),
        ]
    );
    assert_eq!(program.dependencies, vec!["sheet!a"]);
}

#[test]
fn test_callee_must_be_a_function_name() {
    assert!(matches!(compile("=other!f(1)"), Err(CompileError::InvalidCall { .. })));
    assert!(matches!(compile("=f(1)(2)"), Err(CompileError::InvalidCall { .. })));
}

// ============================================================================
// Conditionals
// ============================================================================

#[test]
fn test_if_else_jumps() {
    let program = compile("=if (c) { 1 } else { 2 }").unwrap();
    assert_eq!(
        program.ops,
        vec![
            mov(var("sheet!c"), Operand::Reg1),
            Instruction::JumpF {
                cond: Operand::Reg1,
                target: 4
            },
            mov(lit(1), Operand::Reg1),
            Instruction::JumpT {
                cond: Operand::Literal(Value::Boolean(true)),
                target: 5
            },
            mov(lit(2), Operand::Reg1),
            store_result(),
        ]
    );
}

#[test]
fn test_if_without_else() {
    let program = compile("=if (c) { 1 }").unwrap();
    assert_eq!(
        program.ops,
        vec![
            mov(var("sheet!c"), Operand::Reg1),
            Instruction::JumpF {
                cond: Operand::Reg1,
                target: 3
            },
            mov(lit(1), Operand::Reg1),
            store_result(),
        ]
    );
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_query_dependency() {
    let program = compile(
        "=from transactions where acct.offbudget = 0 and category = null calculate { count(date) }",
    )
    .unwrap();

    assert_eq!(program.ops.len(), 2);
    let Instruction::Query { sql, calculated } = &program.ops[0] else {
        panic!("Expected query, got {:?}", program.ops[0]);
    };
    assert!(*calculated);
    assert!(sql.contains("LEFT JOIN accounts t1 ON t1.id = transactions.acct"));
    assert!(sql.contains("__cm.transferId IS NULL"));

    let dep = &program.sql_dependencies[0];
    assert_eq!(dep.table, "transactions");
    assert_eq!(&dep.sql, sql);
    assert_eq!(dep.joined_tables, vec!["accounts"]);
    assert_eq!(
        dep.fields,
        vec!["acct", "category", "date", "isParent", "tombstone"]
    );
    assert!(dep.where_.is_some());
    assert!(program.dependencies.is_empty());
}

#[test]
fn test_select_query_is_not_calculated() {
    let program = compile("=from transactions select { id }").unwrap();
    assert!(matches!(program.ops[0], Instruction::Query { calculated: false, .. }));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_member_outside_query() {
    match compile("=acct.offbudget") {
        Err(CompileError::UnsupportedNode { kind, .. }) => assert_eq!(kind, "Member"),
        other => panic!("Expected unsupported node, got {:?}", other),
    }
}

#[test]
fn test_errors_are_wrapped() {
    assert!(matches!(compile("=1 +"), Err(CompileError::Parse(_))));
    assert!(matches!(
        compile("=from transactions where acct.nope.x = 1 calculate { count(id) }"),
        Err(CompileError::Schema(SchemaError::UnknownField { .. }))
    ));
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_program_serializes_to_json() {
    let program = compile("=from transactions where amount < 0 calculate { sum(amount) } + a").unwrap();
    let json = serde_json::to_value(&program).unwrap();
    assert_eq!(json["ops"][0]["Query"]["calculated"], serde_json::json!(true));
    assert_eq!(json["dependencies"], serde_json::json!(["sheet!a"]));
    assert_eq!(json["sql_dependencies"][0]["table"], serde_json::json!("transactions"));
    assert!(json["sql_dependencies"][0]["where"].is_object());
}

#[test]
fn test_program_listing() {
    let listing = compile("=a + 1").unwrap().to_string();
    assert_eq!(
        listing,
        "   0  MOV 1 -> REG1\n   1  BOP + VAR(sheet!a) REG1\n   2  MOV REG1 -> VAR(sheet!result)\n"
    );
}
