// tests/sqlgen_tests.rs

use sheet_lang::ast::{NodeKind, QueryNode};
use sheet_lang::schema::JoinPath;
use sheet_lang::{parse, GeneratedSql, Schema, SchemaError, SqlGenerator};

fn query(src: &str) -> QueryNode {
    match parse(src).unwrap().kind {
        NodeKind::Root(mut children) => match children.remove(0).kind {
            NodeKind::Query(query) => *query,
            other => panic!("Expected query, got {:?}", other),
        },
        other => panic!("Expected root, got {:?}", other),
    }
}

fn generate_with(schema: &Schema, src: &str) -> Result<GeneratedSql, SchemaError> {
    let q = query(src);
    SqlGenerator::new(schema).generate(&q.table, q.where_.as_ref(), q.groupby.as_ref(), &q.select)
}

fn generate(src: &str) -> GeneratedSql {
    generate_with(&Schema::budget(), src).unwrap()
}

// ============================================================================
// Joins
// ============================================================================

#[test]
fn test_member_chain_becomes_left_join() {
    let out = generate("=from transactions where acct.offbudget = 0 select { id }");
    assert_eq!(
        out.sql,
        "SELECT transactions.id FROM transactions \
         LEFT JOIN accounts t1 ON t1.id = transactions.acct \
         WHERE (t1.offbudget = 0) AND transactions.isParent = 0 AND transactions.tombstone = 0"
    );
    assert_eq!(out.dependencies, vec!["accounts"]);
    assert_eq!(
        out.sql.matches("LEFT JOIN accounts t1 ON t1.id = transactions.acct").count(),
        1
    );
}

#[test]
fn test_multi_hop_chain() {
    let out = generate("=from transactions where description.transfer_acct.offbudget = 1 select {}");
    assert!(out.sql.starts_with(
        "SELECT * FROM transactions \
         LEFT JOIN payees t1 ON t1.id = transactions.description \
         LEFT JOIN accounts t2 ON t2.id = t1.transfer_acct \
         WHERE (t2.offbudget = 1)"
    ));
    assert_eq!(out.dependencies, vec!["payees", "accounts"]);
}

#[test]
fn test_join_field_with_different_column() {
    let out = generate("=from transactions where payee.name = 'Shop' select {}");
    assert!(out.sql.contains("LEFT JOIN payees t1 ON t1.id = transactions.description"));
    assert_eq!(out.fields[0], "description");
}

#[test]
fn test_custom_join_template() {
    let schema = Schema::empty().with_path(
        "notes",
        "author",
        JoinPath::new("users").with_sql("INNER JOIN users {alias} ON {alias}.uid = {parent}.author_uid"),
    );
    let out = generate_with(&schema, "=from notes where author.name = 'sam' select { id }").unwrap();
    assert_eq!(
        out.sql,
        "SELECT notes.id FROM notes INNER JOIN users t1 ON t1.uid = notes.author_uid WHERE (t1.name = \"sam\")"
    );
}

#[test]
fn test_aliases_restart_per_generate_call() {
    let schema = Schema::budget();
    let mut generator = SqlGenerator::new(&schema);
    for _ in 0..2 {
        let q = query("=from transactions where acct.offbudget = 0 select {}");
        let out = generator
            .generate(&q.table, q.where_.as_ref(), q.groupby.as_ref(), &q.select)
            .unwrap();
        assert!(out.sql.contains("accounts t1 "));
        assert!(!out.sql.contains("t2"));
    }
}

#[test]
fn test_each_chain_gets_its_own_alias() {
    let out = generate("=from transactions where acct.offbudget = 0 or acct.closed = 1 select {}");
    assert!(out.sql.contains("LEFT JOIN accounts t1 ON t1.id = transactions.acct"));
    assert!(out.sql.contains("LEFT JOIN accounts t2 ON t2.id = transactions.acct"));
    assert!(out.sql.contains("((t1.offbudget = 0) or (t2.closed = 1))"));
    assert_eq!(out.dependencies, vec!["accounts"]);
}

// ============================================================================
// Remaps, Templates and Fields
// ============================================================================

#[test]
fn test_null_comparisons_and_remap() {
    let out = generate("=from transactions where category = null select {}");
    assert_eq!(
        out.sql,
        "SELECT * FROM transactions \
         LEFT JOIN category_mapping __cm ON __cm.id = transactions.category \
         WHERE __cm.transferId IS NULL AND transactions.isParent = 0 AND transactions.tombstone = 0"
    );

    let out = generate("=from transactions where notes != null select {}");
    assert!(out.sql.contains("WHERE transactions.notes IS NOT NULL AND"));
}

#[test]
fn test_remap_join_added_once() {
    let out = generate("=from transactions where category = 'a' or category = 'b' select { category }");
    assert_eq!(out.sql.matches("LEFT JOIN category_mapping").count(), 1);
    assert!(out.sql.starts_with("SELECT __cm.transferId FROM"));
}

#[test]
fn test_field_dependencies() {
    let out = generate(
        "=from transactions \
         where acct.offbudget = 0 and category = null and description.transfer_acct.offbudget = null \
         calculate { count(date) }",
    );
    assert_eq!(
        out.fields,
        vec!["acct", "category", "description", "date", "isParent", "tombstone"]
    );
    assert_eq!(out.dependencies, vec!["accounts", "payees"]);
    assert_eq!(
        out.sql,
        "SELECT count(transactions.date) FROM transactions \
         LEFT JOIN accounts t1 ON t1.id = transactions.acct \
         LEFT JOIN category_mapping __cm ON __cm.id = transactions.category \
         LEFT JOIN payees t2 ON t2.id = transactions.description \
         LEFT JOIN accounts t3 ON t3.id = t2.transfer_acct \
         WHERE (((t1.offbudget = 0) and __cm.transferId IS NULL) and t3.offbudget IS NULL) \
         AND transactions.isParent = 0 AND transactions.tombstone = 0"
    );
}

#[test]
fn test_returned_where_is_not_lowered() {
    let q = query("=from transactions where category = null select {}");
    let out = generate("=from transactions where category = null select {}");
    assert_eq!(out.where_, q.where_);
}

#[test]
fn test_groupby_and_aliases() {
    let out = generate("=from transactions groupby category calculate { sum(amount) }");
    assert_eq!(
        out.sql,
        "SELECT sum(transactions.amount) FROM transactions \
         LEFT JOIN category_mapping __cm ON __cm.id = transactions.category \
         WHERE transactions.isParent = 0 AND transactions.tombstone = 0 \
         GROUP BY __cm.transferId"
    );
    assert_eq!(out.fields, vec!["category", "amount", "isParent", "tombstone"]);
}

#[test]
fn test_table_without_template() {
    let out = generate_with(
        &Schema::empty(),
        "=from accounts where name =~ 'Check%' select { name as n, balance }",
    )
    .unwrap();
    assert_eq!(
        out.sql,
        "SELECT accounts.name AS n, accounts.balance FROM accounts WHERE accounts.name LIKE \"Check%\""
    );
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_literal_rendering() {
    let schema = Schema::empty();
    let out = generate_with(
        &schema,
        r#"=from t where notes = 'say "hi"' and cleared = true and amount > -5 and rate < 1.5 select {}"#,
    )
    .unwrap();
    assert!(out.sql.contains(r#"(t.notes = "say ""hi""")"#));
    assert!(out.sql.contains("(t.cleared = 1)"));
    assert!(out.sql.contains("(t.amount > -5)"));
    assert!(out.sql.contains("(t.rate < 1.5)"));
}

#[test]
fn test_unary_rendering() {
    let schema = Schema::empty();
    let out = generate_with(&schema, "=from t where not cleared and -amount > 100 select {}").unwrap();
    assert!(out.sql.ends_with("WHERE ((NOT t.cleared) and ((-t.amount) > 100))"));

    let out = generate_with(&schema, "=from t where name !=~ 'x%' select {}").unwrap();
    assert!(out.sql.ends_with("WHERE t.name NOT LIKE \"x%\""));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_field() {
    let err = generate_with(
        &Schema::budget(),
        "=from transactions where acct.nope.x = 1 select {}",
    )
    .unwrap_err();
    match err {
        SchemaError::UnknownField { table, field, .. } => {
            assert_eq!(table, "accounts");
            assert_eq!(field, "nope");
        }
        other => panic!("Expected unknown field, got {:?}", other),
    }
}

#[test]
fn test_not_joinable() {
    let err = generate_with(&Schema::budget(), "=from banks where owner.name = 1 select {}").unwrap_err();
    assert!(matches!(err, SchemaError::NotJoinable { ref table, .. } if table == "banks"));

    let err = generate_with(&Schema::budget(), "=from transactions where f(x).y = 1 select {}").unwrap_err();
    assert!(matches!(err, SchemaError::NotJoinable { .. }));
}

#[test]
fn test_error_carries_position() {
    let err = generate_with(
        &Schema::budget(),
        "=from transactions\n  where acct.nope.x = 1 select {}",
    )
    .unwrap_err();
    assert!(err.to_string().starts_with("[2, 18]"), "{}", err);
}

#[test]
fn test_unsupported_expressions() {
    let err = generate_with(
        &Schema::budget(),
        "=from transactions where if (a) { 1 } else { 0 } select {}",
    )
    .unwrap_err();
    assert!(matches!(err, SchemaError::Unsupported { kind: "If", .. }));

    let err = generate_with(
        &Schema::budget(),
        "=from transactions where a = from payees select {} select {}",
    )
    .unwrap_err();
    assert!(matches!(err, SchemaError::Unsupported { kind: "Query", .. }));
}
