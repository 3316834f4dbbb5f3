//! Static description of how tables join, which columns are remapped and
//! which implicit filters apply to a table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a field of one table leads to a row of another.
///
/// # Examples
///
/// ```
/// use sheet_lang::schema::JoinPath;
///
/// let path = JoinPath::new("accounts");
/// assert_eq!(
///     path.join_clause("acct", "t1", "transactions"),
///     "LEFT JOIN accounts t1 ON t1.id = transactions.acct"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPath {
    /// Table the field points into
    pub table: String,
    /// Column on the parent table holding the key, when it differs from the
    /// field name used in formulas
    #[serde(default)]
    pub field: Option<String>,
    /// Custom join clause; `{alias}` and `{parent}` are substituted
    #[serde(default)]
    pub sql: Option<String>,
}

impl JoinPath {
    pub fn new(table: impl Into<String>) -> Self {
        JoinPath {
            table: table.into(),
            field: None,
            sql: None,
        }
    }

    pub fn with_field(mut self, column: impl Into<String>) -> Self {
        self.field = Some(column.into());
        self
    }

    pub fn with_sql(mut self, template: impl Into<String>) -> Self {
        self.sql = Some(template.into());
        self
    }

    /// Parent-side key column for `field`.
    pub fn column<'a>(&'a self, field: &'a str) -> &'a str {
        self.field.as_deref().unwrap_or(field)
    }

    pub fn join_clause(&self, field: &str, alias: &str, parent: &str) -> String {
        match &self.sql {
            Some(template) => template.replace("{alias}", alias).replace("{parent}", parent),
            None => format!(
                "LEFT JOIN {} {} ON {}.id = {}.{}",
                self.table,
                alias,
                alias,
                parent,
                self.column(field)
            ),
        }
    }
}

/// A base-table column that is read through another table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRemap {
    pub alias: String,
    pub column: String,
    /// Join clause bringing `alias` into scope; `{parent}` is the base table
    pub join: String,
}

impl ColumnRemap {
    pub fn expr(&self) -> String {
        format!("{}.{}", self.alias, self.column)
    }
}

/// `column = value` condition added to every query on a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplicitFilter {
    pub column: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableTemplate {
    #[serde(default)]
    pub filters: Vec<ImplicitFilter>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub paths: BTreeMap<String, BTreeMap<String, JoinPath>>,
    #[serde(default)]
    pub remaps: BTreeMap<String, BTreeMap<String, ColumnRemap>>,
    #[serde(default)]
    pub templates: BTreeMap<String, TableTemplate>,
}

impl Schema {
    /// Schema without any joins, remaps or templates.
    pub fn empty() -> Self {
        Schema::default()
    }

    /// The budget database: transactions, accounts, payees and categories.
    pub fn budget() -> Self {
        Schema::empty()
            .with_path("transactions", "acct", JoinPath::new("accounts"))
            .with_path("transactions", "category", JoinPath::new("categories"))
            .with_path("transactions", "description", JoinPath::new("payees"))
            .with_path(
                "transactions",
                "payee",
                JoinPath::new("payees").with_field("description"),
            )
            .with_path("accounts", "bank", JoinPath::new("banks"))
            .with_path("payees", "transfer_acct", JoinPath::new("accounts"))
            .with_path("payees", "category", JoinPath::new("categories"))
            .with_path("categories", "cat_group", JoinPath::new("category_groups"))
            .with_remap(
                "transactions",
                "category",
                ColumnRemap {
                    alias: "__cm".into(),
                    column: "transferId".into(),
                    join: "LEFT JOIN category_mapping __cm ON __cm.id = {parent}.category".into(),
                },
            )
            .with_template(
                "transactions",
                TableTemplate {
                    filters: vec![
                        ImplicitFilter {
                            column: "isParent".into(),
                            value: 0,
                        },
                        ImplicitFilter {
                            column: "tombstone".into(),
                            value: 0,
                        },
                    ],
                },
            )
    }

    pub fn with_path(mut self, table: &str, field: &str, path: JoinPath) -> Self {
        self.paths
            .entry(table.to_string())
            .or_default()
            .insert(field.to_string(), path);
        self
    }

    pub fn with_remap(mut self, table: &str, column: &str, remap: ColumnRemap) -> Self {
        self.remaps
            .entry(table.to_string())
            .or_default()
            .insert(column.to_string(), remap);
        self
    }

    pub fn with_template(mut self, table: &str, template: TableTemplate) -> Self {
        self.templates.insert(table.to_string(), template);
        self
    }

    /// Join fields of `table`, or `None` when nothing can be joined from it.
    pub fn join_fields(&self, table: &str) -> Option<&BTreeMap<String, JoinPath>> {
        self.paths.get(table)
    }

    pub fn remap(&self, table: &str, column: &str) -> Option<&ColumnRemap> {
        self.remaps.get(table).and_then(|columns| columns.get(column))
    }

    pub fn filters(&self, table: &str) -> &[ImplicitFilter] {
        self.templates
            .get(table)
            .map(|t| t.filters.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_loads_from_json() {
        let schema: Schema = serde_json::from_str(
            r#"{
                "paths": { "transactions": { "acct": { "table": "accounts" } } },
                "templates": { "transactions": { "filters": [ { "column": "tombstone", "value": 0 } ] } }
            }"#,
        )
        .unwrap();
        assert_eq!(
            schema.join_fields("transactions").unwrap()["acct"],
            JoinPath::new("accounts")
        );
        assert_eq!(schema.filters("transactions").len(), 1);
        assert!(schema.remap("transactions", "category").is_none());
    }

    #[test]
    fn custom_join_template() {
        let path = JoinPath::new("payees").with_sql("LEFT JOIN payees {alias} ON {alias}.id = {parent}.payee_id");
        assert_eq!(
            path.join_clause("payee", "t2", "t1"),
            "LEFT JOIN payees t2 ON t2.id = t1.payee_id"
        );
    }
}
