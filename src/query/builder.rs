//! # Structured SQL Builder
//!
//! Generates the statements behind the structured table and row endpoints.
//!
//! Every generated identifier is double-quoted with embedded quotes doubled,
//! so table and column names can never terminate the identifier early.
//! Values always travel as bound parameters, except column defaults, which
//! SQLite only accepts as literals.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{GatewayError, GatewayResult};

/// One column of a structured `CREATE TABLE`
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Engine-native type name, passed through
    #[serde(rename = "type", default)]
    pub column_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

/// `LIMIT`/`OFFSET` for structured selects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }
}

/// Quote an identifier for SQLite.
pub fn quote_ident(name: &str) -> GatewayResult<String> {
    if name.is_empty() {
        return Err(GatewayError::invalid_request("Identifier must not be empty."));
    }
    if name.contains('\0') {
        return Err(GatewayError::invalid_request(
            "Identifier must not contain NUL characters.",
        ));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a string literal for SQLite.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Build `CREATE TABLE "<table>" ("<col>" <type> [PRIMARY KEY] [NOT NULL] [UNIQUE] [DEFAULT <v>], ...)`.
///
/// Columns keep the order they were given in.
pub fn create_table_sql(table: &str, columns: &[ColumnDefinition]) -> GatewayResult<String> {
    if columns.is_empty() {
        return Err(GatewayError::invalid_request(
            "A table needs at least one column.",
        ));
    }

    let defs = columns
        .iter()
        .map(column_sql)
        .collect::<GatewayResult<Vec<_>>>()?;

    Ok(format!(
        "CREATE TABLE {} ({})",
        quote_ident(table)?,
        defs.join(", ")
    ))
}

fn column_sql(col: &ColumnDefinition) -> GatewayResult<String> {
    let mut def = quote_ident(&col.name)?;

    let column_type = col.column_type.trim();
    if !column_type.is_empty() {
        check_type_name(column_type)?;
        def.push(' ');
        def.push_str(column_type);
    }
    if col.primary_key {
        def.push_str(" PRIMARY KEY");
    }
    if col.not_null {
        def.push_str(" NOT NULL");
    }
    if col.unique {
        def.push_str(" UNIQUE");
    }
    if let Some(literal) = default_literal(col.default.as_ref())? {
        def.push_str(" DEFAULT ");
        def.push_str(&literal);
    }

    Ok(def)
}

/// Type names are free-form (`TEXT`, `VARCHAR(255)`, `DECIMAL(10, 2)`) but
/// may only use characters that cannot end the column definition.
fn check_type_name(column_type: &str) -> GatewayResult<()> {
    let ok = column_type
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '(' | ')' | ',' | '+' | '-'))
        && !column_type.contains("--");
    if ok {
        Ok(())
    } else {
        Err(GatewayError::invalid_request(format!(
            "Invalid column type: {}",
            column_type
        )))
    }
}

/// `null` or absent means no DEFAULT clause.
fn default_literal(value: Option<&Value>) -> GatewayResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(quote_literal(s))),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(true)) => Ok(Some("TRUE".to_string())),
        Some(Value::Bool(false)) => Ok(Some("FALSE".to_string())),
        Some(Value::Array(_)) | Some(Value::Object(_)) => Err(GatewayError::invalid_request(
            "Column defaults must be scalars.",
        )),
    }
}

/// Check that a batch is non-empty and every row has the first row's key set.
///
/// Returns the column list in the first row's key order.
pub fn batch_columns(rows: &[Map<String, Value>]) -> GatewayResult<Vec<String>> {
    let first = rows
        .first()
        .ok_or_else(|| GatewayError::invalid_request("No rows provided for insertion."))?;
    if first.is_empty() {
        return Err(GatewayError::invalid_request(
            "Rows must contain at least one column.",
        ));
    }

    let columns: Vec<String> = first.keys().cloned().collect();
    for (index, row) in rows.iter().enumerate().skip(1) {
        let same_shape = row.len() == columns.len() && columns.iter().all(|c| row.contains_key(c));
        if !same_shape {
            return Err(GatewayError::invalid_request(format!(
                "All rows must have the same columns (row {} differs from row 0).",
                index
            )));
        }
    }

    Ok(columns)
}

/// `INSERT INTO "<table>" ("<c1>", ...) VALUES (?, ...)`
pub fn insert_sql(table: &str, columns: &[String]) -> GatewayResult<String> {
    let names = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<GatewayResult<Vec<_>>>()?;
    let placeholders = vec!["?"; columns.len()].join(", ");

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table)?,
        names.join(", "),
        placeholders
    ))
}

/// `SELECT * FROM "<table>" [WHERE "c1" = ? AND ...] [LIMIT ? OFFSET ?]`
///
/// Returns the statement and its parameters in binding order.
pub fn select_sql(
    table: &str,
    filters: &[(String, Value)],
    page: Page,
) -> GatewayResult<(String, Vec<Value>)> {
    let mut sql = format!("SELECT * FROM {}", quote_ident(table)?);
    let mut params = Vec::with_capacity(filters.len() + 2);

    if !filters.is_empty() {
        let clauses = filters
            .iter()
            .map(|(column, _)| quote_ident(column).map(|c| format!("{} = ?", c)))
            .collect::<GatewayResult<Vec<_>>>()?;
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
        params.extend(filters.iter().map(|(_, v)| v.clone()));
    }

    if !page.is_empty() {
        // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
        sql.push_str(" LIMIT ?");
        params.push(match page.limit {
            Some(limit) => Value::from(limit),
            None => Value::from(-1),
        });
        if let Some(offset) = page.offset {
            sql.push_str(" OFFSET ?");
            params.push(Value::from(offset));
        }
    }

    Ok((sql, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn col(name: &str, ty: &str) -> ColumnDefinition {
        ColumnDefinition {
            name: name.to_string(),
            column_type: ty.to_string(),
            primary_key: false,
            not_null: false,
            unique: false,
            default: None,
        }
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("users").unwrap(), "\"users\"");
        assert_eq!(quote_ident("we\"ird").unwrap(), "\"we\"\"ird\"");
        assert!(quote_ident("").is_err());
    }

    #[test]
    fn test_create_table_modifiers_in_order() {
        let mut id = col("id", "INTEGER");
        id.primary_key = true;
        let mut name = col("name", "TEXT");
        name.not_null = true;
        name.unique = true;
        name.default = Some(json!("it's"));
        let mut score = col("score", "REAL");
        score.default = Some(json!(1.5));

        let sql = create_table_sql("people", &[id, name, score]).unwrap();

        assert_eq!(
            sql,
            "CREATE TABLE \"people\" (\"id\" INTEGER PRIMARY KEY, \"name\" TEXT NOT NULL UNIQUE DEFAULT 'it''s', \"score\" REAL DEFAULT 1.5)"
        );
    }

    #[test]
    fn test_create_table_null_default_is_omitted() {
        let mut c = col("a", "TEXT");
        c.default = Some(Value::Null);
        let sql = create_table_sql("t", &[c]).unwrap();
        assert_eq!(sql, "CREATE TABLE \"t\" (\"a\" TEXT)");
    }

    #[test]
    fn test_create_table_bool_default() {
        let mut c = col("active", "BOOLEAN");
        c.default = Some(json!(true));
        let sql = create_table_sql("t", &[c]).unwrap();
        assert!(sql.ends_with("\"active\" BOOLEAN DEFAULT TRUE)"));
    }

    #[test]
    fn test_create_table_rejects_bad_type() {
        let c = col("a", "TEXT); DROP TABLE x; --");
        assert!(matches!(
            create_table_sql("t", &[c]),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_create_table_accepts_parameterised_type() {
        let sql = create_table_sql("t", &[col("price", "DECIMAL(10, 2)")]).unwrap();
        assert_eq!(sql, "CREATE TABLE \"t\" (\"price\" DECIMAL(10, 2))");
    }

    #[test]
    fn test_create_table_requires_columns() {
        assert!(create_table_sql("t", &[]).is_err());
    }

    #[test]
    fn test_batch_columns_checks_shape() {
        let rows: Vec<Map<String, Value>> = vec![
            json!({"a": 1, "b": "x"}).as_object().unwrap().clone(),
            json!({"b": "y", "a": 2}).as_object().unwrap().clone(),
        ];
        assert_eq!(batch_columns(&rows).unwrap(), vec!["a", "b"]);

        let mismatched: Vec<Map<String, Value>> = vec![
            json!({"a": 1}).as_object().unwrap().clone(),
            json!({"b": 2}).as_object().unwrap().clone(),
        ];
        assert!(matches!(
            batch_columns(&mismatched),
            Err(GatewayError::InvalidRequest(_))
        ));

        assert!(matches!(
            batch_columns(&[]),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_insert_sql() {
        let sql = insert_sql("t", &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(sql, "INSERT INTO \"t\" (\"a\", \"b\") VALUES (?, ?)");
    }

    #[test]
    fn test_select_sql_without_filters() {
        let (sql, params) = select_sql("t", &[], Page::default()).unwrap();
        assert_eq!(sql, "SELECT * FROM \"t\"");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_sql_filters_keep_order() {
        let filters = vec![
            ("b".to_string(), json!("y")),
            ("a".to_string(), json!("2")),
        ];
        let (sql, params) = select_sql("t", &filters, Page::default()).unwrap();
        assert_eq!(sql, "SELECT * FROM \"t\" WHERE \"b\" = ? AND \"a\" = ?");
        assert_eq!(params, vec![json!("y"), json!("2")]);
    }

    #[test]
    fn test_select_sql_paging() {
        let page = Page {
            limit: None,
            offset: Some(5),
        };
        let (sql, params) = select_sql("t", &[], page).unwrap();
        assert_eq!(sql, "SELECT * FROM \"t\" LIMIT ? OFFSET ?");
        assert_eq!(params, vec![json!(-1), json!(5)]);
    }
}
