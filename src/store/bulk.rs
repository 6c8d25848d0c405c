//! Staging-table bulk upsert.
//!
//! Every batch write follows the same shape: open a transaction, create a
//! transient staging table mirroring the target, stream rows in over the
//! COPY protocol, then merge into the target with
//! `INSERT ... ON CONFLICT DO UPDATE`. The staging table drops with the
//! commit. A multi-table variant shares one transaction; any failure rolls
//! the whole batch back.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::StoreError;

// ============================================================================
// Field values
// ============================================================================

/// One typed cell, encoded into the COPY text protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
}

impl Field {
    fn encode(&self, out: &mut String) {
        match self {
            Self::Null => out.push_str("\\N"),
            Self::Bool(b) => out.push(if *b { 't' } else { 'f' }),
            Self::Int(n) => out.push_str(&n.to_string()),
            Self::Float(f) => out.push_str(&f.to_string()),
            Self::Text(s) => escape_copy_text(s, out),
            Self::Json(v) => {
                let rendered = v.to_string();
                escape_copy_text(&rendered, out);
            },
            Self::Timestamp(ts) => out.push_str(&ts.format("%Y-%m-%d %H:%M:%S%.6f+00").to_string()),
            Self::Date(d) => out.push_str(&d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// COPY text format: backslash, tab, newline, and carriage return must be
/// backslash-escaped.
fn escape_copy_text(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
}

/// Render rows as COPY text payload: tab-separated cells, newline-terminated
/// rows.
fn encode_rows(rows: &[Vec<Field>]) -> String {
    let mut out = String::with_capacity(rows.len() * 64);
    for row in rows {
        for (i, field) in row.iter().enumerate() {
            if i > 0 {
                out.push('\t');
            }
            field.encode(&mut out);
        }
        out.push('\n');
    }
    out
}

// ============================================================================
// Upsert configuration
// ============================================================================

/// Target table, columns, and the conflict keys the merge resolves on.
#[derive(Debug, Clone)]
pub struct UpsertConfig {
    /// Optionally schema-qualified (`schema.table`, split on the first dot).
    pub table: String,
    pub columns: Vec<String>,
    pub conflict_keys: Vec<String>,
}

impl UpsertConfig {
    pub fn new(table: &str, columns: &[&str], conflict_keys: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            conflict_keys: conflict_keys.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn validate(&self, rows: &[Vec<Field>]) -> Result<(), StoreError> {
        if self.table.is_empty() {
            return Err(StoreError::Validation("table name is empty".to_string()));
        }
        if self.columns.is_empty() {
            return Err(StoreError::Validation(format!("{}: no columns named", self.table)));
        }
        if self.conflict_keys.is_empty() {
            return Err(StoreError::Validation(format!("{}: no conflict keys", self.table)));
        }
        for key in &self.conflict_keys {
            if !self.columns.contains(key) {
                return Err(StoreError::Validation(format!(
                    "{}: conflict key {} is not a named column",
                    self.table, key
                )));
            }
        }
        for row in rows {
            if row.len() != self.columns.len() {
                return Err(StoreError::Validation(format!(
                    "{}: row has {} fields, expected {}",
                    self.table,
                    row.len(),
                    self.columns.len()
                )));
            }
        }
        Ok(())
    }
}

/// One table's worth of a multi-table batch.
#[derive(Debug, Clone)]
pub struct UpsertBatch {
    pub config: UpsertConfig,
    pub rows: Vec<Vec<Field>>,
}

// ============================================================================
// SQL building
// ============================================================================

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified table name, splitting on the first dot.
fn quote_table(table: &str) -> String {
    match table.split_once('.') {
        Some((schema, name)) => format!("{}.{}", quote_ident(schema), quote_ident(name)),
        None => quote_ident(table),
    }
}

fn staging_name(table: &str) -> String {
    format!("_stage_{}", table.replace('.', "_"))
}

fn create_staging_sql(config: &UpsertConfig) -> String {
    format!(
        "CREATE TEMP TABLE {} (LIKE {} INCLUDING DEFAULTS) ON COMMIT DROP",
        quote_ident(&staging_name(&config.table)),
        quote_table(&config.table)
    )
}

fn copy_sql(config: &UpsertConfig) -> String {
    let columns: Vec<String> = config.columns.iter().map(|c| quote_ident(c)).collect();
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT text)",
        quote_ident(&staging_name(&config.table)),
        columns.join(", ")
    )
}

fn merge_sql(config: &UpsertConfig) -> String {
    let columns: Vec<String> = config.columns.iter().map(|c| quote_ident(c)).collect();
    let keys: Vec<String> = config.conflict_keys.iter().map(|c| quote_ident(c)).collect();
    let updates: Vec<String> = config
        .columns
        .iter()
        .filter(|c| !config.conflict_keys.contains(c))
        .map(|c| format!("{} = EXCLUDED.{}", quote_ident(c), quote_ident(c)))
        .collect();

    let conflict_action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    format!(
        "INSERT INTO {} ({}) SELECT {} FROM {} ON CONFLICT ({}) {}",
        quote_table(&config.table),
        columns.join(", "),
        columns.join(", "),
        quote_ident(&staging_name(&config.table)),
        keys.join(", "),
        conflict_action
    )
}

// ============================================================================
// Execution
// ============================================================================

/// Upsert one table's rows in its own transaction. Empty input is a no-op
/// returning 0 without touching the database.
pub async fn bulk_upsert(
    pool: &PgPool,
    config: &UpsertConfig,
    rows: &[Vec<Field>],
) -> Result<u64, StoreError> {
    config.validate(rows)?;
    if rows.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let written = upsert_in_tx(&mut tx, config, rows).await?;
    tx.commit().await?;
    Ok(written)
}

/// Upsert several tables inside one shared transaction; any failure rolls
/// back every batch. Empty batches are skipped.
pub async fn bulk_upsert_many(pool: &PgPool, batches: &[UpsertBatch]) -> Result<u64, StoreError> {
    for batch in batches {
        batch.config.validate(&batch.rows)?;
    }
    if batches.iter().all(|b| b.rows.is_empty()) {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut written = 0;
    for batch in batches {
        if batch.rows.is_empty() {
            continue;
        }
        written += upsert_in_tx(&mut tx, &batch.config, &batch.rows).await?;
    }
    tx.commit().await?;
    Ok(written)
}

async fn upsert_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    config: &UpsertConfig,
    rows: &[Vec<Field>],
) -> Result<u64, StoreError> {
    sqlx::query(&create_staging_sql(config)).execute(&mut **tx).await?;

    let mut copy = tx.copy_in_raw(&copy_sql(config)).await?;
    copy.send(encode_rows(rows).into_bytes()).await?;
    copy.finish().await?;

    let result = sqlx::query(&merge_sql(config)).execute(&mut **tx).await?;
    tracing::debug!(table = %config.table, rows = result.rows_affected(), "bulk upsert merged");
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> UpsertConfig {
        UpsertConfig::new(
            "adv.adv_advisor_answers",
            &["crd_number", "question_key", "value", "confidence"],
            &["crd_number", "question_key"],
        )
    }

    #[test]
    fn test_sql_statements_quote_and_qualify() {
        let cfg = config();
        assert_eq!(
            create_staging_sql(&cfg),
            "CREATE TEMP TABLE \"_stage_adv_adv_advisor_answers\" (LIKE \"adv\".\"adv_advisor_answers\" INCLUDING DEFAULTS) ON COMMIT DROP"
        );
        assert_eq!(
            copy_sql(&cfg),
            "COPY \"_stage_adv_adv_advisor_answers\" (\"crd_number\", \"question_key\", \"value\", \"confidence\") FROM STDIN WITH (FORMAT text)"
        );
        let merge = merge_sql(&cfg);
        assert!(merge.starts_with("INSERT INTO \"adv\".\"adv_advisor_answers\""));
        assert!(merge.contains("ON CONFLICT (\"crd_number\", \"question_key\") DO UPDATE SET"));
        assert!(merge.contains("\"value\" = EXCLUDED.\"value\""));
        assert!(merge.contains("\"confidence\" = EXCLUDED.\"confidence\""));
        // Conflict keys are never updated.
        assert!(!merge.contains("\"crd_number\" = EXCLUDED"));
    }

    #[test]
    fn test_unqualified_table_and_all_key_columns() {
        let cfg = UpsertConfig::new("adv_document_sections", &["a", "b"], &["a", "b"]);
        assert!(merge_sql(&cfg).ends_with("DO NOTHING"));
        assert_eq!(quote_table("adv_document_sections"), "\"adv_document_sections\"");
    }

    #[test]
    fn test_validation_errors() {
        let no_keys = UpsertConfig::new("t", &["a"], &[]);
        assert!(matches!(no_keys.validate(&[]), Err(StoreError::Validation(_))));

        let stray_key = UpsertConfig::new("t", &["a"], &["b"]);
        assert!(matches!(stray_key.validate(&[]), Err(StoreError::Validation(_))));

        let cfg = UpsertConfig::new("t", &["a", "b"], &["a"]);
        let short_row = vec![vec![Field::Int(1)]];
        assert!(matches!(cfg.validate(&short_row), Err(StoreError::Validation(_))));
        assert!(cfg.validate(&[vec![Field::Int(1), Field::Null]]).is_ok());
    }

    #[test]
    fn test_copy_text_encoding() {
        let rows = vec![
            vec![
                Field::Int(42),
                Field::Null,
                Field::Text("line1\nline2\tend\\".to_string()),
                Field::Bool(true),
            ],
            vec![
                Field::Float(0.5),
                Field::Json(serde_json::json!({"k": "v"})),
                Field::Text("plain".to_string()),
                Field::Bool(false),
            ],
        ];
        let encoded = encode_rows(&rows);
        let lines: Vec<&str> = encoded.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "42\t\\N\tline1\\nline2\\tend\\\\\tt");
        assert_eq!(lines[1], "0.5\t{\"k\":\"v\"}\tplain\tf");
    }

    #[test]
    fn test_empty_rows_encode_to_nothing() {
        assert_eq!(encode_rows(&[]), "");
    }

    #[test]
    fn test_timestamp_and_date_encoding() {
        let ts: DateTime<Utc> = "2024-03-31T12:30:45Z".parse().unwrap();
        let mut out = String::new();
        Field::Timestamp(ts).encode(&mut out);
        assert_eq!(out, "2024-03-31 12:30:45.000000+00");

        let mut out = String::new();
        Field::Date("2024-03-31".parse().unwrap()).encode(&mut out);
        assert_eq!(out, "2024-03-31");
    }
}
