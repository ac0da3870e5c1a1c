use crate::domain::PropertyRecord;
use crate::errors::{MigrationError, MigrationResult};

/// Column definitions, in `PropertyRecord::COLUMNS` order.
const COLUMN_TYPES: [(&str, &str); 13] = [
    ("address", "TEXT"),
    ("parcel_id", "TEXT"),
    ("county", "TEXT"),
    ("total_appraised_value", "REAL"),
    ("land_appraised_value", "REAL"),
    ("building_appraised_value", "REAL"),
    ("bedrooms", "INTEGER"),
    ("bathrooms", "INTEGER"),
    ("sqft", "INTEGER"),
    ("acres", "REAL"),
    ("last_sale_year", "INTEGER"),
    ("last_sale_price", "REAL"),
    ("coordinates", "TEXT"),
];

/// Columns that get an index when indexes are requested.
pub const INDEXED_COLUMNS: [&str; 7] = [
    "address",
    "parcel_id",
    "total_appraised_value",
    "bedrooms",
    "bathrooms",
    "sqft",
    "acres",
];

/// A table name that is safe to splice into SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    pub fn parse(name: &str) -> MigrationResult<Self> {
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };

        if valid {
            Ok(TableName(name.to_string()))
        } else {
            Err(MigrationError::Config(format!(
                "Invalid table name: {name:?}"
            )))
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn create_table_sql(table: &TableName) -> String {
    let columns = COLUMN_TYPES
        .iter()
        .map(|(name, ty)| format!("{name} {ty}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS {table} ({columns})")
}

pub fn create_index_sql(table: &TableName, column: &str) -> String {
    format!("CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column})")
}

/// Parameterized insert; values are bound, never spliced.
pub fn insert_sql(table: &TableName) -> String {
    let placeholders = vec!["?"; PropertyRecord::COLUMNS.len()].join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        PropertyRecord::COLUMNS.join(", ")
    )
}

pub fn select_all_sql(table: &TableName) -> String {
    format!("SELECT {} FROM {table}", PropertyRecord::COLUMNS.join(", "))
}

pub fn count_sql(table: &TableName) -> String {
    format!("SELECT COUNT(*) FROM {table}")
}
