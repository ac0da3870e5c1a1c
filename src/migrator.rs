// src/migrator.rs

use std::io::Write;

use crate::config::Config;
use crate::db::properties::{
    count_sql, create_index_sql, create_table_sql, insert_sql, INDEXED_COLUMNS,
};
use crate::db::{SourceDatabase, TableName};
use crate::domain::{PropertyRecord, Value};
use crate::errors::{InsertError, MigrationError, MigrationResult};
use crate::remote::{QueryResult, RemoteDatabase, RemoteError};

/// Anything that can run a parameterized statement for us. The remote
/// client is the real one; tests plug in a local SQLite stand-in.
pub trait Destination {
    fn execute(&mut self, sql: &str, args: &[Value]) -> Result<QueryResult, RemoteError>;

    fn close(&mut self) -> Result<(), RemoteError>;
}

impl Destination for RemoteDatabase {
    fn execute(&mut self, sql: &str, args: &[Value]) -> Result<QueryResult, RemoteError> {
        RemoteDatabase::execute(self, sql, args)
    }

    fn close(&mut self) -> Result<(), RemoteError> {
        RemoteDatabase::close(self)
    }
}

/// What happened to the rows of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub read: usize,
    pub inserted: usize,
    pub failed: usize,
    /// Destination row count, when verification was asked for.
    pub destination_rows: Option<u64>,
}

/// Settings of a run that do not concern opening connections.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source_table: TableName,
    pub destination_table: TableName,
    pub create_indexes: bool,
    pub verify: bool,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> MigrationResult<Self> {
        Ok(Self {
            source_table: config.source_table()?,
            destination_table: config.destination_table()?,
            create_indexes: config.create_indexes,
            verify: config.verify,
        })
    }
}

pub fn open_source(config: &Config) -> MigrationResult<SourceDatabase> {
    SourceDatabase::open(&config.source_path)
}

pub fn open_destination(config: &Config) -> MigrationResult<RemoteDatabase> {
    RemoteDatabase::connect(
        &config.destination_url,
        config.auth_token.clone(),
        config.timeout(),
    )
    .map_err(MigrationError::from_open)
}

/// Creates the destination table unless it is already there.
pub fn ensure_schema<D: Destination>(dest: &mut D, table: &TableName) -> MigrationResult<()> {
    dest.execute(&create_table_sql(table), &[])
        .map_err(|e| MigrationError::Schema(format!("Create table {table} failed: {e}")))?;
    Ok(())
}

pub fn ensure_indexes<D: Destination>(dest: &mut D, table: &TableName) -> MigrationResult<()> {
    for column in INDEXED_COLUMNS {
        dest.execute(&create_index_sql(table, column), &[])
            .map_err(|e| {
                MigrationError::Schema(format!("Create index on {table}({column}) failed: {e}"))
            })?;
    }
    Ok(())
}

/// Sends one record. The caller decides what a failure means.
pub fn insert_record<D: Destination>(
    dest: &mut D,
    table: &TableName,
    record: &PropertyRecord,
) -> Result<(), InsertError> {
    let result = dest
        .execute(&insert_sql(table), &record.to_args())
        .map_err(|source| InsertError {
            address: record.address_text(),
            source,
        })?;

    tracing::debug!(
        affected = result.affected_row_count,
        rowid = ?result.last_insert_rowid,
        "Inserted row"
    );
    Ok(())
}

pub fn count_rows<D: Destination>(dest: &mut D, table: &TableName) -> MigrationResult<u64> {
    let result = dest
        .execute(&count_sql(table), &[])
        .map_err(|e| MigrationError::Verify(format!("Count on {table} failed: {e}")))?;

    result
        .scalar_integer()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| MigrationError::Verify(format!("Count on {table} returned no number")))
}

/// Full run against the configured source file and remote database.
pub fn run(config: &Config, out: &mut impl Write) -> MigrationResult<MigrationReport> {
    let options = RunOptions::from_config(config)?;
    let source = open_source(config)?;
    run_with(source, || open_destination(config), &options, out)
}

/// The run itself, with the destination opened through `connect` so any
/// `Destination` can be used.
///
/// Every record is read before the destination is opened. A row that fails
/// to insert is printed and skipped; nothing is rolled back. The source is
/// released on every path out of here, including a failed `connect`.
pub fn run_with<D, F, W>(
    source: SourceDatabase,
    connect: F,
    options: &RunOptions,
    out: &mut W,
) -> MigrationResult<MigrationReport>
where
    D: Destination,
    F: FnOnce() -> MigrationResult<D>,
    W: Write,
{
    tracing::info!(path = %source.path().display(), table = %options.source_table, "Reading source records");
    let records = source.read_all_records(&options.source_table)?;
    tracing::info!("Read {} records", records.len());

    tracing::info!("Connecting to destination");
    let mut dest = connect()?;

    tracing::info!(table = %options.destination_table, "Creating table");
    ensure_schema(&mut dest, &options.destination_table)?;
    if options.create_indexes {
        tracing::info!("Creating indexes");
        ensure_indexes(&mut dest, &options.destination_table)?;
    }

    let mut report = MigrationReport {
        read: records.len(),
        ..Default::default()
    };

    for record in &records {
        let address = record.display_address();
        match insert_record(&mut dest, &options.destination_table, record) {
            Ok(()) => {
                report.inserted += 1;
                print_line(out, format_args!("Inserted: {address}"));
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(address = %address, "Insert failed: {e}");
                print_line(out, format_args!("Error inserting {address}: {e}"));
            }
        }
    }

    if options.verify {
        let count = count_rows(&mut dest, &options.destination_table)?;
        tracing::info!("Destination {} now has {count} rows", options.destination_table);
        report.destination_rows = Some(count);
    }

    if let Err(e) = source.close() {
        tracing::warn!("Closing source failed: {e}");
    }
    if let Err(e) = dest.close() {
        tracing::warn!("Closing destination failed: {e}");
    }

    tracing::info!(
        read = report.read,
        inserted = report.inserted,
        failed = report.failed,
        "Migration finished"
    );
    Ok(report)
}

// Progress lines are best effort.
fn print_line(out: &mut impl Write, line: std::fmt::Arguments<'_>) {
    if let Err(e) = writeln!(out, "{line}") {
        tracing::debug!("Writing progress line failed: {e}");
    }
}
