use crate::db::SourceDatabase;
use crate::domain::{PropertyRecord, Value};
use crate::migrator::Destination;
use crate::remote::{QueryResult, RemoteError};
use rusqlite::{params_from_iter, Connection};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A record with every field filled, told apart by its street number.
pub fn main_st(n: i64) -> PropertyRecord {
    PropertyRecord {
        address: format!("{n} Main St").into(),
        parcel_id: format!("14 00{n} 0001").into(),
        county: "Fulton".into(),
        total_appraised_value: (300000.0 + n as f64).into(),
        land_appraised_value: Value::Real(100000.0),
        building_appraised_value: (200000.0 + n as f64).into(),
        bedrooms: n.into(),
        bathrooms: Value::Integer(2),
        sqft: (1500 + n).into(),
        acres: Value::Real(0.25),
        last_sale_year: (2010 + n).into(),
        last_sale_price: Value::Real(250000.5),
        coordinates: format!("33.7{n},-84.3{n}").into(),
    }
}

/// Writes `records` into a fresh `properties_unique` table. The table has an
/// extra `id` column up front, like the real source file.
pub fn make_source_file(dir: &TempDir, records: &[PropertyRecord]) -> PathBuf {
    let path = dir.path().join("properties.db");
    let conn = Connection::open(&path).expect("create source db");
    conn.execute_batch(
        "CREATE TABLE properties_unique (
            id INTEGER PRIMARY KEY,
            address TEXT, parcel_id TEXT, county TEXT,
            total_appraised_value REAL, land_appraised_value REAL, building_appraised_value REAL,
            bedrooms INTEGER, bathrooms INTEGER, sqft INTEGER, acres REAL,
            last_sale_year INTEGER, last_sale_price REAL, coordinates TEXT
        )",
    )
    .expect("create source table");

    for record in records {
        conn.execute(
            "INSERT INTO properties_unique (
                address, parcel_id, county, total_appraised_value, land_appraised_value,
                building_appraised_value, bedrooms, bathrooms, sqft, acres,
                last_sale_year, last_sale_price, coordinates
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params_from_iter(record.to_args()),
        )
        .expect("seed source row");
    }
    path
}

pub fn make_source(dir: &TempDir, records: &[PropertyRecord]) -> SourceDatabase {
    let path = make_source_file(dir, records);
    SourceDatabase::open(path).expect("open source db")
}

/// A destination backed by a local SQLite file. Inserts whose address is in
/// `fail_on` are refused without touching the table.
pub struct SqliteDestination {
    conn: Connection,
    fail_on: Vec<String>,
    pub closed: Arc<Mutex<bool>>,
}

impl SqliteDestination {
    pub fn open(path: &Path) -> Self {
        Self {
            conn: Connection::open(path).expect("open destination db"),
            fail_on: Vec::new(),
            closed: Arc::new(Mutex::new(false)),
        }
    }

    pub fn failing_on(mut self, address: &str) -> Self {
        self.fail_on.push(address.to_string());
        self
    }
}

impl Destination for SqliteDestination {
    fn execute(&mut self, sql: &str, args: &[Value]) -> Result<QueryResult, RemoteError> {
        if sql.starts_with("INSERT") {
            if let Some(Value::Text(address)) = args.first() {
                if self.fail_on.contains(address) {
                    return Err(RemoteError::Statement {
                        message: "SQLITE_CONSTRAINT: refused by test".to_string(),
                        code: Some("SQLITE_CONSTRAINT".to_string()),
                    });
                }
            }
        }

        let to_remote = |e: rusqlite::Error| RemoteError::Statement {
            message: e.to_string(),
            code: None,
        };

        let mut stmt = self.conn.prepare(sql).map_err(to_remote)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        if columns.is_empty() {
            let affected = stmt.execute(params_from_iter(args)).map_err(to_remote)?;
            return Ok(QueryResult {
                affected_row_count: affected as u64,
                last_insert_rowid: Some(self.conn.last_insert_rowid()),
                ..Default::default()
            });
        }

        let width = columns.len();
        let rows = stmt
            .query_map(params_from_iter(args), |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(Value::from))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })
            .map_err(to_remote)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(to_remote)?;

        Ok(QueryResult {
            columns,
            rows,
            ..Default::default()
        })
    }

    fn close(&mut self) -> Result<(), RemoteError> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

/// Every record stored in `table`, in rowid order.
pub fn read_destination(path: &Path, table: &str) -> Vec<PropertyRecord> {
    let conn = Connection::open(path).expect("open destination db");
    let sql = format!(
        "SELECT {} FROM {table} ORDER BY rowid",
        PropertyRecord::COLUMNS.join(", ")
    );
    let mut stmt = conn.prepare(&sql).expect("prepare read");
    let rows = stmt
        .query_map([], |row| PropertyRecord::from_row(row))
        .expect("query destination");
    rows.map(|r| r.expect("row")).collect()
}

type Responder = dyn Fn(&serde_json::Value) -> serde_json::Value + Send + Sync;

/// Minimal stand-in for a remote libSQL server: answers `/v2/pipeline`
/// posts, one connection per request, and keeps every request body.
pub struct FakeRemote {
    pub url: String,
    pub requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl FakeRemote {
    /// `respond` maps one `execute` stmt to one result entry. Answering
    /// `null` fails the whole request with a 500 instead.
    pub fn spawn(
        token: &str,
        respond: impl Fn(&serde_json::Value) -> serde_json::Value + Send + Sync + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake remote");
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        let expected_auth = format!("Bearer {token}");
        let respond: Arc<Responder> = Arc::new(respond);

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut content_length = 0usize;
                let mut auth = String::new();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                        break;
                    }
                    let (name, value) = line.split_once(':').unwrap_or((line.as_str(), ""));
                    match name.to_ascii_lowercase().as_str() {
                        "content-length" => content_length = value.trim().parse().unwrap_or(0),
                        "authorization" => auth = value.trim().to_string(),
                        _ => {}
                    }
                }

                let mut body = vec![0u8; content_length];
                if reader.read_exact(&mut body).is_err() {
                    continue;
                }

                let (status, reply) = if auth != expected_auth {
                    ("401 Unauthorized", "{\"error\":\"Unauthorized\"}".to_string())
                } else {
                    let request: serde_json::Value =
                        serde_json::from_slice(&body).unwrap_or_default();
                    seen.lock().unwrap().push(request.clone());
                    match pipeline_reply(&request, respond.as_ref()) {
                        Some(reply) => ("200 OK", reply.to_string()),
                        None => (
                            "500 Internal Server Error",
                            "{\"error\":\"stream failed\"}".to_string(),
                        ),
                    }
                };

                let _ = write!(
                    stream,
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
                    reply.len()
                );
                let _ = stream.flush();
            }
        });

        Self { url, requests }
    }

    /// SQL text of every executed statement, in order.
    pub fn executed_sql(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .flat_map(|r| r["requests"].as_array().cloned().unwrap_or_default())
            .filter(|r| r["type"] == "execute")
            .map(|r| r["stmt"]["sql"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

fn pipeline_reply(request: &serde_json::Value, respond: &Responder) -> Option<serde_json::Value> {
    let results: Vec<serde_json::Value> = request["requests"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|r| match r["type"].as_str() {
            Some("execute") => respond(&r["stmt"]),
            _ => serde_json::json!({"type": "ok", "response": {"type": "close"}}),
        })
        .collect();

    if results.iter().any(serde_json::Value::is_null) {
        return None;
    }
    Some(serde_json::json!({"baton": "baton-1", "base_url": null, "results": results}))
}

/// The reply of a statement that went fine and returned `rows`.
pub fn ok_result(rows: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "type": "ok",
        "response": {
            "type": "execute",
            "result": {
                "cols": [],
                "rows": rows,
                "affected_row_count": 1,
                "last_insert_rowid": null
            }
        }
    })
}
