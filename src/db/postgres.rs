//! PostgreSQL backend.
//!
//! Opens one `PgConnection` per request (no pool), runs statements over the
//! simple-query protocol so the text is sent exactly as written, and decodes
//! the text-format values into [`Value`]s.

use crate::classify::RawFailure;
use crate::db::{ConnectionParameters, Connector, FieldDescriptor, RawResult, Session, Value};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::TryStreamExt;
use sqlx::postgres::{
    PgColumn, PgConnectOptions, PgConnection, PgRow, PgSslMode, PgValueFormat, Postgres,
};
use sqlx::{Column as SqlxColumn, Connection, Either, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use tracing::debug;

/// Reported to the server as `application_name`.
const APPLICATION_NAME: &str = "sql-console";

/// Timestamp layouts of PostgreSQL's ISO `DateStyle`.
const TIMESTAMPTZ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%#z";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Connector that opens plain `PgConnection`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

impl PostgresConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    async fn open(
        &self,
        params: &ConnectionParameters,
    ) -> std::result::Result<Box<dyn Session>, RawFailure> {
        debug!(
            "Opening connection to {} (ssl: {})",
            params.display_string(),
            params.ssl
        );
        let conn = PgConnection::connect_with(&connect_options(params)).await?;
        debug!("Connection established");
        Ok(Box::new(PostgresSession { conn }))
    }
}

/// Translates request parameters into driver options.
///
/// SSL maps to `Require`, which encrypts without checking the certificate
/// chain or host name. No password is set when none was supplied.
fn connect_options(params: &ConnectionParameters) -> PgConnectOptions {
    let ssl_mode = if params.ssl {
        PgSslMode::Require
    } else {
        PgSslMode::Disable
    };

    let options = PgConnectOptions::new_without_pgpass()
        .host(&params.host)
        .port(params.port)
        .database(&params.database)
        .username(&params.username)
        .application_name(APPLICATION_NAME)
        .ssl_mode(ssl_mode);

    match &params.password {
        Some(password) => options.password(password),
        None => options,
    }
}

/// A single open PostgreSQL connection.
struct PostgresSession {
    conn: PgConnection,
}

/// Rows and fields collected for one statement of a request.
#[derive(Default)]
struct StatementRows {
    fields: Vec<FieldDescriptor>,
    rows: Vec<Vec<Value>>,
}

#[async_trait]
impl Session for PostgresSession {
    async fn run(&mut self, statement: &str) -> std::result::Result<RawResult, RawFailure> {
        let mut pending = StatementRows::default();
        let mut completed: Option<(StatementRows, u64)> = None;

        {
            let mut stream = sqlx::raw_sql(statement).fetch_many(&mut self.conn);
            while let Some(step) = stream.try_next().await? {
                match step {
                    Either::Left(done) => {
                        completed = Some((std::mem::take(&mut pending), done.rows_affected()));
                    }
                    Either::Right(row) => {
                        if pending.rows.is_empty() {
                            pending.fields = row.columns().iter().map(field_descriptor).collect();
                        }
                        pending.rows.push(convert_row(&row));
                    }
                }
            }
        }

        // Several statements in one string: the last one wins.
        let (mut last, row_count) = match completed {
            Some((rows, count)) => (rows, Some(count)),
            None => (pending, None),
        };

        if last.rows.is_empty() {
            last.fields = self.describe_columns(statement).await;
        }

        debug!(
            "Statement finished: {} columns, {} rows",
            last.fields.len(),
            last.rows.len()
        );

        Ok(RawResult {
            command: command_tag(statement),
            fields: last.fields,
            rows: last.rows,
            row_count,
        })
    }

    async fn close(self: Box<Self>) -> std::result::Result<(), RawFailure> {
        let PostgresSession { conn } = *self;
        conn.close().await?;
        debug!("Connection closed");
        Ok(())
    }
}

impl PostgresSession {
    /// Column metadata for a statement that returned no rows.
    ///
    /// Best effort: statements that cannot be prepared (several statements,
    /// utility commands) yield no columns.
    async fn describe_columns(&mut self, statement: &str) -> Vec<FieldDescriptor> {
        match (&mut self.conn).describe(statement).await {
            Ok(described) => described.columns().iter().map(field_descriptor).collect(),
            Err(e) => {
                debug!("Could not describe statement columns: {e}");
                Vec::new()
            }
        }
    }
}

fn field_descriptor(column: &PgColumn) -> FieldDescriptor {
    FieldDescriptor::new(column.name(), column.type_info().name(), column.ordinal())
}

/// Command tag for the statement whose result is returned: the leading
/// keyword of the last statement, upper-cased.
///
/// `None` when that keyword says nothing about the command: a leading
/// comment, a `WITH` prefix, or no keyword at all.
fn command_tag(statement: &str) -> Option<String> {
    let text = last_statement(statement);
    if text.starts_with("--") || text.starts_with("/*") {
        return None;
    }

    let keyword: String = text
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let keyword = keyword.to_ascii_uppercase();

    if keyword.is_empty() || keyword == "WITH" {
        None
    } else {
        Some(keyword)
    }
}

/// Trimmed text of the last statement in a simple-query string.
///
/// Splits on `;` outside quoted strings, quoted identifiers, comments and
/// dollar-quoted bodies. Pieces holding only comments are not statements.
fn last_statement(text: &str) -> &str {
    let bytes = text.as_bytes();
    let mut last = "";
    let mut start = 0;
    let mut has_code = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = skip_line_comment(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_block_comment(bytes, i);
                continue;
            }
            b';' => {
                if has_code {
                    last = text[start..i].trim();
                }
                start = i + 1;
                has_code = false;
                i += 1;
                continue;
            }
            b if b.is_ascii_whitespace() => {
                i += 1;
                continue;
            }
            _ => {}
        }

        has_code = true;
        i = match bytes[i] {
            quote @ (b'\'' | b'"') => skip_quoted(bytes, i, quote),
            b'$' => skip_dollar_quoted(text, i),
            _ => i + 1,
        };
    }

    if has_code {
        text[start..].trim()
    } else {
        last
    }
}

/// Index just past the closing quote. Doubled quotes reopen the literal.
fn skip_quoted(bytes: &[u8], open: usize, quote: u8) -> usize {
    bytes[open + 1..]
        .iter()
        .position(|&b| b == quote)
        .map_or(bytes.len(), |offset| open + offset + 2)
}

fn skip_line_comment(bytes: &[u8], open: usize) -> usize {
    bytes[open..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| open + offset + 1)
}

/// Block comments nest.
fn skip_block_comment(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    let mut i = open;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Skips `$tag$ ... $tag$`. A `$` that does not open a dollar quote
/// (`$1`, `a$b`) is a single byte.
fn skip_dollar_quoted(text: &str, open: usize) -> usize {
    let bytes = text.as_bytes();
    let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_';

    if open > 0 && (is_ident(bytes[open - 1]) || bytes[open - 1] == b'$') {
        return open + 1;
    }
    if bytes.get(open + 1).is_some_and(|b| b.is_ascii_digit()) {
        return open + 1;
    }

    let tag_len = bytes[open + 1..]
        .iter()
        .take_while(|&&b| is_ident(b))
        .count();
    let close = open + 1 + tag_len;
    if bytes.get(close) != Some(&b'$') {
        return open + 1;
    }

    let delimiter = &text[open..=close];
    text[close + 1..]
        .find(delimiter)
        .map_or(bytes.len(), |offset| close + 1 + offset + delimiter.len())
}

/// Converts a sqlx PgRow to positional values.
fn convert_row(row: &PgRow) -> Vec<Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    let Ok(raw) = row.try_get_raw(index) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }

    match raw.format() {
        PgValueFormat::Text => raw
            .as_str()
            .map(|text| parse_text_value(text, type_name))
            .unwrap_or(Value::Null),
        PgValueFormat::Binary => decode_binary_value(row, index, type_name),
    }
}

/// Parses a text-format value according to its type name.
///
/// Anything that does not fit a narrower variant keeps its text rendering.
fn parse_text_value(text: &str, type_name: &str) -> Value {
    let parsed = match type_name {
        "BOOL" => match text {
            "t" => Some(Value::Bool(true)),
            "f" => Some(Value::Bool(false)),
            _ => None,
        },
        "INT2" | "INT4" | "INT8" | "OID" => text.parse::<i64>().ok().map(Value::Int),
        "FLOAT4" | "FLOAT8" => text.parse::<f64>().ok().map(Value::Float),
        "TIMESTAMPTZ" => DateTime::parse_from_str(text, TIMESTAMPTZ_FORMAT)
            .ok()
            .map(|ts| Value::Timestamp(ts.with_timezone(&Utc))),
        "TIMESTAMP" => NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
            .ok()
            .map(|ts| Value::Timestamp(ts.and_utc())),
        "BYTEA" => decode_bytea_hex(text).map(Value::Bytes),
        _ => None,
    };

    parsed.unwrap_or_else(|| Value::Text(text.to_string()))
}

/// Decodes bytea in hex output format (`\x0a1b...`).
fn decode_bytea_hex(text: &str) -> Option<Vec<u8>> {
    let hex = text.strip_prefix("\\x")?;
    if hex.len() % 2 != 0 {
        return None;
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

/// Decodes a binary-format value by trying the matching Rust type.
fn decode_binary_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => decoded::<bool>(row, index).into(),
        "INT2" => decoded::<i16>(row, index).map(i64::from).into(),
        "INT4" => decoded::<i32>(row, index).into(),
        "INT8" => decoded::<i64>(row, index).into(),
        "FLOAT4" => decoded::<f32>(row, index).map(f64::from).into(),
        "FLOAT8" => decoded::<f64>(row, index).into(),
        "TIMESTAMPTZ" => decoded::<DateTime<Utc>>(row, index).into(),
        "TIMESTAMP" => decoded::<NaiveDateTime>(row, index)
            .map(|ts| ts.and_utc())
            .into(),
        "BYTEA" => decoded::<Vec<u8>>(row, index).into(),
        // For all other types, try to get as string
        _ => decoded::<String>(row, index).into(),
    }
}

/// Column value as `T`; `None` for NULL or a value that does not decode.
fn decoded<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}
