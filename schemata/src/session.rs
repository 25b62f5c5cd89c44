//!
//! # Database sessions
//!
//! Everything in this crate talks to MySQL through the [Session] capability rather than a
//! concrete connection type, so the same code drives a [mysql::Conn], a pooled connection,
//! or a transaction.
//!

use crate::error::Error;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use mysql::prelude::*;
use mysql::Value;

/// A live connection that statements can be issued on.
///
/// Statements are sent one at a time and each call blocks until the server has answered.
pub trait Session {
    /// Execute a statement (or a `;`-separated batch) and discard any result sets.
    fn execute(&mut self, statement: &str) -> Result<(), Error>;

    /// Execute a statement with positional `?` parameters and discard any result set.
    fn execute_with(&mut self, statement: &str, params: Vec<Value>) -> Result<(), Error>;

    /// Run a query and return every row as its column values, in column order.
    /// An empty `params` sends the query as plain text.
    fn select(&mut self, query: &str, params: Vec<Value>) -> Result<Vec<Vec<Value>>, Error>;
}

macro_rules! impl_session {
    ($($conn:ty),* $(,)?) => {
        $(
            impl Session for $conn {
                fn execute(&mut self, statement: &str) -> Result<(), Error> {
                    self.query_drop(statement)?;
                    Ok(())
                }

                fn execute_with(&mut self, statement: &str, params: Vec<Value>) -> Result<(), Error> {
                    self.exec_drop(statement, params)?;
                    Ok(())
                }

                fn select(&mut self, query: &str, params: Vec<Value>) -> Result<Vec<Vec<Value>>, Error> {
                    let rows: Vec<mysql::Row> = if params.is_empty() {
                        self.query(query)?
                    } else {
                        self.exec(query, params)?
                    };
                    Ok(rows.into_iter().map(mysql::Row::unwrap).collect())
                }
            }
        )*
    };
}

impl_session!(mysql::Conn, mysql::PooledConn, mysql::Transaction<'_>);

/// Decode column `index` of `row`, describing `what` in the error on failure.
pub(crate) fn column<T: FromValue>(row: &[Value], index: usize, what: &str) -> Result<T, Error> {
    let value = row
        .get(index)
        .cloned()
        .ok_or_else(|| Error::Statement(format!("{what}: result has no column {index}")))?;
    mysql::from_value_opt::<T>(value)
        .map_err(|e| Error::Statement(format!("unable to scan {what}: {e}")))
}

/// Decode a `DATETIME` column, whether it arrived over the binary protocol or as text.
pub(crate) fn datetime(row: &[Value], index: usize, what: &str) -> Result<NaiveDateTime, Error> {
    let invalid = |detail: String| Error::Statement(format!("unable to scan {what}: {detail}"));
    match row.get(index) {
        Some(Value::Date(year, month, day, hour, minute, second, micros)) => {
            NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))
                .and_then(|date| {
                    date.and_hms_micro_opt(
                        u32::from(*hour),
                        u32::from(*minute),
                        u32::from(*second),
                        *micros,
                    )
                })
                .ok_or_else(|| invalid(format!("{:?} is not a valid datetime", row[index])))
        }
        Some(Value::Bytes(bytes)) => {
            let text = String::from_utf8_lossy(bytes);
            NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|e| invalid(format!("{text:?}: {e}")))
        }
        Some(other) => Err(invalid(format!("unexpected value {other:?}"))),
        None => Err(invalid(format!("result has no column {index}"))),
    }
}

/// Encode a timestamp as a `DATETIME` parameter.
pub(crate) fn datetime_value(at: NaiveDateTime) -> Value {
    Value::Date(
        at.year() as u16,
        at.month() as u8,
        at.day() as u8,
        at.hour() as u8,
        at.minute() as u8,
        at.second() as u8,
        0,
    )
}

/// Back-tick quote an identifier for interpolation into a statement.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
