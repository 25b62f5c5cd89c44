//! In-memory [Session] used by unit tests.
//!
//! It understands exactly the statements this crate issues (plus plain `CREATE TABLE`
//! migrations) and keeps just enough state to answer them consistently.

use crate::dump::LIST_TABLES_SQL;
use crate::error::Error;
use crate::ledger::{
    CREATE_TABLE_SQL, ENTRIES_SQL, HAS_APPLIED_SQL, LEDGER_TABLE_NAME, RECORD_SQL,
    TABLE_EXISTS_SQL,
};
use crate::provision::DATABASE_EXISTS_SQL;
use crate::session::{datetime, datetime_value, Session};
use chrono::NaiveDateTime;
use mysql::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
pub(crate) struct FakeSession {
    databases: BTreeSet<String>,
    ledger: Option<BTreeMap<u32, NaiveDateTime>>,
    tables: BTreeMap<String, String>,
    failures: Vec<(String, String)>,
    executed: Vec<String>,
    calls: usize,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(name: &str) -> Self {
        let mut session = Self::new();
        session.databases.insert(name.to_string());
        session
    }

    /// Create the ledger table holding `entries`.
    pub fn with_ledger(mut self, entries: &[(u32, NaiveDateTime)]) -> Self {
        self.ledger = Some(entries.iter().copied().collect());
        self
    }

    pub fn with_table(mut self, name: &str, create_statement: &str) -> Self {
        self.tables
            .insert(name.to_string(), create_statement.to_string());
        self
    }

    /// Fail any statement or query containing `needle` with a server error.
    pub fn fail_on(mut self, needle: &str, message: &str) -> Self {
        self.failures
            .push((needle.to_string(), message.to_string()));
        self
    }

    /// Statements sent through `execute` / `execute_with`, including failed attempts.
    pub fn executed(&self) -> Vec<String> {
        self.executed.clone()
    }

    /// Number of calls of any kind made on this session.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn ledger_versions(&self) -> Vec<u32> {
        self.ledger
            .as_ref()
            .map(|ledger| ledger.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn ledger_entry(&self, version: u32) -> Option<NaiveDateTime> {
        self.ledger.as_ref()?.get(&version).copied()
    }

    pub fn table(&self, name: &str) -> Option<&str> {
        self.tables.get(name).map(String::as_str)
    }

    fn check_failures(&self, sql: &str) -> Result<(), Error> {
        match self.failures.iter().find(|(needle, _)| sql.contains(needle)) {
            Some((_, message)) => Err(Error::Statement(message.clone())),
            None => Ok(()),
        }
    }

    fn ledger_mut(&mut self) -> Result<&mut BTreeMap<u32, NaiveDateTime>, Error> {
        self.ledger.as_mut().ok_or_else(|| {
            Error::Statement(format!("Table '{}' doesn't exist", LEDGER_TABLE_NAME))
        })
    }

    fn insert_ledger(&mut self, version: u32, at: NaiveDateTime) -> Result<(), Error> {
        let ledger = self.ledger_mut()?;
        if ledger.contains_key(&version) {
            return Err(Error::Statement(format!(
                "Duplicate entry '{}' for key '_migrations.PRIMARY'",
                version
            )));
        }
        ledger.insert(version, at);
        Ok(())
    }

    fn create_table(&mut self, statement: &str) -> Result<(), Error> {
        let rest = statement["CREATE TABLE".len()..].trim_start();
        let (rest, if_not_exists) = match rest.strip_prefix("IF NOT EXISTS") {
            Some(rest) => (rest.trim_start(), true),
            None => (rest, false),
        };
        let name: String = rest
            .chars()
            .take_while(|c| !c.is_whitespace() && *c != '(')
            .collect::<String>()
            .trim_matches('`')
            .to_string();
        if self.tables.contains_key(&name) {
            if if_not_exists {
                return Ok(());
            }
            return Err(Error::Statement(format!("Table '{}' already exists", name)));
        }
        self.tables.insert(name, statement.to_string());
        Ok(())
    }

    // INSERT INTO _migrations (version, created_at) VALUES\n(1, "2024-01-01 00:00:00"),\n...
    fn load_ledger_script(&mut self, script: &str) -> Result<(), Error> {
        let (_, values) = script
            .split_once("VALUES")
            .ok_or_else(|| Error::Statement("You have an error in your SQL syntax".to_string()))?;
        for tuple in values.split("),") {
            let tuple = tuple.trim().trim_start_matches('(').trim_end_matches([')', ';']);
            let (version, at) = tuple
                .split_once(',')
                .ok_or_else(|| Error::Statement(format!("bad tuple {:?}", tuple)))?;
            let version: u32 = version
                .trim()
                .parse()
                .map_err(|_| Error::Statement(format!("bad version {:?}", version)))?;
            let at = datetime(
                &[Value::Bytes(at.trim().trim_matches('"').as_bytes().to_vec())],
                0,
                "created_at",
            )?;
            self.insert_ledger(version, at)?;
        }
        Ok(())
    }
}

fn text(params: &[Value], index: usize) -> String {
    mysql::from_value_opt::<String>(params[index].clone()).unwrap_or_default()
}

impl Session for FakeSession {
    fn execute(&mut self, statement: &str) -> Result<(), Error> {
        self.calls += 1;
        self.executed.push(statement.to_string());
        self.check_failures(statement)?;

        if let Some(rest) = statement.strip_prefix("CREATE DATABASE ") {
            let name = rest
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .trim_matches('`')
                .to_string();
            self.databases.insert(name);
        } else if statement == CREATE_TABLE_SQL {
            if self.ledger.is_some() {
                return Err(Error::Statement(format!(
                    "Table '{}' already exists",
                    LEDGER_TABLE_NAME
                )));
            }
            self.ledger = Some(BTreeMap::new());
        } else if statement.starts_with("INSERT INTO _migrations") {
            self.load_ledger_script(statement)?;
        } else if statement.starts_with("CREATE TABLE") {
            self.create_table(statement)?;
        }
        Ok(())
    }

    fn execute_with(&mut self, statement: &str, params: Vec<Value>) -> Result<(), Error> {
        self.calls += 1;
        self.executed.push(statement.to_string());
        self.check_failures(statement)?;

        if statement == RECORD_SQL {
            let version: u32 = mysql::from_value_opt(params[0].clone())
                .map_err(|e| Error::Statement(e.to_string()))?;
            let at = datetime(&params, 1, "created_at")?;
            self.insert_ledger(version, at)?;
        }
        Ok(())
    }

    fn select(&mut self, query: &str, params: Vec<Value>) -> Result<Vec<Vec<Value>>, Error> {
        self.calls += 1;
        self.check_failures(query)?;

        let one = || vec![vec![Value::Int(1)]];
        if query == DATABASE_EXISTS_SQL {
            let found = self.databases.contains(&text(&params, 0));
            Ok(if found { one() } else { vec![] })
        } else if query == TABLE_EXISTS_SQL {
            let name = text(&params, 0);
            let found = if name == LEDGER_TABLE_NAME {
                self.ledger.is_some()
            } else {
                self.tables.contains_key(&name)
            };
            Ok(if found { one() } else { vec![] })
        } else if query == HAS_APPLIED_SQL {
            let version: u32 = mysql::from_value_opt(params[0].clone())
                .map_err(|e| Error::Statement(e.to_string()))?;
            let found = self.ledger_mut()?.contains_key(&version);
            Ok(if found { one() } else { vec![] })
        } else if query == ENTRIES_SQL {
            Ok(self
                .ledger_mut()?
                .iter()
                .map(|(version, at)| vec![Value::from(*version), datetime_value(*at)])
                .collect())
        } else if query == LIST_TABLES_SQL {
            let mut names: Vec<String> = self.tables.keys().cloned().collect();
            if self.ledger.is_some() {
                names.push(LEDGER_TABLE_NAME.to_string());
            }
            names.sort();
            Ok(names
                .into_iter()
                .map(|name| vec![Value::Bytes(name.into_bytes())])
                .collect())
        } else if let Some(quoted) = query.strip_prefix("SHOW CREATE TABLE ") {
            let name = quoted.trim_matches('`').replace("``", "`");
            match self.tables.get(&name) {
                Some(statement) => Ok(vec![vec![
                    Value::Bytes(name.clone().into_bytes()),
                    Value::Bytes(statement.clone().into_bytes()),
                ]]),
                None => Err(Error::Statement(format!("Table '{}' doesn't exist", name))),
            }
        } else {
            Err(Error::Statement(format!("unexpected query: {}", query)))
        }
    }
}

/// Wraps a [FakeSession] and raises `interrupt` once a statement or query containing
/// `needle` has gone through, as if another thread stopped the operation mid-way.
pub(crate) struct RaisingSession {
    pub inner: FakeSession,
    needle: String,
    interrupt: crate::interrupt::Interrupt,
}

impl RaisingSession {
    pub fn new(inner: FakeSession, needle: &str, interrupt: crate::interrupt::Interrupt) -> Self {
        Self {
            inner,
            needle: needle.to_string(),
            interrupt,
        }
    }

    fn observe(&self, sql: &str) {
        if sql.contains(&self.needle) {
            self.interrupt.raise();
        }
    }
}

impl Session for RaisingSession {
    fn execute(&mut self, statement: &str) -> Result<(), Error> {
        let result = self.inner.execute(statement);
        self.observe(statement);
        result
    }

    fn execute_with(&mut self, statement: &str, params: Vec<Value>) -> Result<(), Error> {
        let result = self.inner.execute_with(statement, params);
        self.observe(statement);
        result
    }

    fn select(&mut self, query: &str, params: Vec<Value>) -> Result<Vec<Vec<Value>>, Error> {
        let result = self.inner.select(query, params);
        self.observe(query);
        result
    }
}
