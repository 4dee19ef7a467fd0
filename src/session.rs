//! The database session.
//!
//! A [`Session`] owns exactly one connection and one [`Cursor`]. Statements run
//! inside scoped transactions opened with [`Session::execute`] or
//! [`Session::executemany`]: the scope commits when its closure returns `Ok`,
//! and rolls back (logging the error once) when it returns `Err` or panics.
//! Rows of the last statement are then read with the fetch helpers.
//!
//! The session is blocking. The driver is asynchronous, so each session drives
//! its own current-thread tokio runtime; do not use a session from inside
//! another async runtime.
//!
//! ```no_run
//! use mysql_session::{ConnectionOptions, Session, params};
//!
//! # fn main() -> mysql_session::DbResult<()> {
//! let mut session = Session::connect(&ConnectionOptions::default())?;
//! session.execute(|cur| {
//!     cur.run(
//!         "INSERT INTO user (name, age) VALUES (%(name)s, %(age)s)",
//!         Some(&params! {"name" => "tim", "age" => 18}),
//!     )
//! })?;
//! session.execute(|cur| cur.run("SELECT * FROM user", None))?;
//! for record in session.fetchall()? {
//!     println!("{} is {}", record["name"], record["age"]);
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::ConnectionOptions;
use crate::db::{
    Cursor, CursorState, DbConnection, DbTransaction, StatementOutcome, bind_statement,
    ensure_single_statement,
};
use crate::error::{DbError, DbResult};
use crate::models::{ColumnMetadata, ConnectionInfo, DatabaseType, Params, Record};
use std::panic::{self, AssertUnwindSafe};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

/// Per-session execution settings.
#[derive(Debug, Clone, Copy)]
struct Settings {
    db_type: DatabaseType,
    multi_statements: bool,
    decode_binary: bool,
}

/// One database connection with its cursor.
#[derive(Debug)]
pub struct Session {
    connection: Option<DbConnection>,
    cursor: Cursor,
    runtime: Runtime,
    settings: Settings,
    info: ConnectionInfo,
}

impl Session {
    /// Open a connection and create the session's cursor.
    ///
    /// Fails with [`DbError::InvalidInput`] for unusable options,
    /// [`DbError::Connection`] when the server is unreachable or rejects the
    /// credentials, and [`DbError::Timeout`] when the connect timeout elapses.
    pub fn connect(options: &ConnectionOptions) -> DbResult<Self> {
        let options = options.normalized().map_err(DbError::invalid_input)?;
        let target = options.display_target();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::internal(format!("Failed to start session runtime: {}", e)))?;

        let mut connection = match runtime.block_on(DbConnection::open(&options)) {
            Ok(connection) => connection,
            Err(e) => {
                error!(url = %target, error = %e, "Failed to connect");
                return Err(e);
            }
        };
        let server_version = runtime.block_on(connection.server_version());

        let settings = Settings {
            db_type: connection.db_type(),
            multi_statements: options.multi_statements,
            decode_binary: options.decode_binary,
        };

        info!(
            url = %target,
            db_type = %settings.db_type,
            server_version = server_version.as_deref().unwrap_or("unknown"),
            multi_statements = settings.multi_statements,
            "Session connected"
        );

        Ok(Self {
            connection: Some(connection),
            cursor: Cursor::new(),
            runtime,
            settings,
            info: ConnectionInfo {
                database_type: settings.db_type,
                target,
                server_version,
                multi_statements: settings.multi_statements,
            },
        })
    }

    /// Open a session from a connection URL.
    pub fn connect_url(url: &str) -> DbResult<Self> {
        let options = ConnectionOptions::from_url(url).map_err(DbError::invalid_input)?;
        Self::connect(&options)
    }

    /// Run a single-statement scope.
    ///
    /// Every statement the closure runs shares one transaction. It is committed
    /// when the closure returns `Ok`. When the closure returns `Err` the
    /// transaction is rolled back, the error is logged and then returned.
    pub fn execute<T, F>(&mut self, work: F) -> DbResult<T>
    where
        F: FnOnce(&mut Execute<'_, '_>) -> DbResult<T>,
    {
        self.transact("execute", |scope| work(&mut Execute { scope }))
    }

    /// Run a batch scope: like [`execute`](Self::execute), but the handle runs
    /// one statement once per parameter set.
    pub fn executemany<T, F>(&mut self, work: F) -> DbResult<T>
    where
        F: FnOnce(&mut ExecuteMany<'_, '_>) -> DbResult<T>,
    {
        self.transact("executemany", |scope| work(&mut ExecuteMany { scope }))
    }

    fn transact<T>(
        &mut self,
        operation: &'static str,
        work: impl FnOnce(&mut Scope<'_>) -> DbResult<T>,
    ) -> DbResult<T> {
        let Session {
            connection,
            cursor,
            runtime,
            settings,
            ..
        } = self;
        let connection = connection
            .as_mut()
            .ok_or_else(|| DbError::state("The session is closed"))?;

        cursor.begin();
        let tx = match runtime.block_on(connection.begin()) {
            Ok(tx) => tx,
            Err(e) => {
                cursor.invalidate();
                error!(operation, error = %e, "Failed to begin transaction");
                return Err(e);
            }
        };

        let mut scope = Scope {
            tx,
            runtime,
            cursor,
            settings: *settings,
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| work(&mut scope)));
        let Scope {
            tx, runtime, cursor, ..
        } = scope;

        let result = match result {
            Ok(result) => result,
            Err(payload) => {
                cursor.invalidate();
                error!(operation, "Scope panicked, rolling back transaction");
                if let Err(rollback_err) = runtime.block_on(tx.rollback()) {
                    warn!(operation, error = %rollback_err, "Rollback failed");
                }
                panic::resume_unwind(payload);
            }
        };

        match result {
            Ok(value) => match runtime.block_on(tx.commit()) {
                Ok(()) => {
                    debug!(operation, "Transaction committed");
                    Ok(value)
                }
                Err(e) => {
                    cursor.invalidate();
                    error!(operation, error = %e, "Failed to commit transaction");
                    Err(e)
                }
            },
            Err(e) => {
                cursor.invalidate();
                error!(
                    operation,
                    error = %e,
                    sql_state = e.sql_state().unwrap_or(""),
                    "Statement failed, rolling back transaction"
                );
                if let Err(rollback_err) = runtime.block_on(tx.rollback()) {
                    warn!(operation, error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Next record of the last statement's result, `None` when no row remains.
    pub fn fetchone(&mut self) -> DbResult<Option<Record>> {
        self.cursor.fetchone()
    }

    /// Up to `size` records (the cursor's arraysize when `None`).
    pub fn fetchmany(&mut self, size: Option<usize>) -> DbResult<Vec<Record>> {
        self.cursor.fetchmany(size)
    }

    /// All remaining records.
    pub fn fetchall(&mut self) -> DbResult<Vec<Record>> {
        self.cursor.fetchall()
    }

    pub fn description(&self) -> Option<&[ColumnMetadata]> {
        self.cursor.description()
    }

    pub fn rowcount(&self) -> i64 {
        self.cursor.rowcount()
    }

    pub fn lastrowid(&self) -> Option<u64> {
        self.cursor.lastrowid()
    }

    pub fn arraysize(&self) -> usize {
        self.cursor.arraysize()
    }

    pub fn set_arraysize(&mut self, size: usize) {
        self.cursor.set_arraysize(size);
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    pub fn db_type(&self) -> DatabaseType {
        self.settings.db_type
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Check that the connection is still alive.
    pub fn ping(&mut self) -> DbResult<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| DbError::state("The session is closed"))?;
        self.runtime.block_on(connection.ping())
    }

    /// Release the cursor, then close the connection.
    ///
    /// Idempotent. Problems while closing are logged, not returned.
    pub fn close(&mut self) {
        if self.cursor.state() != CursorState::Closed {
            self.cursor.close();
        }
        let Some(connection) = self.connection.take() else {
            return;
        };
        match self.runtime.block_on(connection.close()) {
            Ok(()) => info!(url = %self.info.target, "Session closed"),
            Err(e) => warn!(
                url = %self.info.target,
                error = %e,
                "Failed to close connection cleanly"
            ),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// State shared by both scope handles.
struct Scope<'a> {
    tx: DbTransaction<'a>,
    runtime: &'a Runtime,
    cursor: &'a mut Cursor,
    settings: Settings,
}

impl Scope<'_> {
    fn run_statement(&mut self, sql: &str, params: Option<&Params>) -> DbResult<StatementOutcome> {
        let bound = bind_statement(sql, params, self.settings.db_type)?;
        if !self.settings.multi_statements {
            ensure_single_statement(&bound.sql, self.settings.db_type)?;
        }

        debug!(sql = %bound.sql, params = bound.params.len(), "Executing statement");
        let outcome = self.runtime.block_on(self.tx.run(
            &bound.sql,
            &bound.params,
            self.settings.decode_binary,
        ))?;
        debug!(
            rows = outcome.rows.len(),
            rows_affected = outcome.rows_affected,
            statements = outcome.statements,
            "Statement finished"
        );
        Ok(outcome)
    }
}

/// Handle of a single-statement scope.
pub struct Execute<'s, 'a> {
    scope: &'s mut Scope<'a>,
}

impl Execute<'_, '_> {
    /// Run `sql` with an optional parameter set.
    ///
    /// Returns the rows produced by a query or the rows affected by any other
    /// statement. The result replaces the session cursor's previous one.
    pub fn run(&mut self, sql: &str, params: Option<&Params>) -> DbResult<u64> {
        let outcome = self.scope.run_statement(sql, params)?;
        Ok(self.scope.cursor.load(outcome))
    }

    /// The session cursor, holding the result of the last statement run in this scope.
    pub fn cursor(&mut self) -> &mut Cursor {
        self.scope.cursor
    }
}

/// Handle of a batch scope.
pub struct ExecuteMany<'s, 'a> {
    scope: &'s mut Scope<'a>,
}

impl ExecuteMany<'_, '_> {
    /// Run `sql` once per parameter set, in order, and return the total rows affected.
    ///
    /// An empty batch runs nothing and returns 0.
    pub fn run(&mut self, sql: &str, batch: &[Params]) -> DbResult<u64> {
        let mut total = 0u64;
        let mut last = StatementOutcome::default();
        for params in batch {
            last = self.scope.run_statement(sql, Some(params))?;
            total += last.rows_affected;
        }
        self.scope.cursor.load_batch(last, total);
        Ok(total)
    }

    pub fn cursor(&mut self) -> &mut Cursor {
        self.scope.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    fn memory_session() -> Session {
        Session::connect_url("sqlite::memory:").unwrap()
    }

    #[test]
    fn test_connect_info() {
        let session = memory_session();
        assert!(session.is_open());
        assert_eq!(session.db_type(), DatabaseType::SQLite);
        assert_eq!(session.info().target, "sqlite::memory:");
        assert!(session.info().server_version.is_some());
        assert!(session.info().multi_statements);
    }

    #[test]
    fn test_invalid_options() {
        let err = Session::connect_url("postgres://localhost/db").unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }

    #[test]
    fn test_scope_result_is_returned() {
        let mut session = memory_session();
        let count = session
            .execute(|cur| {
                cur.run("CREATE TABLE t (v INTEGER)", None)?;
                cur.run("INSERT INTO t (v) VALUES (1), (2)", None)
            })
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(session.rowcount(), 2);
    }

    #[test]
    fn test_fetch_inside_scope() {
        let mut session = memory_session();
        let first = session
            .execute(|cur| {
                cur.run("SELECT %s AS v", Some(&params![5]))?;
                cur.cursor().fetchone()
            })
            .unwrap()
            .unwrap();
        assert_eq!(first["v"], serde_json::json!(5));
        assert!(session.fetchone().unwrap().is_none());
    }

    #[test]
    fn test_invalid_input_fails_scope() {
        let mut session = memory_session();
        let err = session
            .execute(|cur| cur.run("SELECT %(missing)s", Some(&params! {"v" => 1})))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
        assert!(matches!(session.fetchall(), Err(DbError::State { .. })));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = memory_session();
        session.close();
        session.close();
        assert!(!session.is_open());
        assert!(matches!(
            session.execute(|cur| cur.run("SELECT 1", None)),
            Err(DbError::State { .. })
        ));
        assert!(matches!(session.fetchone(), Err(DbError::State { .. })));
        assert!(matches!(session.ping(), Err(DbError::State { .. })));
    }
}
