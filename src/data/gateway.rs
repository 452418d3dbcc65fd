use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Params, Row};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::data::tables;
use crate::error::Result;

/// Counts statements currently running against the store.
#[derive(Debug, Default)]
pub struct ExecutionStats {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    total: AtomicUsize,
}

impl ExecutionStats {
    fn begin(&self) -> ExecutionGuard<'_> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);

        ExecutionGuard { stats: self }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn total_executions(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

struct ExecutionGuard<'a> {
    stats: &'a ExecutionStats,
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs single parameterized statements against the store.
///
/// The pool keeps exactly one long-lived connection. Every call checks it out
/// for the length of one statement and hands it back when the pooled guard is
/// dropped, on the error paths as well. Nothing here spans several statements:
/// callers get their consistency from the request queue owning the gateway.
#[derive(Clone)]
pub struct Gateway {
    pool: Pool<SqliteConnectionManager>,
    stats: Arc<ExecutionStats>,
}

impl Gateway {
    #[instrument(skip(manager))]
    pub fn open(manager: SqliteConnectionManager) -> Result<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        let gateway = Gateway {
            pool,
            stats: Arc::default(),
        };

        gateway.build_tables()?;

        Ok(gateway)
    }

    fn build_tables(&self) -> Result<()> {
        let conn = self.pool.get()?;

        conn.execute(tables::PLUG_TABLE, [])?;
        debug!("Built plug table");

        conn.execute(tables::RESULT_TABLE, [])?;
        conn.execute(tables::RESULT_INDEX, [])?;
        debug!("Built result table");

        conn.execute(tables::AVERAGE_TABLE, [])?;
        conn.execute(tables::AVERAGE_INDEX, [])?;
        debug!("Built average table");

        Ok(())
    }

    pub fn stats(&self) -> Arc<ExecutionStats> {
        self.stats.clone()
    }

    pub fn query<T, P, F>(&self, template: &str, params: P, map_row: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let _execution = self.stats.begin();
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(template)?;
        let rows = stmt
            .query_map(params, map_row)?
            .collect::<rusqlite::Result<Vec<T>>>()?;

        Ok(rows)
    }

    pub fn execute<P: Params>(&self, template: &str, params: P) -> Result<usize> {
        let _execution = self.stats.begin();
        let conn = self.pool.get()?;

        Ok(conn.execute(template, params)?)
    }

    /// Executes an insert and returns the rowid it generated.
    pub fn insert<P: Params>(&self, template: &str, params: P) -> Result<i64> {
        let _execution = self.stats.begin();
        let conn = self.pool.get()?;

        conn.execute(template, params)?;

        Ok(conn.last_insert_rowid())
    }
}
