use std::sync::Mutex;

use crate::hydration::ResultRow;
use crate::sql_generator::CompiledQuery;
use crate::utils::Value;

/// Error raised by a database round-trip, passed through untouched
pub type ExecutionError = Box<dyn std::error::Error + Send + Sync>;

/// Database round-trip used by the finder
pub trait RowExecutor {
    /// Run `sql` with `params` bound and return every row, columns keyed by
    /// their select alias
    fn query_all(
        &self,
        sql: &str,
        params: &[(String, Value)],
    ) -> Result<Vec<ResultRow>, ExecutionError>;
}

/// Executor answering every statement with the same rows; records what it
/// was asked to run
#[derive(Debug, Default)]
pub struct CannedExecutor {
    rows: Vec<ResultRow>,
    executed: Mutex<Vec<CompiledQuery>>,
}

impl CannedExecutor {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        CannedExecutor {
            rows,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Statements run so far, oldest first
    pub fn executed(&self) -> Vec<CompiledQuery> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

impl RowExecutor for CannedExecutor {
    fn query_all(
        &self,
        sql: &str,
        params: &[(String, Value)],
    ) -> Result<Vec<ResultRow>, ExecutionError> {
        self.executed
            .lock()
            .map_err(|e| e.to_string())?
            .push(CompiledQuery {
                sql: sql.to_string(),
                params: params.to_vec(),
            });
        Ok(self.rows.clone())
    }
}
