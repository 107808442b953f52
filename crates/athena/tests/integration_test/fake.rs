//! A tiny in-memory stand-in for Athena's catalog.
//!
//! Understands just enough DDL to tell whether a statement would conflict
//! with existing objects, so idempotency can be observed from outside.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use facility_athena::*;

#[derive(Default)]
struct Catalog {
    databases: BTreeSet<String>,
    tables: BTreeSet<String>,
    executions: HashMap<String, StatusReport>,
    statements: Vec<String>,
}

#[derive(Default)]
pub struct FakeCatalog {
    inner: Mutex<Catalog>,
}

impl FakeCatalog {
    pub fn databases(&self) -> Vec<String> {
        self.inner.lock().unwrap().databases.iter().cloned().collect()
    }

    pub fn tables(&self) -> Vec<String> {
        self.inner.lock().unwrap().tables.iter().cloned().collect()
    }

    pub fn statements(&self) -> Vec<String> {
        self.inner.lock().unwrap().statements.clone()
    }

    fn execute(catalog: &mut Catalog, request: &QueryRequest) -> (QueryStatus, Option<String>) {
        let sql = request.sql.trim();
        let if_not_exists = sql.contains("IF NOT EXISTS");

        let (set, name) = if let Some(rest) = sql.strip_prefix("CREATE DATABASE") {
            let name = rest.replace("IF NOT EXISTS", "").trim().to_string();
            (&mut catalog.databases, name)
        } else if let Some(rest) = sql.strip_prefix("CREATE EXTERNAL TABLE") {
            let name = rest
                .replace("IF NOT EXISTS", "")
                .trim()
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
            (&mut catalog.tables, name)
        } else {
            return (QueryStatus::Succeeded, None);
        };

        if set.insert(name.clone()) || if_not_exists {
            (QueryStatus::Succeeded, None)
        } else {
            (
                QueryStatus::Failed,
                Some(format!("AlreadyExistsException: {name} already exists")),
            )
        }
    }
}

#[async_trait]
impl QueryService for FakeCatalog {
    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryHandle, AthenaError> {
        let mut catalog = self.inner.lock().unwrap();
        catalog.statements.push(request.sql.clone());
        let id = format!("exec-{}", catalog.statements.len());

        let (status, reason) = Self::execute(&mut catalog, request);
        let mut report = StatusReport::new(id.clone(), status);
        report.reason = reason;
        catalog.executions.insert(id.clone(), report);

        QueryHandle::new(id)
    }

    async fn get_query_status(&self, handle: &QueryHandle) -> Result<StatusReport, AthenaError> {
        self.inner
            .lock()
            .unwrap()
            .executions
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| AthenaError::Validation(format!("unknown execution {handle}")))
    }

    async fn get_query_results(
        &self,
        handle: &QueryHandle,
        _page_size: u32,
    ) -> Result<QueryResultSet, AthenaError> {
        let metadata = self.get_query_status(handle).await?;
        Ok(QueryResultSet {
            columns: Vec::new(),
            rows: Vec::new(),
            metadata,
        })
    }
}
