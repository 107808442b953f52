//! Idempotent creation of the facility database and external table.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::AthenaError;
use crate::service::{QueryRequest, QueryService};
use crate::sql;
use crate::waiter::QueryCompletionWaiter;

/// Where the facility table lives and where statements about it write results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityTable {
    pub database: String,
    pub table: String,
    /// Bucket holding the raw JSON documents (the table's LOCATION).
    pub source_bucket: String,
    /// `s3://` prefix for Athena result files.
    pub output_location: String,
    pub workgroup: String,
}

impl FacilityTable {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    /// Request running `sql` in this table's database.
    pub fn request(&self, sql: String) -> QueryRequest {
        QueryRequest {
            sql,
            database: self.database.clone(),
            output_location: self.output_location.clone(),
            workgroup: self.workgroup.clone(),
        }
    }
}

/// Issues `CREATE ... IF NOT EXISTS` DDL and waits for each statement.
///
/// Safe to run on every invocation: repeating it with the same table has no
/// observable effect. Concurrent invocations rely on the service's own DDL
/// idempotency.
#[derive(Debug, Clone)]
pub struct SchemaEnsurer {
    table: FacilityTable,
    ddl_timeout: Duration,
}

impl SchemaEnsurer {
    pub fn new(table: FacilityTable, ddl_timeout: Duration) -> Self {
        Self { table, ddl_timeout }
    }

    /// The statements `ensure` runs, in order.
    pub fn statements(&self) -> Result<Vec<String>, AthenaError> {
        Ok(vec![
            sql::create_database_sql(&self.table.database)?,
            sql::create_facility_table_sql(
                &self.table.database,
                &self.table.table,
                &self.table.source_bucket,
            )?,
        ])
    }

    pub async fn ensure(
        &self,
        service: &dyn QueryService,
        waiter: &QueryCompletionWaiter,
    ) -> Result<(), AthenaError> {
        let result = self.run(service, waiter).await;
        match &result {
            Ok(()) => info!(table = %self.table.qualified_name(), "Athena table ensured"),
            Err(e) => error!(
                table = %self.table.qualified_name(),
                error = %e,
                "Error ensuring Athena table"
            ),
        }
        result
    }

    async fn run(
        &self,
        service: &dyn QueryService,
        waiter: &QueryCompletionWaiter,
    ) -> Result<(), AthenaError> {
        for statement in self.statements()? {
            let handle = service.submit_query(&self.table.request(statement)).await?;
            waiter.wait(service, &handle, self.ddl_timeout, None).await?;
        }
        Ok(())
    }
}
