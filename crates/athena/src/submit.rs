use tracing::info;

use crate::error::AthenaError;
use crate::handle::QueryHandle;
use crate::schema::FacilityTable;
use crate::service::QueryService;
use crate::sql;

/// Starts the accreditation aggregation over the facility table.
#[derive(Debug, Clone)]
pub struct QuerySubmitter {
    table: FacilityTable,
}

impl QuerySubmitter {
    pub fn new(table: FacilityTable) -> Self {
        Self { table }
    }

    /// Submit the per-state aggregation and return its handle without waiting.
    pub async fn submit_aggregation(
        &self,
        service: &dyn QueryService,
    ) -> Result<QueryHandle, AthenaError> {
        let statement =
            sql::accredited_facilities_by_state_sql(&self.table.database, &self.table.table)?;
        let handle = service.submit_query(&self.table.request(statement)).await?;
        info!(query_id = %handle, table = %self.table.qualified_name(), "Aggregation submitted");
        Ok(handle)
    }
}
