//! SQL text for the facility table: DDL and the accreditation aggregation.
//!
//! Identifiers are interpolated into statements, so they are checked against
//! a conservative `[A-Za-z0-9_]+` pattern first.

use crate::error::AthenaError;

/// Reject anything that isn't a plain Athena identifier.
pub fn validate_identifier(kind: &str, name: &str) -> Result<(), AthenaError> {
    if name.is_empty() {
        return Err(AthenaError::Validation(format!("{kind} name is empty")));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AthenaError::Validation(format!(
            "{kind} name {name:?} may only contain letters, digits and underscores"
        )));
    }
    Ok(())
}

/// Reject bucket names that could break out of the `LOCATION` literal.
fn validate_bucket(bucket: &str) -> Result<(), AthenaError> {
    let ok = !bucket.is_empty()
        && bucket
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(AthenaError::Validation(format!("invalid bucket name {bucket:?}")))
    }
}

pub fn create_database_sql(database: &str) -> Result<String, AthenaError> {
    validate_identifier("database", database)?;
    Ok(format!("CREATE DATABASE IF NOT EXISTS {database}"))
}

/// External table over the raw facility JSON documents in `source_bucket`.
pub fn create_facility_table_sql(
    database: &str,
    table: &str,
    source_bucket: &str,
) -> Result<String, AthenaError> {
    validate_identifier("database", database)?;
    validate_identifier("table", table)?;
    validate_bucket(source_bucket)?;

    Ok(format!(
        "CREATE EXTERNAL TABLE IF NOT EXISTS {database}.{table} (
    facility_id string,
    facility_name string,
    location struct<
        address:string,
        city:string,
        state:string,
        zip:string
    >,
    employee_count int,
    services array<string>,
    labs array<struct<
        lab_name:string,
        certifications:array<string>
    >>,
    accreditations array<struct<
        accreditation_body:string,
        accreditation_id:string,
        valid_until:string
    >>
)
ROW FORMAT SERDE 'org.openx.data.jsonserde.JsonSerDe'
LOCATION 's3://{source_bucket}/'"
    ))
}

/// Facilities, employees and currently valid accreditations per state.
///
/// `valid_until` is an ISO date string, so lexical comparison against
/// today's date is a date comparison.
pub fn accredited_facilities_by_state_sql(
    database: &str,
    table: &str,
) -> Result<String, AthenaError> {
    validate_identifier("database", database)?;
    validate_identifier("table", table)?;

    Ok(format!(
        "SELECT
    location.state AS state,
    COUNT(DISTINCT facility_id) AS facility_count,
    SUM(employee_count) AS total_employees,
    COUNT(accreditation) AS total_accreditations
FROM {database}.{table}
CROSS JOIN UNNEST(accreditations) AS t(accreditation)
WHERE accreditation.valid_until >= CAST(current_date AS VARCHAR)
GROUP BY location.state
ORDER BY facility_count DESC"
    ))
}
