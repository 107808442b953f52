//! Integration tests for facility-athena.
//!
//! These run the public API against an in-process fake catalog, without AWS
//! credentials.

mod fake;
mod schema;
mod waiter;
