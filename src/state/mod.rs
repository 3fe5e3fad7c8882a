// State management module
// Handles SQLite persistence, aggregation queries and file system locations

pub mod db;
pub mod get_or_create;
pub mod models;
pub mod queries;
pub mod retention;
pub mod storage;

pub use db::{in_savepoint, DbConnection, DbError, DbResult, DEFAULT_BUSY_TIMEOUT};
pub use get_or_create::{
    get_or_create, CompoundDefaults, ExternalDatabaseDefaults, GetOrCreate, RetentionTimeKey,
    StandardRunDefaults, StandardRunKey, MAX_ATTEMPTS,
};
pub use models::{
    standardize_name, ChromatographyMethod, Compound, CompoundList, CompoundListSummary,
    CompoundMean, CompoundRetention, DbXref, ExternalDatabase, NewCompound, NewStandardRun,
    Observation, RetentionTime, StandardRun, StandardRunSummary, XrefLink,
};
pub use retention::{compounds_with_retention_times, retention_time_means};
