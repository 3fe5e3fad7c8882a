//! HTTP route handlers.

pub mod compound_lists;
pub mod compounds;
pub mod health;
pub mod methods;
pub mod standard_runs;
