//! Row models for database tables.

pub mod job;
