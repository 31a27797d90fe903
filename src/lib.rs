//! Order ingestion service: consumes JSON orders from a Kafka-compatible
//! topic, persists them to Postgres and serves them from an in-memory cache.

pub mod actors;
pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod messaging;
pub mod metrics;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
