// ============================================================================
// Services
// ============================================================================
//
// - ingestion:     bus -> decode -> validate -> persist -> cache
// - order_service: warm-up and cache-first lookups
//
// ============================================================================

pub mod ingestion;
pub mod order_service;

pub use ingestion::{IngestOutcome, OrderIngestor};
pub use order_service::OrderService;
