// ============================================================================
// Domain Layer
// ============================================================================
//
// The order aggregate as it travels over the bus, through validation, into
// storage and out of the cache. No I/O lives here.
//
// ============================================================================

pub mod order;
