// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (Order, Delivery, Payment, Item)
// - Validation rules applied before anything is persisted
// - Errors (ValidationError)
//
// ============================================================================

pub mod value_objects;
pub mod validation;
pub mod errors;

// Re-export for convenience
pub use value_objects::*;
pub use validation::*;
pub use errors::*;
