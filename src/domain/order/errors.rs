// ============================================================================
// Order Validation Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("order_uid is empty")]
    MissingOrderUid,

    #[error("track_number is empty")]
    MissingTrackNumber,

    #[error("delivery phone is empty")]
    MissingPhone,

    #[error("payment transaction is empty")]
    MissingTransaction,

    #[error("order has no items")]
    EmptyItems,

    #[error("date_created is not set")]
    UnsetCreationDate,
}
