//! Routing policy for dedupe store operational failures.

/// How a caller should treat a dedupe store error.
///
/// The store itself never decides this — it only ever returns
/// `Result<bool, DedupeError>`. Inbound and outbound callers route the error
/// through whichever `DedupeFailMode` fits their delivery-safety tradeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupeFailMode {
    /// Treat the error as "duplicate" — block the side effect. Used for
    /// outbound sends in staging/production, where a duplicate delivery is
    /// worse than a dropped one.
    Open,
    /// Treat the error as "not duplicate" — proceed. Used for inbound
    /// webhooks, where the upstream platform will redeliver anyway.
    #[default]
    Closed,
}
