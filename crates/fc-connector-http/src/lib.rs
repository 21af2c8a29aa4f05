//! axum HTTP adapter for the connector runtime: request routing and the
//! raw-body capture the signature verifier depends on, shipped once here
//! so a connector built on this workspace has something to actually run.

mod routes;
mod state;

pub use routes::router;
pub use state::ConnectorState;
