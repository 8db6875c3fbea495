//! Key-hiding relay.
//!
//! Accepts `{ modelName, apiPayload }` from a frontend, attaches the API key
//! and forwards the payload to the matching generative language endpoint.

mod handlers;
pub mod model;
mod server;
pub mod types;

pub use model::{upstream_url, ModelFamily};
pub use server::{build_http_client, create_router, run_server, AppState, RequestId, REQUEST_ID_HEADER};
pub use types::RelayRequest;
