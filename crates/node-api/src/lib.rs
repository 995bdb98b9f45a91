//! # rnmos-node-api
//!
//! The HTTP surface of the rnmos NMOS node: the read-only IS-04 Node API
//! (v1.3) and the IS-05 Connection API (v1.1), served with axum straight
//! from the shared model.
//!
//! GET handlers read the model under the read lock and serialize resource
//! bodies as-is; PATCH and bulk POST route to the connection engine under
//! the write lock. `TRACE` is rejected with 405 across the whole surface.

pub mod connection_api;
pub mod error;
pub mod node_api;
pub mod server;

pub use error::ApiError;
pub use server::{router, serve, serve_on, ApiState};
