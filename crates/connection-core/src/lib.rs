//! # rnmos-connection-core
//!
//! The IS-05 connection management engine of the rnmos NMOS node.
//!
//! Each sender and receiver owns a staged and an active endpoint. A PATCH
//! to `/staged` merges new transport parameters and may request an
//! activation: immediate, or scheduled against the wall clock. Activation
//! copies staged into active, resolves every `auto` parameter, rebuilds a
//! sender's transport file, and hands the effective SDP to the embedding
//! host through the activation callback.
//!
//! The wall clock is a seam ([`Clock`]) so scheduled activations can be
//! tested without waiting.

pub mod clock;
pub mod engine;
pub mod error;
pub mod staged;
pub mod transportfile;

pub use clock::{Clock, SystemClock};
pub use engine::{ConnectionEngine, PatchOutcome, RtpActivationHandler};
pub use error::{Error, Result};
