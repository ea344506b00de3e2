//! HTTP layer: endpoint URLs, the transport seam, SSE framing, and wire logging.
//!
//! Only the transport types and the frame decoder are part of the public API;
//! the rest is implementation detail for the engines.

pub(crate) mod common;
pub(crate) mod error_helpers;
pub(crate) mod loud_wire;
pub(crate) mod sse_parser;
pub(crate) mod transport;
