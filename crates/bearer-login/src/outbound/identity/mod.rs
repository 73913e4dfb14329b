//! Identity endpoint outbound adapters.
//!
//! This module provides a thin HTTP implementation of the
//! `IdentityTransport` port.

mod http_transport;

pub use http_transport::ReqwestIdentityTransport;
