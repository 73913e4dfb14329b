//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **identity**: reqwest-backed `IdentityTransport`
//! - **store**: in-process `UserStore` with a unique external id index
//!
//! Adapters translate between domain types and infrastructure-specific
//! representations. They contain no login logic.

pub mod identity;
pub mod store;
