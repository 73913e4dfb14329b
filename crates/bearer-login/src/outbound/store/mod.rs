//! User store outbound adapters.

mod memory;

pub use memory::InMemoryUserStore;
