//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod debug_sink;
mod identity_transport;
mod user_store;

#[cfg(test)]
pub(crate) use debug_sink::recording::RecordingDebugSink;
pub use debug_sink::{DebugSink, NoopDebugSink, TracingDebugSink};
#[cfg(test)]
pub use identity_transport::MockIdentityTransport;
pub use identity_transport::{
    IdentityHttpResponse, IdentityTransport, IdentityTransportError, RequestOptions,
};
#[cfg(test)]
pub use user_store::MockUserStore;
pub use user_store::{UserStore, UserStoreError};
