//! gRPC transport plumbing shared by `gastrolog-frontend`: the version
//! handshake interceptor pair and the remote-vault forwarding client
//! (design §1.1 expansion, §4.8).

pub mod forward;
pub mod version;

pub use forward::{unwrap_forwarded, wrap_response, ForwardingClient, PeerResolver};
pub use version::{VersionAttachInterceptor, VersionCheckInterceptor, VERSION_METADATA_KEY};
