//! Version handshake for the remote-forwarding transport (design §1.1
//! expansion): a frontend never silently forwards to an incompatible peer.
//!
//! This generalizes a pattern already present in the upstream codebase's
//! gRPC transport glue, where every inter-node RPC attaches the sender's
//! build version and the receiver rejects a mismatch before touching the
//! request body.

use tonic::metadata::MetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};

pub const VERSION_METADATA_KEY: &str = "x-gastrolog-version";

/// Attaches the local crate version to every outgoing forwarded request.
/// Installed on the forwarding client's channel.
#[derive(Clone)]
pub struct VersionAttachInterceptor {
    version: String,
}

impl VersionAttachInterceptor {
    pub fn new(version: impl Into<String>) -> VersionAttachInterceptor {
        VersionAttachInterceptor {
            version: version.into(),
        }
    }
}

impl Interceptor for VersionAttachInterceptor {
    fn call(&mut self, mut req: Request<()>) -> Result<Request<()>, Status> {
        let value = MetadataValue::try_from(self.version.as_str())
            .map_err(|e| Status::internal(format!("invalid version header: {e}")))?;
        req.metadata_mut().insert(VERSION_METADATA_KEY, value);
        Ok(req)
    }
}

/// Rejects an incoming forwarded request whose declared version's major
/// component doesn't match the local major version. Installed on the
/// `ForwardingService` server.
#[derive(Clone)]
pub struct VersionCheckInterceptor {
    local_major: u64,
}

impl VersionCheckInterceptor {
    pub fn new(local_version: &str) -> VersionCheckInterceptor {
        let local_major = semver::Version::parse(local_version)
            .map(|v| v.major)
            .unwrap_or(0);
        VersionCheckInterceptor { local_major }
    }
}

impl Interceptor for VersionCheckInterceptor {
    fn call(&mut self, req: Request<()>) -> Result<Request<()>, Status> {
        let Some(value) = req.metadata().get(VERSION_METADATA_KEY) else {
            return Err(Status::failed_precondition(
                "forwarded request missing version header",
            ));
        };
        let peer_version = value
            .to_str()
            .map_err(|_| Status::failed_precondition("version header is not valid UTF-8"))?;
        let peer_major = semver::Version::parse(peer_version)
            .map(|v| v.major)
            .map_err(|_| Status::failed_precondition("unparseable peer version"))?;
        if peer_major != self.local_major {
            return Err(Status::failed_precondition(format!(
                "peer major version {peer_major} incompatible with local major version {}",
                self.local_major
            )));
        }
        Ok(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_major_versions_pass() {
        let mut attach = VersionAttachInterceptor::new("1.2.3");
        let req = attach.call(Request::new(())).unwrap();
        let mut check = VersionCheckInterceptor::new("1.9.0");
        assert!(check.call(Request::new(())).is_err()); // no header attached yet
        let mut req2 = Request::new(());
        *req2.metadata_mut() = req.metadata().clone();
        assert!(check.call(req2).is_ok());
    }

    #[test]
    fn mismatched_major_versions_are_rejected() {
        let mut attach = VersionAttachInterceptor::new("2.0.0");
        let req = attach.call(Request::new(())).unwrap();
        let mut check = VersionCheckInterceptor::new("1.0.0");
        let mut req2 = Request::new(());
        *req2.metadata_mut() = req.metadata().clone();
        assert!(check.call(req2).is_err());
    }
}
