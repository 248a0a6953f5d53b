//! The remote-vault forwarding client (design §4.8): wraps a vault-admin
//! call in a `ForwardedRequest` envelope, sends it to the node that owns the
//! vault, and unwraps the response. Forwarding never recurses -- the peer's
//! `ForwardingService` handler executes the request locally unconditionally,
//! which is enforced by the handler implementation in `gastrolog-frontend`,
//! not by this client.

use dashmap::DashMap;
use gastrolog_proto::gen::forwarding_service_client::ForwardingServiceClient;
use gastrolog_proto::gen::{ForwardedRequest, ForwardedResponse};
use gastrolog_repr::{Claims, FrontendError};
use tonic::service::interceptor::InterceptedService;
use tonic::transport::{Channel, Endpoint};

use crate::version::VersionAttachInterceptor;

type Client = ForwardingServiceClient<InterceptedService<Channel, VersionAttachInterceptor>>;

/// Resolves a node id to a gRPC endpoint address. `gastrolog-frontend` wires
/// this to whatever peer-discovery source the deployment uses (config-store
/// cluster membership, a static peer list, etc.) -- cluster membership
/// management itself is an explicit Non-goal (design §1).
pub trait PeerResolver: Send + Sync {
    fn endpoint_for(&self, node_id: &str) -> Option<String>;
}

/// Opens and caches one channel per peer node, version-tagging every
/// outgoing request.
pub struct ForwardingClient<R> {
    resolver: R,
    local_version: String,
    channels: DashMap<String, Client>,
}

impl<R: PeerResolver> ForwardingClient<R> {
    pub fn new(resolver: R, local_version: impl Into<String>) -> ForwardingClient<R> {
        ForwardingClient {
            resolver,
            local_version: local_version.into(),
            channels: DashMap::new(),
        }
    }

    fn client_for(&self, node_id: &str) -> Result<Client, FrontendError> {
        if let Some(client) = self.channels.get(node_id) {
            return Ok(client.clone());
        }
        let addr = self
            .resolver
            .endpoint_for(node_id)
            .ok_or_else(|| FrontendError::Unavailable(format!("no known endpoint for node {node_id}")))?;
        let endpoint = Endpoint::from_shared(addr)
            .map_err(|e| FrontendError::Unavailable(format!("invalid peer endpoint: {e}")))?;
        let channel = endpoint.connect_lazy();
        let client = ForwardingServiceClient::with_interceptor(
            channel,
            VersionAttachInterceptor::new(self.local_version.clone()),
        );
        self.channels.insert(node_id.to_string(), client.clone());
        Ok(client)
    }

    /// Forwards `body` (an encoded request for `procedure_path`) to
    /// `target_node_id`, returning the peer's encoded response.
    pub async fn forward(
        &self,
        target_node_id: &str,
        procedure_path: &str,
        claims: Option<&Claims>,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, FrontendError> {
        let mut client = self.client_for(target_node_id)?;
        let claims_json = match claims {
            Some(c) => gastrolog_proto::convert::claims_to_json(c)?,
            None => Vec::new(),
        };
        let request = ForwardedRequest {
            target_node_id: target_node_id.to_string(),
            procedure_path: procedure_path.to_string(),
            claims_json,
            body,
        };
        let response = client
            .forward(request)
            .await
            .map_err(|status| FrontendError::Unavailable(format!("forwarding to {target_node_id} failed: {status}")))?;
        Ok(response.into_inner().body)
    }
}

/// Unwraps a [`ForwardedRequest`] on the receiving side. The caller (the
/// `ForwardingService` handler in `gastrolog-frontend`) is responsible for
/// dispatching `procedure_path` to the matching local handler; this helper
/// only decodes the envelope.
pub fn unwrap_forwarded(req: ForwardedRequest) -> Result<(String, Option<Claims>, Vec<u8>), FrontendError> {
    let claims = if req.claims_json.is_empty() {
        None
    } else {
        Some(gastrolog_proto::convert::claims_from_json(&req.claims_json)?)
    };
    Ok((req.procedure_path, claims, req.body))
}

pub fn wrap_response(body: Vec<u8>) -> ForwardedResponse {
    ForwardedResponse { body }
}
