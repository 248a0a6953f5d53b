//! `ConfigService` (design §4.6): filters, policies, users, ingesters, TLS
//! settings, per-user preferences, and saved queries.

use gastrolog_config_api::{Filter, Ingester, Policy, TlsSettings};
use gastrolog_proto::convert::{query_from_proto, query_to_proto, uuid_from_str};
use gastrolog_proto::gen::config_service_server::ConfigService;
use gastrolog_proto::gen::{
    DeleteFilterRequest, DeleteFilterResponse, DeleteIngesterRequest, DeleteIngesterResponse,
    DeletePolicyRequest, DeletePolicyResponse, DeleteSavedQueryRequest, DeleteSavedQueryResponse,
    DeleteUserRequest, DeleteUserResponse, GetPreferencesRequest, GetPreferencesResponse,
    GetTlsConfigRequest, GetTlsConfigResponse, Ingester as ProtoIngester, ListFiltersRequest,
    ListFiltersResponse, ListIngestersRequest, ListIngestersResponse, ListPoliciesRequest,
    ListPoliciesResponse, ListSavedQueriesRequest, ListSavedQueriesResponse, ListUsersRequest,
    ListUsersResponse, Policy as ProtoPolicy, PutFilterRequest, PutFilterResponse,
    PutIngesterRequest, PutIngesterResponse, PutPolicyRequest, PutPolicyResponse,
    PutPreferencesRequest, PutPreferencesResponse, PutSavedQueryRequest, PutSavedQueryResponse,
    PutTlsConfigRequest, PutTlsConfigResponse, RetentionRule as ProtoRetentionRule, SavedQuery,
    TestIngesterRequest, TestIngesterResponse, TlsConfig, UserInfo,
};
use gastrolog_repr::{FrontendError, RetentionRule};
use tonic::{Request, Response, Status};

use crate::state::AppState;

pub struct ConfigServiceImpl {
    pub state: AppState,
}

fn require_claims<T>(request: &Request<T>) -> Result<gastrolog_repr::Claims, Status> {
    request
        .extensions()
        .get::<gastrolog_repr::Claims>()
        .cloned()
        .ok_or_else(|| FrontendError::Unauthenticated.into())
}

fn filter_to_proto(f: &Filter) -> gastrolog_proto::gen::Filter {
    gastrolog_proto::gen::Filter {
        id: f.id.to_string(),
        name: f.name.clone(),
        expression: f.expression.clone(),
    }
}

fn filter_from_proto(f: gastrolog_proto::gen::Filter) -> Result<Filter, FrontendError> {
    let id = if f.id.is_empty() { uuid::Uuid::now_v7() } else { uuid_from_str(&f.id)? };
    Ok(Filter {
        id,
        name: f.name,
        expression: f.expression,
    })
}

fn retention_to_proto(r: &RetentionRule) -> ProtoRetentionRule {
    ProtoRetentionRule {
        max_age_secs: r.max_age_secs,
        max_bytes: r.max_bytes,
    }
}

fn retention_from_proto(r: ProtoRetentionRule) -> RetentionRule {
    RetentionRule {
        max_age_secs: r.max_age_secs,
        max_bytes: r.max_bytes,
    }
}

fn policy_to_proto(p: &Policy) -> ProtoPolicy {
    ProtoPolicy {
        id: p.id.to_string(),
        name: p.name.clone(),
        retention: p.retention.iter().map(retention_to_proto).collect(),
    }
}

fn policy_from_proto(p: ProtoPolicy) -> Result<Policy, FrontendError> {
    let id = if p.id.is_empty() { uuid::Uuid::now_v7() } else { uuid_from_str(&p.id)? };
    Ok(Policy {
        id,
        name: p.name,
        retention: p.retention.into_iter().map(retention_from_proto).collect(),
    })
}

fn ingester_to_proto(i: &Ingester) -> ProtoIngester {
    ProtoIngester {
        id: i.id.to_string(),
        kind: i.kind.clone(),
        params: i.params.clone().into_iter().collect(),
    }
}

fn ingester_from_proto(i: ProtoIngester) -> Result<Ingester, FrontendError> {
    let id = if i.id.is_empty() { uuid::Uuid::now_v7() } else { uuid_from_str(&i.id)? };
    Ok(Ingester {
        id,
        kind: i.kind,
        params: i.params.into_iter().collect(),
    })
}

fn tls_to_proto(t: &TlsSettings) -> TlsConfig {
    TlsConfig {
        enabled: t.enabled,
        cert_pem: t.cert_pem.clone(),
        key_pem: t.key_pem.clone(),
        sni_hosts: t.sni_hosts.clone(),
    }
}

fn tls_from_proto(t: TlsConfig) -> TlsSettings {
    TlsSettings {
        enabled: t.enabled,
        cert_pem: t.cert_pem,
        key_pem: t.key_pem,
        sni_hosts: t.sni_hosts,
    }
}

#[tonic::async_trait]
impl ConfigService for ConfigServiceImpl {
    async fn list_filters(&self, _request: Request<ListFiltersRequest>) -> Result<Response<ListFiltersResponse>, Status> {
        let filters = self.state.config_store.list_filters().await;
        Ok(Response::new(ListFiltersResponse {
            filters: filters.iter().map(filter_to_proto).collect(),
        }))
    }

    async fn put_filter(&self, request: Request<PutFilterRequest>) -> Result<Response<PutFilterResponse>, Status> {
        let proto = request
            .into_inner()
            .filter
            .ok_or_else(|| FrontendError::InvalidArgument("missing filter".to_string()))?;
        let filter = filter_from_proto(proto)?;
        self.state.config_store.put_filter(filter.clone()).await?;
        Ok(Response::new(PutFilterResponse {
            filter: Some(filter_to_proto(&filter)),
        }))
    }

    async fn delete_filter(&self, request: Request<DeleteFilterRequest>) -> Result<Response<DeleteFilterResponse>, Status> {
        let id = uuid_from_str(&request.into_inner().id)?;
        self.state.config_store.delete_filter(id).await?;
        Ok(Response::new(DeleteFilterResponse {}))
    }

    async fn list_policies(&self, _request: Request<ListPoliciesRequest>) -> Result<Response<ListPoliciesResponse>, Status> {
        let policies = self.state.config_store.list_policies().await;
        Ok(Response::new(ListPoliciesResponse {
            policies: policies.iter().map(policy_to_proto).collect(),
        }))
    }

    async fn put_policy(&self, request: Request<PutPolicyRequest>) -> Result<Response<PutPolicyResponse>, Status> {
        let proto = request
            .into_inner()
            .policy
            .ok_or_else(|| FrontendError::InvalidArgument("missing policy".to_string()))?;
        let policy = policy_from_proto(proto)?;
        self.state.config_store.put_policy(policy.clone()).await?;
        Ok(Response::new(PutPolicyResponse {
            policy: Some(policy_to_proto(&policy)),
        }))
    }

    async fn delete_policy(&self, request: Request<DeletePolicyRequest>) -> Result<Response<DeletePolicyResponse>, Status> {
        let id = uuid_from_str(&request.into_inner().id)?;
        self.state.config_store.delete_policy(id).await?;
        Ok(Response::new(DeletePolicyResponse {}))
    }

    async fn list_users(&self, _request: Request<ListUsersRequest>) -> Result<Response<ListUsersResponse>, Status> {
        let users = self.state.config_store.list_users().await;
        Ok(Response::new(ListUsersResponse {
            users: users
                .iter()
                .map(|u| UserInfo {
                    id: u.id.to_string(),
                    username: u.username.clone(),
                    role: u.role.to_string(),
                })
                .collect(),
        }))
    }

    async fn delete_user(&self, request: Request<DeleteUserRequest>) -> Result<Response<DeleteUserResponse>, Status> {
        let id = uuid_from_str(&request.into_inner().id)?;
        self.state.config_store.delete_user(id).await?;
        Ok(Response::new(DeleteUserResponse {}))
    }

    async fn put_ingester(&self, request: Request<PutIngesterRequest>) -> Result<Response<PutIngesterResponse>, Status> {
        let proto = request
            .into_inner()
            .ingester
            .ok_or_else(|| FrontendError::InvalidArgument("missing ingester".to_string()))?;
        let ingester = ingester_from_proto(proto)?;
        self.state.config_store.put_ingester(ingester.clone()).await?;
        Ok(Response::new(PutIngesterResponse {
            ingester: Some(ingester_to_proto(&ingester)),
        }))
    }

    async fn list_ingesters(&self, _request: Request<ListIngestersRequest>) -> Result<Response<ListIngestersResponse>, Status> {
        let ingesters = self.state.config_store.list_ingesters().await;
        Ok(Response::new(ListIngestersResponse {
            ingesters: ingesters.iter().map(ingester_to_proto).collect(),
        }))
    }

    async fn delete_ingester(&self, request: Request<DeleteIngesterRequest>) -> Result<Response<DeleteIngesterResponse>, Status> {
        let id = uuid_from_str(&request.into_inner().id)?;
        self.state.config_store.delete_ingester(id).await?;
        Ok(Response::new(DeleteIngesterResponse {}))
    }

    /// Connectivity probes against a candidate ingester config report failure
    /// as response data, not an RPC error (design §7): the caller is asking
    /// "would this work", and a negative answer is a successful call.
    async fn test_ingester(&self, request: Request<TestIngesterRequest>) -> Result<Response<TestIngesterResponse>, Status> {
        let proto = request
            .into_inner()
            .ingester
            .ok_or_else(|| FrontendError::InvalidArgument("missing ingester".to_string()))?;
        match ingester_from_proto(proto) {
            Ok(ingester) if !ingester.kind.trim().is_empty() => Ok(Response::new(TestIngesterResponse {
                success: true,
                message: "ok".to_string(),
            })),
            Ok(_) => Ok(Response::new(TestIngesterResponse {
                success: false,
                message: "ingester kind must not be empty".to_string(),
            })),
            Err(e) => Ok(Response::new(TestIngesterResponse {
                success: false,
                message: e.to_string(),
            })),
        }
    }

    async fn put_tls_config(&self, request: Request<PutTlsConfigRequest>) -> Result<Response<PutTlsConfigResponse>, Status> {
        let proto = request
            .into_inner()
            .tls
            .ok_or_else(|| FrontendError::InvalidArgument("missing tls config".to_string()))?;
        self.state.config_store.put_tls_settings(tls_from_proto(proto)).await?;
        Ok(Response::new(PutTlsConfigResponse {}))
    }

    async fn get_tls_config(&self, _request: Request<GetTlsConfigRequest>) -> Result<Response<GetTlsConfigResponse>, Status> {
        let tls = self.state.config_store.get_tls_settings().await;
        Ok(Response::new(GetTlsConfigResponse {
            tls: Some(tls_to_proto(&tls)),
        }))
    }

    async fn get_preferences(&self, request: Request<GetPreferencesRequest>) -> Result<Response<GetPreferencesResponse>, Status> {
        let claims = require_claims(&request)?;
        let preferences_json = self
            .state
            .config_store
            .get_preferences(claims.user_id)
            .await
            .unwrap_or_else(|| "{}".to_string());
        Ok(Response::new(GetPreferencesResponse { preferences_json }))
    }

    async fn put_preferences(&self, request: Request<PutPreferencesRequest>) -> Result<Response<PutPreferencesResponse>, Status> {
        let claims = require_claims(&request)?;
        let json = request.into_inner().preferences_json;
        serde_json::from_str::<serde_json::Value>(&json)
            .map_err(|e| FrontendError::InvalidArgument(format!("malformed preferences JSON: {e}")))?;
        self.state.config_store.put_preferences(claims.user_id, json).await?;
        Ok(Response::new(PutPreferencesResponse {}))
    }

    async fn list_saved_queries(&self, request: Request<ListSavedQueriesRequest>) -> Result<Response<ListSavedQueriesResponse>, Status> {
        let claims = require_claims(&request)?;
        let queries = self.state.config_store.list_saved_queries(claims.user_id).await;
        Ok(Response::new(ListSavedQueriesResponse {
            saved_queries: queries
                .into_iter()
                .map(|(id, name, q)| SavedQuery {
                    id: id.to_string(),
                    name,
                    query: Some(query_to_proto(&q)),
                })
                .collect(),
        }))
    }

    async fn put_saved_query(&self, request: Request<PutSavedQueryRequest>) -> Result<Response<PutSavedQueryResponse>, Status> {
        let claims = require_claims(&request)?;
        let proto = request
            .into_inner()
            .saved_query
            .ok_or_else(|| FrontendError::InvalidArgument("missing saved query".to_string()))?;
        let query = query_from_proto(proto.query)?;
        let id = self
            .state
            .config_store
            .put_saved_query(claims.user_id, proto.name.clone(), query.clone())
            .await?;
        Ok(Response::new(PutSavedQueryResponse {
            saved_query: Some(SavedQuery {
                id: id.to_string(),
                name: proto.name,
                query: Some(query_to_proto(&query)),
            }),
        }))
    }

    async fn delete_saved_query(&self, request: Request<DeleteSavedQueryRequest>) -> Result<Response<DeleteSavedQueryResponse>, Status> {
        let claims = require_claims(&request)?;
        let id = uuid_from_str(&request.into_inner().id)?;
        self.state.config_store.delete_saved_query(claims.user_id, id).await?;
        Ok(Response::new(DeleteSavedQueryResponse {}))
    }
}
