//! Typed client for the identity provider (UAA) and resource manager (Cloud
//! Controller v2) routes the pipeline needs.
//!
//! Every lookup answers the success / not-found / failure trichotomy as
//! `Ok(Some(_))`, `Ok(None)` and `Err(_)`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use roster_auth::{
    ApiRequest, CallError, ClientCredentials, Clock, CredentialFetcher, Gateway, Method,
    SystemClock, TokenPolicy, Transport, UreqTransport,
};
use roster_core::{DesiredUser, Environment, LoginId, OrgName, OrgRole, SpaceName, SpaceRole};

use crate::error::RunError;

/// Base URLs and the account origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub uaa_url: String,
    pub api_url: String,
    pub origin: String,
}

impl Endpoints {
    pub fn from_environment(env: &Environment) -> Self {
        Self {
            uaa_url: env.uaa_base().to_string(),
            api_url: env.api_base().to_string(),
            origin: env.origin.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ScimList {
    #[serde(default)]
    resources: Vec<ScimUser>,
}

#[derive(Debug, Deserialize)]
struct ScimUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CcList {
    #[serde(default)]
    next_url: Option<String>,
    #[serde(default)]
    resources: Vec<CcResource>,
}

#[derive(Debug, Deserialize)]
struct CcResource {
    metadata: CcMetadata,
}

#[derive(Debug, Deserialize)]
struct CcMetadata {
    guid: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Platform API client. Owns the gateway, and through it the run's credential.
pub struct CloudApi {
    gateway: Gateway,
    endpoints: Endpoints,
}

impl CloudApi {
    pub fn new(gateway: Gateway, endpoints: Endpoints) -> Self {
        Self { gateway, endpoints }
    }

    /// Production wiring: `ureq` transport, system clock, policy from `env`.
    pub fn connect(env: &Environment) -> Result<Self, RunError> {
        let transport: Arc<dyn Transport> = Arc::new(
            UreqTransport::new(env.request_timeout(), env.skip_tls_verification)
                .map_err(|e| RunError::Setup(e.to_string()))?,
        );
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(Self::with_transport(env, transport, clock))
    }

    /// Wire a client over an arbitrary transport and clock.
    pub fn with_transport(
        env: &Environment,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let fetcher = CredentialFetcher::new(
            ClientCredentials {
                token_endpoint: env.token_url(),
                client_id: env.client_id.clone(),
                client_secret: env.client_secret.clone(),
            },
            TokenPolicy {
                max_attempts: env.max_token_retries,
                retry_interval: env.retry_interval(),
                expiry_buffer: env.expiry_buffer(),
            },
            Arc::clone(&transport),
            clock,
        );
        Self::new(
            Gateway::new(fetcher, transport),
            Endpoints::from_environment(env),
        )
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    // -- identity provider ---------------------------------------------------

    /// Account id for `login` within the configured origin.
    pub fn find_account(&self, login: &LoginId) -> Result<Option<String>, CallError> {
        let filter = format!(
            "userName eq \"{}\" and origin eq \"{}\"",
            escape_filter(&login.0),
            escape_filter(&self.endpoints.origin)
        );
        let request = ApiRequest::new(Method::Get, format!("{}/Users", self.endpoints.uaa_url))
            .query("filter", filter)
            .query("attributes", "id,userName");
        let list: ScimList = self.gateway.call_json(request)?;
        debug!(login = %login, found = list.resources.len(), "account lookup");
        Ok(list.resources.into_iter().next().map(|user| user.id))
    }

    pub fn create_account(&self, user: &DesiredUser) -> Result<String, CallError> {
        let (given, family) = user.name_parts();
        let mut body = json!({
            "schemas": ["urn:scim:schemas:core:1.0"],
            "userName": user.login.0,
            "name": { "givenName": given, "familyName": family },
            "emails": [{ "value": user.email_or_login(), "primary": true }],
            "origin": self.endpoints.origin,
        });
        if let Some(external_id) = &user.external_id {
            body["externalId"] = json!(external_id);
        }
        let request =
            ApiRequest::new(Method::Post, format!("{}/Users", self.endpoints.uaa_url)).json(body);
        let created: ScimUser = self.gateway.call_json(request)?;
        Ok(created.id)
    }

    // -- resource manager: users ---------------------------------------------

    /// Resource-manager user guid referencing `account_id`.
    pub fn find_resource_user(&self, account_id: &str) -> Result<Option<String>, CallError> {
        let request = ApiRequest::new(
            Method::Get,
            format!("{}/v2/users/{account_id}", self.endpoints.api_url),
        );
        match self.gateway.call_json::<CcResource>(request) {
            Ok(user) => Ok(Some(user.metadata.guid)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn create_resource_user(&self, account_id: &str) -> Result<String, CallError> {
        let request = ApiRequest::new(Method::Post, format!("{}/v2/users", self.endpoints.api_url))
            .json(json!({ "guid": account_id }));
        let created: CcResource = self.gateway.call_json(request)?;
        Ok(created.metadata.guid)
    }

    // -- resource manager: organizations -------------------------------------

    pub fn find_organization(&self, org: &OrgName) -> Result<Option<String>, CallError> {
        let request = ApiRequest::new(
            Method::Get,
            format!("{}/v2/organizations", self.endpoints.api_url),
        )
        .query("q", format!("name:{}", org.0));
        self.first_guid(request)
    }

    /// Guids of every user holding `role` in the organization.
    pub fn organization_role_holders(
        &self,
        org_guid: &str,
        role: OrgRole,
    ) -> Result<Vec<String>, CallError> {
        let url = format!(
            "{}/v2/organizations/{org_guid}/{}",
            self.endpoints.api_url,
            role.path_segment()
        );
        self.all_guids(ApiRequest::new(Method::Get, url))
    }

    pub fn assign_organization_role(
        &self,
        org_guid: &str,
        role: OrgRole,
        user_guid: &str,
    ) -> Result<(), CallError> {
        let url = format!(
            "{}/v2/organizations/{org_guid}/{}/{user_guid}",
            self.endpoints.api_url,
            role.path_segment()
        );
        self.gateway.call(ApiRequest::new(Method::Put, url))?;
        Ok(())
    }

    // -- resource manager: spaces --------------------------------------------

    pub fn find_space(
        &self,
        org_guid: &str,
        space: &SpaceName,
    ) -> Result<Option<String>, CallError> {
        let request = ApiRequest::new(
            Method::Get,
            format!("{}/v2/organizations/{org_guid}/spaces", self.endpoints.api_url),
        )
        .query("q", format!("name:{}", space.0));
        self.first_guid(request)
    }

    pub fn space_role_holders(
        &self,
        space_guid: &str,
        role: SpaceRole,
    ) -> Result<Vec<String>, CallError> {
        let url = format!(
            "{}/v2/spaces/{space_guid}/{}",
            self.endpoints.api_url,
            role.path_segment()
        );
        self.all_guids(ApiRequest::new(Method::Get, url))
    }

    pub fn assign_space_role(
        &self,
        space_guid: &str,
        role: SpaceRole,
        user_guid: &str,
    ) -> Result<(), CallError> {
        let url = format!(
            "{}/v2/spaces/{space_guid}/{}/{user_guid}",
            self.endpoints.api_url,
            role.path_segment()
        );
        self.gateway.call(ApiRequest::new(Method::Put, url))?;
        Ok(())
    }

    // -- helpers ---------------------------------------------------------------

    fn first_guid(&self, request: ApiRequest) -> Result<Option<String>, CallError> {
        let list: CcList = self.gateway.call_json(request)?;
        Ok(list.resources.into_iter().next().map(|r| r.metadata.guid))
    }

    /// Collect guids across every page, following `next_url`.
    fn all_guids(&self, first: ApiRequest) -> Result<Vec<String>, CallError> {
        let mut guids = Vec::new();
        let mut request = Some(first);
        while let Some(current) = request.take() {
            let page: CcList = self.gateway.call_json(current)?;
            guids.extend(page.resources.into_iter().map(|r| r.metadata.guid));
            request = page
                .next_url
                .filter(|next| !next.is_empty())
                .map(|next| {
                    ApiRequest::new(Method::Get, format!("{}{next}", self.endpoints.api_url))
                });
        }
        Ok(guids)
    }
}

/// Escape a value for use inside a double-quoted SCIM filter literal.
fn escape_filter(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
