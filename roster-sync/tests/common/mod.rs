//! In-memory identity provider + resource manager for pipeline tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use roster_auth::{
    ApiRequest, ApiResponse, Body, Clock, ManualClock, Method, Transport, TransportError,
};
use roster_core::{Environment, UserEntry};
use roster_sync::CloudApi;

pub const UAA: &str = "https://uaa.test";
pub const API: &str = "https://api.test";
pub const TOKEN_URL: &str = "https://uaa.test/oauth/token";

#[derive(Default)]
struct State {
    /// login -> account id
    accounts: HashMap<String, String>,
    cc_users: HashSet<String>,
    /// org name -> guid
    orgs: HashMap<String, String>,
    /// (org guid, space name) -> guid
    spaces: HashMap<(String, String), String>,
    /// (org or space guid, role path) -> holders
    roles: HashMap<(String, String), BTreeSet<String>>,

    failing_account_creates: HashSet<String>,
    failing_org_assignments: HashSet<String>,
    token_endpoint_down: bool,
    token_endpoint_down_after: Option<usize>,
    revoked: HashSet<String>,
    revoke_at_call: Option<usize>,
    page_size: usize,

    exchanges: usize,
    issued: usize,
    calls: Vec<(Method, String)>,
}

/// Answers the UAA and Cloud Controller routes the pipeline uses. Account
/// ids are `uaa-<login>`; orgs and spaces get `org-<name>` / `space-<name>`.
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                page_size: 50,
                ..State::default()
            }),
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_org(self: &Arc<Self>, org: &str, spaces: &[&str]) -> Arc<Self> {
        let mut state = self.state();
        let org_guid = format!("org-{org}");
        state.orgs.insert(org.to_string(), org_guid.clone());
        for space in spaces {
            state
                .spaces
                .insert((org_guid.clone(), space.to_string()), format!("space-{space}"));
        }
        drop(state);
        Arc::clone(self)
    }

    pub fn fail_account_create(&self, login: &str) {
        self.state().failing_account_creates.insert(login.to_string());
    }

    pub fn fail_org_assignment(&self, login: &str) {
        self.state()
            .failing_org_assignments
            .insert(account_id(login));
    }

    pub fn take_down_token_endpoint(&self) {
        self.state().token_endpoint_down = true;
    }

    /// Serve the first `n` exchanges, then answer 503.
    pub fn take_down_token_endpoint_after(&self, n: usize) {
        self.state().token_endpoint_down_after = Some(n);
    }

    /// Reject every token issued so far with `401 invalid_token`.
    pub fn revoke_issued_tokens(&self) {
        let mut state = self.state();
        for n in 1..=state.issued {
            state.revoked.insert(format!("token-{n}"));
        }
    }

    /// Revoke all issued tokens when the `n`th request arrives.
    pub fn revoke_tokens_at_call(&self, n: usize) {
        self.state().revoke_at_call = Some(n);
    }

    /// An account and resource-manager user that already exist.
    pub fn seed_user(&self, login: &str) {
        let mut state = self.state();
        state.accounts.insert(login.to_string(), account_id(login));
        state.cc_users.insert(account_id(login));
    }

    pub fn set_page_size(&self, size: usize) {
        self.state().page_size = size.max(1);
    }

    /// Seed a holder directly, as if granted outside the run.
    pub fn grant(&self, target_guid: &str, role_path: &str, user_guid: &str) {
        self.state()
            .roles
            .entry((target_guid.to_string(), role_path.to_string()))
            .or_default()
            .insert(user_guid.to_string());
    }

    pub fn holders(&self, target_guid: &str, role_path: &str) -> Vec<String> {
        self.state()
            .roles
            .get(&(target_guid.to_string(), role_path.to_string()))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_account(&self, login: &str) -> bool {
        self.state().accounts.contains_key(login)
    }

    pub fn exchanges(&self) -> usize {
        self.state().exchanges
    }

    /// Every request that reached the fake, token exchanges included.
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.state().calls.clone()
    }

    /// POST/PUT calls to the platform APIs (token exchanges excluded).
    pub fn mutations(&self) -> Vec<(Method, String)> {
        self.calls()
            .into_iter()
            .filter(|(method, url)| method.is_mutating() && url != TOKEN_URL)
            .collect()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state();
        state.calls.clear();
        state.exchanges = 0;
    }
}

pub fn account_id(login: &str) -> String {
    format!("uaa-{login}")
}

fn reply(status: u16, body: Value) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(status, body.to_string()))
}

fn not_found() -> Result<ApiResponse, TransportError> {
    reply(404, json!({ "description": "Unknown request" }))
}

fn list(guids: &[String], next_url: Option<String>) -> Value {
    json!({
        "next_url": next_url,
        "resources": guids
            .iter()
            .map(|g| json!({ "metadata": { "guid": g } }))
            .collect::<Vec<_>>(),
    })
}

fn json_body(request: &ApiRequest) -> Value {
    match &request.body {
        Some(Body::Json(value)) => value.clone(),
        _ => Value::Null,
    }
}

/// `userName eq "alice" and origin eq "ldap"` -> `alice`
fn filtered_login(filter: &str) -> Option<&str> {
    let start = filter.find('"')? + 1;
    let len = filter[start..].find('"')?;
    Some(&filter[start..start + len])
}

fn name_query(request: &ApiRequest, query: &HashMap<String, String>) -> Option<String> {
    request
        .query_value("q")
        .or_else(|| query.get("q").map(String::as_str))
        .and_then(|q| q.strip_prefix("name:"))
        .map(str::to_string)
}

impl State {
    fn page(&self, path: &str, key: (String, String), page: usize) -> Value {
        let holders: Vec<String> = self
            .roles
            .get(&key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        let chunk: Vec<String> = holders
            .iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .cloned()
            .collect();
        let next = (page * self.page_size < holders.len())
            .then(|| format!("{path}?page={}", page + 1));
        list(&chunk, next)
    }
}

impl Transport for FakePlatform {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut state = self.state();
        state.calls.push((request.method, request.url.clone()));
        if state.revoke_at_call == Some(state.calls.len()) {
            for n in 1..=state.issued {
                state.revoked.insert(format!("token-{n}"));
            }
        }

        if request.url == TOKEN_URL {
            state.exchanges += 1;
            let exhausted = state
                .token_endpoint_down_after
                .is_some_and(|n| state.exchanges > n);
            if state.token_endpoint_down || exhausted {
                return reply(503, json!({ "error": "unavailable" }));
            }
            state.issued += 1;
            let token = format!("token-{}", state.issued);
            return reply(200, json!({ "access_token": token, "expires_in": 3600 }));
        }

        match request.bearer.as_deref() {
            None => return reply(401, json!({ "error": "unauthorized" })),
            Some(token) if state.revoked.contains(token) => {
                return reply(401, json!({ "error": "invalid_token" }))
            }
            Some(_) => {}
        }

        let (path_with_host, raw_query) = match request.url.split_once('?') {
            Some((path, query)) => (path.to_string(), query.to_string()),
            None => (request.url.clone(), String::new()),
        };
        let query: HashMap<String, String> = raw_query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);

        if let Some(path) = path_with_host.strip_prefix(UAA) {
            return match (request.method, path) {
                (Method::Get, "/Users") => {
                    let login = request.query_value("filter").and_then(filtered_login);
                    let found: Vec<Value> = login
                        .and_then(|l| state.accounts.get(l))
                        .map(|id| vec![json!({ "id": id })])
                        .unwrap_or_default();
                    let total = found.len();
                    reply(200, json!({ "resources": found, "totalResults": total }))
                }
                (Method::Post, "/Users") => {
                    let body = json_body(request);
                    let login = body["userName"].as_str().unwrap_or_default().to_string();
                    if state.failing_account_creates.contains(&login) {
                        return reply(500, json!({ "description": "directory unavailable" }));
                    }
                    if state.accounts.contains_key(&login) {
                        return reply(409, json!({ "description": "Username already in use" }));
                    }
                    let id = account_id(&login);
                    state.accounts.insert(login, id.clone());
                    reply(201, json!({ "id": id }))
                }
                _ => not_found(),
            };
        }

        let Some(path) = path_with_host.strip_prefix(API) else {
            return Err(TransportError(format!("unknown host in {}", request.url)));
        };
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

        match (request.method, segments.as_slice()) {
            (Method::Get, ["v2", "users", id]) => {
                if state.cc_users.contains(*id) {
                    reply(200, json!({ "metadata": { "guid": id } }))
                } else {
                    not_found()
                }
            }
            (Method::Post, ["v2", "users"]) => {
                let guid = json_body(request)["guid"].as_str().unwrap_or_default().to_string();
                state.cc_users.insert(guid.clone());
                reply(201, json!({ "metadata": { "guid": guid } }))
            }
            (Method::Get, ["v2", "organizations"]) => {
                let guids: Vec<String> = name_query(request, &query)
                    .and_then(|name| state.orgs.get(&name).cloned())
                    .into_iter()
                    .collect();
                reply(200, list(&guids, None))
            }
            (Method::Get, ["v2", "organizations", org, "spaces"]) => {
                let guids: Vec<String> = name_query(request, &query)
                    .and_then(|name| state.spaces.get(&(org.to_string(), name)).cloned())
                    .into_iter()
                    .collect();
                reply(200, list(&guids, None))
            }
            (Method::Get, ["v2", kind @ ("organizations" | "spaces"), target, role]) => {
                let path = format!("/v2/{kind}/{target}/{role}");
                reply(200, state.page(&path, (target.to_string(), role.to_string()), page))
            }
            (Method::Put, ["v2", kind @ ("organizations" | "spaces"), target, role, user]) => {
                if *kind == "organizations" && state.failing_org_assignments.contains(*user) {
                    return reply(500, json!({ "description": "role assignment failed" }));
                }
                state
                    .roles
                    .entry((target.to_string(), role.to_string()))
                    .or_default()
                    .insert(user.to_string());
                reply(201, json!({}))
            }
            _ => not_found(),
        }
    }
}

pub fn environment() -> Environment {
    Environment {
        uaa_url: UAA.to_string(),
        api_url: API.to_string(),
        token_endpoint: None,
        client_id: "roster".to_string(),
        client_secret: "s3cret".to_string(),
        origin: "ldap".to_string(),
        max_token_retries: 3,
        retry_interval_secs: 15,
        expiry_buffer_secs: 30,
        request_timeout_secs: 30,
        skip_tls_verification: false,
    }
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
    ))
}

pub fn api(platform: &Arc<FakePlatform>, clock: &Arc<ManualClock>) -> CloudApi {
    let transport: Arc<dyn Transport> = Arc::clone(platform) as Arc<dyn Transport>;
    let clock: Arc<dyn Clock> = Arc::clone(clock) as Arc<dyn Clock>;
    CloudApi::with_transport(&environment(), transport, clock)
}

pub fn entry(login: &str, org: &str, space: &str, role: &str) -> UserEntry {
    UserEntry {
        login: login.to_string(),
        name: format!("{login} Example"),
        org: org.to_string(),
        space: space.to_string(),
        role: role.to_string(),
        ..UserEntry::default()
    }
}
