//! Common test utilities for marketplace integration tests

#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use cookie::Cookie;
use realty_core::{session_ttl, Property, PropertyInput, Role};
use realty_server::routes::{self, SESSION_COOKIE};
use realty_server::store::{PropertyStore, UpsertUser, User, UserStore};
use realty_server::{
    AppError, AppState, CancellationNotice, Config, ConfirmationNotice, IdentityProvider,
    InMemoryStore, Notifier, Store, TokenResponse, UserInfo,
};
use serde_json::{json, Value};

pub const TEST_SECRET: &str = "integration-test-secret";

/// Mock notifier that records every notice
#[derive(Default, Clone)]
pub struct MockNotifier {
    pub confirmations: Arc<RwLock<Vec<ConfirmationNotice>>>,
    pub cancellations: Arc<RwLock<Vec<CancellationNotice>>>,
    /// When set, every send is recorded and then fails
    pub fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn confirmation_count(&self) -> usize {
        self.confirmations.read().unwrap().len()
    }

    pub fn cancellation_count(&self) -> usize {
        self.cancellations.read().unwrap().len()
    }
}

impl Notifier for MockNotifier {
    fn send_confirmation(&self, notice: &ConfirmationNotice) -> Result<bool, String> {
        self.confirmations.write().unwrap().push(notice.clone());
        if self.fail {
            return Err("mail relay unavailable".to_string());
        }
        Ok(true)
    }

    fn send_cancellation(&self, notice: &CancellationNotice) -> Result<bool, String> {
        self.cancellations.write().unwrap().push(notice.clone());
        if self.fail {
            return Err("mail relay unavailable".to_string());
        }
        Ok(true)
    }
}

/// Identity provider returning canned answers
#[derive(Default, Clone)]
pub struct FakeIdentityProvider {
    pub user_info: UserInfo,
    pub fail_exchange: bool,
    /// (code, redirect_uri) pairs seen by `exchange_code`
    pub exchanges: Arc<RwLock<Vec<(String, String)>>>,
}

impl FakeIdentityProvider {
    pub fn returning(open_id: &str, name: &str, email: &str) -> Self {
        Self {
            user_info: UserInfo {
                open_id: Some(open_id.to_string()),
                name: Some(name.to_string()),
                email: Some(email.to_string()),
                login_method: Some("google".to_string()),
                platform: None,
            },
            ..Self::default()
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AppError> {
        self.exchanges
            .write()
            .unwrap()
            .push((code.to_string(), redirect_uri.to_string()));
        if self.fail_exchange {
            return Err(AppError::Upstream("token endpoint returned 500".to_string()));
        }
        Ok(TokenResponse {
            access_token: format!("access-{}", code),
            token_type: Some("Bearer".to_string()),
            expires_in: Some(3600),
            refresh_token: None,
            id_token: None,
        })
    }

    async fn get_user_info(&self, _access_token: &str) -> Result<UserInfo, AppError> {
        Ok(self.user_info.clone())
    }
}

pub type TestState<S = InMemoryStore> = AppState<S, FakeIdentityProvider, MockNotifier>;

/// A running test server plus direct access to its state
pub struct TestApp<S = InMemoryStore> {
    pub server: TestServer,
    pub state: Arc<TestState<S>>,
}

impl<S: Store + 'static> TestApp<S> {
    pub fn notifier(&self) -> &MockNotifier {
        &self.state.notifier
    }

    pub fn store(&self) -> &S {
        self.state.store.as_ref()
    }

    /// Create (or update) a user and return a session cookie for them
    pub fn login_as(&self, open_id: &str, role: Role) -> Cookie<'static> {
        let user = self.create_user(open_id, role);
        self.session_cookie(&user)
    }

    pub fn create_user(&self, open_id: &str, role: Role) -> User {
        self.store()
            .upsert_user(UpsertUser {
                open_id: open_id.to_string(),
                name: Some(format!("User {}", open_id)),
                email: Some(format!("{}@example.com", open_id)),
                role: Some(role),
                ..Default::default()
            })
            .expect("Failed to create user")
    }

    pub fn session_cookie(&self, user: &User) -> Cookie<'static> {
        let token = self
            .state
            .codec
            .issue(&user.open_id, user.name.as_deref().unwrap_or_default(), session_ttl())
            .expect("Failed to sign session");
        Cookie::new(SESSION_COOKIE, token)
    }

    pub fn create_property(&self, title: &str, price: i64) -> Property {
        self.store()
            .create_property(PropertyInput {
                title: title.to_string(),
                price,
                city: "Springfield".to_string(),
                ..Default::default()
            })
            .expect("Failed to create property")
    }
}

pub fn test_config() -> Config {
    Config::for_testing(TEST_SECRET)
}

/// Create a test server over any store
pub fn create_app_with<S: Store + 'static>(
    config: Config,
    store: S,
    identity: FakeIdentityProvider,
    notifier: MockNotifier,
) -> TestApp<S> {
    let state = Arc::new(
        AppState::new(config, store, identity, notifier).expect("Failed to build state"),
    );
    let app = routes::create_router(state.clone());
    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp { server, state }
}

/// Create a test server with an in-memory store and a recording notifier
pub fn create_test_app() -> TestApp {
    create_app_with(
        test_config(),
        InMemoryStore::new(),
        FakeIdentityProvider::default(),
        MockNotifier::new(),
    )
}

/// A valid `viewings.create` body for a property, two days out
pub fn viewing_request(property_id: i64, email: &str) -> Value {
    json!({
        "propertyId": property_id,
        "visitorName": "Jane Visitor",
        "visitorEmail": email,
        "visitorPhone": "555-0100",
        "viewingDate": (Utc::now() + Duration::days(2)).to_rfc3339(),
        "viewingTime": "10:30",
        "duration": 45,
        "notes": "Interested in the garden",
    })
}

/// Schedule a viewing over HTTP and return its id
pub async fn schedule_viewing<S: Store + 'static>(
    app: &TestApp<S>,
    cookie: &Cookie<'static>,
    property_id: i64,
    email: &str,
) -> i64 {
    let response = app
        .server
        .post("/api/rpc/viewings.create")
        .add_cookie(cookie.clone())
        .json(&viewing_request(property_id, email))
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    response.json::<Value>()["id"].as_i64().expect("viewing id")
}

/// All `Set-Cookie` values of a response
pub fn set_cookies(response: &axum_test::TestResponse) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}
