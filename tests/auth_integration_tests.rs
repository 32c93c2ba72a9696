use async_trait::async_trait;
use axum::{
    body::to_bytes,
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use std::{sync::Arc, time::SystemTime};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;
use xpanel::{
    AppState, Renderer,
    auth::{AuthUser, CheckLogin, Claims, issue_token},
    config::{AppConfig, Env},
    models::{AllSetting, Inbound, InboundForm, Msg, User},
    repository::Repository,
    routes::Gate,
};

// --- Mock Repository for Auth Logic ---

#[derive(Default)]
struct MockAuthRepo {
    user_to_return: Option<User>,
}

#[async_trait]
impl Repository for MockAuthRepo {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.user_to_return.clone().filter(|user| user.id == id)
    }
    async fn check_user(&self, _username: &str, _password: &str) -> Option<User> {
        None
    }
    async fn update_user(&self, _id: Uuid, _username: String, _password: String) -> bool {
        false
    }
    async fn get_inbounds(&self, _user_id: Uuid) -> Vec<Inbound> {
        vec![]
    }
    async fn add_inbound(&self, inbound: Inbound) -> Result<Inbound, String> {
        Ok(inbound)
    }
    async fn del_inbound(&self, _id: i64, _user_id: Uuid) -> bool {
        false
    }
    async fn update_inbound(
        &self,
        id: i64,
        _user_id: Uuid,
        _form: InboundForm,
    ) -> Result<Inbound, String> {
        Err(format!("入站不存在: {}", id))
    }
    async fn get_settings(&self) -> AllSetting {
        AllSetting::default()
    }
    async fn update_settings(&self, settings: AllSetting) -> AllSetting {
        settings
    }
}

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn test_user() -> User {
    User {
        id: TEST_USER_ID,
        username: "admin".to_string(),
        password: "admin".to_string(),
    }
}

fn create_token(user_id: Uuid, exp_offset: u64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn create_app_state(env: Env, repo: MockAuthRepo) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };

    AppState {
        repo: Arc::new(repo),
        renderer: Renderer::embedded().unwrap(),
        config,
    }
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_header(parts: &mut Parts, name: &'static str, value: &str) {
    parts.headers.insert(
        header::HeaderName::from_static(name),
        header::HeaderValue::from_str(value).unwrap(),
    );
}

// --- AuthUser Extractor Tests ---

#[tokio::test]
async fn test_auth_success_with_bearer_token() {
    let token = create_token(TEST_USER_ID, 3600);
    let mock_repo = MockAuthRepo {
        user_to_return: Some(test_user()),
    };
    let app_state = create_app_state(Env::Production, mock_repo);

    let mut parts = get_request_parts(Method::GET, "/xpanel/".parse().unwrap());
    with_header(&mut parts, "authorization", &format!("Bearer {}", token));

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.username, "admin");
}

#[tokio::test]
async fn test_auth_success_with_session_cookie() {
    let token = create_token(TEST_USER_ID, 3600);
    let mock_repo = MockAuthRepo {
        user_to_return: Some(test_user()),
    };
    let app_state = create_app_state(Env::Production, mock_repo);

    let mut parts = get_request_parts(Method::GET, "/xpanel/".parse().unwrap());
    with_header(&mut parts, "cookie", &format!("lang=zh; session={}", token));

    let user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(user.map(|user| user.id), Ok(TEST_USER_ID));
}

#[tokio::test]
async fn test_auth_accepts_tokens_issued_by_login() {
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo {
            user_to_return: Some(test_user()),
        },
    );
    let token = issue_token(TEST_USER_ID, &app_state.config).unwrap();

    let mut parts = get_request_parts(Method::GET, "/xpanel/".parse().unwrap());
    with_header(&mut parts, "cookie", &format!("session={}", token));

    assert!(AuthUser::from_request_parts(&mut parts, &app_state).await.is_ok());
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(Env::Production, MockAuthRepo::default());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_empty_session_cookie() {
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo {
            user_to_return: Some(test_user()),
        },
    );

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_header(&mut parts, "cookie", "session=");

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_for_deleted_user() {
    let token = create_token(TEST_USER_ID, 3600);
    let app_state = create_app_state(Env::Production, MockAuthRepo::default());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_header(&mut parts, "authorization", &format!("Bearer {}", token));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let mock_repo = MockAuthRepo {
        user_to_return: Some(test_user()),
    };
    let app_state = create_app_state(Env::Local, mock_repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_header(&mut parts, "x-user-id", &TEST_USER_ID.to_string());

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, TEST_USER_ID);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let mock_repo = MockAuthRepo {
        user_to_return: Some(test_user()),
    };
    let app_state = create_app_state(Env::Production, mock_repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    // Provide ONLY the local bypass header
    with_header(&mut parts, "x-user-id", &TEST_USER_ID.to_string());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err(), StatusCode::UNAUTHORIZED);
}

// --- CheckLogin Gate Tests ---

#[tokio::test]
async fn test_check_login_attaches_user_to_request() {
    let token = create_token(TEST_USER_ID, 3600);
    let app_state = create_app_state(
        Env::Production,
        MockAuthRepo {
            user_to_return: Some(test_user()),
        },
    );

    let mut parts = get_request_parts(Method::GET, "/xpanel/setting".parse().unwrap());
    with_header(&mut parts, "cookie", &format!("session={}", token));

    assert!(CheckLogin.check(&app_state, &mut parts).await.is_ok());

    let user = parts.extensions.get::<AuthUser>().unwrap();
    assert_eq!(user.username, "admin");
}

#[tokio::test]
async fn test_check_login_redirects_browsers() {
    let app_state = create_app_state(Env::Production, MockAuthRepo::default());

    let mut parts = get_request_parts(Method::GET, "/xpanel/inbounds".parse().unwrap());

    let rejection = CheckLogin.check(&app_state, &mut parts).await.unwrap_err();

    assert_eq!(rejection.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(rejection.headers()[header::LOCATION], "/");
    assert!(parts.extensions.get::<AuthUser>().is_none());
}

#[tokio::test]
async fn test_check_login_answers_scripts_with_json() {
    let app_state = create_app_state(Env::Production, MockAuthRepo::default());

    let mut parts = get_request_parts(Method::POST, "/xpanel/inbound/list".parse().unwrap());
    with_header(&mut parts, "x-requested-with", "XMLHttpRequest");

    let rejection = CheckLogin.check(&app_state, &mut parts).await.unwrap_err();
    assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);

    let bytes = to_bytes(rejection.into_body(), usize::MAX).await.unwrap();
    let msg: Msg = serde_json::from_slice(&bytes).unwrap();
    assert!(!msg.success);
    assert_eq!(msg.msg, "登录时效已过，请重新登录");
}
