//! A scripted in-process RadioTAG service modelled on the BBC prototype:
//! anonymous tags are rejected with a grant token, the unpaired token
//! unlocks registration, and PIN submission upgrades the client to a
//! registered account.

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::post,
};
use tokio::net::TcpListener;

use radiotag_client::protocol::{
    ACCOUNT_NAME_HEADER, AUTH_TOKEN_HEADER, GRANT_SCOPE_CAN_REGISTER, GRANT_SCOPE_HEADER,
    GRANT_SCOPE_UNPAIRED, GRANT_TOKEN_HEADER, REGISTRATION_KEY_HEADER, REGISTRATION_URL_HEADER,
};

pub const GRANT_ANONYMOUS: &str = "g1";
pub const GRANT_CAN_REGISTER: &str = "g2";
pub const TOKEN_UNPAIRED: &str = "a1";
pub const TOKEN_REGISTERED: &str = "a2";
pub const REGISTRATION_KEY: &str = "K123";
pub const REGISTRATION_URL: &str = "http://radiotag.example/register";
pub const ACCOUNT_NAME: &str = "Alice";

/// One request as the mock server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: &'static str,
    pub body: String,
    pub auth_token: Option<String>,
}

pub type RequestLog = Arc<Mutex<Vec<Recorded>>>;

#[derive(Clone)]
struct MockState {
    log: RequestLog,
}

/// Spawns the mock service on a random port. Returns its base URL and the
/// request log for assertions.
pub async fn spawn_mock() -> (String, RequestLog) {
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        log: Arc::clone(&log),
    };

    let app = Router::new()
        .route("/tag", post(tag))
        .route("/token", post(token))
        .route("/registration_key", post(registration_key))
        .route("/register", post(register))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server failed");
    });

    (format!("http://{addr}"), log)
}

/// Spawns a service whose endpoints all answer 500.
pub async fn spawn_error_mock() -> String {
    async fn boom() -> impl IntoResponse {
        (StatusCode::INTERNAL_SERVER_ERROR, "boom")
    }

    let app = Router::new()
        .route("/tag", post(boom))
        .route("/token", post(boom))
        .route("/registration_key", post(boom))
        .route("/register", post(boom));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server failed");
    });

    format!("http://{addr}")
}

fn auth_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn field(body: &str, name: &str) -> Option<String> {
    body.split('&')
        .find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key == name {
                urlencoding::decode(value).ok()
            } else {
                None
            }
        })
        .map(|value| value.into_owned())
}

fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
    pairs
        .iter()
        .map(|(name, value)| {
            (
                HeaderName::try_from(*name).unwrap(),
                HeaderValue::try_from(*value).unwrap(),
            )
        })
        .collect()
}

async fn tag(
    State(state): State<MockState>,
    request_headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let auth = auth_token(&request_headers);
    state.log.lock().unwrap().push(Recorded {
        path: "/tag",
        body,
        auth_token: auth.clone(),
    });

    match auth.as_deref() {
        Some(TOKEN_REGISTERED) => (
            StatusCode::OK,
            headers(&[
                (AUTH_TOKEN_HEADER, TOKEN_REGISTERED),
                (ACCOUNT_NAME_HEADER, ACCOUNT_NAME),
            ]),
            "tag recorded".to_string(),
        ),
        Some(TOKEN_UNPAIRED) => (
            StatusCode::OK,
            headers(&[
                (GRANT_TOKEN_HEADER, GRANT_CAN_REGISTER),
                (GRANT_SCOPE_HEADER, GRANT_SCOPE_CAN_REGISTER),
            ]),
            "tag recorded".to_string(),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            headers(&[(GRANT_TOKEN_HEADER, GRANT_ANONYMOUS)]),
            "must request token".to_string(),
        ),
    }
}

async fn token(State(state): State<MockState>, body: String) -> impl IntoResponse {
    let scope = field(&body, "grant_scope");
    let grant = field(&body, "grant_token");
    state.log.lock().unwrap().push(Recorded {
        path: "/token",
        body,
        auth_token: None,
    });

    if scope.as_deref() == Some(GRANT_SCOPE_UNPAIRED) && grant.as_deref() == Some(GRANT_ANONYMOUS)
    {
        (
            StatusCode::NO_CONTENT,
            headers(&[(AUTH_TOKEN_HEADER, TOKEN_UNPAIRED)]),
            String::new(),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            HeaderMap::new(),
            "bad grant".to_string(),
        )
    }
}

async fn registration_key(State(state): State<MockState>, body: String) -> impl IntoResponse {
    let scope = field(&body, "grant_scope");
    let grant = field(&body, "grant_token");
    state.log.lock().unwrap().push(Recorded {
        path: "/registration_key",
        body,
        auth_token: None,
    });

    if scope.as_deref() == Some(GRANT_SCOPE_CAN_REGISTER)
        && grant.as_deref() == Some(GRANT_CAN_REGISTER)
    {
        (
            StatusCode::NO_CONTENT,
            headers(&[
                (REGISTRATION_KEY_HEADER, REGISTRATION_KEY),
                (REGISTRATION_URL_HEADER, REGISTRATION_URL),
            ]),
            String::new(),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            HeaderMap::new(),
            "bad grant".to_string(),
        )
    }
}

async fn register(
    State(state): State<MockState>,
    request_headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let auth = auth_token(&request_headers);
    let key = field(&body, "registration_key");
    let pin = field(&body, "pin");
    state.log.lock().unwrap().push(Recorded {
        path: "/register",
        body,
        auth_token: auth.clone(),
    });

    if auth.as_deref() == Some(TOKEN_UNPAIRED)
        && key.as_deref() == Some(REGISTRATION_KEY)
        && pin.is_some()
    {
        (
            StatusCode::NO_CONTENT,
            headers(&[
                (AUTH_TOKEN_HEADER, TOKEN_REGISTERED),
                (ACCOUNT_NAME_HEADER, ACCOUNT_NAME),
            ]),
            String::new(),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            HeaderMap::new(),
            "bad registration".to_string(),
        )
    }
}
