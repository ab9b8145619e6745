use std::sync::{Arc, Mutex};

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Form, Json, Router,
};
use sathub_http::{AuthTokenStore, ExecError};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct TokenForm {
    grant_type: String,
    client_id: String,
    client_secret: String,
}

#[derive(Clone)]
struct TokenState {
    seen: Arc<Mutex<Vec<(String, String, String)>>>,
    reject: bool,
}

async fn token_handler(
    State(state): State<TokenState>,
    Form(form): Form<TokenForm>,
) -> impl IntoResponse {
    state
        .seen
        .lock()
        .expect("token form log mutex must not be poisoned")
        .push((form.grant_type, form.client_id, form.client_secret));

    if state.reject {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_client"})),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({
                "access_token": "issued-access-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })),
        )
    }
}

struct TokenServer {
    token_url: String,
    seen: Arc<Mutex<Vec<(String, String, String)>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TokenServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn spawn_token_server(reject: bool) -> TokenServer {
    let state = TokenState {
        seen: Arc::new(Mutex::new(Vec::new())),
        reject,
    };

    let app = Router::new()
        .route("/oauth/token", post(token_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock token server must run");
    });

    TokenServer {
        token_url: format!("http://{address}/oauth/token"),
        seen: state.seen,
        task,
    }
}

#[tokio::test]
async fn token_exchange_stores_and_returns_the_token() {
    let server = spawn_token_server(false).await;
    let store = AuthTokenStore::new().with_token_url(&server.token_url);

    assert!(!store.is_auth_token_set());

    let token = store
        .request_auth_token("my-client-id", "my-client-secret")
        .await
        .expect("exchange must succeed");

    assert_eq!(token, "issued-access-token");
    assert!(store.is_auth_token_set());
    assert_eq!(store.current().as_deref(), Some("issued-access-token"));

    let seen = server
        .seen
        .lock()
        .expect("token form log mutex must not be poisoned")
        .clone();
    assert_eq!(
        seen,
        vec![(
            "client_credentials".to_owned(),
            "my-client-id".to_owned(),
            "my-client-secret".to_owned()
        )]
    );
}

#[tokio::test]
async fn rejected_exchange_surfaces_auth_error_and_leaves_store_empty() {
    let server = spawn_token_server(true).await;
    let store = AuthTokenStore::new().with_token_url(&server.token_url);

    let err = store
        .request_auth_token("my-client-id", "wrong-secret")
        .await
        .expect_err("exchange must fail");

    match err {
        ExecError::Auth(message) => assert!(message.contains("401")),
        other => panic!("expected auth error, got {other:?}"),
    }
    assert!(!store.is_auth_token_set());
}
