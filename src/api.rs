use crate::model::{AuthMode, Session, User};
use serde::{Deserialize, Serialize};

/// Body of a login/registration call
#[derive(Clone, PartialEq, Serialize)]
pub struct AuthRequest {
    pub action: AuthMode,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_id: Option<i64>,
}

impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRequest")
            .field("action", &self.action)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("username", &self.username)
            .field("avatar_id", &self.avatar_id)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthReply {
    pub user: User,
    pub session_token: String,
}

#[derive(Debug, Deserialize)]
struct BalanceReply {
    balance: f64,
}

#[derive(Debug, Serialize)]
struct DepositBody {
    amount: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    #[serde(default)]
    error: Option<String>,
}

/// Why a remote call did not produce a usable reply
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Server answered with a non-2xx status; `message` is its `error` field if any
    Rejected { status: u16, message: Option<String> },
    /// No response at all
    Network(String),
    /// 2xx response whose body did not match the contract
    InvalidResponse(String),
}

impl ApiError {
    /// Server-supplied message, or `fallback` when there is none
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self {
            ApiError::Rejected {
                message: Some(m), ..
            } => m.as_str(),
            _ => fallback,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Rejected { status, message } => match message {
                Some(m) => write!(f, "server rejected request ({}): {}", status, m),
                None => write!(f, "server rejected request ({})", status),
            },
            ApiError::Network(e) => write!(f, "request failed: {}", e),
            ApiError::InvalidResponse(e) => write!(f, "invalid response: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

/// Remote TickPay backend. Abstracted so flows can run against a scripted double.
pub trait Backend {
    fn authenticate(&self, request: &AuthRequest) -> Result<AuthReply, ApiError>;
    fn fetch_balance(&self, session: &Session) -> Result<f64, ApiError>;
    fn deposit(&self, session: &Session, amount: f64) -> Result<f64, ApiError>;
}

pub struct HttpBackend {
    auth_url: String,
    balance_url: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(auth_url: &str, balance_url: &str) -> Self {
        Self {
            auth_url: auth_url.to_string(),
            balance_url: balance_url.to_string(),
            agent: ureq::Agent::new(),
        }
    }
}

fn into_reply<T: serde::de::DeserializeOwned>(
    resp: Result<ureq::Response, ureq::Error>,
) -> Result<T, ApiError> {
    match resp {
        Ok(r) => r
            .into_json::<T>()
            .map_err(|e| ApiError::InvalidResponse(e.to_string())),
        Err(ureq::Error::Status(code, r)) => {
            let body = r.into_string().unwrap_or_default();
            let message = serde_json::from_str::<ErrorReply>(&body)
                .ok()
                .and_then(|e| e.error)
                .filter(|m| !m.is_empty());
            Err(ApiError::Rejected {
                status: code,
                message,
            })
        }
        Err(e) => Err(ApiError::Network(e.to_string())),
    }
}

impl Backend for HttpBackend {
    fn authenticate(&self, request: &AuthRequest) -> Result<AuthReply, ApiError> {
        let resp = self
            .agent
            .post(&self.auth_url)
            .set("Content-Type", "application/json")
            .send_json(request);
        into_reply(resp)
    }

    fn fetch_balance(&self, session: &Session) -> Result<f64, ApiError> {
        let resp = self
            .agent
            .get(&self.balance_url)
            .set("X-User-Token", &session.token)
            .set("X-User-Id", &session.user.id.to_string())
            .call();
        into_reply::<BalanceReply>(resp).map(|r| r.balance)
    }

    fn deposit(&self, session: &Session, amount: f64) -> Result<f64, ApiError> {
        let resp = self
            .agent
            .post(&self.balance_url)
            .set("Content-Type", "application/json")
            .set("X-User-Token", &session.token)
            .set("X-User-Id", &session.user.id.to_string())
            .send_json(DepositBody { amount });
        into_reply::<BalanceReply>(resp).map(|r| r.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::mpsc;
    use std::thread;

    /// A request as seen by the one-shot server
    struct Captured {
        method: String,
        url: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Captured {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Serve exactly one request with the given status and body
    fn serve_once(status: u16, body: &'static str) -> (String, mpsc::Receiver<Captured>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let url = format!("http://{}/fn", addr);
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let mut request = server.recv().unwrap();
            let mut received = String::new();
            request.as_reader().read_to_string(&mut received).unwrap();

            let captured = Captured {
                method: request.method().to_string(),
                url: request.url().to_string(),
                headers: request
                    .headers()
                    .iter()
                    .map(|h| (h.field.as_str().to_string(), h.value.to_string()))
                    .collect(),
                body: received,
            };
            request
                .respond(tiny_http::Response::from_string(body).with_status_code(status))
                .unwrap();
            tx.send(captured).unwrap();
        });

        (url, rx)
    }

    fn session() -> Session {
        Session::new(
            User {
                id: 42,
                username: "ann".to_string(),
                email: "a@a.com".to_string(),
                avatar_id: 1,
                balance: None,
            },
            "tok-123",
        )
    }

    fn login_request() -> AuthRequest {
        AuthRequest {
            action: AuthMode::Login,
            email: "a@a.com".to_string(),
            password: "secret".to_string(),
            username: None,
            avatar_id: None,
        }
    }

    #[test]
    fn test_login_body_omits_register_fields() {
        let value = serde_json::to_value(login_request()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"action": "login", "email": "a@a.com", "password": "secret"})
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let shown = format!("{:?}", login_request());
        assert!(!shown.contains("secret"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn test_message_or_fallback() {
        let with = ApiError::Rejected {
            status: 400,
            message: Some("limit exceeded".to_string()),
        };
        let without = ApiError::Rejected {
            status: 500,
            message: None,
        };
        assert_eq!(with.message_or("fallback"), "limit exceeded");
        assert_eq!(without.message_or("fallback"), "fallback");
        assert_eq!(
            ApiError::Network("refused".to_string()).message_or("fallback"),
            "fallback"
        );
    }

    #[test]
    fn test_http_authenticate_success() {
        let (url, rx) = serve_once(
            200,
            r#"{"user":{"id":42,"username":"ann","email":"a@a.com","avatar_id":1},"session_token":"tok-123"}"#,
        );
        let backend = HttpBackend::new(&url, &url);

        let reply = backend.authenticate(&login_request()).unwrap();
        assert_eq!(reply.user.id, 42);
        assert_eq!(reply.session_token, "tok-123");

        let captured = rx.recv().unwrap();
        assert_eq!(captured.method, "POST");
        assert_eq!(captured.url, "/fn");
        let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(body["action"], "login");
        assert!(body.get("username").is_none());
    }

    #[test]
    fn test_http_fetch_balance_sends_auth_headers() {
        let (url, rx) = serve_once(200, r#"{"balance":150.25}"#);
        let backend = HttpBackend::new(&url, &url);

        assert_eq!(backend.fetch_balance(&session()).unwrap(), 150.25);

        let captured = rx.recv().unwrap();
        assert_eq!(captured.method, "GET");
        assert_eq!(captured.url, "/fn");
        assert_eq!(captured.header("X-User-Token"), Some("tok-123"));
        assert_eq!(captured.header("X-User-Id"), Some("42"));
    }

    #[test]
    fn test_http_deposit_posts_amount() {
        let (url, rx) = serve_once(200, r#"{"balance":600}"#);
        let backend = HttpBackend::new(&url, &url);

        assert_eq!(backend.deposit(&session(), 500.0).unwrap(), 600.0);

        let captured = rx.recv().unwrap();
        assert_eq!(captured.method, "POST");
        assert_eq!(captured.url, "/fn");
        assert_eq!(captured.header("X-User-Token"), Some("tok-123"));
        let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(body["amount"], 500.0);
    }

    #[test]
    fn test_http_rejection_carries_server_message() {
        let (url, _rx) = serve_once(400, r#"{"error":"limit exceeded"}"#);
        let backend = HttpBackend::new(&url, &url);

        let err = backend.deposit(&session(), 1.0).unwrap_err();
        assert_eq!(
            err,
            ApiError::Rejected {
                status: 400,
                message: Some("limit exceeded".to_string())
            }
        );
    }

    #[test]
    fn test_http_rejection_without_json_body() {
        let (url, _rx) = serve_once(502, "bad gateway");
        let backend = HttpBackend::new(&url, &url);

        let err = backend.fetch_balance(&session()).unwrap_err();
        assert_eq!(
            err,
            ApiError::Rejected {
                status: 502,
                message: None
            }
        );
    }

    #[test]
    fn test_http_success_with_wrong_shape_is_invalid() {
        let (url, _rx) = serve_once(200, r#"{"unexpected":true}"#);
        let backend = HttpBackend::new(&url, &url);

        let err = backend.fetch_balance(&session()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_http_connection_refused_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/fn", listener.local_addr().unwrap());
        drop(listener);

        let backend = HttpBackend::new(&url, &url);
        let err = backend.authenticate(&login_request()).unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}
