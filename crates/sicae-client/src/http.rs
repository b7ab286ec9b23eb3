//! [`HttpApi`]: [`AccessApi`] over the server's JSON REST interface.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sicae_core::{
  ApiError, AuthError, Identity, Session, Token,
  api::AccessApi,
  domain::{
    AccessEvent, AccessPoint, Credential, NewAccessPoint, NewPerson, NewUser, Person, UserRecord,
  },
};
use tracing::debug;
use uuid::Uuid;

/// Connection settings for the access-control server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

impl ApiConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { base_url: base_url.into(), timeout: Duration::from_secs(30) }
  }
}

/// Async HTTP client for the access-control API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpApi {
  client: Client,
  config: ApiConfig,
}

/// `POST /auth/login` response: the token plus the identity fields, flat.
#[derive(Deserialize)]
struct LoginResponse {
  token:    Token,
  #[serde(flatten)]
  identity: Identity,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
  #[serde(rename = "correo")]
  email:    &'a str,
  password: &'a str,
}

#[derive(Serialize)]
struct ValidateRequest<'a> {
  #[serde(rename = "codigo")]
  code:            &'a str,
  #[serde(rename = "puntoAccesoId", skip_serializing_if = "Option::is_none")]
  access_point_id: Option<Uuid>,
  #[serde(rename = "ipLector", skip_serializing_if = "Option::is_none")]
  source_ip:       Option<&'a str>,
}

/// Error body returned by the server on 4xx/5xx.
#[derive(Deserialize)]
struct ErrorBody {
  #[serde(alias = "mensaje", alias = "error")]
  message: String,
}

impl HttpApi {
  pub fn new(config: ApiConfig) -> Result<Self, reqwest::Error> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  pub fn base_url(&self) -> &str { &self.config.base_url }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response, ApiError> {
    debug!("{what}");
    let resp = req
      .send()
      .await
      .map_err(|e| ApiError::NetworkFailure(format!("{what}: {e}")))?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = error_message(resp).await;
    Err(classify(status, message))
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str, token: &Token) -> Result<T, ApiError> {
    let req = self.client.get(self.url(path)).bearer_auth(token.as_str());
    let resp = self.send(req, &format!("GET {path}")).await?;
    decode(resp, path).await
  }

  async fn post_json<B, T>(&self, path: &str, body: &B, token: Option<&Token>) -> Result<T, ApiError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let mut req = self.client.post(self.url(path)).json(body);
    if let Some(token) = token {
      req = req.bearer_auth(token.as_str());
    }
    let resp = self.send(req, &format!("POST {path}")).await?;
    decode(resp, path).await
  }
}

impl AccessApi for HttpApi {
  async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
    let body = LoginRequest { email, password };
    let resp: LoginResponse = self.post_json("/auth/login", &body, None).await.map_err(auth_error)?;
    Ok(Session { identity: resp.identity, token: resp.token })
  }

  async fn register(&self, user: &NewUser) -> Result<UserRecord, AuthError> {
    self.post_json("/auth/register", user, None).await.map_err(auth_error)
  }

  async fn list_people(&self, token: &Token) -> Result<Vec<Person>, ApiError> {
    self.get_json("/personas", token).await
  }

  async fn list_credentials(&self, token: &Token) -> Result<Vec<Credential>, ApiError> {
    self.get_json("/credenciales", token).await
  }

  async fn list_events(&self, token: &Token) -> Result<Vec<AccessEvent>, ApiError> {
    self.get_json("/eventos", token).await
  }

  async fn list_access_points(&self, token: &Token) -> Result<Vec<AccessPoint>, ApiError> {
    self.get_json("/puntos", token).await
  }

  async fn list_users(&self, token: &Token) -> Result<Vec<UserRecord>, ApiError> {
    self.get_json("/usuarios", token).await
  }

  async fn create_person(&self, person: &NewPerson, token: &Token) -> Result<Person, ApiError> {
    self.post_json("/personas", person, Some(token)).await
  }

  async fn issue_credential(&self, person_id: Uuid, token: &Token) -> Result<Credential, ApiError> {
    self
      .post_json(&format!("/credenciales/{person_id}/qr"), &serde_json::json!({}), Some(token))
      .await
  }

  async fn register_access_point(
    &self,
    point: &NewAccessPoint,
    token: &Token,
  ) -> Result<AccessPoint, ApiError> {
    self.post_json("/puntos", point, Some(token)).await
  }

  async fn validate_code(
    &self,
    code: &str,
    access_point_id: Option<Uuid>,
    source_ip: Option<&str>,
  ) -> Result<AccessEvent, ApiError> {
    let body = ValidateRequest { code, access_point_id, source_ip };
    self.post_json("/qr/validar", &body, None).await
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn decode<T: DeserializeOwned>(resp: Response, path: &str) -> Result<T, ApiError> {
  resp
    .json()
    .await
    .map_err(|e| unexpected(path, e))
}

fn unexpected(path: &str, e: impl std::fmt::Display) -> ApiError {
  ApiError::UnexpectedResponse(format!("{path}: {e}"))
}

/// Best-effort extraction of the server's message from an error response.
async fn error_message(resp: Response) -> String {
  let status = resp.status();
  let text = resp.text().await.unwrap_or_default();
  match serde_json::from_str::<ErrorBody>(&text) {
    Ok(body) => body.message,
    Err(_) if !text.trim().is_empty() => text.trim().to_owned(),
    Err(_) => status.to_string(),
  }
}

fn classify(status: StatusCode, message: String) -> ApiError {
  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
    StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation(message),
    s if s.is_server_error() => ApiError::ServerError(message),
    s => ApiError::ServerError(format!("{s}: {message}")),
  }
}

/// Login and registration report client-side rejections as bad credentials.
fn auth_error(e: ApiError) -> AuthError {
  match e {
    ApiError::NetworkFailure(m) => AuthError::NetworkFailure(m),
    ApiError::Unauthorized => AuthError::InvalidCredentials("invalid email or password".into()),
    ApiError::Validation(m) => AuthError::InvalidCredentials(m),
    ApiError::ServerError(m) => AuthError::ServerError(m),
    ApiError::UnexpectedResponse(m) => AuthError::ServerError(format!("unexpected response: {m}")),
  }
}
