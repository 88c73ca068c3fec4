use crate::catalog::api_types::{ApiErrorBody, AuthPayload, Envelope};
use crate::catalog::types::{
  Actor, CreateMovie, Credentials, Movie, NewRating, Rating, Registration, UpdateMovie,
};
use crate::config::Config;
use crate::session::Session;
use color_eyre::{eyre::eyre, Report, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

/// Catalog API client wrapper.
///
/// Every request re-reads the session token, so signing in or out takes
/// effect immediately without rebuilding the client.
#[derive(Clone)]
pub struct CatalogClient {
  http: reqwest::Client,
  base_url: Url,
  session: Session,
}

impl CatalogClient {
  pub fn new(config: &Config, session: Session) -> Result<Self> {
    let mut base_url = Url::parse(&config.api.url)
      .map_err(|e| eyre!("Invalid API URL '{}': {}", config.api.url, e))?;

    // Url::join treats a path without a trailing slash as a file and would
    // replace its last segment.
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let http = reqwest::Client::builder()
      .timeout(std::time::Duration::from_secs(30))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      session,
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint '{}': {}", path, e))
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    let mut request = self.http.request(method, url);
    if let Some(token) = self.session.token() {
      request = request.bearer_auth(token);
    }
    request
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str, context: &str) -> Result<T> {
    let url = self.endpoint(path)?;
    debug!(%url, "api request");
    let response = self
      .request(Method::GET, url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to {}: {}", context, e))?;
    Self::parse_envelope(response, context).await
  }

  async fn send_json<T: DeserializeOwned, B: Serialize>(
    &self,
    method: Method,
    path: &str,
    body: &B,
    context: &str,
  ) -> Result<T> {
    let url = self.endpoint(path)?;
    debug!(%url, method = %method, "api request");
    let response = self
      .request(method, url)
      .json(body)
      .send()
      .await
      .map_err(|e| eyre!("Failed to {}: {}", context, e))?;
    Self::parse_envelope(response, context).await
  }

  async fn parse_envelope<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
      let body = response.json::<ApiErrorBody>().await.unwrap_or_default();
      return Err(Self::status_error(status, &body, context));
    }

    let envelope: Envelope<T> = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse {} response: {}", context, e))?;

    if let Some(message) = &envelope.message {
      debug!(status = ?envelope.status_code, message = %message, "api response");
    }

    Ok(envelope.data)
  }

  fn status_error(status: StatusCode, body: &ApiErrorBody, context: &str) -> Report {
    match body.message_text() {
      Some(message) => eyre!("Failed to {}: {} ({})", context, message, status),
      None => eyre!("Failed to {}: {}", context, status),
    }
  }

  /// Get the entire movie collection
  pub async fn list_movies(&self) -> Result<Vec<Movie>> {
    self.get_json("movies", "list movies").await
  }

  /// Get the actors appearing in a movie
  pub async fn movie_actors(&self, movie_id: u64) -> Result<Vec<Actor>> {
    self
      .get_json(
        &format!("movies/{}/actors", movie_id),
        &format!("get actors of movie {}", movie_id),
      )
      .await
  }

  /// Add a movie to the catalog
  pub async fn create_movie(&self, movie: &CreateMovie) -> Result<Movie> {
    self
      .send_json(Method::POST, "movies", movie, "create movie")
      .await
  }

  /// Update fields of an existing movie
  pub async fn update_movie(&self, id: u64, changes: &UpdateMovie) -> Result<Movie> {
    self
      .send_json(
        Method::PATCH,
        &format!("movies/{}", id),
        changes,
        &format!("update movie {}", id),
      )
      .await
  }

  /// Delete a movie. The response body, if any, is discarded.
  pub async fn delete_movie(&self, id: u64) -> Result<()> {
    let context = format!("delete movie {}", id);
    let url = self.endpoint(&format!("movies/{}", id))?;
    debug!(%url, "api request");

    let response = self
      .request(Method::DELETE, url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to {}: {}", context, e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.json::<ApiErrorBody>().await.unwrap_or_default();
      return Err(Self::status_error(status, &body, &context));
    }

    Ok(())
  }

  /// Get the entire actor collection
  pub async fn list_actors(&self) -> Result<Vec<Actor>> {
    self.get_json("actors", "list actors").await
  }

  /// Get the movies an actor appeared in
  pub async fn actor_movies(&self, actor_id: u64) -> Result<Vec<Movie>> {
    self
      .get_json(
        &format!("actors/{}/movies", actor_id),
        &format!("get movies of actor {}", actor_id),
      )
      .await
  }

  /// Get every rating in the catalog. There is no per-movie endpoint;
  /// callers filter by movie id.
  pub async fn list_ratings(&self) -> Result<Vec<Rating>> {
    self.get_json("ratings", "list ratings").await
  }

  /// Leave a rating on a movie
  pub async fn add_rating(&self, rating: &NewRating) -> Result<Rating> {
    self
      .send_json(Method::POST, "ratings", rating, "add rating")
      .await
  }

  /// Sign in and store the returned token and user in the session.
  pub async fn login(&self, credentials: &Credentials) -> Result<AuthPayload> {
    let payload: AuthPayload = self
      .send_json(Method::POST, "auth/login", credentials, "log in")
      .await?;

    self
      .session
      .sign_in(payload.access_token.clone(), payload.user.clone())?;

    Ok(payload)
  }

  /// Create an account and store the returned token and user in the session.
  pub async fn register(&self, registration: &Registration) -> Result<AuthPayload> {
    let payload: AuthPayload = self
      .send_json(Method::POST, "auth/register", registration, "register")
      .await?;

    self
      .session
      .sign_in(payload.access_token.clone(), payload.user.clone())?;

    Ok(payload)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testsupport::{envelope, sample_movies, StubServer};
  use std::sync::{Arc, Mutex};

  fn test_config(url: &str) -> Config {
    let mut config = Config::default();
    config.api.url = url.to_string();
    config
  }

  fn test_session(dir: &tempfile::TempDir) -> Session {
    Session::load_from(dir.path().join("session.json")).unwrap()
  }

  fn test_user() -> crate::catalog::types::User {
    crate::catalog::types::User {
      id: 1,
      name: "Ada".to_string(),
      email: "ada@example.com".to_string(),
    }
  }

  #[tokio::test]
  async fn test_list_movies_unwraps_envelope() {
    let server = StubServer::start(|_req| (200, envelope(&sample_movies()))).await;
    let dir = tempfile::tempdir().unwrap();
    let client = CatalogClient::new(&test_config(&server.url()), test_session(&dir)).unwrap();

    let movies = client.list_movies().await.unwrap();

    assert_eq!(movies.len(), 3);
    assert_eq!(movies[0].title, "Inception");
  }

  #[tokio::test]
  async fn test_bearer_token_attached_when_signed_in() {
    let seen = Arc::new(Mutex::new(None::<String>));
    let record = seen.clone();
    let server = StubServer::start(move |req| {
      *record.lock().unwrap() = req.header("authorization").map(String::from);
      (200, envelope(&sample_movies()))
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let session = test_session(&dir);
    session.sign_in("jwt-token".to_string(), test_user()).unwrap();
    let client = CatalogClient::new(&test_config(&server.url()), session).unwrap();

    client.list_movies().await.unwrap();

    assert_eq!(seen.lock().unwrap().as_deref(), Some("Bearer jwt-token"));
  }

  #[tokio::test]
  async fn test_no_auth_header_when_signed_out() {
    let seen = Arc::new(Mutex::new(None::<String>));
    let record = seen.clone();
    let server = StubServer::start(move |req| {
      *record.lock().unwrap() = req.header("authorization").map(String::from);
      (200, envelope(&sample_movies()))
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let client = CatalogClient::new(&test_config(&server.url()), test_session(&dir)).unwrap();

    client.list_movies().await.unwrap();

    assert!(seen.lock().unwrap().is_none());
  }

  #[tokio::test]
  async fn test_error_status_surfaces_api_message() {
    let server = StubServer::start(|_req| {
      (
        404,
        r#"{"message": "Movie with ID 9 not found", "error": "Not Found"}"#.to_string(),
      )
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let client = CatalogClient::new(&test_config(&server.url()), test_session(&dir)).unwrap();

    let error = client.movie_actors(9).await.unwrap_err();

    assert!(error.to_string().contains("Movie with ID 9 not found"));
  }

  #[tokio::test]
  async fn test_login_persists_session() {
    let server = StubServer::start(|req| {
      assert_eq!(req.path, "/auth/login");
      assert!(req.body.contains("ada@example.com"));
      (
        200,
        r#"{"data": {"access_token": "fresh-token",
                     "user": {"id": 1, "name": "Ada", "email": "ada@example.com"}}}"#
          .to_string(),
      )
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let session = test_session(&dir);
    let client = CatalogClient::new(&test_config(&server.url()), session.clone()).unwrap();

    let payload = client
      .login(&Credentials {
        email: "ada@example.com".to_string(),
        password: "secret".to_string(),
      })
      .await
      .unwrap();

    assert_eq!(payload.user.name, "Ada");
    assert!(session.is_authenticated());
    assert_eq!(session.token().as_deref(), Some("fresh-token"));
  }
}
