//! Shared helpers for tests that need a live HTTP endpoint.
//!
//! `StubServer` is a minimal canned-response HTTP/1.1 listener: every
//! connection serves a single request through the provided responder and
//! then closes. The fixture functions build the handful of catalog
//! entities the tests exercise.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::catalog::types::{Actor, Movie, Rating};

type Responder = dyn Fn(&Request) -> (u16, String) + Send + Sync;

/// One parsed HTTP request.
pub struct Request {
  pub method: String,
  pub path: String,
  pub body: String,
  headers: Vec<(String, String)>,
}

impl Request {
  /// Case-insensitive header lookup.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(key, _)| key.eq_ignore_ascii_case(name))
      .map(|(_, value)| value.as_str())
  }
}

/// Canned-response HTTP server bound to an ephemeral local port.
pub struct StubServer {
  addr: SocketAddr,
  hits: Arc<AtomicUsize>,
}

impl StubServer {
  /// Start a server; `respond` maps each request to a status and a JSON
  /// body.
  pub async fn start<F>(respond: F) -> Self
  where
    F: Fn(&Request) -> (u16, String) + Send + Sync + 'static,
  {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
    let addr = listener.local_addr().expect("stub server address");
    let hits = Arc::new(AtomicUsize::new(0));
    let respond: Arc<Responder> = Arc::new(respond);

    let served = hits.clone();
    tokio::spawn(async move {
      loop {
        let Ok((socket, _)) = listener.accept().await else {
          break;
        };
        tokio::spawn(serve_connection(socket, respond.clone(), served.clone()));
      }
    });

    Self { addr, hits }
  }

  /// Base URL for pointing a client at this server.
  pub fn url(&self) -> String {
    format!("http://{}", self.addr)
  }

  /// Number of complete requests served so far.
  pub fn hits(&self) -> usize {
    self.hits.load(Ordering::SeqCst)
  }
}

async fn serve_connection(mut socket: TcpStream, respond: Arc<Responder>, hits: Arc<AtomicUsize>) {
  let mut buf = Vec::new();
  let mut chunk = [0u8; 1024];

  let request = loop {
    let Ok(read) = socket.read(&mut chunk).await else {
      return;
    };
    if read == 0 {
      return;
    }
    buf.extend_from_slice(&chunk[..read]);
    if let Some(request) = parse_request(&buf) {
      break request;
    }
  };

  hits.fetch_add(1, Ordering::SeqCst);
  let (status, body) = respond(&request);
  let response = format!(
    "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
    status,
    reason(status),
    body.len(),
    body
  );
  let _ = socket.write_all(response.as_bytes()).await;
  let _ = socket.shutdown().await;
}

/// Returns `None` until the headers and the full body have arrived.
fn parse_request(buf: &[u8]) -> Option<Request> {
  let text = std::str::from_utf8(buf).ok()?;
  let head_end = text.find("\r\n\r\n")?;
  let rest = &text[head_end + 4..];

  let mut lines = text[..head_end].lines();
  let mut parts = lines.next()?.split_whitespace();
  let method = parts.next()?.to_string();
  let path = parts.next()?.to_string();

  let headers: Vec<(String, String)> = lines
    .filter_map(|line| {
      let (key, value) = line.split_once(':')?;
      Some((key.trim().to_string(), value.trim().to_string()))
    })
    .collect();

  let content_length = headers
    .iter()
    .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
    .and_then(|(_, value)| value.parse::<usize>().ok())
    .unwrap_or(0);

  if rest.len() < content_length {
    return None;
  }

  Some(Request {
    method,
    path,
    body: rest[..content_length].to_string(),
    headers,
  })
}

fn reason(status: u16) -> &'static str {
  match status {
    200 => "OK",
    201 => "Created",
    204 => "No Content",
    400 => "Bad Request",
    401 => "Unauthorized",
    404 => "Not Found",
    500 => "Internal Server Error",
    _ => "OK",
  }
}

/// Wrap a payload in the API's standard response envelope.
pub fn envelope<T: Serialize>(data: &T) -> String {
  serde_json::json!({ "data": data }).to_string()
}

/// A movie with every searchable field derived from the arguments.
pub fn make_movie(id: u64, title: &str, genre: &str, director: &str) -> Movie {
  Movie {
    id,
    title: title.to_string(),
    description: format!("A {} film directed by {}.", genre, director),
    release_date: "2000-01-01".to_string(),
    genre: genre.to_string(),
    duration: 120,
    director: director.to_string(),
    image: None,
    created_at: None,
    updated_at: None,
    actors: None,
    ratings: None,
  }
}

pub fn sample_movies() -> Vec<Movie> {
  vec![
    Movie {
      description: "A thief steals corporate secrets through dream-sharing technology.".to_string(),
      release_date: "2010-07-16".to_string(),
      duration: 148,
      ..make_movie(1, "Inception", "Sci-Fi", "Christopher Nolan")
    },
    Movie {
      description: "The aging patriarch of a crime dynasty hands control to his son.".to_string(),
      release_date: "1972-03-24".to_string(),
      duration: 175,
      ..make_movie(2, "The Godfather", "Crime", "Francis Ford Coppola")
    },
    Movie {
      description: "A young girl wanders into a world of spirits and gods.".to_string(),
      release_date: "2001-07-20".to_string(),
      duration: 125,
      ..make_movie(3, "Spirited Away", "Animation", "Hayao Miyazaki")
    },
  ]
}

pub fn sample_actors() -> Vec<Actor> {
  vec![
    Actor {
      id: 1,
      first_name: "Robert".to_string(),
      last_name: "De Niro".to_string(),
      birth_date: "1943-08-17".to_string(),
      nationality: "American".to_string(),
      image: None,
      created_at: None,
      updated_at: None,
      movies: None,
    },
    Actor {
      id: 2,
      first_name: "Meryl".to_string(),
      last_name: "Streep".to_string(),
      birth_date: "1949-06-22".to_string(),
      nationality: "American".to_string(),
      image: None,
      created_at: None,
      updated_at: None,
      movies: None,
    },
  ]
}

pub fn sample_ratings() -> Vec<Rating> {
  vec![
    Rating {
      id: 1,
      rating: 4.5,
      review: Some("Mind-bending.".to_string()),
      reviewer_name: Some("filmfan".to_string()),
      movie_id: 1,
      created_at: None,
      updated_at: None,
    },
    Rating {
      id: 2,
      rating: 5.0,
      review: None,
      reviewer_name: None,
      movie_id: 1,
      created_at: None,
      updated_at: None,
    },
    Rating {
      id: 3,
      rating: 4.0,
      review: Some("A classic.".to_string()),
      reviewer_name: Some("cinephile".to_string()),
      movie_id: 2,
      created_at: None,
      updated_at: None,
    },
  ]
}
