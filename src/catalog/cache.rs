//! Caching implementations for catalog types.

use chrono::Duration;
use sha2::{Digest, Sha256};

use crate::cache::{Cacheable, QueryKey};

use super::types::{Actor, Movie, Rating};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Movie {
  fn cache_key(&self) -> String {
    self.id.to_string()
  }

  fn entity_type() -> &'static str {
    "movie"
  }
}

impl Cacheable for Actor {
  fn cache_key(&self) -> String {
    self.id.to_string()
  }

  fn entity_type() -> &'static str {
    "actor"
  }
}

impl Cacheable for Rating {
  fn cache_key(&self) -> String {
    self.id.to_string()
  }

  fn entity_type() -> &'static str {
    "rating"
  }
}

// ============================================================================
// Query key types
// ============================================================================

/// Query key types for catalog API calls.
///
/// Page numbers are 1-based here, matching what the key text shows in logs.
/// Search keys hash the query text verbatim, so queries differing in case or
/// whitespace cache separately.
#[derive(Clone, Debug)]
pub enum CatalogQueryKey {
  /// The entire movie collection
  Movies,
  /// The entire actor collection
  Actors,
  /// One page of movies
  MoviePage { page: usize, limit: usize },
  /// Movie search results for a query string
  MovieSearch { query: String },
  /// Actors appearing in a movie
  MovieActors { movie_id: u64 },
  /// Ratings left on a movie
  MovieRatings { movie_id: u64 },
  /// One page of actors
  ActorPage { page: usize, limit: usize },
  /// Actor search results for a query string
  ActorSearch { query: String },
  /// Movies an actor appeared in
  ActorMovies { actor_id: u64 },
}

impl QueryKey for CatalogQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::Movies => "movies".to_string(),
      Self::Actors => "actors".to_string(),
      Self::MoviePage { page, limit } => format!("movies-page-{}:{}", page, limit),
      Self::MovieSearch { query } => format!("movie-search-{}", query),
      Self::MovieActors { movie_id } => format!("movie-actors-{}", movie_id),
      Self::MovieRatings { movie_id } => format!("movie-ratings-{}", movie_id),
      Self::ActorPage { page, limit } => format!("actors-page-{}:{}", page, limit),
      Self::ActorSearch { query } => format!("actor-search-{}", query),
      Self::ActorMovies { actor_id } => format!("actor-movies-{}", actor_id),
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
  }

  fn description(&self) -> String {
    match self {
      Self::Movies => "all movies".to_string(),
      Self::Actors => "all actors".to_string(),
      Self::MoviePage { page, limit } => format!("movies page {} (limit {})", page, limit),
      Self::MovieSearch { query } => format!("movie search '{}'", query),
      Self::MovieActors { movie_id } => format!("actors of movie {}", movie_id),
      Self::MovieRatings { movie_id } => format!("ratings of movie {}", movie_id),
      Self::ActorPage { page, limit } => format!("actors page {} (limit {})", page, limit),
      Self::ActorSearch { query } => format!("actor search '{}'", query),
      Self::ActorMovies { actor_id } => format!("movies of actor {}", actor_id),
    }
  }

  fn stale_time(&self) -> Option<Duration> {
    match self {
      // Repeats of a search within this window are served from cache.
      Self::MovieSearch { .. } | Self::ActorSearch { .. } => Some(Duration::seconds(10)),
      _ => None,
    }
  }
}
