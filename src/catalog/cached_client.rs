//! Cached catalog client that wraps CatalogClient with transparent caching.

use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use tracing::{debug, warn};

use crate::cache::{CacheLayer, CacheStorage, MemoryStorage};

use super::api_types::AuthPayload;
use super::cache::CatalogQueryKey;
use super::client::CatalogClient;
use super::types::{
  Actor, CreateMovie, Credentials, Movie, NewRating, Rating, Registration, UpdateMovie,
};
use crate::config::Config;
use crate::session::Session;

/// Catalog client with transparent caching support.
///
/// This wraps the underlying CatalogClient and provides the same API, but
/// caches results, collapses duplicate in-flight requests, and invalidates
/// affected entries after mutations.
///
/// The backend has no offset or limit parameters, so paged and filtered
/// reads fetch the whole collection and derive their slice client-side.
/// Page and search reads never fail: any error is reported as an empty
/// result. Detail lookups and mutations propagate their errors.
pub struct CachedCatalogClient<S: CacheStorage = MemoryStorage> {
  inner: CatalogClient,
  cache: CacheLayer<S>,
}

impl CachedCatalogClient<MemoryStorage> {
  /// Create a cached catalog client with a fresh in-memory cache.
  ///
  /// Collection and relation reads stay fresh for two seconds; search
  /// keys carry their own longer window.
  pub fn new(config: &Config, session: Session) -> Result<Self> {
    let inner = CatalogClient::new(config, session)?;
    let cache = CacheLayer::new(MemoryStorage::new()).with_stale_time(Duration::seconds(2));

    Ok(Self { inner, cache })
  }
}

impl<S: CacheStorage> CachedCatalogClient<S> {
  /// Create a cached catalog client over an existing cache layer.
  pub fn with_cache(inner: CatalogClient, cache: CacheLayer<S>) -> Self {
    Self { inner, cache }
  }

  /// Get the entire movie collection with caching.
  pub async fn movies(&self) -> Result<Vec<Movie>> {
    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch_list(&CatalogQueryKey::Movies, || async move {
        inner.list_movies().await
      })
      .await?;

    debug!(
      count = result.data.len(),
      source = ?result.source,
      cached_at = ?result.cached_at,
      "movie collection read"
    );

    Ok(result.data)
  }

  /// Get one page of movies.
  ///
  /// `page_index` is 0-based. A page past the end of the collection is
  /// empty, which also signals pagers to stop. Fetch failures are logged
  /// and reported as an empty page.
  pub async fn movies_page(&self, page_index: usize, page_size: usize) -> Vec<Movie> {
    let key = CatalogQueryKey::MoviePage {
      page: page_index + 1,
      limit: page_size,
    };

    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch_list(&key, || async move {
        match inner.list_movies().await {
          Ok(all) => Ok(slice_page(&all, page_index, page_size)),
          Err(err) => {
            warn!(page = page_index + 1, error = %err, "movie page fetch failed");
            Ok(Vec::new())
          }
        }
      })
      .await;

    match result {
      Ok(cached) => cached.data,
      Err(err) => {
        warn!(page = page_index + 1, error = %err, "movie page cache error");
        Vec::new()
      }
    }
  }

  /// Search movies by title, description, genre, or director.
  ///
  /// Matching is a case-insensitive substring test. An empty or
  /// whitespace-only query returns no results without touching the
  /// network. Fetch failures are reported as an empty result.
  pub async fn search_movies(&self, query: &str) -> Vec<Movie> {
    let query = query.trim();
    if query.is_empty() {
      return Vec::new();
    }

    let key = CatalogQueryKey::MovieSearch {
      query: query.to_string(),
    };
    let needle = query.to_lowercase();
    let query = query.to_string();

    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch_list(&key, || async move {
        match inner.list_movies().await {
          Ok(all) => Ok(
            all
              .into_iter()
              .filter(|movie| movie_matches(movie, &needle))
              .collect(),
          ),
          Err(err) => {
            warn!(query = %query, error = %err, "movie search fetch failed");
            Ok(Vec::new())
          }
        }
      })
      .await;

    match result {
      Ok(cached) => cached.data,
      Err(err) => {
        warn!(error = %err, "movie search cache error");
        Vec::new()
      }
    }
  }

  /// Get a single movie by id, with its actors and ratings attached.
  ///
  /// The backend has no detail endpoint; the movie comes from the full
  /// collection. An unknown id is an error, but a failed relation fetch
  /// only leaves that relation unset.
  pub async fn movie(&self, id: u64) -> Result<Movie> {
    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch_one(&id.to_string(), || async move {
        let all = inner.list_movies().await?;
        let mut movie = all
          .into_iter()
          .find(|movie| movie.id == id)
          .ok_or_else(|| eyre!("Movie {} not found", id))?;

        let (actors, ratings) = futures::join!(inner.movie_actors(id), inner.list_ratings());

        match actors {
          Ok(actors) => movie.actors = Some(actors),
          Err(err) => warn!(movie = id, error = %err, "failed to fetch movie actors"),
        }

        match ratings {
          Ok(all_ratings) => {
            movie.ratings = Some(
              all_ratings
                .into_iter()
                .filter(|rating| rating.movie_id == id)
                .collect(),
            )
          }
          Err(err) => warn!(movie = id, error = %err, "failed to fetch movie ratings"),
        }

        Ok(movie)
      })
      .await?;

    Ok(result.data)
  }

  /// Get the actors appearing in a movie with caching.
  pub async fn movie_actors(&self, movie_id: u64) -> Result<Vec<Actor>> {
    let key = CatalogQueryKey::MovieActors { movie_id };

    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch_list(&key, || async move { inner.movie_actors(movie_id).await })
      .await?;

    Ok(result.data)
  }

  /// Get the ratings left on a movie with caching.
  ///
  /// Ratings only exist as one collection; this filters it by movie id.
  pub async fn movie_ratings(&self, movie_id: u64) -> Result<Vec<Rating>> {
    let key = CatalogQueryKey::MovieRatings { movie_id };

    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch_list(&key, || async move {
        let all = inner.list_ratings().await?;
        Ok(
          all
            .into_iter()
            .filter(|rating| rating.movie_id == movie_id)
            .collect(),
        )
      })
      .await?;

    Ok(result.data)
  }

  /// Add a movie, invalidating the cached collection.
  pub async fn create_movie(&self, movie: &CreateMovie) -> Result<Movie> {
    let created = self.inner.create_movie(movie).await?;
    self.cache.invalidate(&CatalogQueryKey::Movies)?;
    Ok(created)
  }

  /// Update a movie, invalidating the cached collection and the cached
  /// detail entry for this id.
  pub async fn update_movie(&self, id: u64, changes: &UpdateMovie) -> Result<Movie> {
    let updated = self.inner.update_movie(id, changes).await?;
    self.cache.invalidate(&CatalogQueryKey::Movies)?;
    self.cache.invalidate_entity::<Movie>(&id.to_string())?;
    Ok(updated)
  }

  /// Delete a movie, invalidating the cached collection and the cached
  /// detail entry for this id.
  pub async fn delete_movie(&self, id: u64) -> Result<()> {
    self.inner.delete_movie(id).await?;
    self.cache.invalidate(&CatalogQueryKey::Movies)?;
    self.cache.invalidate_entity::<Movie>(&id.to_string())?;
    Ok(())
  }

  /// Get the entire actor collection with caching.
  pub async fn actors(&self) -> Result<Vec<Actor>> {
    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch_list(&CatalogQueryKey::Actors, || async move {
        inner.list_actors().await
      })
      .await?;

    Ok(result.data)
  }

  /// Get one page of actors. Same slicing and error handling as
  /// [`movies_page`].
  ///
  /// [`movies_page`]: CachedCatalogClient::movies_page
  pub async fn actors_page(&self, page_index: usize, page_size: usize) -> Vec<Actor> {
    let key = CatalogQueryKey::ActorPage {
      page: page_index + 1,
      limit: page_size,
    };

    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch_list(&key, || async move {
        match inner.list_actors().await {
          Ok(all) => Ok(slice_page(&all, page_index, page_size)),
          Err(err) => {
            warn!(page = page_index + 1, error = %err, "actor page fetch failed");
            Ok(Vec::new())
          }
        }
      })
      .await;

    match result {
      Ok(cached) => cached.data,
      Err(err) => {
        warn!(page = page_index + 1, error = %err, "actor page cache error");
        Vec::new()
      }
    }
  }

  /// Search actors by name or nationality.
  ///
  /// The name test runs against "first last", so queries can span the
  /// name boundary. Same query handling as [`search_movies`].
  ///
  /// [`search_movies`]: CachedCatalogClient::search_movies
  pub async fn search_actors(&self, query: &str) -> Vec<Actor> {
    let query = query.trim();
    if query.is_empty() {
      return Vec::new();
    }

    let key = CatalogQueryKey::ActorSearch {
      query: query.to_string(),
    };
    let needle = query.to_lowercase();
    let query = query.to_string();

    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch_list(&key, || async move {
        match inner.list_actors().await {
          Ok(all) => Ok(
            all
              .into_iter()
              .filter(|actor| actor_matches(actor, &needle))
              .collect(),
          ),
          Err(err) => {
            warn!(query = %query, error = %err, "actor search fetch failed");
            Ok(Vec::new())
          }
        }
      })
      .await;

    match result {
      Ok(cached) => cached.data,
      Err(err) => {
        warn!(error = %err, "actor search cache error");
        Vec::new()
      }
    }
  }

  /// Get a single actor by id, with their movies attached.
  ///
  /// Same semantics as [`movie`]: unknown ids are errors, a failed
  /// relation fetch leaves the relation unset.
  ///
  /// [`movie`]: CachedCatalogClient::movie
  pub async fn actor(&self, id: u64) -> Result<Actor> {
    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch_one(&id.to_string(), || async move {
        let all = inner.list_actors().await?;
        let mut actor = all
          .into_iter()
          .find(|actor| actor.id == id)
          .ok_or_else(|| eyre!("Actor {} not found", id))?;

        match inner.actor_movies(id).await {
          Ok(movies) => actor.movies = Some(movies),
          Err(err) => warn!(actor = id, error = %err, "failed to fetch actor movies"),
        }

        Ok(actor)
      })
      .await?;

    Ok(result.data)
  }

  /// Get the movies an actor appeared in with caching.
  pub async fn actor_movies(&self, actor_id: u64) -> Result<Vec<Movie>> {
    let key = CatalogQueryKey::ActorMovies { actor_id };

    let inner = self.inner.clone();
    let result = self
      .cache
      .fetch_list(&key, || async move { inner.actor_movies(actor_id).await })
      .await?;

    Ok(result.data)
  }

  /// Leave a rating on a movie (no cache invalidation; rating reads pick
  /// it up once their entries expire).
  pub async fn add_rating(&self, rating: &NewRating) -> Result<Rating> {
    self.inner.add_rating(rating).await
  }

  /// Sign in (not cached - writes the session).
  pub async fn login(&self, credentials: &Credentials) -> Result<AuthPayload> {
    self.inner.login(credentials).await
  }

  /// Create an account and sign in (not cached - writes the session).
  pub async fn register(&self, registration: &Registration) -> Result<AuthPayload> {
    self.inner.register(registration).await
  }
}

impl<S: CacheStorage> Clone for CachedCatalogClient<S> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      cache: self.cache.clone(),
    }
  }
}

/// Slice one page out of a full collection.
fn slice_page<T: Clone>(items: &[T], page_index: usize, page_size: usize) -> Vec<T> {
  let start = page_index.saturating_mul(page_size);
  if start >= items.len() {
    return Vec::new();
  }
  let end = start.saturating_add(page_size).min(items.len());
  items[start..end].to_vec()
}

/// Case-insensitive substring match over a movie's searchable fields.
/// `needle` must already be lowercased.
fn movie_matches(movie: &Movie, needle: &str) -> bool {
  movie.title.to_lowercase().contains(needle)
    || movie.description.to_lowercase().contains(needle)
    || movie.genre.to_lowercase().contains(needle)
    || movie.director.to_lowercase().contains(needle)
}

/// Case-insensitive substring match over an actor's full name and
/// nationality. `needle` must already be lowercased.
fn actor_matches(actor: &Actor, needle: &str) -> bool {
  actor.full_name().to_lowercase().contains(needle) || actor.nationality.to_lowercase().contains(needle)
}
