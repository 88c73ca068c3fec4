use serde::{Deserialize, Serialize};

/// A movie in the catalog.
///
/// The `actors` and `ratings` relations are only populated on detail
/// lookups; list endpoints return them unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
  pub id: u64,
  pub title: String,
  pub description: String,
  pub release_date: String,
  pub genre: String,
  /// Runtime in minutes
  pub duration: u32,
  pub director: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub actors: Option<Vec<Actor>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ratings: Option<Vec<Rating>>,
}

/// An actor in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
  pub id: u64,
  pub first_name: String,
  pub last_name: String,
  pub birth_date: String,
  pub nationality: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub movies: Option<Vec<Movie>>,
}

impl Actor {
  /// Full display name, "first last".
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }
}

/// A rating left on a movie.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
  pub id: u64,
  pub rating: f32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub review: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reviewer_name: Option<String>,
  pub movie_id: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
}

/// An authenticated user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: u64,
  pub name: String,
  pub email: String,
}

/// Request body for creating a movie.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovie {
  pub title: String,
  pub description: String,
  pub release_date: String,
  pub genre: String,
  pub duration: u32,
  pub director: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
}

/// Request body for updating a movie. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMovie {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub release_date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub genre: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub director: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
}

impl UpdateMovie {
  /// True if no field is set; the API rejects empty updates.
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.release_date.is_none()
      && self.genre.is_none()
      && self.duration.is_none()
      && self.director.is_none()
      && self.image.is_none()
  }
}

/// Request body for rating a movie.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRating {
  pub rating: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub review: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reviewer_name: Option<String>,
  pub movie_id: u64,
}

/// Login request body.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
  pub email: String,
  pub password: String,
}

/// Registration request body.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
  pub name: String,
  pub email: String,
  pub password: String,
}
