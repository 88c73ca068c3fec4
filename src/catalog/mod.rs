//! Client for the movie catalog REST API.
//!
//! The plain [`CatalogClient`] maps one method to one endpoint. The
//! [`CachedCatalogClient`] wraps it with the caching, pagination, search,
//! and invalidation behavior the rest of the application uses.

mod api_types;
mod cache;
mod cached_client;
mod client;
pub mod types;

pub use api_types::AuthPayload;
pub use cache::CatalogQueryKey;
pub use cached_client::CachedCatalogClient;
pub use client::CatalogClient;
