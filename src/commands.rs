//! CLI commands and their handlers.

use std::io::{self, BufRead};

use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use tokio::sync::mpsc;
use tracing::info;

use crate::cache::CacheStorage;
use crate::catalog::types::{
  Actor, CreateMovie, Credentials, Movie, NewRating, Rating, Registration, UpdateMovie,
};
use crate::catalog::CachedCatalogClient;
use crate::config::Config;
use crate::query::{Debouncer, Pager, SEARCH_DEBOUNCE};
use crate::session::Session;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Browse and manage the movie catalog
  Movies {
    #[command(subcommand)]
    action: MovieAction,
  },

  /// Browse actors
  Actors {
    #[command(subcommand)]
    action: ActorAction,
  },

  /// Read and leave ratings
  Ratings {
    #[command(subcommand)]
    action: RatingAction,
  },

  /// Sign in to the catalog
  Login {
    /// Account email
    #[arg(short, long)]
    email: String,

    /// Password (falls back to the REEL_PASSWORD environment variable)
    #[arg(short, long)]
    password: Option<String>,
  },

  /// Create an account and sign in
  Register {
    /// Display name
    #[arg(short, long)]
    name: String,

    /// Account email
    #[arg(short, long)]
    email: String,

    /// Password (falls back to the REEL_PASSWORD environment variable)
    #[arg(short, long)]
    password: Option<String>,
  },

  /// Sign out and clear the stored session
  Logout,

  /// Show the signed-in user
  Whoami,
}

#[derive(Subcommand, Debug)]
pub enum MovieAction {
  /// List movies
  List {
    /// 1-based page to show (default: the whole catalog)
    #[arg(short, long)]
    page: Option<usize>,

    /// Walk the catalog page by page to the end
    #[arg(long, conflicts_with = "page")]
    all: bool,
  },

  /// Search movies by title, description, genre, or director
  Search {
    /// Search text
    #[arg(required_unless_present = "interactive")]
    query: Option<String>,

    /// Read queries from stdin, debounced while you type
    #[arg(short, long, conflicts_with = "query")]
    interactive: bool,
  },

  /// Show one movie with its cast and ratings
  Show {
    /// Movie id
    id: u64,
  },

  /// Add a movie to the catalog
  Add {
    #[arg(long)]
    title: String,

    #[arg(long)]
    description: String,

    /// Release date, YYYY-MM-DD
    #[arg(long)]
    release_date: String,

    #[arg(long)]
    genre: String,

    /// Runtime in minutes
    #[arg(long)]
    duration: u32,

    #[arg(long)]
    director: String,

    /// Poster image URL
    #[arg(long = "image-url")]
    image: Option<String>,
  },

  /// Update fields on a movie
  Update {
    /// Movie id
    id: u64,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// Release date, YYYY-MM-DD
    #[arg(long)]
    release_date: Option<String>,

    #[arg(long)]
    genre: Option<String>,

    /// Runtime in minutes
    #[arg(long)]
    duration: Option<u32>,

    #[arg(long)]
    director: Option<String>,

    /// Poster image URL
    #[arg(long = "image-url")]
    image: Option<String>,
  },

  /// Delete a movie
  Delete {
    /// Movie id
    id: u64,
  },
}

#[derive(Subcommand, Debug)]
pub enum ActorAction {
  /// List actors
  List {
    /// 1-based page to show (default: every actor)
    #[arg(short, long)]
    page: Option<usize>,

    /// Walk the collection page by page to the end
    #[arg(long, conflicts_with = "page")]
    all: bool,
  },

  /// Search actors by name or nationality
  Search {
    /// Search text
    #[arg(required_unless_present = "interactive")]
    query: Option<String>,

    /// Read queries from stdin, debounced while you type
    #[arg(short, long, conflicts_with = "query")]
    interactive: bool,
  },

  /// Show one actor with their filmography
  Show {
    /// Actor id
    id: u64,
  },
}

#[derive(Subcommand, Debug)]
pub enum RatingAction {
  /// List the ratings on a movie
  List {
    /// Movie id
    movie_id: u64,
  },

  /// Rate a movie
  Add {
    /// Movie id
    movie_id: u64,

    /// Score from 0 to 5
    #[arg(short, long)]
    rating: f32,

    /// Review text shown with the score
    #[arg(long)]
    review: Option<String>,

    /// Name shown with the review
    #[arg(long)]
    reviewer: Option<String>,
  },
}

/// Execute one CLI command against the catalog.
pub async fn run<S: CacheStorage + 'static>(
  command: Command,
  client: &CachedCatalogClient<S>,
  session: &Session,
  page_size: usize,
) -> Result<()> {
  let mut auth_changes = session.subscribe();

  let outcome = dispatch(command, client, session, page_size).await;

  // Record session transitions caused by this command (login, register,
  // logout).
  if auth_changes.has_changed().unwrap_or(false) {
    let state = auth_changes.borrow_and_update();
    if state.authenticated {
      if let Some(user) = &state.user {
        info!(user = %user.email, "session changed: signed in");
      }
    } else {
      info!("session changed: signed out");
    }
  }

  outcome
}

async fn dispatch<S: CacheStorage + 'static>(
  command: Command,
  client: &CachedCatalogClient<S>,
  session: &Session,
  page_size: usize,
) -> Result<()> {
  match command {
    Command::Movies { action } => match action {
      MovieAction::List { page, all } => list_movies(client, page, all, page_size).await,

      MovieAction::Search { query, interactive } => {
        if interactive {
          let client = client.clone();
          interactive_search(
            "movies",
            move |query| {
              let client = client.clone();
              async move { client.search_movies(&query).await }
            },
            movie_row,
          )
          .await
        } else {
          let query = query.ok_or_else(|| eyre!("Provide a search query or use --interactive"))?;
          let movies = client.search_movies(&query).await;
          if movies.is_empty() {
            println!("No movies match \"{}\"", query.trim());
          } else {
            print_movie_table(&movies);
          }
          Ok(())
        }
      }

      MovieAction::Show { id } => show_movie(client, id).await,

      MovieAction::Add {
        title,
        description,
        release_date,
        genre,
        duration,
        director,
        image,
      } => {
        let movie = client
          .create_movie(&CreateMovie {
            title,
            description,
            release_date,
            genre,
            duration,
            director,
            image,
          })
          .await?;
        println!("Added movie {} ({})", movie.id, movie.title);
        Ok(())
      }

      MovieAction::Update {
        id,
        title,
        description,
        release_date,
        genre,
        duration,
        director,
        image,
      } => {
        let changes = UpdateMovie {
          title,
          description,
          release_date,
          genre,
          duration,
          director,
          image,
        };
        if changes.is_empty() {
          return Err(eyre!("Nothing to update: pass at least one field"));
        }
        let movie = client.update_movie(id, &changes).await?;
        println!("Updated movie {} ({})", movie.id, movie.title);
        Ok(())
      }

      MovieAction::Delete { id } => {
        client.delete_movie(id).await?;
        println!("Deleted movie {}", id);
        Ok(())
      }
    },

    Command::Actors { action } => match action {
      ActorAction::List { page, all } => list_actors(client, page, all, page_size).await,

      ActorAction::Search { query, interactive } => {
        if interactive {
          let client = client.clone();
          interactive_search(
            "actors",
            move |query| {
              let client = client.clone();
              async move { client.search_actors(&query).await }
            },
            actor_row,
          )
          .await
        } else {
          let query = query.ok_or_else(|| eyre!("Provide a search query or use --interactive"))?;
          let actors = client.search_actors(&query).await;
          if actors.is_empty() {
            println!("No actors match \"{}\"", query.trim());
          } else {
            print_actor_table(&actors);
          }
          Ok(())
        }
      }

      ActorAction::Show { id } => show_actor(client, id).await,
    },

    Command::Ratings { action } => match action {
      RatingAction::List { movie_id } => {
        let ratings = client.movie_ratings(movie_id).await?;
        match average_rating(&ratings) {
          Some(average) => {
            println!(
              "Movie {} holds {:.1}/5 from {}",
              movie_id,
              average,
              plural(ratings.len(), "rating")
            );
            print_ratings(&ratings);
          }
          None => println!("No ratings for movie {}", movie_id),
        }
        Ok(())
      }

      RatingAction::Add {
        movie_id,
        rating,
        review,
        reviewer,
      } => {
        if !(0.0..=5.0).contains(&rating) {
          return Err(eyre!("Rating must be between 0 and 5"));
        }
        let saved = client
          .add_rating(&NewRating {
            rating,
            review,
            reviewer_name: reviewer,
            movie_id,
          })
          .await?;
        println!("Rated movie {} at {:.1}/5", saved.movie_id, saved.rating);
        Ok(())
      }
    },

    Command::Login { email, password } => {
      let password = match password {
        Some(password) => password,
        None => Config::get_password()?,
      };
      let payload = client.login(&Credentials { email, password }).await?;
      println!("Signed in as {} <{}>", payload.user.name, payload.user.email);
      Ok(())
    }

    Command::Register {
      name,
      email,
      password,
    } => {
      let password = match password {
        Some(password) => password,
        None => Config::get_password()?,
      };
      let payload = client
        .register(&Registration {
          name,
          email,
          password,
        })
        .await?;
      println!(
        "Account created; signed in as {} <{}>",
        payload.user.name, payload.user.email
      );
      Ok(())
    }

    Command::Logout => {
      if !session.is_authenticated() {
        println!("Not signed in");
        return Ok(());
      }
      session.sign_out()?;
      println!("Signed out");
      Ok(())
    }

    Command::Whoami => {
      match session.current_user() {
        Some(user) => println!("{} <{}>", user.name, user.email),
        None => println!("Not signed in"),
      }
      Ok(())
    }
  }
}

/// Print movie pages. Without a page this shows the whole catalog; with
/// `--all` it walks page by page until an empty page ends the
/// collection.
async fn list_movies<S: CacheStorage>(
  client: &CachedCatalogClient<S>,
  page: Option<usize>,
  all: bool,
  page_size: usize,
) -> Result<()> {
  if all {
    let mut pager = Pager::new();
    let mut total = 0;
    print_movie_header();
    while let Some(index) = pager.next_index() {
      let movies = client.movies_page(index, page_size).await;
      pager.record_page(movies.len());
      total += movies.len();
      for movie in &movies {
        println!("{}", movie_row(movie));
      }
    }
    println!("{}", plural(total, "movie"));
    return Ok(());
  }

  match page {
    Some(0) => Err(eyre!("Pages are numbered from 1")),
    Some(page) => {
      let movies = client.movies_page(page - 1, page_size).await;
      if movies.is_empty() {
        println!("No movies on page {}", page);
      } else {
        print_movie_table(&movies);
      }
      Ok(())
    }
    None => {
      let movies = client.movies().await?;
      if movies.is_empty() {
        println!("The catalog has no movies yet");
      } else {
        print_movie_table(&movies);
        println!("{}", plural(movies.len(), "movie"));
      }
      Ok(())
    }
  }
}

async fn list_actors<S: CacheStorage>(
  client: &CachedCatalogClient<S>,
  page: Option<usize>,
  all: bool,
  page_size: usize,
) -> Result<()> {
  if all {
    let mut pager = Pager::new();
    let mut total = 0;
    print_actor_header();
    while let Some(index) = pager.next_index() {
      let actors = client.actors_page(index, page_size).await;
      pager.record_page(actors.len());
      total += actors.len();
      for actor in &actors {
        println!("{}", actor_row(actor));
      }
    }
    println!("{}", plural(total, "actor"));
    return Ok(());
  }

  match page {
    Some(0) => Err(eyre!("Pages are numbered from 1")),
    Some(page) => {
      let actors = client.actors_page(page - 1, page_size).await;
      if actors.is_empty() {
        println!("No actors on page {}", page);
      } else {
        print_actor_table(&actors);
      }
      Ok(())
    }
    None => {
      let actors = client.actors().await?;
      if actors.is_empty() {
        println!("No actors in the catalog yet");
      } else {
        print_actor_table(&actors);
        println!("{}", plural(actors.len(), "actor"));
      }
      Ok(())
    }
  }
}

async fn show_movie<S: CacheStorage>(client: &CachedCatalogClient<S>, id: u64) -> Result<()> {
  let movie = client.movie(id).await?;

  println!("{} ({})", movie.title, movie.release_date);
  println!("{}", movie.description);
  println!(
    "Genre: {}  Runtime: {} min  Directed by {}",
    movie.genre, movie.duration, movie.director
  );

  if let Some(actors) = &movie.actors {
    println!();
    println!("Cast:");
    for actor in actors {
      println!("  {} ({})", actor.full_name(), actor.nationality);
    }
  }

  if let Some(ratings) = &movie.ratings {
    println!();
    match average_rating(ratings) {
      Some(average) => {
        println!(
          "Rated {:.1}/5 from {}:",
          average,
          plural(ratings.len(), "rating")
        );
        print_ratings(ratings);
      }
      None => println!("No ratings yet"),
    }
  }

  Ok(())
}

async fn show_actor<S: CacheStorage>(client: &CachedCatalogClient<S>, id: u64) -> Result<()> {
  let actor = client.actor(id).await?;

  println!("{} ({})", actor.full_name(), actor.nationality);
  println!("Born {}", actor.birth_date);

  if let Some(movies) = &actor.movies {
    println!();
    println!("Appears in:");
    for movie in movies {
      println!("  {} ({})", movie.title, movie.release_date);
    }
  }

  Ok(())
}

/// Debounced interactive search loop shared by movies and actors.
///
/// Each stdin line is a query edit. Edits are debounced before they
/// reach `search`, and a reply is only printed while its query is still
/// the latest one committed, so a slow response for an old query never
/// overwrites a newer result.
async fn interactive_search<T, F, Fut>(noun: &str, search: F, row: fn(&T) -> String) -> Result<()>
where
  T: Send + 'static,
  F: Fn(String) -> Fut + Send + 'static,
  Fut: std::future::Future<Output = Vec<T>> + Send + 'static,
{
  let (debouncer, mut queries) = Debouncer::new(SEARCH_DEBOUNCE);

  // Stdin is read on its own thread; dropping the debouncer at EOF
  // flushes the pending query and ends the committed stream.
  std::thread::spawn(move || {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
      let Ok(line) = line else { break };
      debouncer.input(line);
    }
  });

  println!("Type to search {} (Enter commits an edit, Ctrl-D quits)", noun);

  let (results_tx, mut results_rx) = mpsc::unbounded_channel::<(u64, String, Vec<T>)>();
  let mut latest: u64 = 0;
  let mut in_flight: usize = 0;
  let mut inputs_done = false;

  loop {
    tokio::select! {
      committed = queries.next(), if !inputs_done => {
        match committed {
          Some(query) => {
            latest += 1;
            in_flight += 1;
            let sequence = latest;
            let results_tx = results_tx.clone();
            let results = search(query.clone());
            tokio::spawn(async move {
              let _ = results_tx.send((sequence, query, results.await));
            });
          }
          None => inputs_done = true,
        }
      }
      Some((sequence, query, results)) = results_rx.recv(), if in_flight > 0 => {
        in_flight -= 1;
        // Replies for superseded queries are dropped.
        if sequence == latest && !query.trim().is_empty() {
          if results.is_empty() {
            println!("No {} match \"{}\"", noun, query.trim());
          } else {
            for item in &results {
              println!("{}", row(item));
            }
            println!("{} for \"{}\"", plural(results.len(), "result"), query.trim());
          }
        }
      }
      else => break,
    }
  }

  Ok(())
}

fn print_movie_header() {
  println!(
    "{:>4}  {:<30}  {:<12}  {:<20}  RUNTIME",
    "ID", "TITLE", "GENRE", "DIRECTOR"
  );
}

fn print_movie_table(movies: &[Movie]) {
  print_movie_header();
  for movie in movies {
    println!("{}", movie_row(movie));
  }
}

/// Column layout shared by every movie listing.
fn movie_row(movie: &Movie) -> String {
  format!(
    "{:>4}  {:<30}  {:<12}  {:<20}  {:>3} min",
    movie.id,
    truncate(&movie.title, 30),
    truncate(&movie.genre, 12),
    truncate(&movie.director, 20),
    movie.duration
  )
}

fn print_actor_header() {
  println!("{:>4}  {:<28}  {:<16}  BORN", "ID", "NAME", "NATIONALITY");
}

fn print_actor_table(actors: &[Actor]) {
  print_actor_header();
  for actor in actors {
    println!("{}", actor_row(actor));
  }
}

fn actor_row(actor: &Actor) -> String {
  format!(
    "{:>4}  {:<28}  {:<16}  {}",
    actor.id,
    truncate(&actor.full_name(), 28),
    truncate(&actor.nationality, 16),
    actor.birth_date
  )
}

fn print_ratings(ratings: &[Rating]) {
  for rating in ratings {
    let reviewer = rating.reviewer_name.as_deref().unwrap_or("anonymous");
    match &rating.review {
      Some(review) => println!(
        "  {:.1}/5 by {}: {}",
        rating.rating,
        reviewer,
        truncate(review, 60)
      ),
      None => println!("  {:.1}/5 by {}", rating.rating, reviewer),
    }
  }
}

/// Mean of the rating scores, `None` for an empty list.
fn average_rating(ratings: &[Rating]) -> Option<f32> {
  if ratings.is_empty() {
    return None;
  }
  Some(ratings.iter().map(|r| r.rating).sum::<f32>() / ratings.len() as f32)
}

fn plural(count: usize, noun: &str) -> String {
  if count == 1 {
    format!("{} {}", count, noun)
  } else {
    format!("{} {}s", count, noun)
  }
}

/// Truncate a string to a maximum length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testsupport::{make_movie, sample_ratings};

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte_string() {
    assert_eq!(truncate("Amélie à Montmartre", 10), "Amélie ...");
  }

  #[test]
  fn test_average_rating() {
    let ratings = sample_ratings();
    let average = average_rating(&ratings).unwrap();
    assert!((average - 4.5).abs() < f32::EPSILON);
  }

  #[test]
  fn test_average_rating_empty() {
    assert!(average_rating(&[]).is_none());
  }

  #[test]
  fn test_plural() {
    assert_eq!(plural(1, "movie"), "1 movie");
    assert_eq!(plural(3, "movie"), "3 movies");
  }

  #[test]
  fn test_movie_row_truncates_long_titles() {
    let movie = make_movie(
      7,
      "A Very Long Movie Title That Does Not Fit In The Column",
      "Drama",
      "Someone",
    );
    let row = movie_row(&movie);

    assert!(row.starts_with("   7"));
    assert!(row.contains("..."));
  }
}
