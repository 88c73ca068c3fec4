//! Paging and input debouncing primitives for catalog queries.
//!
//! The pager follows the infinite-loading convention of web data libraries:
//! pages are fetched in ascending order and an empty page marks the end of
//! the collection. A page that is merely short does not stop the sequence,
//! since a collection whose size is an exact multiple of the page size only
//! reveals its end through one final empty fetch.
//!
//! The debouncer collapses bursts of input into one committed query after a
//! quiet window, so that typing does not issue a fetch per keystroke.
//!
//! # Example
//!
//! ```ignore
//! let mut pager = Pager::new();
//! while let Some(index) = pager.next_index() {
//!     let page = client.movies_page(index, page_size).await;
//!     pager.record_page(page.len());
//!     render(&page);
//! }
//! ```

use std::time::Duration;
use tokio::sync::mpsc;

/// Quiet window between keystrokes before a search query commits.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Sequences 0-based page indexes until the collection is exhausted.
#[derive(Debug, Default)]
pub struct Pager {
  index: usize,
  done: bool,
}

impl Pager {
  pub fn new() -> Self {
    Self::default()
  }

  /// The next page index to fetch, or None once an empty page marked the
  /// collection exhausted. Repeated calls return the same index until the
  /// fetched page is recorded.
  pub fn next_index(&self) -> Option<usize> {
    if self.done {
      None
    } else {
      Some(self.index)
    }
  }

  /// Record the length of the page just fetched. An empty page ends the
  /// sequence; any non-empty page, even a short one, advances it.
  pub fn record_page(&mut self, len: usize) {
    if len == 0 {
      self.done = true;
    } else {
      self.index += 1;
    }
  }
}

/// Input half of a debounced query stream.
///
/// Feed raw input through [`input`]; the latest value is committed to the
/// paired [`DebouncedQueries`] once no newer input arrives for the quiet
/// window. Dropping the `Debouncer` flushes any pending value immediately
/// and ends the stream.
///
/// [`input`]: Debouncer::input
pub struct Debouncer {
  tx: mpsc::UnboundedSender<String>,
}

/// Output half of a debounced query stream.
pub struct DebouncedQueries {
  rx: mpsc::UnboundedReceiver<String>,
}

impl Debouncer {
  /// Create a debouncer with the given quiet window.
  pub fn new(window: Duration) -> (Self, DebouncedQueries) {
    let (tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let (committed_tx, committed_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
      while let Some(first) = input_rx.recv().await {
        let mut current = first;
        let sleep = tokio::time::sleep(window);
        tokio::pin!(sleep);

        loop {
          tokio::select! {
            _ = &mut sleep => {
              if committed_tx.send(current).is_err() {
                return;
              }
              break;
            }
            next = input_rx.recv() => match next {
              Some(value) => {
                current = value;
                sleep.as_mut().reset(tokio::time::Instant::now() + window);
              }
              None => {
                // Input closed with a value pending: flush it.
                let _ = committed_tx.send(current);
                return;
              }
            }
          }
        }
      }
    });

    (Self { tx }, DebouncedQueries { rx: committed_rx })
  }

  /// Feed one input value, restarting the quiet window.
  pub fn input(&self, value: impl Into<String>) {
    let _ = self.tx.send(value.into());
  }
}

impl DebouncedQueries {
  /// The next committed query, or None once the input half is gone and
  /// everything pending was delivered.
  pub async fn next(&mut self) -> Option<String> {
    self.rx.recv().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pager_walks_pages_in_order() {
    let mut pager = Pager::new();
    let mut seen = Vec::new();

    for len in [10, 10, 3, 0] {
      let index = pager.next_index().unwrap();
      seen.push(index);
      pager.record_page(len);
    }

    assert_eq!(seen, vec![0, 1, 2, 3]);
    assert_eq!(pager.next_index(), None);
  }

  #[test]
  fn test_pager_continues_after_short_page() {
    let mut pager = Pager::new();

    pager.record_page(3);

    assert_eq!(pager.next_index(), Some(1));
  }

  #[test]
  fn test_pager_repeats_index_until_page_recorded() {
    let pager = Pager::new();

    assert_eq!(pager.next_index(), Some(0));
    assert_eq!(pager.next_index(), Some(0));
  }

  #[tokio::test]
  async fn test_debouncer_collapses_rapid_inputs() {
    let (debouncer, mut committed) = Debouncer::new(Duration::from_millis(50));

    debouncer.input("i");
    debouncer.input("in");
    debouncer.input("inc");

    assert_eq!(committed.next().await.as_deref(), Some("inc"));

    debouncer.input("incep");
    assert_eq!(committed.next().await.as_deref(), Some("incep"));
  }

  #[tokio::test]
  async fn test_debouncer_commits_separated_inputs() {
    let (debouncer, mut committed) = Debouncer::new(Duration::from_millis(30));

    debouncer.input("first");
    tokio::time::sleep(Duration::from_millis(80)).await;
    debouncer.input("second");

    assert_eq!(committed.next().await.as_deref(), Some("first"));
    assert_eq!(committed.next().await.as_deref(), Some("second"));
  }

  #[tokio::test]
  async fn test_debouncer_flushes_pending_on_drop() {
    let (debouncer, mut committed) = Debouncer::new(Duration::from_secs(60));

    debouncer.input("typed");
    debouncer.input("typed more");
    drop(debouncer);

    // The pending value arrives without waiting out the window.
    assert_eq!(committed.next().await.as_deref(), Some("typed more"));
    assert_eq!(committed.next().await, None);
  }

  #[tokio::test]
  async fn test_debouncer_closes_cleanly_without_pending() {
    let (debouncer, mut committed) = Debouncer::new(Duration::from_millis(10));

    drop(debouncer);

    assert_eq!(committed.next().await, None);
  }
}
