//! Push-side input for search text.

use futures::stream::{BoxStream, StreamExt};
use tokio::sync::mpsc;

/// Stream of raw search terms fed by a [`SearchInput`].
pub type SearchTerms = BoxStream<'static, String>;

/// Handle that pushes search text into a [`SearchTerms`] stream.
///
/// Dropping every clone of the handle ends the term stream.
#[derive(Debug, Clone)]
pub struct SearchInput {
    tx: mpsc::UnboundedSender<String>,
}

impl SearchInput {
    pub fn new() -> (Self, SearchTerms) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let terms = async_stream::stream! {
            while let Some(term) = rx.recv().await {
                yield term;
            }
        };
        (Self { tx }, terms.boxed())
    }

    /// Push new search text. Returns `false` once the term stream is gone.
    pub fn set(&self, text: impl Into<String>) -> bool {
        self.tx.send(text.into()).is_ok()
    }
}
