//! Cursor-driven pagination as an async stream of pages.
//!
//! The upstream APIs do not report totals or "has more" flags, so a page
//! shorter than the requested size is taken to be the last one.

use std::future::Future;
use std::time::Duration;

use futures::stream::{self, Stream};

use crate::error::UpstreamError;

/// Hard ceiling on pages per run; guards against cursors that never advance.
pub const MAX_PAGES: usize = 1000;

#[derive(Debug, Clone)]
pub struct PageOptions<C> {
    pub page_size: u32,
    /// Cursor to resume after; `None` starts from the beginning.
    pub start: Option<C>,
    /// Pause between consecutive page requests (not before the first).
    pub page_delay: Duration,
    pub max_pages: usize,
}

impl<C> PageOptions<C> {
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            start: None,
            page_delay: Duration::from_millis(300),
            max_pages: MAX_PAGES,
        }
    }

    #[must_use]
    pub fn starting_after(mut self, cursor: Option<C>) -> Self {
        self.start = cursor;
        self
    }

    #[must_use]
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }
}

struct Cursor<C> {
    next: Option<C>,
    fetched: usize,
}

/// Streams pages produced by `fetch(cursor, page_size)` until a short or
/// empty page arrives or `next_cursor` returns `None`.
///
/// Empty pages are never yielded. Errors from `fetch` end the stream after
/// being yielded once. Fetching more than `max_pages` pages yields
/// [`UpstreamError::PaginationLimit`].
pub fn paginate<'a, T, C, F, Fut, N>(
    options: PageOptions<C>,
    mut fetch: F,
    next_cursor: N,
) -> impl Stream<Item = Result<Vec<T>, UpstreamError>> + 'a
where
    T: 'a,
    C: Clone + 'a,
    F: FnMut(Option<C>, u32) -> Fut + 'a,
    Fut: Future<Output = Result<Vec<T>, UpstreamError>> + 'a,
    N: Fn(&[T]) -> Option<C> + Clone + 'a,
{
    let PageOptions {
        page_size,
        start,
        page_delay,
        max_pages,
    } = options;
    let page_len = usize::try_from(page_size).unwrap_or(usize::MAX);

    let initial = Some(Cursor {
        next: start,
        fetched: 0,
    });

    stream::try_unfold(initial, move |state: Option<Cursor<C>>| {
        let request = match state {
            None => None,
            Some(cursor) if cursor.fetched >= max_pages => {
                Some(Err(UpstreamError::PaginationLimit { max_pages }))
            }
            Some(cursor) => Some(Ok((fetch(cursor.next, page_size), cursor.fetched))),
        };
        let next_cursor = next_cursor.clone();

        async move {
            let (page_future, fetched) = match request {
                None => return Ok(None),
                Some(request) => request?,
            };

            if fetched > 0 && !page_delay.is_zero() {
                tokio::time::sleep(page_delay).await;
            }

            let page = page_future.await?;
            tracing::debug!(page = fetched + 1, items = page.len(), "fetched page");
            if page.is_empty() {
                return Ok(None);
            }

            let following = if page.len() < page_len {
                None
            } else {
                next_cursor(&page).map(|next| Cursor {
                    next: Some(next),
                    fetched: fetched + 1,
                })
            };
            Ok(Some((page, following)))
        }
    })
}
