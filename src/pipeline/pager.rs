//! Marker Pager
//!
//! Follows marker-based pagination: the identifier of the last item of a
//! page is sent back as `marker` to get the next page. Pages are fetched
//! strictly one after another since each cursor depends on the previous
//! page.

use super::path::{lookup, type_name};
use super::query::QueryFilter;
use super::Transport;
use crate::config::DEFAULT_MAX_PAGES;
use crate::error::{Error, Result};
use futures::stream::{self, Stream, TryStreamExt};
use serde_json::Value;
use std::collections::HashSet;

/// A GET list request: service, path and filter
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub service: String,
    pub path: String,
    pub filter: QueryFilter,
}

impl ListRequest {
    pub fn get(service: &str, path: &str) -> Self {
        Self {
            service: service.to_string(),
            path: path.to_string(),
            filter: QueryFilter::new(),
        }
    }

    pub fn query(mut self, filter: QueryFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Where the next cursor lives in a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorLocator {
    /// Path inside the last item of the page, e.g. `id`
    LastItem(String),
    /// Path from the page root, e.g. `page_info.next_marker`
    Page(String),
}

/// Pagination settings for one kind of list endpoint
#[derive(Debug, Clone)]
pub struct MarkerPager {
    items_field: String,
    cursor: CursorLocator,
    marker_param: String,
    page_size: Option<(String, usize)>,
    max_pages: usize,
}

#[derive(Debug, Default)]
struct PageState {
    marker: Option<String>,
    seen: HashSet<String>,
    fetched: usize,
    done: bool,
}

/// Cursor values are strings or numbers; anything else ends pagination
fn cursor_text(value: &Value) -> Option<String> {
    let cursor = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!cursor.is_empty()).then_some(cursor)
}

impl MarkerPager {
    /// Pager taking the cursor from `cursor_field` of the last item of `items_field`
    pub fn new(items_field: &str, cursor_field: &str, marker_param: &str) -> Self {
        Self {
            items_field: items_field.to_string(),
            cursor: CursorLocator::LastItem(cursor_field.to_string()),
            marker_param: marker_param.to_string(),
            page_size: None,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn cursor(mut self, cursor: CursorLocator) -> Self {
        self.cursor = cursor;
        self
    }

    /// Request `size` items per page under `param`. A shorter page ends pagination.
    pub fn page_size(mut self, param: &str, size: usize) -> Self {
        self.page_size = Some((param.to_string(), size.max(1)));
        self
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn items_field(&self) -> &str {
        &self.items_field
    }

    /// Items of one page. A missing or non-array field is a parse error.
    fn extract_items(&self, page: Value) -> Result<Vec<Value>> {
        let field = &self.items_field;
        let mut page = page;
        let items = if field.is_empty() {
            page
        } else {
            match page.get_mut(field.as_str()) {
                Some(v) => v.take(),
                None => {
                    return Err(Error::parse(
                        format!("page field '{}'", field),
                        format!("missing in {}", type_name(&page)),
                    ))
                }
            }
        };

        match items {
            Value::Array(items) => Ok(items),
            other => Err(Error::parse(
                format!("page field '{}'", field),
                format!("expected array, found {}", type_name(&other)),
            )),
        }
    }

    /// Fetch the page after `state`, or `None` once pagination is over
    async fn next_page<T>(
        &self,
        transport: &T,
        request: &ListRequest,
        mut state: PageState,
    ) -> Result<Option<(Vec<Value>, PageState)>>
    where
        T: Transport + ?Sized,
    {
        if state.done {
            return Ok(None);
        }
        if state.fetched >= self.max_pages {
            return Err(Error::PageLimit {
                path: request.path.clone(),
                max_pages: self.max_pages,
            });
        }

        let mut query = request.filter.to_pairs();
        if let Some((param, size)) = &self.page_size {
            query.push((param.clone(), size.to_string()));
        }
        if let Some(marker) = &state.marker {
            query.push((self.marker_param.clone(), marker.clone()));
        }

        let body = transport.get(&request.service, &request.path, &query).await?;
        state.fetched += 1;

        let page_cursor = match &self.cursor {
            CursorLocator::Page(path) => lookup(&body, path).and_then(cursor_text),
            CursorLocator::LastItem(_) => None,
        };
        let items = self.extract_items(body)?;
        if items.is_empty() {
            return Ok(None);
        }

        let short_page = matches!(&self.page_size, Some((_, size)) if items.len() < *size);
        let cursor = match &self.cursor {
            _ if short_page => None,
            CursorLocator::Page(_) => page_cursor,
            CursorLocator::LastItem(path) => items
                .last()
                .and_then(|item| lookup(item, path))
                .and_then(cursor_text),
        };

        match cursor {
            Some(cursor) if state.seen.contains(&cursor) => {
                tracing::warn!(
                    "Stale marker {} repeated by {}, stopping pagination",
                    cursor,
                    request.path
                );
                state.done = true;
            }
            Some(cursor) => {
                state.seen.insert(cursor.clone());
                state.marker = Some(cursor);
            }
            None => state.done = true,
        }

        tracing::debug!(
            "{}: page {} with {} items",
            request.path,
            state.fetched,
            items.len()
        );
        Ok(Some((items, state)))
    }

    /// Lazy stream of pages. Each call starts again from the first page.
    pub fn pages<'a, T>(
        &'a self,
        transport: &'a T,
        request: &'a ListRequest,
    ) -> impl Stream<Item = Result<Vec<Value>>> + 'a
    where
        T: Transport + ?Sized,
    {
        stream::try_unfold(PageState::default(), move |state| {
            self.next_page(transport, request, state)
        })
    }

    /// Fetch every page and return all items as one JSON array
    pub async fn collect<T>(&self, transport: &T, request: &ListRequest) -> Result<Value>
    where
        T: Transport + ?Sized,
    {
        let pages = self.pages(transport, request);
        futures::pin_mut!(pages);

        let mut all_items = Vec::new();
        while let Some(page) = pages.try_next().await? {
            all_items.extend(page);
        }

        tracing::debug!("{}: {} items in total", request.path, all_items.len());
        Ok(Value::Array(all_items))
    }
}
