//! Page-by-page aggregation of Trakt list endpoints.
//!
//! Trakt paginates with `page`/`limit` query parameters and reports the
//! position in `X-Pagination-*` response headers. [`Paginator`] walks those
//! pages lazily, one request at a time, and hands out the records in order.

use futures::stream::{self, Stream};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::debug;

use crate::error::TransportError;
use crate::trakt::http::TraktHttp;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Pagination metadata of one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub page_count: u32,
    pub item_count: u32,
}

fn header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

impl PageInfo {
    /// `None` when the response carries no page count, which means it was the only page.
    pub fn from_headers(headers: &HeaderMap, requested_page: u32) -> Option<Self> {
        let page_count = header_u32(headers, "X-Pagination-Page-Count")?;
        Some(Self {
            page: header_u32(headers, "X-Pagination-Page").unwrap_or(requested_page),
            limit: header_u32(headers, "X-Pagination-Limit").unwrap_or(0),
            page_count,
            item_count: header_u32(headers, "X-Pagination-Item-Count").unwrap_or(0),
        })
    }

    pub fn is_last(&self) -> bool {
        self.page >= self.page_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// More pages may follow
    Pending,
    /// The last page has been fetched
    Exhausted,
    /// A page request failed; nothing more will be fetched
    Failed,
}

/// Lazy single-pass sequence over every record of a list endpoint.
pub struct Paginator<'a> {
    http: &'a mut TraktHttp,
    method: Method,
    path: String,
    page_size: u32,
    paginated: bool,
    next_page: u32,
    state: PageState,
    page_info: Option<PageInfo>,
    buffer: VecDeque<Value>,
}

impl<'a> Paginator<'a> {
    pub fn new(http: &'a mut TraktHttp, method: Method, path: impl Into<String>, page_size: u32) -> Self {
        Self {
            http,
            method,
            path: path.into(),
            page_size: page_size.max(1),
            paginated: true,
            next_page: 1,
            state: PageState::Pending,
            page_info: None,
            buffer: VecDeque::new(),
        }
    }

    /// One request without `page`/`limit` parameters, for endpoints that return everything at once.
    pub fn unpaginated(http: &'a mut TraktHttp, method: Method, path: impl Into<String>) -> Self {
        let mut paginator = Self::new(http, method, path, DEFAULT_PAGE_SIZE);
        paginator.paginated = false;
        paginator
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// Metadata of the most recently fetched page
    pub fn page_info(&self) -> Option<PageInfo> {
        self.page_info
    }

    /// Next record, fetching the following page when the current one is drained.
    ///
    /// A failed request is reported once; after that the sequence ends and
    /// [`state`](Self::state) is [`PageState::Failed`].
    pub async fn next(&mut self) -> Option<Result<Value, TransportError>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.state != PageState::Pending {
                return None;
            }
            if let Err(e) = self.fetch_page().await {
                self.state = PageState::Failed;
                return Some(Err(e));
            }
        }
    }

    async fn fetch_page(&mut self) -> Result<(), TransportError> {
        let page = self.next_page;
        let query = if self.paginated {
            vec![("page", page.to_string()), ("limit", self.page_size.to_string())]
        } else {
            Vec::new()
        };

        let response = self.http.request(self.method.clone(), &self.path, &query, None).await?;
        let items: Vec<Value> = if response.is_no_content() {
            Vec::new()
        } else {
            response.json()?
        };

        let info = PageInfo::from_headers(&response.headers, page);
        debug!(
            path = %self.path,
            page,
            page_count = info.map(|i| i.page_count),
            items = items.len(),
            "Fetched page"
        );

        self.buffer.extend(items);
        self.page_info = info;
        match info {
            Some(info) if self.paginated && !info.is_last() => self.next_page = info.page + 1,
            _ => self.state = PageState::Exhausted,
        }
        Ok(())
    }

    /// Drain every page, stopping at the first failure.
    pub async fn collect_all(mut self) -> Result<Vec<Value>, TransportError> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Value, TransportError>> + 'a {
        stream::unfold(self, |mut paginator| async move {
            paginator.next().await.map(|item| (item, paginator))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trakt::pacing::PacingStrategy;
    use crate::trakt::test_support::test_http;
    use futures::StreamExt;
    use mockito::Matcher;

    async fn mock_page(server: &mut mockito::ServerGuard, page: u32, page_count: u32, body: &str) -> mockito::Mock {
        server
            .mock("GET", "/sync/watchlist")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), page.to_string()),
                Matcher::UrlEncoded("limit".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("X-Pagination-Page", &page.to_string())
            .with_header("X-Pagination-Limit", "2")
            .with_header("X-Pagination-Page-Count", &page_count.to_string())
            .with_header("X-Pagination-Item-Count", "3")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_walks_every_page_in_order() {
        let mut server = mockito::Server::new_async().await;
        let first = mock_page(&mut server, 1, 2, r#"[{"n":1},{"n":2}]"#).await;
        let second = mock_page(&mut server, 2, 2, r#"[{"n":3}]"#).await;

        let (mut http, _) = test_http(&server.url(), PacingStrategy::HeaderDriven);
        let mut pages = Paginator::new(&mut http, Method::GET, "/sync/watchlist", 2);

        let mut seen = Vec::new();
        while let Some(item) = pages.next().await {
            seen.push(item.unwrap()["n"].as_u64().unwrap());
        }

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(pages.state(), PageState::Exhausted);
        assert_eq!(pages.page_info().unwrap().page, 2);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_failure_on_later_page_is_not_exhaustion() {
        let mut server = mockito::Server::new_async().await;
        mock_page(&mut server, 1, 3, r#"[{"n":1},{"n":2}]"#).await;
        server
            .mock("GET", "/sync/watchlist")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let (mut http, _) = test_http(&server.url(), PacingStrategy::HeaderDriven);
        let mut pages = Paginator::new(&mut http, Method::GET, "/sync/watchlist", 2);

        assert!(pages.next().await.unwrap().is_ok());
        assert!(pages.next().await.unwrap().is_ok());
        let err = pages.next().await.unwrap().unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert!(pages.next().await.is_none());
        assert_eq!(pages.state(), PageState::Failed);
    }

    #[tokio::test]
    async fn test_collect_all_aborts_on_failure() {
        let mut server = mockito::Server::new_async().await;
        mock_page(&mut server, 1, 2, r#"[{"n":1},{"n":2}]"#).await;
        server
            .mock("GET", "/sync/watchlist")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(500)
            .create_async()
            .await;

        let (mut http, _) = test_http(&server.url(), PacingStrategy::HeaderDriven);
        let result = Paginator::new(&mut http, Method::GET, "/sync/watchlist", 2)
            .collect_all()
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_page_count_means_single_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/sync/history")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"n":1}]"#)
            .expect(1)
            .create_async()
            .await;

        let (mut http, _) = test_http(&server.url(), PacingStrategy::HeaderDriven);
        let items = Paginator::new(&mut http, Method::GET, "/sync/history", 100)
            .collect_all()
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unpaginated_sends_no_page_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/sync/ratings")
            .with_status(200)
            .with_header("X-Pagination-Page-Count", "4")
            .with_body(r#"[{"n":1},{"n":2}]"#)
            .expect(1)
            .create_async()
            .await;

        let (mut http, _) = test_http(&server.url(), PacingStrategy::HeaderDriven);
        let items: Vec<Value> = Paginator::unpaginated(&mut http, Method::GET, "/sync/ratings")
            .into_stream()
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        mock.assert_async().await;
    }
}
