//! Query-string helpers shared by the list endpoints: limit/offset
//! pagination, `ordering`, and comma-separated `__in` filters.

use axum::{
    Json,
    http::Uri,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use todolist_db::models::{OrderBy, SortKey, Window};
use todolist_types::api::Page;

use crate::error::FieldErrors;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: i64,
}

impl Pagination {
    /// Non-positive or unparsable `limit` disables pagination; a bad
    /// `offset` falls back to 0.
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Self {
        let limit = limit
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&v| v > 0);
        let offset = offset
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&v| v >= 0)
            .unwrap_or(0);
        Self { limit, offset }
    }

    pub fn window(self) -> Window {
        match self.limit {
            Some(limit) => Window { limit: Some(limit), offset: self.offset },
            None => Window::default(),
        }
    }

    /// A bare JSON array when unpaginated, otherwise a [`Page`] envelope
    /// with relative `next`/`previous` links.
    pub fn respond<T: Serialize>(self, uri: &Uri, count: i64, results: Vec<T>) -> Response {
        let Some(limit) = self.limit else {
            return Json(results).into_response();
        };

        let next = self
            .offset
            .checked_add(limit)
            .filter(|&next| next < count)
            .map(|next| page_link(uri, limit, Some(next)));
        let previous = (self.offset > 0).then(|| {
            let prev = self.offset.saturating_sub(limit);
            page_link(uri, limit, (prev > 0).then_some(prev))
        });

        Json(Page { count, next, previous, results }).into_response()
    }
}

/// Rebuild the request URI with the given `limit`/`offset`, keeping every
/// other query pair verbatim.
fn page_link(uri: &Uri, limit: i64, offset: Option<i64>) -> String {
    let mut pairs: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            !pair.is_empty() && key != "limit" && key != "offset"
        })
        .map(str::to_string)
        .collect();
    pairs.push(format!("limit={}", limit));
    if let Some(offset) = offset {
        pairs.push(format!("offset={}", offset));
    }
    format!("{}?{}", uri.path(), pairs.join("&"))
}

/// Parse `ordering=-priority,due_date`. Unknown or disallowed keys are
/// skipped; if nothing usable remains, `default` applies.
pub fn parse_ordering(raw: Option<&str>, allowed: &[SortKey], default: &[OrderBy]) -> Vec<OrderBy> {
    let parsed: Vec<OrderBy> = raw
        .unwrap_or_default()
        .split(',')
        .filter_map(|term| {
            let term = term.trim();
            let (name, descending) = match term.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (term, false),
            };
            SortKey::from_name(name)
                .filter(|key| allowed.contains(key))
                .map(|key| OrderBy { key, descending })
        })
        .collect();

    if parsed.is_empty() { default.to_vec() } else { parsed }
}

/// Comma-separated list of values for an `__in` filter. Empty items are
/// ignored; any unparsable item records `message` under `field`.
pub fn parse_list<T, F>(errors: &mut FieldErrors, field: &str, raw: Option<&str>, message: &str, parse: F) -> Vec<T>
where
    F: Fn(&str) -> Option<T>,
{
    let mut values = Vec::new();
    for item in raw.unwrap_or_default().split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match parse(item) {
            Some(v) => values.push(v),
            None => {
                errors.add(field, message);
                break;
            }
        }
    }
    values
}

/// Empty search strings mean "no search".
pub fn search_term(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASC_TITLE: OrderBy = OrderBy { key: SortKey::Title, descending: false };

    #[test]
    fn pagination_parsing() {
        assert_eq!(Pagination::parse(None, None), Pagination::default());
        assert_eq!(
            Pagination::parse(Some("10"), Some("20")),
            Pagination { limit: Some(10), offset: 20 }
        );
        assert_eq!(
            Pagination::parse(Some("0"), Some("-1")),
            Pagination { limit: None, offset: 0 }
        );
        assert_eq!(Pagination::parse(Some("x"), Some("5")).window().offset, 0);
    }

    #[test]
    fn huge_window_does_not_overflow() {
        let uri: Uri = "/goals/goal_category/list?limit=9223372036854775807&offset=1".parse().unwrap();
        let pagination = Pagination::parse(Some("9223372036854775807"), Some("1"));
        assert_eq!(pagination.limit, Some(i64::MAX));

        let response = pagination.respond(&uri, 3, vec![1, 2]);
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[test]
    fn links_keep_other_params() {
        let uri: Uri = "/goals/goal/list?category__in=1%2C2&limit=2&offset=2".parse().unwrap();
        assert_eq!(
            page_link(&uri, 2, Some(4)),
            "/goals/goal/list?category__in=1%2C2&limit=2&offset=4"
        );
        assert_eq!(page_link(&uri, 2, None), "/goals/goal/list?category__in=1%2C2&limit=2");
    }

    #[test]
    fn ordering_parsing() {
        let allowed = [SortKey::Title, SortKey::Priority];
        assert_eq!(
            parse_ordering(Some("-priority, title"), &allowed, &[]),
            [
                OrderBy { key: SortKey::Priority, descending: true },
                OrderBy { key: SortKey::Title, descending: false },
            ]
        );
        assert_eq!(parse_ordering(Some("due_date,bogus"), &allowed, &[ASC_TITLE]), [ASC_TITLE]);
        assert_eq!(parse_ordering(None, &allowed, &[ASC_TITLE]), [ASC_TITLE]);
    }

    #[test]
    fn list_parsing() {
        let mut errors = FieldErrors::default();
        let ids = parse_list(&mut errors, "category__in", Some("1, 2,,3"), "bad", |s| s.parse::<i64>().ok());
        assert_eq!(ids, [1, 2, 3]);
        assert!(errors.is_empty());

        parse_list(&mut errors, "category__in", Some("1,x"), "bad", |s| s.parse::<i64>().ok());
        assert_eq!(errors, FieldErrors::single("category__in", "bad"));
    }
}
