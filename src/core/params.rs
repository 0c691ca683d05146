//! Request parameter parsing
//!
//! Turns an untyped parameter list (typically the decoded query string) into
//! a [`RefinementSpec`] and, when present, a [`BatchRequest`]. Parsing never
//! fails: anything missing or malformed means "no refinement" for that
//! dimension.
//!
//! # Recognised keys
//!
//! ```text
//! filter[title]=foo            (repeatable, one per field)
//! scope=published
//! order[field]=title&order[direction]=desc
//! order=title_desc             (compact form)
//! page=2&per_page=10
//! batch_action=destroy&id=1,2,3
//! ```

use crate::core::query::{Direction, OrderSpec, PageSpec, RefinementSpec};
use serde::{Deserialize, Serialize};

/// Untyped request parameters, in submission order.
///
/// Lookups return the last value submitted for a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

/// Batch action name plus the identifiers it targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRequest {
    pub action: String,
    pub ids: Vec<i64>,
}

impl BatchRequest {
    pub fn new(action: impl Into<String>, ids: Vec<i64>) -> Self {
        Self {
            action: action.into(),
            ids,
        }
    }
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and programmatic callers
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Last non-blank value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Build the refinement spec. Never fails.
    pub fn refinement(&self) -> RefinementSpec {
        RefinementSpec {
            filter: self.filter(),
            scope: self.get("scope").map(str::to_string),
            order: self.order(),
            page: self.page(),
        }
    }

    /// Batch request, when a `batch_action` was submitted
    pub fn batch_request(&self) -> Option<BatchRequest> {
        let action = self.get("batch_action")?;
        let ids = self.get("id").map(parse_ids).unwrap_or_default();
        Some(BatchRequest::new(action, ids))
    }

    fn filter(&self) -> indexmap::IndexMap<String, String> {
        let mut filter = indexmap::IndexMap::new();
        for (key, value) in &self.pairs {
            let Some(field) = key
                .strip_prefix("filter[")
                .and_then(|rest| rest.strip_suffix(']'))
            else {
                continue;
            };
            let value = value.trim();
            if field.is_empty() || value.is_empty() {
                continue;
            }
            filter.insert(field.to_string(), value.to_string());
        }
        filter
    }

    fn order(&self) -> Option<OrderSpec> {
        if let Some(field) = self.get("order[field]") {
            let direction = self
                .get("order[direction]")
                .map(Direction::parse)
                .unwrap_or_default();
            return Some(OrderSpec {
                field: field.to_string(),
                direction,
            });
        }

        let compact = self.get("order")?;
        let spec = match compact.rsplit_once('_') {
            Some((field, dir)) if !field.is_empty() && dir.eq_ignore_ascii_case("desc") => {
                OrderSpec::desc(field)
            }
            Some((field, dir)) if !field.is_empty() && dir.eq_ignore_ascii_case("asc") => {
                OrderSpec::asc(field)
            }
            _ => OrderSpec::asc(compact),
        };
        Some(spec)
    }

    fn page(&self) -> PageSpec {
        let number = match self.get("page").map(str::parse::<i64>) {
            Some(Ok(n)) => n,
            Some(Err(_)) => {
                tracing::debug!(page = ?self.get("page"), "ignoring unparseable page number");
                1
            }
            None => 1,
        };
        let per_page = self
            .get("per_page")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0);

        PageSpec { number, per_page }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Parse a comma-separated identifier list.
///
/// Whitespace and empty tokens are ignored and duplicates collapse. A single
/// non-numeric token rejects the whole list, which then yields no targets.
pub fn parse_ids(raw: &str) -> Vec<i64> {
    let mut ids = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.parse::<i64>() {
            Ok(id) if !ids.contains(&id) => ids.push(id),
            Ok(_) => {}
            Err(_) => {
                tracing::debug!(token, list = raw, "rejecting malformed id list");
                return Vec::new();
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_params_mean_no_refinement() {
        let spec = Params::new().refinement();
        assert_eq!(spec, RefinementSpec::default());
        assert!(Params::new().batch_request().is_none());
    }

    #[test]
    fn test_filter_keys() {
        let spec = Params::new()
            .with("filter[title]", "foo")
            .with("filter[state]", " live ")
            .with("filter[empty]", "")
            .with("filter[]", "x")
            .with("filters[other]", "y")
            .refinement();

        assert_eq!(spec.filter.len(), 2);
        assert_eq!(spec.filter.get("title").map(String::as_str), Some("foo"));
        assert_eq!(spec.filter.get("state").map(String::as_str), Some("live"));
    }

    #[test]
    fn test_repeated_filter_last_wins() {
        let spec = Params::new()
            .with("filter[title]", "foo")
            .with("filter[title]", "bar")
            .refinement();
        assert_eq!(spec.filter.get("title").map(String::as_str), Some("bar"));
    }

    #[test]
    fn test_order_nested_form() {
        let spec = Params::new()
            .with("order[field]", "title")
            .with("order[direction]", "desc")
            .refinement();
        assert_eq!(spec.order, Some(OrderSpec::desc("title")));
    }

    #[test]
    fn test_order_unknown_direction_is_ascending() {
        let spec = Params::new()
            .with("order[field]", "title")
            .with("order[direction]", "upwards")
            .refinement();
        assert_eq!(spec.order, Some(OrderSpec::asc("title")));
    }

    #[test]
    fn test_order_compact_form() {
        let params = Params::new().with("order", "created_at_desc");
        assert_eq!(params.refinement().order, Some(OrderSpec::desc("created_at")));

        let params = Params::new().with("order", "title");
        assert_eq!(params.refinement().order, Some(OrderSpec::asc("title")));
    }

    #[test]
    fn test_page_parsing() {
        let spec = Params::new().with("page", "3").with("per_page", "10").refinement();
        assert_eq!(spec.page.number, 3);
        assert_eq!(spec.page.per_page, Some(10));

        let spec = Params::new().with("page", "abc").with("per_page", "0").refinement();
        assert_eq!(spec.page.number, 1);
        assert_eq!(spec.page.per_page, None);

        let spec = Params::new().with("page", "-2").refinement();
        assert_eq!(spec.page.number, -2);
    }

    #[test]
    fn test_blank_scope_is_absent() {
        let spec = Params::new().with("scope", "  ").refinement();
        assert_eq!(spec.scope, None);
    }

    #[test]
    fn test_batch_request() {
        let request = Params::new()
            .with("batch_action", "destroy")
            .with("id", "1,2,3")
            .batch_request()
            .unwrap();
        assert_eq!(request.action, "destroy");
        assert_eq!(request.ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_batch_request_without_ids() {
        let request = Params::new()
            .with("batch_action", "destroy")
            .batch_request()
            .unwrap();
        assert!(request.ids.is_empty());
    }

    #[test]
    fn test_parse_ids_tolerates_whitespace_and_duplicates() {
        assert_eq!(parse_ids(" 4, 5 ,,4,6 "), vec![4, 5, 6]);
    }

    #[test]
    fn test_parse_ids_rejects_malformed_list() {
        assert!(parse_ids("1,two,3").is_empty());
        assert!(parse_ids("1,2.5").is_empty());
        assert!(parse_ids("").is_empty());
    }

    #[test]
    fn test_from_iterator() {
        let params: Params = vec![("scope", "published")].into_iter().collect();
        assert_eq!(params.get("scope"), Some("published"));
    }
}
