//! Query refinement pipeline
//!
//! Four independent transforms narrow and arrange a [`Relation`]:
//! scope, filter, order and paginate. [`refine`] composes them in that fixed
//! order. Each stage degrades to a no-op on input it cannot use, so a
//! malformed request still yields a result.

use crate::core::descriptor::{FilterDecl, FilterKind, ResourceDescriptor};
use crate::core::field::{FieldType, FieldValue};
use crate::core::query::{Direction, OrderSpec, PageSpec, PaginationMeta, RefinementSpec, ResultSet};
use crate::core::resource::Resource;
use indexmap::IndexMap;
use std::cmp::Ordering;

/// Ordered snapshot of records a transform consumes and returns
#[derive(Debug, Clone, PartialEq)]
pub struct Relation<E> {
    records: Vec<E>,
}

impl<E> Relation<E> {
    pub fn new(records: Vec<E>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[E] {
        &self.records
    }

    pub fn into_vec(self) -> Vec<E> {
        self.records
    }
}

impl<E> Default for Relation<E> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<E> From<Vec<E>> for Relation<E> {
    fn from(records: Vec<E>) -> Self {
        Self::new(records)
    }
}

impl<E> IntoIterator for Relation<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<E> FromIterator<E> for Relation<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Narrow to the requested scope.
///
/// Falls back to the default scope when the name is absent or undeclared.
/// Returns the relation plus the name of the scope actually applied.
pub fn apply_scope<E: Resource>(
    descriptor: &ResourceDescriptor<E>,
    relation: Relation<E>,
    requested: Option<&str>,
) -> (Relation<E>, Option<String>) {
    let declared = requested.and_then(|name| descriptor.scope(name));
    if declared.is_none() {
        if let Some(name) = requested {
            tracing::debug!(
                resource = E::resource_name(),
                scope = name,
                "unknown scope, using default"
            );
        }
    }

    match declared.or_else(|| descriptor.default_scope()) {
        Some(scope) => {
            let narrowed = relation.into_iter().filter(|r| scope.matches(r)).collect();
            (narrowed, Some(scope.name.clone()))
        }
        None => (relation, None),
    }
}

/// Keep records matching every usable filter
pub fn apply_filters<E: Resource>(
    descriptor: &ResourceDescriptor<E>,
    relation: Relation<E>,
    filter: &IndexMap<String, String>,
) -> Relation<E> {
    let matchers: Vec<(&FilterDecl, Matcher)> = filter
        .iter()
        .filter_map(|(field, raw)| {
            let Some(decl) = descriptor.filter(field) else {
                tracing::debug!(resource = E::resource_name(), field, "ignoring undeclared filter");
                return None;
            };
            let matcher = Matcher::compile(decl, raw);
            if matcher.is_none() {
                tracing::debug!(
                    resource = E::resource_name(),
                    field,
                    value = raw.as_str(),
                    "ignoring unparseable filter value"
                );
            }
            matcher.map(|m| (decl, m))
        })
        .collect();

    if matchers.is_empty() {
        return relation;
    }

    relation
        .into_iter()
        .filter(|record| {
            matchers.iter().all(|(decl, matcher)| {
                record
                    .field_value(&decl.field)
                    .and_then(|v| decl.field_type.coerce(&v))
                    .is_some_and(|v| matcher.matches(&v))
            })
        })
        .collect()
}

/// Stable-sort by the requested orderable field.
///
/// Undeclared fields fall back to the descriptor's default order, then to
/// identifier ascending.
pub fn apply_order<E: Resource>(
    descriptor: &ResourceDescriptor<E>,
    relation: Relation<E>,
    order: Option<&OrderSpec>,
) -> Relation<E> {
    let fallback = OrderSpec::asc("id");
    let spec = match order {
        Some(spec) if descriptor.is_orderable(&spec.field) => spec,
        requested => {
            if let Some(spec) = requested {
                tracing::debug!(
                    resource = E::resource_name(),
                    field = spec.field.as_str(),
                    "ignoring order on non-orderable field"
                );
            }
            descriptor.default_order().unwrap_or(&fallback)
        }
    };

    let mut keyed: Vec<(FieldValue, E)> = relation
        .into_iter()
        .map(|r| (r.field_value(&spec.field).unwrap_or(FieldValue::Null), r))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match spec.direction {
        Direction::Asc => a.compare(b),
        Direction::Desc => b.compare(a),
    });

    keyed.into_iter().map(|(_, r)| r).collect()
}

/// Slice out one page and compute the pagination metadata
pub fn apply_pagination<E: Resource>(
    descriptor: &ResourceDescriptor<E>,
    relation: Relation<E>,
    page: &PageSpec,
) -> (Vec<E>, PaginationMeta) {
    let per_page = page
        .per_page
        .map(|n| n.clamp(1, descriptor.max_per_page()))
        .unwrap_or_else(|| descriptor.per_page());
    let meta = PaginationMeta::new(page.number, per_page, relation.len());

    if !meta.in_range() {
        return (Vec::new(), meta);
    }

    let offset = (page.number as usize - 1) * per_page;
    let items = relation.into_iter().skip(offset).take(per_page).collect();
    (items, meta)
}

/// Scope, filter and order without paginating.
///
/// Returns the refined relation and the scope actually applied.
pub fn refine_unpaginated<E: Resource>(
    descriptor: &ResourceDescriptor<E>,
    relation: Relation<E>,
    spec: &RefinementSpec,
) -> (Relation<E>, Option<String>) {
    let (scoped, scope) = apply_scope(descriptor, relation, spec.scope.as_deref());
    let filtered = apply_filters(descriptor, scoped, &spec.filter);
    let ordered = apply_order(descriptor, filtered, spec.order.as_ref());
    (ordered, scope)
}

/// Full pipeline: scope, filter, order, paginate
pub fn refine<E: Resource>(
    descriptor: &ResourceDescriptor<E>,
    relation: Relation<E>,
    spec: &RefinementSpec,
) -> ResultSet<E> {
    let (ordered, scope) = refine_unpaginated(descriptor, relation, spec);
    let (items, pagination) = apply_pagination(descriptor, ordered, &spec.page);
    ResultSet {
        items,
        pagination,
        scope,
    }
}

/// A filter value parsed against its declared type
#[derive(Debug, Clone, PartialEq)]
enum Matcher {
    Exact(FieldValue),
    Contains(String),
    Range(Option<FieldValue>, Option<FieldValue>),
    OneOf(Vec<FieldValue>),
}

impl Matcher {
    fn compile(decl: &FilterDecl, raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match decl.kind {
            FilterKind::Exact => decl.field_type.parse(raw).map(Matcher::Exact),
            FilterKind::Contains => Some(Matcher::Contains(raw.to_lowercase())),
            FilterKind::Range => {
                let (min, max) = raw.split_once("..")?;
                let min = parse_bound(decl.field_type, min)?;
                let max = parse_bound(decl.field_type, max)?;
                if min.is_none() && max.is_none() {
                    return None;
                }
                Some(Matcher::Range(min, max))
            }
            FilterKind::OneOf => {
                let values: Vec<FieldValue> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .filter_map(|t| decl.field_type.parse(t))
                    .collect();
                if values.is_empty() {
                    None
                } else {
                    Some(Matcher::OneOf(values))
                }
            }
        }
    }

    fn matches(&self, value: &FieldValue) -> bool {
        if value.is_null() {
            return false;
        }
        match self {
            Matcher::Exact(expected) => value.compare(expected) == Ordering::Equal,
            Matcher::Contains(needle) => value
                .to_display_string()
                .to_lowercase()
                .contains(needle.as_str()),
            Matcher::Range(min, max) => {
                min.as_ref().is_none_or(|m| value.compare(m) != Ordering::Less)
                    && max.as_ref().is_none_or(|m| value.compare(m) != Ordering::Greater)
            }
            Matcher::OneOf(accepted) => accepted
                .iter()
                .any(|a| value.compare(a) == Ordering::Equal),
        }
    }
}

/// An empty bound is open; a non-empty one must parse
fn parse_bound(field_type: FieldType, raw: &str) -> Option<Option<FieldValue>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(None);
    }
    field_type.parse(raw).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: Option<i64>,
        name: String,
        price: i64,
        live: bool,
    }

    impl Resource for Item {
        fn resource_name() -> &'static str {
            "items"
        }

        fn resource_name_singular() -> &'static str {
            "item"
        }

        fn id(&self) -> Option<i64> {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }
    }

    fn item(id: i64, name: &str, price: i64, live: bool) -> Item {
        Item {
            id: Some(id),
            name: name.to_string(),
            price,
            live,
        }
    }

    fn relation() -> Relation<Item> {
        Relation::new(vec![
            item(1, "Anvil", 30, true),
            item(2, "bucket", 5, false),
            item(3, "Crate", 12, true),
            item(4, "anchor", 12, true),
        ])
    }

    fn descriptor() -> ResourceDescriptor<Item> {
        ResourceDescriptor::builder()
            .filter("name", FieldType::String, FilterKind::Contains)
            .filter("price", FieldType::Integer, FilterKind::Range)
            .filter("live", FieldType::Boolean, FilterKind::Exact)
            .filter("id", FieldType::Integer, FilterKind::OneOf)
            .orderable(&["name", "price"])
            .scope("live", |i: &Item| i.live)
            .per_page(2)
            .build()
            .unwrap()
    }

    fn ids(records: &[Item]) -> Vec<i64> {
        records.iter().filter_map(|r| r.id).collect()
    }

    #[test]
    fn test_scope_known_and_unknown() {
        let d = descriptor();
        let (scoped, applied) = apply_scope(&d, relation(), Some("live"));
        assert_eq!(ids(scoped.as_slice()), vec![1, 3, 4]);
        assert_eq!(applied.as_deref(), Some("live"));

        let (scoped, applied) = apply_scope(&d, relation(), Some("nope"));
        assert_eq!(scoped.len(), 4);
        assert_eq!(applied, None);
    }

    #[test]
    fn test_contains_filter_is_case_insensitive() {
        let d = descriptor();
        let filter = IndexMap::from([("name".to_string(), "AN".to_string())]);
        let filtered = apply_filters(&d, relation(), &filter);
        assert_eq!(ids(filtered.as_slice()), vec![1, 4]);
    }

    #[test]
    fn test_range_filter_bounds_are_inclusive() {
        let d = descriptor();
        let filter = IndexMap::from([("price".to_string(), "5..12".to_string())]);
        assert_eq!(ids(apply_filters(&d, relation(), &filter).as_slice()), vec![2, 3, 4]);

        let filter = IndexMap::from([("price".to_string(), "13..".to_string())]);
        assert_eq!(ids(apply_filters(&d, relation(), &filter).as_slice()), vec![1]);
    }

    #[test]
    fn test_one_of_filter() {
        let d = descriptor();
        let filter = IndexMap::from([("id".to_string(), "2, 4,x".to_string())]);
        assert_eq!(ids(apply_filters(&d, relation(), &filter).as_slice()), vec![2, 4]);
    }

    #[test]
    fn test_unusable_filters_are_ignored() {
        let d = descriptor();
        let filter = IndexMap::from([
            ("price".to_string(), "cheap..".to_string()),
            ("colour".to_string(), "red".to_string()),
            ("live".to_string(), "maybe".to_string()),
        ]);
        assert_eq!(apply_filters(&d, relation(), &filter).len(), 4);
    }

    #[test]
    fn test_filters_compose_with_and() {
        let d = descriptor();
        let filter = IndexMap::from([
            ("live".to_string(), "true".to_string()),
            ("price".to_string(), "..12".to_string()),
        ]);
        assert_eq!(ids(apply_filters(&d, relation(), &filter).as_slice()), vec![3, 4]);
    }

    #[test]
    fn test_order_is_stable() {
        let d = descriptor();
        let ordered = apply_order(&d, relation(), Some(&OrderSpec::asc("price")));
        assert_eq!(ids(ordered.as_slice()), vec![2, 3, 4, 1]);

        let ordered = apply_order(&d, relation(), Some(&OrderSpec::desc("price")));
        assert_eq!(ids(ordered.as_slice()), vec![1, 3, 4, 2]);
    }

    #[test]
    fn test_order_falls_back_to_id() {
        let d = descriptor();
        let reversed: Relation<Item> = relation().into_iter().rev().collect();
        let ordered = apply_order(&d, reversed, Some(&OrderSpec::desc("live")));
        assert_eq!(ids(ordered.as_slice()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_pagination_slices() {
        let d = descriptor();
        let (items, meta) = apply_pagination(&d, relation(), &PageSpec { number: 2, per_page: None });
        assert_eq!(ids(&items), vec![3, 4]);
        assert_eq!(meta.total, 4);
        assert_eq!(meta.total_pages, 2);

        let (items, meta) = apply_pagination(&d, relation(), &PageSpec { number: 1, per_page: Some(3) });
        assert_eq!(ids(&items), vec![1, 2, 3]);
        assert_eq!(meta.total_pages, 2);
    }

    #[test]
    fn test_pagination_out_of_range_is_empty() {
        let d = descriptor();
        for number in [0, -1, 3] {
            let (items, meta) = apply_pagination(&d, relation(), &PageSpec { number, per_page: None });
            assert!(items.is_empty());
            assert_eq!(meta.total, 4);
        }
    }

    #[test]
    fn test_request_page_size_is_clamped() {
        let d = ResourceDescriptor::<Item>::builder().max_per_page(3).build().unwrap();
        let (items, meta) = apply_pagination(&d, relation(), &PageSpec { number: 1, per_page: Some(50) });
        assert_eq!(items.len(), 3);
        assert_eq!(meta.per_page, 3);
    }

    #[test]
    fn test_refine_composes_stages() {
        let d = descriptor();
        let spec = RefinementSpec::new()
            .with_scope("live")
            .with_filter("price", "10..")
            .with_order(OrderSpec::asc("name"))
            .with_page(1);
        let result = refine(&d, relation(), &spec);

        assert_eq!(ids(&result.items), vec![1, 3]);
        assert_eq!(result.pagination.total, 3);
        assert_eq!(result.scope.as_deref(), Some("live"));
    }
}
