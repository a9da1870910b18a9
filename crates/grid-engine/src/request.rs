//! Request Model
//!
//! Validity and equality predicates over queries and paging requests.

use std::collections::HashSet;

use crate::error::{StateInvariantError, ValidationError};
use crate::models::{Filter, FilterMenuTemplate, GridRequest, Query};

/// The (categoryType, categoryID) pairs the catalog accepts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterWhitelist {
    pairs: HashSet<(String, String)>,
}

impl FilterWhitelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, T, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, C)>,
        T: Into<String>,
        C: Into<String>,
    {
        Self {
            pairs: pairs.into_iter().map(|(t, c)| (t.into(), c.into())).collect(),
        }
    }

    pub fn from_template(template: &FilterMenuTemplate) -> Self {
        Self::from_pairs(template.category_types.iter().flat_map(|entry| {
            entry
                .category_ids
                .iter()
                .map(move |id| (entry.category_type.clone(), id.category_id.clone()))
        }))
    }

    /// Merge another whitelist into this one
    pub fn extend(&mut self, other: FilterWhitelist) {
        self.pairs.extend(other.pairs);
    }

    pub fn contains(&self, category_type: &str, category_id: &str) -> bool {
        self.pairs
            .contains(&(category_type.to_owned(), category_id.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Both parts are non-empty and offered by the catalog
pub fn is_valid_filter(filter: &Filter, whitelist: &FilterWhitelist) -> bool {
    !filter.category_type.is_empty()
        && !filter.category_id.is_empty()
        && whitelist.contains(&filter.category_type, &filter.category_id)
}

pub fn is_valid_query(query: &Query, whitelist: &FilterWhitelist) -> bool {
    check_query(query, whitelist).is_ok()
}

/// Like [`is_valid_query`] but names the first offending part
pub fn check_query(query: &Query, whitelist: &FilterWhitelist) -> Result<(), ValidationError> {
    if matches!(&query.search_string, Some(s) if s.is_empty()) {
        return Err(ValidationError::EmptySearchString);
    }
    match query.filters.iter().find(|f| !is_valid_filter(f, whitelist)) {
        Some(f) => Err(ValidationError::UnknownFilter {
            category_type: f.category_type.clone(),
            category_id: f.category_id.clone(),
        }),
        None => Ok(()),
    }
}

/// Deep equality: search string, filters (order-sensitive) and sort
pub fn equal_queries(a: &Query, b: &Query) -> bool {
    a.search_string == b.search_string
        && a.filters.len() == b.filters.len()
        && a.filters.iter().zip(&b.filters).all(|(x, y)| {
            x.category_type == y.category_type && x.category_id == y.category_id
        })
        && a.sort == b.sort
}

/// Range equality first, then query equality. Directives are not compared.
pub fn equal_requests(a: &GridRequest, b: &GridRequest) -> Result<bool, StateInvariantError> {
    a.validate_range()?;
    b.validate_range()?;
    if a.start_index != b.start_index || a.length != b.length {
        return Ok(false);
    }
    Ok(equal_queries(&a.query, &b.query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryIdEntry, CategoryTypeEntry};

    fn whitelist() -> FilterWhitelist {
        FilterWhitelist::from_pairs([("culture", "japanese"), ("culture", "korean"), ("era", "edo")])
    }

    fn request(start_index: i64, length: Option<i64>) -> GridRequest {
        GridRequest {
            start_index,
            length,
            query: Query::search("mask"),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_validity() {
        let wl = whitelist();
        assert!(is_valid_filter(&Filter::new("culture", "japanese"), &wl));
        assert!(!is_valid_filter(&Filter::new("culture", "aztec"), &wl));
        assert!(!is_valid_filter(&Filter::new("", ""), &wl));
    }

    #[test]
    fn test_query_validity() {
        let wl = whitelist();
        assert!(is_valid_query(&Query::default(), &wl));
        assert!(is_valid_query(&Query::search("bowl").with_filter(Filter::new("era", "edo")), &wl));
        assert!(!is_valid_query(&Query::search(""), &wl));
        assert_eq!(
            check_query(&Query::default().with_filter(Filter::new("era", "meiji")), &wl),
            Err(ValidationError::UnknownFilter {
                category_type: "era".into(),
                category_id: "meiji".into()
            })
        );
    }

    #[test]
    fn test_equal_queries_is_order_sensitive() {
        let a = Query::default()
            .with_filter(Filter::new("culture", "japanese"))
            .with_filter(Filter::new("era", "edo"));
        let b = Query::default()
            .with_filter(Filter::new("era", "edo"))
            .with_filter(Filter::new("culture", "japanese"));
        assert!(equal_queries(&a, &a.clone()));
        assert!(!equal_queries(&a, &b));
        assert!(!equal_queries(&a, &a.clone().with_sort("price-asc")));
    }

    #[test]
    fn test_equal_requests_reflexive_and_symmetric() {
        for (start, length) in [(0, None), (0, Some(1)), (12, Some(11)), (96, None)] {
            let a = request(start, length);
            let b = request(start, length);
            assert_eq!(equal_requests(&a, &a), Ok(true));
            assert_eq!(equal_requests(&a, &b), equal_requests(&b, &a));
        }
        let a = request(0, None);
        let b = request(12, None);
        assert_eq!(equal_requests(&a, &b), Ok(false));
        assert_eq!(equal_requests(&b, &a), Ok(false));
    }

    #[test]
    fn test_equal_requests_ignores_directives() {
        let a = request(0, None);
        let mut b = request(0, None);
        b.get_block_size = true;
        b.get_filter_menu_template = true;
        assert_eq!(equal_requests(&a, &b), Ok(true));
    }

    #[test]
    fn test_equal_requests_rejects_malformed_ranges() {
        let good = request(0, None);
        assert_eq!(
            equal_requests(&request(-2, None), &good),
            Err(StateInvariantError::NegativeStart(-2))
        );
        assert_eq!(
            equal_requests(&good, &request(4, Some(0))),
            Err(StateInvariantError::NonPositiveLength(0))
        );
    }

    #[test]
    fn test_whitelist_from_template() {
        let template = FilterMenuTemplate {
            category_types: vec![CategoryTypeEntry {
                display_name: "Culture".into(),
                category_type: "culture".into(),
                category_ids: vec![CategoryIdEntry {
                    display_name: "Japanese".into(),
                    category_id: "japanese".into(),
                    img_src: None,
                }],
            }],
        };
        let wl = FilterWhitelist::from_template(&template);
        assert_eq!(wl.len(), 1);
        assert!(wl.contains("culture", "japanese"));
        assert!(!wl.contains("culture", "korean"));
    }
}
