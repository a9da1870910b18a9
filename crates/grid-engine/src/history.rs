//! URL / History Bridge
//!
//! Writes the current query and page into the page URL and reads them back.

use url::Url;

use crate::models::{Filter, Query};
use crate::ports::HistoryPort;
use crate::request::FilterWhitelist;

const SEARCH_KEY: &str = "searchStr";
const SORT_KEY: &str = "sort";
const PAGE_KEY: &str = "page";

/// Append query and page onto `base`. Page is written 1-based and omitted on page 0.
pub fn serialize(base: &Url, query: &Query, page_index: i64) -> Url {
    let mut url = base.clone();
    if query.is_empty() && page_index <= 0 {
        return url;
    }
    {
        let mut pairs = url.query_pairs_mut();
        if let Some(search) = &query.search_string {
            pairs.append_pair(SEARCH_KEY, search);
        }
        for filter in &query.filters {
            pairs.append_pair(&filter.category_type, &filter.category_id);
        }
        if let Some(sort) = &query.sort {
            pairs.append_pair(SORT_KEY, sort);
        }
        if page_index > 0 {
            pairs.append_pair(PAGE_KEY, &(page_index + 1).to_string());
        }
    }
    url
}

/// Read a query back out of a URL. Unknown filter pairs are dropped;
/// `None` when nothing usable is present.
pub fn parse(url: &str, whitelist: &FilterWhitelist) -> Option<Query> {
    let url = Url::parse(url).ok()?;
    let mut query = Query::default();

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            SEARCH_KEY => {
                if query.search_string.is_none() && !value.is_empty() {
                    query.search_string = Some(value.into_owned());
                }
            }
            SORT_KEY => {
                if query.sort.is_none() && !value.is_empty() {
                    query.sort = Some(value.into_owned());
                }
            }
            PAGE_KEY => {}
            category_type if whitelist.contains(category_type, &value) => {
                query.filters.push(Filter::new(category_type, value.into_owned()));
            }
            _ => {}
        }
    }

    (!query.is_empty()).then_some(query)
}

/// 0-based page index from the `page` parameter, if present and sane
pub fn parse_page(url: &str) -> Option<i64> {
    let url = Url::parse(url).ok()?;
    let (_, value) = url.query_pairs().find(|(key, _)| key == PAGE_KEY)?;
    let page: i64 = value.parse().ok()?;
    (page >= 1).then(|| page - 1)
}

/// Push the current location, then replace it with `target`.
/// Nothing happens when `target` is already the current location.
pub fn sync_history(history: &mut dyn HistoryPort, target: &Url) -> bool {
    let current = history.current_location();
    if current == target.as_str() {
        return false;
    }
    history.push(&current);
    history.replace(target.as_str());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://shop.example/catalog").unwrap()
    }

    fn whitelist() -> FilterWhitelist {
        FilterWhitelist::from_pairs([("culture", "japanese"), ("era", "edo")])
    }

    #[test]
    fn test_serialize() {
        let query = Query::search("tea bowl")
            .with_filter(Filter::new("culture", "japanese"))
            .with_sort("newest");
        let url = serialize(&base(), &query, 2);
        assert_eq!(
            url.as_str(),
            "https://shop.example/catalog?searchStr=tea+bowl&culture=japanese&sort=newest&page=3"
        );
        assert_eq!(serialize(&base(), &Query::default(), 0), base());
        assert_eq!(serialize(&base(), &Query::search("x"), 0).query(), Some("searchStr=x"));
    }

    #[test]
    fn test_round_trip_whitelisted_query() {
        let query = Query::search("kimono")
            .with_filter(Filter::new("culture", "japanese"))
            .with_filter(Filter::new("era", "edo"));
        let url = serialize(&base(), &query, 4);
        assert_eq!(parse(url.as_str(), &whitelist()), Some(query));
        assert_eq!(parse_page(url.as_str()), Some(4));
    }

    #[test]
    fn test_parse_drops_unknown_filters_and_repeats() {
        let parsed = parse(
            "https://shop.example/catalog?searchStr=first&searchStr=second&culture=aztec&era=edo&utm=x",
            &whitelist(),
        )
        .unwrap();
        assert_eq!(parsed.search_string.as_deref(), Some("first"));
        assert_eq!(parsed.filters, vec![Filter::new("era", "edo")]);
    }

    #[test]
    fn test_parse_nothing_useful() {
        assert_eq!(parse("https://shop.example/catalog?culture=aztec", &whitelist()), None);
        assert_eq!(parse("https://shop.example/catalog", &whitelist()), None);
        assert_eq!(parse("not a url", &whitelist()), None);
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page("https://shop.example/?page=1"), Some(0));
        assert_eq!(parse_page("https://shop.example/?page=0"), None);
        assert_eq!(parse_page("https://shop.example/?page=abc"), None);
        assert_eq!(parse_page("https://shop.example/"), None);
    }

    #[derive(Default)]
    struct RecordingHistory {
        location: String,
        log: Vec<String>,
    }

    impl HistoryPort for RecordingHistory {
        fn current_location(&self) -> String {
            self.location.clone()
        }
        fn push(&mut self, url: &str) {
            self.log.push(format!("push {url}"));
            self.location = url.to_string();
        }
        fn replace(&mut self, url: &str) {
            self.log.push(format!("replace {url}"));
            self.location = url.to_string();
        }
    }

    #[test]
    fn test_sync_history_pushes_then_replaces() {
        let mut history = RecordingHistory {
            location: "https://shop.example/catalog".into(),
            ..Default::default()
        };
        let target = serialize(&base(), &Query::search("fan"), 0);

        assert!(sync_history(&mut history, &target));
        assert_eq!(
            history.log,
            vec![
                "push https://shop.example/catalog".to_string(),
                "replace https://shop.example/catalog?searchStr=fan".to_string(),
            ]
        );

        assert!(!sync_history(&mut history, &target));
        assert_eq!(history.log.len(), 2);
    }
}
