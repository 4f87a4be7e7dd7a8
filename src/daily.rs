use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::content::{master_tips, master_topics};
use crate::prng::Mulberry32;
use crate::storage::{load_json, save_json, KeyValueStore, DAILY_TOPICS_KEY};

pub const DEFAULT_TOPIC_COUNT: usize = 5;

/// Today's date on the local calendar, which is the "day" the user perceives
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `YYYY-MM-DD`, the cache key format
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Seed for topic suggestions: fold year, month, day as `acc * 31 + part`, starting at 17
pub fn topic_seed(date: NaiveDate) -> i64 {
    [date.year() as i64, date.month() as i64, date.day() as i64]
        .into_iter()
        .fold(17, |acc, part| acc * 31 + part)
}

/// Seed for the daily tip: `year * 10000 + month * 100 + day`
pub fn tip_seed(date: NaiveDate) -> i64 {
    date.year() as i64 * 10_000 + date.month() as i64 * 100 + date.day() as i64
}

/// Fisher-Yates shuffle driven by Mulberry32.
///
/// Walks from the last index down to 1, swapping `i` with
/// `floor(random() * (i + 1))`. The walk order is part of the contract:
/// any other order produces a different permutation for the same seed.
pub fn seeded_shuffle<T: Clone>(items: &[T], seed: i64) -> Vec<T> {
    let mut rng = Mulberry32::from_i64(seed);
    let mut shuffled = items.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = (rng.next_f64() * (i + 1) as f64).floor() as usize;
        shuffled.swap(i, j);
    }
    shuffled
}

/// Index of the tip for `date` in a list of `len` tips, `None` for an empty list
pub fn daily_tip_index(date: NaiveDate, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let mut rng = Mulberry32::from_i64(tip_seed(date));
    Some((rng.next_f64() * len as f64).floor() as usize)
}

/// Persisted `{date, topics}` pair; only valid for the exact date it stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTopicsCache {
    pub date: String,
    pub topics: Vec<String>,
}

/// Deterministic per-day content: suggested topics and the bonus tip
pub struct DailySelector {
    store: Arc<dyn KeyValueStore>,
    topics: Vec<String>,
    tips: Vec<String>,
}

impl DailySelector {
    /// Selector over the built-in master lists
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_lists(store, master_topics().to_vec(), master_tips().to_vec())
    }

    pub fn with_lists(
        store: Arc<dyn KeyValueStore>,
        topics: Vec<String>,
        tips: Vec<String>,
    ) -> Self {
        Self {
            store,
            topics,
            tips,
        }
    }

    pub fn daily_tip(&self, date: NaiveDate) -> Option<&str> {
        daily_tip_index(date, self.tips.len()).map(|idx| self.tips[idx].as_str())
    }

    /// `count` distinct topics for `date`.
    ///
    /// A cached list for the same date is returned verbatim. Anything else
    /// is regenerated and written back; store failures are logged and the
    /// freshly computed list is still returned.
    pub fn suggested_topics(&self, date: NaiveDate, count: usize) -> Vec<String> {
        let key = date_key(date);

        if let Some(cached) = load_json::<DailyTopicsCache>(self.store.as_ref(), DAILY_TOPICS_KEY) {
            if cached.date == key {
                tracing::debug!(date = %key, "daily topics cache hit");
                return cached.topics;
            }
            tracing::debug!(cached = %cached.date, today = %key, "daily topics cache stale");
        }

        let topics: Vec<String> = seeded_shuffle(&self.topics, topic_seed(date))
            .into_iter()
            .take(count)
            .collect();

        let cache = DailyTopicsCache {
            date: key,
            topics: topics.clone(),
        };
        if let Err(e) = save_json(self.store.as_ref(), DAILY_TOPICS_KEY, &cache) {
            tracing::warn!(error = %e, "failed to save daily topics");
        }

        topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::collections::HashSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn selector() -> (Arc<MemoryStore>, DailySelector) {
        let store = Arc::new(MemoryStore::new());
        let selector = DailySelector::new(store.clone());
        (store, selector)
    }

    #[test]
    fn test_topic_seed_matches_fold() {
        assert_eq!(topic_seed(date(2024, 3, 15)), ((17 * 31 + 2024) * 31 + 3) * 31 + 15);
        assert_eq!(topic_seed(date(2024, 3, 15)), 2_451_619);
    }

    #[test]
    fn test_tip_seed() {
        assert_eq!(tip_seed(date(2024, 3, 15)), 20_240_315);
        assert_eq!(tip_seed(date(2025, 1, 1)), 20_250_101);
    }

    #[test]
    fn test_date_key_is_zero_padded() {
        assert_eq!(date_key(date(2024, 3, 5)), "2024-03-05");
    }

    #[test]
    fn test_shuffle_reference_permutation() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(seeded_shuffle(&items, 42), vec![0, 7, 3, 5, 2, 1, 8, 9, 4, 6]);
    }

    #[test]
    fn test_shuffle_is_deterministic_permutation() {
        let items: Vec<u32> = (0..50).collect();
        let a = seeded_shuffle(&items, 123);
        let b = seeded_shuffle(&items, 123);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, items);
    }

    #[test]
    fn test_shuffle_empty_and_single() {
        assert!(seeded_shuffle::<u8>(&[], 1).is_empty());
        assert_eq!(seeded_shuffle(&["only"], 1), vec!["only"]);
    }

    #[test]
    fn test_reference_topics_for_2024_03_15() {
        let (_, selector) = selector();
        assert_eq!(
            selector.suggested_topics(date(2024, 3, 15), 5),
            vec![
                "Black Holes",
                "Plate Tectonics",
                "Dark Matter and Dark Energy",
                "Game Theory",
                "The workings of the Stock Market",
            ]
        );
    }

    #[test]
    fn test_topics_are_distinct_and_from_master_list() {
        let (_, selector) = selector();
        let topics = selector.suggested_topics(date(2025, 6, 1), 10);
        assert_eq!(topics.len(), 10);
        let unique: HashSet<_> = topics.iter().collect();
        assert_eq!(unique.len(), 10);
        for t in &topics {
            assert!(master_topics().contains(t));
        }
    }

    #[test]
    fn test_topics_change_with_date() {
        let (_, selector) = selector();
        let a = selector.suggested_topics(date(2024, 3, 15), 5);
        let b = selector.suggested_topics(date(2024, 3, 16), 5);
        assert_ne!(a, b);
        assert_eq!(
            b,
            vec![
                "The Human Microbiome",
                "CRISPR Gene Editing",
                "The French Revolution",
                "Evolution by Natural Selection",
                "The workings of the Stock Market",
            ]
        );
    }

    #[test]
    fn test_cache_hit_returns_stored_list_verbatim() {
        let (store, selector) = selector();
        let cache = DailyTopicsCache {
            date: "2024-03-15".into(),
            topics: vec!["Cached Topic".into()],
        };
        save_json(store.as_ref(), DAILY_TOPICS_KEY, &cache).unwrap();

        assert_eq!(
            selector.suggested_topics(date(2024, 3, 15), 5),
            vec!["Cached Topic".to_string()]
        );
    }

    #[test]
    fn test_stale_cache_is_replaced() {
        let (store, selector) = selector();
        let stale = DailyTopicsCache {
            date: "2024-03-14".into(),
            topics: vec!["Old".into()],
        };
        save_json(store.as_ref(), DAILY_TOPICS_KEY, &stale).unwrap();

        let topics = selector.suggested_topics(date(2024, 3, 15), 5);
        assert_eq!(topics.len(), 5);

        let stored: DailyTopicsCache = load_json(store.as_ref(), DAILY_TOPICS_KEY).unwrap();
        assert_eq!(stored.date, "2024-03-15");
        assert_eq!(stored.topics, topics);
    }

    #[test]
    fn test_malformed_cache_is_regenerated() {
        let (store, selector) = selector();
        store.set(DAILY_TOPICS_KEY, "not json").unwrap();
        assert_eq!(selector.suggested_topics(date(2024, 3, 15), 3).len(), 3);
    }

    #[test]
    fn test_count_larger_than_list_is_clamped() {
        let store = Arc::new(MemoryStore::new());
        let selector = DailySelector::with_lists(
            store,
            vec!["a".into(), "b".into(), "c".into()],
            vec![],
        );
        assert_eq!(selector.suggested_topics(date(2024, 1, 1), 10).len(), 3);
    }

    #[test]
    fn test_reference_daily_tips() {
        let (_, selector) = selector();
        assert_eq!(daily_tip_index(date(2024, 3, 15), 15), Some(5));
        assert_eq!(daily_tip_index(date(2025, 1, 1), 15), Some(12));
        assert!(selector
            .daily_tip(date(2024, 3, 15))
            .unwrap()
            .starts_with("To learn AI, start with Python!"));
    }

    #[test]
    fn test_daily_tip_is_stable_and_in_range() {
        let (_, selector) = selector();
        let mut d = date(2024, 1, 1);
        for _ in 0..400 {
            let idx = daily_tip_index(d, 15).unwrap();
            assert!(idx < 15);
            assert_eq!(selector.daily_tip(d), selector.daily_tip(d));
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_daily_tip_empty_list() {
        assert_eq!(daily_tip_index(date(2024, 1, 1), 0), None);
        let selector = DailySelector::with_lists(Arc::new(MemoryStore::new()), vec![], vec![]);
        assert_eq!(selector.daily_tip(date(2024, 1, 1)), None);
    }
}
