use std::collections::{BTreeMap, VecDeque};

use dashmap::DashMap;

/// Most-recent-N raw samples per aggregation key.
///
/// Keys are created on first append and live as long as the store. Reads
/// always hand back copies, so callers can sort or scan without racing
/// concurrent appends.
#[derive(Debug)]
pub struct WindowStore {
    capacity: usize,
    windows: DashMap<String, VecDeque<f64>>,
}

impl WindowStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            windows: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&self, key: &str, value: f64) {
        if let Some(mut window) = self.windows.get_mut(key) {
            push_bounded(&mut window, value, self.capacity);
            return;
        }
        let mut window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity.min(64)));
        push_bounded(&mut window, value, self.capacity);
    }

    pub fn read(&self, key: &str) -> Option<Vec<f64>> {
        self.windows
            .get(key)
            .map(|window| window.iter().copied().collect())
    }

    pub fn len(&self, key: &str) -> usize {
        self.windows.get(key).map(|window| window.len()).unwrap_or(0)
    }

    pub fn key_count(&self) -> usize {
        self.windows.len()
    }

    /// Copies every window, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<f64>> {
        self.windows
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().iter().copied().collect()))
            .collect()
    }
}

/// One window store per event family. Request windows are keyed
/// `method:endpoint`, call windows `provider:name`.
#[derive(Debug)]
pub struct LatencyWindows {
    pub requests: WindowStore,
    pub model_calls: WindowStore,
    pub tool_calls: WindowStore,
}

impl LatencyWindows {
    pub fn new(capacity: usize) -> Self {
        Self {
            requests: WindowStore::new(capacity),
            model_calls: WindowStore::new(capacity),
            tool_calls: WindowStore::new(capacity),
        }
    }
}

pub fn aggregation_key(first: &str, second: &str) -> String {
    format!("{first}:{second}")
}

fn push_bounded(window: &mut VecDeque<f64>, value: f64, capacity: usize) {
    window.push_back(value);
    while window.len() > capacity {
        window.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_past_capacity() {
        let store = WindowStore::new(1000);
        for i in 1..=1000 {
            store.append("GET:/api/list_models", f64::from(i) * 0.01);
        }
        assert_eq!(store.len("GET:/api/list_models"), 1000);

        store.append("GET:/api/list_models", 99.0);
        let window = store.read("GET:/api/list_models").unwrap();
        assert_eq!(window.len(), 1000);
        assert_eq!(window[0], 0.02);
        assert_eq!(window[999], 99.0);
    }

    #[test]
    fn read_is_a_copy() {
        let store = WindowStore::new(10);
        store.append("k", 1.0);
        let before = store.read("k").unwrap();
        store.append("k", 2.0);
        assert_eq!(before, vec![1.0]);
        assert_eq!(store.read("k").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn missing_key_reads_none() {
        let store = WindowStore::new(10);
        assert!(store.read("nope").is_none());
        assert_eq!(store.len("nope"), 0);
        assert_eq!(store.key_count(), 0);
    }

    #[test]
    fn capacity_is_at_least_one() {
        assert_eq!(WindowStore::new(0).capacity(), 1);
        let windows = LatencyWindows::new(25);
        assert_eq!(windows.requests.capacity(), 25);
        assert_eq!(windows.model_calls.capacity(), 25);
        assert_eq!(windows.tool_calls.capacity(), 25);
    }

    #[test]
    fn concurrent_appends_respect_capacity() {
        let store = WindowStore::new(100);
        std::thread::scope(|scope| {
            for t in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..500 {
                        store.append("shared", f64::from(t * 1000 + i));
                        store.append(&format!("own-{t}"), f64::from(i));
                    }
                });
            }
        });
        assert_eq!(store.len("shared"), 100);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 5);
        for t in 0..4 {
            assert_eq!(snapshot[&format!("own-{t}")].len(), 100);
            assert_eq!(snapshot[&format!("own-{t}")][99], 499.0);
        }
    }
}
