use dns_message::Message;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// §4.5 TTL cache: keyed by requested name, longest-suffix lookup on read,
/// lazy expiry sweep, TTL decay surfaced on every read. Guarded by a single
/// `std::sync::Mutex` per §5 ("adequate for this workload").
#[derive(Debug, Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<String, (SystemTime, Message)>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Unconditionally overwrites any existing entry for `name`. Expiry is
    /// computed from `response.ttl()` at write time.
    #[tracing::instrument(skip(self, response), fields(name))]
    pub fn add(&self, name: &str, response: Message) {
        let ttl = response.ttl().unwrap_or(0);
        let expiry = SystemTime::now() + Duration::from_secs(u64::from(ttl));
        tracing::debug!(ttl, "caching response");
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert(name.to_string(), (expiry, response));
    }

    /// Sweeps expired entries, then returns the entry whose key is the
    /// longest suffix of `query`, with its `ttl` field rewritten to the
    /// remaining seconds. Returning a freshly-cloned [`Message`] (rather
    /// than mutating the stored one in place) sidesteps the read/read TTL
    /// race §9 flags against the in-place mutation the source performs.
    #[tracing::instrument(skip(self))]
    pub fn get(&self, query: &str) -> Option<Message> {
        let now = SystemTime::now();
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.retain(|_, (expiry, _)| *expiry > now);

        let hit = entries
            .iter()
            .filter(|(key, _)| query.ends_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, (expiry, message))| (*expiry, message.clone()));
        drop(entries);

        hit.map(|(expiry, mut message)| {
            let remaining = expiry
                .duration_since(now)
                .unwrap_or(Duration::ZERO)
                .as_secs() as u32;
            message.set_updated_ttl(remaining);
            message
        })
    }
}

/// Async façade over [`TtlCache`], matching the `Handler`/resolver call
/// sites which are themselves async.
#[async_trait::async_trait]
pub trait CacheService: Send + Sync {
    async fn add(&self, name: &str, response: Message);
    async fn get(&self, query: &str) -> Option<Message>;
}

#[async_trait::async_trait]
impl CacheService for TtlCache {
    async fn add(&self, name: &str, response: Message) {
        TtlCache::add(self, name, response)
    }

    async fn get(&self, query: &str) -> Option<Message> {
        TtlCache::get(self, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_message::ResponseParams;
    use similar_asserts::assert_eq;

    fn response_with_ttl(ttl: u32) -> Message {
        let mut msg = Message::new_response(None);
        msg.set_resp(
            "127.0.0.17",
            ResponseParams {
                ttl,
                ..Default::default()
            },
        );
        msg
    }

    #[test]
    fn add_then_get_returns_entry() {
        let cache = TtlCache::new();
        cache.add("windows.pcpools.fuberlin", response_with_ttl(60));
        let found = cache.get("windows.pcpools.fuberlin").unwrap();
        assert_eq!(found.address(), Some("127.0.0.17"));
    }

    #[test]
    fn get_returns_longest_suffix_match() {
        let cache = TtlCache::new();
        cache.add("fuberlin", response_with_ttl(300));
        cache.add("pcpools.fuberlin", response_with_ttl(60));
        let found = cache.get("new.pcpools.fuberlin").unwrap();
        assert_eq!(found.ttl(), Some(60));
    }

    #[test]
    fn expired_entry_is_swept_on_read() {
        let cache = TtlCache::new();
        cache.add("fuberlin", response_with_ttl(0));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("fuberlin").is_none());
        // swept, not merely hidden
        assert!(cache.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn ttl_decays_monotonically() {
        let cache = TtlCache::new();
        cache.add("fuberlin", response_with_ttl(2));
        let first = cache.get("fuberlin").unwrap().ttl().unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        let second = cache.get("fuberlin").unwrap().ttl().unwrap();
        assert!(second < first);
        assert!(second > 0);
    }

    #[test]
    fn add_overwrites_existing_entry() {
        let cache = TtlCache::new();
        cache.add("fuberlin", response_with_ttl(300));
        cache.add("fuberlin", response_with_ttl(5));
        assert_eq!(cache.get("fuberlin").unwrap().ttl(), Some(5));
    }

    #[test]
    fn reading_stored_message_is_not_mutated_in_place() {
        let cache = TtlCache::new();
        cache.add("fuberlin", response_with_ttl(60));
        let _ = cache.get("fuberlin");
        // a second read sees an undisturbed stored entry and derives its
        // own remaining ttl independently, not a previously-mutated value
        let second = cache.get("fuberlin").unwrap();
        assert!(second.ttl().unwrap() <= 60);
    }
}
