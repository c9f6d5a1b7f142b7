use std::collections::HashMap;

/// Read-only view of a running container as reported by the container runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningContainer {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub image_id: String,
}

/// Digests resolved during this run, keyed by the image string the container was started with.
#[derive(Debug, Default)]
pub struct DigestCache(HashMap<String, String>);

impl DigestCache {
    pub fn get(&self, image: &str) -> Option<&str> {
        self.0.get(image).map(String::as_str)
    }

    pub fn insert(&mut self, image: &str, digest: String) {
        self.0.entry(image.to_string()).or_insert(digest);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    pub updates_pending: bool,
}

impl RunResult {
    pub fn exit_code(&self, signal_updates_via_exit_code: bool) -> u8 {
        if self.updates_pending && signal_updates_via_exit_code {
            2
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_keeps_first_digest() {
        let mut cache = DigestCache::default();
        assert_eq!(cache.get("nginx"), None);
        cache.insert("nginx", "sha256:aaa".to_string());
        cache.insert("nginx", "sha256:bbb".to_string());
        assert_eq!(cache.get("nginx"), Some("sha256:aaa"));
        assert_eq!(cache.get("Nginx"), None);
    }

    #[test]
    fn test_exit_code() {
        let stale = RunResult {
            updates_pending: true,
        };
        assert_eq!(stale.exit_code(true), 2);
        assert_eq!(stale.exit_code(false), 0);
        assert_eq!(RunResult::default().exit_code(true), 0);
    }
}
