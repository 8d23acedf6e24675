//! The per-scanner [`Environment`] carried through `init` -> `init_domain` ->
//! `scan` -> `post_scan` -> `finalize`.
//!
//! One reserved entry, the *fast cache*, is a large in-memory lookup table
//! shared across every domain task of one scanner. It is aliased through an
//! `Arc` rather than deep-copied when the environment is cloned for a
//! domain task, and it is never serialized into the remote executor's
//! envelope (see the `#[serde(skip)]` below and [`Environment::without_fast_cache`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Whether a scanner's domain tasks are dispatched to the [`crate::local_executor`]
/// or the [`crate::remote_executor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMethod {
    Local,
    Remote,
}

/// A mapping merged into an [`Environment`] by `init` or `init_domain`.
pub type EnvDelta = HashMap<String, Value>;

/// The environment passed to every scanner lifecycle hook.
///
/// `extra` holds whatever a scanner's `init`/`init_domain` hooks added.
/// `fast_cache`, if present, is never included in `Serialize` output and is
/// cheap to clone (an `Arc` bump, not a deep copy) — see module docs.
#[derive(Debug, Clone, Serialize)]
pub struct Environment {
    pub scan_method: ScanMethod,
    pub scan_uuid: Uuid,
    pub workers: usize,
    #[serde(flatten)]
    pub extra: EnvDelta,
    #[serde(skip)]
    pub fast_cache: Option<Arc<Value>>,
}

impl Environment {
    pub fn new(scan_method: ScanMethod, scan_uuid: Uuid, workers: usize) -> Self {
        Self {
            scan_method,
            scan_uuid,
            workers,
            extra: HashMap::new(),
            fast_cache: None,
        }
    }

    /// Merges an optional delta returned by `init`/`init_domain` into `extra`.
    pub fn merge(&mut self, delta: Option<EnvDelta>) {
        if let Some(delta) = delta {
            self.extra.extend(delta);
        }
    }

    /// Removes the fast-cache key before this environment is handed to the
    /// remote executor. `Serialize` already skips `fast_cache`, but this is
    /// also called before `init_domain`'s per-scan copy is dispatched, so
    /// that a misbehaving `init_domain` implementation can't resurrect it
    /// under a different key by reading `extra` and re-inserting it.
    pub fn without_fast_cache(mut self) -> Self {
        self.fast_cache = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_cache_is_excluded_from_serialization() {
        let mut env = Environment::new(ScanMethod::Local, Uuid::nil(), 4);
        env.fast_cache = Some(Arc::new(serde_json::json!({"big": "table"})));
        env.extra
            .insert("note".to_string(), Value::String("hi".to_string()));

        let encoded = serde_json::to_value(&env).unwrap();
        assert_eq!(encoded.get("fast_cache"), None);
        assert_eq!(encoded.get("note").unwrap(), "hi");
        assert_eq!(encoded.get("scan_method").unwrap(), "local");
    }

    #[test]
    fn clone_aliases_fast_cache_instead_of_deep_copying() {
        let mut env = Environment::new(ScanMethod::Remote, Uuid::nil(), 1);
        env.fast_cache = Some(Arc::new(serde_json::json!([1, 2, 3])));

        let cloned = env.clone();
        let original_ptr = Arc::as_ptr(env.fast_cache.as_ref().unwrap());
        let cloned_ptr = Arc::as_ptr(cloned.fast_cache.as_ref().unwrap());
        assert_eq!(original_ptr, cloned_ptr);
        assert_eq!(Arc::strong_count(env.fast_cache.as_ref().unwrap()), 2);
    }

    #[test]
    fn merge_extends_extra_without_touching_fast_cache() {
        let mut env = Environment::new(ScanMethod::Local, Uuid::nil(), 1);
        env.fast_cache = Some(Arc::new(Value::Null));

        let mut delta = EnvDelta::new();
        delta.insert("k".to_string(), Value::from(1));
        env.merge(Some(delta));

        assert_eq!(env.extra.get("k").unwrap(), 1);
        assert!(env.fast_cache.is_some());
    }
}
