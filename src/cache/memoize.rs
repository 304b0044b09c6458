//! Memoized calls
//!
//! Wraps an async function so that repeated calls with the same arguments are
//! answered from the cache instead of re-running the function.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheManager, CacheValue, SetOptions};

/// Custom cache key policy for a memoized function.
pub type KeyBuilder<A> = Arc<dyn Fn(&A) -> String + Send + Sync>;

// == Memoize Options ==
pub struct MemoizeOptions<A> {
    /// TTL of cached results in seconds
    pub ttl: Option<u64>,
    /// Namespace override; defaults to the defining module path
    pub namespace: Option<String>,
    pub key_builder: Option<KeyBuilder<A>>,
}

impl<A> Default for MemoizeOptions<A> {
    fn default() -> Self {
        Self {
            ttl: None,
            namespace: None,
            key_builder: None,
        }
    }
}

impl<A> MemoizeOptions<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl = Some(ttl_secs);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn key_builder<K>(mut self, builder: K) -> Self
    where
        K: Fn(&A) -> String + Send + Sync + 'static,
    {
        self.key_builder = Some(Arc::new(builder));
        self
    }
}

// == Cached Fn ==
/// An async function whose results are cached by argument.
///
/// On a hit the wrapped function is not invoked at all, so its side effects
/// only happen on misses.
pub struct CachedFn<A, F> {
    manager: Arc<CacheManager>,
    name: String,
    namespace: String,
    ttl: Option<u64>,
    key_builder: Option<KeyBuilder<A>>,
    func: F,
    _args: PhantomData<fn(A)>,
}

impl<A, F> CachedFn<A, F>
where
    A: Serialize,
{
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The cache key `args` map to, or None if the arguments cannot be
    /// serialized.
    pub fn cache_key(&self, args: &A) -> Option<String> {
        if let Some(builder) = &self.key_builder {
            return Some(builder(args));
        }

        match serde_json::to_value(args) {
            Ok(value) => Some(default_call_key(&self.name, &value)),
            Err(e) => {
                warn!(function = %self.name, error = %e, "arguments not serializable, bypassing cache");
                None
            }
        }
    }

    /// Calls the function through the cache.
    ///
    /// Errors from the function are returned as-is and never cached. A cached
    /// value that no longer decodes into `T` counts as a miss.
    pub async fn call<Fut, T, E>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize + DeserializeOwned,
    {
        let Some(key) = self.cache_key(&args) else {
            return (self.func)(args).await;
        };

        if let Some(cached) = self.manager.get(&key, &self.namespace).await {
            match serde_json::from_value::<T>(cached.to_json()) {
                Ok(result) => return Ok(result),
                Err(e) => debug!(%key, error = %e, "cached result has a different shape, recomputing"),
            }
        }

        let result = (self.func)(args).await?;

        match serde_json::to_value(&result) {
            Ok(json) => {
                let mut options = SetOptions::new().namespace(self.namespace.as_str());
                options.ttl = self.ttl;
                self.manager
                    .set(&key, CacheValue::Structured(json), options)
                    .await;
            }
            Err(e) => warn!(%key, error = %e, "result not serializable, not caching"),
        }

        Ok(result)
    }
}

impl CacheManager {
    /// Wraps `func` in a [`CachedFn`]. Prefer the [`cached!`](crate::cached)
    /// macro, which fills in `name` and `module` automatically.
    pub fn memoize<A, F, Fut, T, E>(
        self: &Arc<Self>,
        name: &str,
        module: &str,
        func: F,
        options: MemoizeOptions<A>,
    ) -> CachedFn<A, F>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        CachedFn {
            manager: Arc::clone(self),
            name: name.to_string(),
            namespace: options.namespace.unwrap_or_else(|| module.to_string()),
            ttl: options.ttl,
            key_builder: options.key_builder,
            func,
            _args: PhantomData,
        }
    }
}

/// Default key scheme: `name:positional...:k=v...`, keywords sorted by name.
///
/// Arrays (tuples) are positional arguments, objects (structs, maps) are
/// keyword arguments, any other scalar is a single positional argument.
pub fn default_call_key(name: &str, args: &Value) -> String {
    let mut parts = vec![name.to_string()];

    match args {
        Value::Null => {}
        Value::Array(items) => parts.extend(items.iter().map(arg_to_string)),
        Value::Object(map) => {
            let mut keywords: Vec<(&String, &Value)> = map.iter().collect();
            keywords.sort_by(|a, b| a.0.cmp(b.0));
            parts.extend(
                keywords
                    .into_iter()
                    .map(|(k, v)| format!("{}={}", k, arg_to_string(v))),
            );
        }
        scalar => parts.push(arg_to_string(scalar)),
    }

    parts.join(":")
}

fn arg_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Memoizes an async function through a [`CacheManager`](crate::cache::CacheManager).
///
/// ```ignore
/// let lookup = cached!(manager, fetch_user, MemoizeOptions::new().ttl(300));
/// let user = lookup.call((42,)).await?;
/// ```
#[macro_export]
macro_rules! cached {
    ($manager:expr, $func:path) => {
        $crate::cached!($manager, $func, $crate::cache::MemoizeOptions::default())
    };
    ($manager:expr, $func:path, $options:expr) => {
        $manager.memoize(stringify!($func), module_path!(), $func, $options)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryRemote;
    use crate::config::Config;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Report {
        id: u32,
        total: f64,
    }

    fn manager() -> Arc<CacheManager> {
        Arc::new(CacheManager::new(Config::default(), Arc::new(MemoryRemote::new())).unwrap())
    }

    #[test]
    fn test_default_call_key() {
        assert_eq!(default_call_key("f", &json!(null)), "f");
        assert_eq!(default_call_key("f", &json!([1, "a", true])), "f:1:a:true");
        assert_eq!(default_call_key("f", &json!({"b": 2, "a": "x"})), "f:a=x:b=2");
        assert_eq!(default_call_key("f", &json!(7)), "f:7");
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let manager = manager();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let build = manager.memoize(
            "build_report",
            module_path!(),
            move |(id,): (u32,)| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(Report { id, total: 12.5 })
                }
            },
            MemoizeOptions::new().ttl(60),
        );

        let first = build.call((1,)).await.unwrap();
        let second = build.call((1,)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        build.call((2,)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_namespace_defaults_to_module() {
        let manager = manager();
        let double = manager.memoize(
            "double",
            module_path!(),
            |n: i64| async move { Ok::<_, anyhow::Error>(n * 2) },
            MemoizeOptions::new(),
        );

        assert_eq!(double.namespace(), module_path!());
        assert_eq!(double.call(21).await.unwrap(), 42);
        let stored = manager.get("double:21", module_path!()).await.unwrap();
        assert_eq!(stored.to_json(), json!(42));
    }

    #[tokio::test]
    async fn test_custom_key_builder_and_namespace() {
        let manager = manager();
        let greet = manager.memoize(
            "greet",
            module_path!(),
            |name: String| async move { Ok::<_, anyhow::Error>(format!("hello {}", name)) },
            MemoizeOptions::new()
                .namespace("greetings")
                .key_builder(|name: &String| format!("greet-{}", name.to_lowercase())),
        );

        assert_eq!(greet.call("Ana".to_string()).await.unwrap(), "hello Ana");
        // Same key after lowercasing, so the cached greeting is returned
        assert_eq!(greet.call("ANA".to_string()).await.unwrap(), "hello Ana");
        assert!(manager.get("greet-ana", "greetings").await.is_some());
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let manager = manager();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let flaky = manager.memoize(
            "flaky",
            module_path!(),
            move |_: ()| {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(anyhow::anyhow!("first call fails"))
                    } else {
                        Ok("recovered".to_string())
                    }
                }
            },
            MemoizeOptions::new(),
        );

        assert!(flaky.call(()).await.is_err());
        assert_eq!(flaky.call(()).await.unwrap(), "recovered");
        assert_eq!(flaky.call(()).await.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    async fn lookup_total(id: u32) -> anyhow::Result<f64> {
        Ok(id as f64 * 1.5)
    }

    #[tokio::test]
    async fn test_cached_macro() {
        let manager = manager();
        let lookup = crate::cached!(manager, lookup_total, MemoizeOptions::new().ttl(30));

        assert_eq!(lookup.namespace(), module_path!());
        assert_eq!(lookup.call(4).await.unwrap(), 6.0);
        assert_eq!(lookup.call(4).await.unwrap(), 6.0);
        assert!(manager.get("lookup_total:4", module_path!()).await.is_some());
    }
}
