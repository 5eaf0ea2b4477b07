//! Async memoization on top of [`ContentCache`].
//!
//! Concurrent callers that miss on the same key each run the wrapped operation; the last
//! one to finish wins the slot. Errors are handed back to the caller and never stored.

use std::{any::Any, future::Future, sync::Arc, time::Duration};

use futures::{FutureExt, future::BoxFuture};

use super::store::ContentCache;

type LoadFn<A, T, E> = dyn Fn(A) -> BoxFuture<'static, Result<T, E>> + Send + Sync;
type KeyFn<A> = dyn Fn(&A) -> String + Send + Sync;

pub struct Memoized<A, T, E> {
    cache: Arc<ContentCache>,
    load: Arc<LoadFn<A, T, E>>,
    key_fn: Arc<KeyFn<A>>,
    ttl: Option<Duration>,
}

impl<A, T, E> Clone for Memoized<A, T, E> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            load: Arc::clone(&self.load),
            key_fn: Arc::clone(&self.key_fn),
            ttl: self.ttl,
        }
    }
}

/// Wrap `load` so that results are cached under `key_fn(args)` for `ttl`.
pub fn memoize<A, T, E, F, Fut, K>(
    cache: Arc<ContentCache>,
    load: F,
    key_fn: K,
    ttl: Option<Duration>,
) -> Memoized<A, T, E>
where
    A: 'static,
    T: 'static,
    E: 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    K: Fn(&A) -> String + Send + Sync + 'static,
{
    let load: Arc<LoadFn<A, T, E>> = Arc::new(move |args: A| load(args).boxed());
    Memoized {
        cache,
        load,
        key_fn: Arc::new(key_fn),
        ttl,
    }
}

impl<A, T, E> Memoized<A, T, E>
where
    T: Any + Send + Sync,
{
    pub async fn call(&self, args: A) -> Result<Arc<T>, E> {
        let key = (self.key_fn)(&args);
        if let Some(hit) = self.cache.get::<T>(&key) {
            return Ok(hit);
        }

        let value = Arc::new((self.load)(args).await?);
        self.cache.set_shared(key, Arc::clone(&value), self.ttl);
        Ok(value)
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }
}
