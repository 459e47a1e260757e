//! Subscriber callbacks.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type Callback<T> = dyn Fn(Arc<T>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// A subscriber callback for payloads of type `T`.
///
/// Handlers are compared by identity: clones of one handler are equal to each
/// other, two handlers built from identical closures are not. Keep a clone
/// around to [`unregister`](crate::AsyncEvent::unregister) it later.
pub struct Handler<T> {
    callback: Arc<Callback<T>>,
}

impl<T: Send + Sync + 'static> Handler<T> {
    /// Wrap an async closure as a handler.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            callback: Arc::new(move |payload: Arc<T>| f(payload).boxed()),
        }
    }

    pub(crate) fn call(&self, payload: Arc<T>) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.callback)(payload)
    }
}

impl<T> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T> PartialEq for Handler<T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.callback), Arc::as_ptr(&other.callback))
    }
}

impl<T> Eq for Handler<T> {}

impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&Arc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}
