//! Method name -> handler table.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::types::{McpError, McpResult, Params};

/// Boxed future returned by deferred handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = McpResult<Value>> + Send>>;

type SyncFn = dyn Fn(Params) -> McpResult<Value> + Send + Sync;
type AsyncFn = dyn Fn(Params) -> HandlerFuture + Send + Sync;

/// A method handler: either computes its result immediately or returns a
/// future the dispatcher awaits.
#[derive(Clone)]
pub enum Handler {
    Sync(Arc<SyncFn>),
    Async(Arc<AsyncFn>),
}

impl Handler {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Params) -> McpResult<Value> + Send + Sync + 'static,
    {
        Handler::Sync(Arc::new(f))
    }

    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<Value>> + Send + 'static,
    {
        Handler::Async(Arc::new(move |params: Params| -> HandlerFuture {
            Box::pin(f(params))
        }))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Handler::Async(_))
    }

    /// Run the handler to completion.
    ///
    /// A panicking handler becomes an internal error. Async handlers run on
    /// their own task, but the caller still waits for them before returning.
    pub async fn invoke(&self, params: Params) -> McpResult<Value> {
        match self {
            Handler::Sync(f) => std::panic::catch_unwind(AssertUnwindSafe(|| f(params)))
                .unwrap_or_else(|payload| Err(panic_error(payload))),
            Handler::Async(f) => match tokio::spawn(f(params)).await {
                Ok(result) => result,
                Err(join) if join.is_panic() => Err(panic_error(join.into_panic())),
                Err(join) => Err(McpError::InternalError(join.to_string())),
            },
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Sync(_) => f.write_str("Handler::Sync"),
            Handler::Async(_) => f.write_str("Handler::Async"),
        }
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> McpError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "handler panicked".to_string());
    McpError::InternalError(message)
}

/// Registered handlers, keyed by method name. Registering an existing name
/// replaces the previous handler.
#[derive(Debug, Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: &str, handler: Handler) {
        if self.handlers.insert(method.to_string(), handler).is_some() {
            tracing::debug!("Replaced handler for {method}");
        }
    }

    pub fn register_sync<F>(&mut self, method: &str, f: F)
    where
        F: Fn(Params) -> McpResult<Value> + Send + Sync + 'static,
    {
        self.register(method, Handler::sync(f));
    }

    pub fn register_async<F, Fut>(&mut self, method: &str, f: F)
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<Value>> + Send + 'static,
    {
        self.register(method, Handler::deferred(f));
    }

    /// Returns true if a handler was removed.
    pub fn unregister(&mut self, method: &str) -> bool {
        self.handlers.remove(method).is_some()
    }

    pub fn get(&self, method: &str) -> Option<&Handler> {
        self.handlers.get(method)
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
