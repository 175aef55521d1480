use std::sync::Arc;

/// A scheduler callback.
///
/// `Fn` rather than `FnMut`/`FnOnce` because a periodic task's closure is
/// invoked repeatedly from the worker pool without ever being consumed —
/// state that needs to change between firings belongs behind interior
/// mutability inside the closure's captures.
pub type BoxedCallback = Arc<dyn Fn() + Send + Sync>;

pub fn boxed<F>(f: F) -> BoxedCallback
where
    F: Fn() + Send + Sync + 'static,
{
    Arc::new(f)
}
