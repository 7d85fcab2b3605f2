use crate::registry::StageId;
use crate::view::MergedView;
use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for async boxed futures used by stage computations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type ComputeFn<T> = Arc<dyn Fn(MergedView) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// A user-supplied computation over the merged view.
///
/// Each computation gets a [`StageId`] when built. Clones share it, which is
/// what `depends_on` refers to.
pub struct Computation<T> {
    id: StageId,
    f: ComputeFn<T>,
}

impl<T> Clone for Computation<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            f: self.f.clone(),
        }
    }
}

impl<T> fmt::Debug for Computation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation").field("id", &self.id).finish()
    }
}

impl<T: Send + 'static> Computation<T> {
    /// Wraps an async function. It receives its own copy of the view, so the
    /// future may hold it across awaits.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(MergedView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let f: ComputeFn<T> = Arc::new(
            move |view: MergedView| -> BoxFuture<'static, anyhow::Result<T>> { Box::pin(f(view)) },
        );
        Self {
            id: StageId::next(),
            f,
        }
    }

    /// Wraps a synchronous function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&MergedView) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::new(move |view: MergedView| std::future::ready(f(&view)))
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    /// Runs the computation. A panic inside it is returned as an error.
    pub async fn call(&self, view: MergedView) -> anyhow::Result<T> {
        AssertUnwindSafe(async { (self.f)(view).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(anyhow::anyhow!(
                    "computation {} panicked: {}",
                    self.id,
                    panic_message(panic.as_ref())
                ))
            })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
