use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

type Values = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Execution context handed down the interceptor chain into the job body.
///
/// Values are keyed by type and immutable: [`Context::with_value`] returns a
/// derived context and leaves `self` untouched, so an interceptor's additions
/// are only visible downstream of it.
#[derive(Clone, Default)]
pub struct Context {
    values: Arc<Values>,
    cancel: CancellationToken,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose cancellation follows `token`.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            values: Arc::default(),
            cancel: token,
        }
    }

    /// Derive a context carrying `value`, replacing any previous value of the same type.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        let mut values = Values::clone(&self.values);
        values.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            values: Arc::new(values),
            cancel: self.cancel.clone(),
        }
    }

    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// True once the owning controller has stopped.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the owning controller stops. Jobs that want to bail out
    /// early can `select!` on this.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.values.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
