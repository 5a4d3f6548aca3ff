use std::future::Future;

use async_trait::async_trait;

use crate::context::Context;

/// Display name used for jobs whose logic has no meaningful type name.
pub const NAMELESS: &str = "(nameless)";

/// User logic that a controller can schedule.
#[async_trait]
pub trait Task: Send + Sync {
    async fn run(&self, ctx: Context) -> anyhow::Result<()>;

    /// Display name shown in listings. Defaults to the implementing type's name.
    fn name(&self) -> Option<String> {
        None
    }
}

/// Adapts an async closure into a [`Task`]. Always listed as `"(nameless)"`.
#[derive(Clone)]
pub struct Func<F>(F);

pub fn func<F, Fut>(f: F) -> Func<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    Func(f)
}

#[async_trait]
impl<F, Fut> Task for Func<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn run(&self, ctx: Context) -> anyhow::Result<()> {
        (self.0)(ctx).await
    }

    fn name(&self) -> Option<String> {
        Some(NAMELESS.to_string())
    }
}

/// Resolve the display name of `task`: its own `name()`, else its type name.
pub fn task_name<T: Task>(task: &T) -> String {
    task.name().unwrap_or_else(type_display_name::<T>)
}

/// Last path segment of `T`'s type name with generic arguments removed.
/// Closures and other anonymous types map to [`NAMELESS`].
pub fn type_display_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    if full.ends_with("}}") {
        return NAMELESS.to_string();
    }
    let base = full.split('<').next().unwrap_or(full);
    let name = base.rsplit("::").next().unwrap_or(base);
    if name.is_empty() || name.contains("{{") || name == "Func" {
        NAMELESS.to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SendEmail;

    #[async_trait]
    impl Task for SendEmail {
        async fn run(&self, _ctx: Context) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Renamed;

    #[async_trait]
    impl Task for Renamed {
        async fn run(&self, _ctx: Context) -> anyhow::Result<()> {
            Ok(())
        }

        fn name(&self) -> Option<String> {
            Some("nightly-report".to_string())
        }
    }

    struct Wrapper<T>(T);

    #[async_trait]
    impl<T: Send + Sync> Task for Wrapper<T> {
        async fn run(&self, _ctx: Context) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn type_name_is_used_by_default() {
        assert_eq!(task_name(&SendEmail), "SendEmail");
    }

    #[test]
    fn explicit_name_wins() {
        assert_eq!(task_name(&Renamed), "nightly-report");
    }

    #[test]
    fn generics_are_stripped() {
        assert_eq!(task_name(&Wrapper(SendEmail)), "Wrapper");
    }

    #[test]
    fn closures_are_nameless() {
        let job = func(|_ctx| async { anyhow::Ok(()) });
        assert_eq!(task_name(&job), NAMELESS);

        let closure = || ();
        fn name_of<T>(_: &T) -> String {
            type_display_name::<T>()
        }
        assert_eq!(name_of(&closure), NAMELESS);
    }

    #[tokio::test]
    async fn func_runs_the_closure() {
        let job = func(|_ctx| async { Err(anyhow::anyhow!("boom")) });
        let err = job.run(Context::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
