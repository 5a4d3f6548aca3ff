use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use cronwatch_core::CronwatchError;
use futures_util::FutureExt;
use tracing::error;

use super::{Interceptor, Next};
use crate::context::Context;
use crate::job::Job;

/// Converts a panic anywhere downstream into [`CronwatchError::PanicRecovered`].
///
/// Place it early in the chain: only interceptors after it (and the job
/// body) are covered.
#[derive(Debug, Default, Clone, Copy)]
pub struct Recover;

#[async_trait]
impl Interceptor for Recover {
    async fn intercept(&self, ctx: Context, job: &Job, next: Next<'_>) -> anyhow::Result<()> {
        match AssertUnwindSafe(next.run(ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(entry_id = %job.entry_id(), name = %job.name(), panic = %message, "job panicked");
                Err(CronwatchError::PanicRecovered { message }.into())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::Chain;
    use crate::sink::ErrorSink;
    use crate::task::func;
    use cronwatch_core::StatusCode;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Codes(Mutex<Vec<&'static str>>);

    impl ErrorSink for Codes {
        fn report(&self, _operation: &'static str, error: &CronwatchError) {
            self.0.lock().unwrap().push(error.code());
        }
    }

    #[tokio::test]
    async fn panic_becomes_error_and_job_can_run_again() {
        let explode = Arc::new(AtomicBool::new(true));
        let flag = explode.clone();
        let sink = Arc::new(Codes::default());
        let job = Job::new(
            "Volatile",
            "@every 1s",
            Arc::new(func(move |_| {
                let explode = flag.load(Ordering::SeqCst);
                async move {
                    if explode {
                        panic!("index out of bounds");
                    }
                    anyhow::Ok(())
                }
            })),
            Arc::new(Chain::builder().with(Recover).build()),
        )
        .with_sink(sink.clone());

        job.run(Context::new()).await;
        assert_eq!(job.status(), StatusCode::Error);
        assert_eq!(job.last_error(), "Panic recovered: index out of bounds");
        assert_eq!(*sink.0.lock().unwrap(), vec!["PANIC_RECOVERED"]);

        explode.store(false, Ordering::SeqCst);
        job.run(Context::new()).await;
        assert_eq!(job.status(), StatusCode::Idle);
    }

    #[test]
    fn formats_string_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic payload");
    }
}
