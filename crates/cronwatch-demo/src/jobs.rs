use std::time::Duration;

use async_trait::async_trait;
use cronwatch_core::EntryId;
use cronwatch_scheduler::{func, job_metadata, Context, Controller, Task};
use tracing::{error, info};

const EVERY_INTERVAL: Duration = Duration::from_secs(20);
const ENTRY_TO_REMOVE: EntryId = EntryId(2);

struct SendEmail;

#[async_trait]
impl Task for SendEmail {
    async fn run(&self, _ctx: Context) -> anyhow::Result<()> {
        info!("send email is running");
        Ok(())
    }
}

struct PayBill;

#[async_trait]
impl Task for PayBill {
    async fn run(&self, _ctx: Context) -> anyhow::Result<()> {
        info!("pay bill is running");
        Ok(())
    }
}

struct AlwaysError;

#[async_trait]
impl Task for AlwaysError {
    async fn run(&self, _ctx: Context) -> anyhow::Result<()> {
        anyhow::bail!("some super long error message that comes from executing the process")
    }
}

struct EveryJob;

#[async_trait]
impl Task for EveryJob {
    async fn run(&self, _ctx: Context) -> anyhow::Result<()> {
        info!("every job is running");
        Ok(())
    }
}

struct Subscription;

#[async_trait]
impl Task for Subscription {
    async fn run(&self, ctx: Context) -> anyhow::Result<()> {
        let md = job_metadata(&ctx).ok_or_else(|| anyhow::anyhow!("job metadata missing"))?;
        info!(name = %md.name, entry_id = %md.entry_id, spec = %md.spec, "subscription is running");
        Ok(())
    }
}

/// Registration failures are logged and skipped, never fatal.
pub fn register(controller: &Controller) {
    if let Err(e) = controller.schedule("@every 5s", SendEmail) {
        error!(error = %e, "register send email");
    }

    // Same task type on several entries.
    for i in 1..=3 {
        if let Err(e) = controller.schedule(&format!("@every {i}m"), PayBill) {
            error!(error = %e, "register pay bill");
        }
    }

    for i in 1..=3 {
        if let Err(e) = controller.schedule(&format!("broken spec {i}"), PayBill) {
            error!(error = %e, "register pay bill with broken spec");
        }
    }

    if let Err(e) = controller.schedule("@every 30s", AlwaysError) {
        error!(error = %e, "register always error");
    }

    let nameless = func(|_ctx| async {
        info!("nameless job is running");
        anyhow::Ok(())
    });
    if let Err(e) = controller.schedule("0 */1 * * *", nameless) {
        error!(error = %e, "register nameless job");
    }

    // Six fields: leading seconds.
    if let Err(e) = controller.schedule("0 0 1 * * *", Subscription) {
        error!(error = %e, "register subscription");
    }

    if let Err(e) = controller.schedules("0 0 4 * * *#0 0 7 * * *#0 0 11 * * *", "#", Subscription) {
        error!(error = %e, "register subscription schedules");
    }

    controller.every(EVERY_INTERVAL, EveryJob);
    controller.remove(ENTRY_TO_REMOVE);
}
