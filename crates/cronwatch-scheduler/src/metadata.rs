use cronwatch_core::EntryId;
use serde::Serialize;

use crate::context::Context;

/// Identity of the job currently executing, attached to its context for
/// the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobMetadata {
    pub name: String,
    pub entry_id: EntryId,
    pub spec: String,
}

pub fn with_job_metadata(ctx: &Context, metadata: JobMetadata) -> Context {
    ctx.with_value(metadata)
}

/// Metadata of the running job. `None` only when the job body was invoked
/// outside a controller, e.g. directly from a test.
pub fn job_metadata(ctx: &Context) -> Option<&JobMetadata> {
    ctx.value::<JobMetadata>()
}
