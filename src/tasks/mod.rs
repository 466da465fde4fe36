//! Background Tasks Module
//!
//! The periodic persistence reconciler and the queue-consuming task runner.

mod reconciler;
mod runner;

pub use reconciler::{
    run_reconciler_pass, spawn_reconciler_task, PassSummary, ReconcilerStats,
};
pub use runner::{drain_queue, execute_job, spawn_runner_task, PersistOutcome};

pub(crate) use runner::maybe_clear_list_item;
