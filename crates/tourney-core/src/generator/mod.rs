//! Planning generators.
//!
//! A generator receives a prompt and returns the raw text of a planning
//! document. How it produces the schedule is its own business; the planner
//! only parses and validates what comes back.

pub mod command;

pub use command::CommandGenerator;

use anyhow::Result;
use async_trait::async_trait;

/// Source of planning documents.
#[async_trait]
pub trait PlanningGenerator: Send + Sync {
    /// Short name used in logs (e.g. "command").
    fn name(&self) -> &str;

    /// Produce the raw reply for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanningGenerator) {}
};
