//! `knitloop enqueue --type <LOOP_TYPE> [--config <PATH>] [--id <ID>] [--payload <JSON>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use knitloop_core::{LoopType, Spool, WorkItem, WorkItemId};

use super::load_backend_config;

/// Add a pending work item to a loop's spool.
#[derive(Args, Debug)]
pub struct EnqueueArgs {
    /// Loop the item is for.
    #[arg(long = "type", value_name = "LOOP_TYPE")]
    pub loop_type: LoopType,

    /// Backend configuration file.
    #[arg(long, env = "KNIT_BACKEND_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Item id. Defaults to one derived from the current time.
    #[arg(long)]
    pub id: Option<String>,

    /// Item payload as JSON.
    #[arg(long, default_value = "{}")]
    pub payload: String,
}

impl EnqueueArgs {
    pub fn run(self) -> Result<()> {
        let config = load_backend_config(self.config.as_deref())?;
        let payload: serde_json::Value =
            serde_json::from_str(&self.payload).context("--payload is not valid JSON")?;

        let enqueued_at = Utc::now();
        let id = match self.id {
            Some(id) => WorkItemId::from(id),
            None => WorkItemId::from_timestamp(enqueued_at),
        };
        let mut item = WorkItem::new(id, self.loop_type, payload);
        item.enqueued_at = enqueued_at;

        let spool = Spool::new(&config.spool.root);
        let path = spool
            .enqueue(&item)
            .with_context(|| format!("failed to enqueue '{}' for {}", item.id, item.loop_type))?;

        println!("✓ Enqueued '{}' for {}", item.id, item.loop_type);
        println!("  Saved to: {}", path.display());
        Ok(())
    }
}
