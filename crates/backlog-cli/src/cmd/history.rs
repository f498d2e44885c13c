//! `bl history`: inspect and acknowledge queued history recomputations.

use anyhow::Result;
use backlog_core::error::RankError;
use clap::Args;
use serde_json::json;
use std::path::Path;

use super::Project;
use crate::output::{OutputMode, fail, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Drop queued entries up to and including this sequence number.
    #[arg(long, value_name = "SEQ")]
    pub ack: Option<i64>,
}

pub fn run_history(args: &HistoryArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root, output)?;
    let queue = project.store.history();

    if let Some(seq) = args.ack {
        let removed = queue
            .acknowledge(seq)
            .map_err(|err| fail(output, RankError::Store(err)))?;
        let value = json!({ "acknowledged": removed, "through": seq });
        return render(output, &value, |_, w| {
            writeln!(w, "acknowledged {removed} queued update(s)")
        });
    }

    let pending = queue
        .pending()
        .map_err(|err| fail(output, RankError::Store(err)))?;
    render_mode(
        output,
        &pending,
        |list, w| {
            for q in list {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    q.seq,
                    q.update.scope(),
                    q.update.backlog(),
                    q.queued_at.to_rfc3339()
                )?;
            }
            Ok(())
        },
        |list, w| {
            pretty_section(w, &format!("Pending history updates ({})", list.len()))?;
            for q in list {
                writeln!(
                    w,
                    "{:>5}  {:<16} {}",
                    q.seq,
                    q.update.to_string(),
                    q.queued_at.format("%Y-%m-%d %H:%M:%S")
                )?;
            }
            Ok(())
        },
    )
}
