//! `bl move` and `bl rank-and-move`: relocate a story to another backlog.

use anyhow::Result;
use backlog_core::model::{BacklogId, StoryId};
use backlog_core::relocate::Relocation;
use clap::Args;
use std::io::Write;
use std::path::Path;

use super::Project;
use crate::output::{OutputMode, fail, render_mode};

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Story to move.
    pub id: StoryId,

    /// Destination backlog. The story lands at its bottom.
    pub backlog: BacklogId,
}

#[derive(Args, Debug)]
pub struct RankAndMoveArgs {
    /// Story to move.
    pub id: StoryId,

    /// Destination backlog.
    pub backlog: BacklogId,

    /// Rank directly below this story of the destination. Omit for the top.
    #[arg(long)]
    pub under: Option<StoryId>,
}

pub fn run_move(args: &MoveArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root, output)?;
    let relocation = project
        .with_relocator(|relocator| {
            let mut story = project.story(args.id)?;
            relocator.move_to_backlog(&mut story, args.backlog)
        })
        .map_err(|err| fail(output, err))?;
    render_relocation(output, &relocation)
}

pub fn run_rank_and_move(
    args: &RankAndMoveArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let project = Project::open(project_root, output)?;
    let relocation = project
        .with_relocator(|relocator| {
            let mut story = project.story(args.id)?;
            let target = args.under.map(|id| project.story(id)).transpose()?;
            relocator.rank_and_move(&mut story, target.as_ref(), args.backlog)
        })
        .map_err(|err| fail(output, err))?;
    render_relocation(output, &relocation)
}

fn render_relocation(output: OutputMode, relocation: &Relocation) -> Result<()> {
    render_mode(
        output,
        relocation,
        |r, w| writeln!(w, "{}\t{}\t{}\t{}", r.story, r.origin, r.destination, r.rank),
        |r, w| write_pretty(r, w),
    )
}

fn write_pretty(r: &Relocation, w: &mut dyn Write) -> std::io::Result<()> {
    if r.origin == r.destination {
        writeln!(w, "ranked story {} to {} in backlog {}", r.story, r.rank, r.destination)?;
    } else {
        writeln!(
            w,
            "moved story {} from backlog {} to {} at rank {}",
            r.story, r.origin, r.destination, r.rank
        )?;
    }
    if let Some(parent) = r.severed_parent {
        writeln!(w, "  parent story {parent} is under another product; link removed")?;
    }
    if !r.shifted.is_empty() {
        writeln!(w, "  shifted {} other stories", r.shifted.len())?;
    }
    for update in &r.history {
        writeln!(w, "  history queued: {update}")?;
    }
    Ok(())
}
