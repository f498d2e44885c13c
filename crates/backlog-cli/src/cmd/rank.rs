//! `bl rank` and `bl bottom`: reorder a story inside its backlog.

use anyhow::Result;
use backlog_core::model::{BacklogId, StoryId};
use clap::Args;
use serde::Serialize;
use std::path::Path;

use super::Project;
use crate::output::{OutputMode, fail, render_mode};

#[derive(Args, Debug)]
pub struct RankArgs {
    /// Story to rank.
    pub id: StoryId,

    /// Place the story directly below this one.
    #[arg(long, conflicts_with = "top", required_unless_present = "top")]
    pub under: Option<StoryId>,

    /// Place the story first in its backlog.
    #[arg(long)]
    pub top: bool,
}

#[derive(Args, Debug)]
pub struct BottomArgs {
    /// Story to rank last.
    pub id: StoryId,

    /// Backlog the story is expected in (defaults to its own).
    #[arg(long)]
    pub backlog: Option<BacklogId>,
}

#[derive(Debug, Serialize)]
struct Reranked {
    story: StoryId,
    backlog: BacklogId,
    rank: i64,
    shifted: Vec<Shifted>,
}

#[derive(Debug, Serialize)]
struct Shifted {
    story: StoryId,
    rank: i64,
}

pub fn run_rank(args: &RankArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root, output)?;
    let reranked = project
        .with_relocator(|relocator| {
            let mut story = project.story(args.id)?;
            let target = args.under.map(|id| project.story(id)).transpose()?;
            let shifted = relocator.rank_under_story(&mut story, target.as_ref())?;
            Ok(Reranked {
                story: story.id,
                backlog: story.backlog,
                rank: story.rank,
                shifted: shifted
                    .iter()
                    .map(|s| Shifted {
                        story: s.id,
                        rank: s.rank,
                    })
                    .collect(),
            })
        })
        .map_err(|err| fail(output, err))?;

    render_mode(
        output,
        &reranked,
        |r, w| writeln!(w, "{}\t{}\t{}", r.story, r.backlog, r.rank),
        |r, w| {
            writeln!(
                w,
                "ranked story {} to {} in backlog {}",
                r.story, r.rank, r.backlog
            )?;
            for s in &r.shifted {
                writeln!(w, "  story {} now at {}", s.story, s.rank)?;
            }
            Ok(())
        },
    )
}

pub fn run_bottom(args: &BottomArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root, output)?;
    let reranked = project
        .with_relocator(|relocator| {
            let mut story = project.story(args.id)?;
            let backlog = args.backlog.unwrap_or(story.backlog);
            let rank = relocator.rank_to_bottom(&mut story, Some(backlog))?;
            Ok(Reranked {
                story: story.id,
                backlog,
                rank,
                shifted: Vec::new(),
            })
        })
        .map_err(|err| fail(output, err))?;

    render_mode(
        output,
        &reranked,
        |r, w| writeln!(w, "{}\t{}\t{}", r.story, r.backlog, r.rank),
        |r, w| {
            writeln!(w, "story {} is last in backlog {} (rank {})", r.story, r.backlog, r.rank)
        },
    )
}
