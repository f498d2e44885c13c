use anyhow::Result;
use backlog_core::hierarchy;
use backlog_core::model::{Backlog, BacklogId, Story};
use backlog_core::store::StoryStore;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use super::Project;
use crate::output::{OutputMode, fail, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Backlog whose stories to list, in rank order.
    pub backlog: BacklogId,
}

#[derive(Debug, Serialize)]
struct Listing {
    backlog: Backlog,
    story_points: u64,
    stories: Vec<Story>,
}

pub fn run_list(args: &ListArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root, output)?;
    let listing = project
        .with_relocator(|relocator| {
            let backlog = hierarchy::require_backlog(&project.store, args.backlog)?;
            let story_points = relocator.story_point_sum(backlog.id)?;
            let stories = project.store.stories_in_backlog(backlog.id)?;
            Ok(Listing {
                backlog,
                story_points,
                stories,
            })
        })
        .map_err(|err| fail(output, err))?;

    render_mode(
        output,
        &listing,
        |l, w| {
            for s in &l.stories {
                writeln!(w, "{}\t{}\t{}", s.rank, s.id, s.name)?;
            }
            Ok(())
        },
        |l, w| write_pretty(l, w),
    )
}

fn write_pretty(listing: &Listing, w: &mut dyn Write) -> std::io::Result<()> {
    let b = &listing.backlog;
    pretty_section(
        w,
        &format!(
            "{} {} '{}' ({} stories, {} points)",
            b.kind,
            b.id,
            b.name,
            listing.stories.len(),
            listing.story_points
        ),
    )?;
    if listing.stories.is_empty() {
        return writeln!(w, "(empty)");
    }
    for s in &listing.stories {
        let points = s.story_points.map_or_else(String::new, |p| format!(" [{p}]"));
        writeln!(w, "{:>5}  #{:<6} {}{points}  {}", s.rank, s.id, s.name, s.state)?;
    }
    Ok(())
}
