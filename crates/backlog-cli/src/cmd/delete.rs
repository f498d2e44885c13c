use anyhow::Result;
use backlog_core::model::StoryId;
use clap::Args;
use std::path::Path;

use super::Project;
use crate::output::{OutputMode, fail, render};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Story to delete. Refused while tasks or hour entries remain.
    pub id: StoryId,
}

pub fn run_delete(args: &DeleteArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root, output)?;
    let removed = project
        .with_relocator(|relocator| relocator.delete_story(args.id))
        .map_err(|err| fail(output, err))?;

    render(output, &removed, |s, w| {
        writeln!(w, "deleted story {} '{}' from backlog {}", s.id, s.name, s.backlog)
    })
}
