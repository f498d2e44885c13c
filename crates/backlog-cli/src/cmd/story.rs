//! `bl story`: create, edit and inspect stories.

use anyhow::Result;
use backlog_core::model::{BacklogId, NewStory, Story, StoryEdit, StoryId, StoryState, UserId};
use backlog_core::relocate::StoryUpdate;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use super::Project;
use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render_mode};

#[derive(Subcommand, Debug)]
pub enum StoryCommand {
    /// Create a story at the bottom of a backlog.
    Add(AddArgs),
    /// Edit a story's fields, owners or backlog.
    Edit(EditArgs),
    /// Show one story with its project's responsible users.
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Story name.
    pub name: String,

    /// Backlog receiving the story.
    #[arg(long)]
    pub backlog: BacklogId,

    /// Parent story.
    #[arg(long)]
    pub parent: Option<StoryId>,

    #[arg(long)]
    pub points: Option<u32>,

    #[arg(long, default_value = "not_started")]
    pub state: StoryState,

    /// Responsible user (repeatable).
    #[arg(long = "responsible", value_name = "USER")]
    pub responsibles: Vec<UserId>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub id: StoryId,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub points: Option<u32>,

    #[arg(long)]
    pub state: Option<StoryState>,

    /// Move the story to the bottom of this backlog. Owners are dropped
    /// unless `--responsible` is given too.
    #[arg(long)]
    pub backlog: Option<BacklogId>,

    /// Replace the owners (repeatable).
    #[arg(long = "responsible", value_name = "USER", conflicts_with = "clear_responsibles")]
    pub responsibles: Vec<UserId>,

    /// Remove all owners.
    #[arg(long)]
    pub clear_responsibles: bool,
}

impl EditArgs {
    fn edit(&self) -> StoryEdit {
        StoryEdit {
            name: self.name.clone(),
            story_points: self.points,
            state: self.state,
        }
    }

    fn responsibles(&self) -> Option<BTreeSet<UserId>> {
        if self.clear_responsibles {
            Some(BTreeSet::new())
        } else if self.responsibles.is_empty() {
            None
        } else {
            Some(self.responsibles.iter().copied().collect())
        }
    }
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: StoryId,
}

#[derive(Debug, Serialize)]
struct StoryDetail {
    #[serde(flatten)]
    story: Story,
    project_responsibles: Vec<UserId>,
}

pub fn run_story(command: &StoryCommand, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root, output)?;
    match command {
        StoryCommand::Add(args) => run_add(&project, args, output),
        StoryCommand::Edit(args) => run_edit(&project, args, output),
        StoryCommand::Show(args) => run_show(&project, args, output),
    }
}

fn run_edit(project: &Project, args: &EditArgs, output: OutputMode) -> Result<()> {
    let update = project
        .with_relocator(|relocator| {
            relocator.update_story(args.id, &args.edit(), args.backlog, args.responsibles())
        })
        .map_err(|err| fail(output, err))?;

    render_mode(
        output,
        &update,
        |u, w| {
            let s = &u.story;
            writeln!(w, "{}\t{}\t{}\t{}\t{}", s.id, s.backlog, s.rank, s.state, s.name)
        },
        |u, w| write_update(u, w),
    )
}

fn write_update(update: &StoryUpdate, w: &mut dyn Write) -> std::io::Result<()> {
    let story = &update.story;
    match &update.relocation {
        Some(relocation) => writeln!(
            w,
            "updated story {} and moved it from backlog {} to {} at rank {}",
            story.id, relocation.origin, relocation.destination, relocation.rank
        )?,
        None => writeln!(w, "updated story {} '{}'", story.id, story.name)?,
    }
    if let Some(parent) = update.relocation.as_ref().and_then(|r| r.severed_parent) {
        writeln!(w, "  parent story {parent} is under another product; link removed")?;
    }
    Ok(())
}

fn run_add(project: &Project, args: &AddArgs, output: OutputMode) -> Result<()> {
    let draft = NewStory {
        name: args.name.clone(),
        backlog: Some(args.backlog),
        parent: args.parent,
        responsibles: args.responsibles.iter().copied().collect(),
        story_points: args.points,
        state: args.state,
    };
    let story = project
        .with_relocator(|relocator| relocator.create_story(&draft))
        .map_err(|err| fail(output, err))?;

    render_mode(
        output,
        &story,
        |s, w| writeln!(w, "{}\t{}\t{}\t{}", s.id, s.backlog, s.rank, s.name),
        |s, w| {
            writeln!(
                w,
                "created story {} '{}' in backlog {} at rank {}",
                s.id, s.name, s.backlog, s.rank
            )
        },
    )
}

fn run_show(project: &Project, args: &ShowArgs, output: OutputMode) -> Result<()> {
    let detail = project
        .with_relocator(|relocator| {
            let story = project.story(args.id)?;
            let project_responsibles = relocator.project_responsibles(&story)?;
            Ok(StoryDetail {
                story,
                project_responsibles,
            })
        })
        .map_err(|err| fail(output, err))?;

    render_mode(
        output,
        &detail,
        |d, w| {
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}",
                d.story.id, d.story.backlog, d.story.rank, d.story.state, d.story.name
            )
        },
        |d, w| write_detail(d, w),
    )
}

fn join_ids<T: ToString>(ids: impl IntoIterator<Item = T>) -> String {
    let joined: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined.join(", ")
    }
}

fn write_detail(detail: &StoryDetail, w: &mut dyn Write) -> std::io::Result<()> {
    let story = &detail.story;
    pretty_section(w, &format!("Story {}: {}", story.id, story.name))?;
    pretty_kv(w, "backlog", story.backlog.to_string())?;
    pretty_kv(w, "rank", story.rank.to_string())?;
    pretty_kv(w, "state", story.state.to_string())?;
    pretty_kv(
        w,
        "points",
        story.story_points.map_or_else(|| "-".to_string(), |p| p.to_string()),
    )?;
    pretty_kv(w, "parent", join_ids(story.parent))?;
    pretty_kv(w, "children", join_ids(&story.children))?;
    pretty_kv(w, "owners", join_ids(&story.responsibles))?;
    pretty_kv(w, "project", join_ids(&detail.project_responsibles))?;
    pretty_kv(w, "tasks", story.tasks.len().to_string())?;
    pretty_kv(w, "hours", story.hour_entries.len().to_string())
}
