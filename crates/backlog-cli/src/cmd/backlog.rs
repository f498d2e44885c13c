//! `bl backlog`: manage the Product → Project → Iteration tree.

use anyhow::Result;
use backlog_core::error::{ErrorCode, RankError};
use backlog_core::hierarchy;
use backlog_core::model::{Backlog, BacklogId, BacklogKind, UserId};
use clap::{Args, Subcommand};
use serde_json::json;
use std::io::Write;
use std::path::Path;

use super::Project;
use crate::output::{CliError, OutputMode, fail, pretty_section, render, render_error, render_mode};

#[derive(Subcommand, Debug)]
pub enum BacklogCommand {
    /// Create a product, project or iteration.
    Add(AddArgs),
    /// List every backlog.
    List,
    /// Assign a user to a project.
    Assign(AssignArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Backlog kind: product, project or iteration.
    pub kind: BacklogKind,

    /// Display name.
    pub name: String,

    /// Enclosing backlog (required for projects and iterations).
    #[arg(long)]
    pub parent: Option<BacklogId>,
}

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Project backlog id.
    pub project: BacklogId,

    /// User id.
    pub user: UserId,
}

pub fn run_backlog(command: &BacklogCommand, output: OutputMode, project_root: &Path) -> Result<()> {
    let project = Project::open(project_root, output)?;
    match command {
        BacklogCommand::Add(args) => run_add(&project, args, output),
        BacklogCommand::List => run_list(&project, output),
        BacklogCommand::Assign(args) => run_assign(&project, args, output),
    }
}

fn invalid(output: OutputMode, message: String) -> anyhow::Error {
    let err = CliError::from_code(&message, ErrorCode::InvalidArgument);
    if let Err(render_err) = render_error(output, &err) {
        tracing::warn!(error = %render_err, "failed to render error");
    }
    anyhow::anyhow!(message)
}

fn run_add(project: &Project, args: &AddArgs, output: OutputMode) -> Result<()> {
    match (args.kind, args.parent) {
        (BacklogKind::Product, Some(_)) => {
            return Err(invalid(output, "a product cannot have a parent backlog".into()));
        }
        (BacklogKind::Project | BacklogKind::Iteration, None) => {
            return Err(invalid(output, format!("a {} needs --parent", args.kind)));
        }
        (kind, Some(parent)) => {
            let parent_backlog = hierarchy::require_backlog(&project.store, parent)
                .map_err(|err| fail(output, err))?;
            let allowed = match kind {
                BacklogKind::Project => parent_backlog.kind == BacklogKind::Product,
                BacklogKind::Iteration => parent_backlog.kind != BacklogKind::Iteration,
                BacklogKind::Product => false,
            };
            if !allowed {
                return Err(invalid(
                    output,
                    format!("a {kind} cannot live under {} {parent}", parent_backlog.kind),
                ));
            }
        }
        (BacklogKind::Product, None) => {}
    }

    let backlog = project
        .store
        .create_backlog(&args.name, args.kind, args.parent)
        .map_err(|err| fail(output, RankError::Store(err)))?;
    tracing::info!(backlog = %backlog.id, kind = %backlog.kind, "created backlog");

    render(output, &backlog, |b, w| {
        writeln!(w, "created {} {} '{}'", b.kind, b.id, b.name)
    })
}

fn run_list(project: &Project, output: OutputMode) -> Result<()> {
    let backlogs = project
        .store
        .list_backlogs()
        .map_err(|err| fail(output, RankError::Store(err)))?;

    render_mode(
        output,
        &backlogs,
        |list, w| {
            for b in list {
                let parent = b.parent.map_or_else(|| "-".to_string(), |p| p.to_string());
                writeln!(w, "{}\t{}\t{}\t{}", b.id, b.kind, parent, b.name)?;
            }
            Ok(())
        },
        |list, w| {
            pretty_section(w, "Backlogs")?;
            for b in list {
                write_tree_line(w, b, list)?;
            }
            Ok(())
        },
    )
}

fn write_tree_line(w: &mut dyn Write, backlog: &Backlog, all: &[Backlog]) -> std::io::Result<()> {
    let mut depth = 0;
    let mut parent = backlog.parent;
    while let Some(id) = parent {
        depth += 1;
        parent = all.iter().find(|b| b.id == id).and_then(|b| b.parent);
        if depth > hierarchy::MAX_DEPTH {
            break;
        }
    }
    writeln!(
        w,
        "{:indent$}{} {:<10} {}",
        "",
        backlog.id,
        backlog.kind,
        backlog.name,
        indent = depth * 2
    )
}

fn run_assign(project: &Project, args: &AssignArgs, output: OutputMode) -> Result<()> {
    let backlog = hierarchy::require_backlog(&project.store, args.project)
        .map_err(|err| fail(output, err))?;
    if backlog.kind != BacklogKind::Project {
        return Err(invalid(
            output,
            format!("users are assigned to projects, {} is a {}", backlog.id, backlog.kind),
        ));
    }
    project
        .store
        .assign_user(args.project, args.user)
        .map_err(|err| fail(output, RankError::Store(err)))?;

    let value = json!({ "project": args.project, "user": args.user });
    render(output, &value, |_, w| {
        writeln!(w, "assigned user {} to project {}", args.user, args.project)
    })
}
