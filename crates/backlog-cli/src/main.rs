#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use std::env;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "bl: rank and relocate stories across product backlogs",
    long_about = None
)]
struct Cli {
    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides --json and BACKLOG_FORMAT).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Initialize a backlog project",
        after_help = "EXAMPLES:\n    # Create .backlog/ with config and database\n    bl init"
    )]
    Init(cmd::init::InitArgs),

    #[command(about = "Manage products, projects and iterations")]
    Backlog {
        #[command(subcommand)]
        command: cmd::backlog::BacklogCommand,
    },

    #[command(
        about = "Create, edit and inspect stories",
        after_help = "EXAMPLES:\n    bl story add \"Login form\" --backlog 3\n    bl story edit 12 --points 5 --backlog 4"
    )]
    Story {
        #[command(subcommand)]
        command: cmd::story::StoryCommand,
    },

    #[command(
        about = "List a backlog's stories in rank order",
        after_help = "EXAMPLES:\n    bl list 3\n    bl list 3 --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        about = "Move a story to the bottom of another backlog",
        after_help = "EXAMPLES:\n    # Move story 12 into iteration 4\n    bl move 12 4"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(
        about = "Rank a story below another story of its backlog",
        after_help = "EXAMPLES:\n    bl rank 12 --under 7\n    bl rank 12 --top"
    )]
    Rank(cmd::rank::RankArgs),

    #[command(about = "Rank a story last in its backlog")]
    Bottom(cmd::rank::BottomArgs),

    #[command(
        about = "Move a story to another backlog and rank it there",
        after_help = "EXAMPLES:\n    # Move story 12 into iteration 4, first place\n    bl rank-and-move 12 4\n\n    # ... directly below story 9\n    bl rank-and-move 12 4 --under 9"
    )]
    RankAndMove(cmd::move_cmd::RankAndMoveArgs),

    #[command(about = "Delete a story without attached work")]
    Delete(cmd::delete::DeleteArgs),

    #[command(about = "Show or acknowledge queued history recomputations")]
    History(cmd::history::HistoryArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("BACKLOG_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "backlog_core=debug,backlog_cli=debug,info"
        } else {
            "backlog_core=info,warn"
        })
    });

    let format = env::var("BACKLOG_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let project_root = env::current_dir()?;
    let output = cli.output_mode();

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &project_root),
        Commands::Backlog { command } => cmd::backlog::run_backlog(command, output, &project_root),
        Commands::Story { command } => cmd::story::run_story(command, output, &project_root),
        Commands::List(args) => cmd::list::run_list(args, output, &project_root),
        Commands::Move(args) => cmd::move_cmd::run_move(args, output, &project_root),
        Commands::Rank(args) => cmd::rank::run_rank(args, output, &project_root),
        Commands::Bottom(args) => cmd::rank::run_bottom(args, output, &project_root),
        Commands::RankAndMove(args) => {
            cmd::move_cmd::run_rank_and_move(args, output, &project_root)
        }
        Commands::Delete(args) => cmd::delete::run_delete(args, output, &project_root),
        Commands::History(args) => cmd::history::run_history(args, output, &project_root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_before_and_after_subcommand() {
        let cli = Cli::parse_from(["bl", "--json", "list", "3"]);
        assert!(cli.json);
        let cli = Cli::parse_from(["bl", "list", "3", "--json"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["bl", "--format", "text", "history"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn rank_requires_under_or_top() {
        assert!(Cli::try_parse_from(["bl", "rank", "12"]).is_err());
        assert!(Cli::try_parse_from(["bl", "rank", "12", "--top", "--under", "3"]).is_err());

        let cli = Cli::parse_from(["bl", "rank", "12", "--under", "7"]);
        match cli.command {
            Commands::Rank(args) => {
                assert_eq!(args.id.get(), 12);
                assert_eq!(args.under.map(|id| id.get()), Some(7));
                assert!(!args.top);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rank_and_move_target_is_optional() {
        let cli = Cli::parse_from(["bl", "rank-and-move", "12", "4"]);
        match cli.command {
            Commands::RankAndMove(args) => {
                assert_eq!(args.backlog.get(), 4);
                assert!(args.under.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn backlog_add_parses_kind() {
        let cli = Cli::parse_from(["bl", "backlog", "add", "iteration", "Sprint 1", "--parent", "2"]);
        match cli.command {
            Commands::Backlog {
                command: cmd::backlog::BacklogCommand::Add(args),
            } => {
                assert_eq!(args.kind, backlog_core::model::BacklogKind::Iteration);
                assert_eq!(args.parent.map(|id| id.get()), Some(2));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn story_add_collects_responsibles() {
        let cli = Cli::parse_from([
            "bl",
            "story",
            "add",
            "Login form",
            "--backlog",
            "3",
            "--responsible",
            "5",
            "--responsible",
            "8",
            "--state",
            "Not-Started",
        ]);
        assert!(matches!(cli.command, Commands::Story { .. }));
        assert!(
            Cli::try_parse_from(["bl", "story", "add", "x", "--backlog", "3", "--state", "nope"])
                .is_err()
        );
    }

    #[test]
    fn story_edit_fields_are_optional() {
        let cli = Cli::parse_from(["bl", "story", "edit", "12", "--backlog", "4", "--responsible", "5"]);
        match cli.command {
            Commands::Story {
                command: cmd::story::StoryCommand::Edit(args),
            } => {
                assert_eq!(args.id.get(), 12);
                assert_eq!(args.backlog.map(|id| id.get()), Some(4));
                assert!(args.name.is_none() && args.state.is_none());
                assert_eq!(args.responsibles.len(), 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(
            Cli::try_parse_from([
                "bl",
                "story",
                "edit",
                "12",
                "--responsible",
                "5",
                "--clear-responsibles"
            ])
            .is_err()
        );
    }
}
