use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sysrev::utils::{ensure_database_directory, get_database_path, render_tree};
use sysrev::{
    ConfigError, Database, HttpTagStoreBuilder, LocalTagStore, MutationError, NAME_MAX_CHARS,
    Outcome, ParentTarget, SessionConfig, SessionConfigBuilder, TagId, TagStore,
    TagTreeController,
};
use thiserror::Error;

/// sysrev - manage the tag taxonomy of a systematic review
#[derive(Parser)]
#[command(name = "sysrev")]
#[command(about = "Browse and edit the hierarchical tags of a systematic review")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    session: SessionArgs,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where the tags live
#[derive(Args)]
struct SessionArgs {
    /// Review API base URL [env: SYSREV_API_URL]
    #[arg(long, value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Review whose tags to work on [env: SYSREV_REVIEW_ID]
    #[arg(short, long, value_name = "ID", global = true)]
    review: Option<i64>,

    /// API token [env: SYSREV_TOKEN]
    #[arg(long, value_name = "TOKEN", global = true)]
    token: Option<String>,

    /// Use a local SQLite store instead of the API (default path when PATH is omitted)
    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = "",
        global = true
    )]
    local: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Print the tag tree
    Tree {
        /// Show how many studies use each tag
        #[arg(long)]
        counts: bool,
    },
    /// Add a tag
    Add {
        /// Name of the new tag
        #[arg(value_name = "NAME")]
        name: String,

        /// Parent tag ID (omit or 0 for a root tag)
        #[arg(short, long, value_name = "ID")]
        parent: Option<i64>,
    },
    /// Delete a tag and everything below it
    Rm {
        #[arg(value_name = "ID")]
        id: i64,
    },
    /// Move a tag under another tag (0 moves it to the root)
    Mv {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(value_name = "PARENT")]
        parent: i64,
    },
    /// Rename a tag
    Rename {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Replace a tag's description
    Describe {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(value_name = "TEXT")]
        text: String,
    },
    /// List study counts per tag
    Counts,
    /// Open the interactive tree editor
    Tui,
}

/// A request that was valid but changed nothing, or was refused up front.
#[derive(Debug, Error)]
enum UsageError {
    #[error("{0}")]
    Invalid(String),

    #[error("nothing to do: {0}")]
    NothingToDo(&'static str),
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let interactive = matches!(cli.command, Commands::Tui);
    if let Err(e) = sysrev::logging::init(cli.verbose, interactive) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let result = run(&cli);

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are bad arguments, no-ops, edits the tree refuses, and
/// requests the server answered with a rejection. Everything else
/// (unreachable server, database failures, I/O) is internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        if cause.is::<UsageError>() || cause.is::<ConfigError>() {
            return true;
        }
        match cause.downcast_ref::<MutationError>() {
            Some(MutationError::Tree(_) | MutationError::Busy(_)) => true,
            Some(MutationError::Store(e)) => e.is_rejection(),
            None => false,
        }
    })
}

fn run(cli: &Cli) -> Result<()> {
    let store = open_store(&cli.session)?;

    if let Commands::Tui = cli.command {
        return sysrev::tui::run(store);
    }

    let mut controller = TagTreeController::new(store);
    controller.refresh().context("Failed to load tags")?;

    let stdout = io::stdout();
    execute(&cli.command, &mut controller, &mut stdout.lock())
}

/// Resolves the session and opens the matching store.
fn open_store(args: &SessionArgs) -> Result<Box<dyn TagStore>> {
    let config = session_config(args)?;

    match &args.local {
        Some(path) => {
            let path = if path.as_os_str().is_empty() {
                get_database_path()?
            } else {
                path.clone()
            };
            ensure_database_directory(&path)?;
            let db = Database::open(&path)
                .with_context(|| format!("Failed to open database {}", path.display()))?;
            tracing::debug!(path = %path.display(), "using local tag store");
            Ok(Box::new(LocalTagStore::new(db, config.review_id())))
        }
        None => {
            let store = HttpTagStoreBuilder::new(config)
                .build()
                .context("Failed to create API client")?;
            Ok(Box::new(store))
        }
    }
}

fn session_config(args: &SessionArgs) -> Result<SessionConfig> {
    let mut builder = SessionConfigBuilder::new();
    if let Some(url) = &args.api_url {
        builder = builder.base_url(url);
    }
    if let Some(review) = args.review {
        builder = builder.review_id(review);
    }
    if let Some(token) = &args.token {
        builder = builder.token(token);
    }
    Ok(builder.build()?)
}

/// Executes a non-interactive command against a loaded controller.
///
/// Separated from `run` to allow testing with in-memory stores.
fn execute<S: TagStore>(
    command: &Commands,
    controller: &mut TagTreeController<S>,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Commands::Tree { counts } => {
            let counts = if *counts {
                study_counts(controller)
            } else {
                HashMap::new()
            };
            let rendered = render_tree(controller.tree(), &counts);
            if rendered.is_empty() {
                writeln!(out, "No tags yet")?;
            } else {
                write!(out, "{rendered}")?;
            }
        }
        Commands::Add { name, parent } => {
            validate_name(name)?;
            let parent = ParentTarget::from_raw(parent.unwrap_or(ParentTarget::ROOT_SENTINEL));
            let id = controller
                .create_under(name.trim(), parent)
                .context("Failed to add tag")?;
            writeln!(out, "Tag created (id: {id}) under {parent}")?;
        }
        Commands::Rm { id } => {
            let id = TagId::new(*id);
            let removed = controller.tree().subtree_ids(id).len();
            controller.delete_tag(id).context("Failed to delete tag")?;
            writeln!(out, "Deleted {removed} tag(s)")?;
        }
        Commands::Mv { id, parent } => {
            let outcome = controller
                .move_tag(TagId::new(*id), *parent)
                .context("Failed to move tag")?;
            require_applied(outcome, "tag is already there")?;
            writeln!(out, "Moved tag {id} under {}", ParentTarget::from_raw(*parent))?;
        }
        Commands::Rename { id, name } => {
            validate_name(name)?;
            let outcome = controller
                .rename_tag(TagId::new(*id), name.trim())
                .context("Failed to rename tag")?;
            require_applied(outcome, "name is unchanged")?;
            writeln!(out, "Renamed tag {id}")?;
        }
        Commands::Describe { id, text } => {
            let outcome = controller
                .set_tag_description(TagId::new(*id), text)
                .context("Failed to update description")?;
            require_applied(outcome, "description is unchanged")?;
            writeln!(out, "Updated description of tag {id}")?;
        }
        Commands::Counts => {
            for (_, tag) in controller.tree().iter() {
                writeln!(
                    out,
                    "{:>6}  {:>5}  {}",
                    tag.id(),
                    controller.study_count(tag.id()),
                    tag.name()
                )?;
            }
        }
        Commands::Tui => {
            return Err(UsageError::Invalid("the tree editor needs a terminal".into()).into());
        }
    }
    Ok(())
}

fn study_counts<S: TagStore>(controller: &TagTreeController<S>) -> HashMap<TagId, u64> {
    controller
        .tree()
        .ids()
        .into_iter()
        .map(|id| (id, controller.study_count(id)))
        .collect()
}

fn validate_name(name: &str) -> Result<(), UsageError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(UsageError::Invalid("Tag name cannot be empty".into()));
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(UsageError::Invalid(format!(
            "Tag name cannot exceed {NAME_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

fn require_applied(outcome: Outcome, reason: &'static str) -> Result<(), UsageError> {
    match outcome {
        Outcome::Applied => Ok(()),
        Outcome::NoOp(_) => Err(UsageError::NothingToDo(reason)),
    }
}
