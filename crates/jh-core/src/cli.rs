//! Command-line interface definitions for `jhutils`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::logging::Verbosity;

#[derive(Debug, Parser)]
#[command(name = "jhutils", version, about = "Personal assistant for tasks, shopping and recipes")]
pub struct Cli {
    /// Increase log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file to use instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Toolset mode, overriding the config file.
    #[arg(long, global = true, value_name = "MODE")]
    pub mode: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send one query to the assistant; reads stdin when no query is given.
    Ask {
        query: Vec<String>,
    },
    /// Interactive session that keeps conversation history between queries.
    Chat,
    /// Work with the Mealie shopping list.
    #[command(subcommand)]
    Shopping(ShoppingCommand),
    /// Print a recipe as Markdown.
    Recipe(RecipeArgs),
    /// Work with the task inbox in the Obsidian vault.
    #[command(subcommand)]
    Tasks(TasksCommand),
    /// Browse the Obsidian vault.
    #[command(subcommand)]
    Vault(VaultCommand),
    /// Print the effective configuration with secrets redacted.
    Config,
}

#[derive(Debug, Subcommand)]
pub enum ShoppingCommand {
    /// List unchecked items.
    List,
    /// Parse and add items.
    Add {
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Show how Mealie parses items without adding them.
    Parse {
        #[arg(required = true)]
        items: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct RecipeArgs {
    pub name: String,
    /// Multiply ingredient quantities.
    #[arg(long, default_value_t = 1.0)]
    pub scale: f64,
    /// Scale to this many servings; takes precedence over --scale.
    #[arg(long)]
    pub servings: Option<u32>,
}

#[derive(Debug, Subcommand)]
pub enum TasksCommand {
    /// Write tasks as a new checklist note.
    Add {
        #[arg(required = true)]
        tasks: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum VaultCommand {
    /// List a folder (the vault root by default).
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    /// Print a file.
    Cat { path: String },
}
