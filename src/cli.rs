//! Command-line argument parsing for askdb.
//!
//! Every dashboard action is a variant of [`Command`], matched exhaustively
//! in `main` — adding an action without handling it is a compile error.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ask natural-language questions of a warehouse and curate evaluation sets.
#[derive(Parser, Debug)]
#[command(name = "askdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// State database path (overrides config)
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a question and generate SQL for it
    Ask {
        /// Owning user id
        #[arg(long)]
        user: i64,
        /// Data source to run against
        #[arg(long = "data-source")]
        data_source: i64,
        /// The natural-language question
        question: String,
    },

    /// Run a question's SQL and print the rows
    Results {
        question_id: i64,
    },

    /// Overwrite a question's SQL by hand and re-run it
    SetSql {
        question_id: i64,
        sql: String,
    },

    /// Record feedback on a question (correct, incorrect, invalid, ...)
    Feedback {
        question_id: i64,
        state: String,
    },

    /// List a user's questions, newest first
    History {
        #[arg(long)]
        user: i64,
        #[arg(long = "data-source")]
        data_source: i64,
    },

    /// Evaluation group workflows
    Eval {
        #[command(subcommand)]
        command: EvalCommand,
    },

    /// Manage data sources
    Datasource {
        #[command(subcommand)]
        command: DataSourceCommand,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum EvalCommand {
    /// Create a group, optionally seeded from existing questions
    New {
        #[arg(long = "data-source")]
        data_source: i64,
        /// Question ids to copy in as members
        #[arg(long = "from-question")]
        from_questions: Vec<i64>,
    },

    /// Load a group, generating SQL and caching results as needed
    Load {
        group_id: i64,
    },

    /// Append a member question (invalidates the group's caches)
    Add {
        group_id: i64,
        question: String,
    },

    /// Remove a member question
    Rm {
        group_id: i64,
        question_id: i64,
    },

    /// Manually override the group's verified SQL
    SetSql {
        group_id: i64,
        sql: String,
    },

    /// Update reviewer notes
    Note {
        group_id: i64,
        notes: String,
    },

    /// Mark a group as verified correct
    Correct {
        group_id: i64,
        #[arg(long)]
        notes: Option<String>,
        /// Columns a benchmark run should assert on
        #[arg(long = "assert-column")]
        assert_columns: Vec<String>,
    },

    /// Delete a group and its member questions
    Delete {
        group_id: i64,
    },

    /// List all groups, newest first
    List,
}

#[derive(Subcommand, Debug)]
pub enum DataSourceCommand {
    /// Register a data source
    Add {
        name: String,
        /// Backend kind: postgres, snowflake, or mock
        #[arg(long)]
        kind: String,
        /// Connection credentials as a JSON object
        #[arg(long, default_value = "{}")]
        credentials: String,
    },

    /// List configured data sources
    List,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a user
    Add {
        email: String,
        #[arg(long)]
        name: String,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
