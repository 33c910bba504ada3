//! Admin CLI surface, grounded on `task-queue-cli::commands::Cli` --
//! same `clap::Subcommand` shape, pointed at `scheduler-http`'s HTTP
//! surface instead of a broker socket address.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "scheduler-admin")]
#[command(about = "LLM task scheduler admin CLI", long_about = None)]
pub struct Cli {
    /// Base URL of the running `scheduler-server` HTTP surface.
    #[arg(long, default_value = "http://127.0.0.1:8080", global = true)]
    pub base_url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a task.
    Submit {
        #[arg(long)]
        model_id: i64,
        #[arg(long)]
        task_type: String,
        #[arg(long)]
        input: String,
        /// 1=low, 2=medium, 3=high.
        #[arg(long)]
        priority: Option<i16>,
    },
    /// Show one task.
    Get { task_id: i64 },
    /// List tasks, optionally filtered by status/model.
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        model_id: Option<i64>,
        #[arg(long, default_value_t = 1)]
        page: i64,
        #[arg(long, default_value_t = 20)]
        size: i64,
    },
    /// Cancel a pending or running task.
    Cancel { task_id: i64 },
    /// Retry a failed task.
    Retry { task_id: i64 },
    /// Task status counts.
    Stats,
    /// Register a new model backend.
    CreateModel {
        #[arg(long)]
        name: String,
        /// openai, local, or custom.
        #[arg(long)]
        model_type: String,
        #[arg(long)]
        max_workers: i32,
    },
    /// List registered models.
    Models,
    /// Show one model.
    Model { model_id: i64 },
    /// Delete a model (fails if it has active tasks).
    DeleteModel { model_id: i64 },
    /// Change a model's admission status.
    SetModelStatus {
        model_id: i64,
        /// online, offline, or maintenance.
        status: String,
    },
    /// Dashboard projection: models, queue cardinalities, pending/running counts.
    Dashboard,
    /// System health/info.
    Health,
    Info,
}

impl Cli {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}
