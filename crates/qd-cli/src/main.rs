use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::eyre;
use commands::{account, config, doctor, group, queue};
use qd_config::PathManager;
use qd_models::SortOption;
use std::path::PathBuf;

mod commands;
mod context;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "qd")]
#[command(about = "Q'd - Shared watchlists for you and your friends")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Act as this user instead of the saved session
    #[arg(long = "as", value_name = "USER_ID", global = true)]
    acting_as: Option<String>,

    /// Write logs to the rotating log file instead of stderr
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    log_to_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account or switch between accounts
    Account {
        #[command(subcommand)]
        cmd: AccountCommands,
    },
    /// Manage your personal queue
    Queue {
        #[command(subcommand)]
        cmd: QueueCommands,
    },
    /// Create, find and join groups and manage their shared queues
    Group {
        #[command(subcommand)]
        cmd: GroupCommands,
    },
    /// Check that users and groups agree on memberships
    #[command(long_about = "Compare every user's group list against every group's member list. Use --repair to add the missing half of one-sided memberships. Links to deleted groups and members without accounts are only reported.")]
    Doctor {
        /// Add missing membership links
        #[arg(long, action = ArgAction::SetTrue)]
        repair: bool,
    },
    /// View or change settings
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Sign up and make the new account the active session
    #[command(long_about = "Create a user with an empty queue and no groups, then sign in as that user. A welcome message is queued when notifications are enabled.")]
    Create {
        /// Display name
        #[arg(long)]
        name: String,

        /// Email address for the welcome message
        #[arg(long)]
        email: String,

        /// Use this user id instead of a generated one
        #[arg(long)]
        id: Option<String>,
    },
    /// Switch the active session to an existing account
    Use { user_id: String },
    /// Show the active account
    Show,
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// Add a title to your queue, looked up for poster and plot
    Add {
        /// Title to look up
        name: String,

        /// Streaming service it is on (e.g. Netflix)
        #[arg(long, short)]
        service: String,
    },
    /// List the unwatched items in your queue
    List {
        /// Sort order: date_asc, date_desc, service_asc or service_desc
        #[arg(long)]
        sort: Option<SortOption>,

        /// Only show items on this service
        #[arg(long)]
        service: Option<String>,
    },
    /// Hide an item from your views
    Watched { item_id: String },
    /// Copy an item from a group's shared queue into your queue
    Copy { group_id: String, item_id: String },
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create a group with you as its only member
    Create {
        name: String,

        /// Poster image to upload
        #[arg(long, value_name = "FILE")]
        poster: Option<PathBuf>,
    },
    /// Join a group by its id
    Join { group_id: String },
    /// Browse groups, newest first
    List {
        /// Keep loading pages until every group is listed
        #[arg(long, action = ArgAction::SetTrue)]
        all: bool,
    },
    /// Find groups whose name contains a term
    Search { term: String },
    /// List the groups you belong to
    Mine,
    /// Add a title to a group's shared queue
    Add {
        group_id: String,

        /// Title to look up
        name: String,

        #[arg(long, short)]
        service: String,
    },
    /// Show a group's shared queue, minus what you have watched
    Show {
        group_id: String,

        #[arg(long)]
        sort: Option<SortOption>,

        #[arg(long)]
        service: Option<String>,
    },
    /// Follow a group's shared queue live until Ctrl-C
    Watch {
        group_id: String,

        #[arg(long)]
        sort: Option<SortOption>,

        #[arg(long)]
        service: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks the API key)
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Store the OMDb API key used for title lookups
    SetApiKey { key: String },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let log_file = cli.log_to_file.then(|| PathManager::default().log_file());
    logging::init_logging(cli.verbose, cli.quiet, log_file.as_deref()).map_err(|e| eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);
    let ctx = context::AppContext::load(cli.acting_as).await?;

    match cli.command {
        Commands::Account { cmd } => account::run_account(cmd, ctx, &output).await,
        Commands::Queue { cmd } => queue::run_queue(cmd, ctx, &output).await,
        Commands::Group { cmd } => group::run_group(cmd, ctx, &output).await,
        Commands::Doctor { repair } => doctor::run_doctor(repair, ctx, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, ctx, &output).await,
    }
}
