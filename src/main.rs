//! Knowbase CLI - browse, search and curate the staff knowledge base

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;

#[derive(Parser)]
#[command(name = "knowbase")]
#[command(version)]
#[command(about = "Staff knowledge base - sections of situations, answers and notes")]
#[command(long_about = r#"
Knowbase keeps procedures in sections of questions, each with a
situation, an answer and optional notes.

Example usage:
  knowbase init
  knowbase search "printer offline"
  knowbase show 3
  KNOWBASE_ADMIN_SECRET=... knowbase add-section --title "Network"
  knowbase serve --port 8080
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Admin secret for commands that change content
    #[arg(long, global = true, env = "KNOWBASE_ADMIN_SECRET", hide_env_values = true)]
    admin_secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn is_human(self) -> bool {
        self == OutputFormat::Text
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// List all sections
    Sections,

    /// Show a section and its questions
    Show {
        /// Section ID
        id: i64,
    },

    /// Search questions, answers and notes
    Search {
        /// Search text (case-insensitive substring)
        query: String,
    },

    /// Show recently added sections and questions
    Recent {
        /// Number of sections to show
        #[arg(long)]
        sections: Option<usize>,

        /// Number of questions to show
        #[arg(long)]
        questions: Option<usize>,
    },

    /// Show section and question counts
    Stats,

    /// Create a section (admin)
    AddSection {
        #[arg(short, long)]
        title: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Change a section's title or description (admin)
    EditSection {
        /// Section ID
        id: i64,

        #[arg(short, long)]
        title: Option<String>,

        /// New description; pass "" to clear it
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a section and all of its questions (admin)
    RmSection {
        /// Section ID
        id: i64,
    },

    /// Add a question to a section (admin)
    AddQuestion {
        /// Section ID
        section: i64,

        /// The situation or question
        #[arg(short, long)]
        question: String,

        /// What to do
        #[arg(short, long)]
        answer: Option<String>,

        /// Additional notes
        #[arg(short, long)]
        info: Option<String>,
    },

    /// Change a question (admin)
    EditQuestion {
        /// Question ID
        id: i64,

        #[arg(short, long)]
        question: Option<String>,

        /// New answer; pass "" to clear it
        #[arg(short, long)]
        answer: Option<String>,

        /// New notes; pass "" to clear them
        #[arg(short, long)]
        info: Option<String>,
    },

    /// Delete a question (admin)
    RmQuestion {
        /// Question ID
        id: i64,
    },

    /// Serve the JSON HTTP API
    Serve {
        /// Port to listen on (overrides the config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory with a static web UI to serve
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Print the hash of an admin secret for the config file
    HashSecret {
        /// The secret to hash
        secret: String,

        /// Salt prepended to the secret
        #[arg(long, default_value = "")]
        salt: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging; stderr keeps JSON output on stdout clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = run(cli) {
        knowbase::ui::error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::HashSecret { secret, salt } = &cli.command {
        return commands::run_hash_secret(cli.format, salt, secret);
    }

    if let Commands::Init { force } = cli.command {
        return commands::run_init(cli.format, cli.config.as_deref(), cli.database.as_deref(), force);
    }

    let ctx = commands::Context::load(
        cli.config.as_deref(),
        cli.database.as_deref(),
        cli.format,
        cli.admin_secret,
    )?;

    match cli.command {
        Commands::Sections => ctx.run_sections(),
        Commands::Show { id } => ctx.run_show(id),
        Commands::Search { query } => ctx.run_search(&query),
        Commands::Recent { sections, questions } => ctx.run_recent(sections, questions),
        Commands::Stats => ctx.run_stats(),
        Commands::AddSection { title, description } => ctx.run_add_section(&title, description),
        Commands::EditSection { id, title, description } => {
            ctx.run_edit_section(id, title, description)
        }
        Commands::RmSection { id } => ctx.run_rm_section(id),
        Commands::AddQuestion { section, question, answer, info } => {
            ctx.run_add_question(section, &question, answer, info)
        }
        Commands::EditQuestion { id, question, answer, info } => {
            ctx.run_edit_question(id, question, answer, info)
        }
        Commands::RmQuestion { id } => ctx.run_rm_question(id),
        Commands::Serve { port, static_dir } => ctx.run_serve(port, static_dir),
        Commands::Init { .. } | Commands::HashSecret { .. } => Ok(()),
    }
}
