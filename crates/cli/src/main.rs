use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use dirscout::fs_move::MoveOptions;
use dirscout::server::ToolServer;
use dirscout::tools::{self, AddArgs, ListFilesArgs, MoveFilesArgs, ToolBox};
use dirscout_core::config;
use dirscout_core::{AllowListFile, Resolution, Resolver, SearchSpec};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    init_tracing(&cfg.logging.filter);

    let allow_list = cli
        .allow_list
        .clone()
        .unwrap_or_else(|| cfg.allow_list.path.clone());
    let toolbox = ToolBox::new(
        Resolver::new(AllowListFile::new(allow_list)),
        MoveOptions::from(&cfg.moves),
    );

    match cli.command {
        Commands::Resolve { name, base_dir } => {
            let spec = SearchSpec::new(&name).with_base_dir(base_dir.map(PathBuf::from));
            match toolbox.resolver().resolve(&spec)? {
                Resolution::Found(path) => {
                    println!("{}", path.display());
                    Ok(())
                }
                Resolution::NotFound => Err(anyhow!("directory '{}' not found", name)),
            }
        }
        Commands::List {
            name,
            base_dir,
            ignore,
        } => {
            let out = toolbox.list_files(ListFilesArgs {
                directory_name: name,
                base_dir,
                ignore_dirs: Some(ignore),
            })?;
            println!("{}", out);
            Ok(())
        }
        Commands::Move {
            src,
            dest,
            base_dir,
            recursive,
            extension,
        } => {
            let out = toolbox.move_files(MoveFilesArgs {
                src,
                dest,
                base_dir,
                recursive,
                extension,
            })?;
            println!("{}", out);
            Ok(())
        }
        Commands::Add { a, b } => {
            println!("{}", tools::add(AddArgs { a, b }));
            Ok(())
        }
        Commands::Tools => {
            let descriptors = ToolBox::<AllowListFile>::descriptors();
            println!("{}", serde_json::to_string_pretty(&descriptors)?);
            Ok(())
        }
        Commands::Serve => ToolServer::new(toolbox).run_stdio().await,
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // stdout carries tool output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Parser)]
#[command(name = "dirscout")]
#[command(about = "Find, list and move directories inside an allow-list", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    /// Allow-list file (one directory per line); overrides the config
    #[arg(long)]
    allow_list: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the directory a name such as "Desktop/images" resolves to
    Resolve {
        name: String,
        /// Search only below this directory
        #[arg(long)]
        base_dir: Option<String>,
    },
    /// List the entries of a resolved directory
    List {
        name: String,
        /// Search only below this directory
        #[arg(long)]
        base_dir: Option<String>,
        /// Directory names to skip while searching (comma-separated)
        #[arg(long, value_delimiter = ',', num_args = 1.., default_values_t = Vec::<String>::new())]
        ignore: Vec<String>,
    },
    /// Move files between two resolved directories
    Move {
        src: String,
        dest: String,
        /// Search only below this directory
        #[arg(long)]
        base_dir: Option<String>,
        /// Include files from subdirectories of the source
        #[arg(long, default_value_t = false)]
        recursive: bool,
        /// Extension or glob to filter on, e.g. ".png" or "*.jp*g"
        #[arg(long)]
        extension: Option<String>,
    },
    /// Add two numbers
    Add {
        #[arg(allow_hyphen_values = true)]
        a: i64,
        #[arg(allow_hyphen_values = true)]
        b: i64,
    },
    /// Print the tool descriptors as JSON
    Tools,
    /// Serve the tools over stdin/stdout, one JSON request per line
    Serve,
}
