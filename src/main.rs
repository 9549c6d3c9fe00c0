use chatsite::store::{SqliteStore, Storage};
use chatsite::{build, config, output};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chatsite")]
#[command(version)]
#[command(about = "Static site generator for archived group-chat history")]
#[command(long_about = "\
Static site generator for archived group-chat history

The archive database is the data source: every month with messages becomes
a page group, messages are ordered by id, and the freshest page becomes
the site index. RSS and Atom feeds carry the most recent messages.

Expected inputs:

  data.sqlite                  # Archive produced by the chat archiver
  config.toml                  # Site config (optional, defaults apply)
  static/                      # Static assets → mirrored into the output
  media/                       # Downloaded media → mirrored if present

Output (publish_dir, wiped on every build):

  site/
  ├── 2024-01.html             # Page 1 of January 2024
  ├── 2024-01_2.html           # Page 2
  ├── index.html               # Copy or symlink of the latest page
  ├── index.xml                # RSS 2.0 feed
  ├── index.atom               # Atom feed
  ├── static/                  # Mirrored assets
  └── media/                   # Mirrored media

Run 'chatsite gen-config' to generate a documented config.toml.")]
struct Cli {
    /// Archive database produced by the chat archiver
    #[arg(long, default_value = "data.sqlite", global = true)]
    data: PathBuf,

    /// Site configuration file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the static site and feeds from the archive
    Build {
        /// Symlink assets and index.html instead of copying
        #[arg(long)]
        symlink: bool,
    },
    /// Validate the config and summarize the archive without writing
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build { symlink } => {
            let config = config::load_config(&cli.config)?;
            let store = SqliteStore::open(&cli.data)?;
            let summary = build::SiteBuilder::new(&config, &store)?
                .symlink(symlink)
                .build()?;
            output::print_build_output(&summary);
        }
        Command::Check => {
            config::load_config(&cli.config)?;
            let store = SqliteStore::open(&cli.data)?;
            let mut months = Vec::new();
            for month in store.get_timeline()? {
                let count = store.get_message_count(month.year, month.month)?;
                months.push((month, count));
            }
            let chat_info = store.get_last_archived_chat_info()?;
            output::print_check_output(&months, chat_info.as_ref());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
