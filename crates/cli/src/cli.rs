//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Scrape a torrent index listing into SQLite and push magnets to download daemons.
#[derive(Parser, Debug)]
#[command(name = "nyaa-crawler")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// TOML configuration file
    #[arg(short, long, env = "CRAWLER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Proxy URL (socks5://, socks5h://, http:// or https://)
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Write Prometheus metrics in text format to this file on exit
    #[arg(long, global = true)]
    pub metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch a listing page (or read a saved one) and store new torrents
    Scrape {
        /// Listing URL to scrape
        #[arg(long, conflicts_with = "file")]
        url: Option<String>,

        /// Saved listing page to ingest instead of fetching
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// List stored torrents and optionally send the listed magnets
    Query(QueryArgs),

    /// Send pending magnets straight from the database
    Push(PushArgs),

    /// Show database totals
    Stats,
}

impl Default for Command {
    fn default() -> Self {
        Command::Scrape {
            url: None,
            file: None,
        }
    }
}

/// Endpoints given on the command line, overriding `[destinations]`.
#[derive(ClapArgs, Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationArgs {
    /// Transmission RPC URL (e.g. user:pass@http://localhost:9091/transmission/rpc)
    #[arg(long)]
    pub transmission: Option<String>,

    /// aria2 RPC URL (e.g. token@http://localhost:6800/jsonrpc)
    #[arg(long)]
    pub aria2: Option<String>,

    /// Show what would be sent without sending or marking anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(ClapArgs, Debug, Clone, PartialEq, Eq)]
pub struct QueryArgs {
    /// Text to match anywhere in torrent names
    #[arg(short, long, alias = "regex")]
    pub pattern: Option<String>,

    /// Number of results to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: u32,

    #[command(flatten)]
    pub destinations: DestinationArgs,
}

#[derive(ClapArgs, Debug, Clone, PartialEq, Eq)]
pub struct PushArgs {
    /// Maximum records to send per destination
    #[arg(short, long, default_value_t = 50)]
    pub limit: u32,

    #[command(flatten)]
    pub destinations: DestinationArgs,
}

impl Args {
    /// The subcommand to run; scraping when none was given.
    pub fn subcommand(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["nyaa-crawler"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.db.is_none());
        assert_eq!(args.subcommand(), Command::default());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["nyaa-crawler", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["nyaa-crawler", "stats", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["nyaa-crawler", "-q", "stats"]).unwrap();
        assert!(args.quiet);
        assert_eq!(args.subcommand(), Command::Stats);
    }

    #[test]
    fn test_cli_scrape_url_and_file_conflict() {
        let args =
            Args::try_parse_from(["nyaa-crawler", "scrape", "--url", "https://example.org/"])
                .unwrap();
        assert_eq!(
            args.subcommand(),
            Command::Scrape {
                url: Some("https://example.org/".to_string()),
                file: None,
            }
        );

        let result = Args::try_parse_from([
            "nyaa-crawler",
            "scrape",
            "--url",
            "https://example.org/",
            "--file",
            "page.html",
        ]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_cli_query_args() {
        let args = Args::try_parse_from([
            "nyaa-crawler",
            "--db",
            "/tmp/t.db",
            "query",
            "--regex",
            "1080p",
            "--limit",
            "5",
            "--aria2",
            "tok@http://localhost:6800/jsonrpc",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(args.db.as_deref(), Some(std::path::Path::new("/tmp/t.db")));
        match args.subcommand() {
            Command::Query(query) => {
                assert_eq!(query.pattern.as_deref(), Some("1080p"));
                assert_eq!(query.limit, 5);
                assert!(query.destinations.transmission.is_none());
                assert_eq!(
                    query.destinations.aria2.as_deref(),
                    Some("tok@http://localhost:6800/jsonrpc")
                );
                assert!(query.destinations.dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_query_defaults() {
        let args = Args::try_parse_from(["nyaa-crawler", "query"]).unwrap();
        match args.subcommand() {
            Command::Query(query) => {
                assert!(query.pattern.is_none());
                assert_eq!(query.limit, 10);
                assert_eq!(query.destinations, DestinationArgs::default());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_push_defaults() {
        let args = Args::try_parse_from(["nyaa-crawler", "push", "--dry-run"]).unwrap();
        match args.subcommand() {
            Command::Push(push) => {
                assert_eq!(push.limit, 50);
                assert!(push.destinations.dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["nyaa-crawler", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
