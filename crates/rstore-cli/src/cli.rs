use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rstore",
    about = "rstore: per-user document storage with conditional requests",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage root; overrides `files_directory` from the config
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// List a directory
    Ls(PathArgs),
    /// Print a file's content
    Cat(PathArgs),
    /// Store a file
    Put(PutArgs),
    /// Delete a file
    Rm(RmArgs),
    /// Show a file's entity tag and content type
    Stat(PathArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on; overrides `bind_addr` from the config
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct PathArgs {
    /// Storage path, e.g. `/alice/contacts/work`
    pub path: String,
}

#[derive(Args)]
pub struct PutArgs {
    pub path: String,

    /// Read the content from this file instead of stdin
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    #[arg(long)]
    pub content_type: Option<String>,

    /// Only store if the current entity tag matches (`*` for any)
    #[arg(long)]
    pub if_match: Option<String>,

    /// Only store if the current entity tag does not match (`*` for absent)
    #[arg(long)]
    pub if_none_match: Option<String>,
}

#[derive(Args)]
pub struct RmArgs {
    pub path: String,

    #[arg(long)]
    pub if_match: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_put() {
        let cli = Cli::try_parse_from([
            "rstore",
            "put",
            "/alice/notes/a",
            "--content-type",
            "text/plain",
            "--if-none-match",
            "*",
            "--root",
            "/tmp/store",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/store")));
        match cli.command {
            Command::Put(args) => {
                assert_eq!(args.path, "/alice/notes/a");
                assert_eq!(args.content_type.as_deref(), Some("text/plain"));
                assert_eq!(args.if_none_match.as_deref(), Some("*"));
                assert!(args.if_match.is_none());
                assert!(args.file.is_none());
            }
            _ => panic!("expected put"),
        }
    }

    #[test]
    fn global_flags() {
        let cli = Cli::try_parse_from(["rstore", "ls", "/alice/", "--format", "json", "-v"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Ls(_)));
    }

    #[test]
    fn serve_bind() {
        let cli = Cli::try_parse_from(["rstore", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Command::Serve(args) => assert_eq!(args.bind.map(|a| a.port()), Some(9000)),
            _ => panic!("expected serve"),
        }
        assert!(Cli::try_parse_from(["rstore", "serve", "--bind", "nope"]).is_err());
    }

    #[test]
    fn path_is_required() {
        assert!(Cli::try_parse_from(["rstore", "cat"]).is_err());
    }
}
