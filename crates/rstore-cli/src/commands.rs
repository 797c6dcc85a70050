use std::fs;
use std::io::{Read, Write};

use anyhow::{bail, Context};
use colored::Colorize;
use rstore_server::{RstoreServer, ServerConfig};
use rstore_store::{
    Listing, Method, Precondition, Status, Storage, StoragePath, StorageRequest, StorageResponse,
};
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Ls(args) => cmd_ls(&open(&config), &args.path, format),
        Command::Cat(args) => cmd_cat(&open(&config), &args.path),
        Command::Put(args) => {
            fs::create_dir_all(&config.files_directory)
                .with_context(|| format!("creating {}", config.files_directory.display()))?;
            cmd_put(&open(&config), args, format)
        }
        Command::Rm(args) => cmd_rm(&open(&config), args, format),
        Command::Stat(args) => cmd_stat(&open(&config), &args.path, format),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.files_directory = root.clone();
    }
    Ok(config)
}

fn open(config: &ServerConfig) -> Storage {
    Storage::open(&config.files_directory, config.attributes)
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if config.tokens.is_empty() {
        tracing::warn!("no tokens configured, only public items are reachable");
    }
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(RstoreServer::new(config).serve())?;
    Ok(())
}

fn cmd_ls(storage: &Storage, raw: &str, format: OutputFormat) -> anyhow::Result<()> {
    let listing = list(storage, raw)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
        OutputFormat::Text => {
            if listing.is_empty() {
                println!("{}", "(empty)".dimmed());
            }
            for (name, version) in listing.entries() {
                let shown = if name.ends_with('/') {
                    name.as_str().blue().bold()
                } else {
                    name.as_str().normal()
                };
                println!("{:>14}  {shown}", version.to_string().dimmed());
            }
        }
    }
    Ok(())
}

fn cmd_cat(storage: &Storage, raw: &str) -> anyhow::Result<()> {
    let response = storage.handle(&StorageRequest::new(Method::Get, file_path(raw)?))?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&response.body.unwrap_or_default())?;
    stdout.flush()?;
    Ok(())
}

fn cmd_put(storage: &Storage, args: PutArgs, format: OutputFormat) -> anyhow::Result<()> {
    let body = match &args.file {
        Some(file) => fs::read(file).with_context(|| format!("reading {}", file.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };
    let response = put(storage, &args, body)?;
    report(&args.path, "stored", &response, format)
}

fn cmd_rm(storage: &Storage, args: RmArgs, format: OutputFormat) -> anyhow::Result<()> {
    let response = remove(storage, &args)?;
    report(&args.path, "deleted", &response, format)
}

fn cmd_stat(storage: &Storage, raw: &str, format: OutputFormat) -> anyhow::Result<()> {
    let path = StoragePath::parse(raw)?;
    let response = storage.handle(&StorageRequest::new(Method::Head, path.clone()))?;
    let etag = response.etag.as_ref().map(|t| t.as_str());
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "path": path.to_string(), "etag": etag, "content_type": response.content_type })
        ),
        OutputFormat::Text => {
            println!("{:<14}{}", "path:", path.to_string().bold());
            if let Some(etag) = etag {
                println!("{:<14}{}", "etag:", etag.yellow());
            }
            if let Some(content_type) = &response.content_type {
                println!("{:<14}{}", "content-type:", content_type.as_str().cyan());
            }
        }
    }
    Ok(())
}

fn list(storage: &Storage, raw: &str) -> anyhow::Result<Listing> {
    let response = storage.handle(&StorageRequest::new(Method::Get, directory_path(raw)?))?;
    Ok(serde_json::from_slice(&response.body.unwrap_or_default())?)
}

fn put(storage: &Storage, args: &PutArgs, body: Vec<u8>) -> anyhow::Result<StorageResponse> {
    let request = StorageRequest::new(Method::Put, file_path(&args.path)?)
        .with_precondition(Precondition::from_headers(
            args.if_match.as_deref(),
            args.if_none_match.as_deref(),
        ))
        .with_body(args.content_type.clone(), body);
    Ok(storage.handle(&request)?)
}

fn remove(storage: &Storage, args: &RmArgs) -> anyhow::Result<StorageResponse> {
    let request = StorageRequest::new(Method::Delete, file_path(&args.path)?)
        .with_precondition(Precondition::from_headers(args.if_match.as_deref(), None));
    Ok(storage.handle(&request)?)
}

fn file_path(raw: &str) -> anyhow::Result<StoragePath> {
    let path = StoragePath::parse(raw)?;
    if path.is_directory() {
        bail!("{raw} names a directory, not a file");
    }
    Ok(path)
}

/// `ls alice/notes` means the directory even without the trailing slash.
fn directory_path(raw: &str) -> anyhow::Result<StoragePath> {
    if raw.ends_with('/') {
        Ok(StoragePath::parse(raw)?)
    } else {
        Ok(StoragePath::parse(&format!("{raw}/"))?)
    }
}

fn report(path: &str, action: &str, response: &StorageResponse, format: OutputFormat) -> anyhow::Result<()> {
    let etag = response.etag.as_ref().map(|t| t.as_str());
    if response.status != Status::Ok {
        bail!(
            "{path}: precondition failed ({}), current tag {}",
            response.status.code(),
            etag.unwrap_or("none"),
        );
    }
    match format {
        OutputFormat::Json => println!("{}", json!({ "path": path, "action": action, "etag": etag })),
        OutputFormat::Text => match etag {
            Some(etag) => println!("{} {action} {} {}", "✓".green(), path.bold(), etag.yellow()),
            None => println!("{} {action} {}", "✓".green(), path.bold()),
        },
    }
    Ok(())
}
