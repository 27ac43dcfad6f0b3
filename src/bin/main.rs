use anyhow::{Context, Error};
use chrono::{DateTime, Utc};
use quickshare::{cache, Attachment, Settings, ShareRecord, Sharer};
use std::path::{Component, Path, PathBuf};
use structopt::StructOpt;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::from_args();

    log::debug!("Starting application with {:#?}", args);

    // like the host application would, make sure the generated user ID
    // sticks around between runs
    let settings = Settings::load(&args.config).await?;
    settings.save(&args.config).await?;

    let cache = cache::open(&settings, &args.data_dir).await?;
    let sharer = Sharer::from_settings(&settings, cache)?;

    match args.cmd {
        Command::Share { file, attachments } => {
            share(&sharer, &file, &attachments).await?
        },
        Command::Unshare { file } => {
            let path = document_path(&file)?;
            if sharer.unshare_document(&path).await? {
                println!("Unshared {}", path);
            } else {
                println!("{} isn't currently shared", path);
            }
        },
        Command::List => {
            let now = Utc::now();
            for (path, record) in sharer.cache().entries().await? {
                println!(
                    "{}\t{}\t{}\texpires {}",
                    path,
                    status(&record, now),
                    record.view_url,
                    record.expire_datetime
                );
            }
        },
        Command::Moved { from, to } => {
            let (from, to) = (document_path(&from)?, document_path(&to)?);
            sharer.document_renamed(&from, &to).await?;
        },
        Command::Removed { file } => {
            sharer.document_deleted(&document_path(&file)?).await?;
        },
    }

    Ok(())
}

async fn share(
    sharer: &Sharer,
    file: &Path,
    attachments: &[PathBuf],
) -> Result<(), Error> {
    let path = document_path(file)?;
    let body = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Unable to read {}", file.display()))?;
    let basename = file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();

    let mut embedded = Vec::new();
    for attachment in attachments {
        let data = tokio::fs::read(attachment)
            .await
            .with_context(|| format!("Unable to read {}", attachment.display()))?;
        let file_name = attachment
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();

        embedded.push(Attachment::new(
            format!("![[{}]]", file_name),
            file_name,
            data,
        ));
    }

    let result = sharer
        .share_document(&path, basename, &body, &embedded)
        .await?;

    println!("{}", result.view_url);
    log::info!("The link expires at {}", result.expire_time);

    Ok(())
}

fn status(record: &ShareRecord, now: DateTime<Utc>) -> &'static str {
    if record.deleted_from_server {
        "unshared"
    } else if record.is_expired(now) {
        "expired"
    } else if record.deleted_from_vault {
        "deleted locally"
    } else {
        "shared"
    }
}

/// Cache keys use forward slashes, whatever the platform.
fn document_path(file: &Path) -> Result<String, Error> {
    let parts: Option<Vec<&str>> = file
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_str())
        .collect();

    parts
        .map(|parts| parts.join("/"))
        .with_context(|| format!("{} isn't valid UTF-8", file.display()))
}

#[derive(Debug, StructOpt)]
struct Args {
    #[structopt(
        long = "config",
        default_value = "quickshare.json",
        parse(from_os_str),
        help = "Where settings are stored"
    )]
    config: PathBuf,
    #[structopt(
        long = "data-dir",
        default_value = ".",
        parse(from_os_str),
        help = "Where the share cache is kept"
    )]
    data_dir: PathBuf,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(about = "Create a share link for a note")]
    Share {
        #[structopt(parse(from_os_str))]
        file: PathBuf,
        #[structopt(
            short = "a",
            long = "attach",
            parse(from_os_str),
            help = "An image embedded in the note"
        )]
        attachments: Vec<PathBuf>,
    },
    #[structopt(about = "Delete a shared note from the server")]
    Unshare {
        #[structopt(parse(from_os_str))]
        file: PathBuf,
    },
    #[structopt(about = "Show everything that has been shared")]
    List,
    #[structopt(about = "Tell the cache a note was renamed")]
    Moved {
        #[structopt(parse(from_os_str))]
        from: PathBuf,
        #[structopt(parse(from_os_str))]
        to: PathBuf,
    },
    #[structopt(about = "Tell the cache a note was deleted")]
    Removed {
        #[structopt(parse(from_os_str))]
        file: PathBuf,
    },
}
