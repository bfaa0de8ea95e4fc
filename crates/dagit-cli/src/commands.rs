use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use tracing::{error, info};

use dagit_graph::{payload, snapshot, GraphDocument};
use dagit_repo::{RepoConfig, Repository};
use dagit_types::ObjectId;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let repo = open_repo(&cli)?;
    match cli.command {
        Command::Show(args) => cmd_show(&repo, args),
        Command::Graph(args) => cmd_graph(&repo, args),
        Command::Watch(args) => cmd_watch(repo, args),
        Command::Stats => cmd_stats(&repo),
    }
}

fn open_repo(cli: &Cli) -> anyhow::Result<Repository> {
    let mut config = match &cli.config {
        Some(path) => RepoConfig::load(path)?,
        None => RepoConfig::default(),
    };
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    Repository::open_with_config(&cli.repo, config)
        .with_context(|| format!("opening repository at {}", cli.repo.display()))
}

fn cmd_show(repo: &Repository, args: ShowArgs) -> anyhow::Result<()> {
    let Some(hex) = args.id else {
        return print_document(&snapshot(repo)?);
    };
    let id: ObjectId = hex.parse().with_context(|| format!("invalid object id {hex:?}"))?;
    let obj = repo.lookup(&id)?;

    if args.kind_only {
        println!("{}", obj.kind);
        return Ok(());
    }
    if let Some(reason) = &obj.header_error {
        eprintln!("{} {}", "warning:".yellow().bold(), reason);
    }
    let value = payload(&obj.parse()?)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn cmd_graph(repo: &Repository, args: GraphArgs) -> anyhow::Result<()> {
    let doc = snapshot(repo)?;
    match args.output {
        Some(path) => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            let mut out = std::io::BufWriter::new(file);
            doc.write_pretty(&mut out)?;
            out.flush()?;
            println!(
                "{} Wrote {} nodes, {} edges to {}",
                "✓".green().bold(),
                doc.nodes.len(),
                doc.edges.len(),
                path.display().to_string().bold()
            );
        }
        None => print_document(&doc)?,
    }
    let dangling = doc.dangling();
    if !dangling.is_empty() {
        eprintln!(
            "{} {} edges point at objects not in the store",
            "note:".cyan(),
            dangling.len()
        );
    }
    Ok(())
}

fn cmd_stats(repo: &Repository) -> anyhow::Result<()> {
    let stats = repo.stats();
    println!("Repository {}", repo.layout().root.display().to_string().bold());
    println!("  {:<8} {}", "commits", stats.commits.to_string().yellow());
    println!("  {:<8} {}", "trees", stats.trees.to_string().yellow());
    println!("  {:<8} {}", "blobs", stats.blobs.to_string().yellow());
    println!("  {:<8} {}", "other", stats.other.to_string().yellow());
    println!("  {:<8} {}", "total", stats.total.to_string().bold());
    match repo.current_commit()? {
        Some((id, commit)) => println!(
            "HEAD {} {}",
            id.short_hex().cyan(),
            commit.message.lines().next().unwrap_or_default()
        ),
        None => println!("HEAD {}", "unborn".dimmed()),
    }
    Ok(())
}

fn cmd_watch(repo: Repository, args: WatchArgs) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch_loop(Arc::new(repo), args))
}

async fn watch_loop(repo: Arc<Repository>, args: WatchArgs) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    info!(root = %repo.layout().root.display(), interval = args.interval, "watching store");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("stopping watch");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        // Scans do blocking file I/O; keep them off the runtime thread.
        let polled = Arc::clone(&repo);
        let refreshed = tokio::task::spawn_blocking(move || polled.refresh_if_changed()).await?;
        match refreshed {
            Ok(false) => {}
            Ok(true) => {
                let stats = repo.stats();
                println!(
                    "{} {} objects ({} commits, {} trees, {} blobs)",
                    "↻".green().bold(),
                    stats.total,
                    stats.commits,
                    stats.trees,
                    stats.blobs
                );
                if args.print {
                    let current = Arc::clone(&repo);
                    let doc = tokio::task::spawn_blocking(move || snapshot(&current)).await??;
                    print_document(&doc)?;
                }
            }
            // The previous map is still in place; try again on the next tick.
            Err(err) => error!(error = %err, "refresh failed"),
        }
    }
}

fn print_document(doc: &GraphDocument) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    doc.write_pretty(&mut out)?;
    writeln!(out)?;
    Ok(())
}
