use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use commit_display::{CommitTree, DisplayConfig, DisplayOutcome, RefMap};
use commit_graph::{CellType, CommitRecord, RefLabel};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "commit-tree")]
#[command(about = "Lay out a synthetic commit history in the background", long_about = None)]
struct Cli {
    /// Number of commits to generate
    #[arg(short, long, default_value = "40")]
    commits: usize,

    /// Number of feature branches next to the trunk
    #[arg(short, long, default_value = "2")]
    branches: usize,

    /// Commits at the end of history that exist only locally
    #[arg(long, default_value = "3")]
    unpushed: usize,

    /// TOML config for the view
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => DisplayConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => DisplayConfig::default(),
    };

    let tree = CommitTree::new(config).with_focus_handler(|id: &str| info!(commit = id, "focus"));
    tree.open(&std::env::current_dir().context("no working directory")?);

    let history = synthetic_history(cli.commits, cli.branches, cli.unpushed);
    let refs = branch_refs(&history, cli.branches);
    let head = history.last().map(|c| c.id.clone());

    // A second request cancels the first one if it is still running
    tree.update(&history[..history.len() / 2], &refs, None)?;
    tree.update(&history, &refs, head.as_deref())?;
    report(&tree)?;

    // Push everything: local commits turn into shared ones and get replaced
    let pushed: Vec<CommitRecord> = history
        .iter()
        .cloned()
        .map(|mut c| {
            c.cell_type = CellType::Both;
            c
        })
        .collect();
    let summary = tree.update(&pushed, &refs, head.as_deref())?;
    println!("after push: {} replaced", summary.replaced);
    report(&tree)?;

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn report(tree: &CommitTree) -> Result<()> {
    match tree.coordinator().wait_idle() {
        Some(DisplayOutcome::Finalized { cycle, positioned }) => {
            println!("cycle {}: {} commits positioned", cycle, positioned);
        }
        Some(DisplayOutcome::Failed { cycle, error }) => bail!("layout cycle {} failed: {}", cycle, error),
        Some(DisplayOutcome::Cancelled { cycle }) => {
            println!("cycle {} cancelled", cycle);
            return Ok(());
        }
        None => return Ok(()),
    }

    let mut rows: Vec<_> = tree.coordinator().positions().into_iter().collect();
    rows.sort_by_key(|(_, p)| (p.generation, p.row));
    for (id, position) in rows {
        let cell = tree.model().get_cell(&id);
        let label = cell.as_ref().map(|c| c.labels().descriptor.clone()).unwrap_or_default();
        let refs: Vec<String> = cell
            .map(|c| c.labels().refs.iter().map(|r| r.name.clone()).collect())
            .unwrap_or_default();
        println!(
            "{:>4} {:>3}  {}{}",
            position.generation,
            position.row,
            label,
            if refs.is_empty() { String::new() } else { format!(" ({})", refs.join(", ")) }
        );
    }
    Ok(())
}

/// Trunk plus `branches` side lines; every seventh trunk commit merges all side lines
fn synthetic_history(count: usize, branches: usize, unpushed: usize) -> Vec<CommitRecord> {
    let lanes = branches + 1;
    let start = Utc::now() - Duration::hours(count as i64);
    let mut tips: Vec<Option<String>> = vec![None; lanes];
    let mut commits = Vec::with_capacity(count);

    for i in 0..count {
        let id = format!("{:040x}", (i as u128 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
        let lane = i % lanes;
        let trunk = tips[0].clone();

        let mut parents: Vec<String> = tips[lane].iter().chain(trunk.iter()).take(1).cloned().collect();
        if lane == 0 && i % 7 == 0 {
            for tip in tips.iter_mut().skip(1) {
                parents.extend(tip.take());
            }
        }

        let cell_type = if i + unpushed >= count { CellType::Local } else { CellType::Both };
        commits.push(
            CommitRecord::new(id.clone(), start + Duration::hours(i as i64), parents, cell_type)
                .with_summary(format!("change #{}", i + 1)),
        );
        tips[lane] = Some(id);
    }
    commits
}

fn branch_refs(history: &[CommitRecord], branches: usize) -> RefMap {
    let lanes = branches + 1;
    let mut refs = RefMap::new();
    for lane in 0..lanes {
        let Some(tip) = history.iter().enumerate().filter(|(i, _)| i % lanes == lane).last() else {
            continue;
        };
        let labels = if lane == 0 {
            vec![RefLabel::branch("main"), RefLabel::remote("origin/main")]
        } else {
            vec![RefLabel::branch(format!("feature-{}", lane))]
        };
        refs.entry(tip.1.id.clone()).or_insert_with(Vec::new).extend(labels);
    }
    refs
}
