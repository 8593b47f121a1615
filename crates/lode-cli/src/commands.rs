use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use lode_query::AssetList;
use lode_store::{DirValueStore, ProgressSink, StoreConfig, ValueStore};
use serde::Serialize;
use tracing::debug;

use crate::cli::*;
use crate::config::LodeConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Keys => cmd_keys(&config, format),
        Command::Get(args) => cmd_get(&config, args),
        Command::Set(args) => cmd_set(&config, args),
        Command::Cut(args) => cmd_cut(&config, args),
        Command::CreatedAfter(args) => {
            let store = open_store(&config.store)?;
            print_list(&sorted(store.created_after(args.since)), format)
        }
        Command::ModifiedAfter(args) => {
            let store = open_store(&config.store)?;
            print_list(&sorted(store.modified_after(args.since, args.strict)), format)
        }
        Command::Vet(args) => cmd_vet(&config, args),
        Command::Query(args) => cmd_query(&config, args, format),
        Command::Values(args) => cmd_values(&config, args, format),
    }
}

/// Configuration file plus command-line overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<LodeConfig> {
    let mut config = LodeConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.dir {
        config.store.dir = dir.clone();
    }
    if let Some(ext) = &cli.ext {
        config.store.ext = ext
            .parse()
            .map_err(|_| anyhow!("unsupported extension {ext}"))?;
    }
    debug!(
        dir = %config.store.dir.display(),
        ext = %config.store.ext,
        "configuration resolved"
    );
    Ok(config)
}

fn open_store(config: &StoreConfig) -> anyhow::Result<DirValueStore> {
    DirValueStore::from_config(config)
        .with_context(|| format!("opening store in {}", config.dir.display()))
}

fn sorted(mut keys: Vec<String>) -> Vec<String> {
    keys.sort();
    keys
}

fn print_list<T>(items: &[T], format: OutputFormat) -> anyhow::Result<()>
where
    T: Serialize + std::fmt::Display,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        OutputFormat::Text => {
            for item in items {
                println!("{item}");
            }
        }
    }
    Ok(())
}

fn cmd_keys(config: &LodeConfig, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(&config.store)?;
    print_list(&store.keys(), format)
}

fn cmd_get(config: &LodeConfig, args: KeyArgs) -> anyhow::Result<()> {
    let store = open_store(&config.store)?;
    let data = store
        .get(&args.key)?
        .ok_or_else(|| anyhow!("no value for {}", args.key))?;
    io::stdout().write_all(&data)?;
    Ok(())
}

fn cmd_set(config: &LodeConfig, args: SetArgs) -> anyhow::Result<()> {
    let store = open_store(&config.store)?;
    let before = store.entry(&args.key);
    match &args.file {
        Some(path) => {
            let mut file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            store.set(&args.key, &mut file)?;
        }
        None => store.set(&args.key, &mut io::stdin().lock())?,
    }

    let after = store.entry(&args.key);
    if before.map(|e| e.hash) == after.map(|e| e.hash) {
        println!("{} {} unchanged", "=".dimmed(), args.key.bold());
    } else {
        println!("{} {} stored", "✓".green().bold(), args.key.bold());
    }
    Ok(())
}

fn cmd_cut(config: &LodeConfig, args: KeyArgs) -> anyhow::Result<()> {
    let store = open_store(&config.store)?;
    if store.cut(&args.key)? {
        println!("{} {} removed", "✓".green().bold(), args.key.bold());
    } else {
        println!("{} not present", args.key.bold());
    }
    Ok(())
}

/// Progress on stderr, redrawn in place.
struct TerminalProgress {
    label: &'static str,
    total: u64,
    done: u64,
}

impl TerminalProgress {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            total: 0,
            done: 0,
        }
    }

    fn finish(&self) {
        if self.total > 0 {
            eprintln!();
        }
    }
}

impl ProgressSink for TerminalProgress {
    fn total(&mut self, total: u64) {
        self.total = total;
        self.done = 0;
    }

    fn increment(&mut self) {
        self.done += 1;
        eprint!("\r{} {}/{}", self.label.dimmed(), self.done, self.total);
    }
}

fn cmd_vet(config: &LodeConfig, args: VetArgs) -> anyhow::Result<()> {
    let store = open_store(&config.store)?;

    let mut progress = TerminalProgress::new("index");
    let orphans = store.vet_index_only(args.fix, Some(&mut progress))?;
    progress.finish();

    let mut progress = TerminalProgress::new("files");
    let unindexed = store.vet_index_missing(args.fix, Some(&mut progress))?;
    progress.finish();

    let verb = if args.fix { "fixed" } else { "found" };
    for key in &orphans {
        println!("  {} {}", "missing file:".red(), key);
    }
    for key in &unindexed {
        println!("  {} {}", "unindexed:".yellow(), key);
    }
    if orphans.is_empty() && unindexed.is_empty() {
        println!("{} index and value files agree", "✓".green().bold());
    } else {
        println!(
            "{} {} orphaned, {} unindexed",
            verb.bold(),
            orphans.len(),
            unindexed.len()
        );
    }
    Ok(())
}

/// Group `ASSET=TERM` arguments by asset.
fn parse_clauses(clauses: &[String]) -> anyhow::Result<BTreeMap<String, Vec<String>>> {
    let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for clause in clauses {
        let Some((asset, term)) = clause.split_once('=') else {
            bail!("expected ASSET=TERM, got {clause}");
        };
        if asset.is_empty() {
            bail!("missing asset in {clause}");
        }
        query
            .entry(asset.to_string())
            .or_default()
            .push(term.to_string());
    }
    Ok(query)
}

fn open_assets<I, S>(config: &LodeConfig, assets: I) -> anyhow::Result<AssetList>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let store: Arc<dyn ValueStore> = Arc::new(open_store(&config.store)?);
    Ok(AssetList::with_store(store, config.fabric.clone(), assets)?)
}

fn cmd_query(config: &LodeConfig, args: QueryArgs, format: OutputFormat) -> anyhow::Result<()> {
    let query = parse_clauses(&args.clauses)?;
    let list = open_assets(config, query.keys().cloned())?;
    let matches: Vec<String> = list.match_query(&query, args.any_case)?.into_iter().collect();
    print_list(&matches, format)
}

fn cmd_values(config: &LodeConfig, args: ValuesArgs, format: OutputFormat) -> anyhow::Result<()> {
    let list = open_assets(config, [args.asset.as_str()])?;
    let values = if args.raw {
        list.get_all_unchanged_values(&args.asset, &args.key)
            .map(<[String]>::to_vec)
    } else {
        list.get_all_values(&args.asset, &args.key)
    };
    match values {
        Some(values) => print_list(&values, format),
        None => bail!("{} has no values for {}", args.asset, args.key),
    }
}
