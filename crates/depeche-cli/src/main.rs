//! depeche CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use depeche_cli::Cli;
use depeche_core::{Builder, CacheStore, GitClient, cmake, graph, manifest};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let store = CacheStore::from_env();

    // Path queries exit before any resolution happens.
    if let Some(url) = cli.cache_dir.as_deref() {
        println!("{}", store.repository_cache_path(url).display());
        return Ok(());
    }
    if let Some(url) = cli.work_dir.as_deref() {
        println!("{}", store.repository_working_path(url).display());
        return Ok(());
    }

    let environment = match cli.environment.as_deref() {
        Some(path) => manifest::load_environment(path)?,
        None => Default::default(),
    };

    let mut git = GitClient::new(&store);
    if cli.master {
        git.update_all_repositories()?;
    }

    debug!(
        "Fetching dependencies from {} with DEPECHE_HOME {}",
        cli.file.display(),
        store.home().display()
    );
    let tree = graph::expand(&store, &mut git, &cli.file)?;
    let mut builder = Builder::new(&store, &environment, cli.keep);
    builder.install(&tree, &mut git)?;
    cmake::write_cmake_file(&cli.cmake_file, &builder.dependency_roots(&tree))?;
    Ok(())
}
