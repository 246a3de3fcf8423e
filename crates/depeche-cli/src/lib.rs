//! depeche - fetch, build, and cache source dependencies for CMake
//! projects.
//!
//! # Overview
//!
//! depeche reads a `depeche.json` manifest, fetches every pinned
//! dependency into a content-addressed cache under `DEPECHE_HOME`
//! (default `~/.depeche`), builds each one bottom-up, and writes a CMake
//! include file exporting one `<NAME>_ROOT` variable per direct
//! dependency.
//!
//! All heavy lifting lives in `depeche-core`; this crate is the argument
//! surface and wiring.

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "depeche")]
#[command(version, about = "Fetch, build, and cache source dependencies for CMake projects")]
pub struct Cli {
    /// Path to the depeche.json file
    #[arg(short, long = "file", default_value = "depeche.json")]
    pub file: PathBuf,

    /// Path to the cmake file to produce
    #[arg(short, long = "cmake-file", default_value = "CMakeLists-depeche.txt")]
    pub cmake_file: PathBuf,

    /// Path to a JSON file of build environment variables
    #[arg(short, long)]
    pub environment: Option<PathBuf>,

    /// Print extra output
    #[arg(short, long)]
    pub verbose: bool,

    /// Don't print output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Update all cached repositories before resolving
    #[arg(short, long)]
    pub master: bool,

    /// Fail instead of removing an existing build directory
    #[arg(short, long)]
    pub keep: bool,

    /// Print the cache path for a repository URL and exit
    #[arg(long = "cache_dir", value_name = "URL")]
    pub cache_dir: Option<String>,

    /// Print the working checkout path for a repository URL and exit
    #[arg(short = 'w', long = "work_dir", value_name = "URL")]
    pub work_dir: Option<String>,
}
