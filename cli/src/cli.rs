//! CLI argument definitions for `jarshade`.
//!
//! Parsing lives here so the binary stays focused on orchestration and the
//! argument surface can be tested without spawning a process.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use jarshade::config::DEFAULT_MANIFEST;
use jarshade::model::Classpath;
use log::LevelFilter;

/// Build shaded jars from a jarshade manifest.
#[derive(Parser, Debug)]
#[command(name = "jarshade")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build shaded jars from a jarshade manifest.\n\n",
    "Each shaded module is packaged together with its runtime dependency ",
    "closure. Excluded artifacts and entries are dropped, service files are ",
    "merged, and bundled packages are relocated so they cannot clash with ",
    "the consumer's own copies.\n\n",
    "Without a subcommand, every shaded module of the manifest is built.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build every shaded module:\n",
    "    $ jarshade\n\n",
    "  Build one module into a custom directory:\n",
    "    $ jarshade build --module app -o dist\n\n",
    "  Show what would be packaged without writing anything:\n",
    "    $ jarshade --dry-run -v\n\n",
    "  Print the runtime closure of a module as JSON:\n",
    "    $ jarshade resolve --module app --json\n\n",
    "Set JARSHADE_LOG to override the log filter, e.g. JARSHADE_LOG=jarshade=trace.",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Build arguments (used when no subcommand is given).
    #[command(flatten)]
    pub build: BuildArgs,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only report errors.
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build shaded jars (default when no subcommand given).
    Build(BuildArgs),

    /// Print the resolved dependency closure of modules.
    Resolve(ResolveArgs),
}

/// Arguments for the build command.
#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    /// Path of the build manifest.
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_MANIFEST)]
    pub manifest: Utf8PathBuf,

    /// Output directory [default: build/shaded next to the manifest].
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Build only the named module (can be repeated).
    #[arg(long, value_name = "NAME")]
    pub module: Vec<String>,

    /// Number of relocation worker threads.
    #[arg(short, long, value_name = "N", value_parser = parse_jobs)]
    pub jobs: Option<usize>,

    /// Fail when any entry cannot be relocated cleanly.
    #[arg(long)]
    pub strict: bool,

    /// Assemble the modules and report what would be written.
    #[arg(long)]
    pub dry_run: bool,
}

impl Default for BuildArgs {
    fn default() -> Self {
        Self {
            manifest: Utf8PathBuf::from(DEFAULT_MANIFEST),
            output_dir: None,
            module: Vec::new(),
            jobs: None,
            strict: false,
            dry_run: false,
        }
    }
}

/// Arguments for the resolve command.
#[derive(Parser, Debug, Clone)]
pub struct ResolveArgs {
    /// Path of the build manifest.
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_MANIFEST)]
    pub manifest: Utf8PathBuf,

    /// Resolve only the named module [default: every module].
    #[arg(long, value_name = "NAME")]
    pub module: Option<String>,

    /// Classpath to resolve [default: the module's shade classpath].
    #[arg(long, value_enum, value_name = "CLASSPATH")]
    pub classpath: Option<ClasspathArg>,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Command-line spelling of a [`Classpath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClasspathArg {
    /// Runtime dependencies.
    Runtime,
    /// Compile dependencies.
    Compile,
    /// Test runtime dependencies.
    TestRuntime,
}

impl From<ClasspathArg> for Classpath {
    fn from(arg: ClasspathArg) -> Self {
        match arg {
            ClasspathArg::Runtime => Self::Runtime,
            ClasspathArg::Compile => Self::Compile,
            ClasspathArg::TestRuntime => Self::TestRuntime,
        }
    }
}

impl Cli {
    /// Return the command to run; a bare invocation builds.
    #[must_use]
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Build(self.build))
    }

    /// Map `-q` and `-v` occurrences to a log level.
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn parse_jobs(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_owned()),
        Ok(jobs) => Ok(jobs),
        Err(err) => Err(err.to_string()),
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
