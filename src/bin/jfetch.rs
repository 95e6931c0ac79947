//! jfetch - install jsonnet packages into a vendor directory
//!
//! Usage:
//!   jfetch install <name> <version> --source <json>   Install from a source descriptor
//!   jfetch git <remote> [--subdir DIR]                 Install from a git repository
//!   jfetch http <url>                                  Install a .tar.gz from a URL
//!   jfetch gitlab <project> <package>                  Install from a GitLab package registry
//!   jfetch local <dir>                                 Link a local directory

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use jsonnet_fetch::{
    Config, GitSource, GitlabSource, HttpSource, InstallContext, LocalSource, Output, Source,
    install,
};
use owo_colors::OwoColorize;
use std::path::PathBuf;

/// Version installed from git when none is given
const DEFAULT_GIT_VERSION: &str = "master";

#[derive(Parser)]
#[command(name = "jfetch")]
#[command(about = "Fetch jsonnet packages from git, HTTP and GitLab sources")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true, env = "JFETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Vendor directory packages are installed into
    #[arg(short, long, global = true, default_value = "vendor")]
    dir: PathBuf,
}

/// Name and version shared by the shorthand subcommands
#[derive(Args)]
struct Target {
    /// Install name (derived from the source if not given)
    #[arg(short, long)]
    name: Option<String>,

    /// Version, tag, branch, or commit to install
    #[arg(short = 'V', long = "version")]
    version: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install from a JSON source descriptor
    Install {
        /// Install name, may contain '/' for nested directories
        name: String,

        /// Version to install
        version: String,

        /// Source descriptor, e.g. '{"git":{"remote":"https://github.com/org/repo.git"}}'
        #[arg(short, long)]
        source: String,
    },

    /// Install from a git repository
    Git {
        /// Repository URL
        remote: String,

        /// Only install this subdirectory of the repository
        #[arg(long, default_value = "")]
        subdir: String,

        #[command(flatten)]
        target: Target,
    },

    /// Install a .tar.gz archive; `$VERSION` in the URL is substituted
    Http {
        url: String,

        #[command(flatten)]
        target: Target,
    },

    /// Install from a GitLab generic package registry
    Gitlab {
        /// Project path, e.g. group/project
        project: String,

        /// Package name in the registry
        package: String,

        /// GitLab host
        #[arg(long, default_value = "")]
        host: String,

        /// File within the package
        #[arg(long, default_value = "")]
        filename: String,

        #[command(flatten)]
        target: Target,
    },

    /// Symlink a directory on disk
    Local {
        directory: String,

        #[command(flatten)]
        target: Target,
    },
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new(cli.quiet);

    if let Err(e) = run(cli) {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().or_else(Config::default_path);
    let mut options = Config::load(config_path.as_deref())?;
    if cli.quiet {
        options.quiet = true;
    }
    let ctx = InstallContext::new(options);

    let (source, name, version) = request(cli.command)?;
    std::fs::create_dir_all(&cli.dir)
        .with_context(|| format!("failed to create {}", cli.dir.display()))?;

    let resolved = install(&ctx, &source, &name, &cli.dir, &version)?;
    if !ctx.options.quiet && !resolved.is_empty() && resolved != version {
        println!("     {} {}", "resolved".dimmed(), resolved);
    }
    Ok(())
}

/// Turn a subcommand into `(source, name, version)`.
fn request(command: Commands) -> Result<(Source, String, String)> {
    let (source, target) = match command {
        Commands::Install {
            name,
            version,
            source,
        } => {
            let source = Source::from_json(&source).context("invalid --source")?;
            return Ok((source, name, version));
        }
        Commands::Git {
            remote,
            subdir,
            target,
        } => (Source::Git(GitSource { remote, subdir }), target),
        Commands::Http { url, target } => (
            Source::Http(HttpSource {
                url,
                target: String::new(),
            }),
            target,
        ),
        Commands::Gitlab {
            project,
            package,
            host,
            filename,
            target,
        } => (
            Source::GitlabRegistry(GitlabSource {
                project,
                package,
                host,
                filename,
            }),
            target,
        ),
        Commands::Local { directory, target } => {
            (Source::Local(LocalSource { directory }), target)
        }
    };

    source.validate().context("invalid source")?;

    let version = match (&source, target.version) {
        (_, Some(v)) => v,
        (Source::Git(_), None) => DEFAULT_GIT_VERSION.to_string(),
        (Source::Local(_), None) | (Source::Http(_), None) => String::new(),
        (Source::GitlabRegistry(_), None) => bail!("--version is required for gitlab sources"),
    };
    let name = target.name.unwrap_or_else(|| source.legacy_name());
    Ok((source, name, version))
}
