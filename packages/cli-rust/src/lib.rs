//! essh CLI - Extended ssh command
//!
//! This module contains the CLI implementation behind the `essh` binary.

mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use console::style;
use essh_core::config::{default_sources, explicit_source, get_data_dir, load_workspace};
use essh_core::{Workspace, get_version, get_version_long};
use tracing_subscriber::EnvFilter;

use commands::{ConfigScope, ExecOptions, ListOptions, OutputFormat, SshConfigFile};

/// Extended ssh command
///
/// With no mode flag, arguments go to ssh. When the first argument names a
/// task, the task runs instead and the second argument is its payload.
#[derive(Parser)]
#[command(name = "essh")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = get_long_version())]
#[command(about = "Extended ssh command", long_about = None)]
#[command(after_help = get_banner())]
struct Cli {
    /// Print the generated ssh_config and exit
    #[arg(long)]
    print: bool,

    /// Write the generated ssh_config to its configured path and exit
    #[arg(long = "gen")]
    generate: bool,

    /// List hosts
    #[arg(long)]
    hosts: bool,

    /// List tasks
    #[arg(long)]
    tasks: bool,

    /// List host tags
    #[arg(long)]
    tags: bool,

    /// Select hosts or tasks by name or tag (repeatable)
    #[arg(long, value_name = "TERM")]
    select: Vec<String>,

    /// Narrow listed hosts or tasks by name or tag (repeatable)
    #[arg(long, value_name = "TERM")]
    filter: Vec<String>,

    /// Machine-readable listing format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Suppress non-essential output, print bare names in listings
    #[arg(short, long)]
    quiet: bool,

    /// Show more columns in listings
    #[arg(short, long)]
    verbose: bool,

    /// Print debug logs and the real commands being run
    #[arg(long)]
    debug: bool,

    /// Load only this configuration file
    #[arg(long, value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// Print the current configuration file path (project or --config-file)
    #[arg(long)]
    config: bool,

    /// Print the per-user configuration file path
    #[arg(long)]
    user_config: bool,

    /// Print the system-wide configuration file path
    #[arg(long)]
    system_config: bool,

    /// Print the zsh completion script
    #[arg(long)]
    zsh_completion: bool,

    /// Print the bash completion script
    #[arg(long)]
    bash_completion: bool,

    /// Print shell aliases (escp, ersync)
    #[arg(long)]
    aliases: bool,

    /// Run the first argument as an ad-hoc task, the second being its payload
    #[arg(long, conflicts_with_all = ["shell", "rsync", "scp"])]
    exec: bool,

    /// With --exec: run remotely on these hosts or tags (repeatable)
    #[arg(long, value_name = "TERM", requires = "exec")]
    on: Vec<String>,

    /// With --exec: run locally once per matching host (repeatable)
    #[arg(long, value_name = "TERM", requires = "exec", conflicts_with = "on")]
    foreach: Vec<String>,

    /// With --exec: run as root through sudo
    #[arg(long, requires = "exec")]
    privileged: bool,

    /// With --exec: run on all hosts at once
    #[arg(long, requires = "exec")]
    parallel: bool,

    /// With --exec: prefix output lines with the host name
    #[arg(long, requires = "exec")]
    prefix: bool,

    /// With --exec: custom output prefix template
    #[arg(long, value_name = "TEMPLATE", requires = "exec")]
    prefix_string: Option<String>,

    /// With --exec: the first argument is a script file
    #[arg(long, requires = "exec")]
    file: bool,

    /// With --exec: allocate a pseudo-terminal on remote hosts
    #[arg(long, requires = "exec")]
    pty: bool,

    /// Run the arguments with /bin/sh, ESSH_SSH_CONFIG exported
    #[arg(long, conflicts_with_all = ["rsync", "scp"])]
    shell: bool,

    /// Run rsync over ssh with the generated ssh_config
    #[arg(long, conflicts_with = "scp")]
    rsync: bool,

    /// Run scp with the generated ssh_config
    #[arg(long)]
    scp: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// ssh arguments, or a task name followed by its payload
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

/// Get the ASCII banner for help display
fn get_banner() -> &'static str {
    r#"
                 _
   ___  ___ ___| |__
  / _ \/ __/ __| '_ \
 |  __/\__ \__ \ | | |
  \___||___/___/_| |_|
"#
}

fn get_long_version() -> String {
    get_version_long()
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    fn exec_options(&self) -> ExecOptions {
        ExecOptions {
            on: self.on.clone(),
            foreach: self.foreach.clone(),
            privileged: self.privileged,
            parallel: self.parallel,
            pty: self.pty,
            prefix: self.prefix,
            prefix_string: self.prefix_string.clone(),
            file: self.file,
        }
    }

    fn config_scope(&self) -> Option<ConfigScope> {
        if self.config {
            Some(ConfigScope::Current)
        } else if self.user_config {
            Some(ConfigScope::User)
        } else if self.system_config {
            Some(ConfigScope::System)
        } else {
            None
        }
    }
}

/// Path `--gen` writes to: the configured one, or the data dir default
fn gen_path(workspace: &Workspace) -> Result<PathBuf> {
    if let Some(path) = workspace.ssh_config_path() {
        return Ok(path.to_path_buf());
    }
    get_data_dir()
        .map(|d| d.join("ssh_config"))
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}

/// Run the CLI and report errors
pub fn main_entry() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            output::show_error(&e);
            ExitCode::FAILURE
        }
    }
}

pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    if cli.zsh_completion || cli.bash_completion {
        let shell = if cli.zsh_completion { Shell::Zsh } else { Shell::Bash };
        commands::cmd_completion(shell, Cli::command());
        return Ok(ExitCode::SUCCESS);
    }
    if cli.aliases {
        print!("{}", commands::ALIASES);
        return Ok(ExitCode::SUCCESS);
    }

    let cwd = std::env::current_dir().context("Failed to determine working directory")?;

    if let Some(scope) = cli.config_scope() {
        commands::cmd_config_path(scope, cli.config_file.as_deref(), &cwd)?;
        return Ok(ExitCode::SUCCESS);
    }

    let sources = match &cli.config_file {
        Some(path) => vec![explicit_source(path, &cwd)],
        None => default_sources(&cwd),
    };
    let workspace = load_workspace(&sources)?;

    if cli.debug {
        for registry in workspace.registries() {
            eprintln!(
                "{} {} registry from {}",
                style("[essh debug]").dim(),
                registry.kind().as_str(),
                registry
                    .source()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }

    let ssh_config = workspace.ssh_config();

    if cli.print {
        print!("{ssh_config}");
        return Ok(ExitCode::SUCCESS);
    }

    if cli.generate {
        let path = gen_path(&workspace)?;
        essh_core::host::write_ssh_config(&path, &ssh_config)?;
        if !cli.quiet {
            eprintln!("{} {}", style("Wrote").green(), path.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let list = ListOptions {
        select: &cli.select,
        filter: &cli.filter,
        format: cli.format,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };
    if cli.hosts {
        commands::cmd_hosts(&workspace, &list)?;
        return Ok(ExitCode::SUCCESS);
    }
    if cli.tasks {
        commands::cmd_tasks(&workspace, &list)?;
        return Ok(ExitCode::SUCCESS);
    }
    if cli.tags {
        commands::cmd_tags(&workspace, &list)?;
        return Ok(ExitCode::SUCCESS);
    }

    if cli.args.is_empty() && !cli.exec {
        // No command - show a welcome message and hint to use --help
        if !cli.quiet {
            println!(
                "{} {}",
                style("essh").cyan().bold(),
                style(get_version()).dim()
            );
            println!();
            println!("Run {} for usage.", style("--help").green());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config_file = SshConfigFile::write(&ssh_config, workspace.ssh_config_path())?;
    let config_path = config_file.path();

    let rt = tokio::runtime::Runtime::new()?;
    let code = if cli.exec {
        rt.block_on(commands::cmd_exec(
            &workspace,
            config_path,
            &cli.args,
            &cli.exec_options(),
            &cwd,
            cli.debug,
        ))?
    } else if cli.shell {
        rt.block_on(commands::cmd_shell(config_path, &cli.args, cli.debug))?
    } else if cli.scp {
        rt.block_on(commands::cmd_scp(config_path, &cli.args, cli.debug))?
    } else if cli.rsync {
        rt.block_on(commands::cmd_rsync(config_path, &cli.args, cli.debug))?
    } else if let Some(task) = workspace.task(&cli.args[0], None) {
        let payload = cli.args.get(1).map(String::as_str);
        rt.block_on(commands::cmd_task(
            &workspace,
            task,
            config_path,
            payload,
            cli.debug,
        ))?
    } else {
        rt.block_on(commands::cmd_ssh(
            &workspace,
            config_path,
            &cli.args,
            cli.debug,
        ))?
    };

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn trailing_args_keep_hyphens() {
        let cli = Cli::parse_from(["essh", "--debug", "web01", "-v", "uptime"]);
        assert!(cli.debug);
        assert_eq!(cli.args, vec!["web01", "-v", "uptime"]);
    }

    #[test]
    fn listing_flags() {
        let cli = Cli::parse_from([
            "essh", "--hosts", "--select", "web", "--filter", "prod", "--format", "prettyjson",
        ]);
        assert!(cli.hosts);
        assert_eq!(cli.select, vec!["web"]);
        assert_eq!(cli.filter, vec!["prod"]);
        assert_eq!(cli.format, Some(OutputFormat::Prettyjson));
    }

    #[test]
    fn modes_conflict() {
        assert!(Cli::try_parse_from(["essh", "--scp", "--rsync", "a", "b"]).is_err());
        assert!(Cli::try_parse_from(["essh", "--shell", "--scp", "a"]).is_err());
    }

    #[test]
    fn gen_flag_maps_to_generate() {
        let cli = Cli::parse_from(["essh", "--gen"]);
        assert!(cli.generate);
    }

    #[test]
    fn exec_flags_build_options() {
        let cli = Cli::parse_from([
            "essh", "--exec", "--on", "web", "--on", "db01", "--parallel", "--prefix", "uptime",
        ]);
        assert!(cli.exec);
        let opts = cli.exec_options();
        assert_eq!(opts.on, vec!["web", "db01"]);
        assert!(opts.parallel && opts.prefix);
        assert_eq!(cli.args, vec!["uptime"]);
    }

    #[test]
    fn exec_only_flags_require_exec() {
        assert!(Cli::try_parse_from(["essh", "--on", "web", "uptime"]).is_err());
        assert!(Cli::try_parse_from(["essh", "--exec", "--on", "a", "--foreach", "b", "x"]).is_err());
        assert!(Cli::try_parse_from(["essh", "--exec", "--scp", "a", "b"]).is_err());
    }

    #[test]
    fn config_path_flags() {
        assert_eq!(
            Cli::parse_from(["essh", "--user-config"]).config_scope(),
            Some(ConfigScope::User)
        );
        assert_eq!(Cli::parse_from(["essh", "--hosts"]).config_scope(), None);
    }
}
