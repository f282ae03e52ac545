//! Clap derive structures for the `lumen` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// lumen -- control and watch the lights of a networked authority
#[derive(Debug, Parser)]
#[command(
    name = "lumen",
    version,
    about = "Control and watch networked lights from the command line",
    long_about = "Keeps a local view of an authority's lights in sync.\n\n\
        Commands go over HTTP; state changes arrive over the authority's\n\
        update stream and are applied in arrival order.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Authority profile to use
    #[arg(long, short = 'p', env = "LUMEN_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Authority base URL (overrides profile)
    #[arg(long, short = 'a', env = "LUMEN_AUTHORITY", global = true)]
    pub authority: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "LUMEN_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "LUMEN_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "LUMEN_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and control lights
    #[command(alias = "l")]
    Lights(LightsArgs),

    /// Follow the update stream and re-render on every change
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Lights ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LightsArgs {
    #[command(subcommand)]
    pub command: LightsCommand,
}

/// Group and light identifiers as the authority reports them.
#[derive(Debug, Args)]
pub struct LightTarget {
    /// Group ID
    pub group: String,

    /// Light ID within the group
    pub light: String,
}

#[derive(Debug, Subcommand)]
pub enum LightsCommand {
    /// List all lights in authority order
    #[command(alias = "ls")]
    List,

    /// Show one light
    Get(LightTarget),

    /// Turn a light on
    On(LightTarget),

    /// Turn a light off
    Off(LightTarget),

    /// Set a light's brightness
    #[command(alias = "bri")]
    Brightness {
        #[command(flatten)]
        target: LightTarget,

        /// Brightness value, passed through to the authority unchanged
        #[arg(allow_negative_numbers = true)]
        value: i32,
    },

    /// Register a new light (prompts for a name when omitted)
    Add {
        /// Display name for the new light
        name: Option<String>,
    },

    /// Remove a light
    #[command(alias = "rm")]
    Remove(LightTarget),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Print stream lifecycle events (open/close/error) to stderr
    #[arg(long)]
    pub events: bool,

    /// Do not re-open the stream after an abnormal close
    #[arg(long)]
    pub no_reconnect: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Display the current configuration
    Show,

    /// Print the config file location
    Path,

    /// Set a value on the active profile
    Set {
        /// Profile key (authority, ca_cert, insecure, timeout, stream, reconnect, refresh_interval)
        key: String,

        /// New value
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
