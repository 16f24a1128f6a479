//! Clap derive structures for the `fritzbox` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. This file
//! is also compiled by `build.rs`, so it may only depend on clap.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fritzbox -- control FRITZ!Box smart home devices
#[derive(Debug, Parser)]
#[command(
    name = "fritzbox",
    version,
    about = "Control FRITZ!Box home automation devices from the command line",
    long_about = "Switch FRITZ!DECT sockets, read power and energy meters, and manage\n\
        thermostat setpoints through the FRITZ!Box home automation interface.",
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
    /// Gateway URL (overrides config file)
    #[arg(long, short = 'u', env = "FRITZBOX_URL", global = true)]
    pub url: Option<String>,

    /// Login user name (may be empty for password-only logins)
    #[arg(long, short = 'U', env = "FRITZBOX_USERNAME", global = true)]
    pub username: Option<String>,

    /// Login password (prompted for when not configured)
    #[arg(long, env = "FRITZBOX_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FRITZBOX_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "FRITZBOX_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "FRITZBOX_TIMEOUT", global = true)]
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
    /// Log in and print the session id
    Login,

    /// List and control smart home devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Inspect the CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List all devices
    #[command(alias = "ls")]
    List,

    /// Show a single device
    Get {
        /// Device AIN (spaces are ignored)
        ain: String,
    },

    /// Switch a socket or thermostat on
    On {
        /// Device AIN (spaces are ignored)
        ain: String,
    },

    /// Switch a socket or thermostat off
    Off {
        /// Device AIN (spaces are ignored)
        ain: String,
    },

    /// Toggle a socket
    Toggle {
        /// Device AIN (spaces are ignored)
        ain: String,
    },

    /// Current power draw in milliwatts
    Power {
        /// Device AIN (spaces are ignored)
        ain: String,
    },

    /// Energy consumed in watt hours
    Energy {
        /// Device AIN (spaces are ignored)
        ain: String,
    },

    /// Measured temperature in degrees Celsius
    #[command(alias = "temp")]
    Temperature {
        /// Device AIN (spaces are ignored)
        ain: String,
    },

    /// Thermostat setpoint in degrees Celsius
    Target {
        /// Device AIN (spaces are ignored)
        ain: String,
    },

    /// Set the thermostat setpoint (8 to 28 degrees, half-degree steps)
    SetTarget {
        /// Device AIN (spaces are ignored)
        ain: String,

        /// Setpoint in degrees Celsius
        degrees: f64,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the resolved configuration (password redacted)
    Show,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
