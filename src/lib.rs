//! qrgo: styled QR code generator.
//!
//! The library is split the way the tool works:
//!
//! - [`payload`] turns a content type and its fields into payload text
//! - [`settings`] holds the visual settings snapshot
//! - [`render`] draws the code over the `qrcode` matrix
//! - [`export`] writes PNG, SVG and PDF artifacts
//! - [`history`] persists past generations
//! - [`session`] is the debounced editing controller behind `qrgo live`
//!
//! The command-line surface lives here as well so integration tests can parse
//! arguments without spawning the binary.

pub mod commands;
pub mod config;
pub mod export;
pub mod history;
pub mod live;
pub mod payload;
pub mod render;
pub mod session;
pub mod settings;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::config::ConfigError;
use crate::export::{ExportError, ExportFormat};
use crate::history::HistoryError;
use crate::payload::{PayloadFields, PayloadKind};
use crate::render::RenderError;
use crate::settings::{ErrorCorrection, SettingsOverrides, Shape};

/// QRgo - styled QR code generator
///
/// Build payloads for links, Wi-Fi, email, contacts, SMS and calendar events,
/// render them with custom shapes, colors and logos, and keep a local history.
#[derive(Debug, Parser)]
#[command(
    name = "qrgo",
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to configuration file
    #[arg(long, global = true, env = "QRGO_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Directory holding the history file
    #[arg(long, global = true, env = "QRGO_DATA_DIR", value_hint = ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the payload text for a content type
    Payload {
        /// Content type (url, wifi, email, vcard, sms, event)
        kind: PayloadKind,

        #[command(flatten)]
        fields: PayloadArgs,
    },

    /// Render a code and write it to a file
    Generate {
        /// Content type (url, wifi, email, vcard, sms, event)
        kind: PayloadKind,

        #[command(flatten)]
        fields: PayloadArgs,

        #[command(flatten)]
        style: StyleArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Don't record this generation in history
        #[arg(long)]
        no_history: bool,
    },

    /// Inspect and manage generation history
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },

    /// Interactive editing session reading commands from stdin
    Live {
        #[command(flatten)]
        style: StyleArgs,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List entries, newest first
    List {
        /// Show at most this many entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one entry with its settings
    Show { id: i64 },
    /// Delete one entry
    Delete { id: i64 },
    /// Delete all entries
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
    /// Write history to a JSON file (default: qr-history-<date>.json)
    Export {
        #[arg(value_hint = ValueHint::AnyPath)]
        path: Option<PathBuf>,
    },
    /// Merge a JSON history file into the local history
    Import {
        #[arg(value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
    /// Re-render an entry with its saved settings
    Render {
        id: i64,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
}

/// Payload field flags; each content type reads only its own.
#[derive(Debug, Clone, Default, Args)]
pub struct PayloadArgs {
    /// Link target (url)
    #[arg(long, help_heading = "Payload")]
    pub url: Option<String>,
    /// Network name (wifi)
    #[arg(long, help_heading = "Payload")]
    pub ssid: Option<String>,
    /// Network password (wifi)
    #[arg(long, help_heading = "Payload")]
    pub password: Option<String>,
    /// Security mode: WPA, WEP or nopass (wifi)
    #[arg(long, help_heading = "Payload")]
    pub security: Option<String>,
    /// Network is hidden (wifi)
    #[arg(long, help_heading = "Payload")]
    pub hidden: bool,
    /// Recipient address (email)
    #[arg(long, help_heading = "Payload")]
    pub to: Option<String>,
    /// Subject line (email)
    #[arg(long, help_heading = "Payload")]
    pub subject: Option<String>,
    /// Message body (email)
    #[arg(long, help_heading = "Payload")]
    pub body: Option<String>,
    /// Full name (vcard)
    #[arg(long, help_heading = "Payload")]
    pub name: Option<String>,
    /// Organization (vcard)
    #[arg(long, alias = "org", help_heading = "Payload")]
    pub organization: Option<String>,
    /// Phone number (vcard, sms)
    #[arg(long, help_heading = "Payload")]
    pub phone: Option<String>,
    /// Email address (vcard)
    #[arg(long, help_heading = "Payload")]
    pub email: Option<String>,
    /// Website (vcard)
    #[arg(long, help_heading = "Payload")]
    pub website: Option<String>,
    /// Message text (sms)
    #[arg(long, help_heading = "Payload")]
    pub message: Option<String>,
    /// Event title (event)
    #[arg(long, help_heading = "Payload")]
    pub title: Option<String>,
    /// Event location (event)
    #[arg(long, help_heading = "Payload")]
    pub location: Option<String>,
    /// Start, e.g. 2024-05-01T10:00 (event)
    #[arg(long, help_heading = "Payload")]
    pub start: Option<String>,
    /// End, e.g. 2024-05-01T11:00 (event)
    #[arg(long, help_heading = "Payload")]
    pub end: Option<String>,
    /// Event description (event)
    #[arg(long, help_heading = "Payload")]
    pub description: Option<String>,
}

impl From<PayloadArgs> for PayloadFields {
    fn from(args: PayloadArgs) -> Self {
        Self {
            url: args.url,
            ssid: args.ssid,
            password: args.password,
            security: args.security,
            hidden: args.hidden,
            to: args.to,
            subject: args.subject,
            body: args.body,
            name: args.name,
            organization: args.organization,
            phone: args.phone,
            email: args.email,
            website: args.website,
            message: args.message,
            title: args.title,
            location: args.location,
            start: args.start,
            end: args.end,
            description: args.description,
        }
    }
}

/// Visual style flags.
#[derive(Debug, Clone, Default, Args)]
pub struct StyleArgs {
    /// Module shape
    #[arg(long, help_heading = "Style")]
    pub shape: Option<Shape>,
    /// Foreground color (#rrggbb)
    #[arg(long = "fg", help_heading = "Style")]
    pub fg_color: Option<String>,
    /// Background color (#rrggbb)
    #[arg(long = "bg", help_heading = "Style")]
    pub bg_color: Option<String>,
    /// Fill modules with a diagonal gradient
    #[arg(long, help_heading = "Style")]
    pub gradient: bool,
    /// Gradient start color
    #[arg(long, help_heading = "Style")]
    pub gradient_start: Option<String>,
    /// Gradient end color
    #[arg(long, help_heading = "Style")]
    pub gradient_end: Option<String>,
    /// Transparent background
    #[arg(long, help_heading = "Style")]
    pub transparent: bool,
    /// Image to embed in the center (forces error correction H)
    #[arg(long, value_hint = ValueHint::FilePath, help_heading = "Style")]
    pub logo: Option<PathBuf>,
    /// Logo size in percent of the code
    #[arg(long, help_heading = "Style")]
    pub logo_size: Option<u32>,
    /// Output size in pixels
    #[arg(long, help_heading = "Style")]
    pub size: Option<u32>,
    /// Error correction level (L, M, Q, H)
    #[arg(long = "ec", help_heading = "Style")]
    pub error_correction: Option<ErrorCorrection>,
}

impl StyleArgs {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            kind: None,
            shape: self.shape,
            fg_color: self.fg_color.clone(),
            bg_color: self.bg_color.clone(),
            gradient: self.gradient.then_some(true),
            gradient_start: self.gradient_start.clone(),
            gradient_end: self.gradient_end.clone(),
            transparent: self.transparent.then_some(true),
            logo_size: self.logo_size,
            size: self.size,
            error_correction: self.error_correction,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct OutputArgs {
    /// Output file (default: qrcode.<format>)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
    /// Output format; inferred from the output extension when omitted
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,
}

/// Error surfaced to the user with an exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    pub code: i32,
    pub kind: &'static str,
    pub message: String,
    pub hint: Option<String>,
    pub retryable: bool,
}

impl CliError {
    pub fn new(code: i32, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            kind,
            message: message.into(),
            hint: None,
            retryable: false,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(2, "usage", message)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// JSON form printed in `--json` mode.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.code,
                "kind": self.kind,
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
            }
        })
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        let mut out = Self::new(1, "error", format!("{err:#}"));
        if err.downcast_ref::<std::io::Error>().is_some() {
            out.code = 3;
            out.kind = "io";
            out.retryable = true;
        }
        out
    }
}

impl From<HistoryError> for CliError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::Io(_) => {
                let mut out = Self::new(3, "io", err.to_string());
                out.retryable = true;
                out
            }
            HistoryError::MalformedImport(_)
            | HistoryError::NotAnArray
            | HistoryError::InvalidItem { .. } => Self::new(5, "import", err.to_string())
                .with_hint("Import files are JSON arrays written by `qrgo history export`."),
            HistoryError::Serialize(_) => Self::new(1, "history", err.to_string()),
        }
    }
}

impl From<RenderError> for CliError {
    fn from(err: RenderError) -> Self {
        if let RenderError::Settings(e) = &err {
            return Self::new(5, "validation", e.to_string());
        }
        let hint = match &err {
            RenderError::Encode(_) => {
                Some("Shorten the content or lower the error correction level.")
            }
            RenderError::CanvasTooSmall { .. } => {
                Some("Increase --size or shorten the content so each module gets a pixel.")
            }
            RenderError::InvalidLogo(_) => Some("Logos must be PNG or JPEG images."),
            _ => None,
        };
        let out = Self::new(4, "render", err.to_string());
        match hint {
            Some(h) => out.with_hint(h),
            None => out,
        }
    }
}

impl From<ExportError> for CliError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Render(e) => e.into(),
            ExportError::UnknownFormat(_) => Self::usage(err.to_string()),
            ExportError::Write { .. } => {
                let mut out = Self::new(3, "io", err.to_string());
                out.retryable = true;
                out
            }
            ExportError::NothingRendered | ExportError::Compress(_) => {
                Self::new(4, "render", err.to_string())
            }
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::new(2, "config", err.to_string())
    }
}

/// Parsed command line, ready to run.
#[derive(Debug)]
pub struct ParsedCli {
    pub cli: Cli,
}

/// Parse arguments. Help and version requests print and exit directly.
pub fn parse_cli<I, T>(args: I) -> Result<ParsedCli, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(ParsedCli { cli }),
        Err(e) => match e.kind() {
            clap::error::ErrorKind::DisplayHelp
            | clap::error::ErrorKind::DisplayVersion
            | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => e.exit(),
            _ => Err(CliError::usage(e.to_string().trim_end())),
        },
    }
}

/// Install the global tracing subscriber on stderr.
///
/// `RUST_LOG` wins over the verbosity flags when set.
pub fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 if cli.quiet => EnvFilter::new("error"),
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(cli.verbose >= 2),
        )
        .try_init();
}

/// Run a parsed command line.
pub fn run_with_parsed(parsed: ParsedCli) -> Result<(), CliError> {
    commands::dispatch(parsed.cli)
}
