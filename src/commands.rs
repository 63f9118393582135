//! Subcommand handlers.

use std::io::Write;
use std::path::{Path, PathBuf};

use console::style;
use serde_json::json;
use tracing::{debug, info};

use crate::config::Config;
use crate::export::{ExportFormat, export_to_file, history_export_filename_today};
use crate::history::{FileSlot, HistoryItem, HistoryStore, parse_import};
use crate::payload::{PayloadKind, build_payload};
use crate::render::{Rendered, encode_data_url, render_settings};
use crate::settings::{ErrorCorrection, Settings};
use crate::session::Generator;
use crate::{
    Cli, CliError, Commands, ConfigCommand, HistoryCommand, OutputArgs, PayloadArgs, StyleArgs,
};

/// Column width for content previews in listings.
const PREVIEW_CHARS: usize = 48;

/// Shared state for one invocation.
struct Context {
    config: Config,
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    json: bool,
    quiet: bool,
}

impl Context {
    fn store(&self) -> Result<HistoryStore<FileSlot>, CliError> {
        let dir = self.config.resolve_data_dir(self.data_dir.as_deref())?;
        debug!(dir = %dir.display(), "history: using data dir");
        Ok(HistoryStore::open(&dir))
    }

    fn status(&self, line: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            println!("{line}");
        }
    }
}

pub(crate) fn dispatch(cli: Cli) -> Result<(), CliError> {
    let Some(command) = cli.command else {
        return Err(CliError::usage("No command given").with_hint("Run `qrgo --help`."));
    };
    let loaded = Config::load(cli.config.as_deref())?;
    let ctx = Context {
        config: loaded,
        config_path: cli.config,
        data_dir: cli.data_dir,
        json: cli.json,
        quiet: cli.quiet,
    };

    match command {
        Commands::Payload { kind, fields } => payload(&ctx, kind, fields),
        Commands::Generate {
            kind,
            fields,
            style,
            output,
            no_history,
        } => generate(&ctx, kind, fields, &style, &output, no_history),
        Commands::History { action } => history(&ctx, action),
        Commands::Live { style } => live(&ctx, &style),
        Commands::Config { action } => config(&ctx, action),
    }
}

fn payload(ctx: &Context, kind: PayloadKind, fields: PayloadArgs) -> Result<(), CliError> {
    let text = build_payload(kind, &fields.into());
    if ctx.json {
        println!("{}", json!({ "type": kind, "payload": text }));
    } else {
        println!("{text}");
    }
    Ok(())
}

/// Read an image file into a `data:` URL, rejecting non-image files.
pub(crate) fn load_logo(path: &Path) -> Result<String, CliError> {
    let bytes = std::fs::read(path).map_err(|e| {
        let mut err = CliError::new(3, "io", format!("Failed to read {}: {e}", path.display()));
        err.retryable = true;
        err
    })?;
    let mime = match image::guess_format(&bytes) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        _ => {
            return Err(CliError::new(
                5,
                "validation",
                format!("{} is not a PNG or JPEG image", path.display()),
            ));
        }
    };
    Ok(encode_data_url(mime, &bytes))
}

/// Built-in defaults, then `[defaults]` from config, then CLI flags.
fn effective_settings(ctx: &Context, style: &StyleArgs) -> Settings {
    let mut settings = ctx.config.initial_settings();
    settings.apply(&style.overrides());
    settings
}

fn resolve_output(output: &OutputArgs) -> Result<(ExportFormat, PathBuf), CliError> {
    Ok(match (output.format, &output.output) {
        (Some(format), Some(path)) => (format, path.clone()),
        (None, Some(path)) => (ExportFormat::from_path(path)?, path.clone()),
        (Some(format), None) => (format, PathBuf::from(format.default_filename())),
        (None, None) => (
            ExportFormat::Png,
            PathBuf::from(ExportFormat::Png.default_filename()),
        ),
    })
}

fn write_rendered(
    ctx: &Context,
    rendered: &Rendered,
    output: &OutputArgs,
) -> Result<(ExportFormat, PathBuf), CliError> {
    let (format, path) = resolve_output(output)?;
    export_to_file(rendered, format, &path)?;
    ctx.status(format!(
        "{} {} exported to {}",
        style("✓").green(),
        format.extension().to_uppercase(),
        style(path.display()).bold()
    ));
    Ok((format, path))
}

fn generate(
    ctx: &Context,
    kind: PayloadKind,
    fields: PayloadArgs,
    style_args: &StyleArgs,
    output: &OutputArgs,
    no_history: bool,
) -> Result<(), CliError> {
    let mut settings = effective_settings(ctx, style_args);
    settings.kind = kind;
    settings.content = build_payload(kind, &fields.into());

    let logo = style_args.logo.as_deref().map(load_logo).transpose()?;
    if logo.is_some() {
        settings.error_correction = ErrorCorrection::H;
    }

    let rendered = render_settings(&settings, logo.as_deref())?;
    let (format, path) = write_rendered(ctx, &rendered, output)?;

    let id = if no_history {
        None
    } else {
        let id = ctx.store()?.append(HistoryItem::capture(&settings, logo))?;
        info!(id, "history: recorded generation");
        Some(id)
    };

    if ctx.json {
        println!(
            "{}",
            json!({
                "path": path,
                "format": format.extension(),
                "content": settings.content,
                "modules": rendered.layout().modules,
                "history_id": id,
            })
        );
    }
    Ok(())
}

fn history(ctx: &Context, action: HistoryCommand) -> Result<(), CliError> {
    let store = ctx.store()?;
    match action {
        HistoryCommand::List { limit } => {
            let mut items = store.list()?;
            if let Some(limit) = limit {
                items.truncate(limit);
            }
            if ctx.json {
                let rows: Vec<_> = items
                    .iter()
                    .map(|i| {
                        json!({
                            "id": i.id,
                            "timestamp": i.timestamp,
                            "type": i.settings.kind,
                            "content": i.content,
                            "has_logo": i.logo_data_url.is_some(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::Value::Array(rows));
                return Ok(());
            }
            if items.is_empty() {
                ctx.status(style("No history yet").dim());
                return Ok(());
            }
            for item in &items {
                let when = item
                    .timestamp
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M");
                println!(
                    "{:>14}  {}  {:<6}  {}",
                    style(item.id).cyan(),
                    when,
                    item.settings.kind.label(),
                    preview(&item.content)
                );
            }
        }
        HistoryCommand::Show { id } => {
            let item = store.get(id)?.ok_or_else(|| not_found(id))?;
            if ctx.json {
                println!(
                    "{}",
                    serde_json::to_string(&item).map_err(anyhow::Error::from)?
                );
            } else {
                print_item(&item);
            }
        }
        HistoryCommand::Delete { id } => {
            if !store.delete(id)? {
                return Err(not_found(id));
            }
            if ctx.json {
                println!("{}", json!({ "deleted": id }));
            }
            ctx.status(format!("{} Deleted entry {id}", style("✓").green()));
        }
        HistoryCommand::Clear { yes } => {
            if !yes {
                return Err(CliError::usage("Refusing to clear history without confirmation")
                    .with_hint("Re-run with --yes."));
            }
            store.clear()?;
            if ctx.json {
                println!("{}", json!({ "cleared": true }));
            }
            ctx.status(format!("{} History cleared", style("✓").green()));
        }
        HistoryCommand::Export { path } => {
            let path = match path {
                Some(p) if p.is_dir() => p.join(history_export_filename_today()),
                Some(p) => p,
                None => PathBuf::from(history_export_filename_today()),
            };
            let text = store.export_json()?;
            std::fs::write(&path, text).map_err(|e| {
                anyhow::Error::from(e).context(format!("writing {}", path.display()))
            })?;
            if ctx.json {
                println!("{}", json!({ "path": path, "entries": store.len()? }));
            }
            ctx.status(format!(
                "{} History exported to {}",
                style("✓").green(),
                style(path.display()).bold()
            ));
        }
        HistoryCommand::Import { path } => {
            let text = std::fs::read_to_string(&path).map_err(|e| {
                anyhow::Error::from(e).context(format!("reading {}", path.display()))
            })?;
            let incoming = parse_import(&text)?;
            let offered = incoming.len();
            let total = store.import_merge(incoming)?;
            if ctx.json {
                println!("{}", json!({ "imported": offered, "entries": total }));
            }
            ctx.status(format!(
                "{} History imported ({total} entries)",
                style("✓").green()
            ));
        }
        HistoryCommand::Render { id, output } => {
            let item = store.get(id)?.ok_or_else(|| not_found(id))?;
            let rendered = render_settings(&item.settings, item.logo_data_url.as_deref())?;
            let (format, path) = write_rendered(ctx, &rendered, &output)?;
            if ctx.json {
                println!(
                    "{}",
                    json!({ "id": id, "path": path, "format": format.extension() })
                );
            }
        }
    }
    Ok(())
}

fn not_found(id: i64) -> CliError {
    CliError::new(1, "not_found", format!("No history entry with id {id}"))
        .with_hint("Run `qrgo history list` to see available ids.")
}

fn preview(content: &str) -> String {
    let flat = content.replace(['\n', '\r'], " ");
    if flat.chars().count() > PREVIEW_CHARS {
        let head: String = flat.chars().take(PREVIEW_CHARS - 1).collect();
        format!("{head}…")
    } else {
        flat
    }
}

fn print_item(item: &HistoryItem) {
    let s = &item.settings;
    println!("{}", style(format!("Entry {}", item.id)).bold().underlined());
    println!("  created     {}", item.timestamp.with_timezone(&chrono::Local));
    println!("  type        {}", s.kind.label());
    println!("  shape       {}", s.shape.label());
    if s.gradient {
        println!("  colors      {} → {}", s.gradient_start, s.gradient_end);
    } else {
        println!("  foreground  {}", s.fg_color);
    }
    if s.transparent {
        println!("  background  transparent");
    } else {
        println!("  background  {}", s.bg_color);
    }
    println!("  size        {}px", s.size);
    println!("  ec level    {}", s.error_correction);
    if item.logo_data_url.is_some() {
        println!("  logo        {}%", s.logo_size);
    }
    println!();
    println!("{}", item.content);
}

fn live(ctx: &Context, style_args: &StyleArgs) -> Result<(), CliError> {
    let settings = effective_settings(ctx, style_args);
    debug!(?settings, "live: starting");
    let mut generator = Generator::new(settings, ctx.store()?, ctx.config.live);
    if let Some(path) = &style_args.logo {
        let url = load_logo(path)?;
        generator.apply(crate::session::Edit::Logo(url), std::time::Instant::now());
    }

    let lines = crate::live::spawn_stdin_reader();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    crate::live::run_live(&mut generator, &lines, &mut out)
        .map_err(|e| anyhow::Error::from(e).context("live session output"))?;
    out.flush().map_err(anyhow::Error::from)?;
    Ok(())
}

fn config(ctx: &Context, action: ConfigCommand) -> Result<(), CliError> {
    match action {
        ConfigCommand::Path => {
            let path = ctx.config_path.clone().or_else(Config::default_path);
            match (path, ctx.json) {
                (Some(p), true) => {
                    let exists = p.exists();
                    println!("{}", json!({ "path": p, "exists": exists }));
                }
                (Some(p), false) => println!("{}", p.display()),
                (None, _) => {
                    return Err(CliError::new(
                        2,
                        "config",
                        "Could not determine a config directory",
                    ));
                }
            }
        }
        ConfigCommand::Show => {
            let data_dir = ctx.config.resolve_data_dir(ctx.data_dir.as_deref()).ok();
            if ctx.json {
                println!(
                    "{}",
                    json!({
                        "config": ctx.config,
                        "data_dir": data_dir,
                        "settings": ctx.config.initial_settings(),
                    })
                );
            } else {
                print!("{}", ctx.config.to_toml()?);
                if let Some(dir) = data_dir {
                    println!("# history: {}", FileSlot::in_dir(&dir).path().display());
                }
            }
        }
    }
    Ok(())
}
