//! Interactive editing loop.
//!
//! Lines arrive on a channel from a stdin reader thread. Between lines the
//! loop sleeps until the generator's next debounce deadline, so typing a
//! burst of `content` commands renders once and records one history entry.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use console::style;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, trace};

use crate::export::ExportFormat;
use crate::history::Slot;
use crate::session::{Edit, Generator, Status, TickOutcome};
use crate::settings::{ErrorCorrection, Rgb, Shape};

const HELP: &str = "\
commands:
  content <text>          set the encoded text (debounced)
  shape <shape>           square, rounded, dots, diamond
  fg <#rrggbb>            foreground color
  bg <#rrggbb>            background color
  gradient on|off         diagonal gradient fill
  gradient-start <color>  gradient start color
  gradient-end <color>    gradient end color
  transparent on|off      transparent background
  logo <path>|off         embed a PNG/JPEG logo (sets error correction H)
  logo-size <5-50>        logo size in percent
  size <100-2000>         output size in pixels
  ec <L|M|Q|H>            error correction level
  save [png|svg|pdf] [path]
  history                 list saved entries
  load <id>               restore an entry
  delete <id>             delete an entry
  import <path>           merge a history file
  clear                   delete all entries
  show                    print current settings
  help                    this text
  quit                    leave";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveCommand {
    Edit(Edit),
    Logo(PathBuf),
    Save {
        format: ExportFormat,
        path: Option<PathBuf>,
    },
    History,
    Load(i64),
    Delete(i64),
    Import(PathBuf),
    Clear,
    Show,
    Help,
    Quit,
}

fn on_off(arg: &str) -> Result<bool, String> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(format!("Expected on or off, got '{arg}'")),
    }
}

fn color(arg: &str) -> Result<String, String> {
    Rgb::parse(arg).map_err(|e| e.to_string())?;
    Ok(arg.to_string())
}

fn required<'a>(word: &str, arg: &'a str, what: &str) -> Result<&'a str, String> {
    if arg.is_empty() {
        Err(format!("{word}: missing {what}"))
    } else {
        Ok(arg)
    }
}

fn number<T: std::str::FromStr>(arg: &str) -> Result<T, String> {
    arg.parse().map_err(|_| format!("Expected a number, got '{arg}'"))
}

/// Parse one input line. Blank lines parse to `None`.
pub fn parse_command(line: &str) -> Result<Option<LiveCommand>, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r),
        None => (trimmed, ""),
    };
    let arg = rest.trim();
    let need = |what: &str| required(word, arg, what);

    let cmd = match word.to_ascii_lowercase().as_str() {
        // Content keeps its whitespace; only the separator is dropped.
        "content" => LiveCommand::Edit(Edit::Content(rest.to_string())),
        "shape" => LiveCommand::Edit(Edit::Shape(need("shape")?.parse::<Shape>()?)),
        "fg" => LiveCommand::Edit(Edit::FgColor(color(need("color")?)?)),
        "bg" => LiveCommand::Edit(Edit::BgColor(color(need("color")?)?)),
        "gradient" => LiveCommand::Edit(Edit::Gradient(on_off(need("on/off")?)?)),
        "gradient-start" => LiveCommand::Edit(Edit::GradientStart(color(need("color")?)?)),
        "gradient-end" => LiveCommand::Edit(Edit::GradientEnd(color(need("color")?)?)),
        "transparent" => LiveCommand::Edit(Edit::Transparent(on_off(need("on/off")?)?)),
        "logo" => match need("path")? {
            "off" | "none" | "remove" => LiveCommand::Edit(Edit::RemoveLogo),
            path => LiveCommand::Logo(PathBuf::from(path)),
        },
        "logo-size" => LiveCommand::Edit(Edit::LogoSize(number(need("percent")?)?)),
        "size" => LiveCommand::Edit(Edit::Size(number(need("pixels")?)?)),
        "ec" => LiveCommand::Edit(Edit::ErrorCorrection(
            need("level")?.parse::<ErrorCorrection>()?,
        )),
        "save" | "export" => {
            let mut parts = arg.split_whitespace();
            match (parts.next(), parts.next()) {
                (None, _) => LiveCommand::Save {
                    format: ExportFormat::Png,
                    path: None,
                },
                (Some(first), second) => match first.parse::<ExportFormat>() {
                    Ok(format) => LiveCommand::Save {
                        format,
                        path: second.map(PathBuf::from),
                    },
                    Err(_) => {
                        let path = PathBuf::from(first);
                        let format = ExportFormat::from_path(&path).map_err(|e| e.to_string())?;
                        LiveCommand::Save {
                            format,
                            path: Some(path),
                        }
                    }
                },
            }
        }
        "history" | "ls" => LiveCommand::History,
        "load" => LiveCommand::Load(number(need("id")?)?),
        "delete" | "rm" => LiveCommand::Delete(number(need("id")?)?),
        "import" => LiveCommand::Import(PathBuf::from(need("path")?)),
        "clear" => LiveCommand::Clear,
        "show" => LiveCommand::Show,
        "help" | "?" => LiveCommand::Help,
        "quit" | "exit" | "q" => LiveCommand::Quit,
        other => return Err(format!("Unknown command '{other}' (try help)")),
    };
    Ok(Some(cmd))
}

/// Forward stdin lines to a channel until EOF.
pub fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
        trace!("live: stdin closed");
    });
    rx
}

fn write_notices<S: Slot, W: Write>(generator: &mut Generator<S>, out: &mut W) -> io::Result<()> {
    for notice in generator.take_notices() {
        let mark = if notice.is_error() {
            style("✗").red()
        } else {
            style("✓").green()
        };
        writeln!(out, "{mark} {}", notice.message)?;
    }
    Ok(())
}

fn write_status<S: Slot, W: Write>(generator: &Generator<S>, out: &mut W) -> io::Result<()> {
    match (generator.status(), generator.rendered()) {
        (Status::Ready, Some(rendered)) => writeln!(
            out,
            "{} {}x{} modules, {}px",
            style("ready").cyan(),
            rendered.layout().modules,
            rendered.layout().modules,
            rendered.size()
        ),
        (Status::Failed(reason), _) => writeln!(out, "{} {reason}", style("failed").red()),
        _ => Ok(()),
    }
}

fn write_outcome<S: Slot, W: Write>(
    generator: &Generator<S>,
    outcome: TickOutcome,
    out: &mut W,
) -> io::Result<()> {
    if outcome.rendered {
        write_status(generator, out)?;
    }
    if let Some(id) = outcome.saved {
        writeln!(out, "{} {id}", style("saved").dim())?;
    }
    Ok(())
}

fn write_settings<S: Slot, W: Write>(generator: &Generator<S>, out: &mut W) -> io::Result<()> {
    let s = generator.settings();
    writeln!(out, "type         {}", s.kind)?;
    writeln!(out, "content      {}", s.content)?;
    writeln!(out, "shape        {}", s.shape)?;
    writeln!(out, "fg           {}", s.fg_color)?;
    writeln!(out, "bg           {}", s.bg_color)?;
    writeln!(
        out,
        "gradient     {} ({} -> {})",
        if s.gradient { "on" } else { "off" },
        s.gradient_start,
        s.gradient_end
    )?;
    writeln!(
        out,
        "transparent  {}",
        if s.transparent { "on" } else { "off" }
    )?;
    match generator.logo_data_url() {
        Some(_) => writeln!(out, "logo         {}%", s.logo_size)?,
        None => writeln!(out, "logo         off")?,
    }
    writeln!(out, "size         {}px", s.size)?;
    writeln!(out, "ec           {}", s.error_correction)
}

/// Apply one command. Returns `false` on quit.
fn handle<S: Slot, W: Write>(
    generator: &mut Generator<S>,
    command: LiveCommand,
    out: &mut W,
) -> io::Result<bool> {
    let now = Instant::now();
    match command {
        LiveCommand::Edit(edit) => {
            let immediate = !matches!(edit, Edit::Content(_));
            generator.apply(edit, now);
            if immediate {
                write_status(generator, out)?;
            }
        }
        LiveCommand::Logo(path) => match crate::commands::load_logo(&path) {
            Ok(url) => {
                generator.apply(Edit::Logo(url), now);
                write_status(generator, out)?;
            }
            Err(e) => writeln!(out, "{} {}", style("✗").red(), e.message)?,
        },
        LiveCommand::Save { format, path } => {
            // A pending content edit must land before exporting.
            let outcome = generator.flush();
            write_outcome(generator, outcome, out)?;
            let path = path.unwrap_or_else(|| PathBuf::from(format.default_filename()));
            if generator.export_to(format, &path).is_ok() {
                writeln!(out, "{}", path.display())?;
            }
        }
        LiveCommand::History => {
            let items = generator.history_items();
            if items.is_empty() {
                writeln!(out, "{}", style("No history yet").dim())?;
            }
            for item in items {
                writeln!(
                    out,
                    "{}  {:<5}  {}",
                    style(item.id).cyan(),
                    item.settings.kind,
                    item.content.lines().next().unwrap_or_default()
                )?;
            }
        }
        LiveCommand::Load(id) => {
            if generator.load_from_history(id) {
                write_status(generator, out)?;
            }
        }
        LiveCommand::Delete(id) => {
            if generator.delete_history_item(id) {
                writeln!(out, "{} Deleted entry {id}", style("✓").green())?;
            } else {
                writeln!(out, "{} No history entry with id {id}", style("✗").red())?;
            }
        }
        LiveCommand::Import(path) => match std::fs::read_to_string(&path) {
            Ok(text) => {
                generator.import_history(&text);
            }
            Err(e) => writeln!(
                out,
                "{} Failed to read {}: {e}",
                style("✗").red(),
                path.display()
            )?,
        },
        LiveCommand::Clear => generator.clear_history(),
        LiveCommand::Show => write_settings(generator, out)?,
        LiveCommand::Help => writeln!(out, "{HELP}")?,
        LiveCommand::Quit => return Ok(false),
    }
    Ok(true)
}

/// Drive `generator` from `lines` until quit or the channel closes.
///
/// Pending debounced work is flushed before returning.
pub fn run_live<S: Slot, W: Write>(
    generator: &mut Generator<S>,
    lines: &Receiver<String>,
    out: &mut W,
) -> io::Result<()> {
    generator.render_now();
    write_status(generator, out)?;
    write_notices(generator, out)?;

    loop {
        let next = match generator.next_deadline() {
            Some(deadline) => lines.recv_deadline(deadline),
            None => lines.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match next {
            Ok(line) => match parse_command(&line) {
                Ok(Some(command)) => {
                    debug!(?command, "live: command");
                    if !handle(generator, command, out)? {
                        break;
                    }
                }
                Ok(None) => {}
                Err(message) => writeln!(out, "{} {message}", style("✗").red())?,
            },
            Err(RecvTimeoutError::Timeout) => {
                let outcome = generator.tick(Instant::now());
                write_outcome(generator, outcome, out)?;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
        write_notices(generator, out)?;
        out.flush()?;
    }

    let outcome = generator.flush();
    write_outcome(generator, outcome, out)?;
    write_notices(generator, out)?;
    Ok(())
}
