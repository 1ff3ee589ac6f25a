use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tracing::{debug, warn};
use xlmeta_codec::{decode_envelope, JournalReader};
use xlmeta_types::{resolve_index, JournalEntry, ENVELOPE_VERSION};

use crate::cli::*;

pub fn run_command(cli: &Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    match &cli.command {
        Command::Inspect(args) => cmd_inspect(args, cli.format, out),
        Command::Entry(args) => cmd_entry(args, cli.format, out),
        Command::Verify(args) => cmd_verify(args, cli.format, out),
    }
}

fn read_record(path: &Path) -> anyhow::Result<Vec<u8>> {
    let buf = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    debug!(path = %path.display(), bytes = buf.len(), "loaded record");
    Ok(buf)
}

fn mod_time_text(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

/// One-line summary: index, kind, version id, parts, size, mod time.
fn entry_line(index: usize, entry: &JournalEntry) -> String {
    let kind = match entry {
        JournalEntry::Object(_) => "object".green(),
        JournalEntry::DeleteMarker(_) => "delete".red(),
        JournalEntry::Link(_) => "link".cyan(),
    };
    let detail = match entry.payload() {
        Some(obj) => format!("{} parts, {} bytes", obj.part_count(), obj.size),
        None => "-".to_string(),
    };
    format!(
        "[{index}] {kind:<6} {}  {detail}  {}",
        entry.version_id().to_string().yellow(),
        mod_time_text(entry.mod_time()).dimmed()
    )
}

fn cmd_inspect(args: &InspectArgs, format: OutputFormat, out: &mut dyn Write) -> anyhow::Result<()> {
    let buf = read_record(&args.file)?;
    let env = decode_envelope(&buf).with_context(|| format!("decoding {}", args.file.display()))?;

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &env)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            writeln!(out, "Version: {}", env.version.to_string().bold())?;
            writeln!(out, "Format: {:?}", env.format)?;
            writeln!(out, "Journal: {} entries ({} bytes)", env.len(), buf.len())?;
            for (i, entry) in env.journal().iter().enumerate() {
                writeln!(out, "  {}", entry_line(i, entry))?;
            }
        }
    }
    Ok(())
}

fn cmd_entry(args: &EntryArgs, format: OutputFormat, out: &mut dyn Write) -> anyhow::Result<()> {
    let buf = read_record(&args.file)?;
    let reader = JournalReader::new(&buf)
        .with_context(|| format!("reading journal header of {}", args.file.display()))?;
    let mut dst = JournalEntry::default();
    let entry = reader.entry_at(args.index, &mut dst)?;
    // entry_at succeeded, so the index resolves.
    let resolved = resolve_index(args.index, reader.len()).unwrap_or_default();

    match format {
        OutputFormat::Json => {
            let doc = json!({
                "index": args.index,
                "resolved": resolved,
                "entries": reader.len(),
                "entry": entry,
            });
            serde_json::to_writer_pretty(&mut *out, &doc)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            writeln!(out, "{}", entry_line(resolved, entry))?;
            if let Some(obj) = entry.payload() {
                let ec = &obj.erasure;
                writeln!(
                    out,
                    "  erasure: {}+{} block {} index {}",
                    ec.data_blocks, ec.parity_blocks, ec.block_size, ec.index
                )?;
                writeln!(out, "  data dir: {}", obj.data_dir)?;
                for (number, size) in obj.parts() {
                    writeln!(out, "  part {number}: {size} bytes")?;
                }
                for (key, value) in &obj.meta_user {
                    writeln!(out, "  {}: {}", key.bold(), value.values().join(", "))?;
                }
            }
        }
    }
    Ok(())
}

fn cmd_verify(args: &VerifyArgs, format: OutputFormat, out: &mut dyn Write) -> anyhow::Result<()> {
    let buf = read_record(&args.file)?;
    let env = decode_envelope(&buf).with_context(|| format!("decoding {}", args.file.display()))?;

    for (i, entry) in env.journal().iter().enumerate() {
        entry
            .validate()
            .with_context(|| format!("journal entry {i} is invalid"))?;
    }

    // Random access must agree with the full decode.
    let reader = JournalReader::new(&buf)?;
    let mut dst = JournalEntry::default();
    for (i, expected) in env.journal().iter().enumerate() {
        let got = reader.entry_at(i as i64, &mut dst)?;
        if got != expected {
            bail!("journal entry {i} differs between full and random-access decode");
        }
    }

    if env.version > ENVELOPE_VERSION {
        warn!(version = env.version, "record written by a newer format version");
    }

    match format {
        OutputFormat::Json => {
            let doc = json!({
                "ok": true,
                "version": env.version,
                "entries": env.len(),
                "bytes": buf.len(),
            });
            serde_json::to_writer_pretty(&mut *out, &doc)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            writeln!(
                out,
                "{} {} entries verified",
                "✓".green().bold(),
                env.len()
            )?;
        }
    }
    Ok(())
}
