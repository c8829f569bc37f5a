//! Implementations of the `bpsr` subcommands.
//!
//! Each `run_*` function is the whole behavior of one subcommand minus
//! argument parsing, so tests can drive them directly against temp files.
//! Machine output (JSONL, JSON) goes to the requested file and, where the
//! original tooling did so, to stdout; human chatter goes through `tracing`
//! on stderr.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bpsr_core::{
    CombatDecoder, CombatReducer, ItemCatalog, ItemResolver, METHOD_SYNC_TO_ME_DELTA_INFO,
    consolidate, extract_listings,
};
use bpsr_proto::FrameReader;
use serde_json::{Value, json};

use crate::error::CliError;

/// Size cap for binary capture inputs (100 MiB).
const CAPTURE_SIZE_CAP: u64 = 100 * 1024 * 1024;
/// Size cap for decoded JSONL inputs (50 MiB).
const DECODED_SIZE_CAP: u64 = 50 * 1024 * 1024;

/// Extensions expected for binary captures.
const CAPTURE_EXTENSIONS: [&str; 3] = ["bin", "dat", "raw"];
/// Extensions expected for decoded JSONL input.
const DECODED_EXTENSIONS: [&str; 2] = ["jsonl", "json"];

/// Decode combat packets from a capture into JSONL, plus a stats report.
pub fn run_decode(
    capture: &Path,
    output: &Path,
    stats_out: Option<&Path>,
) -> Result<(), CliError> {
    let raw = read_input(capture, CAPTURE_SIZE_CAP, &CAPTURE_EXTENSIONS)?;

    let decoder = CombatDecoder::new();
    let mut reader = FrameReader::new();
    let mut method_histogram: BTreeMap<u32, u64> = BTreeMap::new();

    create_parent_dirs(output)?;
    let file = fs::File::create(output).map_err(|source| CliError::Io {
        context: format!("failed to create {}", output.display()),
        source,
    })?;
    let mut sink = io::BufWriter::new(file);

    for frame in reader.iter_notify_frames(&raw) {
        let Some(record) = decoder.decode(&frame) else {
            continue;
        };
        *method_histogram.entry(frame.method_id).or_default() += 1;
        let line = record.to_json_line()?;
        write_line(&mut sink, &line, output)?;
    }
    sink.flush().map_err(|source| CliError::Io {
        context: format!("failed to write {}", output.display()),
        source,
    })?;

    let stats = reader.stats();
    let report = json!({
        "bytes_scanned": stats.bytes_scanned,
        "frames_parsed": stats.frames_parsed,
        "notify_frames": stats.notify_frames,
        "resync_events": stats.resync_events,
        "zstd_flag_without_magic": stats.zstd_flag_without_magic,
        "method_histogram": method_histogram
            .iter()
            .map(|(method_id, count)| (format!("0x{method_id:08x}"), Value::from(*count)))
            .collect::<serde_json::Map<String, Value>>(),
        "sync_to_me_delta_info":
            method_histogram.get(&METHOD_SYNC_TO_ME_DELTA_INFO).copied().unwrap_or(0),
    });
    let rendered = serde_json::to_string_pretty(&report)?;

    match stats_out {
        Some(path) => {
            create_parent_dirs(path)?;
            write_text(path, &format!("{rendered}\n"))?;
        },
        None => emit_stdout(&rendered)?,
    }
    Ok(())
}

/// Reduce decoded combat JSONL into a DPS summary.
pub fn run_dps(decoded: &Path, output: &Path) -> Result<(), CliError> {
    let raw = read_input(decoded, DECODED_SIZE_CAP, &DECODED_EXTENSIONS)?;
    let text = String::from_utf8_lossy(&raw);

    let mut reducer = CombatReducer::new();
    reducer.process_lines(text.lines())?;
    let summary = reducer.summary();

    let rendered = serde_json::to_string_pretty(&summary)?;
    create_parent_dirs(output)?;
    write_text(output, &format!("{rendered}\n"))?;
    emit_stdout(&rendered)?;
    Ok(())
}

/// Extract, consolidate, and write trading-center listings.
pub fn run_trade_decode(
    capture: &Path,
    output: &Path,
    no_item_names: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let raw = read_input(capture, CAPTURE_SIZE_CAP, &CAPTURE_EXTENSIONS)?;

    let listings = extract_listings(&raw);
    if listings.is_empty() {
        return Err(CliError::NoListings);
    }

    let catalog = if no_item_names {
        None
    } else {
        let catalog = ItemCatalog::from_sources(ItemCatalog::default_sources());
        if catalog.is_empty() {
            if !quiet {
                tracing::warn!("item name mapping not found; output will include item ids only");
            }
            None
        } else {
            Some(catalog)
        }
    };
    let resolver = catalog.as_ref().map(|catalog| catalog as &dyn ItemResolver);

    let consolidated = consolidate(&listings, resolver);
    let rendered = serde_json::to_string_pretty(&consolidated)?;
    create_parent_dirs(output)?;
    write_text(output, &format!("{rendered}\n"))?;

    if !quiet {
        tracing::info!(
            listings = listings.len(),
            unique = consolidated.len(),
            output = %output.display(),
            "trade decode complete"
        );
    }
    Ok(())
}

/// Rebuild the item id → name mapping from data dumps.
pub fn run_update_items(
    sources: &[PathBuf],
    output: &Path,
    indent: usize,
    quiet: bool,
) -> Result<(), CliError> {
    let roots =
        if sources.is_empty() { ItemCatalog::default_source_roots() } else { sources.to_vec() };

    let candidates = ItemCatalog::discover_sources(&roots);
    if candidates.is_empty() {
        return Err(CliError::NoSources);
    }
    if !quiet {
        tracing::info!(candidates = candidates.len(), "discovered item table sources");
    }

    let catalog = ItemCatalog::from_sources(candidates);
    if catalog.is_empty() {
        return Err(CliError::EmptyMapping);
    }
    if !quiet {
        tracing::info!(entries = catalog.len(), "compiled item mapping");
    }

    let rendered = catalog.to_mapping_json(indent)?;
    create_parent_dirs(output)?;
    write_text(output, &rendered)?;
    if !quiet {
        tracing::info!(output = %output.display(), "wrote item mapping");
    }
    Ok(())
}

/// Validate and read an input file under a size cap.
///
/// Unexpected extensions warn but do not fail; captures come from all sorts
/// of tooling.
fn read_input(path: &Path, cap: u64, extensions: &[&str]) -> Result<Vec<u8>, CliError> {
    if !path.is_file() {
        return Err(CliError::InputNotFound(path.to_path_buf()));
    }

    let metadata = fs::metadata(path).map_err(|source| CliError::Io {
        context: format!("failed to stat {}", path.display()),
        source,
    })?;
    if metadata.len() > cap {
        return Err(CliError::InputTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            cap,
        });
    }

    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if !extensions.contains(&extension.as_str()) {
        tracing::warn!(
            path = %path.display(),
            "unexpected extension {extension:?} for this command"
        );
    }

    fs::read(path).map_err(|source| CliError::Io {
        context: format!("failed to read {}", path.display()),
        source,
    })
}

fn create_parent_dirs(path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| CliError::Io {
                context: format!("failed to create {}", parent.display()),
                source,
            })?;
        }
    }
    Ok(())
}

fn write_text(path: &Path, contents: &str) -> Result<(), CliError> {
    fs::write(path, contents).map_err(|source| CliError::Io {
        context: format!("failed to write {}", path.display()),
        source,
    })
}

fn write_line(sink: &mut impl Write, line: &str, path: &Path) -> Result<(), CliError> {
    let io_context = |source| CliError::Io {
        context: format!("failed to write {}", path.display()),
        source,
    };
    sink.write_all(line.as_bytes()).map_err(io_context)?;
    sink.write_all(b"\n").map_err(io_context)
}

/// Write machine output to stdout (kept separate from the stderr logs).
fn emit_stdout(contents: &str) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{contents}").map_err(|source| CliError::Io {
        context: "failed to write stdout".to_owned(),
        source,
    })
}
