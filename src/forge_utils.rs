//! Forge utility functions
//!
//! Helpers behind the `forge-browse` command line: inspecting location
//! index files, decoding standalone record dumps and converting compiled
//! textures to DDS.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    cursor::{ByteCursor, RECORD_HEADER_LEN},
    decoder::{registry, texture::decode_texture, DecodeOptions, DecodedNode, Decoder},
    utils::{collect_files, create_glob_matcher, format_size, matches_filter, output_path_for},
    LocationIndex, RecordId, ResourceCache, TypeCode,
};

/// Print the type dispatch table
pub fn list_types() {
    for entry in registry::REGISTRY {
        println!("{}  {}", entry.code, entry.name);
    }
    println!();
    println!("Total: {} record types", registry::REGISTRY.len());
}

/// Show a summary of a location index file
pub fn show_index_info(path: &Path) -> Result<()> {
    let index = load_index(path)?;
    let size = fs::metadata(path)?.len();

    println!("Location index: {}", path.display());
    println!("File size: {}", format_size(size));
    println!("Entries: {}", index.len());
    println!();

    println!("Archives:");
    for archive in index.archives() {
        println!("  {:<40} {:>8} records", archive, index.len_in(archive));
    }
    Ok(())
}

/// Look up comma-separated hex IDs in a location index file
pub fn lookup_ids(path: &Path, ids: &str, archive: Option<&str>) -> Result<()> {
    let index = load_index(path)?;
    let ids = RecordId::parse_list(ids).context("Invalid record ID list")?;
    if ids.is_empty() {
        bail!("No record IDs given");
    }

    for id in ids {
        match index.lookup(id, archive) {
            Some(location) => println!(
                "{}  {}  datafile {}",
                id, location.archive, location.datafile
            ),
            None => println!("{}  not found", id),
        }
    }
    Ok(())
}

fn load_index(path: &Path) -> Result<LocationIndex> {
    if !path.is_file() {
        bail!("Location index not found: {}", path.display());
    }
    let mut index = LocationIndex::new();
    index
        .load(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(index)
}

/// Decode a standalone record dump (header included) and print it
///
/// References are never followed: there are no archives to resolve them in.
pub fn decode_record_file(path: &Path, json: bool, options: DecodeOptions) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut cache = ResourceCache::new(0);
    let options = DecodeOptions {
        follow_references: false,
        ..options
    };
    let record = Decoder::new(&mut cache, options)
        .decode_bytes(&data, &name)
        .with_context(|| format!("Failed to decode {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!(
        "{}  {}  {}  {}",
        record.id, record.type_code, record.resource_type, record.name
    );
    print_outline(&record.node, 1);
    if record.trailing > 0 {
        println!("({} trailing bytes not decoded)", record.trailing);
    }
    Ok(())
}

fn print_outline(node: &DecodedNode, depth: usize) {
    let indent = "  ".repeat(depth);
    for reference in node.references() {
        println!("{}-> {}", indent, reference.id);
    }
    for nested in node.nested() {
        println!(
            "{}{}  {}  {}",
            indent,
            nested.id,
            nested.type_code,
            registry::label(nested.type_code)
        );
        print_outline(&nested.node, depth + 1);
    }
}

/// Convert one compiled texture record dump to a DDS file
pub fn convert_texture(input: &Path, output: Option<&Path>) -> Result<()> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("dds"));
    let size = convert_texture_file(input, &output)?;
    println!(
        "Wrote {} ({})",
        output.display(),
        format_size(size as u64)
    );
    Ok(())
}

fn convert_texture_file(input: &Path, output: &Path) -> Result<usize> {
    let data = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let header = ByteCursor::new(&data).read_header()?;
    if header.type_code != TypeCode::TEXTURE {
        bail!(
            "{} is a {} record, not a compiled texture",
            input.display(),
            header.type_code
        );
    }
    let dds = decode_texture(&data[RECORD_HEADER_LEN..])?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, &dds)?;
    Ok(dds.len())
}

/// Convert every texture record dump under `input_dir`, in parallel
pub fn convert_textures(input_dir: &Path, output_dir: &Path, filter: Option<&str>) -> Result<()> {
    let matcher = filter.map(create_glob_matcher).transpose()?;
    let files: Vec<_> = collect_files(input_dir)?
        .into_iter()
        .filter(|f| matches_filter(f, input_dir, matcher.as_ref()))
        .collect();

    if files.is_empty() {
        println!("No files match the filter");
        return Ok(());
    }

    println!("Converting {} files...", files.len());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
    )?);

    let written = AtomicU64::new(0);
    let failed = AtomicU64::new(0);

    files.par_iter().for_each(|input| {
        let output = output_path_for(input, input_dir, output_dir, "dds");
        match convert_texture_file(input, &output) {
            Ok(size) => {
                written.fetch_add(size as u64, Ordering::Relaxed);
            }
            Err(e) => {
                pb.println(format!("Error converting {}: {:#}", input.display(), e));
                failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        pb.inc(1);
    });

    pb.finish_with_message("Done");

    let failed = failed.into_inner();
    println!();
    println!(
        "Converted: {} files ({})",
        files.len() as u64 - failed,
        format_size(written.into_inner())
    );
    if failed > 0 {
        println!("Failed: {} files", failed);
    }
    Ok(())
}
