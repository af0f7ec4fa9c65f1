//! nif - command line tool for inspecting and checking NIF files.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;

use nifcore::schema::{registry, DisplayHint};
use nifcore::util::{init_logging, version_to_string, Verbosity};
use nifcore::value::ValueKind;
use nifcore::{Document, ItemId, Schema, Settings};

/// Environment variable naming the schema file when `--schema` is not given.
const SCHEMA_ENV: &str = "NIF_SCHEMA";

/// Global options parsed ahead of the command.
#[derive(Default)]
struct Options {
    verbosity: Verbosity,
    schema: Option<PathBuf>,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut opts = Options::default();
    let mut rest: Vec<&str> = Vec::new();
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => opts.verbosity = Verbosity::Debug,
            "-vv" | "--trace" => opts.verbosity = Verbosity::Trace,
            "-q" | "--quiet" => opts.verbosity = Verbosity::Quiet,
            "-s" | "--schema" => match iter.next() {
                Some(p) => opts.schema = Some(PathBuf::from(p)),
                None => {
                    eprintln!("Error: --schema needs a file argument");
                    std::process::exit(1);
                }
            },
            _ => rest.push(arg),
        }
    }
    let _guard = init_logging(opts.verbosity);

    if rest.is_empty() {
        print_help();
        return;
    }

    let result = match rest[0] {
        "info" | "i" => with_file(&rest, "info <file.nif>", |f| cmd_info(&opts, f)),
        "tree" | "t" => with_file(&rest, "tree <file.nif> [block]", |f| cmd_tree(&opts, f, rest.get(2).copied())),
        "blocks" | "b" => with_file(&rest, "blocks <file.nif>", |f| cmd_blocks(&opts, f)),
        "check" | "k" => {
            if rest.len() < 2 {
                usage("check <file.nif>...")
            } else {
                cmd_check(&opts, &rest[1..])
            }
        }
        "copy" | "c" => {
            if rest.len() < 3 {
                usage("copy <input.nif> <output.nif>")
            } else {
                cmd_copy(&opts, rest[1], rest[2])
            }
        }
        "schema" | "s" => cmd_schema(&opts, rest.get(1).copied()),
        "version" => {
            println!("nif {} ({})", env!("CARGO_PKG_VERSION"), nifcore::BUILD_STAMP);
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        // Default: if file exists, show info; otherwise error
        other => {
            if Path::new(other).exists() {
                cmd_info(&opts, other)
            } else {
                eprintln!("Unknown command: {other}");
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn usage(text: &str) -> Result<()> {
    bail!("missing arguments\nUsage: nif {text}")
}

fn with_file(args: &[&str], text: &str, f: impl FnOnce(&str) -> Result<()>) -> Result<()> {
    match args.get(1) {
        Some(file) => f(file),
        None => usage(text),
    }
}

fn print_help() {
    println!("nif - NetImmerse/Gamebryo file toolkit");
    println!();
    println!("USAGE:");
    println!("    nif [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <file>              Show header summary and block type counts");
    println!("    t, tree   <file> [block]      Show field tree of every block (or one)");
    println!("    b, blocks <file>              List blocks with their names and links");
    println!("    k, check  <files...>          Load and re-save files in parallel, compare bytes");
    println!("    c, copy   <in> <out>          Load and save (header and footer are rebuilt)");
    println!("    s, schema [block]             List schema blocks, or the fields of one");
    println!("    version                       Show version and build stamp");
    println!("    h, help                       Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -s, --schema <file>  Schema description (JSON); else settings or ${SCHEMA_ENV}");
    println!("    -v, --verbose        Show debug output");
    println!("    -vv, --trace         Show trace output (very verbose)");
    println!("    -q, --quiet          Errors only");
    println!();
    println!("EXAMPLES:");
    println!("    nif -s nif.json info scene.nif");
    println!("    nif -s nif.json tree scene.nif 3");
    println!("    nif -s nif.json check meshes/*.nif");
    println!();
    println!("NOTES:");
    println!("    - Passing a .nif file directly is equivalent to 'info'");
    println!("    - NIF_LOG overrides the log filter, e.g. NIF_LOG=nifcore=trace");
}

fn load_schema(opts: &Options, settings: &Settings) -> Result<Arc<Schema>> {
    if let Some(s) = registry::current() {
        return Ok(s);
    }
    let path = opts
        .schema
        .clone()
        .or_else(|| settings.schema_path.clone())
        .or_else(|| env::var_os(SCHEMA_ENV).map(PathBuf::from))
        .context("no schema description; pass --schema <file.json>")?;
    let schema = Schema::from_path(&path)
        .with_context(|| format!("loading schema {}", path.display()))?;
    tracing::debug!(
        "schema {}: {} blocks, {} precedence warnings",
        path.display(),
        schema.block_names().count(),
        schema.precedence_warnings().len()
    );
    Ok(registry::install(schema))
}

fn open(opts: &Options, path: &str) -> Result<Document> {
    let settings = Settings::load();
    let schema = load_schema(opts, &settings)?;
    let mut doc = Document::new(schema, &settings);
    let start = Instant::now();
    doc.open(path).with_context(|| format!("reading {path}"))?;
    tracing::debug!("{path} loaded in {:.1?}", start.elapsed());
    Ok(doc)
}

fn cmd_info(opts: &Options, path: &str) -> Result<()> {
    let doc = open(opts, path)?;
    let header = doc.header();

    println!("File:    {path}");
    println!("Header:  {}", doc.header_string());
    println!("Version: {} (0x{:08X})", doc.version_string(), doc.version());
    if let Some(uv) = doc.try_get::<u32>(header, "User Version") {
        println!("User version: {uv}");
    }
    if let Some(uv2) = doc.try_get::<u32>(header, "User Version 2") {
        println!("User version 2: {uv2}");
    }
    println!("Blocks:  {}", doc.block_count());
    println!("Roots:   {:?}", doc.root_links());
    println!();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for n in 0..doc.block_count() {
        if let Some(b) = doc.block_item(n) {
            *counts.entry(doc.name_of(b)).or_default() += 1;
        }
    }
    println!("Block types ({}):", counts.len());
    for (name, count) in counts {
        println!("  {count:>5}  {name}");
    }
    Ok(())
}

fn cmd_blocks(opts: &Options, path: &str) -> Result<()> {
    let doc = open(opts, path)?;
    for n in 0..doc.block_count() {
        let Some(b) = doc.block_item(n) else { continue };
        let name = doc.get_string_at(b, "Name");
        let label = if name.is_empty() { String::new() } else { format!(" \"{name}\"") };
        let kids = doc.child_links(n);
        if kids.is_empty() {
            println!("[{n}] {}{label}", doc.name_of(b));
        } else {
            println!("[{n}] {}{label} -> {kids:?}", doc.name_of(b));
        }
    }
    Ok(())
}

/// Text shown for a leaf: enum option names, resolved strings, plain values.
fn display_value(doc: &Document, id: ItemId) -> String {
    let Some(value) = doc.value(id) else { return String::new() };
    let schema = doc.schema();
    let type_name = doc.type_name_of(id);
    match schema.display_hint(type_name) {
        DisplayHint::Enum => {
            let v = value.to_count();
            schema.enum_option(type_name, v).unwrap_or_else(|| v.to_string())
        }
        DisplayHint::BitFlags => format!("0x{:04x}", value.to_count()),
        DisplayHint::Plain if value.kind() == ValueKind::StringIndex => {
            format!("{:?}", doc.get_string(id))
        }
        DisplayHint::Plain if value.kind() == ValueKind::Blob => {
            format!("<{} bytes>", value.as_bytes().map_or(0, <[u8]>::len))
        }
        DisplayHint::Plain => value.to_string(),
    }
}

fn print_item(doc: &Document, id: ItemId, depth: usize) {
    for &c in doc.tree().children(id) {
        if !doc.condition(c) {
            continue;
        }
        let indent = "  ".repeat(depth);
        let kids = doc.tree().child_count(c);
        if kids > 0 || doc.is_array(c) {
            println!("{indent}{} [{kids}]", doc.name_of(c));
            print_item(doc, c, depth + 1);
        } else {
            println!("{indent}{}: {}", doc.name_of(c), display_value(doc, c));
        }
    }
}

fn cmd_tree(opts: &Options, path: &str, block: Option<&str>) -> Result<()> {
    let doc = open(opts, path)?;
    let only = match block {
        Some(b) => Some(b.parse::<usize>().with_context(|| format!("bad block number {b:?}"))?),
        None => None,
    };

    if only.is_none() {
        println!("NiHeader");
        print_item(&doc, doc.header(), 1);
    }
    for n in 0..doc.block_count() {
        if only.is_some_and(|o| o != n) {
            continue;
        }
        let Some(b) = doc.block_item(n) else { continue };
        println!("[{n}] {}", doc.name_of(b));
        print_item(&doc, b, 1);
    }
    if only.is_none() {
        println!("NiFooter");
        print_item(&doc, doc.footer(), 1);
    }
    Ok(())
}

/// Outcome of checking one file.
enum Check {
    Same,
    Differs { at: usize },
    Failed(String),
}

fn check_file(schema: &Arc<Schema>, settings: &Settings, path: &Path) -> Check {
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(e) => return Check::Failed(e.to_string()),
    };
    let mut doc = Document::new(Arc::clone(schema), settings);
    if let Err(e) = doc.load(&data) {
        return Check::Failed(e.to_string());
    }
    match doc.save_to_vec() {
        Ok(out) if out == data => Check::Same,
        Ok(out) => {
            let at = out.iter().zip(&data).position(|(a, b)| a != b).unwrap_or(out.len().min(data.len()));
            Check::Differs { at }
        }
        Err(e) => Check::Failed(e.to_string()),
    }
}

fn cmd_check(opts: &Options, files: &[&str]) -> Result<()> {
    let settings = Settings::load();
    let schema = load_schema(opts, &settings)?;
    let start = Instant::now();

    let results: Vec<(String, Check)> = files
        .par_iter()
        .map(|f| (f.to_string(), check_file(&schema, &settings, Path::new(f))))
        .collect();

    let (mut same, mut differs, mut failed) = (0, 0, 0);
    for (file, r) in &results {
        match r {
            Check::Same => {
                same += 1;
                tracing::debug!("{file}: ok");
            }
            Check::Differs { at } => {
                differs += 1;
                println!("{file}: re-saved bytes differ at offset 0x{at:x}");
            }
            Check::Failed(e) => {
                failed += 1;
                println!("{file}: {e}");
            }
        }
    }
    println!(
        "{} files in {:.1?}: {same} identical, {differs} differ, {failed} failed",
        results.len(),
        start.elapsed()
    );
    if failed > 0 {
        bail!("{failed} file(s) failed to load");
    }
    Ok(())
}

fn cmd_copy(opts: &Options, input: &str, output: &str) -> Result<()> {
    let mut doc = open(opts, input)?;
    doc.save_path(output).with_context(|| format!("writing {output}"))?;
    println!("{input} -> {output}: {} blocks, version {}", doc.block_count(), version_to_string(doc.version()));
    Ok(())
}

fn cmd_schema(opts: &Options, block: Option<&str>) -> Result<()> {
    let settings = Settings::load();
    let schema = load_schema(opts, &settings)?;

    let Some(name) = block else {
        let versions: Vec<String> = schema.versions().iter().map(|v| version_to_string(*v)).collect();
        println!("Versions: {}", versions.join(", "));
        for b in schema.block_names() {
            let abstract_mark = if schema.block(b).is_some_and(|d| d.is_abstract) { " (abstract)" } else { "" };
            println!("  {b}{abstract_mark}");
        }
        for w in schema.precedence_warnings() {
            println!("warning: {}: {:?} reads as {}", w.location, w.text, w.leftmost);
        }
        return Ok(());
    };

    let Some(def) = schema.block(name) else { bail!("no block type {name:?}") };
    if !def.ancestors.is_empty() {
        println!("{name} : {}", def.ancestors.join(", "));
    } else {
        println!("{name}");
    }
    for f in &def.fields {
        let mut extra = Vec::new();
        if !f.arr1.is_empty() {
            extra.push(format!("arr1={}", f.arr1));
        }
        if !f.arr2.is_empty() {
            extra.push(format!("arr2={}", f.arr2));
        }
        if !f.cond.is_empty() {
            extra.push(format!("cond={}", f.cond));
        }
        if f.ver1 != 0 || f.ver2 != 0 {
            extra.push(format!("ver={}..{}", version_to_string(f.ver1), version_to_string(f.ver2)));
        }
        println!("  {}: {} {}", f.name, f.type_name, extra.join(" "));
    }
    Ok(())
}
