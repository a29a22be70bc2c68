use std::fs;
use std::io::{self, Write};

use anyhow::Context;
use colored::Colorize;
use filetree::{decode_payload, Cell, FileTree, Payload, TreeEntry, TreeOptions};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Init(args) => cmd_init(args),
        Command::Info(args) => cmd_info(args),
        Command::Get(args) => cmd_get(args),
        Command::Insert(args) => cmd_insert(args),
        Command::Ls(args) => cmd_ls(args),
    }
}

fn cmd_init(args: InitArgs) -> anyhow::Result<()> {
    let options = TreeOptions {
        leaf_depth: args.leaf_depth,
        tree_depth: args.tree_depth,
        has_metadata: !args.no_metadata,
        ..TreeOptions::new(args.format)
    };
    let tree = FileTree::create(&args.root, options)?;
    let config = tree.config();
    println!(
        "{} Initialized {} store in {}",
        "✓".green().bold(),
        config.file_format.to_string().cyan(),
        args.root.display().to_string().bold()
    );
    println!("  Records per leaf: {}", config.leaf_capacity());
    println!("  Tree depth: {}", config.tree_depth);
    println!(
        "  Metadata: {}",
        if config.has_metadata {
            "kept".green()
        } else {
            "disabled".yellow()
        }
    );
    Ok(())
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let tree = FileTree::open_readonly(&args.root)?;
    let config = tree.config();
    println!("Store {}", args.root.display().to_string().bold());
    println!(
        "  Records: {}  Format: {} ({})",
        config.file_count.to_string().bold(),
        config.file_format.to_string().cyan(),
        if config.file_format.is_binary() {
            "binary"
        } else {
            "text"
        }
    );
    println!(
        "  Tree depth: {}  Leaf depth: {} ({} records per leaf)",
        config.tree_depth,
        config.leaf_depth,
        config.leaf_capacity()
    );
    println!(
        "  Metadata: {}",
        if config.has_metadata {
            "kept".green()
        } else {
            "disabled".yellow()
        }
    );
    Ok(())
}

fn cmd_get(args: GetArgs) -> anyhow::Result<()> {
    let tree = FileTree::open_readonly(&args.root)?;
    if args.raw {
        let (data, _) = tree.paths(args.index)?;
        let bytes = fs::read(&data).with_context(|| format!("reading {}", data.display()))?;
        io::stdout().write_all(&bytes)?;
        return Ok(());
    }
    let record = tree.get(args.index)?;
    if args.metadata {
        match record.metadata() {
            Some(map) => println!("{}", serde_json::to_string_pretty(map)?),
            None => println!("{}", "no metadata".dimmed()),
        }
        return Ok(());
    }
    println!("{}", render_payload(record.payload())?);
    Ok(())
}

fn cmd_insert(args: InsertArgs) -> anyhow::Result<()> {
    let tree = FileTree::open(&args.root)?;
    let file_format = tree.config().file_format;
    let mut records = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let payload = decode_payload(file_format, &bytes)
            .with_context(|| format!("{} is not valid {file_format} data", path.display()))?;
        records.push(TreeEntry::new(payload));
    }
    let range = tree.insert(&records)?;
    println!(
        "{} Inserted {} record(s) at {}..{}",
        "✓".green().bold(),
        (range.end - range.start).to_string().bold(),
        range.start.to_string().yellow(),
        range.end.to_string().yellow()
    );
    Ok(())
}

fn cmd_ls(args: LsArgs) -> anyhow::Result<()> {
    let tree = FileTree::open_readonly(&args.root)?;
    let slice = tree.slice(args.start, args.stop, args.step)?;
    let indices: Vec<i64> = slice.indices().collect();
    if indices.is_empty() {
        println!("{}", "no records in range".dimmed());
        return Ok(());
    }
    for index in indices {
        let (data, _) = tree.paths(index)?;
        println!("{:>8}  {}", index.to_string().yellow(), data.display());
    }
    Ok(())
}

/// JSON view of a payload for terminal output. Tables become an object
/// with `columns` and row arrays; blobs print their length only (use
/// `--raw` for the bytes themselves).
fn render_payload(payload: &Payload) -> anyhow::Result<String> {
    let value = match payload {
        Payload::Map(map) => serde_json::to_value(map)?,
        Payload::Table(table) => serde_json::json!({
            "columns": table.columns(),
            "rows": table
                .rows()
                .iter()
                .map(|row| row.iter().map(cell_value).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
        }),
        Payload::Bytes(bytes) => serde_json::json!({ "bytes": bytes.len() }),
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

fn cell_value(cell: &Cell) -> serde_json::Value {
    match cell {
        Cell::Null => serde_json::Value::Null,
        Cell::Bool(value) => serde_json::json!(value),
        Cell::Int(value) => serde_json::json!(value),
        Cell::Float(value) => serde_json::json!(value),
        Cell::Text(value) => serde_json::json!(value),
    }
}
