//! Per-format payload codecs.
//!
//! Every store fixes one [`FileFormat`] at creation; the format decides
//! which [`Payload`] kinds the store accepts, how they are laid out in the
//! data file, and the file's extension. Formats that cannot represent a
//! payload kind reject it with [`TreeError::UnsupportedPayload`] instead
//! of guessing a lossy encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};
use crate::value::{Cell, Map, Payload, Table};

/// Compression level for the columnar layout.
const ZSTD_LEVEL: i32 = 3;

/// Serialization format for record payloads.
///
/// The lowercase name doubles as the data-file extension and as the value
/// persisted in the store config. There is deliberately no `Default`:
/// creating a store requires an explicit choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Row-major binary table layout.
    Rows,
    /// Column-major binary table layout, zstd-compressed.
    Columnar,
    /// Comma-separated text, header line first, one line per row.
    Csv,
    /// Pretty-printed JSON object.
    Json,
    /// TOML document.
    Toml,
    /// Opaque binary serialization of any payload kind.
    Bincode,
}

impl FileFormat {
    pub const ALL: [FileFormat; 6] = [
        FileFormat::Rows,
        FileFormat::Columnar,
        FileFormat::Csv,
        FileFormat::Json,
        FileFormat::Toml,
        FileFormat::Bincode,
    ];

    /// Data-file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Rows => "rows",
            FileFormat::Columnar => "columnar",
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
            FileFormat::Toml => "toml",
            FileFormat::Bincode => "bincode",
        }
    }

    /// Look a format up by its data-file extension.
    pub fn from_extension(extension: &str) -> Option<FileFormat> {
        FileFormat::ALL
            .into_iter()
            .find(|format| format.extension() == extension)
    }

    /// Whether data files hold raw bytes rather than UTF-8 text.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            FileFormat::Rows | FileFormat::Columnar | FileFormat::Bincode
        )
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self> {
        FileFormat::from_extension(s).ok_or_else(|| {
            TreeError::InvalidConfig(format!(
                "unknown file format {s:?}, expected one of: rows, columnar, csv, json, toml, bincode"
            ))
        })
    }
}

/// Wire shape for [`FileFormat::Bincode`] frames.
///
/// Mapping values are not bincode-friendly (their JSON model needs a
/// self-describing deserializer), so maps travel as JSON bytes inside the
/// frame. Variant order must match [`BinWireRef`].
#[derive(Deserialize)]
enum BinWire {
    Table(Table),
    MapJson(Vec<u8>),
    Bytes(Vec<u8>),
}

/// Borrowing twin of [`BinWire`] for the encode path.
#[derive(Serialize)]
enum BinWireRef<'a> {
    Table(&'a Table),
    MapJson(Vec<u8>),
    Bytes(&'a [u8]),
}

/// Wire shape for [`FileFormat::Columnar`] frames, before compression.
#[derive(Serialize, Deserialize)]
struct ColumnarWire {
    columns: Vec<String>,
    values: Vec<Vec<Cell>>,
}

/// Serialize a payload in the given format.
pub fn encode_payload(format: FileFormat, payload: &Payload) -> Result<Vec<u8>> {
    match (format, payload) {
        (FileFormat::Rows, Payload::Table(table)) => {
            bincode::serialize(table).map_err(|e| TreeError::Serialization(e.to_string()))
        }
        (FileFormat::Columnar, Payload::Table(table)) => {
            let wire = ColumnarWire {
                columns: table.columns().to_vec(),
                values: table.to_columns(),
            };
            let raw =
                bincode::serialize(&wire).map_err(|e| TreeError::Serialization(e.to_string()))?;
            zstd::encode_all(raw.as_slice(), ZSTD_LEVEL)
                .map_err(|e| TreeError::Serialization(e.to_string()))
        }
        (FileFormat::Csv, Payload::Table(table)) => csv::encode(table).map(String::into_bytes),
        (FileFormat::Json, Payload::Map(map)) => serde_json::to_vec_pretty(map)
            .map_err(|e| TreeError::Serialization(e.to_string())),
        (FileFormat::Toml, Payload::Map(map)) => toml::to_string_pretty(map)
            .map(String::into_bytes)
            .map_err(|e| TreeError::Serialization(e.to_string())),
        (FileFormat::Bincode, payload) => {
            let wire = match payload {
                Payload::Table(table) => BinWireRef::Table(table),
                Payload::Map(map) => BinWireRef::MapJson(
                    serde_json::to_vec(map).map_err(|e| TreeError::Serialization(e.to_string()))?,
                ),
                Payload::Bytes(bytes) => BinWireRef::Bytes(bytes),
            };
            bincode::serialize(&wire).map_err(|e| TreeError::Serialization(e.to_string()))
        }
        (format, payload) => Err(TreeError::UnsupportedPayload {
            format,
            payload: payload.kind(),
        }),
    }
}

/// Deserialize a payload written by [`encode_payload`] in the same format.
pub fn decode_payload(format: FileFormat, bytes: &[u8]) -> Result<Payload> {
    match format {
        FileFormat::Rows => {
            let table: Table =
                bincode::deserialize(bytes).map_err(|e| TreeError::Serialization(e.to_string()))?;
            Ok(Payload::Table(table))
        }
        FileFormat::Columnar => {
            let raw =
                zstd::decode_all(bytes).map_err(|e| TreeError::Serialization(e.to_string()))?;
            let wire: ColumnarWire = bincode::deserialize(&raw)
                .map_err(|e| TreeError::Serialization(e.to_string()))?;
            Ok(Payload::Table(Table::from_columns(wire.columns, wire.values)?))
        }
        FileFormat::Csv => Ok(Payload::Table(csv::decode(text_of(bytes)?)?)),
        FileFormat::Json => {
            let map: Map = serde_json::from_slice(bytes)
                .map_err(|e| TreeError::Serialization(e.to_string()))?;
            Ok(Payload::Map(map))
        }
        FileFormat::Toml => {
            let map: Map = toml::from_str(text_of(bytes)?)
                .map_err(|e| TreeError::Serialization(e.to_string()))?;
            Ok(Payload::Map(map))
        }
        FileFormat::Bincode => {
            let wire: BinWire =
                bincode::deserialize(bytes).map_err(|e| TreeError::Serialization(e.to_string()))?;
            match wire {
                BinWire::Table(table) => Ok(Payload::Table(table)),
                BinWire::MapJson(raw) => {
                    let map: Map = serde_json::from_slice(&raw)
                        .map_err(|e| TreeError::Serialization(e.to_string()))?;
                    Ok(Payload::Map(map))
                }
                BinWire::Bytes(bytes) => Ok(Payload::Bytes(bytes)),
            }
        }
    }
}

fn text_of(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| TreeError::Serialization(e.to_string()))
}

/// Comma-separated text layout.
///
/// Written so that a decode of our own output rebuilds the exact cell
/// values: text is always quoted (embedded quotes doubled), floats carry
/// their full precision, and nulls are empty fields. Unquoted fields are
/// typed on read as null, bool, integer, float, then text, in that order.
mod csv {
    use super::*;

    pub(super) fn encode(table: &Table) -> Result<String> {
        if table.num_columns() == 0 {
            return Err(TreeError::ShapeMismatch(
                "csv needs at least one column".into(),
            ));
        }
        let mut out = String::new();
        for (i, column) in table.columns().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            push_quoted(&mut out, column);
        }
        out.push('\n');
        for row in table.rows() {
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                push_cell(&mut out, cell);
            }
            out.push('\n');
        }
        Ok(out)
    }

    pub(super) fn decode(text: &str) -> Result<Table> {
        let mut records = parse_records(text);
        if records.is_empty() {
            return Err(TreeError::Serialization("csv data has no header row".into()));
        }
        let columns: Vec<String> = records
            .remove(0)
            .into_iter()
            .map(|(raw, _)| raw)
            .collect();
        let rows: Vec<Vec<Cell>> = records
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .map(|(raw, quoted)| to_cell(raw, quoted))
                    .collect()
            })
            .collect();
        Table::new(columns, rows)
    }

    fn push_quoted(out: &mut String, text: &str) {
        out.push('"');
        for ch in text.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
    }

    fn push_cell(out: &mut String, cell: &Cell) {
        match cell {
            Cell::Null => {}
            Cell::Bool(true) => out.push_str("true"),
            Cell::Bool(false) => out.push_str("false"),
            Cell::Int(value) => out.push_str(&value.to_string()),
            // Debug keeps the decimal point on round floats, so "2.0"
            // stays distinguishable from the integer "2".
            Cell::Float(value) => out.push_str(&format!("{value:?}")),
            Cell::Text(text) => push_quoted(out, text),
        }
    }

    /// Split into records of `(field, was_quoted)` pairs. Quoted fields
    /// may contain delimiters, doubled quotes and line breaks.
    fn parse_records(text: &str) -> Vec<Vec<(String, bool)>> {
        let mut records = Vec::new();
        let mut record: Vec<(String, bool)> = Vec::new();
        let mut field = String::new();
        let mut quoted = false;
        let mut in_quotes = false;
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            if in_quotes {
                if ch == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    field.push(ch);
                }
                continue;
            }
            match ch {
                '"' if field.is_empty() && !quoted => {
                    in_quotes = true;
                    quoted = true;
                }
                ',' => {
                    record.push((std::mem::take(&mut field), quoted));
                    quoted = false;
                }
                '\n' => {
                    record.push((std::mem::take(&mut field), quoted));
                    quoted = false;
                    records.push(std::mem::take(&mut record));
                }
                '\r' => {}
                _ => field.push(ch),
            }
        }
        // Tolerate a missing final newline.
        if !field.is_empty() || quoted || !record.is_empty() {
            record.push((field, quoted));
            records.push(record);
        }
        records
    }

    fn to_cell(raw: String, quoted: bool) -> Cell {
        if quoted {
            return Cell::Text(raw);
        }
        if raw.is_empty() {
            return Cell::Null;
        }
        match raw.as_str() {
            "true" => return Cell::Bool(true),
            "false" => return Cell::Bool(false),
            _ => {}
        }
        if let Ok(int) = raw.parse::<i64>() {
            return Cell::Int(int);
        }
        if let Ok(float) = raw.parse::<f64>() {
            return Cell::Float(float);
        }
        Cell::Text(raw)
    }
}

// ---- tests ----
