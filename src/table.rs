//! # table
//!
//! The indexed collection of [`TranslationEntry`] values, keyed by
//! `(source_id, source_is_extended)`, plus a loader for the declarative
//! JSON document format.

use std::collections::HashMap;
use std::io::Read;

use log::warn;
use serde::Deserialize;
use serde_json::Value;

use crate::entry::TranslationEntry;
use crate::errors::TableError;
use crate::signal::{Endian, SignalMapping};

/// Keyed collection of translation entries.
///
/// `get` and `add` are the only two operations; concurrent access across
/// threads is the caller's concern (the runtime wraps a table in an
/// `RwLock`, see [`crate::translator::Translator`]).
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    entries: HashMap<(u32, bool), TranslationEntry>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the entry at `(entry.source_id, entry.source_is_extended)`.
    pub fn add(&mut self, entry: TranslationEntry) {
        self.entries
            .insert((entry.source_id, entry.source_is_extended), entry);
    }

    /// Looks up an entry matching both the id and the addressing mode.
    pub fn get(&self, source_id: u32, is_extended: bool) -> Option<&TranslationEntry> {
        self.entries.get(&(source_id, is_extended))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses the declarative table document from a string.
    pub fn from_json_str(text: &str) -> Result<Self, TableError> {
        let doc: Value = serde_json::from_str(text)?;
        Self::from_document(doc)
    }

    /// Parses the declarative table document from any reader.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let doc: Value = serde_json::from_reader(reader)?;
        Self::from_document(doc)
    }

    fn from_document(doc: Value) -> Result<Self, TableError> {
        let entries = doc
            .get("entries")
            .and_then(Value::as_array)
            .ok_or_else(|| TableError::BadTable {
                reason: "missing or non-array top-level \"entries\" field".to_string(),
            })?;

        let mut table = Self::new();
        for raw_entry in entries {
            match parse_entry(raw_entry) {
                Ok(entry) => table.add(entry),
                Err((source_id, reason)) => {
                    warn!("skipping invalid table entry for {source_id:#x}: {reason}");
                }
            }
        }
        Ok(table)
    }
}

#[derive(Deserialize)]
struct RawSignal {
    src_start_bit: u16,
    length: u8,
    dest_start_bit: u16,
    #[serde(default)]
    scale: Option<f64>,
    #[serde(default)]
    offset: Option<f64>,
    #[serde(default)]
    endian: Option<String>,
    #[serde(default)]
    min_value: Option<f64>,
    #[serde(default)]
    max_value: Option<f64>,
}

fn parse_id(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().map(|x| x as u32),
        Value::String(s) => {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                u32::from_str_radix(hex, 16).ok()
            } else {
                s.parse::<u32>().ok()
            }
        }
        _ => None,
    }
}

fn parse_endian(s: Option<&str>) -> Option<Endian> {
    match s.unwrap_or("little").to_ascii_lowercase().as_str() {
        "little" => Some(Endian::Little),
        "big" => Some(Endian::Big),
        _ => None,
    }
}

fn parse_signal(raw_id: u32, raw: &Value) -> Option<SignalMapping> {
    let parsed: RawSignal = serde_json::from_value(raw.clone()).ok()?;
    let endian = parse_endian(parsed.endian.as_deref());
    let endian = match endian {
        Some(e) => e,
        None => {
            warn!(
                "skipping invalid signal on source id {raw_id:#x}: unrecognized endian {:?}",
                parsed.endian
            );
            return None;
        }
    };
    if parsed.length == 0 || parsed.length > 64 {
        warn!("skipping invalid signal on source id {raw_id:#x}: length {} out of range", parsed.length);
        return None;
    }
    Some(SignalMapping {
        src_start_bit: parsed.src_start_bit,
        length: parsed.length,
        dest_start_bit: parsed.dest_start_bit,
        scale: parsed.scale.unwrap_or(1.0),
        offset: parsed.offset.unwrap_or(0.0),
        endian,
        min_value: parsed.min_value,
        max_value: parsed.max_value,
    })
}

fn parse_entry(raw: &Value) -> Result<TranslationEntry, (u32, String)> {
    let source_id = raw
        .get("source_id")
        .and_then(parse_id)
        .ok_or((0, "missing or invalid source_id".to_string()))?;
    let target_id = raw
        .get("target_id")
        .and_then(parse_id)
        .ok_or((source_id, "missing or invalid target_id".to_string()))?;
    let source_is_extended = raw
        .get("source_is_extended")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let target_is_extended = raw
        .get("target_is_extended")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let default_payload: Vec<u8> = raw
        .get("default_target_bytes")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_u64)
                .map(|b| b as u8)
                .collect()
        })
        .unwrap_or_default();

    let signals = raw
        .get("signals")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|s| parse_signal(source_id, s))
                .collect()
        })
        .unwrap_or_default();

    Ok(TranslationEntry {
        source_id,
        source_is_extended,
        target_id,
        target_is_extended,
        default_payload,
        signals,
    })
}
