//! Artifact key scheme.
//!
//! | Layout      | Shape                                                  |
//! |-------------|--------------------------------------------------------|
//! | Flat        | `{root}/{type}_{symbol}_{yyyyMMddHHmmssffffff}.json`   |
//! | Partitioned | `{root}/{type}/{yyyyMMdd}/{symbol}_{HHmmssffffff}.json`|
//!
//! The partitioned key is a pure function of the key text: the stamp is split
//! at fixed offset 8. In a flat file name the first `_` segment is the data
//! type and the last is the stamp; everything between is the symbol, so
//! symbols may themselves contain `_`.
//!
//! A key whose parent directories are `{type}/{yyyyMMdd}` is always read as
//! partitioned. Its file name can look flat too (`BRK_B_09300512345678.json`),
//! so the partitioned shape must win for the mapping to stay idempotent.

use std::fmt;

use chrono::{DateTime, Utc};

/// Minimum stamp length in a flat key: `yyyyMMddHHmmss`.
const MIN_FLAT_STAMP_LEN: usize = 14;
const DATE_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParseError {
    pub key: String,
    pub reason: &'static str,
}

impl fmt::Display for KeyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot parse artifact key '{}': {}", self.key, self.reason)
    }
}

impl std::error::Error for KeyParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLayout {
    Flat,
    Partitioned,
}

/// Identity of one stored snapshot, independent of layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKey {
    pub data_type: String,
    pub symbol: String,
    /// UTC `yyyyMMddHHmmssffffff` (microsecond precision).
    pub stamp: String,
}

/// A stored key broken into its root directory, identity and layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    /// Directory the layout hangs off (e.g. `datasets`); empty for bare names.
    pub root: String,
    pub key: ArtifactKey,
    pub layout: KeyLayout,
}

impl ArtifactKey {
    pub fn new(data_type: &str, symbol: &str, as_of: DateTime<Utc>) -> Self {
        Self {
            data_type: data_type.to_string(),
            symbol: symbol.to_string(),
            stamp: as_of.format("%Y%m%d%H%M%S%6f").to_string(),
        }
    }

    /// `{type}_{symbol}_{stamp}.json`
    pub fn file_name(&self) -> String {
        format!("{}_{}_{}.json", self.data_type, self.symbol, self.stamp)
    }

    pub fn flat_key(&self, root: &str) -> String {
        join(root, &self.file_name())
    }

    pub fn partitioned_key(&self, root: &str) -> String {
        let (date, time) = self.stamp.split_at(DATE_LEN.min(self.stamp.len()));
        join(
            root,
            &format!("{}/{}/{}_{}.json", self.data_type, date, self.symbol, time),
        )
    }
}

impl ParsedKey {
    /// Parse either layout. Partitioned is tried first.
    pub fn parse(key: &str) -> Result<Self, KeyParseError> {
        parse_partitioned(key).or_else(|_| parse_flat(key))
    }

    pub fn partitioned_key(&self) -> String {
        self.key.partitioned_key(&self.root)
    }
}

/// Partitioned form of `key`. Idempotent: a partitioned key maps to itself.
pub fn partitioned_key_for(key: &str) -> Result<String, KeyParseError> {
    Ok(ParsedKey::parse(key)?.partitioned_key())
}

fn parse_flat(key: &str) -> Result<ParsedKey, KeyParseError> {
    let err = |reason| KeyParseError {
        key: key.to_string(),
        reason,
    };

    let (root, file) = key.rsplit_once('/').unwrap_or(("", key));
    let stem = file
        .strip_suffix(".json")
        .ok_or_else(|| err("missing .json extension"))?;
    let (data_type, rest) = stem
        .split_once('_')
        .ok_or_else(|| err("expected {type}_{symbol}_{timestamp}"))?;
    let (symbol, stamp) = rest
        .rsplit_once('_')
        .ok_or_else(|| err("expected {type}_{symbol}_{timestamp}"))?;

    if data_type.is_empty() || symbol.is_empty() {
        return Err(err("empty data type or symbol"));
    }
    if stamp.len() < MIN_FLAT_STAMP_LEN || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err("timestamp must be at least 14 digits"));
    }

    Ok(ParsedKey {
        root: root.to_string(),
        key: ArtifactKey {
            data_type: data_type.to_string(),
            symbol: symbol.to_string(),
            stamp: stamp.to_string(),
        },
        layout: KeyLayout::Flat,
    })
}

fn parse_partitioned(key: &str) -> Result<ParsedKey, KeyParseError> {
    let err = |reason| KeyParseError {
        key: key.to_string(),
        reason,
    };

    let (dir, file) = key.rsplit_once('/').ok_or_else(|| err("no partition directory"))?;
    let (dir, date) = dir.rsplit_once('/').ok_or_else(|| err("no date partition"))?;
    let (root, data_type) = dir.rsplit_once('/').unwrap_or(("", dir));
    let stem = file
        .strip_suffix(".json")
        .ok_or_else(|| err("missing .json extension"))?;
    let (symbol, time) = stem
        .rsplit_once('_')
        .ok_or_else(|| err("expected {symbol}_{time}"))?;

    if date.len() != DATE_LEN || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err("date partition must be 8 digits"));
    }
    if data_type.is_empty() || symbol.is_empty() || time.is_empty() {
        return Err(err("empty data type, symbol or time"));
    }
    if !time.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err("time must be digits"));
    }

    Ok(ParsedKey {
        root: root.to_string(),
        key: ArtifactKey {
            data_type: data_type.to_string(),
            symbol: symbol.to_string(),
            stamp: format!("{date}{time}"),
        },
        layout: KeyLayout::Partitioned,
    })
}

fn join(root: &str, rest: &str) -> String {
    if root.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", root.trim_end_matches('/'), rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn flat_key_maps_to_partitioned_key() {
        assert_eq!(
            partitioned_key_for("CHAIN_AAPL_20240115093005123456.json").unwrap(),
            "CHAIN/20240115/AAPL_093005123456.json"
        );
        assert_eq!(
            partitioned_key_for("datasets/CHAIN_AAPL_20240115093005123456.json").unwrap(),
            "datasets/CHAIN/20240115/AAPL_093005123456.json"
        );
    }

    #[test]
    fn partitioned_key_maps_to_itself() {
        let once = partitioned_key_for("datasets/CHAIN_AAPL_20240115093005123456.json").unwrap();
        let twice = partitioned_key_for(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(ParsedKey::parse(&once).unwrap().layout, KeyLayout::Partitioned);
    }

    #[test]
    fn long_stamp_with_underscore_symbol_maps_to_itself() {
        let once = partitioned_key_for("datasets/CHAIN_BRK_B_2024011509300512345678.json").unwrap();
        assert_eq!(once, "datasets/CHAIN/20240115/BRK_B_09300512345678.json");

        let parsed = ParsedKey::parse(&once).unwrap();
        assert_eq!(parsed.layout, KeyLayout::Partitioned);
        assert_eq!(parsed.key.symbol, "BRK_B");
        assert_eq!(partitioned_key_for(&once).unwrap(), once);
    }

    #[test]
    fn flat_key_under_a_plain_root_stays_flat() {
        let parsed = ParsedKey::parse("datasets/CHAIN_AAPL_20240115093005123456.json").unwrap();
        assert_eq!(parsed.layout, KeyLayout::Flat);
        assert_eq!(parsed.root, "datasets");
    }

    #[test]
    fn symbols_may_contain_underscores_and_dots() {
        assert_eq!(
            partitioned_key_for("datasets/CHAIN_BRK_B_20240115093005123456.json").unwrap(),
            "datasets/CHAIN/20240115/BRK_B_093005123456.json"
        );
        assert_eq!(
            partitioned_key_for("datasets/CHAIN_BF.B_20240115093005123456.json").unwrap(),
            "datasets/CHAIN/20240115/BF.B_093005123456.json"
        );
    }

    #[test]
    fn stamp_has_microsecond_precision_in_utc() {
        let as_of = Utc
            .with_ymd_and_hms(2024, 1, 15, 14, 30, 5)
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(123_456))
            .unwrap();
        let key = ArtifactKey::new("CHAIN", "AAPL", as_of);
        assert_eq!(key.stamp, "20240115143005123456");
        assert_eq!(key.file_name(), "CHAIN_AAPL_20240115143005123456.json");
        assert_eq!(
            key.flat_key("datasets"),
            "datasets/CHAIN_AAPL_20240115143005123456.json"
        );
    }

    #[test]
    fn malformed_keys_are_rejected() {
        for bad in [
            "datasets/CHAIN_AAPL.json",
            "datasets/CHAIN_AAPL_2024.json",
            "datasets/CHAIN_AAPL_20240115093005123456.csv",
            "datasets/CHAINAAPL20240115093005123456.json",
            "datasets/CHAIN__20240115093005123456.json",
        ] {
            let err = partitioned_key_for(bad).unwrap_err();
            assert_eq!(err.key, bad);
        }
    }
}
