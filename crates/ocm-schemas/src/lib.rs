//! ocm-schemas
//!
//! Shared value types for the options-chain collector. No IO lives here; the
//! only wall-clock access is behind [`Clock`] so callers can pin time in tests.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// OAuth credential triple issued by the provider's token endpoint.
///
/// All three fields are opaque bearer strings and always travel together: a
/// refresh or re-authentication replaces the whole value, never one field.
/// Token endpoint responses carry extra keys (`expires_in`, `scope`, ...);
/// they are ignored on decode.
///
/// **Values are redacted in `Debug` output.**
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        id_token: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            id_token: id_token.into(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<REDACTED>")
            .field("refresh_token", &"<REDACTED>")
            .field("id_token", &"<REDACTED>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Chain request
// ---------------------------------------------------------------------------

/// Which side of the chain to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractType {
    Call,
    Put,
    All,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Call => "CALL",
            ContractType::Put => "PUT",
            ContractType::All => "ALL",
        }
    }
}

/// Chain strategy sent with every request. The collector only stores
/// single-leg chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainStrategy {
    Single,
}

impl ChainStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainStrategy::Single => "SINGLE",
        }
    }
}

/// Parameters for one `/chains` call.
///
/// Dates left as `None` are resolved at call time by [`ChainRequest::date_window`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRequest {
    pub symbol: String,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub strike_count: u32,
    pub contract_type: ContractType,
    pub strategy: ChainStrategy,
}

impl ChainRequest {
    /// Days added to `from_date` when `to_date` is not supplied.
    pub const DEFAULT_WINDOW_DAYS: i64 = 30;
    pub const DEFAULT_STRIKE_COUNT: u32 = 40;

    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            from_date: None,
            to_date: None,
            strike_count: Self::DEFAULT_STRIKE_COUNT,
            contract_type: ContractType::All,
            strategy: ChainStrategy::Single,
        }
    }

    /// Resolve `(from, to)`: `from` falls back to `today`, `to` to `from + 30 days`.
    pub fn date_window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let from = self.from_date.unwrap_or(today);
        let to = self
            .to_date
            .unwrap_or(from + Duration::days(Self::DEFAULT_WINDOW_DAYS));
        (from, to)
    }

    /// Query parameters in the order the provider documents them.
    pub fn query_params(&self, today: NaiveDate) -> Vec<(String, String)> {
        let (from, to) = self.date_window(today);
        vec![
            ("symbol".to_string(), self.symbol.clone()),
            (
                "contractType".to_string(),
                self.contract_type.as_str().to_string(),
            ),
            ("strikeCount".to_string(), self.strike_count.to_string()),
            ("strategy".to_string(), self.strategy.as_str().to_string()),
            ("fromDate".to_string(), from.format("%Y-%m-%d").to_string()),
            ("toDate".to_string(), to.format("%Y-%m-%d").to_string()),
            ("includeUnderlyingQuote".to_string(), "true".to_string()),
        ]
    }
}

/// Query parameters for a `/quotes` call.
pub fn quote_params(symbols: &[String]) -> Vec<(String, String)> {
    vec![
        ("symbols".to_string(), symbols.join(",")),
        ("indicative".to_string(), "false".to_string()),
    ]
}

// ---------------------------------------------------------------------------
// Fetch record
// ---------------------------------------------------------------------------

/// Manifest entry for one persisted chain snapshot.
///
/// Serialized with camelCase keys (`asOf`, `symbol`, `fileName`) since it is the
/// body of the batch entry point's response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRecord {
    /// Call time in the process timezone.
    pub as_of: DateTime<FixedOffset>,
    pub symbol: String,
    pub file_name: String,
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "now". Runtime code takes a `&dyn Clock` instead of reading the
/// wall clock directly.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Pinned clock for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn chain_request_defaults_to_thirty_day_window() {
        let req = ChainRequest::for_symbol("MSFT");
        let (from, to) = req.date_window(d(2024, 1, 15));
        assert_eq!(from, d(2024, 1, 15));
        assert_eq!(to, d(2024, 2, 14));
    }

    #[test]
    fn explicit_from_date_shifts_default_to_date() {
        let mut req = ChainRequest::for_symbol("MSFT");
        req.from_date = Some(d(2024, 3, 1));
        let (from, to) = req.date_window(d(2024, 1, 15));
        assert_eq!(from, d(2024, 3, 1));
        assert_eq!(to, d(2024, 3, 31));
    }

    #[test]
    fn chain_query_params_carry_defaults() {
        let params = ChainRequest::for_symbol("AAPL").query_params(d(2024, 1, 15));
        let get = |k: &str| {
            params
                .iter()
                .find(|(name, _)| name == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("symbol"), Some("AAPL"));
        assert_eq!(get("contractType"), Some("ALL"));
        assert_eq!(get("strikeCount"), Some("40"));
        assert_eq!(get("strategy"), Some("SINGLE"));
        assert_eq!(get("fromDate"), Some("2024-01-15"));
        assert_eq!(get("toDate"), Some("2024-02-14"));
        assert_eq!(get("includeUnderlyingQuote"), Some("true"));
    }

    #[test]
    fn quote_params_join_symbols() {
        let params = quote_params(&["AAPL".to_string(), "MSFT".to_string()]);
        assert_eq!(params[0], ("symbols".to_string(), "AAPL,MSFT".to_string()));
        assert_eq!(params[1], ("indicative".to_string(), "false".to_string()));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let c = Credential::new("a-secret", "r-secret", "i-secret");
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("a-secret"));
        assert!(!dbg.contains("r-secret"));
        assert!(dbg.contains("<REDACTED>"));
    }

    #[test]
    fn credential_decode_ignores_extra_token_fields() {
        let raw = r#"{"access_token":"a","refresh_token":"r","id_token":"i","expires_in":1800,"scope":"api"}"#;
        let c: Credential = serde_json::from_str(raw).unwrap();
        assert_eq!(c, Credential::new("a", "r", "i"));
    }

    #[test]
    fn fetch_record_uses_camel_case_keys() {
        let as_of = FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 15, 9, 30, 5)
            .unwrap();
        let rec = FetchRecord {
            as_of,
            symbol: "AAPL".to_string(),
            file_name: "CHAIN_AAPL_20240115143005000000.json".to_string(),
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["symbol"], "AAPL");
        assert_eq!(v["fileName"], "CHAIN_AAPL_20240115143005000000.json");
        assert_eq!(v["asOf"], "2024-01-15T09:30:05-05:00");
    }
}
