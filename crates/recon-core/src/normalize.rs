//! Normalization of result-set payloads into canonical invoices
//!
//! The reconciliation service only loosely guarantees the shape of what it
//! returns. Everything here is pure: the same payload and the same `today`
//! always produce the same invoices and warnings.
//!
//! # Payload shapes
//!
//! Tried in order, first match wins:
//! 1. A bare array of items
//! 2. An object with a `data` or `invoices` array
//! 3. Any other non-empty object, treated as a one-item batch
//!
//! An empty array, an empty object, an empty wrapped array, or `null` is an
//! [`Error::EmptyResult`]. Scalars are an [`Error::Parse`].
//!
//! # Field defaults
//!
//! Each field falls back independently, so one bad field never discards the
//! record. Every fallback that hides a defect is reported as a
//! [`NormalizationWarning`].

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::{Discrepancy, Invoice, InvoiceDetail, InvoiceStatus};

/// Wrapper keys that may hold the item list
const ITEM_LIST_KEYS: &[&str] = &["data", "invoices"];

const ID_KEYS: &[&str] = &["id"];
const ALT_ID_KEYS: &[&str] = &["_id", "invoiceId"];
const INVOICE_NUMBER_KEYS: &[&str] = &["invoiceNumber", "invoice_number", "number"];
const VENDOR_KEYS: &[&str] = &["vendor", "supplier", "vendorName"];
const AMOUNT_KEYS: &[&str] = &["amount"];
const DATE_KEYS: &[&str] = &["date"];
const STATUS_KEYS: &[&str] = &["status"];
const DISCREPANCY_KEYS: &[&str] = &["discrepancies", "discrepancyReasons"];
const LOG_KEYS: &[&str] = &["logs"];
const DESCRIPTION_KEYS: &[&str] = &["description"];
const PO_NUMBER_KEYS: &[&str] = &["poNumber", "po_number"];
const DUE_DATE_KEYS: &[&str] = &["dueDate", "due_date"];

const DISCREPANCY_FIELD_KEYS: &[&str] = &["field", "discrepancyField"];
const DISCREPANCY_TYPE_KEYS: &[&str] = &["type", "discrepancyType"];
const DISCREPANCY_REASON_KEYS: &[&str] = &["reason", "discrepancyReason"];

/// Vendor sentinel for records without one
pub const UNKNOWN_VENDOR: &str = "Unknown";

/// Category used when a discrepancy omits its type
pub const UNKNOWN_DISCREPANCY_TYPE: &str = "unknown";

/// Result of normalizing a batch
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub invoices: Vec<Invoice>,
    pub warnings: Vec<NormalizationWarning>,
}

/// Result of normalizing a single-invoice lookup
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDetail {
    pub detail: InvoiceDetail,
    pub warnings: Vec<NormalizationWarning>,
}

/// A defect absorbed during normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationWarning {
    /// 1-based position of the item in the batch
    pub position: usize,
    pub field: &'static str,
    pub kind: WarningKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// Field absent; default applied
    Missing,
    /// Field present but not coercible; default applied
    Unparseable(String),
    /// Status outside the vocabulary; mapped to pending
    UnknownStatus(String),
    /// Id already used earlier in the batch; suffixed with the position
    DuplicateId(String),
    /// The item was not a JSON object; all defaults applied
    NotAnObject,
    /// Clean status despite listed discrepancies (left as reported)
    CleanStatusWithDiscrepancies,
}

impl std::fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item {}: {}: ", self.position, self.field)?;
        match &self.kind {
            WarningKind::Missing => write!(f, "missing, default applied"),
            WarningKind::Unparseable(raw) => write!(f, "unparseable value {}, default applied", raw),
            WarningKind::UnknownStatus(raw) => write!(f, "unknown status {:?}, using pending", raw),
            WarningKind::DuplicateId(id) => write!(f, "duplicate id {:?}, suffixed", id),
            WarningKind::NotAnObject => write!(f, "item is not an object"),
            WarningKind::CleanStatusWithDiscrepancies => {
                write!(f, "clean status reported with discrepancies")
            }
        }
    }
}

/// Recognized payload shapes
#[derive(Debug)]
enum Payload<'a> {
    List(&'a [Value]),
    Wrapped {
        key: &'static str,
        items: &'a [Value],
    },
    Single(&'a Value),
    Empty,
}

impl<'a> Payload<'a> {
    fn classify(raw: &'a Value) -> Result<Self> {
        match raw {
            Value::Null => Ok(Payload::Empty),
            Value::Array(items) if items.is_empty() => Ok(Payload::Empty),
            Value::Array(items) => Ok(Payload::List(items)),
            Value::Object(map) => {
                let mut empty_wrapper = false;
                for key in ITEM_LIST_KEYS {
                    match map.get(*key) {
                        Some(Value::Array(items)) if !items.is_empty() => {
                            return Ok(Payload::Wrapped { key: *key, items });
                        }
                        Some(value) if is_empty_container(value) => empty_wrapper = true,
                        _ => {}
                    }
                }
                // A null or empty item list with no populated sibling carries no invoices
                if empty_wrapper || map.is_empty() {
                    Ok(Payload::Empty)
                } else {
                    Ok(Payload::Single(raw))
                }
            }
            Value::Bool(_) | Value::Number(_) | Value::String(_) => Err(Error::Parse(format!(
                "unrecognized payload shape: {}",
                truncate_raw(raw)
            ))),
        }
    }

    fn items(self) -> Result<Vec<&'a Value>> {
        match self {
            Payload::List(items) | Payload::Wrapped { items, .. } => Ok(items.iter().collect()),
            Payload::Single(item) => Ok(vec![item]),
            Payload::Empty => Err(Error::EmptyResult(
                "response contained no invoices".to_string(),
            )),
        }
    }
}

/// Normalize a payload with today's date as the date default
pub fn normalize(raw: &Value) -> Result<Normalized> {
    Normalizer::today().normalize(raw)
}

/// Normalizes raw payloads against a fixed "today"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    today: NaiveDate,
}

impl Normalizer {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Normalizer using the current UTC date
    pub fn today() -> Self {
        Self::new(Utc::now().date_naive())
    }

    /// Normalize a batch payload
    pub fn normalize(&self, raw: &Value) -> Result<Normalized> {
        let payload = Payload::classify(raw)?;
        if let Payload::Wrapped { key, items } = &payload {
            tracing::trace!(key = *key, count = items.len(), "Unwrapped item list");
        }
        let items = payload.items()?;

        let mut warnings = Vec::new();
        let mut seen = HashSet::with_capacity(items.len());
        let mut invoices = Vec::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            let position = index + 1;
            let mut invoice = self.normalize_item(item, position, &mut warnings);

            if !seen.insert(invoice.id.clone()) {
                let original = invoice.id.clone();
                let mut candidate = format!("{}-{}", original, position);
                while seen.contains(&candidate) {
                    candidate.push_str(&format!("-{}", position));
                }
                seen.insert(candidate.clone());
                invoice.id = candidate;
                warnings.push(NormalizationWarning {
                    position,
                    field: "id",
                    kind: WarningKind::DuplicateId(original),
                });
            }

            invoices.push(invoice);
        }

        Ok(Normalized { invoices, warnings })
    }

    /// Normalize a single-invoice lookup
    ///
    /// Picks the item whose invoice number equals `key`, falling back to the
    /// first item.
    pub fn normalize_detail(&self, raw: &Value, key: &str) -> Result<NormalizedDetail> {
        let items = Payload::classify(raw)?.items()?;
        let key = key.trim();

        let index = items
            .iter()
            .position(|item| {
                item.as_object()
                    .and_then(|map| first(map, INVOICE_NUMBER_KEYS))
                    .and_then(text)
                    .is_some_and(|number| number == key)
            })
            .unwrap_or(0);
        let item = items[index];

        let mut warnings = Vec::new();
        let invoice = self.normalize_item(item, index + 1, &mut warnings);

        let empty = Map::new();
        let map = item.as_object().unwrap_or(&empty);
        let detail = InvoiceDetail {
            invoice,
            description: first(map, DESCRIPTION_KEYS).and_then(text),
            po_number: first(map, PO_NUMBER_KEYS).and_then(text),
            due_date: first(map, DUE_DATE_KEYS).and_then(text),
        };

        Ok(NormalizedDetail { detail, warnings })
    }

    fn normalize_item(
        &self,
        item: &Value,
        position: usize,
        warnings: &mut Vec<NormalizationWarning>,
    ) -> Invoice {
        let empty = Map::new();
        let map = match item.as_object() {
            Some(map) => map,
            None => {
                warnings.push(NormalizationWarning {
                    position,
                    field: "item",
                    kind: WarningKind::NotAnObject,
                });
                &empty
            }
        };
        let mut fields = FieldReader {
            map,
            position,
            warnings: &mut *warnings,
        };

        let explicit_number = fields.text("invoiceNumber", INVOICE_NUMBER_KEYS, false);
        let id = fields
            .text("id", ID_KEYS, false)
            .or_else(|| fields.text("id", ALT_ID_KEYS, false))
            .or_else(|| explicit_number.clone())
            .unwrap_or_else(|| position.to_string());

        if explicit_number.is_none() {
            fields.missing("invoiceNumber");
        }
        let invoice_number = explicit_number.unwrap_or_else(|| format!("INV-{}", position));

        let vendor = fields
            .text("vendor", VENDOR_KEYS, true)
            .unwrap_or_else(|| UNKNOWN_VENDOR.to_string());
        let amount = fields.amount();
        let date = fields.date().unwrap_or(self.today);
        let status = fields.status();
        let discrepancies = fields.discrepancies();
        let logs = fields.logs();

        let invoice = Invoice {
            id,
            invoice_number,
            vendor,
            amount,
            date,
            status,
            discrepancies,
            logs,
        };

        // Reported, not corrected: the service owns this invariant
        if invoice.severity().is_clean() && invoice.has_discrepancies() {
            warnings.push(NormalizationWarning {
                position,
                field: "status",
                kind: WarningKind::CleanStatusWithDiscrepancies,
            });
        }

        invoice
    }
}

/// Field-by-field reader over one raw item that records warnings as it goes
struct FieldReader<'a, 'w> {
    map: &'a Map<String, Value>,
    position: usize,
    warnings: &'w mut Vec<NormalizationWarning>,
}

impl FieldReader<'_, '_> {
    fn warn(&mut self, field: &'static str, kind: WarningKind) {
        self.warnings.push(NormalizationWarning {
            position: self.position,
            field,
            kind,
        });
    }

    fn missing(&mut self, field: &'static str) {
        self.warn(field, WarningKind::Missing);
    }

    /// Text field; `report_missing` controls whether absence is a warning
    fn text(
        &mut self,
        field: &'static str,
        keys: &[&str],
        report_missing: bool,
    ) -> Option<String> {
        match first(self.map, keys) {
            Some(value) => {
                let parsed = text(value);
                if parsed.is_none() && !is_blank(value) {
                    self.warn(field, WarningKind::Unparseable(truncate_raw(value)));
                } else if parsed.is_none() && report_missing {
                    self.missing(field);
                }
                parsed
            }
            None => {
                if report_missing {
                    self.missing(field);
                }
                None
            }
        }
    }

    fn amount(&mut self) -> f64 {
        match first(self.map, AMOUNT_KEYS) {
            Some(value) => coerce_amount(value).unwrap_or_else(|| {
                self.warn("amount", WarningKind::Unparseable(truncate_raw(value)));
                0.0
            }),
            None => {
                self.missing("amount");
                0.0
            }
        }
    }

    fn date(&mut self) -> Option<NaiveDate> {
        match first(self.map, DATE_KEYS) {
            Some(value) => {
                let date = coerce_date(value);
                if date.is_none() {
                    self.warn("date", WarningKind::Unparseable(truncate_raw(value)));
                }
                date
            }
            None => {
                self.missing("date");
                None
            }
        }
    }

    fn status(&mut self) -> InvoiceStatus {
        match first(self.map, STATUS_KEYS) {
            Some(Value::String(raw)) => raw.parse().unwrap_or_else(|_| {
                self.warn("status", WarningKind::UnknownStatus(raw.clone()));
                InvoiceStatus::Pending
            }),
            Some(value) => {
                self.warn("status", WarningKind::Unparseable(truncate_raw(value)));
                InvoiceStatus::Pending
            }
            None => {
                self.missing("status");
                InvoiceStatus::Pending
            }
        }
    }

    fn discrepancies(&mut self) -> Vec<Discrepancy> {
        let entries = match first(self.map, DISCREPANCY_KEYS) {
            Some(Value::Array(entries)) => entries,
            Some(value) => {
                self.warn(
                    "discrepancies",
                    WarningKind::Unparseable(truncate_raw(value)),
                );
                return Vec::new();
            }
            None => return Vec::new(),
        };

        let mut discrepancies = Vec::with_capacity(entries.len());
        for entry in entries {
            match coerce_discrepancy(entry) {
                Some(discrepancy) => discrepancies.push(discrepancy),
                None => self.warn(
                    "discrepancies",
                    WarningKind::Unparseable(truncate_raw(entry)),
                ),
            }
        }
        discrepancies
    }

    fn logs(&mut self) -> String {
        match first(self.map, LOG_KEYS) {
            Some(Value::String(logs)) => logs.clone(),
            Some(Value::Array(lines)) => lines
                .iter()
                .filter_map(|line| match line {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Some(value) => {
                self.warn("logs", WarningKind::Unparseable(truncate_raw(value)));
                String::new()
            }
            None => String::new(),
        }
    }
}

/// First non-null value among alternative keys
fn first<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

/// Non-empty trimmed text from a string or number
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Null, `[]`, or `{}`
fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn is_blank(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.trim().is_empty())
}

fn coerce_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    };
    amount.filter(|a| a.is_finite())
}

/// Parse an amount string, handling currency symbols, commas, and
/// parenthesized negatives
fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

fn coerce_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date(s),
        // Epoch milliseconds
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%y", // 01/15/24
        "%m/%d/%Y", // 01/15/2024
        "%m-%d-%Y", // 01-15-2024
        "%d/%m/%Y", // 15/01/2024 (European)
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn coerce_discrepancy(entry: &Value) -> Option<Discrepancy> {
    match entry {
        Value::Object(map) => Some(Discrepancy {
            field: first(map, DISCREPANCY_FIELD_KEYS)
                .and_then(text)
                .unwrap_or_default(),
            kind: first(map, DISCREPANCY_TYPE_KEYS)
                .and_then(text)
                .unwrap_or_else(|| UNKNOWN_DISCREPANCY_TYPE.to_string()),
            reason: first(map, DISCREPANCY_REASON_KEYS)
                .and_then(text)
                .unwrap_or_default(),
        }),
        // A bare string is taken as the reason
        Value::String(reason) if !reason.trim().is_empty() => Some(Discrepancy {
            field: String::new(),
            kind: UNKNOWN_DISCREPANCY_TYPE.to_string(),
            reason: reason.trim().to_string(),
        }),
        _ => None,
    }
}

/// Raw JSON for warning messages, truncated
fn truncate_raw(value: &Value) -> String {
    let raw = value.to_string();
    if raw.chars().count() > 80 {
        format!("{}...", raw.chars().take(77).collect::<String>())
    } else {
        raw
    }
}
