//! Domain models for recon
//!
//! The canonical invoice model produced by normalization, the status and
//! severity vocabularies, and the wire types exchanged with the upload and
//! processing endpoints.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A normalized invoice record
///
/// Built fresh on every fetch and never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub vendor: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub status: InvoiceStatus,
    pub discrepancies: Vec<Discrepancy>,
    pub logs: String,
}

impl Invoice {
    pub fn has_discrepancies(&self) -> bool {
        !self.discrepancies.is_empty()
    }

    pub fn severity(&self) -> Severity {
        self.status.severity()
    }
}

/// A single disagreement between the invoice and its reference data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    /// Invoice attribute in disagreement (e.g. "amount")
    pub field: String,
    /// Category tag; open vocabulary (e.g. "value_mismatch", "missing_data")
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: String,
}

/// Invoice plus the descriptive fields only shown on the detail view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub description: Option<String>,
    pub po_number: Option<String>,
    pub due_date: Option<String>,
}

/// Reconciliation status (closed display vocabulary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Matched,
    #[default]
    Pending,
    /// Also reported as "with discrepancy"
    Mismatch,
    Exception,
    Reconciled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Pending => "pending",
            Self::Mismatch => "mismatch",
            Self::Exception => "exception",
            Self::Reconciled => "reconciled",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Matched | Self::Reconciled => Severity::Success,
            Self::Pending => Severity::Info,
            Self::Mismatch => Severity::Warning,
            Self::Exception => Severity::Error,
        }
    }

    /// Get all statuses
    pub fn all() -> &'static [InvoiceStatus] {
        &[
            Self::Matched,
            Self::Pending,
            Self::Mismatch,
            Self::Exception,
            Self::Reconciled,
        ]
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "matched" => Ok(Self::Matched),
            "pending" => Ok(Self::Pending),
            "mismatch" | "with discrepancy" | "with_discrepancy" => Ok(Self::Mismatch),
            "exception" => Ok(Self::Exception),
            "reconciled" => Ok(Self::Reconciled),
            _ => Err(format!("Unknown invoice status: {}", s)),
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Presentation tier derived from a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
    Default,
}

impl Severity {
    /// Tier for an arbitrary status label; unrecognized labels get `Default`
    pub fn for_label(label: &str) -> Self {
        label
            .parse::<InvoiceStatus>()
            .map(|status| status.severity())
            .unwrap_or(Severity::Default)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Default => "default",
        }
    }

    /// The clean-match tier
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Success)
    }
}

// =============================================================================
// Upload wire types
// =============================================================================

/// Storage reference for one uploaded file
///
/// Field names follow the storage endpoint's contract literally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    #[serde(rename = "Location")]
    pub location: String,
    pub key: String,
}

/// One element of the processing-endpoint payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingRequest {
    pub invoice: InvoiceReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceReference {
    pub invoice_url: String,
    pub invoice_description: String,
}

impl From<&StoredObject> for ProcessingRequest {
    fn from(stored: &StoredObject) -> Self {
        Self {
            invoice: InvoiceReference {
                invoice_url: stored.location.clone(),
                invoice_description: stored.key.clone(),
            },
        }
    }
}

/// File extensions accepted for upload, with the content type sent for each
pub const ACCEPTED_FILE_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("csv", "text/csv"),
];

/// A source document selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    name: String,
    content_type: &'static str,
    bytes: Vec<u8>,
}

impl FileHandle {
    /// Wrap in-memory file contents, rejecting unsupported file types
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let content_type = accepted_content_type(&name)?;
        Ok(Self {
            name,
            content_type,
            bytes,
        })
    }

    /// Read a file from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Validation(format!("Invalid file name: {}", path.display())))?
            .to_string();
        // Check the type before reading the contents
        let content_type = accepted_content_type(&name)?;
        let bytes = std::fs::read(path)?;
        Ok(Self {
            name,
            content_type,
            bytes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn size_kb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0
    }
}

fn content_type_for(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_lowercase();
    ACCEPTED_FILE_TYPES
        .iter()
        .find(|(accepted, _)| *accepted == ext)
        .map(|(_, content_type)| *content_type)
}

fn accepted_content_type(name: &str) -> Result<&'static str> {
    content_type_for(name).ok_or_else(|| {
        Error::Validation(format!(
            "Unsupported file type: {} (allowed: {})",
            name,
            ACCEPTED_FILE_TYPES
                .iter()
                .map(|(ext, _)| *ext)
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })
}
