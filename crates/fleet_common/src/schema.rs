//! Request and response schemas for report generation.
//!
//! Field names follow the wire format (camelCase). Validation walks the raw
//! JSON first so every offending field is reported by path before the typed
//! structs are built.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Per-category counts for one metric family (e.g. HOS violations by type).
pub type MetricBucket = BTreeMap<String, i64>;

/// Company branding supplied by the caller, used only for prompt substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub name: String,
    pub industry: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub logo_desc: String,
    pub report_period: String,
}

/// Current safety score and week-over-week delta for one region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetScoreEntry {
    pub score: i64,
    pub change: i64,
}

/// Fleet metrics for the reporting period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputData {
    pub fleet_scores: BTreeMap<String, FleetScoreEntry>,
    pub hos_violations: MetricBucket,
    pub safety_events: MetricBucket,
    pub unassigned_driving: MetricBucket,
    pub speeding_events: MetricBucket,
    pub personal_conveyance: MetricBucket,
    #[serde(rename = "missedDVIR")]
    pub missed_dvir: MetricBucket,
    pub contacts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub company_info: CompanyInfo,
    pub input_data: InputData,
}

/// One titled markdown block of the final report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub markdown: String,
}

impl Section {
    pub fn new(title: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            markdown: markdown.into(),
        }
    }

    /// Placeholder section returned while generation runs in stub mode
    pub fn stub() -> Self {
        Self::new("Stub", "Work in progress")
    }
}

/// Sections in presentation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub sections: Vec<Section>,
}

// ============================================================================
// Validation
// ============================================================================

const COMPANY_FIELDS: [&str; 6] = [
    "name",
    "industry",
    "primaryColor",
    "secondaryColor",
    "logoDesc",
    "reportPeriod",
];

const METRIC_BUCKETS: [&str; 6] = [
    "hosViolations",
    "safetyEvents",
    "unassignedDriving",
    "speedingEvents",
    "personalConveyance",
    "missedDVIR",
];

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// Dotted path, e.g. `inputData.fleetScores.Corporate.score`
    pub path: String,
    /// Expected type, e.g. `integer`
    pub expected: String,
    /// What was actually found (`missing`, `string`, ...)
    pub found: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, found {}",
            self.path, self.expected, self.found
        )
    }
}

/// Request payload rejected before prompt building
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaValidationError {
    pub issues: Vec<FieldIssue>,
}

impl SchemaValidationError {
    pub fn paths(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.path.as_str()).collect()
    }

    pub fn mentions(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

impl fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        write!(f, "invalid request: {}", rendered.join("; "))
    }
}

impl std::error::Error for SchemaValidationError {}

/// Parse a raw request body into a validated request
pub fn parse_request(body: &[u8]) -> Result<GenerateRequest, SchemaValidationError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| SchemaValidationError {
        issues: vec![FieldIssue {
            path: "$".to_string(),
            expected: "JSON object".to_string(),
            found: format!("unparsable body ({})", e),
        }],
    })?;
    validate_payload(&value)
}

/// Validate an arbitrary JSON payload against the request schema.
///
/// Collects every violation rather than stopping at the first one.
pub fn validate_payload(payload: &Value) -> Result<GenerateRequest, SchemaValidationError> {
    let mut issues = Vec::new();

    match payload.as_object() {
        Some(root) => {
            if let Some(company) = require_object(root, "companyInfo", "companyInfo", &mut issues) {
                for field in COMPANY_FIELDS {
                    check_string(company, field, &format!("companyInfo.{}", field), &mut issues);
                }
            }
            if let Some(data) = require_object(root, "inputData", "inputData", &mut issues) {
                check_input_data(data, &mut issues);
            }
        }
        None => issues.push(issue("$", "object", kind_of(payload))),
    }

    if !issues.is_empty() {
        return Err(SchemaValidationError { issues });
    }

    // Shape is verified above; anything serde still refuses is reported at the root
    serde_json::from_value(payload.clone()).map_err(|e| SchemaValidationError {
        issues: vec![issue("$", "GenerateRequest", &e.to_string())],
    })
}

fn check_input_data(data: &Map<String, Value>, issues: &mut Vec<FieldIssue>) {
    if let Some(scores) = require_object(data, "fleetScores", "inputData.fleetScores", issues) {
        for (region, entry) in scores {
            let path = format!("inputData.fleetScores.{}", region);
            if region.is_empty() {
                issues.push(issue(&path, "non-empty key", "empty string"));
            }
            match entry.as_object() {
                Some(entry) => {
                    check_integer(entry, "score", &format!("{}.score", path), issues);
                    check_integer(entry, "change", &format!("{}.change", path), issues);
                }
                None => issues.push(issue(&path, "object", kind_of(entry))),
            }
        }
    }

    for bucket in METRIC_BUCKETS {
        let path = format!("inputData.{}", bucket);
        if let Some(counts) = require_object(data, bucket, &path, issues) {
            for (category, count) in counts {
                let entry_path = format!("{}.{}", path, category);
                if category.is_empty() {
                    issues.push(issue(&entry_path, "non-empty key", "empty string"));
                }
                if !is_integer(count) {
                    issues.push(issue(&entry_path, "integer", kind_of(count)));
                }
            }
        }
    }

    match data.get("contacts") {
        Some(Value::Array(contacts)) => {
            for (i, contact) in contacts.iter().enumerate() {
                let path = format!("inputData.contacts[{}]", i);
                match contact.as_str() {
                    Some("") => issues.push(issue(&path, "non-empty string", "empty string")),
                    Some(_) => {}
                    None => issues.push(issue(&path, "string", kind_of(contact))),
                }
            }
        }
        Some(other) => issues.push(issue("inputData.contacts", "array", kind_of(other))),
        None => issues.push(issue("inputData.contacts", "array", "missing")),
    }
}

fn require_object<'a>(
    parent: &'a Map<String, Value>,
    key: &str,
    path: &str,
    issues: &mut Vec<FieldIssue>,
) -> Option<&'a Map<String, Value>> {
    match parent.get(key) {
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            issues.push(issue(path, "object", kind_of(other)));
            None
        }
        None => {
            issues.push(issue(path, "object", "missing"));
            None
        }
    }
}

fn check_string(parent: &Map<String, Value>, key: &str, path: &str, issues: &mut Vec<FieldIssue>) {
    match parent.get(key) {
        Some(Value::String(_)) => {}
        Some(other) => issues.push(issue(path, "string", kind_of(other))),
        None => issues.push(issue(path, "string", "missing")),
    }
}

fn check_integer(parent: &Map<String, Value>, key: &str, path: &str, issues: &mut Vec<FieldIssue>) {
    match parent.get(key) {
        Some(v) if is_integer(v) => {}
        Some(other) => issues.push(issue(path, "integer", kind_of(other))),
        None => issues.push(issue(path, "integer", "missing")),
    }
}

fn is_integer(value: &Value) -> bool {
    value.as_i64().is_some()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        // u64 beyond i64::MAX
        Value::Number(n) if n.as_i64().is_none() => "out-of-range integer",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn issue(path: &str, expected: &str, found: &str) -> FieldIssue {
    FieldIssue {
        path: path.to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
    }
}
