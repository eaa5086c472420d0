use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::model::status::{Status, StatusDetails};

// ============================================================================
// Step: one node of the report tree
// ============================================================================

/// A named, reportable unit of test work.
///
/// `steps` holds the children in declaration order. Timestamps are
/// milliseconds since the UNIX epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,

    #[serde(default)]
    pub status: Status,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,

    #[serde(default)]
    pub parameters: Vec<Parameter>,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    #[serde(default)]
    pub steps: Vec<Step>,

    #[serde(default)]
    pub start: u128,

    #[serde(default)]
    pub stop: u128,
}

impl Step {
    /// A passed step with the given parameters, started now.
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        let now = now_ms();
        Self {
            name: name.into(),
            status: Status::Passed,
            status_details: None,
            parameters,
            attachments: Vec::new(),
            steps: Vec::new(),
            start: now,
            stop: now,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_details(mut self, details: StatusDetails) -> Self {
        self.status_details = Some(details);
        self
    }

    pub fn with_child(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Look up a parameter value by name.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn duration_ms(&self) -> u128 {
        self.stop.saturating_sub(self.start)
    }
}

// ============================================================================
// Parameters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

/// Build parameters from key/value pairs.
pub fn parameters<I, K, V>(pairs: I) -> Vec<Parameter>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
{
    pairs
        .into_iter()
        .map(|(k, v)| Parameter::new(k, v))
        .collect()
}

// ============================================================================
// Attachments
// ============================================================================

/// Raw content attached to a step.
///
/// `source` names the file the content would be written to by a report
/// writer: `<sha1 of content>-attachment.<ext>`. The content itself stays in
/// memory and is not serialized with the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,

    #[serde(rename = "type")]
    pub mime_type: MimeType,

    pub source: String,

    #[serde(skip)]
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, mime_type: MimeType, content: Vec<u8>) -> Self {
        let source = format!(
            "{}-attachment.{}",
            content_fingerprint(&content),
            mime_type.extension()
        );
        Self {
            name: name.into(),
            mime_type,
            source,
            content,
        }
    }
}

fn content_fingerprint(content: &[u8]) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MimeType {
    Text,
    Json,
    Xml,
    Html,
    Csv,
    Yaml,
    Png,
    Jpeg,
    Svg,
    OctetStream,
    Other(String),
}

impl MimeType {
    pub fn as_str(&self) -> &str {
        match self {
            MimeType::Text => "text/plain",
            MimeType::Json => "application/json",
            MimeType::Xml => "application/xml",
            MimeType::Html => "text/html",
            MimeType::Csv => "text/csv",
            MimeType::Yaml => "application/yaml",
            MimeType::Png => "image/png",
            MimeType::Jpeg => "image/jpeg",
            MimeType::Svg => "image/svg+xml",
            MimeType::OctetStream => "application/octet-stream",
            MimeType::Other(s) => s,
        }
    }

    /// File extension used for the attachment source name.
    pub fn extension(&self) -> &'static str {
        match self {
            MimeType::Text => "txt",
            MimeType::Json => "json",
            MimeType::Xml => "xml",
            MimeType::Html => "html",
            MimeType::Csv => "csv",
            MimeType::Yaml => "yaml",
            MimeType::Png => "png",
            MimeType::Jpeg => "jpg",
            MimeType::Svg => "svg",
            MimeType::OctetStream | MimeType::Other(_) => "bin",
        }
    }
}

impl From<String> for MimeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text/plain" => MimeType::Text,
            "application/json" => MimeType::Json,
            "application/xml" => MimeType::Xml,
            "text/html" => MimeType::Html,
            "text/csv" => MimeType::Csv,
            "application/yaml" => MimeType::Yaml,
            "image/png" => MimeType::Png,
            "image/jpeg" => MimeType::Jpeg,
            "image/svg+xml" => MimeType::Svg,
            "application/octet-stream" => MimeType::OctetStream,
            _ => MimeType::Other(value),
        }
    }
}

impl From<MimeType> for String {
    fn from(value: MimeType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
