//! Snapshot artifacts produced by the serializers.

use std::fmt::{self, Display, Formatter};

/// Output format of a snapshot body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SerializerType {
    /// Canonical, masked, pretty-printed JSON.
    Json,
    /// The value's `Display` rendering.
    Text,
    /// Base64 of a binary payload.
    Base64,
}

impl SerializerType {
    /// Upper-case name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Text => "TEXT",
            Self::Base64 => "BASE64",
        }
    }
}

impl Display for SerializerType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A serialized snapshot body with its optional scenario label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    body: String,
    scenario: Option<String>,
    format: SerializerType,
}

impl Snapshot {
    /// Wrap an already rendered body.
    #[must_use]
    pub const fn new(body: String, format: SerializerType) -> Self {
        Self {
            body,
            scenario: None,
            format,
        }
    }

    /// Attach a scenario label; `None` clears it.
    #[must_use]
    pub fn with_scenario(mut self, scenario: Option<String>) -> Self {
        self.scenario = scenario;
        self
    }

    /// Rendered body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Scenario label, if any.
    #[must_use]
    pub fn scenario(&self) -> Option<&str> {
        self.scenario.as_deref()
    }

    /// Serializer that produced the body.
    #[must_use]
    pub const fn format(&self) -> SerializerType {
        self.format
    }

    /// Identifier under which the snapshot is stored.
    ///
    /// `::` separators in `suite` become `.`, and the scenario, when present,
    /// is appended in brackets: `suite.test[scenario]`.
    #[must_use]
    pub fn identifier(&self, suite: &str, test: &str) -> String {
        let suite = suite.replace("::", ".");
        self.scenario.as_ref().map_or_else(
            || format!("{suite}.{test}"),
            |scenario| format!("{suite}.{test}[{scenario}]"),
        )
    }

    /// Consume the snapshot and return its body.
    #[must_use]
    pub fn into_body(self) -> String {
        self.body
    }
}
