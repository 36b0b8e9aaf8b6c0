use super::DeviceType;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Payload sent to the report endpoint for one unsupported-client event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticRecord {
    pub user_agent: String,
    /// ISO-8601, millisecond precision, UTC.
    pub timestamp: String,
    pub url: String,
    pub device_type: DeviceType,
    #[serde(rename = "unsupportedReasons")]
    pub reasons: Vec<String>,
    /// Group labels, sent only in the tagged wire format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_type: Option<CheckTypeLabels>,
}

/// Human-readable names of the two check groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTypeLabels {
    pub core: String,
    pub aux: String,
}

impl Default for CheckTypeLabels {
    fn default() -> Self {
        Self {
            core: "核心API检测".to_string(),
            aux: "辅助特性检测".to_string(),
        }
    }
}

impl DiagnosticRecord {
    pub fn new(
        user_agent: impl Into<String>,
        url: impl Into<String>,
        device_type: DeviceType,
        reasons: Vec<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            url: url.into(),
            device_type,
            reasons,
            check_type: None,
        }
    }

    pub fn with_check_type(mut self, labels: CheckTypeLabels) -> Self {
        self.check_type = Some(labels);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn wire_field_names() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        let record = DiagnosticRecord::new(
            "Mozilla/5.0",
            "https://example.com/a",
            DeviceType::Pc,
            vec!["缺少fetch API".to_string()],
            at,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["userAgent"], "Mozilla/5.0");
        assert_eq!(value["timestamp"], "2026-03-01T08:30:00.000Z");
        assert_eq!(value["url"], "https://example.com/a");
        assert_eq!(value["deviceType"], "pc");
        assert_eq!(value["unsupportedReasons"][0], "缺少fetch API");
        assert!(value.get("checkType").is_none());

        let value = serde_json::to_value(record.with_check_type(CheckTypeLabels::default())).unwrap();
        assert_eq!(value["checkType"]["core"], "核心API检测");
        assert_eq!(value["checkType"]["aux"], "辅助特性检测");
    }
}
