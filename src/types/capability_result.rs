/// Outcome of one probe run.
///
/// `supported` is derived from `reasons`, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityResult {
    supported: bool,
    reasons: Vec<String>,
}

impl CapabilityResult {
    pub fn from_reasons(reasons: Vec<String>) -> Self {
        Self {
            supported: reasons.is_empty(),
            reasons,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Reasons for every failed check, in checklist order.
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn into_reasons(self) -> Vec<String> {
        self.reasons
    }
}
