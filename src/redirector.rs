use super::types::DeviceType;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const MOBILE_UPGRADE_PAGE: &str = "/upgrade-your-browser/Update-Pe-browser.html";
pub const PC_UPGRADE_PAGE: &str = "/upgrade-your-browser/Update-Pc-browser.html";

/// The two static upgrade pages, one per device class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradePages {
    pub mobile: String,
    pub pc: String,
}

impl Default for UpgradePages {
    fn default() -> Self {
        Self {
            mobile: MOBILE_UPGRADE_PAGE.to_string(),
            pc: PC_UPGRADE_PAGE.to_string(),
        }
    }
}

impl UpgradePages {
    pub fn redirect_url(&self, device: DeviceType) -> &str {
        match device {
            DeviceType::Mobile => &self.mobile,
            DeviceType::Pc => &self.pc,
        }
    }
}

/// The browsing context that performs a navigation.
pub trait Navigator {
    fn navigate(&mut self, url: &str);
}

/// Remembers navigations instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    pub visited: Vec<String>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&mut self, url: &str) {
        self.visited.push(url.to_string());
    }
}

/// Reports the navigation target through the log instead of a browser.
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&mut self, url: &str) {
        info!(target_url = url, "navigate");
    }
}
