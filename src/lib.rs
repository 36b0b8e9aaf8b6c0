mod checklist;
mod classifier;
mod config;
pub mod endpoint;
mod environment;
mod error;
mod gate;
mod probe;
mod profile;
mod redirector;
mod reporter;
mod storage;
mod throttle;
mod types;
mod upgrade_log;

pub use checklist::{Check, CheckGroup, CheckId, Checklist, ChecklistConfig};
pub use classifier::{DeviceClassifier, DEFAULT_MOBILE_TOKENS};
pub use config::{GateConfig, ServerConfig, DEFAULT_REPORT_PATH};
pub use environment::{HostEnvironment, HostError, HostResult};
pub use error::{Error, Result};
pub use gate::{BrowserGate, GateOutcome};
pub use probe::{failed_checks, probe};
pub use profile::{EnvironmentProfile, Primitive};
pub use redirector::{
    LogNavigator, Navigator, RecordingNavigator, UpgradePages, MOBILE_UPGRADE_PAGE,
    PC_UPGRADE_PAGE,
};
pub use reporter::{report_within, HttpReporter, ReportSink};
pub use storage::{
    FileStore, KeyValueStore, MemoryStore, PROMPTED_KEY, PROMPT_EXPIRES_KEY, REDIRECT_KEY,
};
pub use throttle::{should_act, PromptThrottle, DEFAULT_COOLDOWN_DAYS};
pub use types::*;
pub use upgrade_log::{IncomingReport, UpgradeLog};
