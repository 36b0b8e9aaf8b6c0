use super::checklist::{Check, CheckGroup, Checklist};
use super::classifier::DeviceClassifier;
use super::config::GateConfig;
use super::environment::HostEnvironment;
use super::error::Result;
use super::probe::failed_checks;
use super::redirector::{Navigator, UpgradePages};
use super::reporter::{report_within, ReportSink};
use super::storage::{KeyValueStore, REDIRECT_KEY};
use super::throttle::{should_act, PromptThrottle};
use super::types::{CheckTypeLabels, DeviceType, DiagnosticRecord, PageContext, ReportOutcome};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, warn};

/// What a gate run decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The host is exempt; nothing was probed or stored.
    Bypassed,
    Supported,
    /// Unsupported, but already prompted within the cooldown.
    Throttled { reasons: Vec<String> },
    Redirected {
        target: String,
        reasons: Vec<String>,
        /// `None` when the grace period ran out before the report finished.
        delivery: Option<ReportOutcome>,
    },
}

/// Runs the page-load flow: probe, throttle, report, redirect.
pub struct BrowserGate {
    checklist: Checklist,
    classifier: DeviceClassifier,
    pages: UpgradePages,
    bypass_hosts: Vec<String>,
    cooldown: chrono::Duration,
    grace: Duration,
    redirect_delay: Duration,
    tagged_report: bool,
}

const AUX_REPORT_PREFIX: &str = "辅助特性：";

impl BrowserGate {
    pub fn new(config: &GateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            checklist: Checklist::from_config(&config.checklist),
            classifier: DeviceClassifier::new(&config.mobile_tokens)?,
            pages: config.pages.clone(),
            bypass_hosts: config.bypass_hosts.clone(),
            cooldown: config.cooldown(),
            grace: config.grace(),
            redirect_delay: config.redirect_delay(),
            tagged_report: config.tagged_report,
        })
    }

    pub fn checklist(&self) -> &Checklist {
        &self.checklist
    }

    pub fn is_bypassed(&self, page: &PageContext) -> bool {
        self.bypass_hosts
            .iter()
            .any(|host| host.eq_ignore_ascii_case(&page.hostname))
    }

    pub async fn run<S: KeyValueStore + ?Sized>(
        &self,
        page: &PageContext,
        host: &dyn HostEnvironment,
        store: &mut S,
        sink: &dyn ReportSink,
        navigator: &mut dyn Navigator,
    ) -> GateOutcome {
        self.run_at(page, host, store, sink, navigator, Utc::now())
            .await
    }

    /// [`run`](Self::run) with an explicit clock reading.
    pub async fn run_at<S: KeyValueStore + ?Sized>(
        &self,
        page: &PageContext,
        host: &dyn HostEnvironment,
        store: &mut S,
        sink: &dyn ReportSink,
        navigator: &mut dyn Navigator,
        now: DateTime<Utc>,
    ) -> GateOutcome {
        if self.is_bypassed(page) {
            info!(host = %page.hostname, "bypassed host, skipping capability check");
            return GateOutcome::Bypassed;
        }

        let failed = failed_checks(host, &self.checklist);
        if failed.is_empty() {
            info!("client supports every checked feature");
            return GateOutcome::Supported;
        }
        let reasons: Vec<String> = failed.iter().map(|c| c.reason.clone()).collect();
        info!(reasons = ?reasons, "client is missing features");

        let mut throttle = PromptThrottle::with_cooldown(store, self.cooldown);
        let state = match throttle.load() {
            Ok(state) => state,
            Err(e) => {
                // Without readable state we cannot bound the prompts.
                warn!(error = %e, "prompt state unreadable, not prompting");
                return GateOutcome::Throttled { reasons };
            }
        };
        if !should_act(&state, now) {
            info!(expires_at = ?state.expires_at, "already prompted, not redirecting");
            return GateOutcome::Throttled { reasons };
        }

        if let Err(e) = throttle.record_prompt(now) {
            warn!(error = %e, "failed to persist prompt state");
        }
        drop(throttle);
        if let Err(e) = store.set(REDIRECT_KEY, &page.url) {
            warn!(error = %e, "failed to remember return URL");
        }

        let device = self.classifier.classify(&page.user_agent);
        let record = self.diagnostic_record(page, device, &failed, now);
        let delivery = report_within(sink, &record, self.grace).await;

        tokio::time::sleep(self.redirect_delay).await;
        let target = self.pages.redirect_url(device).to_string();
        info!(device = %device, target = %target, "redirecting to upgrade page");
        navigator.navigate(&target);

        GateOutcome::Redirected {
            target,
            reasons,
            delivery,
        }
    }

    fn diagnostic_record(
        &self,
        page: &PageContext,
        device: DeviceType,
        failed: &[&Check],
        now: DateTime<Utc>,
    ) -> DiagnosticRecord {
        let reasons = failed
            .iter()
            .map(|check| match check.id.group() {
                CheckGroup::Aux if self.tagged_report => {
                    format!("{AUX_REPORT_PREFIX}{}", check.reason)
                }
                _ => check.reason.clone(),
            })
            .collect();
        let record = DiagnosticRecord::new(&page.user_agent, &page.url, device, reasons, now);
        if self.tagged_report {
            record.with_check_type(CheckTypeLabels::default())
        } else {
            record
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::CheckId;
    use crate::profile::EnvironmentProfile;
    use crate::redirector::{RecordingNavigator, PC_UPGRADE_PAGE};
    use crate::storage::{MemoryStore, PROMPTED_KEY};
    use crate::types::PromptState;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Captured(Mutex<Vec<DiagnosticRecord>>);

    #[async_trait]
    impl ReportSink for Captured {
        async fn report(&self, record: &DiagnosticRecord) -> ReportOutcome {
            self.0.lock().unwrap().push(record.clone());
            ReportOutcome::Delivered
        }
    }

    const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 6.1; Trident/7.0; rv:11.0) like Gecko";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    fn gate() -> BrowserGate {
        let config = GateConfig {
            redirect_delay_ms: 0,
            ..GateConfig::default()
        };
        BrowserGate::new(&config).unwrap()
    }

    #[tokio::test]
    async fn localhost_is_bypassed() {
        let page = PageContext::new("http://localhost:3000/", DESKTOP_UA);
        let host = EnvironmentProfile::default();
        let mut store = MemoryStore::new();
        let sink = Captured::default();
        let mut nav = RecordingNavigator::default();

        let outcome = gate()
            .run_at(&page, &host, &mut store, &sink, &mut nav, now())
            .await;
        assert_eq!(outcome, GateOutcome::Bypassed);
        assert!(nav.visited.is_empty());
        assert_eq!(store.get(PROMPTED_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn backslash_url_on_localhost_is_bypassed() {
        let page = PageContext::new("http://localhost\\admin", DESKTOP_UA);
        let mut store = MemoryStore::new();
        let sink = Captured::default();
        let mut nav = RecordingNavigator::default();

        let outcome = gate()
            .run_at(&page, &EnvironmentProfile::default(), &mut store, &sink, &mut nav, now())
            .await;
        assert_eq!(outcome, GateOutcome::Bypassed);
    }

    #[tokio::test]
    async fn supported_client_is_left_alone() {
        let page = PageContext::new("https://shop.example.com/", DESKTOP_UA);
        let mut store = MemoryStore::new();
        let sink = Captured::default();
        let mut nav = RecordingNavigator::default();

        let outcome = gate()
            .run_at(&page, &EnvironmentProfile::evergreen(), &mut store, &sink, &mut nav, now())
            .await;
        assert_eq!(outcome, GateOutcome::Supported);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_desktop_is_reported_and_redirected() {
        let config = GateConfig {
            redirect_delay_ms: 0,
            ..GateConfig::default()
        };
        let gate = BrowserGate::new(&config).unwrap();
        // Only the fetch check, so the reasons are exactly one entry.
        let gate = BrowserGate {
            checklist: Checklist::from_ids([CheckId::Fetch]),
            ..gate
        };
        let page = PageContext::new("https://shop.example.com/cart", DESKTOP_UA);
        let host = EnvironmentProfile::evergreen().without_global("fetch");
        let mut store = MemoryStore::new();
        let sink = Captured::default();
        let mut nav = RecordingNavigator::default();

        let outcome = gate
            .run_at(&page, &host, &mut store, &sink, &mut nav, now())
            .await;

        assert_eq!(
            outcome,
            GateOutcome::Redirected {
                target: PC_UPGRADE_PAGE.to_string(),
                reasons: vec!["缺少fetch API".to_string()],
                delivery: Some(ReportOutcome::Delivered),
            }
        );
        assert_eq!(nav.visited, vec![PC_UPGRADE_PAGE.to_string()]);

        let sent = sink.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].device_type.as_str(), "pc");
        assert_eq!(sent[0].reasons, vec!["缺少fetch API".to_string()]);
        assert_eq!(sent[0].url, "https://shop.example.com/cart");

        let throttle = PromptThrottle::new(&mut store);
        assert_eq!(
            throttle.load().unwrap(),
            PromptState::prompted_until(now() + chrono::Duration::days(30))
        );
        assert_eq!(
            store.get(REDIRECT_KEY).unwrap().as_deref(),
            Some("https://shop.example.com/cart")
        );
    }

    #[tokio::test]
    async fn prompted_client_is_throttled() {
        let page = PageContext::new("https://shop.example.com/", DESKTOP_UA);
        let host = EnvironmentProfile::evergreen().without_global("Promise");
        let mut store = MemoryStore::new();
        PromptThrottle::new(&mut store)
            .record_prompt(now() - chrono::Duration::days(20))
            .unwrap();
        let sink = Captured::default();
        let mut nav = RecordingNavigator::default();

        let outcome = gate()
            .run_at(&page, &host, &mut store, &sink, &mut nav, now())
            .await;

        assert_eq!(
            outcome,
            GateOutcome::Throttled {
                reasons: vec!["缺少Promise支持".to_string()]
            }
        );
        assert!(sink.0.lock().unwrap().is_empty());
        assert!(nav.visited.is_empty());
    }

    #[tokio::test]
    async fn expired_prompt_fires_again() {
        let page = PageContext::new("https://shop.example.com/", DESKTOP_UA);
        let host = EnvironmentProfile::evergreen().without_global("Promise");
        let mut store = MemoryStore::new();
        PromptThrottle::new(&mut store)
            .record_prompt(now() - chrono::Duration::days(31))
            .unwrap();
        let sink = Captured::default();
        let mut nav = RecordingNavigator::default();

        let outcome = gate()
            .run_at(&page, &host, &mut store, &sink, &mut nav, now())
            .await;
        assert!(matches!(outcome, GateOutcome::Redirected { .. }));
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tagged_report_marks_auxiliary_reasons() {
        let config = GateConfig {
            redirect_delay_ms: 0,
            tagged_report: true,
            ..GateConfig::default()
        };
        let gate = BrowserGate::new(&config).unwrap();
        let page = PageContext::new("https://shop.example.com/", DESKTOP_UA);
        let host = EnvironmentProfile::evergreen()
            .without_global("Proxy")
            .without_global("Promise");
        let mut store = MemoryStore::new();
        let sink = Captured::default();
        let mut nav = RecordingNavigator::default();

        let outcome = gate
            .run_at(&page, &host, &mut store, &sink, &mut nav, now())
            .await;

        // The outcome keeps the plain reasons; only the payload is tagged.
        match outcome {
            GateOutcome::Redirected { reasons, .. } => {
                assert_eq!(reasons, ["核心API：Proxy", "缺少Promise支持"]);
            }
            other => panic!("expected redirect, got {other:?}"),
        }
        let sent = sink.0.lock().unwrap();
        assert_eq!(sent[0].reasons, ["核心API：Proxy", "辅助特性：缺少Promise支持"]);
        assert_eq!(sent[0].check_type, Some(CheckTypeLabels::default()));
    }
}
