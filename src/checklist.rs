use super::environment::{HostEnvironment, HostResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which half of the checklist a check belongs to.
///
/// Core checks cover language and rendering features the site cannot
/// polyfill; auxiliary checks cover the DOM, storage and network surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckGroup {
    Core,
    Aux,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckId {
    Proxy,
    ArrayFindLast,
    CssContentVisibility,
    Fetch,
    Promise,
    UrlSearchParams,
    ClassList,
    LocalStorage,
    SessionStorage,
    RequestAnimationFrame,
    Json,
    BoundingClientRect,
    DispatchEvent,
    Closest,
    AddEventListener,
    Cookie,
    SameSiteCookie,
    FormData,
    FormDataMembership,
    Clipboard,
    IntersectionObserver,
    AbortController,
    XmlHttpRequest,
    EncodedPost,
    CssBackdrop,
}

impl CheckId {
    pub const CORE: [CheckId; 3] = [
        Self::Proxy,
        Self::ArrayFindLast,
        Self::CssContentVisibility,
    ];

    pub const AUX: [CheckId; 22] = [
        Self::Fetch,
        Self::Promise,
        Self::UrlSearchParams,
        Self::ClassList,
        Self::LocalStorage,
        Self::SessionStorage,
        Self::RequestAnimationFrame,
        Self::Json,
        Self::BoundingClientRect,
        Self::DispatchEvent,
        Self::Closest,
        Self::AddEventListener,
        Self::Cookie,
        Self::SameSiteCookie,
        Self::FormData,
        Self::FormDataMembership,
        Self::Clipboard,
        Self::IntersectionObserver,
        Self::AbortController,
        Self::XmlHttpRequest,
        Self::EncodedPost,
        Self::CssBackdrop,
    ];

    pub fn group(&self) -> CheckGroup {
        match self {
            Self::Proxy | Self::ArrayFindLast | Self::CssContentVisibility => CheckGroup::Core,
            _ => CheckGroup::Aux,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proxy => "proxy",
            Self::ArrayFindLast => "array_find_last",
            Self::CssContentVisibility => "css_content_visibility",
            Self::Fetch => "fetch",
            Self::Promise => "promise",
            Self::UrlSearchParams => "url_search_params",
            Self::ClassList => "class_list",
            Self::LocalStorage => "local_storage",
            Self::SessionStorage => "session_storage",
            Self::RequestAnimationFrame => "request_animation_frame",
            Self::Json => "json",
            Self::BoundingClientRect => "bounding_client_rect",
            Self::DispatchEvent => "dispatch_event",
            Self::Closest => "closest",
            Self::AddEventListener => "add_event_listener",
            Self::Cookie => "cookie",
            Self::SameSiteCookie => "same_site_cookie",
            Self::FormData => "form_data",
            Self::FormDataMembership => "form_data_membership",
            Self::Clipboard => "clipboard",
            Self::IntersectionObserver => "intersection_observer",
            Self::AbortController => "abort_controller",
            Self::XmlHttpRequest => "xml_http_request",
            Self::EncodedPost => "encoded_post",
            Self::CssBackdrop => "css_backdrop",
        }
    }

    /// Reason reported when this check fails, unless overridden.
    pub fn default_reason(&self) -> &'static str {
        match self {
            Self::Proxy => "核心API：Proxy",
            Self::ArrayFindLast => "核心API：Array.findLast",
            Self::CssContentVisibility => "核心API：CSS contentVisibility",
            Self::Fetch => "缺少fetch API",
            Self::Promise => "缺少Promise支持",
            Self::UrlSearchParams => "缺少URLSearchParams",
            Self::ClassList => "不支持classList",
            Self::LocalStorage => "不支持localStorage",
            Self::SessionStorage => "不支持sessionStorage",
            Self::RequestAnimationFrame => "缺少requestAnimationFrame",
            Self::Json => "JSON功能异常",
            Self::BoundingClientRect => "缺少getBoundingClientRect",
            Self::DispatchEvent => "缺少dispatchEvent",
            Self::Closest => "缺少closest方法",
            Self::AddEventListener => "缺少addEventListener",
            Self::Cookie => "Cookie操作失败",
            Self::SameSiteCookie => "不支持SameSite Cookie",
            Self::FormData => "缺少FormData",
            Self::FormDataMembership => "FormData功能异常",
            Self::Clipboard => "剪贴板功能异常",
            Self::IntersectionObserver => "缺少IntersectionObserver",
            Self::AbortController => "缺少AbortController",
            Self::XmlHttpRequest => "缺少XMLHttpRequest",
            Self::EncodedPost => "fetch功能异常",
            Self::CssBackdrop => "CSS特性不支持（backdrop-filter/gradient）",
        }
    }

    /// Run the feature test. `Ok(true)` means the feature is present.
    pub(crate) fn evaluate(&self, host: &dyn HostEnvironment) -> HostResult<bool> {
        Ok(match self {
            Self::Proxy => host.has_global("Proxy"),
            Self::ArrayFindLast => host.has_member("Array", "findLast"),
            Self::CssContentVisibility => host.style_has("contentVisibility"),
            Self::Fetch => host.has_global("fetch"),
            Self::Promise => host.has_global("Promise"),
            Self::UrlSearchParams => host.has_global("URLSearchParams"),
            Self::ClassList => host.element_has("classList"),
            Self::LocalStorage => host.has_global("localStorage"),
            Self::SessionStorage => host.has_global("sessionStorage"),
            Self::RequestAnimationFrame => host.has_global("requestAnimationFrame"),
            Self::Json => {
                host.has_global("JSON")
                    && host.has_member("JSON", "parse")
                    && host.has_member("JSON", "stringify")
            }
            Self::BoundingClientRect => host.element_has("getBoundingClientRect"),
            Self::DispatchEvent => host.element_has("dispatchEvent"),
            Self::Closest => host.element_has("closest"),
            Self::AddEventListener => host.has_global("addEventListener"),
            Self::Cookie => cookie_round_trip(host)?,
            Self::SameSiteCookie => {
                host.append_response_header("Set-Cookie", "foo=bar; SameSite=Lax")?;
                true
            }
            Self::FormData => host.has_global("FormData"),
            // A missing FormData is already reported by its own check.
            Self::FormDataMembership => {
                !host.has_global("FormData") || host.form_data_round_trip("t", "1")?
            }
            Self::Clipboard => {
                host.has_global("ClipboardItem")
                    || (host.document_has("execCommand")
                        && host.query_command_supported("copy")?
                        && host.navigator_has("clipboard"))
            }
            Self::IntersectionObserver => host.has_global("IntersectionObserver"),
            Self::AbortController => host.has_global("AbortController"),
            Self::XmlHttpRequest => host.has_global("XMLHttpRequest"),
            Self::EncodedPost => {
                let body = host.encode_query(&[("t", "123")])?;
                body == "t=123" && host.post_encoded("#", &body)?
            }
            Self::CssBackdrop => {
                host.style_has("backdropFilter")
                    || host.style_has("-webkit-backdrop-filter")
                    || host.background_has("gradient")
            }
        })
    }
}

const COOKIE_MARKER: &str = "test_cookie";

/// Write a marker cookie, look for it, and delete it again.
///
/// Once the marker is written the delete always runs, whatever the read
/// returned. The outcome is decided by the read alone.
fn cookie_round_trip(host: &dyn HostEnvironment) -> HostResult<bool> {
    host.set_cookie(&format!("{COOKIE_MARKER}=1; path=/"))?;
    let found = host
        .cookies()
        .map(|jar| jar.contains(&format!("{COOKIE_MARKER}=")));
    if let Err(err) = host.set_cookie(&format!(
        "{COOKIE_MARKER}=; path=/; expires=Thu, 01 Jan 1970 00:00:00 UTC"
    )) {
        debug!(error = %err, "marker cookie not deleted");
    }
    found
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub id: CheckId,
    pub reason: String,
}

impl Check {
    pub fn new(id: CheckId) -> Self {
        Self {
            id,
            reason: id.default_reason().to_string(),
        }
    }
}

/// Ordered list of checks a probe runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checklist {
    checks: Vec<Check>,
    /// Skip the auxiliary checks once any core check has failed.
    gate_on_core: bool,
}

impl Checklist {
    /// Core APIs followed by the auxiliary features, as one flat list.
    pub fn full() -> Self {
        Self::from_ids(CheckId::CORE.iter().chain(CheckId::AUX.iter()).copied())
    }

    /// The auxiliary features only.
    pub fn aux_only() -> Self {
        Self::from_ids(CheckId::AUX)
    }

    pub fn from_ids(ids: impl IntoIterator<Item = CheckId>) -> Self {
        Self {
            checks: ids.into_iter().map(Check::new).collect(),
            gate_on_core: false,
        }
    }

    pub fn gate_on_core(mut self, enabled: bool) -> Self {
        self.gate_on_core = enabled;
        self
    }

    pub fn with_reason(mut self, id: CheckId, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        for check in self.checks.iter_mut().filter(|c| c.id == id) {
            check.reason = reason.clone();
        }
        self
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn gates_on_core(&self) -> bool {
        self.gate_on_core
    }

    pub fn from_config(config: &ChecklistConfig) -> Self {
        let base = if config.include_core {
            Self::full()
        } else {
            Self::aux_only()
        };
        let mut list = Self {
            checks: base
                .checks
                .into_iter()
                .filter(|c| !config.disabled.contains(&c.id))
                .collect(),
            gate_on_core: config.gate_on_core,
        };
        for (id, reason) in &config.reasons {
            list = list.with_reason(*id, reason.clone());
        }
        list
    }
}

impl Default for Checklist {
    fn default() -> Self {
        Self::full()
    }
}

/// YAML shape of the checklist section of the gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistConfig {
    pub include_core: bool,
    pub gate_on_core: bool,
    pub disabled: Vec<CheckId>,
    /// Reason overrides, keyed by check id.
    pub reasons: IndexMap<CheckId, String>,
}

impl Default for ChecklistConfig {
    fn default() -> Self {
        Self {
            include_core: true,
            gate_on_core: false,
            disabled: Vec::new(),
            reasons: IndexMap::new(),
        }
    }
}
