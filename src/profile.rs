use super::config::load_yaml;
use super::environment::{HostEnvironment, HostError, HostResult};
use super::error::Result;
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use url::form_urlencoded;

/// Host primitives a profile can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    QueryCommandSupported,
    SetCookie,
    Cookies,
    AppendResponseHeader,
    FormDataRoundTrip,
    EncodeQuery,
    PostEncoded,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QueryCommandSupported => "queryCommandSupported",
            Self::SetCookie => "document.cookie=",
            Self::Cookies => "document.cookie",
            Self::AppendResponseHeader => "Headers.append",
            Self::FormDataRoundTrip => "FormData",
            Self::EncodeQuery => "URLSearchParams.toString",
            Self::PostEncoded => "fetch",
        }
    }
}

/// A declarative description of what a client runtime exposes.
///
/// Profiles are plain YAML:
///
/// ```yaml
/// name: legacy-webview
/// globals: [Promise, JSON, localStorage]
/// members: { JSON: [parse, stringify] }
/// element: [classList]
/// style: []
/// cookies_enabled: true
/// faults: [append_response_header]
/// ```
///
/// Missing lists mean "nothing exposed", so a profile only names what the
/// runtime has. The cookie jar is live: cookies written through
/// [`HostEnvironment::set_cookie`] are visible to later reads.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EnvironmentProfile {
    pub name: String,
    pub globals: HashSet<String>,
    /// Owner name → members reachable from it (`Array` → `findLast`).
    pub members: HashMap<String, HashSet<String>>,
    pub element: HashSet<String>,
    pub document: HashSet<String>,
    pub navigator: HashSet<String>,
    pub style: HashSet<String>,
    pub background: HashSet<String>,
    /// Editing commands answered as supported by `queryCommandSupported`.
    pub commands: HashSet<String>,
    pub cookies_enabled: bool,
    /// Whether a `SameSite` attribute on `Set-Cookie` is accepted.
    pub same_site: bool,
    pub form_data_membership: bool,
    /// Whether `fetch` hands back a promise for an encoded POST.
    pub fetch_returns_promise: bool,
    pub faults: HashSet<Primitive>,
    #[serde(skip)]
    jar: Mutex<Vec<(String, String)>>,
}

fn set_of(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl EnvironmentProfile {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        load_yaml(path.as_ref())
    }

    /// A current browser that passes every check.
    pub fn evergreen() -> Self {
        let mut members = HashMap::new();
        members.insert("Array".to_string(), set_of(&["findLast", "at", "flat"]));
        members.insert("JSON".to_string(), set_of(&["parse", "stringify"]));
        Self {
            name: "evergreen".to_string(),
            globals: set_of(&[
                "Proxy",
                "fetch",
                "Promise",
                "URLSearchParams",
                "localStorage",
                "sessionStorage",
                "requestAnimationFrame",
                "JSON",
                "addEventListener",
                "Response",
                "FormData",
                "ClipboardItem",
                "IntersectionObserver",
                "AbortController",
                "XMLHttpRequest",
            ]),
            members,
            element: set_of(&[
                "classList",
                "getBoundingClientRect",
                "dispatchEvent",
                "closest",
            ]),
            document: set_of(&["execCommand", "queryCommandSupported"]),
            navigator: set_of(&["clipboard"]),
            style: set_of(&["contentVisibility", "backdropFilter"]),
            background: HashSet::new(),
            commands: set_of(&["copy"]),
            cookies_enabled: true,
            same_site: true,
            form_data_membership: true,
            fetch_returns_promise: true,
            faults: HashSet::new(),
            jar: Mutex::default(),
        }
    }

    pub fn without_global(mut self, name: &str) -> Self {
        self.globals.remove(name);
        self
    }

    pub fn without_style(mut self, property: &str) -> Self {
        self.style.remove(property);
        self
    }

    pub fn with_fault(mut self, primitive: Primitive) -> Self {
        self.faults.insert(primitive);
        self
    }

    fn check_fault(&self, primitive: Primitive) -> HostResult<()> {
        if self.faults.contains(&primitive) {
            return Err(HostError::Raised {
                primitive: primitive.as_str(),
                message: "profile fault".to_string(),
            });
        }
        Ok(())
    }

    fn require_global(&self, name: &'static str) -> HostResult<()> {
        if self.globals.contains(name) {
            Ok(())
        } else {
            Err(HostError::Unavailable(name))
        }
    }

    fn jar(&self) -> HostResult<std::sync::MutexGuard<'_, Vec<(String, String)>>> {
        self.jar.lock().map_err(|_| HostError::Raised {
            primitive: "document.cookie",
            message: "cookie jar poisoned".to_string(),
        })
    }
}

impl HostEnvironment for EnvironmentProfile {
    fn has_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    fn has_member(&self, owner: &str, member: &str) -> bool {
        self.members
            .get(owner)
            .map_or(false, |members| members.contains(member))
    }

    fn element_has(&self, member: &str) -> bool {
        self.element.contains(member)
    }

    fn document_has(&self, member: &str) -> bool {
        self.document.contains(member)
    }

    fn navigator_has(&self, member: &str) -> bool {
        self.navigator.contains(member)
    }

    fn style_has(&self, property: &str) -> bool {
        self.style.contains(property)
    }

    fn background_has(&self, member: &str) -> bool {
        self.background.contains(member)
    }

    fn query_command_supported(&self, command: &str) -> HostResult<bool> {
        self.check_fault(Primitive::QueryCommandSupported)?;
        if !self.document.contains("queryCommandSupported") {
            return Err(HostError::Unavailable("document.queryCommandSupported"));
        }
        Ok(self.commands.contains(command))
    }

    fn set_cookie(&self, cookie: &str) -> HostResult<()> {
        self.check_fault(Primitive::SetCookie)?;
        if !self.cookies_enabled {
            // Blocked cookies are dropped silently, as browsers do.
            return Ok(());
        }
        let Some(parsed) = SetCookie::parse(cookie) else {
            return Ok(());
        };
        let mut jar = self.jar()?;
        jar.retain(|(name, _)| *name != parsed.name);
        if !parsed.expired {
            jar.push((parsed.name, parsed.value));
        }
        Ok(())
    }

    fn cookies(&self) -> HostResult<String> {
        self.check_fault(Primitive::Cookies)?;
        let jar = self.jar()?;
        Ok(jar
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; "))
    }

    fn append_response_header(&self, name: &str, value: &str) -> HostResult<()> {
        self.check_fault(Primitive::AppendResponseHeader)?;
        self.require_global("Response")?;
        let rejects_same_site = name.eq_ignore_ascii_case("set-cookie")
            && value.to_ascii_lowercase().contains("samesite")
            && !self.same_site;
        if rejects_same_site {
            return Err(HostError::Raised {
                primitive: Primitive::AppendResponseHeader.as_str(),
                message: "invalid cookie attribute".to_string(),
            });
        }
        Ok(())
    }

    fn form_data_round_trip(&self, _key: &str, _value: &str) -> HostResult<bool> {
        self.check_fault(Primitive::FormDataRoundTrip)?;
        self.require_global("FormData")?;
        Ok(self.form_data_membership)
    }

    fn encode_query(&self, pairs: &[(&str, &str)]) -> HostResult<String> {
        self.check_fault(Primitive::EncodeQuery)?;
        self.require_global("URLSearchParams")?;
        Ok(form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish())
    }

    fn post_encoded(&self, _target: &str, _body: &str) -> HostResult<bool> {
        self.check_fault(Primitive::PostEncoded)?;
        self.require_global("fetch")?;
        Ok(self.fetch_returns_promise)
    }
}

struct SetCookie {
    name: String,
    value: String,
    expired: bool,
}

impl SetCookie {
    fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let mut expired = false;
        for attr in parts {
            let (key, val) = attr.split_once('=').unwrap_or((attr, ""));
            let val = val.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "expires" => expired |= cookie_date_passed(val),
                "max-age" => expired |= val.parse::<i64>().map_or(false, |age| age <= 0),
                _ => {}
            }
        }
        Some(Self {
            name: name.to_string(),
            value: value.trim().to_string(),
            expired,
        })
    }
}

fn cookie_date_passed(date: &str) -> bool {
    let date = date
        .trim_end_matches(" UTC")
        .trim_end_matches(" GMT")
        .trim();
    NaiveDateTime::parse_from_str(date, "%a, %d %b %Y %H:%M:%S")
        .map_or(false, |at| at.and_utc() <= Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_jar_round_trip() {
        let env = EnvironmentProfile::evergreen();
        env.set_cookie("a=1; path=/").unwrap();
        env.set_cookie("b=2").unwrap();
        assert_eq!(env.cookies().unwrap(), "a=1; b=2");
        env.set_cookie("a=; path=/; expires=Thu, 01 Jan 1970 00:00:00 UTC")
            .unwrap();
        assert_eq!(env.cookies().unwrap(), "b=2");
        env.set_cookie("b=3; max-age=0").unwrap();
        assert_eq!(env.cookies().unwrap(), "");
    }

    #[test]
    fn disabled_cookies_are_dropped() {
        let mut env = EnvironmentProfile::evergreen();
        env.cookies_enabled = false;
        env.set_cookie("a=1").unwrap();
        assert_eq!(env.cookies().unwrap(), "");
    }

    #[test]
    fn encoder_matches_form_rules() {
        let env = EnvironmentProfile::evergreen();
        let encoded = env
            .encode_query(&[("t", "123"), ("q", "a b&c"), ("k", "é*~")])
            .unwrap();
        assert_eq!(encoded, "t=123&q=a+b%26c&k=%C3%A9*%7E");
    }

    #[test]
    fn encoder_needs_url_search_params() {
        let env = EnvironmentProfile::evergreen().without_global("URLSearchParams");
        assert_eq!(
            env.encode_query(&[("t", "1")]),
            Err(HostError::Unavailable("URLSearchParams"))
        );
    }

    #[test]
    fn faults_raise() {
        let env = EnvironmentProfile::evergreen().with_fault(Primitive::Cookies);
        assert!(matches!(env.cookies(), Err(HostError::Raised { .. })));
    }

    #[test]
    fn same_site_rejection() {
        let mut env = EnvironmentProfile::evergreen();
        env.same_site = false;
        assert!(env
            .append_response_header("Set-Cookie", "foo=bar; SameSite=Lax")
            .is_err());
        assert!(env.append_response_header("X-Test", "1").is_ok());
    }

    #[test]
    fn yaml_profile_defaults_to_bare() {
        let env: EnvironmentProfile = serde_yaml::from_str("name: bare\nglobals: [fetch]\n").unwrap();
        assert!(env.has_global("fetch"));
        assert!(!env.has_global("Promise"));
        assert!(!env.cookies_enabled);
    }
}
