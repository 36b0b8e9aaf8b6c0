/// Failure raised by a host primitive.
///
/// The probe never lets one of these escape a single check; a failing
/// primitive only means the feature it backs is absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("{0} is not available")]
    Unavailable(&'static str),
    #[error("{primitive} raised: {message}")]
    Raised {
        primitive: &'static str,
        message: String,
    },
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// The client runtime a capability probe runs against.
///
/// Lookups answer "is this name exposed"; the fallible methods perform an
/// actual operation and may fail the way the runtime would.
pub trait HostEnvironment {
    /// A property on the global object (`'fetch' in window`).
    fn has_global(&self, name: &str) -> bool;

    /// A member reachable from a global, e.g. `("Array", "findLast")` for
    /// `Array.prototype.findLast` or `("JSON", "parse")`.
    fn has_member(&self, owner: &str, member: &str) -> bool;

    /// A member on a freshly created element.
    fn element_has(&self, member: &str) -> bool;

    fn document_has(&self, member: &str) -> bool;

    fn navigator_has(&self, member: &str) -> bool;

    /// A property on an element's inline style declaration.
    fn style_has(&self, property: &str) -> bool;

    /// A member on the style declaration's `background` value.
    fn background_has(&self, member: &str) -> bool;

    /// `document.queryCommandSupported(command)`.
    fn query_command_supported(&self, command: &str) -> HostResult<bool>;

    /// Assign one `document.cookie` string.
    fn set_cookie(&self, cookie: &str) -> HostResult<()>;

    /// Read the full `document.cookie` string.
    fn cookies(&self) -> HostResult<String>;

    /// Append a header to a freshly constructed response object.
    fn append_response_header(&self, name: &str, value: &str) -> HostResult<()>;

    /// Build a form-data object, append `key=value`, and report whether it
    /// then answers membership for `key`.
    fn form_data_round_trip(&self, key: &str, value: &str) -> HostResult<bool>;

    /// Serialize pairs with the runtime's query-string encoder.
    fn encode_query(&self, pairs: &[(&str, &str)]) -> HostResult<String>;

    /// Issue an encoded POST to `target` and report whether the runtime
    /// handed back an asynchronous handle for it.
    fn post_encoded(&self, target: &str, body: &str) -> HostResult<bool>;
}
