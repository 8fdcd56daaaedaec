//! Protocol constants and configuration defaults.
//!
//! Element and action names are a compatibility contract with the router
//! firmware (AVM UPnP IGD extensions) and must be kept verbatim.

// ═══════════════════════════════════════════════════════════════════════════════
// SOAP ENDPOINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Control path of the WAN IP connection service, relative to the router base URL.
pub const WAN_IP_CONNECTION_PATH: &str = "/igdupnp/control/WANIPConn1";

/// Service type used in the `SOAPAction` header and the request body namespace.
pub const WAN_IP_CONNECTION_SERVICE: &str = "urn:schemas-upnp-org:service:WANIPConnection:1";

/// Action returning the WAN IPv4 address.
pub const ACTION_EXTERNAL_IPV4: &str = "GetExternalIPAddress";

/// Action returning the WAN IPv6 address and its lifetimes.
pub const ACTION_EXTERNAL_IPV6: &str = "X_AVM_DE_GetExternalIPv6Address";

/// Action returning the delegated IPv6 prefix and its lifetimes.
pub const ACTION_IPV6_PREFIX: &str = "X_AVM_DE_GetIPv6Prefix";

// ═══════════════════════════════════════════════════════════════════════════════
// RESPONSE ELEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Element carrying the WAN IPv4 address.
pub const ELEMENT_EXTERNAL_IPV4: &str = "NewExternalIPAddress";

/// Element carrying the WAN IPv6 address.
pub const ELEMENT_EXTERNAL_IPV6: &str = "NewExternalIPv6Address";

/// Element carrying the delegated prefix network address.
pub const ELEMENT_IPV6_PREFIX: &str = "NewIPv6Prefix";

/// Element carrying the prefix length of an IPv6 address or prefix.
pub const ELEMENT_PREFIX_LENGTH: &str = "NewPrefixLength";

/// Element carrying the valid lifetime of an IPv6 address or prefix.
pub const ELEMENT_VALID_LIFETIME: &str = "NewValidLifetime";

/// Valid lifetime value signalling that nothing is currently assigned.
pub const LIFETIME_WITHDRAWN: &str = "0";

// ═══════════════════════════════════════════════════════════════════════════════
// DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default router management endpoint.
pub const DEFAULT_ROUTER_URL: &str = "http://192.168.178.1:49000";

/// Default ceiling on a single router call, in seconds.
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 5;

/// Default time before cached addresses are considered stale, in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// Default internal redirect target.
pub const DEFAULT_LOCAL_HOST: &str = "my-server:123";

/// Default upstream that remote clients are passed through to.
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8080";
