//! Internal redirect target.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{RedirectError, Result};

/// Where local clients are sent.
///
/// Accepts `host[:port]` or `scheme://host[:port]`. Only the authority and
/// the optional scheme are kept; the original request path and query are
/// always preserved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTarget {
    /// Host with optional port, e.g. `internal.svc:8080`
    pub authority: String,
    /// Scheme to force; `None` keeps the scheme of the original request
    pub scheme: Option<String>,
}

impl LocalTarget {
    /// Picks the scheme for a redirect, preferring the configured one.
    pub fn scheme_or<'a>(&'a self, original: &'a str) -> &'a str {
        self.scheme.as_deref().unwrap_or(original)
    }
}

impl FromStr for LocalTarget {
    type Err = RedirectError;

    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(RedirectError::InvalidTarget("local host cannot be empty".into()));
        }

        match raw.split_once("://") {
            Some((scheme, _)) => {
                let url = Url::parse(raw)
                    .map_err(|e| RedirectError::InvalidTarget(format!("{raw}: {e}")))?;
                let host = url
                    .host_str()
                    .ok_or_else(|| RedirectError::InvalidTarget(format!("{raw}: missing host")))?;
                let authority = match url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                };

                Ok(Self {
                    authority,
                    scheme: Some(scheme.to_ascii_lowercase()),
                })
            }
            None => {
                // Validated through a throwaway scheme; the authority is kept as written
                // so that an explicit port survives even when it is a default one.
                let url = Url::parse(&format!("http://{raw}"))
                    .map_err(|e| RedirectError::InvalidTarget(format!("{raw}: {e}")))?;
                if url.host_str().is_none() || raw.contains('/') {
                    return Err(RedirectError::InvalidTarget(format!(
                        "{raw}: expected host[:port]"
                    )));
                }

                Ok(Self {
                    authority: raw.to_ascii_lowercase(),
                    scheme: None,
                })
            }
        }
    }
}

impl fmt::Display for LocalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheme {
            Some(scheme) => write!(f, "{scheme}://{}", self.authority),
            None => f.write_str(&self.authority),
        }
    }
}
