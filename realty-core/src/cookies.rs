//! Cookie policy for session cookies
//!
//! Attributes are derived from how the request reached us: behind TLS the
//! cookie is `Secure; SameSite=None` so the app still works when embedded
//! cross-site, otherwise `SameSite=Lax` without `Secure`.
//!
//! A browser only drops a cookie when the clearing `Set-Cookie` matches the
//! attributes it was stored with, so clearing emits one header per policy
//! variant that may have been used to set it.

use cookie::time::Duration as CookieDuration;
use cookie::Cookie;

/// Path every session cookie is scoped to
pub const COOKIE_PATH: &str = "/";

/// How the request reached the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Secure,
    Insecure,
}

impl Transport {
    /// Detect transport security.
    ///
    /// `X-Forwarded-Proto` wins when present: it may be a comma-separated
    /// list (one entry per proxy hop) and counts as secure if any entry is
    /// `https`. Without it, the request URL scheme decides.
    pub fn detect(forwarded_proto: Option<&str>, scheme: Option<&str>) -> Self {
        if let Some(forwarded) = forwarded_proto {
            let secure = forwarded
                .split(',')
                .any(|proto| proto.trim().eq_ignore_ascii_case("https"));
            return if secure {
                Transport::Secure
            } else {
                Transport::Insecure
            };
        }

        match scheme {
            Some(s) if s.eq_ignore_ascii_case("https") => Transport::Secure,
            _ => Transport::Insecure,
        }
    }
}

/// SameSite values this application sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SameSite {
    Lax,
    None,
}

impl From<SameSite> for cookie::SameSite {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        }
    }
}

/// The attribute combination a cookie is written with.
/// `HttpOnly` and `Path=/` are always applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookiePolicy {
    /// Combinations older releases may have written cookies with
    pub const FALLBACKS: [CookiePolicy; 2] = [
        CookiePolicy {
            secure: false,
            same_site: SameSite::Lax,
        },
        CookiePolicy {
            secure: true,
            same_site: SameSite::None,
        },
    ];

    /// Derive the policy for a transport
    pub fn for_transport(transport: Transport) -> Self {
        match transport {
            Transport::Secure => CookiePolicy {
                secure: true,
                same_site: SameSite::None,
            },
            Transport::Insecure => CookiePolicy {
                secure: false,
                same_site: SameSite::Lax,
            },
        }
    }

    /// Derive the policy straight from request transport hints
    pub fn derive(forwarded_proto: Option<&str>, scheme: Option<&str>) -> Self {
        Self::for_transport(Transport::detect(forwarded_proto, scheme))
    }

    /// Build a cookie under this policy that lives for `max_age_secs`
    pub fn build(&self, name: &str, value: &str, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((name.to_string(), value.to_string()))
            .path(COOKIE_PATH)
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site.into())
            .max_age(CookieDuration::seconds(max_age_secs))
            .build()
    }

    /// `Set-Cookie` value storing `value` under this policy
    pub fn set_header(&self, name: &str, value: &str, max_age_secs: i64) -> String {
        self.build(name, value, max_age_secs).to_string()
    }

    /// `Set-Cookie` value that expires `name` under this policy
    pub fn clear_header(&self, name: &str) -> String {
        self.build(name, "", 0).to_string()
    }
}

/// Policies to clear under: the current one first, then the fallbacks,
/// without repeats.
pub fn clear_policies(current: CookiePolicy) -> Vec<CookiePolicy> {
    let mut policies = Vec::with_capacity(1 + CookiePolicy::FALLBACKS.len());
    for policy in std::iter::once(current).chain(CookiePolicy::FALLBACKS) {
        if !policies.contains(&policy) {
            policies.push(policy);
        }
    }
    policies
}

/// Drop repeated header values, keeping first-seen order
pub fn dedupe(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// Every `Set-Cookie` value needed to clear `name`
pub fn clear_variants(name: &str, current: CookiePolicy) -> Vec<String> {
    dedupe(
        clear_policies(current)
            .into_iter()
            .map(|policy| policy.clear_header(name)),
    )
}

/// Clear variants for several cookie names, in name order
pub fn clear_all(names: &[&str], current: CookiePolicy) -> Vec<String> {
    dedupe(
        names
            .iter()
            .flat_map(|name| clear_variants(name, current)),
    )
}
