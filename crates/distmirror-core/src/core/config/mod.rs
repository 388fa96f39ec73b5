//! Run configuration and environment-driven network settings.

pub mod settings;

pub use settings::*;
use std::env;

pub(crate) const KEEP_PROXIES_ENV: &str = "DISTMIRROR_KEEP_PROXIES";

/// Decide whether the HTTP client should honor standard proxy variables.
///
/// Behavior:
/// - `DISTMIRROR_KEEP_PROXIES=1/true/yes/on` forces proxies on.
/// - `DISTMIRROR_KEEP_PROXIES=0/false/no/off/""` forces proxies off.
/// - If unset, proxies are enabled only when at least one proxy env var is set.
pub(crate) fn keep_proxies() -> bool {
    match env::var(KEEP_PROXIES_ENV) {
        Ok(raw) => {
            let value = raw.trim().to_ascii_lowercase();
            !matches!(value.as_str(), "" | "0" | "false" | "no" | "off")
        }
        Err(_) => {
            const PROXY_KEYS: &[&str] = &[
                "HTTP_PROXY",
                "http_proxy",
                "HTTPS_PROXY",
                "https_proxy",
                "ALL_PROXY",
                "all_proxy",
            ];
            PROXY_KEYS.iter().any(|key| {
                env::var(key)
                    .ok()
                    .is_some_and(|value| !value.trim().is_empty())
            })
        }
    }
}
