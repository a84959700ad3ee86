use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use crate::types::{OperationMode, Zone};

pub const DEFAULT_BASE_URL: &str = "https://salus-it500.com";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36";

pub(crate) const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

pub(crate) const LOGIN_PATH: &str = "/public/login.php";
pub(crate) const CONTROL_PATH: &str = "/public/control.php";
pub(crate) const TELEMETRY_PATH: &str = "/public/ajax_device_values.php";
pub(crate) const COMMAND_PATH: &str = "/includes/set.php";

/// Name of the cache-busting query parameter. The portal ignores any other name.
pub(crate) const CACHE_BUSTER: &str = "_";

pub type Form = Vec<(String, String)>;

fn pair(k: impl Into<String>, v: impl Into<String>) -> (String, String) {
    (k.into(), v.into())
}

pub fn login_form(username: &str, password: &str) -> Form {
    vec![
        pair("IDemail", username),
        pair("password", password),
        pair("login", "Login"),
        pair("keep_logged_in", "1"),
    ]
}

pub fn control_page_query(device_id: &str) -> Form {
    vec![pair("devId", device_id)]
}

pub fn telemetry_query(device_id: &str, token: &str, now_ms: i64) -> Form {
    vec![
        pair("devId", device_id),
        pair("token", token),
        pair(CACHE_BUSTER, now_ms.to_string()),
    ]
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn set_temperature_form(token: &str, device_id: &str, zone: Zone, celsius: f64) -> Form {
    let z = zone.suffix();
    vec![
        pair("token", token),
        pair("devId", device_id),
        pair("tempUnit", "0"),
        pair(format!("current_temp{z}_set"), "1"),
        pair(format!("current_temp{z}"), format!("{celsius:.1}")),
    ]
}

/// OFF is `auto=1`, HEAT is `auto=0`; both commit with `auto_set<Z>=1`.
pub fn set_mode_form(token: &str, device_id: &str, zone: Zone, mode: OperationMode) -> Form {
    let auto = match mode {
        OperationMode::Off => "1",
        OperationMode::On => "0",
    };
    vec![
        pair("token", token),
        pair("devId", device_id),
        pair("auto", auto),
        pair(format!("auto_set{}", zone.suffix()), "1"),
    ]
}

static TOKEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<[^<>]*[\s'"]id\s*=\s*['"]token['"][^<>]*>"#)
        .expect("valid token tag regex")
});

static VALUE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|[\s'"])value\s*=\s*['"]([^'"]+)['"]"#)
        .expect("valid value attr regex")
});

/// Pull the session token out of the control page's hidden `id="token"` input.
/// Quote style and attribute order do not matter.
pub fn extract_token(html: &str) -> Option<String> {
    TOKEN_TAG.find_iter(html).find_map(|tag| {
        VALUE_ATTR
            .captures(tag.as_str())
            .map(|c| c[1].to_string())
    })
}
