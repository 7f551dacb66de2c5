//! API key generation: `pa_v3_<millis base36>_<random base36>_<host suffix>`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

const KEY_PREFIX: &str = "pa_v3";
const RANDOM_LEN: usize = 16;
const HOST_SUFFIX_LEN: usize = 8;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn generate_api_key(now: DateTime<Utc>, host: &str) -> String {
    let timestamp = to_base36(now.timestamp_millis().max(0) as u128);
    let random = random_segment();
    let host_suffix = host_suffix(host);
    format!("{KEY_PREFIX}_{timestamp}_{random}_{host_suffix}")
}

/// Key for the current time and this machine's host name.
pub fn generate_local_api_key() -> String {
    let host = hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string());
    generate_api_key(Utc::now(), &host)
}

fn random_segment() -> String {
    let digits = to_base36(Uuid::new_v4().as_u128());
    let start = digits.len().saturating_sub(RANDOM_LEN);
    format!("{:0>width$}", &digits[start..], width = RANDOM_LEN)
}

fn host_suffix(host: &str) -> String {
    let chars: Vec<char> = host.chars().collect();
    let start = chars.len().saturating_sub(HOST_SUFFIX_LEN);
    chars[start..].iter().collect()
}

fn to_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
