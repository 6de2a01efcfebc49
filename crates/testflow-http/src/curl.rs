//! Renders the cURL-equivalent command line for a request attempt, used in
//! reports and failure messages.

use std::collections::BTreeMap;

use serde_json::Value;

pub fn to_curl(method: &str, url: &str, headers: &BTreeMap<String, String>, body: Option<&Value>) -> String {
    let mut parts = vec!["curl".to_string(), "-X".to_string(), method.to_string()];
    for (name, value) in headers {
        parts.push("-H".to_string());
        parts.push(format!("'{name}: {value}'"));
    }
    if let Some(body) = body {
        parts.push("-d".to_string());
        parts.push(format!("'{}'", body.to_string().replace('\'', "'\\''")));
    }
    parts.push(format!("'{url}'"));
    parts.join(" ")
}
