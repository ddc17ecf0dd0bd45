//! Access log format module
//!
//! Formats: `combined`, `common`, `json`, or a custom pattern using
//! `$variables`.

use chrono::{DateTime, Local};
use std::time::Duration;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One served request
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: DateTime<Local>,
    pub method: String,
    /// Request target as received, query included
    pub uri: String,
    /// `1.0`, `1.1`, `2`
    pub http_version: String,
    pub status: u16,
    pub body_bytes: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub elapsed: Duration,
}

impl AccessLogEntry {
    /// Create an entry stamped with the current local time
    pub fn new(
        remote_addr: impl Into<String>,
        method: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            remote_addr: remote_addr.into(),
            time: Local::now(),
            method: method.into(),
            uri: uri.into(),
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => format!(
                "{} \"{}\" \"{}\"",
                self.format_common(),
                self.referer.as_deref().unwrap_or("-"),
                self.user_agent.as_deref().unwrap_or("-"),
            ),
            "common" => self.format_common(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn request_line(&self) -> String {
        format!("{} {} HTTP/{}", self.method, self.uri, self.http_version)
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn format_json(&self) -> String {
        let opt = |v: &Option<String>| {
            v.as_deref()
                .map_or_else(|| "null".to_string(), |s| format!("\"{}\"", escape_json(s)))
        };
        format!(
            r#"{{"remote_addr":"{}","time":"{}","method":"{}","uri":"{}","http_version":"{}","status":{},"body_bytes":{},"referer":{},"user_agent":{},"request_time_us":{}}}"#,
            escape_json(&self.remote_addr),
            self.time.to_rfc3339(),
            escape_json(&self.method),
            escape_json(&self.uri),
            escape_json(&self.http_version),
            self.status,
            self.body_bytes,
            opt(&self.referer),
            opt(&self.user_agent),
            self.elapsed.as_micros(),
        )
    }

    /// Substitute `$remote_addr`, `$time_local`, `$time_iso8601`,
    /// `$request`, `$request_method`, `$request_uri`, `$status`,
    /// `$body_bytes_sent`, `$http_referer`, `$http_user_agent` and
    /// `$request_time` (seconds, 3 decimals)
    fn format_custom(&self, pattern: &str) -> String {
        // longer names first so `$request` does not eat `$request_time`
        let vars = [
            ("$remote_addr", self.remote_addr.clone()),
            ("$time_local", self.time.format(CLF_TIME).to_string()),
            ("$time_iso8601", self.time.to_rfc3339()),
            ("$request_time", format!("{:.3}", self.elapsed.as_secs_f64())),
            ("$request_method", self.method.clone()),
            ("$request_uri", self.uri.clone()),
            ("$request", self.request_line()),
            ("$status", self.status.to_string()),
            ("$body_bytes_sent", self.body_bytes.to_string()),
            ("$http_referer", self.referer.clone().unwrap_or_else(|| "-".into())),
            ("$http_user_agent", self.user_agent.clone().unwrap_or_else(|| "-".into())),
        ];
        vars.iter()
            .fold(pattern.to_string(), |acc, (name, value)| acc.replace(name, value))
    }
}

fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
