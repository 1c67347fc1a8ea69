/// Config schema types (streams store, event sources, schedule, delivery).
use std::path::PathBuf;

use {
    chrono::NaiveTime,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TidingsConfig {
    pub streams: StreamsConfig,
    pub sources: SourcesConfig,
    pub schedule: ScheduleConfig,
    pub delivery: DeliveryConfig,
}

/// Location of the notification stream definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamsConfig {
    /// Path to the stream store. Relative paths resolve against the directory
    /// of the config file that declared them.
    pub path: PathBuf,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("notification_streams.toml"),
        }
    }
}

/// Event source invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Maximum seconds a single source invocation may run.
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

/// Daily dispatch schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Whether `serve` registers the daily run. Defaults to true.
    pub enabled: bool,
    /// Local wall-clock time of the run, `HH:MM`. Defaults to "12:05".
    pub time: String,
    /// IANA timezone name. Defaults to "Etc/GMT+8" (UTC-08:00).
    pub timezone: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time: "12:05".into(),
            timezone: "Etc/GMT+8".into(),
        }
    }
}

impl ScheduleConfig {
    /// Parse `time` as `HH:MM` (or `HH:MM:SS`).
    pub fn parsed_time(&self) -> anyhow::Result<NaiveTime> {
        let raw = self.time.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|e| anyhow::anyhow!("invalid schedule time '{raw}': {e}"))
    }

    /// Parse `timezone` as an IANA zone.
    pub fn parsed_timezone(&self) -> anyhow::Result<chrono_tz::Tz> {
        let raw = self.timezone.trim();
        raw.parse::<chrono_tz::Tz>()
            .map_err(|_| anyhow::anyhow!("unknown timezone: {raw}"))
    }
}

/// Which delivery sink the binary wires up.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKind {
    /// Print messages to stdout.
    #[default]
    Console,
    /// POST messages to an HTTP endpoint.
    Webhook,
}

/// Delivery sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub kind: DeliveryKind,
    /// Endpoint receiving JSON delivery requests when `kind = "webhook"`.
    pub webhook_url: Option<String>,
    /// Bearer token sent with webhook requests.
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            kind: DeliveryKind::Console,
            webhook_url: None,
            token: None,
            timeout_secs: 10,
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = TidingsConfig::default();
        assert_eq!(cfg.streams.path, PathBuf::from("notification_streams.toml"));
        assert_eq!(cfg.sources.timeout_secs, 60);
        assert!(cfg.schedule.enabled);
        assert_eq!(cfg.schedule.time, "12:05");
        assert_eq!(cfg.delivery.kind, DeliveryKind::Console);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: TidingsConfig = toml::from_str(
            r#"
[schedule]
time = "08:30"

[delivery]
kind = "webhook"
webhook_url = "https://hooks.example.com/tidings"
token = "s3cret"
"#,
        )
        .unwrap();
        assert_eq!(cfg.schedule.timezone, "Etc/GMT+8");
        assert_eq!(cfg.delivery.kind, DeliveryKind::Webhook);
        assert_eq!(
            cfg.delivery.token.as_ref().unwrap().expose_secret(),
            "s3cret"
        );
        assert_eq!(cfg.delivery.timeout_secs, 10);
    }

    #[test]
    fn parsed_time_accepts_seconds() {
        let schedule = ScheduleConfig {
            time: "07:15:30".into(),
            ..Default::default()
        };
        assert_eq!(
            schedule.parsed_time().unwrap(),
            NaiveTime::from_hms_opt(7, 15, 30).unwrap()
        );
    }

    #[test]
    fn parsed_time_rejects_garbage() {
        let schedule = ScheduleConfig {
            time: "noon".into(),
            ..Default::default()
        };
        assert!(schedule.parsed_time().is_err());
    }

    #[test]
    fn default_timezone_is_utc_minus_eight() {
        let tz = ScheduleConfig::default().parsed_timezone().unwrap();
        assert_eq!(tz, chrono_tz::Etc::GMTPlus8);
    }

    #[test]
    fn token_serializes_exposed() {
        let mut cfg = TidingsConfig::default();
        cfg.delivery.token = Some(Secret::new("abc".to_string()));
        let out = toml::to_string(&cfg).unwrap();
        assert!(out.contains("token = \"abc\""));
    }
}
