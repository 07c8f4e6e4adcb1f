//! Human-readable durations.
//!
//! Playbooks and configuration files write durations as `"200ms"`, `"15s"`,
//! `"2m"` or `"1h"`. Results render them back in the same notation.

use std::fmt;
use std::time::Duration;

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

/// Parse a duration string into a `Duration`.
///
/// Supports the suffixes `ms`, `s`, `m` and `h`. A bare integer is read as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Some(ms) = s.strip_suffix("ms") {
        let millis: u64 =
            ms.trim().parse().map_err(|e| format!("Invalid milliseconds '{}': {}", ms, e))?;
        Ok(Duration::from_millis(millis))
    } else if let Some(secs) = s.strip_suffix('s') {
        let sec: u64 = secs.trim().parse().map_err(|e| format!("Invalid seconds '{}': {}", secs, e))?;
        Ok(Duration::from_secs(sec))
    } else if let Some(minutes) = s.strip_suffix('m') {
        let m: u64 =
            minutes.trim().parse().map_err(|e| format!("Invalid minutes '{}': {}", minutes, e))?;
        Ok(Duration::from_secs(m.saturating_mul(60)))
    } else if let Some(hours) = s.strip_suffix('h') {
        let h: u64 = hours.trim().parse().map_err(|e| format!("Invalid hours '{}': {}", hours, e))?;
        Ok(Duration::from_secs(h.saturating_mul(3600)))
    } else if let Ok(sec) = s.parse::<u64>() {
        Ok(Duration::from_secs(sec))
    } else {
        Err(format!("Unknown duration format '{}': expected suffix h/m/s/ms", s))
    }
}

/// Format a duration in the most compact unit that represents it exactly.
///
/// Durations that are not whole seconds are written in milliseconds.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();

    if millis % 1000 != 0 || millis == 0 {
        return format!("{millis}ms");
    }

    let secs = d.as_secs();
    if secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

struct DurationVisitor;

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a duration such as \"500ms\", \"30s\" or an integer number of seconds")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
        Ok(Duration::from_secs(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
        u64::try_from(v)
            .map(Duration::from_secs)
            .map_err(|_| E::custom(format!("negative duration: {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        parse_duration(v).map_err(E::custom)
    }
}

/// Serde adapter for `Duration` fields written as duration strings.
pub mod human {
    use super::*;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        d.deserialize_any(DurationVisitor)
    }
}

/// Serde adapter for `Option<Duration>` fields written as duration strings.
pub mod human_opt {
    use super::*;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&format_duration(*d)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        struct OptVisitor;

        impl<'de> Visitor<'de> for OptVisitor {
            type Value = Option<Duration>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an optional duration")
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                d.deserialize_any(DurationVisitor).map(Some)
            }
        }

        d.deserialize_option(OptVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("15s").unwrap(), Duration::from_secs(15));
        assert_eq!(parse_duration("200ms").unwrap(), Duration::from_millis(200));
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
        assert_eq!(format_duration(Duration::ZERO), "0ms");
    }

    #[test]
    fn test_human_serde_in_yaml() {
        #[derive(serde::Deserialize)]
        struct Holder {
            #[serde(default, with = "human_opt")]
            timeout: Option<Duration>,
        }

        let h: Holder = serde_yaml::from_str("timeout: 200ms").unwrap();
        assert_eq!(h.timeout, Some(Duration::from_millis(200)));

        let h: Holder = serde_yaml::from_str("timeout: 5").unwrap();
        assert_eq!(h.timeout, Some(Duration::from_secs(5)));

        let h: Holder = serde_yaml::from_str("{}").unwrap();
        assert_eq!(h.timeout, None);
    }
}
