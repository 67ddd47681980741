//! Typed endpoint wrappers.
//!
//! Each submodule adds methods to [`ApiClient`](crate::client::ApiClient),
//! so every call goes through its credential and failure handling.

pub mod auth;
pub mod config;
pub mod locations;
pub mod monitor;
pub mod vehicles;

/// Backend timestamps arrive either ISO (`T` separator) or SQL style (space)
pub(crate) mod backend_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer};

    const FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub(crate) fn parse(raw: &str) -> Option<NaiveDateTime> {
        FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    #[cfg(test)]
    mod tests {
        use super::parse;

        #[test]
        fn accepts_both_separators() {
            assert_eq!(parse("2024-06-01T08:00:00"), parse("2024-06-01 08:00:00"));
            assert!(parse("2024-06-01 08:00:00.250").is_some());
            assert!(parse("yesterday").is_none());
        }
    }
}
