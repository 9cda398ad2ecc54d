//! Enum-valued settings shared between the config file and the core crate.

use serde::{Deserialize, Serialize};

/// How long an unpinned tab may sit unused before it is archived.
///
/// Stored in the config file as `week`, `month`, or `forever`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArchivalRetention {
    /// Keep tabs used today, yesterday, or within the last week
    #[default]
    Week,
    /// Also keep tabs used within the last month
    Month,
    /// Never archive
    Forever,
}

impl ArchivalRetention {
    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            ArchivalRetention::Week => "After One Week",
            ArchivalRetention::Month => "After One Month",
            ArchivalRetention::Forever => "Never",
        }
    }

    /// All available settings for UI iteration
    pub fn all() -> &'static [ArchivalRetention] {
        &[
            ArchivalRetention::Week,
            ArchivalRetention::Month,
            ArchivalRetention::Forever,
        ]
    }
}

impl std::str::FromStr for ArchivalRetention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(ArchivalRetention::Week),
            "month" => Ok(ArchivalRetention::Month),
            "forever" | "never" => Ok(ArchivalRetention::Forever),
            other => Err(format!(
                "unknown retention '{other}' (expected week, month, or forever)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_yaml_names() {
        assert_eq!(
            serde_yaml_ng::to_string(&ArchivalRetention::Month)
                .unwrap()
                .trim(),
            "month"
        );
        let parsed: ArchivalRetention = serde_yaml_ng::from_str("forever").unwrap();
        assert_eq!(parsed, ArchivalRetention::Forever);
    }

    #[test]
    fn test_retention_from_str() {
        assert_eq!("Week".parse(), Ok(ArchivalRetention::Week));
        assert_eq!("never".parse(), Ok(ArchivalRetention::Forever));
        assert!("fortnight".parse::<ArchivalRetention>().is_err());
    }
}
