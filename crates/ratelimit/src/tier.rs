//! Quota classes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named request-rate quota class.
///
/// Tier 1 guards the most expensive operations (secret creation), tier 3 the
/// cheapest reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Tier1,
    Tier2,
    Tier3,
    #[serde(rename = "health")]
    HealthCheck,
}

impl Tier {
    pub const ALL: [Self; 4] = [Self::Tier1, Self::Tier2, Self::Tier3, Self::HealthCheck];

    /// Name used in storage keys and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Tier1 => "tier1",
            Self::Tier2 => "tier2",
            Self::Tier3 => "tier3",
            Self::HealthCheck => "health",
        }
    }

    /// Look a tier up by name. Unrecognized names fall back to tier 3.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|tier| tier.name() == name)
            .unwrap_or(Self::Tier3)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("tier1", Tier::Tier1)]
    #[case("tier2", Tier::Tier2)]
    #[case("tier3", Tier::Tier3)]
    #[case("health", Tier::HealthCheck)]
    #[case("platinum", Tier::Tier3)]
    #[case("", Tier::Tier3)]
    fn from_name(#[case] name: &str, #[case] expected: Tier) {
        assert_eq!(Tier::from_name(name), expected);
    }

    #[test]
    fn serde_uses_key_names() {
        assert_eq!(
            serde_json::to_string(&Tier::HealthCheck).unwrap(),
            "\"health\""
        );
        assert_eq!(
            serde_json::from_str::<Tier>("\"tier2\"").unwrap(),
            Tier::Tier2
        );
    }
}
