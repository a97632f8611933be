//! Capturable zones and the static topology connecting them

pub mod capture;
pub mod routes;

pub use capture::{CapturableZone, ZoneNotification, ZoneTickReport};
pub use routes::ZoneRouteNetwork;

use serde::{Deserialize, Serialize};

/// Stable identity of the three zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneId {
    Alpha,
    Bravo,
    Charlie,
}

impl ZoneId {
    pub const ALL: [ZoneId; 3] = [ZoneId::Alpha, ZoneId::Bravo, ZoneId::Charlie];

    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneId::Alpha => "alpha",
            ZoneId::Bravo => "bravo",
            ZoneId::Charlie => "charlie",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            ZoneId::Alpha => 0,
            ZoneId::Bravo => 1,
            ZoneId::Charlie => 2,
        }
    }

    /// Parse a zone token after normalisation ("Zone_Alpha" -> Alpha)
    pub fn parse(token: &str) -> Option<ZoneId> {
        match normalize_zone_token(token).as_str() {
            "alpha" => Some(ZoneId::Alpha),
            "bravo" => Some(ZoneId::Bravo),
            "charlie" => Some(ZoneId::Charlie),
            _ => None,
        }
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase a zone token and strip the `zone_` style prefix
pub fn normalize_zone_token(token: &str) -> String {
    let lowered = token.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase();
    for prefix in ["zone_", "zone-", "zone "] {
        if let Some(rest) = lowered.strip_prefix(prefix) {
            return rest.trim().to_string();
        }
    }
    lowered
}

/// Who owns a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneOwnership {
    Player,
    Enemy,
}

impl ZoneOwnership {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneOwnership::Player => "player",
            ZoneOwnership::Enemy => "enemy",
        }
    }
}

/// Who is actively shifting a zone's progress this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneCaptureActor {
    Player,
    Enemy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalises_tokens() {
        assert_eq!(ZoneId::parse("alpha"), Some(ZoneId::Alpha));
        assert_eq!(ZoneId::parse("Zone_Bravo"), Some(ZoneId::Bravo));
        assert_eq!(ZoneId::parse("  CHARLIE "), Some(ZoneId::Charlie));
        assert_eq!(ZoneId::parse("\"zone_alpha\""), Some(ZoneId::Alpha));
        assert_eq!(ZoneId::parse("delta"), None);
        assert_eq!(ZoneId::parse(""), None);
    }

    #[test]
    fn test_zone_serialization() {
        assert_eq!(serde_json::to_string(&ZoneId::Bravo).unwrap(), "\"bravo\"");
        assert_eq!(ZoneId::Charlie.to_string(), "charlie");
    }
}
