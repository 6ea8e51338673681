//! Trail model.
//!
//! Trails are GPX-backed hiking routes. Difficulty and route type are stored
//! as short codes (`facil`, `ida_volta`) and rendered with their Portuguese
//! display labels (`Fácil`, `Ida e Volta`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a trail label.
pub const MAX_LABEL_LEN: usize = 100;

/// Trail difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "facil")]
    Easy,
    #[default]
    #[serde(rename = "moderado")]
    Moderate,
    #[serde(rename = "dificil")]
    Difficult,
}

impl Difficulty {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "facil",
            Self::Moderate => "moderado",
            Self::Difficult => "dificil",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Easy => "Fácil",
            Self::Moderate => "Moderado",
            Self::Difficult => "Difícil",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "facil" | "fácil" | "easy" => Ok(Self::Easy),
            "moderado" | "moderate" => Ok(Self::Moderate),
            "dificil" | "difícil" | "hard" | "difficult" => Ok(Self::Difficult),
            _ => Err(Error::InvalidArgument(format!("unknown difficulty: {s}"))),
        }
    }
}

/// Route shape of a trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RouteType {
    #[default]
    #[serde(rename = "ida_volta")]
    RoundTrip,
    #[serde(rename = "ida")]
    OneWay,
    #[serde(rename = "volta")]
    Return,
}

impl RouteType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RoundTrip => "ida_volta",
            Self::OneWay => "ida",
            Self::Return => "volta",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::RoundTrip => "Ida e Volta",
            Self::OneWay => "Ida",
            Self::Return => "Volta",
        }
    }
}

impl std::str::FromStr for RouteType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "ida_volta" | "ida_e_volta" | "round_trip" => Ok(Self::RoundTrip),
            "ida" | "one_way" => Ok(Self::OneWay),
            "volta" | "return" => Ok(Self::Return),
            _ => Err(Error::InvalidArgument(format!("unknown route type: {s}"))),
        }
    }
}

/// A hiking trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    pub id: i64,
    pub label: String,
    /// Free text, may be empty.
    pub description: String,
    /// Path to the uploaded GPX file.
    pub gpx_path: String,
    pub difficulty: Difficulty,
    pub route_type: RouteType,
    /// Total distance in meters.
    pub distance: Option<f64>,
    /// Estimated duration in minutes.
    pub duration: Option<u32>,
    /// Elevation gain in meters.
    pub elevation: Option<f64>,
    /// Key of this trail's point in the vector index, assigned on first sync.
    pub external_index_id: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Writable trail fields, used for both create and update.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrailDraft {
    pub label: String,
    pub description: String,
    pub gpx_path: String,
    pub difficulty: Difficulty,
    pub route_type: RouteType,
    pub distance: Option<f64>,
    pub duration: Option<u32>,
    pub elevation: Option<f64>,
}

impl TrailDraft {
    /// Check field constraints before the draft reaches the database.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty or overlong label, a non-GPX
    /// file, or negative measurements.
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(Error::InvalidArgument("trail label is required".into()));
        }
        if self.label.chars().count() > MAX_LABEL_LEN {
            return Err(Error::InvalidArgument(format!(
                "trail label exceeds {MAX_LABEL_LEN} characters"
            )));
        }
        let is_gpx = std::path::Path::new(&self.gpx_path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gpx"));
        if !is_gpx {
            return Err(Error::InvalidArgument(format!(
                "trail file must have a .gpx extension: {}",
                self.gpx_path
            )));
        }
        if self.distance.is_some_and(|d| d < 0.0) || self.elevation.is_some_and(|e| e < 0.0) {
            return Err(Error::InvalidArgument(
                "distance and elevation must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl From<&Trail> for TrailDraft {
    fn from(trail: &Trail) -> Self {
        Self {
            label: trail.label.clone(),
            description: trail.description.clone(),
            gpx_path: trail.gpx_path.clone(),
            difficulty: trail.difficulty,
            route_type: trail.route_type,
            distance: trail.distance,
            duration: trail.duration,
            elevation: trail.elevation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TrailDraft {
        TrailDraft {
            label: "Trilha do Pico".to_string(),
            gpx_path: "trackfiles/pico.gpx".to_string(),
            ..TrailDraft::default()
        }
    }

    #[test]
    fn test_difficulty_codes_and_labels() {
        assert_eq!("facil".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!("Difícil".parse::<Difficulty>().unwrap(), Difficulty::Difficult);
        assert_eq!(Difficulty::Easy.label(), "Fácil");
        assert_eq!(Difficulty::default(), Difficulty::Moderate);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_route_type_parsing() {
        assert_eq!("ida_volta".parse::<RouteType>().unwrap(), RouteType::RoundTrip);
        assert_eq!("Ida e Volta".parse::<RouteType>().unwrap(), RouteType::RoundTrip);
        assert_eq!(RouteType::OneWay.label(), "Ida");
        assert_eq!(RouteType::Return.as_str(), "volta");
    }

    #[test]
    fn test_validate_accepts_gpx() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_other_extensions() {
        let mut d = draft();
        d.gpx_path = "trackfiles/pico.kml".to_string();
        assert!(matches!(d.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_rejects_long_label() {
        let mut d = draft();
        d.label = "x".repeat(MAX_LABEL_LEN + 1);
        assert!(d.validate().is_err());
    }
}
