//! Status and severity vocabularies shared by every read and write path.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Review state of an incident.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum IncidentStatus {
    #[default]
    Pending,
    Verified,
    Resolved,
    Rejected,
}

impl IncidentStatus {
    /// Unknown or missing input falls back to `Pending`.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse().ok()).unwrap_or_default()
    }
}

/// Textual severity level. The stored label is authoritative; the numeric
/// score is always re-derived from it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum Severity {
    Low,
    Moderate,
    High,
    Severe,
}

impl Severity {
    pub const fn score(self) -> i32 {
        match self {
            Self::Low => 1,
            Self::Moderate => 3,
            Self::High => 5,
            Self::Severe => 6,
        }
    }

    /// Inverse of [`Severity::score`] for numeric input, bucketing by the
    /// lower bound of each level.
    pub fn from_score(score: f64) -> Option<Self> {
        if score >= 6.0 {
            Some(Self::Severe)
        } else if score >= 5.0 {
            Some(Self::High)
        } else if score >= 3.0 {
            Some(Self::Moderate)
        } else if score >= 1.0 {
            Some(Self::Low)
        } else {
            None
        }
    }

    /// Invalid labels are dropped to `None`, never stored verbatim.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn score_of(level: &str) -> i32 {
        Severity::parse_lenient(level).map_or(0, Severity::score)
    }

    #[test]
    fn score_is_total() {
        assert_eq!(score_of("Low"), 1);
        assert_eq!(score_of("Moderate"), 3);
        assert_eq!(score_of("High"), 5);
        assert_eq!(score_of("Severe"), 6);
        assert_eq!(score_of("Catastrophic"), 0);
        assert_eq!(score_of(""), 0);
    }

    #[test]
    fn parsing_ignores_case_and_padding() {
        assert_eq!(score_of("severe"), 6);
        assert_eq!(score_of("HIGH"), 5);
        assert_eq!(score_of(" mOdErAtE "), 3);
    }

    #[test]
    fn from_score_buckets_by_lower_bound() {
        assert_eq!(Severity::from_score(7.0), Some(Severity::Severe));
        assert_eq!(Severity::from_score(6.0), Some(Severity::Severe));
        assert_eq!(Severity::from_score(5.5), Some(Severity::High));
        assert_eq!(Severity::from_score(4.0), Some(Severity::Moderate));
        assert_eq!(Severity::from_score(1.0), Some(Severity::Low));
        assert_eq!(Severity::from_score(0.5), None);
        assert_eq!(Severity::from_score(-3.0), None);
    }

    #[test]
    fn score_round_trips_through_from_score() {
        for level in Severity::iter() {
            assert_eq!(Severity::from_score(f64::from(level.score())), Some(level));
        }
    }

    #[test]
    fn status_defaults_to_pending() {
        assert_eq!(IncidentStatus::parse_or_default(None), IncidentStatus::Pending);
        assert_eq!(
            IncidentStatus::parse_or_default(Some("Closed")),
            IncidentStatus::Pending
        );
        assert_eq!(
            IncidentStatus::parse_or_default(Some(" verified ")),
            IncidentStatus::Verified
        );
    }

    #[test]
    fn labels_render_capitalized() {
        assert_eq!(IncidentStatus::Rejected.as_ref(), "Rejected");
        assert_eq!(Severity::parse_lenient("severe").map(|s| s.to_string()), Some("Severe".into()));
        assert_eq!(Severity::parse_lenient("extreme"), None);
    }
}
