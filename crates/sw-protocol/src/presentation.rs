//! Presentation and slide wire types
//!
//! A presentation is a named, ordered sequence of image slides. Agents fetch
//! the full slide list from the coordinator when opening a presentation and
//! validate it before playback starts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Unique identifier for a presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresentationId(pub u64);

impl PresentationId {
    /// Create a new presentation ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PresentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "presentation-{}", self.0)
    }
}

impl From<u64> for PresentationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Slide transition style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    /// Instant switch
    #[default]
    Cut,
    /// Cross-fade
    Fade,
    /// Dissolve
    Dissolve,
}

/// A single slide within a presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub id: u64,
    /// Reference to the slide image (URL or coordinator-relative path)
    pub image_reference: String,
    /// Display duration in seconds; values below 1 are treated as 1
    pub duration_seconds: u64,
    #[serde(default)]
    pub transition_type: TransitionType,
}

impl Slide {
    /// Display duration with the 1-second floor applied
    pub fn effective_duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds.max(1))
    }

    /// Whether this slide carries a usable media reference
    pub fn has_media(&self) -> bool {
        !self.image_reference.trim().is_empty()
    }
}

/// A complete presentation as served by the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub id: PresentationId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered slide sequence
    pub slides: Vec<Slide>,
}

impl Presentation {
    /// Check that this presentation can be played at all.
    ///
    /// A deck with no slides, or whose slides all lack a media reference,
    /// is rejected before playback rather than silently shown broken.
    pub fn validate_playable(&self) -> Result<(), ValidationError> {
        if self.slides.is_empty() {
            return Err(ValidationError::NoSlides { presentation: self.id });
        }
        if !self.slides.iter().any(Slide::has_media) {
            return Err(ValidationError::NoUsableMedia { presentation: self.id });
        }
        Ok(())
    }
}

/// Validation failures for a fetched presentation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The slide list is empty
    #[error("{presentation} has no slides")]
    NoSlides { presentation: PresentationId },

    /// Slides exist but none carries a usable media reference
    #[error("{presentation} has no slide with a usable media reference")]
    NoUsableMedia { presentation: PresentationId },
}

/// An active assignment as reported by the assignment probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedPresentation {
    pub presentation_id: PresentationId,
    pub auto_play: bool,
    pub loop_mode: bool,
    /// Creation timestamp (Unix millis)
    pub created_at: u64,
    /// Whether the device already reported this assignment as seen
    #[serde(default)]
    pub viewed: bool,
}

/// Response body of the assignment probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentProbeResponse {
    /// `None` means no assignment is active for the device
    pub assigned_presentation: Option<AssignedPresentation>,
}

/// Response body of the default-presentation probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultProbeResponse {
    /// `None` means no fleet default is configured
    pub default_presentation: Option<Presentation>,
}

/// Response body of a presentation fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationFetchResponse {
    pub presentation: Presentation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(id: u64, image: &str) -> Slide {
        Slide {
            id,
            image_reference: image.to_string(),
            duration_seconds: 5,
            transition_type: TransitionType::Cut,
        }
    }

    #[test]
    fn test_empty_deck_rejected() {
        let deck = Presentation {
            id: PresentationId::new(1),
            name: "empty".to_string(),
            description: None,
            slides: vec![],
        };
        assert_eq!(
            deck.validate_playable(),
            Err(ValidationError::NoSlides { presentation: PresentationId::new(1) })
        );
    }

    #[test]
    fn test_deck_without_media_rejected() {
        let deck = Presentation {
            id: PresentationId::new(2),
            name: "blank".to_string(),
            description: None,
            slides: vec![slide(1, ""), slide(2, "   ")],
        };
        assert_eq!(
            deck.validate_playable(),
            Err(ValidationError::NoUsableMedia { presentation: PresentationId::new(2) })
        );
    }

    #[test]
    fn test_partially_broken_deck_is_playable() {
        // A single resolvable slide is enough; broken slides render as
        // placeholders at playback time.
        let deck = Presentation {
            id: PresentationId::new(3),
            name: "mixed".to_string(),
            description: None,
            slides: vec![slide(1, ""), slide(2, "https://example.com/a.png")],
        };
        assert!(deck.validate_playable().is_ok());
    }

    #[test]
    fn test_duration_floor() {
        let mut s = slide(1, "x.png");
        s.duration_seconds = 0;
        assert_eq!(s.effective_duration(), Duration::from_secs(1));
        s.duration_seconds = 8;
        assert_eq!(s.effective_duration(), Duration::from_secs(8));
    }
}
