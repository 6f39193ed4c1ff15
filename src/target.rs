//! Directional sound sources

use crate::error::Result;
use crate::math::{Vec3, angle_between, normalize_direction};
use crate::pool::ResourceId;

/// Position of a target in catalogue load order. Doubles as the tie-break key
/// when ranking.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) usize);

impl TargetId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TargetId({})", self.0)
    }
}

/// Descriptive text revealed while the user dwells on a target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SoundMetadata {
    pub description: String,
    pub category: String,
    pub track_info: String,
}

impl SoundMetadata {
    pub fn new(
        description: impl Into<String>,
        category: impl Into<String>,
        track_info: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            category: category.into(),
            track_info: track_info.into(),
        }
    }

    /// Description, category and track info joined without separators.
    pub fn reveal_text(&self) -> String {
        format!("{}{}{}", self.description, self.category, self.track_info)
    }
}

/// A sound placed at a fixed direction around the listener.
///
/// Direction and metadata never change after load; the angular distance is
/// recomputed every tick and the owned resource is managed by the allocator.
#[derive(Debug, Clone)]
pub struct SoundTarget {
    id: TargetId,
    sound_id: i64,
    direction: Vec3,
    locator: String,
    metadata: SoundMetadata,
    pub(crate) angular_distance_deg: f32,
    pub(crate) resource: Option<ResourceId>,
}

impl SoundTarget {
    pub(crate) fn new(
        id: TargetId,
        sound_id: i64,
        direction: Vec3,
        locator: impl Into<String>,
        metadata: SoundMetadata,
    ) -> Result<Self> {
        Ok(Self {
            id,
            sound_id,
            direction: normalize_direction(direction)?,
            locator: locator.into(),
            metadata,
            angular_distance_deg: 180.0,
            resource: None,
        })
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Catalogue identifier of the underlying sound.
    pub fn sound_id(&self) -> i64 {
        self.sound_id
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Audio resource locator handed to the playback collaborator.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn metadata(&self) -> &SoundMetadata {
        &self.metadata
    }

    pub fn angular_distance_deg(&self) -> f32 {
        self.angular_distance_deg
    }

    pub fn resource(&self) -> Option<ResourceId> {
        self.resource
    }

    pub(crate) fn update_distance(&mut self, aim: Vec3) -> Result<()> {
        self.angular_distance_deg = angle_between(aim, self.direction)?;
        Ok(())
    }

    pub fn degrees_from(&self, direction: Vec3) -> Result<f32> {
        angle_between(direction, self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_normalised_on_construction() {
        let target = SoundTarget::new(
            TargetId(0),
            1,
            Vec3::new(0.0, 3.0, 0.0),
            "a.ogg",
            SoundMetadata::default(),
        )
        .unwrap();
        assert_eq!(target.direction(), Vec3::Y);
        assert_eq!(target.angular_distance_deg(), 180.0);
    }

    #[test]
    fn test_zero_direction_rejected() {
        let result = SoundTarget::new(TargetId(0), 1, Vec3::ZERO, "a.ogg", SoundMetadata::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_update_distance() {
        let mut target =
            SoundTarget::new(TargetId(0), 1, Vec3::X, "a.ogg", SoundMetadata::default()).unwrap();
        target.update_distance(Vec3::Y).unwrap();
        assert_eq!(target.angular_distance_deg(), 90.0);
    }

    #[test]
    fn test_reveal_text_concatenates_sections() {
        let metadata = SoundMetadata::new("Rain", "Weather", "12 Storms - 3");
        assert_eq!(metadata.reveal_text(), "RainWeather12 Storms - 3");
    }
}
