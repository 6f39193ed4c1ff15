//! Sound catalogue: wire entries, placement and target selection.

mod source;

pub use source::{CatalogueSource, JsonCatalogueSource};

use crate::config::SelectionMode;
use crate::error::{Result, SonoError};
use crate::math::{Vec3, angle_between, normalize_direction, random_unit_direction};
use crate::target::SoundMetadata;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Attempts at finding a direction far enough from every placed target.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 1000;

/// Body of the sounds endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundsResponse {
    pub sounds: Vec<SoundEntry>,
}

/// One catalogue entry as served over the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundEntry {
    pub id: i64,
    pub direction_x: Option<f32>,
    pub direction_y: Option<f32>,
    pub direction_z: Option<f32>,
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub cd_number: String,
    #[serde(default)]
    pub cd_name: String,
    #[serde(default)]
    pub track_number: i64,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub on_phone: bool,
}

/// Where a target should sit around the listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Unit direction given by the catalogue
    Fixed(Vec3),
    /// No direction served; pick one at load
    Random,
}

impl SoundEntry {
    pub fn placement(&self) -> Result<Placement> {
        match (self.direction_x, self.direction_y, self.direction_z) {
            (None, None, None) => Ok(Placement::Random),
            (Some(x), Some(y), Some(z)) => {
                let direction = normalize_direction(Vec3::new(x, y, z)).map_err(|e| match e {
                    SonoError::InvalidDirection(reason) => {
                        SonoError::InvalidDirection(format!("sound {}: {}", self.id, reason))
                    }
                    other => other,
                })?;
                Ok(Placement::Fixed(direction))
            }
            _ => Err(SonoError::InvalidDirection(format!(
                "sound {} has a partial direction ({:?}, {:?}, {:?})",
                self.id, self.direction_x, self.direction_y, self.direction_z
            ))),
        }
    }

    pub fn track_info(&self) -> String {
        format!("{} {} - {}", self.cd_number, self.cd_name, self.track_number)
    }

    pub fn metadata(&self) -> SoundMetadata {
        SoundMetadata::new(
            self.description.clone(),
            self.category.clone(),
            self.track_info(),
        )
    }

    fn to_spec(&self, direction: Vec3) -> TargetSpec {
        TargetSpec {
            sound_id: self.id,
            direction,
            locator: self.location.clone(),
            metadata: self.metadata(),
        }
    }
}

/// A catalogue entry resolved to a concrete direction, ready to become a target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpec {
    pub sound_id: i64,
    pub direction: Vec3,
    pub locator: String,
    pub metadata: SoundMetadata,
}

impl TargetSpec {
    pub fn new(
        sound_id: i64,
        direction: Vec3,
        locator: impl Into<String>,
        metadata: SoundMetadata,
    ) -> Self {
        Self {
            sound_id,
            direction,
            locator: locator.into(),
            metadata,
        }
    }
}

/// Resolves catalogue entries into targets according to `mode`.
///
/// Entries with malformed directions are skipped with a warning. In random
/// mode served directions are ignored and every pick is placed afresh.
pub fn select_targets<R: Rng + ?Sized>(
    entries: &[SoundEntry],
    mode: SelectionMode,
    rng: &mut R,
) -> Vec<TargetSpec> {
    match mode {
        SelectionMode::Selected => select_flagged(entries, rng),
        SelectionMode::Random {
            count,
            min_angle_between_deg,
        } => select_random(entries, count, min_angle_between_deg, rng),
    }
}

fn select_flagged<R: Rng + ?Sized>(entries: &[SoundEntry], rng: &mut R) -> Vec<TargetSpec> {
    let mut specs = Vec::new();
    for entry in entries.iter().filter(|e| e.selected) {
        match entry.placement() {
            Ok(Placement::Fixed(direction)) => specs.push(entry.to_spec(direction)),
            Ok(Placement::Random) => specs.push(entry.to_spec(random_unit_direction(rng))),
            Err(e) => log::warn!("Skipping catalogue entry: {}", e),
        }
    }
    log::debug!(
        "Selected {} of {} catalogue entries",
        specs.len(),
        entries.len()
    );
    specs
}

fn select_random<R: Rng + ?Sized>(
    entries: &[SoundEntry],
    count: usize,
    min_angle_between_deg: f32,
    rng: &mut R,
) -> Vec<TargetSpec> {
    let picks: Vec<&SoundEntry> = entries.choose_multiple(rng, count).collect();
    let mut specs: Vec<TargetSpec> = Vec::with_capacity(picks.len());

    for entry in picks {
        match place_apart(&specs, min_angle_between_deg, rng) {
            Some(direction) => specs.push(entry.to_spec(direction)),
            None => log::warn!(
                "Skipping sound {}: no direction {} deg clear of {} placed targets after {} attempts",
                entry.id,
                min_angle_between_deg,
                specs.len(),
                MAX_PLACEMENT_ATTEMPTS
            ),
        }
    }
    specs
}

fn place_apart<R: Rng + ?Sized>(
    placed: &[TargetSpec],
    min_angle_between_deg: f32,
    rng: &mut R,
) -> Option<Vec3> {
    (0..MAX_PLACEMENT_ATTEMPTS)
        .map(|_| random_unit_direction(rng))
        .find(|candidate| {
            placed.iter().all(|spec| {
                angle_between(*candidate, spec.direction)
                    .map(|d| d >= min_angle_between_deg)
                    .unwrap_or(false)
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn entry(id: i64, direction: Option<[f32; 3]>, selected: bool) -> SoundEntry {
        SoundEntry {
            id,
            direction_x: direction.map(|d| d[0]),
            direction_y: direction.map(|d| d[1]),
            direction_z: direction.map(|d| d[2]),
            location: format!("https://sounds.example/{}.mp3", id),
            description: format!("Sound {}", id),
            category: "Nature".to_string(),
            cd_number: "EC 12".to_string(),
            cd_name: "Birds".to_string(),
            track_number: id,
            selected,
            on_phone: false,
        }
    }

    #[test]
    fn test_parse_wire_entry() {
        let json = r#"{
            "id": 7,
            "directionX": 0.0,
            "directionY": 2.0,
            "directionZ": 0.0,
            "location": "rain.mp3",
            "description": "Rain on a tin roof",
            "category": "Weather",
            "cdNumber": "EC 4",
            "cdName": "Storms",
            "trackNumber": 3,
            "selected": true,
            "onPhone": false
        }"#;
        let entry: SoundEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.placement().unwrap(), Placement::Fixed(Vec3::Y));
        assert_eq!(entry.track_info(), "EC 4 Storms - 3");
        assert_eq!(
            entry.metadata().reveal_text(),
            "Rain on a tin roofWeatherEC 4 Storms - 3"
        );
    }

    #[test]
    fn test_null_direction_requests_random_placement() {
        let json = r#"{"id": 1, "directionX": null, "directionY": null,
            "directionZ": null, "location": "a.mp3"}"#;
        let entry: SoundEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.placement().unwrap(), Placement::Random);
    }

    #[test]
    fn test_partial_or_zero_direction_is_invalid() {
        let mut partial = entry(1, Some([1.0, 0.0, 0.0]), true);
        partial.direction_z = None;
        assert!(matches!(
            partial.placement(),
            Err(SonoError::InvalidDirection(_))
        ));

        let zero = entry(2, Some([0.0, 0.0, 0.0]), true);
        assert!(matches!(zero.placement(), Err(SonoError::InvalidDirection(_))));
    }

    #[test]
    fn test_selected_mode_keeps_flagged_and_skips_invalid() {
        let entries = vec![
            entry(1, Some([1.0, 0.0, 0.0]), true),
            entry(2, Some([0.0, 1.0, 0.0]), false),
            entry(3, Some([0.0, 0.0, 0.0]), true),
            entry(4, None, true),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let specs = select_targets(&entries, SelectionMode::Selected, &mut rng);

        let ids: Vec<i64> = specs.iter().map(|s| s.sound_id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert_eq!(specs[0].direction, Vec3::X);
        assert!((specs[1].direction.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_random_mode_respects_count_and_separation() {
        let entries: Vec<SoundEntry> = (0..20).map(|i| entry(i, None, false)).collect();
        let mut rng = StdRng::seed_from_u64(99);
        let mode = SelectionMode::Random {
            count: 6,
            min_angle_between_deg: 40.0,
        };
        let specs = select_targets(&entries, mode, &mut rng);

        assert_eq!(specs.len(), 6);
        let mut ids: Vec<i64> = specs.iter().map(|s| s.sound_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);

        for (i, a) in specs.iter().enumerate() {
            for b in &specs[i + 1..] {
                assert!(angle_between(a.direction, b.direction).unwrap() >= 40.0);
            }
        }
    }

    #[test]
    fn test_random_mode_count_larger_than_catalogue() {
        let entries: Vec<SoundEntry> = (0..3).map(|i| entry(i, None, false)).collect();
        let mut rng = StdRng::seed_from_u64(5);
        let mode = SelectionMode::Random {
            count: 10,
            min_angle_between_deg: 10.0,
        };
        assert_eq!(select_targets(&entries, mode, &mut rng).len(), 3);
    }

    #[test]
    fn test_unplaceable_entries_are_skipped() {
        let entries: Vec<SoundEntry> = (0..4).map(|i| entry(i, None, false)).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let mode = SelectionMode::Random {
            count: 4,
            min_angle_between_deg: 180.0,
        };
        let specs = select_targets(&entries, mode, &mut rng);
        assert_eq!(specs.len(), 1);
    }
}
