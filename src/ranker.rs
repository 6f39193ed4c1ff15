//! Orders targets by angular distance to the current aim.

use crate::target::{SoundTarget, TargetId};

/// Returns every target id, nearest first. Equal distances keep catalogue order.
pub fn rank(targets: &[SoundTarget]) -> Vec<TargetId> {
    let mut order: Vec<&SoundTarget> = targets.iter().collect();
    order.sort_by(|a, b| {
        a.angular_distance_deg
            .total_cmp(&b.angular_distance_deg)
            .then(a.id().cmp(&b.id()))
    });
    order.into_iter().map(SoundTarget::id).collect()
}

/// Space-separated whole-degree distances in rank order, for debug overlays.
pub fn angles_summary(targets: &[SoundTarget], ranking: &[TargetId]) -> String {
    ranking
        .iter()
        .map(|id| format!("{}", targets[id.index()].angular_distance_deg as i32))
        .collect::<Vec<_>>()
        .join(" ")
}
