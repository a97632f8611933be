//! Pathfinding service seam
//!
//! Drones ask a `PathService` for corner lists the way a NavMesh query
//! would answer them. `LaneNavigator` is the headless implementation: open
//! ground inside a circular arena, with inter-zone trips routed along the
//! authored lanes.

use crate::core::types::Vec2;
use crate::zone::ZoneRouteNetwork;

/// NavMesh-equivalent path queries
pub trait PathService {
    /// Corner list from `from` to `to`, ending at (or near) `to`.
    /// `None` when no path exists.
    fn find_path(&self, from: Vec2, to: Vec2) -> Option<Vec<Vec2>>;

    /// Nearest walkable position within `max_distance` of `position`
    fn sample_position(&self, position: Vec2, max_distance: f32) -> Option<Vec2>;
}

/// Open-field navigator that follows zone lanes between zones
#[derive(Debug, Clone)]
pub struct LaneNavigator {
    routes: ZoneRouteNetwork,
    bounds_radius: f32,
}

impl LaneNavigator {
    pub fn new(routes: ZoneRouteNetwork, bounds_radius: f32) -> Self {
        Self {
            routes,
            bounds_radius,
        }
    }

    fn clamp_to_bounds(&self, position: Vec2) -> Vec2 {
        if position.length() > self.bounds_radius {
            position.normalize_or_zero() * self.bounds_radius
        } else {
            position
        }
    }
}

impl PathService for LaneNavigator {
    fn find_path(&self, from: Vec2, to: Vec2) -> Option<Vec<Vec2>> {
        if !from.is_finite() || !to.is_finite() {
            return None;
        }
        let goal = self.clamp_to_bounds(to);
        let from_zone = self.routes.nearest_zone(from);
        let to_zone = self.routes.nearest_zone(goal);

        let mut corners = Vec::new();
        if from_zone != to_zone {
            if let Some(lane) = self.routes.lane(from_zone, to_zone) {
                // Only keep lane points that make progress toward the goal
                let direct = from.distance(goal);
                corners.extend(lane.iter().copied().filter(|p| p.distance(goal) < direct));
            }
        }
        corners.push(goal);
        Some(corners)
    }

    fn sample_position(&self, position: Vec2, max_distance: f32) -> Option<Vec2> {
        if !position.is_finite() {
            return None;
        }
        let clamped = self.clamp_to_bounds(position);
        (clamped.distance(position) <= max_distance).then_some(clamped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ZoneConfig;
    use crate::zone::ZoneId;

    fn navigator() -> LaneNavigator {
        let config = ZoneConfig::default();
        LaneNavigator::new(ZoneRouteNetwork::generate(&config), config.arena_radius + 15.0)
    }

    #[test]
    fn test_same_zone_path_is_direct() {
        let nav = navigator();
        let routes = ZoneRouteNetwork::generate(&ZoneConfig::default());
        let center = routes.center(ZoneId::Alpha);
        let path = nav.find_path(center, center + Vec2::new(2.0, 0.0)).unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_cross_zone_path_follows_lane() {
        let nav = navigator();
        let routes = ZoneRouteNetwork::generate(&ZoneConfig::default());
        let from = routes.center(ZoneId::Alpha);
        let to = routes.center(ZoneId::Charlie);
        let path = nav.find_path(from, to).unwrap();
        assert!(path.len() > 1);
        assert_eq!(*path.last().unwrap(), to);
    }

    #[test]
    fn test_sample_position_clamps_to_arena() {
        let nav = navigator();
        assert!(nav.sample_position(Vec2::new(500.0, 0.0), 1.0).is_none());
        let snapped = nav.sample_position(Vec2::new(56.0, 0.0), 5.0).unwrap();
        assert!((snapped.x - 55.0).abs() < 1e-4);
        assert!(nav.sample_position(Vec2::new(f32::NAN, 0.0), 5.0).is_none());
    }
}
