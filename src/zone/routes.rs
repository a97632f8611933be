//! Static zone topology: centers, approach points and inter-zone lanes
//!
//! Built once at match start and never mutated afterwards.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::config::ZoneConfig;
use crate::core::types::Vec2;
use crate::zone::ZoneId;

/// Gap between a zone's edge and its approach point
const APPROACH_MARGIN: f32 = 3.0;

/// One capturable area in the arena
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoneSite {
    pub id: ZoneId,
    pub center: Vec2,
    pub radius: f32,
    /// Where squads sourced from this zone materialise
    pub approach_point: Vec2,
}

/// Authored or generated topology of the three zones
#[derive(Debug, Clone)]
pub struct ZoneRouteNetwork {
    sites: [ZoneSite; 3],
    lanes: AHashMap<(ZoneId, ZoneId), Vec<Vec2>>,
}

impl ZoneRouteNetwork {
    /// Generate the default triangular layout around the arena origin
    pub fn generate(config: &ZoneConfig) -> Self {
        let centers = ZoneId::ALL.map(|id| {
            // Alpha at the top, then clockwise in 120 degree steps
            let angle = std::f32::consts::FRAC_PI_2 - id.index() as f32 * 2.0 * std::f32::consts::PI / 3.0;
            Vec2::new(angle.cos(), angle.sin()) * config.arena_radius
        });
        Self::from_centers(centers, config.capture_radius, config.lane_bend)
    }

    /// Build a network from explicit zone centers (indexed by `ZoneId::index`)
    pub fn from_centers(centers: [Vec2; 3], radius: f32, lane_bend: f32) -> Self {
        let arena_center = (centers[0] + centers[1] + centers[2]) / 3.0;

        let sites = ZoneId::ALL.map(|id| {
            let center = centers[id.index()];
            let outward = (center - arena_center).normalize_or_zero();
            ZoneSite {
                id,
                center,
                radius,
                approach_point: center + outward * (radius + APPROACH_MARGIN),
            }
        });

        let mut lanes = AHashMap::new();
        for from in ZoneId::ALL {
            for to in ZoneId::ALL {
                if from >= to {
                    continue;
                }
                let lane = build_lane(&sites[from.index()], &sites[to.index()], arena_center, lane_bend);
                let mut reverse = lane.clone();
                reverse.reverse();
                lanes.insert((from, to), lane);
                lanes.insert((to, from), reverse);
            }
        }

        Self { sites, lanes }
    }

    pub fn site(&self, zone: ZoneId) -> &ZoneSite {
        &self.sites[zone.index()]
    }

    pub fn sites(&self) -> &[ZoneSite; 3] {
        &self.sites
    }

    pub fn center(&self, zone: ZoneId) -> Vec2 {
        self.site(zone).center
    }

    pub fn radius(&self, zone: ZoneId) -> f32 {
        self.site(zone).radius
    }

    pub fn approach_point(&self, zone: ZoneId) -> Vec2 {
        self.site(zone).approach_point
    }

    /// Waypoints from the edge of `from` to the edge of `to`
    pub fn lane(&self, from: ZoneId, to: ZoneId) -> Option<&[Vec2]> {
        self.lanes.get(&(from, to)).map(|l| l.as_slice())
    }

    /// Zone whose capture area contains `position`
    pub fn zone_at(&self, position: Vec2) -> Option<ZoneId> {
        self.sites
            .iter()
            .find(|s| s.center.distance(position) <= s.radius)
            .map(|s| s.id)
    }

    pub fn nearest_zone(&self, position: Vec2) -> ZoneId {
        let mut best = self.sites[0];
        for site in &self.sites[1..] {
            if site.center.distance(position) < best.center.distance(position) {
                best = *site;
            }
        }
        best.id
    }
}

fn build_lane(from: &ZoneSite, to: &ZoneSite, arena_center: Vec2, bend: f32) -> Vec<Vec2> {
    let dir = (to.center - from.center).normalize_or_zero();
    let start = from.center + dir * from.radius;
    let end = to.center - dir * to.radius;

    // Bow the midpoint toward the arena center
    let mid = (start + end) * 0.5;
    let inward = (arena_center - mid).normalize_or_zero();
    let bent_mid = mid + inward * bend;

    vec![start, bent_mid, end]
}
