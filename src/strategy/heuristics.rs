//! Rule-based directives used when the decision service is not consulted or
//! has failed

use crate::core::config::StrategistConfig;
use crate::llm::snapshot::BattlefieldSnapshot;
use crate::strategy::directive::StrategicDirective;
use crate::zone::ZoneOwnership;

/// Generic heuristic: recapture a long-held player zone, else shore up the
/// zone the player is standing in when it is thin or the player is nearly
/// dead, else hold
pub fn offline_directive(snapshot: &BattlefieldSnapshot, config: &StrategistConfig) -> StrategicDirective {
    let stale = snapshot
        .player_zones()
        .filter_map(|z| z.seconds_since_captured.map(|s| (z.id, s)))
        .filter(|(_, held)| *held > config.recapture_after_seconds)
        .max_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((zone, held)) = stale {
        return StrategicDirective::recapture(
            zone,
            config.heuristic_squad_size,
            format!("{} has been held by the intruder for {:.0} seconds. Taking it back.", zone, held),
        );
    }

    if let Some(zone) = snapshot.player.current_zone {
        let defenders = snapshot.zone(zone).map_or(0, |z| z.defenders_count);
        let player_critical = snapshot.player.health_percent < config.critical_health_percent;
        if defenders < config.low_defender_threshold || player_critical {
            let reasoning = if player_critical {
                format!("Target is nearly down at {}. Pressing the attack.", zone)
            } else {
                format!("{} is thinly held. Sending support.", zone)
            };
            return StrategicDirective::reinforce(zone, config.heuristic_squad_size, reasoning);
        }
    }

    StrategicDirective::hold("No pressing threats. Holding positions.")
}

/// Heuristic for when the service just failed: react to the two situations
/// that hurt most. `None` defers to the offline heuristic.
pub fn failure_directive(snapshot: &BattlefieldSnapshot, config: &StrategistConfig) -> Option<StrategicDirective> {
    if snapshot.player.zones_captured_count >= 2 {
        let newest = snapshot
            .player_zones()
            .min_by(|a, b| {
                let a = a.seconds_since_captured.unwrap_or(f32::MAX);
                let b = b.seconds_since_captured.unwrap_or(f32::MAX);
                a.total_cmp(&b)
            })
            .map(|z| z.id)?;
        return Some(StrategicDirective::recapture(
            newest,
            config.failure_recapture_squad_size,
            format!("Player is spreading thin. Hitting {} before it settles.", newest),
        ));
    }

    let contested = snapshot
        .player
        .current_zone
        .filter(|zone| snapshot.zone(*zone).is_some_and(|z| z.owner == ZoneOwnership::Enemy))?;
    Some(StrategicDirective::reinforce(
        contested,
        config.heuristic_squad_size,
        format!("{} is under assault. Reinforcing.", contested),
    ))
}
