//! Two-team assignment and balancing

use std::collections::BTreeMap;

use crate::models::{Player, PlayerId, Team};

/// Current team populations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamCounts {
    pub a: usize,
    pub b: usize,
}

impl TeamCounts {
    pub fn of(players: &BTreeMap<PlayerId, Player>) -> Self {
        let mut counts = Self::default();
        for player in players.values() {
            match player.team {
                Team::A => counts.a += 1,
                Team::B => counts.b += 1,
                Team::None => {}
            }
        }
        counts
    }

    pub fn spread(&self) -> usize {
        self.a.abs_diff(self.b)
    }
}

/// Assigns players to teams A and B, keeping populations within one of
/// each other. All operations are deterministic: candidates are taken
/// in join order and ties go to team A, which makes assignments
/// alternate A, B, A, ... from a balanced start.
pub struct TeamBalancer;

impl TeamBalancer {
    /// The team the next joining player should receive
    pub fn next_team(counts: TeamCounts) -> Team {
        if counts.a <= counts.b {
            Team::A
        } else {
            Team::B
        }
    }

    /// Assign every teamless player, in join order. Returns the ids
    /// that were assigned.
    pub fn assign_unassigned(players: &mut BTreeMap<PlayerId, Player>) -> Vec<PlayerId> {
        let mut counts = TeamCounts::of(players);
        let mut order: Vec<(i64, PlayerId)> = players
            .values()
            .filter(|p| !p.team.is_assigned())
            .map(|p| (p.joined_at, p.id.clone()))
            .collect();
        order.sort();

        let mut assigned = Vec::with_capacity(order.len());
        for (_, id) in order {
            let team = Self::next_team(counts);
            match team {
                Team::A => counts.a += 1,
                Team::B => counts.b += 1,
                Team::None => unreachable!(),
            }
            if let Some(player) = players.get_mut(&id) {
                player.team = team;
                assigned.push(id);
            }
        }
        assigned
    }

    /// Clear every player's team. Used when team mode is disabled.
    pub fn clear_teams(players: &mut BTreeMap<PlayerId, Player>) {
        for player in players.values_mut() {
            player.team = Team::None;
        }
    }

    /// The team a player lands on when they ask to switch. A teamless
    /// player is placed by the balance rule instead of toggled.
    pub fn switched_team(current: Team, counts: TeamCounts) -> Team {
        match current {
            Team::None => Self::next_team(counts),
            other => other.opposite(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, joined_at: i64, team: Team) -> Player {
        let mut p = Player::new(PlayerId::from(id), id, "⭐", joined_at);
        p.team = team;
        p
    }

    fn roster(entries: &[(&str, i64, Team)]) -> BTreeMap<PlayerId, Player> {
        entries
            .iter()
            .map(|(id, t, team)| (PlayerId::from(*id), player(id, *t, *team)))
            .collect()
    }

    #[test]
    fn test_assign_alternates_from_empty() {
        let mut players = roster(&[
            ("p1", 100, Team::None),
            ("p2", 200, Team::None),
            ("p3", 300, Team::None),
            ("p4", 400, Team::None),
        ]);
        TeamBalancer::assign_unassigned(&mut players);

        assert_eq!(players[&PlayerId::from("p1")].team, Team::A);
        assert_eq!(players[&PlayerId::from("p2")].team, Team::B);
        assert_eq!(players[&PlayerId::from("p3")].team, Team::A);
        assert_eq!(players[&PlayerId::from("p4")].team, Team::B);
    }

    #[test]
    fn test_assign_respects_join_order_not_id_order() {
        // z_first joined before a_second even though its id sorts later
        let mut players = roster(&[("z_first", 100, Team::None), ("a_second", 200, Team::None)]);
        TeamBalancer::assign_unassigned(&mut players);

        assert_eq!(players[&PlayerId::from("z_first")].team, Team::A);
        assert_eq!(players[&PlayerId::from("a_second")].team, Team::B);
    }

    #[test]
    fn test_assign_fills_smaller_team_first() {
        let mut players = roster(&[
            ("p1", 100, Team::A),
            ("p2", 200, Team::A),
            ("p3", 300, Team::B),
            ("p4", 400, Team::None),
        ]);
        TeamBalancer::assign_unassigned(&mut players);
        assert_eq!(players[&PlayerId::from("p4")].team, Team::B);
    }

    #[test]
    fn test_balance_bound_for_any_population() {
        for n in 0..12usize {
            let entries: Vec<(String, i64)> =
                (0..n).map(|i| (format!("p{i}"), i as i64 * 10)).collect();
            let mut players: BTreeMap<PlayerId, Player> = entries
                .iter()
                .map(|(id, t)| (PlayerId::from(id.as_str()), player(id, *t, Team::None)))
                .collect();
            TeamBalancer::assign_unassigned(&mut players);
            assert!(TeamCounts::of(&players).spread() <= 1, "population {n}");
        }
    }

    #[test]
    fn test_clear_teams() {
        let mut players = roster(&[("p1", 100, Team::A), ("p2", 200, Team::B)]);
        TeamBalancer::clear_teams(&mut players);
        assert!(players.values().all(|p| p.team == Team::None));
    }

    #[test]
    fn test_switched_team_toggles() {
        let counts = TeamCounts { a: 1, b: 1 };
        assert_eq!(TeamBalancer::switched_team(Team::A, counts), Team::B);
        assert_eq!(TeamBalancer::switched_team(Team::B, counts), Team::A);
    }

    #[test]
    fn test_switched_team_places_teamless_by_balance() {
        let counts = TeamCounts { a: 2, b: 1 };
        assert_eq!(TeamBalancer::switched_team(Team::None, counts), Team::B);
    }
}
