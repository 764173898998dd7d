use crate::types::{MatrixEntry, RouteSegment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pairwise distances taken from the OK cells of a distance matrix
#[derive(Debug, Default, Clone)]
pub struct DistanceLookup {
    meters: HashMap<(String, String), u64>,
}

impl DistanceLookup {
    pub fn from_matrix(entries: &[MatrixEntry]) -> Self {
        let meters = entries
            .iter()
            .filter_map(|entry| {
                entry.leg().map(|leg| {
                    (
                        (entry.origin.clone(), entry.destination.clone()),
                        leg.distance_meters,
                    )
                })
            })
            .collect();
        Self { meters }
    }

    pub fn distance(&self, from: &str, to: &str) -> Option<u64> {
        self.meters.get(&(from.to_string(), to.to_string())).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }
}

/// Order `locations` greedily by nearest neighbour starting at `start`.
///
/// Missing distances count as unreachable; ties go to the earlier input location. `end`,
/// when given, is removed from the candidates and appended unless the route already ends
/// there, so `end == start` closes a round trip. Duplicate names are visited once.
pub fn order_route(
    locations: &[String],
    start: &str,
    end: Option<&str>,
    matrix: &[MatrixEntry],
) -> Vec<String> {
    if locations.is_empty() {
        return Vec::new();
    }

    let lookup = DistanceLookup::from_matrix(matrix);

    let mut remaining: Vec<&str> = Vec::with_capacity(locations.len());
    for location in locations {
        let location = location.as_str();
        if location == start || Some(location) == end || remaining.contains(&location) {
            continue;
        }
        remaining.push(location);
    }

    let mut route = vec![start.to_string()];
    let mut current = start;

    while !remaining.is_empty() {
        let mut best_index = 0;
        let mut best_distance = u64::MAX;
        let mut found = false;

        for (index, candidate) in remaining.iter().enumerate() {
            if let Some(distance) = lookup.distance(current, candidate) {
                if !found || distance < best_distance {
                    best_index = index;
                    best_distance = distance;
                    found = true;
                }
            }
        }

        let next = remaining.remove(best_index);
        route.push(next.to_string());
        current = next;
    }

    if let Some(end) = end {
        if route.last().map(String::as_str) != Some(end) {
            route.push(end.to_string());
        }
    }

    route
}

/// A leg pair where skipping the intermediate stop would be much shorter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktrackingIssue {
    /// Index of the second segment of the pair
    pub segment_index: usize,
    pub issue: String,
    pub suggestion: String,
    pub direct_meters: u64,
    pub indirect_meters: u64,
}

/// Flag consecutive segments `a → b → c` where `a → c` is shorter than
/// `ratio` times the `a → b` plus `b → c` distance.
pub fn detect_backtracking(
    segments: &[RouteSegment],
    matrix: &[MatrixEntry],
    ratio: f64,
) -> Vec<BacktrackingIssue> {
    let lookup = DistanceLookup::from_matrix(matrix);

    segments
        .windows(2)
        .enumerate()
        .filter_map(|(offset, pair)| {
            let (previous, current) = (&pair[0], &pair[1]);
            let direct = lookup.distance(&previous.origin, &current.destination)?;
            let indirect = previous.distance_meters + current.distance_meters;
            if indirect == 0 || (direct as f64) >= ratio * indirect as f64 {
                return None;
            }
            Some(BacktrackingIssue {
                segment_index: offset + 1,
                issue: format!(
                    "Possible backtracking: {} → {} → {} covers {:.1} km, the direct leg is {:.1} km",
                    previous.origin,
                    current.origin,
                    current.destination,
                    indirect as f64 / 1000.0,
                    direct as f64 / 1000.0
                ),
                suggestion: format!(
                    "Consider going from {} straight to {}",
                    previous.origin, current.destination
                ),
                direct_meters: direct,
                indirect_meters: indirect,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatrixLeg;

    fn cell(origin: &str, destination: &str, meters: u64) -> MatrixEntry {
        MatrixEntry::ok(
            origin,
            destination,
            MatrixLeg {
                distance_meters: meters,
                distance_text: format!("{} m", meters),
                duration_seconds: meters / 10,
                duration_text: String::new(),
                duration_in_traffic_seconds: None,
                duration_in_traffic_text: None,
            },
        )
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_nearest_neighbour_order() {
        let matrix = vec![
            cell("Hotel", "A", 5_000),
            cell("Hotel", "B", 1_000),
            cell("B", "A", 2_000),
            cell("A", "B", 2_000),
        ];
        let route = order_route(&names(&["A", "B"]), "Hotel", None, &matrix);
        assert_eq!(route, names(&["Hotel", "B", "A"]));
    }

    #[test]
    fn test_end_is_appended_last() {
        let matrix = vec![
            cell("Hotel", "Airport", 100),
            cell("Hotel", "A", 1_000),
            cell("A", "Airport", 1_000),
        ];
        let route = order_route(
            &names(&["Airport", "A"]),
            "Hotel",
            Some("Airport"),
            &matrix,
        );
        assert_eq!(route, names(&["Hotel", "A", "Airport"]));
    }

    #[test]
    fn test_round_trip_returns_to_start() {
        let route = order_route(&names(&["A", "B"]), "Hotel", Some("Hotel"), &[]);
        assert_eq!(route, names(&["Hotel", "A", "B", "Hotel"]));
    }

    #[test]
    fn test_ties_prefer_input_order_and_missing_pairs_lose() {
        let matrix = vec![cell("S", "B", 500), cell("S", "C", 500)];
        let route = order_route(&names(&["A", "C", "B"]), "S", None, &matrix);
        assert_eq!(route, names(&["S", "C", "A", "B"]));
    }

    #[test]
    fn test_empty_input() {
        assert!(order_route(&[], "S", None, &[]).is_empty());
    }

    #[test]
    fn test_duplicates_and_start_are_visited_once() {
        let route = order_route(&names(&["S", "A", "A"]), "S", None, &[]);
        assert_eq!(route, names(&["S", "A"]));
    }

    #[test]
    fn test_failed_cells_are_ignored() {
        let matrix = vec![
            MatrixEntry::failed("S", "A", "ZERO_RESULTS", "no route"),
            cell("S", "B", 9_000),
        ];
        let route = order_route(&names(&["A", "B"]), "S", None, &matrix);
        assert_eq!(route, names(&["S", "B", "A"]));
    }

    #[test]
    fn test_backtracking_detected() {
        let segments = vec![
            RouteSegment::new("A", "B").with_distance(10_000),
            RouteSegment::new("B", "C").with_distance(10_000),
        ];
        let matrix = vec![cell("A", "C", 2_000)];
        let issues = detect_backtracking(&segments, &matrix, 0.7);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].segment_index, 1);
        assert!(issues[0].suggestion.contains("A straight to C"));
    }

    #[test]
    fn test_no_backtracking_when_direct_is_long() {
        let segments = vec![
            RouteSegment::new("A", "B").with_distance(1_000),
            RouteSegment::new("B", "C").with_distance(1_000),
        ];
        let matrix = vec![cell("A", "C", 1_900)];
        assert!(detect_backtracking(&segments, &matrix, 0.7).is_empty());
        assert!(detect_backtracking(&segments, &[], 0.7).is_empty());
    }
}
