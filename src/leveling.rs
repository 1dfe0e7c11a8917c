//! User level progression based on completed activity count.

/// Threshold table: minimum completed count, level number, title.
/// Ordered from highest to lowest so the first match wins.
const LEVELS: [(u64, u32, &str); 10] = [
    (10_000, 10, "Mythic"),
    (5_000, 9, "Legend"),
    (2_500, 8, "Champion"),
    (1_500, 7, "Elite"),
    (1_000, 6, "Master"),
    (750, 5, "Expert"),
    (500, 4, "Skilled"),
    (300, 3, "Rising"),
    (200, 2, "Starter"),
    (100, 1, "Rookie"),
];

/// Level number and title for a completed-activity count.
pub fn level_for(completed: u64) -> (u32, &'static str) {
    for &(threshold, level, title) in LEVELS.iter() {
        if completed >= threshold {
            return (level, title);
        }
    }
    (0, "Newcomer")
}

/// Completed count required for the next level, or `None` at max level.
pub fn next_level_at(completed: u64) -> Option<u64> {
    LEVELS
        .iter()
        .rev()
        .map(|&(threshold, _, _)| threshold)
        .find(|&threshold| threshold > completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_for(0), (0, "Newcomer"));
        assert_eq!(level_for(99), (0, "Newcomer"));
        assert_eq!(level_for(100), (1, "Rookie"));
        assert_eq!(level_for(199), (1, "Rookie"));
        assert_eq!(level_for(200), (2, "Starter"));
        assert_eq!(level_for(300), (3, "Rising"));
        assert_eq!(level_for(500), (4, "Skilled"));
        assert_eq!(level_for(750), (5, "Expert"));
        assert_eq!(level_for(1_000), (6, "Master"));
        assert_eq!(level_for(1_500), (7, "Elite"));
        assert_eq!(level_for(2_500), (8, "Champion"));
        assert_eq!(level_for(5_000), (9, "Legend"));
        assert_eq!(level_for(10_000), (10, "Mythic"));
        assert_eq!(level_for(50_000), (10, "Mythic"));
    }

    #[test]
    fn test_next_level_at() {
        assert_eq!(next_level_at(0), Some(100));
        assert_eq!(next_level_at(99), Some(100));
        assert_eq!(next_level_at(100), Some(200));
        assert_eq!(next_level_at(9_999), Some(10_000));
        assert_eq!(next_level_at(10_000), None);
        assert_eq!(next_level_at(20_000), None);
    }
}
