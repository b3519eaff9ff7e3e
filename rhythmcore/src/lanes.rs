//! Lane assignment.
//!
//! A pitch prefers lane `(pitch % 12) % lane_count`. When that cell of the
//! row is taken, the search walks outward right-then-left: `+1, -1, +2, -2,
//! ...`. A full row drops the note.

use crate::chart::Chart;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneAssigner {
    lane_count: usize,
}

impl LaneAssigner {
    pub fn new(lane_count: usize) -> Self {
        Self {
            lane_count: lane_count.max(1),
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn preferred_lane(&self, pitch: u8) -> usize {
        usize::from(pitch % 12) % self.lane_count
    }

    /// Lanes to try for `pitch`, in search order. Each lane appears once.
    pub fn candidates(&self, pitch: u8) -> impl Iterator<Item = usize> {
        let preferred = self.preferred_lane(pitch);
        let count = self.lane_count;
        std::iter::once(preferred).chain((1..count).flat_map(move |distance| {
            let right = Some(preferred + distance).filter(|&lane| lane < count);
            let left = preferred.checked_sub(distance);
            right.into_iter().chain(left)
        }))
    }

    /// First lane accepted by `is_free`, or `None` when every lane is taken.
    pub fn assign(&self, pitch: u8, is_free: impl Fn(usize) -> bool) -> Option<usize> {
        self.candidates(pitch).find(|&lane| is_free(lane))
    }

    pub fn assign_in_row(&self, chart: &Chart, row: usize, pitch: u8) -> Option<usize> {
        self.assign(pitch, |lane| !chart.is_occupied(row, lane))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_row_takes_preferred_lane() {
        let assigner = LaneAssigner::new(8);
        for pitch in 0..=127u8 {
            assert_eq!(assigner.assign(pitch, |_| true), Some(usize::from(pitch % 12) % 8));
        }
    }

    #[test]
    fn test_search_order_right_then_left() {
        let assigner = LaneAssigner::new(8);
        // pitch 63 -> 3 % 12 = 3
        let order: Vec<usize> = assigner.candidates(63).collect();
        assert_eq!(order, vec![3, 4, 2, 5, 1, 6, 0, 7]);
    }

    #[test]
    fn test_search_at_edges() {
        let assigner = LaneAssigner::new(8);
        // pitch 60 -> lane 0, nothing to the left
        assert_eq!(assigner.candidates(60).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5, 6, 7]);
        // pitch 71 -> 11 % 8 = 3
        assert_eq!(assigner.preferred_lane(71), 3);
        // pitch 67 -> 7, nothing to the right
        assert_eq!(assigner.candidates(67).collect::<Vec<_>>(), vec![7, 6, 5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_collision_moves_right() {
        let assigner = LaneAssigner::new(8);
        assert_eq!(assigner.assign(72, |lane| lane != 0), Some(1));
        assert_eq!(assigner.assign(65, |lane| lane != 5 && lane != 6), Some(4));
    }

    #[test]
    fn test_full_row_drops() {
        let assigner = LaneAssigner::new(4);
        assert_eq!(assigner.assign(60, |_| false), None);
    }
}
