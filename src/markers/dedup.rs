use nalgebra::Vector3;
use tracing::debug;

/// Set of accepted marker positions with a minimum pairwise separation.
///
/// Every pair of entries is at least `min_separation` apart. Lookups are a
/// linear scan; a session places tens to low hundreds of markers.
#[derive(Debug, Clone)]
pub struct MarkerDeduplicator {
    min_separation: f64,
    positions: Vec<Vector3<f64>>,
}

impl MarkerDeduplicator {
    pub fn new(min_separation: f64) -> Self {
        Self {
            min_separation,
            positions: Vec::new(),
        }
    }

    /// Record `position` unless an existing marker lies closer than the minimum separation
    pub fn try_place(&mut self, position: Vector3<f64>) -> bool {
        if self.is_duplicate(&position) {
            debug!(
                "Marker at ({:.3}, {:.3}, {:.3}) already covered",
                position.x, position.y, position.z
            );
            return false;
        }

        self.positions.push(position);
        true
    }

    /// Check whether `position` falls within the separation radius of an accepted marker
    pub fn is_duplicate(&self, position: &Vector3<f64>) -> bool {
        self.positions
            .iter()
            .any(|placed| (position - placed).norm() < self.min_separation)
    }

    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Drop all accepted positions (session teardown only)
    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_position_placed_once() {
        let mut dedup = MarkerDeduplicator::new(0.05);
        let p = Vector3::new(1.0, 2.0, 3.0);

        assert!(dedup.try_place(p));
        assert!(!dedup.try_place(p));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_nearby_position_rejected() {
        let mut dedup = MarkerDeduplicator::new(0.05);
        assert!(dedup.try_place(Vector3::zeros()));

        assert!(!dedup.try_place(Vector3::new(0.03, 0.0, 0.03)));
        assert!(dedup.try_place(Vector3::new(0.0, 0.06, 0.0)));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_exact_separation_is_accepted() {
        let mut dedup = MarkerDeduplicator::new(0.5);
        assert!(dedup.try_place(Vector3::zeros()));
        assert!(dedup.try_place(Vector3::new(0.5, 0.0, 0.0)));
    }

    #[test]
    fn test_pairwise_separation_invariant() {
        let mut dedup = MarkerDeduplicator::new(0.05);
        for i in 0..200 {
            let t = i as f64 * 0.013;
            dedup.try_place(Vector3::new(t.sin() * 0.3, t.cos() * 0.3, t * 0.01));
        }

        let positions = dedup.positions();
        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                assert!((a - b).norm() >= 0.05);
            }
        }
    }

    #[test]
    fn test_rejection_does_not_mutate() {
        let mut dedup = MarkerDeduplicator::new(0.05);
        dedup.try_place(Vector3::zeros());
        let before = dedup.positions().to_vec();

        dedup.try_place(Vector3::new(0.01, 0.0, 0.0));
        assert_eq!(dedup.positions(), before.as_slice());

        dedup.clear();
        assert!(dedup.is_empty());
    }
}
