//! Ring assembly from way fragments.
//!
//! OSM relations routinely split one logical ring across several member ways.
//! [`RingAssembler`] rebuilds complete rings by transitively joining fragments
//! that share an endpoint.

use crate::model::Coordinate;
use osmterra_metrics::metric_defs;
use std::collections::VecDeque;
use tracing::trace;

/// Default endpoint tolerance in degrees (~0.1 m at the equator), applied per axis.
pub const ENDPOINT_TOLERANCE: f64 = 1e-6;

/// Default cap on extension steps per ring.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Minimum number of coordinates for an assembled ring to be kept.
const MIN_RING_POINTS: usize = 3;

/// How a fragment attaches to the ring being grown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Join {
    /// Fragment start meets ring end: append as-is.
    StartToEnd,
    /// Fragment end meets ring end: append reversed.
    EndToEnd,
    /// Fragment start meets ring start: prepend reversed.
    StartToStart,
    /// Fragment end meets ring start: prepend as-is.
    EndToStart,
}

/// Joins coordinate fragments into rings.
///
/// Output depends only on input order: seeds are taken from the front of the
/// pool and the first matching fragment wins on each extension step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingAssembler {
    /// Absolute per-axis tolerance for endpoint equality, in degrees.
    pub tolerance: f64,
    /// Maximum extension steps per ring.
    pub max_iterations: usize,
}

impl Default for RingAssembler {
    fn default() -> Self {
        Self {
            tolerance: ENDPOINT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl RingAssembler {
    /// Create an assembler with explicit tolerance and iteration cap.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Join fragments into rings.
    ///
    /// Rings with fewer than three coordinates are dropped.
    pub fn assemble(&self, segments: Vec<Vec<Coordinate>>) -> Vec<Vec<Coordinate>> {
        let mut pool: VecDeque<Vec<Coordinate>> =
            segments.into_iter().filter(|s| !s.is_empty()).collect();
        let mut rings = Vec::new();
        let mut dropped = 0u64;

        while let Some(seed) = pool.pop_front() {
            let (ring, steps) = self.grow(seed, &mut pool);
            metrics::histogram!(metric_defs::RING_JOIN_STEPS.name).record(steps as f64);
            if ring.len() >= MIN_RING_POINTS {
                rings.push(ring);
            } else {
                trace!(points = ring.len(), "dropping short ring");
                dropped += 1;
            }
        }

        metrics::counter!(metric_defs::RINGS_ASSEMBLED.name).increment(rings.len() as u64);
        metrics::counter!(metric_defs::RINGS_DROPPED.name).increment(dropped);
        rings
    }

    /// Extend `ring` with matching fragments from `pool` until none match.
    ///
    /// Returns the ring and the number of fragments joined onto it.
    fn grow(
        &self,
        mut ring: Vec<Coordinate>,
        pool: &mut VecDeque<Vec<Coordinate>>,
    ) -> (Vec<Coordinate>, usize) {
        for step in 0..self.max_iterations {
            let Some((index, join)) = self.find_match(&ring, pool) else {
                return (ring, step);
            };
            let Some(segment) = pool.remove(index) else {
                return (ring, step);
            };

            match join {
                Join::StartToEnd => ring.extend(segment.into_iter().skip(1)),
                Join::EndToEnd => ring.extend(segment.into_iter().rev().skip(1)),
                Join::StartToStart => {
                    let mut joined: Vec<Coordinate> = segment.into_iter().skip(1).rev().collect();
                    joined.append(&mut ring);
                    ring = joined;
                }
                Join::EndToStart => {
                    let mut joined = segment;
                    joined.pop();
                    joined.append(&mut ring);
                    ring = joined;
                }
            }
        }
        trace!(cap = self.max_iterations, "ring assembly hit iteration cap");
        (ring, self.max_iterations)
    }

    /// Find the first fragment in `pool` sharing an endpoint with `ring`.
    fn find_match(
        &self,
        ring: &[Coordinate],
        pool: &VecDeque<Vec<Coordinate>>,
    ) -> Option<(usize, Join)> {
        let ring_start = ring.first()?;
        let ring_end = ring.last()?;

        pool.iter().enumerate().find_map(|(index, segment)| {
            let seg_start = segment.first()?;
            let seg_end = segment.last()?;

            let join = if seg_start.approx_eq(ring_end, self.tolerance) {
                Join::StartToEnd
            } else if seg_end.approx_eq(ring_end, self.tolerance) {
                Join::EndToEnd
            } else if seg_start.approx_eq(ring_start, self.tolerance) {
                Join::StartToStart
            } else if seg_end.approx_eq(ring_start, self.tolerance) {
                Join::EndToStart
            } else {
                return None;
            };
            Some((index, join))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::is_closed;

    fn c(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat)
    }

    fn triangle_segments() -> Vec<Vec<Coordinate>> {
        vec![
            vec![c(0.0, 0.0), c(1.0, 0.0)],
            vec![c(1.0, 0.0), c(1.0, 1.0)],
            vec![c(1.0, 1.0), c(0.0, 0.0)],
        ]
    }

    fn assert_closed_triangle(ring: &[Coordinate]) {
        assert_eq!(ring.len(), 4, "3 unique points plus closure: {:?}", ring);
        assert!(is_closed(ring));
        for p in [c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0)] {
            assert!(ring.iter().any(|q| q.approx_eq(&p, 1e-9)), "missing {:?}", p);
        }
    }

    #[test]
    fn test_triangle_every_order() {
        let segments = triangle_segments();
        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        for order in orders {
            let input = order.iter().map(|&i| segments[i].clone()).collect();
            let rings = RingAssembler::default().assemble(input);
            assert_eq!(rings.len(), 1, "order {:?}", order);
            assert_closed_triangle(&rings[0]);
        }
    }

    #[test]
    fn test_reversed_fragments_join() {
        // Middle fragment digitised in the opposite direction.
        let input = vec![
            vec![c(0.0, 0.0), c(1.0, 0.0)],
            vec![c(1.0, 1.0), c(1.0, 0.0)],
            vec![c(0.0, 0.0), c(1.0, 1.0)],
        ];
        let rings = RingAssembler::default().assemble(input);
        assert_eq!(rings.len(), 1);
        assert_closed_triangle(&rings[0]);
    }

    #[test]
    fn test_disjoint_segments_stay_separate() {
        let input = vec![
            vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0)],
            vec![c(5.0, 5.0), c(6.0, 5.0), c(6.0, 6.0)],
            vec![c(10.0, 10.0), c(11.0, 10.0), c(11.0, 11.0)],
        ];
        let rings = RingAssembler::default().assemble(input.clone());
        assert_eq!(rings, input);
    }

    #[test]
    fn test_short_fragments_dropped() {
        let input = vec![vec![c(0.0, 0.0), c(1.0, 0.0)], vec![c(5.0, 5.0), c(6.0, 5.0)]];
        assert!(RingAssembler::default().assemble(input).is_empty());
        assert!(RingAssembler::default().assemble(Vec::new()).is_empty());
    }

    #[test]
    fn test_endpoint_tolerance() {
        let input = vec![
            vec![c(0.0, 0.0), c(1.0, 0.0)],
            vec![c(1.0000005, 0.0), c(1.0, 1.0)],
        ];
        let rings = RingAssembler::default().assemble(input.clone());
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 3);

        let strict = RingAssembler::new(1e-9, DEFAULT_MAX_ITERATIONS);
        assert!(strict.assemble(input).is_empty());
    }

    #[test]
    fn test_iteration_cap_limits_growth() {
        // A chain of 10 unit steps along the x axis.
        let input: Vec<_> = (0..10)
            .map(|i| vec![c(i as f64, 0.0), c(i as f64 + 1.0, 0.0)])
            .collect();

        let capped = RingAssembler::new(ENDPOINT_TOLERANCE, 2).assemble(input.clone());
        // Each ring absorbs at most two more fragments.
        assert!(capped.iter().all(|r| r.len() <= 4));
        assert!(capped.len() > 1);

        let full = RingAssembler::default().assemble(input);
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].len(), 11);
    }

    #[test]
    fn test_deterministic_output() {
        let input = triangle_segments();
        let a = RingAssembler::default().assemble(input.clone());
        let b = RingAssembler::default().assemble(input);
        assert_eq!(a, b);
    }
}
