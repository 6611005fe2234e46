//! Metrics infrastructure for the osmterra pipeline.
//!
//! Every metric the pipeline records is declared once as a structured [`Metric`]
//! constant in [`metric_defs`]. The `metrics` crate is re-exported so callers can
//! install any recorder they like; with no recorder installed every call is a no-op.
//!
//! # Example
//!
//! ```rust
//! use osmterra_metrics::{describe_metrics, metric_defs};
//!
//! // Register descriptions once at startup.
//! describe_metrics();
//!
//! metrics::counter!(metric_defs::QUERY_FEATURES_PARSED.name, "kind" => "way").increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_histogram, Unit};

/// How a metric is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonic total.
    Counter,
    /// Distribution of observed values.
    Histogram,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
        })
    }
}

/// A metric declaration: name, kind and the metadata exporters display.
///
/// ```rust
/// use osmterra_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const RINGS: Metric = Metric::counter("osmterra.rings.assembled")
///     .with_description("Rings produced by the ring assembler");
///
/// assert_eq!(RINGS.kind, MetricKind::Counter);
/// assert_eq!(RINGS.unit, Unit::Count);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Metric {
    /// Dotted metric name, always under the `osmterra.` prefix.
    pub name: &'static str,
    /// Counter or histogram.
    pub kind: MetricKind,
    /// One-line description.
    pub description: &'static str,
    /// Unit of the recorded values; [`Unit::Count`] unless overridden.
    pub unit: Unit,
    /// Label keys attached at the recording sites.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Metric {
            name,
            kind,
            description: "",
            unit: Unit::Count,
            labels: &[],
        }
    }

    /// Declare a counter.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Declare a histogram.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Set the description.
    pub const fn with_description(self, description: &'static str) -> Self {
        Metric { description, ..self }
    }

    /// Override the default [`Unit::Count`].
    pub const fn with_unit(self, unit: Unit) -> Self {
        Metric { unit, ..self }
    }

    /// Set the label keys recorded with the metric.
    pub const fn with_labels(self, labels: &'static [&'static str]) -> Self {
        Metric { labels, ..self }
    }

    /// Register the description and unit with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, self.unit, self.description),
            MetricKind::Histogram => describe_histogram!(self.name, self.unit, self.description),
        }
    }
}

/// All metric definitions used by the pipeline.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Query Parsing
    // ========================================================================

    /// Features produced by the query parser.
    ///
    /// Labels: kind (way, relation)
    pub const QUERY_FEATURES_PARSED: Metric = Metric::counter("osmterra.query.features_parsed")
        .with_description("Features produced from a vector query response")
        .with_labels(&["kind"]);

    /// Elements dropped by the query parser.
    ///
    /// Labels: reason (unknown_type, missing_id, too_few_points, malformed)
    pub const QUERY_ELEMENTS_SKIPPED: Metric = Metric::counter("osmterra.query.elements_skipped")
        .with_description("Query elements skipped as unusable")
        .with_labels(&["reason"]);

    // ========================================================================
    // Ring Assembly
    // ========================================================================

    /// Rings kept by the ring assembler.
    pub const RINGS_ASSEMBLED: Metric = Metric::counter("osmterra.rings.assembled")
        .with_description("Rings produced by joining way fragments");

    /// Rings discarded for having fewer than three coordinates.
    pub const RINGS_DROPPED: Metric = Metric::counter("osmterra.rings.dropped")
        .with_description("Assembled fragments dropped for being too short");

    /// Fragments joined onto each seed before its ring was closed off.
    pub const RING_JOIN_STEPS: Metric = Metric::histogram("osmterra.rings.join_steps")
        .with_description("Fragments joined per assembled ring");

    // ========================================================================
    // Terrain
    // ========================================================================

    /// Bytes written by the terrain codec.
    pub const TERRAIN_BYTES_ENCODED: Metric = Metric::counter("osmterra.terrain.bytes_encoded")
        .with_description("Bytes produced by terrain serialization")
        .with_unit(Unit::Bytes);

    /// Bytes consumed by the terrain codec.
    pub const TERRAIN_BYTES_DECODED: Metric = Metric::counter("osmterra.terrain.bytes_decoded")
        .with_description("Bytes consumed by terrain deserialization")
        .with_unit(Unit::Bytes);

    /// Destination cells written by the compositor.
    pub const TERRAIN_CELLS_COMPOSITED: Metric =
        Metric::counter("osmterra.terrain.cells_composited")
            .with_description("Destination cells written while compositing terrains");

    /// Every metric, for bulk registration.
    pub const ALL: &[Metric] = &[
        QUERY_FEATURES_PARSED,
        QUERY_ELEMENTS_SKIPPED,
        RINGS_ASSEMBLED,
        RINGS_DROPPED,
        RING_JOIN_STEPS,
        TERRAIN_BYTES_ENCODED,
        TERRAIN_BYTES_DECODED,
        TERRAIN_CELLS_COMPOSITED,
    ];
}

/// Registers descriptions for every metric in [`metric_defs::ALL`].
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_builder() {
        const M: Metric = Metric::histogram("test.histogram")
            .with_description("desc")
            .with_unit(Unit::Bytes)
            .with_labels(&["a"]);

        assert_eq!(M.kind, MetricKind::Histogram);
        assert_eq!(M.description, "desc");
        assert_eq!(M.unit, Unit::Bytes);
        assert_eq!(M.labels, &["a"]);
    }

    #[test]
    fn test_metric_names_are_unique_and_namespaced() {
        let mut seen = HashSet::new();
        for metric in metric_defs::ALL {
            assert!(metric.name.starts_with("osmterra."), "{}", metric.name);
            assert!(seen.insert(metric.name), "duplicate metric {}", metric.name);
            assert!(!metric.description.is_empty());
        }
    }

    #[test]
    fn test_describe_without_recorder() {
        // No recorder installed: must be a no-op rather than a panic.
        describe_metrics();
    }

    #[test]
    fn test_defaults() {
        assert_eq!(metric_defs::RINGS_ASSEMBLED.unit, Unit::Count);
        assert!(metric_defs::RINGS_ASSEMBLED.labels.is_empty());
        assert_eq!(metric_defs::RING_JOIN_STEPS.kind.to_string(), "histogram");
    }
}
