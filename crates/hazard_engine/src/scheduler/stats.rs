//! Task timing and data-transfer tables.

use serde::Serialize;
use std::collections::BTreeMap;

/// Summary of the durations of one task kind.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimingRow {
    /// Task kind.
    pub kind: String,
    /// Number of completed tasks.
    pub count: usize,
    /// Mean duration, seconds.
    pub mean: f64,
    /// Population standard deviation, seconds.
    pub stddev: f64,
    /// Shortest duration, seconds.
    pub min: f64,
    /// Longest duration, seconds.
    pub max: f64,
}

/// Durations of completed tasks by kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimingTable {
    samples: BTreeMap<String, Vec<f64>>,
}

impl TimingTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one duration in seconds.
    pub fn record(&mut self, kind: &str, seconds: f64) {
        self.samples.entry(kind.to_string()).or_default().push(seconds);
    }

    /// One row per kind, in kind order.
    ///
    /// ```
    /// use hazard_engine::scheduler::stats::TimingTable;
    ///
    /// let mut table = TimingTable::new();
    /// for s in [1.0, 2.0, 3.0] {
    ///     table.record("classical", s);
    /// }
    /// let row = &table.rows()[0];
    /// assert_eq!((row.count, row.mean, row.min, row.max), (3, 2.0, 1.0, 3.0));
    /// ```
    pub fn rows(&self) -> Vec<TimingRow> {
        self.samples
            .iter()
            .map(|(kind, xs)| {
                let n = xs.len() as f64;
                let mean = xs.iter().sum::<f64>() / n;
                let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                TimingRow {
                    kind: kind.clone(),
                    count: xs.len(),
                    mean,
                    stddev: var.sqrt(),
                    min: xs.iter().copied().fold(f64::INFINITY, f64::min),
                    max: xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                }
            })
            .collect()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Bytes moved for one task kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransferRow {
    /// Task kind.
    pub kind: String,
    /// Messages sent, retries included.
    pub messages: u64,
    /// Bytes sent to workers.
    pub sent: u64,
    /// Bytes received from workers.
    pub received: u64,
}

/// Data transfer by task kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferTable {
    rows: BTreeMap<String, TransferRow>,
}

impl TransferTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message sent.
    pub fn record_sent(&mut self, kind: &str, bytes: u64) {
        let row = self.row_mut(kind);
        row.messages += 1;
        row.sent += bytes;
    }

    /// Records a result received.
    pub fn record_received(&mut self, kind: &str, bytes: u64) {
        self.row_mut(kind).received += bytes;
    }

    /// Rows in kind order.
    pub fn rows(&self) -> Vec<TransferRow> {
        self.rows.values().cloned().collect()
    }

    fn row_mut(&mut self, kind: &str) -> &mut TransferRow {
        self.rows.entry(kind.to_string()).or_insert_with(|| TransferRow {
            kind: kind.to_string(),
            ..TransferRow::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_population_stddev() {
        let mut table = TimingTable::new();
        for s in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            table.record("classical", s);
        }
        table.record("other", 1.0);
        let rows = table.rows();
        assert_eq!(rows.len(), 2);
        assert_relative_eq!(rows[0].stddev, 2.0, epsilon = 1e-12);
        assert_eq!(rows[1].stddev, 0.0);
    }

    #[test]
    fn test_transfer_counts_retries() {
        let mut table = TransferTable::new();
        table.record_sent("classical", 100);
        table.record_sent("classical", 100);
        table.record_received("classical", 40);
        assert_eq!(
            table.rows(),
            vec![TransferRow {
                kind: "classical".to_string(),
                messages: 2,
                sent: 200,
                received: 40
            }]
        );
    }
}
