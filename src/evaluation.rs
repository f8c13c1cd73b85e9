// src/evaluation.rs
//
// Accuracy evaluation against ground-truth labels. Truth files are CSVs
// with a header row and the label in the second column; rows labeled
// "Ignore" are excluded, as are frames predicted "Undetected" (those are
// tallied separately by the batch runner, not scored). Metrics follow the
// usual binary definitions with a configurable positive label.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryMetrics {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl BinaryMetrics {
    /// Compare paired prediction/truth labels, treating `positive` as the
    /// positive class. Pairs whose truth label is "Ignore" or whose
    /// prediction is "Undetected" are skipped.
    pub fn compute(pairs: &[(String, String)], positive: &str) -> Self {
        let mut m = Self::default();
        for (pred, truth) in pairs {
            if truth == "Ignore" || pred == "Undetected" {
                continue;
            }
            match (pred == positive, truth == positive) {
                (true, true) => m.tp += 1,
                (true, false) => m.fp += 1,
                (false, false) => m.tn += 1,
                (false, true) => m.fn_ += 1,
            }
        }
        m
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        (self.tp + self.tn) as f64 / self.total() as f64
    }

    pub fn precision(&self) -> f64 {
        if self.tp + self.fp == 0 {
            return 0.0;
        }
        self.tp as f64 / (self.tp + self.fp) as f64
    }

    pub fn recall(&self) -> f64 {
        if self.tp + self.fn_ == 0 {
            return 0.0;
        }
        self.tp as f64 / (self.tp + self.fn_) as f64
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }

    pub fn log_summary(&self, name: &str) {
        info!(
            "[{}] acc={:.3} prec={:.3} rec={:.3} f1={:.3} (n={}, TP:{} FN:{} FP:{} TN:{})",
            name,
            self.accuracy(),
            self.precision(),
            self.recall(),
            self.f1(),
            self.total(),
            self.tp,
            self.fn_,
            self.fp,
            self.tn
        );
    }
}

/// Load per-frame truth labels from a CSV (header row, label in the second
/// column).
pub fn load_truth_labels(path: &Path) -> Result<Vec<String>> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading truth {}", path.display()))?;
    Ok(contents
        .lines()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.split(',').nth(1).unwrap_or("").trim().to_string())
        .collect())
}

/// Evaluate predictions against an optional truth file; mismatched lengths
/// are truncated to the shorter side.
pub fn evaluate(name: &str, predictions: &[String], truth_path: &Path, positive: &str) -> Result<BinaryMetrics> {
    let truth = load_truth_labels(truth_path)?;
    let pairs: Vec<(String, String)> = predictions
        .iter()
        .cloned()
        .zip(truth.into_iter())
        .collect();
    let metrics = BinaryMetrics::compute(&pairs, positive);
    metrics.log_summary(name);
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(data: &[(&str, &str)]) -> Vec<(String, String)> {
        data.iter()
            .map(|(p, t)| (p.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn test_confusion_counts() {
        let m = BinaryMetrics::compute(
            &pairs(&[
                ("Close", "Close"),
                ("Close", "Open"),
                ("Open", "Open"),
                ("Open", "Close"),
                ("Close", "Close"),
            ]),
            "Close",
        );
        assert_eq!((m.tp, m.fp, m.tn, m.fn_), (2, 1, 1, 1));
        assert!((m.accuracy() - 0.6).abs() < 1e-12);
        assert!((m.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_undetected_predictions_excluded() {
        // A frame the detector missed carries no chordae decision; it must
        // not surface as a false negative (or true negative) in the counts.
        let m = BinaryMetrics::compute(
            &pairs(&[("Undetected", "1"), ("Undetected", "0"), ("1", "1")]),
            "1",
        );
        assert_eq!(m.total(), 1);
        assert_eq!((m.tp, m.fp, m.tn, m.fn_), (1, 0, 0, 0));
    }

    #[test]
    fn test_ignore_rows_excluded() {
        let m = BinaryMetrics::compute(
            &pairs(&[("Close", "Ignore"), ("Open", "Open")]),
            "Close",
        );
        assert_eq!(m.total(), 1);
        assert_eq!(m.tn, 1);
    }

    #[test]
    fn test_empty_metrics_are_zero() {
        let m = BinaryMetrics::default();
        assert_eq!(m.accuracy(), 0.0);
        assert_eq!(m.precision(), 0.0);
        assert_eq!(m.recall(), 0.0);
        assert_eq!(m.f1(), 0.0);
    }
}
