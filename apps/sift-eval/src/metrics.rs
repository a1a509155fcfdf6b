use std::collections::HashSet;

use serde::Serialize;

/// Ranking quality of one result list against the expected scenes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Metrics {
	pub recall_at_k: f64,
	pub precision_at_k: f64,
	pub rr: f64,
	pub ndcg: f64,
}
impl Metrics {
	pub fn mean(all: &[Metrics]) -> Self {
		let count = all.len().max(1) as f64;
		let sum = |field: fn(&Metrics) -> f64| all.iter().map(field).sum::<f64>() / count;

		Self {
			recall_at_k: sum(|m| m.recall_at_k),
			precision_at_k: sum(|m| m.precision_at_k),
			rr: sum(|m| m.rr),
			ndcg: sum(|m| m.ndcg),
		}
	}

	/// Field-wise `self - baseline`.
	pub fn delta(&self, baseline: &Metrics) -> Self {
		Self {
			recall_at_k: self.recall_at_k - baseline.recall_at_k,
			precision_at_k: self.precision_at_k - baseline.precision_at_k,
			rr: self.rr - baseline.rr,
			ndcg: self.ndcg - baseline.ndcg,
		}
	}
}

/// Drops repeated scene ids, keeping the first occurrence.
pub fn unique_ids<'a, I>(iter: I) -> Vec<String>
where
	I: Iterator<Item = &'a str>,
{
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for id in iter {
		if seen.insert(id) {
			out.push(id.to_string());
		}
	}

	out
}

pub fn compute_metrics(retrieved: &[String], expected: &HashSet<String>) -> Metrics {
	let expected_count = expected.len();

	let mut relevant_count = 0usize;
	let mut dcg = 0.0_f64;
	let mut first_hit: Option<usize> = None;

	for (idx, id) in retrieved.iter().enumerate() {
		if !expected.contains(id) {
			continue;
		}

		let rank = idx + 1;

		relevant_count += 1;
		dcg += 1.0 / (rank as f64 + 1.0).log2();

		if first_hit.is_none() {
			first_hit = Some(rank);
		}
	}

	let rr = first_hit.map(|rank| 1.0 / rank as f64).unwrap_or(0.0);
	let ideal_hits = expected_count.min(retrieved.len());
	let idcg: f64 = (1..=ideal_hits).map(|rank| 1.0 / (rank as f64 + 1.0).log2()).sum();
	let ndcg = if idcg > 0.0 { dcg / idcg } else { 0.0 };
	let precision_at_k =
		if retrieved.is_empty() { 0.0 } else { relevant_count as f64 / retrieved.len() as f64 };
	let recall_at_k =
		if expected_count == 0 { 0.0 } else { relevant_count as f64 / expected_count as f64 };

	Metrics { recall_at_k, precision_at_k, rr, ndcg }
}

/// Positional and set churn of `other` against `baseline` over the first `k` ids.
pub fn churn_against_baseline_at_k(baseline: &[String], other: &[String], k: usize) -> (f64, f64) {
	let k = k.max(1);
	let positional_diff = (0..k).filter(|idx| baseline.get(*idx) != other.get(*idx)).count();
	let positional_churn = positional_diff as f64 / k as f64;
	let base_set: HashSet<&String> = baseline.iter().take(k).collect();
	let other_set: HashSet<&String> = other.iter().take(k).collect();
	let overlap = base_set.intersection(&other_set).count();
	let set_churn = 1.0 - (overlap as f64 / k as f64);

	(positional_churn, set_churn)
}

/// Linear-interpolated percentile over an ascending slice.
pub fn percentile(values: &[f64], percentile: f64) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let clamped = percentile.clamp(0.0, 1.0);
	let pos = clamped * (values.len() as f64 - 1.0);
	let lower = pos.floor() as usize;
	let upper = pos.ceil() as usize;

	if lower == upper {
		values[lower]
	} else {
		let weight = pos - lower as f64;

		values[lower] * (1.0 - weight) + values[upper] * weight
	}
}
