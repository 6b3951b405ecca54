use std::{collections::BTreeMap, sync::Mutex};

use compass_domain::{Category, RecommendedItem};
use serde::Serialize;

pub(crate) const INSUFFICIENT_DATA: &str = "insufficient_data";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CategoryShare {
	pub count: u32,
	pub percentage: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryDistribution {
	pub categories: BTreeMap<Category, CategoryShare>,
	pub dominant_category: Option<Category>,
	pub dominance_percentage: f32,
	/// Distinct categories over total items, in [0,1].
	pub diversity: f32,
	pub has_dominance: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BiasReport {
	pub has_bias: bool,
	/// How far past the threshold the teaching share sits, in [0,1].
	pub severity: f32,
	pub teaching_percentage: f32,
	pub reason: Option<&'static str>,
	pub distribution: CategoryDistribution,
}

/// Share of each category across the recommended items. Dominance means a
/// single category holds strictly more than the threshold share.
pub fn analyze_category_distribution(
	items: &[RecommendedItem],
	dominance_threshold: f32,
) -> CategoryDistribution {
	let total = items.len() as u32;
	let mut categories: BTreeMap<Category, CategoryShare> = BTreeMap::new();

	for item in items {
		let share =
			categories.entry(item.category).or_insert(CategoryShare { count: 0, percentage: 0.0 });

		share.count += 1;
	}
	for share in categories.values_mut() {
		share.percentage = share.count as f32 / total as f32 * 100.0;
	}

	// Ties resolve to the declaration order of the taxonomy.
	let dominant = categories
		.iter()
		.max_by(|(left_cat, left), (right_cat, right)| {
			left.count.cmp(&right.count).then_with(|| right_cat.cmp(left_cat))
		})
		.map(|(category, share)| (*category, share.percentage));
	let (dominant_category, dominance_percentage) = match dominant {
		Some((category, percentage)) => (Some(category), percentage),
		None => (None, 0.0),
	};
	let diversity = if total == 0 { 0.0 } else { categories.len() as f32 / total as f32 };
	let has_dominance = dominance_percentage / 100.0 > dominance_threshold;

	CategoryDistribution {
		categories,
		dominant_category,
		dominance_percentage,
		diversity,
		has_dominance,
	}
}

/// Post-hoc check for over-representation of teaching careers. Advisory
/// only; the pipeline never blocks on a biased answer.
pub fn detect_teaching_bias(
	items: &[RecommendedItem],
	dominance_threshold: f32,
	min_items: u32,
) -> BiasReport {
	let distribution = analyze_category_distribution(items, dominance_threshold);
	let total = items.len() as u32;
	let teaching = distribution
		.categories
		.get(&Category::Education)
		.map_or(0, |share| share.count);
	let teaching_share = if total == 0 { 0.0 } else { teaching as f32 / total as f32 };

	if total < min_items {
		return BiasReport {
			has_bias: false,
			severity: 0.0,
			teaching_percentage: teaching_share * 100.0,
			reason: Some(INSUFFICIENT_DATA),
			distribution,
		};
	}

	let has_bias = teaching_share > dominance_threshold;
	let severity = if has_bias {
		((teaching_share - dominance_threshold) / (1.0 - dominance_threshold)).clamp(0.0, 1.0)
	} else {
		0.0
	};

	BiasReport {
		has_bias,
		severity,
		teaching_percentage: teaching_share * 100.0,
		reason: None,
		distribution,
	}
}

#[derive(Debug, Default)]
struct StatsInner {
	total_analyses: u64,
	bias_detected: u64,
	teaching_bias: u64,
	category_dominance: u64,
}

/// Running counters over every bias analysis the service performs.
#[derive(Debug, Default)]
pub struct BiasStats {
	inner: Mutex<StatsInner>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BiasStatsSnapshot {
	pub total_analyses: u64,
	pub bias_detection_rate: f32,
	pub teaching_bias_rate: f32,
	pub category_dominance_rate: f32,
}

impl BiasStats {
	pub fn record(&self, report: &BiasReport) {
		let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

		inner.total_analyses += 1;

		if report.has_bias || report.distribution.has_dominance {
			inner.bias_detected += 1;
		}
		if report.has_bias {
			inner.teaching_bias += 1;
		}
		if report.distribution.has_dominance {
			inner.category_dominance += 1;
		}
	}

	pub fn snapshot(&self) -> BiasStatsSnapshot {
		let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
		let rate = |count: u64| {
			if inner.total_analyses == 0 {
				0.0
			} else {
				count as f32 / inner.total_analyses as f32
			}
		};

		BiasStatsSnapshot {
			total_analyses: inner.total_analyses,
			bias_detection_rate: rate(inner.bias_detected),
			teaching_bias_rate: rate(inner.teaching_bias),
			category_dominance_rate: rate(inner.category_dominance),
		}
	}

	pub fn reset(&self) {
		let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

		*inner = StatsInner::default();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(title: &str, category: Category) -> RecommendedItem {
		RecommendedItem {
			title: title.to_string(),
			description: String::new(),
			category,
		}
	}

	fn teaching_heavy() -> Vec<RecommendedItem> {
		let mut items: Vec<RecommendedItem> = (0..7)
			.map(|idx| item(&format!("Teacher {idx}"), Category::Education))
			.collect();

		items.push(item("Engineer", Category::Engineering));
		items.push(item("Nurse", Category::Health));
		items.push(item("Lawyer", Category::Law));

		items
	}

	#[test]
	fn seven_of_ten_teaching_items_flag_bias() {
		let report = detect_teaching_bias(&teaching_heavy(), 0.6, 3);

		assert!(report.has_bias);
		assert!((report.teaching_percentage - 70.0).abs() < 1e-4);
		assert!((report.severity - 0.25).abs() < 1e-4);
		assert_eq!(report.reason, None);
		assert_eq!(report.distribution.dominant_category, Some(Category::Education));
		assert!(report.distribution.has_dominance);
	}

	#[test]
	fn too_few_items_report_insufficient_data() {
		let items = vec![item("Teacher", Category::Education), item("Tutor", Category::Education)];
		let report = detect_teaching_bias(&items, 0.6, 3);

		assert!(!report.has_bias);
		assert_eq!(report.severity, 0.0);
		assert_eq!(report.reason, Some(INSUFFICIENT_DATA));
	}

	#[test]
	fn balanced_items_carry_no_bias() {
		let items = vec![
			item("Teacher", Category::Education),
			item("Engineer", Category::Engineering),
			item("Nurse", Category::Health),
			item("Developer", Category::Technology),
		];
		let report = detect_teaching_bias(&items, 0.6, 3);

		assert!(!report.has_bias);
		assert!(!report.distribution.has_dominance);
		assert_eq!(report.distribution.diversity, 1.0);
		assert!((report.teaching_percentage - 25.0).abs() < 1e-4);
	}

	#[test]
	fn empty_items_yield_an_empty_distribution() {
		let distribution = analyze_category_distribution(&[], 0.6);

		assert!(distribution.categories.is_empty());
		assert_eq!(distribution.dominant_category, None);
		assert_eq!(distribution.dominance_percentage, 0.0);
		assert_eq!(distribution.diversity, 0.0);
		assert!(!distribution.has_dominance);
	}

	#[test]
	fn exactly_threshold_share_is_not_dominance() {
		let items = vec![
			item("Teacher A", Category::Education),
			item("Teacher B", Category::Education),
			item("Teacher C", Category::Education),
			item("Engineer", Category::Engineering),
			item("Nurse", Category::Health),
		];
		let distribution = analyze_category_distribution(&items, 0.6);

		assert_eq!(distribution.dominant_category, Some(Category::Education));
		assert!((distribution.dominance_percentage - 60.0).abs() < 1e-4);
		assert!(!distribution.has_dominance);
	}

	#[test]
	fn stats_track_rates_and_reset() {
		let stats = BiasStats::default();

		stats.record(&detect_teaching_bias(&teaching_heavy(), 0.6, 3));
		stats.record(&detect_teaching_bias(
			&[
				item("Teacher", Category::Education),
				item("Engineer", Category::Engineering),
				item("Nurse", Category::Health),
				item("Developer", Category::Technology),
			],
			0.6,
			3,
		));

		let snapshot = stats.snapshot();

		assert_eq!(snapshot.total_analyses, 2);
		assert!((snapshot.bias_detection_rate - 0.5).abs() < 1e-6);
		assert!((snapshot.teaching_bias_rate - 0.5).abs() < 1e-6);
		assert!((snapshot.category_dominance_rate - 0.5).abs() < 1e-6);

		stats.reset();

		assert_eq!(stats.snapshot().total_analyses, 0);
	}
}
