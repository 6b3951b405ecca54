use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::Deserialize;

use crate::text;

const SUBJECT_ALIASES: &[(&str, &[&str])] = &[
	("accounting", &["accounting"]),
	("afrikaans", &["afrikaans"]),
	("agricultural sciences", &["agricultural sciences", "agriculture"]),
	("business studies", &["business studies"]),
	("economics", &["economics"]),
	("engineering graphics and design", &["engineering graphics", "egd", "technical drawing"]),
	("english", &["english"]),
	("geography", &["geography"]),
	("history", &["history"]),
	("information technology", &["information technology", "computer science", "programming"]),
	("life sciences", &["life sciences", "life science", "biology"]),
	("mathematics", &["mathematics", "maths", "math"]),
	("music", &["music"]),
	("physical sciences", &["physical sciences", "physical science", "physics"]),
	("tourism", &["tourism"]),
	("visual arts", &["visual arts", "fine art"]),
];

const BUDGET_LOW: &[&str] = &[
	"bursary",
	"bursaries",
	"scholarship",
	"cannot afford",
	"cant afford",
	"no money",
	"limited budget",
	"low budget",
	"nsfas",
];
const BUDGET_MEDIUM: &[&str] = &["moderate budget", "medium budget", "some savings"];
const BUDGET_HIGH: &[&str] = &["high budget", "money is not a problem", "private university"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
	Ten,
	Eleven,
	Twelve,
}
impl Grade {
	pub fn from_year(year: u8) -> Option<Self> {
		match year {
			10 => Some(Self::Ten),
			11 => Some(Self::Eleven),
			12 => Some(Self::Twelve),
			_ => None,
		}
	}

	pub fn as_year(&self) -> u8 {
		match self {
			Self::Ten => 10,
			Self::Eleven => 11,
			Self::Twelve => 12,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
	Exact(u8),
	Range { min: u8, max: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
	Low,
	Medium,
	High,
}
impl BudgetTier {
	pub fn parse(value: &str) -> Option<Self> {
		match value.trim().to_ascii_lowercase().as_str() {
			"low" => Some(Self::Low),
			"medium" => Some(Self::Medium),
			"high" => Some(Self::High),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentDepth {
	#[default]
	Quick,
	Comprehensive,
}
impl AssessmentDepth {
	pub fn parse(value: &str) -> Option<Self> {
		match value.trim().to_ascii_lowercase().as_str() {
			"quick" => Some(Self::Quick),
			"comprehensive" => Some(Self::Comprehensive),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Constraints {
	pub budget: Option<BudgetTier>,
	pub location: Option<String>,
	pub deadline: Option<String>,
}

/// Normalized per-request view of the student, immutable once built.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct StudentProfile {
	pub grade: Option<Grade>,
	pub subjects: BTreeSet<String>,
	pub marks: BTreeMap<String, Mark>,
	pub interests: BTreeSet<String>,
	pub constraints: Constraints,
	pub aps: Option<u8>,
	pub depth: AssessmentDepth,
}

/// Optional structured fields supplied alongside the free-text query.
/// Present fields override whatever the text heuristics extracted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StructuredProfileFields {
	pub grade: Option<u8>,
	pub subjects: Option<Vec<String>>,
	pub marks: Option<BTreeMap<String, u8>>,
	pub interests: Option<Vec<String>>,
	pub budget: Option<String>,
	pub location: Option<String>,
	pub deadline: Option<String>,
	pub aps: Option<u8>,
	pub depth: Option<String>,
}

/// Builds a [`StudentProfile`] from free text plus optional structured
/// fields. Heuristic and deterministic; an unparseable query yields an
/// empty profile, never an error.
pub fn extract_profile(query: &str, fields: Option<&StructuredProfileFields>) -> StudentProfile {
	let normalized = text::normalize_text(query);
	let mut profile = StudentProfile {
		grade: extract_grade(&normalized),
		subjects: extract_subjects(&normalized),
		marks: extract_marks(&normalized),
		interests: extract_interests(query),
		constraints: Constraints {
			budget: extract_budget(&normalized),
			location: extract_location(query),
			deadline: extract_deadline(query),
		},
		aps: extract_aps(&normalized),
		depth: extract_depth(&normalized),
	};

	if let Some(fields) = fields {
		apply_fields(&mut profile, fields);
	}

	profile
}

fn apply_fields(profile: &mut StudentProfile, fields: &StructuredProfileFields) {
	if let Some(grade) = fields.grade.and_then(Grade::from_year) {
		profile.grade = Some(grade);
	}
	if let Some(subjects) = fields.subjects.as_ref() {
		profile.subjects = subjects
			.iter()
			.filter_map(|subject| {
				let normalized = text::normalize_text(subject);

				if normalized.is_empty() {
					return None;
				}

				Some(resolve_subject(&normalized).unwrap_or(normalized))
			})
			.collect();
	}
	if let Some(marks) = fields.marks.as_ref() {
		profile.marks = marks
			.iter()
			.filter_map(|(subject, score)| {
				let normalized = text::normalize_text(subject);

				if normalized.is_empty() {
					return None;
				}

				let subject = resolve_subject(&normalized).unwrap_or(normalized);

				Some((subject, Mark::Exact((*score).min(100))))
			})
			.collect();
	}
	if let Some(interests) = fields.interests.as_ref() {
		profile.interests = interests
			.iter()
			.map(|interest| text::normalize_text(interest))
			.filter(|interest| !interest.is_empty())
			.collect();
	}
	if let Some(budget) = fields.budget.as_deref().and_then(BudgetTier::parse) {
		profile.constraints.budget = Some(budget);
	}
	if let Some(location) = fields.location.as_deref() {
		let location = text::normalize_text(location);

		if !location.is_empty() {
			profile.constraints.location = Some(location);
		}
	}
	if let Some(deadline) = fields.deadline.as_deref() {
		let deadline = deadline.trim();

		if !deadline.is_empty() {
			profile.constraints.deadline = Some(deadline.to_string());
		}
	}
	if let Some(aps) = fields.aps {
		profile.aps = Some(aps);
	}
	if let Some(depth) = fields.depth.as_deref().and_then(AssessmentDepth::parse) {
		profile.depth = depth;
	}
}

fn extract_grade(normalized: &str) -> Option<Grade> {
	if text::contains_phrase(normalized, "matric") {
		return Some(Grade::Twelve);
	}

	let re = Regex::new(r"\bgr(?:ade)?\s*(1[0-2])\b").ok()?;
	let caps = re.captures(normalized)?;
	let year = caps.get(1)?.as_str().parse::<u8>().ok()?;

	Grade::from_year(year)
}

fn extract_subjects(normalized: &str) -> BTreeSet<String> {
	let mut out = BTreeSet::new();

	for (canonical, aliases) in SUBJECT_ALIASES {
		for alias in *aliases {
			if text::contains_phrase(normalized, alias) {
				out.insert((*canonical).to_string());

				break;
			}
		}
	}

	out
}

// Percent signs are stripped by normalization, so "75% for maths" arrives
// as "75 for maths".
fn extract_marks(normalized: &str) -> BTreeMap<String, Mark> {
	let mut out = BTreeMap::new();

	if let Ok(re) = Regex::new(
		r"\bbetween\s+(\d{1,3})\s+and\s+(\d{1,3})\s*(?:percent\s+)?(?:for|in)\s+(\w+(?:\s+\w+){0,2})",
	) {
		for caps in re.captures_iter(normalized) {
			let (Some(min), Some(max), Some(phrase)) = (caps.get(1), caps.get(2), caps.get(3))
			else {
				continue;
			};
			let (Ok(min), Ok(max)) = (min.as_str().parse::<u8>(), max.as_str().parse::<u8>())
			else {
				continue;
			};
			let Some(subject) = resolve_subject(phrase.as_str()) else { continue };

			if min > 100 || max > 100 || min > max {
				continue;
			}

			out.entry(subject).or_insert(Mark::Range { min, max });
		}
	}
	if let Ok(re) =
		Regex::new(r"\b(\d{1,3})\s*(?:percent\s+)?(?:for|in)\s+(\w+(?:\s+\w+){0,2})")
	{
		for caps in re.captures_iter(normalized) {
			let (Some(score), Some(phrase)) = (caps.get(1), caps.get(2)) else { continue };
			let Ok(score) = score.as_str().parse::<u8>() else { continue };
			let Some(subject) = resolve_subject(phrase.as_str()) else { continue };

			if score > 100 {
				continue;
			}

			out.entry(subject).or_insert(Mark::Exact(score));
		}
	}

	out
}

fn extract_interests(query: &str) -> BTreeSet<String> {
	let mut out = BTreeSet::new();
	let Ok(re) = Regex::new(r"(?i)(?:interested in|i love|i enjoy|passionate about)\s+([^.!?\n]+)")
	else {
		return out;
	};

	for caps in re.captures_iter(query) {
		let Some(phrase) = caps.get(1) else { continue };

		for part in phrase.as_str().split([',', ';']) {
			for part in part.split(" and ") {
				let interest = text::normalize_text(part);

				// Longer fragments are clause tails, not interests.
				if !(2..=60).contains(&interest.len())
					|| interest.split(' ').count() > 3
				{
					continue;
				}

				out.insert(interest);
			}
		}
	}

	out
}

fn extract_budget(normalized: &str) -> Option<BudgetTier> {
	for (tier, phrases) in [
		(BudgetTier::Low, BUDGET_LOW),
		(BudgetTier::Medium, BUDGET_MEDIUM),
		(BudgetTier::High, BUDGET_HIGH),
	] {
		if phrases.iter().any(|phrase| text::contains_phrase(normalized, phrase)) {
			return Some(tier);
		}
	}

	None
}

fn extract_location(query: &str) -> Option<String> {
	let re = Regex::new(
		r"(?i)\b(?:study|stay|staying|live|living)\s+in\s+([A-Za-z][A-Za-z ]{1,40}?)(?:\s+(?:and|but|so)\b|[.,!?;\n]|$)",
	)
	.ok()?;
	let caps = re.captures(query)?;
	let location = text::normalize_text(caps.get(1)?.as_str());

	if location.is_empty() { None } else { Some(location) }
}

fn extract_deadline(query: &str) -> Option<String> {
	let re = Regex::new(
		r"(?i)\b(?:apply|applications?\s+close|closing)\s+(?:by|before|on|in)\s+([A-Za-z0-9 ]{2,30}?)(?:[.,!?;\n]|$)",
	)
	.ok()?;
	let caps = re.captures(query)?;
	let deadline = caps.get(1)?.as_str().trim();

	if deadline.is_empty() { None } else { Some(deadline.to_string()) }
}

fn extract_aps(normalized: &str) -> Option<u8> {
	let re = Regex::new(r"\baps(?:\s+score)?(?:\s+(?:of|is))?\s+(\d{1,2})\b").ok()?;
	let caps = re.captures(normalized)?;

	caps.get(1)?.as_str().parse::<u8>().ok()
}

fn extract_depth(normalized: &str) -> AssessmentDepth {
	for phrase in ["comprehensive", "detailed", "in depth"] {
		if text::contains_phrase(normalized, phrase) {
			return AssessmentDepth::Comprehensive;
		}
	}

	AssessmentDepth::Quick
}

fn resolve_subject(phrase: &str) -> Option<String> {
	let normalized = text::normalize_text(phrase);

	for (canonical, aliases) in SUBJECT_ALIASES {
		for alias in *aliases {
			if text::contains_phrase(&normalized, alias) {
				return Some((*canonical).to_string());
			}
		}
	}

	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_grade_and_subjects() {
		let profile = extract_profile(
			"I'm in grade 11 and I take maths and physical sciences.",
			None,
		);

		assert_eq!(profile.grade, Some(Grade::Eleven));
		assert!(profile.subjects.contains("mathematics"));
		assert!(profile.subjects.contains("physical sciences"));
	}

	#[test]
	fn matric_means_grade_twelve() {
		let profile = extract_profile("I'm a matric learner.", None);

		assert_eq!(profile.grade, Some(Grade::Twelve));
	}

	#[test]
	fn extracts_exact_and_range_marks() {
		let profile = extract_profile(
			"I got 75% for maths and between 60 and 70 for physics.",
			None,
		);

		assert_eq!(profile.marks.get("mathematics"), Some(&Mark::Exact(75)));
		assert_eq!(
			profile.marks.get("physical sciences"),
			Some(&Mark::Range { min: 60, max: 70 })
		);
	}

	#[test]
	fn extracts_interests_and_budget() {
		let profile =
			extract_profile("I'm interested in robotics and space, and I need a bursary.", None);

		assert!(profile.interests.contains("robotics"));
		assert!(profile.interests.contains("space"));
		assert_eq!(profile.constraints.budget, Some(BudgetTier::Low));
	}

	#[test]
	fn structured_fields_override_extracted() {
		let fields = StructuredProfileFields {
			grade: Some(12),
			subjects: Some(vec!["Biology".to_string()]),
			aps: Some(34),
			..Default::default()
		};
		let profile = extract_profile("I'm in grade 10 and I love maths.", Some(&fields));

		assert_eq!(profile.grade, Some(Grade::Twelve));
		assert_eq!(profile.subjects.iter().next().map(String::as_str), Some("life sciences"));
		assert_eq!(profile.aps, Some(34));
		assert!(profile.interests.contains("maths"));
	}

	#[test]
	fn unparseable_query_yields_empty_profile() {
		let profile = extract_profile("???", None);

		assert_eq!(profile, StudentProfile::default());
	}
}
