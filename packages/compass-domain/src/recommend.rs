use std::collections::HashSet;

use regex::Regex;

use crate::category::Category;

const ITEM_PATTERNS: &[&str] = &[
	r"(?m)^\s*\d+[.)]\s+(.+)$",
	r"(?m)^\s*[-*]\s+(.+)$",
	r"(?im)^\s*career:\s*(.+)$",
];
const MAX_ITEMS: usize = 20;

/// One career recommendation pulled out of generated prose.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RecommendedItem {
	pub title: String,
	pub description: String,
	pub category: Category,
}

/// Extracts recommended careers from generated prose by scanning
/// numbered lists, bullet lists, and "Career:" lines. Heuristic: prose
/// with no list structure yields an empty vec, which is a normal
/// outcome.
pub fn extract_recommendations(text: &str) -> Vec<RecommendedItem> {
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for pattern in ITEM_PATTERNS {
		let Ok(re) = Regex::new(pattern) else { continue };

		for caps in re.captures_iter(text) {
			let Some(line) = caps.get(1) else { continue };
			let Some((title, description)) = split_item(line.as_str()) else { continue };

			if !seen.insert(title.to_lowercase()) {
				continue;
			}

			let category = Category::classify(&format!("{title} {description}"));

			out.push(RecommendedItem { title, description, category });

			if out.len() >= MAX_ITEMS {
				return out;
			}
		}
	}

	out
}

fn split_item(line: &str) -> Option<(String, String)> {
	let mut line = line.trim().trim_matches('*').trim();

	// Numbered items often repeat the "Career:" prefix the prompt asks for.
	if let Some(prefix) = line.get(..7)
		&& prefix.eq_ignore_ascii_case("career:")
	{
		line = line[7..].trim();
	}
	if line.is_empty() {
		return None;
	}

	let (title, description) = match line.split_once(':').or_else(|| line.split_once(" - ")) {
		Some((title, description)) => (title, description),
		None => (line, ""),
	};
	let title = title.trim().trim_matches('*').trim();

	if title.is_empty() {
		return None;
	}

	Some((title.to_string(), description.trim().to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_numbered_items_with_descriptions() {
		let text = "Here are some options:\n\
			1. **Mechanical Engineer**: designs machines and engines.\n\
			2. Software Developer - builds applications.\n";
		let items = extract_recommendations(text);

		assert_eq!(items.len(), 2);
		assert_eq!(items[0].title, "Mechanical Engineer");
		assert_eq!(items[0].category, Category::Engineering);
		assert_eq!(items[1].title, "Software Developer");
		assert_eq!(items[1].description, "builds applications.");
	}

	#[test]
	fn deduplicates_titles_across_patterns() {
		let text = "1. Nurse: cares for patients.\n- Nurse: cares for patients.\n";
		let items = extract_recommendations(text);

		assert_eq!(items.len(), 1);
		assert_eq!(items[0].category, Category::Health);
	}

	#[test]
	fn strips_the_career_prefix_from_numbered_items() {
		let text = "1. Career: Attorney: argues cases in court.\nCareer: Electrician: wires buildings.\n";
		let items = extract_recommendations(text);

		assert_eq!(items.len(), 2);
		assert_eq!(items[0].title, "Attorney");
		assert_eq!(items[0].category, Category::Law);
		assert_eq!(items[1].title, "Electrician");
		assert_eq!(items[1].category, Category::Trades);
	}

	#[test]
	fn plain_prose_yields_nothing() {
		assert!(extract_recommendations("You could consider many careers.").is_empty());
	}
}
