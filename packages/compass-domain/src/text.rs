/// Lowercases, replaces non-alphanumeric characters with spaces, and
/// collapses runs of whitespace.
pub(crate) fn normalize_text(text: &str) -> String {
	let mut normalized = String::with_capacity(text.len());

	for ch in text.chars() {
		if ch.is_ascii_alphanumeric() {
			normalized.push(ch.to_ascii_lowercase());
		} else {
			normalized.push(' ');
		}
	}

	normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Token-boundary containment over an already-normalized string.
pub(crate) fn contains_phrase(normalized: &str, phrase: &str) -> bool {
	format!(" {normalized} ").contains(&format!(" {phrase} "))
}
