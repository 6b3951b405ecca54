use compass_domain::{
	BudgetTier, Category, Grade, Mark, StructuredProfileFields, extract_profile,
	extract_recommendations,
};

#[test]
fn full_query_extraction() {
	let query = "I'm in grade 11, I love maths and physical sciences, I got 80% for maths, \
		and I need a bursary to study in Cape Town.";
	let profile = extract_profile(query, None);

	assert_eq!(profile.grade, Some(Grade::Eleven));
	assert!(profile.subjects.contains("mathematics"));
	assert!(profile.subjects.contains("physical sciences"));
	assert_eq!(profile.marks.get("mathematics"), Some(&Mark::Exact(80)));
	assert_eq!(profile.constraints.budget, Some(BudgetTier::Low));
	assert_eq!(profile.constraints.location.as_deref(), Some("cape town"));
}

#[test]
fn structured_fields_deserialize_and_override() {
	let fields: StructuredProfileFields = serde_json::from_str(
		r#"{"grade": 12, "subjects": ["Accounting"], "budget": "high", "aps": 38}"#,
	)
	.expect("fields should deserialize");
	let profile = extract_profile("I'm in grade 10.", Some(&fields));

	assert_eq!(profile.grade, Some(Grade::Twelve));
	assert!(profile.subjects.contains("accounting"));
	assert_eq!(profile.constraints.budget, Some(BudgetTier::High));
	assert_eq!(profile.aps, Some(38));
}

#[test]
fn recommendations_carry_categories() {
	let text = "Based on your profile:\n\
		1. High School Teacher: teaches mathematics to senior learners.\n\
		2. Actuary: applies statistics to financial risk.\n\
		3. Civil Engineer: designs roads and bridges.\n";
	let items = extract_recommendations(text);

	assert_eq!(items.len(), 3);
	assert_eq!(items[0].category, Category::Education);
	assert_eq!(items[2].category, Category::Engineering);
}
