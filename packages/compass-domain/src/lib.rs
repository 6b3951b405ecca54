mod category;
mod profile;
mod recommend;
mod text;

pub use category::Category;
pub use profile::{
	AssessmentDepth, BudgetTier, Constraints, Grade, Mark, StructuredProfileFields, StudentProfile,
	extract_profile,
};
pub use recommend::{RecommendedItem, extract_recommendations};
