//! Service template library

use std::collections::BTreeSet;

use shared::models::{Template, builtin_templates};

/// Templates matching `term` (name or category, case-insensitive),
/// optionally restricted to one category
pub fn search_templates(term: &str, category: Option<&str>) -> Vec<Template> {
    builtin_templates()
        .into_iter()
        .filter(|t| category.is_none_or(|c| t.category.eq_ignore_ascii_case(c)))
        .filter(|t| t.matches(term))
        .collect()
}

pub fn find_template(id: &str) -> Option<Template> {
    builtin_templates().into_iter().find(|t| t.id == id)
}

/// Distinct categories, sorted
pub fn template_categories() -> Vec<String> {
    let categories: BTreeSet<String> = builtin_templates().into_iter().map(|t| t.category).collect();
    categories.into_iter().collect()
}
