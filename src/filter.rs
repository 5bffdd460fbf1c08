use serde::Serialize;

use crate::catalog::CharacterCatalog;
use crate::config::SearchScope;
use crate::fields::{CharacterRecord, Field, FieldTable};

/// Category value that disables category filtering.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterQuery {
    pub term: String,
    pub category: Option<String>,
    pub scope: SearchScope,
}

impl FilterQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    fn needle(&self) -> Option<String> {
        let term = self.term.trim();
        (!term.is_empty()).then(|| term.to_lowercase())
    }

    fn category_needle(&self) -> Option<String> {
        let category = self.category.as_deref()?.trim();
        if category.is_empty() || category.eq_ignore_ascii_case(ALL_CATEGORIES) {
            return None;
        }
        Some(category.to_lowercase())
    }

    /// True when the query keeps every record.
    pub fn is_unfiltered(&self) -> bool {
        self.needle().is_none() && self.category_needle().is_none()
    }
}

/// Catalog indices that survived a query, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilteredView {
    indices: Vec<usize>,
}

impl FilteredView {
    pub fn all(catalog: &CharacterCatalog) -> Self {
        Self {
            indices: (0..catalog.len()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Clamped slice of catalog indices; out-of-range bounds give an empty slice.
    pub fn window(&self, start: usize, end: usize) -> &[usize] {
        let end = end.min(self.indices.len());
        let start = start.min(end);
        &self.indices[start..end]
    }

    pub fn records<'a>(
        &'a self,
        catalog: &'a CharacterCatalog,
    ) -> impl Iterator<Item = &'a CharacterRecord> + 'a {
        self.indices.iter().filter_map(|&index| catalog.get(index))
    }

    /// Applies `query` on top of this view.
    pub fn refine(
        &self,
        catalog: &CharacterCatalog,
        query: &FilterQuery,
        fields: &FieldTable,
    ) -> Self {
        let matcher = Matcher::new(query, fields);
        let indices = self
            .indices
            .iter()
            .copied()
            .filter(|&index| catalog.get(index).is_some_and(|record| matcher.matches(record)))
            .collect();
        Self { indices }
    }
}

/// Recomputes the view of `catalog` for `query`.
pub fn filter(
    catalog: &CharacterCatalog,
    query: &FilterQuery,
    fields: &FieldTable,
) -> FilteredView {
    if query.is_unfiltered() {
        return FilteredView::all(catalog);
    }
    let matcher = Matcher::new(query, fields);
    let indices = catalog
        .iter()
        .enumerate()
        .filter(|(_, record)| matcher.matches(record))
        .map(|(index, _)| index)
        .collect();
    FilteredView { indices }
}

/// Distinct occupations in first-seen order.
pub fn categories(catalog: &CharacterCatalog, fields: &FieldTable) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    catalog
        .iter()
        .filter_map(|record| fields.lookup(record, Field::Occupation))
        .filter(|occupation| seen.insert(occupation.to_lowercase()))
        .collect()
}

struct Matcher<'a> {
    needle: Option<String>,
    category: Option<String>,
    scope: SearchScope,
    fields: &'a FieldTable,
}

impl<'a> Matcher<'a> {
    fn new(query: &FilterQuery, fields: &'a FieldTable) -> Self {
        Self {
            needle: query.needle(),
            category: query.category_needle(),
            scope: query.scope,
            fields,
        }
    }

    fn matches(&self, record: &CharacterRecord) -> bool {
        if let Some(category) = &self.category {
            let occupation = self.fields.lookup(record, Field::Occupation).unwrap_or_default();
            if !occupation.to_lowercase().contains(category.as_str()) {
                return false;
            }
        }
        let Some(needle) = &self.needle else {
            return true;
        };
        self.scope.fields().iter().any(|field| {
            self.fields
                .lookup(record, *field)
                .is_some_and(|value| value.to_lowercase().contains(needle.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> CharacterCatalog {
        let rows = json!([
            {
                "nombre": "Homer",
                "ocupacion": "Safety Inspector",
                "historia": "Works at the plant."
            },
            { "nombre": "Ned", "ocupacion": "Shopkeeper", "historia": "Runs the Leftorium." },
            { "Nombre": "Apu", "Ocupacion": "Kwik-E-Mart shopkeeper" },
            {
                "name": "Mr. Burns",
                "occupation": "Plant owner",
                "description": "Owns the power plant."
            }
        ]);
        serde_json::from_value::<Vec<CharacterRecord>>(rows).unwrap().into()
    }

    fn names(catalog: &CharacterCatalog, view: &FilteredView) -> Vec<String> {
        let fields = FieldTable::default();
        view.records(catalog)
            .map(|record| fields.resolve(record, Field::Name, "?"))
            .collect()
    }

    #[test]
    fn empty_term_and_all_category_is_identity() {
        let catalog = catalog();
        let fields = FieldTable::default();
        let query = FilterQuery::new("").with_category(ALL_CATEGORIES);
        let view = filter(&catalog, &query, &fields);
        assert_eq!(view, FilteredView::all(&catalog));
        assert_eq!(view.records(&catalog).cloned().collect::<Vec<_>>(), catalog.to_vec());

        let whitespace = filter(&catalog, &FilterQuery::new("   ").with_category(" ALL "), &fields);
        assert_eq!(whitespace.len(), catalog.len());
    }

    #[test]
    fn term_is_trimmed_and_case_insensitive() {
        let catalog = catalog();
        let view = filter(&catalog, &FilterQuery::new("  hOMer "), &FieldTable::default());
        assert_eq!(names(&catalog, &view), ["Homer"]);
    }

    #[test]
    fn no_match_yields_empty_view() {
        let catalog = catalog();
        let view = filter(&catalog, &FilterQuery::new("zzz"), &FieldTable::default());
        assert!(view.is_empty());
    }

    #[test]
    fn broad_scope_searches_occupation_and_history() {
        let catalog = catalog();
        let fields = FieldTable::default();
        let view = filter(&catalog, &FilterQuery::new("plant"), &fields);
        assert_eq!(names(&catalog, &view), ["Homer", "Mr. Burns"]);

        let narrow = filter(
            &catalog,
            &FilterQuery::new("plant").with_scope(SearchScope::NameOnly),
            &fields,
        );
        assert!(narrow.is_empty());
    }

    #[test]
    fn category_restricts_by_occupation() {
        let catalog = catalog();
        let fields = FieldTable::default();
        let view = filter(&catalog, &FilterQuery::new("").with_category("SHOPKEEPER"), &fields);
        assert_eq!(names(&catalog, &view), ["Ned", "Apu"]);

        let both = filter(&catalog, &FilterQuery::new("apu").with_category("shopkeeper"), &fields);
        assert_eq!(names(&catalog, &both), ["Apu"]);
    }

    #[test]
    fn view_is_ordered_subsequence_and_idempotent() {
        let catalog = catalog();
        let fields = FieldTable::default();
        let query = FilterQuery::new("e");
        let view = filter(&catalog, &query, &fields);
        assert!(view.indices().windows(2).all(|pair| pair[0] < pair[1]));
        assert!(view.indices().iter().all(|&index| index < catalog.len()));
        assert_eq!(view.refine(&catalog, &query, &fields), view);
    }

    #[test]
    fn window_is_clamped() {
        let catalog = catalog();
        let view = FilteredView::all(&catalog);
        assert_eq!(view.window(2, 10), &[2, 3]);
        assert!(view.window(12, 24).is_empty());
        assert!(view.window(3, 1).is_empty());
    }

    #[test]
    fn categories_are_distinct_in_first_seen_order() {
        let mut rows = catalog().to_vec();
        rows.push(serde_json::from_value(json!({ "ocupacion": "safety inspector" })).unwrap());
        let catalog = CharacterCatalog::new(rows);
        assert_eq!(
            categories(&catalog, &FieldTable::default()),
            ["Safety Inspector", "Shopkeeper", "Kwik-E-Mart shopkeeper", "Plant owner"]
        );
    }
}
