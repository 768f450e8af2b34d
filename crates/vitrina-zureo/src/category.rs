use std::collections::HashMap;

use vitrina_core::SynonymTable;

/// Maps Zureo product-type labels to storefront subcategories.
///
/// Lookup order: exact case-insensitive match against the stored subcategory
/// names, then the synonym table. Unknown labels map to `None`; the product
/// still syncs, just without a subcategory.
#[derive(Debug, Clone)]
pub struct CategoryMapper {
    /// Lowercased name -> canonical stored name.
    known: HashMap<String, String>,
    synonyms: SynonymTable,
}

impl CategoryMapper {
    #[must_use]
    pub fn new<I, S>(subcategory_names: I, synonyms: SynonymTable) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let known = subcategory_names
            .into_iter()
            .filter_map(|name| {
                let canonical = name.as_ref().trim();
                if canonical.is_empty() {
                    None
                } else {
                    Some((canonical.to_lowercase(), canonical.to_owned()))
                }
            })
            .collect();

        Self { known, synonyms }
    }

    #[must_use]
    pub fn map(&self, label: &str) -> Option<String> {
        let normalized = label.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        if let Some(canonical) = self.known.get(&normalized) {
            return Some(canonical.clone());
        }

        self.synonyms.lookup(&normalized).map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synonyms() -> SynonymTable {
        SynonymTable::from_yaml(
            "subcategories:\n  Remeras: [remera, remeras]\n  Buzos: [buzo, canguro]\n",
        )
        .unwrap()
    }

    #[test]
    fn synonym_maps_plural_label() {
        let mapper = CategoryMapper::new(["Buzos"], synonyms());
        assert_eq!(mapper.map("remeras").as_deref(), Some("Remeras"));
    }

    #[test]
    fn exact_match_short_circuits_synonyms() {
        // A stored subcategory literally named "remeras" wins over the
        // synonym table's "Remeras".
        let mapper = CategoryMapper::new(["remeras"], synonyms());
        assert_eq!(mapper.map("REMERAS").as_deref(), Some("remeras"));
    }

    #[test]
    fn exact_match_returns_stored_casing() {
        let mapper = CategoryMapper::new(["Camperas de Abrigo"], synonyms());
        assert_eq!(
            mapper.map("  camperas de abrigo ").as_deref(),
            Some("Camperas de Abrigo")
        );
    }

    #[test]
    fn unknown_label_is_none() {
        let mapper = CategoryMapper::new(["Buzos"], synonyms());
        assert_eq!(mapper.map("Ferretería"), None);
    }

    #[test]
    fn blank_label_is_none() {
        let mapper = CategoryMapper::new(Vec::<String>::new(), synonyms());
        assert_eq!(mapper.map("   "), None);
    }
}
