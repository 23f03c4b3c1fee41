//! Spice label catalog.
//!
//! Reservoir labels are constrained to a catalog: a default list of common
//! spices plus every label the user's own recipes mention. Comparison is
//! case-insensitive throughout.

/// Default spice labels offered to every user.
pub const DEFAULT_SPICES: &[&str] = &[
    "sal",
    "pimenta-do-reino",
    "oregano",
    "paprica",
    "cominho",
    "alho em po",
    "cebola em po",
    "curry",
    "colorau",
    "chimichurri",
];

/// Build a user's catalog: the defaults plus any extra labels (typically
/// harvested from that user's recipes), deduplicated case-insensitively.
/// Defaults keep their order; extras follow, sorted.
pub fn catalog_for(extra_labels: &[String]) -> Vec<String> {
    let mut catalog: Vec<String> = DEFAULT_SPICES.iter().map(|s| s.to_string()).collect();

    let mut extras: Vec<&String> = extra_labels
        .iter()
        .filter(|l| !label_in_catalog(&catalog, l))
        .collect();
    extras.sort();
    extras.dedup_by(|a, b| a.to_lowercase() == b.to_lowercase());

    catalog.extend(extras.into_iter().cloned());
    catalog
}

/// Case-insensitive catalog membership test.
pub fn label_in_catalog(catalog: &[String], label: &str) -> bool {
    let wanted = label.to_lowercase();
    catalog.iter().any(|c| c.to_lowercase() == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_always_present() {
        let catalog = catalog_for(&[]);
        assert_eq!(catalog.len(), DEFAULT_SPICES.len());
        assert!(label_in_catalog(&catalog, "sal"));
    }

    #[test]
    fn recipe_labels_extend_the_catalog() {
        let extras = vec!["Za'atar".to_string(), "sumac".to_string()];
        let catalog = catalog_for(&extras);

        assert!(label_in_catalog(&catalog, "za'atar"));
        assert!(label_in_catalog(&catalog, "Sumac"));
    }

    #[test]
    fn duplicates_of_defaults_are_not_repeated() {
        let extras = vec!["SAL".to_string(), "Oregano".to_string()];
        let catalog = catalog_for(&extras);

        assert_eq!(catalog.len(), DEFAULT_SPICES.len());
    }

    #[test]
    fn membership_is_case_insensitive() {
        let catalog = catalog_for(&[]);
        assert!(label_in_catalog(&catalog, "PIMENTA-DO-REINO"));
        assert!(!label_in_catalog(&catalog, "wasabi"));
    }
}
