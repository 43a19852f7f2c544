//! IRI → CURIE rewriting for one output directory's tables.

use std::collections::{HashMap, HashSet};

use crate::prefixes::{PreferredPrefixTable, PrefixEntry, PrefixTable};

/// A node id still in full IRI form.
#[must_use]
pub fn is_iri(id: &str) -> bool {
    id.contains("://")
}

#[derive(Debug, Clone, Copy)]
pub struct CurieAssigner<'a> {
    prefixes: &'a PrefixTable,
    preferred: &'a PreferredPrefixTable,
}

impl<'a> CurieAssigner<'a> {
    #[must_use]
    pub const fn new(prefixes: &'a PrefixTable, preferred: &'a PreferredPrefixTable) -> Self {
        Self {
            prefixes,
            preferred,
        }
    }

    /// Native entries of `own_id` win; otherwise the first entry of any
    /// ontology, scanning ontologies by id.
    #[must_use]
    pub fn curie_for(&self, iri: &str, own_id: &str) -> Option<String> {
        if let Some(entry) = self
            .prefixes
            .entries_for(own_id)
            .iter()
            .find(|entry| entry.is_native && entry.matches(iri))
        {
            return Some(compose(self.preferred.prefix_for(own_id), entry, iri));
        }
        self.prefixes.iter().find_map(|(ontology_id, entries)| {
            entries
                .iter()
                .find(|entry| entry.matches(iri))
                .map(|entry| compose(self.preferred.prefix_for(ontology_id), entry, iri))
        })
    }

    /// One pass over `ids` building `old → new` for every IRI that resolves.
    pub fn build_index<'i>(&self, ids: impl IntoIterator<Item = &'i str>, own_id: &str) -> CurieIndex {
        let mut index = CurieIndex::default();
        for id in ids {
            if !is_iri(id) || index.rewrites.contains_key(id) || index.unresolved.contains(id) {
                continue;
            }
            match self.curie_for(id, own_id) {
                Some(curie) => {
                    index.rewrites.insert(id.to_string(), curie);
                }
                None => {
                    index.unresolved.insert(id.to_string());
                }
            }
        }
        index
    }
}

fn compose(prefix: &str, entry: &PrefixEntry, iri: &str) -> String {
    format!("{prefix}:{}", entry.local_part(iri))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurieIndex {
    rewrites: HashMap<String, String>,
    unresolved: HashSet<String>,
}

impl CurieIndex {
    /// The rewritten id, or `id` unchanged when it is not indexed.
    #[must_use]
    pub fn rewrite<'s>(&'s self, id: &'s str) -> &'s str {
        self.rewrites.get(id).map_or(id, String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rewrites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rewrites.is_empty()
    }

    /// Distinct IRIs no prefix entry matched; they keep their original id.
    #[must_use]
    pub fn unresolved(&self) -> usize {
        self.unresolved.len()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn entry(iri_prefix: &str, delimiter: &str, is_native: bool) -> PrefixEntry {
        PrefixEntry {
            iri_prefix: iri_prefix.to_string(),
            delimiter: delimiter.to_string(),
            is_native,
        }
    }

    fn tables() -> (PrefixTable, PreferredPrefixTable) {
        let mut prefixes = PrefixTable::default();
        prefixes.push("BTO", entry("*/BTO/", "_", true));
        prefixes.push("ZFA", entry("http://purl.obolibrary.org/obo/", "_", false));
        prefixes.push("AAO", entry("http://purl.obolibrary.org/obo/UBERON", "_", false));
        prefixes.push("NCIT", entry("http://ncicb.nci.nih.gov/xml/owl/EVS/Thesaurus.owl#", "#", true));
        let mut preferred = PreferredPrefixTable::default();
        preferred.insert("BTO", "BTO");
        preferred.insert("AAO", "UBERON");
        (prefixes, preferred)
    }

    #[test]
    fn native_entry_uses_preferred_prefix() {
        let (prefixes, preferred) = tables();
        let assigner = CurieAssigner::new(&prefixes, &preferred);
        assert_eq!(
            assigner.curie_for("http://purl.obolibrary.org/obo/BTO/BTO_1", "BTO").as_deref(),
            Some("BTO:1")
        );
    }

    #[test]
    fn fallback_scans_ontologies_in_id_order() {
        let (prefixes, preferred) = tables();
        let assigner = CurieAssigner::new(&prefixes, &preferred);
        // AAO sorts before ZFA, so its narrower entry wins even though both match.
        assert_eq!(
            assigner
                .curie_for("http://purl.obolibrary.org/obo/UBERON_0000955", "BTO")
                .as_deref(),
            Some("UBERON:0000955")
        );
        // No preferred prefix for ZFA: the ontology id is used.
        assert_eq!(
            assigner
                .curie_for("http://purl.obolibrary.org/obo/GO_0008150", "BTO")
                .as_deref(),
            Some("ZFA:0008150")
        );
    }

    #[test]
    fn local_part_keeps_everything_after_last_delimiter() {
        let (prefixes, preferred) = tables();
        let assigner = CurieAssigner::new(&prefixes, &preferred);
        assert_eq!(
            assigner
                .curie_for("http://ncicb.nci.nih.gov/xml/owl/EVS/Thesaurus.owl#C12_345", "NCIT")
                .as_deref(),
            Some("NCIT:C12_345")
        );
    }

    #[test]
    fn index_counts_unresolved_and_skips_compact_ids() {
        let (prefixes, preferred) = tables();
        let assigner = CurieAssigner::new(&prefixes, &preferred);
        let index = assigner.build_index(
            [
                "http://purl.obolibrary.org/obo/BTO/BTO_1",
                "http://purl.obolibrary.org/obo/BTO/BTO_1",
                "https://example.org/unknown/1",
                "https://example.org/unknown/1",
                "BTO:2",
            ],
            "BTO",
        );
        assert_eq!(index.len(), 1);
        assert_eq!(index.unresolved(), 1);
        assert_eq!(index.rewrite("http://purl.obolibrary.org/obo/BTO/BTO_1"), "BTO:1");
        assert_eq!(index.rewrite("BTO:2"), "BTO:2");
        assert_eq!(
            index.rewrite("https://example.org/unknown/1"),
            "https://example.org/unknown/1"
        );
    }

    /// `(table entry, IRI namespace, delimiter)` shapes seen in the curated table.
    fn prefix_shape() -> impl Strategy<Value = (&'static str, &'static str, &'static str)> {
        prop_oneof![
            Just((
                "http://purl.obolibrary.org/obo/BTO",
                "http://purl.obolibrary.org/obo/BTO",
                "_"
            )),
            Just((
                "*/EVS/Thesaurus.owl",
                "http://ncicb.nci.nih.gov/xml/owl/EVS/Thesaurus.owl",
                "#"
            )),
            Just(("http://www.ebi.ac.uk/efo", "http://www.ebi.ac.uk/efo", "/")),
            Just(("*w3id.org/ns", "https://w3id.org/ns", ":")),
        ]
    }

    proptest! {
        #[test]
        fn curie_local_part_rebuilds_the_iri(
            (iri_prefix, namespace, delimiter) in prefix_shape(),
            local in "[A-Za-z0-9]{1,16}",
        ) {
            let mut prefixes = PrefixTable::default();
            prefixes.push("ONT", entry(iri_prefix, delimiter, true));
            let mut preferred = PreferredPrefixTable::default();
            preferred.insert("ONT", "Pref");
            let iri = format!("{namespace}{delimiter}{local}");

            let curie = CurieAssigner::new(&prefixes, &preferred)
                .curie_for(&iri, "ONT")
                .expect("native entry matches");
            let (prefix, tail) = curie.split_once(':').expect("compact id");
            prop_assert_eq!(prefix, "Pref");
            prop_assert_eq!(tail, local.as_str());
            prop_assert_eq!(format!("{namespace}{delimiter}{tail}"), iri);
        }
    }
}
