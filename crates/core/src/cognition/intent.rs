use crate::cognition::normalize::normalize;
use crate::pets::Catalog;
use crate::types::ClassifiedIntent;

/// Name aliases for one pet, already normalized.
#[derive(Debug, Clone)]
struct NameAliases {
    pet_id: String,
    aliases: Vec<String>,
}

/// Keyword classifier for recognizer transcripts.
///
/// Pets are checked in catalog order and the first alias hit wins. Praise is
/// only consulted when no name matched. Matching is plain substring
/// containment, so an alias buried in a longer utterance still counts.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    names: Vec<NameAliases>,
    praise: Vec<String>,
}

impl IntentClassifier {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let names = catalog
            .pets
            .iter()
            .map(|p| NameAliases {
                pet_id: p.id.clone(),
                aliases: p.aliases.iter().map(|a| normalize(a)).collect(),
            })
            .collect();
        let praise = catalog.praise.iter().map(|w| normalize(w)).collect();
        Self { names, praise }
    }

    /// Classify one transcript. The text is normalized first; already
    /// normalized input passes through unchanged.
    pub fn classify(&self, text: &str) -> ClassifiedIntent {
        let text = normalize(text);
        if text.is_empty() {
            return ClassifiedIntent::None;
        }

        for entry in &self.names {
            if entry.aliases.iter().any(|a| text.contains(a.as_str())) {
                return ClassifiedIntent::PetName(entry.pet_id.clone());
            }
        }

        if self.praise.iter().any(|w| text.contains(w.as_str())) {
            return ClassifiedIntent::Praise;
        }

        ClassifiedIntent::None
    }
}
