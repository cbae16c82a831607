//! Catalog mapping suggestions for free-text BOQ lines
//!
//! Matching is a string heuristic: exact match, containment, then token
//! overlap with keyword and unit bonuses. Every score is clamped to 0..=100.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::entities::boq::{clamp_confidence, BoqItem, MappingSuggestion};
use crate::entities::catalog::CatalogItem;

const EXACT_SCORE: f64 = 100.0;
const CONTAINS_SCORE: f64 = 85.0;
const OVERLAP_WEIGHT: f64 = 70.0;
const KEYWORD_BONUS: f64 = 10.0;
const UNIT_BONUS: f64 = 10.0;

/// Tuning for suggestion runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Suggestions below this confidence are dropped
    pub min_confidence: f64,

    /// Number of suggestions kept per line
    pub max_suggestions: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            min_confidence: 40.0,
            max_suggestions: 3,
        }
    }
}

/// Lower-case, turn punctuation into spaces, collapse whitespace
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![' ']
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokens(normalized: &str) -> HashSet<&str> {
    normalized.split(' ').filter(|t| !t.is_empty()).collect()
}

/// Scores catalog items against BOQ lines
pub struct CatalogMatcher<'a> {
    catalog: &'a [CatalogItem],
    config: &'a MappingConfig,
}

impl<'a> CatalogMatcher<'a> {
    pub fn new(catalog: &'a [CatalogItem], config: &'a MappingConfig) -> Self {
        Self { catalog, config }
    }

    /// Confidence and reason for one pair
    pub fn score(item: &BoqItem, candidate: &CatalogItem) -> (f64, String) {
        let description = normalize(&item.description);
        if description.is_empty() {
            return (0.0, String::new());
        }
        let name = normalize(&candidate.name);
        let code = normalize(&candidate.code);

        let (base, reason) = if description == name || description == code {
            (EXACT_SCORE, "exact match".to_string())
        } else if !name.is_empty() && (description.contains(&name) || name.contains(&description))
        {
            (CONTAINS_SCORE, "name containment".to_string())
        } else {
            let ours = tokens(&description);
            let theirs = tokens(&name);
            let union = ours.union(&theirs).count();
            let overlap = if union == 0 {
                0.0
            } else {
                ours.intersection(&theirs).count() as f64 / union as f64
            };

            let keyword_hits = candidate
                .keywords
                .iter()
                .map(|k| normalize(k))
                .filter(|k| !k.is_empty() && description.contains(k.as_str()))
                .count();

            let score = overlap * OVERLAP_WEIGHT + keyword_hits as f64 * KEYWORD_BONUS;
            let reason = match keyword_hits {
                0 => format!("{:.0}% word overlap", overlap * 100.0),
                n => format!("{:.0}% word overlap, {} keyword(s)", overlap * 100.0, n),
            };
            (score, reason)
        };

        if base <= 0.0 {
            return (0.0, String::new());
        }

        let unit_matches = !item.unit.trim().is_empty()
            && item.unit.trim().eq_ignore_ascii_case(candidate.unit.trim());
        if unit_matches {
            (clamp_confidence(base + UNIT_BONUS), format!("{}, same unit", reason))
        } else {
            (clamp_confidence(base), reason)
        }
    }

    /// Ranked suggestions for a line, best first
    pub fn suggest(&self, item: &BoqItem) -> Vec<MappingSuggestion> {
        let mut suggestions: Vec<MappingSuggestion> = self
            .catalog
            .iter()
            .filter_map(|candidate| {
                let (confidence, reason) = Self::score(item, candidate);
                (confidence > 0.0 && confidence >= self.config.min_confidence)
                    .then(|| MappingSuggestion::new(candidate, confidence, reason))
            })
            .collect();

        suggestions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.catalog_code.cmp(&b.catalog_code))
        });
        suggestions.truncate(self.config.max_suggestions);
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<CatalogItem> {
        let mut rcc = CatalogItem::new("RCC-M25", "RCC M25 Grade Concrete", "m3", "t".into());
        rcc.keywords = vec!["concrete".into()];
        let steel = CatalogItem::new("STL-500", "Steel Reinforcement Fe500", "kg", "t".into());
        let mut wiring = CatalogItem::new("ELE-WIR", "Electrical Wiring", "lot", "t".into());
        wiring.keywords = vec!["cable".into()];
        vec![rcc, steel, wiring]
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Steel Reinforcement (Fe500) "), "steel reinforcement fe500");
        assert_eq!(normalize("PCC 1:4:8"), "pcc 1 4 8");
        assert_eq!(normalize("---"), "");
        assert_eq!(normalize("ÉDGE Profile"), "édge profile");
    }

    #[test]
    fn test_non_ascii_case_matches() {
        let catalog = vec![CatalogItem::new("GRN-01", "Édge Granite Slab", "m2", "t".into())];
        let item = BoqItem::new("édge granite slab", 12.0, "m2");
        let (score, reason) = CatalogMatcher::score(&item, &catalog[0]);
        assert_eq!(score, 100.0);
        assert!(reason.contains("exact"));
    }

    #[test]
    fn test_exact_match_scores_full() {
        let item = BoqItem::new("electrical wiring", 1.0, "lot");
        let (score, reason) = CatalogMatcher::score(&item, &catalog()[2]);
        assert_eq!(score, 100.0);
        assert!(reason.contains("exact"));
    }

    #[test]
    fn test_containment_with_unit_bonus() {
        let item = BoqItem::new("Steel Reinforcement (Fe500) bars", 25000.0, "KG");
        let (score, _) = CatalogMatcher::score(&item, &catalog()[1]);
        assert_eq!(score, 95.0);
    }

    #[test]
    fn test_unrelated_scores_zero() {
        let item = BoqItem::new("Plastering (Internal)", 1200.0, "m2");
        for candidate in catalog() {
            assert_eq!(CatalogMatcher::score(&item, &candidate).0, 0.0);
        }
    }

    #[test]
    fn test_overlap_and_keywords() {
        // tokens {m25, concrete, slab} vs {rcc, m25, grade, concrete}: 2/5 overlap
        let item = BoqItem::new("M25 concrete slab", 10.0, "cum");
        let (score, reason) = CatalogMatcher::score(&item, &catalog()[0]);
        assert!((score - (0.4 * 70.0 + 10.0)).abs() < 1e-9);
        assert!(reason.contains("keyword"));
    }

    #[test]
    fn test_suggest_ranks_and_filters() {
        let config = MappingConfig {
            min_confidence: 40.0,
            max_suggestions: 2,
        };
        let catalog = catalog();
        let matcher = CatalogMatcher::new(&catalog, &config);

        let suggestions = matcher.suggest(&BoqItem::new("Electrical Wiring", 1.0, "lot"));
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].catalog_code, "ELE-WIR");
        assert!(suggestions
            .iter()
            .all(|s| (0.0..=100.0).contains(&s.confidence)));

        assert!(matcher
            .suggest(&BoqItem::new("Plumbing Works", 1.0, "lot"))
            .is_empty());
    }
}
