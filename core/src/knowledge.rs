//! Curated knowledge table for well-known plant diseases.
//!
//! Used when live advice generation is unavailable. Entries are keyed by
//! `Plant_Condition` identifiers; any field an entry leaves out is filled with
//! generic defaults when the advice card is built.

use crate::advice::{
    AdviceTier, Degradation, DiseaseAdvice, NOT_AVAILABLE, Severity, display_name,
    generic_advice,
};

/// Plant names recognised as a label prefix when the classifier separator is absent.
const COMMON_PLANTS: &[&str] = &[
    "Apple",
    "Tomato",
    "Potato",
    "Grape",
    "Corn",
    "Cherry",
    "Peach",
    "Strawberry",
];

/// Separator between plant and condition in classifier labels.
const CLASS_SEPARATOR: &str = "___";

#[derive(Debug, Clone, Copy)]
pub struct KnowledgeEntry {
    pub key: &'static str,
    /// Alternative identifiers, e.g. the classifier's own spelling of the condition.
    pub aliases: &'static [&'static str],
    pub scientific_name: Option<&'static str>,
    pub description: Option<&'static str>,
    pub symptoms: Option<&'static [&'static str]>,
    pub treatments: Option<&'static [&'static str]>,
    pub preventions: Option<&'static [&'static str]>,
    pub organic_solutions: Option<&'static [&'static str]>,
    pub expected_recovery_time: Option<&'static str>,
    pub severity: Option<Severity>,
}

impl KnowledgeEntry {
    fn identifiers(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.key).chain(self.aliases.iter().copied())
    }

    /// Build a fallback-tier advice card from this entry.
    pub fn to_advice(
        &self,
        disease_name: &str,
        confidence: f64,
        degradation: &Degradation,
    ) -> DiseaseAdvice {
        DiseaseAdvice {
            disease_name: disease_name.to_string(),
            scientific_name: self.scientific_name.unwrap_or(NOT_AVAILABLE).to_string(),
            description: self
                .description
                .map(str::to_string)
                .unwrap_or_else(|| format!("{disease_name} is a common plant disease.")),
            symptoms: owned(self.symptoms.unwrap_or(DEFAULT_SYMPTOMS)),
            treatments: owned(self.treatments.unwrap_or(DEFAULT_TREATMENTS)),
            preventions: owned(self.preventions.unwrap_or(DEFAULT_PREVENTIONS)),
            severity: self
                .severity
                .unwrap_or_else(|| Severity::from_confidence(confidence)),
            organic_solutions: owned(self.organic_solutions.unwrap_or(DEFAULT_ORGANIC)),
            expected_recovery_time: self
                .expected_recovery_time
                .unwrap_or(DEFAULT_RECOVERY)
                .to_string(),
            success: true,
            error_message: Some(format!(
                "Using fallback data. Original error: {}",
                degradation.message
            )),
            tier: AdviceTier::FallbackTable,
            degradation: Some(degradation.reason),
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

const DEFAULT_SYMPTOMS: &[&str] = &["Leaf discoloration", "Spots or lesions", "Stunted growth"];
const DEFAULT_TREATMENTS: &[&str] = &[
    "Remove infected plant parts",
    "Apply appropriate treatments",
    "Ensure proper growing conditions",
];
const DEFAULT_PREVENTIONS: &[&str] = &[
    "Use disease-resistant varieties",
    "Practice crop rotation",
    "Maintain proper plant spacing",
];
const DEFAULT_ORGANIC: &[&str] = &[
    "Apply neem oil spray",
    "Use copper-based organic fungicides",
    "Improve plant nutrition with organic matter",
];
const DEFAULT_RECOVERY: &str = "2-4 weeks with proper treatment";

const fn entry(key: &'static str) -> KnowledgeEntry {
    KnowledgeEntry {
        key,
        aliases: &[],
        scientific_name: None,
        description: None,
        symptoms: None,
        treatments: None,
        preventions: None,
        organic_solutions: None,
        expected_recovery_time: None,
        severity: None,
    }
}

pub static KNOWLEDGE_TABLE: &[KnowledgeEntry] = &[
    KnowledgeEntry {
        scientific_name: Some("Venturia inaequalis"),
        description: Some(
            "A fungal disease that appears as olive-green to brown spots on leaves and fruit.",
        ),
        symptoms: Some(&[
            "Dark olive-green spots on leaves",
            "Scabby lesions on fruit",
            "Premature leaf drop",
        ]),
        treatments: Some(&[
            "Apply fungicide early in the growing season",
            "Remove and destroy fallen leaves",
            "Prune to improve air circulation",
        ]),
        preventions: Some(&[
            "Choose resistant varieties",
            "Rake and destroy fallen leaves",
            "Apply preventative fungicides",
        ]),
        organic_solutions: Some(&[
            "Neem oil spray",
            "Sulfur-based organic fungicides",
            "Baking soda spray solutions",
        ]),
        expected_recovery_time: Some("2-3 weeks with proper treatment"),
        ..entry("Apple_scab")
    },
    KnowledgeEntry {
        scientific_name: Some("Alternaria solani"),
        description: Some(
            "A fungal disease that causes dark spots with concentric rings on lower leaves first.",
        ),
        symptoms: Some(&[
            "Dark brown spots with concentric rings",
            "Yellowing around lesions",
            "Starts on lower leaves",
        ]),
        treatments: Some(&[
            "Remove infected leaves",
            "Apply approved fungicides",
            "Improve air circulation",
        ]),
        preventions: Some(&[
            "Crop rotation",
            "Mulch around plants",
            "Avoid overhead watering",
        ]),
        organic_solutions: Some(&[
            "Copper-based organic fungicides",
            "Compost tea sprays",
            "Garlic and horseradish mixture spray",
        ]),
        expected_recovery_time: Some("3-4 weeks with consistent treatment"),
        ..entry("Tomato_Early_blight")
    },
    KnowledgeEntry {
        scientific_name: Some("Phytophthora infestans"),
        description: Some(
            "A water mold that causes destructive disease in potatoes and tomatoes. It spreads rapidly in wet conditions.",
        ),
        symptoms: Some(&[
            "Dark water-soaked spots on leaves",
            "White fuzzy growth on undersides",
            "Brown lesions on stems",
            "Fruit rot with greasy appearance",
        ]),
        treatments: Some(&[
            "Remove and destroy infected plants",
            "Apply fungicide preventively",
            "Increase plant spacing",
        ]),
        preventions: Some(&[
            "Plant resistant varieties",
            "Water at the base to keep foliage dry",
            "Provide good air circulation",
        ]),
        organic_solutions: Some(&[
            "Copper-based organic fungicides",
            "Compost tea with beneficial microbes",
            "Baking soda spray with soap",
        ]),
        expected_recovery_time: Some("Often fatal - focus on protecting uninfected plants"),
        ..entry("Tomato_Late_blight")
    },
    KnowledgeEntry {
        scientific_name: Some("Phytophthora infestans"),
        description: Some(
            "The same pathogen that causes tomato late blight. This infamous disease caused the Irish potato famine.",
        ),
        symptoms: Some(&[
            "Dark water-soaked spots on leaves",
            "White fungal growth in humid conditions",
            "Brown to purple lesions on tubers",
        ]),
        treatments: Some(&[
            "Apply fungicide prophylactically",
            "Remove infected plants completely",
            "Hill soil around remaining plants",
        ]),
        preventions: Some(&[
            "Use certified disease-free seed potatoes",
            "Rotate crops",
            "Plant resistant varieties",
        ]),
        organic_solutions: Some(&[
            "Copper-based sprays",
            "Remove volunteer potatoes",
            "Avoid overhead irrigation",
        ]),
        expected_recovery_time: Some("Prevention is key - infected plants rarely recover"),
        ..entry("Potato_Late_blight")
    },
    KnowledgeEntry {
        scientific_name: Some("Alternaria solani"),
        description: Some(
            "A common fungal disease of potato foliage that weakens plants late in the season.",
        ),
        symptoms: Some(&[
            "Brown target-like spots on older leaves",
            "Yellowing of surrounding leaf tissue",
            "Dark sunken lesions on tubers",
        ]),
        ..entry("Potato_Early_blight")
    },
    KnowledgeEntry {
        scientific_name: Some("Guignardia bidwellii"),
        description: Some(
            "A fungal disease that attacks all green parts of the vine, especially damaging to fruit.",
        ),
        symptoms: Some(&[
            "Circular lesions with dark margins on leaves",
            "Black, mummified fruit",
            "Tan spots with black dots",
        ]),
        treatments: Some(&[
            "Apply fungicide before and after bloom",
            "Remove mummified fruit",
            "Prune infected areas",
        ]),
        preventions: Some(&[
            "Maintain open canopy for air circulation",
            "Remove wild grapes nearby",
            "Sanitize pruning tools",
        ]),
        organic_solutions: Some(&[
            "Lime sulfur dormant spray",
            "Organic copper fungicides",
            "Potassium bicarbonate sprays",
        ]),
        expected_recovery_time: Some("2-3 seasons for heavily infected vineyards"),
        ..entry("Grape_Black_rot")
    },
    KnowledgeEntry {
        aliases: &["Cedar_apple_rust"],
        scientific_name: Some("Gymnosporangium juniperi-virginianae"),
        description: Some(
            "A fungal disease requiring both apple trees and cedar/juniper to complete its life cycle.",
        ),
        symptoms: Some(&[
            "Bright orange-yellow spots on leaves",
            "Distorted fruit",
            "Orange gelatinous projections (on cedar)",
        ]),
        treatments: Some(&[
            "Apply fungicide during spring infection period",
            "Remove nearby cedar hosts if possible",
            "Prune heavily infected branches",
        ]),
        preventions: Some(&[
            "Plant resistant apple varieties",
            "Maintain distance from cedar trees",
            "Apply preventative fungicides",
        ]),
        organic_solutions: Some(&[
            "Sulfur sprays",
            "Kaolin clay applications",
            "Neem oil treatments",
        ]),
        expected_recovery_time: Some("Annual management required in susceptible areas"),
        ..entry("Apple_Cedar_rust")
    },
    KnowledgeEntry {
        aliases: &["Common_rust"],
        scientific_name: Some("Puccinia sorghi"),
        description: Some(
            "A fungal disease causing reddish-brown pustules on corn leaves. Can reduce yield in severe cases.",
        ),
        symptoms: Some(&[
            "Small reddish-brown pustules on both sides of leaves",
            "Pustules turn black late in season",
            "Severe cases cause yellowing",
        ]),
        treatments: Some(&[
            "Apply fungicide if detected early",
            "Ensure balanced nutrition",
            "Manage during early growth stages",
        ]),
        preventions: Some(&[
            "Plant resistant hybrids",
            "Early planting helps avoid",
            "Rotate crops",
        ]),
        organic_solutions: Some(&[
            "Balanced organic fertilization",
            "Compost tea foliar sprays",
            "Increase plant spacing for airflow",
        ]),
        expected_recovery_time: Some(
            "Plants can recover with minimal yield loss if treated early",
        ),
        ..entry("Corn_Common_rust")
    },
];

/// Label with every whitespace character replaced by `_`.
fn direct_key(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Condition part of a label with the plant name removed.
///
/// `Apple___Apple_scab` becomes `Apple_scab`; `Tomato Leaf Mold` becomes
/// `Leaf_Mold`. Trailing underscores are dropped.
pub fn simplified_key(label: &str) -> String {
    let label = label.trim();
    let simplified = if let Some((_, condition)) = label.split_once(CLASS_SEPARATOR) {
        condition.replace(' ', "_")
    } else if let Some(rest) = COMMON_PLANTS
        .iter()
        .find_map(|plant| label.strip_prefix(plant))
    {
        rest.trim().replace(' ', "_")
    } else {
        label.split(' ').skip(1).collect::<Vec<_>>().join("_")
    };
    simplified.trim_matches('_').to_string()
}

fn normalized_words(text: &str) -> String {
    display_name(text).to_lowercase()
}

fn find_exact(key: &str) -> Option<&'static KnowledgeEntry> {
    if key.is_empty() {
        return None;
    }
    KNOWLEDGE_TABLE
        .iter()
        .find(|entry| entry.identifiers().any(|id| id == key))
}

/// Look up a classifier label in the knowledge table.
///
/// Tries, in order: exact identifier match, match on [`simplified_key`], then
/// substring containment either way between normalized identifier and label.
pub fn lookup(label: &str) -> Option<&'static KnowledgeEntry> {
    if let Some(hit) = find_exact(&direct_key(label)) {
        return Some(hit);
    }
    if let Some(hit) = find_exact(&simplified_key(label)) {
        return Some(hit);
    }

    let normalized_label = normalized_words(label);
    if normalized_label.is_empty() {
        return None;
    }
    KNOWLEDGE_TABLE.iter().find(|entry| {
        entry.identifiers().any(|id| {
            let normalized_id = normalized_words(id);
            normalized_id.contains(&normalized_label) || normalized_label.contains(&normalized_id)
        })
    })
}

/// Fallback-tier advice: a knowledge-table card when the label is known,
/// otherwise the generic template.
pub fn fallback_advice(label: &str, confidence: f64, degradation: &Degradation) -> DiseaseAdvice {
    let disease_name = display_name(label);
    match lookup(label) {
        Some(entry) => entry.to_advice(&disease_name, confidence, degradation),
        None => generic_advice(&disease_name, degradation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::DegradationReason;

    fn failure() -> Degradation {
        Degradation::new(DegradationReason::Transport, "connection refused")
    }

    #[test]
    fn simplified_key_uses_classifier_separator() {
        assert_eq!(simplified_key("Apple___Apple_scab"), "Apple_scab");
        assert_eq!(simplified_key("Corn_(maize)___Common_rust_"), "Common_rust");
        assert_eq!(simplified_key("Tomato___Late blight"), "Late_blight");
    }

    #[test]
    fn simplified_key_strips_common_plant_prefix() {
        assert_eq!(simplified_key("Tomato Leaf Mold"), "Leaf_Mold");
        assert_eq!(simplified_key("Banana Weird Disease"), "Weird_Disease");
    }

    #[test]
    fn lookup_matches_direct_key() {
        let hit = lookup("Tomato Early blight").expect("direct key should match");
        assert_eq!(hit.key, "Tomato_Early_blight");
    }

    #[test]
    fn lookup_matches_simplified_key_and_aliases() {
        assert_eq!(lookup("Apple___Apple_scab").map(|e| e.key), Some("Apple_scab"));
        assert_eq!(
            lookup("Apple___Cedar_apple_rust").map(|e| e.key),
            Some("Apple_Cedar_rust")
        );
        assert_eq!(
            lookup("Corn_(maize)___Common_rust_").map(|e| e.key),
            Some("Corn_Common_rust")
        );
    }

    #[test]
    fn lookup_strips_common_plant_prefix_without_separator() {
        assert_eq!(simplified_key("Apple Cedar apple rust"), "Cedar_apple_rust");
        assert_eq!(
            lookup("Apple Cedar apple rust").map(|e| e.key),
            Some("Apple_Cedar_rust")
        );
    }

    #[test]
    fn lookup_falls_back_to_substring_match() {
        assert_eq!(
            lookup("Tomato___Late_blight").map(|e| e.key),
            Some("Tomato_Late_blight")
        );
        assert_eq!(
            lookup("Potato___Late_blight").map(|e| e.key),
            Some("Potato_Late_blight")
        );
        assert_eq!(lookup("grape black rot").map(|e| e.key), Some("Grape_Black_rot"));
    }

    #[test]
    fn lookup_misses_unknown_and_empty_labels() {
        assert!(lookup("Banana___Weird_Disease").is_none());
        assert!(lookup("").is_none());
        assert!(lookup("   ").is_none());
    }

    #[test]
    fn fallback_advice_uses_table_entry() {
        let advice = fallback_advice("Apple___Apple_scab", 0.9, &failure());
        assert_eq!(advice.scientific_name, "Venturia inaequalis");
        assert_eq!(advice.disease_name, "Apple Apple scab");
        assert_eq!(advice.tier, AdviceTier::FallbackTable);
        assert_eq!(advice.degradation, Some(DegradationReason::Transport));
        assert!(advice.success);
        assert_eq!(
            advice.error_message.as_deref(),
            Some("Using fallback data. Original error: connection refused")
        );
        assert_eq!(advice.severity, Severity::High);
    }

    #[test]
    fn fallback_advice_fills_omitted_entry_fields() {
        let advice = fallback_advice("Potato___Early_blight", 0.65, &failure());
        assert_eq!(advice.scientific_name, "Alternaria solani");
        assert_eq!(advice.treatments, owned(DEFAULT_TREATMENTS));
        assert_eq!(advice.preventions, owned(DEFAULT_PREVENTIONS));
        assert_eq!(advice.organic_solutions, owned(DEFAULT_ORGANIC));
        assert_eq!(advice.expected_recovery_time, DEFAULT_RECOVERY);
        assert_eq!(advice.severity, Severity::Medium);
    }

    #[test]
    fn fallback_advice_uses_generic_template_for_unknown_labels() {
        let advice = fallback_advice("Banana___Weird_Disease", 0.4, &failure());
        assert_eq!(advice.tier, AdviceTier::Generic);
        assert_eq!(advice.severity, Severity::Medium);
        assert_eq!(advice.error_message.as_deref(), Some("connection refused"));
        assert!(!advice.symptoms.is_empty());
        assert!(!advice.treatments.is_empty());
        assert!(!advice.preventions.is_empty());
        assert!(!advice.organic_solutions.is_empty());
    }

    #[test]
    fn table_keys_are_unique() {
        let mut ids: Vec<&str> = KNOWLEDGE_TABLE
            .iter()
            .flat_map(|entry| entry.identifiers())
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}
