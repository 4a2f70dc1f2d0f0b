//! Heuristic section classifier.
//!
//! Splits free-form text into the three annotation sections with a
//! line-oriented state machine. Header lines for components and technical
//! description are consumed; pricing lines are kept in the pricing output.

use super::annotation::AnnotationPatch;

const COMPONENTS_KEYWORDS: &[&str] = &[
    "komponentų sąraš",
    "komponentai",
    "components",
    "component list",
    "parts list",
    "bill of materials",
];

const TECH_DESCRIPTION_KEYWORDS: &[&str] = &[
    "techninis aprašymas",
    "techninė specifikacija",
    "technical description",
    "technical specification",
    "tech description",
];

const PRICING_KEYWORDS: &[&str] = &[
    "kaina", "kainos", "pigesn", "standart", "premium", "cheaper", "standard", "price", "pricing",
];

/// Classifier output. Every field is trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub components: String,
    pub tech_description: String,
    pub pricing: String,
}

impl Sections {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.tech_description.is_empty() && self.pricing.is_empty()
    }
}

impl From<Sections> for AnnotationPatch {
    fn from(sections: Sections) -> Self {
        Self {
            components: Some(sections.components),
            tech_description: Some(sections.tech_description),
            pricing: Some(sections.pricing),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    None,
    Components,
    TechDescription,
    Pricing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    ComponentsHeader,
    TechDescriptionHeader,
    PricingLine,
    Body,
}

impl LineKind {
    fn of(line: &str) -> Self {
        let lowered = line.to_lowercase();
        let matches = |keywords: &[&str]| keywords.iter().any(|kw| lowered.contains(kw));

        if matches(COMPONENTS_KEYWORDS) {
            Self::ComponentsHeader
        } else if matches(TECH_DESCRIPTION_KEYWORDS) {
            Self::TechDescriptionHeader
        } else if matches(PRICING_KEYWORDS) {
            Self::PricingLine
        } else {
            Self::Body
        }
    }
}

/// Returns the next state and whether the current line is retained.
fn transition(state: SectionState, kind: LineKind) -> (SectionState, bool) {
    match kind {
        LineKind::ComponentsHeader => (SectionState::Components, false),
        LineKind::TechDescriptionHeader => (SectionState::TechDescription, false),
        LineKind::PricingLine => (SectionState::Pricing, true),
        LineKind::Body => (state, true),
    }
}

/// Classify `raw_text` into components, technical description and pricing.
///
/// Never fails. When no section receives any text, the whole trimmed input
/// lands in `components`.
pub fn classify(raw_text: &str) -> Sections {
    let mut components = String::new();
    let mut tech_description = String::new();
    let mut pricing = String::new();
    let mut state = SectionState::None;

    for line in raw_text.lines() {
        let (next, retain) = transition(state, LineKind::of(line));
        state = next;
        if !retain {
            continue;
        }

        let target = match state {
            SectionState::None => continue,
            SectionState::Components => &mut components,
            SectionState::TechDescription => &mut tech_description,
            SectionState::Pricing => &mut pricing,
        };
        target.push_str(line);
        target.push('\n');
    }

    let mut sections = Sections {
        components: components.trim().to_string(),
        tech_description: tech_description.trim().to_string(),
        pricing: pricing.trim().to_string(),
    };

    if sections.is_empty() {
        sections.components = raw_text.trim().to_string();
    }

    sections
}
