use regex::Regex;

use crate::config::VocabularyConfig;
use crate::utils::error::{Result, ScrapeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

/// One step of the list-item classification cascade.
///
/// Rules are evaluated in order and the first rule that returns a verdict
/// decides; an item no rule speaks for is rejected.
#[derive(Debug, Clone)]
pub enum ClassifierRule {
    /// Case-insensitive substring match against instruction phrases.
    RejectIfContains(String),
    AcceptIfMatches(Regex),
    /// Uppercase letter followed by a lowercase one, e.g. "Kalium".
    AcceptIfTitleCase,
    AcceptIfNotLowercaseStart,
    AcceptAny,
}

impl ClassifierRule {
    pub fn verdict(&self, text: &str) -> Option<Verdict> {
        match self {
            ClassifierRule::RejectIfContains(phrase) => text
                .to_lowercase()
                .contains(&phrase.to_lowercase())
                .then_some(Verdict::Reject),
            ClassifierRule::AcceptIfMatches(pattern) => {
                pattern.is_match(text).then_some(Verdict::Accept)
            }
            ClassifierRule::AcceptIfTitleCase => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(first), Some(second)) if first.is_ascii_uppercase() && second.is_ascii_lowercase() => {
                        Some(Verdict::Accept)
                    }
                    _ => None,
                }
            }
            ClassifierRule::AcceptIfNotLowercaseStart => match text.chars().next() {
                Some(first) if !first.is_ascii_lowercase() => Some(Verdict::Accept),
                _ => None,
            },
            ClassifierRule::AcceptAny => Some(Verdict::Accept),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemClassifier {
    rules: Vec<ClassifierRule>,
}

impl ItemClassifier {
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    /// Rejection phrases, then vocabulary, abbreviation, title-case and
    /// not-lowercase acceptance.
    pub fn for_ordered_lists(vocabulary: &VocabularyConfig) -> Result<Self> {
        let mut rules: Vec<ClassifierRule> = vocabulary
            .ordered_list_exclusions
            .iter()
            .map(|phrase| ClassifierRule::RejectIfContains(phrase.clone()))
            .collect();

        if !vocabulary.known_biomarkers.is_empty() {
            let alternation = vocabulary
                .known_biomarkers
                .iter()
                .map(|name| regex::escape(name))
                .collect::<Vec<_>>()
                .join("|");
            rules.push(ClassifierRule::AcceptIfMatches(compile(&alternation)?));
        }

        // Parenthesized abbreviation such as "(TSH)" or "(HDL-cholesterol"
        rules.push(ClassifierRule::AcceptIfMatches(compile(r"\([A-Z]{2,}[)\s-]")?));
        rules.push(ClassifierRule::AcceptIfTitleCase);
        rules.push(ClassifierRule::AcceptIfNotLowercaseStart);

        Ok(Self::new(rules))
    }

    /// Accept everything except items containing one of `phrases`.
    pub fn excluding(phrases: &[String]) -> Self {
        let mut rules: Vec<ClassifierRule> = phrases
            .iter()
            .map(|phrase| ClassifierRule::RejectIfContains(phrase.clone()))
            .collect();
        rules.push(ClassifierRule::AcceptAny);
        Self::new(rules)
    }

    pub fn classify(&self, text: &str) -> Verdict {
        self.rules
            .iter()
            .find_map(|rule| rule.verdict(text))
            .unwrap_or(Verdict::Reject)
    }

    pub fn accepts(&self, text: &str) -> bool {
        self.classify(text) == Verdict::Accept
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ScrapeError::Extraction(format!("Invalid classifier pattern: {}", e)))
}
