//! Fixed question taxonomy and keyword matching.
//!
//! Each [`Intent`] carries its own trigger keywords. Intents are tried in
//! [`Intent::PRIORITY`] order and the first match wins, so a question that
//! mentions both "critical" and "state" is answered by whichever comes
//! first in that list.

use bli_analytics_models::RiskLevel;
use serde::Serialize;
use strum::IntoEnumIterator as _;
use strum_macros::{AsRefStr, Display, EnumIter};

/// A recognised kind of question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    /// What the BLI is and how it is computed.
    Definition,
    /// Recommended actions for lagging districts.
    Interventions,
    /// What the risk levels and thresholds mean.
    RiskLadder,
    /// How many (or which) districts sit at one risk level.
    RiskCount,
    /// Peak and low months of update activity.
    Seasonality,
    /// Gap-widening curve of the worst district.
    Trend,
    /// Highest- and lowest-BLI states.
    WorstState,
    /// The top-ranked districts.
    ListDistricts,
    /// The single highest-BLI district.
    HighestDistrict,
    /// Figures for a district named in the question.
    DistrictLookup,
    /// Children enrolled but not yet updated.
    ChildrenAffected,
    /// Headline BLI and totals.
    OverallBli,
    /// Nothing matched.
    Fallback,
}

/// Words naming each risk level.
const LEVEL_WORDS: [(&str, RiskLevel); 4] = [
    ("critical", RiskLevel::Critical),
    ("high", RiskLevel::High),
    ("medium", RiskLevel::Medium),
    ("low", RiskLevel::Low),
];

/// A question lowercased, with punctuation removed and padded with spaces
/// so keywords only match on word boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized(String);

impl Normalized {
    /// Normalizes free text.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let cleaned: String = text
            .chars()
            .map(|c| {
                if c.is_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    ' '
                }
            })
            .collect();
        let words: Vec<&str> = cleaned.split_whitespace().collect();
        Self(format!(" {} ", words.join(" ")))
    }

    /// Whether `phrase` appears as whole words.
    #[must_use]
    pub fn has(&self, phrase: &str) -> bool {
        self.0.contains(&format!(" {phrase} "))
    }

    /// Whether any of `phrases` appears.
    #[must_use]
    pub fn has_any(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|p| self.has(p))
    }

    /// The normalized text without padding.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.trim()
    }
}

/// First risk level named in the question, most severe first.
#[must_use]
pub fn named_level(q: &Normalized) -> Option<RiskLevel> {
    LEVEL_WORDS
        .iter()
        .find(|(word, _)| q.has(word))
        .map(|(_, level)| *level)
}

impl Intent {
    /// Matching precedence, first match wins.
    pub const PRIORITY: [Self; 13] = [
        Self::Definition,
        Self::Interventions,
        Self::RiskLadder,
        Self::RiskCount,
        Self::Seasonality,
        Self::Trend,
        Self::WorstState,
        Self::ListDistricts,
        Self::HighestDistrict,
        Self::DistrictLookup,
        Self::ChildrenAffected,
        Self::OverallBli,
        Self::Fallback,
    ];

    /// Whether the question triggers this intent.
    ///
    /// `mentions_district` reports whether the question names a known
    /// district; only [`Intent::DistrictLookup`] uses it.
    #[must_use]
    pub fn matches(self, q: &Normalized, mentions_district: bool) -> bool {
        match self {
            Self::Definition => q.has_any(&[
                "what is bli",
                "what is a bli",
                "what does bli",
                "explain bli",
                "define bli",
                "bli formula",
                "formula",
                "biometric lag",
                "bli mean",
                "bli means",
            ]),
            Self::Interventions => q.has_any(&[
                "intervention",
                "interventions",
                "action",
                "actions",
                "recommend",
                "recommendation",
                "recommendations",
                "solution",
                "solutions",
                "fix",
            ]),
            Self::RiskLadder => q.has_any(&[
                "risk level",
                "risk levels",
                "threshold",
                "thresholds",
                "risk mean",
                "risk means",
                "levels mean",
            ]),
            Self::RiskCount => {
                named_level(q).is_some()
                    && q.has_any(&["how many", "count", "number of", "list", "which", "show"])
            }
            Self::Seasonality => q.has_any(&[
                "season",
                "seasonal",
                "seasonality",
                "peak",
                "month",
                "months",
                "monthly",
            ]),
            Self::Trend => q.has_any(&["trend", "trends", "widening", "over time", "growing"]),
            Self::WorstState => q.has_any(&["state", "states"]),
            Self::ListDistricts => {
                q.has_any(&["list", "show", "all"]) && q.has_any(&["district", "districts"])
            }
            Self::HighestDistrict => q.has_any(&["highest", "worst", "top", "problem", "most"]),
            Self::DistrictLookup => mentions_district,
            Self::ChildrenAffected => {
                q.has_any(&["children", "child", "kids", "affected", "gap", "how many"])
            }
            Self::OverallBli => q.has_any(&["overall", "total", "average", "summary", "bli"]),
            Self::Fallback => true,
        }
    }

    /// Classifies a question.
    #[must_use]
    pub fn classify(q: &Normalized, mentions_district: bool) -> Self {
        Self::PRIORITY
            .into_iter()
            .find(|intent| intent.matches(q, mentions_district))
            .unwrap_or(Self::Fallback)
    }

    /// The question this intent answers, as offered in suggestion lists.
    #[must_use]
    pub const fn canonical_question(self) -> &'static str {
        match self {
            Self::Definition => "What is the BLI formula?",
            Self::Interventions => "What interventions do you recommend?",
            Self::RiskLadder => "What do the risk levels mean?",
            Self::RiskCount => "How many districts are at critical risk?",
            Self::Seasonality => "Which month has the most biometric updates?",
            Self::Trend => "Show me the gap widening trend",
            Self::WorstState => "Which state has the highest BLI?",
            Self::ListDistricts => "List the top districts by BLI",
            Self::HighestDistrict => "Which district has the highest BLI?",
            Self::DistrictLookup => "How is the top district doing?",
            Self::ChildrenAffected => "How many children are affected?",
            Self::OverallBli => "What is the overall BLI?",
            Self::Fallback => "What can I ask?",
        }
    }

    /// Follow-ups offered after answering this intent, in preference order.
    #[must_use]
    pub const fn follow_ups(self) -> &'static [Self] {
        match self {
            Self::Definition => &[Self::HighestDistrict, Self::ChildrenAffected, Self::RiskLadder],
            Self::Interventions => &[Self::RiskCount, Self::ChildrenAffected, Self::Definition],
            Self::RiskLadder => &[Self::RiskCount, Self::Interventions, Self::WorstState],
            Self::RiskCount => &[Self::Interventions, Self::Trend, Self::WorstState],
            Self::Seasonality => &[Self::Trend, Self::OverallBli, Self::Interventions],
            Self::Trend => &[Self::Seasonality, Self::HighestDistrict, Self::Interventions],
            Self::WorstState => &[Self::ListDistricts, Self::OverallBli, Self::RiskCount],
            Self::ListDistricts => &[Self::OverallBli, Self::WorstState, Self::RiskCount],
            Self::HighestDistrict => &[Self::OverallBli, Self::WorstState, Self::Interventions],
            Self::DistrictLookup => &[Self::HighestDistrict, Self::Trend, Self::Interventions],
            Self::ChildrenAffected => &[Self::HighestDistrict, Self::Interventions, Self::OverallBli],
            Self::OverallBli => &[Self::HighestDistrict, Self::RiskCount, Self::WorstState],
            Self::Fallback => &[
                Self::Definition,
                Self::HighestDistrict,
                Self::RiskCount,
                Self::WorstState,
            ],
        }
    }

    /// Every intent that has a canonical question worth suggesting.
    pub fn suggestible() -> impl Iterator<Item = Self> {
        Self::iter().filter(|i| !matches!(i, Self::Fallback | Self::DistrictLookup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Intent {
        Intent::classify(&Normalized::new(text), false)
    }

    #[test]
    fn normalizes_punctuation_and_case() {
        let q = Normalized::new("  What's the   OVERALL BLI?? ");
        assert_eq!(q.as_str(), "what s the overall bli");
        assert!(q.has("overall bli"));
        assert!(!q.has("overall b"));
    }

    #[test]
    fn keywords_match_whole_words_only() {
        let q = Normalized::new("Which district has the highest BLI?");
        assert!(!q.has("high"));
        assert_eq!(named_level(&q), None);
    }

    #[test]
    fn classifies_the_core_questions() {
        assert_eq!(classify("Which district has the highest BLI?"), Intent::HighestDistrict);
        assert_eq!(classify("What is the overall BLI?"), Intent::OverallBli);
        assert_eq!(classify("How many districts are at critical risk?"), Intent::RiskCount);
        assert_eq!(classify("What is BLI?"), Intent::Definition);
        assert_eq!(classify("Which state needs the most attention?"), Intent::WorstState);
        assert_eq!(classify("What interventions do you recommend?"), Intent::Interventions);
    }

    #[test]
    fn classifies_the_extended_questions() {
        assert_eq!(classify("What do the risk levels mean?"), Intent::RiskLadder);
        assert_eq!(classify("How many children are affected?"), Intent::ChildrenAffected);
        assert_eq!(classify("List all districts"), Intent::ListDistricts);
        assert_eq!(classify("Show me the gap widening trend"), Intent::Trend);
        assert_eq!(classify("Which month is the peak?"), Intent::Seasonality);
        assert_eq!(classify("hello there"), Intent::Fallback);
    }

    #[test]
    fn earlier_intents_win_on_overlap() {
        // Mentions both a risk level and a state; RiskCount ranks first.
        assert_eq!(
            classify("Which state has the most critical districts?"),
            Intent::RiskCount
        );
        // "risk level" is the ladder, even with "critical" present.
        assert_eq!(classify("What does critical risk mean?"), Intent::RiskLadder);
    }

    #[test]
    fn district_mentions_only_route_when_nothing_earlier_matches() {
        let q = Normalized::new("Tell me about Pune");
        assert_eq!(Intent::classify(&q, true), Intent::DistrictLookup);
        assert_eq!(Intent::classify(&q, false), Intent::Fallback);
        let q = Normalized::new("Which state is Pune in?");
        assert_eq!(Intent::classify(&q, true), Intent::WorstState);
    }

    #[test]
    fn every_intent_is_in_the_priority_list_once() {
        for intent in Intent::iter() {
            assert_eq!(
                Intent::PRIORITY.iter().filter(|i| **i == intent).count(),
                1,
                "{intent}"
            );
        }
        assert_eq!(Intent::PRIORITY.last(), Some(&Intent::Fallback));
    }

    #[test]
    fn canonical_questions_classify_as_their_intent() {
        for intent in Intent::suggestible() {
            assert_eq!(classify(intent.canonical_question()), intent);
        }
        assert_eq!(classify(Intent::Fallback.canonical_question()), Intent::Fallback);
    }

    #[test]
    fn follow_ups_never_suggest_themselves() {
        for intent in Intent::iter() {
            assert!(!intent.follow_ups().contains(&intent), "{intent}");
        }
    }
}
