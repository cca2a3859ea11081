#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Bounded question answering over a BLI analysis snapshot.
//!
//! Free text is classified into a fixed [`Intent`] taxonomy by keyword
//! matching in a documented precedence order. Each intent has one renderer
//! that interpolates figures from the snapshot, and the reply carries a
//! few follow-up questions drawn from a fixed pool.

pub mod chat;
pub mod intent;
pub mod render;

use bli_analytics_models::{AnalysisResult, DistrictAggregate, GapSeries, SeasonalityProfile};
use serde::Serialize;

pub use chat::{ChatHistory, ChatRole, ChatTurn};
pub use intent::{Intent, Normalized};

/// Fewest follow-ups offered with an answer.
pub const MIN_SUGGESTIONS: usize = 2;
/// Most follow-ups offered with an answer.
pub const MAX_SUGGESTIONS: usize = 4;

/// Everything an answer may read from.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    /// Current analysis snapshot.
    pub result: &'a AnalysisResult,
    /// Every district in ranking order.
    pub districts: &'a [DistrictAggregate],
    /// Gap curve of the highest-ranked district.
    pub top_district_series: Option<&'a GapSeries>,
    /// Gap curves of the districts named in the question, if any.
    pub mentioned_series: &'a [GapSeries],
    /// Monthly update profile.
    pub seasonality: Option<&'a SeasonalityProfile>,
}

/// A rendered reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    /// Intent the question was classified as.
    pub intent: Intent,
    /// Reply text.
    pub answer_text: String,
    /// Follow-up questions, between [`MIN_SUGGESTIONS`] and
    /// [`MAX_SUGGESTIONS`] of them.
    pub suggested_questions: Vec<String>,
}

/// Follow-ups for an answered intent, excluding that intent and anything
/// matching the question as asked.
#[must_use]
pub fn suggestions(answered: Intent, asked: &Normalized) -> Vec<String> {
    let eligible = |candidate: &Intent| {
        *candidate != answered && Normalized::new(candidate.canonical_question()) != *asked
    };

    let mut picked: Vec<Intent> = answered
        .follow_ups()
        .iter()
        .copied()
        .filter(eligible)
        .take(MAX_SUGGESTIONS)
        .collect();
    for candidate in Intent::suggestible() {
        if picked.len() >= MIN_SUGGESTIONS {
            break;
        }
        if eligible(&candidate) && !picked.contains(&candidate) {
            picked.push(candidate);
        }
    }

    picked
        .into_iter()
        .map(|i| i.canonical_question().to_string())
        .collect()
}

/// Answers one question against the context.
#[must_use]
pub fn answer(question: &str, ctx: &QueryContext<'_>) -> Answer {
    let q = Normalized::new(question);
    let mentions_district = !render::mentioned_districts(&q, ctx.districts).is_empty();
    let intent = Intent::classify(&q, mentions_district);
    log::debug!("Question '{}' matched intent {intent}", q.as_str());

    Answer {
        intent,
        answer_text: render::render(intent, ctx, &q),
        suggested_questions: suggestions(intent, &q),
    }
}
