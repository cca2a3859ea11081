//! One answer renderer per intent.
//!
//! Every number in an answer is read from the analysis snapshot; nothing
//! is estimated or generated.

use bli_analytics_models::{DistrictAggregate, GapSeries, RiskLevel};

use crate::{
    QueryContext,
    intent::{Intent, Normalized, named_level},
};

/// Most districts named inline in a single sentence.
const MAX_NAMED: usize = 5;

/// Formats a count with thousands separators.
#[must_use]
pub fn fmt_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn name_list(districts: &[&DistrictAggregate]) -> String {
    districts
        .iter()
        .take(MAX_NAMED)
        .map(|d| format!("{} ({})", d.district, d.state))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Districts named in the question. The longest matching name wins, and a
/// state named alongside it narrows the match.
#[must_use]
pub fn mentioned_districts<'a>(
    q: &Normalized,
    districts: &'a [DistrictAggregate],
) -> Vec<&'a DistrictAggregate> {
    let named: Vec<(usize, &DistrictAggregate)> = districts
        .iter()
        .filter_map(|d| {
            let name = Normalized::new(&d.district);
            (!name.as_str().is_empty() && q.has(name.as_str())).then_some((name.as_str().len(), d))
        })
        .collect();
    let Some(longest) = named.iter().map(|(len, _)| *len).max() else {
        return Vec::new();
    };
    let matches: Vec<&DistrictAggregate> = named
        .into_iter()
        .filter(|(len, _)| *len == longest)
        .map(|(_, d)| d)
        .collect();

    let in_state: Vec<&DistrictAggregate> = matches
        .iter()
        .copied()
        .filter(|d| q.has(Normalized::new(&d.state).as_str()))
        .collect();
    if in_state.is_empty() { matches } else { in_state }
}

fn district_line(d: &DistrictAggregate) -> String {
    format!(
        "{} in {} has a BLI of {:.4} ({} risk): {} of {} enrolled children have not completed their biometric update.",
        d.district,
        d.state,
        d.bli_score,
        d.risk_level,
        fmt_count(d.child_update_gap),
        fmt_count(d.total_enrollments)
    )
}

fn definition(ctx: &QueryContext<'_>) -> String {
    format!(
        "The Biometric Lag Index (BLI) measures how many children aged 5-17 are enrolled but have not completed their mandatory biometric update. \
         Formula: BLI = (Enrollments - Biometric Updates) / Enrollments, floored at 0. \
         A higher BLI means more children at risk of service disruption. The overall BLI for the uploaded data is {:.4}.",
        ctx.result.overall_bli
    )
}

fn interventions(ctx: &QueryContext<'_>) -> String {
    let critical = ctx.result.districts_at(RiskLevel::Critical);
    let mut text = format!(
        "Recommended actions: 1) Organise biometric update camps in the {} critical-risk district(s)",
        fmt_count(critical)
    );
    if let Some(top) = ctx.districts.first() {
        text.push_str(&format!(", starting with {} ({})", top.district, top.state));
    }
    text.push_str(
        ". 2) Deploy mobile update units to schools. \
         3) Run awareness campaigns for parents on the importance of updating children's biometrics. \
         4) Track progress by re-running this analysis on fresh data.",
    );
    text
}

fn risk_ladder(ctx: &QueryContext<'_>) -> String {
    let mut text = String::from("Risk levels follow fixed BLI thresholds: ");
    let ladder = [
        (RiskLevel::Low, "BLI below 0.1"),
        (RiskLevel::Medium, "BLI from 0.1 up to 0.3"),
        (RiskLevel::High, "BLI from 0.3 up to 0.5"),
        (RiskLevel::Critical, "BLI of 0.5 or more"),
    ];
    let parts: Vec<String> = ladder
        .iter()
        .map(|(level, range)| {
            format!(
                "{level} ({}): {range}, {}; {} district(s) now",
                level.color_name(),
                level.guidance(),
                fmt_count(ctx.result.districts_at(*level))
            )
        })
        .collect();
    text.push_str(&parts.join(". "));
    text.push('.');
    text
}

fn risk_count(ctx: &QueryContext<'_>, level: RiskLevel) -> String {
    let count = ctx.result.districts_at(level);
    if count == 0 {
        return format!(
            "No districts are at {level} risk. The overall BLI is {:.4} ({} risk).",
            ctx.result.overall_bli, ctx.result.overall_risk_level
        );
    }
    let at_level: Vec<&DistrictAggregate> =
        ctx.districts.iter().filter(|d| d.risk_level == level).collect();
    format!(
        "{} district(s) are at {level} risk ({}). Highest ranked: {}.",
        fmt_count(count),
        level.guidance(),
        name_list(&at_level)
    )
}

fn seasonality(ctx: &QueryContext<'_>) -> String {
    let Some(profile) = ctx.seasonality else {
        return "Seasonality needs the biometric update dataset, which has not been analysed yet."
            .to_string();
    };
    let volume = |month: u32| {
        profile
            .months
            .iter()
            .find(|b| b.month == month)
            .map_or(0, |b| b.updates)
    };
    format!(
        "Biometric updates peak in {} ({} updates across all years) and are lowest in {} ({} updates).",
        profile.peak_month_name,
        fmt_count(volume(profile.peak_month)),
        profile.low_month_name,
        fmt_count(volume(profile.low_month))
    )
}

fn series_line(series: &GapSeries) -> String {
    match (series.points.first(), series.latest()) {
        (Some(first), Some(last)) => format!(
            "In {} ({}), the gap between cumulative enrollments and biometric updates went from {} on {} to {} on {} ({} enrolled, {} updated).",
            series.district,
            series.state,
            fmt_count(first.gap),
            first.date,
            fmt_count(last.gap),
            last.date,
            fmt_count(last.cumulative_enrollments),
            fmt_count(last.cumulative_updates)
        ),
        _ => format!("{} ({}) has no dated activity.", series.district, series.state),
    }
}

/// Describes the districts named in the question, or the top-ranked
/// district when none is named.
fn trend(ctx: &QueryContext<'_>, q: &Normalized) -> String {
    let named = mentioned_districts(q, ctx.districts);
    if named.is_empty() {
        return ctx.top_district_series.map_or_else(
            || "No gap series is available yet.".to_string(),
            series_line,
        );
    }

    let lines: Vec<String> = named
        .iter()
        .filter_map(|d| {
            ctx.mentioned_series
                .iter()
                .find(|s| s.state == d.state && s.district == d.district)
        })
        .map(series_line)
        .collect();
    if lines.is_empty() {
        format!("No gap series is available for {}.", name_list(&named))
    } else {
        lines.join(" ")
    }
}

fn worst_state(ctx: &QueryContext<'_>) -> String {
    let states = &ctx.result.state_summary;
    let Some(top) = states.first() else {
        return "No state data is available.".to_string();
    };
    let mut text = format!(
        "The state with the highest BLI is {} at {:.4} ({} risk, {} district(s)).",
        top.state,
        top.bli_score,
        top.risk_level,
        fmt_count(top.district_count)
    );
    if states.len() > 1
        && let Some(best) = states.last()
    {
        text.push_str(&format!(
            " The best performing state is {} at {:.4}.",
            best.state, best.bli_score
        ));
    }
    text.push_str(&format!(" {} state(s) analysed.", states.len()));
    text
}

fn list_districts(ctx: &QueryContext<'_>) -> String {
    let top = &ctx.result.top_problem_districts;
    let mut text = format!("Top {} district(s) by BLI:", top.len());
    for (i, d) in top.iter().enumerate() {
        text.push_str(&format!(
            "\n{}. {} ({}): BLI {:.4}, {} risk, gap {}",
            i + 1,
            d.district,
            d.state,
            d.bli_score,
            d.risk_level,
            fmt_count(d.child_update_gap)
        ));
    }
    text
}

fn highest_district(ctx: &QueryContext<'_>) -> String {
    ctx.districts.first().map_or_else(
        || "No district data is available.".to_string(),
        |top| format!("The district with the highest BLI is {}", district_line(top)),
    )
}

fn district_lookup(ctx: &QueryContext<'_>, q: &Normalized) -> String {
    let found = mentioned_districts(q, ctx.districts);
    if found.is_empty() {
        return fallback(ctx);
    }
    found
        .iter()
        .map(|d| {
            let rank = ctx
                .districts
                .iter()
                .position(|x| std::ptr::eq(x, *d))
                .map_or(0, |p| p + 1);
            format!(
                "{} Ranked {rank} of {}.",
                district_line(d),
                ctx.districts.len()
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn children_affected(ctx: &QueryContext<'_>) -> String {
    let mut text = format!(
        "{} children aged 5-17 have enrolled but not completed their biometric update ({} enrolled, {} updated).",
        fmt_count(ctx.result.total_gap),
        fmt_count(ctx.result.total_enrollments),
        fmt_count(ctx.result.total_updates)
    );
    // First maximum in ranking order.
    let largest = ctx
        .districts
        .iter()
        .fold(None::<&DistrictAggregate>, |best, d| match best {
            Some(b) if b.child_update_gap >= d.child_update_gap => Some(b),
            _ => Some(d),
        });
    if let Some(d) = largest {
        text.push_str(&format!(
            " The largest gap is in {} ({}) with {} children.",
            d.district,
            d.state,
            fmt_count(d.child_update_gap)
        ));
    }
    text
}

fn overall(ctx: &QueryContext<'_>) -> String {
    let r = ctx.result;
    format!(
        "The overall BLI is {:.4} ({} risk), from {} enrollments and {} biometric updates across {} district(s). \
         {} records analysed from {}. {} district(s) are at Critical risk and {} at High risk.",
        r.overall_bli,
        r.overall_risk_level,
        fmt_count(r.total_enrollments),
        fmt_count(r.total_updates),
        fmt_count(r.district_count),
        fmt_count(r.total_records),
        r.date_range,
        fmt_count(r.districts_at(RiskLevel::Critical)),
        fmt_count(r.districts_at(RiskLevel::High))
    )
}

fn fallback(ctx: &QueryContext<'_>) -> String {
    let mut text = format!(
        "I can answer questions about the uploaded data. The overall BLI is {:.4} ({} risk).",
        ctx.result.overall_bli, ctx.result.overall_risk_level
    );
    if let Some(top) = ctx.districts.first() {
        text.push_str(&format!(
            " The district needing most attention is {} ({}) at {:.4}.",
            top.district, top.state, top.bli_score
        ));
    }
    text.push_str(
        " Ask about specific districts, states, risk levels, trends, seasonality, or recommendations.",
    );
    text
}

/// Renders the answer for an already-classified question.
#[must_use]
pub fn render(intent: Intent, ctx: &QueryContext<'_>, q: &Normalized) -> String {
    match intent {
        Intent::Definition => definition(ctx),
        Intent::Interventions => interventions(ctx),
        Intent::RiskLadder => risk_ladder(ctx),
        Intent::RiskCount => risk_count(ctx, named_level(q).unwrap_or(RiskLevel::Critical)),
        Intent::Seasonality => seasonality(ctx),
        Intent::Trend => trend(ctx, q),
        Intent::WorstState => worst_state(ctx),
        Intent::ListDistricts => list_districts(ctx),
        Intent::HighestDistrict => highest_district(ctx),
        Intent::DistrictLookup => district_lookup(ctx, q),
        Intent::ChildrenAffected => children_affected(ctx),
        Intent::OverallBli => overall(ctx),
        Intent::Fallback => fallback(ctx),
    }
}
