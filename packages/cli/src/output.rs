//! Human-readable rendering of engine results.

use bli_cli_utils::risk_style;
use bli_engine::{
    AnalysisResult, Answer, EngineError, GapSeries, IngestReport, SeasonalityProfile,
    StateAggregate,
};
use console::style;
use serde::Serialize;

/// Rejections listed before the rest are summarised as a count.
const MAX_REJECTIONS_SHOWN: usize = 20;

/// Prints `value` as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_ingest(report: &IngestReport) {
    println!(
        "{} {}: {} rows accepted, {} rejected",
        style("✓").green(),
        report.kind.label(),
        report.accepted_rows,
        report.rejected_rows.len()
    );
    for rejection in report.rejected_rows.iter().take(MAX_REJECTIONS_SHOWN) {
        println!("    {}", style(rejection).dim());
    }
}

pub fn print_failure(err: &dyn std::error::Error) {
    eprintln!("{} {err}", style("error:").red().bold());
}

/// Prints an engine error, listing row-level defects for validation failures.
pub fn print_error(err: &EngineError) {
    eprintln!("{} {err}", style("error:").red().bold());
    if let EngineError::Validation { rejections, .. } = err {
        for rejection in rejections.iter().take(MAX_REJECTIONS_SHOWN) {
            eprintln!("    {rejection}");
        }
        if rejections.len() > MAX_REJECTIONS_SHOWN {
            eprintln!(
                "    ... and {} more",
                rejections.len() - MAX_REJECTIONS_SHOWN
            );
        }
    }
}

pub fn print_analysis(result: &AnalysisResult) {
    let risk = risk_style(result.overall_risk_level);
    println!("{}", style("Biometric Lag Index").bold());
    println!(
        "  Overall BLI:   {} ({})",
        risk.apply_to(format!("{:.4}", result.overall_bli)),
        risk.apply_to(result.overall_risk_level)
    );
    println!("  Date range:    {}", result.date_range);
    println!("  Records:       {}", result.total_records);
    println!("  Districts:     {}", result.district_count);
    println!(
        "  Enrollments:   {}  Updates: {}  Gap: {}",
        result.total_enrollments, result.total_updates, result.total_gap
    );
    if let Some(demographic) = result.demographic_total {
        println!("  Demographic:   {demographic}");
    }

    println!();
    println!("{}", style("Risk distribution").bold());
    for bucket in &result.risk_distribution {
        println!(
            "  {:<10} {}",
            risk_style(bucket.risk_level).apply_to(bucket.risk_level),
            bucket.count
        );
    }

    println!();
    println!("{}", style("Top problem districts").bold());
    println!(
        "  {:<4} {:<28} {:<22} {:>8} {:>10} RISK",
        "#", "DISTRICT", "STATE", "BLI", "GAP"
    );
    for (i, d) in result.top_problem_districts.iter().enumerate() {
        println!(
            "  {:<4} {:<28} {:<22} {:>8.4} {:>10} {}",
            i + 1,
            d.district,
            d.state,
            d.bli_score,
            d.child_update_gap,
            risk_style(d.risk_level).apply_to(d.risk_level)
        );
    }
}

pub fn print_states(states: &[StateAggregate]) {
    println!(
        "{:<4} {:<24} {:>9} {:>8} {:>10} RISK",
        "#", "STATE", "DISTRICTS", "BLI", "GAP"
    );
    for (i, s) in states.iter().enumerate() {
        println!(
            "{:<4} {:<24} {:>9} {:>8.4} {:>10} {}",
            i + 1,
            s.state,
            s.district_count,
            s.bli_score,
            s.child_update_gap,
            risk_style(s.risk_level).apply_to(s.risk_level)
        );
    }
}

pub fn print_gap_series(series: &GapSeries) {
    println!(
        "{}",
        style(format!("{}, {}", series.district, series.state)).bold()
    );
    println!("{:<12} {:>12} {:>12} {:>10}", "DATE", "ENROLLED", "UPDATED", "GAP");
    for p in &series.points {
        println!(
            "{:<12} {:>12} {:>12} {:>10}",
            p.date.to_string(),
            p.cumulative_enrollments,
            p.cumulative_updates,
            p.gap
        );
    }
}

pub fn print_seasonality(profile: &SeasonalityProfile) {
    let max = profile.months.iter().map(|m| m.updates).max().unwrap_or(0).max(1);
    for m in &profile.months {
        let width = usize::try_from(m.updates.saturating_mul(40) / max).unwrap_or(40);
        println!("{:<10} {:>10} {}", m.month_name, m.updates, "#".repeat(width));
    }
    println!();
    println!(
        "Peak: {}   Low: {}",
        style(&profile.peak_month_name).green(),
        style(&profile.low_month_name).yellow()
    );
}

pub fn print_answer(answer: &Answer) {
    println!("{}", answer.answer_text);
    if !answer.suggested_questions.is_empty() {
        println!();
        println!("{}", style("You could also ask:").dim());
        for q in &answer.suggested_questions {
            println!("  - {q}");
        }
    }
}
