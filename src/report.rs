//! Plain-text rendering of results and summaries.
//!
//! Distances stay in millimetres everywhere else; errors are shown here in micrometres.

use std::cmp::Ordering;

use itertools::Itertools;

use crate::math::{constant, Real};
use crate::scenario::{ScenarioResult, MICROMETRES_PER_MILLIMETRE};
use crate::summary::ScenarioSummary;

/// Improvement over the reference, in percent, above which changing configuration is advised
pub const SIGNIFICANT_IMPROVEMENT: f64 = 5.;

fn micrometres<E: Real>(millimetres: E) -> E {
    millimetres * constant(MICROMETRES_PER_MILLIMETRE)
}

fn by_value<E: Real>(a: E, b: E) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn format_points<E: Real>(points: &[E; 3]) -> String {
    format!("{:.1}, {:.2}, {:.1}", points[0], points[1], points[2])
}

fn format_improvement<E: Real>(improvement: Option<E>) -> String {
    improvement.map_or_else(|| "n/a".to_owned(), |value| format!("{value:+.1}%"))
}

/// The scenario with the lowest mean RMS error
pub fn best_scenario<E: Real>(summaries: &[ScenarioSummary<E>]) -> Option<&ScenarioSummary<E>> {
    summaries
        .iter()
        .filter(|summary| summary.rms_mean.is_finite())
        .min_by(|a, b| by_value(a.rms_mean, b.rms_mean))
}

/// The scenario with the highest mean RMS error
pub fn worst_scenario<E: Real>(summaries: &[ScenarioSummary<E>]) -> Option<&ScenarioSummary<E>> {
    summaries
        .iter()
        .filter(|summary| summary.rms_mean.is_finite())
        .max_by(|a, b| by_value(a.rms_mean, b.rms_mean))
}

/// The scenario whose RMS error varies least between sensors
pub fn most_consistent<E: Real>(summaries: &[ScenarioSummary<E>]) -> Option<&ScenarioSummary<E>> {
    summaries
        .iter()
        .filter(|summary| summary.rms_std.is_finite())
        .min_by(|a, b| by_value(a.rms_std, b.rms_std))
}

/// One line per result, grouped under each sensor in the order the results were produced
pub fn format_sensor_results<E: Real>(results: &[ScenarioResult<E>]) -> String {
    let mut out = String::new();

    for (sensor, group) in &results.iter().group_by(|result| result.sensor_name.as_str()) {
        out.push_str(&format!("{sensor}:\n"));
        for result in group {
            if result.evaluation.is_scored() {
                out.push_str(&format!(
                    "  {:<10} RMS={:.1}\u{3bc}m, R\u{b2}={:.4}\n",
                    format!("{}:", result.scenario_name),
                    micrometres(result.rms_error()),
                    result.r_squared()
                ));
            } else {
                out.push_str(&format!(
                    "  {:<10} no valid points\n",
                    format!("{}:", result.scenario_name)
                ));
            }
        }
    }

    out
}

/// Per-scenario statistics, one row per summary
pub fn format_summary_table<E: Real>(summaries: &[ScenarioSummary<E>]) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:<10} {:<18} {:>10} {:>14} {:>13} {:>8} {:>8} {:>17}\n",
        "Scenario",
        "Points (mm)",
        "Span (mm)",
        "RMS Mean (\u{3bc}m)",
        "RMS STD (\u{3bc}m)",
        "R\u{b2} Mean",
        "R\u{b2} STD",
        "vs Reference (%)"
    ));
    for summary in summaries {
        out.push_str(&format!(
            "{:<10} {:<18} {:>10.1} {:>14.1} {:>13.1} {:>8.4} {:>8.4} {:>17}\n",
            summary.scenario_name,
            format_points(&summary.points),
            summary.range_span,
            micrometres(summary.rms_mean),
            micrometres(summary.rms_std),
            summary.r2_mean,
            summary.r2_std,
            format_improvement(summary.improvement_vs_ref)
        ));
    }

    out
}

/// RMS error (μm) of every sensor under every scenario
///
/// Sensors are rows and scenarios columns, both in the order they first appear in `results`.
/// Combinations without a score are shown as `-`.
pub fn format_rms_matrix<E: Real>(results: &[ScenarioResult<E>]) -> String {
    let sensors = results
        .iter()
        .map(|result| result.sensor_name.as_str())
        .unique()
        .collect::<Vec<_>>();
    let scenarios = results
        .iter()
        .map(|result| result.scenario_name.as_str())
        .unique()
        .collect::<Vec<_>>();

    let sensor_width = sensors.iter().map(|name| name.len()).max().unwrap_or(0).max(6);
    let column_width = scenarios.iter().map(|name| name.len()).max().unwrap_or(0).max(8);

    let mut out = String::new();
    out.push_str(&format!("{:<sensor_width$}", "Sensor"));
    for scenario in &scenarios {
        out.push_str(&format!(" {scenario:>column_width$}"));
    }
    out.push('\n');

    for sensor in &sensors {
        out.push_str(&format!("{sensor:<sensor_width$}"));
        for scenario in &scenarios {
            let cell = results
                .iter()
                .find(|result| result.sensor_name == *sensor && result.scenario_name == *scenario)
                .filter(|result| result.evaluation.is_scored())
                .map_or_else(
                    || "-".to_owned(),
                    |result| format!("{:.1}", micrometres(result.rms_error())),
                );
            out.push_str(&format!(" {cell:>column_width$}"));
        }
        out.push('\n');
    }

    out
}

/// The lowest-error scenario for every sensor
pub fn format_best_per_sensor<E: Real>(results: &[ScenarioResult<E>]) -> String {
    let mut out = String::new();

    for (sensor, group) in &results.iter().group_by(|result| result.sensor_name.as_str()) {
        let best = group
            .filter(|result| result.evaluation.is_scored())
            .min_by(|a, b| by_value(a.rms_error(), b.rms_error()));
        match best {
            Some(result) => out.push_str(&format!(
                "  {sensor}: {} ({:.1}\u{3bc}m)\n",
                result.scenario_name,
                micrometres(result.rms_error())
            )),
            None => out.push_str(&format!("  {sensor}: no scenario produced a score\n")),
        }
    }

    out
}

/// Best and worst configuration followed by the recommendations
pub fn format_recommendations<E: Real>(summaries: &[ScenarioSummary<E>], reference: &str) -> String {
    let mut out = String::new();

    let (Some(best), Some(worst)) = (best_scenario(summaries), worst_scenario(summaries)) else {
        out.push_str("No scenario produced a score, nothing to recommend.\n");
        return out;
    };

    out.push_str("Best configuration:\n");
    out.push_str(&format!("  Scenario: {}\n", best.scenario_name));
    out.push_str(&format!("  Points: [{}] mm\n", format_points(&best.points)));
    out.push_str(&format!("  Range span: {:.1} mm\n", best.range_span));
    out.push_str(&format!(
        "  Average RMS: {:.1} \u{b1} {:.1} \u{3bc}m\n",
        micrometres(best.rms_mean),
        micrometres(best.rms_std)
    ));
    out.push_str(&format!(
        "  Average R\u{b2}: {:.4} \u{b1} {:.4}\n",
        best.r2_mean, best.r2_std
    ));
    out.push_str(&format!(
        "  Improvement: {} vs {reference}\n",
        format_improvement(best.improvement_vs_ref)
    ));

    out.push_str("\nWorst configuration:\n");
    out.push_str(&format!("  Scenario: {}\n", worst.scenario_name));
    out.push_str(&format!("  Points: [{}] mm\n", format_points(&worst.points)));
    out.push_str(&format!(
        "  Average RMS: {:.1} \u{b1} {:.1} \u{3bc}m\n",
        micrometres(worst.rms_mean),
        micrometres(worst.rms_std)
    ));
    out.push_str(&format!(
        "  Degradation: {} vs {reference}\n",
        format_improvement(worst.improvement_vs_ref)
    ));

    out.push_str("\nRecommendations:\n");
    out.push_str(&format!(
        "  1. For maximum accuracy: use the {} configuration\n",
        best.scenario_name
    ));
    if let Some(steady) = most_consistent(summaries) {
        out.push_str(&format!(
            "  2. For consistency: {} has the lowest variability\n",
            steady.scenario_name
        ));
    }
    match best.improvement_vs_ref {
        Some(improvement) if improvement > constant(SIGNIFICANT_IMPROVEMENT) => {
            out.push_str(&format!(
                "  3. Significant improvement possible: {improvement:.1}% better than {reference}\n"
            ));
        }
        Some(improvement) if best.improves_on_reference() => out.push_str(&format!(
            "  3. The {reference} configuration is competitive, the best gain is {improvement:.1}%\n"
        )),
        _ => out.push_str(&format!(
            "  3. The {reference} configuration is competitive, no scenario improves on it\n"
        )),
    }

    out
}

/// The complete report of a run
pub fn format_report<E: Real>(
    results: &[ScenarioResult<E>],
    summaries: &[ScenarioSummary<E>],
    reference: &str,
) -> String {
    let sensor_count = results
        .iter()
        .map(|result| result.sensor_name.as_str())
        .unique()
        .count();

    let mut out = String::new();
    out.push_str("=== Calibration range analysis ===\n");
    out.push_str(&format!("Sensors analysed: {sensor_count}\n"));
    out.push_str(&format!("Scenarios tested: {}\n", summaries.len()));
    out.push_str(&format!("Reference: {reference}\n"));

    out.push_str("\nPer-sensor results:\n");
    out.push_str(&format_sensor_results(results));

    out.push_str("\nSummary:\n");
    out.push_str(&format_summary_table(summaries));

    out.push_str("\nRMS error matrix (\u{3bc}m):\n");
    out.push_str(&format_rms_matrix(results));

    out.push_str("\nBest configuration per sensor:\n");
    out.push_str(&format_best_per_sensor(results));

    out.push('\n');
    out.push_str(&format_recommendations(summaries, reference));

    out
}
