use super::risk::round_to;
use crate::models::{PortfolioSummary, RiskRow};
use std::fmt::Write;

pub const RECOMMENDATIONS: [&str; 3] = [
    "Add temporary resources to high-risk projects",
    "Parallelize critical tasks",
    "Tighten cost approvals",
];

pub fn summarize(rows: &[RiskRow]) -> Option<PortfolioSummary> {
    let monte_carlo_p85_days = rows.iter().map(|row| row.monte_carlo_days).max()?;
    let count = rows.len() as f64;
    let average_risk = rows.iter().map(|row| row.risk_score).sum::<f64>() / count;
    let average_budget = rows.iter().map(|row| row.budget_utilization).sum::<f64>() / count;

    Some(PortfolioSummary {
        project_count: rows.len(),
        average_risk: round_to(average_risk, 2),
        average_budget_utilization: round_to(average_budget, 1),
        monte_carlo_p85_days,
        recommendations: RECOMMENDATIONS.iter().map(|item| item.to_string()).collect(),
    })
}

/// Executive summary block shown above the charts.
pub fn render_text(summary: &PortfolioSummary) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "• Average Risk Score: {}", format_decimal(summary.average_risk));
    let _ = writeln!(
        text,
        "• Budget Utilization: {}%",
        format_decimal(summary.average_budget_utilization)
    );
    let _ = writeln!(text, "• Monte Carlo (P85): {} days", summary.monte_carlo_p85_days);
    let _ = writeln!(text);
    let _ = writeln!(text, "RECOMMENDATIONS:");
    for item in &summary.recommendations {
        let _ = writeln!(text, "• {}", item);
    }
    text
}

/// Whole numbers keep one decimal place (`55.0`), others print as-is.
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{format_decimal, render_text, summarize};
    use crate::models::RiskRow;

    fn row(risk: f64, budget: f64, mc: i64) -> RiskRow {
        RiskRow {
            project: "p".to_string(),
            risk_score: risk,
            estimated_days: 10,
            monte_carlo_days: mc,
            budget_utilization: budget,
        }
    }

    #[test]
    fn summarizes_means_and_max() {
        let summary = summarize(&[row(0.4, 50.0, 120), row(0.6, 61.0, 90)]).expect("summary");
        assert_eq!(summary.project_count, 2);
        assert_eq!(summary.average_risk, 0.5);
        assert_eq!(summary.average_budget_utilization, 55.5);
        assert_eq!(summary.monte_carlo_p85_days, 120);
        assert_eq!(summary.recommendations.len(), 3);
    }

    #[test]
    fn empty_rows_have_no_summary() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn renders_executive_block() {
        let summary = summarize(&[row(0.25, 40.0, 30), row(0.25, 70.0, 45)]).expect("summary");
        let text = render_text(&summary);
        assert!(text.contains("• Average Risk Score: 0.25\n"));
        assert!(text.contains("• Budget Utilization: 55.0%\n"));
        assert!(text.contains("• Monte Carlo (P85): 45 days\n"));
        assert!(text.contains("RECOMMENDATIONS:\n• Add temporary resources to high-risk projects\n"));
    }

    #[test]
    fn formats_whole_numbers_with_one_decimal() {
        assert_eq!(format_decimal(55.0), "55.0");
        assert_eq!(format_decimal(0.47), "0.47");
    }
}
