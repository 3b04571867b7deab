use super::monte_carlo::Simulator;
use super::summary::summarize;
use crate::ingest::Tables;
use crate::models::{Analysis, Finance, RiskRow};
use chrono::Utc;
use std::collections::HashMap;

pub const EFFICIENCY_WEIGHT: f64 = 0.4;
pub const COMPLEXITY_WEIGHT: f64 = 0.4;
pub const BUDGET_WEIGHT: f64 = 0.2;
pub const MIN_EFFICIENCY: f64 = 0.1;

/// Rounds half-to-even, so `0.125` becomes `0.12`.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Join keys for one id column. When every id in the column is numeric,
/// `1`, `01` and `1.0` collapse to the same key; otherwise ids stay text.
pub fn join_keys<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let ids: Vec<&str> = ids.into_iter().collect();
    let numeric: Option<Vec<f64>> = ids
        .iter()
        .map(|id| id.parse::<f64>().ok().filter(|value| value.is_finite()))
        .collect();

    match numeric {
        Some(values) if !values.is_empty() => {
            values.iter().map(|value| (value + 0.0).to_string()).collect()
        }
        _ => ids.iter().map(|id| id.to_string()).collect(),
    }
}

/// Mean of the assigned employees' efficiencies, floored at [`MIN_EFFICIENCY`].
pub fn mean_efficiency(efficiencies: &[f64]) -> f64 {
    if efficiencies.is_empty() {
        return MIN_EFFICIENCY;
    }
    let mean = efficiencies.iter().sum::<f64>() / efficiencies.len() as f64;
    mean.max(MIN_EFFICIENCY)
}

/// Weighted composite of inefficiency, complexity and budget burn, two decimals.
pub fn risk_score(mean_efficiency: f64, complexity: f64, budget_used: f64) -> f64 {
    round_to(
        (1.0 - mean_efficiency) * EFFICIENCY_WEIGHT
            + complexity * COMPLEXITY_WEIGHT
            + budget_used * BUDGET_WEIGHT,
        2,
    )
}

/// Joins every project to its employees and first finance row and scores it.
/// Projects missing either partner, or with an unusable budget, are skipped.
pub fn analyze(tables: &Tables, simulator: &mut Simulator) -> Analysis {
    let employee_keys = join_keys(tables.employees.iter().map(|e| e.assigned_project.as_str()));
    let mut efficiencies: HashMap<&str, Vec<f64>> = HashMap::new();
    for (key, employee) in employee_keys.iter().zip(&tables.employees) {
        efficiencies.entry(key.as_str()).or_default().push(employee.efficiency);
    }

    let finance_keys = join_keys(tables.finances.iter().map(|f| f.project_id.as_str()));
    let mut finances: HashMap<&str, &Finance> = HashMap::new();
    for (key, finance) in finance_keys.iter().zip(&tables.finances) {
        finances.entry(key.as_str()).or_insert(finance);
    }

    let project_keys = join_keys(tables.projects.iter().map(|p| p.project_id.as_str()));

    let mut rows = Vec::with_capacity(tables.projects.len());
    let mut skipped_projects = Vec::new();

    for (key, project) in project_keys.iter().zip(&tables.projects) {
        let pid = key.as_str();
        let (Some(team), Some(finance)) = (efficiencies.get(pid), finances.get(pid)) else {
            skipped_projects.push(project.project_id.clone());
            continue;
        };

        let budget_used = finance.spent / finance.budget;
        if finance.budget == 0.0 || !budget_used.is_finite() {
            tracing::debug!(project_id = pid, budget = finance.budget, "skipping project with unusable budget");
            skipped_projects.push(project.project_id.clone());
            continue;
        }

        let avg_eff = mean_efficiency(team);
        let base_days = project.estimated_days / avg_eff;
        let risk = risk_score(avg_eff, project.complexity, budget_used);

        rows.push(RiskRow {
            project: project.project_name.clone(),
            risk_score: risk,
            estimated_days: base_days.trunc() as i64,
            monte_carlo_days: simulator.estimate_days(base_days, risk),
            budget_utilization: round_to(budget_used * 100.0, 2),
        });
    }

    if !skipped_projects.is_empty() {
        tracing::info!(
            skipped = skipped_projects.len(),
            scored = rows.len(),
            "projects without a team or finance record were excluded"
        );
    }

    let summary = summarize(&rows);
    Analysis {
        rows,
        summary,
        skipped_projects,
        analyzed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::{analyze, join_keys, mean_efficiency, risk_score, round_to};
    use crate::analysis::monte_carlo::Simulator;
    use crate::ingest::Tables;
    use crate::models::{Employee, Finance, Project};

    fn project(id: &str, name: &str, days: f64, complexity: f64) -> Project {
        Project {
            project_id: id.to_string(),
            project_name: name.to_string(),
            estimated_days: days,
            complexity,
        }
    }

    fn employee(project: &str, efficiency: f64) -> Employee {
        Employee {
            assigned_project: project.to_string(),
            efficiency,
        }
    }

    fn finance(project: &str, spent: f64, budget: f64) -> Finance {
        Finance {
            project_id: project.to_string(),
            spent,
            budget,
        }
    }

    #[test]
    fn risk_formula_matches_fixed_inputs() {
        // 0.4 * 0.2 + 0.4 * 0.5 + 0.2 * 0.5 = 0.38
        assert_eq!(risk_score(0.8, 0.5, 0.5), 0.38);
        // 0.4 * 0.9 + 0.4 * 1.0 + 0.2 * 1.2 = 1.0
        assert_eq!(risk_score(0.1, 1.0, 1.2), 1.0);
        assert_eq!(round_to(0.123456, 2), 0.12);
    }

    #[test]
    fn exact_ties_round_to_even() {
        // 0.2 * 0.625 = 0.125
        assert_eq!(risk_score(1.0, 0.0, 0.625), 0.12);
        assert_eq!(round_to(0.135, 2), 0.14);
        assert_eq!(round_to(2.5, 0), 2.0);

        let tables = Tables {
            projects: vec![project("P1", "Tie", 10.0, 0.0)],
            employees: vec![employee("P1", 1.0)],
            finances: vec![finance("P1", 1000.0, 32000.0)],
        };
        let analysis = analyze(&tables, &mut Simulator::seeded(8));
        // 1000 / 32000 * 100 = 3.125
        assert_eq!(analysis.rows[0].budget_utilization, 3.12);
    }

    #[test]
    fn numeric_id_columns_join_by_value() {
        assert_eq!(join_keys(["1", "01", "1.0", "-0"]), vec!["1", "1", "1", "0"]);
        assert_eq!(join_keys(["P01", "7"]), vec!["P01", "7"]);

        let tables = Tables {
            projects: vec![project("1", "One", 10.0, 0.2), project("2", "Two", 10.0, 0.2)],
            employees: vec![employee("01", 0.8), employee("2.0", 0.9)],
            finances: vec![finance("1.0", 5.0, 10.0), finance("02", 1.0, 10.0)],
        };
        let analysis = analyze(&tables, &mut Simulator::seeded(4));
        assert_eq!(analysis.rows.len(), 2);
        assert!(analysis.skipped_projects.is_empty());
    }

    #[test]
    fn text_ids_are_not_coerced() {
        let tables = Tables {
            projects: vec![project("P1", "Apollo", 10.0, 0.2)],
            employees: vec![employee("P01", 0.8)],
            finances: vec![finance("P1", 5.0, 10.0)],
        };
        let analysis = analyze(&tables, &mut Simulator::seeded(4));
        assert!(analysis.rows.is_empty());
        assert_eq!(analysis.skipped_projects, vec!["P1".to_string()]);
    }

    #[test]
    fn efficiency_is_averaged_and_floored() {
        assert!((mean_efficiency(&[0.6, 0.8]) - 0.7).abs() < 1e-12);
        assert_eq!(mean_efficiency(&[0.02, 0.04]), 0.1);
    }

    #[test]
    fn projects_without_partners_are_excluded() {
        let tables = Tables {
            projects: vec![
                project("P1", "Apollo", 100.0, 0.5),
                project("P2", "NoTeam", 50.0, 0.3),
                project("P3", "NoBudget", 40.0, 0.2),
            ],
            employees: vec![employee("P1", 0.8), employee("P3", 0.9)],
            finances: vec![finance("P1", 50.0, 100.0), finance("P2", 10.0, 20.0)],
        };

        let analysis = analyze(&tables, &mut Simulator::seeded(3));
        assert_eq!(analysis.rows.len(), 1);
        assert_eq!(analysis.rows[0].project, "Apollo");
        assert_eq!(analysis.skipped_projects, vec!["P2".to_string(), "P3".to_string()]);
    }

    #[test]
    fn row_fields_follow_formula() {
        let tables = Tables {
            projects: vec![project("P1", "Apollo", 100.0, 0.5)],
            employees: vec![employee("P1", 0.5), employee("P1", 1.0), employee("P9", 0.1)],
            finances: vec![finance("P1", 75.0, 100.0), finance("P1", 1.0, 1.0)],
        };

        let analysis = analyze(&tables, &mut Simulator::seeded(11));
        let row = &analysis.rows[0];
        // avg_eff 0.75, first finance row wins: 0.1 + 0.2 + 0.15
        assert_eq!(row.risk_score, 0.45);
        assert_eq!(row.estimated_days, 133);
        assert_eq!(row.budget_utilization, 75.0);
        assert!(row.monte_carlo_days >= row.estimated_days);
    }

    #[test]
    fn zero_budget_is_skipped() {
        let tables = Tables {
            projects: vec![project("P1", "Apollo", 10.0, 0.5)],
            employees: vec![employee("P1", 0.5)],
            finances: vec![finance("P1", 5.0, 0.0)],
        };
        let analysis = analyze(&tables, &mut Simulator::seeded(5));
        assert!(analysis.rows.is_empty());
        assert!(analysis.summary.is_none());
        assert_eq!(analysis.skipped_projects, vec!["P1".to_string()]);
    }
}
