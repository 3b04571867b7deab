use crate::analysis::summary::format_decimal;
use crate::models::{GaugeView, HeatmapView, PortfolioSummary, RiskRow, ScatterPoint};

pub const DEFAULT_HEATMAP_BINS: usize = 10;

const TABLE_COLUMNS: [&str; 5] = [
    "project",
    "risk_score",
    "estimated_days",
    "monte_carlo_days",
    "budget_utilization",
];

pub fn gauge(summary: &PortfolioSummary) -> GaugeView {
    GaugeView {
        title: "Avg Risk".to_string(),
        value: summary.average_risk,
        min: 0.0,
        max: 1.0,
    }
}

pub fn scatter(rows: &[RiskRow]) -> Vec<ScatterPoint> {
    rows.iter()
        .map(|row| ScatterPoint {
            project: row.project.clone(),
            x: row.estimated_days as f64,
            y: row.risk_score,
            size: row.budget_utilization,
            color: row.risk_score,
        })
        .collect()
}

/// Counts rows per (budget_utilization, risk_score) cell over an even grid
/// spanning the observed values.
pub fn density_heatmap(rows: &[RiskRow], bins: usize) -> HeatmapView {
    let bins = bins.max(1);
    let xs: Vec<f64> = rows.iter().map(|row| row.budget_utilization).collect();
    let ys: Vec<f64> = rows.iter().map(|row| row.risk_score).collect();

    let (Some(x_edges), Some(y_edges)) = (bin_edges(&xs, bins), bin_edges(&ys, bins)) else {
        return HeatmapView {
            x_label: "budget_utilization".to_string(),
            y_label: "risk_score".to_string(),
            x_edges: Vec::new(),
            y_edges: Vec::new(),
            counts: Vec::new(),
        };
    };

    let mut counts = vec![vec![0u32; bins]; bins];
    for (x, y) in xs.iter().zip(ys.iter()) {
        let xi = bin_index(*x, &x_edges, bins);
        let yi = bin_index(*y, &y_edges, bins);
        counts[yi][xi] += 1;
    }

    HeatmapView {
        x_label: "budget_utilization".to_string(),
        y_label: "risk_score".to_string(),
        x_edges,
        y_edges,
        counts,
    }
}

fn bin_edges(values: &[f64], bins: usize) -> Option<Vec<f64>> {
    let finite = values.iter().copied().filter(|value| value.is_finite());
    let (mut min, mut max) = finite.fold(None, |acc: Option<(f64, f64)>, value| match acc {
        None => Some((value, value)),
        Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
    })?;

    if max - min == 0.0 {
        min -= 0.5;
        max += 0.5;
    }

    let width = (max - min) / bins as f64;
    Some((0..=bins).map(|i| min + width * i as f64).collect())
}

fn bin_index(value: f64, edges: &[f64], bins: usize) -> usize {
    let min = edges[0];
    let max = edges[edges.len() - 1];
    if !value.is_finite() || value <= min {
        return 0;
    }
    let scaled = ((value - min) / (max - min) * bins as f64).floor() as usize;
    scaled.min(bins - 1)
}

/// Plain-text table, used for terminal output and as model prompt context.
pub fn format_table(rows: &[RiskRow]) -> String {
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                row.project.clone(),
                format_decimal(row.risk_score),
                row.estimated_days.to_string(),
                row.monte_carlo_days.to_string(),
                format_decimal(row.budget_utilization),
            ]
        })
        .collect();

    let mut widths = TABLE_COLUMNS.map(str::len);
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let index_width = rows.len().saturating_sub(1).to_string().len();

    let mut out = String::new();
    out.push_str(&" ".repeat(index_width));
    for (column, width) in TABLE_COLUMNS.iter().zip(widths.iter()) {
        out.push_str(&format!("  {:>width$}", column, width = *width));
    }
    for (index, line) in cells.iter().enumerate() {
        out.push('\n');
        out.push_str(&format!("{:<width$}", index, width = index_width));
        for (cell, width) in line.iter().zip(widths.iter()) {
            out.push_str(&format!("  {:>width$}", cell, width = *width));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{density_heatmap, format_table, gauge, scatter};
    use crate::analysis::summarize;
    use crate::models::RiskRow;

    fn row(project: &str, risk: f64, days: i64, budget: f64) -> RiskRow {
        RiskRow {
            project: project.to_string(),
            risk_score: risk,
            estimated_days: days,
            monte_carlo_days: days + 10,
            budget_utilization: budget,
        }
    }

    #[test]
    fn gauge_uses_unit_axis() {
        let summary = summarize(&[row("a", 0.3, 10, 20.0), row("b", 0.5, 20, 40.0)]).expect("summary");
        let view = gauge(&summary);
        assert_eq!(view.value, 0.4);
        assert_eq!((view.min, view.max), (0.0, 1.0));
    }

    #[test]
    fn scatter_maps_columns() {
        let points = scatter(&[row("a", 0.3, 12, 80.0)]);
        assert_eq!(points[0].x, 12.0);
        assert_eq!(points[0].y, 0.3);
        assert_eq!(points[0].size, 80.0);
        assert_eq!(points[0].color, 0.3);
    }

    #[test]
    fn heatmap_counts_every_row() {
        let rows = vec![
            row("a", 0.25, 10, 0.0),
            row("b", 0.75, 10, 100.0),
            row("c", 0.5, 10, 50.0),
            row("d", 0.5, 10, 50.0),
        ];
        let view = density_heatmap(&rows, 4);
        assert_eq!(view.x_edges.len(), 5);
        let total: u32 = view.counts.iter().flatten().sum();
        assert_eq!(total, 4);
        assert_eq!(view.counts[0][0], 1);
        assert_eq!(view.counts[3][3], 1);
        assert_eq!(view.counts[2][2], 2);
    }

    #[test]
    fn heatmap_widens_single_value_range() {
        let view = density_heatmap(&[row("a", 0.5, 10, 50.0)], 10);
        assert_eq!(view.x_edges.first().copied(), Some(49.5));
        assert_eq!(view.x_edges.last().copied(), Some(50.5));
        let total: u32 = view.counts.iter().flatten().sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn heatmap_of_nothing_is_empty() {
        let view = density_heatmap(&[], 10);
        assert!(view.counts.is_empty());
    }

    #[test]
    fn table_lists_header_and_rows() {
        let table = format_table(&[row("Apollo", 0.45, 133, 75.0)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("risk_score"));
        assert!(lines[1].starts_with('0'));
        assert!(lines[1].contains("Apollo"));
        assert!(lines[1].contains("0.45"));
        assert!(lines[1].contains("75.0"));
    }
}
