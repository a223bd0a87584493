use crate::engine::merge_buckets;
use crate::hierarchy::{build_sections, AccountNode};
use crate::kpi::{compute_kpis, KpiSummary};
use crate::schema::{PeriodBucket, PlCategory};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementRow {
    /// Full account name (the synthesized parent name for parent rows).
    pub name: String,
    pub label: String,
    pub depth: usize,
    pub parent_as_child: bool,
    pub period_totals: Vec<f64>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementSection {
    pub category: PlCategory,
    pub rows: Vec<StatementRow>,
    pub period_totals: Vec<f64>,
    pub total: f64,
}

/// A P&L statement with one column per period bucket plus a total column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodStatement {
    pub labels: Vec<String>,
    pub sections: Vec<StatementSection>,
    pub period_kpis: Vec<KpiSummary>,
    pub kpis: KpiSummary,
}

impl PeriodStatement {
    pub fn from_buckets(buckets: &[PeriodBucket]) -> Self {
        let merged = merge_buckets(buckets);
        let mut by_category = build_sections(&merged);

        let sections = PlCategory::ALL
            .iter()
            .filter_map(|category| {
                let nodes = by_category.remove(category)?;
                let rows = nodes.iter().flat_map(|n| node_rows(n, buckets)).collect();
                Some(StatementSection {
                    category: *category,
                    rows,
                    period_totals: buckets.iter().map(|b| b.category_total(*category)).collect(),
                    total: nodes.iter().fold(0.0, |acc, n| acc + n.total()),
                })
            })
            .collect();

        Self {
            labels: buckets.iter().map(|b| b.label().to_string()).collect(),
            sections,
            period_kpis: KpiSummary::per_period(buckets),
            kpis: compute_kpis(&merged),
        }
    }

    pub fn section(&self, category: PlCategory) -> Option<&StatementSection> {
        self.sections.iter().find(|s| s.category == category)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();

        output.push_str("Section,Account");
        for label in &self.labels {
            output.push(',');
            output.push_str(&csv_field(label));
        }
        output.push_str(",Total\n");

        for section in &self.sections {
            for row in &section.rows {
                output.push_str(&format!(
                    "{},{}",
                    csv_field(section.category.display_name()),
                    csv_field(&row.name)
                ));
                push_amounts(&mut output, &row.period_totals, row.total);
            }
            output.push_str(&format!(
                "{},Total {}",
                csv_field(section.category.display_name()),
                csv_field(section.category.display_name())
            ));
            push_amounts(&mut output, &section.period_totals, section.total);
        }

        let kpi_lines: [(&str, fn(&KpiSummary) -> f64); 3] = [
            ("Gross Profit", |k| k.gross_profit),
            ("Net Operating Income", |k| k.net_operating_income),
            ("Net Income", |k| k.net_income),
        ];
        for (name, metric) in kpi_lines {
            output.push_str(&format!("Summary,{}", name));
            let values: Vec<f64> = self.period_kpis.iter().map(metric).collect();
            push_amounts(&mut output, &values, metric(&self.kpis));
        }

        output
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Profit & Loss\n\n");
        output.push_str("| Account |");
        for label in &self.labels {
            output.push_str(&format!(" {} |", label));
        }
        output.push_str(" Total |\n|---|");
        for _ in &self.labels {
            output.push_str("---:|");
        }
        output.push_str("---:|\n");

        for section in &self.sections {
            output.push_str(&format!("| **{}** |", section.category.display_name()));
            for _ in &self.labels {
                output.push_str(" |");
            }
            output.push_str(" |\n");

            for row in &section.rows {
                let indent = "&nbsp;&nbsp;".repeat(row.depth * 2);
                output.push_str(&format!("| {}{} |", indent, row.label));
                for value in &row.period_totals {
                    output.push_str(&format!(" {} |", amount(*value)));
                }
                output.push_str(&format!(" {} |\n", amount(row.total)));
            }

            output.push_str(&format!("| *Total {}* |", section.category.display_name()));
            for value in &section.period_totals {
                output.push_str(&format!(" {} |", amount(*value)));
            }
            output.push_str(&format!(" {} |\n", amount(section.total)));
        }
        output.push('\n');

        output.push_str("## Summary\n\n");
        output.push_str(&format!("- **Revenue:** {}\n", amount(self.kpis.revenue)));
        output.push_str(&format!("- **Gross Profit:** {}\n", amount(self.kpis.gross_profit)));
        output.push_str(&format!(
            "- **Net Operating Income:** {}\n",
            amount(self.kpis.net_operating_income)
        ));
        output.push_str(&format!("- **Net Income:** {}\n", amount(self.kpis.net_income)));
        output.push_str(&format!(
            "- **Gross / Operating / Net Margin:** {:.1}% / {:.1}% / {:.1}%\n",
            self.kpis.gross_margin_pct, self.kpis.operating_margin_pct, self.kpis.net_margin_pct
        ));

        output
    }
}

fn node_rows(node: &AccountNode, buckets: &[PeriodBucket]) -> Vec<StatementRow> {
    let mut rows = vec![StatementRow {
        name: node.name().to_string(),
        label: node.name().to_string(),
        depth: 0,
        parent_as_child: false,
        period_totals: node.period_totals(buckets),
        total: node.total(),
    }];

    for child in &node.children {
        rows.push(StatementRow {
            name: child.aggregate.name().to_string(),
            label: child.label.clone(),
            depth: 1,
            parent_as_child: child.parent_as_child,
            period_totals: child.period_totals(buckets),
            total: child.aggregate.total(),
        });
    }

    rows
}

fn push_amounts(output: &mut String, values: &[f64], total: f64) {
    for value in values {
        output.push(',');
        output.push_str(&amount(*value));
    }
    output.push(',');
    output.push_str(&amount(total));
    output.push('\n');
}

/// Two-decimal amount; values that round to zero never print as `-0.00`.
fn amount(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{:.2}", rounded + 0.0)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
