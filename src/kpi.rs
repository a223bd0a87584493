use crate::schema::{AccountAggregate, PeriodBucket, PlCategory};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub revenue: f64,
    pub cogs: f64,
    pub gross_profit: f64,
    pub operating_expenses: f64,
    pub net_operating_income: f64,
    pub other_income: f64,
    pub other_expenses: f64,
    pub net_income: f64,
    pub gross_margin_pct: f64,
    pub operating_margin_pct: f64,
    pub net_margin_pct: f64,
}

impl KpiSummary {
    pub fn from_category_totals(
        revenue: f64,
        cogs: f64,
        operating_expenses: f64,
        other_income: f64,
        other_expenses: f64,
    ) -> Self {
        let gross_profit = revenue - cogs;
        let net_operating_income = gross_profit - operating_expenses;
        let net_income = net_operating_income + other_income - other_expenses;

        Self {
            revenue,
            cogs,
            gross_profit,
            operating_expenses,
            net_operating_income,
            other_income,
            other_expenses,
            net_income,
            gross_margin_pct: margin(gross_profit, revenue),
            operating_margin_pct: margin(net_operating_income, revenue),
            net_margin_pct: margin(net_income, revenue),
        }
    }

    /// One summary per bucket, in bucket order.
    pub fn per_period(buckets: &[PeriodBucket]) -> Vec<KpiSummary> {
        buckets.iter().map(PeriodBucket::kpis).collect()
    }
}

fn margin(metric: f64, revenue: f64) -> f64 {
    if revenue == 0.0 {
        0.0
    } else {
        metric / revenue * 100.0
    }
}

/// Rolls leaf account aggregates up into the P&L summary.
///
/// Pass leaf accounts only; synthesized parent rows already contain their
/// children and would be counted twice.
pub fn compute_kpis<'a, I>(accounts: I) -> KpiSummary
where
    I: IntoIterator<Item = &'a AccountAggregate>,
{
    let (mut revenue, mut cogs, mut opex, mut other_income, mut other_expenses) =
        (0.0, 0.0, 0.0, 0.0, 0.0);

    for account in accounts {
        let slot = match account.category() {
            PlCategory::Revenue => &mut revenue,
            PlCategory::Cogs => &mut cogs,
            PlCategory::OperatingExpenses => &mut opex,
            PlCategory::OtherIncome => &mut other_income,
            PlCategory::OtherExpenses => &mut other_expenses,
        };
        *slot += account.total();
    }

    KpiSummary::from_category_totals(revenue, cogs, opex, other_income, other_expenses)
}

impl PeriodBucket {
    pub fn kpis(&self) -> KpiSummary {
        compute_kpis(self.accounts.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identities() {
        let kpis = KpiSummary::from_category_totals(10_000.0, 2_000.0, 3_000.0, 500.0, 1_500.0);
        assert_eq!(kpis.gross_profit, 8_000.0);
        assert_eq!(kpis.net_operating_income, 5_000.0);
        assert_eq!(kpis.net_income, 4_000.0);
        assert_eq!(
            kpis.net_income,
            kpis.revenue - kpis.cogs - kpis.operating_expenses + kpis.other_income
                - kpis.other_expenses
        );
        assert!((kpis.gross_margin_pct - 80.0).abs() < 1e-9);
        assert!((kpis.operating_margin_pct - 50.0).abs() < 1e-9);
        assert!((kpis.net_margin_pct - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_revenue_margins() {
        let kpis = KpiSummary::from_category_totals(0.0, 100.0, 250.0, 0.0, 0.0);
        assert_eq!(kpis.gross_margin_pct, 0.0);
        assert_eq!(kpis.operating_margin_pct, 0.0);
        assert_eq!(kpis.net_margin_pct, 0.0);
        assert_eq!(kpis.net_income, -350.0);
    }

    #[test]
    fn test_empty_accounts() {
        let kpis = compute_kpis(std::iter::empty());
        assert_eq!(kpis, KpiSummary::default());
    }
}
