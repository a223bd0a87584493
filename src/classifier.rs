//! Maps free-text ledger account types onto P&L categories.
//!
//! Balance sheet types are rejected before any income statement rule is
//! looked at, so an "Accounts Payable" row can never land in an expense total.

use crate::schema::PlCategory;

const BALANCE_SHEET_KEYWORDS: &[&str] = &[
    "asset",
    "liability",
    "liabilities",
    "equity",
    "cash",
    "bank",
    "receivable",
    "payable",
    "inventory",
    "equipment",
    "loan",
    "credit card",
    "payroll liability",
];

enum Matcher {
    Exact(&'static [&'static str]),
    Contains(&'static [&'static str]),
}

impl Matcher {
    fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Exact(words) => words.iter().any(|w| value == *w),
            Matcher::Contains(words) => words.iter().any(|w| value.contains(w)),
        }
    }
}

struct Rule {
    category: PlCategory,
    matcher: Matcher,
}

// Evaluated in order; the first rule matching the type or detail type wins.
const RULES: &[Rule] = &[
    Rule {
        category: PlCategory::Revenue,
        matcher: Matcher::Exact(&["income", "revenue", "sales", "sales revenue", "operating revenue"]),
    },
    Rule {
        category: PlCategory::Cogs,
        matcher: Matcher::Contains(&[
            "cost of goods",
            "cogs",
            "cost of sales",
            "direct cost",
            "materials cost",
            "labor cost",
        ]),
    },
    Rule {
        category: PlCategory::OtherIncome,
        matcher: Matcher::Contains(&["other income", "interest income", "dividend", "gain on sale"]),
    },
    Rule {
        category: PlCategory::OtherExpenses,
        matcher: Matcher::Contains(&[
            "other expense",
            "interest expense",
            "loss on sale",
            "depreciation",
            "amortization",
        ]),
    },
    Rule {
        category: PlCategory::OperatingExpenses,
        matcher: Matcher::Exact(&["expense", "expenses"]),
    },
];

const FALLBACK_RULES: &[Rule] = &[
    Rule {
        category: PlCategory::Revenue,
        matcher: Matcher::Contains(&["income", "revenue"]),
    },
    Rule {
        category: PlCategory::OperatingExpenses,
        matcher: Matcher::Contains(&["expense", "cost"]),
    },
];

/// Lower-cases, trims, and turns `-`/`_` separators into single spaces.
fn normalize(value: &str) -> String {
    value
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_balance_sheet_type(account_type: &str, account_detail_type: Option<&str>) -> bool {
    let type_norm = normalize(account_type);
    let detail_norm = account_detail_type.map(normalize).unwrap_or_default();

    BALANCE_SHEET_KEYWORDS
        .iter()
        .any(|k| type_norm.contains(k) || detail_norm.contains(k))
}

/// Classifies an account; `None` means the account is excluded from every P&L aggregate.
pub fn classify(
    account_type: &str,
    account_detail_type: Option<&str>,
    account_name: &str,
) -> Option<PlCategory> {
    if is_balance_sheet_type(account_type, account_detail_type) {
        return None;
    }

    let type_norm = normalize(account_type);
    let detail_norm = account_detail_type.map(normalize).unwrap_or_default();
    let fields = [type_norm.as_str(), detail_norm.as_str()];

    let strict = RULES
        .iter()
        .find(|rule| fields.iter().any(|f| !f.is_empty() && rule.matcher.matches(f)));
    if let Some(rule) = strict {
        return Some(rule.category);
    }

    let name_norm = normalize(account_name);
    let loose_fields = [type_norm.as_str(), detail_norm.as_str(), name_norm.as_str()];

    FALLBACK_RULES
        .iter()
        .find(|rule| loose_fields.iter().any(|f| !f.is_empty() && rule.matcher.matches(f)))
        .map(|rule| rule.category)
}
