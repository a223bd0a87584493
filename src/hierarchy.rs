//! Parent/child grouping of colon-delimited account names.
//!
//! `"Utilities:Water"` and `"Utilities:Gas"` roll up under a synthesized
//! `"Utilities"` row whose aggregate is built only by absorbing its children.
//! A plain `"Utilities"` account, if one exists, becomes a pseudo-child of that
//! row instead of standing next to it.

use crate::schema::{AccountAggregate, PeriodBucket, PlCategory};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildAccount {
    /// Display label: the part after the first colon, or the full name for a parent-as-child.
    pub label: String,
    pub aggregate: AccountAggregate,
    pub parent_as_child: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountNode {
    pub aggregate: AccountAggregate,
    pub children: Vec<ChildAccount>,
}

impl AccountNode {
    pub fn name(&self) -> &str {
        self.aggregate.name()
    }

    pub fn category(&self) -> PlCategory {
        self.aggregate.category()
    }

    pub fn total(&self) -> f64 {
        self.aggregate.total()
    }

    pub fn is_parent(&self) -> bool {
        !self.children.is_empty()
    }

    /// Value of this row in each bucket, in bucket order.
    pub fn period_totals(&self, buckets: &[PeriodBucket]) -> Vec<f64> {
        buckets
            .iter()
            .map(|bucket| {
                if self.is_parent() {
                    self.children
                        .iter()
                        .filter_map(|c| bucket.account(c.aggregate.name()))
                        .fold(0.0, |acc, a| acc + a.total())
                } else {
                    bucket.account(self.name()).map_or(0.0, |a| a.total())
                }
            })
            .collect()
    }
}

impl ChildAccount {
    pub fn period_totals(&self, buckets: &[PeriodBucket]) -> Vec<f64> {
        buckets
            .iter()
            .map(|b| b.account(self.aggregate.name()).map_or(0.0, |a| a.total()))
            .collect()
    }
}

/// Splits `"Parent:Child"` into its trimmed halves; `None` when either side is empty.
pub fn split_account_name(name: &str) -> Option<(&str, &str)> {
    let (parent, child) = name.split_once(':')?;
    let (parent, child) = (parent.trim(), child.trim());
    (!parent.is_empty() && !child.is_empty()).then_some((parent, child))
}

/// Builds display rows, sorted by name. Grouping happens within a category so a
/// parent never mixes credit-natural and debit-natural children.
pub fn build_hierarchy(accounts: &[AccountAggregate]) -> Vec<AccountNode> {
    let mut nodes: Vec<AccountNode> = build_sections(accounts)
        .into_values()
        .flatten()
        .collect();
    nodes.sort_by(|a, b| a.name().cmp(b.name()).then(a.category().cmp(&b.category())));
    nodes
}

/// Same rows as `build_hierarchy`, grouped by category in statement order.
pub fn build_sections(accounts: &[AccountAggregate]) -> BTreeMap<PlCategory, Vec<AccountNode>> {
    let mut by_category: BTreeMap<PlCategory, Vec<&AccountAggregate>> = BTreeMap::new();
    for account in accounts {
        by_category.entry(account.category()).or_default().push(account);
    }

    by_category
        .into_iter()
        .map(|(category, accounts)| (category, group_category(category, &accounts)))
        .collect()
}

fn group_category(category: PlCategory, accounts: &[&AccountAggregate]) -> Vec<AccountNode> {
    let mut parents: BTreeMap<String, Vec<ChildAccount>> = BTreeMap::new();
    let mut standalone: Vec<&AccountAggregate> = Vec::new();

    for account in accounts {
        match split_account_name(account.name()) {
            Some((parent, child)) => parents.entry(parent.to_string()).or_default().push(
                ChildAccount {
                    label: child.to_string(),
                    aggregate: (*account).clone(),
                    parent_as_child: false,
                },
            ),
            None => standalone.push(*account),
        }
    }

    let mut nodes = Vec::new();

    for account in standalone {
        match parents.get_mut(account.name().trim()) {
            Some(children) => children.push(ChildAccount {
                label: account.name().to_string(),
                aggregate: account.clone(),
                parent_as_child: true,
            }),
            None => nodes.push(AccountNode {
                aggregate: account.clone(),
                children: Vec::new(),
            }),
        }
    }

    for (name, mut children) in parents {
        children.sort_by(|a, b| {
            b.parent_as_child
                .cmp(&a.parent_as_child)
                .then_with(|| a.label.cmp(&b.label))
        });

        let tracks_properties = children.iter().any(|c| c.aggregate.tracks_properties());
        let mut aggregate = AccountAggregate::new(name, category, tracks_properties);
        for child in &children {
            aggregate.absorb(&child.aggregate);
        }

        nodes.push(AccountNode {
            aggregate,
            children,
        });
    }

    nodes.sort_by(|a, b| a.name().cmp(b.name()));
    nodes
}
