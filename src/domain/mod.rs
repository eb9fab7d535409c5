mod load;

use std::collections::BTreeSet;

use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;

pub use load::load_ledger;

/// A single transaction record. `date` and `category_count` are the only
/// fields mutated after load, and only through [`Ledger::reschedule_expense`]
/// and [`Ledger::link_to_category`].
#[derive(Clone, Debug)]
pub struct Expense {
    pub id: u64,
    pub name: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub category_count: u32,
}

/// A bucket with a running total. The total itself is never stored; it is
/// recomputed from member expenses on every read so it cannot drift from the
/// records it summarizes.
#[derive(Clone, Debug)]
pub struct Category {
    pub name: String,
    pub member_ids: BTreeSet<u64>,
}

/// Authoritative owner of expense and category records. The visualization
/// reads snapshots of this and requests mutations through the two operations
/// below; it never edits records in place.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    pub expenses: Vec<Expense>,
    pub categories: Vec<Category>,
}

impl Ledger {
    pub fn new(expenses: Vec<Expense>) -> Self {
        Self {
            expenses,
            categories: Vec::new(),
        }
    }

    pub fn expense(&self, id: u64) -> Option<&Expense> {
        self.expenses.iter().find(|expense| expense.id == id)
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.name == name)
    }

    pub fn add_category(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("category name must not be empty");
        }
        if self.category(name).is_some() {
            bail!("category {name:?} already exists");
        }
        self.categories.push(Category {
            name: name.to_owned(),
            member_ids: BTreeSet::new(),
        });
        Ok(())
    }

    /// Toggles membership of an expense in a category. Returns `true` when
    /// the expense ends up linked, `false` when the call unlinked it.
    pub fn link_to_category(&mut self, expense_id: u64, category_name: &str) -> Result<bool> {
        let expense = self
            .expenses
            .iter_mut()
            .find(|expense| expense.id == expense_id)
            .ok_or_else(|| anyhow!("unknown expense id {expense_id}"))?;
        let category = self
            .categories
            .iter_mut()
            .find(|category| category.name == category_name)
            .ok_or_else(|| anyhow!("unknown category {category_name:?}"))?;

        if category.member_ids.remove(&expense_id) {
            expense.category_count = expense.category_count.saturating_sub(1);
            Ok(false)
        } else {
            category.member_ids.insert(expense_id);
            expense.category_count += 1;
            Ok(true)
        }
    }

    pub fn reschedule_expense(&mut self, expense_id: u64, new_date: NaiveDate) -> Result<()> {
        let expense = self
            .expenses
            .iter_mut()
            .find(|expense| expense.id == expense_id)
            .ok_or_else(|| anyhow!("unknown expense id {expense_id}"))?;
        expense.date = new_date;
        Ok(())
    }

    /// Sum of amounts of member expenses whose date falls inside
    /// `[start, end)`. With no range, sums every member.
    pub fn category_total(&self, name: &str, within: Option<(NaiveDate, NaiveDate)>) -> f64 {
        let Some(category) = self.category(name) else {
            return 0.0;
        };

        self.expenses
            .iter()
            .filter(|expense| category.member_ids.contains(&expense.id))
            .filter(|expense| match within {
                Some((start, end)) => expense.date >= start && expense.date < end,
                None => true,
            })
            .map(|expense| expense.amount)
            .sum()
    }

    pub fn date_extent(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.expenses.iter().map(|expense| expense.date).min()?;
        let max = self.expenses.iter().map(|expense| expense.date).max()?;
        Some((min, max))
    }
}
