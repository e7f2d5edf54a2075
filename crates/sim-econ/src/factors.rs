//! Sales probability factors shown on the commercial dashboard.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{round_units, Decade, SimError};

/// Credit terms a product is sold under, in days of each bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTerms {
    pub credit30: Decimal,
    pub credit60: Decimal,
}

/// Current price of a product and its suggested band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    pub current: Decimal,
    pub suggested_min: Decimal,
    pub suggested_max: Decimal,
}

impl PriceBand {
    pub fn is_competitive(&self) -> bool {
        self.current >= self.suggested_min && self.current <= self.suggested_max
    }
}

fn average(values: &[Decimal], what: &'static str) -> Result<Decimal, SimError> {
    if values.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let sum = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or(SimError::Overflow(what))?;
    Ok(sum / Decimal::from(values.len()))
}

/// Average marketing investment percent across products (0 with no products).
pub fn marketing_probability(investment_percents: &[Decimal]) -> Result<Decimal, SimError> {
    average(investment_percents, "marketing average")
}

/// Probability bonus from credit policy.
///
/// Each product earns `min(c30/30*2, 2) + min(c60/30*3, 3)` points; the
/// result is the average over products.
pub fn credit_policy_probability(terms: &[CreditTerms]) -> Result<Decimal, SimError> {
    let thirty = Decimal::new(30, 0);
    let two = Decimal::new(2, 0);
    let three = Decimal::new(3, 0);
    let points = |days: Decimal, weight: Decimal| {
        days.checked_div(thirty)
            .and_then(|m| m.checked_mul(weight))
            .map(|p| p.min(weight))
            .ok_or(SimError::Overflow("credit policy points"))
    };
    let per_product = terms
        .iter()
        .map(|t| {
            points(t.credit30, two)?
                .checked_add(points(t.credit60, three)?)
                .ok_or(SimError::Overflow("credit policy points"))
        })
        .collect::<Result<Vec<Decimal>, SimError>>()?;
    average(&per_product, "credit policy points")
}

/// Probability bonus from competitive pricing.
///
/// All products inside their band => 4.5, exactly two => 3, exactly one
/// => 1.5, otherwise 0. An empty catalogue counts as all inside.
pub fn competitive_pricing_probability(prices: &[PriceBand]) -> Decimal {
    let competitive = prices.iter().filter(|p| p.is_competitive()).count();
    if competitive == prices.len() {
        Decimal::new(45, 1)
    } else if competitive == 2 {
        Decimal::new(3, 0)
    } else if competitive == 1 {
        Decimal::new(15, 1)
    } else {
        Decimal::ZERO
    }
}

/// Percent of the monthly goal already sold, rounded to whole percent.
/// `None` when the goal is zero.
pub fn goal_progress(sold: Decimal, monthly_goal: Decimal) -> Result<Option<Decimal>, SimError> {
    if monthly_goal.is_zero() {
        return Ok(None);
    }
    let pct = sold
        .checked_div(monthly_goal)
        .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or(SimError::Overflow("goal progress"))?;
    Ok(Some(round_units(pct)))
}

/// Share of each decade in the month total, as percentages.
///
/// A zero month total yields zero shares.
pub fn decade_shares(totals: &[(Decade, Decimal)]) -> Result<Vec<(Decade, Decimal)>, SimError> {
    let mut month_total = Decimal::ZERO;
    for (_, t) in totals {
        if *t < Decimal::ZERO {
            return Err(SimError::Negative("decade total"));
        }
        month_total += *t;
    }
    Ok(totals
        .iter()
        .map(|(d, t)| {
            let pct = if month_total.is_zero() {
                Decimal::ZERO
            } else {
                *t / month_total * Decimal::ONE_HUNDRED
            };
            (*d, pct)
        })
        .collect())
}
