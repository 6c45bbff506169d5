//! Budget and invoicing totals for a chantier.

use crate::domain::entities::{Avenant, Facture, FactureStatus};
use crate::domain::progress::rounded_percent;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BillingSummary {
    pub initial_budget: f64,
    pub amendments_total: f64,
    pub revised_budget: f64,
    pub invoiced_total: f64,
    pub paid_total: f64,
    pub remaining_to_invoice: f64,
    /// Share of the revised budget already invoiced. May exceed 100.
    pub invoiced_percent: i64,
}

/// Totals over signed avenants and non-draft factures.
pub fn summarize_billing(budget: f64, avenants: &[Avenant], factures: &[Facture]) -> BillingSummary {
    let amendments_total: f64 = avenants.iter().filter(|a| a.signed).map(|a| a.amount).sum();
    let revised_budget = budget + amendments_total;

    let invoiced_total: f64 = factures
        .iter()
        .filter(|f| f.status != FactureStatus::Draft)
        .map(|f| f.amount)
        .sum();
    let paid_total: f64 = factures
        .iter()
        .filter(|f| f.status == FactureStatus::Paid)
        .map(|f| f.amount)
        .sum();

    BillingSummary {
        initial_budget: budget,
        amendments_total,
        revised_budget,
        invoiced_total,
        paid_total,
        remaining_to_invoice: revised_budget - invoiced_total,
        invoiced_percent: rounded_percent(invoiced_total, revised_budget)
            .map(|p| p as i64)
            .unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avenant(amount: f64, signed: bool) -> Avenant {
        Avenant {
            id: format!("av-{}", amount),
            chantier_id: "c1".to_string(),
            label: "Travaux supplémentaires".to_string(),
            amount,
            signed,
        }
    }

    fn facture(amount: f64, status: FactureStatus) -> Facture {
        Facture {
            id: format!("f-{}", amount),
            chantier_id: "c1".to_string(),
            number: "FA-001".to_string(),
            amount,
            status,
        }
    }

    #[test]
    fn test_no_records() {
        let s = summarize_billing(50_000.0, &[], &[]);
        assert_eq!(s.revised_budget, 50_000.0);
        assert_eq!(s.invoiced_total, 0.0);
        assert_eq!(s.invoiced_percent, 0);
        assert_eq!(s.remaining_to_invoice, 50_000.0);
    }

    #[test]
    fn test_only_signed_avenants_count() {
        let avenants = vec![avenant(10_000.0, true), avenant(5_000.0, false), avenant(-2_000.0, true)];
        let s = summarize_billing(100_000.0, &avenants, &[]);
        assert_eq!(s.amendments_total, 8_000.0);
        assert_eq!(s.revised_budget, 108_000.0);
    }

    #[test]
    fn test_drafts_are_not_invoiced() {
        let factures = vec![
            facture(20_000.0, FactureStatus::Paid),
            facture(10_000.0, FactureStatus::Sent),
            facture(99_000.0, FactureStatus::Draft),
        ];
        let s = summarize_billing(100_000.0, &[], &factures);
        assert_eq!(s.invoiced_total, 30_000.0);
        assert_eq!(s.paid_total, 20_000.0);
        assert_eq!(s.invoiced_percent, 30);
        assert_eq!(s.remaining_to_invoice, 70_000.0);
    }

    #[test]
    fn test_zero_budget_percent_is_zero() {
        let factures = vec![facture(1_000.0, FactureStatus::Sent)];
        let s = summarize_billing(0.0, &[], &factures);
        assert_eq!(s.invoiced_percent, 0);
        assert_eq!(s.remaining_to_invoice, -1_000.0);
    }

    #[test]
    fn test_over_invoicing_exceeds_hundred() {
        let factures = vec![facture(120.0, FactureStatus::Paid)];
        let s = summarize_billing(100.0, &[], &factures);
        assert_eq!(s.invoiced_percent, 120);
    }
}
