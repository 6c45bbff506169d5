//! Billing view: budget, signed avenants and invoiced totals for a chantier.

use crate::domain::{BillingSummary, Chantier, DomainError, Facture, summarize_billing};
use crate::ports::{BillingRepoPort, ChantierRepoPort};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct ChantierBilling {
    pub chantier: Chantier,
    pub summary: BillingSummary,
    pub factures: Vec<Facture>,
}

pub struct BillingService {
    chantiers: Arc<dyn ChantierRepoPort>,
    billing: Arc<dyn BillingRepoPort>,
}

impl BillingService {
    pub fn new(chantiers: Arc<dyn ChantierRepoPort>, billing: Arc<dyn BillingRepoPort>) -> Self {
        Self { chantiers, billing }
    }

    pub async fn summary(&self, chantier_id: &str) -> Result<ChantierBilling, DomainError> {
        let chantier = self
            .chantiers
            .get_chantier(chantier_id)
            .await?
            .ok_or_else(|| DomainError::not_found("chantier", chantier_id))?;
        let avenants = self.billing.list_avenants(chantier_id).await?;
        let factures = self.billing.list_factures(chantier_id).await?;
        Ok(ChantierBilling {
            summary: summarize_billing(chantier.budget, &avenants, &factures),
            chantier,
            factures,
        })
    }
}
