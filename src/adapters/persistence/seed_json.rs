//! JSON seed import. Loads chantiers, taches, avenants and factures from a file
//! exported from the hosted database and writes them through the ports.

use crate::domain::{Avenant, Chantier, DomainError, Facture, Tache};
use crate::ports::{BillingRepoPort, ChantierRepoPort, TaskRepoPort};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Seed file layout: one array per table.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub chantiers: Vec<Chantier>,
    #[serde(default)]
    pub taches: Vec<Tache>,
    #[serde(default)]
    pub avenants: Vec<Avenant>,
    #[serde(default)]
    pub factures: Vec<Facture>,
}

/// Count of rows written by [`SeedData::apply`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub chantiers: usize,
    pub taches: usize,
    pub avenants: usize,
    pub factures: usize,
}

impl SeedData {
    /// Read and parse a seed file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::Store(format!("read seed {}: {}", path.display(), e)))?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        serde_json::from_str(raw).map_err(|e| DomainError::Store(format!("invalid seed: {}", e)))
    }

    /// Upsert every row. Re-running the same seed is idempotent.
    pub async fn apply<S>(&self, store: &S) -> Result<SeedStats, DomainError>
    where
        S: ChantierRepoPort + TaskRepoPort + BillingRepoPort + ?Sized,
    {
        for c in &self.chantiers {
            store.save_chantier(c).await?;
        }
        for t in &self.taches {
            store.save_task(t).await?;
        }
        for a in &self.avenants {
            store.save_avenant(a).await?;
        }
        for f in &self.factures {
            store.save_facture(f).await?;
        }
        let stats = SeedStats {
            chantiers: self.chantiers.len(),
            taches: self.taches.len(),
            avenants: self.avenants.len(),
            factures: self.factures.len(),
        };
        info!(
            chantiers = stats.chantiers,
            taches = stats.taches,
            avenants = stats.avenants,
            factures = stats.factures,
            "seed applied"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::MemoryStore;
    use crate::domain::TaskStatus;

    const SEED: &str = r#"{
        "chantiers": [
            {"id": "c1", "name": "Résidence Les Tilleuls", "start_date": "2024-03-04",
             "end_date_planned": "2024-06-28", "estimated_hours": 400, "budget": 80000}
        ],
        "taches": [
            {"id": "t1", "chantier_id": "c1", "title": "APS", "phase": "Études",
             "weight": 20, "status": "done"},
            {"id": "t2", "chantier_id": "c1", "title": "Gros œuvre", "phase": "Exécution",
             "weight": 60, "status": "in_progress"}
        ],
        "factures": [
            {"id": "f1", "chantier_id": "c1", "number": "FA-2024-01", "amount": 12000, "status": "paid"}
        ]
    }"#;

    #[tokio::test]
    async fn test_apply_seed() {
        let seed = SeedData::parse(SEED).unwrap();
        let store = MemoryStore::new();
        let stats = seed.apply(&store).await.unwrap();
        assert_eq!(
            stats,
            SeedStats {
                chantiers: 1,
                taches: 2,
                avenants: 0,
                factures: 1
            }
        );

        let c = store.get_chantier("c1").await.unwrap().unwrap();
        assert_eq!(c.estimated_hours, 400.0);
        assert!(c.schedule().is_some());
        let tasks = store.list_tasks("c1").await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().any(|t| t.status == TaskStatus::Done));
    }

    #[test]
    fn test_invalid_status_is_rejected() {
        let raw = r#"{"taches": [{"id": "t", "chantier_id": "c", "title": "x",
            "phase": "p", "weight": 1, "status": "finished"}]}"#;
        assert!(SeedData::parse(raw).is_err());
    }
}
