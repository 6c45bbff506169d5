//! Supabase adapter. Implements the data store ports over the PostgREST API.
//!
//! Rows are read with `GET /rest/v1/<table>?select=*&<column>=eq.<value>` and
//! written with `POST` (upsert) or `PATCH`. Realtime is not consumed here: after
//! each successful write the adapter publishes the change on its own feed.

use crate::domain::{
    Avenant, ChangeEvent, Chantier, DomainError, Facture, NewNotification, Notification, Tache,
    TaskStatus,
};
use crate::ports::{BillingRepoPort, ChangeFeedPort, ChantierRepoPort, NotificationPort, TaskRepoPort};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// PostgREST-backed data store.
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: String,
    /// User JWT. When absent the anon/service key is used as bearer.
    access_token: Option<String>,
    feed: broadcast::Sender<ChangeEvent>,
}

/// Rows requested per page. The server may return fewer (its max-rows cap).
const PAGE_SIZE: usize = 1000;

/// Calls `fetch_page(offset, limit)` until a page comes back empty.
/// Stopping on an empty page, not a short one, keeps every row when the
/// server caps pages below `page_size`.
async fn fetch_pages<T, F, Fut>(page_size: usize, mut fetch_page: F) -> Result<Vec<T>, DomainError>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, DomainError>>,
{
    let mut rows = Vec::new();
    loop {
        let page = fetch_page(rows.len(), page_size).await?;
        if page.is_empty() {
            return Ok(rows);
        }
        rows.extend(page);
    }
}

/// `column=eq.value` filter.
fn eq(column: &str, value: &str) -> (String, String) {
    (column.to_string(), format!("eq.{}", value))
}

impl PostgrestStore {
    /// Create an adapter for `project_url` (e.g. "https://abcd.supabase.co").
    pub fn new(
        project_url: &str,
        api_key: String,
        access_token: Option<String>,
        feed_capacity: usize,
    ) -> Self {
        let (feed, _) = broadcast::channel(feed_capacity.max(1));
        info!(url = %project_url, "Supabase data store configured");
        Self {
            client: Client::new(),
            base_url: project_url.trim_end_matches('/').to_string(),
            api_key,
            access_token,
            feed,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        req.header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    async fn check(res: Response) -> Result<Response, DomainError> {
        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status();
        let text = res.text().await.unwrap_or_else(|_| "unknown".to_string());
        Err(DomainError::Remote(format!(
            "PostgREST error {}: {}",
            status, text
        )))
    }

    /// One GET. `extra` carries filters, order and paging parameters.
    async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        extra: &[(String, String)],
    ) -> Result<Vec<T>, DomainError> {
        let mut query: Vec<(String, String)> = vec![("select".to_string(), "*".to_string())];
        query.extend(extra.iter().cloned());
        let req = self.client.get(self.table_url(table)).query(&query);
        let res = self
            .authorized(req)
            .send()
            .await
            .map_err(|e| DomainError::Remote(format!("Request failed: {}", e)))?;
        Self::check(res)
            .await?
            .json::<Vec<T>>()
            .await
            .map_err(|e| DomainError::Remote(format!("Invalid {} rows: {}", table, e)))
    }

    /// Every matching row, fetched page by page with `limit`/`offset`.
    /// Ordered by `order`, or by `id` so pages are stable.
    async fn select<T: DeserializeOwned + Send>(
        &self,
        table: &str,
        filters: &[(String, String)],
        order: Option<&str>,
    ) -> Result<Vec<T>, DomainError> {
        let mut base = filters.to_vec();
        base.push(("order".to_string(), order.unwrap_or("id.asc").to_string()));
        let rows = fetch_pages(PAGE_SIZE, |offset, limit| {
            let mut query = base.clone();
            query.push(("limit".to_string(), limit.to_string()));
            query.push(("offset".to_string(), offset.to_string()));
            async move { self.get_rows(table, &query).await }
        })
        .await?;
        debug!(table, count = rows.len(), "fetched rows");
        Ok(rows)
    }

    /// First matching row.
    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(String, String)],
    ) -> Result<Option<T>, DomainError> {
        let mut query = filters.to_vec();
        query.push(("limit".to_string(), "1".to_string()));
        let rows: Vec<T> = self.get_rows(table, &query).await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<(), DomainError> {
        let req = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "resolution=merge-duplicates")
            .json(row);
        let res = self
            .authorized(req)
            .send()
            .await
            .map_err(|e| DomainError::Remote(format!("Request failed: {}", e)))?;
        Self::check(res).await?;
        Ok(())
    }

    fn publish(&self, event: ChangeEvent) {
        if self.feed.send(event).is_err() {
            debug!("change feed has no subscribers");
        }
    }
}

#[async_trait::async_trait]
impl ChantierRepoPort for PostgrestStore {
    async fn list_chantiers(&self) -> Result<Vec<Chantier>, DomainError> {
        self.select("chantiers", &[], Some("name.asc,id.asc")).await
    }

    async fn get_chantier(&self, chantier_id: &str) -> Result<Option<Chantier>, DomainError> {
        self.select_one("chantiers", &[eq("id", chantier_id)]).await
    }

    async fn save_chantier(&self, chantier: &Chantier) -> Result<(), DomainError> {
        self.upsert("chantiers", chantier).await?;
        self.publish(ChangeEvent::ChantierChanged {
            chantier_id: chantier.id.clone(),
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl TaskRepoPort for PostgrestStore {
    async fn list_tasks(&self, chantier_id: &str) -> Result<Vec<Tache>, DomainError> {
        self.select(
            "taches",
            &[eq("chantier_id", chantier_id)],
            Some("phase.asc,id.asc"),
        )
        .await
    }

    async fn list_all_tasks(&self) -> Result<Vec<Tache>, DomainError> {
        self.select("taches", &[], Some("chantier_id.asc,phase.asc,id.asc"))
            .await
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<Tache>, DomainError> {
        self.select_one("taches", &[eq("id", task_id)]).await
    }

    async fn save_task(&self, task: &Tache) -> Result<(), DomainError> {
        self.upsert("taches", task).await?;
        self.publish(ChangeEvent::TaskChanged {
            chantier_id: task.chantier_id.clone(),
            task_id: task.id.clone(),
        });
        Ok(())
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        updated_by: &str,
    ) -> Result<Tache, DomainError> {
        let body = serde_json::json!({
            "status": status,
            "updated_by": updated_by,
        });
        let req = self
            .client
            .patch(self.table_url("taches"))
            .query(&[eq("id", task_id)])
            .header("Prefer", "return=representation")
            .json(&body);
        let res = self
            .authorized(req)
            .send()
            .await
            .map_err(|e| DomainError::Remote(format!("Request failed: {}", e)))?;
        let rows: Vec<Tache> = Self::check(res)
            .await?
            .json()
            .await
            .map_err(|e| DomainError::Remote(format!("Invalid taches rows: {}", e)))?;
        let task = rows
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found("task", task_id))?;
        self.publish(ChangeEvent::TaskChanged {
            chantier_id: task.chantier_id.clone(),
            task_id: task.id.clone(),
        });
        Ok(task)
    }
}

#[async_trait::async_trait]
impl BillingRepoPort for PostgrestStore {
    async fn list_avenants(&self, chantier_id: &str) -> Result<Vec<Avenant>, DomainError> {
        self.select("avenants", &[eq("chantier_id", chantier_id)], Some("id.asc"))
            .await
    }

    async fn list_factures(&self, chantier_id: &str) -> Result<Vec<Facture>, DomainError> {
        self.select(
            "factures",
            &[eq("chantier_id", chantier_id)],
            Some("number.asc,id.asc"),
        )
        .await
    }

    async fn save_avenant(&self, avenant: &Avenant) -> Result<(), DomainError> {
        self.upsert("avenants", avenant).await?;
        self.publish(ChangeEvent::ChantierChanged {
            chantier_id: avenant.chantier_id.clone(),
        });
        Ok(())
    }

    async fn save_facture(&self, facture: &Facture) -> Result<(), DomainError> {
        self.upsert("factures", facture).await?;
        self.publish(ChangeEvent::ChantierChanged {
            chantier_id: facture.chantier_id.clone(),
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationPort for PostgrestStore {
    async fn push_notification(&self, n: &NewNotification) -> Result<Notification, DomainError> {
        let req = self
            .client
            .post(self.table_url("notifications"))
            .header("Prefer", "return=representation")
            .json(n);
        let res = self
            .authorized(req)
            .send()
            .await
            .map_err(|e| DomainError::Remote(format!("Request failed: {}", e)))?;
        let rows: Vec<Notification> = Self::check(res)
            .await?
            .json()
            .await
            .map_err(|e| DomainError::Remote(format!("Invalid notifications rows: {}", e)))?;
        let stored = rows
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::Remote("insert returned no row".to_string()))?;
        self.publish(ChangeEvent::NotificationCreated {
            user_id: stored.user_id.clone(),
        });
        Ok(stored)
    }

    async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, DomainError> {
        self.select(
            "notifications",
            &[eq("user_id", user_id)],
            Some("created_at.desc,id.desc"),
        )
        .await
    }

    async fn mark_notifications_read(&self, user_id: &str) -> Result<usize, DomainError> {
        let req = self
            .client
            .patch(self.table_url("notifications"))
            .query(&[eq("user_id", user_id), eq("read", "false")])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "read": true }));
        let res = self
            .authorized(req)
            .send()
            .await
            .map_err(|e| DomainError::Remote(format!("Request failed: {}", e)))?;
        let rows: Vec<Notification> = Self::check(res)
            .await?
            .json()
            .await
            .map_err(|e| DomainError::Remote(format!("Invalid notifications rows: {}", e)))?;
        Ok(rows.len())
    }
}

impl ChangeFeedPort for PostgrestStore {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let store = PostgrestStore::new("https://abcd.supabase.co/", "key".to_string(), None, 4);
        assert_eq!(
            store.table_url("taches"),
            "https://abcd.supabase.co/rest/v1/taches"
        );
    }

    #[test]
    fn test_eq_filter() {
        assert_eq!(
            eq("chantier_id", "c1"),
            ("chantier_id".to_string(), "eq.c1".to_string())
        );
    }

    #[test]
    fn test_decode_postgrest_rows() {
        let raw = r#"[
            {"id": "t1", "chantier_id": "c1", "title": "DCE", "phase": "Études",
             "weight": 15.5, "status": "blocked", "start_date": "2024-04-02",
             "end_date": null, "updated_by": null, "created_at": "2024-04-01T08:00:00+00:00"}
        ]"#;
        let rows: Vec<Tache> = serde_json::from_str(raw).unwrap();
        assert_eq!(rows[0].status, TaskStatus::Blocked);
        assert_eq!(rows[0].weight, 15.5);
        assert!(rows[0].end_date.is_none());
    }

    /// Serves `rows` as JSON pages, capped at `server_cap` rows per request.
    fn paged_source(
        rows: Vec<Tache>,
        server_cap: usize,
    ) -> impl FnMut(usize, usize) -> std::future::Ready<Result<Vec<Tache>, DomainError>> {
        move |offset, limit| {
            let end = (offset + limit.min(server_cap)).min(rows.len());
            let raw = serde_json::to_string(&rows[offset.min(end)..end]).unwrap();
            std::future::ready(
                serde_json::from_str(&raw).map_err(|e| DomainError::Remote(e.to_string())),
            )
        }
    }

    fn taches(n: usize) -> Vec<Tache> {
        (0..n)
            .map(|i| Tache {
                id: format!("t{:04}", i),
                chantier_id: "c1".to_string(),
                title: format!("Tâche {}", i),
                phase: "Exécution".to_string(),
                weight: 1.0,
                status: TaskStatus::NotStarted,
                start_date: None,
                end_date: None,
                updated_by: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_pages_reads_past_first_page() {
        let rows = fetch_pages(1000, paged_source(taches(2500), 1000))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2500);
        assert_eq!(rows[0].id, "t0000");
        assert_eq!(rows[2499].id, "t2499");
    }

    #[tokio::test]
    async fn test_fetch_pages_with_lower_server_cap() {
        let rows = fetch_pages(1000, paged_source(taches(1500), 300))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1500);
    }

    #[tokio::test]
    async fn test_fetch_pages_empty_table() {
        let rows = fetch_pages(1000, paged_source(Vec::new(), 1000))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_pages_propagates_errors() {
        let mut calls = 0;
        let result: Result<Vec<Tache>, DomainError> = fetch_pages(2, |_, _| {
            calls += 1;
            std::future::ready(if calls == 1 {
                Ok(taches(2))
            } else {
                Err(DomainError::Remote("PostgREST error 503".to_string()))
            })
        })
        .await;
        assert!(matches!(result, Err(DomainError::Remote(_))));
    }

    #[test]
    fn test_decode_notification_timestamp() {
        let raw = r#"[{"id": 7, "user_id": "u1", "chantier_id": null,
            "message": "Chantier terminé", "created_at": "2024-05-02T14:03:11.52+00:00", "read": false}]"#;
        let rows: Vec<Notification> = serde_json::from_str(raw).unwrap();
        assert_eq!(rows[0].id, 7);
        assert_eq!(rows[0].created_at.timestamp(), 1714658591);
    }
}
