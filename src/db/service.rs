// Postgres-backed policy store
//
// Holds a single pooled connection for the whole run.

use crate::config::DatabaseConfig;
use crate::db::{connect_with_retry, queries, PolicyStore, StoreStats};
use crate::error::{StoreError, StoreResult};
use crate::policy::{PolicyRecord, UpsertedPolicy};
use crate::report::{LoadEvent, ProgressReporter};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

pub struct PgPolicyStore {
    pool: Pool,
    client: Option<Object>,
}

impl PgPolicyStore {
    /// Connect with bounded retry. Fails with [`StoreError::Connect`] once the budget is spent.
    pub async fn connect(
        config: &DatabaseConfig,
        reporter: &dyn ProgressReporter,
    ) -> StoreResult<Self> {
        let pool = Self::create_pool(config)?;
        let pool_ref = &pool;

        let client = connect_with_retry(&config.retry, reporter, || async move {
            let client = pool_ref.get().await?;
            client.query_one(queries::PING, &[]).await?;
            Ok::<_, StoreError>(client)
        })
        .await?;

        reporter.record(LoadEvent::Connected {
            target: config.display_url(),
            tls: config.use_tls(),
        });

        Ok(Self {
            pool,
            client: Some(client),
        })
    }

    /// Create a single-connection pool, with TLS when the URL asks for it
    fn create_pool(config: &DatabaseConfig) -> StoreResult<Pool> {
        let mut cfg = Config::new();
        cfg.url = Some(config.url.clone());
        cfg.pool = Some(PoolConfig::new(1));
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        if config.use_tls() {
            let certs = rustls_native_certs::load_native_certs();
            let mut root_store = rustls::RootCertStore::empty();
            for cert in certs.certs {
                root_store.add(cert).ok();
            }

            let tls_config = rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth();

            let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
            cfg.create_pool(Some(Runtime::Tokio1), tls)
                .map_err(|e| StoreError::Other(format!("Failed to create TLS pool: {}", e)))
        } else {
            cfg.create_pool(Some(Runtime::Tokio1), NoTls)
                .map_err(|e| StoreError::Other(format!("Failed to create pool: {}", e)))
        }
    }

    /// Create the policies table if it does not exist yet
    pub async fn ensure_schema(&mut self) -> StoreResult<()> {
        self.client()?
            .batch_execute(queries::ENSURE_POLICIES_TABLE)
            .await?;
        Ok(())
    }

    fn client(&self) -> StoreResult<&Object> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::ConnectionLost("connection already closed".to_string()))
    }

    async fn execute(&self, statement: &str) -> StoreResult<()> {
        self.client()?
            .batch_execute(statement)
            .await
            .map_err(lost_or_query)
    }
}

/// Map a closed-connection failure to [`StoreError::ConnectionLost`]
fn lost_or_query(e: tokio_postgres::Error) -> StoreError {
    if e.is_closed() {
        StoreError::ConnectionLost(e.to_string())
    } else {
        StoreError::Query(e)
    }
}

#[async_trait]
impl PolicyStore for PgPolicyStore {
    async fn stats(&mut self) -> StoreResult<StoreStats> {
        let row = self
            .client()?
            .query_one(queries::POLICY_STATS, &[])
            .await
            .map_err(lost_or_query)?;

        Ok(StoreStats {
            total: row.try_get("total_policies")?,
            active: row.try_get("active_policies")?,
            inactive: row.try_get("inactive_policies")?,
            last_updated: row.try_get("last_updated")?,
        })
    }

    async fn begin(&mut self) -> StoreResult<()> {
        self.execute(queries::BEGIN).await
    }

    async fn savepoint(&mut self) -> StoreResult<()> {
        self.execute(queries::SAVEPOINT).await
    }

    async fn release_savepoint(&mut self) -> StoreResult<()> {
        self.execute(queries::RELEASE_SAVEPOINT).await
    }

    async fn rollback_to_savepoint(&mut self) -> StoreResult<()> {
        self.execute(queries::ROLLBACK_TO_SAVEPOINT).await
    }

    async fn upsert(&mut self, record: &PolicyRecord) -> StoreResult<UpsertedPolicy> {
        let metadata = record.metadata_json()?;
        let created_by = record.created_by();

        let row = self
            .client()?
            .query_one(
                queries::UPSERT_POLICY,
                &[
                    &record.name,
                    &record.path,
                    &record.content,
                    &metadata,
                    &created_by,
                ],
            )
            .await
            .map_err(lost_or_query)?;

        Ok(UpsertedPolicy {
            id: row.try_get("id")?,
            version: row.try_get("version")?,
        })
    }

    async fn commit(&mut self) -> StoreResult<()> {
        self.execute(queries::COMMIT).await
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        self.execute(queries::ROLLBACK).await
    }

    async fn close(&mut self) {
        // Returning the object first lets the pool drop it on close
        self.client.take();
        self.pool.close();
    }
}
