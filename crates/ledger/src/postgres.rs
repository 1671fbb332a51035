use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CatalogStore, InventoryLedger, LedgerError, LedgerTransaction, Order, OrderId, OrderItem,
    OrderItemId, Pet, PetFilter, PetId, PetPage, PetStatus, Result, Store, StoreId,
};

const PET_COLUMNS: &str = "id, store_id, name, species, age, picture_url, description, \
     breeder_name, breeder_email_encrypted, status, created_at, updated_at";

/// Page size used when a listing does not ask for one.
const DEFAULT_PAGE_SIZE: usize = 20;

/// Per-transaction time bounds, applied with `SET LOCAL` semantics so they
/// never leak into other sessions sharing the pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionLimits {
    /// Upper bound for any single statement inside a transaction.
    pub statement_timeout: Duration,
    /// Upper bound for waiting on a row held by another transaction.
    pub lock_timeout: Duration,
}

impl Default for TransactionLimits {
    fn default() -> Self {
        Self {
            statement_timeout: Duration::from_secs(5),
            lock_timeout: Duration::from_secs(2),
        }
    }
}

/// PostgreSQL-backed inventory ledger.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
    limits: TransactionLimits,
}

impl PostgresLedger {
    /// Creates a new PostgreSQL ledger with default transaction limits.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            limits: TransactionLimits::default(),
        }
    }

    /// Overrides the transaction limits.
    pub fn with_limits(mut self, limits: TransactionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("ledger migrations applied");
        Ok(())
    }

    fn row_to_pet(row: PgRow) -> Result<Pet> {
        let species: String = row.try_get("species")?;
        let status: String = row.try_get("status")?;

        Ok(Pet {
            id: PetId::from_uuid(row.try_get::<Uuid, _>("id")?),
            store_id: StoreId::from_uuid(row.try_get::<Uuid, _>("store_id")?),
            name: row.try_get("name")?,
            species: species
                .parse()
                .map_err(|e| LedgerError::Corrupt(format!("{e}")))?,
            age: row.try_get("age")?,
            picture_url: row.try_get("picture_url")?,
            description: row.try_get("description")?,
            breeder_name: row.try_get("breeder_name")?,
            breeder_email_encrypted: row.try_get("breeder_email_encrypted")?,
            status: status
                .parse()
                .map_err(|e| LedgerError::Corrupt(format!("{e}")))?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_store(row: PgRow) -> Result<Store> {
        Ok(Store {
            id: StoreId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            owner_id: row.try_get("owner_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let total_pets: i32 = row.try_get("total_pets")?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: row.try_get("customer_id")?,
            store_id: StoreId::from_uuid(row.try_get::<Uuid, _>("store_id")?),
            total_pets: u32::try_from(total_pets)
                .map_err(|_| LedgerError::Corrupt(format!("negative total_pets {total_pets}")))?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_order_item(row: PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            pet_id: PetId::from_uuid(row.try_get::<Uuid, _>("pet_id")?),
            purchased_at: row.try_get("purchased_at")?,
        })
    }
}

fn millis(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}

/// A transaction against [`PostgresLedger`].
///
/// Wraps a `sqlx` transaction, which rolls back on drop.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PostgresTransaction {
    async fn insert_order(&mut self, order: &Order) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, store_id, total_pets, created_at)
            SELECT $1, $2, $3, $4, $5
            WHERE EXISTS (SELECT 1 FROM stores WHERE id = $3)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.customer_id)
        .bind(order.store_id.as_uuid())
        .bind(order.total_pets as i32)
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn try_acquire_and_transition(
        &mut self,
        pet_id: PetId,
        store_id: StoreId,
        from: PetStatus,
        to: PetStatus,
    ) -> Result<bool> {
        // Row-level lock: competing transactions queue here, and only the
        // first one to get through still sees the row in the `from` state.
        let locked: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM pets
            WHERE id = $1 AND store_id = $2 AND status = $3
            FOR UPDATE
            "#,
        )
        .bind(pet_id.as_uuid())
        .bind(store_id.as_uuid())
        .bind(from.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        if locked.is_none() {
            tracing::debug!(%pet_id, %store_id, %from, "pet row not acquirable");
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE pets SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            "#,
        )
        .bind(to.as_str())
        .bind(pet_id.as_uuid())
        .bind(from.as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, pet_id, purchased_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.order_id.as_uuid())
        .bind(item.pet_id.as_uuid())
        .bind(item.purchased_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_order_total(&mut self, order_id: OrderId, total_pets: u32) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET total_pets = $2 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(total_pets as i32)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::Corrupt(format!(
                "order {order_id} missing inside its own transaction"
            )));
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl InventoryLedger for PostgresLedger {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "SELECT set_config('statement_timeout', $1, true), set_config('lock_timeout', $2, true)",
        )
        .bind(millis(self.limits.statement_timeout))
        .bind(millis(self.limits.lock_timeout))
        .execute(&mut *tx)
        .await?;

        Ok(PostgresTransaction { tx })
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, store_id, total_pets, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, pet_id, purchased_at
            FROM order_items
            WHERE order_id = $1
            ORDER BY purchased_at ASC, seq ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order_item).collect()
    }

    async fn get_order_pets(&self, order_id: OrderId) -> Result<Vec<Pet>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.store_id, p.name, p.species, p.age, p.picture_url, p.description,
                   p.breeder_name, p.breeder_email_encrypted, p.status, p.created_at, p.updated_at
            FROM pets p
            JOIN order_items oi ON p.id = oi.pet_id
            WHERE oi.order_id = $1
            ORDER BY oi.purchased_at ASC, oi.seq ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_pet).collect()
    }
}

#[async_trait]
impl CatalogStore for PostgresLedger {
    async fn insert_pet(&self, pet: &Pet) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pets (id, store_id, name, species, age, picture_url, description,
                breeder_name, breeder_email_encrypted, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(pet.id.as_uuid())
        .bind(pet.store_id.as_uuid())
        .bind(&pet.name)
        .bind(pet.species.as_str())
        .bind(pet.age)
        .bind(&pet.picture_url)
        .bind(&pet.description)
        .bind(&pet.breeder_name)
        .bind(&pet.breeder_email_encrypted)
        .bind(pet.status.as_str())
        .bind(pet.created_at)
        .bind(pet.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_pet(&self, pet_id: PetId) -> Result<Option<Pet>> {
        let row = sqlx::query(&format!("SELECT {PET_COLUMNS} FROM pets WHERE id = $1"))
            .bind(pet_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_pet).transpose()
    }

    async fn list_pets(&self, filter: &PetFilter) -> Result<PetPage> {
        let mut where_clause = String::from(" WHERE 1=1");
        let mut param_count = 0;

        let store_id = filter.store_id.filter(|id| !id.is_nil());
        if store_id.is_some() {
            param_count += 1;
            where_clause.push_str(&format!(" AND store_id = ${param_count}"));
        }
        if filter.status.is_some() {
            param_count += 1;
            where_clause.push_str(&format!(" AND status = ${param_count}"));
        }
        if filter.created_between.is_some() {
            where_clause.push_str(&format!(
                " AND created_at BETWEEN ${} AND ${}",
                param_count + 1,
                param_count + 2
            ));
            param_count += 2;
        }

        let count_sql = format!("SELECT COUNT(*) FROM pets{where_clause}");
        let page_sql = format!(
            "SELECT {PET_COLUMNS} FROM pets{where_clause} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2
        );

        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        let mut page_query = sqlx::query(&page_sql);

        if let Some(id) = store_id {
            count_query = count_query.bind(id.as_uuid());
            page_query = page_query.bind(id.as_uuid());
        }
        if let Some(status) = filter.status {
            count_query = count_query.bind(status.as_str());
            page_query = page_query.bind(status.as_str());
        }
        if let Some((from, to)) = filter.created_between {
            count_query = count_query.bind(from).bind(to);
            page_query = page_query.bind(from).bind(to);
        }

        let limit = if filter.limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            filter.limit
        };
        page_query = page_query.bind(limit as i64).bind(filter.offset as i64);

        let total = count_query.fetch_one(&self.pool).await?;
        let rows = page_query.fetch_all(&self.pool).await?;
        let pets = rows
            .into_iter()
            .map(Self::row_to_pet)
            .collect::<Result<Vec<_>>>()?;

        Ok(PetPage {
            pets,
            total: usize::try_from(total).unwrap_or_default(),
        })
    }

    async fn delete_pet(&self, pet_id: PetId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pets WHERE id = $1 AND status = $2")
            .bind(pet_id.as_uuid())
            .bind(PetStatus::Available.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_pet_sold(&self, pet_id: PetId) -> Result<bool> {
        let mut tx = self.begin().await?;
        let result = sqlx::query("UPDATE pets SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(PetStatus::Sold.as_str())
            .bind(pet_id.as_uuid())
            .execute(&mut *tx.tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn insert_store(&self, store: &Store) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stores (id, name, owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(store.id.as_uuid())
        .bind(&store.name)
        .bind(&store.owner_id)
        .bind(store.created_at)
        .bind(store.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_store(&self, store_id: StoreId) -> Result<Option<Store>> {
        let row = sqlx::query(
            "SELECT id, name, owner_id, created_at, updated_at FROM stores WHERE id = $1",
        )
        .bind(store_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_store).transpose()
    }

    async fn get_store_by_owner(&self, owner_id: &str) -> Result<Option<Store>> {
        let row = sqlx::query(
            "SELECT id, name, owner_id, created_at, updated_at FROM stores WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_store).transpose()
    }

    async fn list_stores(&self) -> Result<Vec<Store>> {
        let rows = sqlx::query(
            "SELECT id, name, owner_id, created_at, updated_at FROM stores ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_store).collect()
    }
}
