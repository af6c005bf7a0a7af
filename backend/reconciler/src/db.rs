//! Database layer — migrations, mirror-store queries, cursor and lease.
//!
//! Reconciler-path functions take `&mut SqliteConnection` so a whole batch
//! (events plus cursor advance) can share one transaction.

use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, SqliteConnection, SqlitePool};
use tracing::info;

use crate::errors::Result;
use crate::models::{Offer, OfferStatus, Property, PropertyType, TransactionRecord, User};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Identity resolver
// ─────────────────────────────────────────────────────────

pub async fn find_user(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, role, eth_address FROM users WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

/// Bridge an on-chain address to a locally registered account. Unregistered
/// actors are expected; this returns `None` rather than failing.
pub async fn find_user_by_address(
    conn: &mut SqliteConnection,
    eth_address: &str,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, role, eth_address FROM users WHERE eth_address = ?1",
    )
    .bind(eth_address)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

// ─────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────

pub async fn get_property(conn: &mut SqliteConnection, id: i64) -> Result<Option<Property>> {
    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(property)
}

/// Full insert used by the lifecycle manager after a confirmed listing.
#[allow(clippy::too_many_arguments)]
pub async fn insert_property(
    conn: &mut SqliteConnection,
    id: i64,
    seller_id: i64,
    price_wei: &str,
    location: &str,
    description: &str,
    property_type: PropertyType,
    area: Option<i64>,
    bedrooms: Option<i64>,
    bathrooms: Option<i64>,
    agent_id: Option<i64>,
    agent_commission_bps: Option<i64>,
    tx_hash: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO properties
            (id, seller_id, price_wei, location, description, is_listed,
             property_type, area, bedrooms, bathrooms, agent_id,
             agent_commission_bps, listed_at, tx_hash)
        VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(id)
    .bind(seller_id)
    .bind(price_wei)
    .bind(location)
    .bind(description)
    .bind(property_type)
    .bind(area)
    .bind(bedrooms)
    .bind(bathrooms)
    .bind(agent_id)
    .bind(agent_commission_bps)
    .bind(Utc::now().timestamp())
    .bind(tx_hash)
    .execute(conn)
    .await?;
    Ok(())
}

/// Event-replay upsert for `PropertyListed`: create from the event, or
/// last-write-wins overwrite of the mutable listing fields.
pub async fn upsert_listed_property(
    conn: &mut SqliteConnection,
    id: i64,
    seller_id: i64,
    price_wei: &str,
    location: &str,
    tx_hash: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO properties
            (id, seller_id, price_wei, location, description, is_listed,
             property_type, listed_at, tx_hash)
        VALUES (?1, ?2, ?3, ?4, ?4, 1, 'residential', ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            seller_id = excluded.seller_id,
            price_wei = excluded.price_wei,
            location  = excluded.location,
            description = excluded.description,
            is_listed = 1,
            tx_hash   = excluded.tx_hash
        "#,
    )
    .bind(id)
    .bind(seller_id)
    .bind(price_wei)
    .bind(location)
    .bind(Utc::now().timestamp())
    .bind(tx_hash)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn mark_property_sold(
    conn: &mut SqliteConnection,
    id: i64,
    buyer_id: i64,
    offer_amount_wei: &str,
    tx_hash: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE properties
        SET is_sold = 1, buyer_id = ?2, offer_amount_wei = ?3,
            tx_hash = COALESCE(?4, tx_hash)
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(buyer_id)
    .bind(offer_amount_wei)
    .bind(tx_hash)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn set_inspection_passed(
    conn: &mut SqliteConnection,
    id: i64,
    passed: bool,
    tx_hash: &str,
) -> Result<()> {
    sqlx::query("UPDATE properties SET inspection_passed = ?2, tx_hash = ?3 WHERE id = ?1")
        .bind(id)
        .bind(passed)
        .bind(tx_hash)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_financing_approved(
    conn: &mut SqliteConnection,
    id: i64,
    approved: bool,
) -> Result<()> {
    sqlx::query("UPDATE properties SET financing_approved = ?2 WHERE id = ?1")
        .bind(id)
        .bind(approved)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delist_property(conn: &mut SqliteConnection, id: i64, tx_hash: &str) -> Result<()> {
    sqlx::query("UPDATE properties SET is_listed = 0, tx_hash = ?2 WHERE id = ?1")
        .bind(id)
        .bind(tx_hash)
        .execute(conn)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Offers
// ─────────────────────────────────────────────────────────

pub async fn get_offer(conn: &mut SqliteConnection, id: i64) -> Result<Option<Offer>> {
    let offer = sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(offer)
}

/// The replay matching heuristic: an active offer on this property, by this
/// buyer, for exactly this amount.
pub async fn find_active_offer(
    conn: &mut SqliteConnection,
    property_id: i64,
    buyer_id: i64,
    amount_wei: &str,
) -> Result<Option<Offer>> {
    let offer = sqlx::query_as::<_, Offer>(
        r#"
        SELECT * FROM offers
        WHERE property_id = ?1 AND buyer_id = ?2 AND amount_wei = ?3
              AND status = 'active'
        ORDER BY id ASC
        "#,
    )
    .bind(property_id)
    .bind(buyer_id)
    .bind(amount_wei)
    .fetch_optional(conn)
    .await?;
    Ok(offer)
}

/// Replay no-op detector: has an offer with these exact terms already been
/// accepted? Keeps `OfferAccepted` materialization idempotent.
pub async fn find_accepted_offer(
    conn: &mut SqliteConnection,
    property_id: i64,
    buyer_id: i64,
    amount_wei: &str,
) -> Result<Option<Offer>> {
    let offer = sqlx::query_as::<_, Offer>(
        r#"
        SELECT * FROM offers
        WHERE property_id = ?1 AND buyer_id = ?2 AND amount_wei = ?3
              AND status = 'accepted'
        ORDER BY id ASC
        "#,
    )
    .bind(property_id)
    .bind(buyer_id)
    .bind(amount_wei)
    .fetch_optional(conn)
    .await?;
    Ok(offer)
}

pub async fn insert_offer(
    conn: &mut SqliteConnection,
    property_id: i64,
    buyer_id: i64,
    amount_wei: &str,
    status: OfferStatus,
    expires_at: Option<i64>,
    tx_hash: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO offers
            (property_id, buyer_id, amount_wei, status, created_at, expires_at, tx_hash)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(property_id)
    .bind(buyer_id)
    .bind(amount_wei)
    .bind(status)
    .bind(Utc::now().timestamp())
    .bind(expires_at)
    .bind(tx_hash)
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn set_offer_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: OfferStatus,
    tx_hash: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE offers SET status = ?2, tx_hash = COALESCE(?3, tx_hash) WHERE id = ?1")
        .bind(id)
        .bind(status)
        .bind(tx_hash)
        .execute(conn)
        .await?;
    Ok(())
}

/// Reject every still-active sibling offer on a property. Returns how many
/// rows changed.
pub async fn reject_other_active_offers(
    conn: &mut SqliteConnection,
    property_id: i64,
    except_offer_id: i64,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE offers SET status = 'rejected' WHERE property_id = ?1 AND id != ?2 AND status = 'active'",
    )
    .bind(property_id)
    .bind(except_offer_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn offers_for_property(
    conn: &mut SqliteConnection,
    property_id: i64,
) -> Result<Vec<Offer>> {
    let offers =
        sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE property_id = ?1 ORDER BY id ASC")
            .bind(property_id)
            .fetch_all(conn)
            .await?;
    Ok(offers)
}

// ─────────────────────────────────────────────────────────
// Transactions (settlements)
// ─────────────────────────────────────────────────────────

/// Upsert keyed by property so replays converge to one row.
pub async fn upsert_transaction(
    conn: &mut SqliteConnection,
    property_id: i64,
    seller_id: i64,
    buyer_id: i64,
    price_wei: &str,
    tx_hash: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions
            (property_id, seller_id, buyer_id, price_wei, created_at, tx_hash)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(property_id) DO UPDATE SET
            seller_id = excluded.seller_id,
            buyer_id  = excluded.buyer_id,
            price_wei = excluded.price_wei,
            tx_hash   = excluded.tx_hash
        "#,
    )
    .bind(property_id)
    .bind(seller_id)
    .bind(buyer_id)
    .bind(price_wei)
    .bind(Utc::now().timestamp())
    .bind(tx_hash)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn get_transaction(
    conn: &mut SqliteConnection,
    property_id: i64,
) -> Result<Option<TransactionRecord>> {
    let record = sqlx::query_as::<_, TransactionRecord>(
        "SELECT property_id, seller_id, buyer_id, price_wei, created_at, tx_hash \
         FROM transactions WHERE property_id = ?1",
    )
    .bind(property_id)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}

// ─────────────────────────────────────────────────────────
// Cursor and single-writer lease
// ─────────────────────────────────────────────────────────

/// Last block fully processed by the reconciler. Defaults to 0 via the
/// seeded cursor row.
pub async fn last_processed_block(conn: &mut SqliteConnection) -> Result<u64> {
    let (block,): (i64,) =
        sqlx::query_as("SELECT last_block FROM reconciler_cursor WHERE id = 1")
            .fetch_one(conn)
            .await?;
    Ok(block as u64)
}

/// Compare-and-swap cursor advance. Fails (returns false) when the row no
/// longer holds `expected`, or when the move would not be forward.
pub async fn advance_cursor(
    conn: &mut SqliteConnection,
    expected: u64,
    new_block: u64,
) -> Result<bool> {
    if new_block < expected {
        return Ok(false);
    }
    let result = sqlx::query(
        "UPDATE reconciler_cursor SET last_block = ?2 WHERE id = 1 AND last_block = ?1",
    )
    .bind(expected as i64)
    .bind(new_block as i64)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Acquire or renew the single-writer lease on the cursor row. Succeeds when
/// the lease is free, expired, or already held by `holder`.
pub async fn acquire_reconciler_lease(
    conn: &mut SqliteConnection,
    holder: &str,
    lease_secs: i64,
) -> Result<bool> {
    let now = Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        UPDATE reconciler_cursor
        SET locked_by = ?1, lease_expires_at = ?2
        WHERE id = 1
              AND (locked_by IS NULL OR locked_by = ?1 OR lease_expires_at < ?3)
        "#,
    )
    .bind(holder)
    .bind(now + lease_secs)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn lease_holder(conn: &mut SqliteConnection) -> Result<Option<String>> {
    let (holder,): (Option<String>,) =
        sqlx::query_as("SELECT locked_by FROM reconciler_cursor WHERE id = 1")
            .fetch_one(conn)
            .await?;
    Ok(holder)
}

// ─────────────────────────────────────────────────────────
// Status counts
// ─────────────────────────────────────────────────────────

pub async fn table_count(conn: &mut SqliteConnection, table: &str) -> Result<i64> {
    // `table` comes from a fixed set in api.rs, never from user input.
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(conn)
        .await?;
    Ok(count)
}
