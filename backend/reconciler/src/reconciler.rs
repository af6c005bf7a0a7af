//! Background task that replays RealEstate contract events into the mirror
//! store.
//!
//! Each tick scans the half-open block range `(cursor, head]` (capped by
//! `max_blocks_per_pass`), applies every event inside one database
//! transaction, and advances the cursor with a compare-and-swap in that same
//! transaction. Any failure rolls the whole batch back; the next tick
//! retries the identical range. Every merge rule is idempotent, so
//! at-least-once replay is safe.
//!
//! At most one reconciler may run against a cursor. Ticks only proceed while
//! this process holds the lease on the cursor row.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};

use crate::chain::ChainClient;
use crate::config::Config;
use crate::db;
use crate::errors::{Error, Result};
use crate::events::{ChainEvent, EventKind, PropertyEvent};
use crate::models::{format_wei, OfferStatus};

pub struct ReconcilerState<C> {
    pub pool: SqlitePool,
    pub config: Config,
    pub chain: C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub from_block_exclusive: u64,
    pub to_block_inclusive: u64,
    pub events: usize,
    pub applied: usize,
    pub skipped: usize,
}

enum ApplyOutcome {
    Applied,
    /// The event referenced an actor or property the mirror does not know.
    /// Off-chain registration may simply be pending, so this is never fatal.
    Skipped(&'static str),
}

/// Spawn the reconciler loop as a background [`tokio`] task.
pub async fn run<C: ChainClient>(state: Arc<ReconcilerState<C>>) {
    let holder = format!(
        "reconciler-{}-{}",
        std::process::id(),
        Utc::now().timestamp()
    );
    info!(
        %holder,
        contract = %state.config.contract_address,
        "Reconciler starting"
    );

    loop {
        match tick(&state, &holder).await {
            Ok(Some(outcome)) => info!(
                from = outcome.from_block_exclusive,
                to = outcome.to_block_inclusive,
                events = outcome.events,
                applied = outcome.applied,
                skipped = outcome.skipped,
                "Reconciled block range"
            ),
            Ok(None) => debug!("Nothing to do this tick"),
            Err(e) => error!("Reconciler tick failed: {e}"),
        }

        tokio::time::sleep(Duration::from_secs(state.config.poll_interval_secs)).await;
    }
}

/// One poll iteration: take the lease, find new blocks, replay them.
async fn tick<C: ChainClient>(
    state: &ReconcilerState<C>,
    holder: &str,
) -> Result<Option<ReconcileOutcome>> {
    let mut conn = state.pool.acquire().await?;
    if !db::acquire_reconciler_lease(&mut conn, holder, state.config.lease_secs).await? {
        debug!("Reconciler lease held elsewhere; skipping tick");
        return Ok(None);
    }

    let mut cursor = db::last_processed_block(&mut conn).await?;
    // First run on a fresh database: skip ahead to the configured start.
    if cursor < state.config.start_block
        && db::advance_cursor(&mut conn, cursor, state.config.start_block).await?
    {
        cursor = state.config.start_block;
    }
    drop(conn);

    let head = state.chain.current_height().await?;
    if head <= cursor {
        return Ok(None);
    }

    let to_block = head.min(cursor + state.config.max_blocks_per_pass);
    let outcome = reconcile(&state.pool, &state.chain, cursor, to_block).await?;
    Ok(Some(outcome))
}

/// Replay all contract events in `(from_block_exclusive, to_block_inclusive]`.
///
/// Events are fetched kind by kind in [`EventKind::REPLAY_ORDER`] — listings
/// before acceptances and sales — so dependent lookups succeed even when a
/// property and its sale land in the same scanned range. The batch and the
/// cursor advance commit atomically.
pub async fn reconcile<C: ChainClient>(
    pool: &SqlitePool,
    chain: &C,
    from_block_exclusive: u64,
    to_block_inclusive: u64,
) -> Result<ReconcileOutcome> {
    let mut batch: Vec<ChainEvent> = Vec::new();
    for kind in EventKind::REPLAY_ORDER {
        batch.extend(
            chain
                .query_logs(kind, from_block_exclusive + 1, to_block_inclusive)
                .await?,
        );
    }

    let mut tx = pool.begin().await?;
    let mut applied = 0usize;
    let mut skipped = 0usize;

    for ev in &batch {
        match apply_event(&mut tx, ev).await? {
            ApplyOutcome::Applied => applied += 1,
            ApplyOutcome::Skipped(reason) => {
                warn!(
                    property_id = ev.event.property_id(),
                    block = ev.block_number,
                    reason,
                    "Event skipped"
                );
                skipped += 1;
            }
        }
    }

    if !db::advance_cursor(&mut tx, from_block_exclusive, to_block_inclusive).await? {
        return Err(Error::CursorConflict {
            expected: from_block_exclusive,
        });
    }
    tx.commit().await?;

    Ok(ReconcileOutcome {
        from_block_exclusive,
        to_block_inclusive,
        events: batch.len(),
        applied,
        skipped,
    })
}

async fn apply_event(conn: &mut SqliteConnection, ev: &ChainEvent) -> Result<ApplyOutcome> {
    match &ev.event {
        PropertyEvent::Listed {
            property_id,
            seller,
            price_wei,
            details,
        } => apply_listed(conn, *property_id, seller, *price_wei, details, &ev.tx_hash).await,
        PropertyEvent::OfferAccepted {
            property_id,
            buyer,
            amount_wei,
        } => apply_offer_accepted(conn, *property_id, buyer, *amount_wei, &ev.tx_hash).await,
        PropertyEvent::Sold {
            property_id,
            buyer,
            sale_price_wei,
        } => apply_sold(conn, *property_id, buyer, *sale_price_wei, &ev.tx_hash).await,
    }
}

/// `PropertyListed`: create the property from the event, or overwrite the
/// mutable listing fields (replays are last-write-wins).
async fn apply_listed(
    conn: &mut SqliteConnection,
    property_id: i64,
    seller: &str,
    price_wei: u128,
    details: &str,
    tx_hash: &str,
) -> Result<ApplyOutcome> {
    let Some(seller_user) = db::find_user_by_address(conn, seller).await? else {
        return Ok(ApplyOutcome::Skipped("seller address not registered"));
    };

    db::upsert_listed_property(
        conn,
        property_id,
        seller_user.id,
        &format_wei(price_wei),
        details,
        tx_hash,
    )
    .await?;
    Ok(ApplyOutcome::Applied)
}

/// `OfferAccepted`: accept the matching active offer — or materialize a
/// best-effort record when the mirror never saw it — then mark the property
/// sold and reject every other still-active offer on it.
async fn apply_offer_accepted(
    conn: &mut SqliteConnection,
    property_id: i64,
    buyer: &str,
    amount_wei: u128,
    tx_hash: &str,
) -> Result<ApplyOutcome> {
    if db::get_property(conn, property_id).await?.is_none() {
        return Ok(ApplyOutcome::Skipped("property not mirrored"));
    }
    let Some(buyer_user) = db::find_user_by_address(conn, buyer).await? else {
        return Ok(ApplyOutcome::Skipped("buyer address not registered"));
    };

    let amount = format_wei(amount_wei);
    let winner_id = match db::find_active_offer(conn, property_id, buyer_user.id, &amount).await? {
        Some(offer) => {
            db::set_offer_status(conn, offer.id, OfferStatus::Accepted, Some(tx_hash)).await?;
            offer.id
        }
        None => {
            match db::find_accepted_offer(conn, property_id, buyer_user.id, &amount).await? {
                // Replay of an acceptance we already applied.
                Some(offer) => offer.id,
                None => {
                    // The offer was placed directly on chain, or the
                    // synchronous mirror write never landed. Reconstruct it
                    // as already accepted.
                    warn!(property_id, buyer, "No matching active offer, materializing record");
                    db::insert_offer(
                        conn,
                        property_id,
                        buyer_user.id,
                        &amount,
                        OfferStatus::Accepted,
                        None,
                        Some(tx_hash),
                    )
                    .await?
                }
            }
        }
    };

    let rejected = db::reject_other_active_offers(conn, property_id, winner_id).await?;
    if rejected > 0 {
        debug!(property_id, rejected, "Rejected competing offers");
    }

    db::mark_property_sold(conn, property_id, buyer_user.id, &amount, Some(tx_hash)).await?;
    Ok(ApplyOutcome::Applied)
}

/// `PropertySold`: mark sold only if `OfferAccepted` has not already done
/// so, and upsert the settlement record (replays converge to one row).
async fn apply_sold(
    conn: &mut SqliteConnection,
    property_id: i64,
    buyer: &str,
    sale_price_wei: u128,
    tx_hash: &str,
) -> Result<ApplyOutcome> {
    let Some(property) = db::get_property(conn, property_id).await? else {
        return Ok(ApplyOutcome::Skipped("property not mirrored"));
    };
    let Some(buyer_user) = db::find_user_by_address(conn, buyer).await? else {
        return Ok(ApplyOutcome::Skipped("buyer address not registered"));
    };

    let price = format_wei(sale_price_wei);
    if !property.is_sold {
        db::mark_property_sold(conn, property_id, buyer_user.id, &price, Some(tx_hash)).await?;
    }

    db::upsert_transaction(
        conn,
        property_id,
        property.seller_id,
        buyer_user.id,
        &price,
        Some(tx_hash),
    )
    .await?;
    Ok(ApplyOutcome::Applied)
}
