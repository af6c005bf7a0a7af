//! Offer lifecycle manager.
//!
//! Every mutation follows the same two-phase dependency: preconditions and
//! authorization are checked purely against the mirror first (no external
//! call on failure), then the contract call is submitted and confirmed, and
//! only then is the mirror updated. If the process dies between phases the
//! reconciler repairs the mirror from chain events.
//!
//! A property has at most one winning offer: acceptance marks the winner,
//! marks the property sold, and rejects every competing active offer in one
//! database transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::chain::{ChainClient, ContractCall};
use crate::db;
use crate::errors::{Error, Result};
use crate::models::{format_wei, Offer, OfferStatus, Property, PropertyType, Role, User};

// ─────────────────────────────────────────────────────────
// Role predicates
// ─────────────────────────────────────────────────────────

pub fn can_list_property(role: Role) -> bool {
    matches!(role, Role::Seller | Role::Admin)
}

pub fn can_submit_offer(role: Role) -> bool {
    matches!(role, Role::Buyer | Role::Admin)
}

pub fn can_update_inspection(role: Role) -> bool {
    matches!(role, Role::Appraiser | Role::Inspector | Role::Admin)
}

pub fn is_property_seller(property: &Property, actor: &User) -> bool {
    property.seller_id == actor.id
}

pub fn is_party_to_sale(property: &Property, actor: &User) -> bool {
    property.seller_id == actor.id || property.buyer_id == Some(actor.id)
}

// ─────────────────────────────────────────────────────────
// Manager
// ─────────────────────────────────────────────────────────

/// Parameters for a new listing. The property id is the contract-assigned
/// id the listing will occupy.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub property_id: i64,
    pub price_wei: u128,
    pub location: String,
    pub description: String,
    pub property_type: PropertyType,
    pub area: Option<i64>,
    pub bedrooms: Option<i64>,
    pub bathrooms: Option<i64>,
    pub agent_id: Option<i64>,
    pub agent_commission_bps: Option<i64>,
}

pub struct LifecycleManager<'a, C> {
    pool: &'a SqlitePool,
    chain: &'a C,
}

impl<'a, C: ChainClient> LifecycleManager<'a, C> {
    pub fn new(pool: &'a SqlitePool, chain: &'a C) -> Self {
        Self { pool, chain }
    }

    /// List a property on chain, then mirror it locally.
    pub async fn list_property(&self, actor_id: i64, listing: NewListing) -> Result<String> {
        let mut conn = self.pool.acquire().await?;
        let actor = require_user(&mut conn, actor_id).await?;
        if !can_list_property(actor.role) {
            return Err(Error::Unauthorized(format!(
                "user {} cannot list properties",
                actor.username
            )));
        }
        let from = require_address(&actor)?;

        // These become unsigned calldata words; negatives would wrap.
        if listing.area.is_some_and(|v| v < 0)
            || listing.bedrooms.is_some_and(|v| v < 0)
            || listing.bathrooms.is_some_and(|v| v < 0)
            || listing.agent_commission_bps.is_some_and(|v| v < 0)
        {
            return Err(Error::Precondition(
                "listing dimensions and commission must be non-negative".to_string(),
            ));
        }

        let agent_address = match listing.agent_id {
            Some(agent_id) => {
                let agent = require_user(&mut conn, agent_id).await?;
                Some(require_address(&agent)?)
            }
            None => None,
        };
        drop(conn);

        let call = ContractCall::ListProperty {
            price_wei: listing.price_wei,
            details: listing.location.clone(),
            property_type: listing.property_type.as_u8(),
            area: listing.area.unwrap_or(0) as u64,
            bedrooms: listing.bedrooms.unwrap_or(0) as u64,
            bathrooms: listing.bathrooms.unwrap_or(0) as u64,
            agent: agent_address,
            agent_commission_bps: listing.agent_commission_bps.unwrap_or(0) as u64,
        };
        let tx_hash = self.chain.submit_call(&from, &call, None).await?;

        let mut conn = self.pool.acquire().await?;
        db::insert_property(
            &mut conn,
            listing.property_id,
            actor.id,
            &format_wei(listing.price_wei),
            &listing.location,
            &listing.description,
            listing.property_type,
            listing.area,
            listing.bedrooms,
            listing.bathrooms,
            listing.agent_id,
            listing.agent_commission_bps,
            &tx_hash,
        )
        .await?;

        info!(property_id = listing.property_id, %tx_hash, "Property listed");
        Ok(tx_hash)
    }

    /// Submit an offer. The amount travels on chain as transaction value.
    pub async fn submit_offer(
        &self,
        actor_id: i64,
        property_id: i64,
        amount_wei: u128,
        expires_at: i64,
    ) -> Result<Offer> {
        let mut conn = self.pool.acquire().await?;
        let actor = require_user(&mut conn, actor_id).await?;
        if !can_submit_offer(actor.role) {
            return Err(Error::Unauthorized(format!(
                "user {} cannot submit offers",
                actor.username
            )));
        }
        let from = require_address(&actor)?;

        let property = require_property(&mut conn, property_id).await?;
        if !property.is_listed {
            return Err(Error::Precondition("property is not listed".to_string()));
        }
        if property.is_sold {
            return Err(Error::Precondition("property is already sold".to_string()));
        }
        let expires_in = expires_at - Utc::now().timestamp();
        if expires_in <= 0 {
            return Err(Error::Precondition("offer expiry is in the past".to_string()));
        }
        drop(conn);

        let call = ContractCall::SubmitOffer {
            property_id,
            expires_in_secs: expires_in as u64,
        };
        let tx_hash = self.chain.submit_call(&from, &call, Some(amount_wei)).await?;

        let mut conn = self.pool.acquire().await?;
        let amount = format_wei(amount_wei);
        let offer_id = db::insert_offer(
            &mut conn,
            property_id,
            actor.id,
            &amount,
            OfferStatus::Active,
            Some(expires_at),
            Some(&tx_hash),
        )
        .await?;

        info!(offer_id, property_id, %amount, "Offer submitted");
        db::get_offer(&mut conn, offer_id)
            .await?
            .ok_or(Error::NotFound("offer", offer_id))
    }

    /// Accept an offer: winner accepted, property sold, all competing active
    /// offers rejected — one atomic local transaction after confirmation.
    pub async fn accept_offer(&self, actor_id: i64, offer_id: i64) -> Result<String> {
        let mut conn = self.pool.acquire().await?;
        let actor = require_user(&mut conn, actor_id).await?;
        let offer = db::get_offer(&mut conn, offer_id)
            .await?
            .ok_or(Error::NotFound("offer", offer_id))?;
        let property = require_property(&mut conn, offer.property_id).await?;

        if !is_property_seller(&property, &actor) {
            return Err(Error::Unauthorized(
                "only the property's seller can accept an offer".to_string(),
            ));
        }
        if offer.status != OfferStatus::Active {
            return Err(Error::Precondition("offer is no longer active".to_string()));
        }
        if offer.expires_at.is_some_and(|t| t <= Utc::now().timestamp()) {
            db::set_offer_status(&mut conn, offer.id, OfferStatus::Expired, None).await?;
            return Err(Error::Precondition("offer has expired".to_string()));
        }
        if property.is_sold {
            return Err(Error::Precondition("property is already sold".to_string()));
        }

        let from = require_address(&actor)?;
        let buyer = require_user(&mut conn, offer.buyer_id).await?;
        let buyer_address = require_address(&buyer)?;
        drop(conn);

        let call = ContractCall::AcceptOffer {
            property_id: property.id,
            buyer: buyer_address,
        };
        let tx_hash = self.chain.submit_call(&from, &call, None).await?;

        let mut tx = self.pool.begin().await?;
        db::set_offer_status(&mut tx, offer.id, OfferStatus::Accepted, Some(&tx_hash)).await?;
        db::mark_property_sold(&mut tx, property.id, buyer.id, &offer.amount_wei, Some(&tx_hash))
            .await?;
        let rejected = db::reject_other_active_offers(&mut tx, property.id, offer.id).await?;
        tx.commit().await?;

        info!(
            offer_id,
            property_id = property.id,
            rejected,
            %tx_hash,
            "Offer accepted"
        );
        Ok(tx_hash)
    }

    /// Reject a single offer. Local-only: no chain call, no property
    /// mutation.
    pub async fn reject_offer(&self, actor_id: i64, offer_id: i64) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let actor = require_user(&mut conn, actor_id).await?;
        let offer = db::get_offer(&mut conn, offer_id)
            .await?
            .ok_or(Error::NotFound("offer", offer_id))?;
        let property = require_property(&mut conn, offer.property_id).await?;

        if !is_property_seller(&property, &actor) {
            return Err(Error::Unauthorized(
                "only the property's seller can reject an offer".to_string(),
            ));
        }
        if offer.status != OfferStatus::Active {
            return Err(Error::Precondition("offer is no longer active".to_string()));
        }

        db::set_offer_status(&mut conn, offer.id, OfferStatus::Rejected, None).await?;
        info!(offer_id, property_id = property.id, "Offer rejected");
        Ok(())
    }

    /// Record an inspection result on chain, then mirror the flag.
    pub async fn update_inspection(
        &self,
        actor_id: i64,
        property_id: i64,
        passed: bool,
    ) -> Result<String> {
        let mut conn = self.pool.acquire().await?;
        let actor = require_user(&mut conn, actor_id).await?;
        if !can_update_inspection(actor.role) {
            return Err(Error::Unauthorized(format!(
                "user {} cannot update inspection status",
                actor.username
            )));
        }
        let from = require_address(&actor)?;
        require_property(&mut conn, property_id).await?;
        drop(conn);

        let call = ContractCall::UpdateInspection {
            property_id,
            passed,
        };
        let tx_hash = self.chain.submit_call(&from, &call, None).await?;

        let mut conn = self.pool.acquire().await?;
        db::set_inspection_passed(&mut conn, property_id, passed, &tx_hash).await?;
        info!(property_id, passed, %tx_hash, "Inspection status updated");
        Ok(tx_hash)
    }

    /// Financing approval is an off-chain precondition; only the property's
    /// buyer (or an admin) may set it.
    pub async fn set_financing_approved(
        &self,
        actor_id: i64,
        property_id: i64,
        approved: bool,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let actor = require_user(&mut conn, actor_id).await?;
        let property = require_property(&mut conn, property_id).await?;

        if property.buyer_id != Some(actor.id) && actor.role != Role::Admin {
            return Err(Error::Unauthorized(
                "only the property's buyer can set financing approval".to_string(),
            ));
        }

        db::set_financing_approved(&mut conn, property_id, approved).await?;
        info!(property_id, approved, "Financing approval updated");
        Ok(())
    }

    /// Settle a sale: requires the inspection and financing preconditions,
    /// records the settlement, and delists the property.
    pub async fn complete_transaction(&self, actor_id: i64, property_id: i64) -> Result<String> {
        let mut conn = self.pool.acquire().await?;
        let actor = require_user(&mut conn, actor_id).await?;
        let property = require_property(&mut conn, property_id).await?;

        if !is_party_to_sale(&property, &actor) {
            return Err(Error::Unauthorized(
                "only the seller or buyer can complete the transaction".to_string(),
            ));
        }
        let buyer_id = property
            .buyer_id
            .ok_or_else(|| Error::Precondition("property has no buyer".to_string()))?;
        if !property.is_sold {
            return Err(Error::Precondition("property is not sold".to_string()));
        }
        if !property.inspection_passed {
            return Err(Error::Precondition("inspection has not passed".to_string()));
        }
        if !property.financing_approved {
            return Err(Error::Precondition("financing is not approved".to_string()));
        }
        let from = require_address(&actor)?;
        drop(conn);

        let call = ContractCall::CompleteTransaction { property_id };
        let tx_hash = self.chain.submit_call(&from, &call, None).await?;

        let price = property
            .offer_amount_wei
            .clone()
            .unwrap_or_else(|| property.price_wei.clone());

        let mut tx = self.pool.begin().await?;
        db::upsert_transaction(
            &mut tx,
            property_id,
            property.seller_id,
            buyer_id,
            &price,
            Some(&tx_hash),
        )
        .await?;
        db::delist_property(&mut tx, property_id, &tx_hash).await?;
        tx.commit().await?;

        info!(property_id, %tx_hash, "Transaction completed");
        Ok(tx_hash)
    }
}

async fn require_user(conn: &mut sqlx::SqliteConnection, id: i64) -> Result<User> {
    db::find_user(conn, id).await?.ok_or(Error::NotFound("user", id))
}

async fn require_property(conn: &mut sqlx::SqliteConnection, id: i64) -> Result<Property> {
    db::get_property(conn, id).await?.ok_or(Error::NotFound("property", id))
}

fn require_address(user: &User) -> Result<String> {
    user.eth_address
        .clone()
        .ok_or_else(|| Error::Precondition(format!("user {} has no eth address", user.username)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{insert_user, test_pool, MockChain};

    const SELLER: &str = "0x00000000000000000000000000000000000000aa";
    const BUYER_1: &str = "0x00000000000000000000000000000000000000bb";
    const BUYER_2: &str = "0x00000000000000000000000000000000000000cc";

    struct Fixture {
        pool: SqlitePool,
        seller: i64,
        buyer1: i64,
        buyer2: i64,
    }

    async fn fixture() -> Fixture {
        let pool = test_pool().await;
        let seller = insert_user(&pool, "alice", Role::Seller, Some(SELLER)).await;
        let buyer1 = insert_user(&pool, "bob", Role::Buyer, Some(BUYER_1)).await;
        let buyer2 = insert_user(&pool, "carol", Role::Buyer, Some(BUYER_2)).await;
        Fixture {
            pool,
            seller,
            buyer1,
            buyer2,
        }
    }

    async fn listed_property(fx: &Fixture, chain: &MockChain, id: i64) {
        let manager = LifecycleManager::new(&fx.pool, chain);
        manager
            .list_property(
                fx.seller,
                NewListing {
                    property_id: id,
                    price_wei: 100_000,
                    location: "12 Elm St".to_string(),
                    description: "three-bed terrace".to_string(),
                    property_type: PropertyType::Residential,
                    area: Some(120),
                    bedrooms: Some(3),
                    bathrooms: Some(2),
                    agent_id: None,
                    agent_commission_bps: None,
                },
            )
            .await
            .unwrap();
    }

    fn far_future() -> i64 {
        Utc::now().timestamp() + 86_400
    }

    #[tokio::test]
    async fn accepting_one_offer_rejects_all_competitors() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let manager = LifecycleManager::new(&fx.pool, &chain);
        listed_property(&fx, &chain, 1).await;

        let o1 = manager
            .submit_offer(fx.buyer1, 1, 90_000, far_future())
            .await
            .unwrap();
        let o2 = manager
            .submit_offer(fx.buyer2, 1, 95_000, far_future())
            .await
            .unwrap();

        manager.accept_offer(fx.seller, o2.id).await.unwrap();

        let mut conn = fx.pool.acquire().await.unwrap();
        let o1 = db::get_offer(&mut conn, o1.id).await.unwrap().unwrap();
        let o2 = db::get_offer(&mut conn, o2.id).await.unwrap().unwrap();
        assert_eq!(o1.status, OfferStatus::Rejected);
        assert_eq!(o2.status, OfferStatus::Accepted);

        let property = db::get_property(&mut conn, 1).await.unwrap().unwrap();
        assert!(property.is_sold);
        assert_eq!(property.buyer_id, Some(fx.buyer2));
        assert_eq!(property.offer_amount_wei.as_deref(), Some("95000"));

        let active: Vec<_> = db::offers_for_property(&mut conn, 1)
            .await
            .unwrap()
            .into_iter()
            .filter(|o| o.status == OfferStatus::Active)
            .collect();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn rejecting_an_offer_never_touches_the_property() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let manager = LifecycleManager::new(&fx.pool, &chain);
        listed_property(&fx, &chain, 1).await;

        let offer = manager
            .submit_offer(fx.buyer1, 1, 90_000, far_future())
            .await
            .unwrap();
        let calls_before = chain.submitted_calls();

        manager.reject_offer(fx.seller, offer.id).await.unwrap();

        // rejection is local-only
        assert_eq!(chain.submitted_calls(), calls_before);

        let mut conn = fx.pool.acquire().await.unwrap();
        let offer = db::get_offer(&mut conn, offer.id).await.unwrap().unwrap();
        assert_eq!(offer.status, OfferStatus::Rejected);

        let property = db::get_property(&mut conn, 1).await.unwrap().unwrap();
        assert!(!property.is_sold);
        assert_eq!(property.buyer_id, None);
    }

    #[tokio::test]
    async fn only_the_seller_may_accept() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let manager = LifecycleManager::new(&fx.pool, &chain);
        listed_property(&fx, &chain, 1).await;

        let offer = manager
            .submit_offer(fx.buyer1, 1, 90_000, far_future())
            .await
            .unwrap();
        let calls_before = chain.submitted_calls();

        let err = manager.accept_offer(fx.buyer2, offer.id).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        // the check fires before any chain call
        assert_eq!(chain.submitted_calls(), calls_before);
    }

    #[tokio::test]
    async fn accepting_an_inactive_offer_is_a_precondition_failure() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let manager = LifecycleManager::new(&fx.pool, &chain);
        listed_property(&fx, &chain, 1).await;

        let offer = manager
            .submit_offer(fx.buyer1, 1, 90_000, far_future())
            .await
            .unwrap();
        manager.reject_offer(fx.seller, offer.id).await.unwrap();

        let err = manager.accept_offer(fx.seller, offer.id).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn accepting_a_stale_offer_marks_it_expired() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let manager = LifecycleManager::new(&fx.pool, &chain);
        listed_property(&fx, &chain, 1).await;

        let offer = manager
            .submit_offer(fx.buyer1, 1, 90_000, far_future())
            .await
            .unwrap();
        // deadline passed while the offer sat unanswered
        sqlx::query("UPDATE offers SET expires_at = ?2 WHERE id = ?1")
            .bind(offer.id)
            .bind(Utc::now().timestamp() - 60)
            .execute(&fx.pool)
            .await
            .unwrap();
        let calls_before = chain.submitted_calls();

        let err = manager.accept_offer(fx.seller, offer.id).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(chain.submitted_calls(), calls_before);

        let mut conn = fx.pool.acquire().await.unwrap();
        let offer = db::get_offer(&mut conn, offer.id).await.unwrap().unwrap();
        assert_eq!(offer.status, OfferStatus::Expired);

        let property = db::get_property(&mut conn, 1).await.unwrap().unwrap();
        assert!(!property.is_sold);
    }

    #[tokio::test]
    async fn negative_listing_dimensions_are_refused() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let manager = LifecycleManager::new(&fx.pool, &chain);

        let err = manager
            .list_property(
                fx.seller,
                NewListing {
                    property_id: 1,
                    price_wei: 100_000,
                    location: "12 Elm St".to_string(),
                    description: String::new(),
                    property_type: PropertyType::Residential,
                    area: Some(-120),
                    bedrooms: Some(3),
                    bathrooms: Some(2),
                    agent_id: None,
                    agent_commission_bps: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(chain.submitted_calls(), 0);
    }

    #[tokio::test]
    async fn offers_against_sold_or_unlisted_properties_are_refused() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let manager = LifecycleManager::new(&fx.pool, &chain);
        listed_property(&fx, &chain, 1).await;

        let offer = manager
            .submit_offer(fx.buyer1, 1, 90_000, far_future())
            .await
            .unwrap();
        manager.accept_offer(fx.seller, offer.id).await.unwrap();

        let err = manager
            .submit_offer(fx.buyer2, 1, 99_000, far_future())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn expired_offer_deadline_is_refused_before_any_chain_call() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let manager = LifecycleManager::new(&fx.pool, &chain);
        listed_property(&fx, &chain, 1).await;
        let calls_before = chain.submitted_calls();

        let past = Utc::now().timestamp() - 60;
        let err = manager
            .submit_offer(fx.buyer1, 1, 90_000, past)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(chain.submitted_calls(), calls_before);
    }

    #[tokio::test]
    async fn chain_rejection_leaves_no_local_offer() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let manager = LifecycleManager::new(&fx.pool, &chain);
        listed_property(&fx, &chain, 1).await;

        chain.fail_next_submit();
        let err = manager
            .submit_offer(fx.buyer1, 1, 90_000, far_future())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Chain(_)));

        let mut conn = fx.pool.acquire().await.unwrap();
        assert!(db::offers_for_property(&mut conn, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn complete_transaction_requires_both_preconditions() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let manager = LifecycleManager::new(&fx.pool, &chain);
        listed_property(&fx, &chain, 1).await;

        let offer = manager
            .submit_offer(fx.buyer1, 1, 90_000, far_future())
            .await
            .unwrap();
        manager.accept_offer(fx.seller, offer.id).await.unwrap();

        let err = manager
            .complete_transaction(fx.seller, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn complete_transaction_settles_and_delists() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let inspector = insert_user(
            &fx.pool,
            "ivan",
            Role::Inspector,
            Some("0x00000000000000000000000000000000000000dd"),
        )
        .await;
        let manager = LifecycleManager::new(&fx.pool, &chain);
        listed_property(&fx, &chain, 1).await;

        let offer = manager
            .submit_offer(fx.buyer1, 1, 90_000, far_future())
            .await
            .unwrap();
        manager.accept_offer(fx.seller, offer.id).await.unwrap();
        manager.update_inspection(inspector, 1, true).await.unwrap();
        manager
            .set_financing_approved(fx.buyer1, 1, true)
            .await
            .unwrap();

        manager.complete_transaction(fx.buyer1, 1).await.unwrap();

        let mut conn = fx.pool.acquire().await.unwrap();
        let property = db::get_property(&mut conn, 1).await.unwrap().unwrap();
        assert!(!property.is_listed);

        let settlement = db::get_transaction(&mut conn, 1).await.unwrap().unwrap();
        assert_eq!(settlement.buyer_id, fx.buyer1);
        assert_eq!(settlement.seller_id, fx.seller);
        assert_eq!(settlement.price_wei, "90000");
    }

    #[tokio::test]
    async fn strangers_cannot_complete_a_transaction() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let manager = LifecycleManager::new(&fx.pool, &chain);
        listed_property(&fx, &chain, 1).await;

        let offer = manager
            .submit_offer(fx.buyer1, 1, 90_000, far_future())
            .await
            .unwrap();
        manager.accept_offer(fx.seller, offer.id).await.unwrap();
        let calls_before = chain.submitted_calls();

        let err = manager
            .complete_transaction(fx.buyer2, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        assert_eq!(chain.submitted_calls(), calls_before);
    }

    #[tokio::test]
    async fn non_buyers_cannot_submit_offers() {
        let fx = fixture().await;
        let chain = MockChain::new(10);
        let manager = LifecycleManager::new(&fx.pool, &chain);
        listed_property(&fx, &chain, 1).await;

        let err = manager
            .submit_offer(fx.seller, 1, 90_000, far_future())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }
}
