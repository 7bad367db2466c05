use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use uuid::Uuid;

use crate::database::DbPool;
use crate::entities::{coupon_entity, listing_entity};
use crate::error::{AppError, AppResult};
use crate::external::SettlementClient;
use crate::models::*;
use crate::services::{CouponService, TransferGuard, state_conflict};
use crate::utils::{SharedClock, validate_price, validate_user_id};

/// 二手市场：挂单期间券处于 Listed，成交时过户并回到 Active
#[derive(Clone)]
pub struct ListingService {
    pool: DbPool,
    clock: SharedClock,
    coupons: CouponService,
    settlement: SettlementClient,
}

impl ListingService {
    pub fn new(
        pool: DbPool,
        clock: SharedClock,
        coupons: CouponService,
        settlement: SettlementClient,
    ) -> Self {
        Self {
            pool,
            clock,
            coupons,
            settlement,
        }
    }

    pub async fn create_listing(
        &self,
        seller_id: &str,
        request: CreateListingRequest,
    ) -> AppResult<Listing> {
        validate_price(request.price)?;
        let txn = self.pool.begin().await?;
        let coupon = self
            .coupons
            .transition_in(&txn, request.coupon_id, Transition::List, Actor::User(seller_id))
            .await
            .map_err(state_conflict)?;

        let listing = Listing {
            id: Uuid::new_v4(),
            coupon_id: coupon.id,
            seller_id: seller_id.to_string(),
            price: request.price,
            created_at: self.clock.now(),
            is_active: true,
            buyer_id: None,
            sold_at: None,
            payment_reference: None,
        };
        listing_entity::insert(&txn, &listing).await?;
        txn.commit().await?;

        log::info!(
            "Listing {} created for coupon {} at {}",
            listing.id,
            coupon.id,
            listing.price
        );
        Ok(listing)
    }

    pub async fn cancel_listing(&self, listing_id: Uuid, actor_id: &str) -> AppResult<Listing> {
        let txn = self.pool.begin().await?;
        let mut listing = listing_entity::lock(&txn, listing_id).await?;
        if listing.seller_id != actor_id {
            return Err(AppError::NotOwner);
        }
        if !listing.is_active {
            return Err(AppError::ListingNotActive);
        }

        match self
            .coupons
            .transition_in(&txn, listing.coupon_id, Transition::Delist, Actor::System)
            .await
        {
            Ok(_) => {}
            // 券已过期，挂单照样下架
            Err(AppError::InvalidTransition { from, .. }) if from.is_terminal() => {
                log::warn!(
                    "Cancelling listing {listing_id} whose coupon is already {from}"
                );
            }
            Err(e) => return Err(e),
        }
        listing.is_active = false;
        listing_entity::update(&txn, &listing).await?;
        txn.commit().await?;

        log::info!("Listing {listing_id} cancelled by {actor_id}");
        Ok(listing)
    }

    /// 先向结算网关授权，再过户；过户被拒时退款，挂单保持原样
    pub async fn buy(&self, listing_id: Uuid, buyer_id: &str) -> AppResult<Coupon> {
        validate_user_id(buyer_id)?;
        let txn = self.pool.begin().await?;
        let mut listing = listing_entity::lock(&txn, listing_id).await?;
        if !listing.is_active {
            return Err(AppError::ListingNotActive);
        }
        if listing.seller_id == buyer_id {
            return Err(AppError::SelfPurchase);
        }

        let reference = format!("listing-{listing_id}");
        let receipt = self
            .settlement
            .authorize(buyer_id, &listing.seller_id, listing.price, &reference)
            .await?;

        let sale = async {
            let coupon = self
                .coupons
                .transfer_in(
                    &txn,
                    listing.coupon_id,
                    &listing.seller_id,
                    buyer_id,
                    TransferReason::Sale,
                    TransferGuard::WithTransition(Transition::Delist),
                )
                .await?;
            listing.is_active = false;
            listing.buyer_id = Some(buyer_id.to_string());
            listing.sold_at = Some(self.clock.now());
            listing.payment_reference = Some(receipt.reference.clone());
            listing_entity::update(&txn, &listing).await?;
            Ok::<_, AppError>(coupon)
        }
        .await;
        let committed = match sale {
            Ok(coupon) => txn.commit().await.map(|_| coupon).map_err(AppError::from),
            Err(e) => Err(e),
        };

        match committed {
            Ok(coupon) => {
                log::info!(
                    "Listing {listing_id} sold to {buyer_id} for {}",
                    listing.price
                );
                Ok(coupon)
            }
            Err(e) => {
                if let Err(refund_err) = self.settlement.refund(&receipt.reference).await {
                    log::error!(
                        "Refund of {} failed after rejected sale: {refund_err}",
                        receipt.reference
                    );
                }
                Err(e)
            }
        }
    }

    pub async fn get(&self, listing_id: Uuid) -> AppResult<Listing> {
        listing_entity::find(&self.pool, listing_id).await
    }

    pub async fn list_active(&self, query: &ListingQuery) -> AppResult<PaginatedResponse<Listing>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let mut base_query =
            listing_entity::Entity::find().filter(listing_entity::Column::IsActive.eq(true));
        if let Some(seller_id) = &query.seller_id {
            base_query =
                base_query.filter(listing_entity::Column::SellerId.eq(seller_id.as_str()));
        }

        let total = base_query.clone().count(&self.pool).await?;
        let items = base_query
            .order_by_desc(listing_entity::Column::CreatedAt)
            .limit(params.get_per_page() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(Listing::from)
            .collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    /// 下架券已进入终态的挂单（配合过期清扫）
    pub async fn prune_stale(&self) -> AppResult<usize> {
        let active = listing_entity::Entity::find()
            .filter(listing_entity::Column::IsActive.eq(true))
            .all(&self.pool)
            .await?;

        let mut pruned = 0;
        for candidate in active {
            let txn = self.pool.begin().await?;
            let mut listing = listing_entity::lock(&txn, candidate.id).await?;
            if !listing.is_active {
                continue;
            }
            let coupon = coupon_entity::find(&txn, listing.coupon_id).await?;
            if coupon.state.is_terminal() {
                listing.is_active = false;
                listing_entity::update(&txn, &listing).await?;
                pruned += 1;
            }
            txn.commit().await?;
        }
        if pruned > 0 {
            log::info!("Pruned {pruned} stale listings");
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Harness;
    use chrono::Duration;

    fn request(coupon_id: Uuid, price: i64) -> CreateListingRequest {
        CreateListingRequest { coupon_id, price }
    }

    #[tokio::test]
    async fn test_listing_moves_coupon_to_listed() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let listings = &h.services.listings;

        assert!(matches!(
            listings.create_listing("alice", request(coupon.id, 0)).await,
            Err(AppError::InvalidPrice(_))
        ));
        assert!(matches!(
            listings.create_listing("bob", request(coupon.id, 500)).await,
            Err(AppError::NotOwner)
        ));

        let listing = listings
            .create_listing("alice", request(coupon.id, 500))
            .await
            .unwrap();
        assert!(listing.is_active);
        assert_eq!(
            h.services.coupons.get(coupon.id).await.unwrap().state,
            CouponState::Listed
        );

        // 同一张券不能重复挂单
        assert!(matches!(
            listings.create_listing("alice", request(coupon.id, 600)).await,
            Err(AppError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_returns_coupon() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let listings = &h.services.listings;
        let listing = listings
            .create_listing("alice", request(coupon.id, 500))
            .await
            .unwrap();

        assert!(matches!(
            listings.cancel_listing(listing.id, "bob").await,
            Err(AppError::NotOwner)
        ));
        let cancelled = listings.cancel_listing(listing.id, "alice").await.unwrap();
        assert!(!cancelled.is_active);
        assert_eq!(
            h.services.coupons.get(coupon.id).await.unwrap().state,
            CouponState::Active
        );
        assert!(matches!(
            listings.cancel_listing(listing.id, "alice").await,
            Err(AppError::ListingNotActive)
        ));
    }

    #[tokio::test]
    async fn test_buy_transfers_and_deactivates() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let listings = &h.services.listings;
        let listing = listings
            .create_listing("alice", request(coupon.id, 500))
            .await
            .unwrap();

        assert!(matches!(
            listings.buy(listing.id, "alice").await,
            Err(AppError::SelfPurchase)
        ));

        let bought = listings.buy(listing.id, "bob").await.unwrap();
        assert_eq!(bought.owner_id, "bob");
        assert_eq!(bought.state, CouponState::Active);
        assert_eq!(
            bought.transfer_history.last().unwrap().reason,
            TransferReason::Sale
        );

        let sold = listings.get(listing.id).await.unwrap();
        assert!(!sold.is_active);
        assert_eq!(sold.buyer_id.as_deref(), Some("bob"));
        assert!(sold.payment_reference.is_some());

        assert!(matches!(
            listings.buy(listing.id, "carol").await,
            Err(AppError::ListingNotActive)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_buyers_single_winner() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let listing_id = h
            .services
            .listings
            .create_listing("alice", request(coupon.id, 500))
            .await
            .unwrap()
            .id;

        let mut handles = Vec::new();
        for buyer in ["bob", "carol", "dave"] {
            let listings = h.services.listings.clone();
            handles.push(tokio::spawn(async move { listings.buy(listing_id, buyer).await }));
        }
        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(e) => assert!(matches!(e, AppError::ListingNotActive)),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(
            h.services.coupons.get(coupon.id).await.unwrap().transfer_history.len(),
            2
        );
    }

    #[tokio::test]
    async fn test_expired_coupon_listing_is_pruned() {
        let h = Harness::new().await;
        let promotion = h.promotion_expiring(5, Duration::hours(1)).await;
        let coupon = h.services.coupons.claim(promotion.id, "alice").await.unwrap();
        let listing = h
            .services
            .listings
            .create_listing("alice", request(coupon.id, 300))
            .await
            .unwrap();

        h.clock.advance(Duration::hours(2));
        h.services.coupons.expire_sweep(h.now()).await.unwrap();

        // 过期券的成交被拒，挂单不受影响
        assert!(matches!(
            h.services.listings.buy(listing.id, "bob").await,
            Err(AppError::InvalidState(_))
        ));
        assert!(h.services.listings.get(listing.id).await.unwrap().is_active);

        assert_eq!(h.services.listings.prune_stale().await.unwrap(), 1);
        assert!(!h.services.listings.get(listing.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_list_active_filters_seller() {
        let h = Harness::new().await;
        let a = h.coupon("alice").await;
        let b = h.coupon("bob").await;
        let listings = &h.services.listings;
        listings.create_listing("alice", request(a.id, 100)).await.unwrap();
        listings.create_listing("bob", request(b.id, 200)).await.unwrap();

        let all = listings
            .list_active(&ListingQuery {
                page: None,
                per_page: None,
                seller_id: None,
            })
            .await
            .unwrap();
        assert_eq!(all.total, 2);

        let bobs = listings
            .list_active(&ListingQuery {
                page: None,
                per_page: None,
                seller_id: Some("bob".into()),
            })
            .await
            .unwrap();
        assert_eq!(bobs.total, 1);
        assert_eq!(bobs.data[0].price, 200);
    }
}
