//! 券账本：`Coupon.state` 的唯一写入者。
//!
//! 挂单、拍卖、质押引擎都通过 `request_transition` 申请状态迁移，
//! 不直接改写券，从而保证一张券同一时刻只处于一种流通机制中。
//! 需要和引擎自身记录一起提交的迁移走 `*_in` 变体，共用调用方的事务。

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::database::DbPool;
use crate::entities::{coupon_entity, promotion_entity};
use crate::error::{AppError, AppResult};
use crate::external::{RewardEvent, RewardPublisher};
use crate::models::*;
use crate::utils::{SharedClock, validate_user_id};

/// 过户时对券状态的附加约束
#[derive(Debug, Clone, Copy)]
pub(crate) enum TransferGuard {
    AnyLive,
    RequireActive,
    WithTransition(Transition),
}

#[derive(Clone)]
pub struct CouponService {
    pool: DbPool,
    clock: SharedClock,
    rewards: RewardPublisher,
}

impl CouponService {
    pub fn new(pool: DbPool, clock: SharedClock, rewards: RewardPublisher) -> Self {
        Self {
            pool,
            clock,
            rewards,
        }
    }

    pub async fn claim(&self, promotion_id: Uuid, user_id: &str) -> AppResult<Coupon> {
        let txn = self.pool.begin().await?;
        let coupon = self
            .issue_in(&txn, promotion_id, user_id, None, self.clock.now())
            .await?;
        txn.commit().await?;

        self.announce_claim(&coupon);
        Ok(coupon)
    }

    /// 在调用方事务内领取一张券。
    /// `effective_at` 是校验活动有效期所用的时刻；拼团到期转券时取拼团截止时间。
    /// `discount_override` 供拼团转换时写入冻结折扣。
    pub(crate) async fn issue_in(
        &self,
        txn: &DatabaseTransaction,
        promotion_id: Uuid,
        user_id: &str,
        discount_override: Option<u8>,
        effective_at: DateTime<Utc>,
    ) -> AppResult<Coupon> {
        validate_user_id(user_id)?;
        let now = self.clock.now();

        let mut promotion = promotion_entity::lock(txn, promotion_id).await?;
        promotion.reserve_one(effective_at)?;
        promotion_entity::update(txn, &promotion).await?;

        let coupon = Coupon {
            id: Uuid::new_v4(),
            promotion_id,
            owner_id: user_id.to_string(),
            state: CouponState::Active,
            discount_percentage: discount_override.unwrap_or(promotion.discount_percentage),
            claimed_at: now,
            redeemed_at: None,
            transfer_history: vec![TransferRecord {
                from: promotion.merchant_id.clone(),
                to: user_id.to_string(),
                timestamp: now,
                reason: TransferReason::Claim,
            }],
            version: 1,
        };
        coupon_entity::insert(txn, &coupon).await?;

        log::info!(
            "Coupon {} claimed by {user_id} from promotion {promotion_id} ({} left)",
            coupon.id,
            promotion.remaining_supply()
        );
        Ok(coupon)
    }

    /// 事务提交后再发出领取事件
    pub(crate) fn announce_claim(&self, coupon: &Coupon) {
        self.rewards.emit(RewardEvent::Claimed {
            user_id: coupon.owner_id.clone(),
            coupon_id: coupon.id,
            promotion_id: coupon.promotion_id,
            at: coupon.claimed_at,
        });
    }

    pub async fn get(&self, coupon_id: Uuid) -> AppResult<Coupon> {
        coupon_entity::find(&self.pool, coupon_id).await
    }

    pub async fn history(&self, coupon_id: Uuid) -> AppResult<Vec<TransferRecord>> {
        Ok(self.get(coupon_id).await?.transfer_history)
    }

    pub async fn list_by_owner(
        &self,
        owner_id: &str,
        query: &CouponQuery,
    ) -> AppResult<PaginatedResponse<Coupon>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut base_query =
            coupon_entity::Entity::find().filter(coupon_entity::Column::OwnerId.eq(owner_id));
        if let Some(state) = query.state {
            base_query = base_query.filter(coupon_entity::Column::State.eq(state));
        }

        let total = base_query.clone().count(&self.pool).await?;
        let models = base_query
            .order_by_desc(coupon_entity::Column::ClaimedAt)
            .limit(params.get_per_page() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(
            coupon_entity::into_coupons(models)?,
            &params,
            total,
        ))
    }

    pub async fn request_transition(
        &self,
        coupon_id: Uuid,
        transition: Transition,
        actor: Actor<'_>,
    ) -> AppResult<Coupon> {
        let txn = self.pool.begin().await?;
        let coupon = self.transition_in(&txn, coupon_id, transition, actor).await?;
        txn.commit().await?;
        Ok(coupon)
    }

    /// 锁住券行后校验并执行迁移，随调用方事务一起提交
    pub(crate) async fn transition_in(
        &self,
        txn: &DatabaseTransaction,
        coupon_id: Uuid,
        transition: Transition,
        actor: Actor<'_>,
    ) -> AppResult<Coupon> {
        let now = self.clock.now();
        let mut coupon = coupon_entity::lock(txn, coupon_id).await?;

        if transition.requires_live_promotion() {
            let promotion = promotion_entity::find(txn, coupon.promotion_id).await?;
            if promotion.is_expired(now) {
                return Err(AppError::PromotionExpired);
            }
        }

        apply_transition(&mut coupon, transition, actor, now)?;
        coupon_entity::update(txn, &coupon).await?;
        log::info!(
            "Coupon {coupon_id} -> {} ({transition:?}, v{})",
            coupon.state,
            coupon.version
        );
        Ok(coupon)
    }

    /// 仅改变持有人，不改变状态；调用方需另行申请相应的迁移
    pub async fn transfer_ownership(
        &self,
        coupon_id: Uuid,
        from_id: &str,
        to_id: &str,
        reason: TransferReason,
    ) -> AppResult<Coupon> {
        let txn = self.pool.begin().await?;
        let coupon = self
            .transfer_in(&txn, coupon_id, from_id, to_id, reason, TransferGuard::AnyLive)
            .await?;
        txn.commit().await?;
        Ok(coupon)
    }

    /// 转赠：只有处于 Active 的券可以转赠
    pub async fn gift(&self, coupon_id: Uuid, from_id: &str, to_id: &str) -> AppResult<Coupon> {
        if from_id == to_id {
            return Err(AppError::ValidationError("cannot gift a coupon to yourself".into()));
        }
        let txn = self.pool.begin().await?;
        let coupon = self
            .transfer_in(
                &txn,
                coupon_id,
                from_id,
                to_id,
                TransferReason::Gift,
                TransferGuard::RequireActive,
            )
            .await?;
        txn.commit().await?;
        Ok(coupon)
    }

    /// 在同一行锁内完成过户；`WithTransition` 同时完成状态迁移，成交/结算使用
    pub(crate) async fn transfer_in(
        &self,
        txn: &DatabaseTransaction,
        coupon_id: Uuid,
        from_id: &str,
        to_id: &str,
        reason: TransferReason,
        guard: TransferGuard,
    ) -> AppResult<Coupon> {
        validate_user_id(to_id)?;
        let now = self.clock.now();
        let mut coupon = coupon_entity::lock(txn, coupon_id).await?;

        if !coupon.is_owned_by(from_id) {
            return Err(AppError::NotOwner);
        }
        if coupon.state.is_terminal() {
            return Err(AppError::InvalidState(format!("coupon is {}", coupon.state)));
        }
        match guard {
            TransferGuard::AnyLive => {}
            TransferGuard::RequireActive if coupon.state == CouponState::Active => {}
            TransferGuard::RequireActive => {
                return Err(AppError::InvalidState(format!("coupon is {}", coupon.state)));
            }
            TransferGuard::WithTransition(t) if !t.permits(coupon.state) => {
                return Err(AppError::InvalidTransition {
                    from: coupon.state,
                    to: t.target(),
                });
            }
            TransferGuard::WithTransition(_) => {}
        }

        coupon.transfer_history.push(TransferRecord {
            from: from_id.to_string(),
            to: to_id.to_string(),
            timestamp: now,
            reason,
        });
        coupon.owner_id = to_id.to_string();
        if let TransferGuard::WithTransition(t) = guard {
            coupon.state = t.target();
        }
        coupon.version += 1;
        coupon_entity::update(txn, &coupon).await?;

        log::info!("Coupon {coupon_id} transferred {from_id} -> {to_id} ({reason:?})");
        Ok(coupon)
    }

    /// 幂等批处理：活动已过期且处于 Active/Listed 的券置为 Expired。
    /// 质押中与拍卖中的券不在此处过期。每张券单独一个事务。
    pub async fn expire_sweep(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let expired_promotions: Vec<Uuid> = promotion_entity::Entity::find()
            .all(&self.pool)
            .await?
            .into_iter()
            .filter(|p| now >= p.expires_at)
            .map(|p| p.id)
            .collect();
        if expired_promotions.is_empty() {
            return Ok(0);
        }

        let candidates = coupon_entity::Entity::find()
            .filter(coupon_entity::Column::PromotionId.is_in(expired_promotions))
            .filter(
                coupon_entity::Column::State.is_in([CouponState::Active, CouponState::Listed]),
            )
            .all(&self.pool)
            .await?;

        let mut count = 0;
        for candidate in candidates {
            let txn = self.pool.begin().await?;
            let mut coupon = coupon_entity::lock(&txn, candidate.id).await?;
            if apply_transition(&mut coupon, Transition::Expire, Actor::System, now).is_ok() {
                coupon_entity::update(&txn, &coupon).await?;
                count += 1;
            }
            txn.commit().await?;
        }
        if count > 0 {
            log::info!("Expire sweep moved {count} coupons to expired");
        }
        Ok(count)
    }
}

fn apply_transition(
    coupon: &mut Coupon,
    transition: Transition,
    actor: Actor<'_>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if transition.owner_gated() {
        match actor {
            Actor::User(id) if coupon.is_owned_by(id) => {}
            _ => return Err(AppError::NotOwner),
        }
    }
    if !transition.permits(coupon.state) {
        return Err(AppError::InvalidTransition {
            from: coupon.state,
            to: transition.target(),
        });
    }

    coupon.state = transition.target();
    if transition == Transition::Redeem {
        coupon.redeemed_at = Some(now);
    }
    coupon.version += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Harness;
    use chrono::Duration;
    use futures_util::future::join_all;

    #[tokio::test]
    async fn test_claim_creates_active_coupon_with_history() {
        let mut h = Harness::new().await;
        let promotion = h.promotion(5).await;
        let coupon = h.services.coupons.claim(promotion.id, "alice").await.unwrap();

        assert_eq!(coupon.state, CouponState::Active);
        assert_eq!(coupon.owner_id, "alice");
        assert_eq!(coupon.discount_percentage, promotion.discount_percentage);
        assert_eq!(coupon.transfer_history.len(), 1);
        assert_eq!(coupon.transfer_history[0].reason, TransferReason::Claim);

        let p = h.services.promotions.get(promotion.id).await.unwrap();
        assert_eq!(p.current_supply, 1);

        match h.rewards_rx.recv().await {
            Some(RewardEvent::Claimed { user_id, .. }) => assert_eq!(user_id, "alice"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_claims_respect_supply() {
        let h = Harness::new().await;
        let promotion = h.promotion(1).await;

        let attempts = (0..8).map(|i| {
            let coupons = h.services.coupons.clone();
            let id = promotion.id;
            tokio::spawn(async move { coupons.claim(id, &format!("user-{i}")).await })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, AppError::SupplyExhausted))
        );
        assert_eq!(h.services.promotions.get(promotion.id).await.unwrap().current_supply, 1);
    }

    #[tokio::test]
    async fn test_claim_rejects_expired_and_inactive() {
        let h = Harness::new().await;
        let promotion = h.promotion(5).await;
        h.clock.advance(Duration::days(400));
        assert!(matches!(
            h.services.coupons.claim(promotion.id, "alice").await,
            Err(AppError::PromotionExpired)
        ));

        let other = h.promotion(5).await;
        h.services
            .promotions
            .deactivate(other.id, &other.merchant_id)
            .await
            .unwrap();
        assert!(matches!(
            h.services.coupons.claim(other.id, "alice").await,
            Err(AppError::PromotionInactive)
        ));
    }

    #[tokio::test]
    async fn test_transition_rules() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let ledger = &h.services.coupons;

        assert!(matches!(
            ledger
                .request_transition(coupon.id, Transition::List, Actor::User("mallory"))
                .await,
            Err(AppError::NotOwner)
        ));

        let listed = ledger
            .request_transition(coupon.id, Transition::List, Actor::User("alice"))
            .await
            .unwrap();
        assert_eq!(listed.state, CouponState::Listed);

        // 挂单中的券不能质押
        assert!(matches!(
            ledger
                .request_transition(coupon.id, Transition::Stake, Actor::User("alice"))
                .await,
            Err(AppError::InvalidTransition {
                from: CouponState::Listed,
                to: CouponState::Staked
            })
        ));

        let back = ledger
            .request_transition(coupon.id, Transition::Delist, Actor::System)
            .await
            .unwrap();
        assert_eq!(back.state, CouponState::Active);
        assert_eq!(back.version, 3);
    }

    #[tokio::test]
    async fn test_concurrent_transitions_only_one_wins() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;

        let tasks = [Transition::List, Transition::Stake, Transition::OpenAuction]
            .into_iter()
            .cycle()
            .take(12)
            .map(|t| {
                let ledger = h.services.coupons.clone();
                let id = coupon.id;
                tokio::spawn(async move {
                    ledger.request_transition(id, t, Actor::User("alice")).await
                })
            });
        let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, AppError::InvalidTransition { .. }))
        );
    }

    #[tokio::test]
    async fn test_transfer_ownership_keeps_state_and_appends_history() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let ledger = &h.services.coupons;

        assert!(matches!(
            ledger
                .transfer_ownership(coupon.id, "bob", "carol", TransferReason::Sale)
                .await,
            Err(AppError::NotOwner)
        ));

        let moved = ledger
            .transfer_ownership(coupon.id, "alice", "bob", TransferReason::Sale)
            .await
            .unwrap();
        assert_eq!(moved.owner_id, "bob");
        assert_eq!(moved.state, CouponState::Active);
        assert_eq!(moved.transfer_history.len(), 2);
        assert_eq!(moved.transfer_history[1].from, "alice");
    }

    #[tokio::test]
    async fn test_terminal_coupon_cannot_move() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let ledger = &h.services.coupons;
        ledger
            .request_transition(coupon.id, Transition::Redeem, Actor::User("alice"))
            .await
            .unwrap();

        assert!(matches!(
            ledger
                .transfer_ownership(coupon.id, "alice", "bob", TransferReason::Gift)
                .await,
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            ledger
                .request_transition(coupon.id, Transition::List, Actor::User("alice"))
                .await,
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_gift_requires_active() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let ledger = &h.services.coupons;

        assert!(ledger.gift(coupon.id, "alice", "alice").await.is_err());
        let gifted = ledger.gift(coupon.id, "alice", "bob").await.unwrap();
        assert_eq!(gifted.owner_id, "bob");
        assert_eq!(
            gifted.transfer_history.last().unwrap().reason,
            TransferReason::Gift
        );

        ledger
            .request_transition(coupon.id, Transition::Stake, Actor::User("bob"))
            .await
            .unwrap();
        assert!(matches!(
            ledger.gift(coupon.id, "bob", "carol").await,
            Err(AppError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_expire_sweep_skips_staked_and_auctioned() {
        let h = Harness::new().await;
        let promotion = h.promotion_expiring(10, Duration::days(1)).await;
        let ledger = &h.services.coupons;

        let active = ledger.claim(promotion.id, "a").await.unwrap();
        let listed = ledger.claim(promotion.id, "b").await.unwrap();
        let staked = ledger.claim(promotion.id, "c").await.unwrap();
        let auctioned = ledger.claim(promotion.id, "d").await.unwrap();
        ledger
            .request_transition(listed.id, Transition::List, Actor::User("b"))
            .await
            .unwrap();
        ledger
            .request_transition(staked.id, Transition::Stake, Actor::User("c"))
            .await
            .unwrap();
        ledger
            .request_transition(auctioned.id, Transition::OpenAuction, Actor::User("d"))
            .await
            .unwrap();

        let before = h.now();
        assert_eq!(ledger.expire_sweep(before).await.unwrap(), 0);

        let later = before + Duration::days(2);
        assert_eq!(ledger.expire_sweep(later).await.unwrap(), 2);
        assert_eq!(ledger.expire_sweep(later).await.unwrap(), 0);

        assert_eq!(ledger.get(active.id).await.unwrap().state, CouponState::Expired);
        assert_eq!(ledger.get(listed.id).await.unwrap().state, CouponState::Expired);
        assert_eq!(ledger.get(staked.id).await.unwrap().state, CouponState::Staked);
        assert_eq!(
            ledger.get(auctioned.id).await.unwrap().state,
            CouponState::InAuction
        );
    }

    #[tokio::test]
    async fn test_redeem_rejected_after_promotion_expiry() {
        let h = Harness::new().await;
        let promotion = h.promotion_expiring(10, Duration::hours(1)).await;
        let coupon = h.services.coupons.claim(promotion.id, "alice").await.unwrap();
        h.clock.advance(Duration::hours(2));

        assert!(matches!(
            h.services
                .coupons
                .request_transition(coupon.id, Transition::Redeem, Actor::User("alice"))
                .await,
            Err(AppError::PromotionExpired)
        ));
        assert_eq!(
            h.services.coupons.get(coupon.id).await.unwrap().state,
            CouponState::Active
        );
    }

    #[tokio::test]
    async fn test_blank_user_cannot_claim() {
        let h = Harness::new().await;
        let promotion = h.promotion(3).await;

        assert!(matches!(
            h.services.coupons.claim(promotion.id, "   ").await,
            Err(AppError::ValidationError(_))
        ));
        assert_eq!(h.services.promotions.get(promotion.id).await.unwrap().current_supply, 0);

        let page = h
            .services
            .coupons
            .list_by_owner(
                "alice",
                &CouponQuery {
                    page: None,
                    per_page: None,
                    state: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_list_by_owner_filters_state() {
        let h = Harness::new().await;
        let promotion = h.promotion(5).await;
        let ledger = &h.services.coupons;
        let first = ledger.claim(promotion.id, "alice").await.unwrap();
        ledger.claim(promotion.id, "alice").await.unwrap();
        ledger.claim(promotion.id, "bob").await.unwrap();
        ledger
            .request_transition(first.id, Transition::Stake, Actor::User("alice"))
            .await
            .unwrap();

        let all = ledger
            .list_by_owner(
                "alice",
                &CouponQuery {
                    page: None,
                    per_page: None,
                    state: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(all.total, 2);

        let staked = ledger
            .list_by_owner(
                "alice",
                &CouponQuery {
                    page: None,
                    per_page: None,
                    state: Some(CouponState::Staked),
                },
            )
            .await
            .unwrap();
        assert_eq!(staked.total, 1);
        assert_eq!(staked.data[0].id, first.id);
    }
}
