use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use uuid::Uuid;

use crate::config::RedemptionConfig;
use crate::database::DbPool;
use crate::entities::{coupon_entity, promotion_entity, redemption_token_entity};
use crate::error::{AppError, AppResult};
use crate::external::{RewardEvent, RewardPublisher};
use crate::models::*;
use crate::services::CouponService;
use crate::utils::{SharedClock, generate_redemption_code};

/// 核销引擎：发放短时一次性核销码，并在到店核销时完成 Active -> Redeemed。
///
/// 已使用的码永久保留（按 `coupon_id, consumed` 建索引），
/// 以便重放时稳定地报告已使用；过期未用的码由 `purge_expired` 清理。
#[derive(Clone)]
pub struct RedemptionService {
    pool: DbPool,
    clock: SharedClock,
    coupons: CouponService,
    rewards: RewardPublisher,
    window: Duration,
}

impl RedemptionService {
    pub fn new(
        pool: DbPool,
        clock: SharedClock,
        coupons: CouponService,
        rewards: RewardPublisher,
        cfg: &RedemptionConfig,
    ) -> Self {
        Self {
            pool,
            clock,
            coupons,
            rewards,
            window: Duration::seconds(cfg.window_seconds),
        }
    }

    /// 发放核销码，旧的未使用码随即作废
    pub async fn issue_token(&self, coupon_id: Uuid, user_id: &str) -> AppResult<RedemptionToken> {
        let now = self.clock.now();
        let txn = self.pool.begin().await?;

        // 锁住券行，同一张券的发码与核销串行执行
        let coupon = coupon_entity::lock(&txn, coupon_id).await?;
        if !coupon.is_owned_by(user_id) {
            return Err(AppError::NotOwner);
        }
        if coupon.state != CouponState::Active {
            return Err(AppError::InvalidState(format!(
                "coupon is {}, only active coupons can be redeemed",
                coupon.state
            )));
        }
        let promotion = promotion_entity::find(&txn, coupon.promotion_id).await?;
        if promotion.is_expired(now) {
            return Err(AppError::PromotionExpired);
        }

        let superseded = redemption_token_entity::Entity::delete_many()
            .filter(redemption_token_entity::Column::CouponId.eq(coupon_id))
            .filter(redemption_token_entity::Column::Consumed.eq(false))
            .exec(&txn)
            .await?;
        if superseded.rows_affected > 0 {
            log::debug!("Redemption code for coupon {coupon_id} superseded");
        }

        let code = loop {
            let candidate = generate_redemption_code();
            if !redemption_token_entity::exists(&txn, &candidate).await? {
                break candidate;
            }
        };
        let token = RedemptionToken {
            code,
            coupon_id,
            owner_id: user_id.to_string(),
            issued_at: now,
            expires_at: now + self.window,
            consumed: false,
            consumed_at: None,
        };
        redemption_token_entity::insert(&txn, &token).await?;
        txn.commit().await?;

        log::info!(
            "Redemption token issued for coupon {coupon_id}, expires at {}",
            token.expires_at
        );
        Ok(token)
    }

    /// 重新生成核销码，窗口从现在重新计时
    pub async fn refresh(&self, coupon_id: Uuid, user_id: &str) -> AppResult<RedemptionToken> {
        self.issue_token(coupon_id, user_id).await
    }

    /// 商户核销。`merchant_id` 提供时必须与活动商户一致。
    pub async fn finalize(&self, code: &str, merchant_id: Option<&str>) -> AppResult<Coupon> {
        let now = self.clock.now();
        let coupon_id = redemption_token_entity::find(&self.pool, code)
            .await?
            .ok_or(AppError::TokenNotFound)?
            .coupon_id;

        // 加锁顺序与发码一致：先券后码
        let txn = self.pool.begin().await?;
        let coupon = coupon_entity::lock(&txn, coupon_id).await?;
        let mut token = redemption_token_entity::lock(&txn, code)
            .await?
            .ok_or(AppError::TokenNotFound)?;
        if token.consumed {
            return Err(AppError::TokenAlreadyConsumed);
        }
        if token.is_expired(now) {
            return Err(AppError::TokenExpired);
        }

        if let Some(merchant_id) = merchant_id {
            let promotion = promotion_entity::find(&txn, coupon.promotion_id).await?;
            if promotion.merchant_id != merchant_id {
                return Err(AppError::NotOwner);
            }
        }

        let redeemed = self
            .coupons
            .transition_in(
                &txn,
                coupon_id,
                Transition::Redeem,
                Actor::User(&token.owner_id),
            )
            .await?;

        token.consumed = true;
        token.consumed_at = Some(now);
        redemption_token_entity::update(&txn, &token).await?;
        txn.commit().await?;

        log::info!("Coupon {} redeemed by {}", redeemed.id, redeemed.owner_id);
        self.rewards.emit(RewardEvent::Redeemed {
            user_id: redeemed.owner_id.clone(),
            coupon_id: redeemed.id,
            promotion_id: redeemed.promotion_id,
            at: now,
        });
        Ok(redeemed)
    }

    /// 清理已过期且未使用的码；已使用的码保留以便重放时报告已使用
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let expired: Vec<String> = redemption_token_entity::Entity::find()
            .filter(redemption_token_entity::Column::Consumed.eq(false))
            .all(&self.pool)
            .await?
            .into_iter()
            .filter(|t| t.expires_at < now)
            .map(|t| t.code)
            .collect();
        if expired.is_empty() {
            return Ok(0);
        }

        let result = redemption_token_entity::Entity::delete_many()
            .filter(redemption_token_entity::Column::Code.is_in(expired))
            .filter(redemption_token_entity::Column::Consumed.eq(false))
            .exec(&self.pool)
            .await?;
        let purged = result.rows_affected as usize;
        if purged > 0 {
            log::info!("Purged {purged} expired redemption tokens");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Harness;
    use futures_util::future::join_all;

    #[tokio::test]
    async fn test_finalize_within_window() {
        let mut h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let _claimed = h.rewards_rx.recv().await;

        let token = h
            .services
            .redemptions
            .issue_token(coupon.id, "alice")
            .await
            .unwrap();
        assert_eq!(token.expires_at - token.issued_at, Duration::seconds(30));

        h.clock.advance(Duration::seconds(29));
        let redeemed = h
            .services
            .redemptions
            .finalize(&token.code, None)
            .await
            .unwrap();
        assert_eq!(redeemed.state, CouponState::Redeemed);
        assert!(redeemed.redeemed_at.is_some());
        assert!(matches!(
            h.rewards_rx.recv().await,
            Some(RewardEvent::Redeemed { .. })
        ));
    }

    #[tokio::test]
    async fn test_token_expires_after_window() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let token = h
            .services
            .redemptions
            .issue_token(coupon.id, "alice")
            .await
            .unwrap();

        h.clock.advance(Duration::seconds(31));
        assert!(matches!(
            h.services.redemptions.finalize(&token.code, None).await,
            Err(AppError::TokenExpired)
        ));
        assert_eq!(
            h.services.coupons.get(coupon.id).await.unwrap().state,
            CouponState::Active
        );
    }

    #[tokio::test]
    async fn test_second_finalize_reports_consumed() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let redemptions = &h.services.redemptions;
        let token = redemptions.issue_token(coupon.id, "alice").await.unwrap();

        redemptions.finalize(&token.code, None).await.unwrap();
        assert!(matches!(
            redemptions.finalize(&token.code, None).await,
            Err(AppError::TokenAlreadyConsumed)
        ));

        // 清理后仍然保留已使用的码
        h.clock.advance(Duration::minutes(5));
        redemptions.purge_expired(h.now()).await.unwrap();
        assert!(matches!(
            redemptions.finalize(&token.code, None).await,
            Err(AppError::TokenAlreadyConsumed)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_finalize_redeems_once() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let token = h
            .services
            .redemptions
            .issue_token(coupon.id, "alice")
            .await
            .unwrap();

        let attempts = (0..6).map(|_| {
            let redemptions = h.services.redemptions.clone();
            let code = token.code.clone();
            tokio::spawn(async move { redemptions.finalize(&code, None).await })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, AppError::TokenAlreadyConsumed))
        );
    }

    #[tokio::test]
    async fn test_reissue_supersedes_previous_code() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let redemptions = &h.services.redemptions;

        let first = redemptions.issue_token(coupon.id, "alice").await.unwrap();
        let second = redemptions.refresh(coupon.id, "alice").await.unwrap();
        assert_ne!(first.code, second.code);

        assert!(matches!(
            redemptions.finalize(&first.code, None).await,
            Err(AppError::TokenNotFound)
        ));
        redemptions.finalize(&second.code, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_issue_requires_owner_and_active() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let redemptions = &h.services.redemptions;

        assert!(matches!(
            redemptions.issue_token(coupon.id, "bob").await,
            Err(AppError::NotOwner)
        ));

        h.services
            .coupons
            .request_transition(coupon.id, Transition::Stake, Actor::User("alice"))
            .await
            .unwrap();
        assert!(matches!(
            redemptions.issue_token(coupon.id, "alice").await,
            Err(AppError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_token_after_gift_is_rejected() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let token = h
            .services
            .redemptions
            .issue_token(coupon.id, "alice")
            .await
            .unwrap();
        h.services.coupons.gift(coupon.id, "alice", "bob").await.unwrap();

        assert!(matches!(
            h.services.redemptions.finalize(&token.code, None).await,
            Err(AppError::NotOwner)
        ));
    }

    #[tokio::test]
    async fn test_merchant_check_on_finalize() {
        let h = Harness::new().await;
        let coupon = h.coupon("alice").await;
        let redemptions = &h.services.redemptions;
        let token = redemptions.issue_token(coupon.id, "alice").await.unwrap();

        assert!(matches!(
            redemptions.finalize(&token.code, Some("other-shop")).await,
            Err(AppError::NotOwner)
        ));
        redemptions
            .finalize(&token.code, Some(Harness::MERCHANT))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_window_follows_config() {
        let mut config = crate::config::Config::default();
        config.redemption.window_seconds = 5;
        let h = Harness::with_config(config).await;
        let coupon = h.coupon("alice").await;
        let token = h
            .services
            .redemptions
            .issue_token(coupon.id, "alice")
            .await
            .unwrap();

        h.clock.advance(Duration::seconds(6));
        assert!(matches!(
            h.services.redemptions.finalize(&token.code, None).await,
            Err(AppError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_purge_drops_only_expired_unconsumed() {
        let h = Harness::new().await;
        let a = h.coupon("alice").await;
        let b = h.coupon("bob").await;
        let redemptions = &h.services.redemptions;
        redemptions.issue_token(a.id, "alice").await.unwrap();
        h.clock.advance(Duration::seconds(20));
        redemptions.issue_token(b.id, "bob").await.unwrap();

        h.clock.advance(Duration::seconds(15));
        assert_eq!(redemptions.purge_expired(h.now()).await.unwrap(), 1);
        assert_eq!(redemptions.purge_expired(h.now()).await.unwrap(), 0);
    }
}
