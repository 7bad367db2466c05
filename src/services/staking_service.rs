use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait};
use uuid::Uuid;

use crate::config::StakingConfig;
use crate::database::DbPool;
use crate::entities::{promotion_entity, stake_entity};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::{CouponService, state_conflict};
use crate::utils::SharedClock;

/// 质押引擎：锁定期内按档位年化线性计息，到期后才能取回
#[derive(Clone)]
pub struct StakingService {
    pool: DbPool,
    clock: SharedClock,
    coupons: CouponService,
    cfg: StakingConfig,
}

impl StakingService {
    pub fn new(pool: DbPool, clock: SharedClock, coupons: CouponService, cfg: StakingConfig) -> Self {
        Self {
            pool,
            clock,
            coupons,
            cfg,
        }
    }

    fn check_tier(&self, tier_days: i64, apy: f64) -> AppResult<()> {
        let tier = self
            .cfg
            .tiers
            .iter()
            .find(|t| t.days == tier_days)
            .ok_or_else(|| AppError::InvalidAmount(format!("no staking tier of {tier_days} days")))?;
        if (tier.apy - apy).abs() > 1e-9 {
            return Err(AppError::InvalidAmount(format!(
                "tier {tier_days}d pays {}% APY, got {apy}%",
                tier.apy
            )));
        }
        Ok(())
    }

    pub async fn stake(&self, owner_id: &str, request: StakeRequest) -> AppResult<StakePosition> {
        self.check_tier(request.tier_days, request.apy)?;
        let txn = self.pool.begin().await?;
        let coupon = self
            .coupons
            .transition_in(&txn, request.coupon_id, Transition::Stake, Actor::User(owner_id))
            .await
            .map_err(state_conflict)?;
        let promotion = promotion_entity::find(&txn, coupon.promotion_id).await?;

        let now = self.clock.now();
        let position = StakePosition {
            id: Uuid::new_v4(),
            coupon_id: coupon.id,
            owner_id: owner_id.to_string(),
            tier_days: request.tier_days,
            apy: request.apy,
            principal: promotion.original_price,
            staked_at: now,
            unlocks_at: now + Duration::days(request.tier_days),
            accrued_rewards: 0.0,
            accrual_anchor: now,
            last_accrued_at: now,
            claimed_total: 0.0,
            status: StakeStatus::Locked,
            withdrawn_at: None,
        };
        stake_entity::insert(&txn, &position).await?;
        txn.commit().await?;

        log::info!(
            "Coupon {} staked by {owner_id} for {} days at {}% APY",
            coupon.id,
            position.tier_days,
            position.apy
        );
        Ok(position)
    }

    /// 计算并记录截至 `now` 的奖励；返回值不会低于此前的记录。
    /// `now` 不会超过服务时钟，未来时刻按当前时刻计。
    pub async fn accrue(&self, stake_id: Uuid, now: DateTime<Utc>) -> AppResult<f64> {
        let now = now.min(self.clock.now());
        let txn = self.pool.begin().await?;
        let mut position = stake_entity::lock(&txn, stake_id).await?;
        let accrued = position.accrue(now, self.cfg.seconds_per_year);
        stake_entity::update(&txn, &position).await?;
        txn.commit().await?;
        Ok(accrued)
    }

    pub async fn claim_rewards(&self, stake_id: Uuid, actor_id: &str) -> AppResult<ClaimRewardsResponse> {
        let txn = self.pool.begin().await?;
        let mut position = stake_entity::lock(&txn, stake_id).await?;
        if position.owner_id != actor_id {
            return Err(AppError::NotOwner);
        }

        let amount = position.take_rewards(self.clock.now(), self.cfg.seconds_per_year);
        stake_entity::update(&txn, &position).await?;
        txn.commit().await?;

        log::info!("Stake {stake_id} rewards claimed: {amount:.6}");
        Ok(ClaimRewardsResponse { stake_id, amount })
    }

    pub async fn unstake(&self, stake_id: Uuid, actor_id: &str) -> AppResult<Coupon> {
        let txn = self.pool.begin().await?;
        let mut position = stake_entity::lock(&txn, stake_id).await?;
        let now = self.clock.now();

        if position.owner_id != actor_id {
            return Err(AppError::NotOwner);
        }
        if position.status == StakeStatus::Withdrawn {
            return Err(AppError::InvalidState("stake already withdrawn".into()));
        }
        if now < position.unlocks_at {
            return Err(AppError::StillLocked {
                unlocks_at: position.unlocks_at,
            });
        }

        // 先结清到解锁时刻的奖励，取回后冻结但仍可领取
        position.accrue(now, self.cfg.seconds_per_year);
        let coupon = self
            .coupons
            .transition_in(&txn, position.coupon_id, Transition::Unstake, Actor::System)
            .await?;
        position.status = StakeStatus::Withdrawn;
        position.withdrawn_at = Some(now);
        stake_entity::update(&txn, &position).await?;
        txn.commit().await?;

        log::info!("Stake {stake_id} withdrawn, coupon {} active again", coupon.id);
        Ok(coupon)
    }

    pub async fn get(&self, stake_id: Uuid) -> AppResult<StakePosition> {
        let position = stake_entity::find(&self.pool, stake_id).await?;
        Ok(position.view(self.clock.now(), self.cfg.seconds_per_year))
    }

    pub async fn list_by_owner(
        &self,
        owner_id: &str,
        query: &StakeQuery,
    ) -> AppResult<PaginatedResponse<StakePosition>> {
        let now = self.clock.now();
        let items: Vec<StakePosition> = stake_entity::Entity::find()
            .filter(stake_entity::Column::OwnerId.eq(owner_id))
            .order_by_desc(stake_entity::Column::StakedAt)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|m| StakePosition::from(m).view(now, self.cfg.seconds_per_year))
            .collect();

        let params = PaginationParams::new(query.page, query.per_page);
        Ok(PaginatedResponse::paginate(items, &params))
    }
}
