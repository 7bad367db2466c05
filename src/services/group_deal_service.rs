use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, TransactionTrait};
use uuid::Uuid;

use crate::config::GroupDealConfig;
use crate::database::DbPool;
use crate::entities::{coupon_entity, group_deal_entity, promotion_entity};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::CouponService;
use crate::utils::{SharedClock, apply_discount, validate_user_id};

/// 拼团：人数达到门槛解锁更高折扣，到期时冻结折扣并为每位参与者领券
#[derive(Clone)]
pub struct GroupDealService {
    pool: DbPool,
    clock: SharedClock,
    coupons: CouponService,
    cfg: GroupDealConfig,
}

impl GroupDealService {
    pub fn new(pool: DbPool, clock: SharedClock, coupons: CouponService, cfg: GroupDealConfig) -> Self {
        Self {
            pool,
            clock,
            coupons,
            cfg,
        }
    }

    pub async fn create_group_deal(
        &self,
        organizer_id: &str,
        request: CreateGroupDealRequest,
    ) -> AppResult<GroupDeal> {
        validate_user_id(organizer_id)?;
        validate_tiers(&request.tiers, self.cfg.max_tiers)?;
        if request.duration_seconds <= 0 {
            return Err(AppError::ValidationError("duration_seconds must be positive".into()));
        }
        if request.max_participants == Some(0) {
            return Err(AppError::ValidationError("max_participants must be positive".into()));
        }

        let now = self.clock.now();
        let promotion = promotion_entity::find(&self.pool, request.promotion_id).await?;
        if !promotion.is_active {
            return Err(AppError::PromotionInactive);
        }
        if promotion.is_expired(now) {
            return Err(AppError::PromotionExpired);
        }
        // 到期转券按拼团截止时刻校验活动，截止后还要留出转换余量
        let expires_at = now + Duration::seconds(request.duration_seconds);
        let margin = Duration::seconds(self.cfg.conversion_margin_seconds.max(0));
        if expires_at + margin > promotion.expires_at {
            return Err(AppError::ValidationError(format!(
                "group deal must close at least {}s before the promotion expires",
                margin.num_seconds()
            )));
        }

        let deal = GroupDeal {
            id: Uuid::new_v4(),
            promotion_id: promotion.id,
            organizer_id: organizer_id.to_string(),
            tiers: request.tiers,
            participants: Vec::new(),
            current_participants: 0,
            max_participants: request.max_participants,
            expires_at,
            created_at: now,
            frozen_discount: None,
            finalized_at: None,
        };
        group_deal_entity::insert(&self.pool, &deal).await?;

        log::info!(
            "Group deal {} opened on promotion {} until {expires_at}",
            deal.id,
            promotion.id
        );
        Ok(deal)
    }

    /// 重复加入不计数
    pub async fn join(&self, group_deal_id: Uuid, user_id: &str) -> AppResult<GroupDeal> {
        validate_user_id(user_id)?;
        let txn = self.pool.begin().await?;
        let mut deal = group_deal_entity::lock(&txn, group_deal_id).await?;
        let now = self.clock.now();

        if deal.is_expired(now) {
            return Err(AppError::AlreadyExpired);
        }
        if deal.participant(user_id).is_some() {
            return Ok(deal);
        }
        if deal.is_full() {
            return Err(AppError::SupplyExhausted);
        }

        deal.participants.push(GroupParticipant {
            user_id: user_id.to_string(),
            joined_at: now,
            coupon_id: None,
        });
        deal.current_participants += 1;
        group_deal_entity::update(&txn, &deal).await?;
        txn.commit().await?;

        log::info!(
            "{user_id} joined group deal {group_deal_id} ({} participants, {}% unlocked)",
            deal.current_participants,
            deal.active_discount()
        );
        Ok(deal)
    }

    pub async fn active_discount(&self, group_deal_id: Uuid) -> AppResult<u8> {
        Ok(group_deal_entity::find(&self.pool, group_deal_id)
            .await?
            .active_discount())
    }

    pub async fn get(&self, group_deal_id: Uuid) -> AppResult<GroupDealResponse> {
        let deal = group_deal_entity::find(&self.pool, group_deal_id).await?;
        let promotion = promotion_entity::find(&self.pool, deal.promotion_id).await?;
        let active = deal.frozen_discount.unwrap_or_else(|| deal.active_discount());
        let effective = if active > 0 {
            active
        } else {
            promotion.discount_percentage
        };

        Ok(GroupDealResponse {
            effective_price: apply_discount(promotion.original_price, effective),
            active_discount: active,
            group_deal: deal,
        })
    }

    /// 到期后为单个参与者领券；已转换的参与者直接返回原券
    pub async fn convert_to_claim(&self, group_deal_id: Uuid, user_id: &str) -> AppResult<Coupon> {
        let txn = self.pool.begin().await?;
        let mut deal = group_deal_entity::lock(&txn, group_deal_id).await?;
        let now = self.clock.now();

        freeze(&mut deal, now)?;
        let index = deal
            .participants
            .iter()
            .position(|p| p.user_id == user_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("{user_id} did not join group deal {group_deal_id}"))
            })?;
        if let Some(coupon_id) = deal.participants[index].coupon_id {
            return coupon_entity::find(&txn, coupon_id).await;
        }

        let coupon = self.convert_participant(&txn, &mut deal, index).await?;
        group_deal_entity::update(&txn, &deal).await?;
        txn.commit().await?;

        self.coupons.announce_claim(&coupon);
        Ok(coupon)
    }

    /// 冻结折扣并转换全部尚未转换的参与者，单个失败不影响其它人
    pub async fn finalize(&self, group_deal_id: Uuid) -> AppResult<Vec<Coupon>> {
        let txn = self.pool.begin().await?;
        let mut deal = group_deal_entity::lock(&txn, group_deal_id).await?;
        let now = self.clock.now();

        freeze(&mut deal, now)?;
        let mut converted = Vec::new();
        for index in 0..deal.participants.len() {
            if deal.participants[index].coupon_id.is_some() {
                continue;
            }
            // 每位参与者一个保存点，失败只回滚自己的那部分
            let savepoint = txn.begin().await?;
            match self.convert_participant(&savepoint, &mut deal, index).await {
                Ok(coupon) => {
                    savepoint.commit().await?;
                    converted.push(coupon);
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    log::warn!(
                        "Group deal {group_deal_id}: conversion for {} failed: {e}",
                        deal.participants[index].user_id
                    );
                }
            }
        }
        if deal.finalized_at.is_none() {
            deal.finalized_at = Some(now);
        }
        group_deal_entity::update(&txn, &deal).await?;
        txn.commit().await?;

        for coupon in &converted {
            self.coupons.announce_claim(coupon);
        }
        log::info!(
            "Group deal {group_deal_id} finalized at {}%, {} coupons issued",
            deal.frozen_discount.unwrap_or(0),
            converted.len()
        );
        Ok(converted)
    }

    pub async fn finalize_expired(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let due: Vec<Uuid> = group_deal_entity::Entity::find()
            .filter(group_deal_entity::Column::FinalizedAt.is_null())
            .all(&self.pool)
            .await?
            .into_iter()
            .filter(|d| now >= d.expires_at)
            .map(|d| d.id)
            .collect();

        let mut finalized = 0;
        for group_deal_id in due {
            match self.finalize(group_deal_id).await {
                Ok(_) => finalized += 1,
                Err(e) => log::warn!("Finalizing group deal {group_deal_id} deferred: {e}"),
            }
        }
        Ok(finalized)
    }

    /// 以拼团截止时刻为准领券，截止后才转换也不受活动过期影响
    async fn convert_participant(
        &self,
        txn: &DatabaseTransaction,
        deal: &mut GroupDeal,
        index: usize,
    ) -> AppResult<Coupon> {
        // 没有解锁任何档位时按活动原折扣领券
        let discount = deal.frozen_discount.filter(|d| *d > 0);
        let user_id = deal.participants[index].user_id.clone();
        let coupon = self
            .coupons
            .issue_in(txn, deal.promotion_id, &user_id, discount, deal.expires_at)
            .await?;
        deal.participants[index].coupon_id = Some(coupon.id);
        Ok(coupon)
    }
}

/// 首次到期转换时冻结折扣；之后加入的人（若有）不影响已冻结的值
fn freeze(deal: &mut GroupDeal, now: DateTime<Utc>) -> AppResult<u8> {
    if !deal.is_expired(now) {
        return Err(AppError::InvalidState(format!(
            "group deal is open until {}",
            deal.expires_at
        )));
    }
    let active = deal.active_discount();
    Ok(*deal.frozen_discount.get_or_insert(active))
}
