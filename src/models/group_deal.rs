use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroupDealTier {
    pub participant_threshold: u32,
    pub discount_percentage: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroupParticipant {
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
    pub coupon_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroupDeal {
    pub id: Uuid,
    pub promotion_id: Uuid,
    pub organizer_id: String,
    pub tiers: Vec<GroupDealTier>,
    pub participants: Vec<GroupParticipant>,
    pub current_participants: u32,
    pub max_participants: Option<u32>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// 到期时冻结的折扣，之后的转换都按此值
    pub frozen_discount: Option<u8>,
    pub finalized_at: Option<DateTime<Utc>>,
}

/// 阈值与折扣都必须严格递增
pub fn validate_tiers(tiers: &[GroupDealTier], max_tiers: usize) -> AppResult<()> {
    if tiers.is_empty() {
        return Err(AppError::ValidationError("at least one tier is required".into()));
    }
    if tiers.len() > max_tiers {
        return Err(AppError::ValidationError(format!(
            "at most {max_tiers} tiers are allowed"
        )));
    }
    for tier in tiers {
        if tier.participant_threshold == 0 {
            return Err(AppError::ValidationError("tier threshold must be positive".into()));
        }
        if tier.discount_percentage > 100 {
            return Err(AppError::ValidationError("tier discount exceeds 100%".into()));
        }
    }
    for pair in tiers.windows(2) {
        if pair[1].participant_threshold <= pair[0].participant_threshold
            || pair[1].discount_percentage <= pair[0].discount_percentage
        {
            return Err(AppError::ValidationError(
                "tiers must strictly increase in threshold and discount".into(),
            ));
        }
    }
    Ok(())
}

/// 取已达到门槛的最高档折扣；一档都没达到时为 0
pub fn active_discount(tiers: &[GroupDealTier], participants: u32) -> u8 {
    tiers
        .iter()
        .filter(|t| t.participant_threshold <= participants)
        .map(|t| t.discount_percentage)
        .max()
        .unwrap_or(0)
}

impl GroupDeal {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn active_discount(&self) -> u8 {
        active_discount(&self.tiers, self.current_participants)
    }

    pub fn participant(&self, user_id: &str) -> Option<&GroupParticipant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.max_participants
            .is_some_and(|max| self.current_participants >= max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateGroupDealRequest {
    pub promotion_id: Uuid,
    pub tiers: Vec<GroupDealTier>,
    pub max_participants: Option<u32>,
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroupDealResponse {
    pub group_deal: GroupDeal,
    pub active_discount: u8,
    /// 按当前档位折扣计算的成交价(美分)
    pub effective_price: i64,
}
