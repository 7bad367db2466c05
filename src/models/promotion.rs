use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// 商户发布的优惠活动；任何条款变更都会递增 `version`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Promotion {
    pub id: Uuid,
    pub merchant_id: String,
    pub title: String,
    pub discount_percentage: u8,
    pub original_price: i64, // 原价(美分)
    pub max_supply: u32,
    pub current_supply: u32,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

impl Promotion {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn remaining_supply(&self) -> u32 {
        self.max_supply.saturating_sub(self.current_supply)
    }

    /// 为一次领取占用库存，`current_supply` 只增不减
    pub fn reserve_one(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if !self.is_active {
            return Err(AppError::PromotionInactive);
        }
        if self.is_expired(now) {
            return Err(AppError::PromotionExpired);
        }
        if self.current_supply >= self.max_supply {
            return Err(AppError::SupplyExhausted);
        }
        self.current_supply += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePromotionRequest {
    pub title: String,
    pub discount_percentage: u8,
    pub original_price: i64,
    pub max_supply: u32,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromotionQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub merchant_id: Option<String>,
    pub active_only: Option<bool>,
}
