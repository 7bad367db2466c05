use chrono::{DateTime, Duration, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Coupon;

/// 持久化的只有 Live / Ended / Settled，EndingSoon 仅在读取时推导
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))", enum_name = "auction_status")]
pub enum AuctionStatus {
    #[sea_orm(string_value = "live")]
    Live,
    #[sea_orm(string_value = "ending_soon")]
    EndingSoon,
    #[sea_orm(string_value = "ended")]
    Ended,
    #[sea_orm(string_value = "settled")]
    Settled,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Bid {
    pub bidder_id: String,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Auction {
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub seller_id: String,
    pub starting_price: i64,
    pub reserve_price: i64,
    pub buy_now_price: Option<i64>,
    pub current_bid: i64,
    pub highest_bidder_id: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub extend_on_bid: bool,
    pub extension_seconds: i64,
    pub bids: Vec<Bid>,
    pub status: AuctionStatus,
    pub winner_id: Option<String>,
    pub final_price: Option<i64>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Auction {
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == AuctionStatus::Live && now < self.ends_at
    }

    pub fn reserve_met(&self) -> bool {
        self.highest_bidder_id.is_some() && self.current_bid >= self.reserve_price
    }

    /// 防狙击：剩余时间不足一个延长窗口时，截止时间顺延一个窗口
    pub fn extended_deadline(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let window = Duration::seconds(self.extension_seconds);
        (self.extend_on_bid && self.ends_at - now < window).then(|| self.ends_at + window)
    }

    pub fn view_status(&self, now: DateTime<Utc>, ending_soon_seconds: i64) -> AuctionStatus {
        // 已过截止但尚未结算的拍卖仍显示 Live，等待结算
        let closing = now < self.ends_at
            && self.ends_at - now <= Duration::seconds(ending_soon_seconds);
        match self.status {
            AuctionStatus::Live if closing => AuctionStatus::EndingSoon,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAuctionRequest {
    pub coupon_id: Uuid,
    pub starting_price: i64,
    pub reserve_price: i64,
    pub buy_now_price: Option<i64>,
    pub duration_seconds: i64,
    #[serde(default)]
    pub extend_on_bid: bool,
    pub extension_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlaceBidRequest {
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SettleAuctionResponse {
    pub auction: Auction,
    pub coupon: Option<Coupon>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuctionQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
