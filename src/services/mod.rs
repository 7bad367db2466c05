pub mod auction_service;
pub mod coupon_service;
pub mod group_deal_service;
pub mod listing_service;
pub mod promotion_service;
pub mod redemption_service;
pub mod staking_service;

pub use auction_service::*;
pub use coupon_service::*;
pub use group_deal_service::*;
pub use listing_service::*;
pub use promotion_service::*;
pub use redemption_service::*;
pub use staking_service::*;

use crate::config::Config;
use crate::database::DbPool;
use crate::error::AppError;
use crate::external::{RewardPublisher, SettlementClient};
use crate::utils::SharedClock;

/// 所有引擎共用同一个存储、时钟与券账本
#[derive(Clone)]
pub struct Services {
    pub promotions: PromotionService,
    pub coupons: CouponService,
    pub redemptions: RedemptionService,
    pub listings: ListingService,
    pub auctions: AuctionService,
    pub staking: StakingService,
    pub group_deals: GroupDealService,
}

impl Services {
    pub fn new(
        config: &Config,
        pool: DbPool,
        clock: SharedClock,
        rewards: RewardPublisher,
        settlement: SettlementClient,
    ) -> Self {
        let coupons = CouponService::new(pool.clone(), clock.clone(), rewards.clone());
        Self {
            promotions: PromotionService::new(pool.clone(), clock.clone()),
            redemptions: RedemptionService::new(
                pool.clone(),
                clock.clone(),
                coupons.clone(),
                rewards,
                &config.redemption,
            ),
            listings: ListingService::new(
                pool.clone(),
                clock.clone(),
                coupons.clone(),
                settlement.clone(),
            ),
            auctions: AuctionService::new(
                pool.clone(),
                clock.clone(),
                coupons.clone(),
                settlement,
                config.auction.clone(),
            ),
            staking: StakingService::new(
                pool.clone(),
                clock.clone(),
                coupons.clone(),
                config.staking.clone(),
            ),
            group_deals: GroupDealService::new(
                pool,
                clock,
                coupons.clone(),
                config.group_deal.clone(),
            ),
            coupons,
        }
    }
}

/// 引擎入口处"券不是 Active"统一报告为 InvalidState
pub(crate) fn state_conflict(err: AppError) -> AppError {
    match err {
        AppError::InvalidTransition { from, .. } => {
            AppError::InvalidState(format!("coupon is {from}, expected active"))
        }
        other => other,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::Services;
    use crate::config::{Config, DatabaseConfig};
    use crate::database::{create_pool, run_migrations};
    use crate::external::{RewardEvent, RewardPublisher, SettlementClient};
    use crate::models::{Coupon, CreatePromotionRequest, Promotion};
    use crate::utils::{Clock, ManualClock};

    pub struct Harness {
        pub services: Services,
        pub clock: ManualClock,
        pub rewards_rx: UnboundedReceiver<RewardEvent>,
    }

    impl Harness {
        pub const MERCHANT: &'static str = "merchant";
        pub const DISCOUNT: u8 = 15;

        pub async fn new() -> Self {
            Self::with_config(Config::default()).await
        }

        /// 每个测试一个独立的内存库；单连接保证各语句看到同一个库
        pub async fn with_config(mut config: Config) -> Self {
            config.database = DatabaseConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
                min_connections: 1,
            };
            let pool = create_pool(&config.database).await.unwrap();
            run_migrations(&pool).await.unwrap();
            let settlement = SettlementClient::new(config.settlement.clone()).unwrap();

            let start = Utc
                .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_else(Utc::now);
            let clock = ManualClock::new(start);
            let (rewards, rewards_rx) = RewardPublisher::channel();
            let services = Services::new(
                &config,
                pool,
                Arc::new(clock.clone()),
                rewards,
                settlement,
            );
            Self {
                services,
                clock,
                rewards_rx,
            }
        }

        pub fn now(&self) -> DateTime<Utc> {
            self.clock.now()
        }

        pub async fn promotion_expiring(&self, max_supply: u32, ttl: Duration) -> Promotion {
            self.services
                .promotions
                .create_promotion(
                    Self::MERCHANT,
                    CreatePromotionRequest {
                        title: "Lunch set".into(),
                        discount_percentage: Self::DISCOUNT,
                        original_price: 1000,
                        max_supply,
                        expires_at: self.now() + ttl,
                    },
                )
                .await
                .unwrap()
        }

        pub async fn promotion(&self, max_supply: u32) -> Promotion {
            self.promotion_expiring(max_supply, Duration::days(365)).await
        }

        /// 新建活动并为 `owner` 领取一张券
        pub async fn coupon(&self, owner: &str) -> Coupon {
            let promotion = self.promotion(100).await;
            self.services
                .coupons
                .claim(promotion.id, owner)
                .await
                .unwrap()
        }
    }
}
