//! Background scheduled tasks for the application.
//!
//! Every sweep here is idempotent and only tidies up state that the request
//! path already evaluates lazily against the clock, so their timing never
//! affects correctness. Call `spawn_all` once during startup.

use std::time::Duration;

use crate::config::TasksConfig;
use crate::services::Services;
use crate::utils::SharedClock;

/// Spawn all background tasks.
///
/// Tasks are detached via `tokio::spawn`; this function does not block.
pub fn spawn_all(services: Services, clock: SharedClock, cfg: &TasksConfig) {
    let interval = Duration::from_secs(cfg.sweep_interval_seconds.max(1));

    // 活动过期清扫 + 失效挂单下架
    {
        let coupons = services.coupons.clone();
        let listings = services.listings.clone();
        let clock = clock.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = coupons.expire_sweep(clock.now()).await {
                    log::error!("Failed to sweep expired coupons: {e:?}");
                }
                if let Err(e) = listings.prune_stale().await {
                    log::error!("Failed to prune stale listings: {e:?}");
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    // 到期拍卖结算
    {
        let auctions = services.auctions.clone();
        let clock = clock.clone();
        tokio::spawn(async move {
            loop {
                match auctions.settle_due(clock.now()).await {
                    Ok(n) if n > 0 => log::info!("Auctions settled: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to settle due auctions: {e:?}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    // 到期拼团转换
    {
        let group_deals = services.group_deals.clone();
        let clock = clock.clone();
        tokio::spawn(async move {
            loop {
                match group_deals.finalize_expired(clock.now()).await {
                    Ok(n) if n > 0 => log::info!("Group deals finalized: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to finalize expired group deals: {e:?}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    // 清理过期核销码
    {
        let redemptions = services.redemptions.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = redemptions.purge_expired(clock.now()).await {
                    log::error!("Failed to purge redemption tokens: {e:?}");
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}
