pub mod auction;
pub mod coupon;
pub mod group_deal;
pub mod health;
pub mod listing;
pub mod promotion;
pub mod redemption;
pub mod staking;

pub use auction::auction_config;
pub use coupon::coupon_config;
pub use group_deal::group_deal_config;
pub use health::health_config;
pub use listing::listing_config;
pub use promotion::promotion_config;
pub use redemption::redemption_config;
pub use staking::staking_config;

use actix_web::{HttpMessage, HttpRequest, web};

use crate::error::{AppError, AppResult};
use crate::middlewares::AuthUser;
use crate::services::Services;

/// 认证中间件写入的调用方身份
pub(crate) fn get_user_id_from_request(req: &HttpRequest) -> AppResult<String> {
    req.extensions()
        .get::<AuthUser>()
        .map(|user| user.0.clone())
        .ok_or_else(|| AppError::AuthError("Missing authenticated user".to_string()))
}

/// 把各引擎服务注册为 `web::Data`，供处理函数提取
pub fn register_services(cfg: &mut web::ServiceConfig, services: &Services) {
    cfg.app_data(web::Data::new(services.promotions.clone()))
        .app_data(web::Data::new(services.coupons.clone()))
        .app_data(web::Data::new(services.redemptions.clone()))
        .app_data(web::Data::new(services.listings.clone()))
        .app_data(web::Data::new(services.auctions.clone()))
        .app_data(web::Data::new(services.staking.clone()))
        .app_data(web::Data::new(services.group_deals.clone()));
}

pub fn api_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(promotion_config)
            .configure(coupon_config)
            .configure(redemption_config)
            .configure(listing_config)
            .configure(auction_config)
            .configure(staking_config)
            .configure(group_deal_config),
    );
}
