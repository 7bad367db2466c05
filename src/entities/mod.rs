pub mod auctions;
pub mod coupons;
pub mod group_deals;
pub mod listings;
pub mod promotions;
pub mod redemption_tokens;
pub mod stakes;

pub use auctions as auction_entity;
pub use coupons as coupon_entity;
pub use group_deals as group_deal_entity;
pub use listings as listing_entity;
pub use promotions as promotion_entity;
pub use redemption_tokens as redemption_token_entity;
pub use stakes as stake_entity;
