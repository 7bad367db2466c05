pub mod auction;
pub mod common;
pub mod coupon;
pub mod group_deal;
pub mod listing;
pub mod pagination;
pub mod promotion;
pub mod redemption;
pub mod stake;

pub use auction::*;
pub use common::*;
pub use coupon::*;
pub use group_deal::*;
pub use listing::*;
pub use pagination::*;
pub use promotion::*;
pub use redemption::*;
pub use stake::*;
