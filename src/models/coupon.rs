use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))", enum_name = "coupon_state")]
pub enum CouponState {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "listed")]
    Listed,
    #[sea_orm(string_value = "staked")]
    Staked,
    #[sea_orm(string_value = "in_auction")]
    InAuction,
    #[sea_orm(string_value = "redeemed")]
    Redeemed,
    #[sea_orm(string_value = "expired")]
    Expired,
}

impl CouponState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CouponState::Redeemed | CouponState::Expired)
    }
}

impl std::fmt::Display for CouponState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CouponState::Active => write!(f, "active"),
            CouponState::Listed => write!(f, "listed"),
            CouponState::Staked => write!(f, "staked"),
            CouponState::InAuction => write!(f, "in_auction"),
            CouponState::Redeemed => write!(f, "redeemed"),
            CouponState::Expired => write!(f, "expired"),
        }
    }
}

/// 状态迁移请求；只有券账本能执行，其它引擎通过它申请
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    List,
    Delist,
    Stake,
    Unstake,
    OpenAuction,
    CloseAuction,
    Redeem,
    Expire,
}

impl Transition {
    pub fn target(self) -> CouponState {
        match self {
            Transition::List => CouponState::Listed,
            Transition::Stake => CouponState::Staked,
            Transition::OpenAuction => CouponState::InAuction,
            Transition::Redeem => CouponState::Redeemed,
            Transition::Expire => CouponState::Expired,
            Transition::Delist | Transition::Unstake | Transition::CloseAuction => {
                CouponState::Active
            }
        }
    }

    pub fn permits(self, from: CouponState) -> bool {
        use CouponState::*;
        match self {
            Transition::List
            | Transition::Stake
            | Transition::OpenAuction
            | Transition::Redeem => from == Active,
            Transition::Delist => from == Listed,
            Transition::Unstake => from == Staked,
            Transition::CloseAuction => from == InAuction,
            Transition::Expire => matches!(from, Active | Listed),
        }
    }

    /// 需要由当前持有人发起的迁移
    pub fn owner_gated(self) -> bool {
        matches!(
            self,
            Transition::List | Transition::Stake | Transition::OpenAuction | Transition::Redeem
        )
    }

    /// 进入这些状态前需要确认活动尚未过期
    pub fn requires_live_promotion(self) -> bool {
        self.owner_gated()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor<'a> {
    User(&'a str),
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransferReason {
    Claim,
    Sale,
    AuctionSettlement,
    BuyNow,
    Gift,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferRecord {
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
    pub reason: TransferReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Coupon {
    pub id: Uuid,
    pub promotion_id: Uuid,
    pub owner_id: String,
    pub state: CouponState,
    pub discount_percentage: u8,
    pub claimed_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub transfer_history: Vec<TransferRecord>,
    pub version: u64,
}

impl Coupon {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CouponQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub state: Option<CouponState>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GiftCouponRequest {
    pub to_user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CouponState; 6] = [
        CouponState::Active,
        CouponState::Listed,
        CouponState::Staked,
        CouponState::InAuction,
        CouponState::Redeemed,
        CouponState::Expired,
    ];

    const TRANSITIONS: [Transition; 8] = [
        Transition::List,
        Transition::Delist,
        Transition::Stake,
        Transition::Unstake,
        Transition::OpenAuction,
        Transition::CloseAuction,
        Transition::Redeem,
        Transition::Expire,
    ];

    #[test]
    fn test_terminal_states_admit_nothing() {
        for t in TRANSITIONS {
            assert!(!t.permits(CouponState::Redeemed), "{t:?} from redeemed");
            assert!(!t.permits(CouponState::Expired), "{t:?} from expired");
        }
    }

    #[test]
    fn test_exclusive_mechanisms_only_start_from_active() {
        for from in ALL {
            let expected = from == CouponState::Active;
            assert_eq!(Transition::List.permits(from), expected);
            assert_eq!(Transition::Stake.permits(from), expected);
            assert_eq!(Transition::OpenAuction.permits(from), expected);
        }
    }

    #[test]
    fn test_expire_covers_active_and_listed_only() {
        let allowed: Vec<_> = ALL
            .into_iter()
            .filter(|s| Transition::Expire.permits(*s))
            .collect();
        assert_eq!(allowed, vec![CouponState::Active, CouponState::Listed]);
    }

    #[test]
    fn test_auction_never_redeems_directly() {
        assert!(!Transition::Redeem.permits(CouponState::InAuction));
        assert_eq!(Transition::CloseAuction.target(), CouponState::Active);
    }
}
