use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// 一次性核销码；同一张券同一时刻最多一个未使用的码
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RedemptionToken {
    pub code: String,
    pub coupon_id: Uuid,
    pub owner_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl RedemptionToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinalizeRedemptionRequest {
    pub code: String,
}
