use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Listing {
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub seller_id: String,
    pub price: i64, // 美分
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub buyer_id: Option<String>,
    pub sold_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateListingRequest {
    pub coupon_id: Uuid,
    pub price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub seller_id: Option<String>,
}
