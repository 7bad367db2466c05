use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::models::CouponState;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Actor is not the owner")]
    NotOwner,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: CouponState, to: CouponState },

    #[error("Promotion has expired")]
    PromotionExpired,

    #[error("Promotion is inactive")]
    PromotionInactive,

    #[error("Promotion supply exhausted")]
    SupplyExhausted,

    #[error("Redemption token not found")]
    TokenNotFound,

    #[error("Redemption token expired")]
    TokenExpired,

    #[error("Redemption token already consumed")]
    TokenAlreadyConsumed,

    #[error("Listing is not active")]
    ListingNotActive,

    #[error("Cannot buy your own listing")]
    SelfPurchase,

    #[error("Auction has ended")]
    AuctionEnded,

    #[error("Bid must be higher than current bid {current}")]
    BidTooLow { current: i64 },

    #[error("Cannot bid on your own auction")]
    SelfBid,

    #[error("Stake is locked until {unlocks_at}")]
    StillLocked { unlocks_at: DateTime<Utc> },

    #[error("Group deal has already expired")]
    AlreadyExpired,

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Settlement unavailable: {0}")]
    SettlementUnavailable(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),
}

impl AppError {
    /// 稳定的错误码，客户端据此分支
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::NotOwner => "NOT_OWNER",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::PromotionExpired => "PROMOTION_EXPIRED",
            AppError::PromotionInactive => "PROMOTION_INACTIVE",
            AppError::SupplyExhausted => "SUPPLY_EXHAUSTED",
            AppError::TokenNotFound => "TOKEN_NOT_FOUND",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::TokenAlreadyConsumed => "ALREADY_CONSUMED",
            AppError::ListingNotActive => "LISTING_NOT_ACTIVE",
            AppError::SelfPurchase => "SELF_PURCHASE",
            AppError::AuctionEnded => "AUCTION_ENDED",
            AppError::BidTooLow { .. } => "BID_TOO_LOW",
            AppError::SelfBid => "SELF_BID",
            AppError::StillLocked { .. } => "STILL_LOCKED",
            AppError::AlreadyExpired => "ALREADY_EXPIRED",
            AppError::InvalidPrice(_) => "INVALID_PRICE",
            AppError::InvalidAmount(_) => "INVALID_AMOUNT",
            AppError::SettlementUnavailable(_) => "SETTLEMENT_UNAVAILABLE",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) | AppError::JwtError(_) => "AUTH_ERROR",
            AppError::ExternalApiError(_) | AppError::ReqwestError(_) => "EXTERNAL_API_ERROR",
            AppError::ConfigError(_)
            | AppError::InternalError(_)
            | AppError::SerdeJsonError(_) => "INTERNAL_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::TokenNotFound => StatusCode::NOT_FOUND,
            AppError::NotOwner => StatusCode::FORBIDDEN,
            AppError::AuthError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidState(_)
            | AppError::InvalidTransition { .. }
            | AppError::ListingNotActive
            | AppError::AuctionEnded
            | AppError::BidTooLow { .. }
            | AppError::StillLocked { .. }
            | AppError::SupplyExhausted
            | AppError::TokenAlreadyConsumed => StatusCode::CONFLICT,
            AppError::PromotionExpired | AppError::TokenExpired | AppError::AlreadyExpired => {
                StatusCode::GONE
            }
            AppError::PromotionInactive
            | AppError::SelfPurchase
            | AppError::SelfBid
            | AppError::InvalidPrice(_)
            | AppError::InvalidAmount(_)
            | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::SettlementUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ExternalApiError(_) | AppError::ReqwestError(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigError(_)
            | AppError::InternalError(_)
            | AppError::SerdeJsonError(_)
            | AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let message = if status_code.is_server_error() {
            log::error!("{}: {self}", self.code());
            match self {
                AppError::SettlementUnavailable(_)
                | AppError::ExternalApiError(_)
                | AppError::ReqwestError(_) => self.to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            log::warn!("Rejected request ({}): {self}", self.code());
            self.to_string()
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message
            }
        }))
    }
}
