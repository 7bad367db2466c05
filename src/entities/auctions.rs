use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{QuerySelect, Set};

use crate::error::{AppError, AppResult};
use crate::models::{Auction, AuctionStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "auctions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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
    #[sea_orm(column_type = "JsonBinary")]
    pub bids: Json,
    pub status: AuctionStatus,
    pub winner_id: Option<String>,
    pub final_price: Option<i64>,
    pub settled_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Auction {
    type Error = AppError;

    fn try_from(m: Model) -> AppResult<Self> {
        Ok(Auction {
            id: m.id,
            coupon_id: m.coupon_id,
            seller_id: m.seller_id,
            starting_price: m.starting_price,
            reserve_price: m.reserve_price,
            buy_now_price: m.buy_now_price,
            current_bid: m.current_bid,
            highest_bidder_id: m.highest_bidder_id,
            starts_at: m.starts_at,
            ends_at: m.ends_at,
            extend_on_bid: m.extend_on_bid,
            extension_seconds: m.extension_seconds,
            bids: serde_json::from_value(m.bids)?,
            status: m.status,
            winner_id: m.winner_id,
            final_price: m.final_price,
            settled_at: m.settled_at,
        })
    }
}

impl TryFrom<&Auction> for ActiveModel {
    type Error = AppError;

    fn try_from(a: &Auction) -> AppResult<Self> {
        Ok(ActiveModel {
            id: Set(a.id),
            coupon_id: Set(a.coupon_id),
            seller_id: Set(a.seller_id.clone()),
            starting_price: Set(a.starting_price),
            reserve_price: Set(a.reserve_price),
            buy_now_price: Set(a.buy_now_price),
            current_bid: Set(a.current_bid),
            highest_bidder_id: Set(a.highest_bidder_id.clone()),
            starts_at: Set(a.starts_at),
            ends_at: Set(a.ends_at),
            extend_on_bid: Set(a.extend_on_bid),
            extension_seconds: Set(a.extension_seconds),
            bids: Set(serde_json::to_value(&a.bids)?),
            status: Set(a.status),
            winner_id: Set(a.winner_id.clone()),
            final_price: Set(a.final_price),
            settled_at: Set(a.settled_at),
        })
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("auction {id} not found"))
}

pub async fn find<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Auction> {
    Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| not_found(id))?
        .try_into()
}

/// 行锁读取（SELECT ... FOR UPDATE），锁持有到事务结束
pub async fn lock<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Auction> {
    Entity::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| not_found(id))?
        .try_into()
}

pub async fn insert<C: ConnectionTrait>(conn: &C, auction: &Auction) -> AppResult<()> {
    ActiveModel::try_from(auction)?.insert(conn).await?;
    Ok(())
}

pub async fn update<C: ConnectionTrait>(conn: &C, auction: &Auction) -> AppResult<()> {
    ActiveModel::try_from(auction)?.update(conn).await?;
    Ok(())
}
