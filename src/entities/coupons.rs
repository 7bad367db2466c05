use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{QuerySelect, Set};

use crate::error::{AppError, AppResult};
use crate::models::{Coupon, CouponState};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub promotion_id: Uuid,
    pub owner_id: String,
    pub state: CouponState,
    pub discount_percentage: i16,
    pub claimed_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "JsonBinary")]
    pub transfer_history: Json,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Coupon {
    type Error = AppError;

    fn try_from(m: Model) -> AppResult<Self> {
        Ok(Coupon {
            id: m.id,
            promotion_id: m.promotion_id,
            owner_id: m.owner_id,
            state: m.state,
            discount_percentage: m.discount_percentage as u8,
            claimed_at: m.claimed_at,
            redeemed_at: m.redeemed_at,
            transfer_history: serde_json::from_value(m.transfer_history)?,
            version: m.version as u64,
        })
    }
}

impl TryFrom<&Coupon> for ActiveModel {
    type Error = AppError;

    fn try_from(c: &Coupon) -> AppResult<Self> {
        Ok(ActiveModel {
            id: Set(c.id),
            promotion_id: Set(c.promotion_id),
            owner_id: Set(c.owner_id.clone()),
            state: Set(c.state),
            discount_percentage: Set(c.discount_percentage as i16),
            claimed_at: Set(c.claimed_at),
            redeemed_at: Set(c.redeemed_at),
            transfer_history: Set(serde_json::to_value(&c.transfer_history)?),
            version: Set(c.version as i64),
        })
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("coupon {id} not found"))
}

pub async fn find<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Coupon> {
    Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| not_found(id))?
        .try_into()
}

/// 行锁读取（SELECT ... FOR UPDATE），锁持有到事务结束
pub async fn lock<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Coupon> {
    Entity::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| not_found(id))?
        .try_into()
}

pub async fn insert<C: ConnectionTrait>(conn: &C, coupon: &Coupon) -> AppResult<()> {
    ActiveModel::try_from(coupon)?.insert(conn).await?;
    Ok(())
}

pub async fn update<C: ConnectionTrait>(conn: &C, coupon: &Coupon) -> AppResult<()> {
    ActiveModel::try_from(coupon)?.update(conn).await?;
    Ok(())
}

pub fn into_coupons(models: Vec<Model>) -> AppResult<Vec<Coupon>> {
    models.into_iter().map(Coupon::try_from).collect()
}
