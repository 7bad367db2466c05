use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{QuerySelect, Set};

use crate::error::{AppError, AppResult};
use crate::models::Listing;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub seller_id: String,
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub buyer_id: Option<String>,
    pub sold_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Listing {
    fn from(m: Model) -> Self {
        Listing {
            id: m.id,
            coupon_id: m.coupon_id,
            seller_id: m.seller_id,
            price: m.price,
            created_at: m.created_at,
            is_active: m.is_active,
            buyer_id: m.buyer_id,
            sold_at: m.sold_at,
            payment_reference: m.payment_reference,
        }
    }
}

impl From<&Listing> for ActiveModel {
    fn from(l: &Listing) -> Self {
        ActiveModel {
            id: Set(l.id),
            coupon_id: Set(l.coupon_id),
            seller_id: Set(l.seller_id.clone()),
            price: Set(l.price),
            created_at: Set(l.created_at),
            is_active: Set(l.is_active),
            buyer_id: Set(l.buyer_id.clone()),
            sold_at: Set(l.sold_at),
            payment_reference: Set(l.payment_reference.clone()),
        }
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("listing {id} not found"))
}

pub async fn find<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Listing> {
    let model = Entity::find_by_id(id).one(conn).await?.ok_or_else(|| not_found(id))?;
    Ok(model.into())
}

/// 行锁读取（SELECT ... FOR UPDATE），锁持有到事务结束
pub async fn lock<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Listing> {
    let model = Entity::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(model.into())
}

pub async fn insert<C: ConnectionTrait>(conn: &C, listing: &Listing) -> AppResult<()> {
    ActiveModel::from(listing).insert(conn).await?;
    Ok(())
}

pub async fn update<C: ConnectionTrait>(conn: &C, listing: &Listing) -> AppResult<()> {
    ActiveModel::from(listing).update(conn).await?;
    Ok(())
}
