use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{QuerySelect, Set};

use crate::error::{AppError, AppResult};
use crate::models::Promotion;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub merchant_id: String,
    pub title: String,
    pub discount_percentage: i16,
    pub original_price: i64,
    pub max_supply: i32,
    pub current_supply: i32,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Promotion {
    fn from(m: Model) -> Self {
        Promotion {
            id: m.id,
            merchant_id: m.merchant_id,
            title: m.title,
            discount_percentage: m.discount_percentage as u8,
            original_price: m.original_price,
            max_supply: m.max_supply as u32,
            current_supply: m.current_supply as u32,
            expires_at: m.expires_at,
            is_active: m.is_active,
            version: m.version as u32,
            created_at: m.created_at,
        }
    }
}

impl From<&Promotion> for ActiveModel {
    fn from(p: &Promotion) -> Self {
        ActiveModel {
            id: Set(p.id),
            merchant_id: Set(p.merchant_id.clone()),
            title: Set(p.title.clone()),
            discount_percentage: Set(p.discount_percentage as i16),
            original_price: Set(p.original_price),
            max_supply: Set(p.max_supply as i32),
            current_supply: Set(p.current_supply as i32),
            expires_at: Set(p.expires_at),
            is_active: Set(p.is_active),
            version: Set(p.version as i32),
            created_at: Set(p.created_at),
        }
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("promotion {id} not found"))
}

pub async fn find<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Promotion> {
    let model = Entity::find_by_id(id).one(conn).await?.ok_or_else(|| not_found(id))?;
    Ok(model.into())
}

/// 行锁读取（SELECT ... FOR UPDATE），锁持有到事务结束
pub async fn lock<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Promotion> {
    let model = Entity::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(model.into())
}

pub async fn insert<C: ConnectionTrait>(conn: &C, promotion: &Promotion) -> AppResult<()> {
    ActiveModel::from(promotion).insert(conn).await?;
    Ok(())
}

pub async fn update<C: ConnectionTrait>(conn: &C, promotion: &Promotion) -> AppResult<()> {
    ActiveModel::from(promotion).update(conn).await?;
    Ok(())
}
