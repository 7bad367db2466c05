use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{QuerySelect, Set};

use crate::error::AppResult;
use crate::models::RedemptionToken;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "redemption_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub coupon_id: Uuid,
    pub owner_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub consumed_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for RedemptionToken {
    fn from(m: Model) -> Self {
        RedemptionToken {
            code: m.code,
            coupon_id: m.coupon_id,
            owner_id: m.owner_id,
            issued_at: m.issued_at,
            expires_at: m.expires_at,
            consumed: m.consumed,
            consumed_at: m.consumed_at,
        }
    }
}

impl From<&RedemptionToken> for ActiveModel {
    fn from(t: &RedemptionToken) -> Self {
        ActiveModel {
            code: Set(t.code.clone()),
            coupon_id: Set(t.coupon_id),
            owner_id: Set(t.owner_id.clone()),
            issued_at: Set(t.issued_at),
            expires_at: Set(t.expires_at),
            consumed: Set(t.consumed),
            consumed_at: Set(t.consumed_at),
        }
    }
}

/// 找不到时返回 `None`，由调用方决定错误类型
pub async fn find<C: ConnectionTrait>(conn: &C, code: &str) -> AppResult<Option<RedemptionToken>> {
    let model = Entity::find_by_id(code.to_string()).one(conn).await?;
    Ok(model.map(Into::into))
}

pub async fn lock<C: ConnectionTrait>(conn: &C, code: &str) -> AppResult<Option<RedemptionToken>> {
    let model = Entity::find_by_id(code.to_string())
        .lock_exclusive()
        .one(conn)
        .await?;
    Ok(model.map(Into::into))
}

pub async fn exists<C: ConnectionTrait>(conn: &C, code: &str) -> AppResult<bool> {
    Ok(Entity::find_by_id(code.to_string()).one(conn).await?.is_some())
}

pub async fn insert<C: ConnectionTrait>(conn: &C, token: &RedemptionToken) -> AppResult<()> {
    ActiveModel::from(token).insert(conn).await?;
    Ok(())
}

pub async fn update<C: ConnectionTrait>(conn: &C, token: &RedemptionToken) -> AppResult<()> {
    ActiveModel::from(token).update(conn).await?;
    Ok(())
}
