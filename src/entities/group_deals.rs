use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{QuerySelect, Set};

use crate::error::{AppError, AppResult};
use crate::models::GroupDeal;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "group_deals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub promotion_id: Uuid,
    pub organizer_id: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub tiers: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub participants: Json,
    pub current_participants: i32,
    pub max_participants: Option<i32>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub frozen_discount: Option<i16>,
    pub finalized_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for GroupDeal {
    type Error = AppError;

    fn try_from(m: Model) -> AppResult<Self> {
        Ok(GroupDeal {
            id: m.id,
            promotion_id: m.promotion_id,
            organizer_id: m.organizer_id,
            tiers: serde_json::from_value(m.tiers)?,
            participants: serde_json::from_value(m.participants)?,
            current_participants: m.current_participants as u32,
            max_participants: m.max_participants.map(|v| v as u32),
            expires_at: m.expires_at,
            created_at: m.created_at,
            frozen_discount: m.frozen_discount.map(|v| v as u8),
            finalized_at: m.finalized_at,
        })
    }
}

impl TryFrom<&GroupDeal> for ActiveModel {
    type Error = AppError;

    fn try_from(g: &GroupDeal) -> AppResult<Self> {
        Ok(ActiveModel {
            id: Set(g.id),
            promotion_id: Set(g.promotion_id),
            organizer_id: Set(g.organizer_id.clone()),
            tiers: Set(serde_json::to_value(&g.tiers)?),
            participants: Set(serde_json::to_value(&g.participants)?),
            current_participants: Set(g.current_participants as i32),
            max_participants: Set(g.max_participants.map(|v| v as i32)),
            expires_at: Set(g.expires_at),
            created_at: Set(g.created_at),
            frozen_discount: Set(g.frozen_discount.map(i16::from)),
            finalized_at: Set(g.finalized_at),
        })
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("group deal {id} not found"))
}

pub async fn find<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<GroupDeal> {
    Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| not_found(id))?
        .try_into()
}

/// 行锁读取（SELECT ... FOR UPDATE），锁持有到事务结束
pub async fn lock<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<GroupDeal> {
    Entity::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| not_found(id))?
        .try_into()
}

pub async fn insert<C: ConnectionTrait>(conn: &C, deal: &GroupDeal) -> AppResult<()> {
    ActiveModel::try_from(deal)?.insert(conn).await?;
    Ok(())
}

pub async fn update<C: ConnectionTrait>(conn: &C, deal: &GroupDeal) -> AppResult<()> {
    ActiveModel::try_from(deal)?.update(conn).await?;
    Ok(())
}
