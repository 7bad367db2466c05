use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{QuerySelect, Set};

use crate::error::{AppError, AppResult};
use crate::models::{StakePosition, StakeStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stakes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub owner_id: String,
    pub tier_days: i64,
    pub apy: f64,
    pub principal: i64,
    pub staked_at: DateTime<Utc>,
    pub unlocks_at: DateTime<Utc>,
    pub accrued_rewards: f64,
    pub accrual_anchor: DateTime<Utc>,
    pub last_accrued_at: DateTime<Utc>,
    pub claimed_total: f64,
    pub status: StakeStatus,
    pub withdrawn_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for StakePosition {
    fn from(m: Model) -> Self {
        StakePosition {
            id: m.id,
            coupon_id: m.coupon_id,
            owner_id: m.owner_id,
            tier_days: m.tier_days,
            apy: m.apy,
            principal: m.principal,
            staked_at: m.staked_at,
            unlocks_at: m.unlocks_at,
            accrued_rewards: m.accrued_rewards,
            accrual_anchor: m.accrual_anchor,
            last_accrued_at: m.last_accrued_at,
            claimed_total: m.claimed_total,
            status: m.status,
            withdrawn_at: m.withdrawn_at,
        }
    }
}

impl From<&StakePosition> for ActiveModel {
    fn from(s: &StakePosition) -> Self {
        ActiveModel {
            id: Set(s.id),
            coupon_id: Set(s.coupon_id),
            owner_id: Set(s.owner_id.clone()),
            tier_days: Set(s.tier_days),
            apy: Set(s.apy),
            principal: Set(s.principal),
            staked_at: Set(s.staked_at),
            unlocks_at: Set(s.unlocks_at),
            accrued_rewards: Set(s.accrued_rewards),
            accrual_anchor: Set(s.accrual_anchor),
            last_accrued_at: Set(s.last_accrued_at),
            claimed_total: Set(s.claimed_total),
            status: Set(s.status),
            withdrawn_at: Set(s.withdrawn_at),
        }
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("stake {id} not found"))
}

pub async fn find<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<StakePosition> {
    let model = Entity::find_by_id(id).one(conn).await?.ok_or_else(|| not_found(id))?;
    Ok(model.into())
}

/// 行锁读取（SELECT ... FOR UPDATE），锁持有到事务结束
pub async fn lock<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<StakePosition> {
    let model = Entity::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(model.into())
}

pub async fn insert<C: ConnectionTrait>(conn: &C, stake: &StakePosition) -> AppResult<()> {
    ActiveModel::from(stake).insert(conn).await?;
    Ok(())
}

pub async fn update<C: ConnectionTrait>(conn: &C, stake: &StakePosition) -> AppResult<()> {
    ActiveModel::from(stake).update(conn).await?;
    Ok(())
}
