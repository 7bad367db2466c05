use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait};
use uuid::Uuid;

use crate::database::DbPool;
use crate::entities::promotion_entity;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::{SharedClock, validate_percentage, validate_price, validate_user_id};

/// 活动目录。核心只读；创建/下架是面向商户的上游入口。
#[derive(Clone)]
pub struct PromotionService {
    pool: DbPool,
    clock: SharedClock,
}

impl PromotionService {
    pub fn new(pool: DbPool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    pub async fn create_promotion(
        &self,
        merchant_id: &str,
        request: CreatePromotionRequest,
    ) -> AppResult<Promotion> {
        validate_user_id(merchant_id)?;
        validate_percentage(request.discount_percentage)?;
        validate_price(request.original_price)?;
        if request.title.trim().is_empty() {
            return Err(AppError::ValidationError("title must not be empty".into()));
        }
        if request.max_supply == 0 {
            return Err(AppError::ValidationError("max_supply must be positive".into()));
        }
        let now = self.clock.now();
        if request.expires_at <= now {
            return Err(AppError::ValidationError(
                "expires_at must be in the future".into(),
            ));
        }

        let promotion = Promotion {
            id: Uuid::new_v4(),
            merchant_id: merchant_id.to_string(),
            title: request.title.trim().to_string(),
            discount_percentage: request.discount_percentage,
            original_price: request.original_price,
            max_supply: request.max_supply,
            current_supply: 0,
            expires_at: request.expires_at,
            is_active: true,
            version: 1,
            created_at: now,
        };
        promotion_entity::insert(&self.pool, &promotion).await?;

        log::info!(
            "Promotion {} created by {merchant_id} (supply {})",
            promotion.id,
            promotion.max_supply
        );
        Ok(promotion)
    }

    pub async fn get(&self, promotion_id: Uuid) -> AppResult<Promotion> {
        promotion_entity::find(&self.pool, promotion_id).await
    }

    pub async fn list(&self, query: &PromotionQuery) -> AppResult<PaginatedResponse<Promotion>> {
        let now = self.clock.now();
        let mut base_query = promotion_entity::Entity::find();
        if let Some(merchant_id) = &query.merchant_id {
            base_query =
                base_query.filter(promotion_entity::Column::MerchantId.eq(merchant_id.as_str()));
        }
        if query.active_only.unwrap_or(false) {
            base_query = base_query.filter(promotion_entity::Column::IsActive.eq(true));
        }

        // 过期判断在内存中按时钟完成
        let items: Vec<Promotion> = base_query
            .order_by_desc(promotion_entity::Column::CreatedAt)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(Promotion::from)
            .filter(|p| !query.active_only.unwrap_or(false) || !p.is_expired(now))
            .collect();

        let params = PaginationParams::new(query.page, query.per_page);
        Ok(PaginatedResponse::paginate(items, &params))
    }

    /// 商户下架活动：已发出的券不受影响，但不再允许领取
    pub async fn deactivate(&self, promotion_id: Uuid, merchant_id: &str) -> AppResult<Promotion> {
        let txn = self.pool.begin().await?;
        let mut promotion = promotion_entity::lock(&txn, promotion_id).await?;
        if promotion.merchant_id != merchant_id {
            return Err(AppError::NotOwner);
        }
        if promotion.is_active {
            promotion.is_active = false;
            promotion.version += 1;
            promotion_entity::update(&txn, &promotion).await?;
            log::info!("Promotion {promotion_id} deactivated");
        }
        txn.commit().await?;
        Ok(promotion)
    }
}
