use sea_orm_migration::prelude::*;

/// 商家活动
#[derive(DeriveIden)]
enum Promotions {
    Table,
    Id,
    MerchantId,
    Title,
    DiscountPercentage,
    OriginalPrice,
    MaxSupply,
    CurrentSupply,
    ExpiresAt,
    IsActive,
    Version,
    CreatedAt,
}

/// 用户持有的券（转手记录以 JSON 存放）
#[derive(DeriveIden)]
enum Coupons {
    Table,
    Id,
    PromotionId,
    OwnerId,
    State,
    DiscountPercentage,
    ClaimedAt,
    RedeemedAt,
    TransferHistory,
    Version,
}

/// 一次性核销码
#[derive(DeriveIden)]
enum RedemptionTokens {
    Table,
    Code,
    CouponId,
    OwnerId,
    IssuedAt,
    ExpiresAt,
    Consumed,
    ConsumedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Promotions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Promotions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Promotions::MerchantId).string().not_null())
                    .col(ColumnDef::new(Promotions::Title).string().not_null())
                    .col(
                        ColumnDef::new(Promotions::DiscountPercentage)
                            .small_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::OriginalPrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Promotions::MaxSupply).integer().not_null())
                    .col(
                        ColumnDef::new(Promotions::CurrentSupply)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Promotions::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Promotions::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Promotions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_promotions_merchant_id")
                    .table(Promotions::Table)
                    .col(Promotions::MerchantId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Coupons::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Coupons::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Coupons::PromotionId).uuid().not_null())
                    .col(ColumnDef::new(Coupons::OwnerId).string().not_null())
                    .col(ColumnDef::new(Coupons::State).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Coupons::DiscountPercentage)
                            .small_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::ClaimedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Coupons::RedeemedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Coupons::TransferHistory)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coupons_promotion_id")
                            .from(Coupons::Table, Coupons::PromotionId)
                            .to(Promotions::Table, Promotions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_coupons_owner_id")
                    .table(Coupons::Table)
                    .col(Coupons::OwnerId)
                    .to_owned(),
            )
            .await?;

        // 过期扫描按状态筛选
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_coupons_state")
                    .table(Coupons::Table)
                    .col(Coupons::State)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RedemptionTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RedemptionTokens::Code)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RedemptionTokens::CouponId).uuid().not_null())
                    .col(ColumnDef::new(RedemptionTokens::OwnerId).string().not_null())
                    .col(
                        ColumnDef::new(RedemptionTokens::IssuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RedemptionTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RedemptionTokens::Consumed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(RedemptionTokens::ConsumedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_redemption_tokens_coupon_id")
                            .from(RedemptionTokens::Table, RedemptionTokens::CouponId)
                            .to(Coupons::Table, Coupons::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 已核销的码永久保留，按券号与是否已核销查找
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_redemption_tokens_coupon_consumed")
                    .table(RedemptionTokens::Table)
                    .col(RedemptionTokens::CouponId)
                    .col(RedemptionTokens::Consumed)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RedemptionTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Coupons::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Promotions::Table).to_owned())
            .await?;
        Ok(())
    }
}
