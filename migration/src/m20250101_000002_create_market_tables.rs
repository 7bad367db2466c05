use sea_orm_migration::prelude::*;

/// 固定价挂单
#[derive(DeriveIden)]
enum Listings {
    Table,
    Id,
    CouponId,
    SellerId,
    Price,
    CreatedAt,
    IsActive,
    BuyerId,
    SoldAt,
    PaymentReference,
}

/// 拍卖（出价记录以 JSON 存放）
#[derive(DeriveIden)]
enum Auctions {
    Table,
    Id,
    CouponId,
    SellerId,
    StartingPrice,
    ReservePrice,
    BuyNowPrice,
    CurrentBid,
    HighestBidderId,
    StartsAt,
    EndsAt,
    ExtendOnBid,
    ExtensionSeconds,
    Bids,
    Status,
    WinnerId,
    FinalPrice,
    SettledAt,
}

/// 质押仓位
#[derive(DeriveIden)]
enum Stakes {
    Table,
    Id,
    CouponId,
    OwnerId,
    TierDays,
    Apy,
    Principal,
    StakedAt,
    UnlocksAt,
    AccruedRewards,
    AccrualAnchor,
    LastAccruedAt,
    ClaimedTotal,
    Status,
    WithdrawnAt,
}

/// 拼团（阶梯与参与者以 JSON 存放）
#[derive(DeriveIden)]
enum GroupDeals {
    Table,
    Id,
    PromotionId,
    OrganizerId,
    Tiers,
    Participants,
    CurrentParticipants,
    MaxParticipants,
    ExpiresAt,
    CreatedAt,
    FrozenDiscount,
    FinalizedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Listings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Listings::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Listings::CouponId).uuid().not_null())
                    .col(ColumnDef::new(Listings::SellerId).string().not_null())
                    .col(ColumnDef::new(Listings::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(Listings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Listings::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Listings::BuyerId).string())
                    .col(ColumnDef::new(Listings::SoldAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Listings::PaymentReference).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_listings_active_coupon")
                    .table(Listings::Table)
                    .col(Listings::IsActive)
                    .col(Listings::CouponId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Auctions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Auctions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Auctions::CouponId).uuid().not_null())
                    .col(ColumnDef::new(Auctions::SellerId).string().not_null())
                    .col(
                        ColumnDef::new(Auctions::StartingPrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Auctions::ReservePrice)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Auctions::BuyNowPrice).big_integer())
                    .col(ColumnDef::new(Auctions::CurrentBid).big_integer().not_null())
                    .col(ColumnDef::new(Auctions::HighestBidderId).string())
                    .col(
                        ColumnDef::new(Auctions::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Auctions::EndsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Auctions::ExtendOnBid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Auctions::ExtensionSeconds)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Auctions::Bids).json_binary().not_null())
                    .col(ColumnDef::new(Auctions::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Auctions::WinnerId).string())
                    .col(ColumnDef::new(Auctions::FinalPrice).big_integer())
                    .col(ColumnDef::new(Auctions::SettledAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_auctions_status")
                    .table(Auctions::Table)
                    .col(Auctions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Stakes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Stakes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Stakes::CouponId).uuid().not_null())
                    .col(ColumnDef::new(Stakes::OwnerId).string().not_null())
                    .col(ColumnDef::new(Stakes::TierDays).big_integer().not_null())
                    .col(ColumnDef::new(Stakes::Apy).double().not_null())
                    .col(ColumnDef::new(Stakes::Principal).big_integer().not_null())
                    .col(
                        ColumnDef::new(Stakes::StakedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Stakes::UnlocksAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Stakes::AccruedRewards)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Stakes::AccrualAnchor)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Stakes::LastAccruedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Stakes::ClaimedTotal)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Stakes::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Stakes::WithdrawnAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_stakes_owner_id")
                    .table(Stakes::Table)
                    .col(Stakes::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupDeals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GroupDeals::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(GroupDeals::PromotionId).uuid().not_null())
                    .col(ColumnDef::new(GroupDeals::OrganizerId).string().not_null())
                    .col(ColumnDef::new(GroupDeals::Tiers).json_binary().not_null())
                    .col(
                        ColumnDef::new(GroupDeals::Participants)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupDeals::CurrentParticipants)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(GroupDeals::MaxParticipants).integer())
                    .col(
                        ColumnDef::new(GroupDeals::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupDeals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GroupDeals::FrozenDiscount).small_integer())
                    .col(ColumnDef::new(GroupDeals::FinalizedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupDeals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Stakes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Auctions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Listings::Table).to_owned())
            .await?;
        Ok(())
    }
}
