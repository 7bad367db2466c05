use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, TransactionTrait};
use uuid::Uuid;

use crate::config::AuctionConfig;
use crate::database::DbPool;
use crate::entities::{auction_entity, coupon_entity};
use crate::error::{AppError, AppResult};
use crate::external::{PaymentReceipt, SettlementClient};
use crate::models::*;
use crate::services::{CouponService, TransferGuard, state_conflict};
use crate::utils::{SharedClock, validate_price, validate_user_id};

#[derive(Clone)]
pub struct AuctionService {
    pool: DbPool,
    clock: SharedClock,
    coupons: CouponService,
    settlement: SettlementClient,
    cfg: AuctionConfig,
}

impl AuctionService {
    pub fn new(
        pool: DbPool,
        clock: SharedClock,
        coupons: CouponService,
        settlement: SettlementClient,
        cfg: AuctionConfig,
    ) -> Self {
        Self {
            pool,
            clock,
            coupons,
            settlement,
            cfg,
        }
    }

    fn view(&self, mut auction: Auction, now: DateTime<Utc>) -> Auction {
        auction.status = auction.view_status(now, self.cfg.ending_soon_seconds);
        auction
    }

    fn validate_terms(&self, request: &CreateAuctionRequest) -> AppResult<i64> {
        validate_price(request.starting_price)?;
        if request.reserve_price < 0 {
            return Err(AppError::InvalidPrice("reserve_price must not be negative".into()));
        }
        if let Some(buy_now) = request.buy_now_price
            && buy_now <= request.starting_price
        {
            return Err(AppError::InvalidPrice(
                "buy_now_price must exceed starting_price".into(),
            ));
        }
        if request.duration_seconds < self.cfg.min_duration_seconds
            || request.duration_seconds > self.cfg.max_duration_seconds
        {
            return Err(AppError::ValidationError(format!(
                "duration must be within {}..={} seconds",
                self.cfg.min_duration_seconds, self.cfg.max_duration_seconds
            )));
        }
        let extension = request
            .extension_seconds
            .unwrap_or(self.cfg.default_extension_seconds);
        if extension <= 0 {
            return Err(AppError::ValidationError(
                "extension_seconds must be positive".into(),
            ));
        }
        Ok(extension)
    }

    pub async fn create_auction(
        &self,
        seller_id: &str,
        request: CreateAuctionRequest,
    ) -> AppResult<Auction> {
        let extension_seconds = self.validate_terms(&request)?;
        let txn = self.pool.begin().await?;
        let coupon = self
            .coupons
            .transition_in(
                &txn,
                request.coupon_id,
                Transition::OpenAuction,
                Actor::User(seller_id),
            )
            .await
            .map_err(state_conflict)?;

        let now = self.clock.now();
        let auction = Auction {
            id: Uuid::new_v4(),
            coupon_id: coupon.id,
            seller_id: seller_id.to_string(),
            starting_price: request.starting_price,
            reserve_price: request.reserve_price,
            buy_now_price: request.buy_now_price,
            current_bid: request.starting_price,
            highest_bidder_id: None,
            starts_at: now,
            ends_at: now + Duration::seconds(request.duration_seconds),
            extend_on_bid: request.extend_on_bid,
            extension_seconds,
            bids: Vec::new(),
            status: AuctionStatus::Live,
            winner_id: None,
            final_price: None,
            settled_at: None,
        };
        auction_entity::insert(&txn, &auction).await?;
        txn.commit().await?;

        log::info!(
            "Auction {} opened for coupon {} until {}",
            auction.id,
            coupon.id,
            auction.ends_at
        );
        Ok(self.view(auction, now))
    }

    /// 在拍卖行锁内完成比较与写入
    pub async fn place_bid(&self, auction_id: Uuid, bidder_id: &str, amount: i64) -> AppResult<Auction> {
        validate_user_id(bidder_id)?;
        let txn = self.pool.begin().await?;
        let mut auction = auction_entity::lock(&txn, auction_id).await?;
        let now = self.clock.now();

        if !auction.is_open(now) {
            return Err(AppError::AuctionEnded);
        }
        if auction.seller_id == bidder_id {
            return Err(AppError::SelfBid);
        }
        if amount <= auction.current_bid {
            return Err(AppError::BidTooLow {
                current: auction.current_bid,
            });
        }

        auction.bids.push(Bid {
            bidder_id: bidder_id.to_string(),
            amount,
            timestamp: now,
        });
        auction.current_bid = amount;
        auction.highest_bidder_id = Some(bidder_id.to_string());
        if let Some(deadline) = auction.extended_deadline(now) {
            log::info!("Auction {auction_id} extended to {deadline}");
            auction.ends_at = deadline;
        }
        auction_entity::update(&txn, &auction).await?;
        txn.commit().await?;

        log::info!("Bid {amount} by {bidder_id} accepted on auction {auction_id}");
        Ok(self.view(auction, now))
    }

    pub async fn buy_now(&self, auction_id: Uuid, buyer_id: &str) -> AppResult<Coupon> {
        validate_user_id(buyer_id)?;
        let txn = self.pool.begin().await?;
        let mut auction = auction_entity::lock(&txn, auction_id).await?;
        let now = self.clock.now();

        if !auction.is_open(now) {
            return Err(AppError::AuctionEnded);
        }
        let Some(price) = auction.buy_now_price else {
            return Err(AppError::InvalidState("auction has no buy-now price".into()));
        };
        if auction.seller_id == buyer_id {
            return Err(AppError::SelfPurchase);
        }

        let reference = format!("auction-{auction_id}-buy-now");
        let receipt = self
            .settlement
            .authorize(buyer_id, &auction.seller_id, price, &reference)
            .await?;
        let coupon = self
            .finish_sale(txn, &mut auction, buyer_id, price, &receipt, TransferReason::BuyNow)
            .await?;

        log::info!("Auction {auction_id} bought now by {buyer_id} for {price}");
        Ok(coupon)
    }

    /// 截止后结算；已结束的拍卖重放时返回同样的结局。
    ///
    /// 网关不可用时拍卖保持待结算，由后台任务重试；
    /// 网关明确拒绝付款时券退回卖家，拍卖以 Ended 收尾。
    pub async fn settle(&self, auction_id: Uuid) -> AppResult<SettleAuctionResponse> {
        let txn = self.pool.begin().await?;
        let mut auction = auction_entity::lock(&txn, auction_id).await?;
        let now = self.clock.now();

        match auction.status {
            AuctionStatus::Settled => {
                let coupon = coupon_entity::find(&txn, auction.coupon_id).await?;
                return Ok(SettleAuctionResponse {
                    auction,
                    coupon: Some(coupon),
                });
            }
            AuctionStatus::Ended => {
                return Ok(SettleAuctionResponse {
                    auction,
                    coupon: None,
                });
            }
            AuctionStatus::Live | AuctionStatus::EndingSoon => {}
        }
        if now < auction.ends_at {
            return Err(AppError::InvalidState(format!(
                "auction is live until {}",
                auction.ends_at
            )));
        }

        let winner = auction
            .highest_bidder_id
            .clone()
            .filter(|_| auction.reserve_met());
        if let Some(winner) = winner {
            let price = auction.current_bid;
            let reference = format!("auction-{auction_id}");
            match self
                .settlement
                .authorize(&winner, &auction.seller_id, price, &reference)
                .await
            {
                Ok(receipt) => {
                    let coupon = self
                        .finish_sale(
                            txn,
                            &mut auction,
                            &winner,
                            price,
                            &receipt,
                            TransferReason::AuctionSettlement,
                        )
                        .await?;
                    log::info!("Auction {auction_id} settled to {winner} at {price}");
                    return Ok(SettleAuctionResponse {
                        auction,
                        coupon: Some(coupon),
                    });
                }
                Err(e @ AppError::SettlementUnavailable(_)) => return Err(e),
                Err(e) => {
                    log::warn!(
                        "Payment by {winner} for auction {auction_id} declined, returning coupon to seller: {e}"
                    );
                }
            }
        } else {
            log::info!(
                "Auction {auction_id} ended without sale (top bid {}, reserve {})",
                auction.current_bid,
                auction.reserve_price
            );
        }

        self.close_unsold(&txn, &mut auction, now).await?;
        txn.commit().await?;
        Ok(SettleAuctionResponse {
            auction,
            coupon: None,
        })
    }

    /// 券退回卖家，拍卖以 Ended 收尾
    async fn close_unsold(
        &self,
        txn: &DatabaseTransaction,
        auction: &mut Auction,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.coupons
            .transition_in(txn, auction.coupon_id, Transition::CloseAuction, Actor::System)
            .await?;
        auction.status = AuctionStatus::Ended;
        auction.settled_at = Some(now);
        auction_entity::update(txn, auction).await
    }

    /// 付款已授权：过户、记录成交并提交；任一步失败都退款
    async fn finish_sale(
        &self,
        txn: DatabaseTransaction,
        auction: &mut Auction,
        buyer_id: &str,
        price: i64,
        receipt: &PaymentReceipt,
        reason: TransferReason,
    ) -> AppResult<Coupon> {
        let now = self.clock.now();
        let sale = async {
            let coupon = self
                .coupons
                .transfer_in(
                    &txn,
                    auction.coupon_id,
                    &auction.seller_id,
                    buyer_id,
                    reason,
                    TransferGuard::WithTransition(Transition::CloseAuction),
                )
                .await?;
            auction.status = AuctionStatus::Settled;
            auction.winner_id = Some(buyer_id.to_string());
            auction.final_price = Some(price);
            auction.settled_at = Some(now);
            auction_entity::update(&txn, auction).await?;
            Ok::<_, AppError>(coupon)
        }
        .await;
        let committed = match sale {
            Ok(coupon) => txn.commit().await.map(|_| coupon).map_err(AppError::from),
            Err(e) => Err(e),
        };

        if committed.is_err()
            && let Err(refund_err) = self.settlement.refund(&receipt.reference).await
        {
            log::error!(
                "Refund of {} failed after rejected transfer: {refund_err}",
                receipt.reference
            );
        }
        committed
    }

    /// 无人出价时卖家可撤回拍卖
    pub async fn cancel_auction(&self, auction_id: Uuid, seller_id: &str) -> AppResult<Auction> {
        let txn = self.pool.begin().await?;
        let mut auction = auction_entity::lock(&txn, auction_id).await?;
        let now = self.clock.now();

        if auction.seller_id != seller_id {
            return Err(AppError::NotOwner);
        }
        if auction.status != AuctionStatus::Live {
            return Err(AppError::InvalidState("auction is already closed".into()));
        }
        if !auction.bids.is_empty() {
            return Err(AppError::InvalidState(
                "auction with bids cannot be cancelled".into(),
            ));
        }

        self.close_unsold(&txn, &mut auction, now).await?;
        txn.commit().await?;

        log::info!("Auction {auction_id} cancelled by {seller_id}");
        Ok(auction)
    }

    /// 批量结算已到期的拍卖，供后台任务调用
    pub async fn settle_due(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let due: Vec<Uuid> = auction_entity::Entity::find()
            .filter(auction_entity::Column::Status.eq(AuctionStatus::Live))
            .all(&self.pool)
            .await?
            .into_iter()
            .filter(|a| now >= a.ends_at)
            .map(|a| a.id)
            .collect();

        let mut settled = 0;
        for auction_id in due {
            match self.settle(auction_id).await {
                Ok(_) => settled += 1,
                Err(e) => log::warn!("Settlement of auction {auction_id} deferred: {e}"),
            }
        }
        Ok(settled)
    }

    pub async fn get(&self, auction_id: Uuid) -> AppResult<Auction> {
        let auction = auction_entity::find(&self.pool, auction_id).await?;
        Ok(self.view(auction, self.clock.now()))
    }

    pub async fn list_live(&self, query: &AuctionQuery) -> AppResult<PaginatedResponse<Auction>> {
        let now = self.clock.now();
        let mut items = Vec::new();
        for model in auction_entity::Entity::find()
            .filter(auction_entity::Column::Status.eq(AuctionStatus::Live))
            .order_by_asc(auction_entity::Column::EndsAt)
            .all(&self.pool)
            .await?
        {
            let auction = Auction::try_from(model)?;
            if auction.is_open(now) {
                items.push(self.view(auction, now));
            }
        }
        // 防狙击顺延后截止时间可能乱序
        items.sort_by(|a, b| a.ends_at.cmp(&b.ends_at));

        let params = PaginationParams::new(query.page, query.per_page);
        Ok(PaginatedResponse::paginate(items, &params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::Harness;
    use futures_util::future::join_all;

    fn request(coupon_id: Uuid) -> CreateAuctionRequest {
        CreateAuctionRequest {
            coupon_id,
            starting_price: 100,
            reserve_price: 150,
            buy_now_price: Some(500),
            duration_seconds: 3600,
            extend_on_bid: false,
            extension_seconds: None,
        }
    }

    async fn open(h: &Harness, req: CreateAuctionRequest) -> Auction {
        h.services.auctions.create_auction("seller", req).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_validates_terms() {
        let h = Harness::new().await;
        let coupon = h.coupon("seller").await;
        let auctions = &h.services.auctions;

        let mut bad = request(coupon.id);
        bad.buy_now_price = Some(100);
        assert!(matches!(
            auctions.create_auction("seller", bad).await,
            Err(AppError::InvalidPrice(_))
        ));

        let mut bad = request(coupon.id);
        bad.duration_seconds = 10;
        assert!(matches!(
            auctions.create_auction("seller", bad).await,
            Err(AppError::ValidationError(_))
        ));

        assert!(matches!(
            auctions.create_auction("mallory", request(coupon.id)).await,
            Err(AppError::NotOwner)
        ));

        let auction = open(&h, request(coupon.id)).await;
        assert_eq!(auction.current_bid, 100);
        assert_eq!(auction.extension_seconds, 300);
        assert_eq!(
            h.services.coupons.get(coupon.id).await.unwrap().state,
            CouponState::InAuction
        );
    }

    #[tokio::test]
    async fn test_bid_rules() {
        let h = Harness::new().await;
        let coupon = h.coupon("seller").await;
        let auction = open(&h, request(coupon.id)).await;
        let auctions = &h.services.auctions;

        assert!(matches!(
            auctions.place_bid(auction.id, "seller", 200).await,
            Err(AppError::SelfBid)
        ));
        assert!(matches!(
            auctions.place_bid(auction.id, "bob", 100).await,
            Err(AppError::BidTooLow { current: 100 })
        ));

        auctions.place_bid(auction.id, "bob", 120).await.unwrap();
        assert!(matches!(
            auctions.place_bid(auction.id, "carol", 120).await,
            Err(AppError::BidTooLow { current: 120 })
        ));
        let updated = auctions.place_bid(auction.id, "carol", 130).await.unwrap();
        assert_eq!(updated.highest_bidder_id.as_deref(), Some("carol"));
        assert_eq!(updated.bids.len(), 2);

        h.clock.advance(Duration::hours(2));
        assert!(matches!(
            auctions.place_bid(auction.id, "bob", 1000).await,
            Err(AppError::AuctionEnded)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_equal_bids_one_wins() {
        let h = Harness::new().await;
        let coupon = h.coupon("seller").await;
        let auction_id = open(&h, request(coupon.id)).await.id;

        let bids = (0..10).map(|i| {
            let auctions = h.services.auctions.clone();
            tokio::spawn(async move {
                auctions
                    .place_bid(auction_id, &format!("bidder-{i}"), 200)
                    .await
            })
        });
        let results: Vec<_> = join_all(bids).await.into_iter().map(|r| r.unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let stored = h.services.auctions.get(auction_id).await.unwrap();
        assert_eq!(stored.bids.len(), 1);
        assert_eq!(stored.current_bid, 200);
    }

    #[tokio::test]
    async fn test_reserve_not_met_reverts_to_seller() {
        let h = Harness::new().await;
        let coupon = h.coupon("seller").await;
        let auction = open(&h, request(coupon.id)).await;
        let auctions = &h.services.auctions;

        auctions.place_bid(auction.id, "bob", 120).await.unwrap();
        auctions.place_bid(auction.id, "carol", 140).await.unwrap();

        assert!(matches!(
            auctions.settle(auction.id).await,
            Err(AppError::InvalidState(_))
        ));

        h.clock.advance(Duration::hours(1));
        let result = auctions.settle(auction.id).await.unwrap();
        assert_eq!(result.auction.status, AuctionStatus::Ended);
        assert!(result.coupon.is_none());

        let coupon = h.services.coupons.get(coupon.id).await.unwrap();
        assert_eq!(coupon.owner_id, "seller");
        assert_eq!(coupon.state, CouponState::Active);
        assert_eq!(coupon.transfer_history.len(), 1);
    }

    #[tokio::test]
    async fn test_settle_is_idempotent() {
        let h = Harness::new().await;
        let coupon = h.coupon("seller").await;
        let auction = open(&h, request(coupon.id)).await;
        let auctions = &h.services.auctions;
        auctions.place_bid(auction.id, "bob", 200).await.unwrap();

        h.clock.advance(Duration::hours(1));
        let first = auctions.settle(auction.id).await.unwrap();
        let second = auctions.settle(auction.id).await.unwrap();

        assert_eq!(first.auction.status, AuctionStatus::Settled);
        assert_eq!(second.auction.status, AuctionStatus::Settled);
        assert_eq!(first.auction.winner_id.as_deref(), Some("bob"));
        let first_coupon = first.coupon.unwrap();
        let second_coupon = second.coupon.unwrap();
        assert_eq!(first_coupon.owner_id, "bob");
        assert_eq!(first_coupon.version, second_coupon.version);

        let stored = h.services.coupons.get(coupon.id).await.unwrap();
        assert_eq!(stored.transfer_history.len(), 2);
        assert_eq!(stored.state, CouponState::Active);
    }

    #[tokio::test]
    async fn test_anti_snipe_pushes_deadline_by_extension() {
        let h = Harness::new().await;
        let coupon = h.coupon("seller").await;
        let mut req = request(coupon.id);
        req.extend_on_bid = true;
        req.extension_seconds = Some(60);
        let auction = open(&h, req).await;

        h.clock.set(auction.ends_at - Duration::seconds(10));
        let updated = h
            .services
            .auctions
            .place_bid(auction.id, "bob", 200)
            .await
            .unwrap();
        assert_eq!(updated.ends_at, auction.ends_at + Duration::seconds(60));
        assert_eq!(updated.status, AuctionStatus::EndingSoon);

        // 每次窗口内出价都在当前截止时间上再顺延一次
        h.clock.advance(Duration::seconds(20));
        let again = h
            .services
            .auctions
            .place_bid(auction.id, "carol", 300)
            .await
            .unwrap();
        assert_eq!(again.ends_at, auction.ends_at + Duration::seconds(120));
    }

    #[tokio::test]
    async fn test_buy_now_settles_immediately() {
        let h = Harness::new().await;
        let coupon = h.coupon("seller").await;
        let auction = open(&h, request(coupon.id)).await;
        let auctions = &h.services.auctions;
        auctions.place_bid(auction.id, "bob", 200).await.unwrap();

        let bought = auctions.buy_now(auction.id, "carol").await.unwrap();
        assert_eq!(bought.owner_id, "carol");
        assert_eq!(
            bought.transfer_history.last().unwrap().reason,
            TransferReason::BuyNow
        );

        assert!(matches!(
            auctions.place_bid(auction.id, "bob", 300).await,
            Err(AppError::AuctionEnded)
        ));
        let replay = auctions.settle(auction.id).await.unwrap();
        assert_eq!(replay.auction.final_price, Some(500));
        assert_eq!(replay.coupon.unwrap().owner_id, "carol");
    }

    #[tokio::test]
    async fn test_cancel_only_without_bids() {
        let h = Harness::new().await;
        let auctions = &h.services.auctions;

        let quiet = h.coupon("seller").await;
        let quiet_auction = open(&h, request(quiet.id)).await;
        assert!(matches!(
            auctions.cancel_auction(quiet_auction.id, "bob").await,
            Err(AppError::NotOwner)
        ));
        let cancelled = auctions.cancel_auction(quiet_auction.id, "seller").await.unwrap();
        assert_eq!(cancelled.status, AuctionStatus::Ended);
        assert_eq!(
            h.services.coupons.get(quiet.id).await.unwrap().state,
            CouponState::Active
        );

        let busy = h.coupon("seller").await;
        let busy_auction = open(&h, request(busy.id)).await;
        auctions.place_bid(busy_auction.id, "bob", 200).await.unwrap();
        assert!(matches!(
            auctions.cancel_auction(busy_auction.id, "seller").await,
            Err(AppError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_settle_due_batch() {
        let h = Harness::new().await;
        let auctions = &h.services.auctions;
        let a = open(&h, request(h.coupon("seller").await.id)).await;
        let b = open(&h, request(h.coupon("seller").await.id)).await;
        auctions.place_bid(a.id, "bob", 300).await.unwrap();

        assert_eq!(auctions.settle_due(h.now()).await.unwrap(), 0);
        h.clock.advance(Duration::hours(2));
        assert_eq!(auctions.settle_due(h.now()).await.unwrap(), 2);
        assert_eq!(auctions.settle_due(h.now()).await.unwrap(), 0);

        assert_eq!(
            auctions.get(a.id).await.unwrap().status,
            AuctionStatus::Settled
        );
        assert_eq!(auctions.get(b.id).await.unwrap().status, AuctionStatus::Ended);
    }

    #[tokio::test]
    async fn test_declined_payment_returns_coupon_to_seller() {
        let mut config = crate::config::Config::default();
        config.settlement.base_url = declining_gateway().await;
        config.settlement.max_retries = 0;
        let h = Harness::with_config(config).await;
        let coupon = h.coupon("seller").await;
        let auction = open(&h, request(coupon.id)).await;
        let auctions = &h.services.auctions;
        auctions.place_bid(auction.id, "bob", 200).await.unwrap();

        h.clock.advance(Duration::hours(1));
        let result = auctions.settle(auction.id).await.unwrap();
        assert_eq!(result.auction.status, AuctionStatus::Ended);
        assert!(result.auction.winner_id.is_none());
        assert!(result.coupon.is_none());

        let stored = h.services.coupons.get(coupon.id).await.unwrap();
        assert_eq!(stored.owner_id, "seller");
        assert_eq!(stored.state, CouponState::Active);

        // 重放与后台批处理都不会再次尝试付款
        let replay = auctions.settle(auction.id).await.unwrap();
        assert_eq!(replay.auction.status, AuctionStatus::Ended);
        assert_eq!(auctions.settle_due(h.now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_keeps_auction_pending() {
        let mut config = crate::config::Config::default();
        config.settlement.base_url = "http://127.0.0.1:1".into();
        config.settlement.max_retries = 0;
        config.settlement.timeout_ms = 500;
        let h = Harness::with_config(config).await;
        let coupon = h.coupon("seller").await;
        let auction = open(&h, request(coupon.id)).await;
        h.services
            .auctions
            .place_bid(auction.id, "bob", 200)
            .await
            .unwrap();

        h.clock.advance(Duration::hours(1));
        assert!(matches!(
            h.services.auctions.settle(auction.id).await,
            Err(AppError::SettlementUnavailable(_))
        ));
        assert_eq!(
            h.services.auctions.get(auction.id).await.unwrap().status,
            AuctionStatus::Live
        );
        assert_eq!(
            h.services.coupons.get(coupon.id).await.unwrap().state,
            CouponState::InAuction
        );
    }

    /// 对任何请求都回 402 的本地支付网关
    async fn declining_gateway() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let _ = socket.read(&mut buf).await;
                    let body = r#"{"error":"card declined"}"#;
                    let response = format!(
                        "HTTP/1.1 402 Payment Required\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        format!("http://{addr}")
    }
}
