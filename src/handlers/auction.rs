use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

use super::get_user_id_from_request;
use crate::models::*;
use crate::services::AuctionService;

#[utoipa::path(
    post,
    path = "/auctions",
    tag = "auction",
    request_body = CreateAuctionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建拍卖成功", body = Auction),
        (status = 400, description = "价格或时长无效"),
        (status = 409, description = "券当前不可拍卖")
    )
)]
pub async fn create_auction(
    auction_service: web::Data<AuctionService>,
    req: HttpRequest,
    request: web::Json<CreateAuctionRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match auction_service
        .create_auction(&user_id, request.into_inner())
        .await
    {
        Ok(auction) => Ok(HttpResponse::Ok().json(ApiResponse::success(auction))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/auctions",
    tag = "auction",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取进行中的拍卖成功")
    )
)]
pub async fn list_auctions(
    auction_service: web::Data<AuctionService>,
    query: web::Query<AuctionQuery>,
) -> Result<HttpResponse> {
    match auction_service.list_live(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/auctions/{id}",
    tag = "auction",
    params(
        ("id" = Uuid, Path, description = "拍卖ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取拍卖成功", body = Auction),
        (status = 404, description = "拍卖不存在")
    )
)]
pub async fn get_auction(
    auction_service: web::Data<AuctionService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match auction_service.get(path.into_inner()).await {
        Ok(auction) => Ok(HttpResponse::Ok().json(ApiResponse::success(auction))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auctions/{id}/bids",
    tag = "auction",
    params(
        ("id" = Uuid, Path, description = "拍卖ID")
    ),
    request_body = PlaceBidRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "出价成功", body = Auction),
        (status = 400, description = "不能对自己的拍卖出价"),
        (status = 409, description = "出价过低或拍卖已结束")
    )
)]
pub async fn place_bid(
    auction_service: web::Data<AuctionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<PlaceBidRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match auction_service
        .place_bid(path.into_inner(), &user_id, request.amount)
        .await
    {
        Ok(auction) => Ok(HttpResponse::Ok().json(ApiResponse::success(auction))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auctions/{id}/buy-now",
    tag = "auction",
    params(
        ("id" = Uuid, Path, description = "拍卖ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "一口价成交", body = Coupon),
        (status = 409, description = "拍卖已结束或不支持一口价"),
        (status = 503, description = "结算服务不可用")
    )
)]
pub async fn buy_now(
    auction_service: web::Data<AuctionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match auction_service.buy_now(path.into_inner(), &user_id).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 任何人都可以在截止后触发结算，重复调用返回首次结果
#[utoipa::path(
    post,
    path = "/auctions/{id}/settle",
    tag = "auction",
    params(
        ("id" = Uuid, Path, description = "拍卖ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "结算完成", body = SettleAuctionResponse),
        (status = 409, description = "拍卖尚未截止"),
        (status = 503, description = "结算服务不可用，可稍后重试")
    )
)]
pub async fn settle_auction(
    auction_service: web::Data<AuctionService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match auction_service.settle(path.into_inner()).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auctions/{id}/cancel",
    tag = "auction",
    params(
        ("id" = Uuid, Path, description = "拍卖ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "撤回拍卖成功", body = Auction),
        (status = 403, description = "不是卖家"),
        (status = 409, description = "已有出价或拍卖已结束")
    )
)]
pub async fn cancel_auction(
    auction_service: web::Data<AuctionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match auction_service
        .cancel_auction(path.into_inner(), &user_id)
        .await
    {
        Ok(auction) => Ok(HttpResponse::Ok().json(ApiResponse::success(auction))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn auction_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auctions")
            .route("", web::post().to(create_auction))
            .route("", web::get().to(list_auctions))
            .route("/{id}", web::get().to(get_auction))
            .route("/{id}/bids", web::post().to(place_bid))
            .route("/{id}/buy-now", web::post().to(buy_now))
            .route("/{id}/settle", web::post().to(settle_auction))
            .route("/{id}/cancel", web::post().to(cancel_auction)),
    );
}
