use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

use super::get_user_id_from_request;
use crate::models::*;
use crate::services::ListingService;

#[utoipa::path(
    post,
    path = "/listings",
    tag = "listing",
    request_body = CreateListingRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "挂单成功", body = Listing),
        (status = 400, description = "价格无效"),
        (status = 409, description = "券当前不可挂单")
    )
)]
pub async fn create_listing(
    listing_service: web::Data<ListingService>,
    req: HttpRequest,
    request: web::Json<CreateListingRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match listing_service
        .create_listing(&user_id, request.into_inner())
        .await
    {
        Ok(listing) => Ok(HttpResponse::Ok().json(ApiResponse::success(listing))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/listings",
    tag = "listing",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("seller_id" = Option<String>, Query, description = "卖家")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取在售挂单成功")
    )
)]
pub async fn list_listings(
    listing_service: web::Data<ListingService>,
    query: web::Query<ListingQuery>,
) -> Result<HttpResponse> {
    match listing_service.list_active(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/listings/{id}",
    tag = "listing",
    params(
        ("id" = Uuid, Path, description = "挂单ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取挂单成功", body = Listing),
        (status = 404, description = "挂单不存在")
    )
)]
pub async fn get_listing(
    listing_service: web::Data<ListingService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match listing_service.get(path.into_inner()).await {
        Ok(listing) => Ok(HttpResponse::Ok().json(ApiResponse::success(listing))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/listings/{id}/cancel",
    tag = "listing",
    params(
        ("id" = Uuid, Path, description = "挂单ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "撤单成功", body = Listing),
        (status = 403, description = "不是卖家"),
        (status = 409, description = "挂单已失效")
    )
)]
pub async fn cancel_listing(
    listing_service: web::Data<ListingService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match listing_service
        .cancel_listing(path.into_inner(), &user_id)
        .await
    {
        Ok(listing) => Ok(HttpResponse::Ok().json(ApiResponse::success(listing))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/listings/{id}/buy",
    tag = "listing",
    params(
        ("id" = Uuid, Path, description = "挂单ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "购买成功，券已过户", body = Coupon),
        (status = 400, description = "不能购买自己的挂单"),
        (status = 409, description = "挂单已失效"),
        (status = 503, description = "结算服务不可用")
    )
)]
pub async fn buy_listing(
    listing_service: web::Data<ListingService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match listing_service.buy(path.into_inner(), &user_id).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn listing_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/listings")
            .route("", web::post().to(create_listing))
            .route("", web::get().to(list_listings))
            .route("/{id}", web::get().to(get_listing))
            .route("/{id}/cancel", web::post().to(cancel_listing))
            .route("/{id}/buy", web::post().to(buy_listing)),
    );
}
