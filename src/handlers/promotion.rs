use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

use super::get_user_id_from_request;
use crate::models::*;
use crate::services::{CouponService, PromotionService};

#[utoipa::path(
    post,
    path = "/promotions",
    tag = "promotion",
    request_body = CreatePromotionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建活动成功", body = Promotion),
        (status = 400, description = "请求参数错误"),
        (status = 401, description = "未授权")
    )
)]
pub async fn create_promotion(
    promotion_service: web::Data<PromotionService>,
    req: HttpRequest,
    request: web::Json<CreatePromotionRequest>,
) -> Result<HttpResponse> {
    let merchant_id = get_user_id_from_request(&req)?;

    match promotion_service
        .create_promotion(&merchant_id, request.into_inner())
        .await
    {
        Ok(promotion) => Ok(HttpResponse::Ok().json(ApiResponse::success(promotion))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/promotions",
    tag = "promotion",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("merchant_id" = Option<String>, Query, description = "商户"),
        ("active_only" = Option<bool>, Query, description = "只看可领取的活动")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取活动列表成功"),
        (status = 401, description = "未授权")
    )
)]
pub async fn list_promotions(
    promotion_service: web::Data<PromotionService>,
    query: web::Query<PromotionQuery>,
) -> Result<HttpResponse> {
    match promotion_service.list(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/promotions/{id}",
    tag = "promotion",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取活动成功", body = Promotion),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn get_promotion(
    promotion_service: web::Data<PromotionService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match promotion_service.get(path.into_inner()).await {
        Ok(promotion) => Ok(HttpResponse::Ok().json(ApiResponse::success(promotion))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/promotions/{id}/deactivate",
    tag = "promotion",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "下架活动成功", body = Promotion),
        (status = 403, description = "不是该活动的商户")
    )
)]
pub async fn deactivate_promotion(
    promotion_service: web::Data<PromotionService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let merchant_id = get_user_id_from_request(&req)?;

    match promotion_service
        .deactivate(path.into_inner(), &merchant_id)
        .await
    {
        Ok(promotion) => Ok(HttpResponse::Ok().json(ApiResponse::success(promotion))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/promotions/{id}/claim",
    tag = "promotion",
    params(
        ("id" = Uuid, Path, description = "活动ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "领取成功", body = Coupon),
        (status = 409, description = "库存已领完"),
        (status = 410, description = "活动已过期")
    )
)]
pub async fn claim_promotion(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match coupon_service.claim(path.into_inner(), &user_id).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn promotion_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/promotions")
            .route("", web::post().to(create_promotion))
            .route("", web::get().to(list_promotions))
            .route("/{id}", web::get().to(get_promotion))
            .route("/{id}/deactivate", web::post().to(deactivate_promotion))
            .route("/{id}/claim", web::post().to(claim_promotion)),
    );
}
