use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

use super::get_user_id_from_request;
use super::redemption::issue_redemption_token;
use crate::models::*;
use crate::services::CouponService;

#[utoipa::path(
    get,
    path = "/coupons",
    tag = "coupon",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("state" = Option<CouponState>, Query, description = "状态: active/listed/staked/in_auction/redeemed/expired")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取我的券成功"),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_my_coupons(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    query: web::Query<CouponQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match coupon_service.list_by_owner(&user_id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/coupons/{id}",
    tag = "coupon",
    params(
        ("id" = Uuid, Path, description = "券ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取券成功", body = Coupon),
        (status = 404, description = "券不存在")
    )
)]
pub async fn get_coupon(
    coupon_service: web::Data<CouponService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match coupon_service.get(path.into_inner()).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/coupons/{id}/history",
    tag = "coupon",
    params(
        ("id" = Uuid, Path, description = "券ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取流转记录成功", body = [TransferRecord]),
        (status = 404, description = "券不存在")
    )
)]
pub async fn get_coupon_history(
    coupon_service: web::Data<CouponService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match coupon_service.history(path.into_inner()).await {
        Ok(history) => Ok(HttpResponse::Ok().json(ApiResponse::success(history))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/coupons/{id}/gift",
    tag = "coupon",
    params(
        ("id" = Uuid, Path, description = "券ID")
    ),
    request_body = GiftCouponRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "转赠成功", body = Coupon),
        (status = 403, description = "不是券的持有人"),
        (status = 409, description = "券当前不可转赠")
    )
)]
pub async fn gift_coupon(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<GiftCouponRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match coupon_service
        .gift(path.into_inner(), &user_id, &request.to_user_id)
        .await
    {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn coupon_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/coupons")
            .route("", web::get().to(get_my_coupons))
            .route("/{id}", web::get().to(get_coupon))
            .route("/{id}/history", web::get().to(get_coupon_history))
            .route("/{id}/gift", web::post().to(gift_coupon))
            .route(
                "/{id}/redemption-token",
                web::post().to(issue_redemption_token),
            ),
    );
}
