use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

use super::get_user_id_from_request;
use crate::models::*;
use crate::services::StakingService;

#[utoipa::path(
    post,
    path = "/stakes",
    tag = "staking",
    request_body = StakeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "质押成功", body = StakePosition),
        (status = 400, description = "档位或年化不匹配"),
        (status = 409, description = "券当前不可质押")
    )
)]
pub async fn stake_coupon(
    staking_service: web::Data<StakingService>,
    req: HttpRequest,
    request: web::Json<StakeRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match staking_service.stake(&user_id, request.into_inner()).await {
        Ok(position) => Ok(HttpResponse::Ok().json(ApiResponse::success(position))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/stakes",
    tag = "staking",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取我的质押成功"),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_my_stakes(
    staking_service: web::Data<StakingService>,
    req: HttpRequest,
    query: web::Query<StakeQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match staking_service.list_by_owner(&user_id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/stakes/{id}",
    tag = "staking",
    params(
        ("id" = Uuid, Path, description = "质押ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取质押成功，奖励按当前时间计算", body = StakePosition),
        (status = 404, description = "质押不存在")
    )
)]
pub async fn get_stake(
    staking_service: web::Data<StakingService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match staking_service.get(path.into_inner()).await {
        Ok(position) => Ok(HttpResponse::Ok().json(ApiResponse::success(position))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/stakes/{id}/claim",
    tag = "staking",
    params(
        ("id" = Uuid, Path, description = "质押ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "领取奖励成功", body = ClaimRewardsResponse),
        (status = 403, description = "不是质押持有人")
    )
)]
pub async fn claim_rewards(
    staking_service: web::Data<StakingService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match staking_service
        .claim_rewards(path.into_inner(), &user_id)
        .await
    {
        Ok(claimed) => Ok(HttpResponse::Ok().json(ApiResponse::success(claimed))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/stakes/{id}/unstake",
    tag = "staking",
    params(
        ("id" = Uuid, Path, description = "质押ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "取回成功", body = Coupon),
        (status = 403, description = "不是质押持有人"),
        (status = 409, description = "仍在锁定期内")
    )
)]
pub async fn unstake(
    staking_service: web::Data<StakingService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req)?;

    match staking_service.unstake(path.into_inner(), &user_id).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn staking_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/stakes")
            .route("", web::post().to(stake_coupon))
            .route("", web::get().to(get_my_stakes))
            .route("/{id}", web::get().to(get_stake))
            .route("/{id}/claim", web::post().to(claim_rewards))
            .route("/{id}/unstake", web::post().to(unstake)),
    );
}
