use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))", enum_name = "stake_status")]
pub enum StakeStatus {
    #[sea_orm(string_value = "locked")]
    Locked,
    #[sea_orm(string_value = "unlocked")]
    Unlocked,
    #[sea_orm(string_value = "withdrawn")]
    Withdrawn,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StakePosition {
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub owner_id: String,
    pub tier_days: i64,
    pub apy: f64,
    /// 等值本金，取活动原价(美分)
    pub principal: i64,
    pub staked_at: DateTime<Utc>,
    pub unlocks_at: DateTime<Utc>,
    pub accrued_rewards: f64,
    /// 当前计息起点：质押时间或最近一次领取时间
    pub accrual_anchor: DateTime<Utc>,
    pub last_accrued_at: DateTime<Utc>,
    pub claimed_total: f64,
    pub status: StakeStatus,
    pub withdrawn_at: Option<DateTime<Utc>>,
}

/// 线性计息：本金 * apy/100 * 经过秒数 / 每年秒数
pub fn rewards_between(
    principal: i64,
    apy: f64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    seconds_per_year: i64,
) -> f64 {
    if to <= from || seconds_per_year <= 0 {
        return 0.0;
    }
    let elapsed = (to - from).num_seconds() as f64;
    principal as f64 * apy / 100.0 * elapsed / seconds_per_year as f64
}

impl StakePosition {
    pub fn status_at(&self, now: DateTime<Utc>) -> StakeStatus {
        match self.status {
            StakeStatus::Withdrawn => StakeStatus::Withdrawn,
            _ if now >= self.unlocks_at => StakeStatus::Unlocked,
            _ => StakeStatus::Locked,
        }
    }

    /// 计算到 `now` 为止的奖励并写回，写回值永不小于已记录的值
    pub fn accrue(&mut self, now: DateTime<Utc>, seconds_per_year: i64) -> f64 {
        if self.status == StakeStatus::Withdrawn {
            return self.accrued_rewards;
        }
        let end = now.min(self.unlocks_at);
        let computed = rewards_between(
            self.principal,
            self.apy,
            self.accrual_anchor,
            end,
            seconds_per_year,
        );
        if computed > self.accrued_rewards {
            self.accrued_rewards = computed;
        }
        if end > self.last_accrued_at {
            self.last_accrued_at = end;
        }
        self.status = self.status_at(now);
        self.accrued_rewards
    }

    /// 领取锚点到 `now` 之间的奖励，之后从领取时刻重新计息。
    /// 已提取的仓位只结清提取时冻结的金额。
    pub fn take_rewards(&mut self, now: DateTime<Utc>, seconds_per_year: i64) -> f64 {
        let amount = if self.status == StakeStatus::Withdrawn {
            self.accrued_rewards
        } else {
            let end = now.min(self.unlocks_at).max(self.accrual_anchor);
            let amount = rewards_between(
                self.principal,
                self.apy,
                self.accrual_anchor,
                end,
                seconds_per_year,
            );
            self.accrual_anchor = end;
            self.last_accrued_at = end;
            self.status = self.status_at(now);
            amount
        };
        self.accrued_rewards = 0.0;
        self.claimed_total += amount;
        amount
    }

    /// 只读视图，不写回
    pub fn view(&self, now: DateTime<Utc>, seconds_per_year: i64) -> StakePosition {
        let mut view = self.clone();
        view.accrue(now, seconds_per_year);
        view
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StakeRequest {
    pub coupon_id: Uuid,
    pub tier_days: i64,
    pub apy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimRewardsResponse {
    pub stake_id: Uuid,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StakeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const YEAR: i64 = 365 * 24 * 3600;

    fn position(now: DateTime<Utc>) -> StakePosition {
        StakePosition {
            id: Uuid::new_v4(),
            coupon_id: Uuid::new_v4(),
            owner_id: "owner".into(),
            tier_days: 30,
            apy: 12.0,
            principal: 1000,
            staked_at: now,
            unlocks_at: now + Duration::days(30),
            accrued_rewards: 0.0,
            accrual_anchor: now,
            last_accrued_at: now,
            claimed_total: 0.0,
            status: StakeStatus::Locked,
            withdrawn_at: None,
        }
    }

    #[test]
    fn test_linear_accrual() {
        let t0 = Utc::now();
        let mut p = position(t0);
        let half = p.view(t0 + Duration::days(15), YEAR).accrued_rewards;
        let full = p.accrue(t0 + Duration::days(30), YEAR);
        assert!((full - 1000.0 * 0.12 * 30.0 / 365.0).abs() < 1e-9);
        assert!((half * 2.0 - full).abs() < 1e-6);
    }

    #[test]
    fn test_accrual_never_decreases_when_clock_goes_back() {
        let t0 = Utc::now();
        let mut p = position(t0);
        let later = p.accrue(t0 + Duration::days(10), YEAR);
        let earlier = p.accrue(t0 + Duration::days(5), YEAR);
        assert_eq!(later, earlier);
    }

    #[test]
    fn test_accrual_caps_at_unlock() {
        let t0 = Utc::now();
        let mut p = position(t0);
        let at_unlock = p.accrue(t0 + Duration::days(30), YEAR);
        let way_after = p.accrue(t0 + Duration::days(90), YEAR);
        assert_eq!(at_unlock, way_after);
        assert_eq!(p.status, StakeStatus::Unlocked);
    }

    #[test]
    fn test_claim_restarts_from_claim_time() {
        let t0 = Utc::now();
        let mut p = position(t0);
        let claimed = p.take_rewards(t0 + Duration::days(10), YEAR);
        assert!(claimed > 0.0);
        assert_eq!(p.accrued_rewards, 0.0);

        let after = p.accrue(t0 + Duration::days(20), YEAR);
        let expected = rewards_between(1000, 12.0, t0 + Duration::days(10), t0 + Duration::days(20), YEAR);
        assert!((after - expected).abs() < 1e-9);
    }

    #[test]
    fn test_claim_pays_only_up_to_claim_time() {
        let t0 = Utc::now();
        let mut p = position(t0);
        p.accrue(t0 + Duration::days(20), YEAR);

        let claimed = p.take_rewards(t0 + Duration::days(1), YEAR);
        assert!((claimed - 1000.0 * 0.12 / 365.0).abs() < 1e-9);
        assert_eq!(p.accrual_anchor, t0 + Duration::days(1));
        assert_eq!(p.last_accrued_at, t0 + Duration::days(1));
    }

    #[test]
    fn test_withdrawn_position_pays_frozen_amount_once() {
        let t0 = Utc::now();
        let mut p = position(t0);
        let frozen = p.accrue(t0 + Duration::days(30), YEAR);
        p.status = StakeStatus::Withdrawn;

        assert_eq!(p.take_rewards(t0 + Duration::days(60), YEAR), frozen);
        assert_eq!(p.take_rewards(t0 + Duration::days(61), YEAR), 0.0);
        assert_eq!(p.claimed_total, frozen);
    }
}
