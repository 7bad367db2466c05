use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SettlementConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct PaymentRequest<'a> {
    payer: &'a str,
    payee: &'a str,
    amount: i64,
    reference: &'a str,
}

#[derive(Debug, Serialize)]
struct RefundRequest<'a> {
    reference: &'a str,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PaymentReceipt {
    pub reference: String,
    pub status: String,
}

/// 外部结算/支付网关。市场成交、拍卖结算、一口价只在这里授权通过后才转移所有权。
#[derive(Clone)]
pub struct SettlementClient {
    http: Client,
    cfg: SettlementConfig,
}

impl SettlementClient {
    pub fn new(cfg: SettlementConfig) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent("agora-deals-backend/settlement")
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| AppError::ConfigError(format!("settlement http client: {e}")))?;
        Ok(Self { http, cfg })
    }

    /// 未配置网关地址时离线运行，本地直接批准
    pub fn offline() -> Self {
        Self {
            http: Client::new(),
            cfg: SettlementConfig::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.cfg.base_url.is_empty()
    }

    pub async fn authorize(
        &self,
        payer: &str,
        payee: &str,
        amount: i64,
        reference: &str,
    ) -> AppResult<PaymentReceipt> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(format!(
                "settlement amount must be positive, got {amount}"
            )));
        }
        if !self.is_enabled() {
            log::debug!("Settlement offline, approving {reference} ({amount})");
            return Ok(PaymentReceipt {
                reference: reference.to_string(),
                status: "approved_offline".to_string(),
            });
        }

        let body = PaymentRequest {
            payer,
            payee,
            amount,
            reference,
        };
        let resp = self.post_with_retry("/payments", &body).await?;
        let receipt: PaymentReceipt = resp.json().await?;
        log::info!(
            "Settlement authorized {} ({amount}) status={}",
            receipt.reference,
            receipt.status
        );
        Ok(receipt)
    }

    /// 补偿：授权成功但所有权转移被拒时退款
    pub async fn refund(&self, reference: &str) -> AppResult<()> {
        if !self.is_enabled() {
            log::debug!("Settlement offline, refund {reference} is a no-op");
            return Ok(());
        }
        self.post_with_retry("/refunds", &RefundRequest { reference })
            .await?;
        log::info!("Settlement refunded {reference}");
        Ok(())
    }

    /// 网络错误与 5xx 做有界指数退避重试；4xx 直接返回
    async fn post_with_retry<B: Serialize>(&self, path: &str, body: &B) -> AppResult<Response> {
        let url = format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path);
        let mut last_error = String::new();

        for attempt in 0..=self.cfg.max_retries {
            if attempt > 0 {
                let backoff = self.cfg.backoff_ms.saturating_mul(1u64 << (attempt - 1).min(16));
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let result = self
                .http
                .post(&url)
                .bearer_auth(&self.cfg.api_key)
                .json(body)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if resp.status().is_server_error() => {
                    last_error = format!("HTTP {}", resp.status().as_u16());
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let text = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "unknown error".to_string());
                    return Err(AppError::ExternalApiError(format!(
                        "settlement rejected {path}: HTTP {status}: {text}"
                    )));
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }
            log::warn!(
                "Settlement call {path} failed (attempt {}/{}): {last_error}",
                attempt + 1,
                self.cfg.max_retries + 1
            );
        }

        Err(AppError::SettlementUnavailable(last_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_mode_approves_locally() {
        let client = SettlementClient::offline();
        assert!(!client.is_enabled());
        let receipt = client.authorize("buyer", "seller", 500, "listing:1").await.unwrap();
        assert_eq!(receipt.reference, "listing:1");
        assert!(client.refund("listing:1").await.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let client = SettlementClient::offline();
        assert!(matches!(
            client.authorize("buyer", "seller", 0, "x").await,
            Err(AppError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_unavailable() {
        let client = SettlementClient::new(SettlementConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "key".to_string(),
            timeout_ms: 500,
            max_retries: 1,
            backoff_ms: 1,
        })
        .unwrap();

        let result = client.authorize("buyer", "seller", 500, "listing:1").await;
        assert!(matches!(result, Err(AppError::SettlementUnavailable(_))));
    }
}
