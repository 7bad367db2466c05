use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::RewardsConfig;
use crate::error::{AppError, AppResult};

/// 发往声誉/奖励账本的事件；核心只发送，从不同步读回
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardEvent {
    Claimed {
        user_id: String,
        coupon_id: Uuid,
        promotion_id: Uuid,
        at: DateTime<Utc>,
    },
    Redeemed {
        user_id: String,
        coupon_id: Uuid,
        promotion_id: Uuid,
        at: DateTime<Utc>,
    },
}

#[derive(Clone)]
pub struct RewardPublisher {
    tx: mpsc::UnboundedSender<RewardEvent>,
}

impl RewardPublisher {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RewardEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// 不阻塞调用方；接收端已关闭时只记日志
    pub fn emit(&self, event: RewardEvent) {
        if let Err(e) = self.tx.send(event) {
            log::warn!("Reward event dropped, dispatcher gone: {:?}", e.0);
        }
    }
}

pub struct RewardDispatcher {
    http: Client,
    webhook_url: Option<String>,
}

impl RewardDispatcher {
    pub fn new(cfg: RewardsConfig) -> Self {
        Self {
            http: Client::new(),
            webhook_url: cfg.webhook_url,
        }
    }

    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<RewardEvent>) {
        while let Some(event) = rx.recv().await {
            if let Err(e) = self.deliver(&event).await {
                log::error!("Failed to deliver reward event {event:?}: {e}");
            }
        }
        log::info!("Reward dispatcher stopped");
    }

    async fn deliver(&self, event: &RewardEvent) -> AppResult<()> {
        log::info!("Reward event: {}", serde_json::to_string(event)?);
        let Some(url) = &self.webhook_url else {
            return Ok(());
        };

        let resp = self.http.post(url).json(event).send().await?;
        if !resp.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "reward webhook returned HTTP {}",
                resp.status().as_u16()
            )));
        }
        Ok(())
    }
}
