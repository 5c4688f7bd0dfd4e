//! Webhook 投递服务
//!
//! 把事件载荷投递到各 agent 注册的 HTTP 端点：单次调用带超时，
//! 失败按退避策略重试，耗尽后标记 failed。broadcast 对所有
//! 匹配目标并发投递，部分失败不升级为错误，投递结果总是以
//! 数据形式返回给调用方。

use anyhow::{bail, Context, Result};
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::event::RingBuffer;
use crate::registry::{AgentProfile, AgentRegistry};

use super::payload::WebhookPayload;
use super::record::{DeliveryRecord, DeliveryStatus};
use super::retry::RetryPolicy;

/// 单次 HTTP 调用默认超时
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// 投递历史默认容量
pub const DEFAULT_DELIVERY_HISTORY: usize = 100;

/// 关联 ID 请求头
pub const HEADER_CORRELATION_ID: &str = "X-Correlation-Id";
/// agent 类型请求头
pub const HEADER_AGENT_KIND: &str = "X-Agent-Kind";

/// 一次尝试的失败分类
enum AttemptError {
    /// 可重试：超时、连接错误、5xx、408、429
    Transient(String),
    /// 不可重试：其余 4xx
    Permanent(String),
}

impl AttemptError {
    fn message(&self) -> &str {
        match self {
            AttemptError::Transient(m) | AttemptError::Permanent(m) => m,
        }
    }
}

/// Webhook 投递服务
///
/// Clone 共享同一份投递历史和注册表。
#[derive(Clone)]
pub struct WebhookDeliveryService {
    client: Client,
    registry: Arc<dyn AgentRegistry>,
    policy: RetryPolicy,
    history: Arc<Mutex<RingBuffer<DeliveryRecord>>>,
}

impl WebhookDeliveryService {
    /// 创建投递服务（默认策略和超时）
    pub fn new(registry: Arc<dyn AgentRegistry>) -> Result<Self> {
        Self::with_policy(registry, RetryPolicy::default(), DEFAULT_REQUEST_TIMEOUT)
    }

    /// 创建投递服务，指定重试策略和单次调用超时
    pub fn with_policy(
        registry: Arc<dyn AgentRegistry>,
        policy: RetryPolicy,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            registry,
            policy,
            history: Arc::new(Mutex::new(RingBuffer::new(DEFAULT_DELIVERY_HISTORY))),
        })
    }

    /// 投递载荷到单个 agent，带超时和有界重试
    ///
    /// 除了缺失 webhook URL 的校验错误外总是返回记录；记录最终
    /// 必定处于 success 或 failed，尝试次数不超过策略上限。
    pub async fn send_webhook(
        &self,
        profile: &AgentProfile,
        payload: &WebhookPayload,
    ) -> Result<DeliveryRecord> {
        if profile.webhook_url.trim().is_empty() {
            bail!("agent {} has no webhook url", profile.agent_id);
        }

        let mut record = DeliveryRecord::new(&profile.agent_id, payload.event.clone());

        loop {
            record.attempts += 1;
            debug!(
                delivery = %record.id,
                agent = %profile.agent_id,
                attempt = record.attempts,
                "sending webhook"
            );

            match self.attempt(profile, payload, &record.id).await {
                Ok(()) => {
                    record.complete_success();
                    info!(
                        delivery = %record.id,
                        agent = %profile.agent_id,
                        attempts = record.attempts,
                        "webhook delivered"
                    );
                    break;
                }
                Err(err) => {
                    record.last_error = Some(err.message().to_string());

                    let permanent = matches!(err, AttemptError::Permanent(_));
                    let exhausted = record.attempts >= self.policy.max_attempts;
                    if permanent || exhausted {
                        record.complete_failure(err.message().to_string());
                        warn!(
                            delivery = %record.id,
                            agent = %profile.agent_id,
                            attempts = record.attempts,
                            error = err.message(),
                            permanent,
                            "webhook delivery failed"
                        );
                        break;
                    }

                    let delay = self.policy.delay_after(record.attempts);
                    debug!(
                        delivery = %record.id,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        self.push_history(record.clone());
        Ok(record)
    }

    /// 对所有启用且订阅匹配的 agent 并发投递
    ///
    /// 每个目标恰好产生一条记录；单个目标的失败不影响其他目标，
    /// 也不作为错误抛出。
    pub async fn broadcast(&self, payload: &WebhookPayload) -> Result<Vec<DeliveryRecord>> {
        let targets: Vec<AgentProfile> = self
            .registry
            .list()
            .context("failed to read agent registry")?
            .into_iter()
            .filter(|p| p.enabled && p.accepts(&payload.event))
            .collect();

        debug!(kind = %payload.event, targets = targets.len(), "broadcasting webhook");

        let mut handles = Vec::with_capacity(targets.len());
        for profile in targets {
            let service = self.clone();
            let payload = payload.clone();
            handles.push(tokio::spawn(async move {
                if profile.webhook_url.trim().is_empty() {
                    // broadcast 内缺失 URL 不中断其他目标，落一条终态失败记录
                    let mut record =
                        DeliveryRecord::new(&profile.agent_id, payload.event.clone());
                    record.complete_failure("missing webhook url");
                    warn!(agent = %profile.agent_id, "skipping target without webhook url");
                    service.push_history(record.clone());
                    return record;
                }
                match service.send_webhook(&profile, &payload).await {
                    Ok(record) => record,
                    // send_webhook 只在 URL 校验时报错，上面已拦截；兜底落失败记录
                    Err(e) => {
                        let mut record =
                            DeliveryRecord::new(&profile.agent_id, payload.event.clone());
                        record.complete_failure(e.to_string());
                        service.push_history(record.clone());
                        record
                    }
                }
            }));
        }

        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(record) => records.push(record),
                Err(e) => warn!(error = %e, "delivery task panicked"),
            }
        }

        Ok(records)
    }

    /// 查询单个启用的 agent 配置（注册表透传）
    pub fn agent_config(&self, agent_id: &str) -> Result<Option<AgentProfile>> {
        Ok(self.registry.get(agent_id)?.filter(|p| p.enabled))
    }

    /// 所有启用的 agent 配置（注册表透传）
    pub fn all_configs(&self) -> Result<Vec<AgentProfile>> {
        Ok(self
            .registry
            .list()?
            .into_iter()
            .filter(|p| p.enabled)
            .collect())
    }

    /// 最近的投递记录（最新在前）
    pub fn delivery_history(&self, limit: usize) -> Vec<DeliveryRecord> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .recent(limit)
    }

    fn push_history(&self, record: DeliveryRecord) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }

    /// 发起一次 HTTP 调用并分类结果
    async fn attempt(
        &self,
        profile: &AgentProfile,
        payload: &WebhookPayload,
        delivery_id: &str,
    ) -> std::result::Result<(), AttemptError> {
        let response = self
            .client
            .post(&profile.webhook_url)
            .header(HEADER_CORRELATION_ID, delivery_id)
            .header(HEADER_AGENT_KIND, profile.agent_kind.to_string())
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                // 超时和连接错误都可重试
                AttemptError::Transient(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = format!("endpoint returned {}", status);
        if status.is_client_error()
            && status != reqwest::StatusCode::REQUEST_TIMEOUT
            && status != reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            Err(AttemptError::Permanent(message))
        } else {
            Err(AttemptError::Transient(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::registry::{AgentKind, MemoryRegistry};

    fn service_with(registry: MemoryRegistry) -> WebhookDeliveryService {
        WebhookDeliveryService::with_policy(
            Arc::new(registry),
            RetryPolicy::fast_for_test(),
            Duration::from_millis(200),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_webhook_missing_url_rejected() {
        let registry = MemoryRegistry::new();
        let service = service_with(registry);

        let profile = AgentProfile::new("a1", "Agent One", AgentKind::Coder, "  ");
        let payload = WebhookPayload::from_event(&Event::task_assigned("a1", "t-1"));

        let result = service.send_webhook(&profile, &payload).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no webhook url"));
    }

    #[tokio::test]
    async fn test_connection_refused_exhausts_retries() {
        let registry = MemoryRegistry::new();
        let service = service_with(registry);

        // 无人监听的端口，连接被拒绝属于可重试错误
        let profile = AgentProfile::new("a1", "Agent One", AgentKind::Coder, "http://127.0.0.1:1/hook");
        let payload = WebhookPayload::from_event(&Event::task_assigned("a1", "t-1"));

        let record = service.send_webhook(&profile, &payload).await.unwrap();
        assert_eq!(record.status, DeliveryStatus::Failed);
        assert_eq!(record.attempts, 3);
        assert!(record.last_error.is_some());
        assert!(record.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_broadcast_skips_disabled_and_filtered() {
        let registry = MemoryRegistry::new();
        registry.insert(AgentProfile::new(
            "enabled",
            "E",
            AgentKind::Coder,
            "http://127.0.0.1:1/hook",
        ));
        let mut disabled =
            AgentProfile::new("disabled", "D", AgentKind::Coder, "http://127.0.0.1:1/hook");
        disabled.enabled = false;
        registry.insert(disabled);
        registry.insert(
            AgentProfile::new("filtered", "F", AgentKind::Coder, "http://127.0.0.1:1/hook")
                .with_event_kinds(vec![crate::event::EventKind::TaskCompleted]),
        );

        let service = service_with(registry);
        let payload = WebhookPayload::from_event(&Event::task_assigned("a", "t"));
        let records = service.broadcast(&payload).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent_id, "enabled");
    }

    #[tokio::test]
    async fn test_broadcast_missing_url_yields_failed_record() {
        let registry = MemoryRegistry::new();
        registry.insert(AgentProfile::new("a1", "A", AgentKind::Coder, ""));

        let service = service_with(registry);
        let payload = WebhookPayload::from_event(&Event::task_assigned("a1", "t"));
        let records = service.broadcast(&payload).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DeliveryStatus::Failed);
        assert_eq!(records[0].last_error.as_deref(), Some("missing webhook url"));
        assert_eq!(records[0].attempts, 0);
    }

    #[tokio::test]
    async fn test_configs_filtered_to_enabled() {
        let registry = MemoryRegistry::new();
        registry.insert(AgentProfile::new(
            "a1",
            "A",
            AgentKind::Coder,
            "http://127.0.0.1:1/hook",
        ));
        let mut off = AgentProfile::new("a2", "B", AgentKind::Coder, "http://127.0.0.1:1/hook");
        off.enabled = false;
        registry.insert(off);

        let service = service_with(registry);
        assert_eq!(service.all_configs().unwrap().len(), 1);
        assert!(service.agent_config("a1").unwrap().is_some());
        assert!(service.agent_config("a2").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_records_every_delivery() {
        let registry = MemoryRegistry::new();
        registry.insert(AgentProfile::new(
            "a1",
            "A",
            AgentKind::Coder,
            "http://127.0.0.1:1/hook",
        ));

        let service = service_with(registry);
        let payload = WebhookPayload::from_event(&Event::task_assigned("a1", "t"));
        service.broadcast(&payload).await.unwrap();
        service.broadcast(&payload).await.unwrap();

        let history = service.delivery_history(10);
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r.is_terminal()));
    }
}
