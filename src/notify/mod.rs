//! Outbound alert notifications.
//!
//! Newly created alerts are turned into [`Notification`]s and delivered
//! through every registered [`NotificationChannel`]. Delivery is skipped
//! inside the configured quiet hours and retried up to `max_retries`
//! attempts per channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::alerts;
use crate::models::Alert;

pub mod webhook;

pub use webhook::WebhookChannel;

// ---

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint returned HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AlertCreated,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Normal,
    High,
    Critical,
}

/// Message handed to every channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub alert_id: Option<i64>,
    pub plant_id: Option<i64>,
    pub sensor_type: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
}

impl Notification {
    pub fn from_alert(alert: &Alert) -> Self {
        Self {
            kind: NotificationKind::AlertCreated,
            severity: Severity::High,
            title: format!("Plant alert: {}", alert.sensor_type),
            message: alert.message.clone(),
            timestamp: alert.timestamp,
            alert_id: Some(alert.id),
            plant_id: alert.plant_id,
            sensor_type: Some(alert.sensor_type.clone()),
            value: Some(alert.value),
            unit: Some(alert.unit.clone()),
        }
    }

    pub fn custom(
        title: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: NotificationKind::Custom,
            severity: Severity::Normal,
            title: title.into(),
            message: message.into(),
            timestamp: now,
            alert_id: None,
            plant_id: None,
            sensor_type: None,
            value: None,
            unit: None,
        }
    }
}

/// A delivery channel for notifications (webhook, ...).
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    fn channel_name(&self) -> &str;
}

/// Daily window in which nothing is sent. Bounds are inclusive; a start after
/// the end wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    /// Parse `"HH:MM"` bounds.
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
        Some(Self { start, end })
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start > self.end {
            time >= self.start || time <= self.end
        } else {
            time >= self.start && time <= self.end
        }
    }
}

/// Notification settings loaded with the rest of [`crate::Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    pub quiet_hours: Option<QuietHours>,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            quiet_hours: None,
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// Outcome of one channel delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryResult {
    pub channel: String,
    pub success: bool,
    pub attempts: u32,
    pub error: Option<String>,
}

/// Fans notifications out to the registered channels. Cheap to clone.
#[derive(Clone)]
pub struct Notifier {
    channels: Arc<Vec<Box<dyn NotificationChannel>>>,
    quiet_hours: Option<QuietHours>,
    max_retries: u32,
    retry_delay: Duration,
}

impl Notifier {
    pub fn from_config(cfg: &NotifyConfig) -> Self {
        // ---
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();
        if let Some(url) = &cfg.webhook_url {
            channels.push(Box::new(WebhookChannel::new(url)));
        }
        Self::with_channels(channels, cfg)
    }

    pub fn with_channels(channels: Vec<Box<dyn NotificationChannel>>, cfg: &NotifyConfig) -> Self {
        Self {
            channels: Arc::new(channels),
            quiet_hours: cfg.quiet_hours,
            max_retries: cfg.max_retries.max(1),
            retry_delay: cfg.retry_delay,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.channels.is_empty()
    }

    /// Deliver `notification` through every channel. Returns no results when
    /// `local_time` falls inside the quiet hours.
    pub async fn notify(
        &self,
        notification: &Notification,
        local_time: NaiveTime,
    ) -> Vec<DeliveryResult> {
        // ---
        if self.quiet_hours.is_some_and(|q| q.contains(local_time)) {
            info!("Skipping notification during quiet hours: {}", notification.title);
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.channels.len());
        for channel in self.channels.iter() {
            results.push(self.send_with_retry(channel.as_ref(), notification).await);
        }

        let sent = results.iter().filter(|r| r.success).count();
        debug!("Notification sent: {}/{} channels succeeded", sent, results.len());
        results
    }

    async fn send_with_retry(
        &self,
        channel: &dyn NotificationChannel,
        notification: &Notification,
    ) -> DeliveryResult {
        // ---
        let mut last_err = None;
        for attempt in 1..=self.max_retries {
            match channel.send(notification).await {
                Ok(()) => {
                    return DeliveryResult {
                        channel: channel.channel_name().to_string(),
                        success: true,
                        attempts: attempt,
                        error: None,
                    };
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max = self.max_retries,
                        "{} delivery failed: {}",
                        channel.channel_name(),
                        e
                    );
                    last_err = Some(e.to_string());
                }
            }
            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        error!(
            "{} failed after {} attempts",
            channel.channel_name(),
            self.max_retries
        );
        DeliveryResult {
            channel: channel.channel_name().to_string(),
            success: false,
            attempts: self.max_retries,
            error: last_err,
        }
    }

    /// Look up each new alert and notify it. Returns the number of alerts
    /// delivered by at least one channel.
    pub async fn notify_alerts(
        &self,
        pool: &SqlitePool,
        alert_ids: &[i64],
        local_time: NaiveTime,
    ) -> Result<usize, sqlx::Error> {
        // ---
        let mut delivered = 0;
        for id in alert_ids {
            let Some(alert) = alerts::find(pool, *id).await? else {
                continue;
            };
            let results = self.notify(&Notification::from_alert(&alert), local_time).await;
            if results.iter().any(|r| r.success) {
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Notify new alerts in the background so ingestion never waits on
    /// outbound HTTP.
    pub fn dispatch(&self, pool: &SqlitePool, alert_ids: Vec<i64>) {
        // ---
        if alert_ids.is_empty() || !self.is_enabled() {
            return;
        }

        let notifier = self.clone();
        let pool = pool.clone();
        tokio::spawn(async move {
            let now = Local::now().time();
            if let Err(e) = notifier.notify_alerts(&pool, &alert_ids, now).await {
                error!("Failed to load alerts for notification: {}", e);
            }
        });
    }
}

#[cfg(test)]
pub(crate) mod testing {
    // ---
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Channel that fails its first `failures` sends and records the rest.
    #[derive(Clone, Default)]
    pub struct RecordingChannel {
        pub failures: Arc<AtomicU32>,
        pub sent: Arc<Mutex<Vec<Notification>>>,
    }

    impl RecordingChannel {
        pub fn failing(failures: u32) -> Self {
            let channel = Self::default();
            channel.failures.store(failures, Ordering::SeqCst);
            channel
        }

        pub fn sent(&self) -> Vec<Notification> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(NotifyError::Status(503));
            }
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }

        fn channel_name(&self) -> &str {
            "recording"
        }
    }
}
