//! # Notification Scheduler
//!
//! A single long-lived task that periodically broadcasts discount digests and
//! item news. Each job runs when its interval has elapsed since its last
//! attempt; a failed attempt still counts. A failure for one recipient never
//! affects the others.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bot::ui_builder::{discount_digest, news_message};
use crate::config::SchedulerConfig;
use crate::gateway::{BackendGateway, GatewayError};
use crate::models::{ItemId, NewsEntry, UserId};
use crate::transport::{MessagingTransport, Outbound};

/// The two broadcast jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    DiscountDigest,
    NewsDigest,
}

/// Time of the last attempt of each job; `None` means never
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleClock {
    pub last_discount_run: Option<DateTime<Utc>>,
    pub last_news_run: Option<DateTime<Utc>>,
}

impl ScheduleClock {
    /// Jobs whose interval has elapsed at `now`
    pub fn due_jobs(&self, now: DateTime<Utc>, config: &SchedulerConfig) -> Vec<Job> {
        let is_due = |last: Option<DateTime<Utc>>, interval: chrono::Duration| {
            last.map_or(true, |last| now - last >= interval)
        };

        let mut jobs = Vec::new();
        if is_due(self.last_discount_run, config.discount_interval) {
            jobs.push(Job::DiscountDigest);
        }
        if is_due(self.last_news_run, config.news_interval) {
            jobs.push(Job::NewsDigest);
        }
        jobs
    }

    pub fn record(&mut self, job: Job, at: DateTime<Utc>) {
        match job {
            Job::DiscountDigest => self.last_discount_run = Some(at),
            Job::NewsDigest => self.last_news_run = Some(at),
        }
    }
}

/// Outcome of one broadcast run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Users the run was meant for
    pub recipients: usize,
    /// Messages delivered
    pub delivered: usize,
    /// Messages that failed to send
    pub failed: usize,
}

pub struct NotificationScheduler {
    gateway: Arc<dyn BackendGateway>,
    transport: Arc<dyn MessagingTransport>,
    config: SchedulerConfig,
    clock: ScheduleClock,
}

impl NotificationScheduler {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        transport: Arc<dyn MessagingTransport>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            gateway,
            transport,
            config,
            clock: ScheduleClock::default(),
        }
    }

    pub fn clock(&self) -> &ScheduleClock {
        &self.clock
    }

    /// Run until `cancel` fires; a job in progress is finished first
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_secs = self.config.poll_interval.as_secs(),
            "Notification scheduler started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Notification scheduler stopped");
                    break;
                }
                _ = interval.tick() => {
                    self.tick(Utc::now()).await;
                }
            }
        }
    }

    /// Run every job due at `now` and return the jobs attempted
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Vec<Job> {
        let due = self.clock.due_jobs(now, &self.config);

        for job in &due {
            let result = match job {
                Job::DiscountDigest => self.run_discount_digest().await,
                Job::NewsDigest => self.run_news_digest().await,
            };
            self.clock.record(*job, now);

            match result {
                Ok(report) => info!(
                    job = ?job,
                    recipients = report.recipients,
                    delivered = report.delivered,
                    failed = report.failed,
                    "Broadcast finished"
                ),
                Err(e) => error!(job = ?job, error = %e, "Broadcast failed"),
            }
        }

        due
    }

    /// Send the top discounts to every user subscribed to sales
    pub async fn run_discount_digest(&self) -> Result<BroadcastReport, GatewayError> {
        let users = self.gateway.list_all_users().await?;
        let recipients: Vec<UserId> = users
            .iter()
            .filter(|user| user.subscription_on_sales)
            .map(|user| user.chat_id)
            .collect();

        let mut report = BroadcastReport {
            recipients: recipients.len(),
            ..Default::default()
        };
        if recipients.is_empty() {
            return Ok(report);
        }

        let items = self.gateway.list_discounted().await?;
        if items.is_empty() {
            debug!("No discounted items to broadcast");
            return Ok(report);
        }

        let message = Outbound::html(discount_digest(&items));
        for user in recipients {
            self.deliver(user, &message, &mut report).await;
        }

        Ok(report)
    }

    /// Send the latest news of every subscribed item to its subscribers
    pub async fn run_news_digest(&self) -> Result<BroadcastReport, GatewayError> {
        let users = self.gateway.list_all_users().await?;
        let subscribers: Vec<_> = users
            .iter()
            .filter(|user| !user.subscribed_items.is_empty())
            .collect();

        let mut report = BroadcastReport {
            recipients: subscribers.len(),
            ..Default::default()
        };
        let mut latest_news: HashMap<ItemId, Option<NewsEntry>> = HashMap::new();

        for user in subscribers {
            for item in &user.subscribed_items {
                if !latest_news.contains_key(item) {
                    let news = self.gateway.get_news(*item).await.into_iter().next();
                    latest_news.insert(*item, news);
                }

                let Some(Some(entry)) = latest_news.get(item) else {
                    continue;
                };

                let message = Outbound::html(news_message(entry));
                self.deliver(user.chat_id, &message, &mut report).await;
            }
        }

        Ok(report)
    }

    async fn deliver(&self, user: UserId, message: &Outbound, report: &mut BroadcastReport) {
        match self.transport.send(user, message).await {
            Ok(_) => report.delivered += 1,
            Err(e) => {
                warn!(user_id = %user, error = %e, "Failed to deliver notification");
                report.failed += 1;
            }
        }
    }
}
