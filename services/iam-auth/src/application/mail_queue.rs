//! 后台邮件队列
//!
//! 请求路径只负责入队，发送在独立任务中按重试策略执行，失败只记录日志。
//! 所有 `MailQueue` 句柄释放后，worker 处理完剩余任务再退出。

use std::sync::Arc;

use passage_adapter_email::EmailSender;
use passage_common::{RetryPolicy, with_retry};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 一封待发送的邮件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailJob {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Clone)]
pub struct MailQueue {
    tx: mpsc::Sender<MailJob>,
}

impl MailQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<MailJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// 非阻塞入队；队列满或已关闭时丢弃并返回 false
    pub fn enqueue(&self, job: MailJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(to = %job.to, "Mail queue full, dropping email");
                metrics::counter!("auth_emails_total", "result" => "dropped").increment(1);
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                error!(to = %job.to, "Mail queue closed, dropping email");
                metrics::counter!("auth_emails_total", "result" => "dropped").increment(1);
                false
            }
        }
    }
}

/// 启动邮件 worker
pub fn spawn_mail_worker(
    mut rx: mpsc::Receiver<MailJob>,
    sender: Arc<dyn EmailSender>,
    policy: RetryPolicy,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let result = with_retry(&policy, "send email", || {
                sender.send_html_email(&job.to, &job.subject, &job.html, None)
            })
            .await;

            match result {
                Ok(()) => {
                    metrics::counter!("auth_emails_total", "result" => "sent").increment(1);
                }
                Err(e) => {
                    error!(to = %job.to, error = %e, "Failed to send email");
                    metrics::counter!("auth_emails_total", "result" => "failed").increment(1);
                }
            }
        }

        info!("Mail worker stopped");
    })
}
