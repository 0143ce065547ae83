//! 尾沿防抖
//!
//! 每个变更事件都会取消并重新开始计时，只有安静 [`DEBOUNCE_DELAY`] 之后才触发一次。
//! 监听器错误不参与计时，直接交给错误回调。

use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

/// 默认防抖延迟
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// 文件监听器送来的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changed,
    Error(String),
}

/// 防抖循环，直到收到停止信号或事件通道关闭
///
/// `on_fire` 执行期间到达的事件会排队，结束后重新开始计时。
pub async fn run_debounce<F, Fut, E>(
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
    mut shutdown: oneshot::Receiver<()>,
    delay: Duration,
    mut on_fire: F,
    mut on_error: E,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
    E: FnMut(String),
{
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Some(WatchEvent::Changed) => deadline = Some(Instant::now() + delay),
                Some(WatchEvent::Error(message)) => on_error(message),
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                on_fire().await;
            }
        }
    }
}
