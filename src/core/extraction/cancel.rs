//! 协作式取消 - 截止时间到达时通知仍在运行的提取任务
//!
//! 子令牌跟随父令牌取消；取消子令牌不影响父令牌。
//! `cancel` / `is_cancelled` / `child_token` 均为同步调用，无需异步运行时。

pub use tokio_util::sync::CancellationToken;
