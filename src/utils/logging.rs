/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::BatchRunSummary;

/// 初始化 tracing 日志
///
/// 默认级别 info，`verbose` 时为 debug，`RUST_LOG` 优先。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

/// 记录运行开始信息
pub fn log_run_start(task: &str, selected: usize, available: usize, batch_size: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 开始任务: {}", task);
    info!("✓ 本次处理 {} 个词（共 {} 个）", selected, available);
    info!("📋 将以每批 {} 个的方式处理", batch_size);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始词编号
/// - `end`: 结束词编号
/// - `total`: 词总数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批词: {}-{} / 共 {} 个", start, end, total);
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(task: &str, summary: &BatchRunSummary) {
    info!("{}", "=".repeat(60));
    info!("📊 {} 全部处理完成统计", task);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.successes, summary.dispatched);
    info!(
        "❌ 失败: {} (限流 {}, 安全拒绝 {}, 其他 {})",
        summary.failures(),
        summary.rate_limited,
        summary.safety_rejected,
        summary.other
    );
    info!("💾 已写入: {} / 丢失: {}", summary.persisted, summary.lost_writes);
    info!("⏱️ 耗时: {:.1}s", summary.elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("crossword", 5), "cross...");
        assert_eq!(truncate_text("clue", 10), "clue");
    }
}
