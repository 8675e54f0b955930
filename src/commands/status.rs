//! Information replies: .ping, .help, .time, .status.

use super::CommandContext;
use crate::process::{format_memory, uptime_minutes};

pub(super) fn handle_ping(ctx: &CommandContext<'_>) -> String {
    format!(
        "🏓 Pong! Bot is active.\nStatus: {}\nUptime: {} minutes",
        ctx.phase,
        uptime_minutes(ctx.uptime)
    )
}

pub(super) fn handle_help() -> String {
    "📚 *Edison Bot Commands* 🤖\n\n\
     *Basic Commands:*\n\
     • .ping - Check bot status\n\
     • .help - Show this message\n\
     • .time - Current server time\n\
     • .status - Connection status\n\n\
     *Utility Commands:*\n\
     • .echo [text] - Repeat your text\n\
     • .calc [expression] - Simple calculator\n\n\
     Commands also work with the ! prefix."
        .to_string()
}

pub(super) fn handle_time() -> String {
    format!(
        "🕰️ Server Time: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

pub(super) fn handle_status(ctx: &CommandContext<'_>) -> String {
    format!(
        "📊 *Bot Status*\n\n\
         • Connection: {}\n\
         • Phone: {}\n\
         • Uptime: {} minutes\n\
         • Memory: {}",
        ctx.phase,
        ctx.remote_identity.unwrap_or("Not connected"),
        uptime_minutes(ctx.uptime),
        format_memory(ctx.memory_bytes),
    )
}
