use super::calc::{evaluate, is_allowed, CalcError};
use super::*;

fn ctx() -> CommandContext<'static> {
    CommandContext {
        phase: Phase::Connected,
        remote_identity: Some("5511999887766"),
        uptime: Duration::from_secs(185),
        memory_bytes: Some(10 * 1024 * 1024),
    }
}

fn reply(text: &str) -> String {
    let cmd = Command::parse(text).unwrap();
    handle(&cmd, &ctx())
}

#[test]
fn test_parse_requires_prefix() {
    assert_eq!(Command::parse("ping"), None);
    assert_eq!(Command::parse(" .ping"), None);
    assert_eq!(Command::parse(".ping"), Some(Command::Ping));
    assert_eq!(Command::parse("!ping"), Some(Command::Ping));
}

#[test]
fn test_parse_lowercases_command() {
    assert_eq!(Command::parse(".PING"), Some(Command::Ping));
    assert_eq!(Command::parse("!Help"), Some(Command::Help));
    assert_eq!(
        Command::parse(".Nope"),
        Some(Command::Unknown("nope".to_string()))
    );
}

#[test]
fn test_parse_args_after_single_separator() {
    assert_eq!(
        Command::parse(".echo  two spaces"),
        Some(Command::Echo(" two spaces".to_string()))
    );
    assert_eq!(
        Command::parse(".calc 2+2"),
        Some(Command::Calc("2+2".to_string()))
    );
    assert_eq!(Command::parse(".echo"), Some(Command::Echo(String::new())));
}

#[test]
fn test_parse_bare_prefix_is_unknown() {
    let cmd = Command::parse(".").unwrap();
    assert_eq!(cmd, Command::Unknown(String::new()));
    assert_eq!(cmd.name(), "");
}

#[test]
fn test_ping_reports_phase_and_uptime() {
    let text = reply(".ping");
    assert!(text.starts_with("🏓 Pong!"));
    assert!(text.contains("Status: connected"));
    assert!(text.contains("Uptime: 3 minutes"));
}

#[test]
fn test_help_lists_commands() {
    let text = reply("!help");
    for cmd in [".ping", ".help", ".time", ".status", ".echo", ".calc"] {
        assert!(text.contains(cmd), "help should mention {cmd}");
    }
}

#[test]
fn test_time_reply() {
    assert!(reply(".time").starts_with("🕰️ Server Time: "));
}

#[test]
fn test_status_reply() {
    let text = reply(".status");
    assert!(text.contains("• Connection: connected"));
    assert!(text.contains("• Phone: 5511999887766"));
    assert!(text.contains("• Memory: 10.00 MB"));

    let offline = CommandContext {
        phase: Phase::Disconnected,
        remote_identity: None,
        uptime: Duration::ZERO,
        memory_bytes: None,
    };
    let text = handle(&Command::Status, &offline);
    assert!(text.contains("• Phone: Not connected"));
    assert!(text.contains("• Memory: unknown"));
}

#[test]
fn test_echo() {
    assert_eq!(reply(".echo hello world"), "hello world");
    assert_eq!(reply(".echo"), "Usage: .echo [text]");
    assert_eq!(reply(".echo    "), "Usage: .echo [text]");
}

#[test]
fn test_calc_replies() {
    assert_eq!(reply(".calc 2+2"), "2+2 = 4");
    assert_eq!(reply(".calc  2 * 3 "), "2 * 3 = 6");
    assert_eq!(reply(".calc (1 + 2) * 3"), "(1 + 2) * 3 = 9");
    assert_eq!(reply(".calc 7/2"), "7/2 = 3.5");
    assert_eq!(
        reply(".calc 2+2; alert(1)"),
        "Invalid expression. Only numbers and + - * / ( ) allowed."
    );
    assert_eq!(
        reply(".calc (2+2"),
        "Calculation error. Please check your expression."
    );
    assert_eq!(
        reply(".calc 1/0"),
        "Calculation error. Please check your expression."
    );
}

#[test]
fn test_unknown_reply() {
    assert_eq!(
        reply(".dance"),
        "❓ Unknown command: dance\nType .help for available commands."
    );
}

#[test]
fn test_calc_whitelist() {
    assert!(is_allowed("1 + 2.5 * (3 - 4) / 5"));
    assert!(!is_allowed(""));
    assert!(!is_allowed("   "));
    assert!(!is_allowed("2**3 && x"));
    assert!(!is_allowed("process.exit()"));
    assert!(!is_allowed("1e3"));
}

#[test]
fn test_calc_precedence_and_unary() {
    assert_eq!(evaluate("2+3*4"), Ok(14.0));
    assert_eq!(evaluate("(2+3)*4"), Ok(20.0));
    assert_eq!(evaluate("10-4-3"), Ok(3.0));
    assert_eq!(evaluate("-3+5"), Ok(2.0));
    assert_eq!(evaluate("2*-3"), Ok(-6.0));
    assert_eq!(evaluate("--2"), Ok(2.0));
    assert_eq!(evaluate("0.5 + .25"), Ok(0.75));
    assert_eq!(evaluate("-0"), Ok(0.0));
}

#[test]
fn test_calc_malformed() {
    assert_eq!(evaluate("2+"), Err(CalcError::Malformed));
    assert_eq!(evaluate("()"), Err(CalcError::Malformed));
    assert_eq!(evaluate("(1))"), Err(CalcError::Malformed));
    assert_eq!(evaluate("1.2.3"), Err(CalcError::Malformed));
    assert_eq!(evaluate("2 3"), Err(CalcError::Malformed));
    assert_eq!(evaluate("."), Err(CalcError::Malformed));
}

#[test]
fn test_calc_non_finite() {
    assert_eq!(evaluate("1/0"), Err(CalcError::NonFinite));
    assert_eq!(evaluate("0/0"), Err(CalcError::NonFinite));
}

#[test]
fn test_calc_nesting_limit() {
    let deep = format!("{}1{}", "(".repeat(500), ")".repeat(500));
    assert_eq!(evaluate(&deep), Err(CalcError::Malformed));
    let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
    assert_eq!(evaluate(&shallow), Ok(1.0));
}
