// --- Default value functions ---

pub(super) fn default_name() -> String {
    "Edison".to_string()
}
pub(super) fn default_log_level() -> String {
    "info".to_string()
}
pub(super) fn default_host() -> String {
    "0.0.0.0".to_string()
}
pub(super) fn default_port() -> u16 {
    3001
}
pub(super) fn default_auth_dir() -> String {
    "./auth_session".to_string()
}
pub(super) fn default_pair_timeout() -> u64 {
    15
}
pub(super) fn default_reconnect_delay() -> u64 {
    5
}
pub(super) fn default_activity_capacity() -> usize {
    crate::activity::DEFAULT_CAPACITY
}
pub(super) fn default_device_name() -> String {
    "Edison".to_string()
}
pub(super) fn default_audit_timeout() -> u64 {
    5
}
