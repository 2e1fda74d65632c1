use std::env;
use std::sync::OnceLock;

static MODERATION_CONFIG: OnceLock<ModerationConfig> = OnceLock::new();

/// Tunables for the moderation engine's housekeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModerationConfig {
    /// Users whose membership is unwound per transaction during a cascade.
    pub cascade_user_batch_size: usize,
    /// Live notifications retained per user before cleanup kicks in.
    pub notification_max_per_user: u64,
    pub notification_ttl_days: i64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            cascade_user_batch_size: 400,
            notification_max_per_user: 80,
            notification_ttl_days: 30,
        }
    }
}

impl ModerationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cascade_user_batch_size: parse_positive_env(
                "CASCADE_USER_BATCH_SIZE",
                defaults.cascade_user_batch_size,
            ),
            notification_max_per_user: parse_positive_env(
                "NOTIFICATION_MAX_PER_USER",
                defaults.notification_max_per_user,
            ),
            notification_ttl_days: parse_positive_env(
                "NOTIFICATION_TTL_DAYS",
                defaults.notification_ttl_days,
            ),
        }
    }

    /// Process-wide settings, read from the environment on first use.
    pub fn global() -> ModerationConfig {
        *MODERATION_CONFIG.get_or_init(Self::from_env)
    }
}

fn parse_positive_env<T>(var_name: &str, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + Default,
{
    env::var(var_name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .filter(|v| *v > T::default())
        .unwrap_or(default)
}

pub fn parse_bool_env(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .ok()
        .and_then(|value| parse_bool(&value))
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_limits() {
        let cfg = ModerationConfig::default();
        assert_eq!(cfg.notification_max_per_user, 80);
        assert_eq!(cfg.notification_ttl_days, 30);
        assert_eq!(cfg.cascade_user_batch_size, 400);
    }

    #[test]
    fn bool_values() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
