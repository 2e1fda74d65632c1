use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimitRule {
    const fn new(per_second: u64, burst_size: u32) -> Self {
        Self {
            per_second,
            burst_size,
        }
    }
}

/// Per-route-group limits for the REST gateway.
///
/// `RATE_LIMIT_CONFIG` accepts either a single `per:burst` rule applied to
/// every group, or `read=30:60,write=10:20,moderation=5:10`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub read: RateLimitRule,
    pub write: RateLimitRule,
    pub moderation: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            read: RateLimitRule::new(30, 60),
            write: RateLimitRule::new(10, 20),
            moderation: RateLimitRule::new(5, 10),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.enabled = super::moderation::parse_bool_env("RATE_LIMIT_ENABLED", cfg.enabled);

        if let Ok(raw) = env::var("RATE_LIMIT_CONFIG") {
            match parse_groups(&raw) {
                Ok(overrides) => {
                    for (group, rule) in overrides {
                        cfg.set(group, rule);
                    }
                }
                Err(err) => {
                    tracing::warn!("Invalid RATE_LIMIT_CONFIG '{}': {}", raw, err);
                }
            }
        }

        cfg
    }

    fn set(&mut self, group: Group, rule: RateLimitRule) {
        match group {
            Group::All => {
                self.read = rule;
                self.write = rule;
                self.moderation = rule;
            }
            Group::Read => self.read = rule,
            Group::Write => self.write = rule,
            Group::Moderation => self.moderation = rule,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    All,
    Read,
    Write,
    Moderation,
}

fn parse_groups(raw: &str) -> Result<Vec<(Group, RateLimitRule)>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty value".to_string());
    }

    if !trimmed.contains('=') {
        return Ok(vec![(Group::All, parse_rule(trimmed)?)]);
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (name, raw_rule) = item
                .split_once('=')
                .ok_or_else(|| format!("invalid item '{}', expected name=per:burst", item))?;
            let group = match name.trim().to_ascii_lowercase().as_str() {
                "read" | "public" => Group::Read,
                "write" | "protected" => Group::Write,
                "moderation" | "mod" => Group::Moderation,
                other => {
                    return Err(format!(
                        "unknown group '{}', expected read/write/moderation",
                        other
                    ))
                }
            };
            Ok((group, parse_rule(raw_rule.trim())?))
        })
        .collect()
}

fn parse_rule(raw: &str) -> Result<RateLimitRule, String> {
    let (per_second_raw, burst_raw) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw))?;

    let per_second: u64 = per_second_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid per_second '{}'", per_second_raw.trim()))?;
    let burst_size: u32 = burst_raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid burst_size '{}'", burst_raw.trim()))?;

    if per_second == 0 || burst_size == 0 {
        return Err("per_second and burst_size must be > 0".to_string());
    }

    Ok(RateLimitRule::new(per_second, burst_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_rule_applies_to_all_groups() {
        let parsed = parse_groups("12:24").unwrap();
        assert_eq!(parsed, vec![(Group::All, RateLimitRule::new(12, 24))]);

        let mut cfg = RateLimitConfig::default();
        for (g, r) in parsed {
            cfg.set(g, r);
        }
        assert_eq!(cfg.moderation, RateLimitRule::new(12, 24));
        assert_eq!(cfg.read, RateLimitRule::new(12, 24));
    }

    #[test]
    fn grouped_rules_with_aliases() {
        let parsed = parse_groups("public=3:4, mod=1:2").unwrap();
        assert_eq!(
            parsed,
            vec![
                (Group::Read, RateLimitRule::new(3, 4)),
                (Group::Moderation, RateLimitRule::new(1, 2)),
            ]
        );
    }

    #[test]
    fn zero_rate_is_rejected() {
        let err = parse_groups("write=0:5").unwrap_err();
        assert!(err.contains("must be > 0"));
    }

    #[test]
    fn unknown_group_is_rejected() {
        assert!(parse_groups("auth=1:2").unwrap_err().contains("unknown group"));
    }
}
