use anyhow::Result;
use std::env;

const MIN_SECRET_LEN: usize = 32;

/// HS256 settings shared with the identity provider. This service only
/// verifies tokens; minting exists for tooling and tests.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry: u64,
    /// Clock skew tolerated when checking `exp`, in seconds.
    pub leeway: u64,
}

impl JwtConfig {
    pub fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable must be set"))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            ));
        }

        Ok(Self {
            secret,
            access_token_expiry: env_u64("JWT_ACCESS_EXPIRATION", 900),
            leeway: env_u64("JWT_LEEWAY_SECS", 30),
        })
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
