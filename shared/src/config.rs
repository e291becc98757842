use std::env;
use std::str::FromStr;

/// Loan policy applied uniformly by the circulation engine. Fixed for the
/// lifetime of a service instance; per-call overrides are not supported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CirculationPolicy {
    /// Fine charged per whole day overdue, in currency units.
    pub daily_fine_rate: f64,
    /// Loan period granted at borrow time, in days.
    pub default_loan_days: i64,
    /// Days added to the due date by each renewal.
    pub renewal_days: i64,
    /// Renewals allowed per loan before renewal is refused.
    pub max_renewals: u32,
}

impl Default for CirculationPolicy {
    fn default() -> Self {
        Self {
            daily_fine_rate: 0.50,
            default_loan_days: 14,
            renewal_days: 7,
            max_renewals: 2,
        }
    }
}

impl CirculationPolicy {
    /// Reads the policy from `LIBRARY_*` environment variables, keeping the
    /// default for any variable that is unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            daily_fine_rate: env_or("LIBRARY_DAILY_FINE_RATE", defaults.daily_fine_rate),
            default_loan_days: env_or("LIBRARY_DEFAULT_LOAN_DAYS", defaults.default_loan_days),
            renewal_days: env_or("LIBRARY_RENEWAL_DAYS", defaults.renewal_days),
            max_renewals: env_or("LIBRARY_MAX_RENEWALS", defaults.max_renewals),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub library_name: String,
    pub policy: CirculationPolicy,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            library_name: env::var("LIBRARY_NAME")
                .unwrap_or_else(|_| "Digital Library Management System".into()),
            policy: CirculationPolicy::from_env(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library_name: "Digital Library Management System".into(),
            policy: CirculationPolicy::default(),
        }
    }
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(%key, value = %raw, "unparsable policy value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_library_constants() {
        let policy = CirculationPolicy::default();
        assert_eq!(policy.daily_fine_rate, 0.50);
        assert_eq!(policy.default_loan_days, 14);
        assert_eq!(policy.max_renewals, 2);
    }

    #[test]
    fn env_overrides_apply_and_garbage_falls_back() {
        env::set_var("LIBRARY_RENEWAL_DAYS", "10");
        env::set_var("LIBRARY_MAX_RENEWALS", "plenty");
        let policy = CirculationPolicy::from_env();
        env::remove_var("LIBRARY_RENEWAL_DAYS");
        env::remove_var("LIBRARY_MAX_RENEWALS");

        assert_eq!(policy.renewal_days, 10);
        assert_eq!(policy.max_renewals, CirculationPolicy::default().max_renewals);
    }
}
