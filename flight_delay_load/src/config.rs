use rand::Rng;
use std::env;
use std::time::Duration;

/// Load generator settings, read from the environment.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub target_host: String,
    pub users: usize,
    pub wait_min: Duration,
    pub wait_max: Duration,
    /// Stop after this long; `None` runs until Ctrl-C.
    pub run_time: Option<Duration>,
    pub request_timeout: Duration,
}

fn secs(value: Option<String>) -> Option<Duration> {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
}

impl LoadConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut wait_min = secs(get("WAIT_MIN_S")).unwrap_or(Duration::from_secs(1));
        let mut wait_max = secs(get("WAIT_MAX_S")).unwrap_or(Duration::from_secs(3));
        if wait_min > wait_max {
            std::mem::swap(&mut wait_min, &mut wait_max);
        }

        Self {
            target_host: get("TARGET_HOST").unwrap_or_else(|| "http://localhost:8080".to_string()),
            users: get("USERS")
                .and_then(|u| u.parse().ok())
                .filter(|u| *u > 0)
                .unwrap_or(1),
            wait_min,
            wait_max,
            run_time: secs(get("RUN_TIME_S")),
            request_timeout: secs(get("REQUEST_TIMEOUT_S")).unwrap_or(Duration::from_secs(10)),
        }
    }

    pub fn predict_url(&self) -> String {
        format!("{}/predict", self.target_host.trim_end_matches('/'))
    }

    /// Uniform pause between two requests of one user.
    pub fn next_wait<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.wait_min == self.wait_max {
            return self.wait_min;
        }
        rng.gen_range(self.wait_min..=self.wait_max)
    }
}
