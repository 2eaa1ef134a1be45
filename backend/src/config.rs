use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub dispatch: DispatchConfig,
}

/// Timing rules for appointments derived from offer transitions.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Hour of day (UTC) at which approval tasks are due the next day.
    pub approval_task_hour: u32,
    /// Lead time before the email-send reminder fires, in minutes.
    pub email_reminder_lead_minutes: i64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            approval_task_hour: 9,
            email_reminder_lead_minutes: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = DispatchConfig::default();

        let approval_task_hour = env::var("APPROVAL_TASK_HOUR")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|h| *h < 24)
            .unwrap_or(defaults.approval_task_hour);

        let email_reminder_lead_minutes = env::var("EMAIL_REMINDER_LEAD_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|m| *m > 0)
            .unwrap_or(defaults.email_reminder_lead_minutes);

        Ok(Config {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            dispatch: DispatchConfig {
                approval_task_hour,
                email_reminder_lead_minutes,
            },
        })
    }
}
