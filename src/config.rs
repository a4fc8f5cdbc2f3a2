#[derive(Clone)]
pub struct Config {
    pub api_base: String,
    pub predict_timeout_secs: u64,
    pub fused_timeout_secs: u64,
    pub tick_secs: u64,
    pub demo_ticks: u32,
    pub listen_addr: String,
    pub user_name: Option<String>,
    pub person: Option<String>,
    pub day: Option<String>,
    pub data_url: Option<String>,
    pub chart_dirs: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base: std::env::var("API_BASE")
                .unwrap_or_else(|_| "https://hypopredict-678277177269.europe-west1.run.app".to_string()),
            predict_timeout_secs: std::env::var("PREDICT_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(120),
            fused_timeout_secs: std::env::var("FUSED_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(30),
            tick_secs: std::env::var("TICK_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(1),
            demo_ticks: std::env::var("DEMO_TICKS").ok().and_then(|v| v.parse().ok()).unwrap_or(60),
            listen_addr: format!(
                "0.0.0.0:{}",
                std::env::var("PORT").ok().and_then(|v| v.parse::<u16>().ok()).unwrap_or(8080)
            ),
            user_name: std::env::var("USER_NAME").ok(),
            person: std::env::var("PERSON").ok(),
            day: std::env::var("DAY").ok(),
            data_url: std::env::var("DATA_URL").ok(),
            chart_dirs: std::env::var("CHART_DIRS")
                .map(|v| v.split(':').map(|s| s.to_string()).collect())
                .unwrap_or_else(|_| vec!["assets/charts".to_string(), "static/charts".to_string()]),
        }
    }
}
