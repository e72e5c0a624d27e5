use exampro::{
    config::{get_config, init_config},
    services::analytics_service::AnalyticsService,
    App,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.rust_log))
        .with_writer(std::io::stderr)
        .init();

    let app = App::from_config(config)?;
    let state = app.store.snapshot();
    info!(
        data_dir = %config.data_dir.display(),
        exams = state.exams.len(),
        submissions = state.submissions.len(),
        "Application state ready"
    );

    let report = serde_json::json!({
        "overview": AnalyticsService::overview(&state.exams, &state.submissions),
        "analytics": AnalyticsService::compute(&state.exams, &state.submissions),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
