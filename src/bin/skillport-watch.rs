use skillport::config::WatchConfig;
use skillport::tracker::{
    scraper_for, HttpPageSource, Monitor, MonitorConfig, ProfileStore, Relay,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillport=info".into()),
        )
        .init();

    let config = WatchConfig::from_env()?;

    let scraper = scraper_for(config.platform)
        .ok_or_else(|| format!("no watcher is available for {}", config.platform))?;

    let profiles = ProfileStore::new(&config.profile_path);
    let mut profile = profiles.load().await?;

    let email = config
        .email
        .clone()
        .or_else(|| profile.email.clone())
        .map(|e| e.trim().to_lowercase())
        .filter(|e| e.contains('@'))
        .ok_or("no practitioner email: set SKILLPORT_EMAIL or add one to the profile")?;
    if profile.email.as_deref() != Some(email.as_str()) {
        profile.email = Some(email.clone());
        profiles.save(&profile).await?;
    }

    let cooldown = config.cooldown.unwrap_or_else(|| scraper.default_cooldown());
    let relay = Relay::new(config.endpoints.clone(), config.relay_timeout)?;
    let source = HttpPageSource::new(config.page_url.clone(), config.page_timeout)?;

    tracing::info!(
        "Watching {} for {} as {} (profile {}, relay {:?})",
        config.page_url,
        config.platform,
        email,
        profiles.path().display(),
        relay.endpoints().iter().map(|u| u.as_str()).collect::<Vec<_>>()
    );

    let monitor = Monitor::new(
        source,
        scraper,
        relay,
        profiles,
        profile,
        MonitorConfig {
            email,
            poll_interval: config.poll_interval,
            cooldown,
            settle_delay: config.settle_delay,
        },
    );

    monitor
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;

    Ok(())
}
