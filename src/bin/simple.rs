use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use webview_bridge::{Bridge, Webview, WebviewConfig};

fn main() -> Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("https://example.com"));

    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let config = WebviewConfig::from_env().context("failed to load webview config")?;
    let bridge = Bridge::new().context("failed to create bridge")?;
    let webview = Webview::create(&bridge, &config).context("failed to open window")?;

    webview
        .navigate(&url)
        .with_context(|| format!("failed to navigate to {url}"))?;
    webview.run();
    webview.destroy();
    Ok(())
}
