use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use webview_bridge::{Bridge, SizeHint, Variadic, Webview, WebviewConfig};

const HTML: &str = r#"
<div>
  <button id="increment">+</button>
  <button id="decrement">-</button>
  <span>Counter: <span id="counterResult">0</span></span>
</div>
<div>
  <button id="sum">Slow sum of 1..5</button>
  <span id="sumResult"></span>
</div>
<script type="module">
  const ui = Object.fromEntries(
    ["increment", "decrement", "counterResult", "sum", "sumResult"]
      .map(id => [id, document.getElementById(id)])
  );
  ui.increment.addEventListener("click", async () => {
    ui.counterResult.textContent = await window.count(1);
  });
  ui.decrement.addEventListener("click", async () => {
    ui.counterResult.textContent = await window.count(-1);
  });
  ui.sum.addEventListener("click", async () => {
    ui.sumResult.textContent = "working...";
    await window.slowSum(1, 2, 3, 4, 5);
  });
</script>
"#;

fn main() -> Result<()> {
    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start background runtime")?;

    let mut config = WebviewConfig::from_env().context("failed to load webview config")?;
    if config.title == WebviewConfig::default().title {
        config.title = "Bind Example".to_string();
        config.width = 480;
        config.height = 320;
        config.hint = SizeHint::None;
    }

    let bridge = Bridge::new().context("failed to create bridge")?;
    let webview = Webview::create(&bridge, &config).context("failed to open window")?;

    let count = Arc::new(AtomicI64::new(0));
    webview
        .bind("count", move |delta: i64| {
            count.fetch_add(delta, Ordering::SeqCst) + delta
        })
        .context("failed to bind count")?;

    // Long-running work leaves the UI thread and comes back through dispatch.
    let background = webview.clone();
    let handle = rt.handle().clone();
    webview
        .bind("slowSum", move |numbers: Variadic<i64>| {
            let webview = background.clone();
            handle.spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                let total: i64 = numbers.iter().sum();
                let ui = webview.clone();
                webview.dispatch(move || {
                    let script =
                        format!("document.getElementById('sumResult').textContent = {total};");
                    if let Err(err) = ui.eval(&script) {
                        warn!(error = %err, "failed to publish slow sum");
                    }
                });
            });
        })
        .context("failed to bind slowSum")?;

    webview.set_html(HTML).context("failed to load page")?;
    info!("running event loop");
    webview.run();

    bridge.clear_dispatches();
    webview.destroy();
    Ok(())
}
