use roster_browser::{await_ready, BrowserActions, BrowserEngine, LoadingIndicator, WaitPolicy};
use roster_core::{BrowserConfig, SelectorConfig};
use tokio_util::sync::CancellationToken;

fn headless() -> BrowserConfig {
    BrowserConfig {
        headless: true,
        min_delay_ms: 0,
        ..BrowserConfig::default()
    }
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_browser_engine_launch() {
    let engine = BrowserEngine::launch(&headless()).await;
    assert!(engine.is_ok(), "Failed to launch browser engine");
    engine.unwrap().close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_navigation_and_readiness() {
    let engine = BrowserEngine::launch(&headless()).await.unwrap();

    engine.navigate("https://example.com").await.unwrap();
    assert!(engine.current_url().await.unwrap().contains("example.com"));

    // example.com has no loading indicator, so it is ready on the first poll
    let indicator = LoadingIndicator::from_config(&SelectorConfig::default()).unwrap();
    let snapshot = await_ready(
        &engine,
        &indicator,
        WaitPolicy::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert!(!snapshot.timed_out);
    assert!(snapshot.html.contains("Example Domain"));

    engine.close().await.unwrap();
}
