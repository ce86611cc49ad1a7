use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
#[cfg(test)]
use mockall::automock;
use std::time::Duration;

use crate::config::RenderConfig;
use crate::errors::{AppError, Result};

/// Rasterizes an HTML fragment to a transparent-background PNG. The width is
/// fixed by the caller; the output height follows the rendered content, not
/// the initial hint.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RenderService: Send + Sync {
    async fn render(
        &self,
        html_content: &str,
        width: u32,
        height_hint: u32,
        extra_css: &str,
    ) -> Result<Vec<u8>>;
}

/// Base stylesheet applied to every card so the raster looks consistent no
/// matter what markup the summarizer emitted. Caller CSS is appended after it
/// and therefore wins.
const BASE_CARD_STYLE: &str = r#"
body {
  margin: 0;
  padding: 20px;
  font-family: system-ui, -apple-system, sans-serif;
  background: linear-gradient(135deg, #f5f7fa 0%, #e8ecf5 100%);
  color: #333;
}
h1, h2, h3 {
  color: #6d28d9;
}
p {
  line-height: 1.6;
}
ul, ol {
  padding-left: 20px;
}
"#;

/// Drives a headless Chromium instance over CDP. Each render call owns its
/// browser exclusively and tears it down on every exit path, including
/// timeout.
pub struct ChromeRenderer {
    config: RenderConfig,
}

impl ChromeRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Wraps the fragment in a full document shell with the base stylesheet
    /// plus caller overrides.
    pub fn build_document(html_content: &str, extra_css: &str) -> String {
        format!(
            r#"<html>
  <head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
      {BASE_CARD_STYLE}
      {extra_css}
    </style>
  </head>
  <body>
    {html_content}
  </body>
</html>"#
        )
    }

    async fn capture(
        browser: &Browser,
        document: &str,
        width: u32,
        _height_hint: u32,
    ) -> Result<Vec<u8>> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(render_err)?;

        page.set_content(document).await.map_err(render_err)?;
        page.wait_for_navigation().await.map_err(render_err)?;

        // Font loading finishes after the network goes idle; wait for both
        // before measuring.
        page.evaluate("document.fonts.ready.then(() => true)")
            .await
            .map_err(render_err)?;

        let content_height = page
            .evaluate("document.body.scrollHeight")
            .await
            .map_err(render_err)?
            .into_value::<i64>()
            .map_err(render_err)?;

        // Resize the viewport to the measured content so the capture is
        // neither clipped nor padded.
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(width as i64)
            .height(content_height.max(1))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(AppError::RenderFailure)?;
        page.execute(metrics).await.map_err(render_err)?;

        let screenshot = page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .omit_background(true)
                    .build(),
            )
            .await
            .map_err(render_err)?;

        Ok(screenshot)
    }
}

fn render_err(e: impl std::fmt::Display) -> AppError {
    AppError::RenderFailure(e.to_string())
}

#[async_trait]
impl RenderService for ChromeRenderer {
    async fn render(
        &self,
        html_content: &str,
        width: u32,
        height_hint: u32,
        extra_css: &str,
    ) -> Result<Vec<u8>> {
        let document = Self::build_document(html_content, extra_css);

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height_hint);
        if let Some(ref executable) = self.config.chrome_executable {
            builder = builder.chrome_executable(executable);
        }
        let browser_config = builder.build().map_err(AppError::RenderFailure)?;

        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(render_err)?;

        // The handler stream must be pumped for the browser connection to make
        // progress; it lives exactly as long as this render call.
        let driver = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            Self::capture(&browser, &document, width, height_hint),
        )
        .await;

        // Teardown runs before the outcome is inspected so no exit path,
        // success, failure, or timeout, leaks the browser process.
        let _ = browser.close().await;
        let _ = browser.wait().await;
        driver.abort();

        match outcome {
            Err(_) => {
                tracing::warn!(width, timeout_secs = self.config.timeout_secs, "render timed out");
                Err(AppError::RenderTimeout)
            }
            Ok(result) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_shell_embeds_fragment_and_overrides() {
        let document =
            ChromeRenderer::build_document("<h1>Title</h1>", "body { background: #f5f7fa; }");

        assert!(document.contains("<meta charset=\"UTF-8\">"));
        assert!(document.contains("<h1>Title</h1>"));
        assert!(document.contains("body { background: #f5f7fa; }"));
    }

    #[test]
    fn caller_css_comes_after_the_base_stylesheet() {
        let document = ChromeRenderer::build_document("<p>x</p>", ".prose { background: transparent; }");

        let base = document.find("linear-gradient").unwrap();
        let overrides = document.find(".prose").unwrap();
        assert!(base < overrides, "overrides must be able to win the cascade");
    }

    // Exercises a real Chromium instance; run with `cargo test -- --ignored`
    // where a browser is installed.
    #[tokio::test]
    #[ignore]
    async fn capture_height_follows_content_not_hint() {
        let renderer = ChromeRenderer::new(RenderConfig {
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok(),
            timeout_secs: 30,
            vertical_width: 720,
            horizontal_width: 1280,
            height_hint: 600,
        });

        let tall_fragment = "<h1>Tall card</h1>".to_string() + &"<p>line</p>".repeat(100);
        let png = renderer.render(&tall_fragment, 720, 600, "").await.unwrap();

        let dimensions = image::load_from_memory(&png).unwrap();
        assert_eq!(dimensions.width(), 720);
        assert!(
            dimensions.height() > 600,
            "viewport should have grown past the hint to fit the content"
        );
    }
}
