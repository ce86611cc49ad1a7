use std::sync::Arc;
use std::time::Instant;

use crate::config::RenderConfig;
use crate::errors::{AppError, Result};
use crate::models::{Orientation, SummaryStyle};
use crate::prompts;
use crate::services::archive::{CardArchive, SavedCard};
use crate::services::ledger::QuotaLedger;
use crate::services::metrics::PipelineMetrics;
use crate::services::renderer::RenderService;
use crate::services::summarizer::Summarizer;

/// Overrides layered on top of the renderer's base stylesheet for the share
/// card look.
const CARD_OVERRIDE_CSS: &str = r#"
body {
  font-family: system-ui, -apple-system, sans-serif;
  padding: 20px;
  background: #f5f7fa;
  border-radius: 12px;
}
.prose {
  background: transparent;
}
"#;

/// How much of the article is kept as the history record's prompt excerpt.
const PROMPT_EXCERPT_CHARS: usize = 200;

/// Pipeline stages that can fail after the point was spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Summarize,
    Render,
    Persist,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Summarize => "summarize",
            Stage::Render => "render",
            Stage::Persist => "persist",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub article_text: String,
    pub style: SummaryStyle,
}

/// The finished artifact. `saved` is present when persistence succeeded;
/// otherwise the caller still gets the card, plus the reason it was not
/// saved.
#[derive(Debug)]
pub struct GeneratedCard {
    pub summary_html: String,
    pub png: Vec<u8>,
    pub orientation: Orientation,
    pub remaining_points: i64,
    pub saved: Option<SavedCard>,
    pub persist_error: Option<String>,
}

/// Sequences one generation request through
/// quota gate -> deduct -> summarize -> render -> persist,
/// with a single compensating action: a refund for summarize/render failures.
/// Persistence failures keep the deduction and still return the artifact.
pub struct CardGenerator {
    ledger: Arc<dyn QuotaLedger>,
    summarizer: Arc<dyn Summarizer>,
    renderer: Arc<dyn RenderService>,
    archive: Arc<dyn CardArchive>,
    render_config: RenderConfig,
    metrics: PipelineMetrics,
}

impl CardGenerator {
    pub fn new(
        ledger: Arc<dyn QuotaLedger>,
        summarizer: Arc<dyn Summarizer>,
        renderer: Arc<dyn RenderService>,
        archive: Arc<dyn CardArchive>,
        render_config: RenderConfig,
    ) -> Self {
        Self {
            ledger,
            summarizer,
            renderer,
            archive,
            render_config,
            metrics: PipelineMetrics::new(),
        }
    }

    pub async fn generate(&self, user_id: &str, request: &GenerationRequest) -> Result<GeneratedCard> {
        // Input validation happens before the quota gate so a bad request
        // never costs a point.
        if request.article_text.trim().is_empty() {
            return Err(AppError::EmptyInput);
        }

        // Quota gate: an exhausted balance is rejected without contacting any
        // downstream service.
        let account = self.ledger.account(user_id).await?;
        if account.remaining_points <= 0 {
            return Err(AppError::InsufficientQuota);
        }

        // The atomic deduct is the real gate; a concurrent request may have
        // drained the balance since the snapshot. Nothing was spent on that
        // path, so there is nothing to compensate.
        let remaining_points = self.ledger.deduct(user_id, 1).await?;
        self.metrics.record_points_deducted(1);

        let prompt = prompts::for_style(request.style);
        let summary_html = match self.summarizer.summarize(&request.article_text, prompt).await {
            Ok(html) => html,
            Err(err) => return Err(self.refund(user_id, Stage::Summarize, err).await),
        };

        let orientation = request.style.orientation();
        let width = match orientation {
            Orientation::Vertical => self.render_config.vertical_width,
            Orientation::Horizontal => self.render_config.horizontal_width,
        };

        let render_started = Instant::now();
        let png = match self
            .renderer
            .render(
                &summary_html,
                width,
                self.render_config.height_hint,
                CARD_OVERRIDE_CSS,
            )
            .await
        {
            Ok(png) => {
                self.metrics.record_render_duration(render_started.elapsed());
                png
            }
            Err(err) => return Err(self.refund(user_id, Stage::Render, err).await),
        };

        let excerpt = prompt_excerpt(&request.article_text);
        match self
            .archive
            .persist(user_id, &excerpt, &summary_html, &png, orientation)
            .await
        {
            Ok(saved) => {
                self.metrics.record_generation();
                Ok(GeneratedCard {
                    summary_html,
                    png,
                    orientation,
                    remaining_points,
                    saved: Some(saved),
                    persist_error: None,
                })
            }
            Err(err) => {
                // The expensive work already completed; the point stays spent
                // and the caller still gets the card, it just won't appear in
                // history.
                self.metrics.record_stage_failure(Stage::Persist.as_str());
                tracing::warn!(user_id, error = %err, "card generated but not persisted");
                Ok(GeneratedCard {
                    summary_html,
                    png,
                    orientation,
                    remaining_points,
                    saved: None,
                    persist_error: Some(err.to_string()),
                })
            }
        }
    }

    /// The one compensating transition: return the point, then surface the
    /// original pipeline error. A failed refund is logged and swallowed so it
    /// cannot mask what actually went wrong.
    async fn refund(&self, user_id: &str, stage: Stage, err: AppError) -> AppError {
        self.metrics.record_stage_failure(stage.as_str());
        match self.ledger.add(user_id, 1).await {
            Ok(_) => self.metrics.record_points_refunded(1),
            Err(refund_err) => {
                tracing::error!(
                    user_id,
                    stage = stage.as_str(),
                    error = %refund_err,
                    "refund after pipeline failure did not go through"
                );
            }
        }
        err
    }
}

fn prompt_excerpt(article_text: &str) -> String {
    article_text.chars().take(PROMPT_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuotaAccount;
    use crate::services::archive::MockCardArchive;
    use crate::services::ledger::MockQuotaLedger;
    use crate::services::renderer::MockRenderService;
    use crate::services::summarizer::MockSummarizer;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn render_config() -> RenderConfig {
        RenderConfig {
            chrome_executable: None,
            timeout_secs: 30,
            vertical_width: 720,
            horizontal_width: 1280,
            height_hint: 600,
        }
    }

    /// Ledger double backed by a shared balance, so tests can assert net
    /// point changes instead of individual call counts.
    fn balance_ledger(initial: i64) -> (MockQuotaLedger, Arc<Mutex<i64>>) {
        let balance = Arc::new(Mutex::new(initial));
        let mut ledger = MockQuotaLedger::new();

        let snapshot = balance.clone();
        ledger.expect_account().returning(move |user_id| {
            Ok(QuotaAccount {
                user_id: user_id.to_string(),
                remaining_points: *snapshot.lock().unwrap(),
                used_points: 0,
                last_usage_time: None,
            })
        });

        let debit = balance.clone();
        ledger.expect_deduct().returning(move |_, points| {
            let mut current = debit.lock().unwrap();
            if *current < points {
                return Err(AppError::InsufficientQuota);
            }
            *current -= points;
            Ok(*current)
        });

        let credit = balance.clone();
        ledger.expect_add().returning(move |_, points| {
            let mut current = credit.lock().unwrap();
            *current += points;
            Ok(*current)
        });

        (ledger, balance)
    }

    fn working_summarizer() -> MockSummarizer {
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .returning(|_, _| Ok("<h1>Card</h1><p>Summary</p>".to_string()));
        summarizer
    }

    fn working_renderer() -> MockRenderService {
        let mut renderer = MockRenderService::new();
        renderer
            .expect_render()
            .returning(|_, _, _, _| Ok(vec![0x89, 0x50, 0x4e, 0x47]));
        renderer
    }

    fn working_archive() -> MockCardArchive {
        let mut archive = MockCardArchive::new();
        archive.expect_persist().returning(|_, _, _, _, _| {
            Ok(SavedCard {
                record_id: Uuid::new_v4(),
                image_url: "http://localhost/files/u/card.png".to_string(),
                html_url: "http://localhost/files/u/card.html".to_string(),
            })
        });
        archive
    }

    fn generator(
        ledger: MockQuotaLedger,
        summarizer: MockSummarizer,
        renderer: MockRenderService,
        archive: MockCardArchive,
    ) -> CardGenerator {
        CardGenerator::new(
            Arc::new(ledger),
            Arc::new(summarizer),
            Arc::new(renderer),
            Arc::new(archive),
            render_config(),
        )
    }

    fn request(style: SummaryStyle) -> GenerationRequest {
        GenerationRequest {
            article_text: "A perfectly reasonable article about something.".to_string(),
            style,
        }
    }

    #[tokio::test]
    async fn successful_pipeline_consumes_exactly_one_point() {
        let (ledger, balance) = balance_ledger(5);
        let generator = generator(ledger, working_summarizer(), working_renderer(), working_archive());

        let card = generator
            .generate("user-1", &request(SummaryStyle::Vertical))
            .await
            .unwrap();

        assert_eq!(*balance.lock().unwrap(), 4);
        assert_eq!(card.remaining_points, 4);
        assert_eq!(card.orientation, Orientation::Vertical);
        assert!(card.saved.is_some());
        assert!(card.persist_error.is_none());
        let saved = card.saved.unwrap();
        assert!(saved.image_url.ends_with(".png"));
        assert!(saved.html_url.ends_with(".html"));
    }

    #[tokio::test]
    async fn zero_balance_is_rejected_before_any_downstream_call() {
        let (ledger, balance) = balance_ledger(0);
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().times(0);
        let mut renderer = MockRenderService::new();
        renderer.expect_render().times(0);
        let mut archive = MockCardArchive::new();
        archive.expect_persist().times(0);

        let generator = generator(ledger, summarizer, renderer, archive);
        let result = generator
            .generate("user-1", &request(SummaryStyle::Vertical))
            .await;

        assert!(matches!(result, Err(AppError::InsufficientQuota)));
        assert_eq!(*balance.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_article_costs_nothing_and_calls_nothing() {
        let mut ledger = MockQuotaLedger::new();
        ledger.expect_account().times(0);
        ledger.expect_deduct().times(0);
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().times(0);

        let generator = generator(ledger, summarizer, working_renderer(), working_archive());
        let result = generator
            .generate(
                "user-1",
                &GenerationRequest {
                    article_text: "   \n ".to_string(),
                    style: SummaryStyle::Vertical,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::EmptyInput)));
    }

    #[tokio::test]
    async fn lost_deduct_race_surfaces_insufficient_quota_without_refund() {
        let mut ledger = MockQuotaLedger::new();
        // Snapshot says one point is left, but another request wins it before
        // the deduct lands.
        ledger.expect_account().returning(|user_id| {
            Ok(QuotaAccount {
                user_id: user_id.to_string(),
                remaining_points: 1,
                used_points: 0,
                last_usage_time: None,
            })
        });
        ledger
            .expect_deduct()
            .times(1)
            .returning(|_, _| Err(AppError::InsufficientQuota));
        ledger.expect_add().times(0);
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().times(0);

        let generator = generator(ledger, summarizer, working_renderer(), working_archive());
        let result = generator
            .generate("user-1", &request(SummaryStyle::Vertical))
            .await;

        assert!(matches!(result, Err(AppError::InsufficientQuota)));
    }

    #[tokio::test]
    async fn summarize_failure_refunds_the_point_and_surfaces_the_error() {
        let (ledger, balance) = balance_ledger(5);
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().returning(|_, _| {
            Err(AppError::UpstreamError {
                status: 500,
                message: "model fell over".to_string(),
            })
        });
        let mut renderer = MockRenderService::new();
        renderer.expect_render().times(0);

        let generator = generator(ledger, summarizer, renderer, working_archive());
        let result = generator
            .generate("user-1", &request(SummaryStyle::Vertical))
            .await;

        match result {
            Err(AppError::UpstreamError { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "model fell over");
            }
            other => panic!("expected UpstreamError, got {:?}", other.map(|_| ())),
        }
        assert_eq!(*balance.lock().unwrap(), 5, "net point change must be zero");
    }

    #[tokio::test]
    async fn render_timeout_refunds_the_point_and_surfaces_the_error() {
        let (ledger, balance) = balance_ledger(3);
        let mut renderer = MockRenderService::new();
        renderer
            .expect_render()
            .returning(|_, _, _, _| Err(AppError::RenderTimeout));
        let mut archive = MockCardArchive::new();
        archive.expect_persist().times(0);

        let generator = generator(ledger, working_summarizer(), renderer, archive);
        let result = generator
            .generate("user-1", &request(SummaryStyle::Vertical))
            .await;

        assert!(matches!(result, Err(AppError::RenderTimeout)));
        assert_eq!(*balance.lock().unwrap(), 3, "net point change must be zero");
    }

    #[tokio::test]
    async fn persist_failure_keeps_the_deduction_and_returns_the_artifact() {
        let (ledger, balance) = balance_ledger(5);
        let mut archive = MockCardArchive::new();
        archive
            .expect_persist()
            .returning(|_, _, _, _, _| Err(AppError::Persistence("bucket offline".to_string())));

        let generator = generator(ledger, working_summarizer(), working_renderer(), archive);
        let card = generator
            .generate("user-1", &request(SummaryStyle::Vertical))
            .await
            .unwrap();

        assert_eq!(*balance.lock().unwrap(), 4, "persist failure is not refunded");
        assert!(card.saved.is_none());
        assert!(card.persist_error.as_deref().unwrap().contains("bucket offline"));
        assert!(!card.png.is_empty(), "artifact is still returned to the caller");
        assert_eq!(card.summary_html, "<h1>Card</h1><p>Summary</p>");
    }

    #[tokio::test]
    async fn refund_failure_does_not_mask_the_pipeline_error() {
        let mut ledger = MockQuotaLedger::new();
        ledger.expect_account().returning(|user_id| {
            Ok(QuotaAccount {
                user_id: user_id.to_string(),
                remaining_points: 2,
                used_points: 0,
                last_usage_time: None,
            })
        });
        ledger.expect_deduct().returning(|_, _| Ok(1));
        ledger
            .expect_add()
            .times(1)
            .returning(|_, _| Err(AppError::Database(sqlx::Error::PoolClosed)));
        let mut summarizer = MockSummarizer::new();
        summarizer.expect_summarize().returning(|_, _| {
            Err(AppError::UpstreamError {
                status: 502,
                message: "gateway".to_string(),
            })
        });

        let generator = generator(ledger, summarizer, working_renderer(), working_archive());
        let result = generator
            .generate("user-1", &request(SummaryStyle::Vertical))
            .await;

        assert!(matches!(result, Err(AppError::UpstreamError { status: 502, .. })));
    }

    #[tokio::test]
    async fn orientation_selects_the_render_width() {
        for (style, expected_width) in [
            (SummaryStyle::Vertical, 720u32),
            (SummaryStyle::Bullet, 720u32),
            (SummaryStyle::Horizontal, 1280u32),
        ] {
            let (ledger, _) = balance_ledger(5);
            let mut renderer = MockRenderService::new();
            renderer
                .expect_render()
                .times(1)
                .withf(move |_, width, _, _| *width == expected_width)
                .returning(|_, _, _, _| Ok(vec![1, 2, 3]));

            let generator = generator(ledger, working_summarizer(), renderer, working_archive());
            generator.generate("user-1", &request(style)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn style_selects_the_prompt_template() {
        let (ledger, _) = balance_ledger(5);
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .times(1)
            .withf(|_, prompt| prompt.contains("bullet-point digests"))
            .returning(|_, _| Ok("<ul><li>point</li></ul>".to_string()));

        let generator = generator(ledger, summarizer, working_renderer(), working_archive());
        let card = generator
            .generate("user-1", &request(SummaryStyle::Bullet))
            .await
            .unwrap();

        assert_eq!(card.orientation, Orientation::Vertical);
    }

    #[tokio::test]
    async fn prompt_excerpt_is_capped_and_char_safe() {
        let (ledger, _) = balance_ledger(5);
        let mut archive = MockCardArchive::new();
        archive
            .expect_persist()
            .withf(|_, excerpt, _, _, _| excerpt.chars().count() == 200)
            .returning(|_, _, _, _, _| {
                Ok(SavedCard {
                    record_id: Uuid::new_v4(),
                    image_url: "u.png".to_string(),
                    html_url: "u.html".to_string(),
                })
            });

        let generator = generator(ledger, working_summarizer(), working_renderer(), archive);
        let long_article = "é".repeat(500);
        generator
            .generate(
                "user-1",
                &GenerationRequest {
                    article_text: long_article,
                    style: SummaryStyle::Vertical,
                },
            )
            .await
            .unwrap();
    }
}
