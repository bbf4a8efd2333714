use crate::driver::{BrowserDriver, BrowserHandle, LaunchOptions, NavigationResponse, WaitStrategy};
use crate::error::{BrowserError, Result};
use crate::filter::{FilterDecision, ResourceFilter, ResourceKind};
use crate::stealth::StealthProfile;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTimezoneOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams as FetchEnableParams, EventRequestPaused,
    FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, ErrorReason, EventResponseReceived, ResourceType,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, FrameId, NavigateParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::Page;
use futures::{FutureExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches local Chromium processes through the DevTools protocol.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumDriver;

#[async_trait::async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserHandle>> {
        let mut builder =
            BrowserConfig::builder().window_size(options.window_width, options.window_height);
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        for arg in &options.args {
            builder = builder.arg(arg.as_str());
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // Drive the CDP connection until the browser goes away
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("chromium handler event error: {}", e);
                }
            }
        });

        tracing::debug!("Chromium launched (headless: {})", options.headless);

        Ok(Box::new(ChromiumHandle {
            browser,
            handler_task,
            page: None,
            interceptor: None,
        }))
    }
}

/// A running Chromium process with at most one page.
pub struct ChromiumHandle {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Option<Page>,
    interceptor: Option<JoinHandle<()>>,
}

impl ChromiumHandle {
    fn page(&self) -> Result<&Page> {
        self.page.as_ref().ok_or(BrowserError::InvalidState {
            from: "browser_launched",
            to: "page_navigated",
        })
    }
}

#[async_trait::async_trait]
impl BrowserHandle for ChromiumHandle {
    async fn new_context(
        &mut self,
        profile: &StealthProfile,
        filter: &ResourceFilter,
    ) -> Result<()> {
        let context_id = self
            .browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await?;

        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = Some(context_id);
        let page = self.browser.new_page(target).await?;

        page.execute(NetworkEnableParams::default()).await?;
        page.execute(SetUserAgentOverrideParams::new(profile.user_agent.clone()))
            .await?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(profile.viewport_width),
            i64::from(profile.viewport_height),
            1.0,
            false,
        ))
        .await?;
        page.execute(SetTimezoneOverrideParams::new(profile.timezone.clone()))
            .await?;
        for script in &profile.init_scripts {
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(script.clone()))
                .await?;
        }

        if filter.is_active() {
            self.interceptor = Some(spawn_interceptor(&page, filter.clone()).await?);
        }

        self.page = Some(page);
        Ok(())
    }

    async fn navigate(&mut self, url: &str, wait: WaitStrategy) -> Result<NavigationResponse> {
        let page = self.page()?;
        let mut responses = page.event_listener::<EventResponseReceived>().await?;

        let navigation = page.execute(NavigateParams::new(url)).await?;
        let main_frame = navigation.result.frame_id.clone();
        if let Some(error_text) = navigation.result.error_text.as_deref() {
            // Chromium reports 4xx/5xx documents as ERR_HTTP_RESPONSE_CODE_FAILURE
            let status = drain_main_response(&mut responses, &main_frame)
                .and_then(|event| u16::try_from(event.response.status).ok());
            return Err(failed_navigation(url, error_text, status));
        }

        wait_for_dom_ready(page).await?;
        if let WaitStrategy::NetworkIdle { quiet, max_wait } = wait {
            wait_for_network_idle(page, quiet, max_wait).await;
        }

        // Main document response events are already buffered by now
        let main_response = drain_main_response(&mut responses, &main_frame);

        let final_url = page
            .url()
            .await?
            .or_else(|| main_response.as_ref().map(|e| e.response.url.clone()))
            .unwrap_or_else(|| url.to_string());

        let (status, headers) = match main_response {
            Some(event) => (
                u16::try_from(event.response.status).ok(),
                header_pairs(event.response.headers.inner()),
            ),
            None => (None, Vec::new()),
        };

        Ok(NavigationResponse {
            final_url,
            status,
            headers,
        })
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<bool> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.page()?.content().await?)
    }

    async fn close(&mut self) -> Result<()> {
        let mut failures = Vec::new();

        if let Some(interceptor) = self.interceptor.take() {
            interceptor.abort();
        }
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                failures.push(format!("page close: {e}"));
            }
        }
        if let Err(e) = self.browser.close().await {
            failures.push(format!("browser close: {e}"));
        }
        if let Err(e) = self.browser.wait().await {
            failures.push(format!("browser wait: {e}"));
        }
        self.handler_task.abort();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BrowserError::Teardown(failures.join("; ")))
        }
    }
}

/// First main-frame document response among the events buffered so far.
fn drain_main_response<S>(
    responses: &mut S,
    main_frame: &FrameId,
) -> Option<Arc<EventResponseReceived>>
where
    S: Stream<Item = Arc<EventResponseReceived>> + Unpin,
{
    let mut main_response = None;
    while let Some(Some(event)) = responses.next().now_or_never() {
        if main_response.is_none()
            && event.r#type == ResourceType::Document
            && event.frame_id.as_ref() == Some(main_frame)
        {
            main_response = Some(event);
        }
    }
    main_response
}

/// Error for a navigation Chromium refused to commit. An observed error
/// status wins over the network error text.
fn failed_navigation(url: &str, error_text: &str, status: Option<u16>) -> BrowserError {
    match status.filter(|s| *s >= 400) {
        Some(status) => BrowserError::UpstreamHttp {
            url: url.to_string(),
            status,
        },
        None => BrowserError::Connection(format!("{url}: {error_text}")),
    }
}

/// Answer every paused request according to the filter.
async fn spawn_interceptor(page: &Page, filter: ResourceFilter) -> Result<JoinHandle<()>> {
    let mut paused = page.event_listener::<EventRequestPaused>().await?;
    page.execute(FetchEnableParams::default()).await?;

    let page = page.clone();
    Ok(tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let kind = resource_kind(&event.resource_type);
            let outcome = match filter.decide(kind) {
                FilterDecision::Allow => page
                    .execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(drop),
                FilterDecision::Abort => page
                    .execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(drop),
            };
            if let Err(e) = outcome {
                tracing::trace!("Interception reply for {} request failed: {}", kind, e);
            }
        }
    }))
}

fn resource_kind(resource_type: &ResourceType) -> ResourceKind {
    match resource_type {
        ResourceType::Document => ResourceKind::Document,
        ResourceType::Stylesheet => ResourceKind::Stylesheet,
        ResourceType::Image => ResourceKind::Image,
        ResourceType::Media => ResourceKind::Media,
        ResourceType::Font => ResourceKind::Font,
        ResourceType::Script => ResourceKind::Script,
        ResourceType::Xhr => ResourceKind::Xhr,
        ResourceType::Fetch => ResourceKind::Fetch,
        _ => ResourceKind::Other,
    }
}

fn header_pairs(headers: &serde_json::Value) -> Vec<(String, String)> {
    headers
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(name, value)| {
                    let value = value
                        .as_str()
                        .map_or_else(|| value.to_string(), str::to_string);
                    (name.to_ascii_lowercase(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

async fn wait_for_dom_ready(page: &Page) -> Result<()> {
    loop {
        let state: String = page
            .evaluate("document.readyState")
            .await?
            .into_value()
            .map_err(|e| BrowserError::Protocol(format!("readyState: {e}")))?;
        if state != "loading" {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Poll the resource timing buffer until it stops growing for `quiet`.
async fn wait_for_network_idle(page: &Page, quiet: Duration, max_wait: Duration) {
    let js = format!(
        r"(async () => {{
            const timeoutMs = {timeout_ms};
            const idleMs = {idle_ms};
            const interval = 250;
            const count = () => {{
                try {{
                    return performance.getEntriesByType('resource').length;
                }} catch (_) {{
                    return 0;
                }}
            }};

            const start = Date.now();
            let lastCount = count();
            let stableMs = 0;

            while (Date.now() - start < timeoutMs) {{
                await new Promise(r => setTimeout(r, interval));
                const curCount = count();
                if (document.readyState === 'complete' && curCount === lastCount) {{
                    stableMs += interval;
                    if (stableMs >= idleMs) {{
                        return {{ ok: true, resources: curCount, waitedMs: Date.now() - start }};
                    }}
                }} else {{
                    stableMs = 0;
                }}
                lastCount = curCount;
            }}
            return {{ ok: false, resources: lastCount, waitedMs: Date.now() - start }};
        }})()",
        timeout_ms = max_wait.as_millis(),
        idle_ms = quiet.as_millis(),
    );

    match page.evaluate(js).await {
        Ok(val) => {
            if let Ok(info) = val.into_value::<serde_json::Value>() {
                let ok = info
                    .get("ok")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                let waited = info
                    .get("waitedMs")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(0);
                if ok {
                    tracing::debug!("Network idle reached after {}ms", waited);
                } else {
                    tracing::debug!("Network still busy after {}ms, continuing", waited);
                }
            }
        }
        Err(e) => tracing::warn!("Network idle wait failed: {}", e),
    }
}
