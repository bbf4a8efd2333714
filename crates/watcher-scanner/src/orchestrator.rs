//! The Watcher engine: one request in, one [`ScanResult`] out.
//!
//! A scan builds the target URL, waits at the [`AdmissionGate`], drives a
//! [`BrowserSession`] to a [`PageSnapshot`], closes the session, and only
//! then extracts and scores. Closing happens on every path, so neither the
//! browser process nor the admission permit outlives the page load.

use crate::error::{Result, ScanError};
use crate::extractor::Extractor;
use crate::gate::AdmissionGate;
use crate::listing::ListingExtractor;
use crate::scorer::Scorer;
use crate::signals::{SignalExtractor, SignalTables};
use crate::url_builder::build_target_url;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;
use watcher_browser::{
    BrowserDriver, BrowserSession, ChromiumDriver, LaunchOptions, ResourceFilter, StealthProfile,
};
use watcher_core::{AppConfig, PageSnapshot, ScanMode, ScanPayload, ScanRequest, ScanResult};

/// Runs scans against a browser driver, bounded by an admission gate.
pub struct WatcherEngine {
    driver: Arc<dyn BrowserDriver>,
    gate: AdmissionGate,
    config: AppConfig,
    launch_options: LaunchOptions,
    filter: ResourceFilter,
    listing: ListingExtractor,
    signals: SignalExtractor,
    scorer: Scorer,
}

impl WatcherEngine {
    /// Create an engine with the built-in signal tables.
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        gate: AdmissionGate,
        config: AppConfig,
    ) -> Result<Self> {
        Self::with_signal_tables(driver, gate, config, SignalTables::default())
    }

    /// Create an engine with custom signature and keyword tables.
    pub fn with_signal_tables(
        driver: Arc<dyn BrowserDriver>,
        gate: AdmissionGate,
        config: AppConfig,
        tables: SignalTables,
    ) -> Result<Self> {
        let signals = SignalExtractor::new(tables, &config.extraction)?;
        Ok(Self {
            driver,
            gate,
            launch_options: LaunchOptions::from_config(&config.browser),
            filter: ResourceFilter::from_names(config.browser.blocked_resource_types.as_slice()),
            listing: ListingExtractor::new(config.extraction.max_listings),
            signals,
            scorer: Scorer::new(config.scoring),
            config,
        })
    }

    /// Chromium-backed engine with a gate sized from the configuration.
    pub fn chromium(config: AppConfig) -> Result<Self> {
        let gate = AdmissionGate::from_config(&config.admission);
        Self::new(Arc::new(ChromiumDriver), gate, config)
    }

    /// The gate shared by this engine's scans.
    #[must_use]
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Configuration the engine was built with.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run one scan. Never fails: errors come back as a `Failed` result.
    pub async fn scan(&self, request: ScanRequest) -> ScanResult {
        let span = tracing::info_span!(
            "scan",
            scan_id = %Uuid::new_v4(),
            mode = %request.mode,
            target = %request.target,
        );

        async move {
            tracing::info!("Scan started");
            match self.run(&request).await {
                Ok(result) => {
                    tracing::info!("Scan finished with lead score {}", result.lead_score());
                    result
                }
                Err(e) => {
                    tracing::error!("Scan failed: {}", e);
                    ScanResult::failed(request.target.clone(), request.mode, e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &ScanRequest) -> Result<ScanResult> {
        let url = build_target_url(request, &self.config.extraction)?;
        let extractor = self.extractor(request.mode);

        let permit = self.gate.acquire().await?;
        let mut session = BrowserSession::new();
        let snapshot = self.capture(&mut session, extractor, &url).await;
        session.close().await;
        permit.release();

        let snapshot = snapshot?;
        let payload = extractor.extract(&snapshot);
        let lead_score = match &payload {
            ScanPayload::Signals(bundle) => self.scorer.score(bundle),
            ScanPayload::Listings(listings) => {
                tracing::debug!("Extracted {} listings", listings.len());
                0
            }
        };
        Ok(ScanResult::success(request.target.clone(), payload, lead_score))
    }

    /// Drive the session from launch to a detached snapshot.
    async fn capture(
        &self,
        session: &mut BrowserSession,
        extractor: &dyn Extractor,
        url: &str,
    ) -> Result<PageSnapshot> {
        let navigation = &self.config.navigation;

        session.launch(self.driver.as_ref(), &self.launch_options).await?;
        session
            .new_context(&StealthProfile::from_config(&self.config.browser), &self.filter)
            .await?;

        let response = session
            .navigate(
                url,
                extractor.wait_strategy(navigation),
                extractor.navigation_timeout(navigation),
            )
            .await?;
        tracing::debug!("Loaded {} (status {:?})", response.final_url, response.status);

        session.settle(extractor.settle_delay(navigation)).await?;

        if let Some(selector) = extractor.ready_selector() {
            let timeout = navigation.listing_ready_timeout();
            if !session.wait_for_selector(selector, timeout).await? {
                return Err(ScanError::SelectorTimeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }
        }

        Ok(session.snapshot().await?)
    }

    fn extractor(&self, mode: ScanMode) -> &dyn Extractor {
        match mode {
            ScanMode::ZipSearch => &self.listing,
            ScanMode::UrlAnalyze => &self.signals,
        }
    }
}
