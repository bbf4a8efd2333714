//! Business-signal extraction for arbitrary company websites.
//!
//! [`SignalTables`] is plain data: technology signatures, keyword
//! vocabularies and social platform patterns. [`SignalExtractor`] compiles it
//! once and runs five independent passes over a snapshot. None of the passes
//! can fail or short-circuit another; an empty result is just empty.

use crate::error::{Result, ScanError};
use crate::extractor::{normalize_whitespace, visible_text, Extractor};
use chrono::{Datelike, Utc};
use regex::{Regex, RegexBuilder};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::OnceLock;
use std::time::Duration;
use watcher_browser::WaitStrategy;
use watcher_core::{
    ExtractionConfig, NavigationConfig, PageSnapshot, ScanMode, ScanPayload, SignalBundle,
    Technology,
};

/// File extensions that make an email-shaped token an asset reference.
const ASSET_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "css", "js"];

const DENSITY_SUFFIXES: &[&str] = &["@1x", "@2x", "@3x"];

/// Characters after a copyright marker that still belong to its notice.
const NOTICE_SPAN: usize = 48;

const NOTICE_BREAKS: &[&str] = &[". ", "|", "·"];

/// A technology recognised by a pattern in the page source or headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologySignature {
    pub category: String,
    pub name: String,
    pub pattern: String,
}

/// A social platform and the pattern of a profile link on it.
///
/// `reserved_paths` are first path segments the platform uses for its own
/// endpoints (share buttons, tracking pixels). Links under them are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPattern {
    pub platform: String,
    pub pattern: String,
    #[serde(default)]
    pub reserved_paths: Vec<String>,
}

/// Immutable lookup tables handed to the [`SignalExtractor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTables {
    pub technologies: Vec<TechnologySignature>,
    pub growth_keywords: Vec<String>,
    pub hiring_keywords: Vec<String>,
    pub social_platforms: Vec<SocialPattern>,
}

impl Default for SignalTables {
    fn default() -> Self {
        let tech = |category: &str, name: &str, pattern: &str| TechnologySignature {
            category: category.to_string(),
            name: name.to_string(),
            pattern: pattern.to_string(),
        };
        let social = |platform: &str, pattern: &str, reserved: &[&str]| SocialPattern {
            platform: platform.to_string(),
            pattern: pattern.to_string(),
            reserved_paths: reserved.iter().map(ToString::to_string).collect(),
        };
        let words = |list: &[&str]| list.iter().map(ToString::to_string).collect();

        Self {
            technologies: vec![
                tech("Advertising", "Facebook Ads", r"fbevents\.js|connect\.facebook\.net"),
                tech(
                    "Advertising",
                    "Google Ads",
                    r"googleadservices\.com|googlesyndication\.com|\bAW-\d{6,}",
                ),
                tech("Advertising", "LinkedIn Insight", r"snap\.licdn\.com|_linkedin_partner_id"),
                tech("Advertising", "TikTok Pixel", r"analytics\.tiktok\.com"),
                tech(
                    "Analytics",
                    "Google Analytics",
                    r"google-analytics\.com|googletagmanager\.com/gtag/js|\bgtag\(",
                ),
                tech("Analytics", "Hotjar", r"static\.hotjar\.com"),
                tech(
                    "Tag Manager",
                    "Google Tag Manager",
                    r"googletagmanager\.com/gtm\.js|\bGTM-[A-Z0-9]{4,}",
                ),
                tech(
                    "Marketing Automation",
                    "HubSpot",
                    r"js\.hs-scripts\.com|js\.hs-analytics\.net|hbspt\.forms",
                ),
                tech("Marketing Automation", "Mailchimp", r"chimpstatic\.com|list-manage\.com"),
                tech("CMS", "WordPress", r"wp-content/|wp-includes/"),
                tech("CMS", "Wix", r"static\.wixstatic\.com|^x-wix-request-id:"),
                tech("CMS", "Squarespace", r"static1\.squarespace\.com"),
                tech("Ecommerce", "Shopify", r"cdn\.shopify\.com|^x-shopid:"),
                tech("Ecommerce", "WooCommerce", r"woocommerce"),
                tech("Payments", "Stripe", r"js\.stripe\.com"),
                tech("Live Chat", "Intercom", r"widget\.intercom\.io|js\.intercomcdn\.com"),
                tech("Live Chat", "Drift", r"js\.driftt\.com"),
                tech(
                    "JavaScript Framework",
                    "React",
                    r"data-reactroot|react-dom(?:\.production)?(?:\.min)?\.js",
                ),
                tech("JavaScript Framework", "Next.js", r"__NEXT_DATA__|/_next/static/"),
                tech("CDN", "Cloudflare", r"^cf-ray:|^server:\s*cloudflare"),
                tech("Programming Language", "PHP", r"^x-powered-by:\s*php"),
            ],
            growth_keywords: words(&[
                "careers",
                "hiring",
                "funding",
                "press",
                "series a",
                "series b",
                "expansion",
                "new office",
                "acquisition",
                "partnership",
                "launch",
            ]),
            hiring_keywords: words(&[
                "hiring",
                "join our team",
                "open positions",
                "job openings",
                "careers",
            ]),
            social_platforms: vec![
                social("linkedin", r"linkedin\.com/(?:company|in|school)/[A-Za-z0-9_%.\-]+", &[]),
                social(
                    "twitter",
                    r"\b(?:twitter|x)\.com/[A-Za-z0-9_]{1,15}\b",
                    &["intent", "share", "home"],
                ),
                social(
                    "facebook",
                    r"facebook\.com/[A-Za-z0-9.\-]{2,}",
                    &["tr", "sharer", "share", "plugins", "dialog", "home"],
                ),
                social("instagram", r"instagram\.com/[A-Za-z0-9_.]+", &["p", "explore"]),
                social("youtube", r"youtube\.com/(?:@|c/|channel/|user/)[A-Za-z0-9_\-]+", &[]),
                social("tiktok", r"tiktok\.com/@[A-Za-z0-9_.]+", &[]),
            ],
        }
    }
}

struct CompiledSignature {
    technology: Technology,
    regex: Regex,
}

struct Keyword {
    word: String,
    regex: Regex,
}

struct SocialProfile {
    platform: String,
    regex: Regex,
    reserved_paths: Vec<String>,
}

impl SocialProfile {
    fn first_profile<'h>(&self, html: &'h str) -> Option<&'h str> {
        self.regex
            .find_iter(html)
            .map(|m| m.as_str())
            .find(|link| !self.is_reserved(link))
    }

    fn is_reserved(&self, link: &str) -> bool {
        let Some((_, path)) = link.split_once('/') else {
            return false;
        };
        let segment = path
            .split(['/', '.', '?', '#'])
            .next()
            .unwrap_or_default();
        self.reserved_paths
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(segment))
    }
}

/// Runs the five signal passes over a [`PageSnapshot`].
pub struct SignalExtractor {
    technologies: Vec<CompiledSignature>,
    growth: Vec<Keyword>,
    hiring: Vec<Keyword>,
    social: Vec<SocialProfile>,
    email_cap: usize,
    recent_year_window: i32,
    reference_year: Option<i32>,
    heading: Selector,
}

impl SignalExtractor {
    /// Compile the tables. A pattern that does not compile is reported by name.
    pub fn new(tables: SignalTables, config: &ExtractionConfig) -> Result<Self> {
        let technologies = tables
            .technologies
            .into_iter()
            .map(|sig| {
                Ok(CompiledSignature {
                    regex: compile(&sig.name, &sig.pattern)?,
                    technology: Technology::new(sig.name, sig.category),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let social = tables
            .social_platforms
            .into_iter()
            .map(|p| {
                Ok(SocialProfile {
                    regex: compile(&p.platform, &p.pattern)?,
                    platform: p.platform,
                    reserved_paths: p.reserved_paths,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            technologies,
            growth: keywords(tables.growth_keywords)?,
            hiring: keywords(tables.hiring_keywords)?,
            social,
            email_cap: config.email_cap,
            recent_year_window: config.recent_year_window,
            reference_year: config.reference_year,
            heading: Selector::parse("h1").expect("valid heading selector"),
        })
    }

    /// Build the full [`SignalBundle`] for a snapshot.
    #[must_use]
    pub fn analyze(&self, snapshot: &PageSnapshot) -> SignalBundle {
        let document = Html::parse_document(&snapshot.rendered_html);
        let text = normalize_whitespace(&visible_text(&document));
        let (growth_signals, hiring_signal) = self.detect_growth(&text);

        SignalBundle {
            detected_technologies: self
                .detect_technologies(&snapshot.rendered_html, &snapshot.header_text()),
            hiring_signal,
            growth_signals,
            social_profiles: self.mine_social(&snapshot.rendered_html),
            emails: self.mine_emails(&snapshot.rendered_html),
            stale_website: self.is_stale(&text),
            missing_h1: document.select(&self.heading).next().is_none(),
            https_enabled: snapshot.is_https(),
        }
    }

    /// Every signature matching the HTML or the response headers.
    #[must_use]
    pub fn detect_technologies(&self, html: &str, headers: &str) -> BTreeSet<Technology> {
        self.technologies
            .iter()
            .filter(|sig| sig.regex.is_match(html) || sig.regex.is_match(headers))
            .map(|sig| sig.technology.clone())
            .collect()
    }

    /// Growth keywords found in `text`, in table order, plus the hiring flag.
    #[must_use]
    pub fn detect_growth(&self, text: &str) -> (Vec<String>, bool) {
        let growth = self
            .growth
            .iter()
            .filter(|k| k.regex.is_match(text))
            .map(|k| k.word.clone())
            .collect();
        let hiring = self.hiring.iter().any(|k| k.regex.is_match(text));
        (growth, hiring)
    }

    /// First profile link per platform, skipping the platform's reserved
    /// paths. Platforms without one are left out.
    #[must_use]
    pub fn mine_social(&self, html: &str) -> BTreeMap<String, String> {
        self.social
            .iter()
            .filter_map(|profile| {
                profile
                    .first_profile(html)
                    .map(|link| (profile.platform.clone(), link.to_string()))
            })
            .collect()
    }

    /// Contact addresses, lower-cased and deduplicated in order of first
    /// appearance, without asset file names, capped at the configured count.
    #[must_use]
    pub fn mine_emails(&self, html: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        email_regex()
            .find_iter(html)
            .map(|m| m.as_str().to_lowercase())
            .filter(|email| !is_asset_reference(email))
            .filter(|email| seen.insert(email.clone()))
            .take(self.email_cap)
            .collect()
    }

    /// A copyright notice exists and none of the notices names a year of the
    /// recent window. Years elsewhere on the page do not count.
    #[must_use]
    pub fn is_stale(&self, text: &str) -> bool {
        let current = self.reference_year.unwrap_or_else(|| Utc::now().year());
        let oldest = current - self.recent_year_window;
        let mut notices = copyright_notices(text).peekable();
        if notices.peek().is_none() {
            return false;
        }
        let has_recent_year = notices.any(|notice| {
            year_regex()
                .find_iter(notice)
                .filter_map(|m| m.as_str().parse::<i32>().ok())
                .any(|year| (oldest..=current).contains(&year))
        });
        !has_recent_year
    }
}

impl Extractor for SignalExtractor {
    fn mode(&self) -> ScanMode {
        ScanMode::UrlAnalyze
    }

    fn wait_strategy(&self, navigation: &NavigationConfig) -> WaitStrategy {
        WaitStrategy::NetworkIdle {
            quiet: navigation.network_idle(),
            max_wait: navigation.url_timeout() / 3,
        }
    }

    fn navigation_timeout(&self, navigation: &NavigationConfig) -> Duration {
        navigation.url_timeout()
    }

    fn settle_delay(&self, navigation: &NavigationConfig) -> Duration {
        navigation.url_settle()
    }

    fn extract(&self, snapshot: &PageSnapshot) -> ScanPayload {
        ScanPayload::Signals(self.analyze(snapshot))
    }
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .map_err(|e| ScanError::InvalidSignature {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

/// Whole-word, case-insensitive; inner spaces match any whitespace run.
fn keywords(words: Vec<String>) -> Result<Vec<Keyword>> {
    words
        .into_iter()
        .map(|word| {
            let body = word
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            let regex = compile(&word, &format!(r"\b{body}\b"))?;
            Ok(Keyword { word, regex })
        })
        .collect()
}

fn is_asset_reference(email: &str) -> bool {
    if DENSITY_SUFFIXES.iter().any(|suffix| email.contains(suffix)) {
        return true;
    }
    email
        .rsplit('.')
        .next()
        .is_some_and(|tld| ASSET_EXTENSIONS.contains(&tld))
}

/// Text from each copyright marker to the end of its notice: at most
/// [`NOTICE_SPAN`] characters, cut at the first sentence or column break.
fn copyright_notices(text: &str) -> impl Iterator<Item = &str> {
    copyright_regex().find_iter(text).map(move |m| {
        let rest = &text[m.start()..];
        let span = rest.char_indices().nth(NOTICE_SPAN).map_or(rest.len(), |(i, _)| i);
        let window = &rest[..span];
        let end = NOTICE_BREAKS
            .iter()
            .filter_map(|brk| window.find(brk))
            .min()
            .unwrap_or(window.len());
        &window[..end]
    })
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("valid email regex")
    })
}

fn copyright_regex() -> &'static Regex {
    static COPYRIGHT: OnceLock<Regex> = OnceLock::new();
    COPYRIGHT.get_or_init(|| Regex::new(r"(?i)©|\bcopyright\b").expect("valid copyright regex"))
}

fn year_regex() -> &'static Regex {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    YEAR.get_or_init(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SignalExtractor {
        let config = ExtractionConfig {
            reference_year: Some(2026),
            ..ExtractionConfig::default()
        };
        SignalExtractor::new(SignalTables::default(), &config).unwrap()
    }

    fn snapshot(url: &str, html: &str) -> PageSnapshot {
        PageSnapshot {
            final_url: url.to_string(),
            http_status: 200,
            rendered_html: html.to_string(),
            headers: Vec::new(),
        }
    }

    #[test]
    fn test_hiring_agency_with_old_footer() {
        let html = r#"<html><head>
            <script src="https://connect.facebook.net/en_US/fbevents.js"></script>
            </head><body><h2>Acme Roofing</h2>
            <p>We're hiring! Join the crew.</p>
            <footer>© 2021 Acme</footer></body></html>"#;

        let bundle = extractor().analyze(&snapshot("https://acme.test/", html));

        assert!(bundle.has_technology("Facebook Ads"));
        assert!(bundle.hiring_signal);
        assert!(bundle.stale_website);
        assert!(bundle.missing_h1);
        assert!(bundle.https_enabled);
        assert!(bundle.growth_signals.contains(&"hiring".to_string()));
    }

    #[test]
    fn test_recent_copyright_is_not_stale() {
        let ex = extractor();
        assert!(!ex.is_stale("Copyright 2019-2025 Acme Inc."));
        assert!(ex.is_stale("COPYRIGHT 2019 Acme Inc."));
        assert!(!ex.is_stale("Founded 1999, no notice here"));
    }

    #[test]
    fn test_years_outside_the_notice_are_ignored() {
        let ex = extractor();
        assert!(ex.is_stale("© 2021 Acme. Call 1-800-555-2025 today"));
        assert!(ex.is_stale("© 2020 Acme Roofing | Blog: 2025 storm season recap"));
        assert!(ex.is_stale(&format!("© 2018 Acme {} updated 2026", "x".repeat(60))));
        assert!(!ex.is_stale("Serving Ohio since 2024. © Acme Roofing 2025"));
        assert!(!ex.is_stale("© 2019 Old Brand. Copyright 2026 New Brand"));
    }

    #[test]
    fn test_header_only_signatures() {
        let ex = extractor();
        let found = ex.detect_technologies(
            "<html></html>",
            "cf-ray: 8a1b2c3d4e5f-IAD\nx-powered-by: PHP/8.2",
        );
        let names: Vec<_> = found.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Cloudflare", "PHP"]);
    }

    #[test]
    fn test_multiple_matches_in_one_category() {
        let html = r#"<script src="https://www.google-analytics.com/analytics.js"></script>
            <script src="https://static.hotjar.com/c/hotjar-1.js"></script>"#;
        let found = extractor().detect_technologies(html, "");
        assert_eq!(found.iter().filter(|t| t.category == "Analytics").count(), 2);
    }

    #[test]
    fn test_growth_keywords_are_whole_words() {
        let (growth, hiring) =
            extractor().detect_growth("Read the Press release on our Series   A funding");
        assert_eq!(growth, vec!["funding", "press", "series a"]);
        assert!(!hiring);

        let (growth, _) = extractor().detect_growth("expressly launched");
        assert!(growth.is_empty());
    }

    #[test]
    fn test_social_first_match_and_omission() {
        let html = r#"<a href="https://www.linkedin.com/company/acme-co">in</a>
            <a href="https://linkedin.com/company/other">in</a>
            <a href="https://x.com/acmeco">x</a>"#;
        let social = extractor().mine_social(html);

        assert_eq!(
            social.get("linkedin").map(String::as_str),
            Some("linkedin.com/company/acme-co")
        );
        assert_eq!(social.get("twitter").map(String::as_str), Some("x.com/acmeco"));
        assert!(!social.contains_key("facebook"));
        assert!(!social.contains_key("instagram"));
    }

    #[test]
    fn test_share_and_pixel_links_are_not_profiles() {
        let html = r#"<noscript><img src="https://www.facebook.com/tr?id=1&ev=PageView"></noscript>
            <a href="https://www.facebook.com/sharer/sharer.php?u=acme">Share</a>
            <a href="https://twitter.com/intent/tweet?text=hi">Tweet</a>
            <a href="https://twitter.com/share">Share</a>"#;
        let social = extractor().mine_social(html);
        assert!(!social.contains_key("facebook"));
        assert!(!social.contains_key("twitter"));

        let html = format!(
            r#"{html}<a href="https://facebook.com/AcmeRoofing">fb</a>
            <a href="https://twitter.com/Intent_Co">tw</a>"#
        );
        let social = extractor().mine_social(&html);
        assert_eq!(social.get("facebook").map(String::as_str), Some("facebook.com/AcmeRoofing"));
        assert_eq!(social.get("twitter").map(String::as_str), Some("twitter.com/Intent_Co"));
    }

    #[test]
    fn test_emails_filtered_deduplicated_and_capped() {
        let html = r#"
            <img src="/img/logo@2x.png"> <img src="hero@3x.webp">
            <a href="mailto:Sales@Acme.com">Sales@Acme.com</a>
            <a href="mailto:sales@acme.com">again</a>
            <link href="/css/theme@print.css">
            info@acme.com support@acme.com jobs@acme.com"#;

        let emails = extractor().mine_emails(html);

        assert_eq!(emails, vec!["sales@acme.com", "info@acme.com", "support@acme.com"]);
        assert!(emails.iter().all(|e| !e.contains("@2x") && !e.contains("@3x")));
    }

    #[test]
    fn test_email_extraction_is_idempotent() {
        let html = "b@x.io a@x.io B@X.io c@x.io d@x.io";
        let ex = extractor();
        let first = ex.mine_emails(html);
        assert_eq!(first, ex.mine_emails(html));
        assert_eq!(first, vec!["b@x.io", "a@x.io", "c@x.io"]);
    }

    #[test]
    fn test_empty_page_yields_empty_bundle() {
        let bundle = extractor().analyze(&snapshot("http://plain.test/", ""));
        assert!(bundle.detected_technologies.is_empty());
        assert!(bundle.social_profiles.is_empty());
        assert!(bundle.emails.is_empty());
        assert!(!bundle.stale_website);
        assert!(bundle.missing_h1);
        assert!(!bundle.https_enabled);
    }

    #[test]
    fn test_bad_pattern_is_reported() {
        let mut tables = SignalTables::default();
        tables.technologies.push(TechnologySignature {
            category: "Broken".to_string(),
            name: "Unclosed".to_string(),
            pattern: "(unclosed".to_string(),
        });
        let err = SignalExtractor::new(tables, &ExtractionConfig::default()).err().unwrap();
        assert!(matches!(err, ScanError::InvalidSignature { ref name, .. } if name == "Unclosed"));
    }

    #[test]
    fn test_tables_from_json() {
        let tables: SignalTables = serde_json::from_str(
            r#"{"technologies":[{"category":"CMS","name":"Ghost","pattern":"ghost\\.io"}]}"#,
        )
        .unwrap();
        assert_eq!(tables.technologies.len(), 1);
        assert!(tables.growth_keywords.contains(&"careers".to_string()));

        let ex = SignalExtractor::new(tables, &ExtractionConfig::default()).unwrap();
        assert_eq!(ex.detect_technologies("cdn.ghost.io/theme", "").len(), 1);
    }
}
