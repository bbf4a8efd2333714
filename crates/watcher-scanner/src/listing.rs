use crate::extractor::{normalize_whitespace, Extractor};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use watcher_browser::WaitStrategy;
use watcher_core::{
    ListingRecord, NavigationConfig, PageSnapshot, ScanMode, ScanPayload,
    DAYS_ON_MARKET_FALLBACK, MAX_LISTINGS, SQFT_FALLBACK,
};

/// Structural marker carried by every listing card.
pub const CARD_SELECTOR: &str = "[data-testid='property-card']";

const ADDRESS_SELECTOR: &str = "[data-label='pc-address']";
const PRICE_SELECTOR: &str = "[data-label='pc-price']";
const SQFT_SELECTOR: &str = "[data-label='pc-meta-sqft']";
const DAYS_ON_MARKET_SELECTOR: &str = "[data-label='pc-meta-dom']";

/// Reads property cards from a real-estate search page.
pub struct ListingExtractor {
    max_listings: usize,
    card: Selector,
    address: Selector,
    price: Selector,
    square_footage: Selector,
    days_on_market: Selector,
}

impl ListingExtractor {
    /// Read at most `max_listings` cards, never more than [`MAX_LISTINGS`].
    #[must_use]
    pub fn new(max_listings: usize) -> Self {
        Self {
            max_listings: max_listings.min(MAX_LISTINGS),
            card: selector(CARD_SELECTOR),
            address: selector(ADDRESS_SELECTOR),
            price: selector(PRICE_SELECTOR),
            square_footage: selector(SQFT_SELECTOR),
            days_on_market: selector(DAYS_ON_MARKET_SELECTOR),
        }
    }

    /// Cards in document order, at most `max_listings` of them read. Cards
    /// without an address or a price are dropped.
    #[must_use]
    pub fn parse(&self, html: &str) -> Vec<ListingRecord> {
        let document = Html::parse_document(html);
        document
            .select(&self.card)
            .take(self.max_listings)
            .filter_map(|card| self.parse_card(&card))
            .collect()
    }

    fn parse_card(&self, card: &ElementRef) -> Option<ListingRecord> {
        let address = extract_text(card, &self.address)?;
        let price = extract_text(card, &self.price)?;

        Some(ListingRecord {
            address,
            price,
            square_footage: extract_text(card, &self.square_footage)
                .unwrap_or_else(|| SQFT_FALLBACK.to_string()),
            days_on_market: extract_text(card, &self.days_on_market)
                .unwrap_or_else(|| DAYS_ON_MARKET_FALLBACK.to_string()),
        })
    }
}

impl Extractor for ListingExtractor {
    fn mode(&self) -> ScanMode {
        ScanMode::ZipSearch
    }

    fn wait_strategy(&self, _navigation: &NavigationConfig) -> WaitStrategy {
        WaitStrategy::DomContentLoaded
    }

    fn navigation_timeout(&self, navigation: &NavigationConfig) -> Duration {
        navigation.zip_timeout()
    }

    fn settle_delay(&self, navigation: &NavigationConfig) -> Duration {
        navigation.zip_settle()
    }

    fn ready_selector(&self) -> Option<&str> {
        Some(CARD_SELECTOR)
    }

    fn extract(&self, snapshot: &PageSnapshot) -> ScanPayload {
        ScanPayload::Listings(self.parse(&snapshot.rendered_html))
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid listing selector")
}

/// Trimmed, whitespace-collapsed text of the first match; blank counts as absent.
fn extract_text(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(
        address: Option<&str>,
        price: Option<&str>,
        sqft: Option<&str>,
        dom: Option<&str>,
    ) -> String {
        let field = |label: &str, value: Option<&str>| {
            value
                .map(|v| format!(r#"<div data-label="{label}">{v}</div>"#))
                .unwrap_or_default()
        };
        format!(
            r#"<div data-testid="property-card">{}{}<ul>{}{}</ul></div>"#,
            field("pc-price", price),
            field("pc-address", address),
            field("pc-meta-sqft", sqft),
            field("pc-meta-dom", dom),
        )
    }

    fn page(cards: &[String]) -> String {
        format!(
            "<html><body><section class=\"results\">{}</section></body></html>",
            cards.concat()
        )
    }

    #[test]
    fn test_parse_search_results() {
        let html = page(&[
            card(
                Some("<span>123 Main St</span>\n<span>Beverly Hills, CA 90210</span>"),
                Some(" $1,250,000 "),
                Some("2,400 sqft"),
                Some("3 days"),
            ),
            card(Some("9 Elm Rd"), Some("$799,000"), None, None),
        ]);

        let listings = ListingExtractor::new(10).parse(&html);

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].address, "123 Main St Beverly Hills, CA 90210");
        assert_eq!(listings[0].price, "$1,250,000");
        assert_eq!(listings[0].square_footage, "2,400 sqft");
        assert_eq!(listings[0].days_on_market, "3 days");
        assert_eq!(listings[1].square_footage, "N/A");
        assert_eq!(listings[1].days_on_market, "New");
    }

    #[test]
    fn test_cards_missing_required_fields_are_dropped() {
        let html = page(&[
            card(None, Some("$500,000"), None, None),
            card(Some("1 Lone Pine Way"), None, None, None),
            card(Some("   "), Some("$1"), None, None),
            card(Some("4 Kept Ct"), Some("$650,000"), None, None),
        ]);

        let listings = ListingExtractor::new(10).parse(&html);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].address, "4 Kept Ct");
    }

    #[test]
    fn test_truncates_to_first_cards_in_document_order() {
        let cards: Vec<String> = (1..=14)
            .map(|n| card(Some(&format!("{n} Grid St")), Some("$1"), None, None))
            .collect();
        let listings = ListingExtractor::new(10).parse(&page(&cards));

        assert_eq!(listings.len(), 10);
        assert_eq!(listings[0].address, "1 Grid St");
        assert_eq!(listings[9].address, "10 Grid St");
        assert!(listings.iter().all(|l| !l.address.is_empty() && !l.price.is_empty()));
    }

    #[test]
    fn test_limit_above_maximum_is_clamped() {
        let cards: Vec<String> = (1..=14)
            .map(|n| card(Some(&format!("{n} Grid St")), Some("$1"), None, None))
            .collect();
        let listings = ListingExtractor::new(50).parse(&page(&cards));
        assert_eq!(listings.len(), MAX_LISTINGS);
    }

    #[test]
    fn test_invalid_cards_count_toward_the_limit() {
        let mut cards = vec![card(None, Some("$1"), None, None)];
        cards.extend(
            (1..=10).map(|n| card(Some(&format!("{n} Late St")), Some("$1"), None, None)),
        );
        let listings = ListingExtractor::new(10).parse(&page(&cards));
        assert_eq!(listings.len(), 9);
    }

    #[test]
    fn test_no_cards_yields_empty() {
        let listings = ListingExtractor::new(10).parse("<html><body>No homes</body></html>");
        assert!(listings.is_empty());
    }
}
