//! Detail-page attribute extraction
//!
//! A listing's detail page is scraped once, when the listing first appears.
//! Each extractor targets one section of the page and fails soft: a missing
//! section is skipped with a debug log and the rest still contribute. Only a
//! page where nothing at all can be extracted is a parse error.

use crate::offers::OfferAttributes;
use crate::RadarError;
use scraper::{ElementRef, Html, Selector};

/// Parses a listing detail page into its attribute mapping
///
/// # Arguments
///
/// * `html` - The detail page body
/// * `url` - The listing URL, for error context
///
/// # Returns
///
/// * `Ok(OfferAttributes)` - At least one attribute was extracted
/// * `Err(RadarError::DetailParse)` - The page yielded nothing recognizable
pub fn parse_offer_details(html: &str, url: &str) -> crate::Result<OfferAttributes> {
    let document = Html::parse_document(html);
    let mut attributes = OfferAttributes::new();

    extract_title(&document, &mut attributes);
    extract_price(&document, &mut attributes);
    extract_price_evaluation(&document, &mut attributes);
    extract_main_details(&document, &mut attributes);
    extract_extended_details(&document, &mut attributes);
    extract_description(&document, &mut attributes);
    extract_location(&document, &mut attributes);

    if attributes.is_empty() {
        return Err(RadarError::DetailParse {
            url: url.to_string(),
            message: "no recognizable sections on detail page".to_string(),
        });
    }

    Ok(attributes)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn select_first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

fn extract_title(document: &Html, attributes: &mut OfferAttributes) {
    match select_first_text(document, r#"h1[class^="offer-title"]"#) {
        Some(title) => {
            attributes.insert("title".to_string(), title);
        }
        None => tracing::debug!("No title on detail page"),
    }
}

fn extract_price(document: &Html, attributes: &mut OfferAttributes) {
    if let Some(price) = select_first_text(document, r#"span[class^="offer-price__number"]"#) {
        attributes.insert("price".to_string(), price);
    }
    if let Some(currency) = select_first_text(document, r#"span[class^="offer-price__currency"]"#)
    {
        attributes.insert("currency".to_string(), currency);
    }
}

fn extract_price_evaluation(document: &Html, attributes: &mut OfferAttributes) {
    if let Some(evaluation) = select_first_text(
        document,
        r#"div[data-testid="small-price-evaluation-indicator"]"#,
    ) {
        attributes.insert("price_evaluation".to_string(), evaluation);
    }
}

/// Extracts the headline parameter grid (mileage, fuel type, gearbox, ...)
///
/// Each entry is a pair of `<p>` tags: label then value. The label text is
/// used verbatim as the attribute key, keeping the mapping open for whatever
/// fields the site decides to show.
fn extract_main_details(document: &Html, attributes: &mut OfferAttributes) {
    let Ok(detail_selector) =
        Selector::parse(r#"div[data-testid="main-details-section"] div[data-testid="detail"]"#)
    else {
        return;
    };
    let Ok(p_selector) = Selector::parse("p") else {
        return;
    };

    for detail in document.select(&detail_selector) {
        let texts: Vec<String> = detail.select(&p_selector).map(element_text).collect();
        if let [label, value] = texts.as_slice() {
            if !label.is_empty() && !value.is_empty() {
                attributes.insert(label.clone(), value.clone());
            }
        }
    }
}

/// Extracts the basic-information table further down the page
fn extract_extended_details(document: &Html, attributes: &mut OfferAttributes) {
    let Ok(row_selector) =
        Selector::parse(r#"div[data-testid="basic_information"] div[data-testid]"#)
    else {
        return;
    };
    let Ok(p_selector) = Selector::parse("p") else {
        return;
    };

    for row in document.select(&row_selector) {
        let texts: Vec<String> = row.select(&p_selector).map(element_text).collect();
        if let [label, value] = texts.as_slice() {
            if !label.is_empty() && !value.is_empty() {
                attributes.insert(label.clone(), value.clone());
            }
        }
    }
}

fn extract_description(document: &Html, attributes: &mut OfferAttributes) {
    let Ok(selector) = Selector::parse(r#"div[data-testid="textWrapper"] p"#) else {
        return;
    };

    let paragraphs: Vec<String> = document
        .select(&selector)
        .map(element_text)
        .filter(|p| !p.is_empty())
        .collect();

    if !paragraphs.is_empty() {
        attributes.insert("description".to_string(), paragraphs.join("\n"));
    }
}

fn extract_location(document: &Html, attributes: &mut OfferAttributes) {
    if let Some(location) = select_first_text(
        document,
        r#"a[href^="https://www.google.com/maps/search/"]"#,
    ) {
        attributes.insert("location".to_string(), location);
    }
}
