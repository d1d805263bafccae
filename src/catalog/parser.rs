//! XML parser for supermarket price-transparency feeds.
//!
//! Chains publish the same structure under different tag spellings, so every
//! field is looked up through a list of accepted names.

use crate::catalog::models::{MarketPrice, Product, DEFAULT_CATEGORY};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Element names that delimit one product record.
const RECORD_TAGS: &[&str] = &["Item", "Product", "ItemDetails"];

const CODE_TAGS: &[&str] = &["ItemCode", "Barcode", "ItemId"];
const NAME_TAGS: &[&str] = &["ItemName", "Name"];
const PRICE_TAGS: &[&str] = &["ItemPrice", "Price"];
const UNIT_TAGS: &[&str] = &["UnitQty", "UnitSize"];
const QUANTITY_TAGS: &[&str] = &["Quantity"];
const BRAND_TAGS: &[&str] = &["ManufacturerName", "Brand"];

/// Parses one market's feed into products, each priced for `market` only.
///
/// Records without an item code, without a name, or with a non-numeric price
/// are skipped. Malformed markup ends parsing early; records completed before
/// the error are returned.
pub fn parse_feed(xml: &str, market: &str) -> Vec<Product> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut products = Vec::new();
    let mut record: Option<RawRecord> = None;
    let mut record_depth = 0usize;
    let mut text = String::new();
    let mut skipped = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if RECORD_TAGS.contains(&name.as_str()) {
                    record.get_or_insert_with(RawRecord::default);
                    record_depth += 1;
                }
                text.clear();
            }
            Ok(Event::Text(e)) => {
                if record.is_some() {
                    match e.unescape() {
                        Ok(t) => text.push_str(&t),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if record.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

                if RECORD_TAGS.contains(&name.as_str()) && record_depth > 0 {
                    record_depth -= 1;
                    if record_depth == 0 {
                        if let Some(raw) = record.take() {
                            match raw.into_product(market) {
                                Some(product) => products.push(product),
                                None => skipped += 1,
                            }
                        }
                    }
                } else if let Some(raw) = record.as_mut() {
                    raw.set_if_absent(name, text.trim());
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(
                    "Malformed {} feed at byte {}: {}. Keeping {} records parsed so far.",
                    market,
                    reader.buffer_position(),
                    e,
                    products.len()
                );
                break;
            }
            _ => {}
        }
    }

    debug!("Parsed {} products from {} feed ({} records skipped)", products.len(), market, skipped);

    products
}

/// Field values collected for one record, first non-empty value per tag.
#[derive(Debug, Default)]
struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    fn set_if_absent(&mut self, tag: String, value: &str) {
        if !value.is_empty() {
            self.fields.entry(tag).or_insert_with(|| value.to_string());
        }
    }

    fn first(&self, tags: &[&str]) -> &str {
        tags.iter().find_map(|t| self.fields.get(*t)).map(String::as_str).unwrap_or("")
    }

    fn into_product(self, market: &str) -> Option<Product> {
        let item_code = self.first(CODE_TAGS);
        let name = self.first(NAME_TAGS);
        let price_raw = self.first(PRICE_TAGS);

        if item_code.is_empty() || name.is_empty() {
            trace!("Skipping record without code or name");
            return None;
        }

        let Some(price) = parse_leading_float(price_raw) else {
            trace!("Skipping {}: unparseable price {:?}", item_code, price_raw);
            return None;
        };

        let normalized_name = normalize_name(name);
        let brand = self.first(BRAND_TAGS);

        Some(Product {
            id: matching_key(item_code, &normalized_name),
            item_code: item_code.to_string(),
            name: name.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            unit: build_unit(self.first(UNIT_TAGS), self.first(QUANTITY_TAGS)),
            brand: if brand.is_empty() { None } else { Some(brand.to_string()) },
            prices: vec![MarketPrice { market: market.to_string(), price }],
            normalized_name,
        })
    }
}

/// Lowercases a name and reduces it to Latin letters, digits, Hebrew letters
/// and single spaces.
pub fn normalize_name(value: &str) -> String {
    let cleaned: String = value
        .to_lowercase()
        .chars()
        .map(|c| {
            let keep = c.is_ascii_lowercase()
                || c.is_ascii_digit()
                || ('\u{0590}'..='\u{05FF}').contains(&c)
                || c.is_whitespace();
            if keep {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns true for 11 to 14 digit codes, which are treated as barcodes.
pub fn is_barcode_like(code: &str) -> bool {
    (11..=14).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit())
}

/// Derives the cross-market matching key for a record.
pub fn matching_key(item_code: &str, normalized_name: &str) -> String {
    if is_barcode_like(item_code) {
        format!("barcode:{}", item_code)
    } else {
        format!("name:{}", normalized_name)
    }
}

/// Joins quantity and unit of measure, tolerating either being absent.
pub fn build_unit(unit_qty: &str, quantity: &str) -> String {
    match (quantity.is_empty(), unit_qty.is_empty()) {
        (true, true) => String::new(),
        (false, true) => quantity.to_string(),
        (true, false) => unit_qty.to_string(),
        (false, false) => format!("{} {}", quantity, unit_qty),
    }
}

/// Parses the longest numeric prefix of `text`, ignoring leading whitespace.
///
/// `"5.90"` and `"5.90 NIS"` both parse to 5.9; `"abc"` and `""` do not parse.
pub fn parse_leading_float(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}
