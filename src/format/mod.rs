//! Output formatting (table, JSON, markdown, CSV).

use crate::catalog::{compare_product, ComparisonRow, Product};
use crate::config::OutputFormat;
use crate::playback::{ExportReceipt, PlaybackOutcome, PlaybackSession};
use crate::retailers::selectors::SelectorProbe;
use crate::retailers::Retailer;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Formats catalog and playback data for output.
pub struct Formatter {
    format: OutputFormat,
}

/// Flattened product with its price summary, as written to JSON.
#[derive(Serialize)]
struct ProductSummary<'a> {
    id: &'a str,
    item_code: &'a str,
    name: &'a str,
    category: &'a str,
    unit: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    brand: Option<&'a str>,
    prices: BTreeMap<&'a str, f64>,
    best_market: Option<String>,
    best_price: Option<f64>,
    in_all_markets: bool,
}

impl<'a> ProductSummary<'a> {
    fn new(product: &'a Product, markets: &[String], active: &BTreeSet<String>) -> Self {
        let best = product.best_price(active);
        Self {
            id: &product.id,
            item_code: &product.item_code,
            name: &product.name,
            category: &product.category,
            unit: &product.unit,
            brand: product.brand.as_deref(),
            prices: product.prices.iter().map(|p| (p.market.as_str(), p.price)).collect(),
            best_price: (!best.is_none()).then_some(best.price),
            best_market: best.source,
            in_all_markets: product.is_in_all(markets),
        }
    }
}

#[derive(Serialize)]
struct Comparison<'a> {
    product: &'a Product,
    rows: Vec<ComparisonRow>,
}

#[derive(Serialize)]
struct RetailerSummary {
    name: &'static str,
    shop_url: &'static str,
    automated: bool,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the product list with one price column per market.
    pub fn format_products(
        &self,
        products: &[Product],
        markets: &[String],
        active: &BTreeSet<String>,
    ) -> String {
        if products.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => self.csv_header(markets),
                _ => "No products found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => {
                let rows: Vec<_> =
                    products.iter().map(|p| ProductSummary::new(p, markets, active)).collect();
                serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Table => self.table_products(products, markets, active),
            OutputFormat::Markdown => self.markdown_products(products, markets, active),
            OutputFormat::Csv => self.csv_products(products, markets, active),
        }
    }

    /// Formats the per-market comparison for one product.
    pub fn format_comparison(&self, product: &Product, active: &BTreeSet<String>) -> String {
        let rows = compare_product(product, active);

        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(&Comparison { product, rows })
                .unwrap_or_else(|_| "{}".to_string());
        }

        if self.format == OutputFormat::Csv {
            let mut lines = vec!["market,price,best".to_string()];
            for row in &rows {
                lines.push(format!("{},{:.2},{}", Self::csv_escape(&row.market), row.price, row.is_best));
            }
            return lines.join("\n");
        }

        let markdown = self.format == OutputFormat::Markdown;
        let mut lines = Vec::new();

        if markdown {
            lines.push(format!("## {}", product.name));
            lines.push(String::new());
            lines.push(format!("- **Code:** {}", product.item_code));
            lines.push(format!("- **Category:** {}", product.category));
            if !product.unit.is_empty() {
                lines.push(format!("- **Unit:** {}", product.unit));
            }
            if let Some(brand) = &product.brand {
                lines.push(format!("- **Brand:** {}", brand));
            }
        } else {
            lines.push(format!("Name:     {}", product.name));
            lines.push(format!("Code:     {}", product.item_code));
            lines.push(format!("Category: {}", product.category));
            if !product.unit.is_empty() {
                lines.push(format!("Unit:     {}", product.unit));
            }
            if let Some(brand) = &product.brand {
                lines.push(format!("Brand:    {}", brand));
            }
        }
        lines.push(String::new());

        if rows.is_empty() {
            lines.push("Select at least one supermarket.".to_string());
            return lines.join("\n");
        }

        if markdown {
            lines.push("| Market | Price | |".to_string());
            lines.push("|--------|-------|-|".to_string());
            for row in &rows {
                let mark = if row.is_best { "**Best price**" } else { "" };
                lines.push(format!("| {} | ₪{:.2} | {} |", row.market, row.price, mark));
            }
        } else {
            let market_width = rows.iter().map(|r| r.market.chars().count()).max().unwrap_or(0).max(6);
            lines.push(format!("{:<market_width$}  {:>10}", "Market", "Price"));
            lines.push(format!("{:-<market_width$}  {:-<10}", "", ""));
            for row in &rows {
                let price = format!("₪{:.2}", row.price);
                let mark = if row.is_best { "  Best price" } else { "" };
                lines.push(format!("{:<market_width$}  {:>10}{}", row.market, price, mark));
            }
        }

        lines.join("\n")
    }

    /// Formats the retailer table.
    pub fn format_retailers(&self, retailers: &[Retailer]) -> String {
        let summaries: Vec<_> = retailers
            .iter()
            .map(|r| RetailerSummary {
                name: r.name(),
                shop_url: r.shop_url(),
                automated: r.automation().is_some(),
            })
            .collect();

        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&summaries).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Csv => {
                let mut lines = vec!["name,shop_url,automated".to_string()];
                for s in &summaries {
                    lines.push(format!("{},{},{}", s.name, s.shop_url, s.automated));
                }
                lines.join("\n")
            }
            OutputFormat::Markdown => {
                let mut lines = vec![
                    "| Retailer | Shop | Cart filling |".to_string(),
                    "|----------|------|--------------|".to_string(),
                ];
                for s in &summaries {
                    let auto = if s.automated { "✓" } else { "" };
                    lines.push(format!("| {} | {} | {} |", s.name, s.shop_url, auto));
                }
                lines.join("\n")
            }
            OutputFormat::Table => {
                let mut lines = Vec::new();
                lines.push(format!("{:<16}  {:<5}  {}", "Retailer", "Auto", "Shop URL"));
                lines.push(format!("{:-<16}  {:-<5}  {:-<45}", "", "", ""));
                for s in &summaries {
                    let auto = if s.automated { "Yes" } else { "No" };
                    lines.push(format!("{:<16}  {:<5}  {}", s.name, auto, s.shop_url));
                }
                lines.join("\n")
            }
        }
    }

    /// Formats the result of an export.
    pub fn format_receipt(&self, receipt: &ExportReceipt) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(receipt).unwrap_or_else(|_| "{}".to_string());
        }

        let mut lines = vec![
            format!("Exported {} items to {}", receipt.item_count, receipt.target),
            format!("Shop: {}", receipt.shop_url),
        ];
        if receipt.automated {
            lines.push("Run `cart-filler fill` to add them to your cart.".to_string());
        } else {
            lines.push(format!("Automatic cart filling is not available for {}.", receipt.target));
        }
        lines.join("\n")
    }

    /// Formats the pending export, or its absence.
    pub fn format_session(&self, session: Option<&PlaybackSession>, now_ms: u64) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(&session).unwrap_or_else(|_| "null".to_string());
        }

        let Some(session) = session else {
            return "No active export".to_string();
        };

        let mut lines = vec![
            session.target.to_string(),
            format!(
                "{} items • {}m ago",
                session.items.len(),
                session.minutes_since_export(now_ms)
            ),
        ];
        for item in &session.items {
            lines.push(format!("  - {}", item.label()));
        }
        lines.join("\n")
    }

    /// Formats a playback summary.
    pub fn format_outcome(&self, outcome: &PlaybackOutcome) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(outcome).unwrap_or_else(|_| "{}".to_string());
        }

        let summary = format!(
            "Complete! Added {} items ({} failed)",
            outcome.success_count, outcome.fail_count
        );
        if outcome.cancelled {
            format!("{} - cancelled after {} items", summary, outcome.attempted)
        } else {
            summary
        }
    }

    /// Formats selector probe results.
    pub fn format_probes(&self, retailer: Retailer, probes: &[SelectorProbe]) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(probes).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Csv => {
                let mut lines = vec!["role,selector,matches".to_string()];
                for p in probes {
                    lines.push(format!("{},{},{}", p.role, Self::csv_escape(p.selector), p.matches));
                }
                lines.join("\n")
            }
            OutputFormat::Table | OutputFormat::Markdown => {
                let mut lines = vec![format!("Selectors for {}", retailer), String::new()];
                lines.push(format!("{:<14}  {:>7}  {}", "Role", "Matches", "Selector"));
                lines.push(format!("{:-<14}  {:-<7}  {:-<40}", "", "", ""));
                for p in probes {
                    lines.push(format!("{:<14}  {:>7}  {}", p.role, p.matches, p.selector));
                }

                for role in ["search input", "add to cart"] {
                    if !probes.iter().any(|p| p.role == role && p.matches > 0) {
                        lines.push(String::new());
                        lines.push(format!("Warning: no {} selector matched", role));
                    }
                }
                lines.join("\n")
            }
        }
    }

    // Product list helpers

    fn best_text(product: &Product, active: &BTreeSet<String>) -> String {
        let best = product.best_price(active);
        match best.source {
            Some(market) => format!("{:.2} at {}", best.price, market),
            None => "No market selected".to_string(),
        }
    }

    fn coverage_text(product: &Product, markets: &[String]) -> &'static str {
        if product.is_in_all(markets) {
            "Both markets"
        } else {
            "Single market"
        }
    }

    fn price_cell(product: &Product, market: &str) -> String {
        product
            .price_in(market)
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "-".to_string())
    }

    fn table_products(
        &self,
        products: &[Product],
        markets: &[String],
        active: &BTreeSet<String>,
    ) -> String {
        let code_width = 14;
        let best_width = 26;
        let coverage_width = 13;
        let name_width = 40;
        let market_widths: Vec<usize> =
            markets.iter().map(|m| m.chars().count().max(8)).collect();

        let mut lines = Vec::new();

        let mut header = format!("{:<code_width$}", "Code");
        let mut rule = format!("{:-<code_width$}", "");
        for (market, width) in markets.iter().zip(market_widths.iter().copied()) {
            header.push_str(&format!("  {:>width$}", market));
            rule.push_str(&format!("  {:-<width$}", ""));
        }
        header.push_str(&format!("  {:<best_width$}  {:<coverage_width$}  {}", "Best", "Coverage", "Name"));
        rule.push_str(&format!("  {:-<best_width$}  {:-<coverage_width$}  {:-<name_width$}", "", "", ""));
        lines.push(header);
        lines.push(rule);

        for product in products {
            let mut row = format!("{:<code_width$}", truncate(&product.item_code, code_width));
            for (market, width) in markets.iter().zip(market_widths.iter().copied()) {
                row.push_str(&format!("  {:>width$}", Self::price_cell(product, market)));
            }
            row.push_str(&format!(
                "  {:<best_width$}  {:<coverage_width$}  {}",
                truncate(&Self::best_text(product, active), best_width),
                Self::coverage_text(product, markets),
                truncate(&product.name, name_width)
            ));
            lines.push(row);
        }

        lines.push(String::new());
        lines.push(format!("Total: {} products", products.len()));

        lines.join("\n")
    }

    fn markdown_products(
        &self,
        products: &[Product],
        markets: &[String],
        active: &BTreeSet<String>,
    ) -> String {
        let mut lines = Vec::new();

        let mut header = "| Code |".to_string();
        let mut rule = "|------|".to_string();
        for market in markets {
            header.push_str(&format!(" {} |", market));
            rule.push_str("---|");
        }
        header.push_str(" Best | Coverage | Name |");
        rule.push_str("------|----------|------|");
        lines.push(header);
        lines.push(rule);

        for product in products {
            let mut row = format!("| {} |", product.item_code);
            for market in markets {
                row.push_str(&format!(" {} |", Self::price_cell(product, market)));
            }
            row.push_str(&format!(
                " {} | {} | {} |",
                Self::best_text(product, active),
                Self::coverage_text(product, markets),
                truncate(&product.name, 40)
            ));
            lines.push(row);
        }

        lines.push(String::new());
        lines.push(format!("*{} products found*", products.len()));

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header(&self, markets: &[String]) -> String {
        let mut columns = vec!["id", "item_code", "name", "category", "unit", "brand"]
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        columns.extend(markets.iter().map(|m| Self::csv_escape(m)));
        columns.extend(["best_price", "best_market", "in_all_markets"].map(str::to_string));
        columns.join(",")
    }

    fn csv_products(
        &self,
        products: &[Product],
        markets: &[String],
        active: &BTreeSet<String>,
    ) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_header(markets));

        for product in products {
            let best = product.best_price(active);
            let mut fields = vec![
                Self::csv_escape(&product.id),
                product.item_code.clone(),
                Self::csv_escape(&product.name),
                Self::csv_escape(&product.category),
                Self::csv_escape(&product.unit),
                product.brand.as_deref().map(Self::csv_escape).unwrap_or_default(),
            ];
            fields.extend(
                markets
                    .iter()
                    .map(|m| product.price_in(m).map(|p| p.to_string()).unwrap_or_default()),
            );
            fields.push(if best.is_none() { String::new() } else { best.price.to_string() });
            fields.push(best.source.as_deref().map(Self::csv_escape).unwrap_or_default());
            fields.push(product.is_in_all(markets).to_string());

            lines.push(fields.join(","));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

/// Shortens `s` to at most `max` characters, ending in "..." when cut.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MarketPrice, DEFAULT_CATEGORY};
    use crate::playback::BasketItem;

    fn markets() -> Vec<String> {
        vec!["Shufersal".to_string(), "Mahsanei Hashuk".to_string()]
    }

    fn all_active() -> BTreeSet<String> {
        markets().into_iter().collect()
    }

    fn make_product(code: &str, name: &str, prices: &[(&str, f64)]) -> Product {
        Product {
            id: format!("barcode:{}", code),
            item_code: code.to_string(),
            name: name.to_string(),
            normalized_name: name.to_lowercase(),
            category: DEFAULT_CATEGORY.to_string(),
            unit: "1 ליטר".to_string(),
            brand: Some("תנובה".to_string()),
            prices: prices
                .iter()
                .map(|(m, p)| MarketPrice { market: m.to_string(), price: *p })
                .collect(),
        }
    }

    fn milk() -> Product {
        make_product(
            "7290000000001",
            "חלב 3% בקרטון",
            &[("Shufersal", 6.4), ("Mahsanei Hashuk", 5.9)],
        )
    }

    fn bread() -> Product {
        make_product("7290000000002", "Bread, sliced", &[("Shufersal", 7.0)])
    }

    #[test]
    fn test_table_products() {
        let formatter = Formatter::new(OutputFormat::Table);
        let output = formatter.format_products(&[milk(), bread()], &markets(), &all_active());

        assert!(output.contains("Code"));
        assert!(output.contains("Mahsanei Hashuk"));
        assert!(output.contains("5.90 at Mahsanei Hashuk"));
        assert!(output.contains("7.00 at Shufersal"));
        assert!(output.contains("Both markets"));
        assert!(output.contains("Single market"));
        assert!(output.contains("חלב 3% בקרטון"));
        assert!(output.contains("Total: 2 products"));
    }

    #[test]
    fn test_table_no_active_market() {
        let formatter = Formatter::new(OutputFormat::Table);
        let output = formatter.format_products(&[milk()], &markets(), &BTreeSet::new());
        assert!(output.contains("No market selected"));
    }

    #[test]
    fn test_table_truncates_hebrew_by_chars() {
        let formatter = Formatter::new(OutputFormat::Table);
        let long = make_product("1", &"חלב ".repeat(30), &[("Shufersal", 1.0)]);
        let output = formatter.format_products(&[long], &markets(), &all_active());
        assert!(output.contains("..."));
    }

    #[test]
    fn test_empty_products() {
        let markets = markets();
        let active = all_active();
        assert_eq!(
            Formatter::new(OutputFormat::Table).format_products(&[], &markets, &active),
            "No products found."
        );
        assert_eq!(Formatter::new(OutputFormat::Json).format_products(&[], &markets, &active), "[]");
        assert_eq!(
            Formatter::new(OutputFormat::Csv).format_products(&[], &markets, &active),
            "id,item_code,name,category,unit,brand,Shufersal,Mahsanei Hashuk,best_price,best_market,in_all_markets"
        );
    }

    #[test]
    fn test_json_products() {
        let formatter = Formatter::new(OutputFormat::Json);
        let output = formatter.format_products(&[milk()], &markets(), &all_active());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value[0]["best_market"], "Mahsanei Hashuk");
        assert_eq!(value[0]["best_price"], 5.9);
        assert_eq!(value[0]["prices"]["Shufersal"], 6.4);
        assert_eq!(value[0]["in_all_markets"], true);
    }

    #[test]
    fn test_json_products_without_best() {
        let formatter = Formatter::new(OutputFormat::Json);
        let output = formatter.format_products(&[bread()], &markets(), &BTreeSet::new());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert!(value[0]["best_market"].is_null());
        assert!(value[0]["best_price"].is_null());
    }

    #[test]
    fn test_markdown_products() {
        let formatter = Formatter::new(OutputFormat::Markdown);
        let output = formatter.format_products(&[milk(), bread()], &markets(), &all_active());

        assert!(output.contains("| Code | Shufersal | Mahsanei Hashuk | Best | Coverage | Name |"));
        assert!(output.contains("| 7290000000002 | 7.00 | - |"));
        assert!(output.contains("*2 products found*"));
    }

    #[test]
    fn test_csv_products() {
        let formatter = Formatter::new(OutputFormat::Csv);
        let output = formatter.format_products(&[milk(), bread()], &markets(), &all_active());
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with(",6.4,5.9,5.9,Mahsanei Hashuk,true"));
        assert!(lines[2].contains("\"Bread, sliced\""));
        assert!(lines[2].ends_with(",7,,7,Shufersal,false"));
    }

    #[test]
    fn test_comparison_table() {
        let formatter = Formatter::new(OutputFormat::Table);
        let output = formatter.format_comparison(&milk(), &all_active());

        assert!(output.contains("Name:     חלב 3% בקרטון"));
        assert!(output.contains("Brand:    תנובה"));
        assert!(output.contains("₪6.40"));
        let best_line = output.lines().find(|l| l.contains("Best price")).unwrap();
        assert!(best_line.starts_with("Mahsanei Hashuk"));
    }

    #[test]
    fn test_comparison_respects_active_markets() {
        let formatter = Formatter::new(OutputFormat::Table);
        let active: BTreeSet<String> = ["Shufersal".to_string()].into_iter().collect();
        let output = formatter.format_comparison(&milk(), &active);

        assert!(output.contains("₪6.40"));
        assert!(!output.contains("₪5.90"));
        assert!(output.contains("Best price"));
    }

    #[test]
    fn test_comparison_without_markets() {
        let formatter = Formatter::new(OutputFormat::Table);
        let output = formatter.format_comparison(&milk(), &BTreeSet::new());
        assert!(output.ends_with("Select at least one supermarket."));
    }

    #[test]
    fn test_comparison_json_and_csv() {
        let json = Formatter::new(OutputFormat::Json).format_comparison(&milk(), &all_active());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rows"][1]["is_best"], true);

        let csv = Formatter::new(OutputFormat::Csv).format_comparison(&milk(), &all_active());
        assert_eq!(csv, "market,price,best\nShufersal,6.40,false\nMahsanei Hashuk,5.90,true");
    }

    #[test]
    fn test_retailers_table() {
        let output = Formatter::new(OutputFormat::Table).format_retailers(Retailer::all());
        let rami = output.lines().find(|l| l.starts_with("Rami Levy")).unwrap();
        assert!(rami.contains("Yes"));
        assert!(rami.contains("https://www.rami-levy.co.il/he/online/market"));
        let victory = output.lines().find(|l| l.starts_with("Victory")).unwrap();
        assert!(victory.contains("No"));
    }

    #[test]
    fn test_retailers_json() {
        let output = Formatter::new(OutputFormat::Json).format_retailers(Retailer::all());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 5);
        assert_eq!(value[0]["name"], "Shufersal");
        assert_eq!(value[0]["automated"], true);
    }

    #[test]
    fn test_session_status() {
        let formatter = Formatter::new(OutputFormat::Table);
        assert_eq!(formatter.format_session(None, 0), "No active export");

        let session = PlaybackSession::new(
            Retailer::Shufersal,
            vec![BasketItem::new(Some("1"), Some("Milk")), BasketItem::new(Some("2"), None)],
            0,
        );
        let output = formatter.format_session(Some(&session), 5 * 60_000);
        assert!(output.starts_with("Shufersal\n2 items • 5m ago"));
        assert!(output.contains("  - Milk"));
        assert!(output.contains("  - 2"));
    }

    #[test]
    fn test_outcome_summary() {
        let formatter = Formatter::new(OutputFormat::Table);
        let outcome =
            PlaybackOutcome { success_count: 2, fail_count: 1, attempted: 3, cancelled: false };
        assert_eq!(formatter.format_outcome(&outcome), "Complete! Added 2 items (1 failed)");

        let cancelled = PlaybackOutcome { cancelled: true, attempted: 1, success_count: 1, fail_count: 0 };
        assert!(formatter.format_outcome(&cancelled).contains("cancelled after 1 items"));
    }

    #[test]
    fn test_probe_warnings() {
        let probes = vec![SelectorProbe { role: "search input", selector: "input[name='q']", matches: 1 }];
        let output = Formatter::new(OutputFormat::Table).format_probes(Retailer::RamiLevy, &probes);

        assert!(output.contains("Selectors for Rami Levy"));
        assert!(!output.contains("no search input selector matched"));
        assert!(output.contains("Warning: no add to cart selector matched"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("שלום עולם", 6), "שלו...");
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(Formatter::csv_escape("simple"), "simple");
        assert_eq!(Formatter::csv_escape("with,comma"), "\"with,comma\"");
        assert_eq!(Formatter::csv_escape("with\"quote"), "\"with\"\"quote\"");
    }
}
