//! Cross-market merging of parsed products by matching key.

use crate::catalog::models::Product;
use std::collections::HashMap;
use tracing::trace;

/// Merges `incoming` into `target`, keyed by matching key.
///
/// Products with a new key are appended in arrival order. Products with a
/// known key have their prices folded into the existing record, with the
/// incoming market's price replacing any earlier price for that market, so
/// merging the same feed twice leaves the table unchanged.
pub fn merge(target: Vec<Product>, incoming: Vec<Product>) -> Vec<Product> {
    let mut merged: Vec<Product> = Vec::with_capacity(target.len() + incoming.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for product in target.into_iter().chain(incoming) {
        match index.get(&product.id) {
            Some(&i) => {
                trace!("Merging {} into existing record", product.id);
                merged[i].absorb(product);
            }
            None => {
                index.insert(product.id.clone(), merged.len());
                merged.push(product);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parser::parse_feed;

    const FEED_X: &str = r#"
        <Items>
          <Item><ItemCode>7290000000001</ItemCode><ItemName>Milk</ItemName><ItemPrice>6.40</ItemPrice></Item>
          <Item><ItemCode>55</ItemCode><ItemName>White Bread</ItemName><ItemPrice>8.00</ItemPrice></Item>
        </Items>"#;

    const FEED_Y: &str = r#"
        <Products>
          <Product>
            <ItemCode>7290000000001</ItemCode><ItemName>Milk 1L</ItemName><ItemPrice>5.90</ItemPrice>
            <UnitQty>liter</UnitQty><Quantity>1</Quantity>
          </Product>
          <Product><ItemCode>99</ItemCode><ItemName>white  bread!</ItemName><ItemPrice>7.50</ItemPrice></Product>
          <Product><ItemCode>7290000000003</ItemCode><ItemName>Eggs</ItemName><ItemPrice>12.90</ItemPrice></Product>
        </Products>"#;

    #[test]
    fn test_merge_by_barcode_and_name() {
        let merged = merge(parse_feed(FEED_X, "X"), parse_feed(FEED_Y, "Y"));
        assert_eq!(merged.len(), 3);

        let milk = &merged[0];
        assert_eq!(milk.id, "barcode:7290000000001");
        assert_eq!(milk.name, "Milk");
        assert_eq!(milk.price_in("X"), Some(6.4));
        assert_eq!(milk.price_in("Y"), Some(5.9));
        assert_eq!(milk.unit, "1 liter");

        let bread = &merged[1];
        assert_eq!(bread.id, "name:white bread");
        assert_eq!(bread.prices.len(), 2);

        assert_eq!(merged[2].id, "barcode:7290000000003");
        assert_eq!(merged[2].prices.len(), 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = merge(Vec::new(), parse_feed(FEED_X, "X"));
        let twice = merge(once.clone(), parse_feed(FEED_X, "X"));
        assert_eq!(once, twice);

        let both = merge(once, parse_feed(FEED_Y, "Y"));
        let again = merge(both.clone(), parse_feed(FEED_Y, "Y"));
        assert_eq!(both, again);
    }

    #[test]
    fn test_merge_incoming_price_overwrites_same_market() {
        let old = parse_feed(FEED_X, "X");
        let newer = parse_feed(
            r#"<Item><ItemCode>7290000000001</ItemCode><ItemName>Milk</ItemName><ItemPrice>6.10</ItemPrice></Item>"#,
            "X",
        );

        let merged = merge(old, newer);
        assert_eq!(merged[0].prices.len(), 1);
        assert_eq!(merged[0].price_in("X"), Some(6.1));
    }

    #[test]
    fn test_merge_collapses_duplicates_within_one_feed() {
        let feed = r#"
            <Items>
              <Item><ItemCode>1</ItemCode><ItemName>Salt</ItemName><ItemPrice>2</ItemPrice></Item>
              <Item><ItemCode>2</ItemCode><ItemName>SALT</ItemName><ItemPrice>3</ItemPrice></Item>
            </Items>"#;

        let merged = merge(Vec::new(), parse_feed(feed, "X"));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].price_in("X"), Some(3.0));
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge(Vec::new(), Vec::new()).is_empty());
    }
}
