//! Shopping list aggregation and rendering

use crate::db::ShoppingCartRow;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Header line of the rendered list
pub const HEADER: &str = "Shopping list:";

/// Download file name
pub const FILE_NAME: &str = "shopping_list.txt";

/// Total amount of one ingredient across the cart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sum amounts per (name, unit), ordered by name then unit
pub fn aggregate(rows: impl IntoIterator<Item = ShoppingCartRow>) -> Vec<ShoppingListItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();

    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingListItem {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

/// Plain-text list: the header, then `"{name} {amount} {unit},"` per line
pub fn render(items: &[ShoppingListItem]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 1 + items.len() * 32);
    out.push_str(HEADER);
    out.push('\n');

    for item in items {
        // Writing into a String cannot fail
        let _ = writeln!(out, "{} {} {},", item.name, item.amount, item.measurement_unit);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i32) -> ShoppingCartRow {
        ShoppingCartRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn test_shared_ingredient_is_summed() {
        let items = aggregate(vec![
            row("sugar", "g", 100),
            row("milk", "ml", 200),
            row("sugar", "g", 50),
        ]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "milk");
        assert_eq!(items[1].name, "sugar");
        assert_eq!(items[1].amount, 150);
    }

    #[test]
    fn test_units_are_kept_apart() {
        let items = aggregate(vec![row("salt", "g", 5), row("salt", "pinch", 1)]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].measurement_unit, "g");
        assert_eq!(items[1].measurement_unit, "pinch");
    }

    #[test]
    fn test_render() {
        let items = aggregate(vec![row("sugar", "g", 100), row("egg", "pcs", 2)]);
        assert_eq!(render(&items), "Shopping list:\negg 2 pcs,\nsugar 100 g,\n");
    }

    #[test]
    fn test_render_empty_cart() {
        assert_eq!(render(&aggregate(Vec::new())), "Shopping list:\n");
    }
}
