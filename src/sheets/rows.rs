//! Mapping between spreadsheet rows and domain records.
//!
//! Headers are matched loosely because the sheets were edited by hand over
//! time: English and French names, with or without underscores.

use serde_json::Value;

use crate::domain::aggregates::{LineItem, Order, OrderStatus, Product};
use crate::domain::lenient::cell_text;
use crate::domain::value_objects::PriceTag;

/// Render every cell as display text, the way `FORMATTED_VALUE` would.
pub fn to_text_grid(values: &[Vec<Value>]) -> Vec<Vec<String>> {
    values.iter().map(|row| row.iter().map(cell_text).collect()).collect()
}

/// Parse a product grid whose first row is the header row.
///
/// Rows without a name are dropped; blank cells get the storefront defaults.
pub fn parse_products(grid: &[Vec<String>]) -> Vec<Product> {
    let Some((headers, rows)) = grid.split_first() else { return vec![] };
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let cells = headers.iter().enumerate().map(|(col, header)| (header.as_str(), row.get(col).cloned().unwrap_or_default()));
            product_from_cells(cells, index + 1)
        })
        .collect()
}

const PLACEHOLDER_NAME: &str = "Produit";

/// Build a product from `(header, value)` pairs. `position` is the 1-based
/// data row, used as the id when the id cell is blank.
pub fn product_from_cells<'a>(cells: impl IntoIterator<Item = (&'a str, String)>, position: usize) -> Option<Product> {
    let mut product = Product::default();
    for (header, value) in cells {
        let key = header.trim().to_lowercase();
        if key.is_empty() { continue; }
        match product_field(&key) {
            Some(ProductField::Id) => product.id = value,
            Some(ProductField::Name) => product.name = value,
            Some(ProductField::Price) => product.price = PriceTag::new(value),
            Some(ProductField::Category) => product.category = value,
            Some(ProductField::Image) => product.image = value,
            Some(ProductField::Description) => product.description = value,
            Some(ProductField::Created) => product.created = value,
            None => { product.extra.insert(key, value); }
        }
    }
    // Template rows left with the header's own name are not products
    if !product.has_name() || product.name.trim() == PLACEHOLDER_NAME { return None; }
    if product.id.trim().is_empty() { product.id = position.to_string(); }
    Some(product.with_defaults())
}

enum ProductField { Id, Name, Price, Category, Image, Description, Created }

fn product_field(key: &str) -> Option<ProductField> {
    let field = match key {
        "id" => ProductField::Id,
        "nom" | "produit" => ProductField::Name,
        "prix" => ProductField::Price,
        "categorie" | "catégorie" => ProductField::Category,
        "desc" => ProductField::Description,
        "created" | "date" | "créé" => ProductField::Created,
        k if k.contains("name") => ProductField::Name,
        k if k.contains("price") => ProductField::Price,
        k if k.contains("category") => ProductField::Category,
        k if k.contains("image") => ProductField::Image,
        k if k.contains("description") => ProductField::Description,
        _ => return None,
    };
    Some(field)
}

/// Parse an order grid whose first row is the header row, in sheet order.
///
/// Rows without a customer name are dropped.
pub fn parse_orders(grid: &[Vec<String>]) -> Vec<Order> {
    let Some((headers, rows)) = grid.split_first() else { return vec![] };
    rows.iter()
        .filter_map(|row| {
            let cells = headers.iter().enumerate().map(|(col, header)| (header.as_str(), row.get(col).cloned().unwrap_or_default()));
            order_from_cells(cells)
        })
        .collect()
}

/// Build an order from `(header, value)` pairs.
pub fn order_from_cells<'a>(cells: impl IntoIterator<Item = (&'a str, String)>) -> Option<Order> {
    let mut order = Order::default();
    let mut legacy_product: Option<String> = None;
    let mut legacy_quantity: Option<u32> = None;
    let mut date: Option<String> = None;

    for (header, value) in cells {
        let key: String = header.to_lowercase().chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
        match key.as_str() {
            "id" => order.id = value,
            "customername" | "client" | "nom" => order.customer_name = value,
            "phone" | "customerphone" | "telephone" | "téléphone" => order.customer_phone = value,
            "email" | "customeremail" => order.customer_email = Some(value).filter(|v| !v.trim().is_empty()),
            "address" | "customeraddress" | "adresse" => order.customer_address = value,
            "products" | "produits" => order.products = parse_products_cell(&value),
            "productname" | "produit" => legacy_product = Some(value).filter(|v| !v.trim().is_empty()),
            "quantity" | "quantité" => legacy_quantity = value.trim().parse().ok(),
            "total" | "ordertotal" => order.order_total = value,
            "notes" => order.notes = value,
            "status" | "statut" => order.status = OrderStatus::from(value),
            "timestamp" => order.timestamp = value,
            "date" => date = Some(value),
            _ => {}
        }
    }

    if order.customer_name.trim().is_empty() { return None; }
    if order.products.is_empty() {
        if let Some(name) = legacy_product {
            order.products.push(LineItem { id: None, name, quantity: legacy_quantity.unwrap_or(1), price: PriceTag::default() });
        }
    }
    if order.timestamp.trim().is_empty() {
        order.timestamp = date.unwrap_or_default();
    }
    if order.id.trim().is_empty() {
        if let Some(ts) = order.placed_at() { order.id = ts.timestamp_millis().to_string(); }
    }
    Some(order)
}

/// Products column text, e.g. `Parfum (x2), Vernis (x1)`.
pub fn format_products_cell(items: &[LineItem]) -> String {
    items.iter().map(|i| format!("{} (x{})", i.name, i.quantity)).collect::<Vec<_>>().join(", ")
}

/// Parse the products column: either a JSON array of line items or the
/// `Name (xN), ...` text form.
pub fn parse_products_cell(raw: &str) -> Vec<LineItem> {
    let raw = raw.trim();
    if raw.is_empty() { return vec![]; }
    if raw.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<LineItem>>(raw) { return items; }
    }

    let mut items = Vec::new();
    let mut rest = raw;
    while let Some((name, quantity, tail)) = next_quantity_marker(rest) {
        let name = name.trim().trim_start_matches(',').trim();
        if !name.is_empty() {
            items.push(LineItem { id: None, name: name.to_string(), quantity, price: PriceTag::default() });
        }
        rest = tail;
    }
    let leftover = rest.trim().trim_start_matches(',').trim();
    if !leftover.is_empty() {
        items.push(LineItem { id: None, name: leftover.to_string(), quantity: 1, price: PriceTag::default() });
    }
    items
}

/// Find the next `(xN)` marker: returns the text before it, N, and the text after it.
fn next_quantity_marker(s: &str) -> Option<(&str, u32, &str)> {
    let mut search_from = 0;
    while let Some(offset) = s[search_from..].find("(x") {
        let start = search_from + offset;
        let digits_start = start + 2;
        let digits_len = s[digits_start..].chars().take_while(char::is_ascii_digit).count();
        let close = digits_start + digits_len;
        if digits_len > 0 && s[close..].starts_with(')') {
            if let Ok(quantity) = s[digits_start..close].parse() {
                return Some((&s[..start], quantity, &s[close + 1..]));
            }
        }
        search_from = digits_start;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter().map(|r| r.iter().map(|c| (*c).to_string()).collect()).collect()
    }

    #[test]
    fn test_products_with_french_headers() {
        let products = parse_products(&grid(&[
            &["Nom", "Prix", "Catégorie", "Image", "Desc", "Stock"],
            &["Crème Anti-Âge", "3500 DA", "Soin", "https://img/c.jpg", "Hydratante", "7"],
            &["Vernis", "850 DA"],
        ]));
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id, "1");
        assert_eq!(products[0].category, "Soin");
        assert_eq!(products[0].extra.get("stock").map(String::as_str), Some("7"));
        assert_eq!(products[1].id, "2");
        assert_eq!(products[1].category, "Général");
        assert_eq!(products[1].image, crate::domain::aggregates::product::PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_products_skip_nameless_rows() {
        let products = parse_products(&grid(&[&["ID", "Name", "Price"], &["1", "  ", "10"], &[], &["3", "Mascara", ""]]));
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Mascara");
        assert_eq!(products[0].price.as_str(), "0");
    }

    #[test]
    fn test_products_skip_placeholder_rows() {
        let products = parse_products(&grid(&[
            &["ID", "Nom", "Prix"],
            &["1", "Produit", "0"],
            &["2", " Produit ", ""],
            &["3", "Produit Bio", "900"],
        ]));
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Produit Bio");
    }

    #[test]
    fn test_header_only_grid_is_empty() {
        assert!(parse_products(&grid(&[&["ID", "Name"]])).is_empty());
        assert!(parse_products(&[]).is_empty());
        assert!(parse_orders(&grid(&[&["ID", "Customer_Name"]])).is_empty());
    }

    #[test]
    fn test_orders_from_script_layout() {
        let orders = parse_orders(&grid(&[
            &["ID", "Customer_Name", "Phone", "Email", "Address", "Products", "Total", "Status", "Date"],
            &["1700000000000", "Marie", "0555", "", "Alger", "Parfum Eclat (x2), Vernis (x1)", "9850 DA", "En cours", "14/11/2023 22:13:20"],
            &["", "", "0666"],
        ]));
        assert_eq!(orders.len(), 1);
        let order = &orders[0];
        assert_eq!(order.status, OrderStatus::InProgress);
        assert_eq!(order.products.len(), 2);
        assert_eq!(order.products[0].quantity, 2);
        assert!(order.customer_email.is_none());
        assert_eq!(order.timestamp, "14/11/2023 22:13:20");
    }

    #[test]
    fn test_legacy_order_columns() {
        let orders = parse_orders(&grid(&[
            &["Date", "Customer Name", "Customer Phone", "Product Name", "Quantity", "Status", "Notes"],
            &["2024-03-01", "Jean Martin", "0987654321", "Rouge à Lèvres", "2", "", "Livraison rapide"],
        ]));
        let order = &orders[0];
        assert_eq!(order.products, vec![LineItem { id: None, name: "Rouge à Lèvres".into(), quantity: 2, price: PriceTag::default() }]);
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.notes, "Livraison rapide");
        assert!(!order.id.is_empty());
    }

    #[test]
    fn test_products_cell_json_and_text() {
        let json = parse_products_cell(r#"[{"name":"Parfum","quantity":"2","price":2850}]"#);
        assert_eq!(json[0].quantity, 2);
        assert_eq!(json[0].price.as_str(), "2850");

        let text = parse_products_cell("Eau (fraîche) (x3), Crème, visage (x1)");
        assert_eq!(text.iter().map(|i| (i.name.as_str(), i.quantity)).collect::<Vec<_>>(), [("Eau (fraîche)", 3), ("Crème, visage", 1)]);

        let bare = parse_products_cell("Mascara");
        assert_eq!(bare[0].quantity, 1);
    }

    #[test]
    fn test_format_products_cell() {
        let items = vec![
            LineItem { id: None, name: "Parfum".into(), quantity: 2, price: PriceTag::default() },
            LineItem { id: None, name: "Vernis".into(), quantity: 1, price: PriceTag::default() },
        ];
        assert_eq!(format_products_cell(&items), "Parfum (x2), Vernis (x1)");
    }
}
