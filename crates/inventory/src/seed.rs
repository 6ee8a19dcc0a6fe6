use stockroom_core::{ProductCode, Version};

use crate::product::Product;

const CATALOG: [(i64, &str, i64); 5] = [
    (101, "Caneta Azul", 150),
    (102, "Caderno Universitário", 75),
    (103, "Borracha Branca", 200),
    (104, "Lápis Preto HB", 320),
    (105, "Marcador de Texto Amarelo", 90),
];

/// Products provisioned on a fresh installation.
pub fn seed_catalog() -> Vec<Product> {
    CATALOG
        .iter()
        .filter_map(|(code, description, stock)| {
            ProductCode::new(*code)
                .ok()
                .map(|code| Product::new(code, *description, *stock, Version::INITIAL))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_five_products_with_initial_version() {
        let products = seed_catalog();
        assert_eq!(products.len(), 5);
        assert!(products.iter().all(|p| p.version() == Version::INITIAL));
        let pen = products.iter().find(|p| p.code().get() == 101).unwrap();
        assert_eq!(pen.stock_quantity(), 150);
    }
}
