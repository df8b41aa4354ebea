//! Search-box filtering for the customer and catalog lists.

use fieldquote_catalog::CatalogItem;

use crate::customer::CustomerRecord;

/// Customers whose name or phone contains `query`, case-insensitively.
///
/// A blank query keeps every customer; order is always preserved.
pub fn filter_customers<'a>(
    customers: &'a [CustomerRecord],
    query: &str,
) -> Vec<&'a CustomerRecord> {
    let Some(needle) = needle(query) else {
        return customers.iter().collect();
    };
    customers
        .iter()
        .filter(|c| {
            contains(&c.name, &needle) || c.phone.as_deref().is_some_and(|p| contains(p, &needle))
        })
        .collect()
}

/// Catalog items whose name contains `query`, case-insensitively.
pub fn filter_items<'a>(items: &'a [CatalogItem], query: &str) -> Vec<&'a CatalogItem> {
    let Some(needle) = needle(query) else {
        return items.iter().collect();
    };
    items.iter().filter(|i| contains(&i.name, &needle)).collect()
}

fn needle(query: &str) -> Option<String> {
    let trimmed = query.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldquote_core::{CatalogItemId, CustomerId};
    use rust_decimal::Decimal;

    fn customer(id: i64, name: &str, phone: Option<&str>) -> CustomerRecord {
        CustomerRecord {
            id: CustomerId::new(id),
            name: name.to_string(),
            email: None,
            phone: phone.map(str::to_string),
            address: None,
            install_date: None,
        }
    }

    fn customers() -> Vec<CustomerRecord> {
        vec![
            customer(3, "Jan de Vries", Some("0612345678")),
            customer(2, "Anna Bakker", None),
            customer(1, "Piet Jansen", Some("0201234567")),
        ]
    }

    #[test]
    fn whitespace_query_returns_input_in_order() {
        let all = customers();
        let filtered = filter_customers(&all, "  ");
        let ids: Vec<_> = filtered.iter().map(|c| c.id.get()).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn matches_phone_substring() {
        let all = vec![customer(1, "Jan de Vries", Some("0612345678"))];
        let filtered = filter_customers(&all, "0612");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Jan de Vries");
    }

    #[test]
    fn matches_name_case_insensitively() {
        let all = customers();
        let names: Vec<_> = filter_customers(&all, "JAN")
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Jan de Vries", "Piet Jansen"]);
    }

    #[test]
    fn customer_without_phone_only_matches_on_name() {
        let all = customers();
        assert!(filter_customers(&all, "020").iter().all(|c| c.id.get() == 1));
    }

    #[test]
    fn items_filter_on_name() {
        let items = vec![
            CatalogItem {
                id: CatalogItemId::new(1),
                name: "Pipe 22mm".into(),
                unit_price: Decimal::ONE,
            },
            CatalogItem {
                id: CatalogItemId::new(2),
                name: "Valve".into(),
                unit_price: Decimal::ONE,
            },
        ];
        assert_eq!(filter_items(&items, "pipe").len(), 1);
        assert_eq!(filter_items(&items, "").len(), 2);
        assert!(filter_items(&items, "screw").is_empty());
    }
}
