//! Dashboard aggregation.

use std::collections::{HashMap, HashSet};

use rhema_core::{AppSettings, Book, BookFormat, BookId, BookStatus, Money, Order, OrderStatus};
use serde::Serialize;

/// Sales figures for one catalog book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookPerformance {
    pub id: BookId,
    pub title: String,
    pub cover_url: String,
    pub stock: Option<i32>,
    pub format: BookFormat,
    /// Units sold on paid orders.
    pub sold: u32,
    pub revenue: Money,
}

/// Headline numbers of the back office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    /// Sum of paid orders only.
    pub total_revenue: Money,
    pub total_orders: usize,
    pub active_books: usize,
    /// Books in launch status plus the configured launch book, counted once.
    pub launch_count: usize,
    pub is_pre_launch: bool,
    /// Every catalog book, best sellers first.
    pub book_performance: Vec<BookPerformance>,
}

#[derive(Default)]
struct Sold {
    quantity: u32,
    revenue: Money,
}

/// Build the dashboard from the catalog, the ledger and the settings.
///
/// Order items are matched to books by title, since items keep their title
/// after the catalog entry changes or disappears.
#[must_use]
pub fn summarize(books: &[Book], orders: &[Order], settings: &AppSettings) -> Dashboard {
    let paid: Vec<&Order> = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Paid)
        .collect();

    let mut sold_by_title: HashMap<&str, Sold> = HashMap::new();
    for item in paid.iter().flat_map(|o| &o.items) {
        let entry = sold_by_title.entry(item.title.as_str()).or_default();
        entry.quantity = entry.quantity.saturating_add(item.quantity);
        entry.revenue += item.line_total();
    }

    let mut launch_ids: HashSet<BookId> = books
        .iter()
        .filter(|b| b.status == BookStatus::Launch)
        .map(|b| b.id)
        .collect();
    launch_ids.extend(settings.launch_book_id);

    let mut book_performance: Vec<BookPerformance> = books
        .iter()
        .map(|book| {
            let sold = sold_by_title.get(book.title.as_str());
            BookPerformance {
                id: book.id,
                title: book.title.clone(),
                cover_url: book.cover_url.clone(),
                stock: book.stock,
                format: book.format,
                sold: sold.map_or(0, |s| s.quantity),
                revenue: sold.map_or(Money::ZERO, |s| s.revenue),
            }
        })
        .collect();
    book_performance.sort_by(|a, b| b.sold.cmp(&a.sold));

    Dashboard {
        total_revenue: paid.iter().map(|o| o.amount).sum(),
        total_orders: orders.len(),
        active_books: books
            .iter()
            .filter(|b| b.status == BookStatus::Active)
            .count(),
        launch_count: launch_ids.len(),
        is_pre_launch: settings.is_pre_launch,
        book_performance,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rhema_core::OrderItem;

    use super::*;
    use crate::services::fakes::{book, order};

    fn item(title: &str, quantity: u32, cents: i64) -> OrderItem {
        OrderItem {
            book_id: None,
            title: title.to_string(),
            quantity,
            price: Money::from_cents(cents),
        }
    }

    #[test]
    fn test_revenue_counts_paid_orders_only() {
        let orders = vec![
            order("Ana", OrderStatus::Paid, 5990),
            order("Bia", OrderStatus::Awaiting, 2490),
            order("Caio", OrderStatus::Cancelled, 1000),
            order("Davi", OrderStatus::Paid, 2490),
        ];

        let dashboard = summarize(&[], &orders, &AppSettings::default());

        assert_eq!(dashboard.total_revenue, Money::from_cents(8480));
        assert_eq!(dashboard.total_orders, 4);
    }

    #[test]
    fn test_launch_count_deduplicates_configured_book() {
        let launch = book("Novo", BookStatus::Launch);
        let other_launch = book("Outro", BookStatus::Launch);
        let active = book("Antigo", BookStatus::Active);
        let settings = AppSettings {
            launch_book_id: Some(launch.id),
            is_pre_launch: true,
            ..AppSettings::default()
        };

        let books = [launch, other_launch, active.clone()];
        let dashboard = summarize(&books, &[], &settings);
        assert_eq!(dashboard.launch_count, 2);
        assert_eq!(dashboard.active_books, 1);
        assert!(dashboard.is_pre_launch);

        let settings = AppSettings {
            launch_book_id: Some(active.id),
            ..AppSettings::default()
        };
        assert_eq!(summarize(&books, &[], &settings).launch_count, 3);
    }

    #[test]
    fn test_book_performance_sorted_by_units_sold() {
        let books = [
            book("Ebook X", BookStatus::Active),
            book("Physical Book Y", BookStatus::Active),
            book("Unsold", BookStatus::Inactive),
        ];
        let mut first = order("Ana", OrderStatus::Paid, 0);
        first.items = vec![item("Ebook X", 1, 2490), item("Physical Book Y", 2, 5990)];
        let mut second = order("Bia", OrderStatus::Paid, 0);
        second.items = vec![item("Physical Book Y", 1, 5990)];
        let mut pending = order("Caio", OrderStatus::Awaiting, 0);
        pending.items = vec![item("Ebook X", 10, 2490)];

        let dashboard = summarize(&books, &[first, second, pending], &AppSettings::default());
        let perf = &dashboard.book_performance;

        assert_eq!(perf[0].title, "Physical Book Y");
        assert_eq!(perf[0].sold, 3);
        assert_eq!(perf[0].revenue, Money::from_cents(17970));
        assert_eq!(perf[1].title, "Ebook X");
        assert_eq!(perf[1].sold, 1);
        assert_eq!(perf[2].sold, 0);
        assert_eq!(perf[2].revenue, Money::ZERO);
    }
}
