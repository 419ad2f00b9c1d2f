use crate::id_tracker::IdTracker;
use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{NaiveDateTime, Utc};
use model::records::{order::Order, order_item::OrderItem};
use rand::{Rng, seq::SliceRandom};
use std::{ops::RangeInclusive, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    pub id: i32,
    pub name: &'static str,
    pub category: &'static str,
    pub price_cents: i64,
}

impl Product {
    pub fn price(&self) -> BigDecimal {
        cents(self.price_cents)
    }
}

pub const PRODUCTS: [Product; 10] = [
    product(1001, "Powder Skis", "Skis", 79999),
    product(1002, "All-Mountain Skis", "Skis", 64999),
    product(1003, "Freestyle Snowboard", "Snowboards", 54999),
    product(1004, "Freeride Snowboard", "Snowboards", 69999),
    product(1005, "Ski Boots", "Boots", 44999),
    product(1006, "Snowboard Boots", "Boots", 34999),
    product(1007, "Ski Poles", "Accessories", 7999),
    product(1008, "Ski Goggles", "Accessories", 14999),
    product(1009, "Snowboard Bindings", "Accessories", 24999),
    product(1010, "Ski Helmet", "Accessories", 17999),
];

pub const ORDER_STATUSES: [&str; 5] = ["Pending", "Processing", "Shipped", "Completed", "Cancelled"];
pub const DISCOUNT_PERCENTS: [i64; 5] = [0, 5, 10, 15, 20];
pub const SHIPPING_COST_CENTS: [i64; 4] = [0, 599, 999, 1499];
pub const ITEMS_PER_ORDER: RangeInclusive<usize> = 1..=5;
pub const QUANTITY: RangeInclusive<i32> = 1..=3;

const fn product(id: i32, name: &'static str, category: &'static str, price_cents: i64) -> Product {
    Product {
        id,
        name,
        category,
        price_cents,
    }
}

fn cents(value: i64) -> BigDecimal {
    BigDecimal::new(value.into(), 2)
}

/// Synthetic orders over the fixed product catalog. Ids come from the
/// shared tracker so they continue past what is already committed.
pub struct OrderGenerator<R> {
    rng: R,
    ids: Arc<IdTracker>,
    customers: RangeInclusive<i32>,
}

impl<R: Rng> OrderGenerator<R> {
    pub fn new(rng: R, ids: Arc<IdTracker>, customers: RangeInclusive<i32>) -> Self {
        Self {
            rng,
            ids,
            customers,
        }
    }

    pub fn customers(&self) -> &RangeInclusive<i32> {
        &self.customers
    }

    /// One order and its 1 to 5 items. The order total is the discounted
    /// item sum plus shipping, rounded half-up to cents.
    pub fn generate(&mut self, order_date: NaiveDateTime) -> (Order, Vec<OrderItem>) {
        let order_id = self.ids.next_order_id();
        let customer_id = self.rng.gen_range(self.customers.clone());

        let item_count = self.rng.gen_range(ITEMS_PER_ORDER);
        let items = self
            .ids
            .next_order_item_ids(item_count)
            .into_iter()
            .map(|item_id| self.generate_item(item_id, &order_id))
            .collect::<Vec<_>>();

        let subtotal = items
            .iter()
            .fold(BigDecimal::from(0), |acc, item| acc + item.line_total());
        let discount = *DISCOUNT_PERCENTS.choose(&mut self.rng).unwrap_or(&0);
        let shipping = cents(*SHIPPING_COST_CENTS.choose(&mut self.rng).unwrap_or(&0));
        let status = *ORDER_STATUSES.choose(&mut self.rng).unwrap_or(&"Pending");

        let total = (subtotal * BigDecimal::from(100 - discount) / BigDecimal::from(100)
            + &shipping)
            .with_scale_round(2, RoundingMode::HalfUp);

        let order = Order::new(
            order_id,
            customer_id,
            order_date,
            status,
            total,
            BigDecimal::from(discount),
            shipping,
        );
        (order, items)
    }

    /// `count` orders stamped with the current time, plus all their items
    /// in order.
    pub fn generate_batch(&mut self, count: usize) -> (Vec<Order>, Vec<OrderItem>) {
        let mut orders = Vec::with_capacity(count);
        let mut items = Vec::with_capacity(count * 3);
        for _ in 0..count {
            let (order, order_items) = self.generate(Utc::now().naive_utc());
            orders.push(order);
            items.extend(order_items);
        }
        (orders, items)
    }

    fn generate_item(&mut self, item_id: String, order_id: &str) -> OrderItem {
        let product = PRODUCTS[self.rng.gen_range(0..PRODUCTS.len())];
        let quantity = self.rng.gen_range(QUANTITY);
        let unit_price = product.price();
        let line_total = &unit_price * BigDecimal::from(quantity);

        OrderItem::new(
            item_id,
            order_id,
            product.id,
            product.name,
            product.category,
            quantity,
            unit_price,
            line_total,
        )
    }
}
