use crate::{
    core::{
        data_type::{Column, DataType},
        value::Value,
    },
    records::{projection::Projection, row::RowData},
};
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const ORDER_COLUMNS: [Column; 7] = [
    Column::new("ORDER_ID", DataType::VarChar),
    Column::new("CUSTOMER_ID", DataType::Int),
    Column::new("ORDER_DATE", DataType::TimestampNaive),
    Column::new("ORDER_STATUS", DataType::VarChar),
    Column::new("TOTAL_AMOUNT", DataType::Decimal),
    Column::new("DISCOUNT_PERCENT", DataType::Decimal),
    Column::new("SHIPPING_COST", DataType::Decimal),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    order_id: String,
    customer_id: i32,
    order_date: NaiveDateTime,
    order_status: String,
    total_amount: BigDecimal,
    discount_percent: BigDecimal,
    shipping_cost: BigDecimal,
}

impl Order {
    pub fn new(
        order_id: impl Into<String>,
        customer_id: i32,
        order_date: NaiveDateTime,
        order_status: impl Into<String>,
        total_amount: BigDecimal,
        discount_percent: BigDecimal,
        shipping_cost: BigDecimal,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            customer_id,
            order_date,
            order_status: order_status.into(),
            total_amount,
            discount_percent,
            shipping_cost,
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn customer_id(&self) -> i32 {
        self.customer_id
    }

    pub fn order_date(&self) -> NaiveDateTime {
        self.order_date
    }

    pub fn order_status(&self) -> &str {
        &self.order_status
    }

    pub fn total_amount(&self) -> &BigDecimal {
        &self.total_amount
    }

    pub fn discount_percent(&self) -> &BigDecimal {
        &self.discount_percent
    }

    pub fn shipping_cost(&self) -> &BigDecimal {
        &self.shipping_cost
    }
}

impl Projection for Order {
    const ENTITY: &'static str = "ORDERS";
    const OFFSET_PREFIX: &'static str = "order_";

    fn columns() -> &'static [Column] {
        &ORDER_COLUMNS
    }

    fn offset_id(&self) -> &str {
        &self.order_id
    }

    fn project(&self) -> RowData {
        RowData::from_columns(
            Self::ENTITY,
            &ORDER_COLUMNS,
            [
                Value::from(self.order_id.as_str()),
                Value::from(self.customer_id),
                Value::from(self.order_date),
                Value::from(self.order_status.as_str()),
                Value::from(self.total_amount.clone()),
                Value::from(self.discount_percent.clone()),
                Value::from(self.shipping_cost.clone()),
            ],
        )
    }
}
