use crate::{
    core::{
        data_type::{Column, DataType},
        value::Value,
    },
    records::{projection::Projection, row::RowData},
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

pub const ORDER_ITEM_COLUMNS: [Column; 8] = [
    Column::new("ORDER_ITEM_ID", DataType::VarChar),
    Column::new("ORDER_ID", DataType::VarChar),
    Column::new("PRODUCT_ID", DataType::Int),
    Column::new("PRODUCT_NAME", DataType::VarChar),
    Column::new("PRODUCT_CATEGORY", DataType::VarChar),
    Column::new("QUANTITY", DataType::Int),
    Column::new("UNIT_PRICE", DataType::Decimal),
    Column::new("LINE_TOTAL", DataType::Decimal),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    order_item_id: String,
    order_id: String,
    product_id: i32,
    product_name: String,
    product_category: String,
    quantity: i32,
    unit_price: BigDecimal,
    line_total: BigDecimal,
}

impl OrderItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_item_id: impl Into<String>,
        order_id: impl Into<String>,
        product_id: i32,
        product_name: impl Into<String>,
        product_category: impl Into<String>,
        quantity: i32,
        unit_price: BigDecimal,
        line_total: BigDecimal,
    ) -> Self {
        Self {
            order_item_id: order_item_id.into(),
            order_id: order_id.into(),
            product_id,
            product_name: product_name.into(),
            product_category: product_category.into(),
            quantity,
            unit_price,
            line_total,
        }
    }

    pub fn order_item_id(&self) -> &str {
        &self.order_item_id
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn product_id(&self) -> i32 {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn product_category(&self) -> &str {
        &self.product_category
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    pub fn unit_price(&self) -> &BigDecimal {
        &self.unit_price
    }

    pub fn line_total(&self) -> &BigDecimal {
        &self.line_total
    }
}

impl Projection for OrderItem {
    const ENTITY: &'static str = "ORDER_ITEMS";
    const OFFSET_PREFIX: &'static str = "item_";

    fn columns() -> &'static [Column] {
        &ORDER_ITEM_COLUMNS
    }

    fn offset_id(&self) -> &str {
        &self.order_item_id
    }

    fn project(&self) -> RowData {
        RowData::from_columns(
            Self::ENTITY,
            &ORDER_ITEM_COLUMNS,
            [
                Value::from(self.order_item_id.as_str()),
                Value::from(self.order_id.as_str()),
                Value::from(self.product_id),
                Value::from(self.product_name.as_str()),
                Value::from(self.product_category.as_str()),
                Value::from(self.quantity),
                Value::from(self.unit_price.clone()),
                Value::from(self.line_total.clone()),
            ],
        )
    }
}
