pub mod batch;
pub mod order;
pub mod order_item;
pub mod projection;
pub mod row;
