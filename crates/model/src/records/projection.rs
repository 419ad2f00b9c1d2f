use crate::{
    core::{data_type::Column, identifiers::OffsetToken},
    records::row::RowData,
};

/// A domain record that maps onto one destination table.
pub trait Projection {
    /// Destination table name.
    const ENTITY: &'static str;

    /// Prefix of this record type's offset tokens.
    const OFFSET_PREFIX: &'static str;

    fn columns() -> &'static [Column];

    /// Identity used to build the offset token.
    fn offset_id(&self) -> &str;

    fn project(&self) -> RowData;

    fn offset_token(&self) -> OffsetToken {
        OffsetToken::with_prefix(Self::OFFSET_PREFIX, self.offset_id())
    }
}
