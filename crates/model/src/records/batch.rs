use crate::{
    core::identifiers::{OffsetRange, OffsetToken},
    records::{projection::Projection, row::RowData},
};

/// Rows ready for one append call, plus the token range they commit under.
#[derive(Debug, Clone)]
pub struct Batch {
    pub entity: String,
    pub rows: Vec<RowData>,
    pub range: OffsetRange,
    pub manifest: Manifest,
    pub ts: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub row_count: usize,
    pub size_bytes: usize,
}

pub fn manifest_for(rows: &[RowData]) -> Manifest {
    Manifest {
        row_count: rows.len(),
        size_bytes: rows.iter().map(|r| r.size_bytes()).sum(),
    }
}

impl Batch {
    /// Projects `records` in input order. The range starts at the first
    /// record's token and ends at the last one's. Returns `None` for an
    /// empty slice.
    pub fn from_records<R: Projection>(records: &[R]) -> Option<Self> {
        let first = records.first()?;
        let last = records.last()?;

        let rows = records.iter().map(R::project).collect::<Vec<_>>();
        let manifest = manifest_for(&rows);

        Some(Batch {
            entity: R::ENTITY.to_string(),
            rows,
            range: OffsetRange::new(first.offset_token(), last.offset_token()),
            manifest,
            ts: chrono::Utc::now(),
        })
    }

    pub fn start(&self) -> &OffsetToken {
        &self.range.start
    }

    pub fn end(&self) -> &OffsetToken {
        &self.range.end
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn size_bytes(&self) -> usize {
        self.manifest.size_bytes
    }
}
