//! Lazy, restartable audit queries.
//!
//! `AuditQuery` pages through an `AuditLog` in sequence order, fetching the
//! next page only when the current one is drained. Queries never mutate the
//! log. To resume later, build a new filter with
//! `after_sequence = query.last_sequence()`.

use std::collections::VecDeque;

use toolgate_contracts::{
    audit::{AuditEntry, AuditFilter},
    error::GateResult,
};

use crate::traits::AuditLog;

/// Iterator over audit entries matching a filter.
pub struct AuditQuery<'a> {
    log: &'a dyn AuditLog,
    filter: AuditFilter,
    page_size: usize,
    buffer: VecDeque<AuditEntry>,
    last_sequence: Option<u64>,
    exhausted: bool,
}

impl<'a> AuditQuery<'a> {
    pub fn new(log: &'a dyn AuditLog, filter: AuditFilter, page_size: usize) -> Self {
        let last_sequence = filter.after_sequence;
        Self {
            log,
            filter,
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            last_sequence,
            exhausted: false,
        }
    }

    /// Sequence number of the last entry yielded, or the starting point.
    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    fn fill(&mut self) -> GateResult<()> {
        let mut page_filter = self.filter.clone();
        page_filter.after_sequence = self.last_sequence;
        let page = self.log.page(&page_filter, self.page_size)?;
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for AuditQuery<'_> {
    type Item = GateResult<AuditEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(err) = self.fill() {
                self.exhausted = true;
                return Some(Err(err));
            }
        }
        let entry = self.buffer.pop_front()?;
        self.last_sequence = Some(entry.sequence);
        Some(Ok(entry))
    }
}
