use std::collections::BTreeMap;

use crate::models::grid::{LotteryGrid, NumberPosition, ScanResult};
use crate::models::ticket::{TicketRow, EMPTY, REGULAR_COUNT, UNREADABLE};

/// Rebuild ordered ticket rows from per-cell readings.
///
/// Cells missing from `scan` count as unreadable; missing columns are
/// padded with [`EMPTY`]. Rows with nothing in them are dropped.
pub fn reconstruct(grid: &LotteryGrid, scan: &ScanResult) -> Vec<TicketRow> {
    let mut by_row: BTreeMap<usize, Vec<&NumberPosition>> = BTreeMap::new();
    for position in &grid.positions {
        by_row.entry(position.row).or_default().push(position);
    }

    let reading = |position: &NumberPosition| {
        scan.get(position)
            .map(|r| r.as_sentinel())
            .unwrap_or(UNREADABLE)
    };

    let rows = by_row.into_values().map(|mut positions| {
        positions.sort_by_key(|p| p.column);

        let numbers: Vec<i32> = positions
            .iter()
            .filter(|p| !p.is_special)
            .take(REGULAR_COUNT)
            .map(|p| reading(*p))
            .collect();

        let special = positions
            .iter()
            .find(|p| p.is_special)
            .map(|p| reading(*p))
            .unwrap_or(EMPTY);

        TicketRow::from_parts(&numbers, Some(special))
    });

    drop_empty_rows(rows)
}

/// Drop rows holding only [`EMPTY`], keeping the rest in order
fn drop_empty_rows(rows: impl IntoIterator<Item = TicketRow>) -> Vec<TicketRow> {
    rows.into_iter().filter(|row| !row.is_empty()).collect()
}
