// Position / wait-time estimator
//
// Pure derivation over the current waiting set and shop configuration.
// Nothing here is stored; callers recompute on every read.

use crate::domain::entry::{EntryStatus, QueueEntry};
use crate::domain::shop::Shop;

/// Assign 1-based positions and estimated waits to the waiting entries of `shop`
///
/// Entries are ordered FIFO by `joined_at`, ties broken by `id`. Entries that
/// are not waiting, or belong to another shop, are dropped from the result.
///
/// `estimated_wait_time = (position - 1) * shop.average_service_time`
pub fn recompute_positions(shop: &Shop, entries: Vec<QueueEntry>) -> Vec<QueueEntry> {
    let mut waiting: Vec<QueueEntry> = entries
        .into_iter()
        .filter(|e| e.status == EntryStatus::Waiting && e.shop_id == shop.id)
        .collect();

    waiting.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));

    for (index, entry) in waiting.iter_mut().enumerate() {
        let rank = index as u32 + 1;
        entry.position = Some(rank);
        entry.estimated_wait_time = Some((rank - 1).saturating_mul(shop.average_service_time));
    }
    waiting
}

/// Pick the entry a shop is currently serving
///
/// Racing operators can leave more than one entry in service; the earliest
/// `called_at` wins (ties by `id`).
pub fn select_in_service(entries: &[QueueEntry]) -> Option<&QueueEntry> {
    entries
        .iter()
        .filter(|e| e.status == EntryStatus::InService)
        .min_by(|a, b| {
            a.called_at
                .unwrap_or(i64::MAX)
                .cmp(&b.called_at.unwrap_or(i64::MAX))
                .then_with(|| a.id.cmp(&b.id))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop(avg: u32) -> Shop {
        let mut s = Shop::new("shop-1", "Fade Factory", "1 Main St", 0);
        s.average_service_time = avg;
        s
    }

    fn waiting(id: &str, joined_at: i64) -> QueueEntry {
        QueueEntry::new(id, "shop-1", format!("cust-{}", id), joined_at)
    }

    fn positions(entries: &[QueueEntry]) -> Vec<(String, u32, u32)> {
        entries
            .iter()
            .map(|e| {
                (
                    e.id.clone(),
                    e.position.unwrap(),
                    e.estimated_wait_time.unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_three_entries_fifo() {
        let entries = vec![waiting("C", 3_000), waiting("A", 1_000), waiting("B", 2_000)];
        let result = recompute_positions(&shop(15), entries);
        assert_eq!(
            positions(&result),
            vec![
                ("A".to_string(), 1, 0),
                ("B".to_string(), 2, 15),
                ("C".to_string(), 3, 30)
            ]
        );
    }

    #[test]
    fn test_cancel_shifts_later_entries_down() {
        let mut entries = vec![waiting("A", 1_000), waiting("B", 2_000), waiting("C", 3_000)];
        entries[1].cancel(2_500).unwrap();

        let result = recompute_positions(&shop(15), entries);
        assert_eq!(
            positions(&result),
            vec![("A".to_string(), 1, 0), ("C".to_string(), 2, 15)]
        );
    }

    #[test]
    fn test_called_entry_leaves_waiting_set() {
        let mut entries = vec![waiting("A", 1_000), waiting("B", 2_000), waiting("C", 3_000)];
        entries[0].call(4_000).unwrap();

        let result = recompute_positions(&shop(15), entries);
        assert_eq!(
            positions(&result),
            vec![("B".to_string(), 1, 0), ("C".to_string(), 2, 15)]
        );
    }

    #[test]
    fn test_positions_are_contiguous_for_many_entries() {
        // Scrambled join times with duplicates
        let entries: Vec<QueueEntry> = (0..50)
            .map(|i| waiting(&format!("e{:02}", i), ((i * 7) % 13) as i64))
            .collect();

        let result = recompute_positions(&shop(10), entries);
        assert_eq!(result.len(), 50);
        for (index, entry) in result.iter().enumerate() {
            let k = index as u32 + 1;
            assert_eq!(entry.position, Some(k));
            assert_eq!(entry.estimated_wait_time, Some((k - 1) * 10));
        }
        for pair in result.windows(2) {
            assert!(
                (pair[0].joined_at, &pair[0].id) < (pair[1].joined_at, &pair[1].id),
                "FIFO order violated"
            );
        }
    }

    #[test]
    fn test_ties_break_by_id() {
        let entries = vec![waiting("b", 1_000), waiting("a", 1_000)];
        let result = recompute_positions(&shop(15), entries);
        assert_eq!(result[0].id, "a");
        assert_eq!(result[1].id, "b");
    }

    #[test]
    fn test_other_shop_entries_are_ignored() {
        let mut foreign = waiting("X", 500);
        foreign.shop_id = "shop-2".to_string();
        let result = recompute_positions(&shop(15), vec![foreign, waiting("A", 1_000)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].position, Some(1));
    }

    #[test]
    fn test_select_in_service_prefers_earliest_call() {
        let mut a = waiting("A", 1_000);
        let mut b = waiting("B", 2_000);
        a.call(5_000).unwrap();
        b.call(4_000).unwrap();
        let entries = vec![a, b, waiting("C", 3_000)];
        assert_eq!(select_in_service(&entries).unwrap().id, "B");
        assert!(select_in_service(&entries[2..]).is_none());
    }
}
