/// Slices a fully-materialized result set into one page. `page` is 1-based;
/// out-of-range pages yield an empty slice. The total always reflects the
/// whole dataset so callers can render page controls.
pub fn paginate<T: Clone>(items: &[T], page: usize, count: usize) -> (usize, Vec<T>) {
    let total = items.len();
    if page == 0 || count == 0 {
        return (total, Vec::new());
    }

    let start = (page - 1).saturating_mul(count);
    if start >= total {
        return (total, Vec::new());
    }

    let end = start.saturating_add(count).min(total);
    (total, items[start..end].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_partition_the_dataset() {
        let items: Vec<u32> = (0..23).collect();
        let count = 5;

        let mut seen = Vec::new();
        let mut page = 1;
        loop {
            let (total, page_items) = paginate(&items, page, count);
            assert_eq!(total, items.len());
            if page_items.is_empty() {
                break;
            }
            seen.extend(page_items);
            page += 1;
        }

        assert_eq!(seen, items);
    }

    #[test]
    fn last_page_may_be_short() {
        let items: Vec<u32> = (0..7).collect();
        let (total, page_items) = paginate(&items, 2, 5);
        assert_eq!(total, 7);
        assert_eq!(page_items, vec![5, 6]);
    }

    #[test]
    fn out_of_range_page_is_empty_but_keeps_total() {
        let items: Vec<u32> = (0..3).collect();
        let (total, page_items) = paginate(&items, 9, 5);
        assert_eq!(total, 3);
        assert!(page_items.is_empty());
    }

    #[test]
    fn zero_page_or_count_yields_nothing() {
        let items: Vec<u32> = (0..3).collect();
        assert_eq!(paginate(&items, 0, 5), (3, Vec::new()));
        assert_eq!(paginate(&items, 1, 0), (3, Vec::new()));
    }

    #[test]
    fn empty_dataset_paginates_cleanly() {
        let items: Vec<u32> = Vec::new();
        assert_eq!(paginate(&items, 1, 10), (0, Vec::new()));
    }
}
