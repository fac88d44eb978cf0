//! Reference picture list construction (8.3.4).

/// Reference picture sets resolved to DPB slot indices, as produced by RPS
/// derivation (8.3.2) once POC values have been matched against DPB contents.
#[derive(Debug, Clone, Default)]
pub struct RefPicSetIndices {
    pub st_curr_before: Vec<usize>,
    pub st_curr_after: Vec<usize>,
    pub lt_curr: Vec<usize>,
}

impl RefPicSetIndices {
    /// `NumPicTotalCurr` (7-57).
    pub fn num_pic_total_curr(&self) -> usize {
        self.st_curr_before.len() + self.st_curr_after.len() + self.lt_curr.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RefPicLists {
    pub list0: Vec<usize>,
    pub list1: Vec<usize>,
}

/// Build `RefPicListTemp0`/`RefPicList0` (8.3.4) for list 0.
fn build_temp_list(rps: &RefPicSetIndices, num_rps_curr_temp_list: usize, after_first: bool) -> Vec<usize> {
    let mut temp = Vec::with_capacity(num_rps_curr_temp_list);
    while temp.len() < num_rps_curr_temp_list {
        if after_first {
            temp.extend(rps.st_curr_after.iter().copied());
            temp.extend(rps.st_curr_before.iter().copied());
        } else {
            temp.extend(rps.st_curr_before.iter().copied());
            temp.extend(rps.st_curr_after.iter().copied());
        }
        temp.extend(rps.lt_curr.iter().copied());
        if rps.st_curr_before.is_empty() && rps.st_curr_after.is_empty() && rps.lt_curr.is_empty() {
            break;
        }
    }
    temp.truncate(num_rps_curr_temp_list);
    temp
}

/// Resolve a final list from the cyclically-extended temp list, honoring
/// `ref_pic_list_modification()` entries when present (8.3.4, list_entry_lX).
fn resolve_list(temp: &[usize], num_active: usize, modification_entries: Option<&[u8]>) -> Vec<usize> {
    let mut list = Vec::with_capacity(num_active);
    for r_idx in 0..num_active {
        let slot = match modification_entries {
            Some(entries) => {
                let entry = *entries.get(r_idx).unwrap_or(&0) as usize;
                *temp.get(entry).unwrap_or(&0)
            }
            None => *temp.get(r_idx).unwrap_or(&0),
        };
        list.push(slot);
    }
    list
}

/// Build both reference picture lists for a slice (8.3.4). `is_b_slice`
/// selects whether list 1 is constructed at all.
pub fn build_ref_pic_lists(
    rps: &RefPicSetIndices,
    num_ref_idx_l0_active_minus1: u8,
    num_ref_idx_l1_active_minus1: u8,
    is_b_slice: bool,
    list_entry_l0: Option<&[u8]>,
    list_entry_l1: Option<&[u8]>,
) -> RefPicLists {
    let num_pic_total_curr = rps.num_pic_total_curr();

    let num_rps_curr_temp_list0 =
        (num_ref_idx_l0_active_minus1 as usize + 1).max(num_pic_total_curr);
    let temp0 = build_temp_list(rps, num_rps_curr_temp_list0, false);
    let list0 = resolve_list(&temp0, num_ref_idx_l0_active_minus1 as usize + 1, list_entry_l0);

    let list1 = if is_b_slice {
        let num_rps_curr_temp_list1 =
            (num_ref_idx_l1_active_minus1 as usize + 1).max(num_pic_total_curr);
        let temp1 = build_temp_list(rps, num_rps_curr_temp_list1, true);
        resolve_list(&temp1, num_ref_idx_l1_active_minus1 as usize + 1, list_entry_l1)
    } else {
        Vec::new()
    };

    RefPicLists { list0, list1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rps() -> RefPicSetIndices {
        RefPicSetIndices {
            st_curr_before: vec![1, 2],
            st_curr_after: vec![3],
            lt_curr: vec![4],
        }
    }

    #[test]
    fn num_pic_total_curr_sums_all_categories() {
        assert_eq!(rps().num_pic_total_curr(), 4);
    }

    #[test]
    fn list0_orders_before_then_after_then_long_term() {
        let lists = build_ref_pic_lists(&rps(), 3, 0, false, None, None);
        assert_eq!(lists.list0, vec![1, 2, 3, 4]);
        assert!(lists.list1.is_empty());
    }

    #[test]
    fn list1_orders_after_then_before_then_long_term_independently_of_list0() {
        let lists = build_ref_pic_lists(&rps(), 3, 3, true, None, None);
        assert_eq!(lists.list0, vec![1, 2, 3, 4]);
        assert_eq!(lists.list1, vec![3, 1, 2, 4]);
    }

    #[test]
    fn list_entry_modification_reindexes_temp_list() {
        let lists = build_ref_pic_lists(&rps(), 3, 0, false, Some(&[3, 0, 1, 2]), None);
        assert_eq!(lists.list0, vec![4, 1, 2, 3]);
    }
}
