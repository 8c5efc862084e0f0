use crate::model::RECORD_TYPE_OBJECT;
use crate::plan::Plan;
use tracing::debug;

/// Compute the execution order over plan entries (returned as entry
/// indices).
///
/// Placement is insertion-ordered, not a topological sort: objects can
/// reference each other mutually, so cycles are never rejected. Each
/// individual reference edge is later classified as forward- or
/// backward-resolvable against this final order instead of demanding a DAG.
pub fn build_execution_order(plan: &Plan) -> Vec<usize> {
    let mut order: Vec<usize> = Vec::with_capacity(plan.entries.len());

    for (entry_index, entry) in plan.entries.iter().enumerate() {
        // Record-type rows must exist before anything that might embed a
        // record-type business key.
        if entry.name == RECORD_TYPE_OBJECT {
            order.insert(0, entry_index);
            continue;
        }

        // Scan the current list from its end toward its start; remember the
        // earliest task that depends on the new object and insert just
        // before it.
        let mut insert_at = None;
        for pos in (0..order.len()).rev() {
            let existing = &plan.entries[order[pos]];
            if existing.depends_on(&entry.name) {
                insert_at = Some(pos);
            }
        }
        match insert_at {
            Some(pos) => order.insert(pos, entry_index),
            None => order.push(entry_index),
        }
    }

    master_detail_correction(plan, &mut order);

    debug!(
        "Execution order: {:?}",
        order
            .iter()
            .map(|i| plan.entries[*i].name.as_str())
            .collect::<Vec<_>>()
    );

    order
}

/// Post-pass: a master-detail parent must precede its detail regardless of
/// where the referenced-by scan placed it. Relocate each offending parent
/// to immediately before its earliest detail, preserving the relative
/// order of everything else. Runs to a fixed point; bounded because each
/// relocation strictly decreases the parent's index.
fn master_detail_correction(plan: &Plan, order: &mut Vec<usize>) {
    let max_rounds = order.len() * order.len() + 1;
    for _ in 0..max_rounds {
        let mut violation = None;
        'scan: for detail_pos in 0..order.len() {
            let detail = &plan.entries[order[detail_pos]];
            for parent_pos in detail_pos + 1..order.len() {
                let parent = &plan.entries[order[parent_pos]];
                if detail.has_master_detail_parent(&parent.name) {
                    violation = Some((detail_pos, parent_pos));
                    break 'scan;
                }
            }
        }
        match violation {
            Some((detail_pos, parent_pos)) => {
                let parent = order.remove(parent_pos);
                order.insert(detail_pos, parent);
            }
            None => break,
        }
    }
}
