use super::FundingError;
use crate::chain::{CellOutput, LiveCell, Script, SearchOrder, UnsignedTx};

/// Fan change out into cells of at least `base`, at most `limit` of them.
///
/// Below `2 * base` the change stays in one cell. Otherwise `base`-sized
/// cells are emitted and the remainder (never smaller than `base`) goes
/// into one larger cell, placed first for descending selection.
pub fn split_change(change: u64, base: u64, limit: usize, order: SearchOrder) -> Vec<u64> {
    if change == 0 {
        return Vec::new();
    }
    if base == 0 || limit <= 1 || change < base.saturating_mul(2) {
        return vec![change];
    }

    let count = ((change / base - 1) as usize).min(limit - 1);
    let remainder = change - base * count as u64;

    let mut parts = Vec::with_capacity(count + 1);
    match order {
        SearchOrder::Desc => {
            parts.push(remainder);
            parts.extend(std::iter::repeat_n(base, count));
        }
        SearchOrder::Asc => {
            parts.extend(std::iter::repeat_n(base, count));
            parts.push(remainder);
        }
    }
    parts
}

/// Build the unsigned body: one input per selected cell in selection order,
/// the business outputs, then change outputs, then the action witness.
pub fn assemble(
    inputs: &[LiveCell],
    outputs: Vec<(CellOutput, String)>,
    change_lock: &Script,
    change_type: Option<&Script>,
    change: &[u64],
    action_witness: String,
) -> Result<UnsignedTx, FundingError> {
    if inputs.is_empty() {
        return Err(FundingError::Build("no inputs selected".into()));
    }

    let mut tx = UnsignedTx {
        inputs: inputs.iter().map(|c| c.out_point.clone()).collect(),
        ..Default::default()
    };

    for (output, data) in outputs {
        tx.outputs.push(output);
        tx.outputs_data.push(data);
    }
    for capacity in change {
        tx.outputs.push(CellOutput {
            capacity: *capacity,
            lock: change_lock.clone(),
            type_script: change_type.cloned(),
        });
        tx.outputs_data.push("0x".into());
    }

    let input_total: u64 = inputs.iter().map(|c| c.capacity).sum();
    let output_total = tx.output_capacity();
    if output_total > input_total {
        return Err(FundingError::Build(format!(
            "outputs {output_total} exceed inputs {input_total}"
        )));
    }

    tx.witnesses.push(action_witness);
    Ok(tx)
}
