//! Tabular primitives
//!
//! Pure transforms over sequences and 2-D grids of [`Value`]s. Incompatible
//! dimensions are reported as shape errors; nothing is silently truncated
//! unless the operation is a truncation.

use lexee_core::{FormulaError, FormulaResult, Value};

/// Row-major grid
pub type Grid = Vec<Vec<Value>>;

/// Longest sequence or row that padding may produce
pub const MAX_PADDED_LEN: usize = 10_000;

fn check_padded_len(len: usize) -> FormulaResult<()> {
    if len > MAX_PADDED_LEN {
        return Err(FormulaError::domain(format!(
            "size {} is too large (at most {})",
            len, MAX_PADDED_LEN
        )));
    }
    Ok(())
}

/// Flatten nested lists depth-first, keeping scalar order
pub fn flatten(items: &[Value]) -> Vec<Value> {
    let mut out = Vec::new();
    flatten_into(items, &mut out);
    out
}

fn flatten_into(items: &[Value], out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::List(inner) => flatten_into(inner, out),
            other => out.push(other.clone()),
        }
    }
}

/// Swap rows and columns; short rows are padded with null
pub fn transpose(rows: &[Vec<Value>]) -> Grid {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|j| {
            rows.iter()
                .map(|row| row.get(j).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect()
}

/// Concatenate arrays one after another
///
/// List entries contribute their elements; scalar entries are appended as-is.
pub fn stack_vertical(arrays: &[Value]) -> FormulaResult<Vec<Value>> {
    if arrays.is_empty() {
        return Err(FormulaError::shape("no arrays to stack"));
    }
    let mut out = Vec::new();
    for array in arrays {
        match array {
            Value::List(items) => out.extend(items.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Ok(out)
}

/// Place arrays side by side as columns, padding short columns with `pad`
pub fn stack_horizontal(columns: &[Vec<Value>], pad: &Value) -> FormulaResult<Grid> {
    if columns.is_empty() {
        return Err(FormulaError::shape("no arrays to stack"));
    }
    let height = columns.iter().map(Vec::len).max().unwrap_or(0);
    Ok((0..height)
        .map(|i| {
            columns
                .iter()
                .map(|col| col.get(i).cloned().unwrap_or_else(|| pad.clone()))
                .collect()
        })
        .collect())
}

/// Resolve a 1-based index; negative indices count from the end
pub fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => len + i,
        _ => return None,
    };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

/// Pick elements by 1-based (or negative) indices
pub fn select(items: &[Value], indices: &[i64]) -> FormulaResult<Vec<Value>> {
    indices
        .iter()
        .map(|&index| {
            resolve_index(items.len(), index)
                .map(|i| items[i].clone())
                .ok_or_else(|| {
                    FormulaError::domain(format!(
                        "index {} is out of range for {} rows",
                        index,
                        items.len()
                    ))
                })
        })
        .collect()
}

/// First `n` elements, or the last `|n|` when `n` is negative
pub fn take(items: &[Value], n: i64) -> Vec<Value> {
    let count = clamp_count(items.len(), n);
    if n >= 0 {
        items[..count].to_vec()
    } else {
        items[items.len() - count..].to_vec()
    }
}

/// Drop the first `n` elements, or the last `|n|` when `n` is negative
pub fn skip(items: &[Value], n: i64) -> Vec<Value> {
    let count = clamp_count(items.len(), n);
    if n >= 0 {
        items[count..].to_vec()
    } else {
        items[..items.len() - count].to_vec()
    }
}

fn clamp_count(len: usize, n: i64) -> usize {
    usize::try_from(n.unsigned_abs()).map_or(len, |c| c.min(len))
}

/// Pad with `pad` (or truncate) to exactly `len` elements
pub fn expand(items: &[Value], len: usize, pad: &Value) -> FormulaResult<Vec<Value>> {
    check_padded_len(len)?;
    let mut out: Vec<Value> = items.iter().take(len).cloned().collect();
    out.resize(len, pad.clone());
    Ok(out)
}

/// Reshape into rows of `width` elements, padding the last row
pub fn wrap_rows(items: &[Value], width: usize, pad: &Value) -> FormulaResult<Grid> {
    if width == 0 {
        return Err(FormulaError::domain("wrap size must be at least 1"));
    }
    check_padded_len(width)?;
    items
        .chunks(width)
        .map(|chunk| expand(chunk, width, pad))
        .collect()
}

/// Reshape into columns of `height` elements, returned row-major
pub fn wrap_cols(items: &[Value], height: usize, pad: &Value) -> FormulaResult<Grid> {
    let columns = wrap_rows(items, height, pad)?;
    Ok(transpose(&columns))
}
