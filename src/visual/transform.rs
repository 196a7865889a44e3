//! Reshapes a raw frequency buffer into the sample order each algorithm draws.

use super::Algorithm;

/// First ⌊2·len/3⌋ bins, mirrored into a palindrome of twice that length.
pub fn arc_layout(input: &[u8]) -> Vec<u8> {
    let offset = input.len() * 2 / 3;
    let n = offset * 2;
    let mut out = vec![0u8; n];
    for i in 0..offset {
        out[i] = input[i];
        out[n - 1 - i] = input[i];
    }
    out
}

/// Every `stride`-th bin, not mirrored.
pub fn dotted_layout(input: &[u8], stride: usize) -> Vec<u8> {
    input.iter().step_by(stride.max(1)).copied().collect()
}

/// The buffer reversed followed by the buffer forward.
pub fn bar_layout(input: &[u8]) -> Vec<u8> {
    let len = input.len();
    (0..len * 2)
        .map(|i| if i < len { input[len - 1 - i] } else { input[i - len] })
        .collect()
}

pub fn column_stride(shaped_len: usize, columns: usize) -> usize {
    if columns == 0 {
        return 1;
    }
    ((shaped_len as f32 / columns as f32).round() as usize).max(1)
}

/// One magnitude per meter column; indexes past the end read as silence.
pub fn sample_columns(shaped: &[u8], columns: usize) -> Vec<u8> {
    let stride = column_stride(shaped.len(), columns);
    (0..columns)
        .map(|i| shaped.get(i * stride).copied().unwrap_or(0))
        .collect()
}

/// Layout for `algorithm`; the bar layout still needs [`sample_columns`].
pub fn reshape(input: &[u8], algorithm: Algorithm, dotted_stride: usize) -> Vec<u8> {
    match algorithm {
        Algorithm::Arc | Algorithm::ArcLine => arc_layout(input),
        Algorithm::ArcLineDotted => dotted_layout(input, dotted_stride),
        Algorithm::Bar => bar_layout(input),
    }
}
