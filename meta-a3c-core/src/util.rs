//! Utilities.

/// Returns the index of the largest element, the first one on ties.
///
/// Returns `0` for an empty slice.
pub fn argmax(x: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in x.iter().enumerate() {
        if *v > x[best] {
            best = i;
        }
    }
    best
}

/// Returns a one-hot vector of length `n` with `1` at `ix`.
pub fn one_hot(ix: usize, n: usize) -> Vec<f32> {
    let mut v = vec![0f32; n];
    if ix < n {
        v[ix] = 1.0;
    }
    v
}

/// Mean and population standard deviation.
pub fn mean_std(x: &[f32]) -> (f32, f32) {
    if x.is_empty() {
        return (0.0, 0.0);
    }
    let n = x.len() as f32;
    let mean = x.iter().sum::<f32>() / n;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.0, 1.0, 0.0]), 1);
        assert_eq!(argmax(&[2.0, 2.0]), 0);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn test_mean_std() {
        let (m, s) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(m, 5.0);
        assert_eq!(s, 2.0);
    }
}
