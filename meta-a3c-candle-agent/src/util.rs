//! Utilities.
mod named_tensors;
use anyhow::Result;
use candle_core::{Device, Tensor};
pub use named_tensors::{copy_from, copy_to, gradients, layout};

/// Stacks rows of equal length into a tensor of shape `(rows.len(), dim)`.
pub fn stack_rows(rows: &[Vec<f32>], dim: usize, device: &Device) -> Result<Tensor> {
    let mut data = Vec::with_capacity(rows.len() * dim);
    for row in rows.iter() {
        if row.len() != dim {
            anyhow::bail!("Row of length {} where {} is expected", row.len(), dim);
        }
        data.extend_from_slice(row);
    }
    Ok(Tensor::from_vec(data, (rows.len(), dim), device)?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stack_rows() -> Result<()> {
        let t = stack_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]], 2, &Device::Cpu)?;
        assert_eq!(t.to_vec2::<f32>()?, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert!(stack_rows(&[vec![1.0]], 2, &Device::Cpu).is_err());
        Ok(())
    }
}
