//! Conversion between a [`VarMap`] and flat parameter vectors.
//!
//! Variables are ordered by name, so two maps built from the same
//! configuration give the same layout.
use anyhow::{anyhow, Result};
use candle_core::{backprop::GradStore, Tensor, Var};
use candle_nn::VarMap;
use meta_a3c_core::{
    error::MetaA3cError,
    params::{ParameterLayout, ParameterSet},
};

fn sorted_vars(varmap: &VarMap) -> Result<Vec<(String, Var)>> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("Poisoned lock of VarMap"))?;
    let mut vars = data
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect::<Vec<_>>();
    vars.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(vars)
}

/// Names and numbers of elements of the variables.
pub fn layout(varmap: &VarMap) -> Result<ParameterLayout> {
    Ok(ParameterLayout::new(
        sorted_vars(varmap)?
            .into_iter()
            .map(|(k, v)| (k, v.elem_count()))
            .collect(),
    ))
}

/// Copies the values of the variables into a flat parameter set.
pub fn copy_from(varmap: &VarMap) -> Result<ParameterSet> {
    let vars = sorted_vars(varmap)?;
    let mut entries = Vec::with_capacity(vars.len());
    let mut values = Vec::new();
    for (k, v) in vars.into_iter() {
        entries.push((k, v.elem_count()));
        values.extend(v.as_tensor().flatten_all()?.to_vec1::<f32>()?);
    }
    ParameterSet::new(ParameterLayout::new(entries), values)
}

/// Overwrites the variables with the values of the same names.
///
/// Every variable must exist in `params` with the same number of elements.
pub fn copy_to(params: &ParameterSet, varmap: &VarMap) -> Result<()> {
    for (k, v) in sorted_vars(varmap)?.into_iter() {
        let src = params.get(&k)?;
        if src.len() != v.elem_count() {
            return Err(MetaA3cError::ParameterLayoutMismatch {
                expected: v.elem_count(),
                actual: src.len(),
            }
            .into());
        }
        let t = Tensor::from_slice(src, v.dims().to_vec(), v.device())?;
        v.set(&t)?;
    }
    Ok(())
}

/// Flattens the gradients of the variables in the order of [`layout`].
///
/// Variables without gradient contribute zeros.
pub fn gradients(varmap: &VarMap, grads: &GradStore) -> Result<Vec<f32>> {
    let mut flat = Vec::new();
    for (_, v) in sorted_vars(varmap)?.into_iter() {
        match grads.get(v.as_tensor()) {
            Some(g) => flat.extend(g.flatten_all()?.to_vec1::<f32>()?),
            None => flat.extend(std::iter::repeat(0f32).take(v.elem_count())),
        }
    }
    Ok(flat)
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::{DType, Device, Module};
    use candle_nn::{linear, VarBuilder};

    fn build() -> Result<(VarMap, candle_nn::Linear)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let l = linear(3, 2, vb.pp("layer"))?;
        Ok((varmap, l))
    }

    #[test]
    fn test_copy_between_varmaps() -> Result<()> {
        let (vm1, l1) = build()?;
        let (vm2, l2) = build()?;
        let xs = Tensor::new(&[[1f32, 2., 3.]], &Device::Cpu)?;

        let p1 = copy_from(&vm1)?;
        assert_eq!(p1.layout, layout(&vm2)?);
        assert_eq!(
            p1.layout.entries(),
            &[("layer.bias".to_string(), 2), ("layer.weight".to_string(), 6)]
        );

        copy_to(&p1, &vm2)?;
        let y1 = l1.forward(&xs)?.to_vec2::<f32>()?;
        let y2 = l2.forward(&xs)?.to_vec2::<f32>()?;
        assert_eq!(y1, y2);
        assert_eq!(copy_from(&vm2)?, p1);
        Ok(())
    }

    #[test]
    fn test_unknown_parameter_is_an_error() -> Result<()> {
        let (vm, _) = build()?;
        let params = copy_from(&vm)?.filter_prefix("layer.weight");
        assert!(copy_to(&params, &vm).is_err());
        Ok(())
    }

    #[test]
    fn test_gradients_follow_layout() -> Result<()> {
        let (vm, l) = build()?;
        let xs = Tensor::new(&[[1f32, 2., 3.]], &Device::Cpu)?;
        let loss = l.forward(&xs)?.sum_all()?;
        let grads = loss.backward()?;
        let g = gradients(&vm, &grads)?;

        // bias gradients, then weight gradients equal to the inputs
        assert_eq!(g, vec![1., 1., 1., 2., 3., 1., 2., 3.]);
        Ok(())
    }
}
