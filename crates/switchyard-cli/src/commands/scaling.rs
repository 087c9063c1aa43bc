use anyhow::Result;
use switchyard_autoscale::{ScalingInputs, compute_desired_scaling};

pub fn scaling(inputs: ScalingInputs) -> Result<()> {
    let desired = compute_desired_scaling(&inputs);
    let (min_capacity, max_capacity) = inputs.capacity_bounds();
    println!("desired: {desired}");
    println!("registered capacity: {min_capacity}..={max_capacity}");
    Ok(())
}
