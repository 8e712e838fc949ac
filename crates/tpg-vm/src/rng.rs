//! Random helpers shared by the mutation operators

use rand::Rng;

/// Biased coin: true with probability `probability`
#[inline]
pub fn flip<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.gen::<f64>() < probability
}

/// Uniform value in `0..range` different from `current`, if one exists
pub fn resample_different<R: Rng + ?Sized>(rng: &mut R, range: u32, current: u32) -> Option<u32> {
    match range {
        0 => None,
        1 if current == 0 => None,
        1 => Some(0),
        _ if current >= range => Some(rng.gen_range(0..range)),
        _ => {
            let value = rng.gen_range(0..range - 1);
            Some(if value >= current { value + 1 } else { value })
        }
    }
}

/// Per-axis shift in `-step..=step`, never all zero
pub fn nonzero_shift<R: Rng + ?Sized>(rng: &mut R, axes: usize, step: usize) -> Vec<isize> {
    let step = step.max(1) as isize;
    loop {
        let shift: Vec<isize> = (0..axes).map(|_| rng.gen_range(-step..=step)).collect();
        if axes == 0 || shift.iter().any(|&s| s != 0) {
            return shift;
        }
    }
}
