//! Small numeric helpers shared by the model-based metrics.

#[must_use]
pub fn softmax(logits: &[f32]) -> Vec<f64> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f64> = logits.iter().map(|&l| f64::from(l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[must_use]
pub fn sigmoid(x: f32) -> f64 {
    1.0 / (1.0 + (-f64::from(x)).exp())
}

#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum()
}

/// Scale `v` to unit length in place. Zero vectors are left alone.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Mean of the token rows. Empty input gives an empty vector.
#[must_use]
pub fn mean_pool(rows: &[Vec<f32>]) -> Vec<f32> {
    let Some(dim) = rows.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut out = vec![0.0f32; dim];
    for row in rows {
        for (acc, x) in out.iter_mut().zip(row) {
            *acc += x;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let n = rows.len() as f32;
    for x in &mut out {
        *x /= n;
    }
    out
}
