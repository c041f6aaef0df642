//! Vector similarity and distance calculations (spec §4.10-§4.11 use raw
//! cosine similarity, not a [0,1]-remapped variant, so distances compose
//! correctly with the μ+1σ admission threshold).

/// Cosine similarity in `[-1, 1]`. Returns `0.0` for mismatched or empty
/// dimensions, or if either vector has zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Cosine distance `1 - cos(a, b)`, used throughout clustering and value
/// admission (spec §4.10, §4.11).
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Unit-normalize `vector` in place's copy. Used when computing cluster
/// centroids (spec §4.10 step 4: "unit-normalized mean of members").
#[must_use]
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in &mut vector {
            *x /= magnitude;
        }
    }
    vector
}

/// Population mean and standard deviation of `values` (spec §4.11 step 4
/// explicitly specifies population, not sample, stddev).
#[must_use]
pub fn population_mean_stddev(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    (mean, variance.sqrt())
}
