use crate::FaceSortError;

/// Square, symmetric pairwise distance matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f32>,
}

impl DistanceMatrix {
    /// Number of rows (and columns).
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Distance between rows `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.n + j]
    }

    /// Row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.n..(i + 1) * self.n]
    }
}

/// Builds the cosine distance matrix (1 - cosine similarity) of `vectors`.
///
/// All vectors must share one dimension and contain only finite values.
pub fn cosine_distances(vectors: &[Vec<f32>]) -> Result<DistanceMatrix, FaceSortError> {
    let n = vectors.len();
    let Some(first) = vectors.first() else {
        return Ok(DistanceMatrix { n: 0, data: Vec::new() });
    };
    let dim = first.len();
    if dim == 0 {
        return Err(FaceSortError::DistanceMatrix("empty embedding".into()));
    }
    for (i, v) in vectors.iter().enumerate() {
        if v.len() != dim {
            return Err(FaceSortError::DimensionMismatch {
                expected: dim,
                got: v.len(),
            });
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(FaceSortError::DistanceMatrix(format!(
                "embedding {} has non-finite values",
                i
            )));
        }
    }

    let mut data = vec![0.0f32; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            // Clamp rounding noise so distances stay in [0, 2].
            let d = (1.0 - cosine_sim(&vectors[i], &vectors[j])).clamp(0.0, 2.0);
            data[i * n + j] = d;
            data[j * n + i] = d;
        }
    }
    Ok(DistanceMatrix { n, data })
}

/// Cosine similarity between two vectors.
/// Uses f64 intermediate precision.
pub(crate) fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    let mut dot: f64 = 0.0;
    let mut na: f64 = 0.0;
    let mut nb: f64 = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    let denom = na.sqrt() * nb.sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (dot / denom) as f32
}

/// Normalizes a vector to unit length in-place.
/// Returns false, leaving `v` untouched, if its norm is zero or not finite.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    let sum: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum();
    let norm = sum.sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    let scale = 1.0 / norm;
    for x in v.iter_mut() {
        *x = (*x as f64 * scale) as f32;
    }
    true
}
