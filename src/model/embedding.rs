//! Embedding vectors and the similarity math the engine runs on them.
//!
//! Every function here is total: malformed input (empty vectors, length
//! mismatch, zero norm, NaN) yields a neutral result instead of an error,
//! so a sparsely-embedded graph degrades traversal quality rather than
//! aborting it.

/// Dense embedding as produced by the store's embedding model.
pub type Embedding = Vec<f32>;

/// Cosine similarity in [-1, 1]. Returns 0.0 for anything malformed.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    let sim = dot / (na.sqrt() * nb.sqrt());
    if sim.is_finite() { sim.clamp(-1.0, 1.0) } else { 0.0 }
}

/// Highest cosine similarity between `candidate` and any member of `set`.
/// An empty set yields 0.0.
pub fn max_cosine_against_set<'a, I>(candidate: &[f32], set: I) -> f32
where
    I: IntoIterator<Item = &'a [f32]>,
{
    set.into_iter()
        .map(|other| cosine_similarity(candidate, other))
        .fold(0.0f32, f32::max)
}

/// Linear blend `(1 - t)·a + t·b`. Falls back to whichever side is usable
/// when the lengths disagree.
pub fn blend(a: &[f32], b: &[f32], t: f32) -> Embedding {
    let t = t.clamp(0.0, 1.0);
    if a.len() != b.len() || a.is_empty() {
        return if b.is_empty() { a.to_vec() } else { b.to_vec() };
    }
    a.iter().zip(b).map(|(x, y)| (1.0 - t) * x + t * y).collect()
}

/// Component-wise mean. Vectors whose length differs from the first are
/// skipped. `None` when nothing usable remains.
pub fn mean<'a, I>(vectors: I) -> Option<Embedding>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut acc: Option<Embedding> = None;
    let mut count = 0usize;
    for v in vectors {
        if v.is_empty() {
            continue;
        }
        if let Some(sum) = acc.as_mut() {
            if sum.len() != v.len() {
                continue;
            }
            for (s, x) in sum.iter_mut().zip(v) {
                *s += x;
            }
        } else {
            acc = Some(v.to_vec());
        }
        count += 1;
    }
    let mut sum = acc?;
    let n = count as f32;
    for s in sum.iter_mut() {
        *s /= n;
    }
    Some(sum)
}

/// Weighted blend of several components, renormalizing over the ones that
/// are present and share the dimension of the first. Result is L2-normalized.
pub fn weighted_blend(components: &[(Option<&[f32]>, f32)]) -> Option<Embedding> {
    let dim = components
        .iter()
        .find_map(|(v, w)| (*v).filter(|v| !v.is_empty() && *w > 0.0).map(|v| v.len()))?;

    let mut out = vec![0.0f32; dim];
    let mut total = 0.0f32;
    for (v, w) in components {
        let Some(v) = v else { continue };
        if v.len() != dim || *w <= 0.0 {
            continue;
        }
        for (o, x) in out.iter_mut().zip(v.iter()) {
            *o += w * x;
        }
        total += w;
    }
    if total <= 0.0 {
        return None;
    }
    for o in out.iter_mut() {
        *o /= total;
    }
    normalize(&mut out);
    Some(out)
}

/// In-place L2 normalization; zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON && norm.is_finite() {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
