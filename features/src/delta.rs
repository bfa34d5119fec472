/// Regression deltas over time with half-width `width`, replicating edge
/// frames:
///
/// `d[t] = Σ_{n=1..width} n · (c[t+n] − c[t−n]) / (2 · Σ n²)`
pub fn deltas(frames: &[Vec<f32>], width: usize) -> Vec<Vec<f32>> {
    let t_len = frames.len();
    if t_len == 0 || width == 0 {
        return frames.iter().map(|f| vec![0.0; f.len()]).collect();
    }
    let dim = frames[0].len();
    let denom: f64 = 2.0 * (1..=width).map(|n| (n * n) as f64).sum::<f64>();
    let last = t_len - 1;

    (0..t_len)
        .map(|t| {
            let mut out = vec![0.0f64; dim];
            for n in 1..=width {
                let ahead = &frames[(t + n).min(last)];
                let behind = &frames[t.saturating_sub(n)];
                for (o, (a, b)) in out.iter_mut().zip(ahead.iter().zip(behind)) {
                    *o += n as f64 * (*a as f64 - *b as f64);
                }
            }
            out.into_iter().map(|v| (v / denom) as f32).collect()
        })
        .collect()
}
