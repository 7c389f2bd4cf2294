use ndarray::{ArrayView1, ArrayView2, Axis};

fn argmax(row: ArrayView1<f32>) -> Option<usize> {
    row.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// The fraction of rows whose highest scoring class matches the one-hot label's class.
///
/// # Arguments
/// * `y_pred` - The model's scores, one sample per row.
/// * `y` - The one-hot labels.
///
/// # Returns
/// The accuracy in `[0, 1]`, or `0` for an empty batch.
pub fn accuracy(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
    let n = y_pred.nrows();
    if n == 0 {
        return 0.;
    }

    let hits = y_pred
        .axis_iter(Axis(0))
        .zip(y.axis_iter(Axis(0)))
        .filter(|(p, y)| argmax(p.view()) == argmax(y.view()))
        .count();

    hits as f32 / n as f32
}
