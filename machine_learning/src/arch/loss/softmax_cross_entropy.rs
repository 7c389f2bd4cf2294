use ndarray::{Array2, ArrayView2, Axis};

use super::LossFn;

/// Cross entropy between one-hot labels and the softmax of raw logits.
#[derive(Default, Clone, Copy, Debug)]
pub struct SoftmaxCrossEntropy;

impl SoftmaxCrossEntropy {
    /// Returns a new `SoftmaxCrossEntropy`.
    pub fn new() -> Self {
        Self
    }

    /// Row-wise softmax of `logits`, shifted by each row's max for stability.
    pub fn softmax(logits: ArrayView2<f32>) -> Array2<f32> {
        let mut p = logits.to_owned();

        for mut row in p.axis_iter_mut(Axis(0)) {
            let max = row.fold(f32::NEG_INFINITY, |m, &z| m.max(z));
            row.mapv_inplace(|z| (z - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|e| e / sum);
        }

        p
    }
}

impl LossFn for SoftmaxCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let n = y_pred.nrows();
        if n == 0 {
            return 0.;
        }

        let total: f32 = y_pred
            .axis_iter(Axis(0))
            .zip(y.axis_iter(Axis(0)))
            .map(|(z, y)| {
                let max = z.fold(f32::NEG_INFINITY, |m, &z| m.max(z));
                let log_sum = z.mapv(|z| (z - max).exp()).sum().ln() + max;
                z.iter()
                    .zip(y)
                    .map(|(&z, &y)| -y * (z - log_sum))
                    .sum::<f32>()
            })
            .sum();

        total / n as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.nrows().max(1) as f32;
        (Self::softmax(y_pred) - &y) / n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn uniform_logits_cost_ln_of_classes() {
        let logits: Array2<f32> = array![[0., 0., 0., 0.]];
        let y: Array2<f32> = array![[0., 1., 0., 0.]];

        let loss = SoftmaxCrossEntropy::new().loss(logits.view(), y.view());

        assert!((loss - 4f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn large_logits_do_not_overflow() {
        let logits: Array2<f32> = array![[1000., 0.]];
        let y: Array2<f32> = array![[1., 0.]];

        let loss = SoftmaxCrossEntropy::new().loss(logits.view(), y.view());

        assert!(loss.is_finite());
        assert!(loss < 1e-3);
    }

    #[test]
    fn gradient_rows_sum_to_zero() {
        let logits: Array2<f32> = array![[1., 2., 3.], [0., -1., 4.]];
        let y: Array2<f32> = array![[0., 0., 1.], [1., 0., 0.]];

        let d = SoftmaxCrossEntropy::new().loss_prime(logits.view(), y.view());

        for row in d.axis_iter(Axis(0)) {
            assert!(row.sum().abs() < 1e-6);
        }
    }
}
