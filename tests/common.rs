#![allow(dead_code, non_snake_case)]
use logit_intensity::covariance::sigmoid;
use ndarray::{concatenate, Array, Array1, Array2, Axis};
use ndarray_linalg::Solve;
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::Rng;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Gaussian features and labels drawn from a logistic model with intercept
/// `true_beta[0]` and weights `true_beta[1..]`.
pub fn synthetic_training_set<R: Rng>(
    n: usize,
    true_beta: &Array1<f64>,
    rng: &mut R,
) -> (Array2<f64>, Array1<f64>) {
    let n_features = true_beta.len() - 1;
    let design = Array::random_using((n, n_features), Normal::new(0., 1.).unwrap(), rng);
    let labels = design
        .rows()
        .into_iter()
        .map(|row| {
            let p = sigmoid(true_beta[0] + row.dot(&true_beta.slice(ndarray::s![1..])));
            if rng.gen::<f64>() < p {
                1.
            } else {
                0.
            }
        })
        .collect();
    (design, labels)
}

/// Logistic regression with an intercept (returned first), fitted by Newton
/// iterations with an optional ridge penalty `1 / C` on every coefficient.
pub fn fit_logistic(
    design: &Array2<f64>,
    labels: &Array1<f64>,
    inverse_strength: Option<f64>,
) -> Array1<f64> {
    let X = concatenate![Axis(1), Array2::<f64>::ones((design.nrows(), 1)), design.view()];
    let dim = X.ncols();
    let penalty = inverse_strength.map_or(0., |c| 2. / c);
    let mut beta = Array1::<f64>::zeros(dim);
    for _ in 0..50 {
        let p = X.dot(&beta).mapv(sigmoid);
        let w = p.mapv(|p| p * (1. - p));
        let grad = X.t().dot(&(labels - &p)) - &beta * penalty;
        let ridge = Array2::<f64>::eye(dim) * penalty;
        let hessian = X.t().dot(&(&X * &w.insert_axis(Axis(1)))) + ridge;
        let step = hessian.solve_into(grad).unwrap();
        beta += &step;
        if step.dot(&step).sqrt() < 1e-12 {
            break;
        }
    }
    beta
}
