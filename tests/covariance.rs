use logit_intensity::curve::level_grid;
use logit_intensity::{
    CoefficientVector, CovarianceEstimator, EngineBuilder, FittingMethod, IntensityCurve,
    InterceptConvention, Label, Penalty,
};
use approx::AbsDiffEq;
use more_asserts::{assert_gt, assert_lt};
use ndarray::{array, concatenate, Array2, Axis};
use rand::SeedableRng;
use rand_pcg::Pcg64;

mod common;

#[test]
fn test_fitted_model_intensities() {
    common::init_logging();
    let mut rng = Pcg64::seed_from_u64(69);
    let true_beta = array![0.5, 1.5, -1., 0.5];
    let (design, labels) = common::synthetic_training_set(400, &true_beta, &mut rng);
    let beta_hat = common::fit_logistic(&design, &labels, None);

    let coefs = CoefficientVector::with_separate_intercept(
        beta_hat[0],
        beta_hat.slice(ndarray::s![1..]).to_owned(),
    );
    let engine = EngineBuilder::new(coefs)
        .estimate_covariance(Some(design.view()), &FittingMethod::Unregularized)
        .unwrap()
        .build()
        .unwrap();

    let cov = engine.covariance().view();
    for i in 0..4 {
        assert_gt!(cov[[i, i]], 0.);
        // roughly 1 / n scale for a well specified model
        assert_lt!(cov[[i, i]], 0.1);
    }

    let alphas = level_grid(0.55, 0.99, 12);
    let coefs = engine.coefficients();
    let mut checked = 0;
    for (row, &label) in design.rows().into_iter().zip(labels.iter()) {
        let y = if label > 0.5 { Label::One } else { Label::Zero };
        let x_full = coefs.align(row).unwrap();
        let score = coefs.score(x_full.view()).unwrap();
        // correctly predicted and away from the boundary
        if coefs.predicted_label(x_full.view()).unwrap() != y || score.abs() < 0.1 {
            continue;
        }
        let results = engine.perturb_batch(row, y, &alphas).unwrap();
        assert!(results.iter().all(|r| r.lambda_star.unwrap() > 1.));
        let curve = IntensityCurve::from_results(None, &results);
        assert!(curve.is_monotone_above_half(1e-9));
        checked += 1;
        if checked == 20 {
            break;
        }
    }
    assert_eq!(checked, 20);
}

#[test]
fn test_ridge_covariance_shrinks() {
    let mut rng = Pcg64::seed_from_u64(7);
    let true_beta = array![-0.2, 1., 1., -2.];
    let (design, labels) = common::synthetic_training_set(300, &true_beta, &mut rng);
    let c = 0.05;
    let beta_hat = common::fit_logistic(&design, &labels, Some(c));
    let coefs = CoefficientVector::with_separate_intercept(
        beta_hat[0],
        beta_hat.slice(ndarray::s![1..]).to_owned(),
    );
    let estimator = CovarianceEstimator::new(&coefs);
    let ridge = estimator
        .estimate(
            Some(design.view()),
            &FittingMethod::from_penalty(Penalty::L2, c),
        )
        .unwrap();
    let plain = estimator
        .estimate(Some(design.view()), &FittingMethod::Unregularized)
        .unwrap();
    for i in 0..4 {
        assert_lt!(ridge.view()[[i, i]], plain.view()[[i, i]]);
    }
}

#[test]
fn test_embedded_constant_matches_separate_intercept() {
    let mut rng = Pcg64::seed_from_u64(11);
    let true_beta = array![0.3, -1., 0.7];
    let (design, labels) = common::synthetic_training_set(250, &true_beta, &mut rng);
    let beta_hat = common::fit_logistic(&design, &labels, None);

    let separate = CoefficientVector::with_separate_intercept(
        beta_hat[0],
        beta_hat.slice(ndarray::s![1..]).to_owned(),
    );
    let embedded =
        CoefficientVector::new(beta_hat.clone(), InterceptConvention::Embedded { index: 0 })
            .unwrap();
    let design_with_constant =
        concatenate![Axis(1), Array2::<f64>::ones((design.nrows(), 1)), design.view()];

    let engine_separate = EngineBuilder::new(separate)
        .estimate_covariance(Some(design.view()), &FittingMethod::Unregularized)
        .unwrap()
        .build()
        .unwrap();
    let engine_embedded = EngineBuilder::new(embedded)
        .estimate_covariance(
            Some(design_with_constant.view()),
            &FittingMethod::Unregularized,
        )
        .unwrap()
        .build()
        .unwrap();
    assert!(engine_separate
        .covariance()
        .view()
        .abs_diff_eq(&engine_embedded.covariance().view(), 1e-10));

    let x = array![-0.8, 0.4];
    let x_const = array![1., -0.8, 0.4];
    let a = engine_separate
        .perturb_single(x.view(), Label::One, 0.9)
        .unwrap();
    let b = engine_embedded
        .perturb_single(x_const.view(), Label::One, 0.9)
        .unwrap();
    let (la, lb) = (a.lambda_star.unwrap(), b.lambda_star.unwrap());
    assert_lt!((la - lb).abs(), 1e-8);
    let xa = a.x_adv_star.unwrap();
    let xb = b.x_adv_star.unwrap();
    assert_eq!(xb[0], 1.);
    assert_lt!((xa[0] - xb[1]).abs(), 1e-8);
    assert_lt!((xa[1] - xb[2]).abs(), 1e-8);
}
