#![cfg(test)]
use crate::bounds::Bounds1;
use crate::coefficients::{CoefficientVector, InterceptConvention};
use crate::covariance::CovarianceMatrix;
use crate::LogitFloat;
use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use proptest::arbitrary::functor::ArbitraryF1;
use proptest::prelude::*;
use proptest::sample::SizeRange;
use std::mem;

prop_compose! {
    pub fn array1(len: usize)(v in Vec::lift1_with(-10. .. 10., SizeRange::new(len..=len))) -> Array1<LogitFloat> {
        Array1::from_vec(v)
    }
}

prop_compose! {
    pub fn array2(rows: usize, cols: usize)(v in Vec::lift1_with(array1(cols), SizeRange::new(rows..=rows))) -> Array2<LogitFloat> {
        assert!(rows > 0);
        ndarray::stack(Axis(0), &v.iter().map(|x| x.view()).collect::<Vec<ArrayView1<LogitFloat>>>()).unwrap()
    }
}

prop_compose! {
    pub fn bounds1(len: usize)(mut lower in array1(len), mut upper in array1(len)) -> Bounds1 {
        Zip::from(&mut lower).and(&mut upper).for_each(|l, u| if *l > *u {mem::swap(l, u)});
        Bounds1::new(lower.view(), upper.view()).unwrap()
    }
}

fn intercept_convention() -> impl Strategy<Value = InterceptConvention> {
    prop_oneof![
        Just(InterceptConvention::NoIntercept),
        Just(InterceptConvention::Separate { index: 0 }),
        Just(InterceptConvention::Embedded { index: 0 }),
    ]
}

prop_compose! {
    /// Coefficients with a non-degenerate feature part and a matching example
    /// in the caller's coordinates
    pub fn coefficients_and_example(n_features: usize)(
        convention in intercept_convention(),
        intercept in -2. .. 2.,
        features in array1(n_features).prop_filter("degenerate", |b| b.dot(b) > 1e-2),
        x in array1(n_features),
    ) -> (CoefficientVector, Array1<LogitFloat>) {
        match convention {
            InterceptConvention::NoIntercept => (CoefficientVector::without_intercept_term(features), x),
            InterceptConvention::Separate { .. } => (CoefficientVector::with_separate_intercept(intercept, features), x),
            InterceptConvention::Embedded { .. } => {
                let full = convention.with_intercept_value(features.view(), intercept);
                let x = convention.with_intercept_value(x.view(), 1.);
                (CoefficientVector::new(full, convention).unwrap(), x)
            }
        }
    }
}

prop_compose! {
    /// Well conditioned covariance `scale * (L L^T / dim + I)`
    pub fn covariance(dim: usize)(l in array2(dim, dim), scale in 1e-4 .. 1e-1) -> CovarianceMatrix {
        let spd = l.dot(&l.t()) / dim as LogitFloat + Array2::<LogitFloat>::eye(dim);
        CovarianceMatrix::new(spd * scale).unwrap()
    }
}
