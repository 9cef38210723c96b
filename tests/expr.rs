use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};
use thresh::{
    ThreshError,
    expr::{Bindings, Value, evaluate},
};

fn eval(expression: &str, bindings: &Bindings<'_>) -> Result<Value, ThreshError> {
    let mut rng = StdRng::seed_from_u64(11);
    evaluate(expression, bindings, &mut rng)
}

#[test]
fn columns_broadcast_against_scalars() {
    let time = [0.0, 1.0, 2.0];
    let mut bindings = Bindings::new();
    bindings.bind("time", &time);
    assert_eq!(
        eval("1000*time + 1", &bindings),
        Ok(Value::Array(vec![1.0, 1001.0, 2001.0]))
    );
}

#[test]
fn unequal_arrays_do_not_combine() {
    let a = [1.0, 2.0, 3.0];
    let b = [1.0, 2.0];
    let mut bindings = Bindings::new();
    bindings.bind("a", &a);
    bindings.bind("b", &b);
    let err = eval("a + b", &bindings).unwrap_err();
    assert!(matches!(err, ThreshError::EvaluationError { .. }));
}

#[test]
fn domain_errors_name_the_expression() {
    let bindings = Bindings::new();
    for expression in ["1/0", "sqrt(-1)", "log(0)", "asin(2)", "5 % 0"] {
        match eval(expression, &bindings) {
            Err(ThreshError::EvaluationError { expression: reported, .. }) => {
                assert_eq!(reported, expression);
            }
            other => panic!("{expression} should fail, got {other:?}"),
        }
    }
}

#[test]
fn unknown_names_are_distinguished_from_functions() {
    let bindings = Bindings::new();
    assert!(matches!(
        eval("velocity + 1", &bindings),
        Err(ThreshError::UnknownIdentifier { ref name, .. }) if name == "velocity"
    ));
    assert!(matches!(
        eval("system(1)", &bindings),
        Err(ThreshError::UnknownIdentifier { ref name, .. }) if name == "system"
    ));
    assert!(matches!(
        eval("sqrt + 1", &bindings),
        Err(ThreshError::EvaluationError { .. })
    ));
}

#[test]
fn reductions_and_generators_compose() {
    let bindings = Bindings::new();
    assert_eq!(eval("sum(arange(1, 6, 1)**2)", &bindings), Ok(Value::Scalar(55.0)));
    assert_eq!(eval("len(linspace(0, 1, 11))", &bindings), Ok(Value::Scalar(11.0)));
    assert_eq!(eval("mean(ones(4) * 3)", &bindings), Ok(Value::Scalar(3.0)));
}

proptest! {
    #[test]
    fn addition_matches_native_arithmetic(a in -1.0e6f64..1.0e6, b in -1.0e6f64..1.0e6) {
        let lhs = [a];
        let rhs = [b];
        let mut bindings = Bindings::new();
        bindings.bind("a", &lhs);
        bindings.bind("b", &rhs);
        prop_assert_eq!(eval("a + b", &bindings), Ok(Value::Array(vec![a + b])));
        prop_assert_eq!(eval("a * b - b", &bindings), Ok(Value::Array(vec![a * b - b])));
    }

    #[test]
    fn comparison_results_are_flags(values in proptest::collection::vec(-100.0f64..100.0, 1..20)) {
        let mut bindings = Bindings::new();
        bindings.bind("x", &values);
        let Ok(Value::Array(flags)) = eval("x >= 0", &bindings) else {
            panic!("comparison should produce an array");
        };
        prop_assert_eq!(flags.len(), values.len());
        for (flag, value) in flags.iter().zip(&values) {
            prop_assert_eq!(*flag, if *value >= 0.0 { 1.0 } else { 0.0 });
        }
    }

    #[test]
    fn arange_length_matches_span(start in -50i32..50, len in 0usize..200) {
        let expression = format!("len(arange({start}, {}, 1))", start + len as i32);
        prop_assert_eq!(eval(&expression, &Bindings::new()), Ok(Value::Scalar(len as f64)));
    }
}
