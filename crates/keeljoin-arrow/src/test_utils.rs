use arrow::array::*;
use arrow::datatypes::*;

/// A single cell of a materialized payload array, widened for comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum TestValue {
    Null,
    Int64(i64),
    Float64(f64),
    String(String),
}

pub const NULL: TestValue = TestValue::Null;

pub trait IntoTestValue {
    fn into_test_value(self) -> TestValue;
}

impl IntoTestValue for TestValue {
    fn into_test_value(self) -> TestValue {
        self
    }
}

impl IntoTestValue for i64 {
    fn into_test_value(self) -> TestValue {
        TestValue::Int64(self)
    }
}

impl IntoTestValue for i32 {
    fn into_test_value(self) -> TestValue {
        TestValue::Int64(self as i64)
    }
}

impl IntoTestValue for f64 {
    fn into_test_value(self) -> TestValue {
        TestValue::Float64(self)
    }
}

impl IntoTestValue for &str {
    fn into_test_value(self) -> TestValue {
        TestValue::String(self.to_string())
    }
}

pub fn convert_to_test_value<T: IntoTestValue>(val: T) -> TestValue {
    val.into_test_value()
}

pub fn extract_value(array: &ArrayRef, row: usize) -> TestValue {
    if array.is_null(row) {
        return TestValue::Null;
    }

    match array.data_type() {
        DataType::Int32 => TestValue::Int64(array.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => TestValue::Int64(array.as_primitive::<Int64Type>().value(row)),
        DataType::Float64 => TestValue::Float64(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => TestValue::String(array.as_string::<i32>().value(row).to_string()),
        other => TestValue::String(format!("<unsupported: {:?}>", other)),
    }
}

pub fn array_to_values(array: &ArrayRef) -> Vec<TestValue> {
    (0..array.len()).map(|row| extract_value(array, row)).collect()
}

pub fn compare_values(actual: &[TestValue], expected: &[TestValue]) -> bool {
    actual.len() == expected.len()
        && actual.iter().zip(expected).all(|pair| match pair {
            (TestValue::Float64(a), TestValue::Float64(e)) => {
                (a.is_nan() && e.is_nan()) || (a - e).abs() < 1e-10
            }
            (a, e) => a == e,
        })
}

#[macro_export]
macro_rules! assert_array_values_eq {
    ($array:expr, [$($val:expr),* $(,)?]) => {{
        let actual = $crate::array_to_values(&$array);
        let expected: Vec<$crate::TestValue> = vec![$($crate::convert_to_test_value($val)),*];

        if !$crate::compare_values(&actual, &expected) {
            panic!(
                "Array mismatch!\n\nActual ({} values):\n{:#?}\n\nExpected ({} values):\n{:#?}",
                actual.len(),
                actual,
                expected.len(),
                expected
            );
        }
    }};
}
