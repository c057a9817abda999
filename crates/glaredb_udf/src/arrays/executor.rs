use glaredb_error::Result;

use super::array_data::NativeType;
use super::bitmap::Bitmap;
use super::column::Column;

/// Executes a function over every logical value in a column.
#[derive(Debug, Clone, Copy)]
pub struct UnaryExecutor;

impl UnaryExecutor {
    /// Execute `op` on each valid value of `input`, reading physical values
    /// from `values`.
    ///
    /// Invalid (null) rows are never passed to `op`, the output for those rows
    /// is null. The output column is unselected and has the same logical length
    /// as the input.
    pub fn execute<T, O, F>(input: &Column, values: &[T], mut op: F) -> Result<Column>
    where
        T: Copy,
        O: NativeType,
        F: FnMut(T) -> O,
    {
        let len = input.len();
        let mut out = Vec::with_capacity(len);
        let mut validity = Bitmap::with_capacity(len);

        for idx in 0..len {
            // Logical indices in [0, len) always map to a physical index.
            let phys = input.physical_index(idx).unwrap_or(idx);
            let valid = input.validity().is_none_or(|v| v.value(phys));
            if valid {
                out.push(op(values[phys]));
            } else {
                out.push(O::default());
            }
            validity.push(valid);
        }

        let validity = if validity.is_all_true() {
            None
        } else {
            Some(validity)
        };

        Column::from_parts(input.name().to_string(), O::into_array_data(out), validity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::array_data::ArrayData;
    use crate::arrays::scalar::ScalarValue;

    #[test]
    fn nulls_skipped() {
        let input = Column::from_options("a", [Some(1_i64), None, Some(3)]);
        let values = match input.array_data() {
            ArrayData::Int64(v) => v.clone(),
            other => panic!("unexpected {other:?}"),
        };

        let mut calls = 0;
        let out = UnaryExecutor::execute(&input, &values, |v: i64| {
            calls += 1;
            v * 2
        })
        .unwrap();

        assert_eq!(2, calls);
        assert_eq!(
            Column::from_options("a", [Some(2_i64), None, Some(6)]),
            out
        );
    }

    #[test]
    fn follows_selection() {
        let input = Column::new("a", vec![1.0_f64, 2.0]);
        let input = input.select(&[1, 1, 0].into_iter().collect()).unwrap();
        let values = [1.0_f64, 2.0];

        let out = UnaryExecutor::execute(&input, &values, |v: f64| v + 0.5).unwrap();
        assert_eq!(ScalarValue::Float64(2.5), out.value(0).unwrap());
        assert_eq!(ScalarValue::Float64(1.5), out.value(2).unwrap());
    }
}
