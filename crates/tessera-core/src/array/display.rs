//! `Display` formatting for [`NdArray`].

use core::fmt;

use crate::dtype::Element;

use super::NdArray;

impl<T: Element + fmt::Display> fmt::Display for NdArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "array([], shape={:?})", self.shape());
        }

        let values = self.to_vec();
        match self.ndim() {
            0 => write!(f, "array({})", values[0]),
            1 => {
                write!(f, "array([")?;
                write_row(f, &values)?;
                write!(f, "])")
            }
            2 => {
                let cols = self.shape()[1];
                writeln!(f, "array([")?;
                let rows: Vec<&[T]> = values.chunks(cols).collect();
                for (r, row) in rows.iter().enumerate() {
                    write!(f, "  [")?;
                    write_row(f, row)?;
                    if r + 1 < rows.len() {
                        writeln!(f, "],")?;
                    } else {
                        writeln!(f, "]")?;
                    }
                }
                write!(f, "])")
            }
            _ => {
                // Rank 3 and above: shape plus the first and last elements.
                write!(
                    f,
                    "array(shape={:?}, data=[{}, ..., {}])",
                    self.shape(),
                    values[0],
                    values[values.len() - 1]
                )
            }
        }
    }
}

fn write_row<T: fmt::Display>(f: &mut fmt::Formatter<'_>, row: &[T]) -> fmt::Result {
    for (i, v) in row.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{v}")?;
    }
    Ok(())
}
