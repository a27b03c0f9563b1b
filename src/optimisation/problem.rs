//! A solver-independent record of a linear program.
//!
//! The problem is assembled here first so that it can be both handed to HiGHS and exported in LP
//! format.
use highs::{Col, RowProblem};
use std::ops::Range;

/// A decision variable in the optimisation.
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(pub usize);

/// A column of the problem: a non-negative variable with an objective coefficient
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Objective coefficient
    pub cost: f64,
}

/// A row of the problem: `lower <= Σ coefficient·variable <= upper`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Lower bound (may be negative infinity)
    pub lower: f64,
    /// Upper bound (may be infinity)
    pub upper: f64,
    /// Non-zero coefficients
    pub terms: Vec<(Variable, f64)>,
}

/// A named, contiguous block of rows belonging to one constraint family
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    /// Name of the constraint family
    pub name: &'static str,
    /// The rows of the family
    pub rows: Range<usize>,
}

/// A minimisation problem over non-negative variables
#[derive(Debug, Default)]
pub struct Problem {
    columns: Vec<Column>,
    rows: Vec<Row>,
    groups: Vec<RowGroup>,
}

impl Problem {
    /// Add a non-negative variable with the given objective coefficient
    pub fn add_column(&mut self, cost: f64) -> Variable {
        self.columns.push(Column { cost });
        Variable(self.columns.len() - 1)
    }

    /// Add a row with the given bounds.
    ///
    /// Terms with a zero coefficient are dropped.
    pub fn add_row<I>(&mut self, lower: f64, upper: f64, terms: I)
    where
        I: IntoIterator<Item = (Variable, f64)>,
    {
        debug_assert!(lower <= upper, "Row bounds {lower} > {upper}");
        let terms = terms.into_iter().filter(|(_, coeff)| *coeff != 0.0).collect();
        self.rows.push(Row {
            lower,
            upper,
            terms,
        });
    }

    /// Add a row of the form `Σ terms <= upper`
    pub fn add_le<I>(&mut self, upper: f64, terms: I)
    where
        I: IntoIterator<Item = (Variable, f64)>,
    {
        self.add_row(f64::NEG_INFINITY, upper, terms);
    }

    /// Add a row of the form `Σ terms = rhs`
    pub fn add_eq<I>(&mut self, rhs: f64, terms: I)
    where
        I: IntoIterator<Item = (Variable, f64)>,
    {
        self.add_row(rhs, rhs, terms);
    }

    /// Add the rows of one constraint family, recording them as a named group.
    ///
    /// # Returns
    ///
    /// The index of the first row of the group
    pub fn add_group<F>(&mut self, name: &'static str, add_rows: F) -> usize
    where
        F: FnOnce(&mut Self),
    {
        let start = self.rows.len();
        add_rows(self);
        self.groups.push(RowGroup {
            name,
            rows: start..self.rows.len(),
        });

        start
    }

    /// The columns of the problem
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The rows of the problem
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The constraint families of the problem, in row order
    pub fn groups(&self) -> &[RowGroup] {
        &self.groups
    }

    /// The number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Convert to a HiGHS problem, keeping the order of columns and rows
    pub fn to_highs(&self) -> RowProblem {
        let mut problem = RowProblem::default();
        let cols: Vec<Col> = self
            .columns
            .iter()
            .map(|column| problem.add_column(column.cost, 0.0..))
            .collect();
        for row in &self.rows {
            let factors = row.terms.iter().map(|&(var, coeff)| (cols[var.0], coeff));
            problem.add_row(row.lower..=row.upper, factors);
        }

        problem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups() {
        let mut problem = Problem::default();
        let x = problem.add_column(1.0);
        let y = problem.add_column(2.0);
        let first = problem.add_group("balance", |problem| {
            problem.add_eq(1.0, [(x, 1.0), (y, 1.0)]);
            problem.add_eq(2.0, [(x, 1.0), (y, 0.0)]);
        });
        let second = problem.add_group("cap", |problem| problem.add_le(5.0, [(y, 1.0)]));

        assert_eq!(first, 0);
        assert_eq!(second, 2);
        assert_eq!(problem.num_rows(), 3);
        assert_eq!(problem.rows()[1].terms, [(x, 1.0)]);
        assert_eq!(problem.groups()[1].rows, 2..3);
        assert!(problem.rows()[2].lower.is_infinite());
    }
}
