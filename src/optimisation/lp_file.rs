//! Export of the assembled problem in CPLEX LP format.
use super::problem::{Problem, Row, Variable};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Maximum number of terms written on one line
const TERMS_PER_LINE: usize = 8;

/// Format a linear expression, wrapping long expressions over several lines
fn format_terms<F>(terms: &[(Variable, f64)], name_of: &F) -> String
where
    F: Fn(Variable) -> String,
{
    if terms.is_empty() {
        // A row must refer to at least one variable
        return format!("0 {}", name_of(Variable(0)));
    }

    let mut out = String::new();
    for (k, &(var, coeff)) in terms.iter().enumerate() {
        if k > 0 && k % TERMS_PER_LINE == 0 {
            out.push_str("\n   ");
        }
        let sign = if coeff < 0.0 { '-' } else { '+' };
        if k == 0 && sign == '+' {
            out.push_str(&format!("{} {}", coeff.abs(), name_of(var)));
        } else {
            out.push_str(&format!(" {sign} {} {}", coeff.abs(), name_of(var)));
        }
    }

    out
}

/// The relations written for a row: one for an equality or single bound, two for a range
fn relations(row: &Row) -> Vec<(&'static str, &'static str, f64)> {
    if row.lower == row.upper {
        vec![("", "=", row.upper)]
    } else {
        let mut relations = Vec::new();
        if row.lower.is_finite() {
            relations.push(("_lo", ">=", row.lower));
        }
        if row.upper.is_finite() {
            relations.push(("_hi", "<=", row.upper));
        }
        if relations.len() == 1 {
            relations[0].0 = "";
        }
        relations
    }
}

/// Write the problem to a writer in CPLEX LP format.
///
/// Rows are named after their constraint family and position within it.
pub fn write_lp<W, F>(writer: &mut W, problem: &Problem, name_of: F) -> Result<()>
where
    W: Write,
    F: Fn(Variable) -> String,
{
    writeln!(writer, "\\ Written by {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;
    writeln!(writer, "Minimize")?;
    let objective: Vec<_> = problem
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, column)| column.cost != 0.0)
        .map(|(idx, column)| (Variable(idx), column.cost))
        .collect();
    writeln!(writer, " obj: {}", format_terms(&objective, &name_of))?;

    writeln!(writer, "Subject To")?;
    for group in problem.groups() {
        for (k, row) in problem.rows()[group.rows.clone()].iter().enumerate() {
            let expression = format_terms(&row.terms, &name_of);
            for (suffix, relation, rhs) in relations(row) {
                writeln!(
                    writer,
                    " {}({k}){suffix}: {expression} {relation} {rhs}",
                    group.name
                )?;
            }
        }
    }

    // Variables are non-negative, which is the default bound in LP format
    writeln!(writer, "End")?;

    Ok(())
}

/// Write the problem to an LP file
pub fn write_lp_file<F>(file_path: &Path, problem: &Problem, name_of: F) -> Result<()>
where
    F: Fn(Variable) -> String,
{
    let file = File::create(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    let mut writer = BufWriter::new(file);
    write_lp(&mut writer, problem, name_of)?;
    writer.flush()?;

    Ok(())
}
