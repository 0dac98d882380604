//! Formatted terminal output for identified models and search diagnostics.
//!
//! Formatting lives in one place so the fitting code stays free of
//! presentation details.

use crate::domain::FitQuality;
use crate::fit::SearchSummary;
use crate::models::{FittedModel, RationalModel};

/// Signed sum `c1 t1 + c2 t2 - ...`; the constant term prints as its coefficient.
fn format_sum<'a, I>(terms: I) -> String
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut out = String::new();
    for (i, (name, c)) in terms.into_iter().enumerate() {
        let sign = if c < 0.0 { "-" } else { "+" };
        let body = if name == "1" {
            format!("{:.6}", c.abs())
        } else {
            format!("{:.6}*{name}", c.abs())
        };
        if i == 0 {
            if c < 0.0 {
                out.push('-');
            }
            out.push_str(&body);
        } else {
            out.push_str(&format!(" {sign} {body}"));
        }
    }
    if out.is_empty() {
        out.push('0');
    }
    out
}

/// Equation of a polynomial / operator model, e.g. `y[k] = 0.600000*y[k-1] + 0.800000*x[k-1]`.
pub fn format_model(model: &FittedModel) -> String {
    let body = format_sum(
        model
            .terms
            .iter()
            .map(|t| t.name())
            .zip(model.coefficients.iter().copied()),
    );
    format!("{}[k] = {body}", model.output_name)
}

/// Equation of a rational model, `y[k] = (N) / (1 + D)`.
pub fn format_rational_model(model: &RationalModel) -> String {
    let num = format_sum(
        model
            .numerator
            .iter()
            .map(|t| t.name())
            .zip(model.numerator_coefficients.iter().copied()),
    );
    let den = format_sum(
        std::iter::once(("1", 1.0)).chain(
            model
                .denominator
                .iter()
                .map(|t| t.name())
                .zip(model.denominator_coefficients.iter().copied()),
        ),
    );
    format!("{}[k] = ({num}) / ({den})", model.output_name)
}

/// Term table: name, coefficient and ERR in selection order.
pub fn format_term_table(model: &FittedModel) -> String {
    let width = model.terms.iter().map(|t| t.name().len()).max().unwrap_or(4).max(4);
    let mut out = String::new();
    out.push_str(&format!("{:<width$}  {:>14}  {:>10}\n", "term", "coefficient", "ERR"));
    for ((t, c), e) in model.terms.iter().zip(&model.coefficients).zip(&model.err) {
        out.push_str(&format!("{:<width$}  {:>14.6e}  {:>10.6}\n", t.name(), c, e));
    }
    out
}

pub fn format_quality(q: &FitQuality) -> String {
    format!(
        "n={} k={} SSE={:.6e} RMSE={:.6e} R2={:.6} BIC={:.3} AIC={:.3}",
        q.n, q.k, q.sse, q.rmse, q.r_squared, q.bic, q.aic
    )
}

/// Arborescence diagnostics plus the quality of the chosen model.
pub fn format_search_summary(summary: &SearchSummary, quality: &FitQuality) -> String {
    let mut out = String::new();
    out.push_str("Search:\n");
    out.push_str(&format!(
        "- nodes={} pruned={} depth={} distinct solutions={}\n",
        summary.nodes, summary.pruned, summary.depth_reached, summary.solutions
    ));
    out.push_str(&format!(
        "- selected node #{} (root regression had {} terms)\n",
        summary.selected_node, summary.root_terms
    ));
    out.push_str(&format!("- {}\n", format_quality(quality)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_sum_formatting() {
        let s = format_sum(vec![("1", -0.5), ("x[k-1]", 2.0), ("y[k-1]", -0.25)]);
        assert_eq!(s, "-0.500000 + 2.000000*x[k-1] - 0.250000*y[k-1]");
        assert_eq!(format_sum(Vec::<(&str, f64)>::new()), "0");
    }

    #[test]
    fn summary_mentions_node_counts() {
        let summary = SearchSummary {
            nodes: 7,
            pruned: 2,
            depth_reached: 1,
            solutions: 3,
            selected_node: 4,
            root_terms: 5,
        };
        let q = FitQuality {
            n: 10,
            k: 2,
            sse: 0.0,
            rmse: 0.0,
            r_squared: 1.0,
            bic: -1.0,
            aic: -2.0,
        };
        let text = format_search_summary(&summary, &q);
        assert!(text.contains("nodes=7 pruned=2"));
        assert!(text.contains("selected node #4"));
    }
}
