//! Retained cost expressions and their evaluation on a witness.

use idxinteract_core::ConfigurationVariant;
use idxinteract_ilp::{Assignment, Term};

/// `Cost(theta)` as a term list, one per variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostExpressions {
    terms: [Vec<Term>; 4],
}

impl CostExpressions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, theta: ConfigurationVariant, term: Term) {
        self.terms[theta.ordinal()].push(term);
    }

    pub fn get(&self, theta: ConfigurationVariant) -> &[Term] {
        &self.terms[theta.ordinal()]
    }

    /// `Σ_theta weight(theta) · Cost(theta)` with weights in `ALL` order.
    pub fn combine(&self, weights: [f64; 4]) -> Vec<Term> {
        ConfigurationVariant::ALL
            .iter()
            .flat_map(|&theta| {
                let w = weights[theta.ordinal()];
                self.get(theta).iter().map(move |t| Term::new(t.var, t.coef * w))
            })
            .collect()
    }

    pub fn evaluate(&self, values: &Assignment) -> VariantCosts {
        VariantCosts {
            empty: values.evaluate(self.get(ConfigurationVariant::Empty)),
            c: values.evaluate(self.get(ConfigurationVariant::C)),
            d: values.evaluate(self.get(ConfigurationVariant::D)),
            cd: values.evaluate(self.get(ConfigurationVariant::CD)),
        }
    }

    pub fn clear(&mut self) {
        self.terms.iter_mut().for_each(Vec::clear);
    }
}

/// Modeled statement cost under each variant of a witness.
///
/// # Example
///
/// ```
/// use idxinteract_iip::VariantCosts;
///
/// let k = VariantCosts { empty: 200.0, c: 200.0, d: 200.0, cd: 20.0 };
/// assert_eq!(k.net(), -180.0);
/// assert_eq!(k.degree(), 9.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantCosts {
    pub empty: f64,
    pub c: f64,
    pub d: f64,
    pub cd: f64,
}

impl VariantCosts {
    /// `Cost(EMPTY) − Cost(C) − Cost(D) + Cost(CD)`
    pub fn net(&self) -> f64 {
        self.empty - self.c - self.d + self.cd
    }

    /// Degree of interaction `|net| / Cost(CD)`.
    ///
    /// Infinite when `Cost(CD)` is zero and `net` is not; zero when both are.
    pub fn degree(&self) -> f64 {
        let net = self.net().abs();
        if self.cd > 0.0 {
            net / self.cd
        } else if net <= 1e-9 {
            0.0
        } else {
            f64::INFINITY
        }
    }
}
