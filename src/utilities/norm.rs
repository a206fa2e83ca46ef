use serde::{Deserialize, Serialize};

///
/// Vector norm used to collapse vector-valued integrals into scalar error measures.
///
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Norm
{
    L1,
    #[default]
    L2,
    Max,
}

impl Norm
{
    pub fn eval(&self, values: &[f64]) -> f64
    {
        match self
        {
            Norm::L1 => values.iter().map(|v| v.abs()).sum(),
            Norm::L2 => values.iter().map(|v| v * v).sum::<f64>().sqrt(),
            Norm::Max => values.iter().fold(0.0, |acc: f64, v| acc.max(v.abs())),
        }
    }

    ///
    /// Norm of `a - b`.
    ///
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64
    {
        let difference: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
        self.eval(&difference)
    }

    ///
    /// Norm of the componentwise relative deviation `(value - reference) / (|reference| + 1e-100)`.
    ///
    pub fn relative_distance(&self, value: &[f64], reference: &[f64]) -> f64
    {
        let relative: Vec<f64> = value.iter().zip(reference).map(|(v, r)| (v - r) / (r.abs() + 1e-100)).collect();
        self.eval(&relative)
    }
}

#[test]
fn check_norms()
{
    let v = [3.0, -4.0];
    assert_eq!(Norm::L1.eval(&v), 7.0);
    assert_eq!(Norm::L2.eval(&v), 5.0);
    assert_eq!(Norm::Max.eval(&v), 4.0);
    assert_eq!(Norm::Max.distance(&[1.0, 2.0], &[1.5, 0.0]), 2.0);
}

#[test]
fn check_relative_distance_zero_reference()
{
    // the epsilon guard keeps a zero reference finite
    let r = Norm::L2.relative_distance(&[0.0], &[0.0]);
    assert_eq!(r, 0.0);
    let r = Norm::L2.relative_distance(&[1e-200], &[0.0]);
    assert!(r.is_finite());
}
