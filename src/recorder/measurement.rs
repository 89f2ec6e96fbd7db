use std::fmt;

/// A value that can be combined with another of its kind.
///
/// `merge` must be commutative and associative, and `Default` must be its
/// identity, so that trees of mergeable values converge to the same result
/// regardless of the order in which they are combined.
pub trait Mergeable: Default + Clone {
    /// Combines two values into a new one without modifying either.
    fn merge(&self, other: &Self) -> Self;
}

/// Sample count and total elapsed time (nanoseconds) observed at one call site.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurement {
    count: f64,
    total: f64,
}

impl Measurement {
    /// The empty measurement, identity of `merge`.
    pub const ZERO: Measurement = Measurement {
        count: 0.0,
        total: 0.0,
    };

    /// Creates a measurement from raw count and total.
    pub const fn new(count: f64, total: f64) -> Self {
        Self { count, total }
    }

    /// A single sample of `elapsed_ns` nanoseconds.
    pub fn from_elapsed_time(elapsed_ns: f64) -> Self {
        Self {
            count: 1.0,
            total: elapsed_ns,
        }
    }

    /// Number of samples merged into this measurement.
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Sum of elapsed time across all samples, in nanoseconds.
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Mean elapsed time per sample. Undefined (None) without samples.
    pub fn average(&self) -> Option<f64> {
        if self.count > 0.0 {
            Some(self.total / self.count)
        } else {
            None
        }
    }
}

impl Mergeable for Measurement {
    fn merge(&self, other: &Self) -> Self {
        Self {
            count: self.count + other.count,
            total: self.total + other.total,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{count: {}, tot: {}, avg: {}}}",
            self.count,
            format_micros(self.total),
            self.average()
                .map(format_micros)
                .unwrap_or_else(|| "n/a".to_string()),
        )
    }
}

/// Renders nanoseconds as microseconds with one decimal and grouped thousands.
fn format_micros(nanos: f64) -> String {
    let micros = nanos / 1_000.0;
    let rounded = format!("{:.1}", micros.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((&rounded, "0"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if micros < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part} μs")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Measurement, b: Measurement) -> bool {
        (a.count - b.count).abs() < 1e-9 && (a.total - b.total).abs() < 1e-6
    }

    #[test]
    fn test_from_elapsed_time() {
        let m = Measurement::from_elapsed_time(5_000.0);
        assert_eq!(m.count(), 1.0);
        assert_eq!(m.total(), 5_000.0);
        assert_eq!(m.average(), Some(5_000.0));
    }

    #[test]
    fn test_merge_sums_fields() {
        let a = Measurement::new(2.0, 300.0);
        let b = Measurement::new(3.0, 700.0);

        let merged = a.merge(&b);
        assert_eq!(merged, Measurement::new(5.0, 1_000.0));
        assert_eq!(merged.average(), Some(200.0));
    }

    #[test]
    fn test_merge_commutative_and_associative() {
        let a = Measurement::new(1.0, 0.1);
        let b = Measurement::new(4.0, 12.7);
        let c = Measurement::new(9.0, 1e9 + 0.3);

        assert!(approx_eq(a.merge(&b), b.merge(&a)));
        assert!(approx_eq(a.merge(&b).merge(&c), a.merge(&b.merge(&c))));
    }

    #[test]
    fn test_zero_is_identity() {
        let a = Measurement::new(3.0, 42.0);
        assert_eq!(a.merge(&Measurement::ZERO), a);
        assert_eq!(Measurement::default().merge(&a), a);
    }

    #[test]
    fn test_average_undefined_without_samples() {
        assert_eq!(Measurement::ZERO.average(), None);
    }

    #[test]
    fn test_display() {
        let m = Measurement::new(2.0, 2_469_000.0);
        assert_eq!(m.to_string(), "{count: 2, tot: 2,469.0 μs, avg: 1,234.5 μs}");
        assert_eq!(
            Measurement::ZERO.to_string(),
            "{count: 0, tot: 0.0 μs, avg: n/a}"
        );
    }
}
