/// Format a count with a decimal suffix: `3400000` becomes `3.40M`.
///
/// Suffixes are K, M, G and T at multiples of 1000; counts below 1000 are
/// printed as is.
pub fn pretty_number(count: u64) -> String {
  const UNITS: [(u64, &str); 4] = [
    (1_000_000_000_000, "T"),
    (1_000_000_000, "G"),
    (1_000_000, "M"),
    (1_000, "K"),
  ];

  for (scale, suffix) in UNITS {
    if count >= scale {
      return format!("{:.2}{}", count as f64 / scale as f64, suffix);
    }
  }
  count.to_string()
}
