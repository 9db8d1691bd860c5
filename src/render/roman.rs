const NUMERALS: [&str; 10] = ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"];

pub fn roman(n: usize) -> Option<&'static str> {
    n.checked_sub(1).and_then(|idx| NUMERALS.get(idx)).copied()
}

pub fn generation_label(n: usize) -> String {
    match roman(n) {
        Some(numeral) => numeral.to_string(),
        None => n.to_string(),
    }
}
