use crate::token::Token;

/// Levenshtein distance between two token sequences (unit costs).
pub fn edit_distance(a: &[Token], b: &[Token]) -> usize {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut cur = vec![0; short.len() + 1];

    for (i, &x) in long.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &y) in short.iter().enumerate() {
            let substitute = prev[j] + usize::from(x != y);
            cur[j + 1] = substitute.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[short.len()]
}
