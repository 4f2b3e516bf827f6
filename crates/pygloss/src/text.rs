/// 1-based line number of a byte offset in `source`.
pub(crate) fn line_at(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines_from_offsets() {
        let src = "a = 1\nb = 2\nc = 3\n";
        assert_eq!(line_at(src, 0), 1);
        assert_eq!(line_at(src, 6), 2);
        assert_eq!(line_at(src, 14), 3);
        assert_eq!(line_at(src, 10_000), 4);
    }
}
