pub fn complement(base: u8) -> Option<u8> {
    match base {
        b'A' => Some(b'T'),
        b'T' => Some(b'A'),
        b'C' => Some(b'G'),
        b'G' => Some(b'C'),
        _ => None,
    }
}

pub fn is_strand_ambiguous(a1: &str, a2: &str) -> bool {
    matches!((a1, a2), ("A", "T") | ("T", "A") | ("C", "G") | ("G", "C"))
}

/// Two distinct bases that are not reverse complements of each other.
pub fn is_valid_snp(pair: &str) -> bool {
    match pair.as_bytes() {
        [a, b] if complement(*a).is_some() && complement(*b).is_some() && a != b => {
            let (a1, a2) = pair.split_at(1);
            !is_strand_ambiguous(a1, a2)
        }
        _ => false,
    }
}

/// `alleles` is the sumstats pair followed by the reference pair, e.g.
/// `"GAAG"`. Matches on identity, strand flip, allele swap, or both.
pub fn alleles_match(alleles: &str) -> bool {
    let bytes = alleles.as_bytes();
    if bytes.len() != 4 {
        return false;
    }
    let (ours, theirs) = alleles.split_at(2);
    if !is_valid_snp(ours) || !is_valid_snp(theirs) {
        return false;
    }
    let (a, b, c, d) = (bytes[0], bytes[1], bytes[2], bytes[3]);
    let comp = |x: u8| complement(x).unwrap_or(0);
    (a == c && b == d)
        || (a == comp(c) && b == comp(d))
        || (a == d && b == c)
        || (a == comp(d) && b == comp(c))
}
