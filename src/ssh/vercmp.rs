use std::cmp::Ordering;

// Compares the first two numeric components; empty or non-numeric
// segments read as zero.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    let (av, a) = scan_component(a);
    let (bv, b) = scan_component(b);
    if av != bv {
        return av.cmp(&bv);
    }

    let a = a.strip_prefix('.').unwrap_or(a);
    let b = b.strip_prefix('.').unwrap_or(b);
    let (av, _) = scan_component(a);
    let (bv, _) = scan_component(b);
    av.cmp(&bv)
}

pub fn includes_v1(ver: &str) -> bool {
    vercmp(ver, "2.0") == Ordering::Less
}

pub fn includes_v2(ver: &str) -> bool {
    // "1.99" is the canonical "speaks both" value.
    vercmp(ver, "1.99") != Ordering::Less
}

fn scan_component(s: &str) -> (u64, &str) {
    let end = s
        .as_bytes()
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(s.len());
    let value = s[..end]
        .parse::<u64>()
        .unwrap_or(if end == 0 { 0 } else { u64::MAX });
    (value, &s[end..])
}
