/// Anchored shell-glob match: `*`, `?` and `[class]` with ranges and
/// leading `!`/`^` negation.
pub fn wc_match(pattern: &str, target: &str) -> bool {
    matches(pattern.as_bytes(), target.as_bytes())
}

fn matches(pat: &[u8], tgt: &[u8]) -> bool {
    let (p, rest) = match pat.split_first() {
        Some(v) => v,
        None => return tgt.is_empty(),
    };

    match p {
        b'*' => (0..=tgt.len()).any(|skip| matches(rest, &tgt[skip..])),
        b'?' => !tgt.is_empty() && matches(rest, &tgt[1..]),
        b'[' => {
            let close = match rest.iter().position(|b| *b == b']') {
                Some(close) => close,
                // Unterminated class never matches anything.
                None => return false,
            };
            let class = &rest[..close];
            match tgt.split_first() {
                Some((c, tgt_rest)) => class_match(class, *c) && matches(&rest[close + 1..], tgt_rest),
                None => false,
            }
        }
        p => tgt.first() == Some(p) && matches(rest, &tgt[1..]),
    }
}

fn class_match(class: &[u8], c: u8) -> bool {
    let (negated, class) = match class.split_first() {
        Some((b'!', rest)) | Some((b'^', rest)) => (true, rest),
        _ => (false, class),
    };

    let mut found = false;
    let mut i = 0;
    while i < class.len() {
        if i + 2 < class.len() && class[i + 1] == b'-' {
            if class[i] <= c && c <= class[i + 2] {
                found = true;
            }
            i += 3;
        } else {
            if class[i] == c {
                found = true;
            }
            i += 1;
        }
    }
    found != negated
}
