/// Tidy up a server URL provided by the user.
///
/// Runs of slashes are collapsed to a single slash, except for the `//`
/// following a scheme, and one trailing slash is removed.
pub fn normalize_url(url: &str) -> String {
    let mut normalized = String::with_capacity(url.len());

    for c in url.chars() {
        if c == '/' && follows_path_slash(&normalized) {
            continue;
        }
        normalized.push(c);
    }

    if normalized.ends_with('/') {
        normalized.pop();
    }

    normalized
}

fn follows_path_slash(so_far: &str) -> bool {
    let mut previous = so_far.chars().rev();

    match (previous.next(), previous.next()) {
        (Some('/'), Some(before)) => before != ':',
        _ => false,
    }
}
