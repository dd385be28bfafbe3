/// Oracle returns names like `parse count (total)`; turn them into tokens
/// usable inside a metric name.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !matches!(ch, '(' | ')' | '/'))
        .map(|ch| if ch == ' ' { '_' } else { ch })
        .collect::<String>()
        .to_lowercase()
}
