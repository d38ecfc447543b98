/// Characters the backend refuses in index names, plus space.
const RESERVED: [char; 10] = ['\\', '/', '*', '?', '"', '<', '>', '|', ',', ' '];

/// Map an arbitrary user-supplied identifier (typically a file name) to a
/// backend-legal index name. Every reserved character becomes `_`, one for
/// one, so the result always has the same length as the input.
pub fn sanitize_index_name(raw: &str) -> String {
    raw.chars()
        .map(|character| {
            if RESERVED.contains(&character) {
                '_'
            } else {
                character
            }
        })
        .collect()
}
