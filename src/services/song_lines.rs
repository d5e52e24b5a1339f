/// Split generated text into one raw "Song by Artist" entry per non-blank line.
///
/// Lines are trimmed and kept in order; their shape is not checked here.
pub fn parse_song_lines(text: &str) -> Vec<String> {
    text.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
