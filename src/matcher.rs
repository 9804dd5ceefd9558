/// Loose "same work" check between a metadata title and a streaming title.
///
/// Case-folds both sides and matches when either contains the other. A blank title on
/// either side never matches.
pub fn titles_match(metadata_title: &str, streaming_title: &str) -> bool {
    if metadata_title.trim().is_empty() || streaming_title.trim().is_empty() {
        return false;
    }
    let a = metadata_title.to_lowercase();
    let b = streaming_title.to_lowercase();
    a.contains(&b) || b.contains(&a)
}
