/// Anything that can be fetched: a source URL plus an optional content hash.
///
/// Implemented by every manifest record that points at a downloadable file
/// (library artifacts, asset objects, version entries, JDK packages).
pub trait Downloadable {
    fn url(&self) -> &str;

    fn hash(&self) -> Option<&str>;
}
