use std::io::Write;

use super::*;
use crate::token::tokenize;

const MAP_TEXT: &str = "\
# word class
the\tDET
a DET
cat\tNOUN
dog\tNOUN
sat\tVERB

ran VERB
";

#[test]
fn test_from_text() {
    let map = WordClassMap::from_text(MAP_TEXT).unwrap();
    assert_eq!(map.len(), 5);
    assert_eq!(map.num_classes(), 3);
    assert_eq!(map.get(Token::intern("cat")), Some(Token::intern("NOUN")));
    assert_eq!(map.get(Token::intern("mouse")), None);
}

#[test]
fn test_project_total_over_vocabulary() {
    let map = WordClassMap::from_text(MAP_TEXT).unwrap();
    let projected = map.project(&tokenize("the dog ran"), &[]).unwrap();
    assert_eq!(projected, tokenize("DET NOUN VERB"));
}

#[test]
fn test_project_miss_is_error() {
    let map = WordClassMap::from_text(MAP_TEXT).unwrap();
    match map.project(&tokenize("the mouse ran"), &[]) {
        Err(ClassMapError::UnmappedToken(w)) => assert_eq!(w, "mouse"),
        other => panic!("expected UnmappedToken, got {other:?}"),
    }
}

#[test]
fn test_project_preserves_boundaries() {
    let map = WordClassMap::from_text(MAP_TEXT).unwrap();
    let s = Token::intern("<s>");
    let e = Token::intern("</s>");
    let projected = map.project(&tokenize("<s> a cat </s>"), &[s, e]).unwrap();
    assert_eq!(projected, tokenize("<s> DET NOUN </s>"));

    // Without preservation the markers are ordinary unmapped words.
    assert!(map.project(&tokenize("<s> a cat"), &[]).is_err());
}

#[test]
fn test_project_empty() {
    let map = WordClassMap::from_text(MAP_TEXT).unwrap();
    assert!(map.project(&[], &[]).unwrap().is_empty());
}

#[test]
fn test_parse_error_reports_line() {
    let err = WordClassMap::from_text("the DET\ncat\n").unwrap_err();
    match err {
        ClassMapError::Parse { line, .. } => assert_eq!(line, 2),
        other => panic!("expected Parse, got {other:?}"),
    }
}

#[test]
fn test_conflicting_duplicate() {
    let err = WordClassMap::from_text("run VERB\nrun NOUN\n").unwrap_err();
    assert!(matches!(err, ClassMapError::Conflict { .. }));
    // Repeating the same mapping is harmless.
    assert_eq!(
        WordClassMap::from_text("run VERB\nrun VERB\n").unwrap().len(),
        1
    );
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MAP_TEXT.as_bytes()).unwrap();
    let map = WordClassMap::load(file.path()).unwrap();
    assert_eq!(map.len(), 5);
}

#[test]
fn test_load_missing_file() {
    let err = WordClassMap::load(Path::new("/nonexistent/classes.txt")).unwrap_err();
    assert!(matches!(err, ClassMapError::Io(_)));
}

#[test]
fn test_from_pairs() {
    let map = WordClassMap::from_pairs([
        (Token::intern("x"), Token::intern("C1")),
        (Token::intern("y"), Token::intern("C1")),
    ])
    .unwrap();
    assert_eq!(map.num_classes(), 1);
    assert!(!map.is_empty());
}
