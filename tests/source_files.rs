use figura::application::render::frame_source;
use figura::domain::types::ArtifactKind;
use insta::assert_snapshot;

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|line| line.to_string()).collect()
}

#[test]
fn uml_sequence_with_header() {
    let text = frame_source(
        ArtifactKind::Uml,
        &lines(&[
            "actor User",
            "User -> Server: POST /login",
            "Server --> User: 302 Found",
        ]),
        Some("skinparam monochrome true"),
    );
    assert_snapshot!("uml_sequence_with_header", text);
}

#[test]
fn uml_without_header() {
    let text = frame_source(
        ArtifactKind::Uml,
        &lines(&["class Renderer", "Renderer <|-- Graph"]),
        None,
    );
    assert_snapshot!("uml_without_header", text);
}

#[test]
fn graph_with_header() {
    let text = frame_source(
        ArtifactKind::Graph,
        &lines(&["digraph deps {", "  app -> core;", "  core -> io;", "}"]),
        Some("// rendered by figura"),
    );
    assert_snapshot!("graph_with_header", text);
}
