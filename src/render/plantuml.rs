//! PlantUML "rendering": the diagram is encoded into a server URL, and the
//! markup is parsed into a node/link list for client-side graph views.

use std::collections::HashMap;
use std::io::Write;
use std::sync::OnceLock;

use base64::Engine;
use base64::alphabet::Alphabet;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use regex::Regex;
use serde::Serialize;

use super::{ArtifactRenderer, RenderOutcome};
use crate::app_config::DiagramConfig;
use crate::pipeline::policy::SanitizedArtifact;
use crate::types::OutputId;

const PLANTUML_ALPHABET: Alphabet =
    match Alphabet::new("0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("invalid PlantUML alphabet"),
    };

const PLANTUML_ENGINE: GeneralPurpose = GeneralPurpose::new(&PLANTUML_ALPHABET, NO_PAD);

/// Deflate the markup and encode it with PlantUML's base64 variant.
pub fn encode_plantuml(source: &str) -> std::io::Result<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(source.as_bytes())?;
    let mut compressed = encoder.finish()?;
    // PlantUML encodes trailing partial groups as if zero-padded to 3 bytes.
    while compressed.len() % 3 != 0 {
        compressed.push(0);
    }
    Ok(PLANTUML_ENGINE.encode(compressed))
}

pub struct PlantUmlRenderer {
    server: String,
}

impl PlantUmlRenderer {
    pub fn new(config: &DiagramConfig) -> Self {
        Self {
            server: config.plantuml_server.trim_end_matches('/').to_string(),
        }
    }

    pub fn svg_url(&self, source: &str) -> std::io::Result<String> {
        Ok(format!("{}/svg/{}", self.server, encode_plantuml(source)?))
    }
}

#[async_trait::async_trait]
impl ArtifactRenderer for PlantUmlRenderer {
    async fn render(&self, artifact: &SanitizedArtifact, output_id: &OutputId) -> RenderOutcome {
        match self.svg_url(artifact.source()) {
            Ok(url) => {
                log::info!("diagram {output_id} encoded ({} chars)", url.len());
                RenderOutcome::Success(url)
            }
            Err(e) => RenderOutcome::ToolFailure(format!("could not encode diagram: {e}")),
        }
    }

    fn name(&self) -> &str {
        "plantuml"
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiagramComponents {
    pub nodes: Vec<DiagramNode>,
    pub links: Vec<DiagramLink>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagramNode {
    pub id: String,
    pub label: String,
    pub kind: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagramLink {
    pub source: String,
    pub target: String,
    pub label: Option<String>,
}

fn declaration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(component|database|queue|actor|node|cloud|interface|rectangle|storage|collections|boundary|entity|control|frame|folder|package)\s+(?:"([^"]+)"|\[([^\]]+)\]|([A-Za-z_][\w.]*))(?:\s+as\s+([A-Za-z_][\w.]*))?"#,
        )
        .expect("declaration regex")
    })
}

fn bracket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[([^\]]+)\](?:\s+as\s+([A-Za-z_][\w.]*))?\s*$").expect("bracket regex")
    })
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(\[[^\]]+\]|"[^"]+"|[A-Za-z_][\w.]*)\s*(<?[-.]+(?:\[[^\]]*\])?[-.]*>?)\s*(\[[^\]]+\]|"[^"]+"|[A-Za-z_][\w.]*)\s*(?::\s*(.+))?$"#,
        )
        .expect("link regex")
    })
}

fn slug(label: &str) -> String {
    let mut out: String = label
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if out.is_empty() {
        out.push('_');
    }
    out
}

#[derive(Default)]
struct Graph {
    nodes: Vec<DiagramNode>,
    index: HashMap<String, usize>,
    labels: HashMap<String, String>,
    links: Vec<DiagramLink>,
}

impl Graph {
    fn declare(&mut self, id: String, label: String, kind: &str) {
        self.labels.insert(label.clone(), id.clone());
        if let Some(&pos) = self.index.get(&id) {
            let node = &mut self.nodes[pos];
            node.label = label;
            node.kind = kind.to_string();
            return;
        }
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(DiagramNode {
            id,
            label,
            kind: kind.to_string(),
        });
    }

    /// Resolve a link endpoint (`[Label]`, `"Label"`, or an alias) to a node id.
    fn endpoint(&mut self, raw: &str) -> String {
        let label = raw
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .or_else(|| raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')));

        match label {
            Some(label) => {
                if let Some(id) = self.labels.get(label) {
                    return id.clone();
                }
                let id = slug(label);
                if !self.index.contains_key(&id) {
                    self.declare(id.clone(), label.to_string(), "component");
                }
                id
            }
            None => {
                if !self.index.contains_key(raw) {
                    self.declare(raw.to_string(), raw.to_string(), "component");
                }
                raw.to_string()
            }
        }
    }
}

/// Nodes and links named in PlantUML component markup. Unknown syntax is skipped.
pub fn parse_components(source: &str) -> DiagramComponents {
    let mut graph = Graph::default();

    for line in source.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('\'') || line.starts_with('@') || line.starts_with('!') {
            continue;
        }

        if let Some(caps) = declaration_re().captures(line) {
            let kind = &caps[1];
            let label = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str())
                .to_string();
            let id = caps
                .get(5)
                .map_or_else(|| slug(&label), |m| m.as_str().to_string());
            graph.declare(id, label, kind);
            continue;
        }

        if let Some(caps) = bracket_re().captures(line) {
            let label = caps[1].to_string();
            let id = caps
                .get(2)
                .map_or_else(|| slug(&label), |m| m.as_str().to_string());
            graph.declare(id, label, "component");
            continue;
        }

        if let Some(caps) = link_re().captures(line) {
            let arrow = &caps[2];
            let left = graph.endpoint(&caps[1]);
            let right = graph.endpoint(&caps[3]);
            let reversed = arrow.starts_with('<') && !arrow.ends_with('>');
            let (source, target) = if reversed { (right, left) } else { (left, right) };
            let label = caps
                .get(4)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty());
            graph.links.push(DiagramLink {
                source,
                target,
                label,
            });
        }
    }

    DiagramComponents {
        nodes: graph.nodes,
        links: graph.links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_plantuml_alphabet() {
        let encoded = encode_plantuml("@startuml\nBob -> Alice : hello\n@enduml").unwrap();
        assert!(!encoded.is_empty());
        assert_eq!(encoded.len() % 4, 0);
        assert!(
            encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = encode_plantuml("@startuml\n[A] --> [B]\n@enduml").unwrap();
        let b = encode_plantuml("@startuml\n[A] --> [B]\n@enduml").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn renderer_builds_svg_url() {
        let renderer = PlantUmlRenderer::new(&DiagramConfig {
            plantuml_server: "http://uml.local/plantuml/".to_string(),
        });
        let url = renderer.svg_url("@startuml\n@enduml").unwrap();
        assert!(url.starts_with("http://uml.local/plantuml/svg/"));
    }

    #[test]
    fn parses_declarations_and_links() {
        let src = r#"@startuml Shop
actor User
component "Web Frontend" as web
database "Orders DB" as db
queue Events
[Payment Service] as pay
User --> web : browses
web --> pay
pay ..> Events : publishes
db <-- pay
@enduml"#;
        let parsed = parse_components(src);

        let ids: Vec<&str> = parsed.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["User", "web", "db", "Events", "pay"]);
        assert_eq!(parsed.nodes[2].kind, "database");
        assert_eq!(parsed.nodes[1].label, "Web Frontend");

        assert_eq!(parsed.links.len(), 4);
        assert_eq!(parsed.links[0].label.as_deref(), Some("browses"));
        assert_eq!(parsed.links[1].label, None);
        assert_eq!(parsed.links[3].source, "pay");
        assert_eq!(parsed.links[3].target, "db");
    }

    #[test]
    fn bracket_endpoints_create_nodes() {
        let parsed = parse_components("[Load Balancer] --> [API]");
        assert_eq!(parsed.nodes.len(), 2);
        assert_eq!(parsed.nodes[0].id, "Load_Balancer");
        assert_eq!(parsed.links[0].source, "Load_Balancer");
        assert_eq!(parsed.links[0].target, "API");
    }

    #[test]
    fn bracket_endpoint_resolves_declared_label() {
        let parsed = parse_components("component [Cache] as redis\n[Cache] --> [API]");
        assert_eq!(parsed.links[0].source, "redis");
        assert_eq!(parsed.nodes.len(), 2);
    }
}
