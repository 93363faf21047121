//! Graph node and search result types.

use serde::{Deserialize, Deserializer, Serialize};

/// What a node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Text plus its embedding.
    Content,
    /// Hierarchy only: a directory, or a file that was not embedded.
    Path,
}

/// The atomic indexed unit. `path` is the identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub path: String,
    #[serde(default)]
    pub content: String,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "nullable_vec"
    )]
    pub embedding: Vec<f32>,
}

/// Accept `null` as well as a missing field for path nodes.
fn nullable_vec<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<f32>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Node {
    /// A hierarchy-only node.
    #[must_use]
    pub fn path_node(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: String::new(),
            embedding: Vec::new(),
        }
    }

    #[must_use]
    pub fn content_node(path: impl Into<String>, content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            embedding,
        }
    }

    /// Derived from whether an embedding is present.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        if self.embedding.is_empty() {
            NodeKind::Path
        } else {
            NodeKind::Content
        }
    }

    #[must_use]
    pub fn is_content(&self) -> bool {
        self.kind() == NodeKind::Content
    }

    /// First `max_chars` characters of the content on one line, or
    /// `[Path Node]` for hierarchy nodes.
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> String {
        if !self.is_content() {
            return "[Path Node]".to_string();
        }
        let mut preview: String = self
            .content
            .chars()
            .take(max_chars)
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        if self.content.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

/// Query-time projection produced by search. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub node: Node,
    /// Cosine similarity in `[-1, 1]`.
    pub similarity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_embedding() {
        assert_eq!(Node::path_node("src").kind(), NodeKind::Path);
        assert_eq!(
            Node::content_node("a.txt", "apple", vec![1.0]).kind(),
            NodeKind::Content
        );
    }

    #[test]
    fn test_preview() {
        let node = Node::content_node("a.txt", "line one\nline two", vec![1.0]);
        assert_eq!(node.preview(8), "line one...");
        assert_eq!(node.preview(100), "line one line two");
        assert_eq!(Node::path_node("src").preview(100), "[Path Node]");
    }

    #[test]
    fn test_path_node_serialization_omits_embedding() {
        let json = serde_json::to_value(Node::path_node("src")).unwrap();
        assert!(json.get("embedding").is_none());

        let node: Node =
            serde_json::from_str(r#"{"path":"src","content":"","embedding":null}"#).unwrap();
        assert!(node.embedding.is_empty());

        let node: Node = serde_json::from_str(r#"{"path":"src"}"#).unwrap();
        assert_eq!(node, Node::path_node("src"));
    }
}
