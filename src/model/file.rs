use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileTreeNode {
    pub key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileTreeNode>>,
}

impl FileTreeNode {
    pub fn file(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            key: path.clone(),
            title: file_name(&path).to_string(),
            kind: NodeKind::File,
            path,
            children: None,
        }
    }

    pub fn folder(path: impl Into<String>, children: Vec<FileTreeNode>) -> Self {
        let path = path.into();
        Self {
            key: path.clone(),
            title: file_name(&path).to_string(),
            kind: NodeKind::Folder,
            path,
            children: Some(children),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorFile {
    pub id: String,
    pub path: String,
    pub name: String,
    pub content: String,
    pub is_dirty: bool,
    pub language: String,
}

/// Last `/`-separated segment of `path`, or the whole path when there is none.
pub fn file_name(path: &str) -> &str {
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => path,
    }
}

/// Editor language tag derived from the file extension.
pub fn language_for_path(path: &str) -> &'static str {
    let name = file_name(path);
    let extension = match name.rsplit_once('.') {
        Some((_, extension)) => extension.to_ascii_lowercase(),
        None => return "plaintext",
    };

    match extension.as_str() {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" => "javascript",
        "json" => "json",
        "html" => "html",
        "css" => "css",
        "md" => "markdown",
        "py" => "python",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "cpp" => "cpp",
        "c" => "c",
        "sh" => "shell",
        _ => "plaintext",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_detection_covers_known_extensions() {
        assert_eq!(language_for_path("/ws/src/main.rs"), "rust");
        assert_eq!(language_for_path("/ws/App.TSX"), "typescript");
        assert_eq!(language_for_path("scripts/run.sh"), "shell");
        assert_eq!(language_for_path("README"), "plaintext");
        assert_eq!(language_for_path("notes.txt"), "plaintext");
    }

    #[test]
    fn file_name_takes_last_segment() {
        assert_eq!(file_name("/ws/src/lib.rs"), "lib.rs");
        assert_eq!(file_name("lib.rs"), "lib.rs");
        assert_eq!(file_name("/ws/src/"), "/ws/src/");
    }

    #[test]
    fn tree_node_serializes_kind_as_type() {
        let node = FileTreeNode::folder("/ws/src", vec![FileTreeNode::file("/ws/src/a.rs")]);
        let value = serde_json::to_value(&node).expect("node should serialize");
        assert_eq!(value["type"], "folder");
        assert_eq!(value["title"], "src");
        assert_eq!(value["children"][0]["type"], "file");
        assert!(value["children"][0].get("children").is_none());
    }
}
