use crate::merge::Forest;
use crate::node::Node;

pub const BRANCH: &str = "├── ";
pub const CORNER: &str = "└── ";
pub const GUIDE: &str = "│   ";
pub const BLANK: &str = "    ";

/// Optional decorations. The defaults produce the plain artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Append `/` to directory names.
    pub dir_suffix: bool,
    /// Append `[unreadable]` / `[symlink cycle]` to annotated nodes.
    pub show_annotations: bool,
}

pub fn render(forest: &Forest) -> Vec<String> {
    render_with(forest, &RenderOptions::default())
}

pub fn render_with(forest: &Forest, options: &RenderOptions) -> Vec<String> {
    let mut lines = Vec::new();
    for root in &forest.roots {
        render_root(root, options, &mut lines);
    }
    lines
}

pub fn render_to_string(forest: &Forest, options: &RenderOptions) -> String {
    render_with(forest, options).join("\n")
}

/// Renders a single tree, the node itself as the unprefixed first line.
pub fn render_node(node: &Node, options: &RenderOptions) -> Vec<String> {
    let mut lines = Vec::new();
    render_root(node, options, &mut lines);
    lines
}

fn render_root(root: &Node, options: &RenderOptions, lines: &mut Vec<String>) {
    lines.push(label(root, options));
    render_children(root, "", options, lines);
}

fn render_children(node: &Node, prefix: &str, options: &RenderOptions, lines: &mut Vec<String>) {
    let last_index = node.children.len().saturating_sub(1);
    for (i, child) in node.children.iter().enumerate() {
        let is_last = i == last_index;
        let connector = if is_last { CORNER } else { BRANCH };
        lines.push(format!("{prefix}{connector}{}", label(child, options)));

        if !child.children.is_empty() {
            let guide = if is_last { BLANK } else { GUIDE };
            render_children(child, &format!("{prefix}{guide}"), options, lines);
        }
    }
}

fn label(node: &Node, options: &RenderOptions) -> String {
    let mut label = node.name.clone();
    if options.dir_suffix && node.is_dir() && !label.ends_with('/') {
        label.push('/');
    }
    if options.show_annotations {
        if let Some(annotation) = &node.annotation {
            label.push_str(&format!(" [{}]", annotation.tag()));
        }
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Annotation;

    fn forest(roots: Vec<Node>) -> Forest {
        Forest { roots }
    }

    #[test]
    fn single_chain_uses_corners_and_blank_guides() {
        let proj = Node::directory(
            "proj",
            "/proj",
            vec![Node::directory(
                "src",
                "/proj/src",
                vec![Node::file("a.py", "/proj/src/a.py")],
            )],
        );
        assert_eq!(render(&forest(vec![proj])), vec!["proj", "└── src", "    └── a.py"]);
    }

    #[test]
    fn guides_thread_through_non_last_ancestors() {
        let root = Node::directory(
            "root",
            "/root",
            vec![
                Node::directory(
                    "a",
                    "/root/a",
                    vec![
                        Node::directory("deep", "/root/a/deep", vec![Node::file("x", "/root/a/deep/x")]),
                        Node::file("y", "/root/a/y"),
                    ],
                ),
                Node::directory("b", "/root/b", vec![Node::file("z", "/root/b/z")]),
                Node::file("top.txt", "/root/top.txt"),
            ],
        );
        let expected = vec![
            "root",
            "├── a",
            "│   ├── deep",
            "│   │   └── x",
            "│   └── y",
            "├── b",
            "│   └── z",
            "└── top.txt",
        ];
        assert_eq!(render(&forest(vec![root])), expected);
    }

    #[test]
    fn multiple_roots_render_in_order_unprefixed() {
        let b = Node::directory("B", "/B", vec![Node::file("1", "/B/1")]);
        let a = Node::directory("A", "/A", vec![Node::file("2", "/A/2")]);
        assert_eq!(
            render(&forest(vec![b, a])),
            vec!["B", "└── 1", "A", "└── 2"]
        );
    }

    #[test]
    fn empty_directory_renders_without_children() {
        let root = Node::directory("r", "/r", vec![Node::directory("empty", "/r/empty", Vec::new())]);
        assert_eq!(render(&forest(vec![root])), vec!["r", "└── empty"]);
    }

    #[test]
    fn options_decorate_directories_and_annotations() {
        let root = Node::directory(
            "r",
            "/r",
            vec![
                Node::directory("locked", "/r/locked", Vec::new()).with_annotation(Annotation::Unreadable {
                    message: "Permission denied".into(),
                }),
                Node::file("f", "/r/f"),
            ],
        );
        let options = RenderOptions {
            dir_suffix: true,
            show_annotations: true,
        };
        assert_eq!(
            render_with(&forest(vec![root]), &options),
            vec!["r/", "├── locked/ [unreadable]", "└── f"]
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let root = Node::directory("r", "/r", vec![Node::file("f", "/r/f"), Node::file("g", "/r/g")]);
        let f = forest(vec![root]);
        let options = RenderOptions::default();
        assert_eq!(render_to_string(&f, &options), render_to_string(&f, &options));
        assert_eq!(render_to_string(&f, &options), "r\n├── f\n└── g");
    }
}
