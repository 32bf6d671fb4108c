//! Logging and debugging facilities.
//!
//! ordo is instrumented with the `tracing` crate. Every event uses one of the
//! [`targets`] below so applications can filter by subsystem:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("ordo::apply=debug,ordo::diff=trace")
//!     .init();
//! ```
//!
//! [`TreeFormatter`] renders any forest (snapshot sections, outline trees) as
//! an indented text tree for debug output.

use std::fmt::Write as FmtWrite;

/// Target names for log filtering.
pub mod targets {
    /// UI executor.
    pub const EXECUTOR: &str = "ordo_core::executor";
    /// Signal/slot system.
    pub const SIGNAL: &str = "ordo_core::signal";
    /// Background pool.
    pub const THREADPOOL: &str = "ordo_core::threadpool";
    /// Snapshot editing.
    pub const SNAPSHOT: &str = "ordo::snapshot";
    /// Diff engine.
    pub const DIFF: &str = "ordo::diff";
    /// Apply coordinator.
    pub const APPLY: &str = "ordo::apply";
    /// View adapters and data sources.
    pub const DATA_SOURCE: &str = "ordo::data_source";
    /// Timing spans around diffs.
    pub const PERF: &str = "ordo::perf";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Plain indentation only.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Plain ASCII output, convenient for assertions in tests.
    pub fn ascii() -> Self {
        Self {
            style: TreeStyle::Ascii,
            ..Default::default()
        }
    }

    /// Limit the rendered depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

/// Renders a forest as an indented text tree.
#[derive(Debug, Clone, Default)]
pub struct TreeFormatter {
    options: TreeFormatOptions,
}

impl TreeFormatter {
    /// Create a formatter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a formatter with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format a forest given its roots, a labelling function and a children
    /// function.
    pub fn format_forest<N, L, C>(&self, title: &str, roots: &[N], label: L, children: C) -> String
    where
        L: Fn(&N) -> String,
        C: Fn(&N) -> Vec<N>,
    {
        let mut output = String::new();
        let _ = writeln!(output, "{title}");
        if roots.is_empty() {
            let _ = writeln!(output, "  (empty)");
            return output;
        }
        let count = roots.len();
        for (i, root) in roots.iter().enumerate() {
            self.format_node(root, 1, i + 1 == count, &label, &children, &mut output);
        }
        output
    }

    fn format_node<N, L, C>(
        &self,
        node: &N,
        depth: usize,
        is_last: bool,
        label: &L,
        children: &C,
        output: &mut String,
    ) where
        L: Fn(&N) -> String,
        C: Fn(&N) -> Vec<N>,
    {
        if let Some(max) = self.options.max_depth {
            if depth > max {
                return;
            }
        }

        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(&label(node));
        output.push('\n');

        let kids = children(node);
        let count = kids.len();
        for (i, child) in kids.iter().enumerate() {
            self.format_node(child, depth + 1, i + 1 == count, label, children, output);
        }
    }

    /// Build the prefix string for a tree node.
    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => (" ", "", ""),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix.push(' ');
        prefix
    }
}

/// A guard that keeps a tracing span entered until dropped.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: targets::PERF, "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn children_of(n: &u32) -> Vec<u32> {
        match n {
            1 => vec![10, 11],
            10 => vec![100],
            _ => vec![],
        }
    }

    #[test]
    fn test_format_empty_forest() {
        let output = TreeFormatter::new().format_forest::<u32, _, _>(
            "Tree",
            &[],
            |n| n.to_string(),
            children_of,
        );
        assert!(output.contains("(empty)"));
    }

    #[test]
    fn test_format_hierarchy_ascii() {
        let formatter = TreeFormatter::with_options(TreeFormatOptions::ascii());
        let output = formatter.format_forest("Tree", &[1, 2], |n| n.to_string(), children_of);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Tree");
        assert_eq!(lines[1], "+-- 1");
        assert_eq!(lines[2], "|  +-- 10");
        assert_eq!(lines[3], "|  |  `-- 100");
        assert_eq!(lines[4], "|  `-- 11");
        assert_eq!(lines[5], "`-- 2");
    }

    #[test]
    fn test_max_depth() {
        let formatter = TreeFormatter::with_options(TreeFormatOptions::ascii().with_max_depth(1));
        let output = formatter.format_forest("Tree", &[1], |n| n.to_string(), children_of);
        assert!(!output.contains("10"));
    }

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new("diff");
    }
}
